//! Android Device Bridge
//!
//! Talks to attached devices through adb: discovery, API level queries,
//! file transfer and remote shell commands.

pub mod adb;
pub mod classifier;
pub mod device;

pub use adb::{AdbClient, AdbError};
pub use classifier::{classify, SdkGroups};
pub use device::{parse_devices, parse_ready_serials, Device, DeviceState};

/// Device property holding the platform API level
pub const SDK_VERSION_PROP: &str = "ro.build.version.sdk";

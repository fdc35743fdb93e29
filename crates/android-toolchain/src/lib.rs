//! Android Toolchain
//!
//! Knows where things live inside an Android SDK, a JDK and a kotlinc
//! distribution, and wraps the two SDK operations the pipeline needs:
//! - fetching a platform library (`android.jar`) through sdkmanager
//! - locating d8 in the newest build-tools directory that ships it

pub mod build_tools;
pub mod env;
pub mod platform;
pub mod sdk_manager;
pub mod toolchain;

pub use build_tools::{compare_versions, find_build_tool, BuildToolsError};
pub use env::ToolEnvironment;
pub use platform::{PlatformError, PlatformResolver};
pub use sdk_manager::{SdkComponent, SdkManager, SdkManagerError};
pub use toolchain::Toolchain;

/// Environment variable that makes sdkmanager skip its JDK version gate
pub const SKIP_JDK_VERSION_CHECK: &str = "SKIP_JDK_VERSION_CHECK";

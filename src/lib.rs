//! dalvikrun
//!
//! Compiles Java/Kotlin sources against the platform library of each
//! attached device's API level, converts them to `classes.dex` and runs
//! them on the devices with `app_process` or `dalvikvm`.
//!
//! ## Architecture
//!
//! - `dalvikrun-core`: configuration, errors and the external process runner
//! - `dalvikrun-android-toolchain`: SDK layout, sdkmanager, platform libraries, build-tools
//! - `dalvikrun-device-bridge`: adb discovery and SDK classification
//! - `dalvikrun-build-engine`: compile, dex, push and run
//!
//! This crate adds the user-facing layer: the `Host` prompts, the run
//! `Pipeline` and the CLI.

#![warn(clippy::all)]

pub mod cli;
pub mod commands;
pub mod host;
pub mod pipeline;

pub use dalvikrun_android_toolchain as toolchain;
pub use dalvikrun_build_engine as build;
pub use dalvikrun_core as core;
pub use dalvikrun_device_bridge as devices;

pub use host::{Host, TerminalHost};
pub use pipeline::{
    DeviceOutcome, DeviceReport, FailedStage, GroupReport, GroupResult, Pipeline, RunReport, RunRequest,
    StageFailure,
};

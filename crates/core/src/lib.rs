//! dalvikrun core - configuration and shared plumbing
//!
//! This crate holds what every stage of the pipeline needs: the resolved
//! configuration, the top-level error type and the runner used to invoke
//! external tools with a timeout.

pub mod config;
pub mod error;
pub mod process;

#[cfg(all(unix, any(test, feature = "test-util")))]
pub mod testing;

pub use config::{AppConfig, ConfigOverrides, RunConfig};
pub use error::{DalvikRunError, Result};
pub use process::{ProcessError, ToolCommand, ToolOutput};

/// Name of the per-project scratch directory
pub const BUILD_DIR_NAME: &str = ".dalvikrun";

/// Entry class offered when the user is asked what to run
pub const DEFAULT_MAIN_CLASS: &str = "com.example.Main";

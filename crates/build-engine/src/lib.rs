//! dalvikrun Build Engine
//!
//! Turns Java/Kotlin sources into a `classes.dex` and runs it on devices:
//! compile (kotlinc, javac), package (d8), push and execute (adb).

pub mod compiler;
pub mod config;
pub mod deploy;
pub mod dexer;
pub mod runner;
pub mod sources;

pub use compiler::SourceCompiler;
pub use config::BuildLayout;
pub use deploy::{Deployer, ExecutionMode, REMOTE_DEX_PATH};
pub use dexer::Dexer;
pub use runner::{BuildOutput, BuildRunner};
pub use sources::{Language, SourceFile, SourceSet};

use std::fmt;
use std::path::PathBuf;

use dalvikrun_android_toolchain::BuildToolsError;
use dalvikrun_core::ProcessError;

/// Name of the packaged artifact
pub const DEX_FILE_NAME: &str = "classes.dex";

/// Stage of a build that runs an external tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Kotlin,
    Java,
    Dex,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Kotlin => "Kotlin compilation",
            Stage::Java => "Java compilation",
            Stage::Dex => "Dex creation",
        })
    }
}

/// Build errors
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("No Java or Kotlin files to compile")]
    NothingToCompile,
    #[error("{0} is not configured")]
    MissingConfiguration(String),
    #[error("{tool} not found at {path}")]
    ToolNotFound { tool: String, path: PathBuf },
    #[error("No d8 tool found in build-tools: {0}")]
    PackagerNotFound(#[source] BuildToolsError),
    #[error("No .class files found in {0}")]
    NoClassFiles(PathBuf),
    #[error("{stage} failed: {diagnostic}")]
    StageFailed { stage: Stage, diagnostic: String },
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not scan build output: {0}")]
    Walk(#[from] walkdir::Error),
}

impl BuildError {
    /// Stage the error belongs to, when a tool ran and failed
    pub fn stage(&self) -> Option<Stage> {
        match self {
            BuildError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

//! Dex packaging
//!
//! Converts compiled classes into a single `classes.dex` with d8 from the
//! newest build-tools version that ships it.

use std::path::{Path, PathBuf};

use dalvikrun_android_toolchain::{find_build_tool, Toolchain};
use dalvikrun_core::ToolCommand;
use tracing::{debug, info};

use crate::config::class_files;
use crate::{BuildError, Stage, DEX_FILE_NAME};

#[cfg(windows)]
const D8_NAMES: &[&str] = &["d8.bat", "d8"];
#[cfg(not(windows))]
const D8_NAMES: &[&str] = &["d8", "d8.bat"];

/// d8 wrapper
#[derive(Debug, Clone)]
pub struct Dexer {
    toolchain: Toolchain,
    d8: PathBuf,
    version: String,
}

impl Dexer {
    /// Find d8 under `<sdk>/build-tools`
    pub fn locate(toolchain: &Toolchain) -> Result<Self, BuildError> {
        let (version, d8) =
            find_build_tool(&toolchain.build_tools_dir(), D8_NAMES).map_err(BuildError::PackagerNotFound)?;
        debug!("d8 {} at {:?}", version, d8);
        Ok(Self {
            toolchain: toolchain.clone(),
            d8,
            version,
        })
    }

    /// build-tools version d8 was taken from
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Package every class under `classes_dir` into `<output_dir>/classes.dex`
    pub async fn package(&self, classes_dir: &Path, output_dir: &Path) -> Result<PathBuf, BuildError> {
        let classes = class_files(classes_dir)?;
        if classes.is_empty() {
            return Err(BuildError::NoClassFiles(classes_dir.to_path_buf()));
        }

        info!("Creating {} from {} class file(s)", DEX_FILE_NAME, classes.len());
        let cmd = ToolCommand::new(&self.d8)
            .arg("--output")
            .arg(output_dir)
            .args(&classes);
        let output = self
            .toolchain
            .environment()
            .apply(cmd)
            .timeout(self.toolchain.timeout())
            .output()
            .await?;

        if !output.success() {
            return Err(BuildError::StageFailed {
                stage: Stage::Dex,
                diagnostic: output.diagnostic(),
            });
        }

        let dex = output_dir.join(DEX_FILE_NAME);
        if !dex.is_file() {
            return Err(BuildError::StageFailed {
                stage: Stage::Dex,
                diagnostic: format!("d8 finished but {} was not written", dex.display()),
            });
        }
        Ok(dex)
    }
}

//! Platform library resolution
//!
//! Compiling against a device needs the `android.jar` stubs for that
//! device's API level. Resolution is a cache lookup in the SDK; only a miss
//! starts sdkmanager.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::sdk_manager::{SdkComponent, SdkManager, SdkManagerError};
use crate::toolchain::Toolchain;

/// Platform resolution errors
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("invalid API level {0:?}")]
    InvalidLevel(String),
    #[error("failed to download platform android-{level}: {source}")]
    Download {
        level: String,
        #[source]
        source: SdkManagerError,
    },
    #[error("platforms/android-{level}/android.jar not found after download\n{output}")]
    MissingAfterDownload { level: String, output: String },
}

/// Resolves `android.jar` for an API level, downloading on a cache miss
pub struct PlatformResolver {
    toolchain: Toolchain,
}

impl PlatformResolver {
    pub fn new(toolchain: &Toolchain) -> Self {
        Self {
            toolchain: toolchain.clone(),
        }
    }

    /// Path of the cached jar, if it is already installed
    pub fn cached(&self, api_level: &str) -> Option<PathBuf> {
        let jar = self.toolchain.platform_jar(api_level);
        jar.is_file().then_some(jar)
    }

    /// Return the platform library for `api_level`.
    ///
    /// A cache hit touches nothing but the file system. A miss runs
    /// sdkmanager for `platforms;android-<level>` and checks again.
    pub async fn resolve(&self, api_level: &str) -> Result<PathBuf, PlatformError> {
        validate_level(api_level)?;

        if let Some(jar) = self.cached(api_level) {
            debug!("android-{} already installed at {:?}", api_level, jar);
            return Ok(jar);
        }

        info!("Downloading android-{} using sdkmanager...", api_level);
        let download_err = |source| PlatformError::Download {
            level: api_level.to_string(),
            source,
        };
        let manager = SdkManager::new(&self.toolchain).map_err(download_err)?;
        let output = manager
            .install(&[SdkComponent::Platform(api_level.to_string())])
            .await
            .map_err(download_err)?;

        self.cached(api_level)
            .ok_or_else(|| PlatformError::MissingAfterDownload {
                level: api_level.to_string(),
                output: output.diagnostic(),
            })
    }

    /// API levels with an installed platform library, ascending
    pub fn installed_levels(&self) -> Vec<String> {
        let platforms = self.toolchain.sdk_root().join("platforms");
        let mut levels: Vec<String> = match std::fs::read_dir(&platforms) {
            Ok(entries) => entries
                .flatten()
                .filter_map(|entry| {
                    let name = entry.file_name().to_str()?.to_string();
                    let level = name.strip_prefix("android-")?.to_string();
                    entry.path().join("android.jar").is_file().then_some(level)
                })
                .collect(),
            Err(_) => Vec::new(),
        };
        levels.sort_by(|a, b| crate::compare_versions(a, b));
        levels
    }
}

/// API levels come straight from a device; keep them from escaping the
/// platforms directory.
fn validate_level(api_level: &str) -> Result<(), PlatformError> {
    let valid = !api_level.is_empty()
        && api_level
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
        && !api_level.contains("..");
    if valid {
        Ok(())
    } else {
        Err(PlatformError::InvalidLevel(api_level.to_string()))
    }
}

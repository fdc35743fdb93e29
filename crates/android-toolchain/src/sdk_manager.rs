//! SDK Manager
//!
//! Wraps the Android SDK manager to install SDK packages.

use std::path::{Path, PathBuf};

use dalvikrun_core::{ProcessError, ToolCommand, ToolOutput};
use tracing::{debug, info};

use crate::toolchain::Toolchain;
use crate::SKIP_JDK_VERSION_CHECK;

/// SDK component types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkComponent {
    Platform(String), // platforms;android-XX
}

impl SdkComponent {
    /// Get the SDK manager package name
    pub fn package_name(&self) -> String {
        match self {
            SdkComponent::Platform(api) => format!("platforms;android-{}", api),
        }
    }
}

/// SDK Manager errors
#[derive(Debug, thiserror::Error)]
pub enum SdkManagerError {
    #[error("sdkmanager not found under {0}")]
    SdkManagerNotFound(PathBuf),
    #[error("sdkmanager failed: {0}")]
    CommandFailed(String),
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Android SDK Manager wrapper
pub struct SdkManager {
    toolchain: Toolchain,
    sdkmanager_path: PathBuf,
}

impl SdkManager {
    /// Create a new SDK manager
    pub fn new(toolchain: &Toolchain) -> Result<Self, SdkManagerError> {
        let sdkmanager_path = Self::find_sdkmanager(toolchain.sdk_root())?;
        Ok(Self {
            toolchain: toolchain.clone(),
            sdkmanager_path,
        })
    }

    /// Find the sdkmanager executable
    fn find_sdkmanager(sdk_root: &Path) -> Result<PathBuf, SdkManagerError> {
        let exe_name = if cfg!(windows) { "sdkmanager.bat" } else { "sdkmanager" };

        // Try cmdline-tools/latest
        let path = sdk_root.join("cmdline-tools").join("latest").join("bin").join(exe_name);
        if path.exists() {
            return Ok(path);
        }

        // Try cmdline-tools/X.X (versioned)
        let cmdline_tools = sdk_root.join("cmdline-tools");
        if let Ok(entries) = std::fs::read_dir(&cmdline_tools) {
            let mut candidates: Vec<PathBuf> = entries
                .flatten()
                .map(|entry| entry.path().join("bin").join(exe_name))
                .filter(|path| path.exists())
                .collect();
            candidates.sort();
            if let Some(path) = candidates.pop() {
                return Ok(path);
            }
        }

        // Try tools directory (legacy)
        let path = sdk_root.join("tools").join("bin").join(exe_name);
        if path.exists() {
            return Ok(path);
        }

        Err(SdkManagerError::SdkManagerNotFound(sdk_root.to_path_buf()))
    }

    pub fn path(&self) -> &Path {
        &self.sdkmanager_path
    }

    /// Create the base command with environment variables
    fn create_command(&self) -> ToolCommand {
        let env = self
            .toolchain
            .environment()
            .set(SKIP_JDK_VERSION_CHECK, "true");
        env.apply(ToolCommand::new(&self.sdkmanager_path))
            .timeout(self.toolchain.timeout())
    }

    /// Install SDK components.
    ///
    /// Licence prompts are answered with `y`. On failure the tool's own
    /// diagnostic text is returned unchanged.
    pub async fn install(&self, components: &[SdkComponent]) -> Result<ToolOutput, SdkManagerError> {
        let packages: Vec<String> = components.iter().map(|c| c.package_name()).collect();

        info!("Installing SDK packages: {:?}", packages);

        let output = self
            .create_command()
            .args(&packages)
            .stdin_bytes("y\n".repeat(10))
            .output()
            .await?;

        for line in output.stdout.lines() {
            debug!("sdkmanager: {}", line);
        }

        if !output.success() {
            return Err(SdkManagerError::CommandFailed(output.diagnostic()));
        }

        info!("SDK packages installed successfully");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_package_name() {
        assert_eq!(
            SdkComponent::Platform("34".into()).package_name(),
            "platforms;android-34"
        );
    }

    #[test]
    fn test_missing_sdkmanager() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = Toolchain::new(dir.path().to_path_buf(), dir.path().to_path_buf());
        assert!(matches!(
            SdkManager::new(&toolchain),
            Err(SdkManagerError::SdkManagerNotFound(_))
        ));
    }

    #[cfg(unix)]
    mod process {
        use super::super::*;
        use dalvikrun_core::testing::{failing, FakeToolchain};

        fn toolchain(fake: &FakeToolchain) -> Toolchain {
            Toolchain::from_config(&fake.run_config())
        }

        #[tokio::test]
        async fn test_versioned_cmdline_tools_found() {
            let fake = FakeToolchain::new();
            let path = fake.script(
                &fake.sdk_root.join("cmdline-tools").join("12.0").join("bin").join("sdkmanager"),
                "",
            );
            let manager = SdkManager::new(&toolchain(&fake)).unwrap();
            assert_eq!(manager.path(), path.as_path());
        }

        #[tokio::test]
        async fn test_install_passes_package_and_version_gate() {
            let fake = FakeToolchain::new();
            fake.install_sdkmanager("echo \"gate=$SKIP_JDK_VERSION_CHECK java=$JAVA_HOME\"\n");

            let manager = SdkManager::new(&toolchain(&fake)).unwrap();
            let output = manager
                .install(&[SdkComponent::Platform("34".into())])
                .await
                .unwrap();

            assert!(output.stdout.contains("gate=true"));
            assert!(output.stdout.contains(&format!("java={}", fake.java_home.display())));
            assert_eq!(
                fake.calls_to("sdkmanager"),
                vec!["sdkmanager platforms;android-34".to_string()]
            );
        }

        #[tokio::test]
        async fn test_install_failure_is_verbatim() {
            let fake = FakeToolchain::new();
            fake.install_sdkmanager(&failing("Failed to find package 'platforms;android-99'"));

            let manager = SdkManager::new(&toolchain(&fake)).unwrap();
            let err = manager
                .install(&[SdkComponent::Platform("99".into())])
                .await
                .unwrap_err();

            match err {
                SdkManagerError::CommandFailed(msg) => {
                    assert_eq!(msg, "Failed to find package 'platforms;android-99'")
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }
}

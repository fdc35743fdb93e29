//! ADB (Android Debug Bridge) Client
//!
//! Communicates with devices via the adb binary from `platform-tools`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use dalvikrun_core::process::exe_name;
use dalvikrun_core::{ProcessError, ToolCommand, ToolOutput};
use tracing::debug;

use crate::device::{parse_devices, parse_ready_serials, Device};
use crate::SDK_VERSION_PROP;

/// ADB errors
#[derive(Debug, thiserror::Error)]
pub enum AdbError {
    #[error("adb not found at {0}")]
    NotFound(PathBuf),
    #[error("adb command failed: {0}")]
    CommandFailed(String),
    #[error("device {0} reported an empty SDK version")]
    EmptySdkVersion(String),
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// ADB Client
#[derive(Debug, Clone)]
pub struct AdbClient {
    adb_path: PathBuf,
    timeout: Option<Duration>,
}

impl AdbClient {
    /// Create a client for the adb inside `<sdk>/platform-tools`
    pub fn new(sdk_path: &Path) -> Self {
        Self::with_adb_path(sdk_path.join("platform-tools").join(exe_name("adb")))
    }

    /// Create a client for an explicit adb binary
    pub fn with_adb_path(adb_path: PathBuf) -> Self {
        Self {
            adb_path,
            timeout: None,
        }
    }

    /// Bound every call except `shell_streaming`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn adb_path(&self) -> &Path {
        &self.adb_path
    }

    /// Check if ADB is available
    pub fn is_available(&self) -> bool {
        self.adb_path.exists()
    }

    fn command(&self, serial: Option<&str>, args: &[&str]) -> Result<ToolCommand, AdbError> {
        if !self.is_available() {
            return Err(AdbError::NotFound(self.adb_path.clone()));
        }
        let mut cmd = ToolCommand::new(&self.adb_path);
        if let Some(serial) = serial {
            cmd = cmd.args(["-s", serial]);
        }
        Ok(cmd.args(args))
    }

    fn check(output: ToolOutput) -> Result<String, AdbError> {
        if !output.success() {
            return Err(AdbError::CommandFailed(output.diagnostic()));
        }
        Ok(output.stdout)
    }

    /// Run an ADB command
    async fn run(&self, args: &[&str]) -> Result<String, AdbError> {
        debug!("adb {:?}", args);
        let output = self.command(None, args)?.timeout(self.timeout).output().await?;
        Self::check(output)
    }

    /// Run an ADB command for a specific device
    async fn run_for_device(&self, serial: &str, args: &[&str]) -> Result<String, AdbError> {
        debug!("adb -s {} {:?}", serial, args);
        let output = self
            .command(Some(serial), args)?
            .timeout(self.timeout)
            .output()
            .await?;
        Self::check(output)
    }

    /// List every attached device, whatever its state
    pub async fn list_devices(&self) -> Result<Vec<Device>, AdbError> {
        let output = self.run(&["devices"]).await?;
        Ok(parse_devices(&output))
    }

    /// Serials of devices in the ready (`device`) state
    pub async fn ready_devices(&self) -> Result<Vec<String>, AdbError> {
        let output = self.run(&["devices"]).await?;
        Ok(parse_ready_serials(&output))
    }

    /// Run a shell command on device
    pub async fn shell(&self, serial: &str, command: &str) -> Result<String, AdbError> {
        self.run_for_device(serial, &["shell", command]).await
    }

    /// Run a shell command without a timeout, handing each output line to
    /// `on_line` as it arrives. Returns the full output.
    pub async fn shell_streaming<F>(
        &self,
        serial: &str,
        command: &str,
        on_line: F,
    ) -> Result<String, AdbError>
    where
        F: FnMut(&str),
    {
        debug!("adb -s {} shell {:?}", serial, command);
        let output = self
            .command(Some(serial), &["shell", command])?
            .stream(on_line)
            .await?;
        Self::check(output)
    }

    /// Push a file to device
    pub async fn push(&self, serial: &str, local: &Path, remote: &str) -> Result<(), AdbError> {
        let local_str = local.to_string_lossy();
        self.run_for_device(serial, &["push", &local_str, remote]).await?;
        Ok(())
    }

    /// Get device property
    pub async fn get_prop(&self, serial: &str, prop: &str) -> Result<String, AdbError> {
        let output = self.shell(serial, &format!("getprop {}", prop)).await?;
        Ok(output.trim().to_string())
    }

    /// Get SDK version, as the device reports it
    pub async fn get_sdk_version(&self, serial: &str) -> Result<String, AdbError> {
        let version = self.get_prop(serial, SDK_VERSION_PROP).await?;
        if version.is_empty() {
            return Err(AdbError::EmptySdkVersion(serial.to_string()));
        }
        Ok(version)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use dalvikrun_core::testing::{FakeAdb, FakeToolchain};

    #[tokio::test]
    async fn test_missing_adb() {
        let fake = FakeToolchain::new();
        let adb = AdbClient::new(&fake.sdk_root);
        assert!(!adb.is_available());
        assert!(matches!(adb.ready_devices().await, Err(AdbError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_ready_devices_and_sdk_version() {
        let mut behaviour = FakeAdb::with_devices(&[("emulator-5554", "34")]);
        behaviour.devices_output.push_str("0123456789ABCDEF\toffline\n");
        let fake = FakeToolchain::new();
        fake.install_adb(&behaviour);
        let adb = AdbClient::new(&fake.sdk_root);

        assert_eq!(adb.ready_devices().await.unwrap(), vec!["emulator-5554"]);
        assert_eq!(adb.list_devices().await.unwrap().len(), 2);
        assert_eq!(adb.get_sdk_version("emulator-5554").await.unwrap(), "34");
        assert!(matches!(
            adb.get_sdk_version("ghost").await,
            Err(AdbError::CommandFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_push_and_shell_arguments() {
        let fake = FakeToolchain::new();
        fake.install_adb(&FakeAdb::with_devices(&[("emulator-5554", "34")]).fail_push("bad"));
        let adb = AdbClient::new(&fake.sdk_root);
        let local = fake.project_dir.join("classes.dex");

        adb.push("emulator-5554", &local, "/data/local/tmp/").await.unwrap();
        let err = adb.push("bad", &local, "/data/local/tmp/").await.unwrap_err();
        assert!(err.to_string().contains("failed to copy"));

        let mut lines = Vec::new();
        let out = adb
            .shell_streaming("emulator-5554", "dalvikvm -cp x Main", |l| lines.push(l.to_string()))
            .await
            .unwrap();
        assert_eq!(lines, vec!["ran on emulator-5554: dalvikvm -cp x Main"]);
        assert!(out.contains("dalvikvm"));

        let calls = fake.calls_to("adb");
        assert_eq!(
            calls[0],
            format!("adb -s emulator-5554 push {} /data/local/tmp/", local.display())
        );
    }
}

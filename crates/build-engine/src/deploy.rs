//! Deployment
//!
//! Pushes the dex to every device of a group and runs the main class
//! there, either through `app_process` or straight on `dalvikvm`.

use std::fmt;
use std::path::Path;

use dalvikrun_device_bridge::{AdbClient, AdbError};
use futures::future::join_all;
use tracing::{debug, info};

/// Where the dex lands on the device
pub const REMOTE_DEX_PATH: &str = "/data/local/tmp/classes.dex";

/// How the main class is started on the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// `app_process`, which gives the program a framework context
    #[default]
    AppProcess,
    /// Bare `dalvikvm`
    Dalvik,
}

impl ExecutionMode {
    pub fn from_dalvik_only(dalvik_only: bool) -> Self {
        if dalvik_only {
            ExecutionMode::Dalvik
        } else {
            ExecutionMode::AppProcess
        }
    }

    /// Remote shell command for running `main` from the dex at `remote`.
    ///
    /// `main` is the class name optionally followed by program arguments.
    pub fn command(&self, remote: &str, main: &str) -> String {
        match self {
            ExecutionMode::Dalvik => format!("dalvikvm -cp {} {}", remote, main),
            ExecutionMode::AppProcess => {
                format!("app_process -Djava.class.path={} /system/bin {}", remote, main)
            }
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutionMode::AppProcess => "app_process",
            ExecutionMode::Dalvik => "dalvikvm",
        })
    }
}

/// Pushes and runs a dex on devices
#[derive(Debug, Clone)]
pub struct Deployer {
    adb: AdbClient,
    mode: ExecutionMode,
    remote_path: String,
}

impl Deployer {
    pub fn new(adb: AdbClient, mode: ExecutionMode) -> Self {
        Self {
            adb,
            mode,
            remote_path: REMOTE_DEX_PATH.to_string(),
        }
    }

    /// Push `dex` to every device concurrently.
    ///
    /// Returns one result per serial, in input order. A failed push does
    /// not affect the others.
    pub async fn push_all<'a>(
        &self,
        dex: &Path,
        serials: &'a [String],
    ) -> Vec<(&'a str, Result<(), AdbError>)> {
        join_all(serials.iter().map(|serial| async move {
            debug!("Pushing {:?} to {}", dex, serial);
            let result = self.adb.push(serial, dex, &self.remote_path).await;
            (serial.as_str(), result)
        }))
        .await
    }

    /// Run `main` on one device, handing each output line to `on_line`
    pub async fn run<F>(&self, serial: &str, main: &str, on_line: F) -> Result<String, AdbError>
    where
        F: FnMut(&str),
    {
        let command = self.mode.command(&self.remote_path, main);
        info!("Running on {}: {}", serial, command);
        self.adb.shell_streaming(serial, &command, on_line).await
    }
}

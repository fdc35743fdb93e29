//! External tool invocation
//!
//! Every stage of the pipeline shells out to an SDK tool (adb, javac,
//! kotlinc, d8, sdkmanager). `ToolCommand` wraps `tokio::process::Command`
//! with captured output, optional stdin and an optional timeout.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, Command};
use tracing::debug;

/// Process errors
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed while waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} did not finish within {}s", .after.as_secs())]
    Timeout { program: String, after: Duration },
}

/// Captured result of a finished tool
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the tool exited with status zero
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Text to show the user when the tool failed.
    ///
    /// Prefers the error stream verbatim, then standard output, then the
    /// exit status.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.status.code() {
            Some(code) => format!("exited with status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Builder for one external tool invocation
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    stdin: Option<Vec<u8>>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            stdin: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Bytes written to the tool's stdin before it is closed
    pub fn stdin_bytes(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Upper bound on the tool's run time. `None` waits forever.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Human readable command line, for logs
    pub fn display(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    fn build(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    fn spawn(&self) -> Result<tokio::process::Child, ProcessError> {
        debug!("exec: {}", self.display());
        self.build().spawn().map_err(|source| ProcessError::Spawn {
            program: self.program_name(),
            source,
        })
    }

    /// Write the configured input, then close the pipe
    async fn feed_stdin(&self, stdin: Option<ChildStdin>) {
        if let (Some(input), Some(mut stdin)) = (&self.stdin, stdin) {
            // The tool may exit without reading its input.
            if let Err(e) = stdin.write_all(input).await {
                debug!("{}: stdin closed early: {}", self.program_name(), e);
            }
        }
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, ProcessError>
    where
        F: std::future::Future<Output = std::io::Result<T>>,
    {
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| ProcessError::Timeout {
                    program: self.program_name(),
                    after: limit,
                })?,
            None => fut.await,
        };
        result.map_err(|source| ProcessError::Wait {
            program: self.program_name(),
            source,
        })
    }

    /// Run the tool to completion and capture its output.
    ///
    /// A non-zero exit is not an error here; callers decide what a failure
    /// means for their stage.
    pub async fn output(&self) -> Result<ToolOutput, ProcessError> {
        let mut child = self.spawn()?;
        let stdin = child.stdin.take();

        let output = self
            .bounded(async move {
                let ((), output) = tokio::join!(self.feed_stdin(stdin), child.wait_with_output());
                output
            })
            .await?;
        Ok(ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Run the tool, handing each stdout line to `on_line` as it arrives.
    pub async fn stream<F>(&self, mut on_line: F) -> Result<ToolOutput, ProcessError>
    where
        F: FnMut(&str),
    {
        let mut child = self.spawn()?;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        self.bounded(async move {
            let stderr_task = tokio::spawn(async move {
                let mut buf = String::new();
                if let Some(mut stderr) = stderr {
                    stderr.read_to_string(&mut buf).await?;
                }
                Ok::<_, std::io::Error>(buf)
            });

            let read_stdout = async {
                let mut collected = String::new();
                if let Some(stdout) = stdout {
                    let mut lines = BufReader::new(stdout).lines();
                    while let Some(line) = lines.next_line().await? {
                        on_line(&line);
                        collected.push_str(&line);
                        collected.push('\n');
                    }
                }
                Ok::<_, std::io::Error>(collected)
            };
            let ((), collected) = tokio::join!(self.feed_stdin(stdin), read_stdout);
            let collected = collected?;

            let status = child.wait().await?;
            let stderr = stderr_task
                .await
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;

            Ok(ToolOutput {
                status,
                stdout: collected,
                stderr,
            })
        })
        .await
    }
}

/// Executable name with the platform suffix applied
pub fn exe_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

/// Script name with the platform suffix applied (`.bat` on Windows)
pub fn script_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.bat", name)
    } else {
        name.to_string()
    }
}

//! CLI commands for dalvikrun
//!
//! Each command loads the configuration, resolves it for the current
//! invocation and hands off to the library crates.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use console::style;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info};

use dalvikrun_android_toolchain::{PlatformResolver, Toolchain};
use dalvikrun_core::{AppConfig, ConfigOverrides, RunConfig};
use dalvikrun_device_bridge::{AdbClient, DeviceState};

use crate::host::TerminalHost;
use crate::pipeline::{DeviceOutcome, GroupResult, Pipeline, RunReport, RunRequest};

async fn load_config(config_file: Option<&Path>) -> Result<AppConfig> {
    let config = match config_file {
        Some(path) => AppConfig::load_from(path).await?,
        None => AppConfig::load().await?,
    };
    Ok(config)
}

fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().context("Cannot determine the current directory")
}

async fn resolve(
    config_file: Option<&Path>,
    overrides: &ConfigOverrides,
    project_dir: Option<PathBuf>,
) -> Result<RunConfig> {
    let config = load_config(config_file).await?;
    let project_dir = match project_dir {
        Some(dir) => dir,
        None => current_dir()?,
    };
    let resolved = config.resolve(overrides, &project_dir)?;
    debug!("Resolved configuration: {:?}", resolved);
    Ok(resolved)
}

/// Run command options
pub struct RunCommand {
    pub config_file: Option<PathBuf>,
    pub overrides: ConfigOverrides,
    pub project_dir: Option<PathBuf>,
    pub files: Vec<PathBuf>,
    pub devices: Vec<String>,
    pub main_class: Option<String>,
    pub assume_yes: bool,
}

impl RunCommand {
    /// Execute the run command
    pub async fn execute(self) -> Result<()> {
        let config = resolve(self.config_file.as_deref(), &self.overrides, self.project_dir).await?;
        info!("Project directory: {:?}", config.project_dir);

        let host = TerminalHost::new().assume_yes(self.assume_yes);
        let request = RunRequest {
            files: self.files,
            devices: self.devices,
            main_class: self.main_class,
        };

        let report = Pipeline::new(config, &host).run(&request).await?;
        print_summary(&report);

        if report.has_failures() {
            bail!("Some devices did not run the program");
        }
        Ok(())
    }
}

fn print_summary(report: &RunReport) {
    if report.is_empty() {
        return;
    }
    println!();
    for group in &report.groups {
        println!("  {} {}", style("SDK").dim(), style(&group.level).white().bold());
        match &group.result {
            GroupResult::Failed(failure) => {
                println!(
                    "    {} {} failed",
                    style("✕").red(),
                    failure.stage
                );
            }
            GroupResult::Deployed(devices) => {
                for device in devices {
                    let (mark, text) = match &device.outcome {
                        DeviceOutcome::Ran { .. } => (style("✓").green(), "ran".to_string()),
                        DeviceOutcome::PushFailed(e) => (style("✕").red(), format!("push failed: {}", e)),
                        DeviceOutcome::RunFailed(e) => (style("✕").red(), format!("run failed: {}", e)),
                        DeviceOutcome::Skipped => (style("-").dim(), "skipped".to_string()),
                    };
                    println!("    {} {} {}", mark, device.serial, style(text).dim());
                }
            }
        }
    }
}

/// One row of `devices`
#[derive(Debug, Serialize)]
struct DeviceRow {
    serial: String,
    state: DeviceState,
    emulator: bool,
    sdk: Option<String>,
}

/// Devices command options
pub struct DevicesCommand {
    pub config_file: Option<PathBuf>,
    pub overrides: ConfigOverrides,
    pub json: bool,
}

impl DevicesCommand {
    /// Execute the devices command
    pub async fn execute(self) -> Result<()> {
        let config = resolve(self.config_file.as_deref(), &self.overrides, None).await?;
        let toolchain = Toolchain::from_config(&config);
        let adb = AdbClient::with_adb_path(toolchain.adb_path()).with_timeout(toolchain.timeout());

        let devices = adb.list_devices().await?;
        let rows: Vec<DeviceRow> = join_all(devices.into_iter().map(|device| {
            let adb = &adb;
            async move {
                let sdk = if device.is_usable() {
                    adb.get_sdk_version(&device.serial).await.ok()
                } else {
                    None
                };
                DeviceRow {
                    emulator: device.is_emulator(),
                    serial: device.serial,
                    state: device.state,
                    sdk,
                }
            }
        }))
        .await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(());
        }

        if rows.is_empty() {
            println!("  {}", style("No devices detected.").dim());
            return Ok(());
        }
        for row in &rows {
            let state = if row.state.is_usable() {
                style(row.state.as_str()).green()
            } else {
                style(row.state.as_str()).yellow()
            };
            let sdk = row
                .sdk
                .as_deref()
                .map(|s| format!("SDK {}", s))
                .unwrap_or_default();
            println!("  {:<24} {:<16} {}", row.serial, state, style(sdk).dim());
        }
        Ok(())
    }
}

/// Platform command options
pub struct PlatformCommand {
    pub config_file: Option<PathBuf>,
    pub overrides: ConfigOverrides,
    pub level: Option<String>,
    pub list: bool,
}

impl PlatformCommand {
    /// Execute the platform command
    pub async fn execute(self) -> Result<()> {
        let config = resolve(self.config_file.as_deref(), &self.overrides, None).await?;
        let resolver = PlatformResolver::new(&Toolchain::from_config(&config));

        if self.list {
            for level in resolver.installed_levels() {
                println!("android-{}", level);
            }
            return Ok(());
        }

        let Some(level) = self.level else {
            bail!("An API level is required");
        };
        let jar = resolver.resolve(&level).await?;
        println!("{}", jar.display());
        Ok(())
    }
}

/// Config command options
pub struct ConfigCommand {
    pub config_file: Option<PathBuf>,
    pub overrides: ConfigOverrides,
    pub init: bool,
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(self) -> Result<()> {
        let path = match &self.config_file {
            Some(path) => path.clone(),
            None => AppConfig::config_file().context("Cannot determine the config file location")?,
        };

        if self.init {
            if path.exists() {
                println!("  {} already exists", path.display());
            } else {
                AppConfig::default().save_to(&path).await?;
                println!("  {} {}", style("✓").green(), path.display());
            }
            return Ok(());
        }

        let config = AppConfig::load_from(&path).await?;
        println!("  {} {}", style("Config file").dim(), path.display());
        println!();
        print!("{}", toml::to_string_pretty(&config)?);
        println!();

        match config.resolve(&self.overrides, &current_dir()?) {
            Ok(resolved) => {
                println!("  {}", style("Effective settings").dim());
                println!("  sdk_root     = {}", resolved.sdk_root.display());
                println!("  java_home    = {}", resolved.java_home.display());
                println!(
                    "  kotlin_home  = {}",
                    resolved
                        .kotlin_home
                        .as_deref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(not set)".to_string())
                );
                println!("  dalvik_only  = {}", resolved.dalvik_only);
                println!(
                    "  timeout      = {}",
                    resolved
                        .tool_timeout
                        .map(|t| format!("{}s", t.as_secs()))
                        .unwrap_or_else(|| "none".to_string())
                );
            }
            Err(e) => println!("  {} {}", style("!").yellow().bold(), e.user_message()),
        }
        Ok(())
    }
}

//! Command-line definition

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use dalvikrun_core::ConfigOverrides;

use crate::commands::{ConfigCommand, DevicesCommand, PlatformCommand, RunCommand};

#[derive(Parser)]
#[command(name = "dalvikrun")]
#[command(version)]
#[command(about = "Compile Java/Kotlin sources and run them on attached Android devices")]
#[command(long_about = "Compiles the selected sources once per device API level, converts them \
to classes.dex with d8, pushes the dex to every matching device and runs the chosen main class \
with app_process or dalvikvm.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "DALVIKRUN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Android SDK root
    #[arg(long, global = true)]
    pub sdk: Option<PathBuf>,

    /// JDK used for javac, d8 and sdkmanager
    #[arg(long, global = true)]
    pub java_home: Option<PathBuf>,

    /// kotlinc distribution (contains bin/ and lib/)
    #[arg(long, global = true)]
    pub kotlin_home: Option<PathBuf>,

    /// Timeout in seconds for each tool call except the on-device run (0 disables)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the selected sources and run them on devices
    Run {
        /// Java/Kotlin files to compile (prompted for when omitted)
        files: Vec<PathBuf>,

        /// Target device serial; repeat for several (prompted for when omitted)
        #[arg(short = 's', long = "device")]
        devices: Vec<String>,

        /// Entry class, optionally followed by program arguments
        #[arg(short, long)]
        main_class: Option<String>,

        /// Run with dalvikvm instead of app_process
        #[arg(long)]
        dalvik_only: bool,

        /// Do not prompt: take every device and file, and the default main class
        #[arg(short, long)]
        yes: bool,

        /// Project directory holding the sources and the .dalvikrun build output
        #[arg(long)]
        project: Option<PathBuf>,
    },

    /// List attached devices
    Devices {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Resolve (downloading if needed) the android.jar for an API level
    Platform {
        /// API level, e.g. 34
        #[arg(required_unless_present = "list")]
        level: Option<String>,

        /// List installed platform levels instead
        #[arg(long)]
        list: bool,
    },

    /// Show the configuration file and the effective settings
    Config {
        /// Write a default configuration file if none exists
        #[arg(long)]
        init: bool,
    },
}

impl Cli {
    /// Filter directive for the log subscriber
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "dalvikrun=debug"
        } else if self.quiet {
            "dalvikrun=warn"
        } else {
            "dalvikrun=info"
        }
    }

    fn overrides(&self) -> ConfigOverrides {
        let dalvik_only = match &self.command {
            Commands::Run { dalvik_only: true, .. } => Some(true),
            _ => None,
        };
        ConfigOverrides {
            sdk_path: self.sdk.clone(),
            java_home: self.java_home.clone(),
            kotlin_home: self.kotlin_home.clone(),
            dalvik_only,
            timeout_secs: self.timeout,
        }
    }

    pub async fn execute(self) -> Result<()> {
        let overrides = self.overrides();
        let config_file = self.config.clone();

        match self.command {
            Commands::Run {
                files,
                devices,
                main_class,
                dalvik_only: _,
                yes,
                project,
            } => {
                RunCommand {
                    config_file,
                    overrides,
                    project_dir: project,
                    files,
                    devices,
                    main_class,
                    assume_yes: yes,
                }
                .execute()
                .await
            }
            Commands::Devices { json } => {
                DevicesCommand {
                    config_file,
                    overrides,
                    json,
                }
                .execute()
                .await
            }
            Commands::Platform { level, list } => {
                PlatformCommand {
                    config_file,
                    overrides,
                    level,
                    list,
                }
                .execute()
                .await
            }
            Commands::Config { init } => {
                ConfigCommand {
                    config_file,
                    overrides,
                    init,
                }
                .execute()
                .await
            }
        }
    }
}

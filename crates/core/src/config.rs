//! Application Configuration
//!
//! Settings live in a TOML file in the platform config directory. Values
//! left unset there fall back to the usual environment variables, and
//! command-line overrides win over both. `AppConfig::resolve` folds all of
//! that into one immutable `RunConfig` before any tool is started.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DalvikRunError, Result};
use crate::{BUILD_DIR_NAME, DEFAULT_MAIN_CLASS};

/// Android SDK configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AndroidConfig {
    /// Path to Android SDK
    pub sdk_path: Option<PathBuf>,
}

/// JDK configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JavaConfig {
    /// JAVA_HOME used for javac, d8 and sdkmanager
    pub home: Option<PathBuf>,
}

/// Kotlin compiler configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KotlinConfig {
    /// Root of a kotlinc distribution (contains `bin/` and `lib/`)
    pub home: Option<PathBuf>,
}

/// On-device execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Run with `dalvikvm` instead of `app_process`
    pub dalvik_only: bool,
    /// Entry class suggested at the prompt
    pub default_main_class: String,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            dalvik_only: false,
            default_main_class: DEFAULT_MAIN_CLASS.to_string(),
        }
    }
}

/// External tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Upper bound for every tool call except the on-device run. 0 disables.
    pub timeout_secs: u64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self { timeout_secs: 300 }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub android: AndroidConfig,
    pub java: JavaConfig,
    pub kotlin: KotlinConfig,
    pub run: RunSettings,
    pub tools: ToolSettings,
}

/// Values given on the command line; they win over the config file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub sdk_path: Option<PathBuf>,
    pub java_home: Option<PathBuf>,
    pub kotlin_home: Option<PathBuf>,
    pub dalvik_only: Option<bool>,
    pub timeout_secs: Option<u64>,
}

/// Resolved, immutable configuration for one invocation
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub project_dir: PathBuf,
    pub sdk_root: PathBuf,
    pub java_home: PathBuf,
    pub kotlin_home: Option<PathBuf>,
    pub dalvik_only: bool,
    pub default_main_class: String,
    pub tool_timeout: Option<Duration>,
}

impl RunConfig {
    /// Scratch directory owned by the pipeline
    pub fn build_dir(&self) -> PathBuf {
        self.project_dir.join(BUILD_DIR_NAME)
    }
}

/// Where configuration falls back to when the file leaves a value unset
pub trait ToolchainProbe {
    /// Environment variable lookup
    fn var(&self, key: &str) -> Option<OsString>;
    /// JDK home owning the `javac` found on PATH
    fn javac_home(&self) -> Option<PathBuf>;
    /// Conventional SDK install locations, in preference order
    fn sdk_candidates(&self) -> Vec<PathBuf>;
}

/// Probe backed by the real process environment
pub struct SystemProbe;

impl ToolchainProbe for SystemProbe {
    fn var(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key).filter(|v| !v.is_empty())
    }

    fn javac_home(&self) -> Option<PathBuf> {
        let javac = which::which("javac").ok()?;
        let javac = javac.canonicalize().unwrap_or(javac);
        // <home>/bin/javac
        javac.parent()?.parent().map(Path::to_path_buf)
    }

    fn sdk_candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if cfg!(windows) {
            if let Some(local) = dirs::data_local_dir() {
                candidates.push(local.join("Android").join("Sdk"));
            }
            candidates.push(PathBuf::from(r"C:\Android\sdk"));
        } else {
            if let Some(home) = dirs::home_dir() {
                candidates.push(home.join("Android").join("Sdk"));
                candidates.push(home.join("Library").join("Android").join("sdk"));
            }
            candidates.push(PathBuf::from("/opt/android-sdk"));
            candidates.push(PathBuf::from("/usr/local/android-sdk"));
        }
        candidates
    }
}

impl AppConfig {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("dev", "dalvikrun", "dalvikrun")
    }

    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the configuration file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    fn default_file() -> Result<PathBuf> {
        Self::config_file()
            .ok_or_else(|| DalvikRunError::Config("Cannot determine config path".into()))
    }

    /// Load configuration from the default location, or defaults if absent
    pub async fn load() -> Result<Self> {
        let config_file = Self::default_file()?;
        Self::load_from(&config_file).await
    }

    /// Load configuration from a specific file, or defaults if absent
    pub async fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading config from {:?}", path);
            let contents = tokio::fs::read_to_string(path).await?;
            Ok(toml::from_str(&contents)?)
        } else {
            debug!("Config file {:?} not found, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a specific file
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = toml::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;
        info!("Config saved to {:?}", path);
        Ok(())
    }

    /// Resolve against the real environment
    pub fn resolve(&self, overrides: &ConfigOverrides, project_dir: &Path) -> Result<RunConfig> {
        self.resolve_with(overrides, project_dir, &SystemProbe)
    }

    /// Fold file values, overrides and probe fallbacks into a `RunConfig`.
    ///
    /// Fails with `MissingConfiguration` when the SDK root or Java home
    /// cannot be determined, and with `Config` when a configured path does
    /// not exist.
    pub fn resolve_with(
        &self,
        overrides: &ConfigOverrides,
        project_dir: &Path,
        probe: &dyn ToolchainProbe,
    ) -> Result<RunConfig> {
        let sdk_root = overrides
            .sdk_path
            .clone()
            .or_else(|| self.android.sdk_path.clone())
            .or_else(|| probe.var("ANDROID_HOME").map(PathBuf::from))
            .or_else(|| probe.var("ANDROID_SDK_ROOT").map(PathBuf::from))
            .or_else(|| probe.sdk_candidates().into_iter().find(|p| p.is_dir()))
            .ok_or_else(|| DalvikRunError::MissingConfiguration("Android SDK path".into()))?;

        let java_home = overrides
            .java_home
            .clone()
            .or_else(|| self.java.home.clone())
            .or_else(|| probe.var("JAVA_HOME").map(PathBuf::from))
            .or_else(|| probe.javac_home())
            .ok_or_else(|| DalvikRunError::MissingConfiguration("Java home".into()))?;

        let kotlin_home = overrides
            .kotlin_home
            .clone()
            .or_else(|| self.kotlin.home.clone())
            .or_else(|| probe.var("KOTLIN_HOME").map(PathBuf::from));

        require_dir("Android SDK path", &sdk_root)?;
        require_dir("Java home", &java_home)?;
        if let Some(kotlin) = &kotlin_home {
            require_dir("Kotlin home", kotlin)?;
        }

        let timeout_secs = overrides.timeout_secs.unwrap_or(self.tools.timeout_secs);

        Ok(RunConfig {
            project_dir: project_dir.to_path_buf(),
            sdk_root,
            java_home,
            kotlin_home,
            dalvik_only: overrides.dalvik_only.unwrap_or(self.run.dalvik_only),
            default_main_class: self.run.default_main_class.clone(),
            tool_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        })
    }
}

fn require_dir(what: &str, path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(DalvikRunError::Config(format!(
            "{} {} does not exist",
            what,
            path.display()
        )))
    }
}

//! Toolchain paths
//!
//! Maps a resolved configuration onto the concrete tool locations inside
//! the SDK, the JDK and the Kotlin distribution.

use std::path::{Path, PathBuf};
use std::time::Duration;

use dalvikrun_core::process::{exe_name, script_name};
use dalvikrun_core::RunConfig;

use crate::env::ToolEnvironment;

/// Locations of every external tool the pipeline calls
#[derive(Debug, Clone)]
pub struct Toolchain {
    sdk_root: PathBuf,
    java_home: PathBuf,
    kotlin_home: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl Toolchain {
    pub fn new(sdk_root: PathBuf, java_home: PathBuf) -> Self {
        Self {
            sdk_root,
            java_home,
            kotlin_home: None,
            timeout: None,
        }
    }

    /// Build from a resolved configuration
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            sdk_root: config.sdk_root.clone(),
            java_home: config.java_home.clone(),
            kotlin_home: config.kotlin_home.clone(),
            timeout: config.tool_timeout,
        }
    }

    pub fn with_kotlin_home(mut self, path: PathBuf) -> Self {
        self.kotlin_home = Some(path);
        self
    }

    pub fn sdk_root(&self) -> &Path {
        &self.sdk_root
    }

    pub fn kotlin_home(&self) -> Option<&Path> {
        self.kotlin_home.as_deref()
    }

    /// Timeout applied to tool invocations
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// `<sdk>/platform-tools/adb`
    pub fn adb_path(&self) -> PathBuf {
        self.sdk_root.join("platform-tools").join(exe_name("adb"))
    }

    /// `<java_home>/bin/javac`
    pub fn javac_path(&self) -> PathBuf {
        self.java_home.join("bin").join(exe_name("javac"))
    }

    /// `<kotlin_home>/bin/kotlinc`, if a Kotlin home is configured
    pub fn kotlinc_path(&self) -> Option<PathBuf> {
        self.kotlin_home
            .as_ref()
            .map(|home| home.join("bin").join(script_name("kotlinc")))
    }

    /// `<kotlin_home>/lib/kotlin-stdlib.jar`, if a Kotlin home is configured
    pub fn kotlin_stdlib(&self) -> Option<PathBuf> {
        self.kotlin_home
            .as_ref()
            .map(|home| home.join("lib").join("kotlin-stdlib.jar"))
    }

    /// `<sdk>/build-tools`
    pub fn build_tools_dir(&self) -> PathBuf {
        self.sdk_root.join("build-tools")
    }

    /// `<sdk>/platforms/android-<level>/android.jar`
    pub fn platform_jar(&self, api_level: &str) -> PathBuf {
        self.sdk_root
            .join("platforms")
            .join(format!("android-{}", api_level))
            .join("android.jar")
    }

    /// Environment handed to JVM-based SDK tools
    pub fn environment(&self) -> ToolEnvironment {
        ToolEnvironment::new(&self.sdk_root, &self.java_home)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_paths() {
        let toolchain = Toolchain::new(PathBuf::from("/sdk"), PathBuf::from("/jdk"));

        assert_eq!(
            toolchain.platform_jar("34"),
            PathBuf::from("/sdk/platforms/android-34/android.jar")
        );
        assert_eq!(toolchain.build_tools_dir(), PathBuf::from("/sdk/build-tools"));
        assert!(toolchain.kotlinc_path().is_none());
        assert!(toolchain.kotlin_stdlib().is_none());

        let toolchain = toolchain.with_kotlin_home(PathBuf::from("/kotlinc"));
        assert_eq!(
            toolchain.kotlin_stdlib(),
            Some(PathBuf::from("/kotlinc/lib/kotlin-stdlib.jar"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_unix_executables() {
        let toolchain = Toolchain::new(PathBuf::from("/sdk"), PathBuf::from("/jdk"))
            .with_kotlin_home(PathBuf::from("/kotlinc"));
        assert_eq!(toolchain.adb_path(), PathBuf::from("/sdk/platform-tools/adb"));
        assert_eq!(toolchain.javac_path(), PathBuf::from("/jdk/bin/javac"));
        assert_eq!(toolchain.kotlinc_path(), Some(PathBuf::from("/kotlinc/bin/kotlinc")));
    }
}

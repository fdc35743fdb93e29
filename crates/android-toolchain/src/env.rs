//! Tool Environment
//!
//! Environment variables for child processes that run on the JVM
//! (d8, sdkmanager): `JAVA_HOME`, the SDK location, and a `PATH` with the
//! configured JDK's `bin` directory in front.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use dalvikrun_core::ToolCommand;
use tracing::debug;

/// Variables to set on a child process
#[derive(Debug, Clone)]
pub struct ToolEnvironment {
    vars: Vec<(String, OsString)>,
}

impl ToolEnvironment {
    pub fn new(sdk_root: &Path, java_home: &Path) -> Self {
        let original_path = std::env::var_os("PATH").unwrap_or_default();
        Self::with_base_path(sdk_root, java_home, original_path)
    }

    fn with_base_path(sdk_root: &Path, java_home: &Path, original_path: OsString) -> Self {
        let mut vars = vec![
            ("JAVA_HOME".to_string(), java_home.as_os_str().to_os_string()),
            ("ANDROID_HOME".to_string(), sdk_root.as_os_str().to_os_string()),
            ("ANDROID_SDK_ROOT".to_string(), sdk_root.as_os_str().to_os_string()),
        ];

        let mut entries: Vec<PathBuf> = vec![java_home.join("bin")];
        entries.extend(std::env::split_paths(&original_path));
        match std::env::join_paths(entries) {
            Ok(path) => vars.push(("PATH".to_string(), path)),
            Err(e) => debug!("Leaving PATH untouched: {}", e),
        }

        Self { vars }
    }

    /// Add or replace a variable
    pub fn set(mut self, key: &str, value: impl Into<OsString>) -> Self {
        let value = value.into();
        match self.vars.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.vars.push((key.to_string(), value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&OsString> {
        self.vars.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Apply every variable to a command
    pub fn apply(&self, mut cmd: ToolCommand) -> ToolCommand {
        for (key, value) in &self.vars {
            cmd = cmd.env(key, value);
        }
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_java_bin_prepended_to_path() {
        let base = std::env::join_paths([PathBuf::from("/usr/bin")]).unwrap();
        let env = ToolEnvironment::with_base_path(Path::new("/sdk"), Path::new("/jdk"), base);

        let path = env.get("PATH").unwrap();
        let entries: Vec<PathBuf> = std::env::split_paths(path).collect();
        assert_eq!(entries[0], PathBuf::from("/jdk").join("bin"));
        assert_eq!(entries[1], PathBuf::from("/usr/bin"));

        assert_eq!(env.get("JAVA_HOME").unwrap(), &OsString::from("/jdk"));
        assert_eq!(env.get("ANDROID_HOME").unwrap(), &OsString::from("/sdk"));
    }

    #[test]
    fn test_set_replaces_existing() {
        let env = ToolEnvironment::with_base_path(Path::new("/sdk"), Path::new("/jdk"), OsString::new())
            .set("JAVA_HOME", "/other")
            .set("SKIP_JDK_VERSION_CHECK", "true");

        assert_eq!(env.get("JAVA_HOME").unwrap(), &OsString::from("/other"));
        assert_eq!(env.get("SKIP_JDK_VERSION_CHECK").unwrap(), &OsString::from("true"));
    }
}

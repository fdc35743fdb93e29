//! Fake SDK tools for tests
//!
//! Builds a throwaway SDK / JDK / kotlinc layout in a temp directory and
//! fills it with small shell scripts standing in for adb, javac, kotlinc,
//! d8 and sdkmanager. Every script appends `<tool> <args...>` to a shared
//! call log so tests can assert what ran and what did not.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;

use crate::config::RunConfig;
use crate::DEFAULT_MAIN_CLASS;

/// Default javac: writes one empty `.class` per `.java` argument into `-d`.
pub const JAVAC_OK: &str = r#"
out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "-d" ]; then out="$a"; fi
  prev="$a"
done
for a in "$@"; do
  case "$a" in
    *.java) n=$(basename "$a" .java); mkdir -p "$out"; : > "$out/$n.class" ;;
  esac
done
"#;

/// Default kotlinc: writes `<Name>Kt.class` per `.kt` argument into `-d`.
pub const KOTLINC_OK: &str = r#"
out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "-d" ]; then out="$a"; fi
  prev="$a"
done
for a in "$@"; do
  case "$a" in
    *.kt) n=$(basename "$a" .kt); mkdir -p "$out"; : > "$out/${n}Kt.class" ;;
  esac
done
"#;

/// Default d8: writes `classes.dex` into `--output`.
pub const D8_OK: &str = r#"
out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "--output" ]; then out="$a"; fi
  prev="$a"
done
: > "$out/classes.dex"
"#;

/// Script body that prints to stderr and fails
pub fn failing(message: &str) -> String {
    format!("echo '{}' >&2\nexit 1\n", message.replace('\'', r"'\''"))
}

/// Scripted adb behaviour
#[derive(Debug, Clone, Default)]
pub struct FakeAdb {
    /// Raw `adb devices` output
    pub devices_output: String,
    /// serial -> answer to `getprop ro.build.version.sdk`; unknown serials fail
    pub sdk_levels: Vec<(String, String)>,
    /// Serials whose `push` fails
    pub failing_push: Vec<String>,
}

impl FakeAdb {
    /// adb reporting the given ready devices with their SDK levels
    pub fn with_devices(devices: &[(&str, &str)]) -> Self {
        let mut output = String::from("List of devices attached\n");
        for (serial, _) in devices {
            output.push_str(&format!("{}\tdevice\n", serial));
        }
        output.push('\n');
        Self {
            devices_output: output,
            sdk_levels: devices
                .iter()
                .map(|(s, l)| (s.to_string(), l.to_string()))
                .collect(),
            failing_push: Vec::new(),
        }
    }

    pub fn fail_push(mut self, serial: &str) -> Self {
        self.failing_push.push(serial.to_string());
        self
    }

    /// Shell body implementing this behaviour
    pub fn script(&self) -> String {
        let mut sdk_cases = String::new();
        for (serial, level) in &self.sdk_levels {
            sdk_cases.push_str(&format!("        {}) echo '{}' ;;\n", serial, level));
        }
        let mut push_cases = String::new();
        for serial in &self.failing_push {
            push_cases.push_str(&format!(
                "        {}) echo 'adb: error: failed to copy' >&2; exit 1 ;;\n",
                serial
            ));
        }

        format!(
            r#"
if [ "$1" = "devices" ]; then
  printf '%s' '{devices}'
  exit 0
fi
if [ "$1" = "-s" ]; then
  serial="$2"
  shift 2
  case "$1" in
    push)
      case "$serial" in
{push_cases}        *) echo "$2: 1 file pushed" ;;
      esac ;;
    shell)
      shift
      case "$*" in
        "getprop ro.build.version.sdk")
          case "$serial" in
{sdk_cases}        *) echo "error: device '$serial' not found" >&2; exit 1 ;;
          esac ;;
        *) echo "ran on $serial: $*" ;;
      esac ;;
  esac
fi
"#,
            devices = self.devices_output,
            push_cases = push_cases,
            sdk_cases = sdk_cases,
        )
    }
}

/// A fake SDK, JDK, kotlinc and project inside one temp directory
pub struct FakeToolchain {
    _root: TempDir,
    pub sdk_root: PathBuf,
    pub java_home: PathBuf,
    pub kotlin_home: PathBuf,
    pub project_dir: PathBuf,
    log: PathBuf,
}

impl FakeToolchain {
    /// Empty layout: directories exist, no tools installed
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        let base = root.path().to_path_buf();
        let toolchain = Self {
            sdk_root: base.join("sdk"),
            java_home: base.join("jdk"),
            kotlin_home: base.join("kotlinc"),
            project_dir: base.join("project"),
            log: base.join("calls.log"),
            _root: root,
        };
        for dir in [
            &toolchain.sdk_root,
            &toolchain.java_home,
            &toolchain.kotlin_home,
            &toolchain.project_dir,
        ] {
            std::fs::create_dir_all(dir).expect("create fake layout");
        }
        toolchain
    }

    /// Layout with javac, kotlinc (+ stdlib), d8 in build-tools 33.0.1
    /// and the given adb behaviour.
    pub fn standard(adb: &FakeAdb) -> Self {
        let toolchain = Self::new();
        toolchain.install_adb(adb);
        toolchain.install_javac(JAVAC_OK);
        toolchain.install_kotlinc(KOTLINC_OK);
        toolchain.install_d8("33.0.1", D8_OK);
        toolchain
    }

    /// Write an executable script that logs its invocation, then runs `body`
    pub fn script(&self, path: &Path, body: &str) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create script dir");
        }
        let text = format!(
            "#!/bin/sh\necho \"{} $*\" >> '{}'\n{}",
            name,
            self.log.display(),
            body
        );
        std::fs::write(path, text).expect("write script");
        let mut perms = std::fs::metadata(path).expect("stat script").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).expect("chmod script");
        path.to_path_buf()
    }

    pub fn install_adb(&self, adb: &FakeAdb) -> PathBuf {
        self.script(
            &self.sdk_root.join("platform-tools").join("adb"),
            &adb.script(),
        )
    }

    pub fn install_javac(&self, body: &str) -> PathBuf {
        self.script(&self.java_home.join("bin").join("javac"), body)
    }

    pub fn install_kotlinc(&self, body: &str) -> PathBuf {
        std::fs::create_dir_all(self.kotlin_home.join("lib")).expect("create kotlin lib");
        std::fs::write(self.kotlin_home.join("lib").join("kotlin-stdlib.jar"), b"")
            .expect("write stdlib");
        self.script(&self.kotlin_home.join("bin").join("kotlinc"), body)
    }

    pub fn install_d8(&self, version: &str, body: &str) -> PathBuf {
        self.script(
            &self.sdk_root.join("build-tools").join(version).join("d8"),
            body,
        )
    }

    pub fn install_sdkmanager(&self, body: &str) -> PathBuf {
        self.script(
            &self
                .sdk_root
                .join("cmdline-tools")
                .join("latest")
                .join("bin")
                .join("sdkmanager"),
            body,
        )
    }

    /// Pretend a platform is already downloaded
    pub fn install_platform(&self, level: &str) -> PathBuf {
        let dir = self.sdk_root.join("platforms").join(format!("android-{}", level));
        std::fs::create_dir_all(&dir).expect("create platform dir");
        let jar = dir.join("android.jar");
        std::fs::write(&jar, b"").expect("write android.jar");
        jar
    }

    /// Shell snippet that installs a platform jar, for sdkmanager bodies
    pub fn platform_install_snippet(&self, level: &str) -> String {
        let dir = self.sdk_root.join("platforms").join(format!("android-{}", level));
        format!(
            "mkdir -p '{dir}' && : > '{dir}/android.jar'\n",
            dir = dir.display()
        )
    }

    /// Create a source file under the project directory
    pub fn source(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.project_dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create source dir");
        }
        std::fs::write(&path, contents).expect("write source");
        path
    }

    /// Every logged invocation, in order
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(&self.log)
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Logged invocations of one tool
    pub fn calls_to(&self, tool: &str) -> Vec<String> {
        let prefix = format!("{} ", tool);
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(&prefix) || c == tool)
            .collect()
    }

    /// A resolved configuration pointing at this layout
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            project_dir: self.project_dir.clone(),
            sdk_root: self.sdk_root.clone(),
            java_home: self.java_home.clone(),
            kotlin_home: Some(self.kotlin_home.clone()),
            dalvik_only: false,
            default_main_class: DEFAULT_MAIN_CLASS.to_string(),
            tool_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl Default for FakeToolchain {
    fn default() -> Self {
        Self::new()
    }
}

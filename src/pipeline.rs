//! Run pipeline
//!
//! enumerate -> select devices -> select files -> classify, then per API
//! level: resolve platform -> compile -> dex -> push -> ask entry class ->
//! run. Levels are handled one after another because they share the
//! project's build directory; pushes inside a level run concurrently.

use std::fmt;
use std::path::{Path, PathBuf};

use dalvikrun_android_toolchain::{PlatformResolver, Toolchain};
use dalvikrun_build_engine::{BuildError, BuildRunner, Deployer, ExecutionMode, SourceSet, Stage};
use dalvikrun_core::{DalvikRunError, Result, RunConfig};
use dalvikrun_device_bridge::{classify, AdbClient, SdkGroups};
use tracing::{info, warn};

use crate::host::Host;

/// What to run, and where
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Source files; empty means ask the host
    pub files: Vec<PathBuf>,
    /// Device serials; empty means ask the host
    pub devices: Vec<String>,
    /// Entry class (plus arguments) used for every device instead of asking
    pub main_class: Option<String>,
}

/// Where a group stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedStage {
    Platform,
    Setup,
    Tool(Stage),
}

impl fmt::Display for FailedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailedStage::Platform => f.write_str("Platform download"),
            FailedStage::Setup => f.write_str("Build setup"),
            FailedStage::Tool(stage) => write!(f, "{}", stage),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: FailedStage,
    pub message: String,
}

impl From<BuildError> for StageFailure {
    fn from(err: BuildError) -> Self {
        let stage = err.stage().map_or(FailedStage::Setup, FailedStage::Tool);
        Self {
            stage,
            message: err.to_string(),
        }
    }
}

/// Result for one device of a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceOutcome {
    Ran { output: String },
    PushFailed(String),
    RunFailed(String),
    /// No entry class given
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceReport {
    pub serial: String,
    pub outcome: DeviceOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupResult {
    /// The group never reached its devices
    Failed(StageFailure),
    Deployed(Vec<DeviceReport>),
}

/// Result for one API level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReport {
    pub level: String,
    pub devices: Vec<String>,
    pub result: GroupResult,
}

impl GroupReport {
    pub fn device_reports(&self) -> &[DeviceReport] {
        match &self.result {
            GroupResult::Deployed(reports) => reports,
            GroupResult::Failed(_) => &[],
        }
    }
}

/// Result of a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub groups: Vec<GroupReport>,
}

impl RunReport {
    /// Nothing was attempted (no devices, empty selection)
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group(&self, level: &str) -> Option<&GroupReport> {
        self.groups.iter().find(|g| g.level == level)
    }

    pub fn device(&self, serial: &str) -> Option<&DeviceReport> {
        self.groups
            .iter()
            .flat_map(GroupReport::device_reports)
            .find(|d| d.serial == serial)
    }

    /// Devices whose program ran to completion
    pub fn ran_count(&self) -> usize {
        self.groups
            .iter()
            .flat_map(GroupReport::device_reports)
            .filter(|d| matches!(d.outcome, DeviceOutcome::Ran { .. }))
            .count()
    }

    /// True when some group or device failed. Skipped devices do not count.
    pub fn has_failures(&self) -> bool {
        self.groups.iter().any(|g| match &g.result {
            GroupResult::Failed(_) => true,
            GroupResult::Deployed(reports) => reports.iter().any(|d| {
                matches!(
                    d.outcome,
                    DeviceOutcome::PushFailed(_) | DeviceOutcome::RunFailed(_)
                )
            }),
        })
    }
}

/// One invocation of the run pipeline
pub struct Pipeline<'a> {
    config: RunConfig,
    toolchain: Toolchain,
    adb: AdbClient,
    host: &'a dyn Host,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: RunConfig, host: &'a dyn Host) -> Self {
        let toolchain = Toolchain::from_config(&config);
        let adb = AdbClient::with_adb_path(toolchain.adb_path()).with_timeout(toolchain.timeout());
        Self {
            config,
            toolchain,
            adb,
            host,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::from_dalvik_only(self.config.dalvik_only)
    }

    /// Kotlin sources need a Kotlin home; fail before any tool runs
    fn check_sources(&self, sources: &SourceSet) -> Result<()> {
        if sources.has_kotlin() && self.toolchain.kotlin_home().is_none() {
            return Err(DalvikRunError::MissingConfiguration("Kotlin home".into()));
        }
        Ok(())
    }

    /// `None` when nothing is attached at all
    async fn select_devices(&self, requested: &[String]) -> Result<Option<Vec<String>>> {
        let ready = self
            .adb
            .ready_devices()
            .await
            .map_err(|e| DalvikRunError::Device(Box::new(e)))?;

        if ready.is_empty() {
            self.host.info("No devices detected.");
            return Ok(None);
        }

        if !requested.is_empty() {
            let mut chosen = Vec::new();
            for serial in requested {
                if ready.contains(serial) {
                    if !chosen.contains(serial) {
                        chosen.push(serial.clone());
                    }
                } else {
                    self.host
                        .warn(&format!("Device {} is not attached or not ready; ignoring it", serial));
                }
            }
            return Ok(Some(chosen));
        }

        let picked = self
            .host
            .select("Select target device(s)", &ready, true)
            .unwrap_or_default();
        Ok(Some(
            picked.into_iter().filter_map(|i| ready.get(i).cloned()).collect(),
        ))
    }

    fn select_files(&self) -> SourceSet {
        let candidates = self.host.candidate_files(&self.config.project_dir);
        if candidates.is_empty() {
            return SourceSet::default();
        }
        let labels: Vec<String> = candidates
            .iter()
            .map(|p| relative_label(&self.config.project_dir, p))
            .collect();
        let picked = self
            .host
            .select("Select Java/Kotlin files to compile", &labels, false)
            .unwrap_or_default();
        SourceSet::from_paths(picked.into_iter().filter_map(|i| candidates.get(i).cloned()))
    }

    /// Run the whole pipeline.
    ///
    /// Errors are reserved for problems that stop every group (missing
    /// configuration, adb unusable). Anything that goes wrong inside one
    /// group ends up in that group's report.
    pub async fn run(&self, request: &RunRequest) -> Result<RunReport> {
        let preselected = (!request.files.is_empty()).then(|| SourceSet::from_paths(request.files.iter().cloned()));
        if let Some(sources) = &preselected {
            self.check_sources(sources)?;
        }

        let Some(devices) = self.select_devices(&request.devices).await? else {
            return Ok(RunReport::default());
        };
        if devices.is_empty() {
            self.host.info("No devices selected.");
            return Ok(RunReport::default());
        }

        let sources = match preselected {
            Some(sources) => sources,
            None => self.select_files(),
        };
        if sources.is_empty() {
            self.host.error("No Java/Kotlin files selected.");
            return Ok(RunReport::default());
        }
        self.check_sources(&sources)?;

        let groups = classify(&self.adb, &devices).await;
        if groups.is_empty() {
            self.host.error("No devices with a valid SDK found.");
            return Ok(RunReport::default());
        }
        for serial in devices.iter().filter(|s| !contains_device(&groups, s)) {
            self.host
                .warn(&format!("Could not read the SDK version of {}; skipping it", serial));
        }

        let mut report = RunReport::default();
        for (level, serials) in &groups {
            let result = self.run_group(level, serials, &sources, request).await;
            report.groups.push(GroupReport {
                level: level.clone(),
                devices: serials.clone(),
                result,
            });
        }
        Ok(report)
    }

    async fn run_group(
        &self,
        level: &str,
        serials: &[String],
        sources: &SourceSet,
        request: &RunRequest,
    ) -> GroupResult {
        info!("SDK {}: {} device(s)", level, serials.len());

        let resolver = PlatformResolver::new(&self.toolchain);
        if resolver.cached(level).is_none() {
            self.host
                .info(&format!("Downloading android-{} using sdkmanager...", level));
        }
        let platform_jar = match resolver.resolve(level).await {
            Ok(jar) => jar,
            Err(e) => {
                self.host.error(&e.to_string());
                return GroupResult::Failed(StageFailure {
                    stage: FailedStage::Platform,
                    message: e.to_string(),
                });
            }
        };

        self.host.info(&format!("Compiling files for SDK {}...", level));
        let runner = BuildRunner::for_project(&self.toolchain, &self.config.project_dir);
        let output = match runner.build(sources, &platform_jar).await {
            Ok(output) => output,
            Err(e) => {
                let failure = StageFailure::from(e);
                self.host.error(&failure.message);
                return GroupResult::Failed(failure);
            }
        };
        self.host.info(&format!(
            "Compiled successfully to {}",
            output.dex_path.display()
        ));

        let deployer = Deployer::new(self.adb.clone(), self.execution_mode());
        let pushes = deployer.push_all(&output.dex_path, serials).await;

        let mut reports = Vec::with_capacity(pushes.len());
        for (serial, pushed) in pushes {
            let outcome = match pushed {
                Err(e) => {
                    let message = format!("Failed to push to device {}: {}", serial, e);
                    warn!("{}", message);
                    self.host.error(&message);
                    DeviceOutcome::PushFailed(e.to_string())
                }
                Ok(()) => self.run_on_device(&deployer, serial, request).await,
            };
            reports.push(DeviceReport {
                serial: serial.to_string(),
                outcome,
            });
        }
        GroupResult::Deployed(reports)
    }

    fn entry_class(&self, serial: &str, request: &RunRequest) -> Option<String> {
        let entry = match &request.main_class {
            Some(class) => Some(class.clone()),
            None => self.host.prompt_text(
                &format!("Main class to run on {} (e.g., com.example.Main)", serial),
                &self.config.default_main_class,
            ),
        };
        entry
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    async fn run_on_device(&self, deployer: &Deployer, serial: &str, request: &RunRequest) -> DeviceOutcome {
        let Some(main) = self.entry_class(serial, request) else {
            self.host
                .warn(&format!("Main class is required; not running on {}", serial));
            return DeviceOutcome::Skipped;
        };

        let host = self.host;
        match deployer
            .run(serial, &main, |line| host.device_output(serial, line))
            .await
        {
            Ok(output) => DeviceOutcome::Ran { output },
            Err(e) => {
                let message = format!("Run failed on {}: {}", serial, e);
                self.host.error(&message);
                DeviceOutcome::RunFailed(e.to_string())
            }
        }
    }
}

fn contains_device(groups: &SdkGroups, serial: &str) -> bool {
    groups.iter().any(|(_, devices)| devices.iter().any(|d| d == serial))
}

fn relative_label(project: &Path, path: &Path) -> String {
    path.strip_prefix(project)
        .unwrap_or(path)
        .display()
        .to_string()
}

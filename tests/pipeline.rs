//! End-to-end runs of the pipeline against fake SDK tools
#![cfg(unix)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dalvikrun::build::Stage;
use dalvikrun::core::testing::{failing, FakeAdb, FakeToolchain};
use dalvikrun::core::DalvikRunError;
use dalvikrun::{DeviceOutcome, FailedStage, GroupResult, Host, Pipeline, RunRequest};

/// Host answering prompts from queues and recording what it was told
#[derive(Default)]
struct ScriptedHost {
    files: Vec<PathBuf>,
    /// Answers to `select`; select everything once exhausted
    selections: Mutex<VecDeque<Option<Vec<usize>>>>,
    /// Answers to `prompt_text`; take the default once exhausted
    answers: Mutex<VecDeque<Option<String>>>,
    messages: Mutex<Vec<String>>,
    output: Mutex<Vec<(String, String)>>,
}

impl ScriptedHost {
    fn with_files(files: Vec<PathBuf>) -> Self {
        Self {
            files,
            ..Self::default()
        }
    }

    fn select_next(self, answer: Option<Vec<usize>>) -> Self {
        self.selections.lock().unwrap().push_back(answer);
        self
    }

    fn answer_next(self, answer: Option<&str>) -> Self {
        self.answers
            .lock()
            .unwrap()
            .push_back(answer.map(str::to_string));
        self
    }

    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    fn output_of(&self, serial: &str) -> Vec<String> {
        self.output
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| s == serial)
            .map(|(_, line)| line.clone())
            .collect()
    }
}

impl Host for ScriptedHost {
    fn candidate_files(&self, _project: &Path) -> Vec<PathBuf> {
        self.files.clone()
    }

    fn select(&self, _prompt: &str, items: &[String], _default_all: bool) -> Option<Vec<usize>> {
        self.selections
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Some((0..items.len()).collect()))
    }

    fn prompt_text(&self, _prompt: &str, default: &str) -> Option<String> {
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Some(default.to_string()))
    }

    fn info(&self, message: &str) {
        self.messages.lock().unwrap().push(format!("info: {}", message));
    }

    fn warn(&self, message: &str) {
        self.messages.lock().unwrap().push(format!("warn: {}", message));
    }

    fn error(&self, message: &str) {
        self.messages.lock().unwrap().push(format!("error: {}", message));
    }

    fn device_output(&self, serial: &str, line: &str) {
        self.output
            .lock()
            .unwrap()
            .push((serial.to_string(), line.to_string()));
    }
}

fn app_process(class: &str) -> String {
    format!(
        "app_process -Djava.class.path=/data/local/tmp/classes.dex /system/bin {}",
        class
    )
}

#[tokio::test]
async fn single_device_runs_with_app_process() {
    let fake = FakeToolchain::standard(&FakeAdb::with_devices(&[("emulator-5554", "34")]));
    fake.install_platform("34");
    let main = fake.source("src/Main.java", "class Main {}");
    let host = ScriptedHost::default();
    let request = RunRequest {
        files: vec![main.clone()],
        ..RunRequest::default()
    };

    let report = Pipeline::new(fake.run_config(), &host).run(&request).await.unwrap();

    assert_eq!(report.groups.len(), 1);
    let device = report.device("emulator-5554").unwrap();
    let expected = format!("ran on emulator-5554: {}", app_process("com.example.Main"));
    assert_eq!(
        device.outcome,
        DeviceOutcome::Ran {
            output: format!("{}\n", expected)
        }
    );
    assert_eq!(host.output_of("emulator-5554"), vec![expected]);
    assert!(!report.has_failures());

    let dex = fake.project_dir.join(".dalvikrun").join("classes.dex");
    let jar = fake.sdk_root.join("platforms/android-34/android.jar");
    assert_eq!(
        fake.calls(),
        vec![
            "adb devices".to_string(),
            "adb -s emulator-5554 shell getprop ro.build.version.sdk".to_string(),
            format!(
                "javac -classpath {} -d {} {}",
                jar.display(),
                fake.project_dir.join(".dalvikrun/classes").display(),
                main.display()
            ),
            format!(
                "d8 --output {} {}",
                fake.project_dir.join(".dalvikrun").display(),
                fake.project_dir.join(".dalvikrun/classes/Main.class").display()
            ),
            format!(
                "adb -s emulator-5554 push {} /data/local/tmp/classes.dex",
                dex.display()
            ),
            format!("adb -s emulator-5554 shell {}", app_process("com.example.Main")),
        ]
    );
}

#[tokio::test]
async fn each_sdk_level_gets_its_own_build() {
    let fake = FakeToolchain::standard(&FakeAdb::with_devices(&[
        ("emulator-5554", "30"),
        ("emulator-5556", "34"),
    ]));
    fake.install_platform("34");
    fake.install_sdkmanager(&fake.platform_install_snippet("30"));
    let main = fake.source("Main.java", "class Main {}");
    let host = ScriptedHost::default();
    let request = RunRequest {
        files: vec![main],
        main_class: Some("com.example.Main".into()),
        ..RunRequest::default()
    };

    let report = Pipeline::new(fake.run_config(), &host).run(&request).await.unwrap();

    let levels: Vec<&str> = report.groups.iter().map(|g| g.level.as_str()).collect();
    assert_eq!(levels, vec!["30", "34"]);
    assert_eq!(report.group("30").unwrap().devices, vec!["emulator-5554"]);
    assert_eq!(report.group("34").unwrap().devices, vec!["emulator-5556"]);
    assert_eq!(report.ran_count(), 2);

    let javac = fake.calls_to("javac");
    assert_eq!(javac.len(), 2);
    assert!(javac[0].contains("android-30/android.jar"));
    assert!(javac[1].contains("android-34/android.jar"));
    assert_eq!(fake.calls_to("d8").len(), 2);
    assert_eq!(fake.calls_to("sdkmanager"), vec!["sdkmanager platforms;android-30"]);

    let pushes: Vec<String> = fake
        .calls_to("adb")
        .into_iter()
        .filter(|c| c.contains(" push "))
        .collect();
    assert_eq!(pushes.len(), 2);
    assert!(pushes[0].starts_with("adb -s emulator-5554 push "));
    assert!(pushes[1].starts_with("adb -s emulator-5556 push "));

    assert!(host
        .messages()
        .contains(&"info: Downloading android-30 using sdkmanager...".to_string()));
}

#[tokio::test]
async fn kotlin_without_kotlin_home_fails_before_any_tool() {
    let fake = FakeToolchain::standard(&FakeAdb::with_devices(&[("emulator-5554", "34")]));
    fake.install_platform("34");
    let mut config = fake.run_config();
    config.kotlin_home = None;
    let host = ScriptedHost::default();
    let request = RunRequest {
        files: vec![
            fake.source("Main.java", "class Main {}"),
            fake.source("Util.kt", "fun util() {}"),
        ],
        ..RunRequest::default()
    };

    let err = Pipeline::new(config, &host).run(&request).await.unwrap_err();

    assert!(matches!(err, DalvikRunError::MissingConfiguration(ref what) if what == "Kotlin home"));
    assert!(err.is_precondition());
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn kotlin_picked_interactively_still_stops_before_compiling() {
    let fake = FakeToolchain::standard(&FakeAdb::with_devices(&[("emulator-5554", "34")]));
    fake.install_platform("34");
    let mut config = fake.run_config();
    config.kotlin_home = None;
    let host = ScriptedHost::with_files(vec![fake.source("Util.kt", "fun util() {}")]);

    let err = Pipeline::new(config, &host)
        .run(&RunRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(err, DalvikRunError::MissingConfiguration(_)));
    assert_eq!(fake.calls(), vec!["adb devices"]);
}

#[tokio::test]
async fn cancelled_entry_class_skips_only_that_device() {
    let fake = FakeToolchain::standard(&FakeAdb::with_devices(&[
        ("emulator-5554", "34"),
        ("R58M12345", "34"),
    ]));
    fake.install_platform("34");
    let host = ScriptedHost::default()
        .answer_next(None)
        .answer_next(Some("com.example.Torch off"));
    let request = RunRequest {
        files: vec![fake.source("Main.java", "class Main {}")],
        ..RunRequest::default()
    };

    let report = Pipeline::new(fake.run_config(), &host).run(&request).await.unwrap();

    assert_eq!(
        report.device("emulator-5554").unwrap().outcome,
        DeviceOutcome::Skipped
    );
    assert!(matches!(
        report.device("R58M12345").unwrap().outcome,
        DeviceOutcome::Ran { .. }
    ));
    assert!(!report.has_failures());

    let adb = fake.calls_to("adb");
    assert_eq!(adb.iter().filter(|c| c.contains(" push ")).count(), 2);
    assert!(!adb.iter().any(|c| c.starts_with("adb -s emulator-5554 shell app_process")));
    assert!(adb.contains(&format!(
        "adb -s R58M12345 shell {}",
        app_process("com.example.Torch off")
    )));
}

#[tokio::test]
async fn failed_push_does_not_stop_siblings() {
    let fake = FakeToolchain::standard(
        &FakeAdb::with_devices(&[("emulator-5554", "34"), ("R58M12345", "34")]).fail_push("emulator-5554"),
    );
    fake.install_platform("34");
    let host = ScriptedHost::default();
    let mut config = fake.run_config();
    config.dalvik_only = true;
    let request = RunRequest {
        files: vec![fake.source("Main.java", "class Main {}")],
        main_class: Some("com.example.Main".into()),
        ..RunRequest::default()
    };

    let report = Pipeline::new(config, &host).run(&request).await.unwrap();

    assert!(matches!(
        report.device("emulator-5554").unwrap().outcome,
        DeviceOutcome::PushFailed(ref e) if e.contains("failed to copy")
    ));
    assert!(matches!(
        report.device("R58M12345").unwrap().outcome,
        DeviceOutcome::Ran { .. }
    ));
    assert!(report.has_failures());
    assert!(fake.calls_to("adb").contains(
        &"adb -s R58M12345 shell dalvikvm -cp /data/local/tmp/classes.dex com.example.Main".to_string()
    ));
    assert!(host
        .messages()
        .iter()
        .any(|m| m.starts_with("error: Failed to push to device emulator-5554")));
}

#[tokio::test]
async fn compile_failure_ends_the_group_before_deploying() {
    let fake = FakeToolchain::standard(&FakeAdb::with_devices(&[("emulator-5554", "34")]));
    fake.install_platform("34");
    fake.install_javac(&failing("Main.java:1: error: ';' expected"));
    let host = ScriptedHost::default();
    let request = RunRequest {
        files: vec![fake.source("Main.java", "class Main {")],
        ..RunRequest::default()
    };

    let report = Pipeline::new(fake.run_config(), &host).run(&request).await.unwrap();

    match &report.group("34").unwrap().result {
        GroupResult::Failed(failure) => {
            assert_eq!(failure.stage, FailedStage::Tool(Stage::Java));
            assert!(failure.message.ends_with("Main.java:1: error: ';' expected"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(fake.calls_to("d8").is_empty());
    assert!(!fake.calls_to("adb").iter().any(|c| c.contains(" push ")));
}

#[tokio::test]
async fn platform_download_failure_is_reported_per_group() {
    let fake = FakeToolchain::standard(&FakeAdb::with_devices(&[("emulator-5554", "30")]));
    fake.install_sdkmanager(&failing("Failed to find package 'platforms;android-30'"));
    let host = ScriptedHost::default();
    let request = RunRequest {
        files: vec![fake.source("Main.java", "class Main {}")],
        ..RunRequest::default()
    };

    let report = Pipeline::new(fake.run_config(), &host).run(&request).await.unwrap();

    match &report.group("30").unwrap().result {
        GroupResult::Failed(failure) => {
            assert_eq!(failure.stage, FailedStage::Platform);
            assert!(failure
                .message
                .contains("Failed to find package 'platforms;android-30'"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(fake.calls_to("javac").is_empty());
}

#[tokio::test]
async fn failed_group_does_not_block_the_next_level() {
    let fake = FakeToolchain::standard(&FakeAdb::with_devices(&[
        ("emulator-5554", "30"),
        ("emulator-5556", "34"),
    ]));
    fake.install_platform("34");
    fake.install_sdkmanager(&failing("Failed to find package"));
    let host = ScriptedHost::default();
    let request = RunRequest {
        files: vec![fake.source("Main.java", "class Main {}")],
        main_class: Some("com.example.Main".into()),
        ..RunRequest::default()
    };

    let report = Pipeline::new(fake.run_config(), &host).run(&request).await.unwrap();

    match &report.group("30").unwrap().result {
        GroupResult::Failed(failure) => {
            assert_eq!(failure.stage, FailedStage::Platform);
            assert!(failure.message.contains("Failed to find package"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(
        report.device("emulator-5556").unwrap().outcome,
        DeviceOutcome::Ran { .. }
    ));
    assert!(report.device("emulator-5554").is_none());
    assert!(report.has_failures());

    let javac = fake.calls_to("javac");
    assert_eq!(javac.len(), 1);
    assert!(javac[0].contains("android-34/android.jar"));
    let pushes: Vec<String> = fake
        .calls_to("adb")
        .into_iter()
        .filter(|c| c.contains(" push "))
        .collect();
    assert_eq!(pushes.len(), 1);
    assert!(pushes[0].starts_with("adb -s emulator-5556 push "));
}

#[tokio::test]
async fn no_devices_is_not_an_error() {
    let fake = FakeToolchain::standard(&FakeAdb::default());
    let host = ScriptedHost::default();

    let report = Pipeline::new(fake.run_config(), &host)
        .run(&RunRequest::default())
        .await
        .unwrap();

    assert!(report.is_empty());
    assert_eq!(host.messages(), vec!["info: No devices detected."]);
}

#[tokio::test]
async fn deselecting_every_device_is_reported_once() {
    let fake = FakeToolchain::standard(&FakeAdb::with_devices(&[("emulator-5554", "34")]));
    let host = ScriptedHost::default().select_next(Some(Vec::new()));

    let report = Pipeline::new(fake.run_config(), &host)
        .run(&RunRequest::default())
        .await
        .unwrap();

    assert!(report.is_empty());
    assert_eq!(host.messages(), vec!["info: No devices selected."]);
    assert_eq!(fake.calls(), vec!["adb devices"]);
}

#[tokio::test]
async fn missing_adb_is_a_device_error() {
    let fake = FakeToolchain::new();
    let host = ScriptedHost::default();

    let err = Pipeline::new(fake.run_config(), &host)
        .run(&RunRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(err, DalvikRunError::Device(_)));
    assert!(!err.is_precondition());
    let source = std::error::Error::source(&err).map(|s| s.to_string());
    assert!(source.is_some_and(|s| s.starts_with("adb not found at")));
    assert!(host.messages().is_empty());
}

#[tokio::test]
async fn empty_file_selection_cancels_quietly() {
    let fake = FakeToolchain::standard(&FakeAdb::with_devices(&[("emulator-5554", "34")]));
    let host = ScriptedHost::with_files(vec![fake.source("Main.java", "class Main {}")])
        .select_next(Some(vec![0]))
        .select_next(Some(Vec::new()));

    let report = Pipeline::new(fake.run_config(), &host)
        .run(&RunRequest::default())
        .await
        .unwrap();

    assert!(report.is_empty());
    assert_eq!(fake.calls(), vec!["adb devices"]);
}

#[tokio::test]
async fn unknown_requested_device_is_ignored() {
    let fake = FakeToolchain::standard(&FakeAdb::with_devices(&[("emulator-5554", "34")]));
    fake.install_platform("34");
    let host = ScriptedHost::default();
    let request = RunRequest {
        files: vec![fake.source("Main.java", "class Main {}")],
        devices: vec!["emulator-5554".into(), "ghost".into()],
        main_class: Some("com.example.Main".into()),
    };

    let report = Pipeline::new(fake.run_config(), &host).run(&request).await.unwrap();

    assert_eq!(report.ran_count(), 1);
    assert!(report.device("ghost").is_none());
    assert!(host.messages().iter().any(|m| m.starts_with("warn: Device ghost")));
}

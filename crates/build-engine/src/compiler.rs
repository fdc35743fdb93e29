//! Source compiler
//!
//! Compiles Kotlin first, then Java, into the same class directory against
//! the platform library of one API level.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use dalvikrun_android_toolchain::Toolchain;
use dalvikrun_core::ToolCommand;
use tracing::info;

use crate::config::BuildLayout;
use crate::sources::SourceSet;
use crate::{BuildError, Stage};

/// Compiles a `SourceSet` into `BuildLayout::classes_dir`
pub struct SourceCompiler {
    toolchain: Toolchain,
    layout: BuildLayout,
}

/// Kotlin tool paths, checked before anything runs
struct KotlinTools {
    kotlinc: PathBuf,
    stdlib: PathBuf,
}

impl SourceCompiler {
    pub fn new(toolchain: &Toolchain, layout: BuildLayout) -> Self {
        Self {
            toolchain: toolchain.clone(),
            layout,
        }
    }

    pub fn layout(&self) -> &BuildLayout {
        &self.layout
    }

    fn require(tool: &str, path: PathBuf) -> Result<PathBuf, BuildError> {
        if path.is_file() {
            Ok(path)
        } else {
            Err(BuildError::ToolNotFound {
                tool: tool.to_string(),
                path,
            })
        }
    }

    fn kotlin_tools(&self) -> Result<KotlinTools, BuildError> {
        let (Some(kotlinc), Some(stdlib)) =
            (self.toolchain.kotlinc_path(), self.toolchain.kotlin_stdlib())
        else {
            return Err(BuildError::MissingConfiguration("Kotlin home".into()));
        };
        Ok(KotlinTools {
            kotlinc: Self::require("kotlinc", kotlinc)?,
            stdlib,
        })
    }

    fn classpath(entries: &[&Path]) -> Result<OsString, BuildError> {
        std::env::join_paths(entries).map_err(|e| {
            BuildError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })
    }

    fn kotlin_command(
        &self,
        tools: &KotlinTools,
        platform_jar: &Path,
        files: &[PathBuf],
    ) -> Result<ToolCommand, BuildError> {
        let classpath = Self::classpath(&[platform_jar, tools.stdlib.as_path()])?;
        let cmd = ToolCommand::new(&tools.kotlinc)
            .arg("-include-runtime")
            .arg("-classpath")
            .arg(classpath)
            .arg("-d")
            .arg(self.layout.classes_dir())
            .args(files);
        Ok(self.toolchain.environment().apply(cmd).timeout(self.toolchain.timeout()))
    }

    fn java_command(&self, javac: &Path, platform_jar: &Path, files: &[PathBuf]) -> ToolCommand {
        let cmd = ToolCommand::new(javac)
            .arg("-classpath")
            .arg(platform_jar)
            .arg("-d")
            .arg(self.layout.classes_dir())
            .args(files);
        self.toolchain.environment().apply(cmd).timeout(self.toolchain.timeout())
    }

    async fn run_stage(stage: Stage, cmd: ToolCommand) -> Result<(), BuildError> {
        let output = cmd.output().await?;
        if !output.success() {
            return Err(BuildError::StageFailed {
                stage,
                diagnostic: output.diagnostic(),
            });
        }
        Ok(())
    }

    /// Compile `sources` against `platform_jar`, returning the class directory.
    ///
    /// Preconditions (something to compile, Kotlin configured when Kotlin
    /// sources are present, compilers installed) are checked before the
    /// build directory is reset or any tool starts. A failing stage stops
    /// the build; later stages do not run.
    pub async fn compile(&self, sources: &SourceSet, platform_jar: &Path) -> Result<PathBuf, BuildError> {
        if sources.is_empty() {
            return Err(BuildError::NothingToCompile);
        }

        let kotlin = if sources.has_kotlin() {
            Some(self.kotlin_tools()?)
        } else {
            None
        };
        let javac = if sources.has_java() {
            Some(Self::require("javac", self.toolchain.javac_path())?)
        } else {
            None
        };

        self.layout.reset().await?;

        if let Some(tools) = &kotlin {
            info!("Compiling {} Kotlin file(s)", sources.kotlin.len());
            let cmd = self.kotlin_command(tools, platform_jar, &sources.kotlin)?;
            Self::run_stage(Stage::Kotlin, cmd).await?;
        }

        if let Some(javac) = &javac {
            info!("Compiling {} Java file(s)", sources.java.len());
            let cmd = self.java_command(javac, platform_jar, &sources.java);
            Self::run_stage(Stage::Java, cmd).await?;
        }

        Ok(self.layout.classes_dir())
    }
}

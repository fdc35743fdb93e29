//! Build Runner
//!
//! Coordinates the compile and package stages for one API level.

use std::path::{Path, PathBuf};

use dalvikrun_android_toolchain::Toolchain;
use tracing::info;

use crate::compiler::SourceCompiler;
use crate::config::BuildLayout;
use crate::dexer::Dexer;
use crate::sources::SourceSet;
use crate::BuildError;

/// Build output
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Path to the packaged `classes.dex`
    pub dex_path: PathBuf,
    /// Number of class files that went into it
    pub class_count: usize,
    /// Build duration in seconds
    pub duration_secs: f64,
}

/// Build runner that coordinates the build process
pub struct BuildRunner {
    toolchain: Toolchain,
    layout: BuildLayout,
}

impl BuildRunner {
    pub fn new(toolchain: &Toolchain, layout: BuildLayout) -> Self {
        Self {
            toolchain: toolchain.clone(),
            layout,
        }
    }

    /// Build scratch space under `project_dir`
    pub fn for_project(toolchain: &Toolchain, project_dir: &Path) -> Self {
        Self::new(toolchain, BuildLayout::for_project(project_dir))
    }

    pub fn layout(&self) -> &BuildLayout {
        &self.layout
    }

    /// Compile `sources` against `platform_jar` and package the result
    pub async fn build(&self, sources: &SourceSet, platform_jar: &Path) -> Result<BuildOutput, BuildError> {
        let start = std::time::Instant::now();

        info!("Building {} source file(s) against {:?}", sources.len(), platform_jar);

        let compiler = SourceCompiler::new(&self.toolchain, self.layout.clone());
        let classes_dir = compiler.compile(sources, platform_jar).await?;
        let class_count = self.layout.class_files()?.len();

        let dexer = Dexer::locate(&self.toolchain)?;
        let dex_path = dexer.package(&classes_dir, self.layout.root()).await?;

        let duration = start.elapsed().as_secs_f64();
        info!("Build completed in {:.2}s", duration);

        Ok(BuildOutput {
            dex_path,
            class_count,
            duration_secs: duration,
        })
    }
}

//! Build output layout
//!
//! `<project>/.dalvikrun/classes/**/*.class` holds compiler output and
//! `<project>/.dalvikrun/classes.dex` the packaged artifact. The whole
//! directory is wiped before every compile.

use std::path::{Path, PathBuf};

use dalvikrun_core::BUILD_DIR_NAME;
use tracing::debug;
use walkdir::WalkDir;

use crate::{BuildError, DEX_FILE_NAME};

/// Paths of the pipeline's scratch directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    root: PathBuf,
}

impl BuildLayout {
    /// Layout under `<project>/.dalvikrun`
    pub fn for_project(project_dir: &Path) -> Self {
        Self {
            root: project_dir.join(BUILD_DIR_NAME),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn classes_dir(&self) -> PathBuf {
        self.root.join("classes")
    }

    pub fn dex_path(&self) -> PathBuf {
        self.root.join(DEX_FILE_NAME)
    }

    /// Remove the previous build and recreate an empty class directory
    pub async fn reset(&self) -> Result<(), BuildError> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => debug!("Removed previous build output {:?}", self.root),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(self.classes_dir()).await?;
        Ok(())
    }

    /// Every compiled class file, sorted
    pub fn class_files(&self) -> Result<Vec<PathBuf>, BuildError> {
        class_files(&self.classes_dir())
    }
}

/// Every `.class` file below `dir`, sorted
pub fn class_files(dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|e| e == "class") {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = BuildLayout::for_project(Path::new("/work/app"));
        assert_eq!(layout.root(), Path::new("/work/app/.dalvikrun"));
        assert_eq!(layout.classes_dir(), PathBuf::from("/work/app/.dalvikrun/classes"));
        assert_eq!(layout.dex_path(), PathBuf::from("/work/app/.dalvikrun/classes.dex"));
    }

    #[tokio::test]
    async fn test_reset_removes_stale_output() {
        let project = tempfile::tempdir().unwrap();
        let layout = BuildLayout::for_project(project.path());

        layout.reset().await.unwrap();
        let stale = layout.classes_dir().join("com").join("old").join("Stale.class");
        std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
        std::fs::write(&stale, b"").unwrap();
        std::fs::write(layout.dex_path(), b"").unwrap();
        assert_eq!(layout.class_files().unwrap(), vec![stale.clone()]);

        layout.reset().await.unwrap();
        assert!(layout.classes_dir().is_dir());
        assert!(!stale.exists());
        assert!(!layout.dex_path().exists());
        assert!(layout.class_files().unwrap().is_empty());
    }

    #[test]
    fn test_class_files_filters_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("a/b/Main.class"), b"").unwrap();
        std::fs::write(dir.path().join("a/Main$Inner.class"), b"").unwrap();
        std::fs::write(dir.path().join("a/META-INF.txt"), b"").unwrap();

        let files = class_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![
                dir.path().join("a/Main$Inner.class"),
                dir.path().join("a/b/Main.class"),
            ]
        );
    }
}

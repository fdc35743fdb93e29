//! Source selection
//!
//! Only `.java` and `.kt` files take part in a build; anything else in the
//! selection is ignored.

use std::path::{Path, PathBuf};

/// Source language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Java,
    Kotlin,
}

impl Language {
    /// Detect language from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "java" => Some(Language::Java),
            "kt" => Some(Language::Kotlin),
            _ => None,
        }
    }
}

/// A selected source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub language: Language,
}

impl SourceFile {
    /// `None` for files that are neither Java nor Kotlin
    pub fn new(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let language = Language::from_path(&path)?;
        Some(Self { path, language })
    }
}

/// Selected sources split by language, in selection order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    pub java: Vec<PathBuf>,
    pub kotlin: Vec<PathBuf>,
}

impl SourceSet {
    /// Keep the Java and Kotlin files of a selection, dropping duplicates
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut set = Self::default();
        for file in paths.into_iter().filter_map(SourceFile::new) {
            let bucket = match file.language {
                Language::Java => &mut set.java,
                Language::Kotlin => &mut set.kotlin,
            };
            if !bucket.contains(&file.path) {
                bucket.push(file.path);
            }
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.java.is_empty() && self.kotlin.is_empty()
    }

    pub fn has_kotlin(&self) -> bool {
        !self.kotlin.is_empty()
    }

    pub fn has_java(&self) -> bool {
        !self.java.is_empty()
    }

    pub fn len(&self) -> usize {
        self.java.len() + self.kotlin.len()
    }
}

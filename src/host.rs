//! Host interaction
//!
//! Everything the pipeline needs from the user goes through `Host`: picking
//! devices and files, asking for the entry class, and showing progress and
//! device output. `TerminalHost` does this with dialoguer prompts.

use std::path::{Path, PathBuf};

use console::style;
use dialoguer::{Input, MultiSelect};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use dalvikrun_core::BUILD_DIR_NAME;

/// Directories never searched for sources
const SKIPPED_DIRS: &[&str] = &["node_modules", BUILD_DIR_NAME, "build", "target"];

/// Text answer that cancels a prompt, since line input has no Esc binding
pub const SKIP_ANSWER: &str = "-";

/// User-facing side of a run
pub trait Host {
    /// Java and Kotlin files offered for selection
    fn candidate_files(&self, project: &Path) -> Vec<PathBuf>;

    /// Pick some of `items`. `None` means the user cancelled.
    fn select(&self, prompt: &str, items: &[String], default_all: bool) -> Option<Vec<usize>>;

    /// Ask for a line of text. `None` means the user cancelled.
    fn prompt_text(&self, prompt: &str, default: &str) -> Option<String>;

    fn info(&self, message: &str);

    fn warn(&self, message: &str);

    fn error(&self, message: &str);

    /// One line printed by the program running on `serial`
    fn device_output(&self, serial: &str, line: &str);
}

fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

fn text_answer(text: String) -> Option<String> {
    (text.trim() != SKIP_ANSWER).then_some(text)
}

/// Every `.java` / `.kt` file below `project`, sorted
pub fn find_sources(project: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(project)
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext == "java" || ext == "kt")
        })
        .collect();
    files.sort();
    files
}

/// Interactive terminal host.
///
/// Selections are cancelled with Esc. Text prompts always offer a default,
/// so they are cancelled by answering [`SKIP_ANSWER`] instead.
#[derive(Debug, Clone, Default)]
pub struct TerminalHost {
    assume_yes: bool,
}

impl TerminalHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select everything and accept every default instead of prompting
    pub fn assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }
}

impl Host for TerminalHost {
    fn candidate_files(&self, project: &Path) -> Vec<PathBuf> {
        let files = find_sources(project);
        debug!("{} candidate source file(s) under {:?}", files.len(), project);
        files
    }

    fn select(&self, prompt: &str, items: &[String], default_all: bool) -> Option<Vec<usize>> {
        if self.assume_yes {
            return Some((0..items.len()).collect());
        }
        let defaults = vec![default_all; items.len()];
        match MultiSelect::new()
            .with_prompt(prompt)
            .items(items)
            .defaults(&defaults)
            .interact_opt()
        {
            Ok(picked) => picked,
            Err(e) => {
                warn!("Selection prompt failed: {}", e);
                None
            }
        }
    }

    fn prompt_text(&self, prompt: &str, default: &str) -> Option<String> {
        if self.assume_yes {
            return Some(default.to_string());
        }
        match Input::<String>::new()
            .with_prompt(format!("{} ('{}' to skip)", prompt, SKIP_ANSWER))
            .default(default.to_string())
            .allow_empty(true)
            .interact_text()
        {
            Ok(text) => text_answer(text),
            Err(e) => {
                warn!("Input prompt failed: {}", e);
                None
            }
        }
    }

    fn info(&self, message: &str) {
        println!("  {} {}", style("◐").cyan(), message);
    }

    fn warn(&self, message: &str) {
        eprintln!("  {} {}", style("!").yellow().bold(), style(message).yellow());
    }

    fn error(&self, message: &str) {
        eprintln!("  {} {}", style("✕").red().bold(), style(message).red());
    }

    fn device_output(&self, serial: &str, line: &str) {
        println!("{} {}", style(format!("[{}]", serial)).dim(), line);
    }
}

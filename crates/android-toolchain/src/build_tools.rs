//! Build-tools lookup
//!
//! The SDK keeps one directory per build-tools version under
//! `<sdk>/build-tools`. Tools are taken from the newest version that
//! actually ships them; a newer directory without the tool is skipped.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Build-tools lookup errors
#[derive(Debug, thiserror::Error)]
pub enum BuildToolsError {
    #[error("no build-tools directory at {0}")]
    NoBuildTools(PathBuf),
    #[error("none of the build-tools versions in {dir} contain {tool}")]
    ToolNotFound { dir: PathBuf, tool: String },
}

/// Compare two version directory names.
///
/// Dot-separated segments compare numerically when both are numbers, so
/// `10.0.0` sorts above `9.0.0`. Anything else (`35.0.0-rc1`) falls back
/// to plain string comparison for that segment.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split(['.', '-']);
    let mut right = b.split(['.', '-']);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(l), Some(r)) => {
                let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(l), Ok(r)) => l.cmp(&r),
                    _ => l.cmp(r),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Version directory names under `build_tools_dir`, newest first
pub fn installed_versions(build_tools_dir: &Path) -> Vec<String> {
    let mut versions: Vec<String> = match std::fs::read_dir(build_tools_dir) {
        Ok(entries) => entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect(),
        Err(_) => Vec::new(),
    };
    versions.sort_by(|a, b| compare_versions(b, a));
    versions
}

/// Find a tool in the newest build-tools version that contains it.
///
/// `names` are tried in order inside each version directory, so the
/// platform's preferred file name goes first. Returns the version and the
/// tool path.
pub fn find_build_tool(
    build_tools_dir: &Path,
    names: &[&str],
) -> Result<(String, PathBuf), BuildToolsError> {
    if !build_tools_dir.is_dir() {
        return Err(BuildToolsError::NoBuildTools(build_tools_dir.to_path_buf()));
    }

    for version in installed_versions(build_tools_dir) {
        let dir = build_tools_dir.join(&version);
        if let Some(path) = names.iter().map(|n| dir.join(n)).find(|p| p.is_file()) {
            debug!("Using {:?} from build-tools {}", path, version);
            return Ok((version, path));
        }
        debug!("build-tools {} has no {:?}, skipping", version, names);
    }

    Err(BuildToolsError::ToolNotFound {
        dir: build_tools_dir.to_path_buf(),
        tool: names.first().copied().unwrap_or_default().to_string(),
    })
}

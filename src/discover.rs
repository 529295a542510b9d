//! Chart discovery under a search root.
//!
//! Honors a `.helmdocsignore` file at the search root: one glob per line,
//! matched against paths relative to the root. A matching directory is
//! skipped together with everything below it.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Errors for chart discovery
#[derive(Debug, thiserror::Error)]
pub enum DiscoverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Glob pattern error: {0}")]
    Glob(#[from] globset::Error),

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
}

/// Ignore rules for chart discovery
#[derive(Debug)]
pub struct IgnoreRules {
    glob_set: GlobSet,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            glob_set: GlobSet::empty(),
        }
    }
}

impl IgnoreRules {
    /// Read rules from an ignore file. A missing file means no rules.
    pub fn from_file(path: &Path) -> Result<Self, DiscoverError> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let patterns: Vec<&str> = contents
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect();
        Self::with_patterns(&patterns)
    }

    pub fn with_patterns(patterns: &[&str]) -> Result<Self, DiscoverError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.trim_start_matches("./").trim_end_matches('/');
            if pattern.is_empty() {
                continue;
            }
            builder.add(Glob::new(pattern)?);
            builder.add(Glob::new(&format!("{}/**", pattern))?);
        }
        Ok(Self {
            glob_set: builder.build()?,
        })
    }

    /// Check a path relative to the search root.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.glob_set.is_match(path_str.as_ref())
    }
}

/// Directories under `root` containing a `Chart.yaml`, sorted.
pub fn find_charts(root: &Path, rules: &IgnoreRules) -> Result<Vec<PathBuf>, DiscoverError> {
    let mut charts = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            if relative.as_os_str().is_empty() || !rules.is_ignored(relative) {
                return true;
            }
            debug!(path = %relative.display(), "ignored");
            false
        });

    for entry in walker {
        let entry = entry.map_err(|source| DiscoverError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && entry.file_name() == "Chart.yaml" {
            if let Some(dir) = entry.path().parent() {
                charts.push(dir.to_path_buf());
            }
        }
    }

    charts.sort();
    Ok(charts)
}

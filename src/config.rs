use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::errors::{IndexError, Result};

/// Directory names skipped during the project walk, in addition to
/// dot-directories.
pub const IGNORED_DIRS: [&str; 4] = ["node_modules", "target", "build", "dist"];

/// Configuration for the indexing engine, loadable from a TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Directory holding per-project index snapshots. Defaults to the
    /// platform cache directory.
    pub cache_dir: Option<PathBuf>,
    /// Whether `set_project_path` starts the file watcher.
    pub watch: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            watch: true,
        }
    }
}

impl IndexerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| IndexError::Config(e.to_string()))
    }

    /// Resolve the effective cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        if let Some(dir) = &self.cache_dir {
            return dir.clone();
        }
        ProjectDirs::from("", "", "codeatlas")
            .map(|dirs| dirs.cache_dir().to_path_buf())
            .unwrap_or_else(|| std::env::temp_dir().join("codeatlas"))
    }
}

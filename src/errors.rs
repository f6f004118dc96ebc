use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the indexing engine.
///
/// Per-file parse failures are absorbed at the indexer level (logged, file
/// skipped); only configuration and invocation errors reach callers.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("path does not exist or is not a directory: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("no project path set")]
    NoProjectSet,

    #[error("file not found in index: {0}")]
    NotIndexed(String),

    #[error("no parser available for language: {0}")]
    UnsupportedLanguage(String),

    #[error("search command failed: {0}")]
    SearchFailed(String),

    #[error("failed to parse file: {0}")]
    ParseFailure(String),

    #[error("file watcher error: {0}")]
    Watch(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;

use std::path::PathBuf;

use patterns::UnresolvedPlayers;

/// Per-file failure to turn a replay into commands. Never fatal to a run.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is missing its {section} line")]
    MissingSection { path: PathBuf, section: &'static str },
    #[error("{path}:{line}: invalid {section}: {source}")]
    Json {
        path: PathBuf,
        line: usize,
        section: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("replay {path} already stored")]
    Duplicate { path: String },
    #[error("replay {path}: {source}")]
    UnresolvedPlayers {
        path: String,
        #[source]
        source: UnresolvedPlayers,
    },
    #[error("store is closed")]
    Closed,
}

/// Errors that end an ingest run. Cancellation is reported through
/// `RunOutcome::Cancelled`, not here.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to discover replays in {path}: {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("failed to check for existing replays: {0}")]
    DedupQuery(#[source] StoreError),
    #[error("storage writer failed: {0}")]
    Storage(#[source] StoreError),
    #[error("file watcher failed: {0}")]
    Watcher(#[from] notify::Error),
    #[error("storage writer panicked")]
    WriterPanicked,
}

//! Replay ingestion: find replay files, skip the ones already stored, decode
//! and analyse the rest on a bounded worker pool and persist them through a
//! single storage writer.

pub mod config;
pub mod db;
pub mod decoder;
pub mod dedup;
pub mod error;
pub mod files;
pub mod parse;
pub mod pipeline;
pub mod recorder;
pub mod writer;

pub use config::{IngestConfig, ShutdownPolicy, BATCH_SIZE, HANDOFF_CAPACITY};
pub use db::models::{ParsedReplay, PersistReport};
pub use db::{MemoryStore, PostgresStore, ReplayStore};
pub use decoder::{GzipJsonDecoder, ReplayDecoder};
pub use dedup::DedupGate;
pub use error::{DecodeError, IngestError, StoreError};
pub use files::FileCandidate;
pub use pipeline::{FailedFile, IngestOutcome, IngestSummary, Pipeline, RunOutcome};
pub use recorder::ReplayRecorder;

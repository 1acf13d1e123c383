use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::error::IngestError;

/// Files per dedup query and per processing batch
pub const BATCH_SIZE: usize = 100;

/// Parsed replays that may queue up in front of the storage writer
pub const HANDOFF_CAPACITY: usize = 100;

pub const DEFAULT_EXTENSION: &str = "rep";

/// What happens to in-flight parse tasks when a watch run shuts down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownPolicy {
    /// Let them finish and hand their replay to the writer
    #[default]
    Drain,
    /// Abort them; their replays are not stored
    Abandon,
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub input_dir: PathBuf,
    pub watch: bool,
    /// Keep only the newest N files
    pub stop_after_n: Option<usize>,
    /// Drop files modified after this date
    pub up_to_date: Option<NaiveDate>,
    /// Drop files modified more than N months ago
    pub up_to_months: Option<u32>,
    pub extension: String,
    pub workers: usize,
    pub shutdown_policy: ShutdownPolicy,
}

impl IngestConfig {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        IngestConfig {
            input_dir: input_dir.into(),
            watch: false,
            stop_after_n: None,
            up_to_date: None,
            up_to_months: None,
            extension: DEFAULT_EXTENSION.to_string(),
            workers: default_workers(),
            shutdown_policy: ShutdownPolicy::default(),
        }
    }

    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    /// Zero means no limit
    pub fn with_limit(mut self, n: usize) -> Self {
        self.stop_after_n = (n > 0).then_some(n);
        self
    }

    pub fn with_up_to_date(mut self, date: NaiveDate) -> Self {
        self.up_to_date = Some(date);
        self
    }

    /// Zero means no floor
    pub fn with_up_to_months(mut self, months: u32) -> Self {
        self.up_to_months = (months > 0).then_some(months);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_shutdown_policy(mut self, policy: ShutdownPolicy) -> Self {
        self.shutdown_policy = policy;
        self
    }
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_up_to_date(value: &str) -> Result<NaiveDate, IngestError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| IngestError::InvalidDate(value.to_string()))
}

/// Postgres connection settings
#[derive(Debug, Clone)]
pub struct DbSettings {
    pub host: String,
    pub port: String,
    pub user: String,
    pub pass: String,
    pub name: String,
}

impl DbSettings {
    /// Read `REPDB_DB_*` variables; call `dotenv` first to pick up `.env`.
    pub fn from_env() -> Result<Self> {
        Ok(DbSettings {
            host: env::var("REPDB_DB_HOST").context("REPDB_DB_HOST must be set in environment or .env file")?,
            port: env::var("REPDB_DB_PORT").context("REPDB_DB_PORT must be set in environment or .env file")?,
            user: env::var("REPDB_DB_USER").context("REPDB_DB_USER must be set in environment or .env file")?,
            pass: env::var("REPDB_DB_PASS").context("REPDB_DB_PASS must be set in environment or .env file")?,
            name: env::var("REPDB_DB_NAME").context("REPDB_DB_NAME must be set in environment or .env file")?,
        })
    }

    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.pass, self.host, self.port, self.name
        )
    }

    pub fn with_name(&self, name: impl Into<String>) -> Self {
        DbSettings {
            name: name.into(),
            ..self.clone()
        }
    }
}

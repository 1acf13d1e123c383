pub mod memory;
pub mod models;
pub mod postgres;

use anyhow::{Context, Result};
use async_trait::async_trait;
use refinery::config::{Config, ConfigDbType};
use tracing::info;

use crate::config::DbSettings;
use crate::error::StoreError;
use crate::files::FileCandidate;
use models::*;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

mod migrations {
    use refinery::embed_migrations;
    embed_migrations!("./migrations");
}

/// The two storage operations ingestion needs.
///
/// `filter_existing` is read-only and may run alongside the writer.
/// `persist` is only ever called by the single storage writer task.
#[async_trait]
pub trait ReplayStore: Send + Sync {
    /// Candidates whose path and checksum are both unknown to the store
    async fn filter_existing(&self, candidates: Vec<FileCandidate>) -> Result<Vec<FileCandidate>, StoreError>;

    /// Store one replay with its players, commands and detections atomically
    async fn persist(&self, replay: ParsedReplay) -> Result<PersistReport, StoreError>;

    fn name(&self) -> &'static str;
}

/// Apply embedded schema migrations
pub async fn run_migrations(settings: &DbSettings) -> Result<()> {
    let mut db_config = Config::new(ConfigDbType::Postgres)
        .set_db_host(&settings.host)
        .set_db_port(&settings.port)
        .set_db_user(&settings.user)
        .set_db_pass(&settings.pass)
        .set_db_name(&settings.name);

    let report = migrations::migrations::runner()
        .run_async(&mut db_config)
        .await
        .context("Failed to run migrations")?;
    info!("Database migrations completed ({} applied)", report.applied_migrations().len());
    Ok(())
}

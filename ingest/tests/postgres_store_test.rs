//! Needs a reachable Postgres configured through `REPDB_DB_*`; run with
//! `--ignored`.

mod common;

use std::sync::Arc;

use anyhow::Result;
use ingest::{IngestConfig, PostgresStore, ReplayStore};

use crate::common::test_database::TestDatabase;
use crate::common::{pipeline, write_replay};

#[tokio::test]
#[ignore]
async fn persists_replays_and_dedups_on_rerun() -> Result<()> {
    let db = TestDatabase::new().await?;
    let dir = tempfile::tempdir()?;
    write_replay(dir.path(), "a.rep", 1)?;
    write_replay(dir.path(), "b.rep", 2)?;

    let store: Arc<dyn ReplayStore> = Arc::new(PostgresStore::new(db.pool.clone()));

    let first = pipeline(store.clone(), IngestConfig::new(dir.path())).run_batch().await?;
    assert_eq!(first.summary().persisted, 2);

    let second = pipeline(store.clone(), IngestConfig::new(dir.path())).run_batch().await?;
    assert_eq!(second.summary().persisted, 0);
    assert_eq!(second.summary().skipped_existing, 2);

    let players: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM players").fetch_one(&db.pool).await?;
    assert_eq!(players, 6);

    let commands: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM commands").fetch_one(&db.pool).await?;
    assert_eq!(commands, 18);

    let unresolved: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM detected_patterns WHERE level = 'player' AND player_id IS NULL",
    )
    .fetch_one(&db.pool)
    .await?;
    assert_eq!(unresolved, 0);

    let had_carriers: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM detected_patterns WHERE pattern_name = 'Had Carriers' AND value_bool",
    )
    .fetch_one(&db.pool)
    .await?;
    assert_eq!(had_carriers, 2);

    drop(store);
    db.cleanup().await?;
    Ok(())
}

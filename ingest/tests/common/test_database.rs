use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{Context, Result};
use ingest::config::DbSettings;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::info;

// Global counter for unique database names
static DB_COUNTER: AtomicU32 = AtomicU32::new(0);

/// A throwaway database created next to the one in `REPDB_DB_*`
pub struct TestDatabase {
    pub name: String,
    pub pool: PgPool,
    admin_pool: PgPool,
}

impl TestDatabase {
    pub async fn new() -> Result<Self> {
        dotenv::dotenv().ok();
        let admin = DbSettings::from_env()?;

        let counter = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        let name = format!(
            "repdb_test_{}_{}_{}",
            std::process::id(),
            chrono::Utc::now().timestamp_millis(),
            counter
        );
        info!("Creating test database: {}", name);

        let admin_pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&admin.url())
            .await
            .context("Failed to connect to admin database")?;
        admin_pool
            .execute(format!("CREATE DATABASE \"{}\"", name).as_str())
            .await
            .context("Failed to create test database")?;

        let settings = admin.with_name(&name);
        ingest::db::run_migrations(&settings).await?;

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&settings.url())
            .await
            .context("Failed to connect to test database")?;

        Ok(Self { name, pool, admin_pool })
    }

    pub async fn cleanup(self) -> Result<()> {
        info!("Cleaning up test database: {}", self.name);
        self.pool.close().await;
        self.admin_pool
            .execute(format!("DROP DATABASE \"{}\" WITH (FORCE)", self.name).as_str())
            .await
            .context("Failed to drop test database")?;
        self.admin_pool.close().await;
        Ok(())
    }
}

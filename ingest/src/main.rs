use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use ingest::config::{default_workers, parse_up_to_date, DbSettings};
use ingest::db::{self, MemoryStore, PostgresStore, ReplayStore};
use ingest::files::directory::default_replay_directory;
use ingest::{GzipJsonDecoder, IngestConfig, Pipeline, RunOutcome};
use patterns::DetectorRegistry;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "repdb-ingest", about = "Ingest replay files into the replay database")]
struct Args {
    /// Directory to scan; defaults to the game's replay folder
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Keep running and ingest new replays as they appear
    #[arg(long)]
    watch: bool,

    /// Only ingest the newest N replays (0 = all)
    #[arg(long, default_value_t = 0)]
    stop_after_n_reps: usize,

    /// Skip replays modified after this date (YYYY-MM-DD)
    #[arg(long)]
    up_to_yyyy_mm_dd: Option<String>,

    /// Skip replays older than N months (0 = no limit)
    #[arg(long, default_value_t = 0)]
    up_to_n_months: u32,

    /// Drop and recreate all tables before ingesting
    #[arg(long)]
    clean: bool,

    /// Parse and analyse without a database
    #[arg(long)]
    dry_run: bool,

    /// Concurrent parse workers
    #[arg(long, default_value_t = default_workers())]
    workers: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if exists
    dotenv::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let args = Args::parse();

    let input_dir = match args.input_dir {
        Some(dir) => dir,
        None => default_replay_directory()
            .ok_or_else(|| anyhow!("No replay directory found, pass --input-dir"))?,
    };

    let mut config = IngestConfig::new(input_dir)
        .with_watch(args.watch)
        .with_limit(args.stop_after_n_reps)
        .with_up_to_months(args.up_to_n_months)
        .with_workers(args.workers);
    if let Some(date) = &args.up_to_yyyy_mm_dd {
        config = config.with_up_to_date(parse_up_to_date(date)?);
    }

    let store: Arc<dyn ReplayStore> = if args.dry_run {
        info!("Dry run, replays are kept in memory only");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(connect(args.clean).await?)
    };

    let token = CancellationToken::new();
    let pipeline = Pipeline::new(
        store,
        Arc::new(GzipJsonDecoder),
        Arc::new(DetectorRegistry::standard()),
        config,
    )
    .with_cancellation_token(token.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, stopping...");
            token.cancel();
        }
    });

    info!(
        "Ingesting from {} with {} workers",
        pipeline.config().input_dir.display(),
        pipeline.config().workers
    );
    let outcome = pipeline.run().await?;

    let summary = outcome.summary();
    for failed in &summary.failed {
        warn!("Failed: {}: {}", failed.path.display(), failed.error);
    }
    info!(
        "Discovered {}, {} after date filters, {} after limit, {} already stored, {} parsed, {} failed, {} stored",
        summary.discovered,
        summary.after_date_filter,
        summary.after_limit,
        summary.skipped_existing,
        summary.parsed,
        summary.failed.len(),
        summary.persisted
    );
    if let RunOutcome::Cancelled(_) = outcome {
        info!("Ingest was cancelled before finishing");
    }
    Ok(())
}

async fn connect(clean: bool) -> Result<PostgresStore> {
    let settings = DbSettings::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.url())
        .await
        .context("Failed to create PostgreSQL connection pool")?;

    if clean {
        PostgresStore::drop_schema(&pool).await?;
    }
    db::run_migrations(&settings).await?;

    Ok(PostgresStore::new(pool))
}

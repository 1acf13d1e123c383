#![allow(dead_code)]

pub mod test_database;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use ::common::{
    ActionType, Command, DecodedReplay, Player, Race, ReplayHeader, ReplayPlayerId, BUILDING_GATEWAY,
    BUILDING_NEXUS, BUILDING_SPAWNING_POOL, UNIT_CARRIER, UNIT_ZERGLING,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use ingest::{
    DecodeError, FileCandidate, GzipJsonDecoder, IngestConfig, MemoryStore, ParsedReplay, PersistReport,
    Pipeline, ReplayDecoder, ReplayRecorder, ReplayStore, StoreError,
};
use patterns::DetectorRegistry;
use tokio::sync::Notify;

/// Protoss vs Zerg with three carriers and an expansion. `seed` changes
/// the title so every seed produces a different fingerprint.
pub fn sample_replay(seed: u32) -> DecodedReplay {
    let start = Utc.with_ymd_and_hms(2024, 1, 20, 21, 0, 0).unwrap();
    let mut header = ReplayHeader::new(start, "Fighting Spirit", 24_000);
    header.title = format!("ladder game {}", seed);

    let players = vec![
        Player::new(0, "carrier_fan", Race::Protoss, 1),
        Player::new(1, "ling_rush", Race::Zerg, 2),
        Player::new(2, "caster", Race::Unknown, 0).observer(),
    ];

    let p0 = ReplayPlayerId(0);
    let p1 = ReplayPlayerId(1);
    let commands = vec![
        Command::new(p1, 1200, ActionType::Build).with_unit(BUILDING_SPAWNING_POOL),
        Command::new(p0, 1500, ActionType::Build).with_unit(BUILDING_GATEWAY),
        Command::new(p1, 2600, ActionType::UnitMorph).with_unit(UNIT_ZERGLING),
        Command::new(p0, 2800, ActionType::RightClick).with_position(640, 480),
        Command::new(p0, 4000, ActionType::Build).with_unit(BUILDING_NEXUS),
        Command::new(p0, 6000, ActionType::Upgrade).with_upgrade("Carrier Capacity"),
        Command::new(p0, 9000, ActionType::Train).with_unit(UNIT_CARRIER),
        Command::new(p0, 9400, ActionType::Train).with_unit(UNIT_CARRIER),
        // nobody in the player list
        Command::new(ReplayPlayerId(9), 9500, ActionType::Train).with_unit(UNIT_CARRIER),
        Command::new(p0, 9800, ActionType::Train).with_unit(UNIT_CARRIER),
    ];

    DecodedReplay {
        header,
        players,
        commands,
    }
}

pub fn write_replay(dir: &Path, name: &str, seed: u32) -> Result<PathBuf> {
    let path = dir.join(name);
    ReplayRecorder::from_replay(sample_replay(seed)).save(&path)?;
    Ok(path)
}

pub fn write_garbage(dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, b"not a replay at all").context("Failed to write garbage file")?;
    Ok(path)
}

/// Set the modification time to `days_ago` days in the past
pub fn age_file(path: &Path, days_ago: u64) -> Result<()> {
    let when = SystemTime::now() - Duration::from_secs(days_ago * 24 * 60 * 60);
    std::fs::File::options()
        .write(true)
        .open(path)?
        .set_modified(when)
        .context("Failed to set modification time")?;
    Ok(())
}

/// Candidate for `path` as if it had been stored from somewhere else
pub fn stored_elsewhere(path: &Path) -> Result<FileCandidate> {
    let mut candidate = FileCandidate::from_path(path)?;
    candidate.path = PathBuf::from("/archive").join(&candidate.name);
    Ok(candidate)
}

pub fn pipeline(store: Arc<dyn ReplayStore>, config: IngestConfig) -> Pipeline {
    Pipeline::new(
        store,
        Arc::new(GzipJsonDecoder),
        Arc::new(DetectorRegistry::standard()),
        config.with_workers(2),
    )
}

/// Single-worker pipeline around a custom decoder
pub fn pipeline_with_decoder(
    store: Arc<dyn ReplayStore>,
    decoder: Arc<dyn ReplayDecoder>,
    config: IngestConfig,
) -> Pipeline {
    Pipeline::new(
        store,
        decoder,
        Arc::new(DetectorRegistry::standard()),
        config.with_workers(1),
    )
}

/// Decodes like [`GzipJsonDecoder`] but takes `delay` per file and signals
/// `started` when a decode begins.
pub struct SlowDecoder {
    pub delay: Duration,
    pub started: Arc<Notify>,
}

impl SlowDecoder {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: Arc::new(Notify::new()),
        }
    }
}

impl ReplayDecoder for SlowDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedReplay, DecodeError> {
        self.started.notify_one();
        std::thread::sleep(self.delay);
        GzipJsonDecoder.decode(path)
    }
}

/// Answers dedup queries but refuses to persist anything
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
}

#[async_trait]
impl ReplayStore for FailingStore {
    async fn filter_existing(&self, candidates: Vec<FileCandidate>) -> Result<Vec<FileCandidate>, StoreError> {
        self.inner.filter_existing(candidates).await
    }

    async fn persist(&self, _replay: ParsedReplay) -> Result<PersistReport, StoreError> {
        Err(StoreError::Closed)
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Cannot answer dedup queries
pub struct UnreachableStore;

#[async_trait]
impl ReplayStore for UnreachableStore {
    async fn filter_existing(&self, _candidates: Vec<FileCandidate>) -> Result<Vec<FileCandidate>, StoreError> {
        Err(StoreError::Closed)
    }

    async fn persist(&self, _replay: ParsedReplay) -> Result<PersistReport, StoreError> {
        Err(StoreError::Closed)
    }

    fn name(&self) -> &'static str {
        "unreachable"
    }
}

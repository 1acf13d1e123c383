use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::db::models::ParsedReplay;
use crate::db::ReplayStore;
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterReport {
    pub persisted: usize,
    pub commands: usize,
    pub detections: usize,
}

/// Start the single storage writer.
///
/// The receiver is moved into the spawned task, so nothing else can persist
/// through this hand-off. The task ends when every sender is dropped, or on
/// the first store error, which drops the receiver and makes further sends
/// fail.
pub fn spawn_writer(
    store: Arc<dyn ReplayStore>,
    capacity: usize,
) -> (mpsc::Sender<ParsedReplay>, JoinHandle<Result<WriterReport, StoreError>>) {
    let (tx, rx) = mpsc::channel(capacity);
    let handle = tokio::spawn(run_writer(store, rx));
    (tx, handle)
}

async fn run_writer(
    store: Arc<dyn ReplayStore>,
    mut rx: mpsc::Receiver<ParsedReplay>,
) -> Result<WriterReport, StoreError> {
    info!("Storage writer started ({})", store.name());
    let mut report = WriterReport::default();

    while let Some(replay) = rx.recv().await {
        let name = replay.file.name.clone();
        match store.persist(replay).await {
            Ok(stored) => {
                report.persisted += 1;
                report.commands += stored.commands;
                report.detections += stored.detections;
                info!(
                    "Stored {} ({} commands, {} detections)",
                    name, stored.commands, stored.detections
                );
            }
            Err(e) => {
                error!("Failed to store {}: {}", name, e);
                return Err(e);
            }
        }
    }

    info!("Storage writer finished, {} replays stored", report.persisted);
    Ok(report)
}

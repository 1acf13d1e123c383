use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use patterns::DetectorRegistry;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{IngestConfig, ShutdownPolicy, BATCH_SIZE, HANDOFF_CAPACITY};
use crate::db::models::ParsedReplay;
use crate::db::ReplayStore;
use crate::decoder::ReplayDecoder;
use crate::dedup::DedupGate;
use crate::error::{IngestError, StoreError};
use crate::files::{self, FileCandidate, ReplayWatcher};
use crate::parse::parse_replay;
use crate::writer::{spawn_writer, WriterReport};

/// A file that could not be parsed. Recorded, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFile {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub discovered: usize,
    pub after_date_filter: usize,
    pub after_limit: usize,
    pub skipped_existing: usize,
    pub parsed: usize,
    pub failed: Vec<FailedFile>,
    pub persisted: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(IngestSummary),
    Cancelled(IngestSummary),
}

impl RunOutcome {
    pub fn summary(&self) -> &IngestSummary {
        match self {
            RunOutcome::Completed(summary) | RunOutcome::Cancelled(summary) => summary,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Cancelled(_))
    }
}

/// What happened to one file handed to a parse task
#[derive(Debug)]
pub enum IngestOutcome {
    /// Parsed and accepted by the writer hand-off
    Handed,
    Failed(FailedFile),
    /// Abandoned because of cancellation
    Cancelled,
    /// The writer stopped before accepting the replay
    WriterGone,
}

impl IngestSummary {
    fn record(&mut self, outcome: IngestOutcome) {
        match outcome {
            IngestOutcome::Handed => self.parsed += 1,
            IngestOutcome::Failed(failed) => self.failed.push(failed),
            IngestOutcome::Cancelled | IngestOutcome::WriterGone => {}
        }
    }
}

/// Everything a parse task needs, cheap to clone per file
#[derive(Clone)]
struct TaskContext {
    decoder: Arc<dyn ReplayDecoder>,
    registry: Arc<DetectorRegistry>,
    handoff: mpsc::Sender<ParsedReplay>,
    permits: Arc<Semaphore>,
    cancellation_token: CancellationToken,
}

pub struct Pipeline {
    store: Arc<dyn ReplayStore>,
    decoder: Arc<dyn ReplayDecoder>,
    registry: Arc<DetectorRegistry>,
    config: IngestConfig,
    cancellation_token: CancellationToken,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn ReplayStore>,
        decoder: Arc<dyn ReplayDecoder>,
        registry: Arc<DetectorRegistry>,
        config: IngestConfig,
    ) -> Self {
        Self {
            store,
            decoder,
            registry,
            config,
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Run in the mode the config asks for
    pub async fn run(&self) -> Result<RunOutcome, IngestError> {
        if self.config.watch {
            let watcher = ReplayWatcher::start(&self.config.input_dir, &self.config.extension)?;
            let (_guard, candidates, errors) = watcher.split();
            self.run_watch(candidates, errors).await
        } else {
            self.run_batch().await
        }
    }

    /// Discover, filter, dedup and ingest everything under the input directory.
    pub async fn run_batch(&self) -> Result<RunOutcome, IngestError> {
        let mut summary = IngestSummary::default();

        let files = self.select_files(&mut summary).await?;
        if self.cancellation_token.is_cancelled() {
            info!("Cancelled before ingesting");
            return Ok(RunOutcome::Cancelled(summary));
        }

        let mut gate = DedupGate::new(self.store.clone());
        let files = gate.filter(files).await.map_err(IngestError::DedupQuery)?;
        summary.skipped_existing = summary.after_limit - files.len();
        info!(
            "{} new replays to ingest ({} already stored)",
            files.len(),
            summary.skipped_existing
        );

        let (handoff, writer) = spawn_writer(self.store.clone(), HANDOFF_CAPACITY);
        let ctx = self.task_context(handoff, self.cancellation_token.child_token());

        let mut cancelled = false;
        let batch_count = files.len().div_ceil(BATCH_SIZE);
        for (index, batch) in files.chunks(BATCH_SIZE).enumerate() {
            if self.cancellation_token.is_cancelled() {
                cancelled = true;
                break;
            }
            info!(
                "Processing batch {}/{} ({} files)",
                index + 1,
                batch_count,
                batch.len()
            );

            let mut tasks = JoinSet::new();
            for file in batch.iter().cloned() {
                tasks.spawn(process_file(ctx.clone(), file));
            }

            let mut writer_gone = false;
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(IngestOutcome::WriterGone) => writer_gone = true,
                    Ok(outcome) => summary.record(outcome),
                    Err(e) => error!("Parse task failed: {}", e),
                }
            }

            if writer_gone || writer.is_finished() {
                warn!("Storage writer stopped, not starting further batches");
                break;
            }
        }
        if self.cancellation_token.is_cancelled() {
            cancelled = true;
        }

        let TaskContext { handoff, .. } = ctx;
        finish(handoff, writer, summary, cancelled).await
    }

    /// Ingest candidates as they arrive until the stream ends or the run is
    /// cancelled. Watcher errors are logged and otherwise ignored.
    pub async fn run_watch(
        &self,
        mut candidates: mpsc::Receiver<FileCandidate>,
        mut errors: mpsc::Receiver<notify::Error>,
    ) -> Result<RunOutcome, IngestError> {
        let mut summary = IngestSummary::default();
        let mut gate = DedupGate::new(self.store.clone());

        let (handoff, mut writer) = spawn_writer(self.store.clone(), HANDOFF_CAPACITY);
        // Drained tasks must outlive the run's cancellation, so they get
        // their own token that is only cancelled when abandoning.
        let task_token = CancellationToken::new();
        let ctx = self.task_context(handoff, task_token.clone());

        let mut tasks = JoinSet::new();
        let mut errors_open = true;
        let mut cancelled = false;

        loop {
            tokio::select! {
                _ = self.cancellation_token.cancelled() => {
                    info!("Shutdown requested, stopping watch");
                    cancelled = true;
                    break;
                }
                result = &mut writer => {
                    task_token.cancel();
                    tasks.abort_all();
                    return match result {
                        Ok(Ok(_)) => Err(IngestError::Storage(StoreError::Closed)),
                        Ok(Err(e)) => Err(IngestError::Storage(e)),
                        Err(_) => Err(IngestError::WriterPanicked),
                    };
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    match joined {
                        Ok(outcome) => summary.record(outcome),
                        Err(e) if e.is_cancelled() => {}
                        Err(e) => error!("Parse task failed: {}", e),
                    }
                }
                err = errors.recv(), if errors_open => {
                    match err {
                        Some(e) => warn!("File watcher error: {}", e),
                        None => errors_open = false,
                    }
                }
                candidate = candidates.recv() => {
                    let Some(file) = candidate else {
                        info!("Watcher closed, finishing");
                        break;
                    };
                    summary.discovered += 1;
                    summary.after_date_filter += 1;
                    summary.after_limit += 1;

                    let fresh = gate.filter(vec![file]).await.map_err(IngestError::DedupQuery)?;
                    match fresh.into_iter().next() {
                        Some(file) => {
                            info!("New replay {}", file.path.display());
                            tasks.spawn(process_file(ctx.clone(), file));
                        }
                        None => summary.skipped_existing += 1,
                    }
                }
            }
        }

        match self.config.shutdown_policy {
            ShutdownPolicy::Drain => {
                debug!("Draining {} in-flight parse tasks", tasks.len());
            }
            ShutdownPolicy::Abandon => {
                debug!("Abandoning {} in-flight parse tasks", tasks.len());
                task_token.cancel();
                tasks.abort_all();
            }
        }
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => summary.record(outcome),
                Err(e) if e.is_cancelled() => {}
                Err(e) => error!("Parse task failed: {}", e),
            }
        }

        let TaskContext { handoff, .. } = ctx;
        finish(handoff, writer, summary, cancelled).await
    }

    async fn select_files(&self, summary: &mut IngestSummary) -> Result<Vec<FileCandidate>, IngestError> {
        let dir = self.config.input_dir.clone();
        let extension = self.config.extension.clone();
        info!("Discovering .{} files in {}", extension, dir.display());

        let discovered = {
            let dir = dir.clone();
            tokio::task::spawn_blocking(move || files::discover(&dir, &extension)).await
        };
        let mut found = discovered
            .map_err(|e| IngestError::Discovery {
                path: dir.clone(),
                source: std::io::Error::other(e),
            })?
            .map_err(|source| IngestError::Discovery { path: dir, source })?;
        summary.discovered = found.len();

        files::sort_by_modified_desc(&mut found);
        let found = files::filter_by_date(found, self.config.up_to_date, self.config.up_to_months, Utc::now());
        summary.after_date_filter = found.len();

        let found = files::limit(found, self.config.stop_after_n);
        summary.after_limit = found.len();

        info!(
            "Found {} replays, {} after date filters, {} after limit",
            summary.discovered, summary.after_date_filter, summary.after_limit
        );
        Ok(found)
    }

    fn task_context(&self, handoff: mpsc::Sender<ParsedReplay>, token: CancellationToken) -> TaskContext {
        TaskContext {
            decoder: self.decoder.clone(),
            registry: self.registry.clone(),
            handoff,
            permits: Arc::new(Semaphore::new(self.config.workers.max(1))),
            cancellation_token: token,
        }
    }
}

/// Decode, detect and hand one file to the writer.
async fn process_file(ctx: TaskContext, file: FileCandidate) -> IngestOutcome {
    let _permit = tokio::select! {
        _ = ctx.cancellation_token.cancelled() => return IngestOutcome::Cancelled,
        permit = ctx.permits.clone().acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return IngestOutcome::Cancelled,
        },
    };
    if ctx.cancellation_token.is_cancelled() {
        return IngestOutcome::Cancelled;
    }

    let path = file.path.clone();
    let decoder = ctx.decoder.clone();
    let registry = ctx.registry.clone();
    let parsed = tokio::task::spawn_blocking(move || parse_replay(decoder.as_ref(), &registry, file)).await;

    let parsed = match parsed {
        Ok(Ok(parsed)) => parsed,
        Ok(Err(e)) => {
            warn!("Failed to parse {}: {}", path.display(), e);
            return IngestOutcome::Failed(FailedFile {
                path,
                error: e.to_string(),
            });
        }
        Err(e) => {
            warn!("Parser crashed on {}: {}", path.display(), e);
            return IngestOutcome::Failed(FailedFile {
                path,
                error: format!("parser crashed: {}", e),
            });
        }
    };

    if ctx.cancellation_token.is_cancelled() {
        debug!("Dropping parsed {} after cancellation", path.display());
        return IngestOutcome::Cancelled;
    }

    tokio::select! {
        _ = ctx.cancellation_token.cancelled() => IngestOutcome::Cancelled,
        sent = ctx.handoff.send(parsed) => match sent {
            Ok(()) => IngestOutcome::Handed,
            Err(_) => IngestOutcome::WriterGone,
        },
    }
}

/// Close the hand-off, wait for the writer and build the outcome
async fn finish(
    handoff: mpsc::Sender<ParsedReplay>,
    writer: JoinHandle<Result<WriterReport, StoreError>>,
    mut summary: IngestSummary,
    cancelled: bool,
) -> Result<RunOutcome, IngestError> {
    drop(handoff);
    let report = writer
        .await
        .map_err(|_| IngestError::WriterPanicked)?
        .map_err(IngestError::Storage)?;
    summary.persisted = report.persisted;

    info!(
        "Ingest {}: {} parsed, {} failed, {} stored",
        if cancelled { "cancelled" } else { "finished" },
        summary.parsed,
        summary.failed.len(),
        summary.persisted
    );

    if cancelled {
        Ok(RunOutcome::Cancelled(summary))
    } else {
        Ok(RunOutcome::Completed(summary))
    }
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{has_extension, FileCandidate};
use crate::config::HANDOFF_CAPACITY;
use crate::error::IngestError;

/// Time given to the game to finish writing a new replay
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Keeps the OS watch alive; dropping it stops the candidate stream.
pub struct WatchGuard {
    _watcher: RecommendedWatcher,
}

/// Emits a fingerprinted `FileCandidate` for every new replay created
/// under a directory.
pub struct ReplayWatcher {
    guard: WatchGuard,
    candidates: mpsc::Receiver<FileCandidate>,
    errors: mpsc::Receiver<notify::Error>,
}

impl ReplayWatcher {
    /// Must be called from within a tokio runtime.
    pub fn start(dir: &Path, extension: &str) -> Result<Self, IngestError> {
        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            if raw_tx.send(result).is_err() {
                debug!("Replay watcher receiver dropped");
            }
        })?;
        watcher.watch(dir, RecursiveMode::Recursive)?;
        info!("Watching {} for new .{} files", dir.display(), extension);

        let (candidate_tx, candidates) = mpsc::channel(HANDOFF_CAPACITY);
        let (error_tx, errors) = mpsc::channel(HANDOFF_CAPACITY);
        let extension = extension.to_string();

        tokio::spawn(async move {
            while let Some(result) = raw_rx.recv().await {
                match result {
                    Ok(event) => {
                        for path in created_replays(&event, &extension) {
                            tokio::time::sleep(SETTLE_DELAY).await;
                            match fingerprint(path.clone()).await {
                                Ok(candidate) => {
                                    if candidate_tx.send(candidate).await.is_err() {
                                        return;
                                    }
                                }
                                Err(e) => warn!("Failed to read new replay {}: {}", path.display(), e),
                            }
                        }
                    }
                    Err(e) => {
                        if error_tx.send(e).await.is_err() {
                            return;
                        }
                    }
                }
            }
        });

        Ok(ReplayWatcher {
            guard: WatchGuard { _watcher: watcher },
            candidates,
            errors,
        })
    }

    pub fn split(self) -> (WatchGuard, mpsc::Receiver<FileCandidate>, mpsc::Receiver<notify::Error>) {
        (self.guard, self.candidates, self.errors)
    }
}

fn created_replays(event: &Event, extension: &str) -> Vec<PathBuf> {
    if !matches!(event.kind, EventKind::Create(_)) {
        return Vec::new();
    }
    event
        .paths
        .iter()
        .filter(|path| has_extension(path, extension))
        .cloned()
        .collect()
}

async fn fingerprint(path: PathBuf) -> std::io::Result<FileCandidate> {
    tokio::task::spawn_blocking(move || FileCandidate::from_path(&path))
        .await
        .map_err(std::io::Error::other)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind};

    #[test]
    fn only_create_events_for_replays_count() {
        let created = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/r/game.rep"))
            .add_path(PathBuf::from("/r/game.tmp"));
        let modified = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(PathBuf::from("/r/other.rep"));

        assert_eq!(created_replays(&created, "rep"), vec![PathBuf::from("/r/game.rep")]);
        assert!(created_replays(&modified, "rep").is_empty());
    }
}

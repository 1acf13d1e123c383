use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::config::BATCH_SIZE;
use crate::db::ReplayStore;
use crate::error::StoreError;
use crate::files::FileCandidate;

/// Drops candidates that are already stored, or that repeat the checksum
/// of an earlier candidate in the same run.
pub struct DedupGate {
    store: Arc<dyn ReplayStore>,
    seen_checksums: HashSet<String>,
}

impl DedupGate {
    pub fn new(store: Arc<dyn ReplayStore>) -> Self {
        Self {
            store,
            seen_checksums: HashSet::new(),
        }
    }

    /// Returns the new candidates in their original order.
    ///
    /// The store is queried in chunks of `BATCH_SIZE`.
    pub async fn filter(&mut self, candidates: Vec<FileCandidate>) -> Result<Vec<FileCandidate>, StoreError> {
        let total = candidates.len();
        let mut unseen = Vec::with_capacity(total);
        for candidate in candidates {
            if self.seen_checksums.contains(&candidate.checksum) {
                debug!("Skipping {}: same content as an earlier file", candidate.path.display());
                continue;
            }
            self.seen_checksums.insert(candidate.checksum.clone());
            unseen.push(candidate);
        }

        let mut fresh = Vec::with_capacity(unseen.len());
        let mut remaining = unseen.into_iter().peekable();
        while remaining.peek().is_some() {
            let batch: Vec<FileCandidate> = remaining.by_ref().take(BATCH_SIZE).collect();
            let batch_len = batch.len();
            let kept = self.store.filter_existing(batch).await?;
            debug!("Dedup batch: {} of {} files are new", kept.len(), batch_len);
            fresh.extend(kept);
        }

        debug!("Dedup gate kept {} of {} files", fresh.len(), total);
        Ok(fresh)
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use common::{PlayerId, ReplayPlayerId};
use patterns::DetectionResult;
use tokio::sync::RwLock;
use tracing::debug;

use super::models::{ParsedReplay, PersistReport};
use super::ReplayStore;
use crate::error::StoreError;
use crate::files::FileCandidate;

/// A replay as kept by [`MemoryStore`]
#[derive(Debug, Clone)]
pub struct StoredReplay {
    pub id: i64,
    pub file_path: String,
    pub file_checksum: String,
    pub map_name: String,
    pub player_ids: HashMap<ReplayPlayerId, PlayerId>,
    pub commands: usize,
    pub detections: Vec<DetectionResult>,
}

#[derive(Default)]
struct State {
    replays: Vec<StoredReplay>,
    next_replay_id: i64,
    next_player_id: i64,
}

/// Process-local store used for `--dry-run` and tests.
///
/// Follows the same uniqueness rules as the Postgres schema: one replay
/// per path and per checksum.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `file` as already stored without any content
    pub async fn mark_stored(&self, file: &FileCandidate) {
        let mut state = self.state.write().await;
        state.next_replay_id += 1;
        let id = state.next_replay_id;
        state.replays.push(StoredReplay {
            id,
            file_path: file.path_str(),
            file_checksum: file.checksum.clone(),
            map_name: String::new(),
            player_ids: HashMap::new(),
            commands: 0,
            detections: Vec::new(),
        });
    }

    pub async fn replays(&self) -> Vec<StoredReplay> {
        self.state.read().await.replays.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.replays.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ReplayStore for MemoryStore {
    async fn filter_existing(&self, candidates: Vec<FileCandidate>) -> Result<Vec<FileCandidate>, StoreError> {
        let state = self.state.read().await;
        Ok(candidates
            .into_iter()
            .filter(|c| {
                let path = c.path_str();
                !state
                    .replays
                    .iter()
                    .any(|r| r.file_path == path || r.file_checksum == c.checksum)
            })
            .collect())
    }

    async fn persist(&self, mut replay: ParsedReplay) -> Result<PersistReport, StoreError> {
        let mut state = self.state.write().await;

        let path = replay.file.path_str();
        if state
            .replays
            .iter()
            .any(|r| r.file_path == path || r.file_checksum == replay.file.checksum)
        {
            return Err(StoreError::Duplicate { path });
        }

        let mut player_ids = HashMap::new();
        let mut next_player_id = state.next_player_id;
        for player in &replay.players {
            next_player_id += 1;
            if player.id.is_computer() && player_ids.contains_key(&player.id) {
                debug!("Computer player {} shares id {} with an earlier row", player.name, player.id);
            }
            player_ids.entry(player.id).or_insert(PlayerId(next_player_id));
        }

        // nothing is written unless every id resolves
        patterns::remap_player_ids(&mut replay.detections, &player_ids)
            .map_err(|source| StoreError::UnresolvedPlayers { path: path.clone(), source })?;

        state.next_player_id = next_player_id;
        state.next_replay_id += 1;
        let id = state.next_replay_id;

        let report = PersistReport {
            replay_id: id,
            players: replay.players.len(),
            commands: replay.commands.len(),
            detections: replay.detections.len(),
        };
        debug!("Stored replay {} in memory as id {}", replay.file.name, id);

        state.replays.push(StoredReplay {
            id,
            file_path: path,
            file_checksum: replay.file.checksum,
            map_name: replay.header.map_name,
            player_ids,
            commands: replay.commands.len(),
            detections: replay.detections,
        });
        Ok(report)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

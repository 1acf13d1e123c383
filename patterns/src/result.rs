use std::collections::{BTreeSet, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use common::{PlayerId, ReplayPlayerId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Replay,
    Team,
    Player,
}

impl Scope {
    /// Name stored in the `level` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Replay => "replay",
            Scope::Team => "team",
            Scope::Player => "player",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Player reference on a player-scoped result.
///
/// Starts out transient-only; `player_id` is filled in by
/// [`remap_player_ids`] once players are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerRef {
    pub replay_player_id: ReplayPlayerId,
    pub player_id: Option<PlayerId>,
}

/// What a result is about. The variant fixes both the scope and which key
/// is present, so a replay result can never carry a team or player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeKey {
    Replay,
    Team(u8),
    Player(PlayerRef),
}

impl ScopeKey {
    pub fn player(replay_player_id: ReplayPlayerId) -> Self {
        ScopeKey::Player(PlayerRef {
            replay_player_id,
            player_id: None,
        })
    }

    pub fn scope(&self) -> Scope {
        match self {
            ScopeKey::Replay => Scope::Replay,
            ScopeKey::Team(_) => Scope::Team,
            ScopeKey::Player(_) => Scope::Player,
        }
    }

    pub fn team(&self) -> Option<u8> {
        match self {
            ScopeKey::Team(team) => Some(*team),
            _ => None,
        }
    }

    pub fn player_ref(&self) -> Option<&PlayerRef> {
        match self {
            ScopeKey::Player(player) => Some(player),
            _ => None,
        }
    }

    /// Equality on the replay-local identity, ignoring any durable id
    fn same_subject(&self, other: &ScopeKey) -> bool {
        match (self, other) {
            (ScopeKey::Replay, ScopeKey::Replay) => true,
            (ScopeKey::Team(a), ScopeKey::Team(b)) => a == b,
            (ScopeKey::Player(a), ScopeKey::Player(b)) => a.replay_player_id == b.replay_player_id,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum DetectionValue {
    Bool(bool),
    Int(i64),
    Text(String),
    Time(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub pattern_name: String,
    pub key: ScopeKey,
    pub value: DetectionValue,
}

impl DetectionResult {
    pub fn new(pattern_name: impl Into<String>, key: ScopeKey, value: DetectionValue) -> Self {
        DetectionResult {
            pattern_name: pattern_name.into(),
            key,
            value,
        }
    }

    pub fn scope(&self) -> Scope {
        self.key.scope()
    }

    /// Same pattern about the same replay, team or replay player
    pub fn same_detection(&self, other: &DetectionResult) -> bool {
        self.pattern_name == other.pattern_name && self.key.same_subject(&other.key)
    }

    /// False only for player results still waiting on a durable id
    pub fn is_resolved(&self) -> bool {
        match &self.key {
            ScopeKey::Player(player) => player.player_id.is_some(),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no durable id for replay players {0:?}")]
pub struct UnresolvedPlayers(pub Vec<ReplayPlayerId>);

/// Rewrite transient player ids on `results` to durable ids from `ids`.
///
/// Results whose transient id is missing from `ids` keep `player_id: None`
/// and are reported back; they are never given a default.
pub fn remap_player_ids(
    results: &mut [DetectionResult],
    ids: &HashMap<ReplayPlayerId, PlayerId>,
) -> Result<(), UnresolvedPlayers> {
    let mut missing = BTreeSet::new();

    for result in results.iter_mut() {
        if let ScopeKey::Player(player) = &mut result.key {
            if player.player_id.is_some() {
                continue;
            }
            match ids.get(&player.replay_player_id) {
                Some(id) => player.player_id = Some(*id),
                None => {
                    missing.insert(player.replay_player_id);
                }
            }
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(UnresolvedPlayers(missing.into_iter().collect()))
    }
}

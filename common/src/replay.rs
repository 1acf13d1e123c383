use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Command, Player};

/// Replay-wide metadata decoded from the file header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayHeader {
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub host: String,
    pub map_name: String,
    #[serde(default)]
    pub map_width: u16,
    #[serde(default)]
    pub map_height: u16,
    pub frame_count: u32,
    #[serde(default)]
    pub engine: String,
    #[serde(default)]
    pub engine_version: String,
    #[serde(default)]
    pub game_speed: String,
    #[serde(default)]
    pub game_type: String,
    #[serde(default)]
    pub home_team_size: u16,
    #[serde(default)]
    pub avail_slots_count: u8,
}

impl ReplayHeader {
    pub fn new(start_time: DateTime<Utc>, map_name: impl Into<String>, frame_count: u32) -> Self {
        ReplayHeader {
            start_time,
            title: String::new(),
            host: String::new(),
            map_name: map_name.into(),
            map_width: 128,
            map_height: 128,
            frame_count,
            engine: "Brood War".to_string(),
            engine_version: String::new(),
            game_speed: "Fastest".to_string(),
            game_type: "Melee".to_string(),
            home_team_size: 0,
            avail_slots_count: 0,
        }
    }

    pub fn duration_seconds(&self) -> u32 {
        crate::frame_to_seconds(self.frame_count)
    }

    /// Wall-clock time at which something happened `seconds` into the game
    pub fn time_at(&self, seconds: u32) -> DateTime<Utc> {
        self.start_time + Duration::seconds(i64::from(seconds))
    }
}

/// Everything the decoder extracts from one replay file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedReplay {
    pub header: ReplayHeader,
    pub players: Vec<Player>,
    pub commands: Vec<Command>,
}

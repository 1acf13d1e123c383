use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// Player id as it appears inside one replay file (0-254, computers are 255).
///
/// Only meaningful while that replay is being processed. Never convertible
/// into a [`PlayerId`]; the storage layer hands out a translation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplayPlayerId(pub u8);

impl ReplayPlayerId {
    /// Every computer player in a replay carries the same id
    pub fn is_computer(&self) -> bool {
        self.0 == crate::COMPUTER_PLAYER_ID
    }
}

impl fmt::Display for ReplayPlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Durable row id of a player once persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub i64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Race {
    Terran,
    Protoss,
    Zerg,
    Unknown,
}

impl Race {
    pub fn as_str(&self) -> &'static str {
        match self {
            Race::Terran => "Terran",
            Race::Protoss => "Protoss",
            Race::Zerg => "Zerg",
            Race::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Race {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Terran" => Ok(Race::Terran),
            "Protoss" => Ok(Race::Protoss),
            "Zerg" => Ok(Race::Zerg),
            "Unknown" => Ok(Race::Unknown),
            other => Err(ParseError::UnknownRace(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: ReplayPlayerId,
    pub slot_id: u16,
    pub name: String,
    pub race: Race,
    #[serde(default = "default_player_type")]
    pub player_type: String,
    #[serde(default)]
    pub color: String,
    pub team: u8,
    #[serde(default)]
    pub is_observer: bool,
    #[serde(default)]
    pub apm: u32,
    #[serde(default)]
    pub eapm: u32,
    #[serde(default)]
    pub is_winner: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_location: Option<(i32, i32)>,
}

fn default_player_type() -> String {
    "Human".to_string()
}

impl Player {
    pub fn new(id: u8, name: impl Into<String>, race: Race, team: u8) -> Self {
        Player {
            id: ReplayPlayerId(id),
            slot_id: u16::from(id),
            name: name.into(),
            race,
            player_type: default_player_type(),
            color: String::new(),
            team,
            is_observer: false,
            apm: 0,
            eapm: 0,
            is_winner: false,
            start_location: None,
        }
    }

    pub fn observer(mut self) -> Self {
        self.is_observer = true;
        self
    }

    pub fn computer(name: impl Into<String>, race: Race, team: u8) -> Self {
        let mut player = Player::new(crate::COMPUTER_PLAYER_ID, name, race, team);
        player.player_type = "Computer".to_string();
        player
    }
}

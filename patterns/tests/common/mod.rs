#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use ::common::{ActionType, Command, DecodedReplay, Player, Race, ReplayHeader, ReplayPlayerId};

/// Builds small in-memory replays for detector tests
pub struct TestReplayBuilder {
    header: ReplayHeader,
    players: Vec<Player>,
    commands: Vec<Command>,
}

impl TestReplayBuilder {
    pub fn new() -> Self {
        let start = Utc.with_ymd_and_hms(2023, 11, 5, 18, 30, 0).unwrap();
        Self {
            header: ReplayHeader::new(start, "Fighting Spirit", 30_000),
            players: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn with_player(mut self, id: u8, race: Race, team: u8) -> Self {
        self.players.push(Player::new(id, format!("player{}", id), race, team));
        self
    }

    pub fn with_observer(mut self, id: u8) -> Self {
        self.players.push(Player::new(id, format!("obs{}", id), Race::Unknown, 0).observer());
        self
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn build(self) -> DecodedReplay {
        DecodedReplay {
            header: self.header,
            players: self.players,
            commands: self.commands,
        }
    }
}

pub fn command(player: u8, frame: u32, action: ActionType, unit: &str) -> Command {
    Command::new(ReplayPlayerId(player), frame, action).with_unit(unit)
}

pub fn noise(player: u8, frame: u32) -> Command {
    Command::new(ReplayPlayerId(player), frame, ActionType::RightClick).with_position(1000, 1000)
}

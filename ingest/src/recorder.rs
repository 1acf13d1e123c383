use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use common::{Command, DecodedReplay, Player, ReplayHeader};
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

/// Writes replays in the container format read by
/// [`crate::decoder::GzipJsonDecoder`].
pub struct ReplayRecorder {
    header: ReplayHeader,
    players: Vec<Player>,
    commands: Vec<Command>,
}

impl ReplayRecorder {
    pub fn new(header: ReplayHeader) -> Self {
        Self {
            header,
            players: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn from_replay(replay: DecodedReplay) -> Self {
        Self {
            header: replay.header,
            players: replay.players,
            commands: replay.commands,
        }
    }

    pub fn add_player(&mut self, player: Player) {
        self.players.push(player);
    }

    pub fn record_command(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create replay output directory")?;
        }

        let file = File::create(path).with_context(|| format!("Failed to create replay file {:?}", path))?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());

        // Header first, then players, then one command per line
        writeln!(encoder, "{}", serde_json::to_string(&self.header)?)?;
        writeln!(encoder, "{}", serde_json::to_string(&self.players)?)?;
        for command in &self.commands {
            writeln!(encoder, "{}", serde_json::to_string(command)?)?;
        }

        encoder
            .finish()?
            .flush()
            .with_context(|| format!("Failed to flush replay file {:?}", path))?;

        debug!("Saved replay with {} commands to {:?}", self.commands.len(), path);
        Ok(())
    }
}

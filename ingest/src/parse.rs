use std::collections::HashSet;
use std::sync::Arc;

use common::ReplayPlayerId;
use patterns::{DetectorRegistry, Orchestrator};
use tracing::debug;

use crate::db::models::ParsedReplay;
use crate::decoder::ReplayDecoder;
use crate::error::DecodeError;
use crate::files::FileCandidate;

/// Decode one file and run every detector over it in a single pass.
///
/// Commands from players missing from the player list are dropped before
/// detection and storage. Blocking; call from the blocking pool.
pub fn parse_replay(
    decoder: &dyn ReplayDecoder,
    registry: &Arc<DetectorRegistry>,
    file: FileCandidate,
) -> Result<ParsedReplay, DecodeError> {
    let decoded = decoder.decode(&file.path)?;
    let known: HashSet<ReplayPlayerId> = decoded.players.iter().map(|p| p.id).collect();

    let mut orchestrator = Orchestrator::new(Arc::clone(registry));
    orchestrator.initialize(&decoded.header, &decoded.players);

    let mut commands = Vec::with_capacity(decoded.commands.len());
    let mut dropped = 0usize;
    for command in decoded.commands {
        if !known.contains(&command.player) {
            dropped += 1;
            continue;
        }
        orchestrator.process_command(&command);
        commands.push(command);
    }
    if dropped > 0 {
        debug!("Dropped {} commands from unknown players in {}", dropped, file.name);
    }

    let detections = orchestrator.collect_results();
    debug!(
        "Parsed {}: {} players, {} commands, {} detections",
        file.name,
        decoded.players.len(),
        commands.len(),
        detections.len()
    );

    Ok(ParsedReplay {
        file,
        header: decoded.header,
        players: decoded.players,
        commands,
        detections,
    })
}

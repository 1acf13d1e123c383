use common::{Command, Player, ReplayHeader};
use patterns::DetectionResult;

use crate::files::FileCandidate;

/// A decoded, analysed replay on its way to the storage writer.
#[derive(Debug, Clone)]
pub struct ParsedReplay {
    pub file: FileCandidate,
    pub header: ReplayHeader,
    pub players: Vec<Player>,
    /// Commands from known players only, in frame order
    pub commands: Vec<Command>,
    /// Player results still carry transient ids here
    pub detections: Vec<DetectionResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistReport {
    pub replay_id: i64,
    pub players: usize,
    pub commands: usize,
    pub detections: usize,
}

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use common::{Command, Player, PlayerId, ReplayHeader, ReplayPlayerId};
use tracing::debug;

use crate::detector::Detector;
use crate::registry::DetectorRegistry;
use crate::result::{remap_player_ids, DetectionResult, UnresolvedPlayers};

/// Owns every detector instance for one replay and feeds them the command
/// stream in order.
pub struct Orchestrator {
    registry: Arc<DetectorRegistry>,
    detectors: Vec<Box<dyn Detector>>,
    results: Vec<DetectionResult>,
}

impl Orchestrator {
    pub fn new(registry: Arc<DetectorRegistry>) -> Self {
        Orchestrator {
            registry,
            detectors: Vec::new(),
            results: Vec::new(),
        }
    }

    /// Instantiate and initialise detectors for this replay's players.
    ///
    /// Replay factories run once, player factories once per non-observer and
    /// team factories once per distinct non-zero team among non-observers.
    pub fn initialize(&mut self, header: &ReplayHeader, players: &[Player]) {
        self.detectors.clear();
        self.results.clear();

        for factory in self.registry.replay_factories() {
            self.detectors.push(factory());
        }

        let active: Vec<&Player> = players.iter().filter(|p| !p.is_observer).collect();
        for player in &active {
            for factory in self.registry.player_factories() {
                self.detectors.push(factory(player.id));
            }
        }

        let teams: BTreeSet<u8> = active.iter().map(|p| p.team).filter(|team| *team != 0).collect();
        for team in teams {
            for factory in self.registry.team_factories() {
                self.detectors.push(factory(team));
            }
        }

        for detector in self.detectors.iter_mut() {
            detector.initialize(header, players);
        }

        debug!(
            "Initialized {} detectors for {} players on {}",
            self.detectors.len(),
            players.len(),
            header.map_name
        );
    }

    pub fn process_command(&mut self, command: &Command) {
        for detector in self.detectors.iter_mut() {
            if detector.is_finished() {
                continue;
            }
            if detector.process_command(command) && detector.should_persist() {
                if let Some(result) = detector.result() {
                    self.results.push(result);
                }
            }
        }
    }

    /// Final result list: anything captured during the feed plus any finished
    /// detector whose result was not captured yet.
    pub fn collect_results(&mut self) -> Vec<DetectionResult> {
        for detector in &self.detectors {
            if !detector.is_finished() || !detector.should_persist() {
                continue;
            }
            let Some(result) = detector.result() else {
                continue;
            };
            if !self.results.iter().any(|existing| existing.same_detection(&result)) {
                self.results.push(result);
            }
        }
        self.results.clone()
    }

    /// Rewrite transient player ids on the accumulated results.
    ///
    /// Missing ids are left unset and returned as an error for the caller to
    /// surface before persisting.
    pub fn remap_player_ids(&mut self, ids: &HashMap<ReplayPlayerId, PlayerId>) -> Result<(), UnresolvedPlayers> {
        remap_player_ids(&mut self.results, ids)
    }

    pub fn results(&self) -> &[DetectionResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<DetectionResult> {
        self.results
    }

    pub fn detectors(&self) -> &[Box<dyn Detector>] {
        &self.detectors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{ActionType, Race, UNIT_CARRIER};

    use crate::detector::Binding;
    use crate::matcher::Matcher;
    use crate::result::ScopeKey;
    use crate::threshold::ThresholdCount;

    #[test]
    fn result_on_last_command_is_collected_once() {
        let registry = DetectorRegistry::new().with_replay(|| {
            Box::new(ThresholdCount::new(
                "Had Carriers",
                Binding::Replay,
                Matcher::UnitBuild(UNIT_CARRIER),
                1,
            ))
        });
        let mut orchestrator = Orchestrator::new(Arc::new(registry));
        let players = vec![Player::new(0, "alpha", Race::Protoss, 1)];
        orchestrator.initialize(&ReplayHeader::new(Utc::now(), "Python", 100), &players);

        orchestrator.process_command(&Command::new(ReplayPlayerId(0), 90, ActionType::Train).with_unit(UNIT_CARRIER));

        let results = orchestrator.collect_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, ScopeKey::Replay);

        assert_eq!(orchestrator.collect_results().len(), 1);
    }

    #[test]
    fn empty_registry_yields_nothing() {
        let mut orchestrator = Orchestrator::new(Arc::new(DetectorRegistry::new()));
        let players = vec![Player::new(0, "alpha", Race::Zerg, 1)];
        orchestrator.initialize(&ReplayHeader::new(Utc::now(), "Python", 100), &players);
        orchestrator.process_command(&Command::new(ReplayPlayerId(0), 1, ActionType::Move));

        assert!(orchestrator.detectors().is_empty());
        assert!(orchestrator.collect_results().is_empty());
    }
}

use std::collections::HashMap;

use common::{Command, Player, ReplayHeader, ReplayPlayerId};

use crate::detector::{Binding, Detector, ScopeFilter};
use crate::matcher::Matcher;
use crate::result::{DetectionResult, DetectionValue};

/// Counts matching commands per player and finishes once any single
/// player's count reaches the threshold.
pub struct ThresholdCount {
    name: String,
    filter: ScopeFilter,
    matcher: Matcher,
    threshold: u32,
    counts: HashMap<ReplayPlayerId, u32>,
    finished: bool,
}

impl ThresholdCount {
    pub fn new(name: impl Into<String>, binding: Binding, matcher: Matcher, threshold: u32) -> Self {
        ThresholdCount {
            name: name.into(),
            filter: ScopeFilter::new(binding),
            matcher,
            threshold: threshold.max(1),
            counts: HashMap::new(),
            finished: false,
        }
    }

    pub fn count(&self, player: ReplayPlayerId) -> u32 {
        self.counts.get(&player).copied().unwrap_or(0)
    }

    fn reached(&self) -> bool {
        self.counts.values().any(|count| *count >= self.threshold)
    }
}

impl Detector for ThresholdCount {
    fn name(&self) -> &str {
        &self.name
    }

    fn binding(&self) -> Binding {
        self.filter.binding()
    }

    fn initialize(&mut self, _header: &ReplayHeader, players: &[Player]) {
        self.filter.initialize(players);
    }

    fn process_command(&mut self, command: &Command) -> bool {
        if self.finished {
            return false;
        }
        if !self.filter.accepts(command) || !self.matcher.matches(command) {
            return false;
        }

        let count = self.counts.entry(command.player).or_insert(0);
        *count += 1;
        if *count >= self.threshold {
            self.finished = true;
        }
        self.finished
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn result(&self) -> Option<DetectionResult> {
        if !self.finished || !self.reached() {
            return None;
        }
        Some(DetectionResult::new(
            self.name.clone(),
            self.filter.binding().key(),
            DetectionValue::Bool(true),
        ))
    }

    fn should_persist(&self) -> bool {
        self.finished && self.reached()
    }
}

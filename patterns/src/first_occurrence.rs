use common::{Command, Player, ReplayHeader};

use crate::detector::{Binding, Detector, ScopeFilter};
use crate::matcher::Matcher;
use crate::result::{DetectionResult, DetectionValue};

/// How a first-occurrence detector reports what it saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceValue {
    /// Seconds from game start
    Seconds,
    /// Replay start time plus the elapsed seconds
    GameTime,
    /// Upgrade, tech or unit name carried by the matching command
    Name,
}

#[derive(Debug, Clone)]
struct Occurrence {
    seconds: u32,
    label: Option<String>,
}

/// Remembers the first command matching a predicate and finishes on it.
pub struct FirstOccurrence {
    name: String,
    filter: ScopeFilter,
    matcher: Matcher,
    report: OccurrenceValue,
    header: Option<ReplayHeader>,
    found: Option<Occurrence>,
}

impl FirstOccurrence {
    pub fn new(name: impl Into<String>, binding: Binding, matcher: Matcher, report: OccurrenceValue) -> Self {
        FirstOccurrence {
            name: name.into(),
            filter: ScopeFilter::new(binding),
            matcher,
            report,
            header: None,
            found: None,
        }
    }

    pub fn seconds(&self) -> Option<u32> {
        self.found.as_ref().map(|o| o.seconds)
    }

    fn value(&self, occurrence: &Occurrence) -> Option<DetectionValue> {
        match self.report {
            OccurrenceValue::Seconds => Some(DetectionValue::Int(i64::from(occurrence.seconds))),
            OccurrenceValue::GameTime => {
                let header = self.header.as_ref()?;
                Some(DetectionValue::Time(header.time_at(occurrence.seconds)))
            }
            OccurrenceValue::Name => occurrence.label.clone().map(DetectionValue::Text),
        }
    }
}

fn label_of(command: &Command) -> Option<String> {
    command
        .upgrade_name
        .clone()
        .or_else(|| command.tech_name.clone())
        .or_else(|| command.unit_type.clone())
}

impl Detector for FirstOccurrence {
    fn name(&self) -> &str {
        &self.name
    }

    fn binding(&self) -> Binding {
        self.filter.binding()
    }

    fn initialize(&mut self, header: &ReplayHeader, players: &[Player]) {
        self.header = Some(header.clone());
        self.filter.initialize(players);
    }

    fn process_command(&mut self, command: &Command) -> bool {
        if self.found.is_some() {
            return false;
        }
        if !self.filter.accepts(command) || !self.matcher.matches(command) {
            return false;
        }
        self.found = Some(Occurrence {
            seconds: command.seconds,
            label: label_of(command),
        });
        true
    }

    fn is_finished(&self) -> bool {
        self.found.is_some()
    }

    fn result(&self) -> Option<DetectionResult> {
        let occurrence = self.found.as_ref()?;
        let value = self.value(occurrence)?;
        Some(DetectionResult::new(self.name.clone(), self.filter.binding().key(), value))
    }

    fn should_persist(&self) -> bool {
        self.result().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::{ActionType, Race, ReplayPlayerId, BUILDING_GATEWAY, BUILDING_NEXUS};

    fn setup(detector: &mut FirstOccurrence) {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap();
        let header = ReplayHeader::new(start, "Fighting Spirit", 20_000);
        let players = vec![
            Player::new(0, "alpha", Race::Protoss, 1),
            Player::new(1, "bravo", Race::Protoss, 2),
        ];
        detector.initialize(&header, &players);
    }

    fn gateway(id: u8, frame: u32) -> Command {
        Command::new(ReplayPlayerId(id), frame, ActionType::Build).with_unit(BUILDING_GATEWAY)
    }

    #[test]
    fn records_first_match_and_stops() {
        let mut detector = FirstOccurrence::new(
            "Seconds to First Gateway Build Triggered",
            Binding::Player(ReplayPlayerId(0)),
            Matcher::ActionAndUnit(ActionType::Build, BUILDING_GATEWAY),
            OccurrenceValue::Seconds,
        );
        setup(&mut detector);

        assert!(!detector.process_command(&Command::new(ReplayPlayerId(0), 50, ActionType::Move)));
        assert!(detector.process_command(&gateway(0, 2400)));
        assert!(detector.is_finished());
        assert_eq!(detector.result().unwrap().value, DetectionValue::Int(100));

        assert!(!detector.process_command(&gateway(0, 4800)));
        assert_eq!(detector.result().unwrap().value, DetectionValue::Int(100));
    }

    #[test]
    fn unfinished_detector_has_nothing_to_persist() {
        let mut detector = FirstOccurrence::new(
            "Seconds to First Gateway Build Triggered",
            Binding::Player(ReplayPlayerId(0)),
            Matcher::ActionAndUnit(ActionType::Build, BUILDING_GATEWAY),
            OccurrenceValue::Seconds,
        );
        setup(&mut detector);

        detector.process_command(&gateway(1, 100));

        assert!(!detector.is_finished());
        assert!(detector.result().is_none());
        assert!(!detector.should_persist());
    }

    #[test]
    fn game_time_is_offset_from_replay_start() {
        let mut detector = FirstOccurrence::new(
            "First Expansion Attempted",
            Binding::Replay,
            Matcher::BaseBuild,
            OccurrenceValue::GameTime,
        );
        setup(&mut detector);

        let nexus = Command::new(ReplayPlayerId(1), 24 * 60 * 4, ActionType::Build).with_unit(BUILDING_NEXUS);
        assert!(detector.process_command(&nexus));

        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 20, 4, 1).unwrap();
        assert_eq!(detector.result().unwrap().value, DetectionValue::Time(expected));
    }

    #[test]
    fn name_reports_the_upgrade() {
        let mut detector = FirstOccurrence::new(
            "First Upgrade Researched",
            Binding::Player(ReplayPlayerId(1)),
            Matcher::Upgrade,
            OccurrenceValue::Name,
        );
        setup(&mut detector);

        let upgrade = Command::new(ReplayPlayerId(1), 9000, ActionType::Upgrade).with_upgrade("Singularity Charge");
        assert!(detector.process_command(&upgrade));
        assert_eq!(
            detector.result().unwrap().value,
            DetectionValue::Text("Singularity Charge".to_string())
        );
    }
}

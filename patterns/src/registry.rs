use common::{
    ActionType, ReplayPlayerId, BUILDING_FACTORY, BUILDING_GATEWAY, BUILDING_SPAWNING_POOL, UNIT_CARRIER,
    UNIT_MUTALISK, UNIT_ZERGLING,
};

use crate::detector::{Binding, Detector};
use crate::first_occurrence::{FirstOccurrence, OccurrenceValue};
use crate::matcher::Matcher;
use crate::result::Scope;
use crate::threshold::ThresholdCount;

pub type ReplayFactory = Box<dyn Fn() -> Box<dyn Detector> + Send + Sync>;
pub type TeamFactory = Box<dyn Fn(u8) -> Box<dyn Detector> + Send + Sync>;
pub type PlayerFactory = Box<dyn Fn(ReplayPlayerId) -> Box<dyn Detector> + Send + Sync>;

/// Detector shape plus its parameters
#[derive(Debug, Clone)]
pub enum Shape {
    FirstOccurrence { matcher: Matcher, report: OccurrenceValue },
    Threshold { matcher: Matcher, threshold: u32 },
}

/// One named pattern and the scopes it runs at.
#[derive(Debug, Clone)]
pub struct PatternSpec {
    pub name: &'static str,
    pub scopes: &'static [Scope],
    pub shape: Shape,
}

impl PatternSpec {
    pub fn build(&self, binding: Binding) -> Box<dyn Detector> {
        match &self.shape {
            Shape::FirstOccurrence { matcher, report } => {
                Box::new(FirstOccurrence::new(self.name, binding, matcher.clone(), *report))
            }
            Shape::Threshold { matcher, threshold } => {
                Box::new(ThresholdCount::new(self.name, binding, matcher.clone(), *threshold))
            }
        }
    }
}

fn first_seconds(name: &'static str, action: ActionType, unit: &'static str) -> PatternSpec {
    PatternSpec {
        name,
        scopes: &[Scope::Replay, Scope::Player],
        shape: Shape::FirstOccurrence {
            matcher: Matcher::ActionAndUnit(action, unit),
            report: OccurrenceValue::Seconds,
        },
    }
}

/// The pattern table every ingest run evaluates
pub fn standard_patterns() -> Vec<PatternSpec> {
    vec![
        PatternSpec {
            name: "Had Carriers",
            scopes: &[Scope::Replay],
            shape: Shape::Threshold {
                matcher: Matcher::UnitBuild(UNIT_CARRIER),
                threshold: 3,
            },
        },
        PatternSpec {
            name: "Did Carriers",
            scopes: &[Scope::Team, Scope::Player],
            shape: Shape::Threshold {
                matcher: Matcher::UnitBuild(UNIT_CARRIER),
                threshold: 3,
            },
        },
        first_seconds("Seconds to First Carrier Build Triggered", ActionType::Train, UNIT_CARRIER),
        first_seconds("Seconds to First Factory Build Triggered", ActionType::Build, BUILDING_FACTORY),
        first_seconds("Seconds to First Gateway Build Triggered", ActionType::Build, BUILDING_GATEWAY),
        first_seconds("Seconds to First Mutalisk Morph Triggered", ActionType::UnitMorph, UNIT_MUTALISK),
        first_seconds(
            "Seconds to First Spawning Pool Morph Triggered",
            ActionType::Build,
            BUILDING_SPAWNING_POOL,
        ),
        first_seconds("Seconds to First Zergling Morph Triggered", ActionType::UnitMorph, UNIT_ZERGLING),
        PatternSpec {
            name: "First Expansion Attempted",
            scopes: &[Scope::Replay, Scope::Player],
            shape: Shape::FirstOccurrence {
                matcher: Matcher::BaseBuild,
                report: OccurrenceValue::GameTime,
            },
        },
        PatternSpec {
            name: "First Attacking Unit Built",
            scopes: &[Scope::Player],
            shape: Shape::FirstOccurrence {
                matcher: Matcher::AttackingUnitBuild,
                report: OccurrenceValue::Name,
            },
        },
        PatternSpec {
            name: "First Upgrade Researched",
            scopes: &[Scope::Player],
            shape: Shape::FirstOccurrence {
                matcher: Matcher::Upgrade,
                report: OccurrenceValue::Name,
            },
        },
    ]
}

/// Detector constructors grouped by scope.
///
/// Passed explicitly to each `Orchestrator`; tests build reduced registries
/// with the `with_*` methods.
#[derive(Default)]
pub struct DetectorRegistry {
    replay: Vec<ReplayFactory>,
    team: Vec<TeamFactory>,
    player: Vec<PlayerFactory>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        let mut registry = Self::new();
        for pattern in standard_patterns() {
            registry = registry.with_pattern(pattern);
        }
        registry
    }

    pub fn with_replay<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Detector> + Send + Sync + 'static,
    {
        self.replay.push(Box::new(factory));
        self
    }

    pub fn with_team<F>(mut self, factory: F) -> Self
    where
        F: Fn(u8) -> Box<dyn Detector> + Send + Sync + 'static,
    {
        self.team.push(Box::new(factory));
        self
    }

    pub fn with_player<F>(mut self, factory: F) -> Self
    where
        F: Fn(ReplayPlayerId) -> Box<dyn Detector> + Send + Sync + 'static,
    {
        self.player.push(Box::new(factory));
        self
    }

    /// Register one factory per scope listed on the pattern
    pub fn with_pattern(mut self, pattern: PatternSpec) -> Self {
        for scope in pattern.scopes {
            let pattern = pattern.clone();
            self = match scope {
                Scope::Replay => self.with_replay(move || pattern.build(Binding::Replay)),
                Scope::Team => self.with_team(move |team| pattern.build(Binding::Team(team))),
                Scope::Player => self.with_player(move |id| pattern.build(Binding::Player(id))),
            };
        }
        self
    }

    pub fn replay_factories(&self) -> &[ReplayFactory] {
        &self.replay
    }

    pub fn team_factories(&self) -> &[TeamFactory] {
        &self.team
    }

    pub fn player_factories(&self) -> &[PlayerFactory] {
        &self.player
    }
}

use std::collections::HashSet;

use common::{Command, Player, ReplayHeader, ReplayPlayerId};

use crate::result::{DetectionResult, Scope, ScopeKey};

/// What a detector instance is bound to. Chosen by the factory that builds
/// it, never by `initialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    Replay,
    Team(u8),
    Player(ReplayPlayerId),
}

impl Binding {
    pub fn scope(&self) -> Scope {
        match self {
            Binding::Replay => Scope::Replay,
            Binding::Team(_) => Scope::Team,
            Binding::Player(_) => Scope::Player,
        }
    }

    /// Key for a result produced under this binding
    pub fn key(&self) -> ScopeKey {
        match self {
            Binding::Replay => ScopeKey::Replay,
            Binding::Team(team) => ScopeKey::Team(*team),
            Binding::Player(id) => ScopeKey::player(*id),
        }
    }
}

/// Decides which commands belong to a binding.
///
/// Replay scope accepts commands from any known player. Team scope accepts
/// the non-observer members of the team. Player scope accepts exactly one id.
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    binding: Binding,
    members: HashSet<ReplayPlayerId>,
}

impl ScopeFilter {
    pub fn new(binding: Binding) -> Self {
        ScopeFilter {
            binding,
            members: HashSet::new(),
        }
    }

    pub fn initialize(&mut self, players: &[Player]) {
        self.members = match self.binding {
            Binding::Replay => players.iter().map(|p| p.id).collect(),
            Binding::Team(team) => players
                .iter()
                .filter(|p| !p.is_observer && p.team == team)
                .map(|p| p.id)
                .collect(),
            Binding::Player(id) => HashSet::from([id]),
        };
    }

    pub fn binding(&self) -> Binding {
        self.binding
    }

    pub fn accepts(&self, command: &Command) -> bool {
        self.members.contains(&command.player)
    }
}

/// A single-pass stateful matcher over one replay's command stream.
///
/// `process_command` is only called while `is_finished` is false and returns
/// true on exactly the call that finishes the detector. Commands outside the
/// detector's binding must leave its state untouched.
pub trait Detector: Send {
    fn name(&self) -> &str;

    fn scope(&self) -> Scope {
        self.binding().scope()
    }

    fn binding(&self) -> Binding;

    fn initialize(&mut self, header: &ReplayHeader, players: &[Player]);

    fn process_command(&mut self, command: &Command) -> bool;

    fn is_finished(&self) -> bool;

    /// Only meaningful once finished. `None` when nothing positive was seen.
    fn result(&self) -> Option<DetectionResult>;

    /// Negative outcomes finish the detector but are never stored.
    fn should_persist(&self) -> bool;
}

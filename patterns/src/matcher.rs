use common::{ActionType, Command};

/// Predicate over a single command, expressed as data so patterns can be
/// declared in a table.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Given action on the given unit or building
    ActionAndUnit(ActionType, &'static str),
    /// Any unit-producing action (Train or Unit Morph) for the unit
    UnitBuild(&'static str),
    /// Train or Unit Morph of anything but workers and Overlords
    AttackingUnitBuild,
    BaseBuild,
    Upgrade,
}

impl Matcher {
    pub fn matches(&self, command: &Command) -> bool {
        match self {
            Matcher::ActionAndUnit(action, unit) => {
                command.action == *action && command.unit_type() == Some(*unit)
            }
            Matcher::UnitBuild(unit) => command.is_unit_build() && command.unit_type() == Some(*unit),
            Matcher::AttackingUnitBuild => command.is_attacking_unit_build(),
            Matcher::BaseBuild => command.is_base_build(),
            Matcher::Upgrade => command.action == ActionType::Upgrade && command.is_upgrade(),
        }
    }
}

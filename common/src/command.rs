use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::{ParseError, ReplayPlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    Build,
    Train,
    #[serde(rename = "Unit Morph")]
    UnitMorph,
    #[serde(rename = "Building Morph")]
    BuildingMorph,
    Tech,
    Upgrade,
    Move,
    #[serde(rename = "Right Click")]
    RightClick,
    #[serde(rename = "Targeted Order")]
    TargetedOrder,
    Stop,
    #[serde(rename = "Hold Position")]
    HoldPosition,
    Select,
    Hotkey,
    #[serde(rename = "Cancel Train")]
    CancelTrain,
    #[serde(rename = "Lift Off")]
    LiftOff,
    Land,
    Unload,
    Chat,
    #[serde(rename = "Leave Game")]
    LeaveGame,
    #[serde(rename = "Game Speed")]
    GameSpeed,
    Alliance,
    Vision,
    #[serde(rename = "Minimap Ping")]
    MinimapPing,
    Other,
}

impl ActionType {
    pub const ALL: [ActionType; 24] = [
        ActionType::Build,
        ActionType::Train,
        ActionType::UnitMorph,
        ActionType::BuildingMorph,
        ActionType::Tech,
        ActionType::Upgrade,
        ActionType::Move,
        ActionType::RightClick,
        ActionType::TargetedOrder,
        ActionType::Stop,
        ActionType::HoldPosition,
        ActionType::Select,
        ActionType::Hotkey,
        ActionType::CancelTrain,
        ActionType::LiftOff,
        ActionType::Land,
        ActionType::Unload,
        ActionType::Chat,
        ActionType::LeaveGame,
        ActionType::GameSpeed,
        ActionType::Alliance,
        ActionType::Vision,
        ActionType::MinimapPing,
        ActionType::Other,
    ];

    /// Name stored in the `action_type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Build => "Build",
            ActionType::Train => "Train",
            ActionType::UnitMorph => "Unit Morph",
            ActionType::BuildingMorph => "Building Morph",
            ActionType::Tech => "Tech",
            ActionType::Upgrade => "Upgrade",
            ActionType::Move => "Move",
            ActionType::RightClick => "Right Click",
            ActionType::TargetedOrder => "Targeted Order",
            ActionType::Stop => "Stop",
            ActionType::HoldPosition => "Hold Position",
            ActionType::Select => "Select",
            ActionType::Hotkey => "Hotkey",
            ActionType::CancelTrain => "Cancel Train",
            ActionType::LiftOff => "Lift Off",
            ActionType::Land => "Land",
            ActionType::Unload => "Unload",
            ActionType::Chat => "Chat",
            ActionType::LeaveGame => "Leave Game",
            ActionType::GameSpeed => "Game Speed",
            ActionType::Alliance => "Alliance",
            ActionType::Vision => "Vision",
            ActionType::MinimapPing => "Minimap Ping",
            ActionType::Other => "Other",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionType::ALL
            .iter()
            .find(|action| action.as_str() == s)
            .copied()
            .ok_or_else(|| ParseError::UnknownActionType(s.to_string()))
    }
}

/// One player action at a point in game time.
///
/// Commands are immutable once decoded and arrive ordered by frame, ties
/// broken by decoder emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub player: ReplayPlayerId,
    pub frame: u32,
    pub seconds: u32,
    pub action: ActionType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_queued: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotkey_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotkey_group: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leave_reason: Option<String>,
}

impl Command {
    /// Bare command with no payload; `seconds` is derived from `frame`.
    pub fn new(player: ReplayPlayerId, frame: u32, action: ActionType) -> Self {
        Command {
            player,
            frame,
            seconds: frame_to_seconds(frame),
            action,
            unit_type: None,
            x: None,
            y: None,
            is_queued: None,
            order_name: None,
            tech_name: None,
            upgrade_name: None,
            hotkey_type: None,
            hotkey_group: None,
            chat_message: None,
            leave_reason: None,
        }
    }

    pub fn with_unit(mut self, unit_type: impl Into<String>) -> Self {
        self.unit_type = Some(unit_type.into());
        self
    }

    pub fn with_position(mut self, x: i32, y: i32) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn with_upgrade(mut self, upgrade_name: impl Into<String>) -> Self {
        self.upgrade_name = Some(upgrade_name.into());
        self
    }

    pub fn unit_type(&self) -> Option<&str> {
        self.unit_type.as_deref()
    }

    pub fn is_unit_build(&self) -> bool {
        matches!(self.action, ActionType::UnitMorph | ActionType::Train)
    }

    pub fn is_attacking_unit_build(&self) -> bool {
        if !self.is_unit_build() {
            return false;
        }
        match self.unit_type() {
            Some(name) => !matches!(name, UNIT_DRONE | UNIT_PROBE | UNIT_SCV | UNIT_OVERLORD),
            None => false,
        }
    }

    pub fn is_base_build(&self) -> bool {
        self.action == ActionType::Build
            && matches!(
                self.unit_type(),
                Some(BUILDING_HATCHERY | BUILDING_NEXUS | BUILDING_COMMAND_CENTER)
            )
    }

    pub fn is_upgrade(&self) -> bool {
        self.upgrade_name.is_some()
    }
}

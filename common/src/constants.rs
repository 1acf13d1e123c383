/// Duration of one game frame at "fastest" speed, in milliseconds
pub const FRAME_DURATION_MS: u64 = 42;

/// Transient id used by the decoder for computer players
pub const COMPUTER_PLAYER_ID: u8 = 255;

// Unit and building names as the decoder reports them.
pub const UNIT_CARRIER: &str = "Carrier";
pub const UNIT_MUTALISK: &str = "Mutalisk";
pub const UNIT_ZERGLING: &str = "Zergling";
pub const UNIT_DRONE: &str = "Drone";
pub const UNIT_PROBE: &str = "Probe";
pub const UNIT_SCV: &str = "SCV";
pub const UNIT_OVERLORD: &str = "Overlord";

pub const BUILDING_FACTORY: &str = "Factory";
pub const BUILDING_GATEWAY: &str = "Gateway";
pub const BUILDING_SPAWNING_POOL: &str = "Spawning Pool";
pub const BUILDING_HATCHERY: &str = "Hatchery";
pub const BUILDING_NEXUS: &str = "Nexus";
pub const BUILDING_COMMAND_CENTER: &str = "Command Center";

/// Convert a frame number into whole seconds from game start
pub fn frame_to_seconds(frame: u32) -> u32 {
    (u64::from(frame) * FRAME_DURATION_MS / 1000) as u32
}

mod command;
mod constants;
mod player;
mod replay;

pub use command::*;
pub use constants::*;
pub use player::*;
pub use replay::*;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown action type: {0}")]
    UnknownActionType(String),
    #[error("unknown race: {0}")]
    UnknownRace(String),
}

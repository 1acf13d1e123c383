//! Single-pass pattern detection over a replay's command stream.
//!
//! Detectors are built per replay by the [`Orchestrator`] from a
//! [`DetectorRegistry`], fed every command once in order, and produce at most
//! one [`DetectionResult`] each. Player-scoped results carry the transient
//! [`common::ReplayPlayerId`] until the storage layer supplies durable ids.

mod detector;
mod first_occurrence;
mod matcher;
mod orchestrator;
mod registry;
mod result;
mod threshold;

pub use detector::*;
pub use first_occurrence::*;
pub use matcher::*;
pub use orchestrator::*;
pub use registry::*;
pub use result::*;
pub use threshold::*;

/// Bump when detector semantics change so stored detections can be told apart
pub const ALGORITHM_VERSION: i32 = 1;

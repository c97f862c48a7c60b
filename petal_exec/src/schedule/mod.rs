//! # Move scheduler
//!
//! Plans one batch of move requests into a collision free set of move tables.
//!
//! A [`PosSchedule`] goes through the following states:
//!
//! - `Collecting`: move requests are accepted, at most one per arm
//! - `Planning`: each request is turned into a direct move table from the arm's current pose
//! - `Validating`: the tables are simulated timestep by timestep and conflicts are resolved one
//!   at a time, earliest first, by freezing or adjusting the losing arm
//! - `Resolved` or `Frozen`: the terminal states of the [`Schedule`] produced
//!
//! Planning never changes any arm. Applying a resolved schedule is done separately.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod report;
mod state;
mod validate;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use pos_if::ArmId;
use serde::{Deserialize, Serialize};

// Internal
use crate::collider::CollisionError;

// Re-exports
pub use params::*;
pub use report::*;
pub use state::*;
pub use validate::*;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// State of a schedule.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleState {
    Collecting,
    Planning,
    Validating,
    Resolved,
    Frozen,
}

/// Reasons a batch is rejected before planning.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidBatch {
    /// More than one request for the same arm
    DuplicateArm(ArmId),

    /// Request for an arm which is not on the petal
    UnknownArm(ArmId),

    /// Relative and absolute requests mixed without the override being set
    MixedRelative,
}

/// Errors associated with scheduling.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ScheduleError {
    #[error("Batch rejected: {0:?}")]
    InvalidBatch(InvalidBatch),

    #[error("Schedule is in the {0:?} state, requests can only be scheduled while collecting")]
    NotCollecting(ScheduleState),

    #[error("Collision geometry error: {0}")]
    Collision(#[from] CollisionError),

    #[error("{} conflicts could not be resolved and the batch was frozen", .0.len())]
    CollisionUnresolved(Vec<Conflict>),

    #[error("Invalid schedule parameters: {0}")]
    InvalidParams(String),
}

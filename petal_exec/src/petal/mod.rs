//! # Petal coordinator
//!
//! A [`Petal`] owns every arm on one petal, their collision geometry and the scheduler settings.
//! It plans batches of requests without touching any arm, and is the single writer applying a
//! resolved schedule.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use crate::{
    arm_model::ArmError, collider::CollisionError, schedule::ScheduleError,
    transforms::FocalSurfaceError,
};

// Re-exports
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Errors raised by the petal coordinator.
#[derive(Debug, thiserror::Error)]
pub enum PetalError {
    #[error("Cannot load parameters: {0}")]
    ParamLoad(#[from] util::params::LoadError),

    #[error("Arm error: {0}")]
    Arm(#[from] ArmError),

    #[error("Collider error: {0}")]
    Collider(#[from] CollisionError),

    #[error("Invalid focal surface: {0}")]
    FocalSurface(#[from] FocalSurfaceError),

    #[error("Scheduling failed: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("The petal has not been initialised")]
    NotInitialised,
}

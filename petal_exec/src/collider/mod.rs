//! # Collision geometry
//!
//! Each arm is described by two keepout polygons: the central body, which rotates with theta
//! about the theta axis, and the phi arm, which rotates with theta and phi about the phi axis at
//! the end of the theta link. Fixed obstacles are polygons in the global frame.
//!
//! The [`Collider`] caches each arm's polygons built from its calibration. The cache is tagged
//! with the calibration version it was built from and any use of a cache entry that doesn't
//! match the arm's current version is a [`CollisionError::StaleGeometry`] error.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod arm_geometry;
mod params;
mod polygon;
mod state;
mod sweep;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use pos_if::ArmId;
use serde::{Deserialize, Serialize};

// Re-exports
pub use arm_geometry::*;
pub use params::*;
pub use polygon::*;
pub use state::*;
pub use sweep::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Geometric tolerance used by the polygon tests. Contacts closer than this are not collisions.
///
/// Units: millimeters (or square millimeters for cross products)
pub const GEOM_EPS: f64 = 1e-9;

/// Maximum number of timesteps in a single sweep.
pub const MAX_SWEEP_STEPS: usize = 1_000_000;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// The kind of overlap found between two arms, `a` and `b`.
///
/// "Arm" is the phi arm (the second link), "body" is the central body moved by theta (the first
/// link).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionClass {
    NoOverlap,

    /// Phi arm of `a` overlaps phi arm of `b`
    ArmArm,

    /// Phi arm of `a` overlaps central body of `b`
    ArmBody,

    /// Central body of `a` overlaps phi arm of `b`
    BodyArm,

    /// Both `ArmBody` and `BodyArm` at once
    ArmBodyMutual,

    /// Central bodies overlap
    BodyBody,
}

/// Errors associated with the collider.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum CollisionError {
    #[error(
        "Collision geometry for arm {id} is stale (built for calibration version {cached:?}, arm \
        is at version {current}), refresh it before planning"
    )]
    StaleGeometry {
        id: ArmId,
        cached: Option<u64>,
        current: u64,
    },

    #[error("Invalid keepout polygon {0}: {1}")]
    InvalidPolygon(String, String),

    #[error("Invalid collider parameters: {0}")]
    InvalidParams(String),

    #[error("Sweep of arm {0} needs more than the maximum number of timesteps")]
    SweepTooLong(ArmId),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CollisionClass {
    /// The classification seen from the other arm's point of view.
    pub fn mirrored(self) -> Self {
        match self {
            CollisionClass::ArmBody => CollisionClass::BodyArm,
            CollisionClass::BodyArm => CollisionClass::ArmBody,
            c => c,
        }
    }

    pub fn is_collision(self) -> bool {
        self != CollisionClass::NoOverlap
    }
}

impl Default for CollisionClass {
    fn default() -> Self {
        CollisionClass::NoOverlap
    }
}

//! # Arm model
//!
//! One [`ArmModel`] per arm on the petal, holding its calibration and its current joint position.
//! Models are kept in an [`ArmArena`] indexed by arm identifier.
//!
//! Planning only ever reads models. The single mutator, [`ArmModel::apply`], is reached through
//! [`ArmArena::apply_schedule`] once a schedule has been resolved.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod arena;
mod calib;
mod model;
mod store;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use pos_if::ArmId;

// Re-exports
pub use arena::*;
pub use calib::*;
pub use model::*;
pub use store::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Allowed excursion of the joint state beyond the hard-stop range.
///
/// Units: degrees
pub const STATE_TOL_DEG: f64 = 1e-6;

/// Nominal link lengths.
///
/// Units: millimeters
pub const NOMINAL_LENGTH_R1_MM: f64 = 3.0;
pub const NOMINAL_LENGTH_R2_MM: f64 = 3.0;

/// Nominal full travel of each axis between hard stops.
///
/// Units: degrees
pub const NOMINAL_PHYSICAL_RANGE_T_DEG: f64 = 370.0;
pub const NOMINAL_PHYSICAL_RANGE_P_DEG: f64 = 190.0;

/// Default size of the antibacklash backup.
///
/// Units: degrees
pub const DEFAULT_BACKLASH_DEG: f64 = 3.0;

/// Default distance of the final creep approach.
///
/// Units: degrees
pub const DEFAULT_FINAL_CREEP_DEG: f64 = 1.0;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Errors associated with an arm model.
#[derive(Debug, thiserror::Error)]
pub enum ArmError {
    #[error("Invalid calibration for arm {0}: {1}")]
    InvalidCalibration(ArmId, String),

    #[error(
        "Arm {id} state ({theta_deg:.6}, {phi_deg:.6}) deg is outside its hard-stop range, \
        calibration may be stale or corrupt"
    )]
    StateOutOfRange {
        id: ArmId,
        theta_deg: f64,
        phi_deg: f64,
    },

    #[error("Arm {0} is not in the arena")]
    UnknownArm(ArmId),

    #[error("Arm {0} is already in the arena")]
    DuplicateArm(ArmId),

    #[error("Could not access the calibration store for arm {0}: {1}")]
    Store(ArmId, CalibStoreError),
}

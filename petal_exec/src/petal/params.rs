//! Parameters structure for the petal

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use pos_if::ArmId;
use serde::{Deserialize, Serialize};

// Internal
use crate::arm_model::{ArmCalibration, ArmState};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// The arms mounted on a petal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PetalParams {
    pub arms: Vec<ArmDef>,
}

/// Definition of one arm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArmDef {
    pub id: ArmId,

    pub calibration: ArmCalibration,

    /// Last known joint position
    pub state: ArmState,
}

/// Names of the parameter files the petal is initialised from, relative to the params directory.
#[derive(Debug, Clone)]
pub struct PetalFiles {
    pub petal: &'static str,
    pub collider: &'static str,
    pub schedule: &'static str,
    pub focal_surface: &'static str,
}

impl Default for PetalFiles {
    fn default() -> Self {
        Self {
            petal: "petal.toml",
            collider: "collider.toml",
            schedule: "schedule.toml",
            focal_surface: "focal_surface.toml",
        }
    }
}

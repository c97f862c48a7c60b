//! # Coordinate transforms
//!
//! Conversions between the frames used to describe an arm's position:
//!
//! - joint angles (theta, phi), in degrees
//! - arm-local cartesian (x, y), centred on the theta axis, parallel to the global frame
//! - global cartesian (X, Y), on the petal
//! - focal surface (q, s), the polar angle about the optical axis and the distance along the
//!   curved focal surface
//! - flat (x, y), the focal surface coordinates laid out flat
//!
//! Arm lengths and positions are in millimeters.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod focal;
mod pos;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Re-exports
pub use focal::*;
pub use pos::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance on the reachable radius band, so targets exactly on the edge of the patrol envelope
/// aren't rejected by rounding.
///
/// Units: millimeters
pub const RADIUS_TOL_MM: f64 = 1e-9;

/// Cosine arguments within this distance of +/-1 are snapped onto +/-1 before inversion.
pub const ACOS_SNAP_TOL: f64 = 1.11e-14;

/// Tolerance used when checking joint angles against limits.
///
/// Units: degrees
pub const LIMIT_TOL_DEG: f64 = 1e-9;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Inclusive angular limits of both joints.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct JointLimits {
    /// Units: degrees
    pub theta: [f64; 2],

    /// Units: degrees
    pub phi: [f64; 2],
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq)]
pub enum TransformError {
    #[error(
        "Target radius {radius_mm:.4} mm is outside the reachable band [{min_mm:.4}, {max_mm:.4}] mm"
    )]
    Unreachable {
        radius_mm: f64,
        min_mm: f64,
        max_mm: f64,
    },

    #[error("Joint target ({theta_deg:.4}, {phi_deg:.4}) deg is outside the arm's range")]
    OutOfRange { theta_deg: f64, phi_deg: f64 },

    #[error("Coordinate is not a finite number (possibly outside the focal surface table)")]
    NonFinite,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl JointLimits {
    /// True if the theta angle is within limits.
    pub fn theta_ok(&self, theta_deg: f64) -> bool {
        within(theta_deg, self.theta, LIMIT_TOL_DEG)
    }

    /// True if the phi angle is within limits.
    pub fn phi_ok(&self, phi_deg: f64) -> bool {
        within(phi_deg, self.phi, LIMIT_TOL_DEG)
    }

    /// True if both angles are within limits, allowing the given tolerance.
    pub fn contains(&self, theta_deg: f64, phi_deg: f64, tol_deg: f64) -> bool {
        within(theta_deg, self.theta, tol_deg) && within(phi_deg, self.phi, tol_deg)
    }

    /// Clamp a phi angle into the limits.
    pub fn clamp_phi(&self, phi_deg: f64) -> f64 {
        util::maths::clamp(phi_deg, self.phi[0], self.phi[1])
    }

    /// Shrink the limits by the given clearance on each end of each axis.
    ///
    /// If an axis would become inverted it collapses onto its midpoint.
    pub fn shrunk(&self, clearance_theta_deg: f64, clearance_phi_deg: f64) -> JointLimits {
        JointLimits {
            theta: shrink(self.theta, clearance_theta_deg),
            phi: shrink(self.phi, clearance_phi_deg),
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn within(value: f64, range: [f64; 2], tol: f64) -> bool {
    value >= range[0] - tol && value <= range[1] + tol
}

fn shrink(range: [f64; 2], clearance: f64) -> [f64; 2] {
    let lo = range[0] + clearance;
    let hi = range[1] - clearance;
    if lo > hi {
        let mid = 0.5 * (range[0] + range[1]);
        [mid, mid]
    } else {
        [lo, hi]
    }
}

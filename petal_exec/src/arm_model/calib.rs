//! Arm calibration

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use super::*;
use crate::transforms::{JointLimits, PosTransforms};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Calibrated geometry of one arm.
///
/// Immutable during a planning cycle.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ArmCalibration {
    // ---- GEOMETRY ----
    /// Length of the theta link, from the theta axis to the phi axis.
    ///
    /// Units: millimeters
    pub length_r1: f64,

    /// Length of the phi link, from the phi axis to the fiber.
    ///
    /// Units: millimeters
    pub length_r2: f64,

    /// Angle of the theta zero in the petal frame.
    ///
    /// Units: degrees
    pub offset_theta: f64,

    /// Angle of the phi zero relative to the theta link.
    ///
    /// Units: degrees
    pub offset_phi: f64,

    /// Position of the theta axis on the petal.
    ///
    /// Units: millimeters
    pub offset_x: f64,

    /// Units: millimeters
    pub offset_y: f64,

    // ---- RANGES ----
    /// Hard-stop range of theta, inclusive.
    ///
    /// Units: degrees
    pub range_theta: [f64; 2],

    /// Hard-stop range of phi, inclusive.
    ///
    /// Units: degrees
    pub range_phi: [f64; 2],

    /// Distance kept from the theta hard stops when targeting.
    ///
    /// Units: degrees
    #[serde(default)]
    pub clearance_theta: f64,

    /// Distance kept from the phi hard stops when targeting.
    ///
    /// Units: degrees
    #[serde(default)]
    pub clearance_phi: f64,

    // ---- MOTOR ----
    /// Automatic moves appended at the end of every move.
    #[serde(default)]
    pub auto_moves: AutoMoves,

    // ---- STATUS ----
    /// Disabled arms are never moved but remain obstacles for their neighbours.
    pub enabled: bool,
}

/// Automatic moves made once an arm has reached its target.
///
/// With antibacklash on, each moved axis backs off by the backlash and then creeps back in the
/// final move direction. With only final creep on, the last part of each axis's approach is
/// backed off and repeated in creep. Both are off by default.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct AutoMoves {
    pub antibacklash: bool,

    /// Units: degrees
    pub backlash_deg: f64,

    /// Direction of the final antibacklash move on (theta, phi), +1 or -1.
    pub final_move_dir: [f64; 2],

    pub final_creep: bool,

    /// Distance of the final approach made in creep.
    ///
    /// Units: degrees
    pub final_creep_deg: f64,
}

/// The region of joint space and of radius which requests may target.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TargetableRange {
    /// Hard-stop limits shrunk by the clearances
    pub limits: JointLimits,

    /// (min, max) reachable distance from the theta axis with phi inside `limits`.
    ///
    /// Units: millimeters
    pub radius_mm: [f64; 2],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArmCalibration {
    /// Transforms bound to this calibration.
    pub fn transforms(&self) -> PosTransforms<'_> {
        PosTransforms::new(self)
    }

    /// The hard-stop limits.
    pub fn hard_limits(&self) -> JointLimits {
        JointLimits {
            theta: self.range_theta,
            phi: self.range_phi,
        }
    }

    /// Region requests may target: the hard stops less the clearances, and the radii reachable
    /// over the remaining phi range.
    pub fn targetable_range(&self) -> TargetableRange {
        let limits = self
            .hard_limits()
            .shrunk(self.clearance_theta.max(0.0), self.clearance_phi.max(0.0));

        // The arm reaches furthest where cos(phi_loc) is largest
        let lo = limits.phi[0] + self.offset_phi;
        let hi = limits.phi[1] + self.offset_phi;
        let max_cos = if contains_multiple_of(lo, hi, 0.0) {
            1.0
        } else {
            lo.to_radians().cos().max(hi.to_radians().cos())
        };
        let min_cos = if contains_multiple_of(lo, hi, 180.0) {
            -1.0
        } else {
            lo.to_radians().cos().min(hi.to_radians().cos())
        };

        let radius = |cos_p: f64| {
            let r1 = self.length_r1;
            let r2 = self.length_r2;
            (r1 * r1 + r2 * r2 + 2.0 * r1 * r2 * cos_p).max(0.0).sqrt()
        };

        TargetableRange {
            limits,
            radius_mm: [radius(min_cos), radius(max_cos)],
        }
    }

    /// Check the calibration is physically sensible.
    pub fn validate(&self, id: ArmId) -> Result<(), ArmError> {
        let invalid = |msg: &str| Err(ArmError::InvalidCalibration(id, String::from(msg)));

        let values = [
            self.length_r1,
            self.length_r2,
            self.offset_theta,
            self.offset_phi,
            self.offset_x,
            self.offset_y,
            self.range_theta[0],
            self.range_theta[1],
            self.range_phi[0],
            self.range_phi[1],
            self.clearance_theta,
            self.clearance_phi,
            self.auto_moves.backlash_deg,
            self.auto_moves.final_creep_deg,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return invalid("non-finite value");
        }
        if self.length_r1 <= 0.0 || self.length_r2 <= 0.0 {
            return invalid("link lengths must be positive");
        }
        if self.range_theta[0] > self.range_theta[1] || self.range_phi[0] > self.range_phi[1] {
            return invalid("range minimum is greater than its maximum");
        }
        if self.clearance_theta < 0.0 || self.clearance_phi < 0.0 {
            return invalid("hard stop clearances must not be negative");
        }
        if self.auto_moves.backlash_deg < 0.0 || self.auto_moves.final_creep_deg < 0.0 {
            return invalid("automatic move distances must not be negative");
        }
        if self
            .auto_moves
            .final_move_dir
            .iter()
            .any(|d| (d.abs() - 1.0).abs() > f64::EPSILON)
        {
            return invalid("final move directions must be +1 or -1");
        }

        Ok(())
    }

    /// Hard-stop ranges from the full physical travel of each axis.
    ///
    /// Theta travel is split evenly about zero. Phi travel is split so that one percent of it
    /// lies below zero.
    pub fn ranges_from_physical(physical_t_deg: f64, physical_p_deg: f64) -> ([f64; 2], [f64; 2]) {
        (
            [-0.5 * physical_t_deg, 0.5 * physical_t_deg],
            [-0.01 * physical_p_deg, 0.99 * physical_p_deg],
        )
    }
}

impl Default for ArmCalibration {
    fn default() -> Self {
        let (range_theta, range_phi) = Self::ranges_from_physical(
            NOMINAL_PHYSICAL_RANGE_T_DEG,
            NOMINAL_PHYSICAL_RANGE_P_DEG,
        );

        Self {
            length_r1: NOMINAL_LENGTH_R1_MM,
            length_r2: NOMINAL_LENGTH_R2_MM,
            offset_theta: 0.0,
            offset_phi: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
            range_theta,
            range_phi,
            clearance_theta: 0.0,
            clearance_phi: 0.0,
            auto_moves: AutoMoves::default(),
            enabled: true,
        }
    }
}

impl AutoMoves {
    pub fn is_enabled(&self) -> bool {
        self.antibacklash || self.final_creep
    }
}

impl Default for AutoMoves {
    fn default() -> Self {
        Self {
            antibacklash: false,
            backlash_deg: DEFAULT_BACKLASH_DEG,
            final_move_dir: [1.0, 1.0],
            final_creep: false,
            final_creep_deg: DEFAULT_FINAL_CREEP_DEG,
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// True if `base + 360 k` lies in `[lo, hi]` for some integer `k`.
fn contains_multiple_of(lo: f64, hi: f64, base: f64) -> bool {
    ((lo - base) / 360.0).ceil() <= ((hi - base) / 360.0).floor()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_ranges() {
        let c = ArmCalibration::default();
        assert_eq!(c.range_theta, [-185.0, 185.0]);
        assert!((c.range_phi[0] + 1.9).abs() < 1e-12);
        assert!((c.range_phi[1] - 188.1).abs() < 1e-12);
        assert!(c.validate(ArmId(0)).is_ok());
    }

    #[test]
    fn test_targetable_range() {
        let c = ArmCalibration {
            length_r2: 3.1,
            clearance_theta: 5.0,
            clearance_phi: 10.0,
            ..ArmCalibration::default()
        };
        let tr = c.targetable_range();

        assert_eq!(tr.limits.theta, [-180.0, 180.0]);
        assert!((tr.limits.phi[0] - 8.1).abs() < 1e-12);
        assert!((tr.limits.phi[1] - 178.1).abs() < 1e-12);

        // Neither fully extended nor fully folded is reachable any more
        assert!(tr.radius_mm[1] < 6.1);
        assert!(tr.radius_mm[0] > 0.1);

        let full = ArmCalibration::default().targetable_range();
        assert!((full.radius_mm[1] - 6.0).abs() < 1e-12);
        assert!(full.radius_mm[0].abs() < 1e-12);
    }

    #[test]
    fn test_validate() {
        let c = ArmCalibration {
            length_r1: -1.0,
            ..ArmCalibration::default()
        };
        assert!(matches!(
            c.validate(ArmId(3)),
            Err(ArmError::InvalidCalibration(ArmId(3), _))
        ));

        let c = ArmCalibration {
            range_phi: [10.0, 0.0],
            ..ArmCalibration::default()
        };
        assert!(c.validate(ArmId(3)).is_err());

        let c = ArmCalibration {
            auto_moves: AutoMoves {
                final_move_dir: [1.0, 0.5],
                ..AutoMoves::default()
            },
            ..ArmCalibration::default()
        };
        assert!(c.validate(ArmId(3)).is_err());
    }
}

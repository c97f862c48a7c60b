//! Joint <-> cartesian transforms for a single arm

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use util::maths::wrap_deg_180;

// Internal
use super::{JointLimits, TransformError, ACOS_SNAP_TOL, LIMIT_TOL_DEG, RADIUS_TOL_MM};
use crate::{arm_model::ArmCalibration, geometry::angle_deg};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Transforms bound to the calibration of one arm.
#[derive(Debug, Clone, Copy)]
pub struct PosTransforms<'a> {
    calib: &'a ArmCalibration,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> PosTransforms<'a> {
    pub fn new(calib: &'a ArmCalibration) -> Self {
        Self { calib }
    }

    /// The (min, max) distance from the theta axis the arm can reach, ignoring joint limits.
    ///
    /// Units: millimeters
    pub fn radius_band(&self) -> (f64, f64) {
        let r1 = self.calib.length_r1;
        let r2 = self.calib.length_r2;
        ((r1 - r2).abs(), r1 + r2)
    }

    /// Forward kinematics into the arm-local frame.
    pub fn joint_to_local_xy(&self, theta_deg: f64, phi_deg: f64) -> (f64, f64) {
        let theta_loc = (theta_deg + self.calib.offset_theta).to_radians();
        let phi_loc = (phi_deg + self.calib.offset_phi).to_radians();

        let x = self.calib.length_r1 * theta_loc.cos()
            + self.calib.length_r2 * (theta_loc + phi_loc).cos();
        let y = self.calib.length_r1 * theta_loc.sin()
            + self.calib.length_r2 * (theta_loc + phi_loc).sin();

        (x, y)
    }

    /// Inverse kinematics from the arm-local frame, within the arm's hard-stop limits.
    ///
    /// Where several theta windings are possible the one nearest the middle of the theta range is
    /// chosen.
    pub fn local_xy_to_joint(&self, x: f64, y: f64) -> Result<(f64, f64), TransformError> {
        let limits = self.calib.hard_limits();
        let reference = 0.5 * (limits.theta[0] + limits.theta[1]);
        self.local_xy_to_joint_within(x, y, &limits, reference)
    }

    /// Inverse kinematics from the arm-local frame within explicit limits.
    ///
    /// The elbow solution with positive local phi is tried first, then the mirrored one. Theta is
    /// wound by whole turns into `limits.theta`, picking the winding nearest `reference_theta_deg`,
    /// so multi-turn theta ranges keep the arm's current winding.
    pub fn local_xy_to_joint_within(
        &self,
        x: f64,
        y: f64,
        limits: &JointLimits,
        reference_theta_deg: f64,
    ) -> Result<(f64, f64), TransformError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(TransformError::NonFinite);
        }

        let r1 = self.calib.length_r1;
        let r2 = self.calib.length_r2;
        let radius = x.hypot(y);
        let (min_mm, max_mm) = self.radius_band();

        if radius > max_mm + RADIUS_TOL_MM || radius < min_mm - RADIUS_TOL_MM {
            return Err(TransformError::Unreachable {
                radius_mm: radius,
                min_mm,
                max_mm,
            });
        }

        // Law of cosines for the elbow angle
        let cos_p = snap_unit((radius * radius - r1 * r1 - r2 * r2) / (2.0 * r1 * r2));
        let p_loc = cos_p.acos().to_degrees();
        let target_angle = angle_deg(x, y);

        let mut first_candidate = None;

        for &phi_loc in &[p_loc, -p_loc] {
            let phi_loc_rad = phi_loc.to_radians();
            let theta_loc = target_angle
                - angle_deg(
                    r1 + r2 * phi_loc_rad.cos(),
                    r2 * phi_loc_rad.sin(),
                );
            let theta_base = wrap_deg_180(theta_loc - self.calib.offset_theta);
            let phi_base = wrap_deg_180(phi_loc - self.calib.offset_phi);

            if first_candidate.is_none() {
                first_candidate = Some((theta_base, phi_base));
            }

            for &winding in &[0.0, 360.0, -360.0] {
                let phi = phi_base + winding;
                if !limits.phi_ok(phi) {
                    continue;
                }

                if let Some(theta) = wind_into(theta_base, limits.theta, reference_theta_deg) {
                    return Ok((theta, limits.clamp_phi(phi)));
                }
            }
        }

        let (theta_deg, phi_deg) = first_candidate.unwrap_or((f64::NAN, f64::NAN));
        Err(TransformError::OutOfRange { theta_deg, phi_deg })
    }

    /// Translate from the arm-local frame into the global frame.
    pub fn local_to_global(&self, x: f64, y: f64) -> (f64, f64) {
        (x + self.calib.offset_x, y + self.calib.offset_y)
    }

    /// Translate from the global frame into the arm-local frame.
    pub fn global_to_local(&self, x: f64, y: f64) -> (f64, f64) {
        (x - self.calib.offset_x, y - self.calib.offset_y)
    }

    /// Forward kinematics into the global frame.
    pub fn joint_to_global_xy(&self, theta_deg: f64, phi_deg: f64) -> (f64, f64) {
        let (x, y) = self.joint_to_local_xy(theta_deg, phi_deg);
        self.local_to_global(x, y)
    }

    /// Inverse kinematics from the global frame within explicit limits.
    pub fn global_xy_to_joint_within(
        &self,
        x: f64,
        y: f64,
        limits: &JointLimits,
        reference_theta_deg: f64,
    ) -> Result<(f64, f64), TransformError> {
        let (lx, ly) = self.global_to_local(x, y);
        self.local_xy_to_joint_within(lx, ly, limits, reference_theta_deg)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Snap values within rounding of +/-1 onto +/-1, and clamp into [-1, 1].
fn snap_unit(value: f64) -> f64 {
    if (value - 1.0).abs() < ACOS_SNAP_TOL {
        1.0
    } else if (value + 1.0).abs() < ACOS_SNAP_TOL {
        -1.0
    } else {
        util::maths::clamp(value, -1.0, 1.0)
    }
}

/// Wind `angle_deg` by whole turns into `range`, picking the winding closest to `reference_deg`.
fn wind_into(angle_deg: f64, range: [f64; 2], reference_deg: f64) -> Option<f64> {
    let k_min = ((range[0] - LIMIT_TOL_DEG - angle_deg) / 360.0).ceil() as i64;
    let k_max = ((range[1] + LIMIT_TOL_DEG - angle_deg) / 360.0).floor() as i64;

    let mut best: Option<f64> = None;
    for k in k_min..=k_max {
        let candidate = angle_deg + 360.0 * k as f64;
        best = match best {
            Some(b) if (b - reference_deg).abs() <= (candidate - reference_deg).abs() => Some(b),
            _ => Some(candidate),
        };
    }

    best.map(|b| util::maths::clamp(b, range[0], range[1]))
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

//! Cached collision geometry of a single arm

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Point2;
use pos_if::ArmId;

// Internal
use super::{CollisionClass, Polygon};
use crate::{
    arm_model::ArmModel,
    geometry::{polar, Affine2},
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// An arm's keepouts and the calibration values needed to place them.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmGeometry {
    pub id: ArmId,

    /// Calibration version this geometry was built from
    pub calib_version: u64,

    /// Global position of the theta axis.
    pub center: Point2<f64>,

    pub length_r1: f64,
    pub offset_theta: f64,
    pub offset_phi: f64,

    pub keepout_theta: Polygon,
    pub pivot_theta: Point2<f64>,

    pub keepout_phi: Polygon,
    pub pivot_phi: Point2<f64>,

    /// Furthest any part of the keepouts can be from the theta axis.
    ///
    /// Units: millimeters
    pub reach_mm: f64,
}

/// An arm's keepouts placed in the global frame at one pose.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedArm {
    pub central: Polygon,
    pub phi: Polygon,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArmGeometry {
    /// Build the geometry of an arm from its current calibration.
    pub fn build(
        arm: &ArmModel,
        keepout_theta: &Polygon,
        pivot_theta: Point2<f64>,
        keepout_phi: &Polygon,
        pivot_phi: Point2<f64>,
    ) -> Self {
        let calib = arm.calib();

        let reach_mm = keepout_theta
            .max_radius_from(&pivot_theta)
            .max(calib.length_r1 + keepout_phi.max_radius_from(&pivot_phi));

        Self {
            id: arm.id(),
            calib_version: arm.calib_version(),
            center: Point2::new(calib.offset_x, calib.offset_y),
            length_r1: calib.length_r1,
            offset_theta: calib.offset_theta,
            offset_phi: calib.offset_phi,
            keepout_theta: keepout_theta.clone(),
            pivot_theta,
            keepout_phi: keepout_phi.clone(),
            pivot_phi,
            reach_mm,
        }
    }

    /// Place the keepouts for the given (theta, phi) pose in degrees.
    pub fn place(&self, pose: (f64, f64)) -> PlacedArm {
        let theta_loc = pose.0 + self.offset_theta;
        let phi_loc = pose.1 + self.offset_phi;

        let central = self.keepout_theta.transformed(&Affine2::about_pivot(
            self.pivot_theta,
            theta_loc,
            self.center,
        ));

        let elbow = self.center + polar(self.length_r1, theta_loc);
        let phi = self.keepout_phi.transformed(&Affine2::about_pivot(
            self.pivot_phi,
            theta_loc + phi_loc,
            elbow,
        ));

        PlacedArm { central, phi }
    }
}

impl PlacedArm {
    /// Classify the overlap between two placed arms.
    pub fn classify(&self, other: &PlacedArm) -> CollisionClass {
        if self.phi.intersects(&other.phi) {
            return CollisionClass::ArmArm;
        }

        let arm_body = self.phi.intersects(&other.central);
        let body_arm = self.central.intersects(&other.phi);

        match (arm_body, body_arm) {
            (true, true) => CollisionClass::ArmBodyMutual,
            (true, false) => CollisionClass::ArmBody,
            (false, true) => CollisionClass::BodyArm,
            (false, false) => {
                if self.central.intersects(&other.central) {
                    CollisionClass::BodyBody
                } else {
                    CollisionClass::NoOverlap
                }
            }
        }
    }

    /// True if either keepout overlaps the given polygon.
    pub fn hits(&self, obstacle: &Polygon) -> bool {
        self.phi.intersects(obstacle) || self.central.intersects(obstacle)
    }
}

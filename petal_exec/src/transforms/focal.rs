//! Focal surface (q, s) coordinates
//!
//! `q` is the polar angle about the optical axis in degrees. `s` is the distance from the axis
//! measured along the curved focal surface, which is found from the flat radius `r` through a
//! monotonic lookup table. Values falling outside the table give NaN.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use util::maths::lin_interp;

// Internal
use crate::geometry::angle_deg;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Lookup table between flat radius and focal surface distance.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FocalSurface {
    /// Flat radius from the optical axis.
    ///
    /// Units: millimeters
    pub r_mm: Vec<f64>,

    /// Distance along the focal surface matching each entry of `r_mm`.
    ///
    /// Units: millimeters
    pub s_mm: Vec<f64>,
}

/// Problems with a focal surface table.
#[derive(Debug, thiserror::Error)]
pub enum FocalSurfaceError {
    #[error("The R and S columns have different lengths ({0} and {1})")]
    LengthMismatch(usize, usize),

    #[error("The table needs at least two rows")]
    TooShort,

    #[error("The table must be strictly increasing in both R and S (at row {0})")]
    NotMonotonic(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FocalSurface {
    /// Check the table can be interpolated in both directions.
    pub fn validate(&self) -> Result<(), FocalSurfaceError> {
        if self.r_mm.len() != self.s_mm.len() {
            return Err(FocalSurfaceError::LengthMismatch(
                self.r_mm.len(),
                self.s_mm.len(),
            ));
        }
        if self.r_mm.len() < 2 {
            return Err(FocalSurfaceError::TooShort);
        }
        for i in 1..self.r_mm.len() {
            if self.r_mm[i] <= self.r_mm[i - 1] || self.s_mm[i] <= self.s_mm[i - 1] {
                return Err(FocalSurfaceError::NotMonotonic(i));
            }
        }

        Ok(())
    }

    /// Units: millimeters
    pub fn r_to_s(&self, r_mm: f64) -> f64 {
        lin_interp(&self.r_mm, &self.s_mm, r_mm)
    }

    /// Units: millimeters
    pub fn s_to_r(&self, s_mm: f64) -> f64 {
        lin_interp(&self.s_mm, &self.r_mm, s_mm)
    }

    /// Global (x, y) to (q, s).
    pub fn global_xy_to_qs(&self, x: f64, y: f64) -> (f64, f64) {
        (angle_deg(x, y), self.r_to_s(x.hypot(y)))
    }

    /// (q, s) to global (x, y).
    pub fn qs_to_global_xy(&self, q_deg: f64, s_mm: f64) -> (f64, f64) {
        let r = self.s_to_r(s_mm);
        let (sin_q, cos_q) = q_deg.to_radians().sin_cos();
        (r * cos_q, r * sin_q)
    }

    /// (q, s) to flat (x, y), where the focal surface is unrolled onto the plane.
    pub fn qs_to_flat_xy(&self, q_deg: f64, s_mm: f64) -> (f64, f64) {
        let (sin_q, cos_q) = q_deg.to_radians().sin_cos();
        (s_mm * cos_q, s_mm * sin_q)
    }

    /// Flat (x, y) to (q, s).
    pub fn flat_xy_to_qs(&self, x: f64, y: f64) -> (f64, f64) {
        (angle_deg(x, y), x.hypot(y))
    }

    /// Global (x, y) to flat (x, y).
    pub fn global_xy_to_flat_xy(&self, x: f64, y: f64) -> (f64, f64) {
        let (q, s) = self.global_xy_to_qs(x, y);
        self.qs_to_flat_xy(q, s)
    }

    /// Flat (x, y) to global (x, y).
    pub fn flat_xy_to_global_xy(&self, x: f64, y: f64) -> (f64, f64) {
        let (q, s) = self.flat_xy_to_qs(x, y);
        self.qs_to_global_xy(q, s)
    }
}

impl Default for FocalSurface {
    fn default() -> Self {
        Self {
            r_mm: vec![
                0.0, 50.0, 100.0, 150.0, 200.0, 250.0, 300.0, 350.0, 400.0, 450.0,
            ],
            s_mm: vec![
                0.0, 50.00013, 100.00104, 150.00351, 200.00832, 250.01626, 300.02809, 350.04461,
                400.06658, 450.09480,
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_table_valid() {
        assert!(FocalSurface::default().validate().is_ok());

        let bad = FocalSurface {
            r_mm: vec![0.0, 10.0, 5.0],
            s_mm: vec![0.0, 10.0, 20.0],
        };
        assert!(matches!(
            bad.validate(),
            Err(FocalSurfaceError::NotMonotonic(2))
        ));
    }

    #[test]
    fn test_qs_round_trip() {
        let fs = FocalSurface::default();

        let (q, s) = fs.global_xy_to_qs(120.0, -80.0);
        let (x, y) = fs.qs_to_global_xy(q, s);
        assert!((x - 120.0).abs() < 1e-9);
        assert!((y + 80.0).abs() < 1e-9);

        // S is slightly larger than R away from the axis
        assert!(s > 120f64.hypot(80.0));

        let (fx, fy) = fs.global_xy_to_flat_xy(120.0, -80.0);
        let (gx, gy) = fs.flat_xy_to_global_xy(fx, fy);
        assert!((gx - 120.0).abs() < 1e-9);
        assert!((gy + 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_outside_table_is_nan() {
        let fs = FocalSurface::default();

        let (_, s) = fs.global_xy_to_qs(500.0, 0.0);
        assert!(s.is_nan());

        let (x, y) = fs.qs_to_global_xy(10.0, 460.0);
        assert!(x.is_nan() && y.is_nan());
    }
}

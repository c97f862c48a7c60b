//! # 2D rigid transforms
//!
//! All angles entering this module are in degrees, conversion to radians happens here and only
//! here.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Isometry2, Point2, Vector2};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// A rotation followed by a translation in the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine2 {
    iso: Isometry2<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Affine2 {
    /// The identity transform
    pub fn identity() -> Self {
        Self {
            iso: Isometry2::identity(),
        }
    }

    /// Rotate about the origin by `rotation_deg` then translate by `translation`.
    pub fn from_deg(rotation_deg: f64, translation: Vector2<f64>) -> Self {
        Self {
            iso: Isometry2::new(translation, rotation_deg.to_radians()),
        }
    }

    /// Rotate about `pivot` by `rotation_deg`, then move the pivot to `position`.
    pub fn about_pivot(pivot: Point2<f64>, rotation_deg: f64, position: Point2<f64>) -> Self {
        let to_pivot = Isometry2::translation(-pivot.x, -pivot.y);
        let place = Isometry2::new(position.coords, rotation_deg.to_radians());

        Self {
            iso: place * to_pivot,
        }
    }

    /// Transform a point.
    pub fn apply(&self, point: &Point2<f64>) -> Point2<f64> {
        self.iso.transform_point(point)
    }

    /// The transform which applies `self` first and then `other`.
    pub fn then(&self, other: &Affine2) -> Affine2 {
        Affine2 {
            iso: other.iso * self.iso,
        }
    }

    /// The inverse transform.
    pub fn inverse(&self) -> Affine2 {
        Affine2 {
            iso: self.iso.inverse(),
        }
    }
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::identity()
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// The vector of length `radius` at `angle_deg` from the x axis.
pub fn polar(radius: f64, angle_deg: f64) -> Vector2<f64> {
    let (s, c) = angle_deg.to_radians().sin_cos();
    Vector2::new(radius * c, radius * s)
}

/// Angle of the vector (x, y) from the x axis in degrees, in (-180, 180].
pub fn angle_deg(x: f64, y: f64) -> f64 {
    y.atan2(x).to_degrees()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn close(a: Point2<f64>, b: Point2<f64>) -> bool {
        (a - b).norm() < 1e-12
    }

    #[test]
    fn test_about_pivot() {
        let t = Affine2::about_pivot(Point2::new(1.0, 0.0), 90.0, Point2::new(5.0, 5.0));

        // The pivot lands on the position
        assert!(close(t.apply(&Point2::new(1.0, 0.0)), Point2::new(5.0, 5.0)));

        // A point one unit along x from the pivot ends up one unit along y from the position
        assert!(close(t.apply(&Point2::new(2.0, 0.0)), Point2::new(5.0, 6.0)));
    }

    #[test]
    fn test_compose_and_inverse() {
        let a = Affine2::from_deg(30.0, Vector2::new(1.0, 2.0));
        let b = Affine2::from_deg(-75.0, Vector2::new(-3.0, 0.5));
        let p = Point2::new(0.3, -1.7);

        assert!(close(a.then(&b).apply(&p), b.apply(&a.apply(&p))));
        assert!(close(a.inverse().apply(&a.apply(&p)), p));
    }

    #[test]
    fn test_polar() {
        let v = polar(2.0, 90.0);
        assert!(v.x.abs() < 1e-12);
        assert!((v.y - 2.0).abs() < 1e-12);
        assert!((angle_deg(-1.0, 0.0) - 180.0).abs() < 1e-12);
    }
}

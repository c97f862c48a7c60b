//! Simple polygons and their intersection test

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use geo::{
    coordinate_position::CoordPos, dimensions::Dimensions, Area, BoundingRect, Centroid,
    Contains, EuclideanDistance, Relate as _,
};
use geo_types::{Coord, LineString, Point, Rect};
use nalgebra::Point2;

// Internal
use super::GEOM_EPS;
use crate::geometry::Affine2;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// A closed simple polygon. The last point joins back to the first.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    points: Vec<Point2<f64>>,
    shape: geo_types::Polygon<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Polygon {
    pub fn new(points: Vec<Point2<f64>>) -> Self {
        let ring: LineString<f64> = points.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
        Self {
            shape: geo_types::Polygon::new(ring, vec![]),
            points,
        }
    }

    /// Build from `[x, y]` pairs.
    pub fn from_xy(points: &[[f64; 2]]) -> Self {
        Self::new(points.iter().map(|p| Point2::new(p[0], p[1])).collect())
    }

    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Copy of this polygon with every point transformed.
    pub fn transformed(&self, transform: &Affine2) -> Polygon {
        Polygon::new(self.points.iter().map(|p| transform.apply(p)).collect())
    }

    pub fn bbox(&self) -> Option<Rect<f64>> {
        self.shape.bounding_rect()
    }

    /// Area, positive for counter-clockwise polygons.
    pub fn signed_area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }
        self.shape.signed_area()
    }

    pub fn has_area(&self) -> bool {
        self.signed_area().abs() > GEOM_EPS
    }

    /// Area centroid, or `None` for polygons with no area.
    pub fn centroid(&self) -> Option<Point2<f64>> {
        if !self.has_area() {
            return None;
        }
        self.shape.centroid().map(|c| Point2::new(c.x(), c.y()))
    }

    /// True if `point` is strictly inside the polygon. Points on the boundary are outside, and
    /// polygons with no area contain nothing.
    pub fn contains_point(&self, point: &Point2<f64>) -> bool {
        self.has_area() && self.shape.contains(&Point::new(point.x, point.y))
    }

    /// True if the interiors of the two polygons overlap.
    ///
    /// Touching edges or vertices, and collinear overlapping edges, are not intersections.
    /// Degenerate polygons (fewer than three points, or no area) are treated as open polylines
    /// and only intersect by passing through the other's interior, or by properly crossing
    /// another degenerate polygon.
    pub fn intersects(&self, other: &Polygon) -> bool {
        if self.points.len() < 2 || other.points.len() < 2 {
            return false;
        }
        let (a_box, b_box) = match (self.bbox(), other.bbox()) {
            (Some(a), Some(b)) => (a, b),
            _ => return false,
        };
        if !boxes_overlap(&a_box, &b_box) {
            return false;
        }

        match (self.has_area(), other.has_area()) {
            (true, true) => {
                self.shape
                    .relate(&other.shape)
                    .get(CoordPos::Inside, CoordPos::Inside)
                    == Dimensions::TwoDimensional
            }
            (true, false) => {
                self.shape
                    .relate(&other.outline())
                    .get(CoordPos::Inside, CoordPos::Inside)
                    != Dimensions::Empty
            }
            (false, true) => {
                other
                    .shape
                    .relate(&self.outline())
                    .get(CoordPos::Inside, CoordPos::Inside)
                    != Dimensions::Empty
            }
            (false, false) => {
                self.outline()
                    .relate(&other.outline())
                    .get(CoordPos::Inside, CoordPos::Inside)
                    == Dimensions::ZeroDimensional
            }
        }
    }

    /// Distance from a point to the polygon, zero if the point is inside.
    pub fn distance_to_point(&self, point: &Point2<f64>) -> f64 {
        if self.points.is_empty() {
            return f64::INFINITY;
        }
        Point::new(point.x, point.y).euclidean_distance(&self.shape)
    }

    /// Largest distance from `origin` to any vertex.
    pub fn max_radius_from(&self, origin: &Point2<f64>) -> f64 {
        self.points
            .iter()
            .map(|p| (p - origin).norm())
            .fold(0.0, f64::max)
    }

    /// The points as an open polyline.
    fn outline(&self) -> LineString<f64> {
        self.points.iter().map(|p| Coord { x: p.x, y: p.y }).collect()
    }
}

impl Default for Polygon {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// True if the boxes overlap by more than the tolerance.
fn boxes_overlap(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x < b.max().x - GEOM_EPS
        && b.min().x < a.max().x - GEOM_EPS
        && a.min().y < b.max().y - GEOM_EPS
        && b.min().y < a.max().y - GEOM_EPS
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn square(x0: f64, y0: f64, side: f64) -> Polygon {
        Polygon::from_xy(&[
            [x0, y0],
            [x0 + side, y0],
            [x0 + side, y0 + side],
            [x0, y0 + side],
        ])
    }

    #[test]
    fn test_area_and_centroid() {
        let sq = square(1.0, 1.0, 2.0);
        assert!((sq.signed_area() - 4.0).abs() < 1e-12);

        let c = sq.centroid().unwrap();
        assert!((c.x - 2.0).abs() < 1e-12 && (c.y - 2.0).abs() < 1e-12);

        let line = Polygon::from_xy(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]);
        assert!(line.centroid().is_none());
    }

    #[test]
    fn test_contains_point() {
        let sq = square(0.0, 0.0, 1.0);
        assert!(sq.contains_point(&Point2::new(0.5, 0.5)));
        assert!(!sq.contains_point(&Point2::new(1.5, 0.5)));

        // Boundary is outside
        assert!(!sq.contains_point(&Point2::new(1.0, 0.5)));
        assert!(!sq.contains_point(&Point2::new(0.0, 0.0)));
    }

    #[test]
    fn test_intersects() {
        let a = square(0.0, 0.0, 1.0);

        // Overlapping
        assert!(a.intersects(&square(0.5, 0.5, 1.0)));

        // Nested, no edges cross
        assert!(a.intersects(&square(0.25, 0.25, 0.5)));
        assert!(square(0.25, 0.25, 0.5).intersects(&a));

        // Identical
        assert!(a.intersects(&a.clone()));

        // Apart
        assert!(!a.intersects(&square(2.0, 0.0, 1.0)));
    }

    #[test]
    fn test_touching_is_not_collision() {
        let a = square(0.0, 0.0, 1.0);

        // Sharing a whole edge
        assert!(!a.intersects(&square(1.0, 0.0, 1.0)));

        // Sharing a corner
        assert!(!a.intersects(&square(1.0, 1.0, 1.0)));

        // A vertex resting on an edge
        let tri = Polygon::from_xy(&[[1.0, 0.5], [2.0, 0.0], [2.0, 1.0]]);
        assert!(!a.intersects(&tri));
    }

    #[test]
    fn test_degenerate() {
        let a = square(0.0, 0.0, 1.0);

        // Collinear with an edge
        let flat = Polygon::from_xy(&[[0.0, 0.0], [0.5, 0.0], [1.0, 0.0]]);
        assert!(!a.intersects(&flat));
        assert!(!flat.intersects(&a));

        // A degenerate polygon lying across the square does pass through it
        let needle = Polygon::from_xy(&[[-1.0, 0.5], [2.0, 0.5]]);
        assert!(a.intersects(&needle));
        assert!(needle.intersects(&a));

        // Two needles crossing, and two lying along each other
        let cross = Polygon::from_xy(&[[0.5, -1.0], [0.5, 2.0]]);
        assert!(needle.intersects(&cross));
        let along = Polygon::from_xy(&[[0.0, 0.5], [1.0, 0.5]]);
        assert!(!needle.intersects(&along));

        // Empty polygons intersect nothing
        assert!(!a.intersects(&Polygon::default()));
        assert!(!Polygon::default().intersects(&a));
    }

    #[test]
    fn test_distance_to_point() {
        let sq = square(0.0, 0.0, 1.0);
        assert_eq!(sq.distance_to_point(&Point2::new(0.5, 0.5)), 0.0);
        assert!((sq.distance_to_point(&Point2::new(3.0, 0.5)) - 2.0).abs() < 1e-12);
        assert_eq!(
            Polygon::default().distance_to_point(&Point2::new(0.0, 0.0)),
            f64::INFINITY
        );
    }
}

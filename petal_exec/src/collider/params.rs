//! Parameters structure for the collider

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Collider parameters, loaded once per planning session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColliderParams {
    // ---- KEEPOUTS ----
    /// Keepout of the phi arm, in the phi arm's frame: origin on the phi axis, x axis along the
    /// arm towards the fiber.
    ///
    /// Units: millimeters
    pub keepout_phi: PolygonDef,

    /// Keepout of the central body, in the theta link's frame: origin on the theta axis, x axis
    /// along the link towards the phi axis.
    ///
    /// Units: millimeters
    pub keepout_theta: PolygonDef,

    /// Static obstacles in the global frame.
    #[serde(default)]
    pub fixed_obstacles: Vec<FixedObstacleDef>,

    // ---- NEIGHBOURS ----
    /// Arms whose theta axes are at most this far apart are checked against each other.
    ///
    /// Units: millimeters
    pub neighbor_radius_mm: f64,
}

/// Definition of a keepout polygon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolygonDef {
    /// Vertices as `[x, y]` pairs.
    pub points: Vec<[f64; 2]>,

    /// Point the polygon rotates about, defaults to the origin.
    #[serde(default)]
    pub pivot: [f64; 2],
}

/// Definition of a named fixed obstacle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixedObstacleDef {
    pub name: String,

    /// Vertices as global `[x, y]` pairs.
    ///
    /// Units: millimeters
    pub points: Vec<[f64; 2]>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ColliderParams {
    /// Keepouts of the standard positioner, with no fixed obstacles.
    fn default() -> Self {
        Self {
            keepout_phi: PolygonDef::from_columns(
                &[
                    3.967, 3.918, 3.269, 1.712, 1.313, 0.000, -1.324, -2.106, -2.106, -1.324,
                    0.000, 1.313, 1.712, 3.269, 3.918,
                ],
                &[
                    0.000, 1.014, 1.583, 1.391, 1.959, 2.395, 1.959, 0.848, -0.848, -1.959,
                    -2.395, -1.959, -1.391, -1.583, -1.014,
                ],
            ),
            keepout_theta: PolygonDef::from_columns(
                &[0.814, 2.083, 2.613, 4.194, 4.893, -1.902, -2.007, -1.139, -0.170],
                &[
                    -3.236, -2.707, -2.665, -2.761, -1.168, -0.935, -2.665, -3.137, -3.332,
                ],
            ),
            fixed_obstacles: Vec::new(),
            neighbor_radius_mm: 12.0,
        }
    }
}

impl PolygonDef {
    /// Build from separate x and y columns, pivoting about the origin. Extra entries in the
    /// longer column are ignored.
    pub fn from_columns(xs: &[f64], ys: &[f64]) -> Self {
        Self {
            points: xs.iter().zip(ys.iter()).map(|(x, y)| [*x, *y]).collect(),
            pivot: [0.0, 0.0],
        }
    }
}

//! # Move tables
//!
//! A move table is the ordered list of joint-space rows describing one arm's planned trajectory.
//! Tables are produced by the scheduler and handed by value to the driver layer, which converts
//! the angular deltas into actuator step counts.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Internal
use crate::request::ArmId;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Deltas smaller than this are considered to be no motion at all.
///
/// Units: degrees
pub const MOTIONLESS_TOL_DEG: f64 = 1e-9;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// One row of a move table.
///
/// Both axes start moving together after the pre-pause. The row ends once the slower axis has
/// finished and the post-pause has elapsed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MoveRow {
    /// Units: degrees
    pub delta_theta: f64,

    /// Units: degrees
    pub delta_phi: f64,

    pub speed_mode_theta: SpeedMode,

    pub speed_mode_phi: SpeedMode,

    /// Wait before this row's motion starts.
    ///
    /// Units: seconds
    pub pre_pause: f64,

    /// Wait after this row's motion ends.
    ///
    /// Units: seconds
    pub post_pause: f64,
}

/// A single arm's move table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MoveTable {
    /// The arm this table is for
    pub arm_id: ArmId,

    /// The rows of the table, executed in order
    pub rows: Vec<MoveRow>,

    /// Rows generated automatically at the target, run after `rows`.
    ///
    /// These are the antibacklash backup and final creep moves. Their net motion is zero and
    /// they are not part of collision sweeps or of [`MoveTable::total_time`].
    #[serde(default)]
    pub auto_rows: Vec<MoveRow>,

    /// Free-form note describing how the table was generated
    #[serde(default)]
    pub note: String,
}

/// Angular rates of each speed mode at the output shafts.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SpeedRates {
    /// Units: degrees/second
    pub cruise_deg_s: f64,

    /// Units: degrees/second
    pub creep_deg_s: f64,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// The speed at which an axis moves during a row.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SpeedMode {
    Cruise,
    Creep,

    /// The axis does not move in this row
    None,
}

/// Problems found when validating a move table.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TableError {
    #[error("Row {row} has {delta_deg} deg of motion on the {axis} axis but no speed mode")]
    MotionWithoutSpeed {
        row: usize,
        axis: &'static str,
        delta_deg: f64,
    },

    #[error("Row {row} has a negative or non-finite pause")]
    InvalidPause { row: usize },

    #[error("Row {row} has a non-finite delta")]
    NonFiniteDelta { row: usize },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MoveRow {
    /// A row moving both axes in cruise, with no pauses.
    pub fn cruise(delta_theta: f64, delta_phi: f64) -> Self {
        Self {
            delta_theta,
            delta_phi,
            speed_mode_theta: SpeedMode::Cruise,
            speed_mode_phi: SpeedMode::Cruise,
            pre_pause: 0.0,
            post_pause: 0.0,
        }
    }

    /// A row containing no motion, only a pause of the given duration.
    pub fn hold(duration_s: f64) -> Self {
        Self {
            delta_theta: 0.0,
            delta_phi: 0.0,
            speed_mode_theta: SpeedMode::None,
            speed_mode_phi: SpeedMode::None,
            pre_pause: duration_s,
            post_pause: 0.0,
        }
    }

    /// True if either axis moves during this row.
    pub fn has_motion(&self) -> bool {
        self.delta_theta.abs() > MOTIONLESS_TOL_DEG || self.delta_phi.abs() > MOTIONLESS_TOL_DEG
    }

    /// Time taken by the motion part of the row, i.e. by the slower of the two axes.
    ///
    /// Units: seconds
    pub fn move_time(&self, rates: &SpeedRates) -> f64 {
        axis_move_time(self.delta_theta, self.speed_mode_theta, rates)
            .max(axis_move_time(self.delta_phi, self.speed_mode_phi, rates))
    }

    /// Total time of the row including pauses.
    ///
    /// Units: seconds
    pub fn row_time(&self, rates: &SpeedRates) -> f64 {
        self.pre_pause + self.move_time(rates) + self.post_pause
    }
}

impl MoveTable {
    /// Create a new empty table for the given arm.
    pub fn new(arm_id: ArmId) -> Self {
        Self {
            arm_id,
            rows: Vec::new(),
            auto_rows: Vec::new(),
            note: String::new(),
        }
    }

    /// A table which holds the arm still for the given duration.
    pub fn frozen(arm_id: ArmId, duration_s: f64) -> Self {
        let mut table = Self::new(arm_id);
        table.rows.push(MoveRow::hold(duration_s.max(0.0)));
        table
    }

    /// Number of rows in the table
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Append a row to the end of the table.
    pub fn push(&mut self, row: MoveRow) {
        self.rows.push(row);
    }

    /// Insert a row at the given index, or at the end if the index is past the end.
    pub fn insert(&mut self, index: usize, row: MoveRow) {
        let index = index.min(self.rows.len());
        self.rows.insert(index, row);
    }

    /// Every row the driver executes, planned rows first.
    pub fn all_rows(&self) -> impl Iterator<Item = &MoveRow> + '_ {
        self.rows.iter().chain(self.auto_rows.iter())
    }

    /// True if no row contains any motion.
    pub fn is_motionless(&self) -> bool {
        !self.rows.iter().any(|r| r.has_motion())
    }

    /// Net (theta, phi) motion of the whole table. Automatic rows have no net motion and are not
    /// summed.
    ///
    /// Units: degrees
    pub fn total_delta(&self) -> (f64, f64) {
        self.rows.iter().fold((0.0, 0.0), |(t, p), r| {
            (
                t + moved(r.delta_theta, r.speed_mode_theta),
                p + moved(r.delta_phi, r.speed_mode_phi),
            )
        })
    }

    /// Time to execute the planned rows.
    ///
    /// Units: seconds
    pub fn total_time(&self, rates: &SpeedRates) -> f64 {
        self.rows.iter().map(|r| r.row_time(rates)).sum()
    }

    /// Time to execute the table including the automatic rows.
    ///
    /// Units: seconds
    pub fn execution_time(&self, rates: &SpeedRates) -> f64 {
        self.all_rows().map(|r| r.row_time(rates)).sum()
    }

    /// Time at which each row finishes, measured from the start of the table.
    ///
    /// Units: seconds
    pub fn net_times(&self, rates: &SpeedRates) -> Vec<f64> {
        let mut acc = 0.0;
        self.rows
            .iter()
            .map(|r| {
                acc += r.row_time(rates);
                acc
            })
            .collect()
    }

    /// Append a note, separated from any existing note.
    pub fn append_note(&mut self, note: &str) {
        if note.is_empty() {
            return;
        }
        if !self.note.is_empty() {
            self.note.push_str("; ");
        }
        self.note.push_str(note);
    }

    /// Check the table is well formed.
    pub fn validate(&self) -> Result<(), TableError> {
        for (i, row) in self.all_rows().enumerate() {
            if !row.delta_theta.is_finite() || !row.delta_phi.is_finite() {
                return Err(TableError::NonFiniteDelta { row: i });
            }
            if !(row.pre_pause.is_finite() && row.pre_pause >= 0.0)
                || !(row.post_pause.is_finite() && row.post_pause >= 0.0)
            {
                return Err(TableError::InvalidPause { row: i });
            }
            if row.speed_mode_theta == SpeedMode::None && row.delta_theta.abs() > MOTIONLESS_TOL_DEG
            {
                return Err(TableError::MotionWithoutSpeed {
                    row: i,
                    axis: "theta",
                    delta_deg: row.delta_theta,
                });
            }
            if row.speed_mode_phi == SpeedMode::None && row.delta_phi.abs() > MOTIONLESS_TOL_DEG {
                return Err(TableError::MotionWithoutSpeed {
                    row: i,
                    axis: "phi",
                    delta_deg: row.delta_phi,
                });
            }
        }

        Ok(())
    }
}

impl SpeedRates {
    /// The angular rate of the given mode, or `None` if the mode does not move.
    ///
    /// Units: degrees/second
    pub fn rate(&self, mode: SpeedMode) -> Option<f64> {
        match mode {
            SpeedMode::Cruise => Some(self.cruise_deg_s),
            SpeedMode::Creep => Some(self.creep_deg_s),
            SpeedMode::None => None,
        }
    }
}

impl Default for SpeedRates {
    fn default() -> Self {
        Self {
            cruise_deg_s: 176.0,
            creep_deg_s: 2.7,
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Time for one axis to cover its delta. Axes in `SpeedMode::None` take no time.
fn axis_move_time(delta_deg: f64, mode: SpeedMode, rates: &SpeedRates) -> f64 {
    match rates.rate(mode) {
        Some(r) if r > 0.0 => delta_deg.abs() / r,
        _ => 0.0,
    }
}

/// The distance an axis actually moves, axes in `SpeedMode::None` stay still.
fn moved(delta_deg: f64, mode: SpeedMode) -> f64 {
    match mode {
        SpeedMode::None => 0.0,
        _ => delta_deg,
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_table_timing() {
        let rates = SpeedRates {
            cruise_deg_s: 100.0,
            creep_deg_s: 10.0,
        };

        let mut table = MoveTable::new(ArmId(1));
        table.push(MoveRow::cruise(50.0, -20.0));
        table.push(MoveRow {
            speed_mode_phi: SpeedMode::Creep,
            pre_pause: 0.25,
            ..MoveRow::cruise(0.0, 5.0)
        });

        assert_eq!(table.n_rows(), 2);
        assert!((table.rows[0].move_time(&rates) - 0.5).abs() < 1e-12);
        assert!((table.rows[1].row_time(&rates) - 0.75).abs() < 1e-12);
        assert!((table.total_time(&rates) - 1.25).abs() < 1e-12);

        let net = table.net_times(&rates);
        assert!((net[0] - 0.5).abs() < 1e-12);
        assert!((net[1] - 1.25).abs() < 1e-12);

        assert_eq!(table.total_delta(), (50.0, -15.0));
        assert!(!table.is_motionless());
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_auto_rows() {
        let rates = SpeedRates {
            cruise_deg_s: 100.0,
            creep_deg_s: 10.0,
        };

        let mut table = MoveTable::new(ArmId(3));
        table.push(MoveRow::cruise(50.0, 0.0));
        table.auto_rows.push(MoveRow {
            speed_mode_phi: SpeedMode::None,
            ..MoveRow::cruise(-2.0, 0.0)
        });
        table.auto_rows.push(MoveRow {
            speed_mode_theta: SpeedMode::Creep,
            speed_mode_phi: SpeedMode::None,
            ..MoveRow::cruise(2.0, 0.0)
        });

        assert_eq!(table.all_rows().count(), 3);
        assert_eq!(table.total_delta(), (50.0, 0.0));
        assert!((table.total_time(&rates) - 0.5).abs() < 1e-12);
        assert!((table.execution_time(&rates) - 0.72).abs() < 1e-12);
        assert!(table.validate().is_ok());

        // Automatic rows are validated too
        table.auto_rows[1].speed_mode_theta = SpeedMode::None;
        assert!(matches!(
            table.validate(),
            Err(TableError::MotionWithoutSpeed { row: 2, .. })
        ));
    }

    #[test]
    fn test_frozen_table() {
        let rates = SpeedRates::default();
        let table = MoveTable::frozen(ArmId(4), 1.5);

        assert!(table.is_motionless());
        assert_eq!(table.total_delta(), (0.0, 0.0));
        assert!((table.total_time(&rates) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_validate() {
        let mut table = MoveTable::new(ArmId(2));
        table.push(MoveRow {
            speed_mode_theta: SpeedMode::None,
            ..MoveRow::cruise(3.0, 0.0)
        });
        assert_eq!(
            table.validate(),
            Err(TableError::MotionWithoutSpeed {
                row: 0,
                axis: "theta",
                delta_deg: 3.0
            })
        );

        table.rows[0] = MoveRow {
            post_pause: -1.0,
            ..MoveRow::cruise(3.0, 0.0)
        };
        assert_eq!(table.validate(), Err(TableError::InvalidPause { row: 0 }));
    }
}

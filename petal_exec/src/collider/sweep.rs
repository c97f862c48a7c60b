//! Time-sampled trajectories of arms
//!
//! A sweep is an arm's joint pose sampled at every timestep of a move table. Sweeps of different
//! lengths are compared step by step, with shorter sweeps holding their final pose.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use pos_if::{ArmId, MoveTable, SpeedRates};

// Internal
use super::{CollisionError, PlacedArm, MAX_SWEEP_STEPS};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// An arm's (theta, phi) pose at each timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct Sweep {
    pub arm_id: ArmId,
    poses: Vec<(f64, f64)>,
}

/// A sweep with the keepouts placed at each timestep.
#[derive(Debug, Clone)]
pub struct PlacedSweep {
    pub arm_id: ArmId,
    pub(crate) placed: Vec<PlacedArm>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Sweep {
    /// An arm which does not move.
    pub fn stationary(arm_id: ArmId, pose: (f64, f64)) -> Self {
        Self {
            arm_id,
            poses: vec![pose],
        }
    }

    /// Sample a move table starting from `start` every `timestep_s` seconds.
    ///
    /// The final sample is always the pose at the very end of the table.
    pub fn from_table(
        start: (f64, f64),
        table: &MoveTable,
        rates: &SpeedRates,
        timestep_s: f64,
    ) -> Result<Self, CollisionError> {
        let total_s = table.total_time(rates);
        let n_steps = if total_s > 0.0 {
            (total_s / timestep_s).ceil()
        } else {
            0.0
        };

        if !n_steps.is_finite() || n_steps >= MAX_SWEEP_STEPS as f64 {
            return Err(CollisionError::SweepTooLong(table.arm_id));
        }
        let n_steps = n_steps as usize;

        let poses = (0..=n_steps)
            .map(|k| pose_at_time(start, table, rates, (k as f64 * timestep_s).min(total_s)))
            .collect();

        Ok(Self {
            arm_id: table.arm_id,
            poses,
        })
    }

    pub fn poses(&self) -> &[(f64, f64)] {
        &self.poses
    }

    /// Number of timesteps, including the initial pose.
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Pose at the given step, holding the final pose past the end.
    pub fn pose_at(&self, step: usize) -> (f64, f64) {
        let last = self.poses.len().saturating_sub(1);
        self.poses
            .get(step.min(last))
            .copied()
            .unwrap_or((f64::NAN, f64::NAN))
    }

    pub fn final_pose(&self) -> (f64, f64) {
        self.pose_at(usize::MAX)
    }
}

impl PlacedSweep {
    pub fn len(&self) -> usize {
        self.placed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    /// Placed keepouts at the given step, holding the final pose past the end.
    ///
    /// Sweeps are never empty, they always hold at least the starting pose.
    pub fn at(&self, step: usize) -> &PlacedArm {
        let last = self.placed.len().saturating_sub(1);
        &self.placed[step.min(last)]
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Pose of an arm `time_s` seconds into a move table.
///
/// Within each row both axes wait out the pre-pause, then move at once at their own speed
/// mode's rate, each stopping when its delta is covered.
pub fn pose_at_time(
    start: (f64, f64),
    table: &MoveTable,
    rates: &SpeedRates,
    time_s: f64,
) -> (f64, f64) {
    let (mut theta, mut phi) = start;
    let mut row_start_s = 0.0;

    for row in table.rows.iter() {
        let row_time_s = row.row_time(rates);
        let elapsed_s = time_s - row_start_s - row.pre_pause;

        if time_s >= row_start_s + row_time_s {
            // Row complete
            theta += axis_progress(row.delta_theta, rates.rate(row.speed_mode_theta), f64::MAX);
            phi += axis_progress(row.delta_phi, rates.rate(row.speed_mode_phi), f64::MAX);
        } else {
            if elapsed_s > 0.0 {
                theta += axis_progress(
                    row.delta_theta,
                    rates.rate(row.speed_mode_theta),
                    elapsed_s,
                );
                phi += axis_progress(row.delta_phi, rates.rate(row.speed_mode_phi), elapsed_s);
            }
            return (theta, phi);
        }

        row_start_s += row_time_s;
    }

    (theta, phi)
}

/// Distance covered by an axis after `elapsed_s` seconds of motion.
fn axis_progress(delta_deg: f64, rate_deg_s: Option<f64>, elapsed_s: f64) -> f64 {
    match rate_deg_s {
        Some(rate) if rate > 0.0 => {
            let covered = (rate * elapsed_s).min(delta_deg.abs());
            covered.copysign(delta_deg)
        }
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use pos_if::{MoveRow, SpeedMode};

    fn rates() -> SpeedRates {
        SpeedRates {
            cruise_deg_s: 100.0,
            creep_deg_s: 10.0,
        }
    }

    #[test]
    fn test_pose_at_time() {
        let mut table = MoveTable::new(ArmId(1));
        table.push(MoveRow {
            pre_pause: 0.1,
            ..MoveRow::cruise(50.0, -20.0)
        });

        let start = (10.0, 150.0);
        assert_eq!(pose_at_time(start, &table, &rates(), 0.05), start);

        // Phi finishes first and stops
        let (t, p) = pose_at_time(start, &table, &rates(), 0.4);
        assert!((t - 40.0).abs() < 1e-9);
        assert!((p - 130.0).abs() < 1e-9);

        assert_eq!(pose_at_time(start, &table, &rates(), 10.0), (60.0, 130.0));
    }

    #[test]
    fn test_axis_without_speed_stays() {
        let mut table = MoveTable::new(ArmId(1));
        table.push(MoveRow {
            speed_mode_phi: SpeedMode::None,
            ..MoveRow::cruise(10.0, 0.0)
        });

        let (_, p) = pose_at_time((0.0, 120.0), &table, &rates(), 1.0);
        assert_eq!(p, 120.0);
    }

    #[test]
    fn test_sweep_sampling() {
        let mut table = MoveTable::new(ArmId(3));
        table.push(MoveRow::cruise(25.0, 0.0));

        // 0.25 s of motion every 0.1 s gives samples at 0, 0.1, 0.2 and the end
        let sweep = Sweep::from_table((0.0, 150.0), &table, &rates(), 0.1).unwrap();
        assert_eq!(sweep.len(), 4);
        assert_eq!(sweep.final_pose(), (25.0, 150.0));
        assert_eq!(sweep.pose_at(100), (25.0, 150.0));

        let still = Sweep::stationary(ArmId(4), (1.0, 2.0));
        assert_eq!(still.len(), 1);
        assert_eq!(still.pose_at(7), (1.0, 2.0));
    }
}

//! Parameters structure for the scheduler

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use pos_if::SpeedRates;
use serde::{Deserialize, Serialize};

// Internal
use super::ScheduleError;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Parameters for the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleParams {
    // ---- SIMULATION ----
    /// Interval between collision checks along the tables.
    ///
    /// Units: seconds
    pub timestep_s: f64,

    /// Angular rates of the speed modes
    pub rates: SpeedRates,

    // ---- ADJUSTMENT ----
    /// Phi angle arms are retracted to before rotating theta, clamped into each arm's targetable
    /// range.
    ///
    /// Units: degrees
    pub phi_safe_deg: f64,

    /// Maximum number of adjustments made to one arm before it is frozen instead.
    pub retry_ceiling: usize,

    /// Extra timesteps added to each extension delay.
    pub clearance_margin_steps: usize,

    // ---- BATCHES ----
    /// Default for whether relative requests may be mixed with absolute ones.
    #[serde(default)]
    pub allow_mixed_relative: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScheduleParams {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if !(self.timestep_s.is_finite() && self.timestep_s > 0.0) {
            return Err(ScheduleError::InvalidParams(format!(
                "timestep_s must be positive, got {}",
                self.timestep_s
            )));
        }
        if !(self.rates.cruise_deg_s > 0.0 && self.rates.creep_deg_s > 0.0) {
            return Err(ScheduleError::InvalidParams(String::from(
                "speed mode rates must be positive",
            )));
        }
        if !self.phi_safe_deg.is_finite() {
            return Err(ScheduleError::InvalidParams(String::from(
                "phi_safe_deg must be finite",
            )));
        }

        Ok(())
    }

    /// Duration of the clearance margin.
    ///
    /// Units: seconds
    pub fn clearance_margin_s(&self) -> f64 {
        self.clearance_margin_steps as f64 * self.timestep_s
    }
}

impl Default for ScheduleParams {
    fn default() -> Self {
        Self {
            timestep_s: 0.02,
            rates: SpeedRates::default(),
            phi_safe_deg: 144.0,
            retry_ceiling: 3,
            clearance_margin_steps: 2,
            allow_mixed_relative: false,
        }
    }
}

//! Arm model and joint state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::{Deserialize, Serialize};

// Internal
use super::*;
use crate::transforms::PosTransforms;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Current best-known joint position of an arm.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct ArmState {
    /// Units: degrees
    pub pos_theta: f64,

    /// Units: degrees
    pub pos_phi: f64,
}

/// One arm: its calibration and current state.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmModel {
    id: ArmId,
    calib: ArmCalibration,
    state: ArmState,

    /// Incremented on every calibration change.
    calib_version: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArmState {
    pub fn new(pos_theta: f64, pos_phi: f64) -> Self {
        Self { pos_theta, pos_phi }
    }

    /// The state as a (theta, phi) pair
    pub fn pose(&self) -> (f64, f64) {
        (self.pos_theta, self.pos_phi)
    }
}

impl ArmModel {
    /// Create a new model, checking the calibration and that the state is inside its range.
    pub fn new(id: ArmId, calib: ArmCalibration, state: ArmState) -> Result<Self, ArmError> {
        calib.validate(id)?;
        check_state(id, &calib, &state)?;

        Ok(Self {
            id,
            calib,
            state,
            calib_version: 0,
        })
    }

    /// Create a new model from the calibration and position values in a store.
    pub fn read_from<S: CalibStore + ?Sized>(id: ArmId, store: &S) -> Result<Self, ArmError> {
        let calib = ArmCalibration::read_from(store).map_err(|e| ArmError::Store(id, e))?;
        let state = ArmState {
            pos_theta: store.read_f64(KEY_POS_T).map_err(|e| ArmError::Store(id, e))?,
            pos_phi: store.read_f64(KEY_POS_P).map_err(|e| ArmError::Store(id, e))?,
        };

        Self::new(id, calib, state)
    }

    /// Write the calibration and position back to a store.
    pub fn write_to<S: CalibStore + ?Sized>(&self, store: &mut S) -> Result<(), ArmError> {
        let wrap = |e| ArmError::Store(self.id, e);

        self.calib.write_to(store).map_err(wrap)?;
        store
            .write(KEY_POS_T, CalibValue::Float(self.state.pos_theta))
            .map_err(wrap)?;
        store
            .write(KEY_POS_P, CalibValue::Float(self.state.pos_phi))
            .map_err(wrap)
    }

    pub fn id(&self) -> ArmId {
        self.id
    }

    pub fn calib(&self) -> &ArmCalibration {
        &self.calib
    }

    pub fn state(&self) -> &ArmState {
        &self.state
    }

    pub fn calib_version(&self) -> u64 {
        self.calib_version
    }

    pub fn is_enabled(&self) -> bool {
        self.calib.enabled
    }

    /// Transforms bound to this arm's calibration.
    pub fn transforms(&self) -> PosTransforms<'_> {
        self.calib.transforms()
    }

    /// Position of the fiber in the global frame.
    ///
    /// Units: millimeters
    pub fn current_global_xy(&self) -> (f64, f64) {
        self.transforms()
            .joint_to_global_xy(self.state.pos_theta, self.state.pos_phi)
    }

    /// Region requests for this arm may target.
    pub fn targetable_range(&self) -> TargetableRange {
        self.calib.targetable_range()
    }

    /// Move the arm's state by the given joint deltas.
    ///
    /// The state is left untouched if the result would be outside the hard-stop range.
    pub fn apply(&mut self, delta_theta: f64, delta_phi: f64) -> Result<(), ArmError> {
        let new_state = self.state_after(delta_theta, delta_phi)?;

        debug!(
            "Arm {} moved ({:.4}, {:.4}) -> ({:.4}, {:.4})",
            self.id,
            self.state.pos_theta,
            self.state.pos_phi,
            new_state.pos_theta,
            new_state.pos_phi
        );
        self.state = new_state;

        Ok(())
    }

    /// The state the arm would be in after the given deltas, without changing anything.
    pub fn state_after(&self, delta_theta: f64, delta_phi: f64) -> Result<ArmState, ArmError> {
        let new_state = ArmState {
            pos_theta: self.state.pos_theta + delta_theta,
            pos_phi: self.state.pos_phi + delta_phi,
        };
        check_state(self.id, &self.calib, &new_state)?;

        Ok(new_state)
    }

    /// Replace the calibration.
    ///
    /// Collision geometry built from the old calibration is stale from this point until it is
    /// refreshed.
    pub fn set_calibration(&mut self, calib: ArmCalibration) -> Result<(), ArmError> {
        calib.validate(self.id)?;
        check_state(self.id, &calib, &self.state)?;

        self.calib = calib;
        self.calib_version += 1;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn check_state(id: ArmId, calib: &ArmCalibration, state: &ArmState) -> Result<(), ArmError> {
    if calib
        .hard_limits()
        .contains(state.pos_theta, state.pos_phi, STATE_TOL_DEG)
    {
        Ok(())
    } else {
        Err(ArmError::StateOutOfRange {
            id,
            theta_deg: state.pos_theta,
            phi_deg: state.pos_phi,
        })
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

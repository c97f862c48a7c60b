//! Calibration key-value stores
//!
//! Calibration lives outside the scheduler, one record of named values per arm. The scheduler
//! only needs to read it, and to write it back when new calibration has been seeded.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Internal
use super::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

pub const KEY_LENGTH_R1: &str = "LENGTH_R1";
pub const KEY_LENGTH_R2: &str = "LENGTH_R2";
pub const KEY_OFFSET_T: &str = "OFFSET_T";
pub const KEY_OFFSET_P: &str = "OFFSET_P";
pub const KEY_OFFSET_X: &str = "OFFSET_X";
pub const KEY_OFFSET_Y: &str = "OFFSET_Y";
pub const KEY_PHYSICAL_RANGE_T: &str = "PHYSICAL_RANGE_T";
pub const KEY_PHYSICAL_RANGE_P: &str = "PHYSICAL_RANGE_P";
pub const KEY_HARDSTOP_CLEARANCE_T: &str = "HARDSTOP_CLEARANCE_T";
pub const KEY_HARDSTOP_CLEARANCE_P: &str = "HARDSTOP_CLEARANCE_P";
pub const KEY_CTRL_ENABLED: &str = "CTRL_ENABLED";
pub const KEY_POS_T: &str = "POS_T";
pub const KEY_POS_P: &str = "POS_P";
pub const KEY_ANTIBACKLASH_ON: &str = "ANTIBACKLASH_ON";
pub const KEY_BACKLASH: &str = "BACKLASH";
pub const KEY_ANTIBACKLASH_FINAL_MOVE_DIR_T: &str = "ANTIBACKLASH_FINAL_MOVE_DIR_T";
pub const KEY_ANTIBACKLASH_FINAL_MOVE_DIR_P: &str = "ANTIBACKLASH_FINAL_MOVE_DIR_P";
pub const KEY_FINAL_CREEP_ON: &str = "FINAL_CREEP_ON";
pub const KEY_NOM_FINAL_CREEP_DIST: &str = "NOM_FINAL_CREEP_DIST";

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A per-arm record of named calibration values.
pub trait CalibStore {
    /// Read a value, `None` if the key is not present.
    fn read(&self, key: &str) -> Result<Option<CalibValue>, CalibStoreError>;

    /// Write a value, replacing any existing one.
    fn write(&mut self, key: &str, value: CalibValue) -> Result<(), CalibStoreError>;

    /// Read a required float.
    fn read_f64(&self, key: &str) -> Result<f64, CalibStoreError> {
        match self.read(key)? {
            Some(CalibValue::Float(v)) => Ok(v),
            Some(CalibValue::Bool(_)) => Err(CalibStoreError::WrongType {
                key: String::from(key),
                expected: "float",
            }),
            None => Err(CalibStoreError::Missing(String::from(key))),
        }
    }

    /// Read an optional float, giving `default` if the key is absent.
    fn read_f64_or(&self, key: &str, default: f64) -> Result<f64, CalibStoreError> {
        match self.read(key)? {
            None => Ok(default),
            Some(_) => self.read_f64(key),
        }
    }

    /// Read a required boolean.
    fn read_bool(&self, key: &str) -> Result<bool, CalibStoreError> {
        match self.read(key)? {
            Some(CalibValue::Bool(v)) => Ok(v),
            Some(CalibValue::Float(_)) => Err(CalibStoreError::WrongType {
                key: String::from(key),
                expected: "bool",
            }),
            None => Err(CalibStoreError::Missing(String::from(key))),
        }
    }

    /// Read an optional boolean, giving `default` if the key is absent.
    fn read_bool_or(&self, key: &str, default: bool) -> Result<bool, CalibStoreError> {
        match self.read(key)? {
            None => Ok(default),
            Some(_) => self.read_bool(key),
        }
    }
}

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// A calibration store held in memory.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MemStore {
    values: BTreeMap<String, CalibValue>,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// A single value in a calibration store.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum CalibValue {
    Bool(bool),
    Float(f64),
}

/// Errors raised by calibration stores.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum CalibStoreError {
    #[error("Key {0} is missing")]
    Missing(String),

    #[error("Key {key} does not hold a {expected}")]
    WrongType { key: String, expected: &'static str },

    #[error("Store is read only")]
    ReadOnly,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys held
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl CalibStore for MemStore {
    fn read(&self, key: &str) -> Result<Option<CalibValue>, CalibStoreError> {
        Ok(self.values.get(key).copied())
    }

    fn write(&mut self, key: &str, value: CalibValue) -> Result<(), CalibStoreError> {
        self.values.insert(String::from(key), value);
        Ok(())
    }
}

impl ArmCalibration {
    /// Read a calibration from a store.
    ///
    /// Physical ranges are split into hard-stop intervals with
    /// [`ArmCalibration::ranges_from_physical`]. Clearances and automatic move settings are
    /// optional.
    pub fn read_from<S: CalibStore + ?Sized>(store: &S) -> Result<Self, CalibStoreError> {
        let (range_theta, range_phi) = Self::ranges_from_physical(
            store.read_f64(KEY_PHYSICAL_RANGE_T)?,
            store.read_f64(KEY_PHYSICAL_RANGE_P)?,
        );

        let defaults = AutoMoves::default();
        let auto_moves = AutoMoves {
            antibacklash: store.read_bool_or(KEY_ANTIBACKLASH_ON, defaults.antibacklash)?,
            backlash_deg: store.read_f64_or(KEY_BACKLASH, defaults.backlash_deg)?,
            final_move_dir: [
                store.read_f64_or(KEY_ANTIBACKLASH_FINAL_MOVE_DIR_T, defaults.final_move_dir[0])?,
                store.read_f64_or(KEY_ANTIBACKLASH_FINAL_MOVE_DIR_P, defaults.final_move_dir[1])?,
            ],
            final_creep: store.read_bool_or(KEY_FINAL_CREEP_ON, defaults.final_creep)?,
            final_creep_deg: store.read_f64_or(KEY_NOM_FINAL_CREEP_DIST, defaults.final_creep_deg)?,
        };

        Ok(Self {
            length_r1: store.read_f64(KEY_LENGTH_R1)?,
            length_r2: store.read_f64(KEY_LENGTH_R2)?,
            offset_theta: store.read_f64(KEY_OFFSET_T)?,
            offset_phi: store.read_f64(KEY_OFFSET_P)?,
            offset_x: store.read_f64(KEY_OFFSET_X)?,
            offset_y: store.read_f64(KEY_OFFSET_Y)?,
            range_theta,
            range_phi,
            clearance_theta: store.read_f64_or(KEY_HARDSTOP_CLEARANCE_T, 0.0)?,
            clearance_phi: store.read_f64_or(KEY_HARDSTOP_CLEARANCE_P, 0.0)?,
            auto_moves,
            enabled: store.read_bool(KEY_CTRL_ENABLED)?,
        })
    }

    /// Write a calibration to a store.
    ///
    /// Only the span of each range is stored, so ranges not split the way
    /// [`ArmCalibration::ranges_from_physical`] splits them do not survive a round trip.
    pub fn write_to<S: CalibStore + ?Sized>(&self, store: &mut S) -> Result<(), CalibStoreError> {
        let floats = [
            (KEY_LENGTH_R1, self.length_r1),
            (KEY_LENGTH_R2, self.length_r2),
            (KEY_OFFSET_T, self.offset_theta),
            (KEY_OFFSET_P, self.offset_phi),
            (KEY_OFFSET_X, self.offset_x),
            (KEY_OFFSET_Y, self.offset_y),
            (
                KEY_PHYSICAL_RANGE_T,
                self.range_theta[1] - self.range_theta[0],
            ),
            (KEY_PHYSICAL_RANGE_P, self.range_phi[1] - self.range_phi[0]),
            (KEY_HARDSTOP_CLEARANCE_T, self.clearance_theta),
            (KEY_HARDSTOP_CLEARANCE_P, self.clearance_phi),
            (KEY_BACKLASH, self.auto_moves.backlash_deg),
            (
                KEY_ANTIBACKLASH_FINAL_MOVE_DIR_T,
                self.auto_moves.final_move_dir[0],
            ),
            (
                KEY_ANTIBACKLASH_FINAL_MOVE_DIR_P,
                self.auto_moves.final_move_dir[1],
            ),
            (KEY_NOM_FINAL_CREEP_DIST, self.auto_moves.final_creep_deg),
        ];
        let bools = [
            (KEY_ANTIBACKLASH_ON, self.auto_moves.antibacklash),
            (KEY_FINAL_CREEP_ON, self.auto_moves.final_creep),
            (KEY_CTRL_ENABLED, self.enabled),
        ];

        for (key, value) in floats.iter() {
            store.write(key, CalibValue::Float(*value))?;
        }
        for (key, value) in bools.iter() {
            store.write(key, CalibValue::Bool(*value))?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

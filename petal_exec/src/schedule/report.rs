//! Schedule output and resolution report

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use pos_if::{AnticolMode, ArmId, MoveTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Internal
use super::{ScheduleError, ScheduleState};
use crate::collider::CollisionClass;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// The planned batch: one move table per participating arm and a report on every requested arm.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Schedule {
    /// Either `Resolved` or `Frozen`
    pub state: ScheduleState,

    pub mode: AnticolMode,

    /// False if collision checking was skipped for this batch
    pub anticollision: bool,

    pub tables: BTreeMap<ArmId, MoveTable>,

    pub report: BTreeMap<ArmId, ArmReport>,

    /// Conflicts left when the batch was frozen
    pub unresolved: Vec<Conflict>,

    /// Number of validation passes made
    pub iterations: usize,
}

/// What happened to one requested arm.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ArmReport {
    /// The arm is held at its starting pose
    pub frozen: bool,

    /// Number of adjustments made to the arm's table
    pub adjusted_count: usize,

    pub reason: Option<Reason>,

    /// The conflict that last caused this arm to be adjusted or frozen
    pub conflict: Option<Conflict>,
}

/// A collision found while validating.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Conflict {
    /// Timestep at which the collision first occurs
    pub step: usize,

    /// The arm involved, the lower identifier for pairs
    pub arm: ArmId,

    pub with: ConflictWith,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Why an arm ended up the way it did.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    /// The target is outside the arm's patrol envelope
    Unreachable,

    /// The target needs joint angles beyond the targetable range
    OutOfRange,

    /// The target could not be turned into a valid table
    InvalidTarget,

    /// The arm is disabled
    Disabled,

    /// Frozen to resolve a collision
    FrozenByCollision,

    /// Adjustments were exhausted so the arm was frozen
    AdjustExhausted,

    /// Retract-rotate-extend adjustments were made
    Adjusted,

    /// The whole batch could not be scheduled
    Unschedulable,
}

/// What an arm collided with.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ConflictWith {
    Arm { id: ArmId, class: CollisionClass },
    Obstacle { index: usize, name: String },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Schedule {
    /// Error unless the schedule was resolved.
    pub fn ensure_resolved(&self) -> Result<(), ScheduleError> {
        match self.state {
            ScheduleState::Resolved => Ok(()),
            _ => Err(ScheduleError::CollisionUnresolved(self.unresolved.clone())),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.state == ScheduleState::Resolved
    }

    pub fn table(&self, id: ArmId) -> Option<&MoveTable> {
        self.tables.get(&id)
    }

    /// Identifiers of the frozen arms.
    pub fn frozen_ids(&self) -> Vec<ArmId> {
        self.report
            .iter()
            .filter(|(_, r)| r.frozen)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Identifiers of arms with at least one adjustment, whether frozen later or not.
    pub fn adjusted_ids(&self) -> Vec<ArmId> {
        self.report
            .iter()
            .filter(|(_, r)| r.adjusted_count > 0)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Identifiers of arms whose tables contain motion.
    pub fn moving_ids(&self) -> Vec<ArmId> {
        self.tables
            .iter()
            .filter(|(_, t)| !t.is_motionless())
            .map(|(id, _)| *id)
            .collect()
    }
}

impl Conflict {
    pub fn pair(step: usize, a: ArmId, b: ArmId, class: CollisionClass) -> Self {
        Self {
            step,
            arm: a,
            with: ConflictWith::Arm { id: b, class },
        }
    }

    pub fn obstacle(step: usize, arm: ArmId, index: usize, name: &str) -> Self {
        Self {
            step,
            arm,
            with: ConflictWith::Obstacle {
                index,
                name: String::from(name),
            },
        }
    }

    /// The arms involved, in increasing identifier order.
    pub fn arms(&self) -> Vec<ArmId> {
        match self.with {
            ConflictWith::Arm { id, .. } => {
                let mut ids = vec![self.arm, id];
                ids.sort();
                ids
            }
            ConflictWith::Obstacle { .. } => vec![self.arm],
        }
    }

    /// Identifies what collided, independent of when.
    pub fn key(&self) -> (ArmId, u8, usize) {
        match self.with {
            ConflictWith::Arm { id, .. } => (self.arm, 0, id.0 as usize),
            ConflictWith::Obstacle { index, .. } => (self.arm, 1, index),
        }
    }

    /// Conflicts are resolved earliest first, then by increasing arm identifiers.
    pub fn order_key(&self) -> (usize, (ArmId, u8, usize)) {
        (self.step, self.key())
    }
}

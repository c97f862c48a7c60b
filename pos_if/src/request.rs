//! # Move requests
//!
//! A move request asks for one arm to be moved to a target. Requests are collected into a batch
//! which the scheduler plans in one go.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;
use structopt::StructOpt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Identifier of a single arm on the petal.
///
/// Arms are ordered by their identifier, which is what the scheduler uses to break ties when
/// deciding which arm of a conflicting pair has to give way.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(transparent)]
pub struct ArmId(pub u32);

/// A request for one arm to move.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MoveRequest {
    /// The arm to be moved
    pub arm_id: ArmId,

    /// How `target` is to be interpreted
    pub kind: CommandKind,

    /// The target, in the frame given by `kind`.
    ///
    /// Units: degrees for joint angles and Q, millimeters for XY and S.
    pub target: [f64; 2],
}

/// A batch of requests, as read from a request file.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RequestBatch {
    /// Anticollision mode for the batch
    #[serde(default)]
    pub mode: AnticolMode,

    /// Permit relative requests to be mixed with absolute ones, which disables anticollision for
    /// the whole batch.
    #[serde(default)]
    pub allow_mixed_relative: bool,

    /// The requests themselves, at most one per arm
    pub requests: Vec<MoveRequest>,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// The frame in which a request's target is given.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Absolute (theta, phi) joint target
    AbsJoint,

    /// Absolute (x, y) target in the global frame
    AbsGlobalXy,

    /// Absolute (q, s) target on the focal surface
    AbsFocalQs,

    /// Relative (dtheta, dphi) joint delta.
    ///
    /// Relative requests are not checked against the reachable range and switch anticollision off
    /// for the whole batch they are part of.
    RelJoint,
}

/// Anticollision mode to be used when scheduling a batch.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnticolMode {
    /// No collision checking at all
    Off,

    /// Conflicting arms are held at their starting position
    Freeze,

    /// Conflicting arms get retraction waypoints inserted, falling back to freezing
    Adjust,
}

/// Command line form of a single move request.
#[derive(Debug, Clone, StructOpt)]
pub enum RequestCmd {
    /// Move an arm to an absolute (theta, phi) joint position, in degrees.
    #[structopt(name = "tp")]
    Joint {
        arm: u32,
        theta: f64,
        phi: f64,
    },

    /// Move an arm to an absolute global (x, y) position, in millimeters.
    #[structopt(name = "xy")]
    GlobalXy { arm: u32, x: f64, y: f64 },

    /// Move an arm to an absolute focal surface (q, s) position.
    #[structopt(name = "qs")]
    FocalQs { arm: u32, q: f64, s: f64 },

    /// Move an arm by a relative (dtheta, dphi) joint delta, in degrees.
    ///
    /// No anticollision is performed on relative moves.
    #[structopt(name = "dtdp")]
    Relative { arm: u32, dtheta: f64, dphi: f64 },
}

/// Errors which can occur while parsing requests.
#[derive(Debug, Error)]
pub enum RequestParseError {
    #[error("Request batch is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("{0} is not a recognised anticollision mode (expected off, freeze or adjust)")]
    InvalidMode(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Display for ArmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{:05}", self.0)
    }
}

impl MoveRequest {
    /// Request an absolute (theta, phi) joint target.
    pub fn joint(arm_id: ArmId, theta_deg: f64, phi_deg: f64) -> Self {
        Self {
            arm_id,
            kind: CommandKind::AbsJoint,
            target: [theta_deg, phi_deg],
        }
    }

    /// Request an absolute global (x, y) target.
    pub fn global_xy(arm_id: ArmId, x_mm: f64, y_mm: f64) -> Self {
        Self {
            arm_id,
            kind: CommandKind::AbsGlobalXy,
            target: [x_mm, y_mm],
        }
    }

    /// Request an absolute focal surface (q, s) target.
    pub fn focal_qs(arm_id: ArmId, q_deg: f64, s_mm: f64) -> Self {
        Self {
            arm_id,
            kind: CommandKind::AbsFocalQs,
            target: [q_deg, s_mm],
        }
    }

    /// Request a relative (dtheta, dphi) move.
    pub fn relative(arm_id: ArmId, dtheta_deg: f64, dphi_deg: f64) -> Self {
        Self {
            arm_id,
            kind: CommandKind::RelJoint,
            target: [dtheta_deg, dphi_deg],
        }
    }

    /// True if this is a relative request.
    pub fn is_relative(&self) -> bool {
        self.kind == CommandKind::RelJoint
    }
}

impl RequestBatch {
    /// Parse a new batch from a JSON document.
    pub fn from_json(json_str: &str) -> Result<Self, RequestParseError> {
        serde_json::from_str(json_str).map_err(RequestParseError::InvalidJson)
    }
}

impl From<RequestCmd> for MoveRequest {
    fn from(cmd: RequestCmd) -> Self {
        match cmd {
            RequestCmd::Joint { arm, theta, phi } => MoveRequest::joint(ArmId(arm), theta, phi),
            RequestCmd::GlobalXy { arm, x, y } => MoveRequest::global_xy(ArmId(arm), x, y),
            RequestCmd::FocalQs { arm, q, s } => MoveRequest::focal_qs(ArmId(arm), q, s),
            RequestCmd::Relative { arm, dtheta, dphi } => {
                MoveRequest::relative(ArmId(arm), dtheta, dphi)
            }
        }
    }
}

impl Default for AnticolMode {
    fn default() -> Self {
        AnticolMode::Adjust
    }
}

impl FromStr for AnticolMode {
    type Err = RequestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" | "none" => Ok(AnticolMode::Off),
            "freeze" => Ok(AnticolMode::Freeze),
            "adjust" => Ok(AnticolMode::Adjust),
            _ => Err(RequestParseError::InvalidMode(String::from(s))),
        }
    }
}

impl Display for AnticolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnticolMode::Off => write!(f, "off"),
            AnticolMode::Freeze => write!(f, "freeze"),
            AnticolMode::Adjust => write!(f, "adjust"),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

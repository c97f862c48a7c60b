//! # Move table construction
//!
//! Builds the move table taking an arm from its starting pose to a requested target, and the
//! retract-rotate-extend tables used to dodge neighbours. Once a schedule is resolved,
//! [`add_auto_moves`] appends any antibacklash or final creep moves an arm is calibrated for.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use pos_if::{
    table::{TableError, MOTIONLESS_TOL_DEG},
    ArmId, CommandKind, MoveRow, MoveTable, SpeedMode,
};

// Internal
use crate::{
    arm_model::ArmModel,
    transforms::{FocalSurface, TransformError},
};

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Errors that can occur while building a move table.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum MoveTableError {
    #[error("Cannot resolve target: {0}")]
    Transform(#[from] TransformError),

    #[error("Built an invalid table: {0}")]
    InvalidTable(#[from] TableError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Resolve an absolute target into an in-range joint pose.
///
/// Cartesian targets keep the winding of theta nearest `start`.
pub fn target_joint(
    arm: &ArmModel,
    start: (f64, f64),
    target: [f64; 2],
    kind: CommandKind,
    focal: &FocalSurface,
) -> Result<(f64, f64), MoveTableError> {
    let limits = arm.targetable_range().limits;
    let transforms = arm.transforms();

    let joint = match kind {
        CommandKind::AbsJoint => {
            let (theta, phi) = (target[0], target[1]);
            if !theta.is_finite() || !phi.is_finite() {
                return Err(TransformError::NonFinite.into());
            }
            if !(limits.theta_ok(theta) && limits.phi_ok(phi)) {
                return Err(TransformError::OutOfRange {
                    theta_deg: theta,
                    phi_deg: phi,
                }
                .into());
            }
            (theta, phi)
        }
        CommandKind::AbsGlobalXy => {
            transforms.global_xy_to_joint_within(target[0], target[1], &limits, start.0)?
        }
        CommandKind::AbsFocalQs => {
            let (x, y) = focal.qs_to_global_xy(target[0], target[1]);
            transforms.global_xy_to_joint_within(x, y, &limits, start.0)?
        }
        CommandKind::RelJoint => (start.0 + target[0], start.1 + target[1]),
    };

    Ok(joint)
}

/// Build the move table for a request.
///
/// Absolute targets give a single cruise row of `target - start`. Relative targets give the
/// literal delta and are not checked against the arm's range.
pub fn build(
    arm: &ArmModel,
    start: (f64, f64),
    target: [f64; 2],
    kind: CommandKind,
    focal: &FocalSurface,
) -> Result<MoveTable, MoveTableError> {
    let (delta_theta, delta_phi) = match kind {
        CommandKind::RelJoint => (target[0], target[1]),
        _ => {
            let (theta, phi) = target_joint(arm, start, target, kind, focal)?;
            (theta - start.0, phi - start.1)
        }
    };

    let mut table = MoveTable::new(arm.id());
    table.push(MoveRow::cruise(delta_theta, delta_phi));
    table.append_note(&format!("direct {:?}", kind));
    table.validate()?;

    debug!(
        "Arm {} direct table ({:.4}, {:.4}) deg",
        arm.id(),
        delta_theta,
        delta_phi
    );

    Ok(table)
}

/// Build a retract-rotate-extend table from `start` to `end`.
///
/// Phi first retracts to `phi_safe_deg` (if it isn't already at least that far in), theta then
/// rotates to its target with phi tucked, and finally phi extends to its target. Axes that don't
/// move in a row are left in `SpeedMode::None`.
pub fn retract_rotate_extend(
    arm_id: ArmId,
    start: (f64, f64),
    end: (f64, f64),
    phi_safe_deg: f64,
) -> MoveTable {
    let tucked_phi = start.1.max(phi_safe_deg);

    let mut table = MoveTable::new(arm_id);
    table.push(phi_row(tucked_phi - start.1));
    table.push(theta_row(end.0 - start.0));
    table.push(phi_row(end.1 - tucked_phi));
    table.append_note("retract-rotate-extend");

    table
}

/// Delay the final (extension) row of a table.
pub fn delay_extension(table: &mut MoveTable, delay_s: f64) {
    if let Some(row) = table.rows.last_mut() {
        row.pre_pause = delay_s.max(0.0);
    }
    table.append_note(&format!("extension delayed {:.3} s", delay_s));
}

/// Append the automatic moves the arm's calibration asks for, made at the end pose of the
/// table's planned rows.
///
/// Each moved axis backs off by its approach distance and then creeps back to the end pose. With
/// antibacklash the approach is the backlash in the final move direction, otherwise it is the
/// final creep distance along the direction of travel. An axis whose backup would pass a hard
/// stop gets no automatic move.
pub fn add_auto_moves(table: &mut MoveTable, arm: &ArmModel) {
    let auto = arm.calib().auto_moves;
    if !auto.is_enabled() || table.is_motionless() {
        return;
    }

    let start = arm.state().pose();
    let (dt, dp) = table.total_delta();
    let limits = arm.calib().hard_limits();
    let axes = [
        ("theta", start.0 + dt, dt, limits.theta),
        ("phi", start.1 + dp, dp, limits.phi),
    ];

    let mut approach = [0.0; 2];
    for (i, (name, end, delta, range)) in axes.iter().enumerate() {
        if delta.abs() <= MOTIONLESS_TOL_DEG {
            continue;
        }

        let dist = if auto.antibacklash {
            auto.final_move_dir[i] * auto.backlash_deg
        } else {
            delta.signum() * auto.final_creep_deg.min(delta.abs())
        };

        let backed_off = end - dist;
        if backed_off < range[0] || backed_off > range[1] {
            debug!(
                "Arm {} {} automatic move skipped, backup to {:.3} deg passes a hard stop",
                arm.id(),
                name,
                backed_off
            );
            continue;
        }
        approach[i] = dist;
    }

    if approach.iter().all(|a| a.abs() <= MOTIONLESS_TOL_DEG) {
        return;
    }

    table.auto_rows.push(MoveRow {
        speed_mode_theta: mode_for(approach[0]),
        speed_mode_phi: mode_for(approach[1]),
        ..MoveRow::cruise(-approach[0], -approach[1])
    });
    table.auto_rows.push(MoveRow {
        speed_mode_theta: creep_for(approach[0]),
        speed_mode_phi: creep_for(approach[1]),
        ..MoveRow::cruise(approach[0], approach[1])
    });
    table.append_note(if auto.antibacklash {
        "antibacklash"
    } else {
        "final creep"
    });
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn theta_row(delta_theta: f64) -> MoveRow {
    MoveRow {
        speed_mode_theta: mode_for(delta_theta),
        speed_mode_phi: SpeedMode::None,
        ..MoveRow::cruise(delta_theta, 0.0)
    }
}

fn phi_row(delta_phi: f64) -> MoveRow {
    MoveRow {
        speed_mode_theta: SpeedMode::None,
        speed_mode_phi: mode_for(delta_phi),
        ..MoveRow::cruise(0.0, delta_phi)
    }
}

fn mode_for(delta: f64) -> SpeedMode {
    if delta.abs() > MOTIONLESS_TOL_DEG {
        SpeedMode::Cruise
    } else {
        SpeedMode::None
    }
}

fn creep_for(delta: f64) -> SpeedMode {
    match mode_for(delta) {
        SpeedMode::Cruise => SpeedMode::Creep,
        m => m,
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

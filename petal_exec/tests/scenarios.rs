//! Scheduling scenarios with known outcomes

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use petal_lib::{
    arm_model::{ArmArena, ArmCalibration, ArmModel, ArmState},
    collider::{Collider, ColliderParams, CollisionError, FixedObstacleDef},
    schedule::{validate_tables, PosSchedule, Reason, ScheduleError, ScheduleParams, ScheduleState},
    transforms::{FocalSurface, TransformError},
};
use pos_if::{AnticolMode, ArmId, MoveRequest};

// ---------------------------------------------------------------------------
// HELPERS
// ---------------------------------------------------------------------------

fn arm_at(id: u32, x: f64, y: f64, pose: (f64, f64)) -> ArmModel {
    ArmModel::new(
        ArmId(id),
        ArmCalibration {
            offset_x: x,
            offset_y: y,
            ..ArmCalibration::default()
        },
        ArmState::new(pose.0, pose.1),
    )
    .unwrap()
}

/// Two arms at the nominal pitch, each folded away from the other.
fn pair_arena() -> ArmArena {
    let mut arena = ArmArena::new();
    arena.insert(arm_at(1, 0.0, 0.0, (180.0, 180.0))).unwrap();
    arena.insert(arm_at(2, 10.4, 0.0, (0.0, 180.0))).unwrap();
    arena
}

fn block_params() -> ColliderParams {
    ColliderParams {
        fixed_obstacles: vec![FixedObstacleDef {
            name: String::from("block"),
            points: vec![[5.5, -0.5], [6.5, -0.5], [6.5, 0.5], [5.5, 0.5]],
        }],
        ..ColliderParams::default()
    }
}

fn collider_for(arena: &ArmArena, params: ColliderParams) -> Collider {
    let mut collider = Collider::new(params).unwrap();
    collider.refresh_all(arena);
    collider
}

/// Both arms reach fully towards each other.
fn colliding_requests() -> Vec<MoveRequest> {
    vec![
        MoveRequest::joint(ArmId(1), 0.0, 0.0),
        MoveRequest::joint(ArmId(2), 180.0, 0.0),
    ]
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[test]
fn test_freeze_holds_lower_id() {
    let arena = pair_arena();
    let collider = collider_for(&arena, ColliderParams::default());
    let focal = FocalSurface::default();
    let params = ScheduleParams::default();

    let mut sched = PosSchedule::new(&arena, &collider, &focal, &params, AnticolMode::Freeze);
    for req in colliding_requests() {
        sched.request(req).unwrap();
    }
    let schedule = sched.schedule_moves().unwrap();

    assert_eq!(schedule.state, ScheduleState::Resolved);
    assert_eq!(schedule.frozen_ids(), vec![ArmId(1)]);
    assert_eq!(
        schedule.report[&ArmId(1)].reason,
        Some(Reason::FrozenByCollision)
    );
    assert!(schedule.report[&ArmId(1)].conflict.is_some());

    assert!(schedule.tables[&ArmId(1)].is_motionless());
    assert_eq!(schedule.tables[&ArmId(2)].total_delta(), (180.0, -180.0));
    assert_eq!(schedule.moving_ids(), vec![ArmId(2)]);

    let conflicts = validate_tables(&arena, &collider, &schedule.tables, &params).unwrap();
    assert!(conflicts.is_empty());
}

#[test]
fn test_target_just_out_of_reach() {
    let mut arena = ArmArena::new();
    arena.insert(arm_at(1, 20.0, -5.0, (0.0, 150.0))).unwrap();
    let collider = collider_for(&arena, ColliderParams::default());
    let focal = FocalSurface::default();
    let params = ScheduleParams::default();

    let arm = arena.get(ArmId(1)).unwrap();
    let reach = arm.calib().length_r1 + arm.calib().length_r2;
    let (x, y) = (20.0 + reach + 0.01, -5.0);

    // The transform reports the failure rather than producing NaN angles
    let direct = arm
        .transforms()
        .global_xy_to_joint_within(x, y, &arm.targetable_range().limits, 0.0);
    assert!(matches!(direct, Err(TransformError::Unreachable { .. })));

    let mut sched = PosSchedule::new(&arena, &collider, &focal, &params, AnticolMode::Adjust);
    sched.request(MoveRequest::global_xy(ArmId(1), x, y)).unwrap();
    let schedule = sched.schedule_moves().unwrap();

    assert_eq!(schedule.state, ScheduleState::Resolved);
    assert!(schedule.tables.is_empty());
    assert_eq!(schedule.report[&ArmId(1)].reason, Some(Reason::Unreachable));
    assert!(schedule.report[&ArmId(1)].frozen);
}

#[test]
fn test_relative_request_skips_anticollision() {
    let mut arena = pair_arena();
    arena.insert(arm_at(3, 50.0, 0.0, (0.0, 180.0))).unwrap();
    let collider = collider_for(&arena, ColliderParams::default());
    let focal = FocalSurface::default();
    let params = ScheduleParams::default();

    let mut sched = PosSchedule::new(&arena, &collider, &focal, &params, AnticolMode::Freeze);
    sched.set_allow_mixed_relative(true);
    for req in colliding_requests() {
        sched.request(req).unwrap();
    }
    sched.request(MoveRequest::relative(ArmId(3), 10.0, -5.0)).unwrap();
    let schedule = sched.schedule_moves().unwrap();

    assert!(!schedule.anticollision);
    assert_eq!(schedule.state, ScheduleState::Resolved);
    assert!(schedule.frozen_ids().is_empty());
    assert_eq!(schedule.moving_ids(), vec![ArmId(1), ArmId(2), ArmId(3)]);
    assert_eq!(schedule.tables[&ArmId(3)].total_delta(), (10.0, -5.0));

    // The tables really do collide
    let conflicts = validate_tables(&arena, &collider, &schedule.tables, &params).unwrap();
    assert!(!conflicts.is_empty());
}

#[test]
fn test_adjust_falls_back_to_freeze() {
    let mut arena = ArmArena::new();
    arena.insert(arm_at(1, 0.0, 0.0, (0.0, 180.0))).unwrap();
    let collider = collider_for(&arena, block_params());
    let focal = FocalSurface::default();
    let params = ScheduleParams {
        retry_ceiling: 2,
        ..ScheduleParams::default()
    };

    // No amount of retracting or waiting gets the arm past the block, which sits on its target
    let mut sched = PosSchedule::new(&arena, &collider, &focal, &params, AnticolMode::Adjust);
    sched.request(MoveRequest::joint(ArmId(1), 0.0, 0.0)).unwrap();
    let schedule = sched.schedule_moves().unwrap();

    assert_eq!(schedule.state, ScheduleState::Resolved);
    let report = &schedule.report[&ArmId(1)];
    assert!(report.frozen);
    assert_eq!(report.adjusted_count, 2);
    assert_eq!(report.reason, Some(Reason::AdjustExhausted));
    assert!(schedule.tables[&ArmId(1)].is_motionless());
    assert_eq!(schedule.iterations, 3);
}

#[test]
fn test_adjust_dodges_neighbour() {
    let arena = pair_arena();
    let collider = collider_for(&arena, ColliderParams::default());
    let focal = FocalSurface::default();
    let params = ScheduleParams::default();

    // Arm 1 swings its extended arm through the space arm 2 is reaching into, but both end
    // positions are clear of each other.
    let mut sched = PosSchedule::new(&arena, &collider, &focal, &params, AnticolMode::Adjust);
    sched.request(MoveRequest::joint(ArmId(1), 90.0, 90.0)).unwrap();
    sched.request(MoveRequest::joint(ArmId(2), 180.0, 150.0)).unwrap();
    let schedule = sched.schedule_moves().unwrap();

    assert_eq!(schedule.state, ScheduleState::Resolved);
    let conflicts = validate_tables(&arena, &collider, &schedule.tables, &params).unwrap();
    assert!(conflicts.is_empty());

    // Every arm either reaches its target or is frozen with a reason
    for (id, report) in schedule.report.iter() {
        if report.frozen {
            assert!(report.reason.is_some());
            assert!(schedule.tables[id].is_motionless());
        }
    }
}

#[test]
fn test_start_in_collision_is_unschedulable() {
    let mut arena = ArmArena::new();
    arena.insert(arm_at(1, 0.0, 0.0, (0.0, 0.0))).unwrap();
    let collider = collider_for(&arena, block_params());
    let focal = FocalSurface::default();
    let params = ScheduleParams::default();

    let mut sched = PosSchedule::new(&arena, &collider, &focal, &params, AnticolMode::Freeze);
    sched.request(MoveRequest::joint(ArmId(1), 0.0, 10.0)).unwrap();
    let schedule = sched.schedule_moves().unwrap();

    assert_eq!(schedule.state, ScheduleState::Frozen);
    assert_eq!(sched.state(), ScheduleState::Frozen);
    assert!(!schedule.unresolved.is_empty());
    assert_eq!(schedule.report[&ArmId(1)].reason, Some(Reason::Unschedulable));
    assert!(schedule.tables[&ArmId(1)].is_motionless());
    assert!(matches!(
        schedule.ensure_resolved(),
        Err(ScheduleError::CollisionUnresolved(c)) if !c.is_empty()
    ));
}

#[test]
fn test_stationary_overlaps_do_not_block_batch() {
    let mut arena = ArmArena::new();
    arena.insert(arm_at(1, 0.0, 100.0, (0.0, 180.0))).unwrap();

    // A row of idle arms, each reaching into a long strip
    for k in 2..=11 {
        arena
            .insert(arm_at(k, 20.0 * f64::from(k), 0.0, (0.0, 0.0)))
            .unwrap();
    }
    let params = ColliderParams {
        fixed_obstacles: vec![FixedObstacleDef {
            name: String::from("strip"),
            points: vec![[3.0, -0.5], [240.0, -0.5], [240.0, 0.5], [3.0, 0.5]],
        }],
        ..ColliderParams::default()
    };
    let collider = collider_for(&arena, params);
    let focal = FocalSurface::default();
    let params = ScheduleParams::default();

    let mut sched = PosSchedule::new(&arena, &collider, &focal, &params, AnticolMode::Freeze);
    sched.request(MoveRequest::joint(ArmId(1), 90.0, 150.0)).unwrap();
    let schedule = sched.schedule_moves().unwrap();

    assert_eq!(schedule.state, ScheduleState::Resolved);
    assert!(schedule.frozen_ids().is_empty());
    assert!(!schedule.report[&ArmId(1)].frozen);
    assert_eq!(schedule.tables[&ArmId(1)].total_delta(), (90.0, -30.0));
    assert_eq!(schedule.iterations, 0);
}

#[test]
fn test_stale_geometry_rejected() {
    let mut arena = pair_arena();
    let collider = collider_for(&arena, ColliderParams::default());
    arena
        .set_calibration(
            ArmId(1),
            ArmCalibration {
                length_r2: 3.2,
                ..ArmCalibration::default()
            },
        )
        .unwrap();
    let focal = FocalSurface::default();
    let params = ScheduleParams::default();

    let mut sched = PosSchedule::new(&arena, &collider, &focal, &params, AnticolMode::Freeze);
    sched.request(MoveRequest::joint(ArmId(2), 10.0, 170.0)).unwrap();
    assert!(matches!(
        sched.schedule_moves(),
        Err(ScheduleError::Collision(CollisionError::StaleGeometry {
            id: ArmId(1),
            ..
        }))
    ));

    // Collision blind batches don't need the geometry
    let mut sched = PosSchedule::new(&arena, &collider, &focal, &params, AnticolMode::Off);
    sched.request(MoveRequest::joint(ArmId(2), 10.0, 170.0)).unwrap();
    assert!(sched.schedule_moves().is_ok());
}

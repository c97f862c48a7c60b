//! Collision validation of a set of move tables

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use pos_if::{ArmId, MoveTable};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

// Internal
use super::{Conflict, ScheduleError, ScheduleParams};
use crate::{
    arm_model::ArmArena,
    collider::{Collider, PlacedSweep, Sweep},
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Find the earliest collision of every neighbour pair and every arm against the fixed obstacles.
///
/// Conflicts whose [`Conflict::key`] is in `ignored` are dropped. The result is sorted by
/// [`Conflict::order_key`] so it does not depend on how the checks were spread across threads.
pub fn find_conflicts(
    collider: &Collider,
    sweeps: &BTreeMap<ArmId, PlacedSweep>,
    ignored: &BTreeSet<(ArmId, u8, usize)>,
) -> Vec<Conflict> {
    let mut conflicts: Vec<Conflict> = collider
        .neighbour_pairs()
        .par_iter()
        .filter_map(|(a, b)| {
            let sa = sweeps.get(a)?;
            let sb = sweeps.get(b)?;
            collider
                .first_pair_collision(sa, sb)
                .map(|(step, class)| Conflict::pair(step, *a, *b, class))
        })
        .collect();

    let placed: Vec<&PlacedSweep> = sweeps.values().collect();
    let fixed: Vec<Conflict> = placed
        .par_iter()
        .filter_map(|sweep| {
            collider
                .first_fixed_collision(sweep)
                .map(|(step, index)| {
                    let name = collider
                        .fixed_obstacles()
                        .get(index)
                        .map(|o| o.name.as_str())
                        .unwrap_or("");
                    Conflict::obstacle(step, sweep.arm_id, index, name)
                })
        })
        .collect();
    conflicts.extend(fixed);

    conflicts.retain(|c| !ignored.contains(&c.key()));
    conflicts.sort_by(|a, b| a.order_key().cmp(&b.order_key()));

    conflicts
}

/// Place the sweep of one arm following `table`, or standing still if it has none.
pub fn place_arm_sweep(
    collider: &Collider,
    arm_id: ArmId,
    start: (f64, f64),
    table: Option<&MoveTable>,
    params: &ScheduleParams,
) -> Result<PlacedSweep, ScheduleError> {
    let sweep = match table {
        Some(t) => Sweep::from_table(start, t, &params.rates, params.timestep_s)?,
        None => Sweep::stationary(arm_id, start),
    };
    Ok(collider.place_sweep(&sweep)?)
}

/// Simulate a set of move tables, starting from the arms' current poses, and list every
/// collision found.
///
/// Arms in the arena without a table stand still.
pub fn validate_tables(
    arena: &ArmArena,
    collider: &Collider,
    tables: &BTreeMap<ArmId, MoveTable>,
    params: &ScheduleParams,
) -> Result<Vec<Conflict>, ScheduleError> {
    collider.check_all_fresh(arena)?;

    let sweeps = arena
        .iter()
        .map(|arm| {
            let placed = place_arm_sweep(
                collider,
                arm.id(),
                arm.state().pose(),
                tables.get(&arm.id()),
                params,
            )?;
            Ok((arm.id(), placed))
        })
        .collect::<Result<BTreeMap<_, _>, ScheduleError>>()?;

    Ok(find_conflicts(collider, &sweeps, &BTreeSet::new()))
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        arm_model::{ArmCalibration, ArmModel, ArmState},
        collider::{ColliderParams, CollisionClass, FixedObstacleDef},
        schedule::ConflictWith,
    };
    use pos_if::MoveRow;

    fn arm_at(id: u32, x: f64, pose: (f64, f64)) -> ArmModel {
        ArmModel::new(
            ArmId(id),
            ArmCalibration {
                offset_x: x,
                ..ArmCalibration::default()
            },
            ArmState::new(pose.0, pose.1),
        )
        .unwrap()
    }

    fn setup(params: ColliderParams) -> (ArmArena, Collider) {
        let mut arena = ArmArena::new();
        arena.insert(arm_at(1, 0.0, (180.0, 180.0))).unwrap();
        arena.insert(arm_at(2, 10.4, (0.0, 180.0))).unwrap();
        let mut collider = Collider::new(params).unwrap();
        collider.refresh_all(&arena);
        (arena, collider)
    }

    #[test]
    fn test_stationary_arms_clear() {
        let (arena, collider) = setup(ColliderParams::default());
        let conflicts =
            validate_tables(&arena, &collider, &BTreeMap::new(), &ScheduleParams::default())
                .unwrap();
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_pair_conflict_found() {
        let (arena, collider) = setup(ColliderParams::default());

        let mut tables = BTreeMap::new();
        let mut t1 = MoveTable::new(ArmId(1));
        t1.push(MoveRow::cruise(-180.0, -180.0));
        tables.insert(ArmId(1), t1);
        let mut t2 = MoveTable::new(ArmId(2));
        t2.push(MoveRow::cruise(180.0, -180.0));
        tables.insert(ArmId(2), t2);

        let conflicts =
            validate_tables(&arena, &collider, &tables, &ScheduleParams::default()).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].arm, ArmId(1));
        assert!(conflicts[0].step > 0);
        match conflicts[0].with {
            ConflictWith::Arm { id, class } => {
                assert_eq!(id, ArmId(2));
                assert!(class.is_collision());
                assert_ne!(class, CollisionClass::NoOverlap);
            }
            _ => panic!("expected an arm conflict"),
        }

        // Ignoring the pair hides it
        let mut ignored = BTreeSet::new();
        ignored.insert(conflicts[0].key());
        let sweeps = arena
            .iter()
            .map(|a| {
                (
                    a.id(),
                    place_arm_sweep(
                        &collider,
                        a.id(),
                        a.state().pose(),
                        tables.get(&a.id()),
                        &ScheduleParams::default(),
                    )
                    .unwrap(),
                )
            })
            .collect();
        assert!(find_conflicts(&collider, &sweeps, &ignored).is_empty());
    }

    #[test]
    fn test_fixed_conflict_found() {
        let params = ColliderParams {
            fixed_obstacles: vec![FixedObstacleDef {
                name: String::from("block"),
                points: vec![[5.5, -0.5], [6.5, -0.5], [6.5, 0.5], [5.5, 0.5]],
            }],
            ..ColliderParams::default()
        };
        let (arena, collider) = setup(params);

        let mut tables = BTreeMap::new();
        let mut t1 = MoveTable::new(ArmId(1));
        t1.push(MoveRow::cruise(-180.0, -180.0));
        tables.insert(ArmId(1), t1);

        let conflicts =
            validate_tables(&arena, &collider, &tables, &ScheduleParams::default()).unwrap();
        assert!(conflicts.iter().any(|c| matches!(
            &c.with,
            ConflictWith::Obstacle { index: 0, name } if name == "block"
        )));
    }
}

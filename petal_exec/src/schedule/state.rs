//! Scheduler state machine

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use pos_if::{AnticolMode, ArmId, MoveRequest, MoveTable, RequestBatch};
use std::collections::{BTreeMap, BTreeSet};

// Internal
use super::*;
use crate::{
    arm_model::ArmArena,
    collider::{Collider, PlacedSweep},
    move_table::{self, MoveTableError},
    transforms::{FocalSurface, TransformError},
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Schedules one batch of move requests against a read only snapshot of the petal.
pub struct PosSchedule<'a> {
    arena: &'a ArmArena,
    collider: &'a Collider,
    focal: &'a FocalSurface,
    params: &'a ScheduleParams,

    mode: AnticolMode,
    allow_mixed_relative: bool,

    state: ScheduleState,
    requests: BTreeMap<ArmId, MoveRequest>,

    /// First structural problem found while collecting
    rejection: Option<InvalidBatch>,
}

/// Working data of the validation loop.
struct Plan {
    tables: BTreeMap<ArmId, MoveTable>,
    report: BTreeMap<ArmId, ArmReport>,

    /// Arms with a move table, excluded arms are not participants
    participants: BTreeSet<ArmId>,

    /// Final pose each participant was asked to reach
    targets: BTreeMap<ArmId, (f64, f64)>,

    frozen: BTreeSet<ArmId>,
    attempts: BTreeMap<ArmId, usize>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> PosSchedule<'a> {
    pub fn new(
        arena: &'a ArmArena,
        collider: &'a Collider,
        focal: &'a FocalSurface,
        params: &'a ScheduleParams,
        mode: AnticolMode,
    ) -> Self {
        Self {
            arena,
            collider,
            focal,
            params,
            mode,
            allow_mixed_relative: params.allow_mixed_relative,
            state: ScheduleState::Collecting,
            requests: BTreeMap::new(),
            rejection: None,
        }
    }

    /// Create a schedule collecting every request of a batch.
    ///
    /// Structural problems with the batch are reported by [`PosSchedule::schedule_moves`].
    pub fn from_batch(
        arena: &'a ArmArena,
        collider: &'a Collider,
        focal: &'a FocalSurface,
        params: &'a ScheduleParams,
        batch: &RequestBatch,
    ) -> Self {
        let mut sched = Self::new(arena, collider, focal, params, batch.mode);
        sched.allow_mixed_relative |= batch.allow_mixed_relative;

        for req in batch.requests.iter() {
            // Rejections are kept and reported when scheduling
            sched.request(*req).ok();
        }

        sched
    }

    pub fn state(&self) -> ScheduleState {
        self.state
    }

    pub fn mode(&self) -> AnticolMode {
        self.mode
    }

    /// Consciously allow relative requests to be mixed with absolute ones.
    pub fn set_allow_mixed_relative(&mut self, allow: bool) {
        self.allow_mixed_relative = allow;
    }

    pub fn n_requests(&self) -> usize {
        self.requests.len()
    }

    /// Add a request to the batch.
    ///
    /// A request for an unknown arm or a second request for the same arm rejects the whole
    /// batch.
    pub fn request(&mut self, req: MoveRequest) -> Result<(), ScheduleError> {
        if self.state != ScheduleState::Collecting {
            return Err(ScheduleError::NotCollecting(self.state));
        }

        let problem = if !self.arena.contains(req.arm_id) {
            Some(InvalidBatch::UnknownArm(req.arm_id))
        } else if self.requests.contains_key(&req.arm_id) {
            Some(InvalidBatch::DuplicateArm(req.arm_id))
        } else {
            None
        };

        if let Some(p) = problem {
            warn!("Rejecting request for {}: {:?}", req.arm_id, p);
            self.rejection.get_or_insert(p);
            return Err(ScheduleError::InvalidBatch(p));
        }

        self.requests.insert(req.arm_id, req);
        Ok(())
    }

    /// Plan and validate the collected requests.
    ///
    /// Per arm problems are recorded in the report and do not fail the batch. No arm is modified.
    pub fn schedule_moves(&mut self) -> Result<Schedule, ScheduleError> {
        if self.state != ScheduleState::Collecting {
            return Err(ScheduleError::NotCollecting(self.state));
        }
        if let Some(r) = self.rejection {
            return Err(ScheduleError::InvalidBatch(r));
        }
        self.params.validate()?;

        let n_relative = self.requests.values().filter(|r| r.is_relative()).count();
        if n_relative > 0 && n_relative < self.requests.len() && !self.allow_mixed_relative {
            return Err(ScheduleError::InvalidBatch(InvalidBatch::MixedRelative));
        }
        let anticollision = self.mode != AnticolMode::Off && n_relative == 0;
        if n_relative > 0 && self.mode != AnticolMode::Off {
            warn!(
                "{} relative requests in batch, anticollision disabled",
                n_relative
            );
        }

        // ---- PLANNING ----

        self.state = ScheduleState::Planning;
        let mut plan = self.plan();

        // ---- VALIDATING ----

        self.state = ScheduleState::Validating;
        if !anticollision {
            return Ok(self.finish(plan, anticollision, 0));
        }

        if let Err(e) = self.collider.check_all_fresh(self.arena) {
            self.state = ScheduleState::Collecting;
            return Err(e.into());
        }

        let mut sweeps = match self.initial_sweeps(&plan) {
            Ok(s) => s,
            Err(e) => {
                self.state = ScheduleState::Collecting;
                return Err(e);
            }
        };

        let max_iterations = plan.participants.len() * (self.params.retry_ceiling + 2) + 1;
        let mut ignored = BTreeSet::new();
        let mut iterations = 0;

        loop {
            let conflicts = find_conflicts(self.collider, &sweeps, &ignored);
            let first = match conflicts.first() {
                Some(c) => c.clone(),
                None => break,
            };

            let arms = first.arms();
            let loser = arms
                .iter()
                .copied()
                .find(|id| plan.participants.contains(id) && !plan.frozen.contains(id));

            let loser = match loser {
                Some(id) => id,
                None => {
                    if arms.iter().any(|id| plan.participants.contains(id)) {
                        // A frozen arm is still in collision, nothing left to change
                        return Ok(self.freeze_batch(plan, conflicts, iterations));
                    }
                    warn!(
                        "Ignoring collision between arms which are not moving: {:?}",
                        first
                    );
                    // Each key is only ignored once, so these passes are not counted
                    ignored.insert(first.key());
                    continue;
                }
            };

            iterations += 1;
            if iterations > max_iterations {
                warn!("Validation did not converge in {} passes", max_iterations);
                return Ok(self.freeze_batch(plan, conflicts, iterations));
            }

            debug!(
                "Conflict at step {} between {:?}, {} loses",
                first.step, arms, loser
            );

            match self.mode {
                AnticolMode::Adjust => self.adjust(&mut plan, loser, first),
                _ => self.freeze_arm(&mut plan, loser, first, Reason::FrozenByCollision),
            }

            let placed = match self.arm_sweep(&plan, loser) {
                Ok(p) => p,
                Err(e) => {
                    self.state = ScheduleState::Collecting;
                    return Err(e);
                }
            };
            sweeps.insert(loser, placed);
        }

        Ok(self.finish(plan, anticollision, iterations))
    }

    /// Build the direct move table of every request.
    fn plan(&self) -> Plan {
        let mut plan = Plan {
            tables: BTreeMap::new(),
            report: BTreeMap::new(),
            participants: BTreeSet::new(),
            targets: BTreeMap::new(),
            frozen: BTreeSet::new(),
            attempts: BTreeMap::new(),
        };

        for (id, req) in self.requests.iter() {
            // Requests are only collected for arms in the arena
            let arm = match self.arena.get(*id) {
                Some(a) => a,
                None => continue,
            };

            if !arm.is_enabled() {
                warn!("{} is disabled and will not move", id);
                plan.report.insert(*id, excluded(Reason::Disabled));
                continue;
            }

            let start = arm.state().pose();
            match move_table::build(arm, start, req.target, req.kind, self.focal) {
                Ok(table) => {
                    let (dt, dp) = table.total_delta();
                    plan.targets.insert(*id, (start.0 + dt, start.1 + dp));
                    plan.tables.insert(*id, table);
                    plan.participants.insert(*id);
                    plan.report.insert(*id, ArmReport::default());
                }
                Err(e) => {
                    warn!("{} excluded from batch: {}", id, e);
                    plan.report.insert(*id, excluded(reason_for(&e)));
                }
            }
        }

        debug!(
            "Planned {} of {} requests",
            plan.participants.len(),
            self.requests.len()
        );

        plan
    }

    fn initial_sweeps(&self, plan: &Plan) -> Result<BTreeMap<ArmId, PlacedSweep>, ScheduleError> {
        self.arena
            .ids()
            .map(|id| Ok((id, self.arm_sweep(plan, id)?)))
            .collect()
    }

    fn arm_sweep(&self, plan: &Plan, id: ArmId) -> Result<PlacedSweep, ScheduleError> {
        let start = self
            .arena
            .get(id)
            .map(|a| a.state().pose())
            .unwrap_or((f64::NAN, f64::NAN));
        place_arm_sweep(self.collider, id, start, plan.tables.get(&id), self.params)
    }

    fn freeze_arm(&self, plan: &mut Plan, id: ArmId, conflict: Conflict, reason: Reason) {
        warn!("{} frozen ({:?})", id, reason);

        plan.tables.insert(id, frozen_table(id, reason));
        plan.frozen.insert(id);

        let report = plan.report.entry(id).or_default();
        report.frozen = true;
        report.reason = Some(reason);
        report.conflict = Some(conflict);
    }

    /// Replace the arm's table with a retract-rotate-extend table, or freeze it if the retry
    /// ceiling has been reached.
    fn adjust(&self, plan: &mut Plan, id: ArmId, conflict: Conflict) {
        let attempt = plan.attempts.get(&id).copied().unwrap_or(0) + 1;
        let (arm, end) = match (self.arena.get(id), plan.targets.get(&id)) {
            (Some(a), Some(e)) if attempt <= self.params.retry_ceiling => (a, *e),
            _ => {
                self.freeze_arm(plan, id, conflict, Reason::AdjustExhausted);
                return;
            }
        };
        plan.attempts.insert(id, attempt);

        let phi_safe = arm
            .targetable_range()
            .limits
            .clamp_phi(self.params.phi_safe_deg);
        let mut table = move_table::retract_rotate_extend(id, arm.state().pose(), end, phi_safe);

        if attempt >= 2 {
            let longest_neighbour_s = self
                .collider
                .neighbours(id)
                .iter()
                .filter_map(|n| plan.tables.get(n))
                .map(|t| OrderedFloat(t.total_time(&self.params.rates)))
                .max()
                .map_or(0.0, |t| t.into_inner());
            let delay_s = (attempt - 1) as f64
                * (longest_neighbour_s + self.params.clearance_margin_s());
            move_table::delay_extension(&mut table, delay_s);
        }

        debug!("{} adjusted (attempt {}): {}", id, attempt, table.note);
        plan.tables.insert(id, table);

        let report = plan.report.entry(id).or_default();
        report.adjusted_count = attempt;
        report.reason = Some(Reason::Adjusted);
        report.conflict = Some(conflict);
    }

    /// Hold every participant and end the batch as unschedulable.
    fn freeze_batch(
        &mut self,
        mut plan: Plan,
        unresolved: Vec<Conflict>,
        iterations: usize,
    ) -> Schedule {
        warn!(
            "Batch unschedulable, holding all {} arms ({} unresolved conflicts)",
            plan.participants.len(),
            unresolved.len()
        );

        for id in plan.participants.iter() {
            plan.tables.insert(*id, frozen_table(*id, Reason::Unschedulable));
            let report = plan.report.entry(*id).or_default();
            report.frozen = true;
            report.reason = Some(Reason::Unschedulable);
        }

        self.state = ScheduleState::Frozen;
        Schedule {
            state: ScheduleState::Frozen,
            mode: self.mode,
            anticollision: true,
            tables: plan.tables,
            report: plan.report,
            unresolved,
            iterations,
        }
    }

    fn finish(&mut self, mut plan: Plan, anticollision: bool, iterations: usize) -> Schedule {
        self.state = ScheduleState::Resolved;

        // Automatic moves happen at the target and are never part of the sweeps
        for (id, table) in plan.tables.iter_mut() {
            if let Some(arm) = self.arena.get(*id) {
                move_table::add_auto_moves(table, arm);
            }
        }

        let schedule = Schedule {
            state: ScheduleState::Resolved,
            mode: self.mode,
            anticollision,
            tables: plan.tables,
            report: plan.report,
            unresolved: Vec::new(),
            iterations,
        };

        info!(
            "Schedule resolved: {} tables, {} frozen, {} adjusted, {} passes",
            schedule.tables.len(),
            schedule.frozen_ids().len(),
            schedule.adjusted_ids().len(),
            iterations
        );

        schedule
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn excluded(reason: Reason) -> ArmReport {
    ArmReport {
        frozen: true,
        reason: Some(reason),
        ..ArmReport::default()
    }
}

fn frozen_table(id: ArmId, reason: Reason) -> MoveTable {
    let mut table = MoveTable::frozen(id, 0.0);
    table.append_note(&format!("frozen: {:?}", reason));
    table
}

fn reason_for(err: &MoveTableError) -> Reason {
    match err {
        MoveTableError::Transform(TransformError::OutOfRange { .. }) => Reason::OutOfRange,
        MoveTableError::Transform(_) => Reason::Unreachable,
        MoveTableError::InvalidTable(_) => Reason::InvalidTarget,
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        arm_model::{ArmCalibration, ArmModel, ArmState, AutoMoves},
        collider::ColliderParams,
    };
    use pos_if::SpeedMode;

    fn arena() -> ArmArena {
        let mut arena = ArmArena::new();
        for (id, x) in [(1, 0.0), (2, 10.4)].iter() {
            arena
                .insert(
                    ArmModel::new(
                        ArmId(*id),
                        ArmCalibration {
                            offset_x: *x,
                            ..ArmCalibration::default()
                        },
                        ArmState::new(0.0, 180.0),
                    )
                    .unwrap(),
                )
                .unwrap();
        }
        arena
    }

    fn collider(arena: &ArmArena) -> Collider {
        let mut collider = Collider::new(ColliderParams::default()).unwrap();
        collider.refresh_all(arena);
        collider
    }

    #[test]
    fn test_rejections() {
        let arena = arena();
        let collider = collider(&arena);
        let focal = FocalSurface::default();
        let params = ScheduleParams::default();

        let mut sched = PosSchedule::new(&arena, &collider, &focal, &params, AnticolMode::Adjust);
        assert!(sched.request(MoveRequest::joint(ArmId(1), 0.0, 150.0)).is_ok());
        assert_eq!(
            sched.request(MoveRequest::joint(ArmId(1), 10.0, 150.0)),
            Err(ScheduleError::InvalidBatch(InvalidBatch::DuplicateArm(ArmId(1))))
        );
        assert_eq!(
            sched.schedule_moves(),
            Err(ScheduleError::InvalidBatch(InvalidBatch::DuplicateArm(ArmId(1))))
        );
        assert_eq!(sched.state(), ScheduleState::Collecting);

        let mut sched = PosSchedule::new(&arena, &collider, &focal, &params, AnticolMode::Adjust);
        assert!(sched.request(MoveRequest::joint(ArmId(9), 0.0, 150.0)).is_err());
        assert!(sched.schedule_moves().is_err());
    }

    #[test]
    fn test_mixed_relative() {
        let arena = arena();
        let collider = collider(&arena);
        let focal = FocalSurface::default();
        let params = ScheduleParams::default();

        let mut sched = PosSchedule::new(&arena, &collider, &focal, &params, AnticolMode::Freeze);
        sched.request(MoveRequest::joint(ArmId(1), 0.0, 150.0)).unwrap();
        sched.request(MoveRequest::relative(ArmId(2), 5.0, 0.0)).unwrap();
        assert_eq!(
            sched.schedule_moves(),
            Err(ScheduleError::InvalidBatch(InvalidBatch::MixedRelative))
        );

        sched.set_allow_mixed_relative(true);
        let schedule = sched.schedule_moves().unwrap();
        assert!(!schedule.anticollision);
        assert_eq!(schedule.state, ScheduleState::Resolved);
        assert_eq!(sched.state(), ScheduleState::Resolved);

        // Terminal
        assert_eq!(
            sched.schedule_moves(),
            Err(ScheduleError::NotCollecting(ScheduleState::Resolved))
        );
    }

    #[test]
    fn test_excluded_arms() {
        let mut arena = arena();
        let calib = ArmCalibration {
            offset_x: 10.4,
            enabled: false,
            ..ArmCalibration::default()
        };
        arena.set_calibration(ArmId(2), calib).unwrap();
        let collider = collider(&arena);
        let focal = FocalSurface::default();
        let params = ScheduleParams::default();

        let mut sched = PosSchedule::new(&arena, &collider, &focal, &params, AnticolMode::Freeze);
        sched.request(MoveRequest::global_xy(ArmId(1), 100.0, 0.0)).unwrap();
        sched.request(MoveRequest::joint(ArmId(2), 0.0, 150.0)).unwrap();
        let schedule = sched.schedule_moves().unwrap();

        assert!(schedule.tables.is_empty());
        assert_eq!(schedule.report[&ArmId(1)].reason, Some(Reason::Unreachable));
        assert_eq!(schedule.report[&ArmId(2)].reason, Some(Reason::Disabled));
        assert_eq!(schedule.frozen_ids(), vec![ArmId(1), ArmId(2)]);
    }

    #[test]
    fn test_out_of_range_excluded() {
        let arena = arena();
        let collider = collider(&arena);
        let focal = FocalSurface::default();
        let params = ScheduleParams::default();

        let mut sched = PosSchedule::new(&arena, &collider, &focal, &params, AnticolMode::Adjust);
        sched.request(MoveRequest::joint(ArmId(1), 250.0, 150.0)).unwrap();
        sched.request(MoveRequest::joint(ArmId(2), 0.0, 150.0)).unwrap();
        let schedule = sched.schedule_moves().unwrap();

        assert!(schedule.is_resolved());
        assert_eq!(schedule.report[&ArmId(1)].reason, Some(Reason::OutOfRange));
        assert!(schedule.report[&ArmId(1)].frozen);
        assert!(schedule.table(ArmId(1)).is_none());

        assert_eq!(schedule.frozen_ids(), vec![ArmId(1)]);
        assert_eq!(schedule.moving_ids(), vec![ArmId(2)]);
        assert_eq!(schedule.tables[&ArmId(2)].total_delta(), (0.0, -30.0));
    }

    #[test]
    fn test_auto_moves_added_once_resolved() {
        let mut arena = arena();
        let calib = ArmCalibration {
            auto_moves: AutoMoves {
                antibacklash: true,
                ..AutoMoves::default()
            },
            ..ArmCalibration::default()
        };
        arena.set_calibration(ArmId(1), calib).unwrap();
        let collider = collider(&arena);
        let focal = FocalSurface::default();
        let params = ScheduleParams::default();

        let mut sched = PosSchedule::new(&arena, &collider, &focal, &params, AnticolMode::Freeze);
        sched.request(MoveRequest::joint(ArmId(1), 180.0, 150.0)).unwrap();
        sched.request(MoveRequest::joint(ArmId(2), 0.0, 150.0)).unwrap();
        let schedule = sched.schedule_moves().unwrap();

        assert!(schedule.is_resolved());
        let table = &schedule.tables[&ArmId(1)];
        assert_eq!(table.auto_rows.len(), 2);
        assert_eq!(table.auto_rows[1].speed_mode_theta, SpeedMode::Creep);
        assert_eq!(table.total_delta(), (180.0, -30.0));
        assert!(schedule.tables[&ArmId(2)].auto_rows.is_empty());
    }

    #[test]
    fn test_clear_moves_untouched() {
        let arena = arena();
        let collider = collider(&arena);
        let focal = FocalSurface::default();
        let params = ScheduleParams::default();

        let mut sched = PosSchedule::new(&arena, &collider, &focal, &params, AnticolMode::Adjust);
        sched.request(MoveRequest::joint(ArmId(1), 180.0, 150.0)).unwrap();
        sched.request(MoveRequest::joint(ArmId(2), 0.0, 150.0)).unwrap();
        let schedule = sched.schedule_moves().unwrap();

        assert!(schedule.is_resolved());
        assert!(schedule.anticollision);
        assert!(schedule.frozen_ids().is_empty());
        assert_eq!(schedule.tables[&ArmId(1)].n_rows(), 1);
        assert_eq!(schedule.tables[&ArmId(1)].total_delta(), (180.0, -30.0));
    }
}

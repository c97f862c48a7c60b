//! Implementations for the Petal state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use pos_if::{ArmId, RequestBatch};
use serde::Serialize;
use util::{module::State, params, session::Session};

// Internal
use super::*;
use crate::{
    arm_model::{ArmArena, ArmCalibration, ArmModel, CalibStore},
    collider::{Collider, ColliderParams},
    schedule::{PosSchedule, Schedule, ScheduleParams},
    transforms::FocalSurface,
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Petal coordinator state
#[derive(Default)]
pub struct Petal {
    arena: ArmArena,

    /// Only `None` before initialisation
    collider: Option<Collider>,

    sched_params: ScheduleParams,
    focal: FocalSurface,
}

/// Status report for a planning cycle.
#[derive(Clone, Copy, Default, Serialize, Debug, PartialEq)]
pub struct StatusReport {
    pub n_requests: usize,
    pub n_tables: usize,
    pub n_moving: usize,
    pub n_frozen: usize,
    pub n_adjusted: usize,
    pub anticollision: bool,
    pub resolved: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Petal {
    /// Build a petal from already loaded parameters.
    pub fn from_params(
        petal: &PetalParams,
        collider: ColliderParams,
        sched_params: ScheduleParams,
        focal: FocalSurface,
    ) -> Result<Self, PetalError> {
        focal.validate()?;
        sched_params.validate()?;

        let mut arena = ArmArena::new();
        for def in petal.arms.iter() {
            arena.insert(ArmModel::new(def.id, def.calibration.clone(), def.state)?)?;
        }

        let mut collider = Collider::new(collider)?;
        collider.refresh_all(&arena);

        info!("Petal built with {} arms", arena.len());

        Ok(Self {
            arena,
            collider: Some(collider),
            sched_params,
            focal,
        })
    }

    pub fn arena(&self) -> &ArmArena {
        &self.arena
    }

    pub fn collider(&self) -> Option<&Collider> {
        self.collider.as_ref()
    }

    pub fn sched_params(&self) -> &ScheduleParams {
        &self.sched_params
    }

    pub fn focal(&self) -> &FocalSurface {
        &self.focal
    }

    /// Plan a batch of requests. No arm is modified.
    pub fn plan(&self, batch: &RequestBatch) -> Result<Schedule, PetalError> {
        let collider = self.collider.as_ref().ok_or(PetalError::NotInitialised)?;

        let mut sched =
            PosSchedule::from_batch(&self.arena, collider, &self.focal, &self.sched_params, batch);
        Ok(sched.schedule_moves()?)
    }

    /// Apply a resolved schedule to the arms, returning the number of arms updated.
    pub fn commit(&mut self, schedule: &Schedule) -> Result<usize, PetalError> {
        schedule.ensure_resolved()?;
        Ok(self.arena.apply_schedule(schedule.tables.values())?)
    }

    /// Change an arm's calibration.
    ///
    /// The arm's collision geometry is stale until [`Petal::refresh`] is called, and batches
    /// checked for collisions will fail until then.
    pub fn set_calibration(&mut self, id: ArmId, calib: ArmCalibration) -> Result<(), PetalError> {
        self.arena.set_calibration(id, calib)?;
        debug!("{} calibration changed, geometry now stale", id);
        Ok(())
    }

    /// Rebuild the collision geometry of one arm.
    pub fn refresh(&mut self, id: ArmId) -> Result<(), PetalError> {
        let arm = self.arena.get(id).ok_or(ArmError::UnknownArm(id))?;
        self.collider
            .as_mut()
            .ok_or(PetalError::NotInitialised)?
            .refresh(arm);
        Ok(())
    }

    /// Rebuild the collision geometry of every arm.
    pub fn refresh_all(&mut self) -> Result<(), PetalError> {
        self.collider
            .as_mut()
            .ok_or(PetalError::NotInitialised)?
            .refresh_all(&self.arena);
        Ok(())
    }

    /// Add an arm read from a calibration store and build its geometry.
    pub fn load_arm<S>(&mut self, id: ArmId, store: &S) -> Result<(), PetalError>
    where
        S: CalibStore + ?Sized,
    {
        self.arena.insert(ArmModel::read_from(id, store)?)?;
        self.refresh(id)
    }

    /// Write an arm's calibration and state to a calibration store.
    pub fn store_arm<S>(&self, id: ArmId, store: &mut S) -> Result<(), PetalError>
    where
        S: CalibStore + ?Sized,
    {
        self.arena
            .get(id)
            .ok_or(ArmError::UnknownArm(id))?
            .write_to(store)?;
        Ok(())
    }
}

impl State for Petal {
    type InitData = PetalFiles;
    type InitError = PetalError;

    type InputData = RequestBatch;
    type OutputData = Schedule;
    type StatusReport = StatusReport;
    type ProcError = PetalError;

    /// Initialise the petal from its parameter files.
    fn init(
        &mut self,
        init_data: Self::InitData,
        session: Option<&Session>,
    ) -> Result<(), Self::InitError> {
        let petal: PetalParams = params::load(init_data.petal)?;
        let collider: ColliderParams = params::load(init_data.collider)?;
        let sched_params: ScheduleParams = params::load(init_data.schedule)?;
        let focal: FocalSurface = params::load(init_data.focal_surface)?;

        *self = Self::from_params(&petal, collider, sched_params, focal)?;

        if let Some(s) = session {
            s.save("petal.json", petal);
        }

        Ok(())
    }

    /// Plan one batch of requests.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let schedule = self.plan(input_data)?;

        let report = StatusReport {
            n_requests: input_data.requests.len(),
            n_tables: schedule.tables.len(),
            n_moving: schedule.moving_ids().len(),
            n_frozen: schedule.frozen_ids().len(),
            n_adjusted: schedule.adjusted_ids().len(),
            anticollision: schedule.anticollision,
            resolved: schedule.is_resolved(),
        };

        Ok((schedule, report))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

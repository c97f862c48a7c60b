//! Collider state: cached arm geometry, neighbours and fixed obstacles

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use nalgebra::Point2;
use pos_if::ArmId;
use std::collections::BTreeMap;

// Internal
use super::*;
use crate::arm_model::{ArmArena, ArmModel};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// A named static keepout in the global frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedObstacle {
    pub name: String,
    pub polygon: Polygon,
}

/// Collision geometry for every arm on the petal.
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    params: ColliderParams,

    keepout_theta: Polygon,
    pivot_theta: Point2<f64>,
    keepout_phi: Polygon,
    pivot_phi: Point2<f64>,

    fixed: Vec<FixedObstacle>,

    /// Geometry of each refreshed arm
    arms: BTreeMap<ArmId, ArmGeometry>,

    /// Sorted neighbours of each arm
    neighbours: BTreeMap<ArmId, Vec<ArmId>>,

    /// Neighbour pairs `(a, b)` with `a < b`, sorted
    pairs: Vec<(ArmId, ArmId)>,

    /// Indices of the fixed obstacles within reach of each arm
    fixed_near: BTreeMap<ArmId, Vec<usize>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Collider {
    /// Create a new collider with no arms.
    pub fn new(params: ColliderParams) -> Result<Self, CollisionError> {
        if !(params.neighbor_radius_mm.is_finite() && params.neighbor_radius_mm > 0.0) {
            return Err(CollisionError::InvalidParams(format!(
                "neighbor_radius_mm must be positive, got {}",
                params.neighbor_radius_mm
            )));
        }

        let keepout_theta = checked_polygon("keepout_theta", &params.keepout_theta.points)?;
        let keepout_phi = checked_polygon("keepout_phi", &params.keepout_phi.points)?;

        let fixed = params
            .fixed_obstacles
            .iter()
            .map(|def| {
                Ok(FixedObstacle {
                    name: def.name.clone(),
                    polygon: checked_polygon(&def.name, &def.points)?,
                })
            })
            .collect::<Result<Vec<_>, CollisionError>>()?;

        Ok(Self {
            pivot_theta: Point2::new(params.keepout_theta.pivot[0], params.keepout_theta.pivot[1]),
            pivot_phi: Point2::new(params.keepout_phi.pivot[0], params.keepout_phi.pivot[1]),
            keepout_theta,
            keepout_phi,
            fixed,
            params,
            arms: BTreeMap::new(),
            neighbours: BTreeMap::new(),
            pairs: Vec::new(),
            fixed_near: BTreeMap::new(),
        })
    }

    pub fn params(&self) -> &ColliderParams {
        &self.params
    }

    /// Rebuild one arm's geometry from its current calibration.
    pub fn refresh(&mut self, arm: &ArmModel) {
        let geom = self.build_geometry(arm);
        self.arms.insert(arm.id(), geom);
        self.rebuild_adjacency();
    }

    /// Rebuild the geometry of every arm in the arena, forgetting any arm no longer in it.
    pub fn refresh_all(&mut self, arena: &ArmArena) {
        self.arms = arena
            .iter()
            .map(|arm| (arm.id(), self.build_geometry(arm)))
            .collect();
        self.rebuild_adjacency();
    }

    /// Check an arm's cached geometry matches its calibration.
    pub fn check_fresh(&self, arm: &ArmModel) -> Result<(), CollisionError> {
        let cached = self.arms.get(&arm.id()).map(|g| g.calib_version);
        if cached == Some(arm.calib_version()) {
            Ok(())
        } else {
            Err(CollisionError::StaleGeometry {
                id: arm.id(),
                cached,
                current: arm.calib_version(),
            })
        }
    }

    /// Check the geometry of every arm in the arena is fresh.
    pub fn check_all_fresh(&self, arena: &ArmArena) -> Result<(), CollisionError> {
        arena.iter().try_for_each(|arm| self.check_fresh(arm))
    }

    /// The cached geometry of an arm.
    pub fn geometry(&self, id: ArmId) -> Option<&ArmGeometry> {
        self.arms.get(&id)
    }

    /// Neighbours of an arm, sorted by identifier.
    pub fn neighbours(&self, id: ArmId) -> &[ArmId] {
        self.neighbours.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// All neighbour pairs `(a, b)` with `a < b`, sorted.
    pub fn neighbour_pairs(&self) -> &[(ArmId, ArmId)] {
        &self.pairs
    }

    pub fn fixed_obstacles(&self) -> &[FixedObstacle] {
        &self.fixed
    }

    /// Indices into [`Collider::fixed_obstacles`] of the obstacles an arm can reach.
    pub fn fixed_near(&self, id: ArmId) -> &[usize] {
        self.fixed_near.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Place an arm's keepouts at a pose.
    pub fn place(&self, arm: &ArmModel, pose: (f64, f64)) -> Result<PlacedArm, CollisionError> {
        self.check_fresh(arm)?;
        self.place_id(arm.id(), pose)
    }

    /// Classify the overlap of two arms at the given poses.
    pub fn pairwise_collision(
        &self,
        arm_a: &ArmModel,
        pose_a: (f64, f64),
        arm_b: &ArmModel,
        pose_b: (f64, f64),
    ) -> Result<CollisionClass, CollisionError> {
        let a = self.place(arm_a, pose_a)?;
        let b = self.place(arm_b, pose_b)?;
        Ok(a.classify(&b))
    }

    /// True if the arm at the given pose overlaps any fixed obstacle within its reach.
    pub fn fixed_collision(
        &self,
        arm: &ArmModel,
        pose: (f64, f64),
    ) -> Result<bool, CollisionError> {
        let placed = self.place(arm, pose)?;
        Ok(self.fixed_hit(arm.id(), &placed).is_some())
    }

    /// Sample a sweep into placed keepouts.
    ///
    /// The caller is responsible for checking the arm's geometry is fresh.
    pub fn place_sweep(&self, sweep: &Sweep) -> Result<PlacedSweep, CollisionError> {
        let geom = self.geometry_or_stale(sweep.arm_id)?;
        Ok(PlacedSweep {
            arm_id: sweep.arm_id,
            placed: sweep.poses().iter().map(|p| geom.place(*p)).collect(),
        })
    }

    /// The earliest timestep at which two placed sweeps collide.
    pub fn first_pair_collision(
        &self,
        a: &PlacedSweep,
        b: &PlacedSweep,
    ) -> Option<(usize, CollisionClass)> {
        let n_steps = a.len().max(b.len());
        for step in 0..n_steps {
            let class = a.at(step).classify(b.at(step));
            if class.is_collision() {
                trace!(
                    "{} and {} collide at step {} ({:?})",
                    a.arm_id,
                    b.arm_id,
                    step,
                    class
                );
                return Some((step, class));
            }
        }
        None
    }

    /// The earliest timestep at which a placed sweep hits a fixed obstacle, with the obstacle's
    /// index.
    pub fn first_fixed_collision(&self, sweep: &PlacedSweep) -> Option<(usize, usize)> {
        if self.fixed_near(sweep.arm_id).is_empty() {
            return None;
        }
        (0..sweep.len()).find_map(|step| {
            self.fixed_hit(sweep.arm_id, sweep.at(step))
                .map(|idx| (step, idx))
        })
    }

    fn fixed_hit(&self, id: ArmId, placed: &PlacedArm) -> Option<usize> {
        self.fixed_near(id)
            .iter()
            .copied()
            .find(|&i| placed.hits(&self.fixed[i].polygon))
    }

    fn place_id(&self, id: ArmId, pose: (f64, f64)) -> Result<PlacedArm, CollisionError> {
        Ok(self.geometry_or_stale(id)?.place(pose))
    }

    fn geometry_or_stale(&self, id: ArmId) -> Result<&ArmGeometry, CollisionError> {
        self.arms
            .get(&id)
            .ok_or(CollisionError::StaleGeometry {
                id,
                cached: None,
                current: 0,
            })
    }

    fn build_geometry(&self, arm: &ArmModel) -> ArmGeometry {
        ArmGeometry::build(
            arm,
            &self.keepout_theta,
            self.pivot_theta,
            &self.keepout_phi,
            self.pivot_phi,
        )
    }

    fn rebuild_adjacency(&mut self) {
        let radius = self.params.neighbor_radius_mm;

        self.neighbours = self.arms.keys().map(|id| (*id, Vec::new())).collect();
        self.pairs.clear();

        let arms: Vec<&ArmGeometry> = self.arms.values().collect();
        for (i, a) in arms.iter().enumerate() {
            for b in arms.iter().skip(i + 1) {
                if (a.center - b.center).norm() <= radius {
                    self.pairs.push((a.id, b.id));
                    if let Some(n) = self.neighbours.get_mut(&a.id) {
                        n.push(b.id);
                    }
                    if let Some(n) = self.neighbours.get_mut(&b.id) {
                        n.push(a.id);
                    }
                }
            }
        }
        for n in self.neighbours.values_mut() {
            n.sort();
        }

        let fixed = &self.fixed;
        self.fixed_near = arms
            .iter()
            .map(|g| {
                let near = fixed
                    .iter()
                    .enumerate()
                    .filter(|(_, o)| o.polygon.distance_to_point(&g.center) <= g.reach_mm)
                    .map(|(i, _)| i)
                    .collect();
                (g.id, near)
            })
            .collect();

        debug!(
            "Collider adjacency rebuilt: {} arms, {} neighbour pairs",
            arms.len(),
            self.pairs.len()
        );
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn checked_polygon(name: &str, points: &[[f64; 2]]) -> Result<Polygon, CollisionError> {
    if points.len() < 3 {
        return Err(CollisionError::InvalidPolygon(
            String::from(name),
            String::from("needs at least three points"),
        ));
    }
    if points.iter().flatten().any(|v| !v.is_finite()) {
        return Err(CollisionError::InvalidPolygon(
            String::from(name),
            String::from("contains a non-finite coordinate"),
        ));
    }
    Ok(Polygon::from_xy(points))
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

//! Arena of all arms on a petal

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::info;
use pos_if::MoveTable;
use std::collections::BTreeMap;

// Internal
use super::*;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// All arm models, indexed and iterated in arm identifier order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArmArena {
    arms: BTreeMap<ArmId, ArmModel>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArmArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an arm to the arena.
    pub fn insert(&mut self, arm: ArmModel) -> Result<(), ArmError> {
        if self.arms.contains_key(&arm.id()) {
            return Err(ArmError::DuplicateArm(arm.id()));
        }
        self.arms.insert(arm.id(), arm);
        Ok(())
    }

    pub fn get(&self, id: ArmId) -> Option<&ArmModel> {
        self.arms.get(&id)
    }

    pub fn contains(&self, id: ArmId) -> bool {
        self.arms.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.arms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arms.is_empty()
    }

    /// Iterate over all arms in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &ArmModel> {
        self.arms.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = ArmId> + '_ {
        self.arms.keys().copied()
    }

    /// Replace the calibration of an arm.
    pub fn set_calibration(&mut self, id: ArmId, calib: ArmCalibration) -> Result<(), ArmError> {
        self.arms
            .get_mut(&id)
            .ok_or(ArmError::UnknownArm(id))?
            .set_calibration(calib)
    }

    /// Apply the net motion of each move table to its arm.
    ///
    /// Every table is checked before any arm is changed, so either all tables are applied or none
    /// are.
    pub fn apply_schedule<'a, I>(&mut self, tables: I) -> Result<usize, ArmError>
    where
        I: IntoIterator<Item = &'a MoveTable>,
    {
        let mut updates = Vec::new();

        for table in tables {
            let arm = self
                .arms
                .get(&table.arm_id)
                .ok_or(ArmError::UnknownArm(table.arm_id))?;

            let (dt, dp) = table.total_delta();
            arm.state_after(dt, dp)?;
            updates.push((table.arm_id, dt, dp));
        }

        // One arm at a time, all already checked
        for (id, dt, dp) in updates.iter() {
            if let Some(arm) = self.arms.get_mut(id) {
                arm.apply(*dt, *dp)?;
            }
        }

        info!("Applied move tables to {} arms", updates.len());

        Ok(updates.len())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use pos_if::MoveRow;

    fn arena() -> ArmArena {
        let mut arena = ArmArena::new();
        for i in 0..3 {
            arena
                .insert(
                    ArmModel::new(
                        ArmId(i),
                        ArmCalibration::default(),
                        ArmState::new(0.0, 150.0),
                    )
                    .unwrap(),
                )
                .unwrap();
        }
        arena
    }

    #[test]
    fn test_duplicate_insert() {
        let mut arena = arena();
        let dup = ArmModel::new(
            ArmId(1),
            ArmCalibration::default(),
            ArmState::new(0.0, 150.0),
        )
        .unwrap();

        assert!(matches!(
            arena.insert(dup),
            Err(ArmError::DuplicateArm(ArmId(1)))
        ));
        assert_eq!(arena.ids().collect::<Vec<_>>(), vec![ArmId(0), ArmId(1), ArmId(2)]);
    }

    #[test]
    fn test_apply_schedule_all_or_nothing() {
        let mut arena = arena();

        let mut good = MoveTable::new(ArmId(0));
        good.push(MoveRow::cruise(10.0, -10.0));
        let mut bad = MoveTable::new(ArmId(2));
        bad.push(MoveRow::cruise(0.0, 90.0));

        assert!(arena.apply_schedule(vec![&good, &bad]).is_err());
        assert_eq!(arena.get(ArmId(0)).unwrap().state().pose(), (0.0, 150.0));

        assert_eq!(arena.apply_schedule(vec![&good]).unwrap(), 1);
        assert_eq!(arena.get(ArmId(0)).unwrap().state().pose(), (10.0, 140.0));
    }
}

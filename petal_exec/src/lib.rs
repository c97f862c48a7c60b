//! # Petal library.
//!
//! Collision free move scheduling for the theta/phi fibre positioners of one petal.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Arm models - calibration, joint state and the arena storing them
pub mod arm_model;

/// Collider - keepout polygons, neighbours and collision detection
pub mod collider;

/// Small 2D rigid transform helpers
pub mod geometry;

/// Move table construction - direct and retract-rotate-extend tables
pub mod move_table;

/// Petal coordinator - owns the arms and applies resolved schedules
pub mod petal;

/// Scheduler - plans batches of requests into collision free move tables
pub mod schedule;

/// Coordinate transforms between joint, local, global and focal surface frames
pub mod transforms;

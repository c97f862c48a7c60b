//! # Positioner interface crate.
//!
//! Provides the data structures which cross the boundaries of the move scheduling core: the move
//! requests given to it by client code and the move tables it hands to the driver layer.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Move requests and anticollision modes, sent to the scheduler by client code
pub mod request;

/// Move tables, sent by the scheduler to the driver layer
pub mod table;

// ---------------------------------------------------------------------------
// REEXPORTS
// ---------------------------------------------------------------------------

pub use request::{AnticolMode, ArmId, CommandKind, MoveRequest, RequestBatch, RequestCmd};
pub use table::{MoveRow, MoveTable, SpeedMode, SpeedRates, TableError};

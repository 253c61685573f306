//! The trading engine: event counters and the position manager.

pub mod counters;
pub mod manager;

pub use counters::EventCounters;
pub use manager::{ClosedCycle, EngineError, ExitReason, PositionManager};

//! Signal generation — maps indicator state to a discrete trading signal.
//!
//! The generator is a pure function of the previous and latest snapshot plus
//! static thresholds. It is position-agnostic: it emits what the market did,
//! and the position manager decides what is actionable for the current side.

pub mod trend_cross;

pub use trend_cross::{SignalConfig, TrendCrossGenerator};

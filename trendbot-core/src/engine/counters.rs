//! Event counters — locally-recovered errors stay observable.

use serde::{Deserialize, Serialize};

/// Counts of notable engine events. Recovered errors never halt the engine,
/// but every one of them lands here (and in the log) so a silent strategy
/// and a silently-failing strategy look different.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounters {
    pub entries: u64,
    pub adds: u64,
    pub stop_exits: u64,
    pub take_profit_exits: u64,
    pub signal_exits: u64,
    /// Entries skipped because sizing failed or the gateway rejected them.
    pub entries_skipped: u64,
    /// Adds skipped: risk budget, pyramid cap, retrace window, sizing errors.
    pub adds_skipped: u64,
    /// Exit submissions that needed at least one retry.
    pub exit_retries: u64,
    /// Signals ignored as irrelevant to the current side.
    pub signals_ignored: u64,
}

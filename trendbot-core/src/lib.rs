//! TrendBot Core — the single-asset trading engine.
//!
//! This crate contains the heart of the bot:
//! - Domain types (bars, indicator snapshots, signals, orders, fills,
//!   positions, instruments, account state)
//! - Stateless trend-following signal generation (EMA cross + RSI filter)
//! - Risk-based position sizing with exchange step/notional constraints
//! - The position manager state machine (entries, pyramid adds, trailing
//!   stops, exits) with its ratchet invariant
//! - The execution gateway seam and the paper trading simulator
//!
//! The runner crate wires these together against a snapshot feed; nothing in
//! here performs I/O beyond the gateway trait.

pub mod config;
pub mod domain;
pub mod engine;
pub mod gateway;
pub mod risk;
pub mod signals;

//! EMA crossover signal with RSI gating and optional MACD confirmation.
//!
//! Entry rules:
//! - EnterLong when ema_fast crosses above ema_slow AND rsi is below the
//!   overbought threshold (don't chase an exhausted move).
//! - EnterShort when ema_fast crosses below ema_slow AND rsi is above the
//!   oversold threshold.
//!
//! Exit rules, in precedence order (EMA cross beats RSI exhaustion):
//! - A cross that fails its entry gate still exits the opposite side
//!   (a death cross with oversold RSI emits ExitLong, not EnterShort).
//! - With no cross, RSI falling back through the long exhaustion level emits
//!   ExitLong; rising back through the short exhaustion level emits ExitShort.
//!
//! Everything else is Hold. Incomplete (warmup/NaN) snapshots are Hold.

use crate::domain::{IndicatorSnapshot, Signal, SignalKind};
use serde::{Deserialize, Serialize};

/// Static thresholds for the trend-cross generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Entries long are blocked when rsi >= this.
    pub rsi_overbought: f64,
    /// Entries short are blocked when rsi <= this.
    pub rsi_oversold: f64,
    /// ExitLong fires when rsi crosses down through this level.
    pub rsi_long_exhaustion: f64,
    /// ExitShort fires when rsi crosses up through this level.
    pub rsi_short_exhaustion: f64,
    /// Require the MACD histogram to be moving in the trade direction.
    pub macd_confirmation: bool,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            rsi_long_exhaustion: 70.0,
            rsi_short_exhaustion: 30.0,
            macd_confirmation: false,
        }
    }
}

/// Stateless trend-cross signal generator.
#[derive(Debug, Clone)]
pub struct TrendCrossGenerator {
    config: SignalConfig,
}

impl TrendCrossGenerator {
    pub fn new(config: SignalConfig) -> Self {
        assert!(
            config.rsi_oversold < config.rsi_overbought,
            "rsi_oversold must be below rsi_overbought"
        );
        Self { config }
    }

    /// Evaluate one bar: exactly one signal per (prev, curr) pair.
    pub fn evaluate(&self, prev: &IndicatorSnapshot, curr: &IndicatorSnapshot) -> Signal {
        let hold = Signal::hold(curr.timestamp, curr.close);

        if !prev.is_complete() || !curr.is_complete() {
            return hold;
        }

        let crossed_up = prev.ema_fast <= prev.ema_slow && curr.ema_fast > curr.ema_slow;
        let crossed_down = prev.ema_fast >= prev.ema_slow && curr.ema_fast < curr.ema_slow;

        let macd_bull_ok = !self.config.macd_confirmation || curr.macd_hist() > prev.macd_hist();
        let macd_bear_ok = !self.config.macd_confirmation || curr.macd_hist() < prev.macd_hist();

        if crossed_up {
            let kind = if curr.rsi < self.config.rsi_overbought && macd_bull_ok {
                SignalKind::EnterLong
            } else {
                // Gate failed: the cross still means a short should be out.
                SignalKind::ExitShort
            };
            return Signal::new(kind, curr.timestamp, curr.close);
        }

        if crossed_down {
            let kind = if curr.rsi > self.config.rsi_oversold && macd_bear_ok {
                SignalKind::EnterShort
            } else {
                SignalKind::ExitLong
            };
            return Signal::new(kind, curr.timestamp, curr.close);
        }

        // No cross: RSI exhaustion exits.
        if prev.rsi >= self.config.rsi_long_exhaustion && curr.rsi < self.config.rsi_long_exhaustion
        {
            return Signal::new(SignalKind::ExitLong, curr.timestamp, curr.close);
        }
        if prev.rsi <= self.config.rsi_short_exhaustion
            && curr.rsi > self.config.rsi_short_exhaustion
        {
            return Signal::new(SignalKind::ExitShort, curr.timestamp, curr.close);
        }

        hold
    }
}

//! Explicit, immutable configuration structs.
//!
//! No ambient globals: every component receives its configuration at
//! construction. The runner crate deserializes these from TOML.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Risk and position-management parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Fraction of equity risked per trade cycle (entry + all adds).
    pub risk_per_trade: f64,
    /// Initial stop distance from entry, as a fraction of price.
    pub stop_loss_pct: f64,
    /// Trailing stop distance from the favorable extreme.
    pub trail_pct: f64,
    /// Unrealized profit fraction required before the trailing stop arms.
    pub trailing_activation_pct: f64,
    /// Optional take-profit: close when the favorable move reaches this.
    pub take_profit_pct: Option<f64>,
    /// Maximum number of pyramid adds per cycle. 0 disables pyramiding.
    pub pyramid_max_levels: u32,
    /// Favorable move from the last trigger price required for the next add.
    pub pyramid_step_pct: f64,
    /// Fraction of the *remaining* risk budget an add may consume.
    pub pyramid_risk_fraction: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_per_trade: 0.01,
            stop_loss_pct: 0.01,
            trail_pct: 0.005,
            trailing_activation_pct: 0.01,
            take_profit_pct: None,
            pyramid_max_levels: 2,
            pyramid_step_pct: 0.015,
            pyramid_risk_fraction: 0.5,
        }
    }
}

impl RiskConfig {
    /// Panic on nonsensical parameters. Called once at wiring time.
    pub fn validate(&self) {
        assert!(
            self.risk_per_trade > 0.0 && self.risk_per_trade < 1.0,
            "risk_per_trade must be in (0, 1)"
        );
        assert!(
            self.stop_loss_pct > 0.0 && self.stop_loss_pct < 1.0,
            "stop_loss_pct must be in (0, 1)"
        );
        assert!(
            self.trail_pct > 0.0 && self.trail_pct < 1.0,
            "trail_pct must be in (0, 1)"
        );
        assert!(
            self.pyramid_step_pct > 0.0,
            "pyramid_step_pct must be positive"
        );
        assert!(
            self.pyramid_risk_fraction > 0.0 && self.pyramid_risk_fraction <= 1.0,
            "pyramid_risk_fraction must be in (0, 1]"
        );
    }
}

/// Bounded exponential-backoff policy for exit-order retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 200,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (1-based): base * 2^(attempt-1).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

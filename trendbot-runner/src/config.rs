//! Bot configuration loaded from TOML.
//!
//! One file describes a whole session: the symbol and its exchange
//! constraints, risk parameters, signal thresholds, paper simulator settings,
//! and the exit retry policy. Everything is an explicit struct handed to the
//! components at construction — no globals, no late lookups.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use trendbot_core::config::{RetryConfig, RiskConfig};
use trendbot_core::domain::Instrument;
use trendbot_core::gateway::PaperConfig;
use trendbot_core::signals::SignalConfig;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {reason}")]
    Invalid { reason: String },
}

/// Exchange constraints for the traded instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Quantity step size; sized quantities are floored to a multiple.
    pub qty_step: f64,
    /// Minimum order notional accepted by the venue.
    #[serde(default)]
    pub min_notional: f64,
}

/// Complete session configuration.
///
/// `risk`, `signal`, `paper`, and `retry` sections all default when omitted,
/// so a minimal config is just a symbol, an instrument, and nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub symbol: String,
    /// Selects the live gateway instead of the paper simulator. No live
    /// adapter is linked into this build, so `run` refuses `true`.
    #[serde(default)]
    pub real_trading: bool,
    pub instrument: InstrumentConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub paper: PaperConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl BotConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: BotConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that TOML typing cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| {
            Err(ConfigError::Invalid {
                reason: reason.to_string(),
            })
        };

        if self.symbol.trim().is_empty() {
            return invalid("symbol must not be empty");
        }
        if !(self.instrument.qty_step > 0.0) {
            return invalid("instrument.qty_step must be positive");
        }
        if self.instrument.min_notional < 0.0 {
            return invalid("instrument.min_notional must not be negative");
        }
        if !(self.risk.risk_per_trade > 0.0 && self.risk.risk_per_trade < 1.0) {
            return invalid("risk.risk_per_trade must be in (0, 1)");
        }
        if !(self.risk.stop_loss_pct > 0.0 && self.risk.stop_loss_pct < 1.0) {
            return invalid("risk.stop_loss_pct must be in (0, 1)");
        }
        if !(self.risk.trail_pct > 0.0 && self.risk.trail_pct < 1.0) {
            return invalid("risk.trail_pct must be in (0, 1)");
        }
        if !(self.risk.pyramid_step_pct > 0.0) {
            return invalid("risk.pyramid_step_pct must be positive");
        }
        if !(self.risk.pyramid_risk_fraction > 0.0 && self.risk.pyramid_risk_fraction <= 1.0) {
            return invalid("risk.pyramid_risk_fraction must be in (0, 1]");
        }
        if let Some(tp) = self.risk.take_profit_pct {
            if !(tp > 0.0) {
                return invalid("risk.take_profit_pct must be positive when set");
            }
        }
        if self.signal.rsi_oversold >= self.signal.rsi_overbought {
            return invalid("signal.rsi_oversold must be below signal.rsi_overbought");
        }
        if !(self.paper.starting_balance > 0.0) {
            return invalid("paper.starting_balance must be positive");
        }
        if self.paper.taker_fee_rate < 0.0 {
            return invalid("paper.taker_fee_rate must not be negative");
        }
        if self.retry.max_attempts == 0 {
            return invalid("retry.max_attempts must be at least 1");
        }
        Ok(())
    }

    /// The instrument this config trades.
    pub fn instrument(&self) -> Instrument {
        Instrument::new(
            self.symbol.clone(),
            self.instrument.qty_step,
            self.instrument.min_notional,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
symbol = "BTCUSDT"

[instrument]
qty_step = 0.001
"#;

    const FULL: &str = r#"
symbol = "ETHUSDT"
real_trading = false

[instrument]
qty_step = 0.01
min_notional = 10.0

[risk]
risk_per_trade = 0.02
stop_loss_pct = 0.015
trail_pct = 0.005
trailing_activation_pct = 0.01
take_profit_pct = 0.08
pyramid_max_levels = 3
pyramid_step_pct = 0.02
pyramid_risk_fraction = 0.5

[signal]
rsi_overbought = 65.0
rsi_oversold = 35.0
rsi_long_exhaustion = 70.0
rsi_short_exhaustion = 30.0
macd_confirmation = true

[paper]
starting_balance = 5000.0
taker_fee_rate = 0.001
slippage_bps = 2.0

[retry]
max_attempts = 4
base_delay_ms = 100
"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: BotConfig = toml::from_str(MINIMAL).unwrap();
        config.validate().unwrap();
        assert_eq!(config.symbol, "BTCUSDT");
        assert!(!config.real_trading);
        assert_eq!(config.risk.pyramid_max_levels, 2);
        assert_eq!(config.paper.starting_balance, 5_000.0);
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn full_config_round_trips_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = BotConfig::load(file.path()).unwrap();
        assert_eq!(config.symbol, "ETHUSDT");
        assert_eq!(config.risk.take_profit_pct, Some(0.08));
        assert_eq!(config.risk.pyramid_max_levels, 3);
        assert!(config.signal.macd_confirmation);
        assert_eq!(config.paper.slippage_bps, 2.0);
        assert_eq!(config.retry.base_delay_ms, 100);
        assert_eq!(config.instrument().qty_step, 0.01);
    }

    #[test]
    fn empty_symbol_rejected() {
        let mut config: BotConfig = toml::from_str(MINIMAL).unwrap();
        config.symbol = "  ".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn inverted_rsi_bands_rejected() {
        let mut config: BotConfig = toml::from_str(MINIMAL).unwrap();
        config.signal.rsi_oversold = 80.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"symbol = [unclosed").unwrap();
        file.flush().unwrap();
        assert!(matches!(
            BotConfig::load(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}

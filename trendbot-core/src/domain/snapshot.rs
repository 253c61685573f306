//! IndicatorSnapshot — per-bar indicator values consumed by the signal generator.
//!
//! The snapshot is produced by an external indicator feed (one per bar) and is
//! pure input to the core: the engine never recomputes indicator math.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Named indicator values for one bar.
///
/// `close` is the bar's close price and doubles as the mark-to-market price
/// for trailing-stop evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub sma: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
}

impl IndicatorSnapshot {
    /// MACD histogram: macd minus its signal line.
    pub fn macd_hist(&self) -> f64 {
        self.macd - self.macd_signal
    }

    /// True when every value the signal generator reads is a finite number.
    ///
    /// Feeds emit NaN for indicators still inside their warmup window; the
    /// generator holds until the snapshot is complete.
    pub fn is_complete(&self) -> bool {
        self.close.is_finite()
            && self.ema_fast.is_finite()
            && self.ema_slow.is_finite()
            && self.sma.is_finite()
            && self.rsi.is_finite()
            && self.macd.is_finite()
            && self.macd_signal.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> IndicatorSnapshot {
        IndicatorSnapshot {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap(),
            close: 100.0,
            ema_fast: 101.0,
            ema_slow: 99.0,
            sma: 98.0,
            rsi: 55.0,
            macd: 0.5,
            macd_signal: 0.3,
        }
    }

    #[test]
    fn macd_hist_is_difference() {
        let snap = sample();
        assert!((snap.macd_hist() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn complete_snapshot() {
        assert!(sample().is_complete());
    }

    #[test]
    fn warmup_nan_is_incomplete() {
        let mut snap = sample();
        snap.rsi = f64::NAN;
        assert!(!snap.is_complete());
    }
}

//! Indicator snapshot feeds.
//!
//! A feed yields pre-computed `IndicatorSnapshot`s in timestamp order,
//! exactly once each — lazy and non-restartable. Three implementations:
//! - `VecFeed`: in-memory, for tests and replays
//! - `CsvFeed`: streams rows from a CSV file
//! - `SyntheticFeed`: seeded random-walk closes with inline indicator math,
//!   for demo sessions without any market data on disk
//!
//! Indicator computation lives only in `SyntheticFeed`; the engine consumes
//! snapshots as data and never computes an indicator itself.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::collections::VecDeque;
use std::fs::File;
use std::path::Path;
use thiserror::Error;
use trendbot_core::domain::{Bar, IndicatorSnapshot};

/// Errors from the feed layer. Any of them ends the session's data stream;
/// the runner halts new entries and surfaces the failure in the report.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("feed parse error: {reason}")]
    Parse { reason: String },

    #[error("feed disconnected")]
    Disconnected,
}

/// Ordered, lazy, non-restartable source of indicator snapshots.
pub trait IndicatorFeed {
    /// The next snapshot, `None` when the feed is exhausted.
    fn next(&mut self) -> Result<Option<IndicatorSnapshot>, FeedError>;
}

// ── VecFeed ──────────────────────────────────────────────────────────

/// In-memory feed over a prepared snapshot sequence.
#[derive(Debug, Default)]
pub struct VecFeed {
    snapshots: VecDeque<IndicatorSnapshot>,
}

impl VecFeed {
    pub fn new(snapshots: impl IntoIterator<Item = IndicatorSnapshot>) -> Self {
        Self {
            snapshots: snapshots.into_iter().collect(),
        }
    }
}

impl IndicatorFeed for VecFeed {
    fn next(&mut self) -> Result<Option<IndicatorSnapshot>, FeedError> {
        Ok(self.snapshots.pop_front())
    }
}

// ── CsvFeed ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: DateTime<Utc>,
    close: f64,
    ema_fast: f64,
    ema_slow: f64,
    sma: f64,
    rsi: f64,
    macd: f64,
    macd_signal: f64,
}

impl From<CsvRow> for IndicatorSnapshot {
    fn from(row: CsvRow) -> Self {
        IndicatorSnapshot {
            timestamp: row.timestamp,
            close: row.close,
            ema_fast: row.ema_fast,
            ema_slow: row.ema_slow,
            sma: row.sma,
            rsi: row.rsi,
            macd: row.macd,
            macd_signal: row.macd_signal,
        }
    }
}

/// Streams snapshots from a CSV file with a header row:
/// `timestamp,close,ema_fast,ema_slow,sma,rsi,macd,macd_signal`
/// (timestamps RFC 3339).
pub struct CsvFeed {
    reader: csv::Reader<File>,
}

impl CsvFeed {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let file = File::open(path)?;
        Ok(Self {
            reader: csv::Reader::from_reader(file),
        })
    }
}

impl IndicatorFeed for CsvFeed {
    fn next(&mut self) -> Result<Option<IndicatorSnapshot>, FeedError> {
        match self.reader.deserialize::<CsvRow>().next() {
            None => Ok(None),
            Some(Ok(row)) => Ok(Some(row.into())),
            Some(Err(err)) => Err(FeedError::Parse {
                reason: err.to_string(),
            }),
        }
    }
}

// ── SyntheticFeed ────────────────────────────────────────────────────

/// Parameters for the synthetic random walk and its indicators.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub symbol: String,
    pub bars: usize,
    pub seed: u64,
    pub start_price: f64,
    /// Per-bar drift, as a fraction of price.
    pub drift: f64,
    /// Per-bar uniform noise amplitude, as a fraction of price.
    pub volatility: f64,
    pub ema_fast_period: usize,
    pub ema_slow_period: usize,
    pub sma_period: usize,
    pub rsi_period: usize,
    pub macd_signal_period: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            symbol: "SYNTH".into(),
            bars: 500,
            seed: 42,
            start_price: 100.0,
            drift: 0.0002,
            volatility: 0.01,
            ema_fast_period: 12,
            ema_slow_period: 26,
            sma_period: 20,
            rsi_period: 14,
            macd_signal_period: 9,
        }
    }
}

/// Incremental exponential moving average, seeded on the first sample.
#[derive(Debug, Clone)]
struct Ema {
    alpha: f64,
    value: Option<f64>,
}

impl Ema {
    fn new(period: usize) -> Self {
        assert!(period > 0, "EMA period must be positive");
        Self {
            alpha: 2.0 / (period as f64 + 1.0),
            value: None,
        }
    }

    fn update(&mut self, sample: f64) -> f64 {
        let next = match self.value {
            Some(prev) => prev + self.alpha * (sample - prev),
            None => sample,
        };
        self.value = Some(next);
        next
    }
}

/// Wilder RSI: simple average over the first `period` deltas, smoothed after.
#[derive(Debug, Clone)]
struct WilderRsi {
    period: usize,
    prev_close: Option<f64>,
    avg_gain: f64,
    avg_loss: f64,
    samples: usize,
}

impl WilderRsi {
    fn new(period: usize) -> Self {
        assert!(period > 0, "RSI period must be positive");
        Self {
            period,
            prev_close: None,
            avg_gain: 0.0,
            avg_loss: 0.0,
            samples: 0,
        }
    }

    /// NaN until `period` deltas have been seen.
    fn update(&mut self, close: f64) -> f64 {
        let prev = match self.prev_close.replace(close) {
            Some(p) => p,
            None => return f64::NAN,
        };
        let delta = close - prev;
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);

        self.samples += 1;
        if self.samples <= self.period {
            self.avg_gain += gain / self.period as f64;
            self.avg_loss += loss / self.period as f64;
            if self.samples < self.period {
                return f64::NAN;
            }
        } else {
            let n = self.period as f64;
            self.avg_gain = (self.avg_gain * (n - 1.0) + gain) / n;
            self.avg_loss = (self.avg_loss * (n - 1.0) + loss) / n;
        }

        if self.avg_loss == 0.0 {
            return 100.0;
        }
        let rs = self.avg_gain / self.avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

/// Seeded random-walk feed with inline EMA/SMA/RSI/MACD computation.
pub struct SyntheticFeed {
    config: SyntheticConfig,
    rng: StdRng,
    emitted: usize,
    price: f64,
    timestamp: DateTime<Utc>,
    ema_fast: Ema,
    ema_slow: Ema,
    macd_signal: Ema,
    rsi: WilderRsi,
    sma_window: VecDeque<f64>,
}

impl SyntheticFeed {
    pub fn new(config: SyntheticConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            rng,
            emitted: 0,
            price: config.start_price,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            ema_fast: Ema::new(config.ema_fast_period),
            ema_slow: Ema::new(config.ema_slow_period),
            macd_signal: Ema::new(config.macd_signal_period),
            rsi: WilderRsi::new(config.rsi_period),
            sma_window: VecDeque::new(),
            config,
        }
    }
}

impl IndicatorFeed for SyntheticFeed {
    fn next(&mut self) -> Result<Option<IndicatorSnapshot>, FeedError> {
        if self.emitted >= self.config.bars {
            return Ok(None);
        }
        self.emitted += 1;
        self.timestamp += Duration::minutes(1);

        let open = self.price;
        let noise: f64 = self.rng.gen_range(-1.0..1.0);
        self.price *= 1.0 + self.config.drift + noise * self.config.volatility;
        let close = self.price;

        let wick = self.rng.gen_range(0.0..self.config.volatility / 2.0);
        let bar = Bar {
            symbol: self.config.symbol.clone(),
            timestamp: self.timestamp,
            open,
            high: open.max(close) * (1.0 + wick),
            low: open.min(close) * (1.0 - wick),
            close,
            volume: self.rng.gen_range(10.0..10_000.0),
        };
        debug_assert!(bar.is_sane());
        let close = bar.close;

        let ema_fast = self.ema_fast.update(close);
        let ema_slow = self.ema_slow.update(close);
        let macd = ema_fast - ema_slow;
        let macd_signal = self.macd_signal.update(macd);
        let rsi = self.rsi.update(close);

        self.sma_window.push_back(close);
        if self.sma_window.len() > self.config.sma_period {
            self.sma_window.pop_front();
        }
        let sma = if self.sma_window.len() == self.config.sma_period {
            self.sma_window.iter().sum::<f64>() / self.config.sma_period as f64
        } else {
            f64::NAN
        };

        Ok(Some(IndicatorSnapshot {
            timestamp: self.timestamp,
            close,
            ema_fast,
            ema_slow,
            sma,
            rsi,
            macd,
            macd_signal,
        }))
    }
}

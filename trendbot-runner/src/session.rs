//! Session runner: feed → signal generator → position manager, bar by bar.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use trendbot_core::config::{RetryConfig, RiskConfig};
use trendbot_core::domain::{Instrument, IndicatorSnapshot, Signal};
use trendbot_core::engine::{ClosedCycle, EngineError, EventCounters, PositionManager};
use trendbot_core::gateway::ExecutionGateway;
use trendbot_core::risk::RiskSizer;
use trendbot_core::signals::{SignalConfig, TrendCrossGenerator};

use crate::feed::IndicatorFeed;

/// One point of the session's equity curve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

/// Outcome of a completed (or aborted) session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub symbol: String,
    pub bars_processed: u64,
    pub starting_balance: f64,
    pub final_equity: f64,
    pub realized_pnl: f64,
    pub counters: EventCounters,
    pub cycles: Vec<ClosedCycle>,
    pub equity_curve: Vec<EquityPoint>,
    /// Set when the feed died mid-session. The session still shut down
    /// cleanly, but the run must be treated as failed.
    pub feed_failure: Option<String>,
}

impl SessionReport {
    pub fn return_pct(&self) -> f64 {
        if self.starting_balance == 0.0 {
            return 0.0;
        }
        (self.final_equity - self.starting_balance) / self.starting_balance * 100.0
    }
}

/// Drives one trading session over a snapshot feed.
///
/// Strictly sequential: each snapshot is fully processed (tick, then signal,
/// then equity record) before the next is pulled.
pub struct SessionRunner {
    symbol: String,
    generator: TrendCrossGenerator,
    manager: PositionManager,
    starting_balance: f64,
}

impl SessionRunner {
    pub fn new(
        symbol: impl Into<String>,
        instrument: Instrument,
        signal: SignalConfig,
        risk: RiskConfig,
        retry: RetryConfig,
        starting_balance: f64,
    ) -> Self {
        let symbol = symbol.into();
        Self {
            generator: TrendCrossGenerator::new(signal),
            manager: PositionManager::new(
                symbol.clone(),
                risk,
                RiskSizer::new(instrument),
                retry,
                starting_balance,
            ),
            symbol,
            starting_balance,
        }
    }

    /// Consume the feed to exhaustion (or failure) and return the report.
    ///
    /// A feed failure halts new entries, ends the stream, and is recorded in
    /// the report; a gateway exit-retry exhaustion aborts with `EngineError`.
    pub fn run(
        &mut self,
        feed: &mut dyn IndicatorFeed,
        gateway: &mut dyn ExecutionGateway,
    ) -> Result<SessionReport, EngineError> {
        info!(symbol = %self.symbol, "session start");

        let mut prev: Option<IndicatorSnapshot> = None;
        let mut bars_processed = 0u64;
        let mut equity_curve = Vec::new();
        let mut feed_failure = None;

        loop {
            let snapshot = match feed.next() {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => break,
                Err(err) => {
                    warn!(symbol = %self.symbol, %err, "feed failed; halting entries");
                    self.manager.halt_entries();
                    feed_failure = Some(err.to_string());
                    break;
                }
            };

            // First snapshot has no predecessor to diff against.
            let signal = match &prev {
                Some(p) => self.generator.evaluate(p, &snapshot),
                None => Signal::hold(snapshot.timestamp, snapshot.close),
            };
            debug!(symbol = %self.symbol, ts = %snapshot.timestamp,
                   close = snapshot.close, kind = ?signal.kind, "bar");

            // A fatal engine error still gets the cancel sweep: never leave
            // orders dangling at the gateway on the abort path.
            if let Err(err) = self.manager.process(signal, gateway) {
                if let Err(sweep_err) = self.manager.shutdown(gateway) {
                    warn!(symbol = %self.symbol, %sweep_err, "shutdown cleanup failed");
                }
                return Err(err);
            }

            bars_processed += 1;
            equity_curve.push(EquityPoint {
                timestamp: snapshot.timestamp,
                equity: self.manager.equity(snapshot.close),
            });
            prev = Some(snapshot);
        }

        if let Err(err) = self.manager.shutdown(gateway) {
            warn!(symbol = %self.symbol, %err, "shutdown cleanup failed");
        }

        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.starting_balance);
        let report = SessionReport {
            symbol: self.symbol.clone(),
            bars_processed,
            starting_balance: self.starting_balance,
            final_equity,
            realized_pnl: self.manager.position().realized_pnl,
            counters: *self.manager.counters(),
            cycles: self.manager.cycles().to_vec(),
            equity_curve,
            feed_failure,
        };

        info!(
            symbol = %self.symbol,
            bars = report.bars_processed,
            cycles = report.cycles.len(),
            realized = report.realized_pnl,
            final_equity = report.final_equity,
            "session end"
        );
        Ok(report)
    }

    pub fn manager(&self) -> &PositionManager {
        &self.manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use trendbot_core::gateway::{PaperConfig, PaperGateway};

    use crate::feed::{FeedError, VecFeed};

    fn snap(minute: u32, close: f64, ema_fast: f64, ema_slow: f64, rsi: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, minute, 0).unwrap(),
            close,
            ema_fast,
            ema_slow,
            sma: close,
            rsi,
            macd: ema_fast - ema_slow,
            macd_signal: 0.0,
        }
    }

    fn runner() -> SessionRunner {
        let risk = RiskConfig {
            stop_loss_pct: 0.05,
            pyramid_max_levels: 0,
            ..RiskConfig::default()
        };
        SessionRunner::new(
            "BTCUSDT",
            Instrument::new("BTCUSDT", 0.001, 0.0),
            SignalConfig::default(),
            risk,
            RetryConfig {
                max_attempts: 3,
                base_delay_ms: 0,
            },
            10_000.0,
        )
    }

    fn paper() -> PaperGateway {
        PaperGateway::new(PaperConfig {
            starting_balance: 1_000_000.0,
            taker_fee_rate: 0.0,
            slippage_bps: 0.0,
        })
    }

    #[test]
    fn golden_cross_cycle_produces_one_trade() {
        // Bar 1: fast below slow. Bar 2: fast above slow → EnterLong.
        // Bar 4: fast back below slow → ExitLong (RSI blocks the short).
        let mut feed = VecFeed::new(vec![
            snap(0, 100.0, 99.0, 100.0, 50.0),
            snap(1, 101.0, 100.5, 100.0, 50.0),
            snap(2, 103.0, 101.0, 100.2, 55.0),
            snap(3, 102.0, 100.1, 100.4, 25.0),
        ]);
        let mut gw = paper();
        let mut runner = runner();

        let report = runner.run(&mut feed, &mut gw).unwrap();

        assert_eq!(report.bars_processed, 4);
        assert_eq!(report.counters.entries, 1);
        assert_eq!(report.cycles.len(), 1);
        assert!(report.feed_failure.is_none());
        assert_eq!(report.equity_curve.len(), 4);
        assert!(runner.manager().position().is_flat());
    }

    #[test]
    fn feed_failure_halts_entries_and_is_reported() {
        struct DyingFeed {
            yielded: bool,
        }
        impl IndicatorFeed for DyingFeed {
            fn next(&mut self) -> Result<Option<IndicatorSnapshot>, FeedError> {
                if self.yielded {
                    return Err(FeedError::Disconnected);
                }
                self.yielded = true;
                Ok(Some(snap(0, 100.0, 100.0, 100.0, 50.0)))
            }
        }

        let mut feed = DyingFeed { yielded: false };
        let mut gw = paper();
        let mut runner = runner();

        let report = runner.run(&mut feed, &mut gw).unwrap();

        assert_eq!(report.bars_processed, 1);
        assert!(report.feed_failure.is_some());
        assert!(runner.manager().entries_halted());
    }

    #[test]
    fn abort_path_still_sweeps_open_orders() {
        use std::cell::Cell;
        use trendbot_core::domain::{ClientOrderId, Fill, OrderRequest, OrderSide};
        use trendbot_core::gateway::GatewayError;

        // Fills the entry, then times out every exit submission, and holds a
        // resting order the sweep must find and cancel.
        struct StuckExitGateway {
            submits: u32,
            queries: Cell<u32>,
            cancels: u32,
        }
        impl ExecutionGateway for StuckExitGateway {
            fn submit(&mut self, request: &OrderRequest) -> Result<Fill, GatewayError> {
                self.submits += 1;
                if self.submits > 1 {
                    return Err(GatewayError::Timeout);
                }
                Ok(Fill {
                    order_id: request.id,
                    timestamp: request.timestamp,
                    symbol: request.symbol.clone(),
                    side: request.side,
                    price: request.reference_price,
                    quantity: request.quantity,
                    fee: 0.0,
                })
            }

            fn cancel(&mut self, _: ClientOrderId) -> Result<bool, GatewayError> {
                self.cancels += 1;
                Ok(true)
            }

            fn query_open_orders(&self) -> Result<Vec<OrderRequest>, GatewayError> {
                self.queries.set(self.queries.get() + 1);
                Ok(vec![OrderRequest::market(
                    ClientOrderId(99),
                    "BTCUSDT",
                    OrderSide::Sell,
                    1.0,
                    100.0,
                    Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
                )])
            }
        }

        let mut feed = VecFeed::new(vec![
            snap(0, 100.0, 99.0, 100.0, 50.0),
            snap(1, 101.0, 100.5, 100.0, 50.0),
            snap(2, 103.0, 101.0, 100.2, 55.0),
            snap(3, 102.0, 100.1, 100.4, 25.0),
        ]);
        let mut gw = StuckExitGateway {
            submits: 0,
            queries: Cell::new(0),
            cancels: 0,
        };
        let mut runner = runner();

        let err = runner.run(&mut feed, &mut gw).unwrap_err();

        assert!(matches!(err, EngineError::ExitRetriesExhausted { .. }));
        // The abort still queried and cancelled what the gateway held.
        assert!(gw.queries.get() >= 1);
        assert_eq!(gw.cancels, 1);
    }

    #[test]
    fn empty_feed_reports_starting_balance() {
        let mut feed = VecFeed::default();
        let mut gw = paper();
        let mut runner = runner();

        let report = runner.run(&mut feed, &mut gw).unwrap();
        assert_eq!(report.bars_processed, 0);
        assert_eq!(report.final_equity, 10_000.0);
        assert_eq!(report.return_pct(), 0.0);
    }
}

//! Position manager — the stateful core that turns signals into orders.
//!
//! One instance owns exactly one `Position` and one `AccountState` for one
//! symbol. Every step is fully sequential: a bar's mark-to-market tick
//! (stop / take-profit / trailing / pyramid evaluation) completes before the
//! bar's signal is dispatched, and a stop-triggered exit discards the bar's
//! signal entirely — capital preservation beats re-entry.
//!
//! Failure semantics:
//! - sizing or gateway errors on an ENTER or ADD are recovered locally
//!   (skipped, counted, logged);
//! - gateway errors on an EXIT are retried with bounded exponential backoff
//!   and escalate to `EngineError::ExitRetriesExhausted` when attempts run
//!   out — an open position with no working exit is the one state the engine
//!   refuses to paper over.

use crate::config::{RetryConfig, RiskConfig};
use crate::domain::{
    AccountState, Fill, IdGen, OrderRequest, OrderSide, Position, Side, Signal, SignalKind,
};
use crate::engine::counters::EventCounters;
use crate::gateway::{ExecutionGateway, GatewayError};
use crate::risk::RiskSizer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

/// Fatal engine conditions.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("exit order failed after {attempts} attempts: {last_error}")]
    ExitRetriesExhausted {
        attempts: u32,
        last_error: GatewayError,
    },
}

/// Why a cycle closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    Stop,
    TakeProfit,
    Signal,
}

/// Record of one completed position cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedCycle {
    pub side: Side,
    pub avg_entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub pyramid_level: u32,
    pub realized_pnl: f64,
    pub reason: ExitReason,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

/// The position/risk management state machine.
pub struct PositionManager {
    symbol: String,
    risk: RiskConfig,
    sizer: RiskSizer,
    retry: RetryConfig,
    position: Position,
    account: AccountState,
    counters: EventCounters,
    cycles: Vec<ClosedCycle>,
    id_gen: IdGen,
    /// Set when the feed dies: existing position tracking continues, but no
    /// new entries or adds are taken.
    entries_halted: bool,
}

impl PositionManager {
    pub fn new(
        symbol: impl Into<String>,
        risk: RiskConfig,
        sizer: RiskSizer,
        retry: RetryConfig,
        starting_balance: f64,
    ) -> Self {
        risk.validate();
        let symbol = symbol.into();
        Self {
            position: Position::flat(symbol.clone()),
            account: AccountState::new(starting_balance),
            symbol,
            risk,
            sizer,
            retry,
            counters: EventCounters::default(),
            cycles: Vec::new(),
            id_gen: IdGen::new(),
            entries_halted: false,
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn account(&self) -> &AccountState {
        &self.account
    }

    pub fn counters(&self) -> &EventCounters {
        &self.counters
    }

    pub fn cycles(&self) -> &[ClosedCycle] {
        &self.cycles
    }

    /// Equity = cash + open position marked at `price`.
    pub fn equity(&self, price: f64) -> f64 {
        self.account.equity(&self.position, price)
    }

    /// Stop taking new entries and adds; keep managing what is open.
    pub fn halt_entries(&mut self) {
        if !self.entries_halted {
            warn!(symbol = %self.symbol, "entries halted; existing position tracking continues");
            self.entries_halted = true;
        }
    }

    pub fn entries_halted(&self) -> bool {
        self.entries_halted
    }

    /// Process one bar: mark-to-market tick first, then the bar's signal.
    ///
    /// A stop or take-profit exit during the tick consumes the bar — the
    /// signal is discarded, so a same-bar stop trigger and exit signal can
    /// never produce two orders.
    pub fn process(
        &mut self,
        signal: Signal,
        gateway: &mut dyn ExecutionGateway,
    ) -> Result<(), EngineError> {
        let exited = self.on_tick(signal.timestamp, signal.price, gateway)?;
        if exited {
            if !signal.is_hold() {
                info!(symbol = %self.symbol, kind = ?signal.kind,
                      "signal discarded: stop/take-profit already closed this bar");
            }
            return Ok(());
        }
        self.on_signal(signal, gateway)
    }

    /// Mark-to-market tick: update extremes, check the stop and take-profit,
    /// ratchet the trailing stop, and evaluate a pyramid add.
    ///
    /// Returns true when the tick closed the position.
    pub fn on_tick(
        &mut self,
        timestamp: DateTime<Utc>,
        price: f64,
        gateway: &mut dyn ExecutionGateway,
    ) -> Result<bool, EngineError> {
        if self.position.is_flat() {
            return Ok(false);
        }

        self.position.update_mark(price);

        // 1. Stop trigger: wins over everything else this bar.
        if self.stop_triggered(price) {
            info!(symbol = %self.symbol, price, stop = ?self.position.stop, "stop triggered");
            self.close_position(timestamp, price, ExitReason::Stop, gateway)?;
            return Ok(true);
        }

        // 2. Take-profit, when configured.
        if let Some(tp) = self.risk.take_profit_pct {
            if self.position.favorable_move_pct(price) >= tp {
                info!(symbol = %self.symbol, price, "take-profit reached");
                self.close_position(timestamp, price, ExitReason::TakeProfit, gateway)?;
                return Ok(true);
            }
        }

        // 3. Trailing stop: arm on activation profit, then only ratchet.
        self.update_trailing();

        // 4. Pyramid: a favorable step synthesizes an add through the same
        //    dispatch as an external signal; a retrace closes the window.
        self.evaluate_pyramid(timestamp, price, gateway)?;

        Ok(false)
    }

    /// Dispatch one signal against the current state. Exhaustive over
    /// (side, kind) so a new signal variant cannot be silently dropped.
    pub fn on_signal(
        &mut self,
        signal: Signal,
        gateway: &mut dyn ExecutionGateway,
    ) -> Result<(), EngineError> {
        let Signal {
            kind,
            timestamp,
            price,
        } = signal;

        match (self.position.side, kind) {
            // ── Flat ──────────────────────────────────────────────────
            (Side::Flat, SignalKind::EnterLong) => {
                self.enter_with(Side::Long, timestamp, price, gateway);
                Ok(())
            }
            (Side::Flat, SignalKind::EnterShort) => {
                self.enter_with(Side::Short, timestamp, price, gateway);
                Ok(())
            }
            (Side::Flat, SignalKind::AddLong | SignalKind::AddShort) => {
                self.ignore(kind, "no position to add to");
                Ok(())
            }
            (Side::Flat, SignalKind::ExitLong | SignalKind::ExitShort) => {
                self.ignore(kind, "no position to exit");
                Ok(())
            }
            (Side::Flat, SignalKind::Hold) => Ok(()),

            // ── Long ──────────────────────────────────────────────────
            (Side::Long, SignalKind::EnterLong) => {
                self.ignore(kind, "already long");
                Ok(())
            }
            (Side::Long, SignalKind::EnterShort) => {
                // Close first; never flip within the same tick.
                info!(symbol = %self.symbol, "opposite entry signal: closing long first");
                self.close_position(timestamp, price, ExitReason::Signal, gateway)
            }
            (Side::Long, SignalKind::AddLong) => {
                self.try_add(timestamp, price, gateway);
                Ok(())
            }
            (Side::Long, SignalKind::AddShort) => {
                self.ignore(kind, "add for the wrong side");
                Ok(())
            }
            (Side::Long, SignalKind::ExitLong) => {
                self.close_position(timestamp, price, ExitReason::Signal, gateway)
            }
            (Side::Long, SignalKind::ExitShort) => {
                self.ignore(kind, "exit for the wrong side");
                Ok(())
            }
            (Side::Long, SignalKind::Hold) => Ok(()),

            // ── Short ─────────────────────────────────────────────────
            (Side::Short, SignalKind::EnterShort) => {
                self.ignore(kind, "already short");
                Ok(())
            }
            (Side::Short, SignalKind::EnterLong) => {
                info!(symbol = %self.symbol, "opposite entry signal: closing short first");
                self.close_position(timestamp, price, ExitReason::Signal, gateway)
            }
            (Side::Short, SignalKind::AddShort) => {
                self.try_add(timestamp, price, gateway);
                Ok(())
            }
            (Side::Short, SignalKind::AddLong) => {
                self.ignore(kind, "add for the wrong side");
                Ok(())
            }
            (Side::Short, SignalKind::ExitShort) => {
                self.close_position(timestamp, price, ExitReason::Signal, gateway)
            }
            (Side::Short, SignalKind::ExitLong) => {
                self.ignore(kind, "exit for the wrong side");
                Ok(())
            }
            (Side::Short, SignalKind::Hold) => Ok(()),
        }
    }

    /// Cancel anything still outstanding at the gateway. Called on shutdown
    /// so the engine never exits with a dangling order.
    pub fn shutdown(&mut self, gateway: &mut dyn ExecutionGateway) -> Result<(), GatewayError> {
        let open = gateway.query_open_orders()?;
        for order in open {
            let cancelled = gateway.cancel(order.id)?;
            info!(symbol = %self.symbol, order_id = %order.id, cancelled, "shutdown cancel");
        }
        Ok(())
    }

    // ── internals ─────────────────────────────────────────────────────

    fn stop_triggered(&self, price: f64) -> bool {
        match (self.position.side, self.position.stop) {
            (Side::Long, Some(stop)) => price <= stop,
            (Side::Short, Some(stop)) => price >= stop,
            _ => false,
        }
    }

    fn update_trailing(&mut self) {
        let pos = &mut self.position;

        if !pos.trailing_armed {
            let mark = match pos.side {
                Side::Long => pos.highest_price_since_entry,
                Side::Short => pos.lowest_price_since_entry,
                Side::Flat => return,
            };
            if pos.favorable_move_pct(mark) >= self.risk.trailing_activation_pct {
                pos.trailing_armed = true;
                info!(symbol = %self.symbol, "trailing stop armed");
            }
        }

        if pos.trailing_armed {
            let candidate = match pos.side {
                Side::Long => pos.highest_price_since_entry * (1.0 - self.risk.trail_pct),
                Side::Short => pos.lowest_price_since_entry * (1.0 + self.risk.trail_pct),
                Side::Flat => return,
            };
            pos.stop = Some(ratchet(pos.side, pos.stop, candidate));
        }
    }

    fn evaluate_pyramid(
        &mut self,
        timestamp: DateTime<Utc>,
        price: f64,
        gateway: &mut dyn ExecutionGateway,
    ) -> Result<(), EngineError> {
        let pos = &self.position;
        if pos.is_flat() || pos.adds_blocked {
            return Ok(());
        }

        let (retraced, stepped, add_kind) = match pos.side {
            Side::Long => (
                price < pos.last_add_trigger,
                price >= pos.last_add_trigger * (1.0 + self.risk.pyramid_step_pct),
                SignalKind::AddLong,
            ),
            Side::Short => (
                price > pos.last_add_trigger,
                price <= pos.last_add_trigger * (1.0 - self.risk.pyramid_step_pct),
                SignalKind::AddShort,
            ),
            Side::Flat => return Ok(()),
        };

        if retraced {
            // Price gave back the last trigger level: no more adds this cycle.
            self.position.adds_blocked = true;
            return Ok(());
        }

        if stepped && self.position.pyramid_level < self.risk.pyramid_max_levels {
            self.on_signal(Signal::new(add_kind, timestamp, price), gateway)?;
        }
        Ok(())
    }

    fn ignore(&mut self, kind: SignalKind, why: &str) {
        self.counters.signals_ignored += 1;
        info!(symbol = %self.symbol, kind = ?kind, why, "signal ignored");
    }

    fn enter_with(
        &mut self,
        side: Side,
        timestamp: DateTime<Utc>,
        price: f64,
        gateway: &mut dyn ExecutionGateway,
    ) {
        if self.entries_halted {
            self.counters.entries_skipped += 1;
            warn!(symbol = %self.symbol, "entry skipped: entries halted");
            return;
        }

        let stop = match side {
            Side::Long => price * (1.0 - self.risk.stop_loss_pct),
            Side::Short => price * (1.0 + self.risk.stop_loss_pct),
            Side::Flat => return,
        };

        let equity = self.equity(price);
        let quantity = match self
            .sizer
            .size_entry(equity, price, stop, self.risk.risk_per_trade)
        {
            Ok(q) => q,
            Err(err) => {
                self.counters.entries_skipped += 1;
                warn!(symbol = %self.symbol, %err, "entry skipped: sizing failed");
                return;
            }
        };

        let order_side = match side {
            Side::Long => OrderSide::Buy,
            Side::Short => OrderSide::Sell,
            Side::Flat => return,
        };
        let request = OrderRequest::market(
            self.id_gen.next_order_id(),
            self.symbol.clone(),
            order_side,
            quantity,
            price,
            timestamp,
        );

        let fill = match gateway.submit(&request) {
            Ok(fill) => fill,
            Err(err) => {
                // Missed entry, not a failure mode worth dying for.
                self.counters.entries_skipped += 1;
                warn!(symbol = %self.symbol, %err, "entry skipped: gateway refused");
                return;
            }
        };

        self.account.apply_fill(&fill);
        let risk = quantity * (fill.price - stop).abs();
        self.position.open(side, fill, stop, risk, equity);
        self.counters.entries += 1;
        info!(
            symbol = %self.symbol,
            ?side,
            quantity,
            entry = self.position.avg_entry_price,
            stop,
            "position opened"
        );
    }

    fn try_add(&mut self, timestamp: DateTime<Utc>, price: f64, gateway: &mut dyn ExecutionGateway) {
        if self.entries_halted {
            self.counters.adds_skipped += 1;
            warn!(symbol = %self.symbol, "add skipped: entries halted");
            return;
        }

        let pos = &self.position;
        if pos.adds_blocked {
            self.counters.adds_skipped += 1;
            info!(symbol = %self.symbol, "add skipped: retrace closed the add window");
            return;
        }
        if pos.pyramid_level >= self.risk.pyramid_max_levels {
            self.counters.adds_skipped += 1;
            info!(
                symbol = %self.symbol,
                level = pos.pyramid_level,
                max = self.risk.pyramid_max_levels,
                "add skipped: pyramid cap reached"
            );
            return;
        }

        let stop = match pos.stop {
            Some(s) => s,
            None => return,
        };
        // Budget against the cumulative at-entry ledger: the entry plus every
        // prior add, valued at their stop distance when filled. Total
        // committed risk never exceeds the single-trade cap, so an entry that
        // consumed the whole budget leaves nothing for adds.
        let cap = self.risk.risk_per_trade * pos.equity_at_entry;
        let quantity = match self.sizer.size_add(
            cap,
            pos.committed_risk,
            price,
            stop,
            self.risk.pyramid_risk_fraction,
        ) {
            Ok(q) => q,
            Err(err) => {
                // Non-fatal: the existing position continues unchanged.
                self.counters.adds_skipped += 1;
                warn!(symbol = %self.symbol, %err, "add skipped: sizing failed");
                return;
            }
        };

        let order_side = match pos.side {
            Side::Long => OrderSide::Buy,
            Side::Short => OrderSide::Sell,
            Side::Flat => return,
        };
        let request = OrderRequest::market(
            self.id_gen.next_order_id(),
            self.symbol.clone(),
            order_side,
            quantity,
            price,
            timestamp,
        );

        let fill = match gateway.submit(&request) {
            Ok(fill) => fill,
            Err(err) => {
                self.counters.adds_skipped += 1;
                warn!(symbol = %self.symbol, %err, "add skipped: gateway refused");
                return;
            }
        };

        self.account.apply_fill(&fill);
        let incremental = quantity * (fill.price - stop).abs();
        self.position.apply_add(fill, incremental);

        // Re-anchor the stop on the new VWAP, through the ratchet.
        let candidate = match self.position.side {
            Side::Long => self.position.avg_entry_price * (1.0 - self.risk.stop_loss_pct),
            Side::Short => self.position.avg_entry_price * (1.0 + self.risk.stop_loss_pct),
            Side::Flat => return,
        };
        self.position.stop = Some(ratchet(self.position.side, self.position.stop, candidate));

        self.counters.adds += 1;
        info!(
            symbol = %self.symbol,
            level = self.position.pyramid_level,
            quantity,
            vwap = self.position.avg_entry_price,
            stop = ?self.position.stop,
            "pyramid add filled"
        );
    }

    /// Close the full position at market. Exit orders retry with bounded
    /// exponential backoff; exhaustion is fatal.
    fn close_position(
        &mut self,
        timestamp: DateTime<Utc>,
        price: f64,
        reason: ExitReason,
        gateway: &mut dyn ExecutionGateway,
    ) -> Result<(), EngineError> {
        let quantity = self.position.quantity;
        let order_side = match self.position.side {
            Side::Long => OrderSide::Sell,
            Side::Short => OrderSide::Buy,
            Side::Flat => return Ok(()),
        };
        let request = OrderRequest::market(
            self.id_gen.next_order_id(),
            self.symbol.clone(),
            order_side,
            quantity,
            price,
            timestamp,
        );

        let fill = self.submit_exit_with_retry(&request, gateway)?;

        self.account.apply_fill(&fill);
        let opened_at = self
            .position
            .fills
            .first()
            .map(|f| f.timestamp)
            .unwrap_or(timestamp);
        let side = self.position.side;
        let avg_entry_price = self.position.avg_entry_price;
        let pyramid_level = self.position.pyramid_level;
        let exit_price = fill.price;
        let closed_at = fill.timestamp;
        let realized_pnl = self.position.close(fill);

        match reason {
            ExitReason::Stop => self.counters.stop_exits += 1,
            ExitReason::TakeProfit => self.counters.take_profit_exits += 1,
            ExitReason::Signal => self.counters.signal_exits += 1,
        }
        info!(
            symbol = %self.symbol,
            ?side,
            ?reason,
            quantity,
            exit_price,
            realized_pnl,
            "position closed"
        );

        self.cycles.push(ClosedCycle {
            side,
            avg_entry_price,
            exit_price,
            quantity,
            pyramid_level,
            realized_pnl,
            reason,
            opened_at,
            closed_at,
        });
        Ok(())
    }

    fn submit_exit_with_retry(
        &mut self,
        request: &OrderRequest,
        gateway: &mut dyn ExecutionGateway,
    ) -> Result<Fill, EngineError> {
        let mut attempt = 1;
        loop {
            match gateway.submit(request) {
                Ok(fill) => return Ok(fill),
                Err(err) if attempt < self.retry.max_attempts => {
                    self.counters.exit_retries += 1;
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        symbol = %self.symbol,
                        attempt,
                        %err,
                        delay_ms = delay.as_millis() as u64,
                        "exit order failed; retrying"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => {
                    error!(
                        symbol = %self.symbol,
                        attempts = attempt,
                        %err,
                        "exit retries exhausted; operator intervention required"
                    );
                    return Err(EngineError::ExitRetriesExhausted {
                        attempts: attempt,
                        last_error: err,
                    });
                }
            }
        }
    }
}

/// Clamp a proposed stop so it only moves in the position's favor.
fn ratchet(side: Side, current: Option<f64>, proposed: f64) -> f64 {
    match (side, current) {
        (Side::Long, Some(cur)) => cur.max(proposed),
        (Side::Short, Some(cur)) => cur.min(proposed),
        _ => proposed,
    }
}

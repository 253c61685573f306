//! Position — the mutable entity owned exclusively by the position manager.
//!
//! Lifecycle per cycle: created Flat, opened Long/Short by the first entry
//! fill, grown by pyramid adds up to the configured cap, closed back to Flat
//! by a stop trigger or exit signal. A fresh object replaces it for the next
//! cycle — no stale state survives a close.
//!
//! **Invariants:**
//! - `side == Flat` ⇔ `quantity == 0` ⇔ `fills` empty
//! - `quantity >= 0` always (side carries the direction, not the sign)
//! - the stop, while open, only ever ratchets in the position's favor

use crate::domain::fill::Fill;
use crate::domain::signal::Side;
use serde::{Deserialize, Serialize};

/// Open position state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: Side,
    /// Entry and add fills of the current cycle, in order.
    pub fills: Vec<Fill>,
    /// Aggregate quantity, always non-negative.
    pub quantity: f64,
    /// Volume-weighted average entry price across all fills.
    pub avg_entry_price: f64,
    /// Current protective stop. `None` only while Flat.
    pub stop: Option<f64>,
    /// Highest price seen since entry (trailing anchor for longs).
    pub highest_price_since_entry: f64,
    /// Lowest price seen since entry (trailing anchor for shorts).
    pub lowest_price_since_entry: f64,
    /// Number of pyramid adds so far this cycle.
    pub pyramid_level: u32,
    /// Price level that triggered the most recent entry/add. The next add
    /// requires a further favorable step from here; a retrace through it
    /// closes the add window for the rest of the cycle.
    pub last_add_trigger: f64,
    /// Set once price retraces through `last_add_trigger`; no further adds.
    pub adds_blocked: bool,
    /// Whether the trailing stop has armed (profit exceeded activation).
    pub trailing_armed: bool,
    /// Cumulative risk committed at entry and adds: Σ qty × stop distance.
    pub committed_risk: f64,
    /// Equity snapshot at entry; the risk cap is relative to this, so later
    /// equity swings cannot retroactively widen the budget.
    pub equity_at_entry: f64,
    /// Realized P&L accumulated over completed cycles, net of fees.
    pub realized_pnl: f64,
}

impl Position {
    /// A fresh Flat position for `symbol`.
    pub fn flat(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            side: Side::Flat,
            fills: Vec::new(),
            quantity: 0.0,
            avg_entry_price: 0.0,
            stop: None,
            highest_price_since_entry: 0.0,
            lowest_price_since_entry: 0.0,
            pyramid_level: 0,
            last_add_trigger: 0.0,
            adds_blocked: false,
            trailing_armed: false,
            committed_risk: 0.0,
            equity_at_entry: 0.0,
            realized_pnl: 0.0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.side == Side::Flat
    }

    /// Open the position from the first entry fill.
    pub fn open(&mut self, side: Side, fill: Fill, stop: f64, risk: f64, equity_at_entry: f64) {
        debug_assert!(self.is_flat(), "open() requires a Flat position");
        debug_assert!(side != Side::Flat, "cannot open a Flat side");

        self.side = side;
        self.quantity = fill.quantity;
        self.avg_entry_price = fill.price;
        self.stop = Some(stop);
        self.highest_price_since_entry = fill.price;
        self.lowest_price_since_entry = fill.price;
        self.pyramid_level = 0;
        self.last_add_trigger = fill.price;
        self.adds_blocked = false;
        self.trailing_armed = false;
        self.committed_risk = risk;
        self.equity_at_entry = equity_at_entry;
        self.fills.push(fill);
    }

    /// Apply a pyramid-add fill: recompute the VWAP entry, bump the level,
    /// and account the incremental risk.
    pub fn apply_add(&mut self, fill: Fill, incremental_risk: f64) {
        debug_assert!(!self.is_flat(), "apply_add() requires an open position");

        let new_qty = self.quantity + fill.quantity;
        self.avg_entry_price =
            (self.avg_entry_price * self.quantity + fill.price * fill.quantity) / new_qty;
        self.quantity = new_qty;
        self.pyramid_level += 1;
        self.last_add_trigger = fill.price;
        self.committed_risk += incremental_risk;
        self.fills.push(fill);
    }

    /// Record a mark-to-market price, updating the favorable extremes.
    pub fn update_mark(&mut self, price: f64) {
        if self.is_flat() {
            return;
        }
        if price > self.highest_price_since_entry {
            self.highest_price_since_entry = price;
        }
        if price < self.lowest_price_since_entry {
            self.lowest_price_since_entry = price;
        }
    }

    /// Unrealized P&L at `price`, before fees.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        match self.side {
            Side::Long => (price - self.avg_entry_price) * self.quantity,
            Side::Short => (self.avg_entry_price - price) * self.quantity,
            Side::Flat => 0.0,
        }
    }

    /// Signed fractional move from the VWAP entry, positive = favorable.
    pub fn favorable_move_pct(&self, price: f64) -> f64 {
        if self.is_flat() || self.avg_entry_price == 0.0 {
            return 0.0;
        }
        match self.side {
            Side::Long => (price - self.avg_entry_price) / self.avg_entry_price,
            Side::Short => (self.avg_entry_price - price) / self.avg_entry_price,
            Side::Flat => 0.0,
        }
    }

    /// Close the full position with the exit fill. Returns the cycle's
    /// realized P&L net of every fee paid (entries, adds, exit), and resets
    /// the position to a fresh Flat state.
    pub fn close(&mut self, exit_fill: Fill) -> f64 {
        debug_assert!(!self.is_flat(), "close() requires an open position");

        let gross = match self.side {
            Side::Long => (exit_fill.price - self.avg_entry_price) * self.quantity,
            Side::Short => (self.avg_entry_price - exit_fill.price) * self.quantity,
            Side::Flat => 0.0,
        };
        let entry_fees: f64 = self.fills.iter().map(|f| f.fee).sum();
        let pnl = gross - entry_fees - exit_fill.fee;

        let realized_total = self.realized_pnl + pnl;
        let symbol = std::mem::take(&mut self.symbol);
        *self = Position::flat(symbol);
        self.realized_pnl = realized_total;

        pnl
    }

    /// Check the Flat ⇔ qty == 0 ⇔ fills-empty invariant.
    pub fn invariant_holds(&self) -> bool {
        let flat = self.side == Side::Flat;
        let zero_qty = self.quantity == 0.0;
        let no_fills = self.fills.is_empty();
        self.quantity >= 0.0 && flat == zero_qty && flat == no_fills
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{ClientOrderId, OrderSide};
    use chrono::{TimeZone, Utc};

    fn make_fill(side: OrderSide, price: f64, quantity: f64, fee: f64) -> Fill {
        Fill {
            order_id: ClientOrderId(1),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            symbol: "BTCUSDT".into(),
            side,
            price,
            quantity,
            fee,
        }
    }

    #[test]
    fn fresh_position_is_flat_and_invariant_holds() {
        let pos = Position::flat("BTCUSDT");
        assert!(pos.is_flat());
        assert!(pos.invariant_holds());
    }

    #[test]
    fn open_long_initializes_tracking() {
        let mut pos = Position::flat("BTCUSDT");
        pos.open(
            Side::Long,
            make_fill(OrderSide::Buy, 100.0, 2.0, 0.2),
            95.0,
            10.0,
            10_000.0,
        );
        assert_eq!(pos.side, Side::Long);
        assert_eq!(pos.quantity, 2.0);
        assert_eq!(pos.avg_entry_price, 100.0);
        assert_eq!(pos.stop, Some(95.0));
        assert_eq!(pos.highest_price_since_entry, 100.0);
        assert_eq!(pos.last_add_trigger, 100.0);
        assert!(pos.invariant_holds());
    }

    #[test]
    fn add_recomputes_vwap_and_level() {
        let mut pos = Position::flat("BTCUSDT");
        pos.open(
            Side::Long,
            make_fill(OrderSide::Buy, 100.0, 2.0, 0.0),
            95.0,
            10.0,
            10_000.0,
        );
        pos.apply_add(make_fill(OrderSide::Buy, 110.0, 1.0, 0.0), 5.0);

        // VWAP = (100*2 + 110*1) / 3 = 103.333...
        assert!((pos.avg_entry_price - 310.0 / 3.0).abs() < 1e-9);
        assert_eq!(pos.quantity, 3.0);
        assert_eq!(pos.pyramid_level, 1);
        assert_eq!(pos.last_add_trigger, 110.0);
        assert_eq!(pos.committed_risk, 15.0);
    }

    #[test]
    fn mark_updates_extremes() {
        let mut pos = Position::flat("BTCUSDT");
        pos.open(
            Side::Long,
            make_fill(OrderSide::Buy, 100.0, 1.0, 0.0),
            95.0,
            5.0,
            10_000.0,
        );
        pos.update_mark(108.0);
        pos.update_mark(97.0);
        pos.update_mark(104.0);
        assert_eq!(pos.highest_price_since_entry, 108.0);
        assert_eq!(pos.lowest_price_since_entry, 97.0);
    }

    #[test]
    fn close_realizes_pnl_net_of_fees() {
        let mut pos = Position::flat("BTCUSDT");
        pos.open(
            Side::Long,
            make_fill(OrderSide::Buy, 100.0, 2.0, 0.2),
            95.0,
            10.0,
            10_000.0,
        );
        let pnl = pos.close(make_fill(OrderSide::Sell, 110.0, 2.0, 0.22));
        // gross 20.0, fees 0.42
        assert!((pnl - 19.58).abs() < 1e-9);
        assert!(pos.is_flat());
        assert!(pos.invariant_holds());
        assert!((pos.realized_pnl - 19.58).abs() < 1e-9);
    }

    #[test]
    fn round_trip_same_price_zero_fee_is_zero_pnl() {
        let mut pos = Position::flat("BTCUSDT");
        pos.open(
            Side::Long,
            make_fill(OrderSide::Buy, 100.0, 1.5, 0.0),
            95.0,
            7.5,
            10_000.0,
        );
        let pnl = pos.close(make_fill(OrderSide::Sell, 100.0, 1.5, 0.0));
        assert_eq!(pnl, 0.0);
    }

    #[test]
    fn short_pnl_profits_from_falling_price() {
        let mut pos = Position::flat("BTCUSDT");
        pos.open(
            Side::Short,
            make_fill(OrderSide::Sell, 100.0, 1.0, 0.0),
            105.0,
            5.0,
            10_000.0,
        );
        assert_eq!(pos.unrealized_pnl(90.0), 10.0);
        assert!((pos.favorable_move_pct(90.0) - 0.1).abs() < 1e-12);
        let pnl = pos.close(make_fill(OrderSide::Buy, 90.0, 1.0, 0.0));
        assert_eq!(pnl, 10.0);
    }

    #[test]
    fn realized_pnl_accumulates_across_cycles() {
        let mut pos = Position::flat("BTCUSDT");
        pos.open(
            Side::Long,
            make_fill(OrderSide::Buy, 100.0, 1.0, 0.0),
            95.0,
            5.0,
            10_000.0,
        );
        pos.close(make_fill(OrderSide::Sell, 105.0, 1.0, 0.0));
        pos.open(
            Side::Long,
            make_fill(OrderSide::Buy, 105.0, 1.0, 0.0),
            100.0,
            5.0,
            10_000.0,
        );
        pos.close(make_fill(OrderSide::Sell, 103.0, 1.0, 0.0));
        assert!((pos.realized_pnl - 3.0).abs() < 1e-9);
    }
}

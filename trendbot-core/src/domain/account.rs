//! AccountState — cash and equity, updated on fills and mark-to-market ticks.

use crate::domain::fill::Fill;
use crate::domain::order::OrderSide;
use crate::domain::position::Position;
use serde::{Deserialize, Serialize};

/// The engine's view of account funds.
///
/// Cash moves with every fill (buys debit cost + fee, sells credit proceeds
/// minus fee); equity is cash plus the open position's market value. Shorts
/// are modeled as short sales: the entry sell credits cash and the closing
/// buy debits it, so the equity identity holds for both sides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountState {
    pub cash: f64,
    pub starting_balance: f64,
}

impl AccountState {
    pub fn new(starting_balance: f64) -> Self {
        Self {
            cash: starting_balance,
            starting_balance,
        }
    }

    /// Apply a fill to cash.
    pub fn apply_fill(&mut self, fill: &Fill) {
        match fill.side {
            OrderSide::Buy => self.cash -= fill.notional() + fill.fee,
            OrderSide::Sell => self.cash += fill.notional() - fill.fee,
        }
    }

    /// Equity = cash + signed market value of the open position.
    pub fn equity(&self, position: &Position, price: f64) -> f64 {
        use crate::domain::signal::Side;
        match position.side {
            Side::Long => self.cash + position.quantity * price,
            Side::Short => self.cash - position.quantity * price,
            Side::Flat => self.cash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::ClientOrderId;
    use crate::domain::signal::Side;
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
    fn buy_debits_cost_plus_fee() {
        let mut acct = AccountState::new(1_000.0);
        acct.apply_fill(&make_fill(OrderSide::Buy, 100.0, 2.0, 0.2));
        assert!((acct.cash - 799.8).abs() < 1e-9);
    }

    #[test]
    fn sell_credits_proceeds_minus_fee() {
        let mut acct = AccountState::new(1_000.0);
        acct.apply_fill(&make_fill(OrderSide::Sell, 100.0, 2.0, 0.2));
        assert!((acct.cash - 1_199.8).abs() < 1e-9);
    }

    #[test]
    fn long_equity_identity() {
        let mut acct = AccountState::new(1_000.0);
        let mut pos = Position::flat("BTCUSDT");
        let fill = make_fill(OrderSide::Buy, 100.0, 2.0, 0.0);
        acct.apply_fill(&fill);
        pos.open(Side::Long, fill, 95.0, 10.0, 1_000.0);

        // cash 800 + 2 * 110 = 1020
        assert!((acct.equity(&pos, 110.0) - 1_020.0).abs() < 1e-9);
    }

    #[test]
    fn short_equity_identity() {
        let mut acct = AccountState::new(1_000.0);
        let mut pos = Position::flat("BTCUSDT");
        let fill = make_fill(OrderSide::Sell, 100.0, 2.0, 0.0);
        acct.apply_fill(&fill);
        pos.open(Side::Short, fill, 105.0, 10.0, 1_000.0);

        // cash 1200 - 2 * 90 = 1020: short gains as price falls
        assert!((acct.equity(&pos, 90.0) - 1_020.0).abs() < 1e-9);
    }
}

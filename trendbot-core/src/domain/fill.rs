//! Fill — the result of an executed order request.

use crate::domain::order::{ClientOrderId, OrderSide};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fill record returned by the execution gateway.
///
/// Paper fills are always complete (no partials); fee is
/// `quantity * price * taker_fee_rate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: ClientOrderId,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub side: OrderSide,
    pub price: f64,
    pub quantity: f64,
    pub fee: f64,
}

impl Fill {
    /// Notional value of the fill.
    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fill_notional() {
        let fill = Fill {
            order_id: ClientOrderId(1),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            symbol: "BTCUSDT".into(),
            side: OrderSide::Buy,
            price: 100.0,
            quantity: 0.5,
            fee: 0.05,
        };
        assert_eq!(fill.notional(), 50.0);
    }
}

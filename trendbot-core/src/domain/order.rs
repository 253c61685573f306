//! Order requests and client-assigned correlation ids.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Buy/sell direction of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Order pricing behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrderType {
    /// Fill at the current reference price (plus simulated slippage in paper mode).
    Market,
    /// Fill at the limit price or better.
    Limit { limit_price: f64 },
}

/// Client-assigned correlation id, monotonic per engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientOrderId(pub u64);

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cid-{}", self.0)
    }
}

/// Monotonic id generator for order correlation ids.
#[derive(Debug, Default)]
pub struct IdGen {
    next: u64,
}

impl IdGen {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_order_id(&mut self) -> ClientOrderId {
        let id = ClientOrderId(self.next);
        self.next += 1;
        id
    }
}

/// An order request handed to the execution gateway.
///
/// Never mutated after creation; the gateway consumes it exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub id: ClientOrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: f64,
    /// Reference price at decision time. Paper fills derive from this.
    pub reference_price: f64,
    /// Bar timestamp at decision time, echoed into the paper fill.
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl OrderRequest {
    pub fn market(
        id: ClientOrderId,
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: f64,
        reference_price: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            reference_price,
            timestamp,
        }
    }

    /// Notional value at the reference price.
    pub fn notional(&self) -> f64 {
        self.quantity * self.reference_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_gen_is_monotonic() {
        let mut gen = IdGen::new();
        let a = gen.next_order_id();
        let b = gen.next_order_id();
        assert!(b.0 > a.0);
    }

    #[test]
    fn market_order_notional() {
        let ts = chrono::Utc::now();
        let req = OrderRequest::market(ClientOrderId(1), "BTCUSDT", OrderSide::Buy, 2.0, 50.0, ts);
        assert_eq!(req.notional(), 100.0);
        assert_eq!(req.order_type, OrderType::Market);
    }

    #[test]
    fn order_serialization_roundtrip() {
        let req = OrderRequest {
            id: ClientOrderId(7),
            symbol: "ETHUSDT".into(),
            side: OrderSide::Sell,
            order_type: OrderType::Limit { limit_price: 99.5 },
            quantity: 3.0,
            reference_price: 100.0,
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_string(&req).unwrap();
        let deser: OrderRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req.id, deser.id);
        assert_eq!(req.quantity, deser.quantity);
    }
}

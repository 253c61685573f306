//! Instrument metadata — exchange-reported step sizes and minimums.

use serde::{Deserialize, Serialize};

/// Trading constraints for one symbol.
///
/// In live mode these come from exchange metadata; in paper mode from
/// configuration. The risk sizer floors quantities to `qty_step` and rejects
/// orders below `min_notional`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    /// Quantity step size (lot size). Quantities are floored to a multiple.
    pub qty_step: f64,
    /// Minimum order notional accepted by the exchange.
    pub min_notional: f64,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, qty_step: f64, min_notional: f64) -> Self {
        assert!(qty_step > 0.0, "qty_step must be positive");
        assert!(min_notional >= 0.0, "min_notional must be non-negative");
        Self {
            symbol: symbol.into(),
            qty_step,
            min_notional,
        }
    }

    /// Floor a raw quantity to the nearest step multiple. Never rounds up.
    pub fn floor_to_step(&self, quantity: f64) -> f64 {
        if quantity <= 0.0 {
            return 0.0;
        }
        (quantity / self.qty_step).floor() * self.qty_step
    }
}

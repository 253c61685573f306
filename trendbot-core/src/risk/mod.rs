//! Risk sizing — converts equity, risk budget, and stop distance into order
//! quantity.
//!
//! The sizer never rounds up: quantities are floored to the instrument's step
//! size so a fill can never exceed the configured risk budget. Pyramid adds
//! draw a reduced fraction from whatever budget the open position has left.

use crate::domain::Instrument;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from sizing. All are recoverable at the call site: the position
/// manager skips the entry or add, counts the event, and carries on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    #[error("invalid stop distance: entry {entry} == stop {stop}")]
    InvalidStopDistance { entry: f64, stop: f64 },

    #[error("sized quantity {quantity} below exchange minimum (notional {notional:.2} < {min_notional:.2})")]
    QuantityBelowMinimum {
        quantity: f64,
        notional: f64,
        min_notional: f64,
    },

    #[error("risk budget exceeded: committed {committed:.2} of cap {cap:.2}")]
    RiskBudgetExceeded { committed: f64, cap: f64 },
}

/// Risk-based position sizer.
///
/// # Formula
/// ```text
/// risk_amount  = equity * risk_fraction
/// raw_quantity = risk_amount / |entry - stop|
/// quantity     = floor_to_step(raw_quantity)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSizer {
    pub instrument: Instrument,
}

impl RiskSizer {
    pub fn new(instrument: Instrument) -> Self {
        Self { instrument }
    }

    /// Size an initial entry.
    pub fn size_entry(
        &self,
        equity: f64,
        entry_price: f64,
        stop_price: f64,
        risk_fraction: f64,
    ) -> Result<f64, RiskError> {
        let risk_amount = equity * risk_fraction;
        self.size_for_risk(risk_amount, entry_price, stop_price)
    }

    /// Size a pyramid add against the position's remaining risk budget.
    ///
    /// `cap` is `risk_per_trade * equity-at-entry`; `committed` is the risk
    /// already locked in by the entry and prior adds. The add draws
    /// `add_fraction` of whatever remains, so total committed risk can never
    /// breach the single-trade cap.
    pub fn size_add(
        &self,
        cap: f64,
        committed: f64,
        entry_price: f64,
        stop_price: f64,
        add_fraction: f64,
    ) -> Result<f64, RiskError> {
        let remaining = cap - committed;
        if remaining <= 0.0 {
            return Err(RiskError::RiskBudgetExceeded { committed, cap });
        }
        let risk_amount = remaining * add_fraction;
        let quantity = self.size_for_risk(risk_amount, entry_price, stop_price)?;

        // Flooring only shrinks quantity, but guard the cap explicitly.
        let incremental = quantity * (entry_price - stop_price).abs();
        if committed + incremental > cap * (1.0 + 1e-9) {
            return Err(RiskError::RiskBudgetExceeded { committed, cap });
        }
        Ok(quantity)
    }

    fn size_for_risk(
        &self,
        risk_amount: f64,
        entry_price: f64,
        stop_price: f64,
    ) -> Result<f64, RiskError> {
        let distance = (entry_price - stop_price).abs();
        if distance == 0.0 || !distance.is_finite() {
            return Err(RiskError::InvalidStopDistance {
                entry: entry_price,
                stop: stop_price,
            });
        }

        let raw = risk_amount / distance;
        let quantity = self.instrument.floor_to_step(raw);
        let notional = quantity * entry_price;

        if quantity <= 0.0 || notional < self.instrument.min_notional {
            return Err(RiskError::QuantityBelowMinimum {
                quantity,
                notional,
                min_notional: self.instrument.min_notional,
            });
        }
        Ok(quantity)
    }
}

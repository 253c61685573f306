//! Execution gateway — the seam between the engine and order execution.
//!
//! One capability interface with two implementations chosen at startup by
//! configuration: the in-process paper simulator (here) and a thin live
//! exchange adapter (out of scope for this crate). The engine only ever
//! talks through the trait, so paper vs live is a wiring decision, not a
//! runtime type check.

pub mod paper;

pub use paper::{PaperConfig, PaperGateway};

use crate::domain::{ClientOrderId, Fill, OrderRequest};
use thiserror::Error;

/// Errors from order execution.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Paper mode: order notional plus fee exceeds simulated cash.
    #[error("insufficient simulated balance: need {required:.2}, have {available:.2}")]
    InsufficientSimulatedBalance { required: f64, available: f64 },

    /// The venue refused the order.
    #[error("order rejected: {reason}")]
    Rejected { reason: String },

    /// The call did not complete in bounded time. The caller must re-query
    /// state before retrying — an unacknowledged order may still have filled.
    #[error("gateway call timed out")]
    Timeout,
}

/// Order execution capability.
///
/// Implementations must fill completely or fail; the engine does not handle
/// partial fills.
pub trait ExecutionGateway {
    /// Submit an order, returning its fill.
    fn submit(&mut self, request: &OrderRequest) -> Result<Fill, GatewayError>;

    /// Cancel a working order. Returns true if an order was actually cancelled.
    fn cancel(&mut self, order_id: ClientOrderId) -> Result<bool, GatewayError>;

    /// All orders submitted but not yet acknowledged as filled or cancelled.
    /// Used on shutdown: the engine never exits with a dangling order.
    fn query_open_orders(&self) -> Result<Vec<OrderRequest>, GatewayError>;
}

//! Paper trading simulator — fills at the reference price with slippage and
//! taker fees against a simulated cash balance.

use crate::domain::{ClientOrderId, Fill, OrderRequest, OrderSide, OrderType};
use crate::gateway::{ExecutionGateway, GatewayError};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Paper simulator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    pub starting_balance: f64,
    /// Taker fee as a fraction of notional (e.g. 0.001 = 10 bps).
    pub taker_fee_rate: f64,
    /// Fill slippage in basis points, applied against the order direction.
    pub slippage_bps: f64,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            starting_balance: 5_000.0,
            taker_fee_rate: 0.001,
            slippage_bps: 0.0,
        }
    }
}

/// In-process execution simulator.
///
/// Market orders fill fully at the request's reference price adjusted by
/// slippage (buys pay up, sells receive less); limit orders fill at their
/// limit price. Fee is `quantity * price * taker_fee_rate`. The only failure
/// is `InsufficientSimulatedBalance` on a buy whose cost plus fee exceeds
/// simulated cash. No resting orders exist, so `query_open_orders` is always
/// empty and `cancel` finds nothing.
#[derive(Debug, Clone)]
pub struct PaperGateway {
    config: PaperConfig,
    cash: f64,
    /// Signed base-asset inventory (negative while short).
    inventory: f64,
}

impl PaperGateway {
    pub fn new(config: PaperConfig) -> Self {
        let cash = config.starting_balance;
        Self {
            config,
            cash,
            inventory: 0.0,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn inventory(&self) -> f64 {
        self.inventory
    }

    fn fill_price(&self, request: &OrderRequest) -> f64 {
        match request.order_type {
            OrderType::Limit { limit_price } => limit_price,
            OrderType::Market => {
                let slip = self.config.slippage_bps / 10_000.0;
                match request.side {
                    OrderSide::Buy => request.reference_price * (1.0 + slip),
                    OrderSide::Sell => request.reference_price * (1.0 - slip),
                }
            }
        }
    }
}

impl ExecutionGateway for PaperGateway {
    fn submit(&mut self, request: &OrderRequest) -> Result<Fill, GatewayError> {
        let price = self.fill_price(request);
        let notional = request.quantity * price;
        let fee = notional * self.config.taker_fee_rate;

        match request.side {
            OrderSide::Buy => {
                let required = notional + fee;
                if required > self.cash {
                    return Err(GatewayError::InsufficientSimulatedBalance {
                        required,
                        available: self.cash,
                    });
                }
                self.cash -= required;
                self.inventory += request.quantity;
            }
            OrderSide::Sell => {
                self.cash += notional - fee;
                self.inventory -= request.quantity;
            }
        }

        info!(
            order_id = %request.id,
            symbol = %request.symbol,
            side = ?request.side,
            qty = request.quantity,
            price,
            fee,
            "paper fill"
        );

        Ok(Fill {
            order_id: request.id,
            timestamp: request.timestamp,
            symbol: request.symbol.clone(),
            side: request.side,
            price,
            quantity: request.quantity,
            fee,
        })
    }

    fn cancel(&mut self, _order_id: ClientOrderId) -> Result<bool, GatewayError> {
        // Paper fills are immediate; there is never a resting order to cancel.
        Ok(false)
    }

    fn query_open_orders(&self) -> Result<Vec<OrderRequest>, GatewayError> {
        Ok(Vec::new())
    }
}

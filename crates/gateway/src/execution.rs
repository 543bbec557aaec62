//! Execution boundary port
//!
//! The engine never talks to a venue directly. Everything outbound goes
//! through this trait: cancel the symbol's resting quotes, then place a
//! batch of PostOnly limits. Acknowledgement is not awaited by the quoting
//! loop; results come back through `ExecutionReport`s in the runner and the
//! order feed.

use crate::error::GatewayError;
use crate::messages::order::OrderRequest;
use async_trait::async_trait;

#[async_trait]
pub trait ExecutionBoundary: Send + Sync {
    /// Cancel every open order for `symbol`
    async fn cancel_all(&self, symbol: &str) -> Result<(), GatewayError>;

    /// Place a batch of orders
    async fn create_batch(&self, orders: Vec<OrderRequest>) -> Result<(), GatewayError>;

    /// Adapter name for logging
    fn name(&self) -> &str {
        "ExecutionBoundary"
    }
}

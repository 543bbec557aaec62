//! Outbound order message types

use keel_core::{Price, Quantity, Side};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderTypeWire {
    Limit,
    Market,
}

/// Time in force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForceWire {
    /// Good Till Cancelled
    #[serde(rename = "GTC")]
    Gtc,
    /// Immediate Or Cancel
    #[serde(rename = "IOC")]
    Ioc,
    /// Fill Or Kill
    #[serde(rename = "FOK")]
    Fok,
    /// Rejected by the venue instead of executing as taker
    PostOnly,
}

/// Single order in a batch create request
///
/// Decimals serialize as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderTypeWire,
    pub qty: Quantity,
    pub price: Price,
    pub time_in_force: TimeInForceWire,
    /// Client-assigned id for correlating order feed updates
    pub order_link_id: String,
}

impl OrderRequest {
    /// Maker-only limit order with a fresh link id
    pub fn post_only(symbol: impl Into<String>, side: Side, qty: Quantity, price: Price) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderTypeWire::Limit,
            qty,
            price,
            time_in_force: TimeInForceWire::PostOnly,
            order_link_id: Uuid::new_v4().to_string(),
        }
    }
}

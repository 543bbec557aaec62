//! Account-side feed messages: position, wallet, order status, funding

use super::decimal_str;
use keel_core::{Position, Price, Side, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Position feed entry. Size is unsigned on the wire; `side` carries the
/// direction and is empty when flat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionMessage {
    pub symbol: String,
    #[serde(default)]
    pub side: String,
    #[serde(deserialize_with = "decimal_str")]
    pub size: Decimal,
    #[serde(alias = "positionValue", default, deserialize_with = "decimal_str")]
    pub notional_value: Decimal,
    #[serde(alias = "avgPrice", default, deserialize_with = "decimal_str")]
    pub avg_entry_price: Price,
}

impl PositionMessage {
    pub fn side(&self) -> Option<Side> {
        match self.side.as_str() {
            "Buy" => Some(Side::Buy),
            "Sell" => Some(Side::Sell),
            _ => None,
        }
    }

    pub fn to_position(&self, received_at: Timestamp) -> Position {
        Position::from_feed(
            self.symbol.clone(),
            self.side(),
            self.size,
            self.notional_value,
            self.avg_entry_price,
            received_at,
        )
    }
}

/// Wallet balance for one coin
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletMessage {
    pub coin: String,
    #[serde(deserialize_with = "decimal_str")]
    pub wallet_balance: Decimal,
}

/// Order status as reported by the order feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatusWire {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
    Deactivated,
    #[serde(other)]
    Unknown,
}

impl OrderStatusWire {
    /// No longer resting on the book
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Cancelled | Self::Rejected | Self::Deactivated
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdateMessage {
    pub symbol: String,
    pub side: Side,
    #[serde(deserialize_with = "decimal_str")]
    pub price: Price,
    pub order_status: OrderStatusWire,
    #[serde(default)]
    pub order_link_id: Option<String>,
    #[serde(default)]
    pub reject_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingMessage {
    pub symbol: String,
    #[serde(deserialize_with = "decimal_str")]
    pub funding_rate: Decimal,
}

//! Order-book feed messages
//!
//! `FeedMessage` is the raw wire shape (`type`, `updateId`, `b`, `a`).
//! Levels are kept as raw JSON until [`FeedMessage::into_update`] so a bad
//! level can be dropped on its own instead of failing the whole message.

use crate::error::{FeedError, MalformedLevel};
use keel_core::{Price, Quantity, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Order book level (price + quantity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub quantity: Quantity,
}

impl BookLevel {
    /// Create a new book level
    pub fn new(price: Price, quantity: Quantity) -> Self {
        Self { price, quantity }
    }

    /// Check if this level should be removed (quantity == 0)
    pub fn is_removed(&self) -> bool {
        self.quantity.is_zero()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Snapshot,
    Delta,
}

/// Raw order-book message as it arrives on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedMessage {
    #[serde(rename = "type")]
    pub kind: FeedKind,
    #[serde(alias = "u")]
    pub update_id: u64,
    #[serde(default, alias = "s", skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default)]
    pub b: Vec<Value>,
    #[serde(default)]
    pub a: Vec<Value>,
}

/// Parsed update plus the levels that were skipped
#[derive(Debug, Clone)]
pub struct ParsedUpdate {
    pub update: OrderBookUpdate,
    pub rejected: Vec<MalformedLevel>,
}

impl FeedMessage {
    /// Parse into a typed update for `symbol`.
    ///
    /// Fails only when the message names a different symbol; malformed
    /// levels are collected in [`ParsedUpdate::rejected`].
    pub fn into_update(
        self,
        symbol: &str,
        received_at: Timestamp,
    ) -> Result<ParsedUpdate, FeedError> {
        if let Some(got) = self.symbol.as_deref() {
            if got != symbol {
                return Err(FeedError::SymbolMismatch {
                    expected: symbol.to_string(),
                    got: got.to_string(),
                    update_id: self.update_id,
                });
            }
        }

        let mut rejected = Vec::new();
        let bids = parse_levels(&self.b, symbol, self.update_id, &mut rejected);
        let asks = parse_levels(&self.a, symbol, self.update_id, &mut rejected);

        let update = match self.kind {
            FeedKind::Snapshot => {
                OrderBookUpdate::snapshot(symbol, bids, asks, self.update_id, received_at)
            }
            FeedKind::Delta => {
                OrderBookUpdate::delta(symbol, bids, asks, self.update_id, received_at)
            }
        };
        Ok(ParsedUpdate { update, rejected })
    }
}

fn parse_levels(
    raw: &[Value],
    symbol: &str,
    update_id: u64,
    rejected: &mut Vec<MalformedLevel>,
) -> Vec<BookLevel> {
    let mut levels = Vec::with_capacity(raw.len());
    for value in raw {
        match parse_level(value) {
            Ok(level) => levels.push(level),
            Err(reason) => rejected.push(MalformedLevel {
                symbol: symbol.to_string(),
                update_id,
                fragment: value.to_string(),
                reason,
            }),
        }
    }
    levels
}

fn parse_level(value: &Value) -> Result<BookLevel, &'static str> {
    let pair = value.as_array().ok_or("level is not an array")?;
    if pair.len() != 2 {
        return Err("expected [price, qty]");
    }
    let price = parse_decimal(&pair[0])?;
    let quantity = parse_decimal(&pair[1])?;
    if price <= Decimal::ZERO {
        return Err("non-positive price");
    }
    if quantity < Decimal::ZERO {
        return Err("negative quantity");
    }
    Ok(BookLevel::new(price, quantity))
}

fn parse_decimal(value: &Value) -> Result<Decimal, &'static str> {
    let text = value.as_str().ok_or("value is not a decimal string")?;
    Decimal::from_str(text.trim()).map_err(|_| "unparsable decimal")
}

/// Order book update message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderBookUpdate {
    /// Full snapshot of the order book
    Snapshot {
        symbol: String,
        bids: Vec<BookLevel>,
        asks: Vec<BookLevel>,
        update_id: u64,
        received_at: Timestamp,
    },
    /// Incremental update (delta)
    Delta {
        symbol: String,
        /// Changed bid levels (qty=0 means remove level)
        bids: Vec<BookLevel>,
        /// Changed ask levels (qty=0 means remove level)
        asks: Vec<BookLevel>,
        update_id: u64,
        received_at: Timestamp,
    },
}

impl OrderBookUpdate {
    /// Create a new snapshot update
    pub fn snapshot(
        symbol: impl Into<String>,
        bids: Vec<BookLevel>,
        asks: Vec<BookLevel>,
        update_id: u64,
        received_at: Timestamp,
    ) -> Self {
        Self::Snapshot {
            symbol: symbol.into(),
            bids,
            asks,
            update_id,
            received_at,
        }
    }

    /// Create a new delta update
    pub fn delta(
        symbol: impl Into<String>,
        bids: Vec<BookLevel>,
        asks: Vec<BookLevel>,
        update_id: u64,
        received_at: Timestamp,
    ) -> Self {
        Self::Delta {
            symbol: symbol.into(),
            bids,
            asks,
            update_id,
            received_at,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Self::Snapshot { symbol, .. } | Self::Delta { symbol, .. } => symbol,
        }
    }

    pub fn update_id(&self) -> u64 {
        match self {
            Self::Snapshot { update_id, .. } | Self::Delta { update_id, .. } => *update_id,
        }
    }

    pub fn received_at(&self) -> Timestamp {
        match self {
            Self::Snapshot { received_at, .. } | Self::Delta { received_at, .. } => *received_at,
        }
    }

    pub fn bids(&self) -> &[BookLevel] {
        match self {
            Self::Snapshot { bids, .. } | Self::Delta { bids, .. } => bids,
        }
    }

    pub fn asks(&self) -> &[BookLevel] {
        match self {
            Self::Snapshot { asks, .. } | Self::Delta { asks, .. } => asks,
        }
    }

    /// Check if this is a snapshot
    pub fn is_snapshot(&self) -> bool {
        matches!(self, Self::Snapshot { .. })
    }
}

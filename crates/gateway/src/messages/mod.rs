//! Wire message types
//!
//! Every price and quantity arrives as a decimal string and is parsed into
//! an exact `Decimal`; binary floating point never touches the wire.

pub mod account;
pub mod instrument;
pub mod market_data;
pub mod order;

use crate::error::FeedError;
use account::{FundingMessage, OrderUpdateMessage, PositionMessage, WalletMessage};
use market_data::FeedMessage;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// One line of the inbound stream, tagged by topic
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "topic", content = "data", rename_all = "lowercase")]
pub enum InboundMessage {
    Orderbook(FeedMessage),
    Position(PositionMessage),
    Wallet(WalletMessage),
    Order(OrderUpdateMessage),
    Funding(FundingMessage),
}

impl InboundMessage {
    /// Decode a single JSON line
    pub fn from_json(line: &str) -> Result<Self, FeedError> {
        Ok(serde_json::from_str(line)?)
    }
}

/// Decimal carried as a string; an empty string reads as zero
pub(crate) fn decimal_str<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(trimmed).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decode_orderbook_envelope() {
        let line = r#"{"topic":"orderbook","data":{"type":"snapshot","updateId":7,"b":[["100.00","10"]],"a":[["100.02","8"]]}}"#;
        match InboundMessage::from_json(line).unwrap() {
            InboundMessage::Orderbook(msg) => {
                assert_eq!(msg.update_id, 7);
                assert_eq!(msg.b.len(), 1);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_decode_wallet_envelope() {
        let line = r#"{"topic":"wallet","data":{"coin":"USDT","walletBalance":"1000.5"}}"#;
        match InboundMessage::from_json(line).unwrap() {
            InboundMessage::Wallet(msg) => {
                assert_eq!(msg.coin, "USDT");
                assert_eq!(msg.wallet_balance, dec!(1000.5));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_topic_is_decode_error() {
        let line = r#"{"topic":"kline","data":{}}"#;
        assert!(matches!(
            InboundMessage::from_json(line),
            Err(FeedError::Decode(_))
        ));
    }
}

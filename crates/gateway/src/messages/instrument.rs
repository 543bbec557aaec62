//! Instrument metadata fetched once per session

use super::decimal_str;
use crate::error::FeedError;
use keel_core::{Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentInfo {
    pub symbol: String,
    #[serde(deserialize_with = "decimal_str")]
    pub tick_size: Price,
    #[serde(deserialize_with = "decimal_str")]
    pub qty_step: Quantity,
    #[serde(deserialize_with = "decimal_str")]
    pub min_order_qty: Quantity,
    #[serde(default = "default_leverage", deserialize_with = "decimal_str")]
    pub max_leverage: Decimal,
}

fn default_leverage() -> Decimal {
    Decimal::ONE
}

impl InstrumentInfo {
    pub fn from_json(json: &str) -> Result<Self, FeedError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            FeedError::Decode(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_json(&content)
    }
}

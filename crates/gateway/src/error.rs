//! Error types for the gateway crate

use thiserror::Error;

/// Execution boundary errors (order placement / cancellation)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Exchange error {code}: {message}")]
    Exchange { code: i64, message: String },

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Timeout waiting for response")]
    Timeout,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Channel closed")]
    ChannelClosed,
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Serialization(e.to_string())
    }
}

/// Inbound feed errors that drop a whole message
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    #[error("Failed to decode feed message: {0}")]
    Decode(String),

    #[error("[{expected}] update {update_id} addressed to {got}")]
    SymbolMismatch {
        expected: String,
        got: String,
        update_id: u64,
    },
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::Decode(e.to_string())
    }
}

/// A single price level that could not be parsed. Only the level is
/// dropped, the rest of the message is still applied.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("[{symbol}] malformed level in update {update_id} ({reason}): {fragment}")]
pub struct MalformedLevel {
    pub symbol: String,
    pub update_id: u64,
    pub fragment: String,
    pub reason: &'static str,
}

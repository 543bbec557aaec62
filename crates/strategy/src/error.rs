//! Order book errors

use keel_core::Price;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookError {
    #[error("[{symbol}] stale update {update_id} ignored (last applied {last_update_id})")]
    StaleUpdate {
        symbol: String,
        update_id: u64,
        last_update_id: u64,
    },

    #[error("[{symbol}] delta {update_id} received before any snapshot")]
    NotInitialized { symbol: String, update_id: u64 },

    #[error("[{symbol}] crossed book after update {update_id}: bid {best_bid} >= ask {best_ask}")]
    CrossedBook {
        symbol: String,
        update_id: u64,
        best_bid: Price,
        best_ask: Price,
    },

    #[error("[{symbol}] update {update_id} addressed to {got}")]
    WrongSymbol {
        symbol: String,
        update_id: u64,
        got: String,
    },
}

impl BookError {
    pub fn update_id(&self) -> u64 {
        match self {
            BookError::StaleUpdate { update_id, .. }
            | BookError::NotInitialized { update_id, .. }
            | BookError::CrossedBook { update_id, .. }
            | BookError::WrongSymbol { update_id, .. } => *update_id,
        }
    }

    /// Requires a fresh snapshot to recover
    pub fn needs_snapshot(&self) -> bool {
        matches!(self, BookError::NotInitialized { .. })
    }
}

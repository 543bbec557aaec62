use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::values::{Price, Quantity, Symbol};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpecError {
    #[error("[{symbol}] tick size must be positive, got {value}")]
    TickSize { symbol: Symbol, value: Decimal },

    #[error("[{symbol}] quantity step must be positive, got {value}")]
    QtyStep { symbol: Symbol, value: Decimal },

    #[error("[{symbol}] minimum quantity must not be negative, got {value}")]
    MinQty { symbol: Symbol, value: Decimal },

    #[error("[{symbol}] {field} must be positive, got {value}")]
    Limit {
        symbol: Symbol,
        field: &'static str,
        value: Decimal,
    },
}

/// Immutable per-session trading constraints for one symbol
///
/// Combines exchange instrument metadata (tick, step, minimum quantity,
/// leverage) with the session's risk limits. Quantization helpers follow
/// the conservative convention: bids round down, asks round up, sizes
/// round down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolSpec {
    pub symbol: Symbol,
    pub tick_size: Price,
    pub qty_step: Quantity,
    pub min_qty: Quantity,
    pub max_position_notional: Decimal,
    pub kill_switch_loss_notional: Decimal,
    pub max_leverage: Decimal,
}

impl SymbolSpec {
    /// Validated constructor
    pub fn new(
        symbol: impl Into<Symbol>,
        tick_size: Price,
        qty_step: Quantity,
        min_qty: Quantity,
        max_position_notional: Decimal,
        kill_switch_loss_notional: Decimal,
        max_leverage: Decimal,
    ) -> Result<Self, SpecError> {
        let spec = Self {
            symbol: symbol.into(),
            tick_size,
            qty_step,
            min_qty,
            max_position_notional,
            kill_switch_loss_notional,
            max_leverage,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), SpecError> {
        if self.tick_size <= Decimal::ZERO {
            return Err(SpecError::TickSize {
                symbol: self.symbol.clone(),
                value: self.tick_size,
            });
        }
        if self.qty_step <= Decimal::ZERO {
            return Err(SpecError::QtyStep {
                symbol: self.symbol.clone(),
                value: self.qty_step,
            });
        }
        if self.min_qty < Decimal::ZERO {
            return Err(SpecError::MinQty {
                symbol: self.symbol.clone(),
                value: self.min_qty,
            });
        }
        for (field, value) in [
            ("max position notional", self.max_position_notional),
            ("kill switch loss notional", self.kill_switch_loss_notional),
            ("max leverage", self.max_leverage),
        ] {
            if value <= Decimal::ZERO {
                return Err(SpecError::Limit {
                    symbol: self.symbol.clone(),
                    field,
                    value,
                });
            }
        }
        Ok(())
    }

    /// Validate that a price conforms to tick size
    pub fn validate_price(&self, price: Price) -> bool {
        if self.tick_size.is_zero() {
            return true;
        }
        (price % self.tick_size).is_zero()
    }

    /// Validate that a quantity conforms to the quantity step
    pub fn validate_quantity(&self, quantity: Quantity) -> bool {
        if self.qty_step.is_zero() {
            return true;
        }
        (quantity % self.qty_step).is_zero()
    }

    /// Round a price down to the nearest valid tick. None on overflow.
    pub fn round_price_down(&self, price: Price) -> Option<Price> {
        if self.tick_size.is_zero() {
            return Some(price);
        }
        price.checked_div(self.tick_size)?.floor().checked_mul(self.tick_size)
    }

    /// Round a price up to the nearest valid tick. None on overflow.
    pub fn round_price_up(&self, price: Price) -> Option<Price> {
        if self.tick_size.is_zero() {
            return Some(price);
        }
        price.checked_div(self.tick_size)?.ceil().checked_mul(self.tick_size)
    }

    /// Round a quantity down to the nearest step. None on overflow.
    pub fn round_quantity_down(&self, quantity: Quantity) -> Option<Quantity> {
        if self.qty_step.is_zero() {
            return Some(quantity);
        }
        quantity.checked_div(self.qty_step)?.floor().checked_mul(self.qty_step)
    }

    pub fn quantize_bid(&self, price: Price) -> Option<Price> {
        self.round_price_down(price).map(|p| p.normalize())
    }

    pub fn quantize_ask(&self, price: Price) -> Option<Price> {
        self.round_price_up(price).map(|p| p.normalize())
    }

    /// Round down to the step, never below the venue minimum
    pub fn quantize_qty(&self, quantity: Quantity) -> Option<Quantity> {
        self.round_quantity_down(quantity)
            .map(|q| q.max(self.min_qty).normalize())
    }
}

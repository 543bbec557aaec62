//! Position snapshot as reported by the exchange position feed.
//!
//! The engine never derives its own position from fills; it mirrors the
//! latest feed value so that inventory skew and exposure checks operate on
//! what the venue believes we hold.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::side::Side;
use crate::values::{Price, Quantity, Symbol, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    /// Signed size: positive long, negative short
    pub size: Quantity,
    /// Absolute notional in quote currency
    pub notional_value: Decimal,
    pub avg_entry_price: Price,
    pub updated_at: Option<Timestamp>,
}

impl Position {
    /// A flat position with no exposure
    pub fn flat(symbol: impl Into<Symbol>) -> Self {
        Self {
            symbol: symbol.into(),
            size: Decimal::ZERO,
            notional_value: Decimal::ZERO,
            avg_entry_price: Decimal::ZERO,
            updated_at: None,
        }
    }

    /// Build from an unsigned size plus direction, the way venues report it
    pub fn from_feed(
        symbol: impl Into<Symbol>,
        side: Option<Side>,
        size: Quantity,
        notional_value: Decimal,
        avg_entry_price: Price,
        updated_at: Timestamp,
    ) -> Self {
        let size = match side {
            Some(side) => size.abs() * side.sign(),
            None => Decimal::ZERO,
        };
        Self {
            symbol: symbol.into(),
            size,
            notional_value: notional_value.abs(),
            avg_entry_price,
            updated_at: Some(updated_at),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.size.is_zero()
    }

    pub fn side(&self) -> Option<Side> {
        if self.size > Decimal::ZERO {
            Some(Side::Buy)
        } else if self.size < Decimal::ZERO {
            Some(Side::Sell)
        } else {
            None
        }
    }

    /// Notional carrying the sign of the position
    pub fn signed_notional(&self) -> Decimal {
        match self.side() {
            Some(side) => self.notional_value.abs() * side.sign(),
            None => Decimal::ZERO,
        }
    }

    /// Signed notional as a fraction of `max_notional` (uncapped,
    /// saturating at the `Decimal` range)
    pub fn inventory_ratio(&self, max_notional: Decimal) -> Decimal {
        if max_notional <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let notional = self.signed_notional();
        notional
            .checked_div(max_notional)
            .unwrap_or(if notional.is_sign_negative() { Decimal::MIN } else { Decimal::MAX })
    }
}

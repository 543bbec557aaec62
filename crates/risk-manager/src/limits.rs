//! Risk limits for one symbol

use keel_core::SymbolSpec;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Absolute position notional cap (quote currency)
    pub max_position_notional: Decimal,
    /// Session loss that trips the kill switch (positive number)
    pub kill_switch_loss_notional: Decimal,
    /// Fraction of the cap at which the increasing side stops quoting
    pub near_cap_ratio: Decimal,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_notional: dec!(800),
            kill_switch_loss_notional: dec!(30),
            near_cap_ratio: dec!(0.9),
        }
    }
}

impl RiskLimits {
    pub fn from_spec(spec: &SymbolSpec, near_cap_ratio: Decimal) -> Self {
        Self {
            max_position_notional: spec.max_position_notional,
            kill_switch_loss_notional: spec.kill_switch_loss_notional,
            near_cap_ratio,
        }
    }
}

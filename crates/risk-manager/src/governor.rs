//! Risk Governor
//!
//! Owns the session equity and the ACTIVE/HALTED state for one symbol.
//! HALTED is terminal: there is no resume path, a new session is needed.

use crate::limits::RiskLimits;
use keel_core::{Equity, Position, Side, Symbol};
use log::{error, info, warn};
use rust_decimal::Decimal;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum HaltReason {
    /// Session PnL fell through the kill-switch loss
    KillSwitch { pnl: Decimal, limit: Decimal },
    /// Halted by the owner (shutdown, unrecoverable condition)
    Manual(String),
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::KillSwitch { pnl, limit } => {
                write!(f, "kill switch: session pnl {} < -{}", pnl, limit)
            }
            HaltReason::Manual(reason) => write!(f, "manual: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RiskState {
    Active,
    Halted(HaltReason),
}

/// Outcome of an exposure check for one side of a quote
#[derive(Debug, Clone, PartialEq)]
pub enum ExposureDecision {
    Allowed,
    Suppressed { projected: Decimal, cap: Decimal },
}

impl ExposureDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ExposureDecision::Allowed)
    }
}

pub struct RiskGovernor {
    symbol: Symbol,
    limits: RiskLimits,
    equity: Equity,
    state: RiskState,
}

impl RiskGovernor {
    pub fn new(symbol: impl Into<Symbol>, limits: RiskLimits) -> Self {
        Self {
            symbol: symbol.into(),
            limits,
            equity: Equity::new(),
            state: RiskState::Active,
        }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    pub fn equity(&self) -> &Equity {
        &self.equity
    }

    pub fn state(&self) -> &RiskState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, RiskState::Active)
    }

    pub fn session_pnl(&self) -> Decimal {
        self.equity.session_pnl()
    }

    /// Record a wallet balance and evaluate the kill switch.
    ///
    /// Returns the halt reason exactly once, on the ACTIVE -> HALTED
    /// transition, so the caller can issue a cancel-all.
    pub fn on_equity(&mut self, balance: Decimal) -> Option<HaltReason> {
        if self.equity.update(balance) {
            info!("[{}] [RISK] Session equity baseline {}", self.symbol, balance);
        }

        let pnl = self.equity.session_pnl();
        if pnl < -self.limits.kill_switch_loss_notional {
            let reason = HaltReason::KillSwitch {
                pnl,
                limit: self.limits.kill_switch_loss_notional,
            };
            if self.halt(reason.clone()) {
                return Some(reason);
            }
        }
        None
    }

    /// Halt quoting for the rest of the session. Returns true if this call
    /// performed the transition.
    pub fn halt(&mut self, reason: HaltReason) -> bool {
        if !self.is_active() {
            return false;
        }
        error!("[{}] [RISK] Trading halted: {}", self.symbol, reason);
        self.state = RiskState::Halted(reason);
        true
    }

    /// Check whether a quote of `proposed_notional` on `side` may be shown.
    ///
    /// The inventory-reducing side is always allowed. The increasing side is
    /// suppressed once the position sits at `near_cap_ratio` of the cap in
    /// that direction, or when the fill would take |position| past the cap.
    pub fn check_exposure(
        &self,
        position: &Position,
        side: Side,
        proposed_notional: Decimal,
    ) -> ExposureDecision {
        let cap = self.limits.max_position_notional;
        let current = position.signed_notional();
        let direction = side.sign();

        let reducing = current * direction < Decimal::ZERO;
        if reducing {
            return ExposureDecision::Allowed;
        }

        let projected = current.saturating_add(proposed_notional.abs() * direction);
        let near_cap = cap > Decimal::ZERO
            && current
                .abs()
                .checked_div(cap)
                .is_none_or(|ratio| ratio >= self.limits.near_cap_ratio);

        if near_cap || projected.abs() > cap {
            warn!(
                "[{}] [RISK] {} side suppressed: position {} projected {} cap {}",
                self.symbol,
                side.as_str(),
                current,
                projected,
                cap
            );
            return ExposureDecision::Suppressed { projected, cap };
        }
        ExposureDecision::Allowed
    }
}

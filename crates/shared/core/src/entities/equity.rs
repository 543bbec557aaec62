use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account equity in quote currency with its session baseline.
///
/// The baseline is captured from the first observed balance and is never
/// moved afterwards, so session PnL is always measured from session start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Equity {
    current: Decimal,
    session_baseline: Option<Decimal>,
}

impl Equity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new balance. Returns true if this update set the baseline.
    pub fn update(&mut self, balance: Decimal) -> bool {
        self.current = balance;
        if self.session_baseline.is_none() {
            self.session_baseline = Some(balance);
            return true;
        }
        false
    }

    pub fn current(&self) -> Decimal {
        self.current
    }

    pub fn session_baseline(&self) -> Option<Decimal> {
        self.session_baseline
    }

    pub fn is_known(&self) -> bool {
        self.session_baseline.is_some()
    }

    /// Session PnL (zero until the baseline is known)
    pub fn session_pnl(&self) -> Decimal {
        match self.session_baseline {
            Some(baseline) => self.current.saturating_sub(baseline),
            None => Decimal::ZERO,
        }
    }
}

//! Keel Risk Governor
//!
//! Session-level risk control for a single quoted symbol:
//!
//! - **Kill switch**: session PnL measured against the first observed
//!   equity; a breach halts quoting for the rest of the session
//! - **Exposure**: the inventory-increasing side is suppressed near or
//!   beyond the position notional cap (one-sided quoting, not a halt)
//!
//! ## State machine
//!
//! ```text
//!   ┌────────┐  pnl < -kill switch  ┌────────┐
//!   │ ACTIVE │ ───────────────────► │ HALTED │  (terminal, cancel-all)
//!   └────────┘  or manual halt      └────────┘
//! ```

pub mod governor;
pub mod limits;

// Re-export main types
pub use governor::{ExposureDecision, HaltReason, RiskGovernor, RiskState};
pub use limits::RiskLimits;

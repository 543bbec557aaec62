//! Keel Clock Infrastructure
//!
//! Wall-clock access behind a port so the quoting loop, the requote gate
//! and the risk checks can be driven deterministically in tests.
//!
//! ## Usage
//!
//! ```ignore
//! use keel_clock::{Clock, ManualClock, SystemClock};
//! use chrono::Duration;
//!
//! // Production
//! let clock = SystemClock::new();
//!
//! // Tests: time only moves when told to
//! let clock = ManualClock::new(start);
//! clock.advance(Duration::milliseconds(800));
//! ```

mod clock;
mod manual;

pub use clock::{Clock, SystemClock};
pub use manual::ManualClock;

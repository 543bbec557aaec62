use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Price value - exact decimal, never binary floating point
pub type Price = Decimal;

/// Quantity value - exact decimal
pub type Quantity = Decimal;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;

/// Exchange symbol identifier (e.g. "BTCUSDT")
pub type Symbol = String;

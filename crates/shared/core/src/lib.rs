//! Keel Core Domain
//!
//! Value types shared by every Keel crate: exact-decimal prices and
//! quantities, sides, positions, session equity and the per-symbol
//! trading constraints with their quantization rules. No async, no I/O.

pub mod entities;
pub mod instruments;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{Equity, Position, Side};
pub use instruments::{SpecError, SymbolSpec};
pub use values::{Price, Quantity, Symbol, Timestamp};

//! Instrument metadata
//!
//! Per-symbol trading constraints loaded once at startup.

mod spec;

pub use spec::{SpecError, SymbolSpec};

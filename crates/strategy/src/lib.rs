//! Keel Quoting Core
//!
//! Everything between a parsed feed message and an outbound quote:
//! - Local order book replica with stale/crossed detection
//! - Order-flow imbalance signal
//! - Quote engine (fair price, spread, skew, walls, quantization)
//! - Requote gate (minimum interval + volatility-scaled drift)
//!
//! ## Architecture
//!
//! ```text
//! feed ──► OrderBookView::apply ──► FlowSignalEstimator::update
//!                 │                          │ signal
//!                 ▼                          ▼
//!          (quoting tick) ──────────► QuoteEngine::compute ◄── RiskGovernor
//!                                            │ QuoteIntent
//!                                            ▼
//!                                   RequoteGate::decide
//!                                            │ Forward
//!                                            ▼
//!                                   ExecutionBoundary
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use keel_strategy::{OrderBookView, QuoteConfig, QuoteEngine};
//!
//! let mut book = OrderBookView::new("BTCUSDT");
//! book.apply(&update)?;
//! let mut engine = QuoteEngine::new(QuoteConfig::default());
//! let intent = engine.compute(&inputs);
//! ```

pub mod error;
pub mod flow;
pub mod orderbook;
pub mod quote;
pub mod requote;

// Re-export main types
pub use error::BookError;
pub use flow::{FlowConfig, FlowSignalEstimator};
pub use orderbook::{Applied, BookSide, BookSideKind, OrderBookView, PriceLevel};
pub use quote::{QuoteConfig, QuoteEngine, QuoteInputs, QuoteIntent};
pub use requote::{GateConfig, GateDecision, RequoteGate};

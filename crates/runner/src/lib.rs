//! Keel Runner - configuration, per-symbol engine and event loop
//!
//! - **Config**: `EngineConfig` loaded from JSON, resolved into a `SymbolSpec`
//! - **Engine**: `SymbolEngine`, the single owner of one symbol's state
//! - **Runtime**: `SymbolRuntime`, the tokio loop that feeds the engine and
//!   executes what it asks for
//!
//! ## Architecture
//!
//! ```text
//!   inbound (orderbook / position / wallet / order / funding)
//!        │ mpsc
//!        ▼
//! ┌──────────────────────────── SymbolRuntime ─────────────────────────────┐
//! │  select! { inbound, tick, in-flight done, shutdown }                   │
//! │                                                                         │
//! │        ┌──────────────────── SymbolEngine ────────────────────┐         │
//! │        │ OrderBookView  FlowSignalEstimator  RiskGovernor     │         │
//! │        │ QuoteEngine    RequoteGate          Position         │         │
//! │        └───────────────────────────┬──────────────────────────┘         │
//! │                                    │ EngineAction                       │
//! └────────────────────────────────────┼────────────────────────────────────┘
//!          snapshot request ◄──────────┤
//!                                      ▼ spawned task
//!                              ExecutionBoundary
//!                                      │ ExecutionReport
//!                                      └──────► back into the loop
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod runtime;

// Re-export main types
pub use config::{ConfigError, EngineConfig, ExecutionSection, RiskSection};
pub use engine::{EngineAction, ExecutionKind, ExecutionReport, Outbound, SymbolEngine};
pub use error::RunnerError;
pub use runtime::{RuntimeConfig, RuntimeHandle, SymbolRuntime};

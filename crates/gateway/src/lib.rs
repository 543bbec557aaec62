//! Keel Gateway
//!
//! Gateway layer for the Keel quoting engine. Provides:
//! - Wire message types for the order-book feed, account feeds and orders
//! - The `ExecutionBoundary` trait the engine submits quotes through
//! - Request throttling (token bucket) and ready-made adapters
//!
//! ## Architecture
//!
//! ```text
//! Exchange WebSocket (orderbook / position / wallet / order / funding)
//!         │ newline-delimited JSON
//!    ┌────▼─────────┐
//!    │ InboundMessage│  decimal strings -> Decimal, bad levels skipped
//!    └────┬─────────┘
//!         │ OrderBookUpdate, Position, balances
//!    ┌────▼────┐
//!    │ Engine  │
//!    └────┬────┘
//!         │ cancel_all / create_batch (PostOnly limits)
//!    ┌────▼──────────────┐
//!    │ ExecutionBoundary │──► ThrottledExecution ──► venue adapter
//!    └───────────────────┘
//! ```
//!
//! Session negotiation and request signing live outside this crate; an
//! adapter only has to implement [`ExecutionBoundary`].

pub mod adapters;
pub mod error;
pub mod execution;
pub mod messages;
pub mod throttle;

// Re-export commonly used types
pub use adapters::{DryRunExecution, ExecutionCall, ThrottledExecution};
pub use error::{FeedError, GatewayError, MalformedLevel};
pub use execution::ExecutionBoundary;
pub use messages::{
    InboundMessage,
    account::{FundingMessage, OrderStatusWire, OrderUpdateMessage, PositionMessage, WalletMessage},
    instrument::InstrumentInfo,
    market_data::{BookLevel, FeedKind, FeedMessage, OrderBookUpdate, ParsedUpdate},
    order::{OrderRequest, OrderTypeWire, TimeInForceWire},
};
pub use throttle::TokenBucket;

//! Execution adapters
//!
//! Implementations of [`ExecutionBoundary`](crate::ExecutionBoundary):
//! a dry-run adapter that logs and records calls, and a throttling wrapper
//! that spends a token per outbound request.

mod dry_run;
mod throttled;

pub use dry_run::{DryRunExecution, ExecutionCall};
pub use throttled::ThrottledExecution;

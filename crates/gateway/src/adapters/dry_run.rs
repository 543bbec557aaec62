//! Dry-run execution: logs every request and keeps a history instead of
//! sending anything. Useful for paper runs and as a test double.

use crate::error::GatewayError;
use crate::execution::ExecutionBoundary;
use crate::messages::order::OrderRequest;
use async_trait::async_trait;
use log::info;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// A recorded outbound call
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionCall {
    CancelAll { symbol: String },
    CreateBatch { orders: Vec<OrderRequest> },
}

pub struct DryRunExecution {
    history: Mutex<VecDeque<ExecutionCall>>,
    max_history: usize,
    /// Failure injected into the next call, if any
    fail_next: Mutex<Option<GatewayError>>,
}

impl DryRunExecution {
    pub fn new() -> Self {
        Self::with_history(1024)
    }

    pub fn with_history(max_history: usize) -> Self {
        Self {
            history: Mutex::new(VecDeque::new()),
            max_history: max_history.max(1),
            fail_next: Mutex::new(None),
        }
    }

    /// Recorded calls, oldest first
    pub async fn calls(&self) -> Vec<ExecutionCall> {
        self.history.lock().await.iter().cloned().collect()
    }

    pub async fn clear(&self) {
        self.history.lock().await.clear();
    }

    /// Make the next call return `error` without being recorded
    pub async fn fail_next(&self, error: GatewayError) {
        *self.fail_next.lock().await = Some(error);
    }

    async fn record(&self, call: ExecutionCall) -> Result<(), GatewayError> {
        if let Some(error) = self.fail_next.lock().await.take() {
            return Err(error);
        }
        let mut history = self.history.lock().await;
        if history.len() == self.max_history {
            history.pop_front();
        }
        history.push_back(call);
        Ok(())
    }
}

impl Default for DryRunExecution {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionBoundary for DryRunExecution {
    async fn cancel_all(&self, symbol: &str) -> Result<(), GatewayError> {
        self.record(ExecutionCall::CancelAll {
            symbol: symbol.to_string(),
        })
        .await?;
        info!("[{}] dry-run cancelAll", symbol);
        Ok(())
    }

    async fn create_batch(&self, orders: Vec<OrderRequest>) -> Result<(), GatewayError> {
        for order in &orders {
            info!(
                "[{}] dry-run {} {} @ {} ({:?})",
                order.symbol,
                order.side.as_str(),
                order.qty,
                order.price,
                order.time_in_force
            );
        }
        self.record(ExecutionCall::CreateBatch { orders }).await
    }

    fn name(&self) -> &str {
        "DryRunExecution"
    }
}

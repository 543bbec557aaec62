//! Rate-limited wrapper around any execution adapter

use crate::error::GatewayError;
use crate::execution::ExecutionBoundary;
use crate::messages::order::OrderRequest;
use crate::throttle::TokenBucket;
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Spends one token per request (a batch counts as one) and waits for the
/// bucket to refill when it is empty.
pub struct ThrottledExecution<E> {
    inner: Arc<E>,
    bucket: Mutex<TokenBucket>,
}

impl<E: ExecutionBoundary> ThrottledExecution<E> {
    pub fn new(inner: Arc<E>, capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            inner,
            bucket: Mutex::new(TokenBucket::new(capacity, refill_per_sec)),
        }
    }

    pub fn inner(&self) -> &Arc<E> {
        &self.inner
    }

    async fn acquire(&self) {
        loop {
            let wait = match self.bucket.lock().await.try_consume(1) {
                Ok(()) => return,
                Err(wait) => wait,
            };
            debug!("{} throttled for {:?}", self.inner.name(), wait);
            tokio::time::sleep(wait).await;
        }
    }
}

#[async_trait]
impl<E: ExecutionBoundary> ExecutionBoundary for ThrottledExecution<E> {
    async fn cancel_all(&self, symbol: &str) -> Result<(), GatewayError> {
        self.acquire().await;
        self.inner.cancel_all(symbol).await
    }

    async fn create_batch(&self, orders: Vec<OrderRequest>) -> Result<(), GatewayError> {
        self.acquire().await;
        self.inner.create_batch(orders).await
    }

    fn name(&self) -> &str {
        "ThrottledExecution"
    }
}

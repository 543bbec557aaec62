//! Symbol Runtime - the event loop around one `SymbolEngine`
//!
//! A single task owns the engine and multiplexes:
//! - inbound feed/account messages (applied in arrival order)
//! - the quoting tick (skipped while outbound work is in flight)
//! - completion of the in-flight outbound task
//! - shutdown
//!
//! On shutdown the inbound channel is closed and whatever was already
//! queued is still applied before the final cancel-all.
//!
//! Outbound calls run on their own task so the loop never waits on the
//! venue; their result comes back as an `ExecutionReport`.

use crate::config::EngineConfig;
use crate::engine::{EngineAction, ExecutionKind, ExecutionReport, Outbound, SymbolEngine};
use keel_clock::Clock;
use keel_gateway::{ExecutionBoundary, GatewayError, InboundMessage, OrderRequest};
use keel_risk_manager::HaltReason;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Quoting tick period
    pub loop_interval: Duration,
    /// Inbound queue depth
    pub channel_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            loop_interval: Duration::from_millis(500),
            channel_capacity: 10_000,
        }
    }
}

impl From<&EngineConfig> for RuntimeConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            loop_interval: config.loop_interval(),
            channel_capacity: config.channel_capacity,
        }
    }
}

/// Caller's side of a running `SymbolRuntime`
pub struct RuntimeHandle {
    /// Inbound messages for the symbol
    pub inbound: mpsc::Sender<InboundMessage>,
    /// Symbols whose book needs a fresh snapshot
    pub snapshot_requests: mpsc::Receiver<String>,
    shutdown: watch::Sender<bool>,
}

impl RuntimeHandle {
    /// Stop ticking, apply queued input, let in-flight work finish, cancel
    /// all orders
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

pub struct SymbolRuntime {
    engine: SymbolEngine,
    execution: Arc<dyn ExecutionBoundary>,
    clock: Arc<dyn Clock>,
    loop_interval: Duration,
    inbound: mpsc::Receiver<InboundMessage>,
    snapshot_tx: mpsc::Sender<String>,
    shutdown: watch::Receiver<bool>,
}

impl SymbolRuntime {
    pub fn new(
        engine: SymbolEngine,
        execution: Arc<dyn ExecutionBoundary>,
        clock: Arc<dyn Clock>,
        config: RuntimeConfig,
    ) -> (Self, RuntimeHandle) {
        let capacity = config.channel_capacity.max(1);
        let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
        let (snapshot_tx, snapshot_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runtime = Self {
            engine,
            execution,
            clock,
            loop_interval: config.loop_interval,
            inbound: inbound_rx,
            snapshot_tx,
            shutdown: shutdown_rx,
        };
        let handle = RuntimeHandle {
            inbound: inbound_tx,
            snapshot_requests: snapshot_rx,
            shutdown: shutdown_tx,
        };
        (runtime, handle)
    }

    /// Run until shutdown or until the inbound channel closes. Returns the
    /// engine so the caller can inspect final state.
    pub async fn run(mut self) -> SymbolEngine {
        let symbol = self.engine.symbol().to_string();
        info!(
            "[{}] runtime started ({} via {}, tick {:?})",
            symbol,
            self.clock.name(),
            self.execution.name(),
            self.loop_interval
        );

        let mut ticker = tokio::time::interval(self.loop_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut in_flight: Option<JoinHandle<ExecutionReport>> = None;
        // Cancel-all raised while another call was in flight
        let mut queued: Option<Outbound> = None;

        loop {
            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        info!("[{}] shutdown requested", symbol);
                        break;
                    }
                }

                joined = async {
                    match in_flight.as_mut() {
                        Some(task) => task.await,
                        None => std::future::pending().await,
                    }
                } => {
                    in_flight = None;
                    match joined {
                        Ok(report) => self.engine.on_execution_report(&report),
                        Err(e) => error!("[{}] execution task failed: {}", symbol, e),
                    }
                    if let Some(outbound) = queued.take() {
                        in_flight = Some(self.spawn_execution(outbound));
                    }
                }

                message = self.inbound.recv() => {
                    let Some(message) = message else {
                        info!("[{}] inbound channel closed", symbol);
                        break;
                    };
                    let now = self.clock.now();
                    match self.engine.handle(message, now) {
                        Some(EngineAction::RequestSnapshot { symbol }) => self.request_snapshot(symbol),
                        Some(EngineAction::Execute(outbound)) if in_flight.is_some() => {
                            debug!("[{}] outbound busy, queueing {:?}", symbol, outbound.kind());
                            queued = Some(outbound);
                        }
                        Some(EngineAction::Execute(outbound)) => {
                            in_flight = Some(self.spawn_execution(outbound));
                        }
                        None => {}
                    }
                }

                _ = ticker.tick() => {
                    if in_flight.is_some() {
                        debug!("[{}] tick skipped, outbound work in flight", symbol);
                        continue;
                    }
                    match self.engine.tick(self.clock.now()) {
                        Some(EngineAction::Execute(outbound)) => {
                            in_flight = Some(self.spawn_execution(outbound));
                        }
                        Some(EngineAction::RequestSnapshot { symbol }) => self.request_snapshot(symbol),
                        None => {}
                    }
                }
            }
        }

        self.drain(in_flight, queued).await;
        self.engine
    }

    /// Wait for in-flight work, then pull every resting order
    async fn drain(&mut self, in_flight: Option<JoinHandle<ExecutionReport>>, queued: Option<Outbound>) {
        let symbol = self.engine.symbol().to_string();
        if let Some(task) = in_flight {
            match task.await {
                Ok(report) => self.engine.on_execution_report(&report),
                Err(e) => error!("[{}] execution task failed: {}", symbol, e),
            }
        }
        if queued.is_some() {
            debug!("[{}] queued cancel-all folded into shutdown", symbol);
        }

        self.inbound.close();
        let now = self.clock.now();
        while let Ok(message) = self.inbound.try_recv() {
            if let Some(action) = self.engine.handle(message, now) {
                debug!("[{}] {:?} folded into shutdown", symbol, action);
            }
        }

        let _ = self.engine.halt(HaltReason::Manual("shutdown".to_string()));

        let started = Instant::now();
        let result = self.execution.cancel_all(&symbol).await;
        self.engine.on_execution_report(&ExecutionReport {
            symbol: symbol.clone(),
            kind: ExecutionKind::CancelAll,
            result,
            latency: started.elapsed(),
        });
        info!("[{}] runtime stopped", symbol);
    }

    fn request_snapshot(&self, symbol: String) {
        match self.snapshot_tx.try_send(symbol) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(symbol)) => {
                debug!("[{}] snapshot request already pending", symbol);
            }
            Err(mpsc::error::TrySendError::Closed(symbol)) => {
                warn!("[{}] no one is listening for snapshot requests", symbol);
            }
        }
    }

    fn spawn_execution(&self, outbound: Outbound) -> JoinHandle<ExecutionReport> {
        let execution = Arc::clone(&self.execution);
        tokio::spawn(async move { execute(execution.as_ref(), outbound).await })
    }
}

async fn execute(execution: &dyn ExecutionBoundary, outbound: Outbound) -> ExecutionReport {
    let started = Instant::now();
    let kind = outbound.kind();
    let (symbol, result) = match outbound {
        Outbound::Requote { symbol, orders } => {
            let result = requote(execution, &symbol, orders).await;
            (symbol, result)
        }
        Outbound::CancelAll { symbol, reason } => {
            info!("[{}] cancelling all orders: {}", symbol, reason);
            let result = execution.cancel_all(&symbol).await;
            (symbol, result)
        }
    };
    ExecutionReport {
        symbol,
        kind,
        result,
        latency: started.elapsed(),
    }
}

/// Cancel resting quotes, then place the new ones
async fn requote(
    execution: &dyn ExecutionBoundary,
    symbol: &str,
    orders: Vec<OrderRequest>,
) -> Result<(), GatewayError> {
    execution.cancel_all(symbol).await?;
    if orders.is_empty() {
        return Ok(());
    }
    execution.create_batch(orders).await
}

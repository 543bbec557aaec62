//! Per-symbol engine
//!
//! `SymbolEngine` is the single owner of everything one symbol needs: the
//! book, the flow estimator, the risk governor, the quote engine, the
//! requote gate and the latest position/funding. It is synchronous; the
//! runtime feeds it events one at a time and executes the actions it
//! returns.

use crate::config::{ConfigError, EngineConfig};
use keel_core::{Position, SymbolSpec, Timestamp};
use keel_gateway::{
    FeedMessage, FundingMessage, GatewayError, InboundMessage, OrderRequest, OrderUpdateMessage,
    PositionMessage, WalletMessage,
};
use keel_risk_manager::{HaltReason, RiskGovernor};
use keel_strategy::{
    BookError, FlowSignalEstimator, GateDecision, OrderBookView, QuoteEngine, QuoteInputs,
    QuoteIntent, RequoteGate,
};
use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use std::time::Duration;

/// Work the runtime has to carry out on behalf of the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineAction {
    /// Book cannot continue without a fresh snapshot
    RequestSnapshot { symbol: String },
    /// Call the execution boundary
    Execute(Outbound),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Risk halt: pull every resting order
    CancelAll { symbol: String, reason: HaltReason },
    /// Replace resting quotes with `orders`
    Requote {
        symbol: String,
        orders: Vec<OrderRequest>,
    },
}

impl Outbound {
    pub fn kind(&self) -> ExecutionKind {
        match self {
            Outbound::CancelAll { .. } => ExecutionKind::CancelAll,
            Outbound::Requote { .. } => ExecutionKind::Requote,
        }
    }
}

/// What an outbound task was doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionKind {
    Requote,
    CancelAll,
}

/// Result of one outbound task, sent back to the engine
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub symbol: String,
    pub kind: ExecutionKind,
    pub result: Result<(), GatewayError>,
    /// Wall time from the first request to the last response
    pub latency: Duration,
}

pub struct SymbolEngine {
    symbol: String,
    quote_coin: String,
    spec: SymbolSpec,
    book: OrderBookView,
    flow: FlowSignalEstimator,
    risk: RiskGovernor,
    quote: QuoteEngine,
    gate: RequoteGate,
    position: Position,
    funding_rate: Option<Decimal>,
    last_latency: Option<Duration>,
}

impl SymbolEngine {
    pub fn new(config: &EngineConfig, spec: SymbolSpec) -> Self {
        let limits = config.risk_limits(&spec);
        Self {
            symbol: spec.symbol.clone(),
            quote_coin: config.quote_coin.clone(),
            book: OrderBookView::new(spec.symbol.clone()),
            flow: FlowSignalEstimator::new(config.flow.clone()),
            risk: RiskGovernor::new(spec.symbol.clone(), limits),
            quote: QuoteEngine::new(config.quote.clone()),
            gate: RequoteGate::new(config.gate.clone()),
            position: Position::flat(spec.symbol.clone()),
            funding_rate: None,
            last_latency: None,
            spec,
        }
    }

    /// Resolve the symbol spec from `config` and build the engine
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        let spec = config.symbol_spec()?;
        info!(
            "[{}] tick {} step {} min qty {} cap {} kill {}",
            spec.symbol,
            spec.tick_size,
            spec.qty_step,
            spec.min_qty,
            spec.max_position_notional,
            spec.kill_switch_loss_notional
        );
        Ok(Self::new(config, spec))
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn spec(&self) -> &SymbolSpec {
        &self.spec
    }

    pub fn book(&self) -> &OrderBookView {
        &self.book
    }

    pub fn flow(&self) -> &FlowSignalEstimator {
        &self.flow
    }

    pub fn risk(&self) -> &RiskGovernor {
        &self.risk
    }

    pub fn gate(&self) -> &RequoteGate {
        &self.gate
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn funding_rate(&self) -> Option<Decimal> {
        self.funding_rate
    }

    pub fn last_latency(&self) -> Option<Duration> {
        self.last_latency
    }

    /// Dispatch one inbound envelope
    pub fn handle(&mut self, message: InboundMessage, now: Timestamp) -> Option<EngineAction> {
        match message {
            InboundMessage::Orderbook(msg) => self.on_orderbook(msg, now),
            InboundMessage::Position(msg) => {
                self.on_position(&msg, now);
                None
            }
            InboundMessage::Wallet(msg) => self.on_wallet(&msg),
            InboundMessage::Order(msg) => {
                self.on_order(&msg);
                None
            }
            InboundMessage::Funding(msg) => {
                self.on_funding(&msg);
                None
            }
        }
    }

    pub fn on_orderbook(&mut self, msg: FeedMessage, now: Timestamp) -> Option<EngineAction> {
        let parsed = match msg.into_update(&self.symbol, now) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("{}", e);
                return None;
            }
        };
        for rejected in &parsed.rejected {
            warn!("{}", rejected);
        }

        match self.book.apply(&parsed.update) {
            Ok(applied) => {
                if applied.snapshot {
                    self.flow.reset();
                }
                self.flow.update(&self.book);
                None
            }
            Err(BookError::StaleUpdate { .. }) => {
                debug!("[{}] stale update {} ignored", self.symbol, parsed.update.update_id());
                None
            }
            Err(e) if e.needs_snapshot() => {
                warn!("{}", e);
                Some(EngineAction::RequestSnapshot {
                    symbol: self.symbol.clone(),
                })
            }
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    pub fn on_position(&mut self, msg: &PositionMessage, now: Timestamp) {
        if msg.symbol != self.symbol {
            debug!("[{}] position for {} ignored", self.symbol, msg.symbol);
            return;
        }
        self.position = msg.to_position(now);
        debug!(
            "[{}] position size {} notional {}",
            self.symbol, self.position.size, self.position.notional_value
        );
    }

    /// Wallet balance for the quote coin. Returns a cancel-all on the
    /// transition to HALTED.
    pub fn on_wallet(&mut self, msg: &WalletMessage) -> Option<EngineAction> {
        if msg.coin != self.quote_coin {
            return None;
        }
        let reason = self.risk.on_equity(msg.wallet_balance)?;
        Some(EngineAction::Execute(Outbound::CancelAll {
            symbol: self.symbol.clone(),
            reason,
        }))
    }

    pub fn on_order(&mut self, msg: &OrderUpdateMessage) {
        if msg.symbol != self.symbol || !msg.order_status.is_terminal() {
            return;
        }
        if let Some(reason) = &msg.reject_reason {
            warn!(
                "[{}] {} order @ {} rejected: {}",
                self.symbol,
                msg.side.as_str(),
                msg.price,
                reason
            );
        }
        if self.gate.on_order_terminal(&self.symbol, msg.side, msg.price) {
            debug!(
                "[{}] {} side @ {} no longer resting",
                self.symbol,
                msg.side.as_str(),
                msg.price
            );
        }
    }

    pub fn on_funding(&mut self, msg: &FundingMessage) {
        if msg.symbol == self.symbol {
            self.funding_rate = Some(msg.funding_rate);
        }
    }

    /// Manual halt. Returns a cancel-all if this call stopped quoting.
    pub fn halt(&mut self, reason: HaltReason) -> Option<EngineAction> {
        if !self.risk.halt(reason.clone()) {
            return None;
        }
        Some(EngineAction::Execute(Outbound::CancelAll {
            symbol: self.symbol.clone(),
            reason,
        }))
    }

    /// Quoting tick: compute an intent and pass it through the gate
    pub fn tick(&mut self, now: Timestamp) -> Option<EngineAction> {
        let intent = self.compute_intent(now)?;
        match self.gate.decide(&intent, self.spec.tick_size, now) {
            GateDecision::Forward => Some(EngineAction::Execute(Outbound::Requote {
                symbol: self.symbol.clone(),
                orders: intent.to_orders(),
            })),
            GateDecision::SuppressedInterval { remaining } => {
                debug!("[{}] requote in {:?}", self.symbol, remaining);
                None
            }
            GateDecision::SuppressedDrift { .. } => None,
        }
    }

    fn compute_intent(&mut self, now: Timestamp) -> Option<QuoteIntent> {
        let inputs = QuoteInputs {
            book: &self.book,
            flow_signal: self.flow.signal(),
            position: &self.position,
            risk: &self.risk,
            spec: &self.spec,
            funding_rate: self.funding_rate,
            latency: self.last_latency,
            now,
        };
        self.quote.compute(&inputs)
    }

    pub fn on_execution_report(&mut self, report: &ExecutionReport) {
        match (&report.result, report.kind) {
            (Ok(()), ExecutionKind::Requote) => {
                self.last_latency = Some(report.latency);
                debug!("[{}] requote acknowledged in {:?}", self.symbol, report.latency);
            }
            (Ok(()), ExecutionKind::CancelAll) => {
                info!("[{}] all orders cancelled", self.symbol);
            }
            (Err(e), ExecutionKind::Requote) => {
                warn!("[{}] requote failed: {}", self.symbol, e);
                self.gate.on_execution_failure(&self.symbol);
            }
            (Err(e), ExecutionKind::CancelAll) => {
                error!("[{}] cancel-all failed: {}", self.symbol, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration as ChronoDuration, Utc};
    use keel_core::Side;
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn engine() -> SymbolEngine {
        let config = EngineConfig::new("BTCUSDT", dec!(0.01), dec!(0.001), dec!(0.001));
        SymbolEngine::from_config(&config).unwrap()
    }

    fn msg(line: &str) -> InboundMessage {
        InboundMessage::from_json(line).unwrap()
    }

    fn seed(engine: &mut SymbolEngine) {
        engine.handle(
            msg(r#"{"topic":"orderbook","data":{"type":"snapshot","u":1,"b":[["100.00","10"]],"a":[["100.02","10"]]}}"#),
            t0(),
        );
        engine.handle(
            msg(r#"{"topic":"wallet","data":{"coin":"USDT","walletBalance":"1000"}}"#),
            t0(),
        );
    }

    #[test]
    fn test_delta_before_snapshot_requests_snapshot() {
        let mut engine = engine();
        let action = engine.handle(
            msg(r#"{"topic":"orderbook","data":{"type":"delta","u":3,"b":[["100","1"]],"a":[]}}"#),
            t0(),
        );
        assert_eq!(
            action,
            Some(EngineAction::RequestSnapshot {
                symbol: "BTCUSDT".to_string()
            })
        );
    }

    #[test]
    fn test_tick_forwards_then_suppresses() {
        let mut engine = engine();
        seed(&mut engine);

        let Some(EngineAction::Execute(Outbound::Requote { orders, .. })) = engine.tick(t0()) else {
            panic!("expected a requote");
        };
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].price, dec!(99.94));
        assert_eq!(orders[1].price, dec!(100.08));

        // Inside the minimum interval
        assert_eq!(engine.tick(t0() + ChronoDuration::milliseconds(200)), None);
        // Interval passed, nothing moved
        assert_eq!(engine.tick(t0() + ChronoDuration::seconds(2)), None);
    }

    #[test]
    fn test_no_quote_without_equity() {
        let mut engine = engine();
        engine.handle(
            msg(r#"{"topic":"orderbook","data":{"type":"snapshot","u":1,"b":[["100.00","10"]],"a":[["100.02","10"]]}}"#),
            t0(),
        );
        assert_eq!(engine.tick(t0()), None);
    }

    #[test]
    fn test_wallet_for_other_coin_ignored() {
        let mut engine = engine();
        engine.handle(
            msg(r#"{"topic":"wallet","data":{"coin":"BTC","walletBalance":"3"}}"#),
            t0(),
        );
        assert!(!engine.risk().equity().is_known());
    }

    #[test]
    fn test_kill_switch_cancels_once() {
        let mut engine = engine();
        seed(&mut engine);

        let action = engine.handle(
            msg(r#"{"topic":"wallet","data":{"coin":"USDT","walletBalance":"960"}}"#),
            t0(),
        );
        assert!(matches!(
            action,
            Some(EngineAction::Execute(Outbound::CancelAll {
                reason: HaltReason::KillSwitch { .. },
                ..
            }))
        ));

        let again = engine.handle(
            msg(r#"{"topic":"wallet","data":{"coin":"USDT","walletBalance":"900"}}"#),
            t0(),
        );
        assert_eq!(again, None);
        assert_eq!(engine.tick(t0() + ChronoDuration::seconds(5)), None);
        assert_eq!(engine.halt(HaltReason::Manual("shutdown".to_string())), None);
    }

    #[test]
    fn test_position_feed_skews_quotes() {
        let mut engine = engine();
        seed(&mut engine);
        engine.handle(
            msg(r#"{"topic":"position","data":{"symbol":"BTCUSDT","side":"Buy","size":"7","positionValue":"700","avgPrice":"100"}}"#),
            t0(),
        );
        assert_eq!(engine.position().size, dec!(7));

        let Some(EngineAction::Execute(Outbound::Requote { orders, .. })) = engine.tick(t0()) else {
            panic!("expected a requote");
        };
        // Long inventory pushes both quotes below the flat-book quotes
        assert!(orders.iter().all(|o| match o.side {
            Side::Buy => o.price < dec!(99.94),
            Side::Sell => o.price < dec!(100.08),
        }));
    }

    #[test]
    fn test_execution_failure_allows_resend() {
        let mut engine = engine();
        seed(&mut engine);
        assert!(engine.tick(t0()).is_some());

        engine.on_execution_report(&ExecutionReport {
            symbol: "BTCUSDT".to_string(),
            kind: ExecutionKind::Requote,
            result: Err(GatewayError::Timeout),
            latency: Duration::from_millis(40),
        });
        assert_eq!(engine.last_latency(), None);
        assert!(engine.tick(t0() + ChronoDuration::seconds(1)).is_some());
    }

    #[test]
    fn test_order_terminal_reopens_side() {
        let mut engine = engine();
        seed(&mut engine);
        assert!(engine.tick(t0()).is_some());

        engine.handle(
            msg(r#"{"topic":"order","data":{"symbol":"BTCUSDT","side":"Buy","price":"99.94","orderStatus":"Filled"}}"#),
            t0(),
        );
        assert_eq!(
            engine.gate().last_forwarded("BTCUSDT"),
            Some((None, Some(dec!(100.08))))
        );
        assert!(engine.tick(t0() + ChronoDuration::seconds(1)).is_some());
    }

    #[test]
    fn test_funding_recorded_for_own_symbol() {
        let mut engine = engine();
        engine.handle(
            msg(r#"{"topic":"funding","data":{"symbol":"ETHUSDT","fundingRate":"0.001"}}"#),
            t0(),
        );
        assert_eq!(engine.funding_rate(), None);
        engine.handle(
            msg(r#"{"topic":"funding","data":{"symbol":"BTCUSDT","fundingRate":"0.0001"}}"#),
            t0(),
        );
        assert_eq!(engine.funding_rate(), Some(dec!(0.0001)));
    }

    #[test]
    fn test_extreme_depth_is_handled() {
        let mut engine = engine();
        engine.handle(
            msg(r#"{"topic":"orderbook","data":{"type":"snapshot","u":1,"b":[["100.00","10"],["99.99","50000000000000000000000000000"],["99.98","50000000000000000000000000000"]],"a":[["100.02","10"]]}}"#),
            t0(),
        );
        engine.handle(
            msg(r#"{"topic":"orderbook","data":{"type":"delta","u":2,"b":[["99.97","50000000000000000000000000000"]],"a":[]}}"#),
            t0(),
        );
        engine.handle(
            msg(r#"{"topic":"wallet","data":{"coin":"USDT","walletBalance":"1000"}}"#),
            t0(),
        );

        assert_eq!(engine.book().last_update_id(), 2);
        assert!(engine.flow().history().is_empty());
        assert!(matches!(
            engine.tick(t0()),
            Some(EngineAction::Execute(Outbound::Requote { .. }))
        ));
    }
}

//! Requote gate
//!
//! Decides whether a fresh `QuoteIntent` is worth sending. Two filters:
//! a per-symbol minimum interval between forwarded intents, and a drift
//! threshold in ticks that grows with the volatility multiplier so churn
//! drops when the market is noisiest.
//!
//! State is updated optimistically on `Forward`; execution failures and
//! order-feed terminations roll it back so the next intent goes out.

use crate::quote::QuoteIntent;
use keel_core::{Price, Side, Timestamp};
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Drift threshold in ticks at volatility multiplier 1
    pub base_threshold_ticks: u32,
    /// Minimum time between forwarded intents for one symbol
    pub min_interval_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            base_threshold_ticks: 2,
            min_interval_ms: 800,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Forward,
    SuppressedInterval { remaining: Duration },
    SuppressedDrift { threshold_ticks: u32 },
}

impl GateDecision {
    pub fn is_forward(&self) -> bool {
        matches!(self, GateDecision::Forward)
    }
}

#[derive(Debug, Clone, Default)]
struct Forwarded {
    bid: Option<Price>,
    ask: Option<Price>,
    at: Option<Timestamp>,
}

#[derive(Debug, Clone)]
pub struct RequoteGate {
    config: GateConfig,
    last: HashMap<String, Forwarded>,
}

impl RequoteGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            last: HashMap::new(),
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// `max(1, floor(base * volatility_multiplier))`
    pub fn threshold_ticks(&self, volatility_multiplier: f64) -> u32 {
        let scaled = self.config.base_threshold_ticks as f64 * volatility_multiplier;
        if !scaled.is_finite() {
            return self.config.base_threshold_ticks.max(1);
        }
        (scaled.floor().min(u32::MAX as f64) as u32).max(1)
    }

    pub fn decide(&mut self, intent: &QuoteIntent, tick_size: Price, now: Timestamp) -> GateDecision {
        let min_interval = Duration::from_millis(self.config.min_interval_ms);
        let threshold_ticks = self.threshold_ticks(intent.volatility_multiplier);
        let threshold = tick_size * Decimal::from(threshold_ticks);

        let new_bid = intent.has_bid().then_some(intent.bid_price);
        let new_ask = intent.has_ask().then_some(intent.ask_price);

        let state = self.last.entry(intent.symbol.clone()).or_default();

        if let Some(at) = state.at {
            // A clock that went backwards counts as no time elapsed
            let elapsed = (now - at).to_std().unwrap_or(Duration::ZERO);
            if elapsed < min_interval {
                return GateDecision::SuppressedInterval {
                    remaining: min_interval - elapsed,
                };
            }
        }

        let first = state.at.is_none() && state.bid.is_none() && state.ask.is_none();
        let moved = |old: Option<Price>, new: Option<Price>| match (old, new) {
            (Some(old), Some(new)) => (new - old).abs() >= threshold,
            (None, None) => false,
            _ => true,
        };

        if !first && !moved(state.bid, new_bid) && !moved(state.ask, new_ask) {
            debug!(
                "[{}] requote suppressed: drift below {} ticks",
                intent.symbol, threshold_ticks
            );
            return GateDecision::SuppressedDrift { threshold_ticks };
        }

        state.bid = new_bid;
        state.ask = new_ask;
        state.at = Some(now);
        GateDecision::Forward
    }

    /// Outbound call failed: forget the prices so the next intent is sent.
    /// The interval timer is kept.
    pub fn on_execution_failure(&mut self, symbol: &str) {
        if let Some(state) = self.last.get_mut(symbol) {
            state.bid = None;
            state.ask = None;
        }
    }

    /// An order on `side` at `price` left the book (filled, cancelled,
    /// rejected). Clears that side if it is the one we think is resting.
    pub fn on_order_terminal(&mut self, symbol: &str, side: Side, price: Price) -> bool {
        let Some(state) = self.last.get_mut(symbol) else {
            return false;
        };
        let slot = match side {
            Side::Buy => &mut state.bid,
            Side::Sell => &mut state.ask,
        };
        if *slot == Some(price) {
            *slot = None;
            return true;
        }
        false
    }

    pub fn reset(&mut self, symbol: &str) {
        self.last.remove(symbol);
    }

    /// Last forwarded (bid, ask) for `symbol`
    pub fn last_forwarded(&self, symbol: &str) -> Option<(Option<Price>, Option<Price>)> {
        self.last.get(symbol).map(|s| (s.bid, s.ask))
    }

    pub fn last_forwarded_at(&self, symbol: &str) -> Option<Timestamp> {
        self.last.get(symbol).and_then(|s| s.at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration as ChronoDuration};
    use rust_decimal_macros::dec;

    fn t0() -> Timestamp {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn ms(n: i64) -> ChronoDuration {
        ChronoDuration::milliseconds(n)
    }

    fn intent(bid: Decimal, ask: Decimal, vol: f64) -> QuoteIntent {
        QuoteIntent {
            symbol: "BTCUSDT".to_string(),
            bid_price: bid,
            bid_qty: dec!(0.1),
            ask_price: ask,
            ask_qty: dec!(0.1),
            fair_price: (bid + ask) / dec!(2),
            volatility_multiplier: vol,
            generated_at: t0(),
        }
    }

    #[test]
    fn test_first_intent_forwarded() {
        let mut gate = RequoteGate::new(GateConfig::default());
        let decision = gate.decide(&intent(dec!(99.9), dec!(100.1), 1.0), dec!(0.1), t0());
        assert_eq!(decision, GateDecision::Forward);
        assert_eq!(
            gate.last_forwarded("BTCUSDT"),
            Some((Some(dec!(99.9)), Some(dec!(100.1))))
        );
    }

    #[test]
    fn test_min_interval_enforced_before_drift() {
        let mut gate = RequoteGate::new(GateConfig::default());
        gate.decide(&intent(dec!(99.9), dec!(100.1), 1.0), dec!(0.1), t0());

        // Big move but only 500ms later
        let decision = gate.decide(&intent(dec!(95), dec!(96), 1.0), dec!(0.1), t0() + ms(500));
        assert_eq!(
            decision,
            GateDecision::SuppressedInterval {
                remaining: Duration::from_millis(300)
            }
        );

        let decision = gate.decide(&intent(dec!(95), dec!(96), 1.0), dec!(0.1), t0() + ms(800));
        assert!(decision.is_forward());
    }

    #[test]
    fn test_drift_threshold_scales_with_volatility() {
        let mut gate = RequoteGate::new(GateConfig::default());
        gate.decide(&intent(dec!(100.0), dec!(101.0), 1.0), dec!(0.1), t0());

        // 1 tick move, threshold 2 ticks
        let decision = gate.decide(&intent(dec!(100.1), dec!(101.1), 1.0), dec!(0.1), t0() + ms(1000));
        assert_eq!(decision, GateDecision::SuppressedDrift { threshold_ticks: 2 });

        // 2 ticks at vol 1 -> forward
        let decision = gate.decide(&intent(dec!(100.2), dec!(101.0), 1.0), dec!(0.1), t0() + ms(2000));
        assert!(decision.is_forward());

        // Same 3 tick move suppressed at vol 2.5 (threshold 5)
        let decision = gate.decide(&intent(dec!(100.5), dec!(101.0), 2.5), dec!(0.1), t0() + ms(3000));
        assert_eq!(decision, GateDecision::SuppressedDrift { threshold_ticks: 5 });
    }

    #[test]
    fn test_threshold_floor_is_one() {
        let gate = RequoteGate::new(GateConfig::default());
        assert_eq!(gate.threshold_ticks(0.1), 1);
        assert_eq!(gate.threshold_ticks(1.99), 3);
        assert_eq!(gate.threshold_ticks(f64::NAN), 2);
    }

    #[test]
    fn test_side_presence_change_forwards() {
        let mut gate = RequoteGate::new(GateConfig::default());
        gate.decide(&intent(dec!(100.0), dec!(101.0), 1.0), dec!(0.1), t0());

        let mut one_sided = intent(dec!(100.0), dec!(101.0), 1.0);
        one_sided.bid_qty = Decimal::ZERO;
        let decision = gate.decide(&one_sided, dec!(0.1), t0() + ms(1000));
        assert!(decision.is_forward());
        assert_eq!(gate.last_forwarded("BTCUSDT"), Some((None, Some(dec!(101.0)))));
    }

    #[test]
    fn test_execution_failure_resends_after_interval() {
        let mut gate = RequoteGate::new(GateConfig::default());
        gate.decide(&intent(dec!(100.0), dec!(101.0), 1.0), dec!(0.1), t0());
        gate.on_execution_failure("BTCUSDT");

        let same = intent(dec!(100.0), dec!(101.0), 1.0);
        assert!(matches!(
            gate.decide(&same, dec!(0.1), t0() + ms(100)),
            GateDecision::SuppressedInterval { .. }
        ));
        assert!(gate.decide(&same, dec!(0.1), t0() + ms(900)).is_forward());
    }

    #[test]
    fn test_order_terminal_clears_matching_side() {
        let mut gate = RequoteGate::new(GateConfig::default());
        gate.decide(&intent(dec!(100.0), dec!(101.0), 1.0), dec!(0.1), t0());

        assert!(!gate.on_order_terminal("BTCUSDT", Side::Buy, dec!(99.0)));
        assert!(gate.on_order_terminal("BTCUSDT", Side::Buy, dec!(100.0)));
        assert_eq!(gate.last_forwarded("BTCUSDT"), Some((None, Some(dec!(101.0)))));
        assert!(!gate.on_order_terminal("ETHUSDT", Side::Sell, dec!(1)));
    }

    #[test]
    fn test_symbols_tracked_independently() {
        let mut gate = RequoteGate::new(GateConfig::default());
        gate.decide(&intent(dec!(100.0), dec!(101.0), 1.0), dec!(0.1), t0());

        let mut eth = intent(dec!(10.0), dec!(11.0), 1.0);
        eth.symbol = "ETHUSDT".to_string();
        assert!(gate.decide(&eth, dec!(0.1), t0() + ms(1)).is_forward());

        gate.reset("BTCUSDT");
        assert_eq!(gate.last_forwarded("BTCUSDT"), None);
        assert!(gate.last_forwarded_at("ETHUSDT").is_some());
    }

    #[test]
    fn test_backwards_clock_suppressed() {
        let mut gate = RequoteGate::new(GateConfig::default());
        gate.decide(&intent(dec!(100.0), dec!(101.0), 1.0), dec!(0.1), t0());
        let decision = gate.decide(&intent(dec!(90.0), dec!(91.0), 1.0), dec!(0.1), t0() - ms(5000));
        assert_eq!(
            decision,
            GateDecision::SuppressedInterval {
                remaining: Duration::from_millis(800)
            }
        );
    }
}

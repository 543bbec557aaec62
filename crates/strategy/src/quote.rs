//! Quote Engine
//!
//! Turns the book, the order-flow signal, the position and the risk state
//! into a two-sided PostOnly quote:
//!
//! 1. fair price = micro-price of a valid book
//! 2. volatility multiplier from the stddev of recent fair prices
//! 3. skew = inventory (cubic) + order flow (+ optional funding), clamped
//! 4. spread = base bps scaled by volatility, clamped to [min, max] bps
//! 5. targets shifted by skew, moved behind large walls, then quantized
//! 6. size from equity at risk, sides suppressed by the exposure check
//!
//! Every step is a free function so it can be tested on its own.

use crate::orderbook::{BookSide, BookSideKind, OrderBookView};
use keel_core::{Position, Price, Quantity, Side, SymbolSpec, Timestamp};
use keel_gateway::OrderRequest;
use keel_risk_manager::RiskGovernor;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

const BPS: Decimal = dec!(10000);

/// Quote engine parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteConfig {
    /// Spread per side before volatility scaling, in bps of fair price
    pub base_spread_bps: Decimal,
    pub min_spread_bps: Decimal,
    pub max_spread_bps: Decimal,
    /// k in `1 + k * stddev(fair)`
    pub volatility_k: f64,
    /// Fair-price samples kept for the stddev
    pub volatility_window: usize,
    /// Multiplier stays 1 below this many samples
    pub volatility_min_samples: usize,
    pub inventory_weight: f64,
    pub flow_weight: f64,
    pub funding_weight: f64,
    /// fundingSkew = -fundingRate * funding_factor
    pub funding_factor: f64,
    /// Fraction of equity put at risk per order
    pub risk_fraction: Decimal,
    /// Upper bound per order in base units
    pub max_order_size: Quantity,
    /// A level is a wall when qty > multiplier * mean(top `wall_depth`)
    pub wall_multiplier: Decimal,
    pub wall_depth: usize,
    /// Execution round-trip above which the spread widens
    pub latency_threshold_ms: u64,
    pub latency_widening: f64,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            base_spread_bps: dec!(6),
            min_spread_bps: dec!(2),
            max_spread_bps: dec!(60),
            volatility_k: 18.0,
            volatility_window: 40,
            volatility_min_samples: 10,
            inventory_weight: 0.6,
            flow_weight: 0.4,
            funding_weight: 0.0,
            funding_factor: 12.0,
            risk_fraction: dec!(0.012),
            max_order_size: dec!(1),
            wall_multiplier: dec!(2.8),
            wall_depth: 20,
            latency_threshold_ms: 250,
            latency_widening: 1.5,
        }
    }
}

/// Desired two-sided quote for one tick. A suppressed side has qty 0.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteIntent {
    pub symbol: String,
    pub bid_price: Price,
    pub bid_qty: Quantity,
    pub ask_price: Price,
    pub ask_qty: Quantity,
    pub fair_price: Price,
    pub volatility_multiplier: f64,
    pub generated_at: Timestamp,
}

impl QuoteIntent {
    pub fn has_bid(&self) -> bool {
        self.bid_qty > Decimal::ZERO
    }

    pub fn has_ask(&self) -> bool {
        self.ask_qty > Decimal::ZERO
    }

    /// PostOnly limit orders for the non-empty sides
    pub fn to_orders(&self) -> Vec<OrderRequest> {
        let mut orders = Vec::with_capacity(2);
        if self.has_bid() {
            orders.push(OrderRequest::post_only(
                &self.symbol,
                Side::Buy,
                self.bid_qty,
                self.bid_price,
            ));
        }
        if self.has_ask() {
            orders.push(OrderRequest::post_only(
                &self.symbol,
                Side::Sell,
                self.ask_qty,
                self.ask_price,
            ));
        }
        orders
    }
}

/// Everything a tick reads, borrowed from the symbol's owner
pub struct QuoteInputs<'a> {
    pub book: &'a OrderBookView,
    /// Bounded OFI signal in [-1, 1]
    pub flow_signal: f64,
    pub position: &'a Position,
    pub risk: &'a RiskGovernor,
    pub spec: &'a SymbolSpec,
    pub funding_rate: Option<Decimal>,
    /// Last measured execution round-trip
    pub latency: Option<Duration>,
    pub now: Timestamp,
}

pub struct QuoteEngine {
    config: QuoteConfig,
    fair_samples: VecDeque<f64>,
}

impl QuoteEngine {
    pub fn new(config: QuoteConfig) -> Self {
        let fair_samples = VecDeque::with_capacity(config.volatility_window.max(1));
        Self {
            config,
            fair_samples,
        }
    }

    pub fn config(&self) -> &QuoteConfig {
        &self.config
    }

    pub fn fair_samples(&self) -> &VecDeque<f64> {
        &self.fair_samples
    }

    fn record_fair(&mut self, fair: Price) {
        let Some(sample) = fair.to_f64() else {
            return;
        };
        if self.fair_samples.len() >= self.config.volatility_window.max(1) {
            self.fair_samples.pop_front();
        }
        self.fair_samples.push_back(sample);
    }

    /// Compute this tick's quote, or None when quoting is not possible
    pub fn compute(&mut self, inputs: &QuoteInputs<'_>) -> Option<QuoteIntent> {
        let symbol = inputs.book.symbol();

        if !inputs.risk.is_active() {
            debug!("[{}] risk halted, no quote", symbol);
            return None;
        }
        let equity = inputs.risk.equity().current();
        if equity <= Decimal::ZERO {
            debug!("[{}] equity unknown, no quote", symbol);
            return None;
        }
        let Some(fair) = inputs.book.fair_price() else {
            debug!("[{}] no valid fair price, no quote", symbol);
            return None;
        };

        self.record_fair(fair);
        let cfg = &self.config;

        let mut vol_mult = volatility_multiplier(
            &self.fair_samples,
            cfg.volatility_k,
            cfg.volatility_min_samples,
        );
        if let Some(latency) = inputs.latency {
            if latency > Duration::from_millis(cfg.latency_threshold_ms) {
                vol_mult *= cfg.latency_widening;
            }
        }

        let limits = inputs.risk.limits();
        let inv = inventory_skew(inputs.position, limits.max_position_notional);
        let funding = funding_skew(inputs.funding_rate, cfg.funding_factor);
        let skew = total_skew(inv, inputs.flow_signal, funding, cfg);

        let Some(spread) = dynamic_spread(
            fair,
            cfg.base_spread_bps,
            vol_mult,
            cfg.min_spread_bps,
            cfg.max_spread_bps,
        ) else {
            warn!("[{}] spread out of range at fair {}, no quote", symbol, fair);
            return None;
        };
        let Some((raw_bid, raw_ask)) = raw_targets(fair, spread, skew) else {
            warn!("[{}] targets out of range at fair {}, no quote", symbol, fair);
            return None;
        };

        let tick = inputs.spec.tick_size;
        let bid_target = avoid_wall(
            inputs.book.bids(),
            raw_bid,
            tick,
            cfg.wall_multiplier,
            cfg.wall_depth,
        );
        let ask_target = avoid_wall(
            inputs.book.asks(),
            raw_ask,
            tick,
            cfg.wall_multiplier,
            cfg.wall_depth,
        );

        let quantized = inputs
            .spec
            .quantize_bid(bid_target)
            .zip(inputs.spec.quantize_ask(ask_target));
        let Some((bid_price, ask_price)) = quantized else {
            warn!(
                "[{}] targets {} / {} cannot be quantized, no quote",
                symbol, bid_target, ask_target
            );
            return None;
        };
        if bid_price <= Decimal::ZERO || bid_price >= ask_price {
            warn!(
                "[{}] rejected quote bid {} >= ask {} (fair {} spread {} skew {:.3})",
                symbol, bid_price, ask_price, fair, spread, skew
            );
            return None;
        }

        let size = order_size(equity, fair, cfg.risk_fraction, cfg.max_order_size);
        let qty = inputs.spec.quantize_qty(size)?;

        let allowed = |side: Side, price: Price| {
            qty.checked_mul(price).is_some_and(|notional| {
                inputs
                    .risk
                    .check_exposure(inputs.position, side, notional)
                    .is_allowed()
            })
        };
        let bid_qty = if allowed(Side::Buy, bid_price) { qty } else { Decimal::ZERO };
        let ask_qty = if allowed(Side::Sell, ask_price) { qty } else { Decimal::ZERO };
        if bid_qty.is_zero() && ask_qty.is_zero() {
            return None;
        }

        info!(
            "[{}] Quoting: bid={}@{} ask={}@{} fair={:.4} skew={:.3} vol={:.2} pos={}",
            symbol,
            bid_qty,
            bid_price,
            ask_qty,
            ask_price,
            fair,
            skew,
            vol_mult,
            inputs.position.size
        );

        Some(QuoteIntent {
            symbol: symbol.to_string(),
            bid_price,
            bid_qty,
            ask_price,
            ask_qty,
            fair_price: fair,
            volatility_multiplier: vol_mult,
            generated_at: inputs.now,
        })
    }
}

/// `1 + k * stddev(samples)`, or 1 with too few samples
pub fn volatility_multiplier(samples: &VecDeque<f64>, k: f64, min_samples: usize) -> f64 {
    let n = samples.len();
    if n < min_samples.max(2) {
        return 1.0;
    }
    let mean = samples.iter().sum::<f64>() / n as f64;
    let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let mult = 1.0 + k * var.sqrt();
    if mult.is_finite() && mult >= 1.0 { mult } else { 1.0 }
}

/// `-sign(size) * |notional / cap|^3`
pub fn inventory_skew(position: &Position, max_position_notional: Decimal) -> f64 {
    let ratio = position
        .inventory_ratio(max_position_notional)
        .to_f64()
        .unwrap_or(0.0);
    if ratio == 0.0 {
        return 0.0;
    }
    -ratio.signum() * ratio.abs().powi(3)
}

/// `-fundingRate * factor`; 0 without a funding rate
pub fn funding_skew(funding_rate: Option<Decimal>, factor: f64) -> f64 {
    match funding_rate.and_then(|r| r.to_f64()) {
        Some(rate) => -rate * factor,
        None => 0.0,
    }
}

/// Weighted skew clamped to [-1, 1]; non-finite input collapses to 0
pub fn total_skew(inventory: f64, flow: f64, funding: f64, config: &QuoteConfig) -> f64 {
    let skew = config.inventory_weight * inventory
        + config.flow_weight * flow
        + config.funding_weight * funding;
    if skew.is_finite() {
        skew.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Per-side distance from fair price, clamped to [min, max] bps of fair.
/// None when the bounds leave the `Decimal` range.
pub fn dynamic_spread(
    fair: Price,
    base_bps: Decimal,
    volatility_multiplier: f64,
    min_bps: Decimal,
    max_bps: Decimal,
) -> Option<Decimal> {
    let mult = Decimal::from_f64(volatility_multiplier).unwrap_or(Decimal::ONE);
    let of_fair = |bps: Decimal| (bps / BPS).checked_mul(fair);
    let lo = of_fair(min_bps)?;
    let hi = of_fair(max_bps)?.max(lo);
    // A multiplier too large to apply saturates at the upper bound
    let raw = of_fair(base_bps)?.checked_mul(mult).unwrap_or(hi);
    Some(raw.max(lo).min(hi))
}

/// `(fair - spread*(1 - skew), fair + spread*(1 + skew))`, None on overflow
pub fn raw_targets(fair: Price, spread: Decimal, skew: f64) -> Option<(Price, Price)> {
    let skew = Decimal::from_f64(skew.clamp(-1.0, 1.0)).unwrap_or(Decimal::ZERO);
    let bid = fair.checked_sub(spread.checked_mul(Decimal::ONE - skew)?)?;
    let ask = fair.checked_add(spread.checked_mul(Decimal::ONE + skew)?)?;
    Some((bid, ask))
}

/// Move a target to one tick behind the nearest wall that sits between the
/// target and the top of its side. Targets with no such wall are unchanged.
pub fn avoid_wall(
    side: &BookSide,
    target: Price,
    tick: Price,
    multiplier: Decimal,
    depth: usize,
) -> Price {
    let levels = side.top_k(depth);
    if levels.is_empty() {
        return target;
    }
    // No wall can be told apart when the depth itself overflows
    let Some(threshold) = side
        .depth_sum(depth)
        .and_then(|total| total.checked_div(Decimal::from(levels.len())))
        .and_then(|mean| mean.checked_mul(multiplier))
    else {
        return target;
    };
    let walls = levels.iter().filter(|(_, q)| *q > threshold).map(|(p, _)| *p);

    let moved = match side.kind() {
        BookSideKind::Bid => walls
            .filter(|p| *p > target)
            .min()
            .map(|wall| wall.checked_sub(tick)),
        BookSideKind::Ask => walls
            .filter(|p| *p < target)
            .max()
            .map(|wall| wall.checked_add(tick)),
    };
    moved.flatten().unwrap_or(target)
}

/// `min(risk_fraction * equity / fair, max_order_size)` before quantization
pub fn order_size(
    equity: Decimal,
    fair: Price,
    risk_fraction: Decimal,
    max_order_size: Quantity,
) -> Quantity {
    if fair <= Decimal::ZERO || equity <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    // Anything too large to represent is above the cap anyway
    risk_fraction
        .checked_mul(equity)
        .and_then(|at_risk| at_risk.checked_div(fair))
        .map_or(max_order_size, |size| size.min(max_order_size))
}

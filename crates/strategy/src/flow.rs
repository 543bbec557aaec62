//! Order-flow imbalance (OFI) signal
//!
//! Each applied update contributes one delta: the change in resting volume
//! over the top N bid levels minus the change over the top N ask levels.
//! Deltas are kept in a short window and averaged with weights that grow
//! linearly toward the newest sample, then squashed with `tanh`.

use crate::orderbook::OrderBookView;
use log::warn;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

const OLDEST_WEIGHT: f64 = 0.1;
const NEWEST_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Levels per side summed for each observation
    pub depth: usize,
    /// Number of deltas kept
    pub history_len: usize,
    /// Normalization applied before `tanh`
    pub scale: f64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            depth: 10,
            history_len: 20,
            scale: 600.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlowSignalEstimator {
    config: FlowConfig,
    /// Top-N (bid, ask) volume sums from the previous observation
    previous: Option<(Decimal, Decimal)>,
    history: VecDeque<Decimal>,
}

impl FlowSignalEstimator {
    pub fn new(config: FlowConfig) -> Self {
        let history = VecDeque::with_capacity(config.history_len.max(1));
        Self {
            config,
            previous: None,
            history,
        }
    }

    /// Observe the book after an applied update. Returns the delta pushed,
    /// or None for the first observation (baseline only) and for books whose
    /// depth sums leave the `Decimal` range.
    pub fn update(&mut self, book: &OrderBookView) -> Option<Decimal> {
        let depth = self.config.depth;
        let sums = book.total_bid_qty(depth).zip(book.total_ask_qty(depth));
        let Some((bid_sum, ask_sum)) = sums else {
            warn!(
                "[{}] top-{} depth overflows, flow observation skipped",
                book.symbol(),
                depth
            );
            self.previous = None;
            return None;
        };

        let delta = match self.previous {
            Some((prev_bid, prev_ask)) => {
                let delta = ofi_delta(bid_sum, prev_bid, ask_sum, prev_ask);
                if delta.is_none() {
                    warn!("[{}] OFI delta overflows, observation skipped", book.symbol());
                }
                delta
            }
            None => None,
        };
        self.previous = Some((bid_sum, ask_sum));

        if let Some(delta) = delta {
            if self.history.len() >= self.config.history_len.max(1) {
                self.history.pop_front();
            }
            self.history.push_back(delta);
        }
        delta
    }

    /// Drop baseline and history (book discontinuity)
    pub fn reset(&mut self) {
        self.previous = None;
        self.history.clear();
    }

    pub fn history(&self) -> &VecDeque<Decimal> {
        &self.history
    }

    /// Recency-weighted mean of the window, 0 when empty
    pub fn weighted_average(&self) -> f64 {
        let weights = recency_weights(self.history.len());
        let mut num = 0.0;
        let mut den = 0.0;
        for (delta, weight) in self.history.iter().zip(weights) {
            num += delta.to_f64().unwrap_or(0.0) * weight;
            den += weight;
        }
        if den == 0.0 { 0.0 } else { num / den }
    }

    /// Bounded OFI signal in [-1, 1]
    pub fn signal(&self) -> f64 {
        squash(self.weighted_average(), self.config.scale)
    }
}

/// `(bid - prev_bid) - (ask - prev_ask)`, None on overflow
fn ofi_delta(bid: Decimal, prev_bid: Decimal, ask: Decimal, prev_ask: Decimal) -> Option<Decimal> {
    bid.checked_sub(prev_bid)?
        .checked_sub(ask.checked_sub(prev_ask)?)
}

/// Linearly spaced weights from 0.1 (oldest) to 1.0 (newest)
pub fn recency_weights(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![OLDEST_WEIGHT],
        _ => {
            let step = (NEWEST_WEIGHT - OLDEST_WEIGHT) / (n - 1) as f64;
            (0..n).map(|i| OLDEST_WEIGHT + step * i as f64).collect()
        }
    }
}

/// `tanh(value / scale)`, 0 for degenerate input
pub fn squash(value: f64, scale: f64) -> f64 {
    if !value.is_finite() || !scale.is_finite() || scale <= 0.0 {
        return 0.0;
    }
    (value / scale).tanh()
}

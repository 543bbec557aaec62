//! Local Order Book Replica
//!
//! The book for a symbol is owned by exactly one task and mutated through
//! `&mut self`, so every level of a message is applied before anything can
//! read the book. No locks are needed when reading it.

use crate::error::BookError;
use keel_core::{Price, Quantity, Timestamp};
use keel_gateway::{BookLevel, OrderBookUpdate};
use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookSideKind {
    Bid,
    Ask,
}

/// Resting liquidity at one price
#[derive(Debug, Clone, PartialEq)]
pub struct PriceLevel {
    pub price: Price,
    pub quantity: Quantity,
    pub touched_at: Timestamp,
}

/// One side of the book: price -> level, iterated best first
///
/// Backed by a `BTreeMap`, giving O(log n) insert/update/remove at any
/// price and O(k) walks of the top k levels. Zero quantities are never
/// stored.
#[derive(Debug, Clone)]
pub struct BookSide {
    kind: BookSideKind,
    levels: BTreeMap<Price, PriceLevel>,
}

impl BookSide {
    pub fn new(kind: BookSideKind) -> Self {
        Self {
            kind,
            levels: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> BookSideKind {
        self.kind
    }

    /// Set the quantity at `price`; a non-positive quantity removes the level
    pub fn insert_or_update(&mut self, price: Price, quantity: Quantity, touched_at: Timestamp) {
        if quantity <= Decimal::ZERO {
            self.levels.remove(&price);
            return;
        }
        self.levels.insert(
            price,
            PriceLevel {
                price,
                quantity,
                touched_at,
            },
        );
    }

    pub fn remove(&mut self, price: Price) -> Option<PriceLevel> {
        self.levels.remove(&price)
    }

    /// Highest bid or lowest ask
    pub fn best(&self) -> Option<&PriceLevel> {
        match self.kind {
            BookSideKind::Bid => self.levels.last_key_value().map(|(_, l)| l),
            BookSideKind::Ask => self.levels.first_key_value().map(|(_, l)| l),
        }
    }

    /// Levels best first (bids descending, asks ascending)
    pub fn iter(&self) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        match self.kind {
            BookSideKind::Bid => Box::new(self.levels.values().rev()),
            BookSideKind::Ask => Box::new(self.levels.values()),
        }
    }

    /// Top k (price, quantity) pairs, best first
    pub fn top_k(&self, k: usize) -> Vec<(Price, Quantity)> {
        self.iter().take(k).map(|l| (l.price, l.quantity)).collect()
    }

    /// Sum of quantities over the top k levels, None on overflow
    pub fn depth_sum(&self, k: usize) -> Option<Quantity> {
        self.iter()
            .take(k)
            .try_fold(Decimal::ZERO, |acc, l| acc.checked_add(l.quantity))
    }

    pub fn level(&self, price: Price) -> Option<&PriceLevel> {
        self.levels.get(&price)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn clear(&mut self) {
        self.levels.clear();
    }
}

/// Summary of a successfully applied update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub update_id: u64,
    pub levels: usize,
    pub snapshot: bool,
    /// Best bid >= best ask after the update
    pub crossed: bool,
}

/// Reconstructed order book for a single symbol
#[derive(Debug, Clone)]
pub struct OrderBookView {
    symbol: String,
    bids: BookSide,
    asks: BookSide,
    last_update_id: u64,
    initialized: bool,
    last_update_at: Option<Timestamp>,
}

impl OrderBookView {
    /// Create a new empty order book; usable after the first snapshot
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: BookSide::new(BookSideKind::Bid),
            asks: BookSide::new(BookSideKind::Ask),
            last_update_id: 0,
            initialized: false,
            last_update_at: None,
        }
    }

    /// Apply an update (snapshot or delta) to the order book
    pub fn apply(&mut self, update: &OrderBookUpdate) -> Result<Applied, BookError> {
        if update.symbol() != self.symbol {
            return Err(BookError::WrongSymbol {
                symbol: self.symbol.clone(),
                update_id: update.update_id(),
                got: update.symbol().to_string(),
            });
        }
        match update {
            OrderBookUpdate::Snapshot {
                bids,
                asks,
                update_id,
                received_at,
                ..
            } => Ok(self.apply_snapshot(bids, asks, *update_id, *received_at)),
            OrderBookUpdate::Delta {
                bids,
                asks,
                update_id,
                received_at,
                ..
            } => self.apply_delta(bids, asks, *update_id, *received_at),
        }
    }

    /// Replace both sides wholesale. The update id is taken unconditionally.
    pub fn apply_snapshot(
        &mut self,
        bids: &[BookLevel],
        asks: &[BookLevel],
        update_id: u64,
        at: Timestamp,
    ) -> Applied {
        self.bids.clear();
        self.asks.clear();
        for level in bids {
            self.bids.insert_or_update(level.price, level.quantity, at);
        }
        for level in asks {
            self.asks.insert_or_update(level.price, level.quantity, at);
        }
        self.last_update_id = update_id;
        self.initialized = true;
        self.last_update_at = Some(at);

        debug!(
            "[{}] snapshot {} applied: {} bids, {} asks",
            self.symbol,
            update_id,
            self.bids.len(),
            self.asks.len()
        );
        self.finish(update_id, bids.len() + asks.len(), true)
    }

    /// Apply incremental changes. Stale or pre-snapshot deltas leave the
    /// book untouched.
    pub fn apply_delta(
        &mut self,
        bids: &[BookLevel],
        asks: &[BookLevel],
        update_id: u64,
        at: Timestamp,
    ) -> Result<Applied, BookError> {
        if !self.initialized {
            return Err(BookError::NotInitialized {
                symbol: self.symbol.clone(),
                update_id,
            });
        }
        if update_id <= self.last_update_id {
            return Err(BookError::StaleUpdate {
                symbol: self.symbol.clone(),
                update_id,
                last_update_id: self.last_update_id,
            });
        }

        for level in bids {
            self.bids.insert_or_update(level.price, level.quantity, at);
        }
        for level in asks {
            self.asks.insert_or_update(level.price, level.quantity, at);
        }
        self.last_update_id = update_id;
        self.last_update_at = Some(at);

        Ok(self.finish(update_id, bids.len() + asks.len(), false))
    }

    fn finish(&self, update_id: u64, levels: usize, snapshot: bool) -> Applied {
        let crossed = self.is_crossed();
        if crossed {
            if let Some(err) = self.crossed_error() {
                warn!("{}", err);
            }
        }
        Applied {
            update_id,
            levels,
            snapshot,
            crossed,
        }
    }

    /// Forget all state; the next message must be a snapshot
    pub fn reset(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.last_update_id = 0;
        self.initialized = false;
        self.last_update_at = None;
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn last_update_id(&self) -> u64 {
        self.last_update_id
    }

    pub fn last_update_at(&self) -> Option<Timestamp> {
        self.last_update_at
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn bids(&self) -> &BookSide {
        &self.bids
    }

    pub fn asks(&self) -> &BookSide {
        &self.asks
    }

    // === Price Queries ===

    /// Get best bid price and quantity
    pub fn best_bid(&self) -> Option<(Price, Quantity)> {
        self.bids.best().map(|l| (l.price, l.quantity))
    }

    /// Get best ask price and quantity
    pub fn best_ask(&self) -> Option<(Price, Quantity)> {
        self.asks.best().map(|l| (l.price, l.quantity))
    }

    /// (best bid, best ask), or None if either side is empty
    pub fn best_bid_ask(&self) -> Option<(Price, Price)> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some((bid, ask)),
            _ => None,
        }
    }

    pub fn is_two_sided(&self) -> bool {
        !self.bids.is_empty() && !self.asks.is_empty()
    }

    pub fn is_crossed(&self) -> bool {
        matches!(self.best_bid_ask(), Some((bid, ask)) if bid >= ask)
    }

    fn crossed_error(&self) -> Option<BookError> {
        let (best_bid, best_ask) = self.best_bid_ask()?;
        Some(BookError::CrossedBook {
            symbol: self.symbol.clone(),
            update_id: self.last_update_id,
            best_bid,
            best_ask,
        })
    }

    /// Get mid price (average of best bid and ask)
    pub fn mid_price(&self) -> Option<Price> {
        let (bid, ask) = self.best_bid_ask()?;
        bid.checked_add(ask)?.checked_div(Decimal::TWO)
    }

    /// Get spread (ask - bid)
    pub fn spread(&self) -> Option<Price> {
        let (bid, ask) = self.best_bid_ask()?;
        ask.checked_sub(bid)
    }

    /// Get spread in basis points of mid
    pub fn spread_bps(&self) -> Option<Decimal> {
        match (self.spread(), self.mid_price()) {
            (Some(spread), Some(mid)) if !mid.is_zero() => spread
                .checked_div(mid)?
                .checked_mul(Decimal::from(10000)),
            _ => None,
        }
    }

    /// Size-weighted micro-price:
    /// (bestBid * askQty + bestAsk * bidQty) / (bidQty + askQty)
    ///
    /// None when a side is empty or the book is crossed.
    pub fn micro_price(&self) -> Option<Price> {
        let (bid, bid_qty) = self.best_bid()?;
        let (ask, ask_qty) = self.best_ask()?;
        if bid >= ask {
            return None;
        }
        let total = bid_qty.checked_add(ask_qty)?;
        if total.is_zero() {
            return None;
        }
        let weighted = bid
            .checked_mul(ask_qty)?
            .checked_add(ask.checked_mul(bid_qty)?)?;
        weighted.checked_div(total)
    }

    /// Fair price for quoting: the micro-price of a valid book
    pub fn fair_price(&self) -> Option<Price> {
        self.micro_price()
    }

    // === Level Queries ===

    /// Get top N bid levels (highest prices first)
    pub fn top_bids(&self, n: usize) -> Vec<(Price, Quantity)> {
        self.bids.top_k(n)
    }

    /// Get top N ask levels (lowest prices first)
    pub fn top_asks(&self, n: usize) -> Vec<(Price, Quantity)> {
        self.asks.top_k(n)
    }

    /// Get total bid quantity up to N levels
    pub fn total_bid_qty(&self, levels: usize) -> Option<Quantity> {
        self.bids.depth_sum(levels)
    }

    /// Get total ask quantity up to N levels
    pub fn total_ask_qty(&self, levels: usize) -> Option<Quantity> {
        self.asks.depth_sum(levels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn levels(raw: &[(Decimal, Decimal)]) -> Vec<BookLevel> {
        raw.iter().map(|(p, q)| BookLevel::new(*p, *q)).collect()
    }

    fn sample_snapshot() -> OrderBookUpdate {
        OrderBookUpdate::snapshot(
            "BTCUSDT",
            levels(&[(dec!(100.00), dec!(10)), (dec!(99.99), dec!(5))]),
            levels(&[(dec!(100.02), dec!(8)), (dec!(100.03), dec!(4))]),
            1,
            Utc::now(),
        )
    }

    fn delta(id: u64, bids: &[(Decimal, Decimal)], asks: &[(Decimal, Decimal)]) -> OrderBookUpdate {
        OrderBookUpdate::delta("BTCUSDT", levels(bids), levels(asks), id, Utc::now())
    }

    fn book() -> OrderBookView {
        let mut book = OrderBookView::new("BTCUSDT");
        book.apply(&sample_snapshot()).unwrap();
        book
    }

    #[test]
    fn test_apply_snapshot() {
        let book = book();
        assert_eq!(book.best_bid_ask(), Some((dec!(100.00), dec!(100.02))));
        assert_eq!(book.best_bid(), Some((dec!(100.00), dec!(10))));
        assert_eq!(book.last_update_id(), 1);
        assert!(book.is_initialized());
    }

    #[test]
    fn test_micro_price_formula() {
        let book = book();
        let expected = (dec!(100.00) * dec!(8) + dec!(100.02) * dec!(10)) / dec!(18);
        assert_eq!(book.micro_price(), Some(expected));
        let micro = book.micro_price().unwrap();
        assert!(micro > dec!(100.00) && micro < dec!(100.02));
    }

    #[test]
    fn test_zero_qty_removes_best_bid() {
        let mut book = book();
        let applied = book
            .apply(&delta(2, &[(dec!(100.00), dec!(0))], &[]))
            .unwrap();
        assert!(!applied.crossed);
        assert_eq!(book.best_bid(), Some((dec!(99.99), dec!(5))));
        assert_eq!(book.top_asks(2), vec![(dec!(100.02), dec!(8)), (dec!(100.03), dec!(4))]);
        assert_eq!(book.last_update_id(), 2);
    }

    #[test]
    fn test_zero_qty_absent_level_is_noop() {
        let mut book = book();
        book.apply(&delta(2, &[(dec!(42), dec!(0))], &[])).unwrap();
        assert_eq!(book.bids().len(), 2);
    }

    #[test]
    fn test_stale_delta_rejected_without_mutation() {
        let mut book = book();
        book.apply(&delta(5, &[(dec!(99.98), dec!(1))], &[])).unwrap();

        for stale_id in [5, 3] {
            let err = book
                .apply(&delta(stale_id, &[(dec!(100.00), dec!(0))], &[]))
                .unwrap_err();
            assert_eq!(
                err,
                BookError::StaleUpdate {
                    symbol: "BTCUSDT".to_string(),
                    update_id: stale_id,
                    last_update_id: 5
                }
            );
        }
        assert_eq!(book.best_bid(), Some((dec!(100.00), dec!(10))));
        assert_eq!(book.last_update_id(), 5);
    }

    #[test]
    fn test_snapshot_resets_update_id_unconditionally() {
        let mut book = book();
        book.apply(&delta(100, &[], &[])).unwrap();
        book.apply(&sample_snapshot()).unwrap();
        assert_eq!(book.last_update_id(), 1);
    }

    #[test]
    fn test_delta_before_snapshot() {
        let mut book = OrderBookView::new("BTCUSDT");
        let err = book
            .apply(&delta(1, &[(dec!(1), dec!(1))], &[]))
            .unwrap_err();
        assert!(err.needs_snapshot());
        assert!(book.bids().is_empty());
    }

    #[test]
    fn test_crossed_book_kept_but_no_fair_price() {
        let mut book = book();
        let applied = book
            .apply(&delta(2, &[(dec!(100.05), dec!(1))], &[]))
            .unwrap();
        assert!(applied.crossed);
        assert!(book.is_crossed());
        assert_eq!(book.best_bid(), Some((dec!(100.05), dec!(1))));
        assert_eq!(book.fair_price(), None);

        // A later update clears the cross
        let applied = book
            .apply(&delta(3, &[(dec!(100.05), dec!(0))], &[]))
            .unwrap();
        assert!(!applied.crossed);
        assert!(book.fair_price().is_some());
    }

    #[test]
    fn test_one_sided_book() {
        let mut book = book();
        book.apply(&delta(2, &[], &[(dec!(100.02), dec!(0)), (dec!(100.03), dec!(0))]))
            .unwrap();
        assert_eq!(book.best_bid_ask(), None);
        assert_eq!(book.micro_price(), None);
        assert!(!book.is_two_sided());
    }

    #[test]
    fn test_wrong_symbol() {
        let mut book = book();
        let update = OrderBookUpdate::delta("ETHUSDT", vec![], vec![], 9, Utc::now());
        assert!(matches!(
            book.apply(&update),
            Err(BookError::WrongSymbol { .. })
        ));
        assert_eq!(book.last_update_id(), 1);
    }

    #[test]
    fn test_book_side_ordering_and_depth() {
        let now = Utc::now();
        let mut bids = BookSide::new(BookSideKind::Bid);
        for (p, q) in [(dec!(10), dec!(1)), (dec!(12), dec!(2)), (dec!(11), dec!(3))] {
            bids.insert_or_update(p, q, now);
        }
        assert_eq!(bids.best().map(|l| l.price), Some(dec!(12)));
        assert_eq!(
            bids.top_k(2),
            vec![(dec!(12), dec!(2)), (dec!(11), dec!(3))]
        );
        assert_eq!(bids.depth_sum(10), Some(dec!(6)));
        assert_eq!(bids.remove(dec!(11)).map(|l| l.quantity), Some(dec!(3)));
        assert_eq!(bids.remove(dec!(11)), None);

        let mut asks = BookSide::new(BookSideKind::Ask);
        asks.insert_or_update(dec!(13), dec!(1), now);
        asks.insert_or_update(dec!(12.5), dec!(1), now);
        asks.insert_or_update(dec!(14), dec!(0), now);
        assert_eq!(asks.best().map(|l| l.price), Some(dec!(12.5)));
        assert_eq!(asks.len(), 2);
    }

    #[test]
    fn test_spread_and_mid() {
        let book = book();
        assert_eq!(book.mid_price(), Some(dec!(100.01)));
        assert_eq!(book.spread(), Some(dec!(0.02)));
        assert_eq!(book.total_bid_qty(10), Some(dec!(15)));
        assert_eq!(book.total_ask_qty(1), Some(dec!(8)));
    }

    #[test]
    fn test_extreme_quantities_do_not_overflow() {
        let huge = dec!(50000000000000000000000000000);
        let mut book = OrderBookView::new("BTCUSDT");
        book.apply(&OrderBookUpdate::snapshot(
            "BTCUSDT",
            levels(&[(dec!(100.00), huge), (dec!(99.99), huge)]),
            levels(&[(dec!(100.02), huge)]),
            1,
            Utc::now(),
        ))
        .unwrap();

        assert_eq!(book.total_bid_qty(10), None);
        assert_eq!(book.total_ask_qty(10), Some(huge));
        // bid * askQty overflows: no micro-price, no fair price
        assert_eq!(book.fair_price(), None);
        assert_eq!(book.mid_price(), Some(dec!(100.01)));

        let mut top = OrderBookView::new("BTCUSDT");
        top.apply(&OrderBookUpdate::snapshot(
            "BTCUSDT",
            levels(&[(Decimal::MAX, dec!(1))]),
            levels(&[(Decimal::MAX, dec!(1))]),
            1,
            Utc::now(),
        ))
        .unwrap();
        assert_eq!(top.mid_price(), None);
    }
}

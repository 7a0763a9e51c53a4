//! Order book structure and maintenance.
//!
//! One book per instrument. Bids are keyed descending, asks ascending, so
//! the first entry of either ladder is always the best price. Resting
//! orders live in the book's pool; levels and the id lookup hold handles.

use alloc::collections::BTreeMap;
use core::cmp::Reverse;

use hashbrown::HashMap;

use crate::fixed::{Price, Qty};
use crate::level::PriceLevel;
use crate::order::RestingOrder;
use crate::pool::{Handle, ObjectPool};
use crate::types::{InstrumentId, OrderId, Side};

/// Default resting-order capacity per book.
pub const ORDER_POOL_SIZE: usize = 65536;

/// One row of a depth snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DepthEntry {
    pub price: Price,
    pub quantity: Qty,
    pub order_count: u32,
}

/// Price-time priority order book for a single instrument.
pub struct OrderBook {
    instrument: InstrumentId,
    pub(crate) pool: ObjectPool<RestingOrder>,
    /// Bid ladder, best (highest) price first.
    pub(crate) bids: BTreeMap<Reverse<Price>, PriceLevel>,
    /// Ask ladder, best (lowest) price first.
    pub(crate) asks: BTreeMap<Price, PriceLevel>,
    /// Resting orders by id. An id resolves iff the order is resting.
    pub(crate) lookup: HashMap<OrderId, Handle>,
    // Cached BBO. Internal sentinels: bid = 0, ask = Price::MAX.
    pub(crate) best_bid: Price,
    pub(crate) best_ask: Price,
    pub(crate) best_bid_qty: Qty,
    pub(crate) best_ask_qty: Qty,
}

impl OrderBook {
    pub fn new(instrument: InstrumentId) -> Self {
        Self::with_pool_capacity(instrument, ORDER_POOL_SIZE)
    }

    /// Book with an explicit resting-order capacity (tests, small venues).
    pub fn with_pool_capacity(instrument: InstrumentId, capacity: usize) -> Self {
        Self {
            instrument,
            pool: ObjectPool::with_capacity(capacity),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            lookup: HashMap::new(),
            best_bid: Price::ZERO,
            best_ask: Price::MAX,
            best_bid_qty: Qty::ZERO,
            best_ask_qty: Qty::ZERO,
        }
    }

    #[inline(always)]
    pub fn instrument(&self) -> InstrumentId {
        self.instrument
    }

    /// Best bid price; zero when the side is empty.
    #[inline(always)]
    pub fn best_bid(&self) -> Price {
        self.best_bid
    }

    /// Best ask price; zero when the side is empty (the internal sentinel
    /// is never reported).
    #[inline(always)]
    pub fn best_ask(&self) -> Price {
        if self.best_ask == Price::MAX {
            Price::ZERO
        } else {
            self.best_ask
        }
    }

    #[inline(always)]
    pub fn best_bid_qty(&self) -> Qty {
        self.best_bid_qty
    }

    #[inline(always)]
    pub fn best_ask_qty(&self) -> Qty {
        self.best_ask_qty
    }

    /// Best-ask minus best-bid; zero when either side is empty.
    pub fn spread(&self) -> Price {
        if self.bids.is_empty() || self.asks.is_empty() {
            Price::ZERO
        } else {
            self.best_ask - self.best_bid
        }
    }

    /// Number of resting orders.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.lookup.len()
    }

    #[inline]
    pub fn bid_level_count(&self) -> usize {
        self.bids.len()
    }

    #[inline]
    pub fn ask_level_count(&self) -> usize {
        self.asks.len()
    }

    /// Cancel a resting order by id. O(1) lookup and unlink.
    pub fn cancel(&mut self, id: OrderId) -> bool {
        let Some(handle) = self.lookup.remove(&id) else {
            return false;
        };

        let (side, price) = {
            let entry = self.pool.get(handle);
            (entry.side, entry.price)
        };

        match side {
            Side::Buy => {
                let now_empty = if let Some(level) = self.bids.get_mut(&Reverse(price)) {
                    level.unlink(&mut self.pool, handle);
                    level.is_empty()
                } else {
                    false
                };
                if now_empty {
                    self.bids.remove(&Reverse(price));
                }
                self.refresh_best_bid();
            }
            Side::Sell => {
                let now_empty = if let Some(level) = self.asks.get_mut(&price) {
                    level.unlink(&mut self.pool, handle);
                    level.is_empty()
                } else {
                    false
                };
                if now_empty {
                    self.asks.remove(&price);
                }
                self.refresh_best_ask();
            }
        }

        self.pool.release(handle);
        true
    }

    /// Modify a resting order: strictly cancel + add, losing time priority.
    /// Unknown id yields an empty trade set and no mutation.
    pub fn modify(&mut self, id: OrderId, new_price: Price, new_qty: Qty) -> crate::engine::TradeSet {
        let Some(&handle) = self.lookup.get(&id) else {
            return crate::engine::TradeSet::new();
        };

        let (side, kind, timestamp) = {
            let entry = self.pool.get(handle);
            (entry.side, entry.kind, entry.timestamp)
        };

        self.cancel(id);
        self.add(id, side, kind, new_price, new_qty, timestamp)
    }

    /// Snapshot the top of each ladder into caller-provided slices.
    /// Returns the number of levels written per side.
    pub fn depth(&self, bids_out: &mut [DepthEntry], asks_out: &mut [DepthEntry]) -> (usize, usize) {
        let mut nb = 0;
        for (&Reverse(price), level) in self.bids.iter().take(bids_out.len()) {
            bids_out[nb] = DepthEntry {
                price,
                quantity: level.total_qty,
                order_count: level.order_count,
            };
            nb += 1;
        }

        let mut na = 0;
        for (&price, level) in self.asks.iter().take(asks_out.len()) {
            asks_out[na] = DepthEntry {
                price,
                quantity: level.total_qty,
                order_count: level.order_count,
            };
            na += 1;
        }

        (nb, na)
    }

    /// Volume-weighted average price across the top `levels` levels of a
    /// side. Zero when the side is empty.
    pub fn vwap(&self, side: Side, levels: usize) -> f64 {
        let mut total_value = 0.0f64;
        let mut total_qty = 0.0f64;

        match side {
            Side::Buy => {
                for (&Reverse(price), level) in self.bids.iter().take(levels) {
                    let qty = level.total_qty.0 as f64;
                    total_value += price.0 as f64 * qty;
                    total_qty += qty;
                }
            }
            Side::Sell => {
                for (&price, level) in self.asks.iter().take(levels) {
                    let qty = level.total_qty.0 as f64;
                    total_value += price.0 as f64 * qty;
                    total_qty += qty;
                }
            }
        }

        if total_qty > 0.0 {
            total_value / total_qty
        } else {
            0.0
        }
    }

    /// Link an order into its side's ladder.
    pub(crate) fn rest(&mut self, handle: Handle) {
        let (side, price) = {
            let entry = self.pool.get(handle);
            (entry.side, entry.price)
        };

        match side {
            Side::Buy => {
                let level = self
                    .bids
                    .entry(Reverse(price))
                    .or_insert_with(|| PriceLevel::new(price));
                level.push_back(&mut self.pool, handle);
                self.refresh_best_bid();
            }
            Side::Sell => {
                let level = self.asks.entry(price).or_insert_with(|| PriceLevel::new(price));
                level.push_back(&mut self.pool, handle);
                self.refresh_best_ask();
            }
        }
    }

    pub(crate) fn refresh_best_bid(&mut self) {
        match self.bids.first_key_value() {
            Some((&Reverse(price), level)) => {
                self.best_bid = price;
                self.best_bid_qty = level.total_qty;
            }
            None => {
                self.best_bid = Price::ZERO;
                self.best_bid_qty = Qty::ZERO;
            }
        }
    }

    pub(crate) fn refresh_best_ask(&mut self) {
        match self.asks.first_key_value() {
            Some((&price, level)) => {
                self.best_ask = price;
                self.best_ask_qty = level.total_qty;
            }
            None => {
                self.best_ask = Price::MAX;
                self.best_ask_qty = Qty::ZERO;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderKind;

    fn book() -> OrderBook {
        OrderBook::new(InstrumentId(0))
    }

    #[test]
    fn bbo_tracks_resting_orders() {
        let mut b = book();

        b.add(OrderId(1), Side::Buy, OrderKind::Limit, Price(10000), Qty(100), 1);
        b.add(OrderId(2), Side::Sell, OrderKind::Limit, Price(10100), Qty(50), 2);

        assert_eq!(b.best_bid(), Price(10000));
        assert_eq!(b.best_ask(), Price(10100));
        assert_eq!(b.best_bid_qty(), Qty(100));
        assert_eq!(b.best_ask_qty(), Qty(50));
        assert_eq!(b.spread(), Price(100));
    }

    #[test]
    fn better_bid_moves_top() {
        let mut b = book();

        b.add(OrderId(1), Side::Buy, OrderKind::Limit, Price(10000), Qty(100), 1);
        b.add(OrderId(2), Side::Buy, OrderKind::Limit, Price(10100), Qty(10), 2);
        b.add(OrderId(3), Side::Buy, OrderKind::Limit, Price(9900), Qty(10), 3);

        assert_eq!(b.best_bid(), Price(10100));
        assert_eq!(b.best_bid_qty(), Qty(10));
        assert_eq!(b.bid_level_count(), 3);
    }

    #[test]
    fn empty_sides_report_zero() {
        let b = book();
        assert_eq!(b.best_bid(), Price::ZERO);
        assert_eq!(b.best_ask(), Price::ZERO);
        assert_eq!(b.spread(), Price::ZERO);
    }

    #[test]
    fn cancel_unknown_is_false() {
        let mut b = book();
        assert!(!b.cancel(OrderId(99)));
    }

    #[test]
    fn add_then_cancel_restores_book() {
        let mut b = book();
        b.add(OrderId(1), Side::Sell, OrderKind::Limit, Price(10100), Qty(50), 1);

        let before = (
            b.best_bid(),
            b.best_ask(),
            b.best_bid_qty(),
            b.best_ask_qty(),
            b.order_count(),
            b.ask_level_count(),
        );

        b.add(OrderId(2), Side::Sell, OrderKind::Limit, Price(10050), Qty(25), 2);
        assert_eq!(b.best_ask(), Price(10050));
        assert!(b.cancel(OrderId(2)));

        let after = (
            b.best_bid(),
            b.best_ask(),
            b.best_bid_qty(),
            b.best_ask_qty(),
            b.order_count(),
            b.ask_level_count(),
        );
        assert_eq!(before, after);
    }

    #[test]
    fn lookup_consistency() {
        let mut b = book();
        b.add(OrderId(7), Side::Buy, OrderKind::Limit, Price(10000), Qty(10), 1);
        assert_eq!(b.order_count(), 1);

        assert!(b.cancel(OrderId(7)));
        assert_eq!(b.order_count(), 0);
        assert!(!b.cancel(OrderId(7)));
    }

    #[test]
    fn depth_snapshot() {
        let mut b = book();
        b.add(OrderId(1), Side::Buy, OrderKind::Limit, Price(10000), Qty(100), 1);
        b.add(OrderId(2), Side::Buy, OrderKind::Limit, Price(9990), Qty(200), 2);
        b.add(OrderId(3), Side::Buy, OrderKind::Limit, Price(10000), Qty(50), 3);
        b.add(OrderId(4), Side::Sell, OrderKind::Limit, Price(10010), Qty(75), 4);

        let mut bids = [DepthEntry::default(); 4];
        let mut asks = [DepthEntry::default(); 4];
        let (nb, na) = b.depth(&mut bids, &mut asks);

        assert_eq!(nb, 2);
        assert_eq!(na, 1);
        assert_eq!(bids[0], DepthEntry { price: Price(10000), quantity: Qty(150), order_count: 2 });
        assert_eq!(bids[1], DepthEntry { price: Price(9990), quantity: Qty(200), order_count: 1 });
        assert_eq!(asks[0], DepthEntry { price: Price(10010), quantity: Qty(75), order_count: 1 });
    }

    #[test]
    fn vwap_over_levels() {
        let mut b = book();
        b.add(OrderId(1), Side::Sell, OrderKind::Limit, Price(10000), Qty(100), 1);
        b.add(OrderId(2), Side::Sell, OrderKind::Limit, Price(10010), Qty(100), 2);

        let vwap = b.vwap(Side::Sell, 2);
        assert!((vwap - 10005.0).abs() < 1e-9);
        assert_eq!(b.vwap(Side::Buy, 2), 0.0);
    }

    #[test]
    fn modify_loses_time_priority() {
        let mut b = book();
        b.add(OrderId(1), Side::Sell, OrderKind::Limit, Price(10000), Qty(30), 1);
        b.add(OrderId(2), Side::Sell, OrderKind::Limit, Price(10000), Qty(40), 2);

        // Move order 1 to the back of the same level by modifying it.
        let trades = b.modify(OrderId(1), Price(10000), Qty(30));
        assert!(trades.is_empty());

        // A crossing buy for 40 must now hit order 2 first.
        let trades = b.add(OrderId(3), Side::Buy, OrderKind::Limit, Price(10000), Qty(40), 3);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].sell_order_id, OrderId(2));
    }

    #[test]
    fn modify_unknown_is_empty() {
        let mut b = book();
        let trades = b.modify(OrderId(42), Price(10000), Qty(10));
        assert!(trades.is_empty());
        assert_eq!(b.order_count(), 0);
    }
}

//! Price-time priority matching.
//!
//! This is the hot path. Incoming orders walk the opposing ladder
//! best-first, filling against level FIFOs at the passive (resting) price.
//! Trades for one submission are returned by value in a bounded buffer;
//! nothing here allocates.

use arrayvec::ArrayVec;

use crate::book::OrderBook;
use crate::fixed::{Price, Qty};
use crate::order::RestingOrder;
use crate::pool::Handle;
use crate::types::{OrderId, OrderKind, Side, Timestamp, Trade};

/// Cap on fills produced by a single submission. When reached, matching
/// truncates and the residue follows the kind's normal policy.
pub const MAX_TRADES_PER_MATCH: usize = 64;

/// Trades produced by one `add` call.
pub type TradeSet = ArrayVec<Trade, MAX_TRADES_PER_MATCH>;

impl OrderBook {
    /// Submit an order.
    ///
    /// Returns the trades produced by this submission. An empty set with no
    /// book mutation means the order was not accepted (zero quantity, pool
    /// exhausted, or a killed fill-or-kill); callers surface those as
    /// rejects or cancels according to the kind.
    pub fn add(
        &mut self,
        id: OrderId,
        side: Side,
        kind: OrderKind,
        price: Price,
        quantity: Qty,
        timestamp: Timestamp,
    ) -> TradeSet {
        let mut trades = TradeSet::new();

        if quantity.is_zero() {
            return trades;
        }

        let Some(handle) = self.pool.acquire() else {
            return trades;
        };

        // Fill-or-kill runs a read-only pass first so a kill leaves the
        // book and the BBO cache untouched.
        if kind == OrderKind::Fok {
            let achievable = self.fillable_qty(side, price, quantity);
            if achievable < quantity {
                self.pool.release(handle);
                return trades;
            }
        }

        self.pool.insert(
            handle,
            RestingOrder::new(id, self.instrument(), side, kind, price, quantity, timestamp),
        );

        let limit = if kind == OrderKind::Market { None } else { Some(price) };
        match side {
            Side::Buy => self.match_buy(handle, limit, &mut trades),
            Side::Sell => self.match_sell(handle, limit, &mut trades),
        }

        let remaining = self.pool.get(handle).remaining();
        if remaining.is_zero() || !kind.rests() {
            // Filled, or IOC/Market/FOK residue discarded without resting.
            self.pool.release(handle);
        } else {
            self.lookup.insert(id, handle);
            self.rest(handle);
        }

        trades
    }

    /// Read-only count of quantity achievable for an order, bounded by the
    /// crossing condition and the per-match fill cap.
    fn fillable_qty(&self, side: Side, limit: Price, needed: Qty) -> Qty {
        let mut acc = 0u64;
        let mut fills = 0usize;

        match side {
            Side::Buy => {
                'ladder: for (&price, level) in self.asks.iter() {
                    if price > limit {
                        break;
                    }
                    let mut cursor = level.front();
                    while let Some(handle) = cursor {
                        acc += self.pool.get(handle).remaining().0;
                        fills += 1;
                        if acc >= needed.0 || fills >= MAX_TRADES_PER_MATCH {
                            break 'ladder;
                        }
                        let next = self.pool.get(handle).next;
                        cursor = next.is_valid().then_some(next);
                    }
                }
            }
            Side::Sell => {
                'ladder: for (&core::cmp::Reverse(price), level) in self.bids.iter() {
                    if price < limit {
                        break;
                    }
                    let mut cursor = level.front();
                    while let Some(handle) = cursor {
                        acc += self.pool.get(handle).remaining().0;
                        fills += 1;
                        if acc >= needed.0 || fills >= MAX_TRADES_PER_MATCH {
                            break 'ladder;
                        }
                        let next = self.pool.get(handle).next;
                        cursor = next.is_valid().then_some(next);
                    }
                }
            }
        }

        Qty(acc.min(needed.0))
    }

    /// Walk the ask ladder best-first for an incoming buy.
    fn match_buy(&mut self, taker: Handle, limit: Option<Price>, trades: &mut TradeSet) {
        loop {
            if trades.is_full() || self.pool.get(taker).remaining().is_zero() {
                break;
            }
            let Some((&level_price, _)) = self.asks.first_key_value() else {
                break;
            };
            if let Some(lim) = limit {
                if level_price > lim {
                    break;
                }
            }
            self.consume_ask_level(level_price, taker, trades);
        }
        self.refresh_best_ask();
    }

    /// Walk the bid ladder best-first for an incoming sell.
    fn match_sell(&mut self, taker: Handle, limit: Option<Price>, trades: &mut TradeSet) {
        loop {
            if trades.is_full() || self.pool.get(taker).remaining().is_zero() {
                break;
            }
            let Some((&core::cmp::Reverse(level_price), _)) = self.bids.first_key_value() else {
                break;
            };
            if let Some(lim) = limit {
                if level_price < lim {
                    break;
                }
            }
            self.consume_bid_level(level_price, taker, trades);
        }
        self.refresh_best_bid();
    }

    fn consume_ask_level(&mut self, price: Price, taker: Handle, trades: &mut TradeSet) {
        loop {
            if trades.is_full() {
                return;
            }
            let taker_rem = self.pool.get(taker).remaining();
            if taker_rem.is_zero() {
                return;
            }

            let Some(maker) = self.asks.get(&price).and_then(|l| l.front()) else {
                self.asks.remove(&price);
                self.refresh_best_ask();
                return;
            };

            let (maker_id, maker_rem) = {
                let m = self.pool.get(maker);
                (m.id, m.remaining())
            };
            let fill = taker_rem.min(maker_rem);

            {
                let t = self.pool.get(taker);
                trades.push(Trade {
                    buy_order_id: t.id,
                    sell_order_id: maker_id,
                    instrument: self.instrument(),
                    price,
                    quantity: fill,
                    timestamp: t.timestamp,
                });
            }

            self.settle_fill(price, taker, maker, maker_id, fill, Side::Sell);

            // Recompute the cached top after this mutation; stop if the
            // level is gone.
            match self.asks.get(&price) {
                Some(level) if !level.is_empty() => {
                    if price == self.best_ask {
                        self.best_ask_qty = level.total_qty;
                    }
                }
                _ => {
                    self.asks.remove(&price);
                    self.refresh_best_ask();
                    return;
                }
            }
        }
    }

    fn consume_bid_level(&mut self, price: Price, taker: Handle, trades: &mut TradeSet) {
        loop {
            if trades.is_full() {
                return;
            }
            let taker_rem = self.pool.get(taker).remaining();
            if taker_rem.is_zero() {
                return;
            }

            let key = core::cmp::Reverse(price);
            let Some(maker) = self.bids.get(&key).and_then(|l| l.front()) else {
                self.bids.remove(&key);
                self.refresh_best_bid();
                return;
            };

            let (maker_id, maker_rem) = {
                let m = self.pool.get(maker);
                (m.id, m.remaining())
            };
            let fill = taker_rem.min(maker_rem);

            {
                let t = self.pool.get(taker);
                trades.push(Trade {
                    buy_order_id: maker_id,
                    sell_order_id: t.id,
                    instrument: self.instrument(),
                    price,
                    quantity: fill,
                    timestamp: t.timestamp,
                });
            }

            self.settle_fill(price, taker, maker, maker_id, fill, Side::Buy);

            match self.bids.get(&key) {
                Some(level) if !level.is_empty() => {
                    if price == self.best_bid {
                        self.best_bid_qty = level.total_qty;
                    }
                }
                _ => {
                    self.bids.remove(&key);
                    self.refresh_best_bid();
                    return;
                }
            }
        }
    }

    /// Apply one fill to both orders and the maker's level accounting.
    /// `maker_side` names the side the maker rests on.
    fn settle_fill(
        &mut self,
        price: Price,
        taker: Handle,
        maker: Handle,
        maker_id: OrderId,
        fill: Qty,
        maker_side: Side,
    ) {
        self.pool.get_mut(taker).fill(fill);
        self.pool.get_mut(maker).fill(fill);

        match maker_side {
            Side::Sell => {
                let level = self.asks.get_mut(&price).expect("maker level present");
                level.reduce_qty(fill);
                if self.pool.get(maker).is_filled() {
                    let level = self.asks.get_mut(&price).expect("maker level present");
                    level.unlink(&mut self.pool, maker);
                    self.lookup.remove(&maker_id);
                    self.pool.release(maker);
                }
            }
            Side::Buy => {
                let key = core::cmp::Reverse(price);
                let level = self.bids.get_mut(&key).expect("maker level present");
                level.reduce_qty(fill);
                if self.pool.get(maker).is_filled() {
                    let level = self.bids.get_mut(&key).expect("maker level present");
                    level.unlink(&mut self.pool, maker);
                    self.lookup.remove(&maker_id);
                    self.pool.release(maker);
                }
            }
        }
    }
}

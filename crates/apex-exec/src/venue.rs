//! Venue simulator.
//!
//! Each venue owns an internal order book for realistic fills, a
//! deterministic per-venue RNG for its fill probability, and a declared
//! nominal latency that is added to report timestamps.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use apex_core::{
    ExecutionReport, InstrumentId, OrderBook, OrderId, OrderKind, OrderRequest, OrderStatus,
    Price, Qty, Side, VenueId,
};
use apex_metrics::NanoClock;

/// Static venue parameters.
#[derive(Clone, Debug)]
pub struct VenueConfig {
    pub id: VenueId,
    pub name: String,
    /// Nominal one-way latency added to report timestamps.
    pub latency_ns: u64,
    /// Probability that a submitted order is accepted at all.
    pub fill_probability: f64,
    pub enabled: bool,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            id: VenueId(0),
            name: String::new(),
            latency_ns: 1_000,
            fill_probability: 0.95,
            enabled: true,
        }
    }
}

/// A single simulated exchange.
pub struct VenueSimulator {
    config: VenueConfig,
    book: OrderBook,
    rng: SmallRng,
    clock: NanoClock,
    next_exec_id: u64,
    orders_processed: u64,
    fills: u64,
    rejects: u64,
}

impl VenueSimulator {
    pub fn new(config: VenueConfig, clock: NanoClock) -> Self {
        // Deterministic per-venue stream: same venue id, same decisions.
        let rng = SmallRng::seed_from_u64(config.id.0 as u64 * 1000 + 42);
        Self {
            config,
            book: OrderBook::new(InstrumentId(0)),
            rng,
            clock,
            next_exec_id: 1,
            orders_processed: 0,
            fills: 0,
            rejects: 0,
        }
    }

    /// Submit an order and synthesize its execution report.
    pub fn submit_order(&mut self, request: &OrderRequest) -> ExecutionReport {
        self.orders_processed += 1;

        let timestamp = self.clock.now_ns() + self.config.latency_ns;
        let mut report = ExecutionReport {
            order_id: request.id,
            exec_id: self.next_exec_id(),
            instrument: request.instrument,
            side: request.side,
            status: OrderStatus::New,
            price: request.price,
            quantity: request.quantity,
            filled_quantity: Qty::ZERO,
            leaves_quantity: request.quantity,
            venue: self.config.id,
            timestamp,
        };

        // Probabilistic reject ahead of the book.
        if self.rng.gen::<f64>() > self.config.fill_probability {
            report.status = OrderStatus::Rejected;
            self.rejects += 1;
            return report;
        }

        let trades = self.book.add(
            request.id,
            request.side,
            request.kind,
            request.price,
            request.quantity,
            timestamp,
        );

        if !trades.is_empty() {
            let mut total_filled = Qty::ZERO;
            let mut last_price = Price::ZERO;
            for trade in &trades {
                total_filled = total_filled.saturating_add(trade.quantity);
                last_price = trade.price;
            }

            report.filled_quantity = total_filled;
            report.leaves_quantity = request.quantity.saturating_sub(total_filled);
            report.price = last_price;
            report.status = if report.leaves_quantity.is_zero() {
                OrderStatus::Filled
            } else {
                OrderStatus::PartiallyFilled
            };
            self.fills += 1;
        } else if !request.kind.rests() {
            // IOC, market, and killed fill-or-kill never rest.
            report.status = OrderStatus::Cancelled;
        }
        // else: resting limit order, status stays New.

        report
    }

    /// Cancel against the internal book.
    pub fn cancel_order(&mut self, order_id: OrderId) -> ExecutionReport {
        let timestamp = self.clock.now_ns() + self.config.latency_ns;
        let cancelled = self.book.cancel(order_id);

        ExecutionReport {
            order_id,
            exec_id: self.next_exec_id(),
            instrument: InstrumentId(0),
            side: Side::Buy,
            status: if cancelled {
                OrderStatus::Cancelled
            } else {
                OrderStatus::Rejected
            },
            price: Price::ZERO,
            quantity: Qty::ZERO,
            filled_quantity: Qty::ZERO,
            leaves_quantity: Qty::ZERO,
            venue: self.config.id,
            timestamp,
        }
    }

    /// Preload symmetric resting liquidity around a mid price so
    /// aggressive orders have something plausible to hit.
    pub fn seed_book(&mut self, mid_price: Price, levels: u32, qty_per_level: Qty) {
        let mut oid = 900_000_000u64 + self.config.id.0 as u64 * 1_000_000;
        let now = self.clock.now_ns();

        for i in 1..=levels as i64 {
            self.book.add(
                OrderId(oid),
                Side::Buy,
                OrderKind::Limit,
                Price(mid_price.0 - i),
                qty_per_level,
                now,
            );
            oid += 1;
            self.book.add(
                OrderId(oid),
                Side::Sell,
                OrderKind::Limit,
                Price(mid_price.0 + i),
                qty_per_level,
                now,
            );
            oid += 1;
        }
    }

    #[inline(always)]
    fn next_exec_id(&mut self) -> u64 {
        let id = self.next_exec_id;
        self.next_exec_id += 1;
        id
    }

    pub fn id(&self) -> VenueId {
        self.config.id
    }

    pub fn config(&self) -> &VenueConfig {
        &self.config
    }

    pub fn best_bid(&self) -> Price {
        self.book.best_bid()
    }

    pub fn best_ask(&self) -> Price {
        self.book.best_ask()
    }

    pub fn orders_processed(&self) -> u64 {
        self.orders_processed
    }

    pub fn fills(&self) -> u64 {
        self.fills
    }

    pub fn rejects(&self) -> u64 {
        self.rejects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venue(id: u8, fill_probability: f64) -> VenueSimulator {
        VenueSimulator::new(
            VenueConfig {
                id: VenueId(id),
                name: format!("SIM-{}", id),
                latency_ns: 500,
                fill_probability,
                enabled: true,
            },
            NanoClock::new(),
        )
    }

    fn market_buy(id: u64, qty: u64) -> OrderRequest {
        OrderRequest {
            id: OrderId(id),
            instrument: InstrumentId(0),
            side: Side::Buy,
            kind: OrderKind::Market,
            price: Price::ZERO,
            quantity: Qty(qty),
            venue: VenueId(0),
            timestamp: 0,
        }
    }

    #[test]
    fn seeded_book_fills_market_order() {
        let mut v = venue(1, 1.0);
        v.seed_book(Price(15000), 10, Qty(1000));

        let report = v.submit_order(&market_buy(1, 500));
        assert_eq!(report.status, OrderStatus::Filled);
        assert_eq!(report.filled_quantity, Qty(500));
        assert_eq!(report.leaves_quantity, Qty::ZERO);
        // First ask level sits one tick above mid.
        assert_eq!(report.price, Price(15001));
        assert_eq!(v.fills(), 1);
    }

    #[test]
    fn market_order_with_no_liquidity_cancels() {
        let mut v = venue(1, 1.0);
        let report = v.submit_order(&market_buy(1, 100));
        assert_eq!(report.status, OrderStatus::Cancelled);
        assert_eq!(report.filled_quantity, Qty::ZERO);
    }

    #[test]
    fn resting_limit_reports_new_and_cancels() {
        let mut v = venue(2, 1.0);

        let request = OrderRequest {
            id: OrderId(7),
            instrument: InstrumentId(0),
            side: Side::Buy,
            kind: OrderKind::Limit,
            price: Price(14000),
            quantity: Qty(10),
            venue: VenueId(0),
            timestamp: 0,
        };
        let report = v.submit_order(&request);
        assert_eq!(report.status, OrderStatus::New);
        assert_eq!(report.leaves_quantity, Qty(10));

        let report = v.cancel_order(OrderId(7));
        assert_eq!(report.status, OrderStatus::Cancelled);

        // Second cancel finds nothing.
        let report = v.cancel_order(OrderId(7));
        assert_eq!(report.status, OrderStatus::Rejected);
    }

    #[test]
    fn zero_fill_probability_rejects() {
        let mut v = venue(3, 0.0);
        v.seed_book(Price(15000), 5, Qty(100));

        let report = v.submit_order(&market_buy(1, 10));
        assert_eq!(report.status, OrderStatus::Rejected);
        assert_eq!(report.leaves_quantity, Qty(10));
        assert_eq!(v.rejects(), 1);
    }

    #[test]
    fn exec_ids_are_monotone() {
        let mut v = venue(4, 1.0);
        v.seed_book(Price(15000), 2, Qty(100));

        let a = v.submit_order(&market_buy(1, 10)).exec_id;
        let b = v.submit_order(&market_buy(2, 10)).exec_id;
        let c = v.cancel_order(OrderId(99)).exec_id;
        assert!(a < b && b < c);
    }

    #[test]
    fn same_seed_same_decisions() {
        let mut a = venue(5, 0.5);
        let mut b = venue(5, 0.5);
        a.seed_book(Price(15000), 5, Qty(100));
        b.seed_book(Price(15000), 5, Qty(100));

        for i in 0..50 {
            let ra = a.submit_order(&market_buy(i, 10));
            let rb = b.submit_order(&market_buy(i, 10));
            assert_eq!(ra.status, rb.status);
        }
    }
}

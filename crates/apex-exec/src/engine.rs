//! Execution worker loop.
//!
//! Drains intents from the input ring, throttles through its own rate
//! window (a second line of defense behind the risk gate, possibly with a
//! different limit), routes to a venue, and pushes the report onto the
//! output ring. Spin-polls while running; drains best-effort on shutdown.

use core::sync::atomic::{AtomicBool, Ordering};

use apex_core::{
    ExecutionReport, OrderRequest, OrderStatus, Price, Qty, RateWindow, VenueId,
};
use apex_metrics::NanoClock;
use apex_ring::{Consumer, Producer};

use crate::router::{OrderRouter, RoutingStrategy};
use crate::venue::{VenueConfig, VenueSimulator};

/// Owns the venues and runs the execution side of the pipeline.
pub struct ExecutionEngine {
    input: Consumer<OrderRequest>,
    output: Producer<ExecutionReport>,
    venues: Vec<VenueSimulator>,
    router: OrderRouter,
    rate: RateWindow,
    max_orders_per_sec: u32,
    orders_processed: u64,
    orders_throttled: u64,
    reports_dropped: u64,
    clock: NanoClock,
}

impl ExecutionEngine {
    pub fn new(
        input: Consumer<OrderRequest>,
        output: Producer<ExecutionReport>,
        clock: NanoClock,
    ) -> Self {
        let now = clock.now_ns();
        Self {
            input,
            output,
            venues: Vec::new(),
            router: OrderRouter::new(clock.clone()),
            rate: RateWindow::new(now),
            max_orders_per_sec: 10_000,
            orders_processed: 0,
            orders_throttled: 0,
            reports_dropped: 0,
            clock,
        }
    }

    pub fn add_venue(&mut self, config: VenueConfig) {
        self.venues.push(VenueSimulator::new(config, self.clock.clone()));
    }

    pub fn set_rate_limit(&mut self, max_orders_per_sec: u32) {
        self.max_orders_per_sec = max_orders_per_sec;
    }

    pub fn set_routing_strategy(&mut self, strategy: RoutingStrategy) {
        self.router.set_strategy(strategy);
    }

    /// Seed every venue's book with symmetric liquidity around a mid.
    pub fn seed_books(&mut self, mid_price: Price, levels: u32, qty_per_level: Qty) {
        for venue in &mut self.venues {
            venue.seed_book(mid_price, levels, qty_per_level);
        }
    }

    /// Process one intent synchronously. Public for tests and for callers
    /// that do not run the worker loop.
    pub fn process_order(&mut self, request: &OrderRequest) -> ExecutionReport {
        let now = self.clock.now_ns();
        if !self.rate.try_acquire(now, self.max_orders_per_sec) {
            self.orders_throttled += 1;
            return ExecutionReport {
                order_id: request.id,
                exec_id: 0,
                instrument: request.instrument,
                side: request.side,
                status: OrderStatus::Rejected,
                price: request.price,
                quantity: request.quantity,
                filled_quantity: Qty::ZERO,
                leaves_quantity: request.quantity,
                venue: VenueId(0),
                timestamp: now,
            };
        }

        self.orders_processed += 1;
        self.router.route_order(&mut self.venues, request)
    }

    /// Worker loop. Returns after `running` flips false and the input
    /// ring has been drained best-effort.
    pub fn run(&mut self, running: &AtomicBool) {
        while running.load(Ordering::Relaxed) {
            match self.input.try_pop() {
                Some(request) => {
                    let report = self.process_order(&request);
                    if !self.output.try_push(report) {
                        self.reports_dropped += 1;
                    }
                }
                None => core::hint::spin_loop(),
            }
        }

        // Shutdown drain.
        while let Some(request) = self.input.try_pop() {
            let report = self.process_order(&request);
            if !self.output.try_push(report) {
                self.reports_dropped += 1;
            }
        }
    }

    pub fn orders_processed(&self) -> u64 {
        self.orders_processed
    }

    pub fn orders_throttled(&self) -> u64 {
        self.orders_throttled
    }

    pub fn reports_dropped(&self) -> u64 {
        self.reports_dropped
    }

    pub fn venues(&self) -> &[VenueSimulator] {
        &self.venues
    }
}

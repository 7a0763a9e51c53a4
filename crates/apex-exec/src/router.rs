//! Order routing.
//!
//! Chooses a venue per intent and remembers where each order went so
//! cancels can follow it. The router owns routing state only; the venues
//! themselves belong to the execution engine and are passed in per call.

use std::collections::HashMap;

use apex_core::{
    ExecutionReport, OrderId, OrderRequest, OrderStatus, Price, Qty, Side, VenueId,
};
use apex_metrics::NanoClock;

use crate::venue::VenueSimulator;

/// Venue-selection policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoutingStrategy {
    /// Rotate across venues.
    RoundRobin,
    /// Venue with the smallest declared latency among enabled ones.
    LowestLatency,
    /// Venue showing the best opposing top-of-book for the order's side;
    /// falls back to round-robin when no venue shows a price.
    BestPrice,
}

/// Maps intents to venues and cancels back to where the order went.
pub struct OrderRouter {
    strategy: RoutingStrategy,
    rr_idx: usize,
    order_venue: HashMap<OrderId, VenueId>,
    clock: NanoClock,
}

impl OrderRouter {
    pub fn new(clock: NanoClock) -> Self {
        Self {
            strategy: RoutingStrategy::RoundRobin,
            rr_idx: 0,
            order_venue: HashMap::new(),
            clock,
        }
    }

    pub fn set_strategy(&mut self, strategy: RoutingStrategy) {
        self.strategy = strategy;
    }

    pub fn strategy(&self) -> RoutingStrategy {
        self.strategy
    }

    /// Route an intent to a venue and submit it.
    pub fn route_order(
        &mut self,
        venues: &mut [VenueSimulator],
        request: &OrderRequest,
    ) -> ExecutionReport {
        let Some(idx) = self.select_venue(venues, request) else {
            return self.synthetic_reject(request.id, request);
        };

        self.order_venue.insert(request.id, venues[idx].id());
        venues[idx].submit_order(request)
    }

    /// Route a cancel to wherever the order originally went.
    pub fn cancel_order(
        &mut self,
        venues: &mut [VenueSimulator],
        order_id: OrderId,
    ) -> ExecutionReport {
        let Some(&venue_id) = self.order_venue.get(&order_id) else {
            return self.unknown_cancel(order_id);
        };

        if let Some(venue) = venues.iter_mut().find(|v| v.id() == venue_id) {
            let report = venue.cancel_order(order_id);
            if report.status == OrderStatus::Cancelled {
                self.order_venue.remove(&order_id);
            }
            return report;
        }

        self.unknown_cancel(order_id)
    }

    fn select_venue(&mut self, venues: &[VenueSimulator], request: &OrderRequest) -> Option<usize> {
        if venues.is_empty() {
            return None;
        }

        // An explicit hint pins the venue when it exists and is enabled.
        if request.venue.0 != 0 {
            if let Some(idx) = venues
                .iter()
                .position(|v| v.id() == request.venue && v.config().enabled)
            {
                return Some(idx);
            }
        }

        match self.strategy {
            RoutingStrategy::LowestLatency => {
                let best = venues
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| v.config().enabled)
                    .min_by_key(|(_, v)| v.config().latency_ns)
                    .map(|(i, _)| i);
                Some(best.unwrap_or(0))
            }
            RoutingStrategy::BestPrice => self
                .best_price_venue(venues, request.side)
                .or_else(|| Some(self.round_robin(venues))),
            RoutingStrategy::RoundRobin => Some(self.round_robin(venues)),
        }
    }

    /// Inspect each enabled venue's opposing top: buys want the lowest
    /// ask, sells the highest bid. Venues showing no price are skipped.
    fn best_price_venue(&self, venues: &[VenueSimulator], side: Side) -> Option<usize> {
        let mut best: Option<(usize, Price)> = None;

        for (idx, venue) in venues.iter().enumerate() {
            if !venue.config().enabled {
                continue;
            }
            let top = match side {
                Side::Buy => venue.best_ask(),
                Side::Sell => venue.best_bid(),
            };
            if top.is_zero() {
                continue;
            }

            let better = match (side, best) {
                (_, None) => true,
                (Side::Buy, Some((_, p))) => top < p,
                (Side::Sell, Some((_, p))) => top > p,
            };
            if better {
                best = Some((idx, top));
            }
        }

        best.map(|(idx, _)| idx)
    }

    fn round_robin(&mut self, venues: &[VenueSimulator]) -> usize {
        let idx = self.rr_idx % venues.len();
        self.rr_idx = (self.rr_idx + 1) % venues.len();
        idx
    }

    fn synthetic_reject(&self, order_id: OrderId, request: &OrderRequest) -> ExecutionReport {
        ExecutionReport {
            order_id,
            exec_id: 0,
            instrument: request.instrument,
            side: request.side,
            status: OrderStatus::Rejected,
            price: request.price,
            quantity: request.quantity,
            filled_quantity: Qty::ZERO,
            leaves_quantity: request.quantity,
            venue: VenueId(0),
            timestamp: self.clock.now_ns(),
        }
    }

    fn unknown_cancel(&self, order_id: OrderId) -> ExecutionReport {
        ExecutionReport {
            order_id,
            exec_id: 0,
            instrument: apex_core::InstrumentId(0),
            side: Side::Buy,
            status: OrderStatus::Rejected,
            price: Price::ZERO,
            quantity: Qty::ZERO,
            filled_quantity: Qty::ZERO,
            leaves_quantity: Qty::ZERO,
            venue: VenueId(0),
            timestamp: self.clock.now_ns(),
        }
    }
}

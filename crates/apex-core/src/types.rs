//! Shared message and identifier types.
//!
//! Everything here is `Copy` with no owned heap, so any of these types can
//! travel through an SPSC ring between threads.

use crate::fixed::{Price, Qty};

/// Upper bound on distinct instruments the system tracks.
pub const MAX_INSTRUMENTS: usize = 256;

/// Upper bound on simulated venues.
pub const MAX_VENUES: usize = 16;

/// Monotonic nanoseconds.
pub type Timestamp = u64;

/// Instrument identifier, assigned by the symbol table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct InstrumentId(pub u32);

impl InstrumentId {
    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Unique order identifier. Zero is reserved as "unset".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct OrderId(pub u64);

/// Venue identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct VenueId(pub u8);

/// Side of the book.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    Buy = 0,
    Sell = 1,
}

impl Side {
    #[inline(always)]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    #[inline(always)]
    pub const fn is_buy(self) -> bool {
        matches!(self, Side::Buy)
    }
}

/// Order kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OrderKind {
    /// Rests on the book until filled or cancelled.
    Limit = 0,
    /// No price bound; residue is discarded.
    Market = 1,
    /// Immediate-or-cancel: match what crosses now, discard the rest.
    Ioc = 2,
    /// Fill-or-kill: fill in full or do nothing.
    Fok = 3,
}

impl OrderKind {
    /// Whether residue rests on the book after matching.
    #[inline(always)]
    pub const fn rests(self) -> bool {
        matches!(self, OrderKind::Limit)
    }
}

/// Order lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OrderStatus {
    New = 0,
    PartiallyFilled = 1,
    Filled = 2,
    Cancelled = 3,
    Rejected = 4,
}

/// A single execution between two orders. The price is always the resting
/// (passive) order's price.
#[derive(Clone, Copy, Debug)]
pub struct Trade {
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub instrument: InstrumentId,
    pub price: Price,
    pub quantity: Qty,
    pub timestamp: Timestamp,
}

/// Order intent emitted by a strategy. Ephemeral; copied on submit.
#[derive(Clone, Copy, Debug)]
pub struct OrderRequest {
    pub id: OrderId,
    pub instrument: InstrumentId,
    pub side: Side,
    pub kind: OrderKind,
    /// Limit price; zero for market orders.
    pub price: Price,
    pub quantity: Qty,
    /// Routing hint; `VenueId(0)` leaves the choice to the router.
    pub venue: VenueId,
    pub timestamp: Timestamp,
}

/// Execution report returned by a venue.
#[derive(Clone, Copy, Debug)]
pub struct ExecutionReport {
    pub order_id: OrderId,
    /// Monotone per-venue execution id.
    pub exec_id: u64,
    pub instrument: InstrumentId,
    pub side: Side,
    pub status: OrderStatus,
    /// Last fill price (or the request price when nothing filled).
    pub price: Price,
    pub quantity: Qty,
    pub filled_quantity: Qty,
    pub leaves_quantity: Qty,
    pub venue: VenueId,
    pub timestamp: Timestamp,
}

/// Normalized market-data record published by the feed dispatcher.
#[derive(Clone, Copy, Debug, Default)]
pub struct QuoteRecord {
    pub instrument: InstrumentId,
    pub bid: Price,
    pub ask: Price,
    pub bid_qty: Qty,
    pub ask_qty: Qty,
    pub last: Price,
    pub last_qty: Qty,
    pub timestamp: Timestamp,
    /// Frame-type tag from the feed ('W', '8', 'D').
    pub frame_type: u8,
}

impl QuoteRecord {
    /// Midpoint of bid and ask, falling back to the last trade price.
    #[inline]
    pub fn mid(&self) -> Price {
        if self.bid.0 > 0 && self.ask.0 > 0 {
            Price((self.bid.0 + self.ask.0) / 2)
        } else {
            self.last
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn only_limit_rests() {
        assert!(OrderKind::Limit.rests());
        assert!(!OrderKind::Market.rests());
        assert!(!OrderKind::Ioc.rests());
        assert!(!OrderKind::Fok.rests());
    }

    #[test]
    fn quote_mid_falls_back_to_last() {
        let q = QuoteRecord {
            bid: Price(10000),
            ask: Price(10010),
            ..Default::default()
        };
        assert_eq!(q.mid(), Price(10005));

        let q = QuoteRecord {
            last: Price(9990),
            ..Default::default()
        };
        assert_eq!(q.mid(), Price(9990));
    }
}

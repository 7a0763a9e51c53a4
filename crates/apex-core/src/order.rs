//! Resting order bodies.
//!
//! A resting order occupies exactly one 64-byte cache line in the book's
//! pool. The intrusive `prev`/`next` handles link it into its price level's
//! FIFO; they are back-references, not ownership.

use core::mem::size_of;

use crate::fixed::{Price, Qty};
use crate::pool::Handle;
use crate::types::{InstrumentId, OrderId, OrderKind, OrderStatus, Side, Timestamp};

/// A resting order, owned by the book's pool. Exactly 64 bytes.
///
/// Hot fields (touched on every fill) come first.
#[derive(Clone, Copy, Debug)]
#[repr(C, align(64))]
pub struct RestingOrder {
    pub price: Price,          // 8
    pub quantity: Qty,         // 8
    pub filled: Qty,           // 8
    pub id: OrderId,           // 8
    pub timestamp: Timestamp,  // 8
    pub instrument: InstrumentId, // 4
    /// Previous order in the level FIFO (towards the front).
    pub prev: Handle,          // 4
    /// Next order in the level FIFO (towards the back).
    pub next: Handle,          // 4
    pub side: Side,            // 1
    pub kind: OrderKind,       // 1
    pub status: OrderStatus,   // 1
    _pad: [u8; 9],
}

const _: () = assert!(size_of::<RestingOrder>() == 64, "RestingOrder must be one cache line");

impl RestingOrder {
    #[inline(always)]
    pub fn new(
        id: OrderId,
        instrument: InstrumentId,
        side: Side,
        kind: OrderKind,
        price: Price,
        quantity: Qty,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            price,
            quantity,
            filled: Qty::ZERO,
            id,
            timestamp,
            instrument,
            prev: Handle::INVALID,
            next: Handle::INVALID,
            side,
            kind,
            status: OrderStatus::New,
            _pad: [0; 9],
        }
    }

    /// Quantity still open.
    #[inline(always)]
    pub fn remaining(&self) -> Qty {
        self.quantity.saturating_sub(self.filled)
    }

    #[inline(always)]
    pub fn is_filled(&self) -> bool {
        self.filled.0 >= self.quantity.0
    }

    /// Apply a fill and update the status.
    #[inline(always)]
    pub fn fill(&mut self, qty: Qty) {
        debug_assert!(qty.0 <= self.remaining().0, "fill exceeds remaining");
        self.filled = self.filled.saturating_add(qty);
        self.status = if self.is_filled() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
    }
}

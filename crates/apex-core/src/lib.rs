//! # Apex Core
//!
//! Fixed-point price arithmetic, shared message types, and the
//! price-time-priority matching engine.
//!
//! ## Design Principles
//! - Zero allocations in steady state (pool + bounded buffers)
//! - Cache-line aligned resting orders
//! - Fixed-point arithmetic (no floats in comparisons)
//! - Single-threaded book, lock-free transport at the edges

#![no_std]

extern crate alloc;

pub mod book;
pub mod engine;
pub mod fixed;
pub mod level;
pub mod order;
pub mod pool;
pub mod rate;
pub mod types;
pub mod window;

pub use book::{DepthEntry, OrderBook};
pub use engine::{TradeSet, MAX_TRADES_PER_MATCH};
pub use fixed::{Price, Qty, PRICE_SCALE};
pub use level::PriceLevel;
pub use order::RestingOrder;
pub use pool::{Handle, ObjectPool};
pub use rate::RateWindow;
pub use types::{
    ExecutionReport, InstrumentId, OrderId, OrderKind, OrderRequest, OrderStatus, QuoteRecord,
    Side, Timestamp, Trade, VenueId, MAX_INSTRUMENTS, MAX_VENUES,
};
pub use window::RollingWindow;

//! Strategy surface.
//!
//! Strategies are capability objects the core loop drives in a fixed
//! order: feed events in, then `generate`, then risk, then the execution
//! queue. `generate` hands back a slice borrowed from a strategy-owned
//! bounded buffer; the slice is valid until the next call on that
//! strategy. Dispatch is a tagged enum over the known strategies, so the
//! hot path has no vtable.

pub mod market_maker;
pub mod momentum;
pub mod pairs;

use arrayvec::ArrayVec;

use apex_core::{ExecutionReport, InstrumentId, OrderRequest, Price, Qty, QuoteRecord, Timestamp, Trade};

pub use market_maker::{MarketMaker, MarketMakerParams};
pub use momentum::{Momentum, MomentumParams};
pub use pairs::{PairsTrading, PairsTradingParams};

/// Most intents one strategy may emit per signal.
pub const MAX_ORDERS_PER_SIGNAL: usize = 8;

/// Strategy-owned intent buffer.
pub type OrderBuffer = ArrayVec<OrderRequest, MAX_ORDERS_PER_SIGNAL>;

/// The capability set every strategy implements.
pub trait Strategy {
    fn name(&self) -> &'static str;

    /// New normalized quote from the feed.
    fn on_quote(&mut self, quote: &QuoteRecord);

    /// Book top changed for an instrument.
    fn on_book_update(
        &mut self,
        instrument: InstrumentId,
        best_bid: Price,
        bid_qty: Qty,
        best_ask: Price,
        ask_qty: Qty,
    );

    /// A trade printed on a book.
    fn on_trade(&mut self, trade: &Trade) {
        let _ = trade;
    }

    /// Execution report for one of this process's orders.
    fn on_report(&mut self, report: &ExecutionReport);

    /// Periodic tick.
    fn on_timer(&mut self, now: Timestamp) {
        let _ = now;
    }

    /// Emit intents for the current state. The returned slice borrows the
    /// strategy's own buffer and is invalidated by the next call.
    fn generate(&mut self) -> &[OrderRequest];
}

/// Tagged dispatch over the built-in strategies.
pub enum AnyStrategy {
    MarketMaker(MarketMaker),
    Pairs(PairsTrading),
    Momentum(Momentum),
}

impl Strategy for AnyStrategy {
    fn name(&self) -> &'static str {
        match self {
            AnyStrategy::MarketMaker(s) => s.name(),
            AnyStrategy::Pairs(s) => s.name(),
            AnyStrategy::Momentum(s) => s.name(),
        }
    }

    fn on_quote(&mut self, quote: &QuoteRecord) {
        match self {
            AnyStrategy::MarketMaker(s) => s.on_quote(quote),
            AnyStrategy::Pairs(s) => s.on_quote(quote),
            AnyStrategy::Momentum(s) => s.on_quote(quote),
        }
    }

    fn on_book_update(
        &mut self,
        instrument: InstrumentId,
        best_bid: Price,
        bid_qty: Qty,
        best_ask: Price,
        ask_qty: Qty,
    ) {
        match self {
            AnyStrategy::MarketMaker(s) => s.on_book_update(instrument, best_bid, bid_qty, best_ask, ask_qty),
            AnyStrategy::Pairs(s) => s.on_book_update(instrument, best_bid, bid_qty, best_ask, ask_qty),
            AnyStrategy::Momentum(s) => s.on_book_update(instrument, best_bid, bid_qty, best_ask, ask_qty),
        }
    }

    fn on_trade(&mut self, trade: &Trade) {
        match self {
            AnyStrategy::MarketMaker(s) => s.on_trade(trade),
            AnyStrategy::Pairs(s) => s.on_trade(trade),
            AnyStrategy::Momentum(s) => s.on_trade(trade),
        }
    }

    fn on_report(&mut self, report: &ExecutionReport) {
        match self {
            AnyStrategy::MarketMaker(s) => s.on_report(report),
            AnyStrategy::Pairs(s) => s.on_report(report),
            AnyStrategy::Momentum(s) => s.on_report(report),
        }
    }

    fn on_timer(&mut self, now: Timestamp) {
        match self {
            AnyStrategy::MarketMaker(s) => s.on_timer(now),
            AnyStrategy::Pairs(s) => s.on_timer(now),
            AnyStrategy::Momentum(s) => s.on_timer(now),
        }
    }

    fn generate(&mut self) -> &[OrderRequest] {
        match self {
            AnyStrategy::MarketMaker(s) => s.generate(),
            AnyStrategy::Pairs(s) => s.generate(),
            AnyStrategy::Momentum(s) => s.generate(),
        }
    }
}

//! Momentum (EMA crossover) strategy.
//!
//! Tracks a fast and a slow EMA of the mid price. The signal is the
//! fast/slow divergence in basis points of the slow EMA: a breakout above
//! the threshold opens a position, the opposite-sign crossover closes it.

use apex_core::{
    ExecutionReport, InstrumentId, OrderId, OrderKind, OrderRequest, OrderStatus, Price, Qty,
    QuoteRecord, RollingWindow, Side, Trade, VenueId,
};
use apex_metrics::NanoClock;

use crate::{OrderBuffer, Strategy};

#[derive(Clone, Debug)]
pub struct MomentumParams {
    pub instrument: InstrumentId,
    pub fast_window: u32,
    pub slow_window: u32,
    /// Entry threshold on the EMA divergence, in bps of the slow EMA.
    pub breakout_threshold_bps: f64,
    pub order_size: Qty,
    pub base_order_id: u64,
}

impl Default for MomentumParams {
    fn default() -> Self {
        Self {
            instrument: InstrumentId(0),
            fast_window: 10,
            slow_window: 30,
            breakout_threshold_bps: 5.0,
            order_size: Qty(10),
            base_order_id: 300_000,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Flat,
    Long,
    Short,
}

pub struct Momentum {
    params: MomentumParams,
    clock: NanoClock,
    fast_alpha: f64,
    slow_alpha: f64,
    fast_ema: f64,
    slow_ema: f64,
    signal_bps: f64,
    position: i64,
    tick_count: u64,
    current_price: Price,
    state: State,
    volumes: RollingWindow<u64>,
    avg_volume: f64,
    next_order_id: u64,
    orders: OrderBuffer,
}

impl Momentum {
    pub fn new(params: MomentumParams, clock: NanoClock) -> Self {
        Self {
            fast_alpha: 2.0 / (params.fast_window as f64 + 1.0),
            slow_alpha: 2.0 / (params.slow_window as f64 + 1.0),
            next_order_id: params.base_order_id,
            params,
            clock,
            fast_ema: 0.0,
            slow_ema: 0.0,
            signal_bps: 0.0,
            position: 0,
            tick_count: 0,
            current_price: Price::ZERO,
            state: State::Flat,
            volumes: RollingWindow::new(256),
            avg_volume: 0.0,
            orders: OrderBuffer::new(),
        }
    }

    pub fn signal_bps(&self) -> f64 {
        self.signal_bps
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn fast_ema(&self) -> f64 {
        self.fast_ema
    }

    pub fn slow_ema(&self) -> f64 {
        self.slow_ema
    }

    /// Rolling average trade volume (volume confirmation input).
    pub fn avg_volume(&self) -> f64 {
        self.avg_volume
    }

    fn alloc_order_id(&mut self) -> OrderId {
        let id = self.next_order_id;
        self.next_order_id += 1;
        OrderId(id)
    }

    fn update_emas(&mut self, price: f64) {
        self.tick_count += 1;

        if self.tick_count == 1 {
            self.fast_ema = price;
            self.slow_ema = price;
        } else {
            self.fast_ema = self.fast_alpha * price + (1.0 - self.fast_alpha) * self.fast_ema;
            self.slow_ema = self.slow_alpha * price + (1.0 - self.slow_alpha) * self.slow_ema;
        }

        self.signal_bps = if self.slow_ema > 1e-10 {
            (self.fast_ema - self.slow_ema) / self.slow_ema * 10_000.0
        } else {
            0.0
        };

        if !self.volumes.is_empty() {
            let sum: u64 = self.volumes.iter().sum();
            self.avg_volume = sum as f64 / self.volumes.len() as f64;
        }
    }

    fn observe_mid(&mut self, mid: Price) {
        if mid.0 <= 0 {
            return;
        }
        self.current_price = mid;
        self.update_emas(mid.0 as f64);
    }

    fn push_order(&mut self, side: Side, quantity: Qty) {
        let request = OrderRequest {
            id: self.alloc_order_id(),
            instrument: self.params.instrument,
            side,
            kind: OrderKind::Limit,
            price: self.current_price,
            quantity,
            venue: VenueId(0),
            timestamp: self.clock.now_ns(),
        };
        let _ = self.orders.try_push(request);
    }
}

impl Strategy for Momentum {
    fn name(&self) -> &'static str {
        "momentum"
    }

    fn on_quote(&mut self, quote: &QuoteRecord) {
        if quote.instrument != self.params.instrument {
            return;
        }
        self.observe_mid(quote.mid());
        if !quote.last_qty.is_zero() {
            self.volumes.push(quote.last_qty.0);
        }
    }

    fn on_book_update(
        &mut self,
        instrument: InstrumentId,
        best_bid: Price,
        _bid_qty: Qty,
        best_ask: Price,
        _ask_qty: Qty,
    ) {
        if instrument != self.params.instrument {
            return;
        }
        self.observe_mid(Price((best_bid.0 + best_ask.0) / 2));
    }

    fn on_trade(&mut self, trade: &Trade) {
        if trade.instrument == self.params.instrument {
            self.volumes.push(trade.quantity.0);
        }
    }

    fn on_report(&mut self, report: &ExecutionReport) {
        if report.instrument != self.params.instrument {
            return;
        }
        if matches!(report.status, OrderStatus::Filled | OrderStatus::PartiallyFilled) {
            let filled = report.filled_quantity.0 as i64;
            match report.side {
                Side::Buy => self.position += filled,
                Side::Sell => self.position -= filled,
            }
        }
    }

    fn generate(&mut self) -> &[OrderRequest] {
        self.orders.clear();

        // EMAs are meaningless until the slow window has seen data.
        if self.tick_count < self.params.slow_window as u64 || self.current_price.0 <= 0 {
            return &self.orders;
        }

        let threshold = self.params.breakout_threshold_bps;

        match self.state {
            State::Flat => {
                if self.signal_bps > threshold {
                    self.state = State::Long;
                    let size = self.params.order_size;
                    self.push_order(Side::Buy, size);
                } else if self.signal_bps < -threshold {
                    self.state = State::Short;
                    let size = self.params.order_size;
                    self.push_order(Side::Sell, size);
                }
            }
            State::Long => {
                if self.signal_bps < 0.0 {
                    self.state = State::Flat;
                    if self.position > 0 {
                        let qty = Qty(self.position.unsigned_abs());
                        self.push_order(Side::Sell, qty);
                    }
                }
            }
            State::Short => {
                if self.signal_bps > 0.0 {
                    self.state = State::Flat;
                    if self.position < 0 {
                        let qty = Qty(self.position.unsigned_abs());
                        self.push_order(Side::Buy, qty);
                    }
                }
            }
        }

        &self.orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(mid: i64) -> QuoteRecord {
        QuoteRecord {
            instrument: InstrumentId(0),
            bid: Price(mid - 5),
            ask: Price(mid + 5),
            bid_qty: Qty(100),
            ask_qty: Qty(100),
            last: Price(mid),
            last_qty: Qty(10),
            timestamp: 1,
            frame_type: b'W',
        }
    }

    fn strategy() -> Momentum {
        Momentum::new(MomentumParams::default(), NanoClock::new())
    }

    #[test]
    fn silent_during_warmup() {
        let mut m = strategy();
        for _ in 0..29 {
            m.on_quote(&quote(15000));
            assert!(m.generate().is_empty());
        }
    }

    #[test]
    fn uptrend_enters_long_and_crossover_exits() {
        let mut m = strategy();

        // Flat warmup, then a steady climb pulls the fast EMA above slow.
        for _ in 0..30 {
            m.on_quote(&quote(15000));
        }
        let mut entered = false;
        for i in 1..=60 {
            m.on_quote(&quote(15000 + i * 40));
            let orders = m.generate().to_vec();
            if !orders.is_empty() {
                assert_eq!(orders[0].side, Side::Buy);
                assert_eq!(orders[0].quantity, Qty(10));
                entered = true;
                break;
            }
        }
        assert!(entered, "signal never crossed the breakout threshold");
        assert!(m.signal_bps() > 0.0);

        // Pretend the entry filled, then crash the tape to force the exit.
        m.on_report(&ExecutionReport {
            order_id: OrderId(300_000),
            exec_id: 1,
            instrument: InstrumentId(0),
            side: Side::Buy,
            status: OrderStatus::Filled,
            price: Price(15000),
            quantity: Qty(10),
            filled_quantity: Qty(10),
            leaves_quantity: Qty::ZERO,
            venue: VenueId(1),
            timestamp: 2,
        });
        assert_eq!(m.position(), 10);

        let mut exited = false;
        for i in 1..=120 {
            m.on_quote(&quote(17400 - i * 60));
            let orders = m.generate().to_vec();
            if !orders.is_empty() {
                assert_eq!(orders[0].side, Side::Sell);
                assert_eq!(orders[0].quantity, Qty(10));
                exited = true;
                break;
            }
        }
        assert!(exited, "crossover never triggered the exit");
    }

    #[test]
    fn downtrend_enters_short() {
        let mut m = strategy();
        for _ in 0..30 {
            m.on_quote(&quote(15000));
        }

        let mut entered = false;
        for i in 1..=60 {
            m.on_quote(&quote(15000 - i * 40));
            let orders = m.generate().to_vec();
            if !orders.is_empty() {
                assert_eq!(orders[0].side, Side::Sell);
                entered = true;
                break;
            }
        }
        assert!(entered);
        assert!(m.signal_bps() < 0.0);
    }

    #[test]
    fn other_instruments_are_ignored() {
        let mut m = strategy();
        let mut q = quote(15000);
        q.instrument = InstrumentId(3);
        for _ in 0..100 {
            m.on_quote(&q);
        }
        assert!(m.generate().is_empty());
    }
}

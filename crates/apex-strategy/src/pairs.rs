//! Pairs (statistical arbitrage) strategy.
//!
//! Watches the spread A − hedge_ratio·B and its rolling z-score. A rich
//! spread (z above the entry threshold) sells A and buys B; a cheap
//! spread does the reverse; reversion inside the exit threshold flattens
//! both legs.

use apex_core::{
    ExecutionReport, InstrumentId, OrderId, OrderKind, OrderRequest, OrderStatus, Price, Qty,
    QuoteRecord, RollingWindow, Side, VenueId,
};
use apex_metrics::NanoClock;

use crate::{OrderBuffer, Strategy};

/// Samples required before the z-score is trusted.
const MIN_SAMPLES: usize = 20;

#[derive(Clone, Debug)]
pub struct PairsTradingParams {
    pub instrument_a: InstrumentId,
    pub instrument_b: InstrumentId,
    pub hedge_ratio: f64,
    pub lookback_window: usize,
    pub entry_z_threshold: f64,
    pub exit_z_threshold: f64,
    pub order_size: Qty,
    pub base_order_id: u64,
}

impl Default for PairsTradingParams {
    fn default() -> Self {
        Self {
            instrument_a: InstrumentId(0),
            instrument_b: InstrumentId(1),
            hedge_ratio: 1.0,
            lookback_window: 100,
            entry_z_threshold: 2.0,
            exit_z_threshold: 0.5,
            order_size: Qty(10),
            base_order_id: 200_000,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Flat,
    LongSpread,
    ShortSpread,
}

pub struct PairsTrading {
    params: PairsTradingParams,
    clock: NanoClock,
    price_a: Price,
    price_b: Price,
    z_score: f64,
    position_a: i64,
    position_b: i64,
    state: State,
    spreads: RollingWindow<f64>,
    next_order_id: u64,
    orders: OrderBuffer,
}

impl PairsTrading {
    pub fn new(params: PairsTradingParams, clock: NanoClock) -> Self {
        Self {
            next_order_id: params.base_order_id,
            spreads: RollingWindow::new(params.lookback_window.max(MIN_SAMPLES)),
            params,
            clock,
            price_a: Price::ZERO,
            price_b: Price::ZERO,
            z_score: 0.0,
            position_a: 0,
            position_b: 0,
            state: State::Flat,
            orders: OrderBuffer::new(),
        }
    }

    pub fn z_score(&self) -> f64 {
        self.z_score
    }

    pub fn position_a(&self) -> i64 {
        self.position_a
    }

    pub fn position_b(&self) -> i64 {
        self.position_b
    }

    fn alloc_order_id(&mut self) -> OrderId {
        let id = self.next_order_id;
        self.next_order_id += 1;
        OrderId(id)
    }

    fn update_spread(&mut self) {
        let spread = self.price_a.0 as f64 - self.params.hedge_ratio * self.price_b.0 as f64;
        self.spreads.push(spread);

        if self.spreads.len() < MIN_SAMPLES {
            self.z_score = 0.0;
            return;
        }

        let n = self.spreads.len() as f64;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for v in self.spreads.iter() {
            sum += v;
            sum_sq += v * v;
        }

        let mean = sum / n;
        let variance = (sum_sq / n) - mean * mean;
        let stddev = variance.max(0.0).sqrt();

        self.z_score = if stddev < 1e-10 {
            0.0
        } else {
            (spread - mean) / stddev
        };
    }

    fn observe(&mut self, instrument: InstrumentId, mid: Price) {
        if instrument == self.params.instrument_a {
            self.price_a = mid;
        } else if instrument == self.params.instrument_b {
            self.price_b = mid;
        } else {
            return;
        }

        if self.price_a.0 > 0 && self.price_b.0 > 0 {
            self.update_spread();
        }
    }

    fn push_order(&mut self, instrument: InstrumentId, side: Side, price: Price, quantity: Qty) {
        let request = OrderRequest {
            id: self.alloc_order_id(),
            instrument,
            side,
            kind: OrderKind::Limit,
            price,
            quantity,
            venue: VenueId(0),
            timestamp: self.clock.now_ns(),
        };
        let _ = self.orders.try_push(request);
    }

    fn hedge_qty(&self) -> Qty {
        Qty((self.params.order_size.0 as f64 * self.params.hedge_ratio) as u64)
    }
}

impl Strategy for PairsTrading {
    fn name(&self) -> &'static str {
        "pairs"
    }

    fn on_quote(&mut self, quote: &QuoteRecord) {
        self.observe(quote.instrument, quote.mid());
    }

    fn on_book_update(
        &mut self,
        instrument: InstrumentId,
        best_bid: Price,
        _bid_qty: Qty,
        best_ask: Price,
        _ask_qty: Qty,
    ) {
        self.observe(instrument, Price((best_bid.0 + best_ask.0) / 2));
    }

    fn on_report(&mut self, report: &ExecutionReport) {
        if !matches!(report.status, OrderStatus::Filled | OrderStatus::PartiallyFilled) {
            return;
        }
        let filled = report.filled_quantity.0 as i64;
        let signed = match report.side {
            Side::Buy => filled,
            Side::Sell => -filled,
        };
        if report.instrument == self.params.instrument_a {
            self.position_a += signed;
        } else if report.instrument == self.params.instrument_b {
            self.position_b += signed;
        }
    }

    fn generate(&mut self) -> &[OrderRequest] {
        self.orders.clear();

        if self.spreads.len() < MIN_SAMPLES {
            return &self.orders;
        }

        let (a, b) = (self.params.instrument_a, self.params.instrument_b);
        let (price_a, price_b) = (self.price_a, self.price_b);
        let size = self.params.order_size;
        let hedge = self.hedge_qty();

        match self.state {
            State::Flat => {
                if self.z_score > self.params.entry_z_threshold {
                    // Spread rich: sell A, buy the hedge in B.
                    self.state = State::ShortSpread;
                    self.push_order(a, Side::Sell, price_a, size);
                    self.push_order(b, Side::Buy, price_b, hedge);
                } else if self.z_score < -self.params.entry_z_threshold {
                    // Spread cheap: buy A, sell the hedge in B.
                    self.state = State::LongSpread;
                    self.push_order(a, Side::Buy, price_a, size);
                    self.push_order(b, Side::Sell, price_b, hedge);
                }
            }
            State::ShortSpread => {
                if self.z_score < self.params.exit_z_threshold {
                    self.state = State::Flat;
                    if self.position_a < 0 {
                        let qty = Qty(self.position_a.unsigned_abs());
                        self.push_order(a, Side::Buy, price_a, qty);
                    }
                    if self.position_b > 0 {
                        let qty = Qty(self.position_b.unsigned_abs());
                        self.push_order(b, Side::Sell, price_b, qty);
                    }
                }
            }
            State::LongSpread => {
                if self.z_score > -self.params.exit_z_threshold {
                    self.state = State::Flat;
                    if self.position_a > 0 {
                        let qty = Qty(self.position_a.unsigned_abs());
                        self.push_order(a, Side::Sell, price_a, qty);
                    }
                    if self.position_b < 0 {
                        let qty = Qty(self.position_b.unsigned_abs());
                        self.push_order(b, Side::Buy, price_b, qty);
                    }
                }
            }
        }

        &self.orders
    }
}

//! Market-making strategy.
//!
//! Quotes symmetric bid/ask around a fair value (the mid), widening the
//! spread with realized volatility and skewing it against inventory.
//! At the inventory cap it stops quoting and flattens aggressively.

use apex_core::{
    ExecutionReport, InstrumentId, OrderId, OrderKind, OrderRequest, OrderStatus, Price, Qty,
    QuoteRecord, RollingWindow, Side, VenueId,
};
use apex_metrics::NanoClock;

use crate::{OrderBuffer, Strategy};

#[derive(Clone, Debug)]
pub struct MarketMakerParams {
    pub instrument: InstrumentId,
    /// Quoted spread before volatility scaling, in basis points of fair value.
    pub base_spread_bps: f64,
    /// Absolute inventory cap.
    pub max_inventory: i64,
    pub order_size: Qty,
    /// Fraction of the spread shifted per unit of relative inventory.
    pub skew_factor: f64,
    /// Mid-price lookback for the volatility estimate.
    pub volatility_window: usize,
    pub base_order_id: u64,
}

impl Default for MarketMakerParams {
    fn default() -> Self {
        Self {
            instrument: InstrumentId(0),
            base_spread_bps: 10.0,
            max_inventory: 100,
            order_size: Qty(10),
            skew_factor: 0.5,
            volatility_window: 100,
            base_order_id: 100_000,
        }
    }
}

pub struct MarketMaker {
    params: MarketMakerParams,
    clock: NanoClock,
    inventory: i64,
    best_bid: Price,
    best_ask: Price,
    has_bbo: bool,
    fair_value: Price,
    current_spread_bps: f64,
    mid_prices: RollingWindow<f64>,
    next_order_id: u64,
    orders: OrderBuffer,
}

impl MarketMaker {
    pub fn new(params: MarketMakerParams, clock: NanoClock) -> Self {
        Self {
            next_order_id: params.base_order_id,
            current_spread_bps: params.base_spread_bps,
            mid_prices: RollingWindow::new(params.volatility_window.max(2)),
            params,
            clock,
            inventory: 0,
            best_bid: Price::ZERO,
            best_ask: Price::ZERO,
            has_bbo: false,
            fair_value: Price::ZERO,
            orders: OrderBuffer::new(),
        }
    }

    pub fn inventory(&self) -> i64 {
        self.inventory
    }

    pub fn current_spread_bps(&self) -> f64 {
        self.current_spread_bps
    }

    fn alloc_order_id(&mut self) -> OrderId {
        let id = self.next_order_id;
        self.next_order_id += 1;
        OrderId(id)
    }

    fn observe_bbo(&mut self, best_bid: Price, best_ask: Price) {
        self.best_bid = best_bid;
        self.best_ask = best_ask;
        self.has_bbo = best_bid.0 > 0 && best_ask.0 > 0;

        if self.has_bbo {
            let mid = (best_bid.0 + best_ask.0) as f64 / 2.0;
            self.mid_prices.push(mid);
            self.fair_value = Price((best_bid.0 + best_ask.0) / 2);
            self.compute_dynamic_spread();
        }
    }

    /// Widen the base spread with the rolling stddev of mid returns,
    /// clamped so one noisy window cannot blow the quote out.
    fn compute_dynamic_spread(&mut self) {
        self.current_spread_bps = self.params.base_spread_bps;

        if self.mid_prices.len() < 10 {
            return;
        }

        let n = self.mid_prices.len() - 1;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for i in 1..self.mid_prices.len() {
            let prev = self.mid_prices.get(i - 1);
            let ret = (self.mid_prices.get(i) - prev) / prev;
            sum += ret;
            sum_sq += ret * ret;
        }

        let mean = sum / n as f64;
        let variance = (sum_sq / n as f64) - mean * mean;
        let vol = variance.max(0.0).sqrt();

        let multiplier = (1.0 + vol * 10_000.0).clamp(1.0, 5.0);
        self.current_spread_bps = self.params.base_spread_bps * multiplier;
    }

    fn push_order(&mut self, side: Side, price: Price, quantity: Qty) {
        let request = OrderRequest {
            id: self.alloc_order_id(),
            instrument: self.params.instrument,
            side,
            kind: OrderKind::Limit,
            price,
            quantity,
            venue: VenueId(0),
            timestamp: self.clock.now_ns(),
        };
        let _ = self.orders.try_push(request);
    }
}

impl Strategy for MarketMaker {
    fn name(&self) -> &'static str {
        "market_maker"
    }

    fn on_quote(&mut self, quote: &QuoteRecord) {
        if quote.instrument != self.params.instrument {
            return;
        }
        if quote.bid.0 > 0 && quote.ask.0 > 0 {
            self.observe_bbo(quote.bid, quote.ask);
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
        self.observe_bbo(best_bid, best_ask);
    }

    fn on_report(&mut self, report: &ExecutionReport) {
        if report.instrument != self.params.instrument {
            return;
        }
        if matches!(report.status, OrderStatus::Filled | OrderStatus::PartiallyFilled) {
            let filled = report.filled_quantity.0 as i64;
            match report.side {
                Side::Buy => self.inventory += filled,
                Side::Sell => self.inventory -= filled,
            }
        }
    }

    fn generate(&mut self) -> &[OrderRequest] {
        self.orders.clear();

        if !self.has_bbo || self.fair_value.0 <= 0 {
            return &self.orders;
        }

        // At the cap: one aggressive flattening order, no quoting.
        if self.inventory.abs() >= self.params.max_inventory {
            let qty = Qty(self.inventory.unsigned_abs());
            if self.inventory > 0 {
                let bid = self.best_bid;
                self.push_order(Side::Sell, bid, qty);
            } else {
                let ask = self.best_ask;
                self.push_order(Side::Buy, ask, qty);
            }
            return &self.orders;
        }

        let fair = self.fair_value.0 as f64;
        let spread = self.current_spread_bps * fair / 10_000.0;
        let half_spread = spread / 2.0;
        let skew = self.params.skew_factor
            * self.inventory as f64
            * (spread / self.params.max_inventory as f64);

        let mut bid_price = Price((fair - half_spread - skew) as i64);
        let mut ask_price = Price((fair + half_spread - skew) as i64);
        if bid_price.0 <= 0 {
            bid_price = Price(1);
        }
        if ask_price <= bid_price {
            ask_price = Price(bid_price.0 + 1);
        }

        let size = self.params.order_size;
        self.push_order(Side::Buy, bid_price, size);
        self.push_order(Side::Sell, ask_price, size);

        &self.orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(bid: i64, ask: i64) -> QuoteRecord {
        QuoteRecord {
            instrument: InstrumentId(0),
            bid: Price(bid),
            ask: Price(ask),
            bid_qty: Qty(100),
            ask_qty: Qty(100),
            last: Price((bid + ask) / 2),
            last_qty: Qty(10),
            timestamp: 1,
            frame_type: b'W',
        }
    }

    fn fill(side: Side, qty: u64) -> ExecutionReport {
        ExecutionReport {
            order_id: OrderId(1),
            exec_id: 1,
            instrument: InstrumentId(0),
            side,
            status: OrderStatus::Filled,
            price: Price(15000),
            quantity: Qty(qty),
            filled_quantity: Qty(qty),
            leaves_quantity: Qty::ZERO,
            venue: VenueId(1),
            timestamp: 2,
        }
    }

    fn maker() -> MarketMaker {
        MarketMaker::new(MarketMakerParams::default(), NanoClock::new())
    }

    #[test]
    fn no_quotes_before_first_bbo() {
        let mut mm = maker();
        assert!(mm.generate().is_empty());
    }

    #[test]
    fn quotes_straddle_fair_value() {
        let mut mm = maker();
        mm.on_quote(&quote(14990, 15010));

        let orders = mm.generate().to_vec();
        assert_eq!(orders.len(), 2);

        let bid = orders.iter().find(|o| o.side == Side::Buy).unwrap();
        let ask = orders.iter().find(|o| o.side == Side::Sell).unwrap();
        assert!(bid.price.0 < 15000);
        assert!(ask.price.0 > 15000);
        assert_eq!(bid.quantity, Qty(10));
        assert!(bid.id != ask.id);
    }

    #[test]
    fn inventory_skew_shifts_quotes_down() {
        let mut flat = maker();
        flat.on_quote(&quote(14990, 15010));
        let neutral: Vec<_> = flat.generate().to_vec();

        let mut long = maker();
        long.on_quote(&quote(14990, 15010));
        long.on_report(&fill(Side::Buy, 50)); // halfway to the cap
        let skewed: Vec<_> = long.generate().to_vec();

        let bid_of = |orders: &[OrderRequest]| orders.iter().find(|o| o.side == Side::Buy).unwrap().price.0;
        // Long inventory pushes both quotes lower to attract sellers less.
        assert!(bid_of(&skewed) < bid_of(&neutral));
    }

    #[test]
    fn flattens_at_inventory_cap() {
        let mut mm = maker();
        mm.on_quote(&quote(14990, 15010));
        mm.on_report(&fill(Side::Buy, 100));
        assert_eq!(mm.inventory(), 100);

        let orders = mm.generate().to_vec();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, Side::Sell);
        assert_eq!(orders[0].quantity, Qty(100));
        // Hits the bid to get out.
        assert_eq!(orders[0].price, Price(14990));
    }

    #[test]
    fn ignores_other_instruments() {
        let mut mm = maker();
        let mut q = quote(14990, 15010);
        q.instrument = InstrumentId(5);
        mm.on_quote(&q);
        assert!(mm.generate().is_empty());
    }

    #[test]
    fn volatility_widens_spread() {
        let mut mm = maker();
        // Calm tape first.
        for _ in 0..20 {
            mm.on_quote(&quote(14990, 15010));
        }
        let calm = mm.current_spread_bps();

        // Violent tape.
        for i in 0..20 {
            let shift = if i % 2 == 0 { 400 } else { -400 };
            mm.on_quote(&quote(14990 + shift, 15010 + shift));
        }
        assert!(mm.current_spread_bps() > calm);
    }
}

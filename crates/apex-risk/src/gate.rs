//! The pre-trade risk gate.

use core::sync::atomic::{AtomicBool, Ordering};

use apex_core::{OrderRequest, Price, RateWindow, Side, PRICE_SCALE};
use apex_metrics::NanoClock;

use crate::position::PositionLedger;

const INV_PRICE_SCALE: f64 = 1.0 / PRICE_SCALE as f64;

/// Outcome of a risk check. First failure in check order wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RiskCheck {
    Approved = 0,
    KillSwitchActive = 1,
    OrderSizeTooLarge = 2,
    PositionLimitBreached = 3,
    CapitalLimitBreached = 4,
    OrderRateExceeded = 5,
    FatFingerPrice = 6,
}

/// Configured limits.
#[derive(Clone, Copy, Debug)]
pub struct RiskLimits {
    pub max_position_per_instrument: i64,
    pub max_total_position: i64,
    pub max_capital: f64,
    pub max_order_size: u64,
    pub max_orders_per_second: u32,
    /// Fat-finger threshold as a percentage of the market price.
    pub max_price_deviation_pct: f64,
    /// Drawdown from peak P&L that arms the kill switch, in percent.
    pub max_drawdown_pct: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_per_instrument: 10_000,
            max_total_position: 50_000,
            max_capital: 10_000_000.0,
            max_order_size: 1_000,
            max_orders_per_second: 10_000,
            max_price_deviation_pct: 5.0,
            max_drawdown_pct: 2.0,
        }
    }
}

/// Validates every outgoing intent against the configured limits.
///
/// Single-writer: only the core thread calls `check_order` and the ledger
/// mutators. The kill switch is the one cross-thread flag and uses
/// release/acquire ordering.
pub struct RiskGate {
    limits: RiskLimits,
    ledger: PositionLedger,
    kill_switch: AtomicBool,
    /// `max_price_deviation_pct / 100`, so the hot path multiplies only.
    deviation_ratio: f64,
    drawdown_ratio: f64,
    rate: RateWindow,
    peak_pnl: f64,
    checks_performed: u64,
    checks_rejected: u64,
    clock: NanoClock,
}

impl RiskGate {
    pub fn new(limits: RiskLimits, clock: NanoClock) -> Self {
        let now = clock.now_ns();
        Self {
            deviation_ratio: limits.max_price_deviation_pct / 100.0,
            drawdown_ratio: limits.max_drawdown_pct / 100.0,
            limits,
            ledger: PositionLedger::new(),
            kill_switch: AtomicBool::new(false),
            rate: RateWindow::new(now),
            peak_pnl: 0.0,
            checks_performed: 0,
            checks_rejected: 0,
            clock,
        }
    }

    /// Validate an intent against all limits. First failure short-circuits.
    pub fn check_order(&mut self, request: &OrderRequest, market_price: Price) -> RiskCheck {
        self.checks_performed += 1;

        // 1. Kill switch.
        if self.kill_switch.load(Ordering::Acquire) {
            return self.reject(RiskCheck::KillSwitchActive);
        }

        // 2. Order size.
        if request.quantity.0 > self.limits.max_order_size {
            return self.reject(RiskCheck::OrderSizeTooLarge);
        }

        // 3. Per-instrument and aggregate position, assuming a full fill.
        {
            let current = self.ledger.position(request.instrument);
            let signed_qty = request.quantity.0 as i64;
            let new_pos = match request.side {
                Side::Buy => current + signed_qty,
                Side::Sell => current - signed_qty,
            };

            if new_pos.abs() > self.limits.max_position_per_instrument {
                return self.reject(RiskCheck::PositionLimitBreached);
            }

            let total = self.ledger.total_abs_position();
            let delta = new_pos.abs() - current.abs();
            if total + delta > self.limits.max_total_position {
                return self.reject(RiskCheck::PositionLimitBreached);
            }
        }

        // 4. Capital.
        {
            let capital = self.ledger.capital_used();
            let order_value =
                request.quantity.0 as f64 * request.price.0 as f64 * INV_PRICE_SCALE;
            if capital + order_value > self.limits.max_capital {
                return self.reject(RiskCheck::CapitalLimitBreached);
            }
        }

        // 5. Order rate.
        {
            let now = self.clock.now_ns();
            if !self.rate.try_acquire(now, self.limits.max_orders_per_second) {
                return self.reject(RiskCheck::OrderRateExceeded);
            }
        }

        // 6. Fat finger: |order - market| <= market * ratio, multiply only.
        if market_price.0 > 0 {
            let diff = request.price.abs_diff(market_price) as f64;
            if diff > market_price.0 as f64 * self.deviation_ratio {
                return self.reject(RiskCheck::FatFingerPrice);
            }
        }

        RiskCheck::Approved
    }

    #[cold]
    #[inline(never)]
    fn reject(&mut self, result: RiskCheck) -> RiskCheck {
        self.checks_rejected += 1;
        result
    }

    /// Feed a total-P&L observation to the drawdown supervisor. Arms the
    /// kill switch when the drawdown from peak exceeds the limit.
    pub fn on_pnl_update(&mut self, total_pnl: f64) {
        if total_pnl > self.peak_pnl {
            self.peak_pnl = total_pnl;
        }
        if self.peak_pnl > 0.0 {
            let drawdown = (self.peak_pnl - total_pnl) / self.peak_pnl;
            if drawdown > self.drawdown_ratio {
                self.arm_kill_switch();
            }
        }
    }

    pub fn arm_kill_switch(&self) {
        self.kill_switch.store(true, Ordering::Release);
    }

    pub fn disarm_kill_switch(&self) {
        self.kill_switch.store(false, Ordering::Release);
    }

    pub fn kill_switch_active(&self) -> bool {
        self.kill_switch.load(Ordering::Acquire)
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut PositionLedger {
        &mut self.ledger
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    pub fn checks_performed(&self) -> u64 {
        self.checks_performed
    }

    pub fn checks_rejected(&self) -> u64 {
        self.checks_rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apex_core::{InstrumentId, OrderId, OrderKind, Qty, VenueId};

    fn request(side: Side, price: i64, qty: u64) -> OrderRequest {
        OrderRequest {
            id: OrderId(1),
            instrument: InstrumentId(0),
            side,
            kind: OrderKind::Limit,
            price: Price(price),
            quantity: Qty(qty),
            venue: VenueId(0),
            timestamp: 0,
        }
    }

    fn gate() -> RiskGate {
        RiskGate::new(RiskLimits::default(), NanoClock::new())
    }

    #[test]
    fn approves_within_all_limits() {
        let mut g = gate();
        let result = g.check_order(&request(Side::Buy, 15000, 100), Price(15000));
        assert_eq!(result, RiskCheck::Approved);
        assert_eq!(g.checks_performed(), 1);
        assert_eq!(g.checks_rejected(), 0);
    }

    #[test]
    fn kill_switch_rejects_everything_first() {
        let mut g = gate();
        g.arm_kill_switch();

        // Even an otherwise-terrible order reports only the kill switch.
        let result = g.check_order(&request(Side::Buy, 15000, 1_000_000), Price(15000));
        assert_eq!(result, RiskCheck::KillSwitchActive);

        g.disarm_kill_switch();
        let result = g.check_order(&request(Side::Buy, 15000, 100), Price(15000));
        assert_eq!(result, RiskCheck::Approved);
    }

    #[test]
    fn order_size_limit() {
        let mut g = gate();
        let result = g.check_order(&request(Side::Buy, 15000, 1001), Price(15000));
        assert_eq!(result, RiskCheck::OrderSizeTooLarge);
        assert_eq!(g.checks_rejected(), 1);
    }

    #[test]
    fn per_instrument_position_limit() {
        let mut limits = RiskLimits::default();
        limits.max_position_per_instrument = 150;
        let mut g = RiskGate::new(limits, NanoClock::new());

        g.ledger_mut().on_fill(InstrumentId(0), Side::Buy, Qty(100), Price(15000));

        let result = g.check_order(&request(Side::Buy, 15000, 100), Price(15000));
        assert_eq!(result, RiskCheck::PositionLimitBreached);

        // Reducing the position is fine.
        let result = g.check_order(&request(Side::Sell, 15000, 100), Price(15000));
        assert_eq!(result, RiskCheck::Approved);
    }

    #[test]
    fn aggregate_position_limit() {
        let mut limits = RiskLimits::default();
        limits.max_position_per_instrument = 10_000;
        limits.max_total_position = 150;
        let mut g = RiskGate::new(limits, NanoClock::new());

        g.ledger_mut().on_fill(InstrumentId(1), Side::Buy, Qty(100), Price(15000));

        let result = g.check_order(&request(Side::Buy, 15000, 100), Price(15000));
        assert_eq!(result, RiskCheck::PositionLimitBreached);
    }

    #[test]
    fn capital_limit() {
        let mut limits = RiskLimits::default();
        limits.max_capital = 10_000.0;
        let mut g = RiskGate::new(limits, NanoClock::new());

        // 100 shares at $150 = $15,000 > $10,000.
        let result = g.check_order(&request(Side::Buy, 15000, 100), Price(15000));
        assert_eq!(result, RiskCheck::CapitalLimitBreached);
    }

    #[test]
    fn rate_limit_within_window() {
        let mut limits = RiskLimits::default();
        limits.max_orders_per_second = 3;
        let mut g = RiskGate::new(limits, NanoClock::new());

        for _ in 0..3 {
            assert_eq!(
                g.check_order(&request(Side::Buy, 15000, 10), Price(15000)),
                RiskCheck::Approved
            );
        }
        assert_eq!(
            g.check_order(&request(Side::Buy, 15000, 10), Price(15000)),
            RiskCheck::OrderRateExceeded
        );
    }

    #[test]
    fn fat_finger_boundary() {
        let mut g = gate();

        // Market $150.00, 5% band: 751 off is out, 750 off is in.
        let result = g.check_order(&request(Side::Buy, 15751, 100), Price(15000));
        assert_eq!(result, RiskCheck::FatFingerPrice);

        let result = g.check_order(&request(Side::Buy, 15750, 100), Price(15000));
        assert_eq!(result, RiskCheck::Approved);
    }

    #[test]
    fn drawdown_arms_kill_switch() {
        let mut g = gate();

        g.on_pnl_update(1000.0);
        assert!(!g.kill_switch_active());

        // 3% drawdown from peak 1000 breaches the 2% limit.
        g.on_pnl_update(970.0);
        assert!(g.kill_switch_active());

        let result = g.check_order(&request(Side::Buy, 15000, 10), Price(15000));
        assert_eq!(result, RiskCheck::KillSwitchActive);
    }

    #[test]
    fn drawdown_within_limit_stays_disarmed() {
        let mut g = gate();
        g.on_pnl_update(1000.0);
        g.on_pnl_update(985.0); // 1.5%
        assert!(!g.kill_switch_active());
    }
}

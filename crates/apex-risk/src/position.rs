//! Position ledger.
//!
//! Flat arrays indexed by instrument id. Weighted-average entry price is
//! maintained on same-sign adds; realized P&L accrues only when a fill
//! reduces or flips the position.

use apex_core::{InstrumentId, Price, Qty, Side, MAX_INSTRUMENTS, PRICE_SCALE};

/// Per-instrument signed positions with P&L accounting.
pub struct PositionLedger {
    positions: [i64; MAX_INSTRUMENTS],
    avg_prices: [f64; MAX_INSTRUMENTS],
    mark_prices: [Price; MAX_INSTRUMENTS],
    instrument_realized: [f64; MAX_INSTRUMENTS],
    realized: f64,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self {
            positions: [0; MAX_INSTRUMENTS],
            avg_prices: [0.0; MAX_INSTRUMENTS],
            mark_prices: [Price::ZERO; MAX_INSTRUMENTS],
            instrument_realized: [0.0; MAX_INSTRUMENTS],
            realized: 0.0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Apply a fill to the ledger.
    pub fn on_fill(&mut self, instrument: InstrumentId, side: Side, quantity: Qty, price: Price) {
        let idx = instrument.index();
        if idx >= MAX_INSTRUMENTS {
            return;
        }

        let signed_qty = quantity.0 as i64;
        let fill_price = price.0 as f64 / PRICE_SCALE as f64;
        let pos = &mut self.positions[idx];
        let avg = &mut self.avg_prices[idx];

        match side {
            Side::Buy => {
                if *pos >= 0 {
                    // Same-sign add: re-weight the average entry.
                    let total_cost = *avg * *pos as f64 + fill_price * signed_qty as f64;
                    *pos += signed_qty;
                    if *pos > 0 {
                        *avg = total_cost / *pos as f64;
                    }
                } else {
                    // Covering a short: realize on the covered quantity.
                    let cover_qty = signed_qty.min(-*pos);
                    let pnl = cover_qty as f64 * (*avg - fill_price);
                    self.realized += pnl;
                    self.instrument_realized[idx] += pnl;
                    *pos += signed_qty;
                    if *pos > 0 {
                        *avg = fill_price; // flipped long
                    } else if *pos == 0 {
                        *avg = 0.0;
                    }
                }
            }
            Side::Sell => {
                if *pos <= 0 {
                    let total_cost = *avg * (-*pos) as f64 + fill_price * signed_qty as f64;
                    *pos -= signed_qty;
                    if *pos < 0 {
                        *avg = total_cost / (-*pos) as f64;
                    }
                } else {
                    // Selling out of a long: realize on the sold quantity.
                    let sell_qty = signed_qty.min(*pos);
                    let pnl = sell_qty as f64 * (fill_price - *avg);
                    self.realized += pnl;
                    self.instrument_realized[idx] += pnl;
                    *pos -= signed_qty;
                    if *pos < 0 {
                        *avg = fill_price; // flipped short
                    } else if *pos == 0 {
                        *avg = 0.0;
                    }
                }
            }
        }
    }

    pub fn update_mark_price(&mut self, instrument: InstrumentId, price: Price) {
        let idx = instrument.index();
        if idx < MAX_INSTRUMENTS {
            self.mark_prices[idx] = price;
        }
    }

    pub fn position(&self, instrument: InstrumentId) -> i64 {
        let idx = instrument.index();
        if idx < MAX_INSTRUMENTS {
            self.positions[idx]
        } else {
            0
        }
    }

    pub fn avg_price(&self, instrument: InstrumentId) -> f64 {
        let idx = instrument.index();
        if idx < MAX_INSTRUMENTS {
            self.avg_prices[idx]
        } else {
            0.0
        }
    }

    /// Sum of absolute positions across all instruments.
    pub fn total_abs_position(&self) -> i64 {
        self.positions.iter().map(|p| p.abs()).sum()
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized
    }

    /// Mark-to-market P&L over open positions.
    pub fn unrealized_pnl(&self) -> f64 {
        let mut pnl = 0.0;
        for i in 0..MAX_INSTRUMENTS {
            let pos = self.positions[i];
            let mark = self.mark_prices[i];
            if pos != 0 && !mark.is_zero() {
                let mark = mark.0 as f64 / PRICE_SCALE as f64;
                if pos > 0 {
                    pnl += pos as f64 * (mark - self.avg_prices[i]);
                } else {
                    pnl += (-pos) as f64 * (self.avg_prices[i] - mark);
                }
            }
        }
        pnl
    }

    pub fn total_pnl(&self) -> f64 {
        self.realized + self.unrealized_pnl()
    }

    /// Notional tied up across open positions, marked where possible.
    pub fn capital_used(&self) -> f64 {
        let mut capital = 0.0;
        for i in 0..MAX_INSTRUMENTS {
            let pos = self.positions[i];
            if pos != 0 {
                let price = if self.mark_prices[i].0 > 0 {
                    self.mark_prices[i].0 as f64 / PRICE_SCALE as f64
                } else {
                    self.avg_prices[i]
                };
                capital += pos.abs() as f64 * price;
            }
        }
        capital
    }
}

impl Default for PositionLedger {
    fn default() -> Self {
        Self::new()
    }
}

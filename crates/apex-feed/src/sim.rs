//! Synthetic feed generation and CSV replay.
//!
//! The generator runs a per-instrument random walk and renders well-formed
//! quote frames into an internal buffer, round-robining across
//! instruments. CSV replay converts recorded rows into the same frame
//! format so the rest of the pipeline cannot tell the difference.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use thiserror::Error;

use apex_core::InstrumentId;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read replay file: {0}")]
    Io(#[from] io::Error),
    #[error("malformed record at line {0}")]
    BadRecord(usize),
}

struct InstrumentState {
    #[allow(dead_code)]
    id: InstrumentId,
    symbol: String,
    mid_price: f64,
    volatility: f64,
    spread: f64,
    base_size: u64,
}

/// Deterministic synthetic market-data source.
pub struct FeedSimulator {
    instruments: Vec<InstrumentState>,
    rng: SmallRng,
    current: usize,
    frame_count: u64,
    buffer: String,
    csv_frames: Vec<String>,
    csv_pos: usize,
}

impl FeedSimulator {
    pub fn new() -> Self {
        Self::with_seed(42)
    }

    /// Fixed seed keeps runs reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            instruments: Vec::new(),
            rng: SmallRng::seed_from_u64(seed),
            current: 0,
            frame_count: 0,
            buffer: String::with_capacity(256),
            csv_frames: Vec::new(),
            csv_pos: 0,
        }
    }

    pub fn add_instrument(
        &mut self,
        id: InstrumentId,
        symbol: &str,
        initial_price: f64,
        volatility: f64,
        spread: f64,
        base_size: u64,
    ) {
        self.instruments.push(InstrumentState {
            id,
            symbol: symbol.to_owned(),
            mid_price: initial_price,
            volatility,
            spread,
            base_size,
        });
    }

    /// Produce the next quote frame. The returned slice borrows the
    /// internal buffer and is valid until the next call.
    pub fn next_frame(&mut self) -> &str {
        if self.instruments.is_empty() {
            return "";
        }

        let idx = self.current;
        self.current = (self.current + 1) % self.instruments.len();

        // Random walk on the mid, floored so the price stays positive.
        let z: f64 = self.rng.sample(StandardNormal);
        {
            let state = &mut self.instruments[idx];
            state.mid_price += state.volatility * state.mid_price * z;
            if state.mid_price < 0.01 {
                state.mid_price = 0.01;
            }
        }

        self.frame_count += 1;

        let noise: f64 = self.rng.sample(StandardNormal);
        let qty_factor = 1 + noise.abs() as u64;

        let state = &self.instruments[idx];
        let half_spread = state.spread / 2.0;
        let bid = state.mid_price - half_spread;
        let ask = state.mid_price + half_spread;
        let last = state.mid_price + state.spread * 0.1 * noise;
        let bid_qty = state.base_size * qty_factor;
        let ask_qty = state.base_size * qty_factor;
        let last_qty = state.base_size / 2;

        self.buffer.clear();
        let _ = write!(
            self.buffer,
            "8=FIX.4.4|9=200|35=W|49=FEED|56=CLIENT|34={}|55={}|132={:.2}|133={:.2}|134={}|135={}|44={:.2}|38={}|10=000|",
            self.frame_count, state.symbol, bid, ask, bid_qty, ask_qty, last, last_qty,
        );

        &self.buffer
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Load a recorded CSV (`timestamp,instrument,bid,ask,bid_qty,ask_qty,
    /// last,last_qty`, header row required) and convert every row into a
    /// quote frame. Returns the number of frames loaded.
    pub fn load_csv(&mut self, path: &Path) -> Result<usize, ReplayError> {
        let body = fs::read_to_string(path)?;
        self.csv_frames.clear();
        self.csv_pos = 0;

        for (line_no, line) in body.lines().enumerate().skip(1) {
            if line.is_empty() {
                continue;
            }

            let mut cols = line.split(',');
            let mut next = || cols.next().map(str::trim);

            let _timestamp = next();
            let (Some(symbol), Some(bid), Some(ask), Some(bid_qty), Some(ask_qty), Some(last), Some(last_qty)) =
                (next(), next(), next(), next(), next(), next(), next())
            else {
                return Err(ReplayError::BadRecord(line_no + 1));
            };

            let mut frame = String::with_capacity(128);
            let _ = write!(
                frame,
                "8=FIX.4.4|9=200|35=W|49=FEED|56=CLIENT|34={}|55={}|132={}|133={}|134={}|135={}|44={}|38={}|10=000|",
                self.csv_frames.len() + 1,
                symbol,
                bid,
                ask,
                bid_qty,
                ask_qty,
                last,
                last_qty,
            );
            self.csv_frames.push(frame);
        }

        Ok(self.csv_frames.len())
    }

    /// Next replayed frame, or `None` when the recording is exhausted.
    pub fn next_csv_frame(&mut self) -> Option<&str> {
        let frame = self.csv_frames.get(self.csv_pos)?;
        self.csv_pos += 1;
        Some(frame)
    }

    pub fn reset_csv(&mut self) {
        self.csv_pos = 0;
    }
}

impl Default for FeedSimulator {
    fn default() -> Self {
        Self::new()
    }
}

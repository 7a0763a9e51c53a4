//! Frame normalization and dispatch.
//!
//! Parses raw frames, maps symbols to instrument ids, and publishes
//! normalized quote records to the core loop over an SPSC ring. This edge
//! is best-effort: malformed or unknown frames and ring overflow are
//! counted and dropped, never blocking the feed.

use apex_core::{InstrumentId, QuoteRecord, MAX_INSTRUMENTS};
use apex_metrics::NanoClock;
use apex_ring::Producer;

use crate::fix::{FixMessage, DEFAULT_DELIMITER};

/// Instrument ids below this belong to the static symbol table; hashed
/// unknown symbols map into `[HASHED_ID_BASE, MAX_INSTRUMENTS)` so the two
/// ranges can never collide.
pub const HASHED_ID_BASE: u32 = 8;

/// Parses feed frames and publishes [`QuoteRecord`]s.
pub struct MarketDataDispatch {
    out: Producer<QuoteRecord>,
    clock: NanoClock,
    delimiter: u8,
    published: u64,
    frames_dropped: u64,
    records_dropped: u64,
}

impl MarketDataDispatch {
    pub fn new(out: Producer<QuoteRecord>, clock: NanoClock) -> Self {
        Self {
            out,
            clock,
            delimiter: DEFAULT_DELIMITER,
            published: 0,
            frames_dropped: 0,
            records_dropped: 0,
        }
    }

    pub fn set_delimiter(&mut self, delimiter: u8) {
        self.delimiter = delimiter;
    }

    /// Parse one frame and publish its normalized record. Returns whether
    /// a record was published.
    pub fn process_frame(&mut self, frame: &[u8]) -> bool {
        let Ok(msg) = FixMessage::parse(frame, self.delimiter) else {
            self.frames_dropped += 1;
            return false;
        };

        let timestamp = self.clock.now_ns();
        let record = match msg.msg_type() {
            b"W" => QuoteRecord {
                instrument: symbol_to_id(msg.symbol()),
                bid: msg.bid_price(),
                ask: msg.ask_price(),
                bid_qty: msg.bid_qty(),
                ask_qty: msg.ask_qty(),
                last: msg.price(),
                last_qty: msg.quantity(),
                timestamp,
                frame_type: b'W',
            },
            b"8" => QuoteRecord {
                instrument: symbol_to_id(msg.symbol()),
                last: msg.price(),
                last_qty: msg.quantity(),
                timestamp,
                frame_type: b'8',
                ..Default::default()
            },
            b"D" => QuoteRecord {
                instrument: symbol_to_id(msg.symbol()),
                last: msg.price(),
                last_qty: msg.quantity(),
                timestamp,
                frame_type: b'D',
                ..Default::default()
            },
            _ => {
                self.frames_dropped += 1;
                return false;
            }
        };

        if self.out.try_push(record) {
            self.published += 1;
            true
        } else {
            self.records_dropped += 1;
            false
        }
    }

    pub fn published(&self) -> u64 {
        self.published
    }

    /// Malformed or unrecognized frames.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    /// Records lost to output-ring overflow.
    pub fn records_dropped(&self) -> u64 {
        self.records_dropped
    }
}

/// Map a symbol to an instrument id: a small static table for the known
/// names, a bounded hash for everything else. Hashed ids stay out of the
/// static range.
pub fn symbol_to_id(symbol: &[u8]) -> InstrumentId {
    match symbol {
        b"AAPL" => return InstrumentId(0),
        b"GOOG" => return InstrumentId(1),
        b"MSFT" => return InstrumentId(2),
        b"AMZN" => return InstrumentId(3),
        b"TSLA" => return InstrumentId(4),
        _ => {}
    }

    let mut hash: u32 = 0;
    for &b in symbol {
        hash = hash.wrapping_mul(31).wrapping_add(b as u32);
    }
    InstrumentId(HASHED_ID_BASE + hash % (MAX_INSTRUMENTS as u32 - HASHED_ID_BASE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use apex_core::Price;

    fn dispatch(capacity: usize) -> (MarketDataDispatch, apex_ring::Consumer<QuoteRecord>) {
        let (tx, rx) = apex_ring::channel::<QuoteRecord>(capacity);
        (MarketDataDispatch::new(tx, NanoClock::new()), rx)
    }

    #[test]
    fn quote_frame_is_normalized() {
        let (mut d, mut rx) = dispatch(16);

        let ok = d.process_frame(
            b"35=W|55=AAPL|132=150.00|133=150.10|134=500|135=600|44=150.05|38=100|",
        );
        assert!(ok);
        assert_eq!(d.published(), 1);

        let record = rx.try_pop().unwrap();
        assert_eq!(record.instrument, InstrumentId(0));
        assert_eq!(record.bid, Price(15000));
        assert_eq!(record.ask, Price(15010));
        assert_eq!(record.frame_type, b'W');
        assert!(record.timestamp > 0);
        assert!(record.bid < record.ask);
    }

    #[test]
    fn execution_report_frame_keeps_last_trade_only() {
        let (mut d, mut rx) = dispatch(16);

        assert!(d.process_frame(b"35=8|55=GOOG|44=280.50|38=25|"));
        let record = rx.try_pop().unwrap();
        assert_eq!(record.instrument, InstrumentId(1));
        assert_eq!(record.frame_type, b'8');
        assert_eq!(record.last, Price(28050));
        assert_eq!(record.bid, Price::ZERO);
    }

    #[test]
    fn unknown_type_and_garbage_are_counted() {
        let (mut d, _rx) = dispatch(16);

        assert!(!d.process_frame(b"35=Z|55=AAPL|"));
        assert!(!d.process_frame(b"###"));
        assert_eq!(d.frames_dropped(), 2);
        assert_eq!(d.published(), 0);
    }

    #[test]
    fn ring_overflow_is_counted_not_blocking() {
        // Capacity 2 -> a single usable slot.
        let (mut d, _rx) = dispatch(2);

        assert!(d.process_frame(b"35=W|55=AAPL|132=1.00|133=1.01|"));
        assert!(!d.process_frame(b"35=W|55=AAPL|132=1.00|133=1.01|"));
        assert_eq!(d.records_dropped(), 1);
        assert_eq!(d.published(), 1);
    }

    #[test]
    fn known_symbols_get_static_ids() {
        assert_eq!(symbol_to_id(b"AAPL"), InstrumentId(0));
        assert_eq!(symbol_to_id(b"TSLA"), InstrumentId(4));
    }

    #[test]
    fn unknown_symbols_hash_into_reserved_range() {
        for sym in [&b"XYZW"[..], b"Q", b"LONGSYMBOLNAME", b"ZZZZ"] {
            let id = symbol_to_id(sym).0;
            assert!(id >= HASHED_ID_BASE);
            assert!((id as usize) < MAX_INSTRUMENTS);
        }
        // Deterministic.
        assert_eq!(symbol_to_id(b"XYZW"), symbol_to_id(b"XYZW"));
    }
}

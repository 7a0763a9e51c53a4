//! Zero-copy tag-value frame parser.
//!
//! Frames are `tag=value` pairs separated by a configurable delimiter byte
//! (pipe in the simulator, SOH on a real wire). Field values borrow the
//! input frame; tags below 128 sit in a flat array for O(1) access, larger
//! tags go to a small linear-scan spill area.

use arrayvec::ArrayVec;
use thiserror::Error;

use apex_core::{OrderKind, Price, Qty, Side, PRICE_SCALE};

/// Human-readable delimiter used by the simulated feed.
pub const DEFAULT_DELIMITER: u8 = b'|';

/// FIX standard field separator.
pub const SOH: u8 = 0x01;

const MAX_COMMON_TAGS: usize = 128;
const MAX_EXTRA_FIELDS: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,
    #[error("non-digit byte in tag")]
    MalformedTag,
    #[error("frame has no message type (tag 35)")]
    MissingType,
}

/// A parsed frame. All values are slices into the original buffer.
#[derive(Debug)]
pub struct FixMessage<'a> {
    common: [&'a [u8]; MAX_COMMON_TAGS],
    extra: ArrayVec<(u16, &'a [u8]), MAX_EXTRA_FIELDS>,
}

impl<'a> FixMessage<'a> {
    /// Parse a frame. Unknown tags are retained but not interpreted;
    /// spill overflow beyond [`MAX_EXTRA_FIELDS`] is silently dropped.
    pub fn parse(frame: &'a [u8], delimiter: u8) -> Result<Self, FrameError> {
        if frame.is_empty() {
            return Err(FrameError::Empty);
        }

        let mut msg = Self {
            common: [&[]; MAX_COMMON_TAGS],
            extra: ArrayVec::new(),
        };

        let mut pos = 0;
        while pos < frame.len() {
            let Some(eq_off) = frame[pos..].iter().position(|&b| b == b'=') else {
                break;
            };
            let eq_pos = pos + eq_off;

            let mut tag: u32 = 0;
            for &b in &frame[pos..eq_pos] {
                if !b.is_ascii_digit() {
                    return Err(FrameError::MalformedTag);
                }
                tag = tag * 10 + (b - b'0') as u32;
            }

            let value_start = eq_pos + 1;
            let delim_pos = frame[value_start..]
                .iter()
                .position(|&b| b == delimiter)
                .map(|off| value_start + off)
                .unwrap_or(frame.len());

            let value = &frame[value_start..delim_pos];

            if tag > 0 && (tag as usize) < MAX_COMMON_TAGS {
                msg.common[tag as usize] = value;
            } else if tag >= MAX_COMMON_TAGS as u32 && tag <= u16::MAX as u32 {
                let _ = msg.extra.try_push((tag as u16, value));
            }

            pos = delim_pos + 1;
        }

        if msg.msg_type().is_empty() {
            return Err(FrameError::MissingType);
        }
        Ok(msg)
    }

    /// Raw field value by tag; empty if absent.
    pub fn field(&self, tag: u16) -> &'a [u8] {
        if tag > 0 && (tag as usize) < MAX_COMMON_TAGS {
            return self.common[tag as usize];
        }
        self.extra
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, v)| *v)
            .unwrap_or(&[])
    }

    /// Message type (tag 35).
    pub fn msg_type(&self) -> &'a [u8] {
        self.field(35)
    }

    /// Client order id (tag 11).
    pub fn order_id(&self) -> u64 {
        parse_u64(self.field(11))
    }

    /// Symbol (tag 55).
    pub fn symbol(&self) -> &'a [u8] {
        self.field(55)
    }

    /// Side (tag 54): "1" is buy, anything else sell.
    pub fn side(&self) -> Side {
        if self.field(54) == b"1" {
            Side::Buy
        } else {
            Side::Sell
        }
    }

    /// Last price (tag 44).
    pub fn price(&self) -> Price {
        parse_price(self.field(44))
    }

    /// Quantity (tag 38).
    pub fn quantity(&self) -> Qty {
        Qty(parse_u64(self.field(38)))
    }

    /// Order kind (tag 40). Unrecognized values default to limit.
    pub fn order_kind(&self) -> OrderKind {
        match self.field(40) {
            b"1" => OrderKind::Market,
            b"3" => OrderKind::Ioc,
            b"4" => OrderKind::Fok,
            _ => OrderKind::Limit,
        }
    }

    pub fn bid_price(&self) -> Price {
        parse_price(self.field(132))
    }

    pub fn ask_price(&self) -> Price {
        parse_price(self.field(133))
    }

    pub fn bid_qty(&self) -> Qty {
        Qty(parse_u64(self.field(134)))
    }

    pub fn ask_qty(&self) -> Qty {
        Qty(parse_u64(self.field(135)))
    }
}

/// Fixed-point price scan: optional sign, integer part, up to two
/// fractional digits zero-padded to scale 100. Any byte outside `0..9`
/// (and the single decimal point) terminates the scan.
pub fn parse_price(bytes: &[u8]) -> Price {
    if bytes.is_empty() {
        return Price::ZERO;
    }

    let mut i = 0;
    let negative = bytes[0] == b'-';
    if negative {
        i = 1;
    }

    let mut integer: i64 = 0;
    let mut fraction: i64 = 0;
    let mut fraction_digits = 0;
    let mut in_fraction = false;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'.' && !in_fraction {
            in_fraction = true;
            i += 1;
            continue;
        }
        if !b.is_ascii_digit() {
            break;
        }
        if in_fraction {
            if fraction_digits < 2 {
                fraction = fraction * 10 + (b - b'0') as i64;
                fraction_digits += 1;
            }
        } else {
            integer = integer * 10 + (b - b'0') as i64;
        }
        i += 1;
    }

    while fraction_digits < 2 {
        fraction *= 10;
        fraction_digits += 1;
    }

    let value = integer * PRICE_SCALE + fraction;
    Price(if negative { -value } else { value })
}

/// Unsigned decimal scan; stops at the first non-digit.
pub fn parse_u64(bytes: &[u8]) -> u64 {
    let mut value: u64 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            break;
        }
        value = value * 10 + (b - b'0') as u64;
    }
    value
}

//! Fixed-point prices and quantities.
//!
//! Prices are signed 64-bit integers in minor units at scale 100
//! ($150.50 is stored as 15050), so comparisons are plain integer
//! comparisons and arithmetic is deterministic across platforms.
//! Negative values are reserved for sentinels.

use core::ops::{Add, Sub};

/// Minor units per whole price unit (two decimal places).
pub const PRICE_SCALE: i64 = 100;

/// Fixed-point price.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Price(pub i64);

impl Price {
    /// Zero price. Doubles as the empty-bid sentinel.
    pub const ZERO: Self = Self(0);

    /// Maximum price. Doubles as the empty-ask sentinel so that the
    /// "best ask" comparison direction stays uniform.
    pub const MAX: Self = Self(i64::MAX);

    /// Convert a floating-point price to fixed-point, rounding half away
    /// from zero. Only meaningful for inputs with at most two decimals.
    #[inline(always)]
    pub fn from_f64(value: f64) -> Self {
        let scaled = value * PRICE_SCALE as f64;
        let rounded = if value >= 0.0 { scaled + 0.5 } else { scaled - 0.5 };
        Self(rounded as i64)
    }

    /// Convert back to a floating-point price.
    #[inline(always)]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / PRICE_SCALE as f64
    }

    #[inline(always)]
    pub const fn as_raw(self) -> i64 {
        self.0
    }

    #[inline(always)]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    #[inline(always)]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    #[inline(always)]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Absolute distance between two prices, in minor units.
    #[inline(always)]
    pub const fn abs_diff(self, other: Self) -> i64 {
        (self.0 - other.0).abs()
    }
}

impl Add for Price {
    type Output = Self;

    #[inline(always)]
    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl Sub for Price {
    type Output = Self;

    #[inline(always)]
    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

/// Quantity in base units (shares, contracts).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Qty(pub u64);

impl Qty {
    pub const ZERO: Self = Self(0);

    #[inline(always)]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    #[inline(always)]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    #[inline(always)]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    #[inline(always)]
    pub const fn min(self, other: Self) -> Self {
        if self.0 < other.0 {
            self
        } else {
            other
        }
    }
}

impl Add for Qty {
    type Output = Self;

    #[inline(always)]
    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl Sub for Qty {
    type Output = Self;

    #[inline(always)]
    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_round_trip_two_decimals() {
        // Every price with <= 2 fractional digits must survive the trip.
        for cents in [0i64, 1, 99, 100, 15050, 15750, 15751, 1_000_000] {
            let p = Price(cents);
            assert_eq!(Price::from_f64(p.to_f64()), p);
        }
        for cents in [-1i64, -99, -15050] {
            let p = Price(cents);
            assert_eq!(Price::from_f64(p.to_f64()), p);
        }
    }

    #[test]
    fn from_f64_rounds_half_away() {
        assert_eq!(Price::from_f64(150.50), Price(15050));
        assert_eq!(Price::from_f64(-150.50), Price(-15050));
        assert_eq!(Price::from_f64(0.01), Price(1));
    }

    #[test]
    fn qty_ops() {
        let a = Qty(100);
        let b = Qty(50);

        assert_eq!((a + b).0, 150);
        assert_eq!((a - b).0, 50);
        assert_eq!(a.min(b), b);
        assert_eq!(b.saturating_sub(a), Qty::ZERO);
    }

    #[test]
    fn price_abs_diff() {
        assert_eq!(Price(15751).abs_diff(Price(15000)), 751);
        assert_eq!(Price(15000).abs_diff(Price(15751)), 751);
    }
}

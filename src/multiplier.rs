//! Fixed-precision multiplier arithmetic.
//!
//! Every multiplier the server publishes (crash curve, crash point, mines
//! chain) and every payout derived from one goes through this type, so the
//! server and any client re-deriving an outcome round identically.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

// Scaling factor for fixed-point arithmetic: four decimal places.
// The crash protocol publishes two decimals; the mines chain needs four
// (e.g. the 5-bomb base multiplier 1.2125).
pub const SCALE: u64 = 10_000;

/// Fixed-point multiplier with 4 decimal places of precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(from = "f64")]
pub struct Multiplier(u64);

impl Multiplier {
    pub const ONE: Multiplier = Multiplier(SCALE);

    /// The 3% house edge as an exact fixed-point factor (0.9700). Going
    /// through `from_f64(0.97)` would floor the IEEE value to 0.9699.
    pub const HOUSE_EDGE: Multiplier = Multiplier(9_700);

    /// Create from raw ten-thousandths.
    pub fn from_raw(raw: u64) -> Self {
        Multiplier(raw)
    }

    /// Create from integer hundredths (the two-decimal wire format).
    pub fn from_hundredths(hundredths: u64) -> Self {
        Multiplier(hundredths * (SCALE / 100))
    }

    /// Create from a float, flooring to the representable precision.
    pub fn from_f64(value: f64) -> Self {
        let clamped = value.max(0.0);
        Multiplier((clamped * SCALE as f64).floor() as u64)
    }

    /// Create from a fraction, rounding to nearest.
    pub fn from_frac(numerator: u64, denominator: u64) -> Self {
        if denominator == 0 {
            return Multiplier(0);
        }
        let scaled = numerator as u128 * SCALE as u128;
        Multiplier(((scaled + denominator as u128 / 2) / denominator as u128) as u64)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    /// Drop sub-hundredth precision, flooring. The crash protocol publishes
    /// two-decimal values only.
    pub fn floor_to_hundredths(self) -> Self {
        Multiplier(self.0 / (SCALE / 100) * (SCALE / 100))
    }

    /// Multiply two multipliers, rounding to nearest.
    pub fn mul(self, other: Self) -> Self {
        let scaled = self.0 as u128 * other.0 as u128;
        Multiplier(((scaled + SCALE as u128 / 2) / SCALE as u128) as u64)
    }

    /// Divide two multipliers, rounding to nearest.
    pub fn div(self, other: Self) -> Self {
        if other.0 == 0 {
            return Multiplier(0);
        }
        let scaled = self.0 as u128 * SCALE as u128;
        Multiplier(((scaled + other.0 as u128 / 2) / other.0 as u128) as u64)
    }

    /// Payout for a stake at this multiplier, floored to a whole unit.
    pub fn payout(self, amount: u64) -> u64 {
        (amount as u128 * self.0 as u128 / SCALE as u128) as u64
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}x", self.as_f64())
    }
}

impl From<f64> for Multiplier {
    fn from(value: f64) -> Self {
        Multiplier::from_f64(value)
    }
}

// Serialized as a plain float so event payloads read `"multiplier": 1.8`.
impl Serialize for Multiplier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hundredths() {
        let m = Multiplier::from_hundredths(180);
        assert_eq!(m.raw(), 18_000);
        assert_eq!(m.as_f64(), 1.8);
    }

    #[test]
    fn test_from_frac() {
        // 25/20 * 0.97 is the 5-bomb mines base: 1.2125 exactly.
        let base = Multiplier::from_frac(25, 20).mul(Multiplier::from_frac(97, 100));
        assert_eq!(base.raw(), 12_125);
    }

    #[test]
    fn test_div_rounds_to_nearest() {
        // 1.2125 / (19/24) = 1.53157... rounds to 1.5316
        let m = Multiplier::from_raw(12_125).div(Multiplier::from_frac(19, 24));
        assert_eq!(m.raw(), 15_316);
    }

    #[test]
    fn test_floor_to_hundredths() {
        assert_eq!(Multiplier::from_raw(15_316).floor_to_hundredths().raw(), 15_300);
        assert_eq!(Multiplier::from_raw(18_000).floor_to_hundredths().raw(), 18_000);
    }

    #[test]
    fn test_payout_floors() {
        assert_eq!(Multiplier::from_hundredths(180).payout(100), 180);
        // 7 * 1.5316 = 10.7212 -> 10
        assert_eq!(Multiplier::from_raw(15_316).payout(7), 10);
        assert_eq!(Multiplier::ONE.payout(250), 250);
    }

    #[test]
    fn test_ordering() {
        assert!(Multiplier::from_hundredths(250) > Multiplier::from_hundredths(180));
        assert_eq!(Multiplier::from_hundredths(100), Multiplier::ONE);
    }

    #[test]
    fn test_display() {
        assert_eq!(Multiplier::from_hundredths(180).to_string(), "1.80x");
    }
}

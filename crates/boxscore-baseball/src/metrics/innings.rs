// Innings-pitched normalization from box-score thirds notation.
//
// Box scores write 5 2/3 innings as `5.2`. Reading that as a decimal
// inflates every IP-denominated rate, so the value is converted to whole
// outs first and only then divided by three.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest tenths-digit error tolerated when reading `x.1` / `x.2` back out
/// of a binary float.
const DIGIT_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("innings pitched value {0} is not in thirds notation (.0/.1/.2)")]
pub struct MalformedInnings(pub f64);

/// Innings pitched, stored exactly as a count of outs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Innings {
    outs: u32,
}

impl Innings {
    pub fn from_outs(outs: u32) -> Self {
        Self { outs }
    }

    /// Parse a thirds-notation IP value (`5.2` → 17 outs).
    ///
    /// Negative or non-finite values, and any fractional digit other than
    /// 0, 1, or 2, are rejected.
    pub fn from_thirds_notation(ip: f64) -> Result<Self, MalformedInnings> {
        if !ip.is_finite() || ip < 0.0 || ip > f64::from(u32::MAX / 3 - 1) {
            return Err(MalformedInnings(ip));
        }
        let whole = ip.trunc();
        let tenths = (ip - whole) * 10.0;
        let digit = tenths.round();
        if (tenths - digit).abs() > DIGIT_EPSILON || digit > 2.0 {
            return Err(MalformedInnings(ip));
        }
        Ok(Self {
            outs: whole as u32 * 3 + digit as u32,
        })
    }

    pub fn outs(self) -> u32 {
        self.outs
    }

    /// True fractional innings (`17 outs` → 5.667).
    pub fn as_f64(self) -> f64 {
        f64::from(self.outs) / 3.0
    }
}

/// `floor(IP) + (IP - floor(IP)) * 10/3`, computed through whole outs.
pub fn normalize_innings(ip: f64) -> Result<f64, MalformedInnings> {
    Innings::from_thirds_notation(ip).map(Innings::as_f64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_thirds() {
        let ip = normalize_innings(5.2).unwrap();
        assert!((ip - 5.667).abs() < 0.001);
        assert_eq!(Innings::from_thirds_notation(5.2).unwrap().outs(), 17);
    }

    #[test]
    fn one_third() {
        let ip = normalize_innings(5.1).unwrap();
        assert!((ip - 5.333).abs() < 0.001);
    }

    #[test]
    fn whole_innings_unchanged() {
        assert_eq!(normalize_innings(5.0).unwrap(), 5.0);
        assert_eq!(normalize_innings(0.0).unwrap(), 0.0);
    }

    #[test]
    fn three_tenths_is_malformed() {
        assert_eq!(normalize_innings(5.3), Err(MalformedInnings(5.3)));
        assert!(normalize_innings(7.9).is_err());
    }

    #[test]
    fn off_grid_fractions_are_malformed() {
        assert!(normalize_innings(5.25).is_err());
        assert!(normalize_innings(2.15).is_err());
    }

    #[test]
    fn negative_and_non_finite_are_malformed() {
        assert!(normalize_innings(-1.0).is_err());
        assert!(normalize_innings(f64::NAN).is_err());
        assert!(normalize_innings(f64::INFINITY).is_err());
    }

    #[test]
    fn large_season_totals_stay_exact() {
        let ip = Innings::from_thirds_notation(123.1).unwrap();
        assert_eq!(ip.outs(), 370);
        let ip = Innings::from_thirds_notation(1001.2).unwrap();
        assert_eq!(ip.outs(), 3005);
    }
}

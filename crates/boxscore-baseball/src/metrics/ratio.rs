// Safe arithmetic for rate stats. An undefined rate is `None`, never 0.0,
// NaN, or infinity.

/// `num / den`, or `None` when the denominator is not strictly positive or
/// the quotient is not finite.
///
/// Every counting-stat denominator the engine uses (AB, PA, BF, IP, ...) is
/// only meaningful when positive, so zero and negative denominators are
/// treated alike.
pub fn ratio(num: f64, den: f64) -> Option<f64> {
    if !(den > 0.0) {
        return None;
    }
    finite(num / den)
}

/// Per-nine-innings rate: `9 * num / innings`.
pub fn per_nine(num: f64, innings: Option<f64>) -> Option<f64> {
    innings.and_then(|ip| ratio(9.0 * num, ip))
}

/// Sum of two rates; undefined if either side is.
pub fn sum(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    a.zip(b).and_then(|(a, b)| finite(a + b))
}

/// Difference of two rates; undefined if either side is.
pub fn difference(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    a.zip(b).and_then(|(a, b)| finite(a - b))
}

/// Drops NaN and infinities.
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

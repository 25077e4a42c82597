//! Numeric helpers centralizing positivity checks and safe numeric casts.

use num_traits::cast::cast;

/// Keep a value only when it is a finite number.
#[must_use]
pub fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Keep a value only when it is a finite, strictly positive number.
#[must_use]
pub fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Divide, returning `None` for a zero or non-finite operand.
#[must_use]
pub fn safe_div(numerator: f64, denominator: f64) -> Option<f64> {
    if !numerator.is_finite() || !denominator.is_finite() || denominator == 0.0 {
        return None;
    }
    Some(numerator / denominator)
}

/// Floor a count in floating point, returning 0 for negative or non-finite values.
#[must_use]
pub fn floor_count(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0).floor()
    } else {
        0.0
    }
}

/// Round a value in `[0, 100]` to the nearest whole percent.
#[must_use]
pub fn round_percent(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    cast::<f64, u8>(value.clamp(0.0, 100.0).round()).unwrap_or(0)
}

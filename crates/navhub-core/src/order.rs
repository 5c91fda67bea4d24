//! Ordering values for the `Site.order` column.
//!
//! The column is a 32-bit signed integer, but older clients wrote
//! `Date.now()`-style millisecond timestamps into it. Every write path runs
//! its value through [`normalize_site_order`] before persisting.

use serde_json::Value;

pub const SITE_ORDER_INT32_MAX: i64 = 2_147_483_647;
pub const SITE_ORDER_INT32_MIN: i64 = -2_147_483_648;

/// Values at or above this are read as millisecond epochs (13-digit range
/// since 1973) rather than as far-future second epochs.
pub const SITE_ORDER_MS_THRESHOLD: i64 = 100_000_000_000;

/// Normalize an integer ordering value into the `i32` range.
///
/// Millisecond epochs are converted to seconds when the result fits;
/// anything else out of range is clamped.
#[must_use]
pub fn normalize_order_i64(value: i64) -> i32 {
    let normalized = if value > SITE_ORDER_INT32_MAX {
        if value >= SITE_ORDER_MS_THRESHOLD && value / 1000 <= SITE_ORDER_INT32_MAX {
            value / 1000
        } else {
            SITE_ORDER_INT32_MAX
        }
    } else {
        value.max(SITE_ORDER_INT32_MIN)
    };

    i32::try_from(normalized).unwrap_or(i32::MAX)
}

/// Normalize a floating-point ordering value, truncating toward zero.
///
/// Returns `fallback` for `NaN` and infinities.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn normalize_order(value: f64, fallback: i32) -> i32 {
    if !value.is_finite() {
        return fallback;
    }

    // `as` saturates at the i64 bounds, which still lands on the clamp below.
    normalize_order_i64(value.trunc() as i64)
}

/// Normalize an ordering value of unknown shape, as received in a request body.
///
/// Numbers are used directly. Decimal strings and `0x`/`0o`/`0b` literals
/// are parsed; `null`, booleans, blank strings, arrays and objects yield
/// `fallback`.
#[must_use]
pub fn normalize_site_order(value: &Value, fallback: i32) -> i32 {
    match value {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                normalize_order_i64(int)
            } else if number.as_u64().is_some() {
                // Only integers above i64::MAX get here.
                i32::MAX
            } else {
                number
                    .as_f64()
                    .map_or(fallback, |float| normalize_order(float, fallback))
            }
        }
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return fallback;
            }
            if let Ok(int) = trimmed.parse::<i64>() {
                return normalize_order_i64(int);
            }
            if let Some(int) = parse_prefixed_integer(trimmed) {
                return normalize_order_i64(int);
            }
            trimmed
                .parse::<f64>()
                .map_or(fallback, |float| normalize_order(float, fallback))
        }
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => fallback,
    }
}

/// Unsigned `0x`, `0o` and `0b` literals, as browsers accept them in numeric
/// form fields. Values past `i64::MAX` saturate.
fn parse_prefixed_integer(raw: &str) -> Option<i64> {
    let (radix, digits) = match raw.get(..2)? {
        "0x" | "0X" => (16, &raw[2..]),
        "0o" | "0O" => (8, &raw[2..]),
        "0b" | "0B" => (2, &raw[2..]),
        _ => return None,
    };
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    let value = u128::from_str_radix(digits, radix).ok()?;
    Some(i64::try_from(value).unwrap_or(i64::MAX))
}

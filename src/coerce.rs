//! Lenient numeric conversion for counts that arrive as text or loosely typed
//! document fields. Anything that is not a finite, non-negative number reads as 0.

use serde_json::Value;

pub fn count_from_str(raw: &str) -> u32 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0;
    }

    trimmed.parse::<f64>().map(count_from_f64).unwrap_or(0)
}

pub fn count_from_f64(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }

    // `as` saturates at u32::MAX
    value.trunc() as u32
}

pub fn count_from_value(value: Option<&Value>) -> u32 {
    match value {
        Some(Value::Number(number)) => number.as_f64().map(count_from_f64).unwrap_or(0),
        Some(Value::String(text)) => count_from_str(text),
        _ => 0,
    }
}

/// Optional package figure; blank or unparsable input means "not disclosed".
pub fn package_from_str(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

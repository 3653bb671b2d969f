//! Time normalisation
//!
//! Clients encode span timestamps in several ways: ISO-8601 strings, epoch
//! numbers, numeric strings, and HrTime two-tuples `[seconds, nanos]`.
//! Everything is normalised to epoch milliseconds. Numbers are disambiguated
//! by magnitude: values at or above 1e12 are nanoseconds, below are already
//! milliseconds.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value as JsonValue;

/// Magnitude threshold separating nanosecond from millisecond encodings
const NANO_THRESHOLD: f64 = 1e12;

/// Normalise a heterogeneous time encoding to epoch milliseconds.
///
/// Returns `None` for null, invalid strings, and malformed tuples. Zero and
/// negative millisecond values pass through unchanged.
pub fn to_ms(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Null => None,
        JsonValue::Number(n) => {
            // Integer path avoids f64 precision loss on nanosecond epochs
            if let Some(i) = n.as_i64() {
                return Some(int_to_ms(i));
            }
            if let Some(u) = n.as_u64() {
                return Some(int_to_ms(u as i64));
            }
            n.as_f64().map(number_to_ms)
        }
        JsonValue::String(s) => {
            if let Ok(i) = s.parse::<i64>() {
                return Some(int_to_ms(i));
            }
            if let Ok(n) = s.parse::<f64>() {
                return Some(number_to_ms(n));
            }
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).timestamp_millis())
        }
        // HrTime: [seconds, nanos]
        JsonValue::Array(parts) if parts.len() == 2 => {
            let secs = parts[0].as_f64()?;
            let nanos = parts[1].as_f64()?;
            Some(secs as i64 * 1000 + (nanos / 1e6) as i64)
        }
        _ => None,
    }
}

fn number_to_ms(n: f64) -> i64 {
    if n >= NANO_THRESHOLD {
        (n / 1e6) as i64
    } else {
        n as i64
    }
}

fn int_to_ms(n: i64) -> i64 {
    if n >= NANO_THRESHOLD as i64 {
        n / 1_000_000
    } else {
        n
    }
}

/// Render epoch milliseconds as a millisecond-precision ISO-8601 string
pub fn to_iso(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time as epoch milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_ms_iso_string() {
        assert_eq!(
            to_ms(&json!("2024-01-15T10:30:00.000Z")),
            Some(1705314600000)
        );
    }

    #[test]
    fn test_to_ms_iso_roundtrip() {
        let s = "2024-01-15T10:30:00.123Z";
        let ms = to_ms(&json!(s)).unwrap();
        assert_eq!(to_iso(ms), s);
    }

    #[test]
    fn test_to_ms_milliseconds_passthrough() {
        assert_eq!(to_ms(&json!(999_999_999_999_u64)), Some(999_999_999_999));
    }

    #[test]
    fn test_to_ms_nanoseconds_divided() {
        // 2024-01-15T10:30:00Z in nanoseconds
        assert_eq!(
            to_ms(&json!(1_705_314_600_000_000_000_u64)),
            Some(1_705_314_600_000)
        );
    }

    #[test]
    fn test_to_ms_threshold_is_nanoseconds() {
        // Exactly 1e12 falls on the nanosecond side
        assert_eq!(to_ms(&json!(1_000_000_000_000_u64)), Some(1_000_000));
    }

    #[test]
    fn test_to_ms_numeric_string() {
        assert_eq!(to_ms(&json!("1500")), Some(1500));
        assert_eq!(
            to_ms(&json!("1705314600000000000")),
            Some(1_705_314_600_000)
        );
    }

    #[test]
    fn test_to_ms_hrtime() {
        // [seconds, nanos] with nanos < 1e9
        assert_eq!(to_ms(&json!([1705314600, 123_000_000])), Some(1705314600123));
        assert_eq!(to_ms(&json!([5, 999_999])), Some(5000));
    }

    #[test]
    fn test_to_ms_invalid() {
        assert_eq!(to_ms(&JsonValue::Null), None);
        assert_eq!(to_ms(&json!("not a time")), None);
        assert_eq!(to_ms(&json!({"nested": true})), None);
        assert_eq!(to_ms(&json!([1, 2, 3])), None);
    }

    #[test]
    fn test_to_ms_zero_and_negative() {
        assert_eq!(to_ms(&json!(0)), Some(0));
        assert_eq!(to_ms(&json!(-5000)), Some(-5000));
    }

    #[test]
    fn test_to_iso_epoch() {
        assert_eq!(to_iso(0), "1970-01-01T00:00:00.000Z");
    }
}

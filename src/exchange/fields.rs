//! Extraction of numeric fields from exchange payloads.
//!
//! Exchanges send prices as JSON strings. Fields are kept optional in the
//! payload types so a missing value is reported by name instead of as a
//! generic decode failure.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use super::error::FieldError;

/// Parse a required decimal field.
pub fn required_decimal(field: &'static str, value: Option<&str>) -> Result<Decimal, FieldError> {
    let raw = value.ok_or(FieldError::Missing(field))?;
    Decimal::from_str(raw.trim()).map_err(|_| FieldError::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}

/// Convert an epoch-millisecond timestamp, truncating to whole seconds.
pub fn millis_to_second(field: &'static str, millis: i64) -> Result<DateTime<Utc>, FieldError> {
    DateTime::from_timestamp(millis.div_euclid(1000), 0).ok_or(FieldError::InvalidNumber {
        field,
        value: millis.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_required_decimal() {
        assert_eq!(required_decimal("bid", Some("0.5021")), Ok(dec!(0.5021)));
        assert_eq!(
            required_decimal("bid", None),
            Err(FieldError::Missing("bid"))
        );
        assert_eq!(
            required_decimal("ask", Some("n/a")),
            Err(FieldError::InvalidNumber {
                field: "ask",
                value: "n/a".to_string()
            })
        );
    }

    #[test]
    fn test_millis_truncated_to_seconds() {
        let ts = millis_to_second("time", 1_682_000_123_987).unwrap();
        assert_eq!(ts.timestamp(), 1_682_000_123);
        assert_eq!(ts.timestamp_subsec_millis(), 0);
    }
}

//! Shared field parsing utilities.
//!
//! Every function here is total: bad input turns into `None` or zero, never
//! into an error.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use crash_report_record_models::PersonCount;

use crate::dataset::TimestampFormat;

/// Trims a raw field and returns `None` if nothing is left.
#[must_use]
pub fn clean_text(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Parses a date string with `format`.
///
/// Formats that also carry a time-of-day (e.g. `"%Y-%m-%dT%H:%M:%S%.f"`,
/// used by Socrata exports) are accepted; only the date part is kept.
#[must_use]
pub fn parse_date(raw: &str, format: &str) -> Option<NaiveDate> {
    let s = clean_text(raw)?;
    NaiveDate::parse_from_str(s, format)
        .or_else(|_| NaiveDateTime::parse_from_str(s, format).map(|dt| dt.date()))
        .ok()
}

/// Parses a time-of-day string with `format`.
#[must_use]
pub fn parse_time(raw: &str, format: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(clean_text(raw)?, format).ok()
}

/// Combines separate date and time fields into one timestamp.
///
/// Returns `None` if either field is missing or does not match its format.
#[must_use]
pub fn parse_timestamp(
    date: Option<&str>,
    time: Option<&str>,
    format: &TimestampFormat,
) -> Option<NaiveDateTime> {
    let date = parse_date(date?, &format.date_format)?;
    let time = parse_time(time?, &format.time_format)?;
    Some(NaiveDateTime::new(date, time))
}

/// Parses a person count.
///
/// Counts are written either as integers (`"2"`) or as floats (`"2.0"`).
/// Empty, unparseable, negative and non-finite values become zero. Fractions
/// are kept to the nearest thousandth and huge values saturate.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn parse_count(raw: Option<&str>) -> PersonCount {
    let Some(s) = raw.and_then(clean_text) else {
        return PersonCount::ZERO;
    };
    if let Ok(n) = s.parse::<u64>() {
        return PersonCount::whole(n);
    }
    match s.parse::<f64>() {
        Ok(n) if n.is_finite() && n > 0.0 => {
            PersonCount::from_millis((n * PersonCount::SCALE as f64).round() as u64)
        }
        _ => PersonCount::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nyc() -> TimestampFormat {
        TimestampFormat::default()
    }

    #[test]
    fn combines_mdy_date_with_short_time() {
        let ts = parse_timestamp(Some("03/01/2024"), Some("2:39"), &nyc()).unwrap();
        assert_eq!(ts.to_string(), "2024-03-01 02:39:00");
    }

    #[test]
    fn combines_mdy_date_with_padded_time() {
        let ts = parse_timestamp(Some("12/31/2023"), Some("23:05"), &nyc()).unwrap();
        assert_eq!(ts.to_string(), "2023-12-31 23:05:00");
    }

    #[test]
    fn accepts_date_format_with_time_part() {
        let format = TimestampFormat {
            date_format: "%Y-%m-%dT%H:%M:%S%.f".to_string(),
            time_format: "%H:%M".to_string(),
        };
        let ts = parse_timestamp(Some("2024-01-15T00:00:00.000"), Some("14:30"), &format).unwrap();
        assert_eq!(ts.to_string(), "2024-01-15 14:30:00");
    }

    #[test]
    fn missing_time_makes_timestamp_missing() {
        assert!(parse_timestamp(Some("03/01/2024"), None, &nyc()).is_none());
        assert!(parse_timestamp(Some("03/01/2024"), Some("  "), &nyc()).is_none());
    }

    #[test]
    fn rejects_invalid_dates() {
        assert!(parse_timestamp(Some("not-a-date"), Some("10:00"), &nyc()).is_none());
        assert!(parse_timestamp(Some("02/30/2024"), Some("10:00"), &nyc()).is_none());
        assert!(parse_timestamp(Some("2024-03-01"), Some("10:00"), &nyc()).is_none());
        assert!(parse_timestamp(Some("03/01/2024"), Some("25:00"), &nyc()).is_none());
    }

    #[test]
    fn parses_integer_and_float_counts() {
        assert_eq!(parse_count(Some("3")), PersonCount::whole(3));
        assert_eq!(parse_count(Some(" 2.0 ")), PersonCount::whole(2));
        assert_eq!(parse_count(Some("1.6")).millis(), 1600);
        assert_eq!(parse_count(Some("0.4")).millis(), 400);
    }

    #[test]
    fn huge_counts_saturate() {
        assert_eq!(parse_count(Some("1e300")).millis(), u64::MAX);
        assert_eq!(parse_count(Some("18446744073709551615")).millis(), u64::MAX);
    }

    #[test]
    fn bad_counts_default_to_zero() {
        assert_eq!(parse_count(None), PersonCount::ZERO);
        assert_eq!(parse_count(Some("")), PersonCount::ZERO);
        assert_eq!(parse_count(Some("n/a")), PersonCount::ZERO);
        assert_eq!(parse_count(Some("-4")), PersonCount::ZERO);
        assert_eq!(parse_count(Some("NaN")), PersonCount::ZERO);
        assert_eq!(parse_count(Some("inf")), PersonCount::ZERO);
    }

    #[test]
    fn cleans_text() {
        assert_eq!(clean_text("  MAIN ST "), Some("MAIN ST"));
        assert_eq!(clean_text("   "), None);
        assert_eq!(clean_text(""), None);
    }
}

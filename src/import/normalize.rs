use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

use crate::config::{DateOrder, ImportConfig};

/// Days between the spreadsheet epoch (1899-12-30) and the Unix epoch
pub const SERIAL_EPOCH_OFFSET_DAYS: f64 = 25569.0;
const MS_PER_DAY: f64 = 86400.0 * 1000.0;

/// Canonical output format, DD-MM-YYYY
pub const CANONICAL_DATE_FORMAT: &str = "%d-%m-%Y";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%a %b %d %Y",
];

fn numeric_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4})$").expect("static date pattern")
    })
}

fn canonical_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{2}-\d{2}-\d{4}$").expect("static date pattern"))
}

/// Normalize a date cell to DD-MM-YYYY.
///
/// Numbers above the serial threshold are spreadsheet serial dates. Other
/// strings go through general date parsing, then the strict numeric
/// `D/M/YYYY` pattern read in the configured order. Anything unparseable is
/// returned unchanged.
pub fn normalize_date(raw: &str, config: &ImportConfig) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return raw.to_string();
    }

    // Month-first input is re-read below, padded or not
    if config.date_order == DateOrder::DayFirst && is_canonical_date(trimmed) {
        return trimmed.to_string();
    }

    if let Ok(serial) = trimmed.parse::<f64>() {
        if serial.is_finite() && serial > config.serial_date_threshold {
            if let Some(date) = serial_to_date(serial) {
                return format_date(date);
            }
        }
        return raw.to_string();
    }

    if let Some(date) = parse_general(trimmed) {
        return format_date(date);
    }

    if let Some(date) = parse_numeric(trimmed, config.date_order) {
        return format_date(date);
    }

    raw.to_string()
}

/// Convert a spreadsheet serial day number to a calendar date (UTC)
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    let millis = ((serial - SERIAL_EPOCH_OFFSET_DAYS) * MS_PER_DAY).round() as i64;
    DateTime::from_timestamp_millis(millis).map(|dt| dt.date_naive())
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(CANONICAL_DATE_FORMAT).to_string()
}

/// Whether a value is already a real DD-MM-YYYY date
pub fn is_canonical_date(value: &str) -> bool {
    canonical_pattern().is_match(value)
        && NaiveDate::parse_from_str(value, CANONICAL_DATE_FORMAT).is_ok()
}

fn parse_general(value: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

fn parse_numeric(value: &str, order: DateOrder) -> Option<NaiveDate> {
    let caps = numeric_date_pattern().captures(value)?;
    let first: u32 = caps[1].parse().ok()?;
    let second: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;

    let (day, month) = match order {
        DateOrder::DayFirst => (first, second),
        DateOrder::MonthFirst => (second, first),
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Trim a cell and fall back to a default when empty
pub fn normalize_cell(raw: &str, default_value: Option<&str>) -> String {
    let trimmed = raw.trim();
    match default_value {
        Some(default) if trimmed.is_empty() => default.trim().to_string(),
        _ => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ImportConfig {
        ImportConfig::default()
    }

    #[test]
    fn test_serial_date() {
        assert_eq!(normalize_date("45000", &config()), "15-03-2023");
        assert_eq!(normalize_date("45000.75", &config()), "15-03-2023");
        assert_eq!(normalize_date("25569", &config()), "01-01-1970");
    }

    #[test]
    fn test_small_numbers_are_untouched() {
        assert_eq!(normalize_date("2024", &config()), "2024");
        assert_eq!(normalize_date("12", &config()), "12");
    }

    #[test]
    fn test_iso_and_textual_dates() {
        assert_eq!(normalize_date("2024-02-01", &config()), "01-02-2024");
        assert_eq!(normalize_date("2024-02-01T10:30:00", &config()), "01-02-2024");
        assert_eq!(normalize_date("2024/12/25", &config()), "25-12-2024");
        assert_eq!(normalize_date("5 March 2021", &config()), "05-03-2021");
        assert_eq!(normalize_date("Mar 5, 2021", &config()), "05-03-2021");
    }

    #[test]
    fn test_ambiguous_dates_are_day_first() {
        assert_eq!(normalize_date("01/02/2024", &config()), "01-02-2024");
        assert_eq!(normalize_date("1-2-2024", &config()), "01-02-2024");
        assert_eq!(normalize_date("31/12/2023", &config()), "31-12-2023");
    }

    #[test]
    fn test_month_first_order() {
        let config = ImportConfig {
            date_order: DateOrder::MonthFirst,
            ..ImportConfig::default()
        };
        assert_eq!(normalize_date("01/02/2024", &config), "02-01-2024");
        assert_eq!(normalize_date("12/31/2023", &config), "31-12-2023");
        // Padding does not change the reading
        assert_eq!(normalize_date("05-01-2004", &config), "01-05-2004");
        assert_eq!(normalize_date("5-1-2004", &config), "01-05-2004");
    }

    #[test]
    fn test_already_normalized_is_stable() {
        for value in ["15-03-2023", "01-01-2000", "29-02-2024"] {
            assert_eq!(normalize_date(value, &config()), value);
            assert_eq!(normalize_date(&normalize_date(value, &config()), &config()), value);
        }
    }

    #[test]
    fn test_unparseable_returned_unchanged() {
        assert_eq!(normalize_date("next tuesday", &config()), "next tuesday");
        assert_eq!(normalize_date("31/02/2024", &config()), "31/02/2024");
        assert_eq!(normalize_date("", &config()), "");
    }

    #[test]
    fn test_is_canonical_date() {
        assert!(is_canonical_date("15-03-2023"));
        assert!(!is_canonical_date("31-02-2023"));
        assert!(!is_canonical_date("2023-03-15"));
    }

    #[test]
    fn test_normalize_cell() {
        assert_eq!(normalize_cell("  Foo ", None), "Foo");
        assert_eq!(normalize_cell("   ", Some("General")), "General");
        assert_eq!(normalize_cell("Ref", Some("General")), "Ref");
    }
}

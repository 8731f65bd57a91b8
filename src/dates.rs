// 📅 Date Normalizer - Heterogeneous date encodings to calendar dates
// ISO, day-first numeric, spreadsheet serials, bare years, then fallbacks

use crate::table::Cell;
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use std::collections::HashMap;

/// Serial numbers outside this range are treated as plain numbers.
pub const SERIAL_MIN: f64 = 40000.0;
pub const SERIAL_MAX: f64 = 50000.0;

/// Two-digit years up to this value land in the 2000s.
const TWO_DIGIT_YEAR_PIVOT: i32 = 49;

const FALLBACK_DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%d.%m.%Y", "%d.%m.%y", "%m/%d/%Y", "%Y.%m.%d"];

const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

// ============================================================================
// PARSING
// ============================================================================

/// Parse a cell to a date. `serial_day_offset` is added to spreadsheet serial
/// numbers only (a profile-declared exporter correction, usually 0).
pub fn parse_date(cell: &Cell, serial_day_offset: i64) -> Option<NaiveDate> {
    match cell {
        Cell::Empty => None,
        Cell::Number(n) => from_number(*n, serial_day_offset),
        Cell::Text(s) => parse_date_text(s.trim(), serial_day_offset),
    }
}

fn parse_date_text(text: &str, serial_day_offset: i64) -> Option<NaiveDate> {
    if text.is_empty() {
        return None;
    }

    if let Some(date) = parse_iso(text) {
        return Some(date);
    }

    if let Some(date) = parse_day_first(text) {
        return Some(date);
    }

    if let Ok(n) = text.parse::<f64>() {
        if let Some(date) = from_number(n, serial_day_offset) {
            return Some(date);
        }
    }

    parse_fallback(text)
}

/// `YYYY-MM-DD`
fn parse_iso(text: &str) -> Option<NaiveDate> {
    if text.len() != 10 || text.as_bytes()[4] != b'-' || text.as_bytes()[7] != b'-' {
        return None;
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

/// `D/M/YYYY`, `D-M-YYYY` and their two-digit-year forms.
fn parse_day_first(text: &str) -> Option<NaiveDate> {
    let separator = if text.contains('/') {
        '/'
    } else if text.contains('-') {
        '-'
    } else {
        return None;
    };

    let parts: Vec<&str> = text.split(separator).collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }
    if parts[0].len() > 2 || parts[1].len() > 2 {
        return None;
    }

    let day: u32 = parts[0].parse().ok()?;
    let month: u32 = parts[1].parse().ok()?;
    let year = match parts[2].len() {
        4 => parts[2].parse::<i32>().ok()?,
        2 => expand_two_digit_year(parts[2].parse().ok()?),
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

fn expand_two_digit_year(yy: i32) -> i32 {
    if yy <= TWO_DIGIT_YEAR_PIVOT {
        2000 + yy
    } else {
        1900 + yy
    }
}

/// Spreadsheet serial in range, or a bare four-digit year.
fn from_number(n: f64, serial_day_offset: i64) -> Option<NaiveDate> {
    if !n.is_finite() {
        return None;
    }
    if (SERIAL_MIN..=SERIAL_MAX).contains(&n) {
        return from_serial(n.floor() as i64 + serial_day_offset);
    }
    if n.fract() == 0.0 && (1900.0..=2100.0).contains(&n) {
        return NaiveDate::from_ymd_opt(n as i32, 1, 1);
    }
    None
}

/// Days since the spreadsheet epoch. The epoch sits on 1899-12-30 so that
/// serials after February 1900 match the common spreadsheet convention.
pub fn from_serial(serial: i64) -> Option<NaiveDate> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    if serial < 0 {
        return None;
    }
    epoch.checked_add_days(Days::new(serial as u64))
}

fn parse_fallback(text: &str) -> Option<NaiveDate> {
    for format in FALLBACK_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    for format in FALLBACK_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }
    chrono::DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.date_naive())
}

/// `YYYY-MM` for a date.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Parse an explicit flow-month value: `YYYY-MM`, `MM/YYYY`, or any date form.
pub fn parse_month_key(cell: &Cell) -> Option<String> {
    if let Cell::Text(text) = cell {
        let text = text.trim();
        if let Some((y, m)) = text.split_once('-') {
            if y.len() == 4 && m.len() <= 2 {
                let (y, m) = (y.parse::<i32>().ok()?, m.parse::<u32>().ok()?);
                return NaiveDate::from_ymd_opt(y, m, 1).map(month_key);
            }
        }
        if let Some((m, y)) = text.split_once('/') {
            if y.len() == 4 && m.len() <= 2 && !y.contains('/') {
                let (y, m) = (y.parse::<i32>().ok()?, m.parse::<u32>().ok()?);
                return NaiveDate::from_ymd_opt(y, m, 1).map(month_key);
            }
        }
    }
    parse_date(cell, 0).map(month_key)
}

// ============================================================================
// PER-RUN CACHE
// ============================================================================

/// Memoizing date parser owned by one run. Exports repeat the same date
/// strings thousands of times.
#[derive(Debug, Default)]
pub struct DateNormalizer {
    cache: HashMap<(String, i64), Option<NaiveDate>>,
    hits: usize,
}

impl DateNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(&mut self, cell: &Cell, serial_day_offset: i64) -> Option<NaiveDate> {
        let key = match cell {
            Cell::Empty => return None,
            Cell::Text(s) => format!("t:{}", s.trim()),
            Cell::Number(n) => format!("n:{}", n),
        };

        if let Some(cached) = self.cache.get(&(key.clone(), serial_day_offset)) {
            self.hits += 1;
            return *cached;
        }

        let parsed = parse_date(cell, serial_day_offset);
        self.cache.insert((key, serial_day_offset), parsed);
        parsed
    }

    pub fn cached_values(&self) -> usize {
        self.cache.len()
    }

    pub fn cache_hits(&self) -> usize {
        self.hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_iso_passthrough() {
        assert_eq!(parse_date(&Cell::text("2025-03-05"), 0), Some(ymd(2025, 3, 5)));
    }

    #[test]
    fn test_day_first_slash_and_dash() {
        assert_eq!(parse_date(&Cell::text("05/03/2025"), 0), Some(ymd(2025, 3, 5)));
        assert_eq!(parse_date(&Cell::text("5-3-2025"), 0), Some(ymd(2025, 3, 5)));
        assert_eq!(parse_date(&Cell::text("5/3/2025"), 0), Some(ymd(2025, 3, 5)));
    }

    #[test]
    fn test_two_digit_year_pivot() {
        assert_eq!(parse_date(&Cell::text("01/02/49"), 0), Some(ymd(2049, 2, 1)));
        assert_eq!(parse_date(&Cell::text("01/02/50"), 0), Some(ymd(1950, 2, 1)));
        assert_eq!(parse_date(&Cell::text("15-06-24"), 0), Some(ymd(2024, 6, 15)));
    }

    #[test]
    fn test_serial_number() {
        assert_eq!(parse_date(&Cell::Number(45292.0), 0), Some(ymd(2024, 1, 1)));
        assert_eq!(parse_date(&Cell::text("45292"), 0), Some(ymd(2024, 1, 1)));
        // Time-of-day fraction is ignored
        assert_eq!(parse_date(&Cell::Number(45292.75), 0), Some(ymd(2024, 1, 1)));
    }

    #[test]
    fn test_serial_offset_applies_only_to_serials() {
        assert_eq!(parse_date(&Cell::Number(45292.0), -1), Some(ymd(2023, 12, 31)));
        assert_eq!(parse_date(&Cell::text("05/03/2025"), -1), Some(ymd(2025, 3, 5)));
    }

    #[test]
    fn test_date_equivalence_across_encodings() {
        let serial = (ymd(2025, 3, 5) - ymd(1899, 12, 30)).num_days() as f64;
        let expected = Some(ymd(2025, 3, 5));

        assert_eq!(parse_date(&Cell::text("05/03/2025"), 0), expected);
        assert_eq!(parse_date(&Cell::text("5-3-2025"), 0), expected);
        assert_eq!(parse_date(&Cell::Number(serial), 0), expected);
    }

    #[test]
    fn test_bare_year() {
        assert_eq!(parse_date(&Cell::Number(2024.0), 0), Some(ymd(2024, 1, 1)));
        assert_eq!(parse_date(&Cell::text("1999"), 0), Some(ymd(1999, 1, 1)));
        assert_eq!(parse_date(&Cell::Number(2500.0), 0), None);
    }

    #[test]
    fn test_fallback_formats() {
        assert_eq!(parse_date(&Cell::text("05.03.2025"), 0), Some(ymd(2025, 3, 5)));
        assert_eq!(parse_date(&Cell::text("2025/03/05"), 0), Some(ymd(2025, 3, 5)));
        assert_eq!(parse_date(&Cell::text("12/31/2024"), 0), Some(ymd(2024, 12, 31)));
        assert_eq!(parse_date(&Cell::text("2025-03-05 10:15:00"), 0), Some(ymd(2025, 3, 5)));
    }

    #[test]
    fn test_unparseable_is_none() {
        assert_eq!(parse_date(&Cell::text("yesterday"), 0), None);
        assert_eq!(parse_date(&Cell::text("31/02/2025"), 0), None);
        assert_eq!(parse_date(&Cell::Number(123.0), 0), None);
        assert_eq!(parse_date(&Cell::Empty, 0), None);
    }

    #[test]
    fn test_month_key_parsing() {
        assert_eq!(parse_month_key(&Cell::text("2025-03")), Some("2025-03".to_string()));
        assert_eq!(parse_month_key(&Cell::text("3/2025")), Some("2025-03".to_string()));
        assert_eq!(parse_month_key(&Cell::text("15/03/2025")), Some("2025-03".to_string()));
        assert_eq!(parse_month_key(&Cell::text("soon")), None);
    }

    #[test]
    fn test_normalizer_memoizes() {
        let mut dates = DateNormalizer::new();
        let cell = Cell::text("05/03/2025");

        let first = dates.normalize(&cell, 0);
        let second = dates.normalize(&cell, 0);

        assert_eq!(first, second);
        assert_eq!(dates.cached_values(), 1);
        assert_eq!(dates.cache_hits(), 1);

        // Different correction is a different cache entry
        dates.normalize(&Cell::Number(45292.0), -1);
        dates.normalize(&Cell::Number(45292.0), 0);
        assert_eq!(dates.cached_values(), 3);
    }
}

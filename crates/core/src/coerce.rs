//! Lenient text → number/date coercion.
//!
//! Every helper is total: unparsable input yields `None` (numbers) or the
//! supplied `now` (dates). Nothing here returns an error.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use regex::Regex;

/// Excel's 1900 date system epoch (serial 0), accounting for the 1900 leap-year bug.
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Largest serial Excel accepts (9999-12-31).
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

fn decimal_comma() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\d{2}$").expect("static regex"))
}

fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Round to two decimal places.
pub fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

/// Money amount to integer cents.
pub fn to_cents(n: f64) -> i64 {
    (n * 100.0).round() as i64
}

/// Integer count: comma is a decimal separator, result rounded to nearest.
pub fn coerce_int(input: &str) -> Option<i64> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    parse_finite(&s.replace(',', ".")).map(|n| n.round() as i64)
}

/// Plain decimal (weights): comma is a decimal separator, no rounding.
pub fn coerce_decimal(input: &str) -> Option<f64> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    parse_finite(&s.replace(',', "."))
}

/// Currency amount, rounded to cents.
///
/// Keeps only digits, `,`, `.` and `-`. A trailing `,dd` marks a decimal
/// comma (periods before it are grouping). Otherwise commas that group
/// thousands are dropped and the rest is parsed as-is.
pub fn coerce_money(input: &str) -> Option<f64> {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let numeric = if decimal_comma().is_match(&cleaned) {
        // ASCII only at this point, so byte slicing is safe.
        let (whole, frac) = cleaned.split_at(cleaned.len() - 3);
        format!("{}.{}", whole.replace(['.', ','], ""), &frac[1..])
    } else {
        strip_thousands_commas(&cleaned)
    };

    parse_finite(&numeric).map(round2).filter(|n| n.is_finite())
}

/// Drop commas followed by exactly three digits (`1,234,567.89`).
fn strip_thousands_commas(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    for (i, &b) in bytes.iter().enumerate() {
        if b == b',' {
            let group = bytes.get(i + 1..i + 4);
            let after = bytes.get(i + 4);
            let is_grouping = group.is_some_and(|g| g.iter().all(u8::is_ascii_digit))
                && !after.is_some_and(u8::is_ascii_digit);
            if is_grouping {
                continue;
            }
        }
        out.push(b as char);
    }
    out
}

/// Parse a timestamp in any of the accepted shapes.
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }

    parse_finite(s).and_then(excel_serial_to_utc)
}

fn excel_serial_to_utc(serial: f64) -> Option<DateTime<Utc>> {
    if serial <= 0.0 || serial > EXCEL_MAX_SERIAL {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(0, 0, 0)?;
    let offset = Duration::try_milliseconds((serial * 86_400_000.0).round() as i64)?;
    epoch.checked_add_signed(offset).map(|naive| naive.and_utc())
}

/// RFC 3339 UTC with millisecond precision, e.g. `2024-03-05T00:00:00.000Z`.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Timestamp coercion: unparsable input becomes `now`.
pub fn coerce_date(input: &str, now: DateTime<Utc>) -> String {
    format_timestamp(parse_timestamp(input).unwrap_or(now))
}

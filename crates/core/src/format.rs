// Display formatting for cards and table cells (es-ES conventions)

use chrono::Local;

use crate::coerce::parse_timestamp;

/// Group integer digits with `.`; Spanish locale leaves 4-digit numbers ungrouped.
fn group_digits(digits: &str) -> String {
    if digits.len() < 5 {
        return digits.to_string();
    }
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

fn format_fixed(n: f64, decimals: usize) -> String {
    let rendered = format!("{:.*}", decimals, n.abs());
    let (whole, frac) = match rendered.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (rendered.as_str(), None),
    };
    let sign = if n < 0.0 && rendered.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match frac {
        Some(f) => format!("{sign}{},{f}", group_digits(whole)),
        None => format!("{sign}{}", group_digits(whole)),
    }
}

pub fn fmt_int(n: i64) -> String {
    format_fixed(n as f64, 0)
}

/// `12345.0` → `"12.345 kg"`; blank when absent.
pub fn fmt_kg(n: Option<f64>) -> String {
    n.map(|n| format!("{} kg", format_fixed(n, 0)))
        .unwrap_or_default()
}

/// `12345.5` → `"12.345,50 €"`; blank when absent.
pub fn fmt_money(n: Option<f64>) -> String {
    n.map(|n| format!("{} €", format_fixed(n, 2)))
        .unwrap_or_default()
}

/// Local, human-readable timestamp; blank when absent or unparsable.
pub fn format_date_time(ts: Option<&str>) -> String {
    ts.and_then(parse_timestamp)
        .map(|dt| dt.with_timezone(&Local).format("%d/%m/%Y, %H:%M:%S").to_string())
        .unwrap_or_default()
}

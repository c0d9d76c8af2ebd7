// Utility helpers for parsing and basic statistics.
//
// This module centralizes the CSV cell coercion and the small numeric
// reductions so the engines can assume typed values and share one policy for
// empty or non-finite inputs.
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (commas, spaces).
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok()
}

/// Accepted timestamp layouts, tried in order. Date-only values land on
/// midnight.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse a timestamp cell. Offset-qualified values (`Z`, `+01:00`) are
/// converted to UTC wall time.
pub fn parse_timestamp_safe(s: Option<&str>) -> Option<NaiveDateTime> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn parse_bool_safe(s: Option<&str>) -> Option<bool> {
    let s = s?.trim();
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Trimmed, non-empty text cell.
pub fn parse_text_safe(s: Option<&str>) -> Option<String> {
    let s = s?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

/// Mean over the finite values only, plus how many values were dropped.
///
/// Infinite and NaN entries come from zero denominators upstream (a zero
/// distance or a zero total cost).
pub fn finite_mean<I>(values: I) -> (Option<f64>, usize)
where
    I: IntoIterator<Item = f64>,
{
    let mut kept = Vec::new();
    let mut dropped = 0usize;
    for v in values {
        if v.is_finite() {
            kept.push(v);
        } else {
            dropped += 1;
        }
    }
    (mean(&kept), dropped)
}

/// Sum that skips NaN entries, the way a missing cell drops out of a column
/// total.
pub fn sum_present<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    values.into_iter().filter(|v| !v.is_nan()).sum()
}

/// `numerator / denominator`, or `None` when the result is not a finite
/// number (zero or non-finite denominator).
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    let r = numerator / denominator;
    r.is_finite().then_some(r)
}

/// Signed percentage change from `previous` to `current`.
///
/// A zero or undefined previous value yields 0 rather than an infinite change.
pub fn percent_change(previous: Option<f64>, current: Option<f64>) -> f64 {
    match (previous, current) {
        (Some(prev), Some(cur)) if prev != 0.0 => {
            let change = (cur - prev) / prev * 100.0;
            if change.is_finite() {
                change
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Linear-interpolated quantile of an ascending slice, `q` in `[0, 1]`.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn median(mut v: Vec<f64>) -> Option<f64> {
    // Use `partial_cmp` and fall back to equality if either side is NaN.
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    quantile(&v, 0.5)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    if !n.is_finite() {
        return "n/a".to_string();
    }
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    // `-0.00` reads badly in a report
    if neg && res.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", res)
    } else {
        res
    }
}

/// Like [`format_number`] but renders `None` as `n/a`.
pub fn format_opt(n: Option<f64>, decimals: usize) -> String {
    n.map(|v| format_number(v, decimals))
        .unwrap_or_else(|| "n/a".to_string())
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_numbers_with_separators() {
        assert_eq!(parse_f64_safe(Some(" 1,234.5 ")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(Some("abc")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn parse_timestamps_in_several_layouts() {
        let midnight = parse_timestamp_safe(Some("2024-03-05")).unwrap();
        assert_eq!(midnight.to_string(), "2024-03-05 00:00:00");
        let with_time = parse_timestamp_safe(Some("2024-03-05 14:30:00")).unwrap();
        assert_eq!(with_time.to_string(), "2024-03-05 14:30:00");
        let millis = parse_timestamp_safe(Some("2024-01-09 10:00:00.000")).unwrap();
        assert_eq!(millis.to_string(), "2024-01-09 10:00:00");
        let zulu = parse_timestamp_safe(Some("2024-01-08T10:00:00Z")).unwrap();
        assert_eq!(zulu.to_string(), "2024-01-08 10:00:00");
        let offset = parse_timestamp_safe(Some("2024-01-08T11:00:00+01:00")).unwrap();
        assert_eq!(offset, zulu);
        assert!(parse_timestamp_safe(Some("yesterday")).is_none());
    }

    #[test]
    fn parse_bools() {
        assert_eq!(parse_bool_safe(Some("True")), Some(true));
        assert_eq!(parse_bool_safe(Some("0")), Some(false));
        assert_eq!(parse_bool_safe(Some("maybe")), None);
    }

    #[test]
    fn finite_mean_skips_infinities() {
        let (m, dropped) = finite_mean(vec![2.0, f64::INFINITY, 4.0, f64::NAN]);
        assert_eq!(m, Some(3.0));
        assert_eq!(dropped, 2);
        assert_eq!(finite_mean(Vec::<f64>::new()), (None, 0));
    }

    #[test]
    fn sum_present_skips_missing() {
        assert_eq!(sum_present(vec![1.5, f64::NAN, 2.5]), 4.0);
        assert_eq!(sum_present(Vec::<f64>::new()), 0.0);
    }

    #[test]
    fn percent_change_guards_zero_previous() {
        assert_eq!(percent_change(Some(0.0), Some(5.0)), 0.0);
        assert_eq!(percent_change(None, Some(5.0)), 0.0);
        assert!((percent_change(Some(4.0), Some(5.0)) - 25.0).abs() < 1e-9);
        assert!((percent_change(Some(4.0), Some(3.0)) + 25.0).abs() < 1e-9);
    }

    #[test]
    fn quantiles_interpolate() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&v, 0.0), Some(1.0));
        assert_eq!(quantile(&v, 0.5), Some(2.5));
        assert_eq!(quantile(&v, 0.25), Some(1.75));
        assert_eq!(median(vec![3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(Vec::new()), None);
    }

    #[test]
    fn format_with_thousands() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-0.001, 2), "0.00");
        assert_eq!(format_number(-12.5, 1), "-12.5");
        assert_eq!(format_opt(None, 2), "n/a");
        assert_eq!(format_int(9855), "9,855");
    }
}

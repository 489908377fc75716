use crate::models::ListeningTime;

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use stats_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Nudge by a scaled epsilon so exact binary midpoints round up.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let integer_part = rounded.trunc() as u64;
    let frac_part = rounded - rounded.trunc();

    let grouped = group_thousands(&integer_part.to_string());

    let result = if decimals == 0 {
        grouped
    } else {
        let frac_str = format!("{:.prec$}", frac_part, prec = decimals as usize);
        // `frac_str` starts with "0.", e.g. "0.50".
        let decimal_digits = &frac_str[1..];
        format!("{}{}", grouped, decimal_digits)
    };

    if negative {
        format!("-{}", result)
    } else {
        result
    }
}

/// Format an hour total with two decimals and an `h` suffix.
///
/// # Examples
///
/// ```
/// use stats_core::formatting::format_hours;
///
/// assert_eq!(format_hours(1234.567), "1,234.57 h");
/// assert_eq!(format_hours(0.0),      "0.00 h");
/// ```
pub fn format_hours(hours: f64) -> String {
    format!("{} h", format_number(hours, 2))
}

/// Format a [`ListeningTime`] breakdown as `"12h 3m 4s"`.
///
/// Zero leading units are omitted; seconds are rounded to whole seconds.
///
/// # Examples
///
/// ```
/// use stats_core::formatting::format_listening_time;
/// use stats_core::models::ListeningTime;
///
/// assert_eq!(format_listening_time(&ListeningTime::from_seconds(3_725.0)), "1h 2m 5s");
/// assert_eq!(format_listening_time(&ListeningTime::from_seconds(65.0)),    "1m 5s");
/// assert_eq!(format_listening_time(&ListeningTime::from_seconds(0.0)),     "0s");
/// ```
pub fn format_listening_time(time: &ListeningTime) -> String {
    // Round the whole duration so a carried second rolls into minutes and hours.
    let total = time.hours as f64 * 3600.0 + time.minutes as f64 * 60.0 + time.seconds;
    let rounded = ListeningTime::from_seconds(total.round());
    let secs = rounded.seconds as u64;
    if rounded.hours > 0 {
        format!("{}h {}m {}s", format_number(rounded.hours as f64, 0), rounded.minutes, secs)
    } else if rounded.minutes > 0 {
        format!("{}m {}s", rounded.minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Calculate `(part / whole) * 100`, rounded to `decimal_places`.
///
/// Returns `0.0` if `whole` is zero to avoid division by zero.
///
/// # Examples
///
/// ```
/// use stats_core::formatting::percentage;
///
/// assert!((percentage(50.0, 200.0, 1) - 25.0).abs() < 1e-9);
/// assert_eq!(percentage(0.0, 0.0, 2), 0.0);
/// ```
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    let raw = (part / whole) * 100.0;
    let factor = 10_f64.powi(decimal_places as i32);
    (raw * factor).round() / factor
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────

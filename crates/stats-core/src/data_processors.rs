// ── DurationConverter ─────────────────────────────────────────────────────────

/// Unit conversions between the export's milliseconds and the hours shown to
/// the user.
pub struct DurationConverter;

impl DurationConverter {
    pub const SECONDS_PER_HOUR: f64 = 3600.0;

    /// Milliseconds to fractional seconds. Nothing is truncated.
    pub fn ms_to_seconds(ms: f64) -> f64 {
        ms / 1000.0
    }

    /// Unrounded hours. Use this for intermediate sums.
    pub fn seconds_to_hours(seconds: f64) -> f64 {
        seconds / Self::SECONDS_PER_HOUR
    }

    /// Hours rounded to 2 decimal places, for results handed to callers.
    pub fn seconds_to_display_hours(seconds: f64) -> f64 {
        round_to(Self::seconds_to_hours(seconds), 2)
    }
}

/// Round `value` to `decimals` places, half away from zero.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round() / factor
}

// ── LabelBuilder ──────────────────────────────────────────────────────────────

/// Builds the text labels stored on normalized records.
pub struct LabelBuilder;

impl LabelBuilder {
    pub const SEPARATOR: &'static str = " - ";

    /// Drop empty or whitespace-only names so they count as absent.
    pub fn clean(name: Option<String>) -> Option<String> {
        name.filter(|s| !s.trim().is_empty())
    }

    /// `"{left} - {right}"`, or `None` when either side is absent.
    pub fn composite(left: Option<&str>, right: Option<&str>) -> Option<String> {
        match (left, right) {
            (Some(l), Some(r)) => Some(format!("{}{}{}", l, Self::SEPARATOR, r)),
            _ => None,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

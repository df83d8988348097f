//! Parsing, formatting and validation of ISO date strings.
//!
//! Nothing here fails loudly: unparseable input degrades to the original
//! string (formatting) or `false` (validation).

use std::fmt::Write;

use chrono::{Days, NaiveDate, NaiveDateTime};

use crate::catalog::date_config;
use crate::types::DateRange;

pub const CHART_DATE_FORMAT: &str = "%b %-d";
pub const TOOLTIP_DATE_FORMAT: &str = "%b %-d, %Y %H:%M";
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Parse `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM` or `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_iso(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, ISO_DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Format an ISO date string with a strftime pattern.
///
/// Returns `date` unchanged when it does not parse or the pattern is invalid.
pub fn format_display(date: &str, pattern: &str) -> String {
    let Some(parsed) = parse_iso(date) else {
        return date.to_string();
    };

    let mut out = String::new();
    match write!(out, "{}", parsed.format(pattern)) {
        Ok(()) => out,
        Err(_) => {
            tracing::debug!("Invalid date pattern {:?}", pattern);
            date.to_string()
        }
    }
}

/// `2024-01-15` -> `Jan 15`
pub fn format_chart_date(date: &str) -> String {
    format_display(date, CHART_DATE_FORMAT)
}

/// `2024-01-15T14:30:00` -> `Jan 15, 2024 14:30`
pub fn format_tooltip_date(date: &str) -> String {
    format_display(date, TOOLTIP_DATE_FORMAT)
}

/// `Jan 1, 2024 - Jan 20, 2024`, or a prompt when either end is unparseable.
pub fn format_range_display(range: &DateRange) -> String {
    match (parse_iso(&range.start), parse_iso(&range.end)) {
        (Some(start), Some(end)) => format!(
            "{} - {}",
            start.format(date_config::DATE_FORMAT),
            end.format(date_config::DATE_FORMAT)
        ),
        _ => "Select date range".to_string(),
    }
}

/// Complete 24-hour days from `start` to `end`, if both parse.
///
/// Partial days are truncated toward zero, so `23:00` to `00:30` the next
/// morning is zero days apart.
pub fn days_between(start: &str, end: &str) -> Option<i64> {
    let start = parse_iso(start)?;
    let end = parse_iso(end)?;
    Some((end - start).num_days())
}

/// True iff both dates parse, `end` is strictly after `start`, and the span is
/// at most `max_days` days.
pub fn validate_range(start: &str, end: &str, max_days: i64) -> bool {
    match days_between(start, end) {
        Some(diff) => diff > 0 && diff <= max_days,
        None => false,
    }
}

/// Trailing window of `days` days ending at `today`.
///
/// A window reaching past the earliest representable date starts there; a
/// negative `days` yields an empty window on `today`.
pub fn default_range(today: NaiveDate, days: i64) -> DateRange {
    let start = match u64::try_from(days) {
        Ok(days) => today
            .checked_sub_days(Days::new(days))
            .unwrap_or(NaiveDate::MIN),
        Err(_) => {
            tracing::warn!("Negative default range of {} days", days);
            today
        }
    };
    DateRange::new(
        start.format(ISO_DATE_FORMAT).to_string(),
        today.format(ISO_DATE_FORMAT).to_string(),
    )
}

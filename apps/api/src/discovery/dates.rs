//! Date parsing for provider result dates and fetched posting pages.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use regex::Regex;

/// Absolute layouts the search provider uses in its `date` field.
const PROVIDER_DATE_LAYOUTS: &[&str] = &["%b %d, %Y", "%B %d, %Y", "%Y-%m-%d", "%d %b %Y"];

static PROVIDER_RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)\s+(minute|hour|day|week|month)s?\s+ago$").unwrap()
});

static STRUCTURED_DATE_POSTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)datePosted["']?\s*(?::|content=)\s*["']([^"']+)["']"#).unwrap()
});

static POSTED_TODAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)posted\s+today").unwrap());

static POSTED_YESTERDAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)posted\s+yesterday").unwrap());

static POSTED_AGO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)posted\s+(\d+)\+?\s+(minute|hour|day|week|month)s?\s+ago").unwrap()
});

fn start_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

/// `now` minus `amount` units. Months count as 30 days.
fn ago(now: DateTime<Utc>, amount: i64, unit: &str) -> Option<DateTime<Utc>> {
    let delta = match unit.to_ascii_lowercase().as_str() {
        "minute" => Duration::try_minutes(amount)?,
        "hour" => Duration::try_hours(amount)?,
        "day" => Duration::try_days(amount)?,
        "week" => Duration::try_weeks(amount)?,
        "month" => Duration::try_days(amount.checked_mul(30)?)?,
        _ => return None,
    };
    now.checked_sub_signed(delta)
}

fn parse_relative(caps: &regex::Captures<'_>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let amount: i64 = caps.get(1)?.as_str().parse().ok()?;
    ago(now, amount, caps.get(2)?.as_str())
}

/// Parses the provider's free-form `date` field. Unparseable text is `None`.
pub fn parse_provider_date(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(caps) = PROVIDER_RELATIVE.captures(text) {
        return parse_relative(&caps, now);
    }
    PROVIDER_DATE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(text, layout).ok())
        .and_then(start_of_day)
}

fn parse_structured_value(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    let day = value.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .ok()
        .and_then(start_of_day)
}

/// Scans raw page markup for a posting date. Patterns are tried in order:
/// structured `datePosted`, "posted today"/"posted yesterday", "posted N units ago".
pub fn extract_posted_date(markup: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(dt) = STRUCTURED_DATE_POSTED
        .captures(markup)
        .and_then(|caps| parse_structured_value(caps.get(1)?.as_str().trim()))
    {
        return Some(dt);
    }
    if POSTED_TODAY.is_match(markup) {
        return Some(now);
    }
    if POSTED_YESTERDAY.is_match(markup) {
        return now.checked_sub_signed(Duration::days(1));
    }
    POSTED_AGO
        .captures(markup)
        .and_then(|caps| parse_relative(&caps, now))
}

/// Human annotation for a listing line, e.g. "posted 3 days ago".
pub fn describe_age(posted: DateTime<Utc>, now: DateTime<Utc>) -> String {
    match (now - posted).num_days().max(0) {
        0 => "posted today".to_string(),
        1 => "posted 1 day ago".to_string(),
        n => format!("posted {n} days ago"),
    }
}

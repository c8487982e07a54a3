use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(async_graphql::Enum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[graphql(rename_items = "PascalCase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Overdue,
}

#[derive(async_graphql::SimpleObject, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDuration {
    pub duration: i64,
    pub unit: TimeUnit,
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

/// Parses the date shapes stored in documents: RFC 3339, `YYYY-MM-DD HH:MM:SS`,
/// `YYYY-MM-DDTHH:MM:SS[.fff]` and bare `YYYY-MM-DD`. RFC 3339 values are
/// normalised to UTC.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Comparator putting later dates first. Missing or unparsable dates sort last.
pub fn sort_by_date(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a.and_then(parse_date), b.and_then(parse_date)) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Time left between `start` and `end`, expressed in the largest whole unit.
pub fn get_time_duration(start: &str, end: &str) -> Option<TimeDuration> {
    let diff = parse_date(end)? - parse_date(start)?;
    Some(duration_between(diff))
}

fn duration_between(diff: Duration) -> TimeDuration {
    let seconds = diff.num_seconds();
    if seconds < 0 {
        return TimeDuration { duration: 0, unit: TimeUnit::Overdue };
    }
    if seconds < 60 {
        TimeDuration { duration: seconds, unit: TimeUnit::Seconds }
    } else if seconds < 60 * 60 {
        TimeDuration { duration: seconds / 60, unit: TimeUnit::Minutes }
    } else if seconds < 24 * 60 * 60 {
        TimeDuration { duration: seconds / 3600, unit: TimeUnit::Hours }
    } else {
        TimeDuration { duration: seconds / 86_400, unit: TimeUnit::Days }
    }
}

/// Human label for a timestamp relative to `now`'s calendar day.
pub fn format_time_from_today(timestamp: &str, now: NaiveDateTime) -> Option<String> {
    let ts = parse_date(timestamp)?;
    let time = ts.format("%-I:%M %p");
    let today = now.date();

    if ts.date() == today {
        Some(format!("Today at {}", time))
    } else if today.pred_opt() == Some(ts.date()) {
        Some(format!("Yesterday at {}", time))
    } else {
        Some(format!("{} at {}", ts.format("%B %-d, %Y"), time))
    }
}

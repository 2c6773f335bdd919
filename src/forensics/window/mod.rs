// src/forensics/window/mod.rs
//!
//! Time-window resolution: turns a flexible time-range request into a
//! concrete `[start, end]` filter.
//!
//! Resolution priority, first match wins:
//! 1. both absolute dates
//! 2. a single absolute date
//! 3. a single relative offset (minutes > hours > days > months > years)
//! 4. a two-sided relative window (`from` + `to`)
//! 5. a one-sided relative window
//! 6. no filter
//!
//! Months approximate to 30 days and years to 365 days; the resolver is not
//! calendar-accurate. Unparsable date strings make that bound absent rather
//! than failing the query.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Relative offset measured back from `now`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelativeOffset {
    pub minutes: Option<i64>,
    pub hours: Option<i64>,
    pub days: Option<i64>,
}

impl RelativeOffset {
    fn resolve(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if let Some(m) = self.minutes {
            Some(now - Duration::minutes(m))
        } else if let Some(h) = self.hours {
            Some(now - Duration::hours(h))
        } else {
            self.days.map(|d| now - Duration::days(d))
        }
    }

    fn is_empty(&self) -> bool {
        self.minutes.is_none() && self.hours.is_none() && self.days.is_none()
    }
}

/// Caller-supplied time-range request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeWindowRequest {
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub minutes: Option<i64>,
    pub hours: Option<i64>,
    pub days: Option<i64>,
    pub months: Option<i64>,
    pub years: Option<i64>,
    pub from: Option<RelativeOffset>,
    pub to: Option<RelativeOffset>,
}

impl TimeWindowRequest {
    pub fn last_minutes(minutes: i64) -> Self {
        Self {
            minutes: Some(minutes),
            ..Default::default()
        }
    }

    pub fn last_hours(hours: i64) -> Self {
        Self {
            hours: Some(hours),
            ..Default::default()
        }
    }

    pub fn last_days(days: i64) -> Self {
        Self {
            days: Some(days),
            ..Default::default()
        }
    }

    fn single_relative(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if let Some(m) = self.minutes {
            Some(now - Duration::minutes(m))
        } else if let Some(h) = self.hours {
            Some(now - Duration::hours(h))
        } else if let Some(d) = self.days {
            Some(now - Duration::days(d))
        } else if let Some(m) = self.months {
            Some(now - Duration::days(m * 30))
        } else {
            self.years.map(|y| now - Duration::days(y * 365))
        }
    }

    fn has_single_relative(&self) -> bool {
        self.minutes.is_some()
            || self.hours.is_some()
            || self.days.is_some()
            || self.months.is_some()
            || self.years.is_some()
    }
}

/// Resolved inclusive bounds on record timestamps. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        if let Some(start) = self.start {
            if ts < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if ts > end {
                return false;
            }
        }
        true
    }

    fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Outcome of parsing one date string.
struct ParsedDate {
    instant: DateTime<Utc>,
    /// The input carried no time-of-day; day-granularity semantics apply.
    date_only: bool,
}

fn parse_date(raw: &str) -> Option<ParsedDate> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ParsedDate {
            instant: dt.with_timezone(&Utc),
            date_only: false,
        });
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(ParsedDate {
                instant: Utc.from_utc_datetime(&naive),
                date_only: false,
            });
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return Some(ParsedDate {
            instant: Utc.from_utc_datetime(&midnight),
            date_only: true,
        });
    }
    log::debug!("unparsable date string {:?}, treating bound as absent", raw);
    None
}

/// Upper bounds supplied at day granularity are pushed to the end of that
/// day so the range stays inclusive.
fn normalize_upper_bound(parsed: ParsedDate) -> DateTime<Utc> {
    if parsed.date_only {
        parsed.instant + Duration::milliseconds(24 * 60 * 60 * 1000 - 1)
    } else {
        parsed.instant
    }
}

/// Resolve an optional time-range request against an explicit `now`.
///
/// Returns `None` when no filter applies (absent or fully-unresolvable
/// request).
pub fn resolve(request: Option<&TimeWindowRequest>, now: DateTime<Utc>) -> Option<TimeWindow> {
    let request = request?;
    let mut window = TimeWindow::default();

    if request.from_date.is_some() && request.to_date.is_some() {
        window.start = request.from_date.as_deref().and_then(parse_date).map(|p| p.instant);
        window.end = request
            .to_date
            .as_deref()
            .and_then(parse_date)
            .map(normalize_upper_bound);
    } else if request.from_date.is_some() {
        window.start = request.from_date.as_deref().and_then(parse_date).map(|p| p.instant);
    } else if request.to_date.is_some() {
        window.end = request
            .to_date
            .as_deref()
            .and_then(parse_date)
            .map(normalize_upper_bound);
    } else if request.has_single_relative() {
        window.start = request.single_relative(now);
    } else {
        match (&request.from, &request.to) {
            (Some(from), Some(to)) if !from.is_empty() && !to.is_empty() => {
                window.start = from.resolve(now);
                window.end = to.resolve(now);
            }
            (Some(from), _) if !from.is_empty() => {
                window.start = from.resolve(now);
            }
            (_, Some(to)) if !to.is_empty() => {
                window.end = to.resolve(now);
            }
            _ => {}
        }
    }

    if window.is_open() {
        None
    } else {
        Some(window)
    }
}

//! Publish-date window applied by the collection loop.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::DomainError;

/// Optional inclusive bounds in epoch seconds. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl DateWindow {
    pub const UNBOUNDED: DateWindow = DateWindow {
        start: None,
        end: None,
    };

    pub fn new(start: Option<i64>, end: Option<i64>) -> Result<Self, DomainError> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(DomainError::Configuration(format!(
                    "date window start {} is after end {}",
                    s, e
                )));
            }
        }
        Ok(Self { start, end })
    }

    /// Window from calendar days in `offset`: start of `start` day through the last second of `end` day.
    pub fn from_dates(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        offset: FixedOffset,
    ) -> Result<Self, DomainError> {
        let start_ts = start.map(|d| day_start(d, offset));
        let end_ts = end.map(|d| day_start(d, offset) + 86_399);
        Self::new(start_ts, end_ts)
    }

    /// Older than the lower bound.
    pub fn is_before_start(&self, ts: i64) -> bool {
        self.start.is_some_and(|s| ts < s)
    }

    /// Newer than the upper bound.
    pub fn is_after_end(&self, ts: i64) -> bool {
        self.end.is_some_and(|e| ts > e)
    }

    pub fn contains(&self, ts: i64) -> bool {
        !self.is_before_start(ts) && !self.is_after_end(ts)
    }

    pub fn has_lower_bound(&self) -> bool {
        self.start.is_some()
    }

    pub fn start_utc(&self) -> Option<DateTime<Utc>> {
        self.start.and_then(|s| DateTime::from_timestamp(s, 0))
    }

    pub fn end_utc(&self) -> Option<DateTime<Utc>> {
        self.end.and_then(|e| DateTime::from_timestamp(e, 0))
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_ts = |ts: Option<DateTime<Utc>>| {
            ts.map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "…".to_string())
        };
        write!(f, "{} – {}", fmt_ts(self.start_utc()), fmt_ts(self.end_utc()))
    }
}

fn day_start(day: NaiveDate, offset: FixedOffset) -> i64 {
    let naive = day.and_time(NaiveTime::MIN);
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.timestamp())
        .unwrap_or_else(|| naive.and_utc().timestamp())
}

/// Quick window choices offered by the UI and the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePreset {
    AllTime,
    LastWeek,
    LastMonth,
    LastThreeMonths,
}

impl DatePreset {
    pub const ALL: [DatePreset; 4] = [
        DatePreset::AllTime,
        DatePreset::LastWeek,
        DatePreset::LastMonth,
        DatePreset::LastThreeMonths,
    ];

    /// Window ending today (inclusive).
    pub fn window(self, today: NaiveDate, offset: FixedOffset) -> DateWindow {
        let days = match self {
            DatePreset::AllTime => return DateWindow::UNBOUNDED,
            DatePreset::LastWeek => 7,
            DatePreset::LastMonth => 30,
            DatePreset::LastThreeMonths => 90,
        };
        let start = today - Duration::days(days);
        DateWindow::from_dates(Some(start), Some(today), offset).unwrap_or_default()
    }
}

impl fmt::Display for DatePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DatePreset::AllTime => "All time",
            DatePreset::LastWeek => "Last week",
            DatePreset::LastMonth => "Last month",
            DatePreset::LastThreeMonths => "Last 3 months",
        };
        f.write_str(label)
    }
}

/// Parses `YYYY-MM-DD`.
pub fn parse_day(raw: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| DomainError::Configuration(format!("invalid date '{}': {}", raw, e)))
}

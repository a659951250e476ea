//! Posting-time histograms: weekday, hour of day, calendar month.

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::entities::Post;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayCount {
    pub weekday: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PostingPatterns {
    /// Monday first; only days with posts.
    pub by_weekday: Vec<WeekdayCount>,
    /// Hour ascending.
    pub by_hour: BTreeMap<u32, usize>,
    /// `YYYY-MM` keys, chronological.
    pub by_month: BTreeMap<String, usize>,
}

impl PostingPatterns {
    /// All seven weekdays in calendar order, zero-filled (chart axis).
    pub fn weekday_series(&self) -> Vec<(&'static str, usize)> {
        WEEK.iter()
            .map(|&d| {
                let name = weekday_name(d);
                let count = self
                    .by_weekday
                    .iter()
                    .find(|w| w.weekday == name)
                    .map(|w| w.count)
                    .unwrap_or(0);
                (name, count)
            })
            .collect()
    }
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn posting_patterns(posts: &[Post], offset: FixedOffset) -> PostingPatterns {
    let mut weekdays = [0usize; 7];
    let mut by_hour = BTreeMap::new();
    let mut by_month = BTreeMap::new();

    for post in posts {
        let Some(at) = DateTime::from_timestamp(post.date, 0) else {
            continue;
        };
        let local = at.with_timezone(&offset);
        weekdays[local.weekday().num_days_from_monday() as usize] += 1;
        *by_hour.entry(local.hour()).or_insert(0) += 1;
        *by_month
            .entry(format!("{:04}-{:02}", local.year(), local.month()))
            .or_insert(0) += 1;
    }

    let by_weekday = WEEK
        .iter()
        .zip(weekdays)
        .filter(|(_, n)| *n > 0)
        .map(|(&d, count)| WeekdayCount {
            weekday: weekday_name(d).to_string(),
            count,
        })
        .collect();

    PostingPatterns {
        by_weekday,
        by_hour,
        by_month,
    }
}

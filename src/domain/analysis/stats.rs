//! Basic descriptive statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::CollectionResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementStats {
    pub avg_likes_per_post: f64,
    pub avg_comments_per_post: f64,
    pub avg_reposts_per_post: f64,
    pub avg_views_per_post: f64,
    pub avg_engagement_rate: f64,
    pub total_engagement: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicStatistics {
    pub total_posts: usize,
    pub total_comments: usize,
    pub posts_in_period: usize,
    pub date_range: DateRange,
    pub engagement: EngagementStats,
}

/// Arithmetic mean; 0.0 for an empty input.
pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

pub fn basic_statistics(result: &CollectionResult) -> BasicStatistics {
    let posts = &result.posts;
    let start = posts.iter().map(|p| p.date).min();
    let end = posts.iter().map(|p| p.date).max();

    BasicStatistics {
        total_posts: posts.len(),
        total_comments: result.comments.len(),
        posts_in_period: result.stats.posts_in_period,
        date_range: DateRange {
            start: start.and_then(|ts| DateTime::from_timestamp(ts, 0)),
            end: end.and_then(|ts| DateTime::from_timestamp(ts, 0)),
        },
        engagement: EngagementStats {
            avg_likes_per_post: mean(posts.iter().map(|p| p.likes as f64)),
            avg_comments_per_post: mean(posts.iter().map(|p| p.comments as f64)),
            avg_reposts_per_post: mean(posts.iter().map(|p| p.reposts as f64)),
            avg_views_per_post: mean(posts.iter().map(|p| p.views as f64)),
            avg_engagement_rate: mean(posts.iter().map(|p| p.engagement_rate())),
            total_engagement: posts.iter().map(|p| p.engagement()).sum(),
        },
    }
}

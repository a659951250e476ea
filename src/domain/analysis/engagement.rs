//! Engagement analysis: top posts, correlations, and engagement by text length.

use serde::{Deserialize, Serialize};

use super::stats::mean;
use crate::domain::entities::Post;

/// Labels of the five equal-width text-length bins, shortest first.
pub const LENGTH_LABELS: [&str; 5] = ["very short", "short", "medium", "long", "very long"];

/// Numeric columns fed to the correlation matrix.
pub const CORRELATION_COLUMNS: [&str; 5] = [
    "likes_count",
    "comments_count",
    "reposts_count",
    "views_count",
    "text_length",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPost {
    pub id: i64,
    pub text: String,
    pub engagement: u64,
    pub likes_count: u64,
    pub comments_count: u64,
    pub reposts_count: u64,
}

/// Pearson coefficients; `None` where undefined (constant column or fewer than two posts).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values.get(i)?.get(j).copied().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthBucket {
    pub label: String,
    pub posts: usize,
    /// `None` for an empty bucket.
    pub mean_engagement: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngagementPatterns {
    pub top_posts: Vec<TopPost>,
    pub correlations: CorrelationMatrix,
    pub engagement_by_text_length: Vec<LengthBucket>,
}

pub fn engagement_patterns(posts: &[Post], top_n: usize) -> EngagementPatterns {
    if posts.is_empty() {
        return EngagementPatterns::default();
    }
    EngagementPatterns {
        top_posts: top_posts(posts, top_n),
        correlations: correlation_matrix(posts),
        engagement_by_text_length: engagement_by_length(posts),
    }
}

/// Highest total engagement first; equal engagement keeps feed order.
pub fn top_posts(posts: &[Post], n: usize) -> Vec<TopPost> {
    let mut ranked: Vec<&Post> = posts.iter().collect();
    ranked.sort_by(|a, b| b.engagement().cmp(&a.engagement()));
    ranked
        .into_iter()
        .take(n)
        .map(|p| TopPost {
            id: p.id,
            text: p.text.clone(),
            engagement: p.engagement(),
            likes_count: p.likes,
            comments_count: p.comments,
            reposts_count: p.reposts,
        })
        .collect()
}

fn column(posts: &[Post], name: &str) -> Vec<f64> {
    posts
        .iter()
        .map(|p| match name {
            "likes_count" => p.likes as f64,
            "comments_count" => p.comments as f64,
            "reposts_count" => p.reposts as f64,
            "views_count" => p.views as f64,
            _ => p.text_length() as f64,
        })
        .collect()
}

pub(crate) fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = mean(x.iter().copied());
    let my = mean(y.iter().copied());
    let (mut cov, mut vx, mut vy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    let denom = (vx * vy).sqrt();
    if denom == 0.0 {
        return None;
    }
    Some((cov / denom).clamp(-1.0, 1.0))
}

pub fn correlation_matrix(posts: &[Post]) -> CorrelationMatrix {
    let cols: Vec<Vec<f64>> = CORRELATION_COLUMNS
        .iter()
        .map(|name| column(posts, name))
        .collect();
    let values = cols
        .iter()
        .map(|a| cols.iter().map(|b| pearson(a, b)).collect())
        .collect();
    CorrelationMatrix {
        columns: CORRELATION_COLUMNS.iter().map(|c| c.to_string()).collect(),
        values,
    }
}

/// Bin index in five equal-width, right-closed bins over `[min, max]`.
/// The minimum lands in the first bin; a constant input lands in the middle one.
pub(crate) fn length_bin(len: usize, min: usize, max: usize) -> usize {
    if max == min {
        return 2;
    }
    let width = (max - min) as f64 / 5.0;
    let idx = ((len - min) as f64 / width).ceil() as i64 - 1;
    idx.clamp(0, 4) as usize
}

pub fn engagement_by_length(posts: &[Post]) -> Vec<LengthBucket> {
    let lengths: Vec<usize> = posts.iter().map(|p| p.text_length()).collect();
    let (Some(&min), Some(&max)) = (lengths.iter().min(), lengths.iter().max()) else {
        return Vec::new();
    };

    let mut sums = [0u64; 5];
    let mut counts = [0usize; 5];
    for (post, len) in posts.iter().zip(&lengths) {
        let bin = length_bin(*len, min, max);
        sums[bin] += post.engagement();
        counts[bin] += 1;
    }

    LENGTH_LABELS
        .iter()
        .enumerate()
        .map(|(i, label)| LengthBucket {
            label: label.to_string(),
            posts: counts[i],
            mean_engagement: (counts[i] > 0).then(|| sums[i] as f64 / counts[i] as f64),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::fixtures::post;

    #[test]
    fn top_posts_rank_by_engagement_with_stable_ties() {
        let posts = vec![
            post(1, 0, "a", 1, 0, 0, 0),
            post(2, 0, "b", 5, 0, 0, 0),
            post(3, 0, "c", 0, 1, 0, 0),
            post(4, 0, "d", 2, 2, 1, 0),
        ];
        let ids: Vec<i64> = top_posts(&posts, 3).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 4, 1]);
    }

    #[test]
    fn pearson_perfect_and_undefined() {
        let r = pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
        let r = pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
        assert_eq!(pearson(&[1.0], &[1.0]), None);
    }

    #[test]
    fn correlation_matrix_is_symmetric() {
        let posts = vec![
            post(1, 0, "aa", 1, 0, 3, 10),
            post(2, 0, "aaaa", 2, 1, 1, 20),
            post(3, 0, "a", 4, 0, 2, 40),
        ];
        let m = correlation_matrix(&posts);
        assert_eq!(m.columns.len(), 5);
        let lv = m.get("likes_count", "views_count").unwrap();
        assert!((lv - 1.0).abs() < 1e-12);
        assert_eq!(
            m.get("comments_count", "text_length"),
            m.get("text_length", "comments_count")
        );
        assert!((m.get("reposts_count", "reposts_count").unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn length_bins_are_right_closed() {
        // min 0, max 10, width 2: (0,2] (2,4] (4,6] (6,8] (8,10]
        assert_eq!(length_bin(0, 0, 10), 0);
        assert_eq!(length_bin(2, 0, 10), 0);
        assert_eq!(length_bin(3, 0, 10), 1);
        assert_eq!(length_bin(6, 0, 10), 2);
        assert_eq!(length_bin(10, 0, 10), 4);
        assert_eq!(length_bin(7, 7, 7), 2);
    }

    #[test]
    fn engagement_by_length_labels_and_means() {
        let posts = vec![
            post(1, 0, "", 1, 0, 0, 0),
            post(2, 0, "xxxxxxxxxx", 9, 0, 0, 0),
            post(3, 0, "xxxxxxxxx", 3, 0, 0, 0),
        ];
        let buckets = engagement_by_length(&posts);
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, LENGTH_LABELS.to_vec());
        assert_eq!(buckets[0].mean_engagement, Some(1.0));
        assert_eq!(buckets[1].mean_engagement, None);
        assert_eq!(buckets[4].posts, 2);
        assert_eq!(buckets[4].mean_engagement, Some(6.0));
    }

    #[test]
    fn empty_posts_give_empty_patterns() {
        assert_eq!(engagement_patterns(&[], 10), EngagementPatterns::default());
    }
}

//! Domain entities. Pure data structures for the core business.
//!
//! No VK/IO types here; raw API payloads are mapped into these by adapters,
//! with defaults applied once at ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::window::DateWindow;

/// Numeric VK community id (always positive; the wall owner id is its negation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NumericGroupId(pub i64);

impl NumericGroupId {
    /// Owner id used by wall methods: communities are addressed with a negative id.
    pub fn owner_id(self) -> i64 {
        -self.0
    }
}

impl fmt::Display for NumericGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-readable group identifier as typed by the user (`big_asu`, `12345`, `-12345`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupHandle(String);

impl GroupHandle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the id when the handle is already numeric, optionally `-`-prefixed.
    pub fn as_numeric(&self) -> Option<NumericGroupId> {
        let digits = self.0.strip_prefix('-').unwrap_or(&self.0);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<i64>().ok().map(NumericGroupId)
    }

    /// File-name friendly form of the handle.
    pub fn slug(&self) -> String {
        self.0
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect()
    }
}

impl fmt::Display for GroupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Community metadata returned by the group lookup method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub id: NumericGroupId,
    pub name: String,
    pub screen_name: Option<String>,
    pub members_count: Option<u64>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub activity: Option<String>,
    pub site: Option<String>,
}

impl GroupInfo {
    /// Metadata placeholder when only the id is known.
    pub fn bare(id: NumericGroupId) -> Self {
        Self {
            id,
            name: format!("club{}", id),
            screen_name: None,
            members_count: None,
            description: None,
            status: None,
            activity: None,
            site: None,
        }
    }
}

/// A wall post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    /// Publish time, epoch seconds.
    pub date: i64,
    pub text: String,
    pub likes: u64,
    pub reposts: u64,
    pub comments: u64,
    pub views: u64,
    pub from_id: Option<i64>,
    /// Pinned posts are served first regardless of their age.
    #[serde(default)]
    pub is_pinned: bool,
}

impl Post {
    /// Text length in characters (not bytes).
    pub fn text_length(&self) -> usize {
        self.text.chars().count()
    }

    /// likes + reposts + comments.
    pub fn engagement(&self) -> u64 {
        self.likes + self.reposts + self.comments
    }

    /// Engagement per view; `+1` keeps posts without view counters finite.
    pub fn engagement_rate(&self) -> f64 {
        self.engagement() as f64 / (self.views as f64 + 1.0)
    }
}

/// A top-level comment under a wall post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub parent_post_id: i64,
    pub date: i64,
    pub text: String,
    pub likes: u64,
    pub from_id: Option<i64>,
}

/// One page of a paginated provider listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total reported by the provider, when it reports one.
    pub total: Option<u64>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: Option<u64>) -> Self {
        Self { items, total }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: Some(0),
        }
    }
}

/// Why the feed pagination stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    BudgetExhausted,
    EndOfFeed,
    PassedWindow,
    FetchFailed,
}

/// Counters kept by the collection loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    /// Raw feed items fetched (counts against the budget).
    pub raw_fetched: usize,
    /// Items retained after date filtering.
    pub posts_in_period: usize,
    pub stop_reason: StopReason,
    #[serde(default)]
    pub failed_comment_fetches: usize,
}

/// One complete collection run. Persisted as a single file and handed to the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionResult {
    pub group: GroupInfo,
    /// Pagination order (newest first).
    pub posts: Vec<Post>,
    pub comments: Vec<Comment>,
    pub collected_at: DateTime<Utc>,
    /// Window actually applied by the loop.
    pub window: DateWindow,
    pub stats: CollectionStats,
}

impl CollectionResult {
    pub fn total_posts(&self) -> usize {
        self.posts.len()
    }

    pub fn total_comments(&self) -> usize {
        self.comments.len()
    }
}

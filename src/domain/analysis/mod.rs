//! Aggregation over a collected run. Pure functions; no I/O.
//!
//! [`build_report`] is a function of one [`CollectionResult`] and the options
//! only, so re-running it on the same run yields the same report.

pub mod engagement;
pub mod keywords;
pub mod patterns;
pub mod stats;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::CollectionResult;

pub use engagement::{CorrelationMatrix, EngagementPatterns, LengthBucket, TopPost};
pub use keywords::{KeywordCount, TECH_TERMS, TermCount};
pub use patterns::{PostingPatterns, WeekdayCount};
pub use stats::{BasicStatistics, DateRange, EngagementStats};

/// Tunables for keyword extraction and list sizes.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    pub min_word_len: usize,
    /// Cap applied by keyword extraction itself.
    pub keyword_top_n: usize,
    /// Cap on each list stored in the report (keywords and tech terms).
    pub topic_list_len: usize,
    pub top_posts: usize,
    /// Timezone used for weekday/hour/month bucketing.
    pub utc_offset: FixedOffset,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            min_word_len: 3,
            keyword_top_n: 50,
            topic_list_len: 20,
            top_posts: 10,
            utc_offset: Utc.fix(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularTopics {
    pub post_keywords: Vec<KeywordCount>,
    pub comment_keywords: Vec<KeywordCount>,
    pub tech_terms_mentions: Vec<TermCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub group_name: String,
    pub collected_at: DateTime<Utc>,
    pub basic_statistics: BasicStatistics,
    pub posting_patterns: PostingPatterns,
    pub popular_topics: PopularTopics,
    pub engagement_patterns: EngagementPatterns,
}

/// Keyword tables for posts and comments plus domain-term mentions across both.
pub fn popular_topics(result: &CollectionResult, opts: &AnalysisOptions) -> PopularTopics {
    let post_texts = result.posts.iter().map(|p| p.text.as_str());
    let comment_texts = result.comments.iter().map(|c| c.text.as_str());

    let mut post_keywords =
        keywords::extract_keywords(post_texts.clone(), opts.min_word_len, opts.keyword_top_n);
    post_keywords.truncate(opts.topic_list_len);

    let mut comment_keywords =
        keywords::extract_keywords(comment_texts.clone(), opts.min_word_len, opts.keyword_top_n);
    comment_keywords.truncate(opts.topic_list_len);

    let mut tech_terms_mentions =
        keywords::count_term_mentions(post_texts.chain(comment_texts), TECH_TERMS);
    tech_terms_mentions.truncate(opts.topic_list_len);

    PopularTopics {
        post_keywords,
        comment_keywords,
        tech_terms_mentions,
    }
}

pub fn build_report(result: &CollectionResult, opts: &AnalysisOptions) -> AnalysisReport {
    AnalysisReport {
        group_name: result.group.name.clone(),
        collected_at: result.collected_at,
        basic_statistics: stats::basic_statistics(result),
        posting_patterns: patterns::posting_patterns(&result.posts, opts.utc_offset),
        popular_topics: popular_topics(result, opts),
        engagement_patterns: engagement::engagement_patterns(&result.posts, opts.top_posts),
    }
}

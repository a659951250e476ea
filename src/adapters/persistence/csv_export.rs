//! Tabular export of a run: one row per post, one row per comment.
//!
//! Uses the `csv` crate for quoting; multi-line text stays in one quoted cell.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::domain::{Comment, Post};

pub const POST_COLUMNS: [&str; 8] = [
    "id",
    "date",
    "text",
    "likes_count",
    "reposts_count",
    "comments_count",
    "views_count",
    "from_id",
];

pub const COMMENT_COLUMNS: [&str; 6] = [
    "id",
    "parent_post_id",
    "date",
    "text",
    "likes_count",
    "from_id",
];

/// Epoch seconds as ISO-8601 UTC; falls back to the raw number if out of range.
fn iso(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| ts.to_string())
}

fn opt(v: Option<i64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, csv::Error> {
    wtr.into_inner()
        .map_err(|e| csv::Error::from(std::io::Error::other(e.to_string())))
}

pub fn posts_to_csv(posts: &[Post]) -> Result<Vec<u8>, csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(Vec::new());
    wtr.write_record(POST_COLUMNS)?;
    for p in posts {
        wtr.write_record([
            p.id.to_string(),
            iso(p.date),
            p.text.clone(),
            p.likes.to_string(),
            p.reposts.to_string(),
            p.comments.to_string(),
            p.views.to_string(),
            opt(p.from_id),
        ])?;
    }
    wtr.flush()?;
    finish(wtr)
}

pub fn comments_to_csv(comments: &[Comment]) -> Result<Vec<u8>, csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(Vec::new());
    wtr.write_record(COMMENT_COLUMNS)?;
    for c in comments {
        wtr.write_record([
            c.id.to_string(),
            c.parent_post_id.to_string(),
            iso(c.date),
            c.text.clone(),
            c.likes.to_string(),
            opt(c.from_id),
        ])?;
    }
    wtr.flush()?;
    finish(wtr)
}

//! Map raw VK payloads to domain entities.
//!
//! Every field the provider may omit is optional here; defaults (zero
//! counters, empty text, not pinned) are applied once, in this module.

use crate::domain::{Comment, DomainError, GroupInfo, NumericGroupId, Page, Post};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Deserialize, Default)]
struct RawCounter {
    #[serde(default)]
    count: u64,
}

fn count(c: &Option<RawCounter>) -> u64 {
    c.as_ref().map(|c| c.count).unwrap_or(0)
}

#[derive(Debug, Deserialize)]
struct RawPost {
    id: i64,
    #[serde(default)]
    date: i64,
    #[serde(default)]
    text: Option<String>,
    likes: Option<RawCounter>,
    reposts: Option<RawCounter>,
    comments: Option<RawCounter>,
    views: Option<RawCounter>,
    from_id: Option<i64>,
    /// `1` when pinned, absent otherwise.
    #[serde(default)]
    is_pinned: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    id: i64,
    #[serde(default)]
    date: i64,
    #[serde(default)]
    text: Option<String>,
    likes: Option<RawCounter>,
    from_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawPage<T> {
    count: Option<u64>,
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    id: Option<i64>,
    name: Option<String>,
    screen_name: Option<String>,
    members_count: Option<u64>,
    description: Option<String>,
    status: Option<String>,
    activity: Option<String>,
    site: Option<String>,
}

/// `groups.getById` answers with a bare array on older versions and
/// `{ "groups": [...] }` on newer ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawGroups {
    List(Vec<RawGroup>),
    Wrapped { groups: Vec<RawGroup> },
}

fn decode<T: DeserializeOwned>(what: &str, value: Value) -> Result<T, DomainError> {
    serde_json::from_value(value)
        .map_err(|e| DomainError::Transport(format!("unexpected {} payload: {}", what, e)))
}

fn post_to_domain(raw: RawPost) -> Post {
    Post {
        id: raw.id,
        date: raw.date,
        text: raw.text.unwrap_or_default(),
        likes: count(&raw.likes),
        reposts: count(&raw.reposts),
        comments: count(&raw.comments),
        views: count(&raw.views),
        from_id: raw.from_id,
        is_pinned: raw.is_pinned.unwrap_or(0) != 0,
    }
}

fn comment_to_domain(raw: RawComment, parent_post_id: i64) -> Comment {
    Comment {
        id: raw.id,
        parent_post_id,
        date: raw.date,
        text: raw.text.unwrap_or_default(),
        likes: count(&raw.likes),
        from_id: raw.from_id,
    }
}

/// `wall.get` response → one page of posts.
pub fn posts_page(value: Value) -> Result<Page<Post>, DomainError> {
    let raw: RawPage<RawPost> = decode("wall.get", value)?;
    Ok(Page::new(
        raw.items.into_iter().map(post_to_domain).collect(),
        raw.count,
    ))
}

/// `wall.getComments` response → one page of comments tagged with `parent_post_id`.
pub fn comments_page(value: Value, parent_post_id: i64) -> Result<Page<Comment>, DomainError> {
    let raw: RawPage<RawComment> = decode("wall.getComments", value)?;
    Ok(Page::new(
        raw.items
            .into_iter()
            .map(|c| comment_to_domain(c, parent_post_id))
            .collect(),
        raw.count,
    ))
}

/// First group of a `groups.getById` response. `Ok(None)` when the list is empty.
pub fn group_info(value: Value) -> Result<Option<GroupInfo>, DomainError> {
    let groups = match decode::<RawGroups>("groups.getById", value)? {
        RawGroups::List(g) | RawGroups::Wrapped { groups: g } => g,
    };
    let Some(raw) = groups.into_iter().next() else {
        return Ok(None);
    };
    let id = raw
        .id
        .filter(|id| *id != 0)
        .map(|id| NumericGroupId(id.abs()))
        .ok_or_else(|| {
            DomainError::Resolution("group lookup response lacks an id".to_string())
        })?;
    let mut info = GroupInfo::bare(id);
    if let Some(name) = raw.name.filter(|n| !n.trim().is_empty()) {
        info.name = name;
    }
    info.screen_name = raw.screen_name;
    info.members_count = raw.members_count;
    info.description = raw.description.filter(|s| !s.is_empty());
    info.status = raw.status.filter(|s| !s.is_empty());
    info.activity = raw.activity;
    info.site = raw.site.filter(|s| !s.is_empty());
    Ok(Some(info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_counters_default_to_zero() {
        let page = posts_page(json!({
            "count": 2,
            "items": [
                { "id": 10, "date": 1_700_000_000, "text": "hi",
                  "likes": { "count": 4 }, "views": { "count": 100 }, "is_pinned": 1 },
                { "id": 9, "date": 1_699_000_000 }
            ]
        }))
        .unwrap();
        assert_eq!(page.total, Some(2));
        let first = &page.items[0];
        assert_eq!((first.likes, first.reposts, first.views), (4, 0, 100));
        assert!(first.is_pinned);
        let second = &page.items[1];
        assert_eq!(second.text, "");
        assert_eq!(second.engagement(), 0);
        assert!(!second.is_pinned);
    }

    #[test]
    fn comments_are_tagged_with_parent() {
        let page = comments_page(
            json!({ "count": 1, "items": [{ "id": 3, "date": 5, "text": "ok", "from_id": 77 }] }),
            42,
        )
        .unwrap();
        assert_eq!(page.items[0].parent_post_id, 42);
        assert_eq!(page.items[0].likes, 0);
        assert_eq!(page.items[0].from_id, Some(77));
    }

    #[test]
    fn group_lookup_accepts_both_shapes() {
        let bare = json!([{ "id": 123, "name": "АСУ ТП", "screen_name": "big_asu", "members_count": 50 }]);
        let wrapped = json!({ "groups": [{ "id": 123, "name": "АСУ ТП", "screen_name": "big_asu" }] });
        let a = group_info(bare).unwrap().unwrap();
        let b = group_info(wrapped).unwrap().unwrap();
        assert_eq!(a.id, NumericGroupId(123));
        assert_eq!(a.members_count, Some(50));
        assert_eq!(a.name, b.name);
    }

    #[test]
    fn empty_lookup_is_none_and_missing_id_is_error() {
        assert_eq!(group_info(json!([])).unwrap(), None);
        assert!(matches!(
            group_info(json!([{ "name": "x" }])),
            Err(DomainError::Resolution(_))
        ));
    }

    #[test]
    fn malformed_page_is_transport_error() {
        assert!(matches!(
            posts_page(json!({ "items": "nope" })),
            Err(DomainError::Transport(_))
        ));
    }
}

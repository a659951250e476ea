//! The collection loop: resolve group -> page the wall with date filtering ->
//! page comments for retained posts.
//!
//! - Feed items arrive newest first; the first non-pinned item older than the
//!   window start ends the whole run
//! - Items newer than the window end are skipped, scanning continues
//! - A feed failure after the first batch keeps what was collected so far
//! - A comment failure for one post is logged and the loop moves on

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::{
    CollectionResult, CollectionStats, Comment, DateWindow, DomainError, GroupHandle,
    NumericGroupId, Post, RunPhase, StopReason,
};
use crate::ports::{GroupGateway, ProgressPort};
use crate::usecases::group_resolver::GroupResolver;

/// Feed share of overall progress: 10..60 %.
const FEED_PROGRESS: (u8, u8) = (10, 60);
/// Comment share of overall progress: 60..80 %.
const COMMENT_PROGRESS: (u8, u8) = (60, 80);

/// Page size and courtesy delays. Not an adaptive backoff.
#[derive(Debug, Clone, Copy)]
pub struct CollectSettings {
    pub batch_size: u32,
    pub feed_delay: Duration,
    pub comment_delay: Duration,
    pub max_comments_per_post: Option<usize>,
}

impl Default for CollectSettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            feed_delay: Duration::from_millis(500),
            comment_delay: Duration::from_millis(300),
            max_comments_per_post: None,
        }
    }
}

fn scale(range: (u8, u8), done: usize, total: usize) -> u8 {
    if total == 0 {
        return range.1;
    }
    let span = (range.1 - range.0) as usize;
    range.0 + (span * done.min(total) / total) as u8
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

pub struct CollectService {
    gateway: Arc<dyn GroupGateway>,
    resolver: GroupResolver,
    settings: CollectSettings,
}

impl CollectService {
    pub fn new(gateway: Arc<dyn GroupGateway>, settings: CollectSettings) -> Self {
        Self {
            resolver: GroupResolver::new(Arc::clone(&gateway)),
            gateway,
            settings,
        }
    }

    /// Collect up to `max_items` raw feed items of `handle` within `window`.
    ///
    /// Resolution failures and a failure of the very first feed batch are
    /// returned as errors; any later failure ends the run with partial data.
    pub async fn collect(
        &self,
        handle: &GroupHandle,
        max_items: usize,
        include_comments: bool,
        window: DateWindow,
        progress: &dyn ProgressPort,
    ) -> Result<CollectionResult, DomainError> {
        progress.report(RunPhase::Resolving, FEED_PROGRESS.0, "resolving group");
        let id = self.resolver.resolve(handle).await?;
        let group = self.resolver.describe(handle, id).await;
        info!(
            group = %handle,
            id = %group.id,
            name = %group.name,
            max_items,
            window = %window,
            "collecting"
        );

        let (posts, mut stats) = self.collect_feed(group.id, max_items, window, progress).await?;

        let mut comments = Vec::new();
        if include_comments {
            stats.failed_comment_fetches = self
                .collect_all_comments(group.id, &posts, &mut comments, progress)
                .await;
        }

        info!(
            group = %handle,
            raw_fetched = stats.raw_fetched,
            posts_in_period = stats.posts_in_period,
            comments = comments.len(),
            stop_reason = ?stats.stop_reason,
            "collection finished"
        );

        Ok(CollectionResult {
            group,
            posts,
            comments,
            collected_at: Utc::now(),
            window,
            stats,
        })
    }

    async fn collect_feed(
        &self,
        group: NumericGroupId,
        max_items: usize,
        window: DateWindow,
        progress: &dyn ProgressPort,
    ) -> Result<(Vec<Post>, CollectionStats), DomainError> {
        let mut posts: Vec<Post> = Vec::new();
        let mut seen: HashSet<i64> = HashSet::new();
        let mut raw_fetched = 0usize;
        let mut offset = 0u32;
        let mut last_date: Option<i64> = None;

        let stop_reason = loop {
            if raw_fetched >= max_items {
                break StopReason::BudgetExhausted;
            }
            let count = (max_items - raw_fetched).min(self.settings.batch_size as usize) as u32;

            let page = match self.gateway.wall_page(group, offset, count).await {
                Ok(page) => page,
                Err(e) if raw_fetched == 0 => return Err(e),
                Err(e) => {
                    warn!(offset, error = %e, "feed batch failed; keeping partial result");
                    break StopReason::FetchFailed;
                }
            };
            if page.items.is_empty() {
                break StopReason::EndOfFeed;
            }

            let fetched = page.items.len();
            raw_fetched += fetched;
            offset += fetched as u32;

            let mut in_window = 0usize;
            let mut retained = 0usize;
            let mut passed_window = false;
            for post in page.items {
                if window.is_before_start(post.date) {
                    if post.is_pinned {
                        debug!(post_id = post.id, "old pinned post skipped");
                        continue;
                    }
                    passed_window = true;
                    break;
                }
                if !post.is_pinned {
                    if last_date.is_some_and(|prev| post.date > prev) {
                        warn!(post_id = post.id, "feed out of order; early exit may miss posts");
                    }
                    last_date = Some(post.date);
                }
                if window.is_after_end(post.date) {
                    continue;
                }
                in_window += 1;
                if !seen.insert(post.id) {
                    debug!(post_id = post.id, "duplicate post dropped");
                    continue;
                }
                retained += 1;
                posts.push(post);
            }

            debug!(offset, fetched, in_window, retained, "feed batch");
            progress.report(
                RunPhase::Feed,
                scale(FEED_PROGRESS, raw_fetched, max_items),
                &format!("fetched {} posts, {} in period", raw_fetched, posts.len()),
            );

            // A batch of nothing but duplicates is still inside the window.
            if passed_window || (window.has_lower_bound() && in_window == 0) {
                break StopReason::PassedWindow;
            }
            if page.total.is_some_and(|total| offset as u64 >= total) {
                break StopReason::EndOfFeed;
            }
            pause(self.settings.feed_delay).await;
        };

        let stats = CollectionStats {
            raw_fetched,
            posts_in_period: posts.len(),
            stop_reason,
            failed_comment_fetches: 0,
        };
        Ok((posts, stats))
    }

    /// Returns the number of posts whose comments could not be fetched completely.
    async fn collect_all_comments(
        &self,
        group: NumericGroupId,
        posts: &[Post],
        out: &mut Vec<Comment>,
        progress: &dyn ProgressPort,
    ) -> usize {
        let targets: Vec<i64> = posts
            .iter()
            .filter(|p| p.comments > 0)
            .map(|p| p.id)
            .collect();
        let mut failed = 0usize;

        for (i, post_id) in targets.iter().enumerate() {
            if let Err(e) = self.collect_comments(group, *post_id, out).await {
                warn!(post_id, error = %e, "comment fetch failed; moving on");
                failed += 1;
            }
            progress.report(
                RunPhase::Comments,
                scale(COMMENT_PROGRESS, i + 1, targets.len()),
                &format!("comments for {}/{} posts", i + 1, targets.len()),
            );
            pause(self.settings.comment_delay).await;
        }
        failed
    }

    /// Page one post's comments into `out`. Comments fetched before a failure are kept.
    async fn collect_comments(
        &self,
        group: NumericGroupId,
        post_id: i64,
        out: &mut Vec<Comment>,
    ) -> Result<(), DomainError> {
        let cap = self.settings.max_comments_per_post.unwrap_or(usize::MAX);
        let mut seen: HashSet<i64> = HashSet::new();
        let mut offset = 0u32;

        while seen.len() < cap {
            let count = (cap - seen.len()).min(self.settings.batch_size as usize) as u32;
            let page = self
                .gateway
                .comments_page(group, post_id, offset, count)
                .await?;
            if page.items.is_empty() {
                break;
            }
            offset += page.items.len() as u32;
            for comment in page.items {
                if seen.insert(comment.id) {
                    out.push(comment);
                }
            }
            if page.total.is_some_and(|total| offset as u64 >= total) {
                break;
            }
            pause(self.settings.comment_delay).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GroupInfo, Page};
    use crate::ports::NoProgress;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const DAY: i64 = 86_400;
    /// 2024-01-10 12:00 UTC
    const NEWEST: i64 = 1_704_888_000;

    /// In-memory wall: posts newest first, comments per post, optional failures.
    #[derive(Default)]
    struct FakeWall {
        posts: Vec<Post>,
        comments: HashMap<i64, Vec<Comment>>,
        fail_feed_from_offset: Option<u32>,
        fail_comments_for: Option<i64>,
        fail_lookup: bool,
        lookups: Mutex<usize>,
        wall_calls: Mutex<Vec<(u32, u32)>>,
    }

    #[async_trait::async_trait]
    impl GroupGateway for FakeWall {
        async fn group_info(&self, handle: &str) -> Result<Option<GroupInfo>, DomainError> {
            *self.lookups.lock().unwrap() += 1;
            if self.fail_lookup {
                return Err(DomainError::Transport("timeout".into()));
            }
            let mut info = GroupInfo::bare(NumericGroupId(1));
            info.screen_name = Some(handle.to_string());
            Ok(Some(info))
        }

        async fn wall_page(
            &self,
            _group: NumericGroupId,
            offset: u32,
            count: u32,
        ) -> Result<Page<Post>, DomainError> {
            self.wall_calls.lock().unwrap().push((offset, count));
            if self.fail_feed_from_offset.is_some_and(|o| offset >= o) {
                return Err(DomainError::Transport("connection reset".into()));
            }
            let items = self
                .posts
                .iter()
                .skip(offset as usize)
                .take(count as usize)
                .cloned()
                .collect();
            Ok(Page::new(items, Some(self.posts.len() as u64)))
        }

        async fn comments_page(
            &self,
            _group: NumericGroupId,
            post_id: i64,
            offset: u32,
            count: u32,
        ) -> Result<Page<Comment>, DomainError> {
            if self.fail_comments_for == Some(post_id) {
                return Err(DomainError::Api {
                    code: 15,
                    message: "Access denied".into(),
                });
            }
            let all = self.comments.get(&post_id).cloned().unwrap_or_default();
            let total = all.len() as u64;
            let items = all
                .into_iter()
                .skip(offset as usize)
                .take(count as usize)
                .collect();
            Ok(Page::new(items, Some(total)))
        }
    }

    fn post(id: i64, date: i64, comments: u64) -> Post {
        Post {
            id,
            date,
            text: format!("post {}", id),
            likes: 1,
            reposts: 0,
            comments,
            views: 10,
            from_id: Some(-1),
            is_pinned: false,
        }
    }

    fn comment(id: i64, parent: i64) -> Comment {
        Comment {
            id,
            parent_post_id: parent,
            date: NEWEST,
            text: "ok".into(),
            likes: 0,
            from_id: Some(5),
        }
    }

    fn settings(batch_size: u32) -> CollectSettings {
        CollectSettings {
            batch_size,
            feed_delay: Duration::ZERO,
            comment_delay: Duration::ZERO,
            max_comments_per_post: None,
        }
    }

    fn service(wall: FakeWall, batch_size: u32) -> (CollectService, Arc<FakeWall>) {
        let wall = Arc::new(wall);
        (CollectService::new(wall.clone(), settings(batch_size)), wall)
    }

    async fn run(svc: &CollectService, max: usize, window: DateWindow) -> CollectionResult {
        svc.collect(&GroupHandle::new("big_asu"), max, false, window, &NoProgress)
            .await
            .unwrap()
    }

    /// Five posts, two days apart, spanning days 0..8 back from NEWEST.
    fn five_posts() -> Vec<Post> {
        (0..5).map(|i| post(100 - i, NEWEST - 2 * i * DAY, 0)).collect()
    }

    #[tokio::test]
    async fn window_retains_only_posts_inside_and_stops_on_older() {
        let (svc, wall) = service(
            FakeWall {
                posts: five_posts(),
                ..Default::default()
            },
            2,
        );
        // Covers posts 2, 4 and 6 days back: ids 99, 98, 97.
        let window = DateWindow::new(Some(NEWEST - 7 * DAY), Some(NEWEST - DAY)).unwrap();
        let result = run(&svc, 100, window).await;

        let ids: Vec<i64> = result.posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![99, 98, 97]);
        assert_eq!(result.stats.posts_in_period, 3);
        assert_eq!(result.stats.stop_reason, StopReason::PassedWindow);
        assert!(result.posts.iter().all(|p| window.contains(p.date)));
        // Third batch (offset 4) holds the too-old post; nothing after it is requested.
        assert_eq!(wall.wall_calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn newer_than_end_is_skipped_not_stopped() {
        let (svc, _) = service(
            FakeWall {
                posts: five_posts(),
                ..Default::default()
            },
            100,
        );
        let window = DateWindow::new(None, Some(NEWEST - DAY)).unwrap();
        let result = run(&svc, 100, window).await;
        let ids: Vec<i64> = result.posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![99, 98, 97, 96]);
        assert_eq!(result.stats.stop_reason, StopReason::EndOfFeed);
    }

    #[tokio::test]
    async fn budget_counts_raw_items_not_retained() {
        let (svc, wall) = service(
            FakeWall {
                posts: five_posts(),
                ..Default::default()
            },
            2,
        );
        let window = DateWindow::new(None, Some(NEWEST - DAY)).unwrap();
        let result = run(&svc, 3, window).await;
        assert_eq!(result.stats.raw_fetched, 3);
        assert_eq!(result.stats.posts_in_period, 2);
        assert_eq!(result.stats.stop_reason, StopReason::BudgetExhausted);
        // Second request asks only for what is left of the budget.
        assert_eq!(*wall.wall_calls.lock().unwrap(), vec![(0, 2), (2, 1)]);
    }

    #[tokio::test]
    async fn batch_without_retained_posts_ends_bounded_run() {
        let (svc, _) = service(
            FakeWall {
                posts: five_posts(),
                ..Default::default()
            },
            2,
        );
        // Lower bound set, but every post in the first batch is newer than the end.
        let window = DateWindow::new(Some(NEWEST - 10 * DAY), Some(NEWEST - 5 * DAY)).unwrap();
        let result = run(&svc, 100, window).await;
        assert!(result.posts.is_empty());
        assert_eq!(result.stats.raw_fetched, 2);
        assert_eq!(result.stats.stop_reason, StopReason::PassedWindow);
    }

    #[tokio::test]
    async fn old_pinned_post_does_not_end_the_run() {
        let mut posts = vec![post(1, NEWEST - 100 * DAY, 0)];
        posts[0].is_pinned = true;
        posts.extend(five_posts());
        let (svc, _) = service(
            FakeWall {
                posts,
                ..Default::default()
            },
            100,
        );
        let window = DateWindow::new(Some(NEWEST - 3 * DAY), None).unwrap();
        let result = run(&svc, 100, window).await;
        let ids: Vec<i64> = result.posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![100, 99]);
    }

    #[tokio::test]
    async fn later_feed_failure_keeps_partial_result() {
        let (svc, _) = service(
            FakeWall {
                posts: five_posts(),
                fail_feed_from_offset: Some(2),
                ..Default::default()
            },
            2,
        );
        let result = run(&svc, 100, DateWindow::UNBOUNDED).await;
        assert_eq!(result.posts.len(), 2);
        assert_eq!(result.stats.stop_reason, StopReason::FetchFailed);
    }

    #[tokio::test]
    async fn first_feed_failure_is_an_error() {
        let (svc, _) = service(
            FakeWall {
                posts: five_posts(),
                fail_feed_from_offset: Some(0),
                ..Default::default()
            },
            2,
        );
        let err = svc
            .collect(
                &GroupHandle::new("big_asu"),
                100,
                false,
                DateWindow::UNBOUNDED,
                &NoProgress,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Transport(_)));
    }

    #[tokio::test]
    async fn duplicate_posts_from_offset_drift_are_dropped() {
        let mut posts = five_posts();
        posts.insert(2, posts[1].clone());
        let (svc, _) = service(
            FakeWall {
                posts,
                ..Default::default()
            },
            2,
        );
        let result = run(&svc, 100, DateWindow::UNBOUNDED).await;
        assert_eq!(result.posts.len(), 5);
        assert_eq!(result.stats.raw_fetched, 6);
    }

    #[tokio::test]
    async fn repeated_batch_does_not_end_bounded_run() {
        // New posts shifted the offsets: the second batch repeats the first.
        let posts = vec![
            post(10, NEWEST, 0),
            post(9, NEWEST - DAY, 0),
            post(10, NEWEST, 0),
            post(9, NEWEST - DAY, 0),
            post(8, NEWEST - 2 * DAY, 0),
        ];
        let (svc, wall) = service(
            FakeWall {
                posts,
                ..Default::default()
            },
            2,
        );
        let window = DateWindow::new(Some(NEWEST - 30 * DAY), None).unwrap();
        let result = run(&svc, 100, window).await;

        let ids: Vec<i64> = result.posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![10, 9, 8]);
        assert_eq!(result.stats.stop_reason, StopReason::EndOfFeed);
        assert_eq!(wall.wall_calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn numeric_handle_survives_failed_metadata_lookup() {
        let (svc, wall) = service(
            FakeWall {
                posts: five_posts(),
                fail_lookup: true,
                ..Default::default()
            },
            100,
        );
        let result = svc
            .collect(
                &GroupHandle::new("-12345"),
                100,
                false,
                DateWindow::UNBOUNDED,
                &NoProgress,
            )
            .await
            .unwrap();
        assert_eq!(result.group.id, NumericGroupId(12345));
        assert_eq!(result.group.name, "club12345");
        assert_eq!(result.posts.len(), 5);
        // Only the best-effort metadata lookup touched the network.
        assert_eq!(*wall.lookups.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn short_name_is_looked_up_once_per_run() {
        let (svc, wall) = service(
            FakeWall {
                posts: five_posts(),
                ..Default::default()
            },
            100,
        );
        let result = run(&svc, 100, DateWindow::UNBOUNDED).await;
        assert_eq!(result.group.screen_name.as_deref(), Some("big_asu"));
        assert_eq!(*wall.lookups.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn comments_are_paged_tagged_and_failures_skipped() {
        let posts = vec![
            post(3, NEWEST, 3),
            post(2, NEWEST - DAY, 0),
            post(1, NEWEST - 2 * DAY, 1),
        ];
        let mut comments = HashMap::new();
        comments.insert(3, vec![comment(30, 3), comment(31, 3), comment(32, 3)]);
        comments.insert(1, vec![comment(10, 1)]);
        let (svc, _) = service(
            FakeWall {
                posts,
                comments,
                fail_comments_for: Some(1),
                ..Default::default()
            },
            2,
        );

        let result = svc
            .collect(
                &GroupHandle::new("big_asu"),
                100,
                true,
                DateWindow::UNBOUNDED,
                &NoProgress,
            )
            .await
            .unwrap();
        let ids: Vec<i64> = result.comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![30, 31, 32]);
        assert!(result.comments.iter().all(|c| c.parent_post_id == 3));
        assert_eq!(result.stats.failed_comment_fetches, 1);
        // Every comment points at a collected post.
        let post_ids: HashSet<i64> = result.posts.iter().map(|p| p.id).collect();
        assert!(result.comments.iter().all(|c| post_ids.contains(&c.parent_post_id)));
    }

    #[tokio::test]
    async fn comment_cap_limits_each_post() {
        let mut comments = HashMap::new();
        comments.insert(3, (0..5).map(|i| comment(i, 3)).collect());
        let wall = Arc::new(FakeWall {
            posts: vec![post(3, NEWEST, 5)],
            comments,
            ..Default::default()
        });
        let svc = CollectService::new(
            wall,
            CollectSettings {
                max_comments_per_post: Some(3),
                ..settings(2)
            },
        );
        let result = svc
            .collect(
                &GroupHandle::new("big_asu"),
                100,
                true,
                DateWindow::UNBOUNDED,
                &NoProgress,
            )
            .await
            .unwrap();
        assert_eq!(result.comments.len(), 3);
    }

    #[test]
    fn progress_scales_within_range() {
        assert_eq!(scale(FEED_PROGRESS, 0, 100), 10);
        assert_eq!(scale(FEED_PROGRESS, 50, 100), 35);
        assert_eq!(scale(FEED_PROGRESS, 500, 100), 60);
        assert_eq!(scale(COMMENT_PROGRESS, 0, 0), 80);
    }
}

//! Analysis: build the report for one run, write it with a Markdown digest,
//! render charts. Everything lands in one results directory.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use crate::domain::{AnalysisOptions, AnalysisReport, CollectionResult, DomainError, build_report};
use crate::ports::ChartPort;
use crate::shared::fs::write_atomic;

pub const REPORT_FILE: &str = "latest_analysis.json";
pub const DIGEST_FILE: &str = "digest.md";
const CHART_EXTENSION: &str = "svg";

/// The report as persisted: the pure report plus when it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub generated_at: DateTime<Utc>,
    pub report: AnalysisReport,
}

#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub stored: StoredReport,
    pub report_path: PathBuf,
    pub digest_path: PathBuf,
    pub charts: Vec<PathBuf>,
}

pub struct AnalysisService {
    charts: Arc<dyn ChartPort>,
    results_dir: PathBuf,
    options: AnalysisOptions,
}

impl AnalysisService {
    pub fn new(charts: Arc<dyn ChartPort>, results_dir: PathBuf, options: AnalysisOptions) -> Self {
        Self {
            charts,
            results_dir,
            options,
        }
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Drawing and file writes are synchronous, so they run on the blocking pool.
    async fn render_charts(
        &self,
        result: &CollectionResult,
        report: &AnalysisReport,
    ) -> Result<Vec<PathBuf>, DomainError> {
        let charts = Arc::clone(&self.charts);
        let result = result.clone();
        let report = report.clone();
        let out_dir = self.results_dir.clone();
        tokio::task::spawn_blocking(move || charts.render(&result, &report, &out_dir))
            .await
            .map_err(|e| DomainError::Chart(format!("chart task: {}", e)))?
    }

    /// Build, persist and chart the report for `result`.
    ///
    /// Chart failures are logged and leave the report in place.
    pub async fn analyze(&self, result: &CollectionResult) -> Result<AnalysisOutput, DomainError> {
        fs::create_dir_all(&self.results_dir)
            .await
            .map_err(|e| DomainError::Analysis(format!("create results dir: {}", e)))?;

        let stored = StoredReport {
            generated_at: Utc::now(),
            report: build_report(result, &self.options),
        };

        let report_path = self.results_dir.join(REPORT_FILE);
        let json = serde_json::to_vec_pretty(&stored)
            .map_err(|e| DomainError::Analysis(format!("serialize report: {}", e)))?;
        write_atomic(&report_path, &json)
            .await
            .map_err(|e| DomainError::Analysis(format!("write report: {}", e)))?;

        let digest_path = self.results_dir.join(DIGEST_FILE);
        write_atomic(&digest_path, render_digest(&stored).as_bytes())
            .await
            .map_err(|e| DomainError::Analysis(format!("write digest: {}", e)))?;

        let charts = match self.render_charts(result, &stored.report).await {
            Ok(paths) => paths,
            Err(e) => {
                warn!(error = %e, "chart rendering failed; report kept");
                Vec::new()
            }
        };

        info!(
            path = %report_path.display(),
            posts = stored.report.basic_statistics.total_posts,
            charts = charts.len(),
            "analysis written"
        );

        Ok(AnalysisOutput {
            stored,
            report_path,
            digest_path,
            charts,
        })
    }

    /// Last written report, if any.
    pub async fn latest_report(&self) -> Result<Option<StoredReport>, DomainError> {
        let path = self.results_dir.join(REPORT_FILE);
        let text = match fs::read_to_string(&path).await {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DomainError::Analysis(format!("read report: {}", e))),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| DomainError::Analysis(format!("parse report: {}", e)))
    }

    /// Chart file names in the results directory, sorted.
    pub async fn list_charts(&self) -> Result<Vec<String>, DomainError> {
        let mut names = Vec::new();
        let mut dir = match fs::read_dir(&self.results_dir).await {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(DomainError::Analysis(format!("list results: {}", e))),
        };
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| DomainError::Analysis(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == CHART_EXTENSION) {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn one_line(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let mut cut: String = flat.chars().take(max).collect();
    cut.push('…');
    cut
}

/// Markdown digest of a stored report.
pub fn render_digest(stored: &StoredReport) -> String {
    let r = &stored.report;
    let stats = &r.basic_statistics;
    let mut md = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(md, "# Group Digest: {}\n", r.group_name);
    let _ = writeln!(
        md,
        "**Collected:** {} | **Generated:** {}\n",
        r.collected_at.format("%Y-%m-%d %H:%M UTC"),
        stored.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    md.push_str("---\n\n");

    md.push_str("## Overview\n\n");
    let _ = writeln!(md, "- Posts: {}", stats.total_posts);
    let _ = writeln!(md, "- Comments: {}", stats.total_comments);
    if let (Some(start), Some(end)) = (stats.date_range.start, stats.date_range.end) {
        let _ = writeln!(
            md,
            "- Period: {} to {}",
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        );
    }
    let e = &stats.engagement;
    let _ = writeln!(
        md,
        "- Avg likes / comments / reposts: {:.1} / {:.1} / {:.1}",
        e.avg_likes_per_post, e.avg_comments_per_post, e.avg_reposts_per_post
    );
    let _ = writeln!(md, "- Avg views per post: {:.1}", e.avg_views_per_post);
    let _ = writeln!(md, "- Total engagement: {}\n", e.total_engagement);

    let weekdays = r.posting_patterns.weekday_series();
    if let Some((busiest, n)) = weekdays.iter().max_by_key(|(_, n)| *n).filter(|(_, n)| *n > 0) {
        md.push_str("## Posting Patterns\n\n");
        let _ = writeln!(md, "- Busiest weekday: {} ({} posts)", busiest, n);
        if let Some((hour, n)) = r.posting_patterns.by_hour.iter().max_by_key(|(_, n)| **n) {
            let _ = writeln!(md, "- Busiest hour: {:02}:00 ({} posts)", hour, n);
        }
        md.push('\n');
    }

    let topics = &r.popular_topics;
    if !topics.post_keywords.is_empty() {
        md.push_str("## Top Keywords\n\n");
        for k in topics.post_keywords.iter().take(10) {
            let _ = writeln!(md, "- {} ({})", k.word, k.count);
        }
        md.push('\n');
    }
    if !topics.tech_terms_mentions.is_empty() {
        md.push_str("## Technical Terms\n\n");
        for t in &topics.tech_terms_mentions {
            let _ = writeln!(md, "- {} ({})", t.term, t.count);
        }
        md.push('\n');
    }

    let top = &r.engagement_patterns.top_posts;
    if !top.is_empty() {
        md.push_str("## Most Engaging Posts\n\n");
        for (i, p) in top.iter().enumerate() {
            let _ = writeln!(
                md,
                "{}. **{}** engagement (id {}): {}",
                i + 1,
                p.engagement,
                p.id,
                one_line(&p.text, 100)
            );
        }
        md.push('\n');
    }

    md.push_str("---\n");
    md.push_str("*Generated by vk-insight*\n");
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CollectionStats, DateWindow, GroupInfo, NumericGroupId, Post, StopReason,
    };
    use std::sync::Mutex;

    struct RecordingCharts {
        calls: Mutex<usize>,
        thread: Mutex<Option<std::thread::ThreadId>>,
        fail: bool,
    }

    impl ChartPort for RecordingCharts {
        fn render(
            &self,
            _result: &CollectionResult,
            _report: &AnalysisReport,
            out_dir: &Path,
        ) -> Result<Vec<PathBuf>, DomainError> {
            *self.calls.lock().unwrap() += 1;
            *self.thread.lock().unwrap() = Some(std::thread::current().id());
            if self.fail {
                return Err(DomainError::Chart("no backend".into()));
            }
            let path = out_dir.join("posting_patterns.svg");
            std::fs::write(&path, "<svg/>").unwrap();
            Ok(vec![path])
        }
    }

    fn run() -> CollectionResult {
        let posts = vec![
            Post {
                id: 2,
                date: 1_704_196_800,
                text: "Новый контроллер ПЛК для SCADA".into(),
                likes: 10,
                reposts: 2,
                comments: 3,
                views: 300,
                from_id: Some(-1),
                is_pinned: false,
            },
            Post {
                id: 1,
                date: 1_704_110_400,
                text: "Вакансия инженер АСУ ТП".into(),
                likes: 1,
                reposts: 0,
                comments: 0,
                views: 50,
                from_id: Some(-1),
                is_pinned: false,
            },
        ];
        CollectionResult {
            group: GroupInfo::bare(NumericGroupId(1)),
            posts,
            comments: vec![],
            collected_at: DateTime::from_timestamp(1_704_240_000, 0).unwrap(),
            window: DateWindow::UNBOUNDED,
            stats: CollectionStats {
                raw_fetched: 2,
                posts_in_period: 2,
                stop_reason: StopReason::EndOfFeed,
                failed_comment_fetches: 0,
            },
        }
    }

    fn service(dir: &Path, fail: bool) -> (AnalysisService, Arc<RecordingCharts>) {
        let charts = Arc::new(RecordingCharts {
            calls: Mutex::new(0),
            thread: Mutex::new(None),
            fail,
        });
        let svc = AnalysisService::new(
            charts.clone(),
            dir.to_path_buf(),
            AnalysisOptions::default(),
        );
        (svc, charts)
    }

    #[tokio::test]
    async fn analyze_writes_report_digest_and_charts() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, charts) = service(dir.path(), false);

        let out = svc.analyze(&run()).await.unwrap();
        assert!(out.report_path.ends_with(REPORT_FILE));
        assert_eq!(out.charts.len(), 1);
        assert_eq!(*charts.calls.lock().unwrap(), 1);

        let stored = svc.latest_report().await.unwrap().unwrap();
        assert_eq!(stored.generated_at, out.stored.generated_at);
        assert_eq!(
            stored.report.engagement_patterns.top_posts,
            out.stored.report.engagement_patterns.top_posts
        );
        assert_eq!(stored.report.basic_statistics.total_posts, 2);

        let digest = std::fs::read_to_string(&out.digest_path).unwrap();
        assert!(digest.contains("# Group Digest: club1"));
        assert!(digest.contains("scada (1)"));

        assert_eq!(svc.list_charts().await.unwrap(), vec!["posting_patterns.svg"]);
    }

    #[tokio::test]
    async fn charts_render_off_the_runtime_thread() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, charts) = service(dir.path(), false);
        svc.analyze(&run()).await.unwrap();
        let render_thread = charts.thread.lock().unwrap().unwrap();
        assert_ne!(render_thread, std::thread::current().id());
    }

    struct PanickingCharts;

    impl ChartPort for PanickingCharts {
        fn render(
            &self,
            _: &CollectionResult,
            _: &AnalysisReport,
            _: &Path,
        ) -> Result<Vec<PathBuf>, DomainError> {
            panic!("font cache corrupted");
        }
    }

    #[tokio::test]
    async fn panicking_renderer_keeps_report() {
        let dir = tempfile::tempdir().unwrap();
        let svc = AnalysisService::new(
            Arc::new(PanickingCharts),
            dir.path().to_path_buf(),
            AnalysisOptions::default(),
        );
        let out = svc.analyze(&run()).await.unwrap();
        assert!(out.charts.is_empty());
        assert!(out.report_path.exists());
    }

    #[tokio::test]
    async fn chart_failure_keeps_report() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, _) = service(dir.path(), true);
        let out = svc.analyze(&run()).await.unwrap();
        assert!(out.charts.is_empty());
        assert!(out.report_path.exists());
    }

    #[tokio::test]
    async fn nothing_written_yet() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, _) = service(&dir.path().join("absent"), false);
        assert_eq!(svc.latest_report().await.unwrap(), None);
        assert!(svc.list_charts().await.unwrap().is_empty());
    }

    #[test]
    fn long_text_is_flattened_and_cut() {
        assert_eq!(one_line("a\n b", 10), "a b");
        assert_eq!(one_line("abcdef", 3), "abc…");
    }
}

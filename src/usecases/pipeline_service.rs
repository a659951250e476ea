//! End-to-end run: collect -> save -> analyze, with run-status tracking.
//!
//! Progress: 0 start, 10..80 collection, 80 saving, 90 analysis, 100 done.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use crate::domain::{CollectionStats, DateWindow, DomainError, GroupHandle, RunPhase};
use crate::ports::{GatewayFactory, NoProgress, ProgressPort, ResultStorePort, SavedRun};
use crate::usecases::analysis_service::{AnalysisOutput, AnalysisService};
use crate::usecases::collect_service::{CollectService, CollectSettings};
use crate::usecases::run_status::{RunGuard, StatusHandle};

/// One collection request as received from the CLI, menu or dashboard.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Overrides the configured token for this run only.
    pub access_token: Option<String>,
    pub group: GroupHandle,
    pub max_posts: usize,
    pub include_comments: bool,
    pub window: DateWindow,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub saved: SavedRun,
    pub stats: CollectionStats,
    pub analysis: AnalysisOutput,
}

/// Reports to the status handle and to an optional observer (e.g. a progress bar).
struct Tee<'a> {
    status: &'a StatusHandle,
    observer: &'a dyn ProgressPort,
}

impl ProgressPort for Tee<'_> {
    fn report(&self, phase: RunPhase, progress: u8, message: &str) {
        self.status.report(phase, progress, message);
        self.observer.report(phase, progress, message);
    }
}

pub struct PipelineService {
    factory: Arc<dyn GatewayFactory>,
    store: Arc<dyn ResultStorePort>,
    analysis: Arc<AnalysisService>,
    status: StatusHandle,
    settings: CollectSettings,
    default_token: Option<String>,
}

impl PipelineService {
    pub fn new(
        factory: Arc<dyn GatewayFactory>,
        store: Arc<dyn ResultStorePort>,
        analysis: Arc<AnalysisService>,
        status: StatusHandle,
        settings: CollectSettings,
        default_token: Option<String>,
    ) -> Self {
        Self {
            factory,
            store,
            analysis,
            status,
            settings,
            default_token,
        }
    }

    pub fn status(&self) -> &StatusHandle {
        &self.status
    }

    pub fn store(&self) -> &Arc<dyn ResultStorePort> {
        &self.store
    }

    pub fn analysis(&self) -> &Arc<AnalysisService> {
        &self.analysis
    }

    /// Caller's token, else the configured one.
    fn pick_token(&self, supplied: Option<&str>) -> Result<String, DomainError> {
        supplied
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .or_else(|| self.default_token.clone())
            .ok_or_else(|| {
                DomainError::Configuration(
                    "access token missing: set VK_INSIGHT_ACCESS_TOKEN or pass one with the request"
                        .to_string(),
                )
            })
    }

    /// Run to completion in the current task.
    pub async fn run(
        &self,
        request: RunRequest,
        observer: &dyn ProgressPort,
    ) -> Result<RunOutcome, DomainError> {
        let token = self.pick_token(request.access_token.as_deref())?;
        let guard = self.status.try_begin("starting")?;
        self.execute(request, token, guard, observer).await
    }

    /// Claim the status handle now and run in a background task.
    ///
    /// Errors only for requests rejected up front (missing token, run already active).
    pub fn spawn(self: &Arc<Self>, request: RunRequest) -> Result<(), DomainError> {
        let token = self.pick_token(request.access_token.as_deref())?;
        let guard = self.status.try_begin("starting")?;
        let this = Arc::clone(self);
        tokio::spawn(async move {
            // Outcome is recorded in the status handle.
            let _ = this.execute(request, token, guard, &NoProgress).await;
        });
        Ok(())
    }

    async fn execute(
        &self,
        request: RunRequest,
        token: String,
        guard: RunGuard,
        observer: &dyn ProgressPort,
    ) -> Result<RunOutcome, DomainError> {
        match self.stages(&request, &token, observer).await {
            Ok(outcome) => {
                let message = format!(
                    "done: {} posts, {} comments",
                    outcome.stats.posts_in_period,
                    outcome.analysis.stored.report.basic_statistics.total_comments
                );
                observer.report(RunPhase::Done, 100, &message);
                guard.finish(&message);
                Ok(outcome)
            }
            Err(e) => {
                error!(group = %request.group, error = %e, "run failed");
                observer.report(RunPhase::Failed, 0, &e.to_string());
                guard.fail(&e);
                Err(e)
            }
        }
    }

    async fn stages(
        &self,
        request: &RunRequest,
        token: &str,
        observer: &dyn ProgressPort,
    ) -> Result<RunOutcome, DomainError> {
        let progress = Tee {
            status: &self.status,
            observer,
        };
        progress.report(RunPhase::Resolving, 0, "starting");

        let collector = CollectService::new(self.factory.connect(token), self.settings);
        let result = collector
            .collect(
                &request.group,
                request.max_posts,
                request.include_comments,
                request.window,
                &progress,
            )
            .await?;

        progress.report(RunPhase::Saving, 80, "saving data");
        let saved = self.store.save(&result).await?;

        progress.report(RunPhase::Analyzing, 90, "analyzing");
        let analysis = self.analysis.analyze(&result).await?;

        info!(
            group = %request.group,
            path = %saved.json.display(),
            posts = result.total_posts(),
            "run complete"
        );
        Ok(RunOutcome {
            saved,
            stats: result.stats,
            analysis,
        })
    }

    /// Re-analyze a saved run; the newest one when `path` is `None`.
    pub async fn analyze_saved(&self, path: Option<PathBuf>) -> Result<AnalysisOutput, DomainError> {
        let path = match path {
            Some(p) => p,
            None => self
                .store
                .latest()
                .await?
                .ok_or_else(|| DomainError::Repo("no saved runs yet".to_string()))?,
        };
        info!(path = %path.display(), "analyzing saved run");
        let result = self.store.load(&path).await?;
        self.analysis.analyze(&result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::JsonResultStore;
    use crate::domain::{
        AnalysisOptions, AnalysisReport, CollectionResult, Comment, GroupInfo, NumericGroupId,
        Page, Post,
    };
    use crate::ports::{ChartPort, GroupGateway};
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Two-post wall. When `gate` is set, the first feed call waits on it.
    struct TinyWall {
        gate: Option<Arc<Notify>>,
    }

    #[async_trait::async_trait]
    impl GroupGateway for TinyWall {
        async fn group_info(&self, _: &str) -> Result<Option<GroupInfo>, DomainError> {
            let mut info = GroupInfo::bare(NumericGroupId(5));
            info.screen_name = Some("big_asu".into());
            Ok(Some(info))
        }
        async fn wall_page(
            &self,
            _: NumericGroupId,
            offset: u32,
            _: u32,
        ) -> Result<Page<Post>, DomainError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if offset > 0 {
                return Ok(Page::empty());
            }
            let post = |id, date| Post {
                id,
                date,
                text: "контроллер".into(),
                likes: 1,
                reposts: 0,
                comments: 0,
                views: 5,
                from_id: None,
                is_pinned: false,
            };
            Ok(Page::new(
                vec![post(2, 1_704_153_600), post(1, 1_704_067_200)],
                Some(2),
            ))
        }
        async fn comments_page(
            &self,
            _: NumericGroupId,
            _: i64,
            _: u32,
            _: u32,
        ) -> Result<Page<Comment>, DomainError> {
            Ok(Page::empty())
        }
    }

    struct Factory {
        gate: Option<Arc<Notify>>,
        tokens: Mutex<Vec<String>>,
    }

    impl GatewayFactory for Factory {
        fn connect(&self, access_token: &str) -> Arc<dyn GroupGateway> {
            self.tokens.lock().unwrap().push(access_token.to_string());
            Arc::new(TinyWall {
                gate: self.gate.clone(),
            })
        }
    }

    struct NoCharts;

    impl ChartPort for NoCharts {
        fn render(
            &self,
            _: &CollectionResult,
            _: &AnalysisReport,
            _: &Path,
        ) -> Result<Vec<PathBuf>, DomainError> {
            Ok(vec![])
        }
    }

    fn pipeline(
        dir: &Path,
        gate: Option<Arc<Notify>>,
        default_token: Option<&str>,
    ) -> (Arc<PipelineService>, Arc<Factory>) {
        let factory = Arc::new(Factory {
            gate,
            tokens: Mutex::new(Vec::new()),
        });
        let analysis = Arc::new(AnalysisService::new(
            Arc::new(NoCharts),
            dir.join("results"),
            AnalysisOptions::default(),
        ));
        let settings = CollectSettings {
            feed_delay: Duration::ZERO,
            comment_delay: Duration::ZERO,
            ..CollectSettings::default()
        };
        let svc = PipelineService::new(
            factory.clone(),
            Arc::new(JsonResultStore::new(dir.join("data"))),
            analysis,
            StatusHandle::new(),
            settings,
            default_token.map(String::from),
        );
        (Arc::new(svc), factory)
    }

    fn request(token: Option<&str>) -> RunRequest {
        RunRequest {
            access_token: token.map(String::from),
            group: GroupHandle::new("big_asu"),
            max_posts: 100,
            include_comments: true,
            window: DateWindow::UNBOUNDED,
        }
    }

    #[tokio::test]
    async fn run_saves_analyzes_and_settles_status() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, _) = pipeline(dir.path(), None, Some("cfg-token"));

        let outcome = svc.run(request(None), &NoProgress).await.unwrap();
        assert!(outcome.saved.json.exists());
        assert!(outcome.analysis.report_path.exists());
        assert_eq!(outcome.stats.posts_in_period, 2);

        let status = svc.status().snapshot();
        assert!(!status.is_running);
        assert_eq!((status.phase, status.progress), (RunPhase::Done, 100));

        let again = svc.analyze_saved(None).await.unwrap();
        assert_eq!(again.stored.report.basic_statistics.total_posts, 2);
    }

    #[tokio::test]
    async fn request_token_overrides_configured_one() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, factory) = pipeline(dir.path(), None, Some("cfg-token"));
        svc.run(request(Some("req-token")), &NoProgress).await.unwrap();
        assert_eq!(*factory.tokens.lock().unwrap(), vec!["req-token"]);
    }

    #[tokio::test]
    async fn missing_token_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, _) = pipeline(dir.path(), None, None);
        let err = svc.run(request(Some("  ")), &NoProgress).await.unwrap_err();
        assert!(matches!(err, DomainError::Configuration(_)));
        assert!(!svc.status().snapshot().is_running);
    }

    #[tokio::test]
    async fn second_start_while_running_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let gate = Arc::new(Notify::new());
        let (svc, _) = pipeline(dir.path(), Some(gate.clone()), Some("t"));

        svc.spawn(request(None)).unwrap();
        assert!(svc.status().snapshot().is_running);
        assert!(matches!(
            svc.spawn(request(None)),
            Err(DomainError::AlreadyRunning)
        ));

        // Release the gated feed call.
        gate.notify_one();
        for _ in 0..200 {
            if !svc.status().snapshot().is_running {
                break;
            }
            gate.notify_one();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(svc.status().snapshot().phase, RunPhase::Done);
    }

    #[tokio::test]
    async fn analyze_saved_without_runs_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, _) = pipeline(dir.path(), None, Some("t"));
        assert!(matches!(
            svc.analyze_saved(None).await,
            Err(DomainError::Repo(_))
        ));
    }
}

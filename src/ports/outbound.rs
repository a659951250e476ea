//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    AnalysisReport, CollectionResult, Comment, DomainError, GroupInfo, NumericGroupId, Page, Post,
    RunPhase,
};

/// Method-call style API: `call(method, params)` returns the `response` payload.
///
/// Implementations inject the credential and protocol version. Provider errors
/// surface as [`DomainError::Api`], network/HTTP/JSON failures as
/// [`DomainError::Transport`]. No retries.
#[async_trait::async_trait]
pub trait ApiPort: Send + Sync {
    async fn call(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, DomainError>;
}

/// Typed access to group lookup, the wall feed and post comments.
#[async_trait::async_trait]
pub trait GroupGateway: Send + Sync {
    /// Look up community metadata by short name or numeric id. `None` if the provider returned nothing.
    async fn group_info(&self, handle: &str) -> Result<Option<GroupInfo>, DomainError>;

    /// One page of the wall, newest first.
    async fn wall_page(
        &self,
        group: NumericGroupId,
        offset: u32,
        count: u32,
    ) -> Result<Page<Post>, DomainError>;

    /// One page of top-level comments under `post_id`, each tagged with that parent id.
    async fn comments_page(
        &self,
        group: NumericGroupId,
        post_id: i64,
        offset: u32,
        count: u32,
    ) -> Result<Page<Comment>, DomainError>;
}

/// Builds a gateway bound to one caller-supplied credential.
pub trait GatewayFactory: Send + Sync {
    fn connect(&self, access_token: &str) -> Arc<dyn GroupGateway>;
}

/// Persisted run file as listed by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataFileEntry {
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// Paths written for one saved run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedRun {
    pub json: PathBuf,
    pub posts_csv: Option<PathBuf>,
    pub comments_csv: Option<PathBuf>,
}

/// Flat-file persistence of collection runs.
#[async_trait::async_trait]
pub trait ResultStorePort: Send + Sync {
    /// Write the run file plus the posts/comments tables.
    async fn save(&self, result: &CollectionResult) -> Result<SavedRun, DomainError>;

    async fn load(&self, path: &Path) -> Result<CollectionResult, DomainError>;

    /// Run files, newest first.
    async fn list(&self) -> Result<Vec<DataFileEntry>, DomainError>;

    /// Most recently modified run file, if any.
    async fn latest(&self) -> Result<Option<PathBuf>, DomainError> {
        Ok(self.list().await?.first().map(|e| self.path_of(&e.name)))
    }

    /// Absolute location of a listed file name.
    fn path_of(&self, name: &str) -> PathBuf;
}

/// Renders chart images for a run and its report into `out_dir`.
pub trait ChartPort: Send + Sync {
    fn render(
        &self,
        result: &CollectionResult,
        report: &AnalysisReport,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, DomainError>;
}

/// Progress sink for long-running work. Must be cheap; called from the collection loop.
pub trait ProgressPort: Send + Sync {
    fn report(&self, phase: RunPhase, progress: u8, message: &str);
}

/// Discards progress.
pub struct NoProgress;

impl ProgressPort for NoProgress {
    fn report(&self, _phase: RunPhase, _progress: u8, _message: &str) {}
}

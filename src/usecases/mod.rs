//! Application use cases. Orchestrate domain logic via ports.

pub mod analysis_service;
pub mod collect_service;
pub mod group_resolver;
pub mod pipeline_service;
pub mod run_status;

pub use analysis_service::{AnalysisOutput, AnalysisService, StoredReport};
pub use collect_service::{CollectService, CollectSettings};
pub use group_resolver::GroupResolver;
pub use pipeline_service::{PipelineService, RunOutcome, RunRequest};
pub use run_status::{RunGuard, StatusHandle};

//! Core domain layer. No external I/O dependencies.
//!
//! Entities, the date window, run status and the pure aggregation functions
//! live here. Dependencies flow inward.

pub mod analysis;
pub mod entities;
pub mod errors;
pub mod status;
pub mod window;

pub use analysis::{AnalysisOptions, AnalysisReport, build_report};
pub use entities::{
    CollectionResult, CollectionStats, Comment, GroupHandle, GroupInfo, NumericGroupId, Page,
    Post, StopReason,
};
pub use errors::DomainError;
pub use status::{RunPhase, RunStatus};
pub use window::{DatePreset, DateWindow, parse_day};

//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// Connection failure, non-2xx status or an unparseable body.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Well-formed response carrying a provider-side error.
    #[error("VK API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Group resolution failed: {0}")]
    Resolution(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Repository error: {0}")]
    Repo(String),

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Chart rendering failed: {0}")]
    Chart(String),

    #[error("UI error: {0}")]
    Ui(String),

    /// A collection run is already active; a second one is rejected, not queued.
    #[error("collection is already running")]
    AlreadyRunning,
}

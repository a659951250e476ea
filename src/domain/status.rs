//! Run status record polled by the dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Resolving,
    Feed,
    Comments,
    Saving,
    Analyzing,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatus {
    pub is_running: bool,
    pub phase: RunPhase,
    /// 0..=100
    pub progress: u8,
    pub message: String,
    pub last_update: Option<DateTime<Utc>>,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self {
            is_running: false,
            phase: RunPhase::Idle,
            progress: 0,
            message: String::new(),
            last_update: None,
        }
    }
}

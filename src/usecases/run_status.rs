//! Injectable run status: one record behind a mutex, written by the worker,
//! polled by the dashboard. At most one run is active per handle.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use crate::domain::{DomainError, RunPhase, RunStatus};
use crate::ports::ProgressPort;

#[derive(Clone, Default)]
pub struct StatusHandle {
    inner: Arc<Mutex<RunStatus>>,
}

impl StatusHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RunStatus> {
        // Poisoning is ignored: the record is plain data.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> RunStatus {
        self.lock().clone()
    }

    /// Claim the handle for a new run. Rejected, not queued, while another run is active.
    pub fn try_begin(&self, message: &str) -> Result<RunGuard, DomainError> {
        let mut status = self.lock();
        if status.is_running {
            return Err(DomainError::AlreadyRunning);
        }
        *status = RunStatus {
            is_running: true,
            phase: RunPhase::Resolving,
            progress: 0,
            message: message.to_string(),
            last_update: Some(Utc::now()),
        };
        Ok(RunGuard {
            handle: self.clone(),
            settled: false,
        })
    }

    fn settle(&self, phase: RunPhase, progress: Option<u8>, message: String) {
        let mut status = self.lock();
        status.is_running = false;
        status.phase = phase;
        if let Some(p) = progress {
            status.progress = p;
        }
        status.message = message;
        status.last_update = Some(Utc::now());
    }
}

impl ProgressPort for StatusHandle {
    fn report(&self, phase: RunPhase, progress: u8, message: &str) {
        let mut status = self.lock();
        status.phase = phase;
        status.progress = progress.min(100);
        status.message = message.to_string();
        status.last_update = Some(Utc::now());
    }
}

/// Held for the duration of one run. Dropping it unsettled marks the run failed.
pub struct RunGuard {
    handle: StatusHandle,
    settled: bool,
}

impl RunGuard {
    pub fn finish(mut self, message: &str) {
        self.settled = true;
        self.handle
            .settle(RunPhase::Done, Some(100), message.to_string());
    }

    pub fn fail(mut self, error: &DomainError) {
        self.settled = true;
        self.handle
            .settle(RunPhase::Failed, None, format!("error: {}", error));
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.settled {
            self.handle
                .settle(RunPhase::Failed, None, "run aborted".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_start_is_rejected_while_running() {
        let status = StatusHandle::new();
        let guard = status.try_begin("starting").unwrap();
        assert!(matches!(
            status.try_begin("again"),
            Err(DomainError::AlreadyRunning)
        ));
        guard.finish("done");
        assert!(status.try_begin("third").is_ok());
    }

    #[test]
    fn progress_updates_are_visible_to_pollers() {
        let status = StatusHandle::new();
        let poller = status.clone();
        let _guard = status.try_begin("starting").unwrap();
        status.report(RunPhase::Feed, 35, "fetched 50 posts");

        let snap = poller.snapshot();
        assert!(snap.is_running);
        assert_eq!(snap.phase, RunPhase::Feed);
        assert_eq!(snap.progress, 35);
        assert_eq!(snap.message, "fetched 50 posts");
    }

    #[test]
    fn finish_and_fail_release_the_handle() {
        let status = StatusHandle::new();
        status.try_begin("a").unwrap().finish("ok");
        let snap = status.snapshot();
        assert!(!snap.is_running);
        assert_eq!((snap.phase, snap.progress), (RunPhase::Done, 100));

        let guard = status.try_begin("b").unwrap();
        status.report(RunPhase::Feed, 20, "x");
        guard.fail(&DomainError::Transport("boom".into()));
        let snap = status.snapshot();
        assert_eq!(snap.phase, RunPhase::Failed);
        assert_eq!(snap.progress, 20);
        assert!(snap.message.contains("boom"));
    }

    #[test]
    fn dropped_guard_marks_run_failed() {
        let status = StatusHandle::new();
        drop(status.try_begin("a").unwrap());
        let snap = status.snapshot();
        assert!(!snap.is_running);
        assert_eq!(snap.phase, RunPhase::Failed);
    }
}

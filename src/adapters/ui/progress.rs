//! Terminal progress bar for foreground runs.

use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::RunPhase;
use crate::ports::ProgressPort;

const TEMPLATE: &str = "{spinner:.cyan} [{bar:40.cyan/blue}] {pos:>3}% {msg}";

/// Percentage bar driven by pipeline progress reports.
pub struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self { bar }
    }

    /// Bar that draws nowhere.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Default for CliProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressPort for CliProgress {
    fn report(&self, phase: RunPhase, progress: u8, message: &str) {
        match phase {
            RunPhase::Done => self.bar.finish_with_message(message.to_string()),
            RunPhase::Failed => self.bar.abandon_with_message(message.to_string()),
            _ => {
                self.bar.set_position(u64::from(progress.min(100)));
                self.bar.set_message(message.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_reported_progress() {
        let p = CliProgress::hidden();
        p.report(RunPhase::Feed, 35, "fetched 100 posts");
        assert_eq!(p.position(), 35);
        p.report(RunPhase::Comments, 250, "clamped");
        assert_eq!(p.position(), 100);
    }

    #[test]
    fn failure_keeps_last_position() {
        let p = CliProgress::hidden();
        p.report(RunPhase::Saving, 80, "saving");
        p.report(RunPhase::Failed, 0, "disk full");
        assert_eq!(p.position(), 80);
    }
}

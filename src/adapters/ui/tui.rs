//! Implements InputPort. Inquire-based main menu.
//!
//! Collect / analyze latest / dashboard / exit. Escape or Ctrl+C in a
//! sub-prompt returns to the menu; in the menu itself it exits.

use std::fmt;

use async_trait::async_trait;
use chrono::Utc;
use inquire::ui::{Color, RenderConfig, Styled};
use inquire::{Confirm, CustomType, InquireError, Select, Text};
use tracing::warn;

use crate::adapters::ui::progress::CliProgress;
use crate::adapters::web::{self, AppState};
use crate::domain::{DatePreset, DateWindow, DomainError, GroupHandle, parse_day};
use crate::ports::InputPort;
use crate::usecases::{AnalysisOutput, RunOutcome, RunRequest};

/// Prompt styling shared by every inquire prompt.
pub fn apply_theme() {
    let config = RenderConfig::default()
        .with_prompt_prefix(Styled::new("›").with_fg(Color::LightCyan))
        .with_highlighted_option_prefix(Styled::new("➤").with_fg(Color::LightBlue))
        .with_answered_prompt_prefix(Styled::new("✓").with_fg(Color::LightGreen));
    inquire::set_global_render_config(config);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    Collect,
    AnalyzeLatest,
    Dashboard,
    Exit,
}

impl MenuItem {
    const ALL: [MenuItem; 4] = [
        MenuItem::Collect,
        MenuItem::AnalyzeLatest,
        MenuItem::Dashboard,
        MenuItem::Exit,
    ];
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MenuItem::Collect => "Collect posts and analyze",
            MenuItem::AnalyzeLatest => "Re-analyze latest saved run",
            MenuItem::Dashboard => "Start web dashboard",
            MenuItem::Exit => "Exit",
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum PeriodChoice {
    Preset(DatePreset),
    Custom,
}

impl fmt::Display for PeriodChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodChoice::Preset(p) => fmt::Display::fmt(p, f),
            PeriodChoice::Custom => f.write_str("Custom dates"),
        }
    }
}

fn period_choices() -> Vec<PeriodChoice> {
    DatePreset::ALL
        .into_iter()
        .map(PeriodChoice::Preset)
        .chain(std::iter::once(PeriodChoice::Custom))
        .collect()
}

/// Escape/Ctrl+C become `None`; other prompt failures are errors.
fn answered<T>(result: Result<T, InquireError>) -> Result<Option<T>, DomainError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(DomainError::Ui(e.to_string())),
    }
}

/// Blank input is an open bound.
fn optional_day(raw: &str) -> Result<Option<chrono::NaiveDate>, DomainError> {
    let raw = raw.trim();
    if raw.is_empty() {
        Ok(None)
    } else {
        parse_day(raw).map(Some)
    }
}

/// TUI adapter. Owns the dashboard state so the menu can serve it too.
pub struct TuiInputPort {
    state: AppState,
    bind_addr: String,
}

impl TuiInputPort {
    pub fn new(state: AppState, bind_addr: impl Into<String>) -> Self {
        Self {
            state,
            bind_addr: bind_addr.into(),
        }
    }

    fn ask_window(&self) -> Result<Option<DateWindow>, DomainError> {
        let offset = self.state.defaults.utc_offset;
        let Some(choice) = answered(Select::new("Period:", period_choices()).prompt())? else {
            return Ok(None);
        };
        match choice {
            PeriodChoice::Preset(preset) => {
                let today = Utc::now().with_timezone(&offset).date_naive();
                Ok(Some(preset.window(today, offset)))
            }
            PeriodChoice::Custom => {
                let Some(from) = answered(
                    Text::new("From (YYYY-MM-DD, blank for open):").prompt(),
                )?
                else {
                    return Ok(None);
                };
                let Some(to) =
                    answered(Text::new("To (YYYY-MM-DD, blank for open):").prompt())?
                else {
                    return Ok(None);
                };
                DateWindow::from_dates(optional_day(&from)?, optional_day(&to)?, offset).map(Some)
            }
        }
    }

    /// Gathers a run request; `None` if the user backed out.
    fn ask_request(&self) -> Result<Option<RunRequest>, DomainError> {
        let defaults = &self.state.defaults;
        let Some(group) = answered(
            Text::new("Group (short name or numeric id):")
                .with_default(&defaults.group)
                .prompt(),
        )?
        else {
            return Ok(None);
        };
        let Some(window) = self.ask_window()? else {
            return Ok(None);
        };
        let Some(max_posts) = answered(
            CustomType::<usize>::new("Max posts:")
                .with_default(defaults.max_posts)
                .with_error_message("enter a positive number")
                .prompt(),
        )?
        else {
            return Ok(None);
        };
        let Some(include_comments) = answered(
            Confirm::new("Collect comments?")
                .with_default(true)
                .prompt(),
        )?
        else {
            return Ok(None);
        };

        Ok(Some(RunRequest {
            access_token: None,
            group: GroupHandle::new(group.trim()),
            max_posts: max_posts.max(1),
            include_comments,
            window,
        }))
    }

    async fn collect(&self) -> Result<(), DomainError> {
        let Some(request) = self.ask_request()? else {
            return Ok(());
        };
        println!("Collecting {} ({})", request.group, request.window);
        let progress = CliProgress::new();
        match self.state.pipeline.run(request, &progress).await {
            Ok(outcome) => print_outcome(&outcome),
            Err(e) => println!("Collection failed: {}", e),
        }
        Ok(())
    }

    async fn analyze_latest(&self) {
        match self.state.pipeline.analyze_saved(None).await {
            Ok(out) => print_analysis(&out),
            Err(e) => println!("Analysis failed: {}", e),
        }
    }

    async fn dashboard(&self) -> Result<(), DomainError> {
        println!(
            "Dashboard on http://{} (Ctrl+C to return to the menu)",
            self.bind_addr
        );
        web::serve(self.state.clone(), &self.bind_addr, web::shutdown_signal()).await
    }
}

pub fn print_outcome(outcome: &RunOutcome) {
    let stats = &outcome.stats;
    println!(
        "Saved {} posts in period ({} fetched, stopped: {:?})",
        stats.posts_in_period, stats.raw_fetched, stats.stop_reason
    );
    if stats.failed_comment_fetches > 0 {
        println!(
            "  {} posts had comment fetch failures",
            stats.failed_comment_fetches
        );
    }
    println!("  data: {}", outcome.saved.json.display());
    for csv in [&outcome.saved.posts_csv, &outcome.saved.comments_csv]
        .into_iter()
        .flatten()
    {
        println!("  table: {}", csv.display());
    }
    print_analysis(&outcome.analysis);
}

pub fn print_analysis(out: &AnalysisOutput) {
    let stats = &out.stored.report.basic_statistics;
    println!(
        "Report for {}: {} posts, {} comments, avg likes {:.1}",
        out.stored.report.group_name,
        stats.total_posts,
        stats.total_comments,
        stats.engagement.avg_likes_per_post
    );
    println!("  report: {}", out.report_path.display());
    println!("  digest: {}", out.digest_path.display());
    for chart in &out.charts {
        println!("  chart: {}", chart.display());
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        loop {
            let Some(item) = answered(Select::new("What next?", MenuItem::ALL.to_vec()).prompt())?
            else {
                return Ok(());
            };
            match item {
                MenuItem::Collect => self.collect().await?,
                MenuItem::AnalyzeLatest => self.analyze_latest().await,
                MenuItem::Dashboard => {
                    if let Err(e) = self.dashboard().await {
                        warn!(error = %e, "dashboard stopped");
                        println!("Dashboard error: {}", e);
                    }
                }
                MenuItem::Exit => return Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_prompt_is_not_an_error() {
        assert_eq!(
            answered::<u8>(Err(InquireError::OperationCanceled)).unwrap(),
            None
        );
        assert_eq!(
            answered::<u8>(Err(InquireError::OperationInterrupted)).unwrap(),
            None
        );
        assert!(matches!(
            answered::<u8>(Err(InquireError::NotTTY)),
            Err(DomainError::Ui(_))
        ));
    }

    #[test]
    fn blank_custom_date_is_open() {
        assert_eq!(optional_day("  ").unwrap(), None);
        assert!(optional_day("2024-03-01").unwrap().is_some());
        assert!(optional_day("March").is_err());
    }

    #[test]
    fn custom_period_is_offered_last() {
        let choices = period_choices();
        assert_eq!(choices.len(), DatePreset::ALL.len() + 1);
        assert!(matches!(choices.last(), Some(PeriodChoice::Custom)));
    }
}

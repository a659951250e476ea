//! Implements ChartPort with plotters' SVG backend.
//!
//! Four charts per run, each skipped (and any stale copy removed) when its data is empty:
//! `posting_patterns.svg`, `engagement_analysis.svg`, `top_keywords.svg`, `tech_terms.svg`.

use std::error::Error;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use tracing::{debug, info};

use crate::domain::analysis::{KeywordCount, TermCount};
use crate::domain::{AnalysisReport, CollectionResult, DomainError, Post};
use crate::ports::ChartPort;

type DrawResult = Result<(), Box<dyn Error>>;

const FONT: &str = "sans-serif";
const HISTOGRAM_BINS: usize = 20;
const MAX_BARS: usize = 15;

pub const POSTING_PATTERNS: &str = "posting_patterns.svg";
pub const ENGAGEMENT_ANALYSIS: &str = "engagement_analysis.svg";
pub const TOP_KEYWORDS: &str = "top_keywords.svg";
pub const TECH_TERMS: &str = "tech_terms.svg";

pub struct SvgChartRenderer {
    size: (u32, u32),
}

impl Default for SvgChartRenderer {
    fn default() -> Self {
        Self { size: (1200, 800) }
    }
}

impl SvgChartRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

fn remove_stale(path: &Path) {
    if std::fs::remove_file(path).is_ok() {
        debug!(path = %path.display(), "stale chart removed");
    }
}

impl ChartPort for SvgChartRenderer {
    fn render(
        &self,
        result: &CollectionResult,
        report: &AnalysisReport,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, DomainError> {
        let topics = &report.popular_topics;
        let has_posts = !result.posts.is_empty();

        let charts = [
            (POSTING_PATTERNS, has_posts),
            (ENGAGEMENT_ANALYSIS, has_posts),
            (TOP_KEYWORDS, !topics.post_keywords.is_empty()),
            (TECH_TERMS, !topics.tech_terms_mentions.is_empty()),
        ];

        let mut written = Vec::new();
        for (name, has_data) in charts {
            let path = out_dir.join(name);
            if !has_data {
                remove_stale(&path);
                continue;
            }
            let drawn = match name {
                POSTING_PATTERNS => posting_patterns(&path, self.size, report),
                ENGAGEMENT_ANALYSIS => engagement_analysis(&path, self.size, &result.posts),
                TOP_KEYWORDS => keyword_bars(&path, self.size, &topics.post_keywords),
                _ => term_bars(&path, self.size, &topics.tech_terms_mentions),
            };
            drawn.map_err(|e| DomainError::Chart(format!("{}: {}", name, e)))?;
            written.push(path);
        }
        info!(dir = %out_dir.display(), charts = written.len(), "charts rendered");
        Ok(written)
    }
}

/// Label for the bar at a segment centre; empty for any other tick.
fn segment_label(labels: &[String], v: &SegmentValue<i32>) -> String {
    match v {
        SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

fn posting_patterns(path: &Path, size: (u32, u32), report: &AnalysisReport) -> DrawResult {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let (upper, lower) = root.split_vertically((size.1 / 2) as i32);

    let weekdays = report.posting_patterns.weekday_series();
    let labels: Vec<String> = weekdays.iter().map(|(d, _)| d.to_string()).collect();
    let y_max = weekdays.iter().map(|(_, n)| *n).max().unwrap_or(0) + 1;
    {
        let mut chart = ChartBuilder::on(&upper)
            .caption("Posts by weekday", (FONT, 24))
            .margin(10)
            .x_label_area_size(35)
            .y_label_area_size(50)
            .build_cartesian_2d((0i32..7).into_segmented(), 0usize..y_max)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_label_formatter(&|v| segment_label(&labels, v))
            .y_desc("Posts")
            .draw()?;
        chart.draw_series(weekdays.iter().enumerate().map(|(i, (_, n))| {
            let i = i as i32;
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(i), 0), (SegmentValue::Exact(i + 1), *n)],
                BLUE.mix(0.7).filled(),
            );
            bar.set_margin(0, 0, 8, 8);
            bar
        }))?;
    }

    let hours: Vec<(u32, usize)> = (0..24)
        .map(|h| (h, report.posting_patterns.by_hour.get(&h).copied().unwrap_or(0)))
        .collect();
    let y_max = hours.iter().map(|(_, n)| *n).max().unwrap_or(0) + 1;
    {
        let mut chart = ChartBuilder::on(&lower)
            .caption("Posts by hour of day", (FONT, 24))
            .margin(10)
            .x_label_area_size(35)
            .y_label_area_size(50)
            .build_cartesian_2d(0u32..23u32, 0usize..y_max)?;
        chart
            .configure_mesh()
            .x_labels(24)
            .x_desc("Hour")
            .y_desc("Posts")
            .draw()?;
        chart.draw_series(LineSeries::new(hours.iter().copied(), &RED))?;
        chart.draw_series(
            hours
                .iter()
                .map(|&(h, n)| Circle::new((h, n), 3, RED.filled())),
        )?;
    }

    root.present()?;
    Ok(())
}

/// Equal-width bins over `[min, max]`; the maximum lands in the last bin.
fn histogram(values: &[f64], bins: usize) -> (f64, f64, Vec<usize>) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() {
        return (0.0, 1.0, vec![0; bins]);
    }
    if max <= min {
        max = min + 1.0;
    }
    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    (min, max, counts)
}

fn draw_histogram(
    area: &DrawingArea<SVGBackend<'_>, plotters::coord::Shift>,
    title: &str,
    values: &[f64],
    color: RGBColor,
) -> DrawResult {
    let (min, max, counts) = histogram(values, HISTOGRAM_BINS);
    let width = (max - min) / HISTOGRAM_BINS as f64;
    let y_max = counts.iter().copied().max().unwrap_or(0) + 1;

    let mut chart = ChartBuilder::on(area)
        .caption(title, (FONT, 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(45)
        .build_cartesian_2d(min..max, 0usize..y_max)?;
    chart.configure_mesh().y_desc("Posts").draw()?;
    chart.draw_series(counts.iter().enumerate().map(|(i, &n)| {
        let lo = min + width * i as f64;
        Rectangle::new([(lo, 0), (lo + width, n)], color.mix(0.7).filled())
    }))?;
    Ok(())
}

fn engagement_analysis(path: &Path, size: (u32, u32), posts: &[Post]) -> DrawResult {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let areas = root.split_evenly((2, 2));

    let likes: Vec<f64> = posts.iter().map(|p| p.likes as f64).collect();
    let comments: Vec<f64> = posts.iter().map(|p| p.comments as f64).collect();
    let reposts: Vec<f64> = posts.iter().map(|p| p.reposts as f64).collect();
    draw_histogram(&areas[0], "Likes per post", &likes, BLUE)?;
    draw_histogram(&areas[1], "Comments per post", &comments, GREEN)?;
    draw_histogram(&areas[2], "Reposts per post", &reposts, RED)?;

    let points: Vec<(f64, f64)> = posts
        .iter()
        .map(|p| (p.text_length() as f64, p.engagement() as f64))
        .collect();
    let x_max = points.iter().map(|(x, _)| *x).fold(0.0, f64::max) + 1.0;
    let y_max = points.iter().map(|(_, y)| *y).fold(0.0, f64::max) + 1.0;
    let mut chart = ChartBuilder::on(&areas[3])
        .caption("Text length vs engagement", (FONT, 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(45)
        .build_cartesian_2d(0f64..x_max, 0f64..y_max)?;
    chart
        .configure_mesh()
        .x_desc("Characters")
        .y_desc("Engagement")
        .draw()?;
    chart.draw_series(
        points
            .iter()
            .map(|&p| Circle::new(p, 3, MAGENTA.mix(0.5).filled())),
    )?;

    root.present()?;
    Ok(())
}

/// Horizontal bars, largest on top.
fn horizontal_bars(
    path: &Path,
    size: (u32, u32),
    title: &str,
    rows: &[(String, usize)],
    color: RGBColor,
) -> DrawResult {
    let rows = &rows[..rows.len().min(MAX_BARS)];
    // Row 0 is drawn at the bottom; reverse so the first entry sits on top.
    let labels: Vec<String> = rows.iter().rev().map(|(l, _)| l.clone()).collect();
    let x_max = rows.iter().map(|(_, n)| *n).max().unwrap_or(0) + 1;

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 24))
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(160)
        .build_cartesian_2d(0usize..x_max, (0i32..labels.len() as i32).into_segmented())?;
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(labels.len())
        .y_label_formatter(&|v| segment_label(&labels, v))
        .x_desc("Mentions")
        .draw()?;
    chart.draw_series(rows.iter().rev().enumerate().map(|(i, (_, n))| {
        let i = i as i32;
        let mut bar = Rectangle::new(
            [(0, SegmentValue::Exact(i)), (*n, SegmentValue::Exact(i + 1))],
            color.mix(0.7).filled(),
        );
        bar.set_margin(4, 4, 0, 0);
        bar
    }))?;

    root.present()?;
    Ok(())
}

fn keyword_bars(path: &Path, size: (u32, u32), words: &[KeywordCount]) -> DrawResult {
    let rows: Vec<(String, usize)> = words.iter().map(|k| (k.word.clone(), k.count)).collect();
    horizontal_bars(path, size, "Top keywords in posts", &rows, BLUE)
}

fn term_bars(path: &Path, size: (u32, u32), terms: &[TermCount]) -> DrawResult {
    let rows: Vec<(String, usize)> = terms.iter().map(|t| (t.term.clone(), t.count)).collect();
    horizontal_bars(path, size, "Technical term mentions", &rows, GREEN)
}

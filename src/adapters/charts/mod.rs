//! Chart rendering for analysis reports.

pub mod svg_renderer;

pub use svg_renderer::SvgChartRenderer;

//! Application configuration. API credential, endpoints, paths, throttling.

use chrono::FixedOffset;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::AnalysisOptions;

/// Provider maximum for wall.get / wall.getComments page size.
pub const MAX_BATCH_SIZE: u32 = 100;
pub const DEFAULT_API_BASE_URL: &str = "https://api.vk.com/method/";
pub const DEFAULT_API_VERSION: &str = "5.131";

#[derive(Debug, Deserialize, Default, Clone)]
pub struct AppConfig {
    /// VK access token. Read from VK_INSIGHT_ACCESS_TOKEN or VK_ACCESS_TOKEN.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,

    /// Run files (JSON + CSV).
    #[serde(default)]
    pub data_dir: Option<String>,
    /// Report JSON, digest and charts.
    #[serde(default)]
    pub results_dir: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Collection
    // ─────────────────────────────────────────────────────────────────────────
    #[serde(default)]
    pub batch_size: Option<u32>,
    /// Delay between feed batches (ms).
    #[serde(default)]
    pub feed_delay_ms: Option<u64>,
    /// Delay between per-post comment fetches (ms).
    #[serde(default)]
    pub comment_delay_ms: Option<u64>,
    #[serde(default)]
    pub max_posts: Option<usize>,
    #[serde(default)]
    pub max_comments_per_post: Option<usize>,
    #[serde(default)]
    pub default_group: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Analysis
    // ─────────────────────────────────────────────────────────────────────────
    #[serde(default)]
    pub keyword_min_len: Option<usize>,
    #[serde(default)]
    pub keyword_top_n: Option<usize>,
    /// Timezone for date windows and posting patterns, whole hours east of UTC.
    #[serde(default)]
    pub utc_offset_hours: Option<i32>,

    // ─────────────────────────────────────────────────────────────────────────
    // Dashboard
    // ─────────────────────────────────────────────────────────────────────────
    #[serde(default)]
    pub bind_addr: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("VK_INSIGHT"));
        if let Ok(path) = std::env::var("VK_INSIGHT_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    /// Access token from config or VK_ACCESS_TOKEN env.
    pub fn access_token(&self) -> Option<String> {
        let non_blank = |t: &String| !t.trim().is_empty();
        self.access_token
            .clone()
            .filter(non_blank)
            .or_else(|| std::env::var("VK_ACCESS_TOKEN").ok().filter(non_blank))
    }

    pub fn api_base_url_or_default(&self) -> String {
        self.api_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    pub fn api_version_or_default(&self) -> String {
        self.api_version
            .clone()
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string())
    }

    pub fn data_dir_or_default(&self) -> PathBuf {
        PathBuf::from(self.data_dir.as_deref().unwrap_or("./vk_data"))
    }

    pub fn results_dir_or_default(&self) -> PathBuf {
        PathBuf::from(self.results_dir.as_deref().unwrap_or("./analysis_results"))
    }

    /// Page size, clamped to 1..=100.
    pub fn batch_size_or_default(&self) -> u32 {
        self.batch_size
            .unwrap_or(MAX_BATCH_SIZE)
            .clamp(1, MAX_BATCH_SIZE)
    }

    /// Defaults to 500 ms.
    pub fn feed_delay(&self) -> Duration {
        Duration::from_millis(self.feed_delay_ms.unwrap_or(500))
    }

    /// Defaults to 300 ms.
    pub fn comment_delay(&self) -> Duration {
        Duration::from_millis(self.comment_delay_ms.unwrap_or(300))
    }

    pub fn max_posts_or_default(&self) -> usize {
        self.max_posts.unwrap_or(1000)
    }

    pub fn default_group_or_default(&self) -> String {
        self.default_group
            .clone()
            .unwrap_or_else(|| "big_asu".to_string())
    }

    /// Fixed offset from `utc_offset_hours`; out-of-range values fall back to UTC.
    pub fn utc_offset(&self) -> FixedOffset {
        let hours = self.utc_offset_hours.unwrap_or(0);
        hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| AnalysisOptions::default().utc_offset)
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        let defaults = AnalysisOptions::default();
        AnalysisOptions {
            min_word_len: self.keyword_min_len.unwrap_or(defaults.min_word_len),
            keyword_top_n: self.keyword_top_n.unwrap_or(defaults.keyword_top_n),
            utc_offset: self.utc_offset(),
            ..defaults
        }
    }

    pub fn bind_addr_or_default(&self) -> String {
        self.bind_addr
            .clone()
            .unwrap_or_else(|| "0.0.0.0:5000".to_string())
    }
}

//! Wiring & DI. Entry point: bootstrap adapters, inject into services, dispatch the command.
//! No business logic here.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use vk_insight::adapters::charts::SvgChartRenderer;
use vk_insight::adapters::persistence::JsonResultStore;
use vk_insight::adapters::ui::{self, CliProgress, TuiInputPort};
use vk_insight::adapters::vk::VkGatewayFactory;
use vk_insight::adapters::web::{self, AppState, RunDefaults};
use vk_insight::domain::{DateWindow, GroupHandle, parse_day};
use vk_insight::ports::InputPort;
use vk_insight::shared::config::AppConfig;
use vk_insight::usecases::{
    AnalysisService, CollectSettings, PipelineService, RunRequest, StatusHandle,
};

#[derive(Parser)]
#[command(name = "vk-insight", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect a group's wall, save it and analyze it
    Collect {
        /// Short name or numeric id; defaults to the configured group
        #[arg(long, short)]
        group: Option<String>,
        #[arg(long)]
        max_posts: Option<usize>,
        /// First day to keep (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Last day to keep, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        no_comments: bool,
    },
    /// Re-analyze a saved run file (latest by default)
    Analyze {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Serve the web dashboard
    Serve {
        /// Listen address, e.g. 127.0.0.1:5000
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    let cli = Cli::parse();
    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "config could not be loaded; using defaults");
        AppConfig::default()
    });

    let state = build_state(&cfg);

    match cli.command {
        Some(Commands::Collect {
            group,
            max_posts,
            from,
            to,
            no_comments,
        }) => {
            let day = |raw: Option<String>| raw.map(|s| parse_day(&s)).transpose();
            let window = DateWindow::from_dates(day(from)?, day(to)?, cfg.utc_offset())?;
            let request = RunRequest {
                access_token: None,
                group: GroupHandle::new(group.unwrap_or_else(|| cfg.default_group_or_default())),
                max_posts: max_posts.unwrap_or_else(|| cfg.max_posts_or_default()),
                include_comments: !no_comments,
                window,
            };
            info!(group = %request.group, window = %request.window, "collect");
            let outcome = state
                .pipeline
                .run(request, &CliProgress::new())
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            ui::tui::print_outcome(&outcome);
        }
        Some(Commands::Analyze { file }) => {
            let out = state
                .pipeline
                .analyze_saved(file)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            ui::tui::print_analysis(&out);
        }
        Some(Commands::Serve { bind }) => {
            let addr = bind.unwrap_or_else(|| cfg.bind_addr_or_default());
            web::serve(state, &addr, web::shutdown_signal())
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
        }
        None => {
            ui::init_ui();
            let input_port: Arc<dyn InputPort> =
                Arc::new(TuiInputPort::new(state, cfg.bind_addr_or_default()));
            input_port
                .run()
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
        }
    }

    Ok(())
}

/// Adapters and services shared by every command.
fn build_state(cfg: &AppConfig) -> AppState {
    let data_dir = cfg.data_dir_or_default();
    let results_dir = cfg.results_dir_or_default();
    info!(
        data = %data_dir.display(),
        results = %results_dir.display(),
        api = %cfg.api_base_url_or_default(),
        version = %cfg.api_version_or_default(),
        "storage and API endpoints"
    );

    let token = cfg.access_token();
    if token.is_none() {
        warn!("no access token configured (VK_INSIGHT_ACCESS_TOKEN or VK_ACCESS_TOKEN); dashboard requests must supply one");
    }

    let factory = Arc::new(VkGatewayFactory::new(
        cfg.api_base_url_or_default(),
        cfg.api_version_or_default(),
    ));
    let store = Arc::new(JsonResultStore::new(data_dir));
    let analysis = Arc::new(AnalysisService::new(
        Arc::new(SvgChartRenderer::new()),
        results_dir,
        cfg.analysis_options(),
    ));
    let settings = CollectSettings {
        batch_size: cfg.batch_size_or_default(),
        feed_delay: cfg.feed_delay(),
        comment_delay: cfg.comment_delay(),
        max_comments_per_post: cfg.max_comments_per_post,
    };
    info!(
        batch_size = settings.batch_size,
        feed_delay_ms = settings.feed_delay.as_millis() as u64,
        comment_delay_ms = settings.comment_delay.as_millis() as u64,
        "collection rate limits"
    );

    let pipeline = PipelineService::new(
        factory,
        store,
        analysis,
        StatusHandle::new(),
        settings,
        token,
    );

    AppState {
        pipeline: Arc::new(pipeline),
        defaults: RunDefaults {
            group: cfg.default_group_or_default(),
            max_posts: cfg.max_posts_or_default(),
            utc_offset: cfg.utc_offset(),
        },
    }
}

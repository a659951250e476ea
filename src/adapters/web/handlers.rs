use std::path::Path;

use axum::{
    Json,
    extract::{Path as UrlPath, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{DateWindow, GroupHandle, RunStatus, parse_day};
use crate::usecases::{RunRequest, StoredReport};

use super::{ApiError, AppState, RunDefaults};

const INDEX_HTML: &str = include_str!("../../../assets/index.html");

pub(super) async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub(super) async fn status(State(state): State<AppState>) -> Json<RunStatus> {
    Json(state.pipeline.status().snapshot())
}

/// Body of `POST /api/start_parsing`. Every field is optional.
#[derive(Deserialize, Default)]
pub(super) struct StartParsingBody {
    access_token: Option<String>,
    group_id: Option<String>,
    max_posts: Option<usize>,
    start_date: Option<String>,
    end_date: Option<String>,
    include_comments: Option<bool>,
}

impl StartParsingBody {
    fn into_request(self, defaults: &RunDefaults) -> Result<RunRequest, ApiError> {
        let day = |raw: Option<String>| {
            raw.filter(|s| !s.trim().is_empty())
                .map(|s| parse_day(&s))
                .transpose()
        };
        let window = DateWindow::from_dates(
            day(self.start_date)?,
            day(self.end_date)?,
            defaults.utc_offset,
        )?;

        let max_posts = self.max_posts.unwrap_or(defaults.max_posts);
        if max_posts == 0 {
            return Err(ApiError::bad_request("max_posts must be positive"));
        }

        let group = self
            .group_id
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| defaults.group.clone());

        Ok(RunRequest {
            access_token: self.access_token,
            group: GroupHandle::new(group),
            max_posts,
            include_comments: self.include_comments.unwrap_or(true),
            window,
        })
    }
}

#[derive(Debug, Serialize)]
pub(super) struct Accepted {
    message: &'static str,
}

pub(super) async fn start_parsing(
    State(state): State<AppState>,
    Json(body): Json<StartParsingBody>,
) -> Result<(StatusCode, Json<Accepted>), ApiError> {
    let request = body.into_request(&state.defaults)?;
    info!(
        group = %request.group,
        max_posts = request.max_posts,
        window = %request.window,
        "collection requested from dashboard"
    );
    state.pipeline.spawn(request)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(Accepted {
            message: "collection started",
        }),
    ))
}

pub(super) async fn analysis_report(
    State(state): State<AppState>,
) -> Result<Json<StoredReport>, ApiError> {
    state
        .pipeline
        .analysis()
        .latest_report()
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("no analysis report yet; run a collection first"))
}

#[derive(Debug, Serialize)]
pub(super) struct Visualization {
    name: String,
    title: String,
    url: String,
}

fn chart_title(name: &str) -> String {
    let stem = name.strip_suffix(".svg").unwrap_or(name);
    stem.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub(super) async fn visualizations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Visualization>>, ApiError> {
    let charts = state.pipeline.analysis().list_charts().await?;
    Ok(Json(
        charts
            .into_iter()
            .map(|name| Visualization {
                title: chart_title(&name),
                url: format!("/api/image/{}", name),
                name,
            })
            .collect(),
    ))
}

#[derive(Debug, Serialize)]
pub(super) struct DataFile {
    name: String,
    size: u64,
    modified: DateTime<Utc>,
    download_url: String,
}

pub(super) async fn data_files(
    State(state): State<AppState>,
) -> Result<Json<Vec<DataFile>>, ApiError> {
    let entries = state.pipeline.store().list().await?;
    Ok(Json(
        entries
            .into_iter()
            .map(|e| DataFile {
                download_url: format!("/api/download/{}", e.name),
                name: e.name,
                size: e.size,
                modified: e.modified,
            })
            .collect(),
    ))
}

/// Rejects names that could leave the served directory.
fn plain_name(name: &str) -> Result<&str, ApiError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(ApiError::bad_request(format!("invalid file name '{}'", name)));
    }
    Ok(name)
}

async fn read_file(path: &Path, name: &str) -> Result<Vec<u8>, ApiError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::not_found(format!("file '{}' not found", name)))
        }
        Err(e) => Err(ApiError::internal(format!("read '{}': {}", name, e))),
    }
}

pub(super) async fn image(
    State(state): State<AppState>,
    UrlPath(filename): UrlPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let name = plain_name(&filename)?;
    if !name.ends_with(".svg") {
        return Err(ApiError::not_found(format!("image '{}' not found", name)));
    }
    let path = state.pipeline.analysis().results_dir().join(name);
    let bytes = read_file(&path, name).await?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], bytes))
}

fn content_type(name: &str) -> &'static str {
    match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some("json") => "application/json",
        Some("csv") => "text/csv; charset=utf-8",
        _ => "application/octet-stream",
    }
}

pub(super) async fn download(
    State(state): State<AppState>,
    UrlPath(filename): UrlPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let name = plain_name(&filename)?;
    let path = state.pipeline.store().path_of(name);
    let bytes = read_file(&path, name).await?;
    Ok((
        [
            (header::CONTENT_TYPE, content_type(name).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", name),
            ),
        ],
        bytes,
    ))
}

//! Implements ResultStorePort with flat files in one data directory.
//!
//! Each run writes `{group}_data_{ts}.json` plus optional
//! `{group}_posts_{ts}.csv` / `{group}_comments_{ts}.csv`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info};

use crate::adapters::persistence::csv_export;
use crate::domain::{CollectionResult, DomainError, GroupHandle};
use crate::ports::{DataFileEntry, ResultStorePort, SavedRun};
use crate::shared::fs::write_atomic;

const RUN_MARKER: &str = "_data_";

pub struct JsonResultStore {
    dir: PathBuf,
}

impl JsonResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File-name prefix for a run: screen name when known, `club{id}` otherwise.
    fn prefix(result: &CollectionResult) -> String {
        let raw = result
            .group
            .screen_name
            .clone()
            .unwrap_or_else(|| format!("club{}", result.group.id));
        GroupHandle::new(raw).slug()
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), DomainError> {
        write_atomic(path, bytes)
            .await
            .map_err(|e| DomainError::Repo(format!("write {}: {}", path.display(), e)))
    }
}

fn is_run_file(name: &str) -> bool {
    name.ends_with(".json") && name.contains(RUN_MARKER)
}

#[async_trait::async_trait]
impl ResultStorePort for JsonResultStore {
    async fn save(&self, result: &CollectionResult) -> Result<SavedRun, DomainError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| DomainError::Repo(format!("create data dir: {}", e)))?;

        let prefix = Self::prefix(result);
        let ts = result.collected_at.format("%Y%m%d_%H%M%S");

        let json = serde_json::to_vec_pretty(result).map_err(|e| DomainError::Repo(e.to_string()))?;
        let json_path = self.dir.join(format!("{}{}{}.json", prefix, RUN_MARKER, ts));
        self.write(&json_path, &json).await?;

        let mut saved = SavedRun {
            json: json_path,
            ..Default::default()
        };

        if !result.posts.is_empty() {
            let bytes = csv_export::posts_to_csv(&result.posts)
                .map_err(|e| DomainError::Repo(format!("posts csv: {}", e)))?;
            let path = self.dir.join(format!("{}_posts_{}.csv", prefix, ts));
            self.write(&path, &bytes).await?;
            saved.posts_csv = Some(path);
        }
        if !result.comments.is_empty() {
            let bytes = csv_export::comments_to_csv(&result.comments)
                .map_err(|e| DomainError::Repo(format!("comments csv: {}", e)))?;
            let path = self.dir.join(format!("{}_comments_{}.csv", prefix, ts));
            self.write(&path, &bytes).await?;
            saved.comments_csv = Some(path);
        }

        info!(
            path = %saved.json.display(),
            posts = result.total_posts(),
            comments = result.total_comments(),
            "run saved"
        );
        Ok(saved)
    }

    async fn load(&self, path: &Path) -> Result<CollectionResult, DomainError> {
        let text = fs::read_to_string(path)
            .await
            .map_err(|e| DomainError::Repo(format!("read {}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| DomainError::Repo(format!("parse {}: {}", path.display(), e)))
    }

    async fn list(&self) -> Result<Vec<DataFileEntry>, DomainError> {
        let mut entries = Vec::new();
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.dir.display(), "data dir does not exist yet");
                return Ok(entries);
            }
            Err(e) => return Err(DomainError::Repo(format!("list data dir: {}", e))),
        };

        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_run_file(&name) {
                continue;
            }
            let meta = entry
                .metadata()
                .await
                .map_err(|e| DomainError::Repo(format!("stat {}: {}", name, e)))?;
            let modified = meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_default();
            entries.push(DataFileEntry {
                name,
                size: meta.len(),
                modified,
            });
        }

        // Newest first; names embed the timestamp, so they break ties.
        entries.sort_by(|a, b| b.modified.cmp(&a.modified).then(b.name.cmp(&a.name)));
        Ok(entries)
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

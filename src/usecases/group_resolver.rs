//! Maps a user-typed group handle to its numeric id and metadata.
//!
//! Lookups are cached for the lifetime of the resolver (one collection session).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::{DomainError, GroupHandle, GroupInfo, NumericGroupId};
use crate::ports::GroupGateway;

pub struct GroupResolver {
    gateway: Arc<dyn GroupGateway>,
    cache: Mutex<HashMap<String, GroupInfo>>,
}

impl GroupResolver {
    pub fn new(gateway: Arc<dyn GroupGateway>) -> Self {
        Self {
            gateway,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Numeric handles are returned as-is without a network call.
    pub async fn resolve(&self, handle: &GroupHandle) -> Result<NumericGroupId, DomainError> {
        if handle.as_str().is_empty() {
            return Err(DomainError::Resolution("group identifier is empty".to_string()));
        }
        if let Some(id) = handle.as_numeric() {
            return Ok(id);
        }
        if let Some(info) = self.cached(handle).await {
            return Ok(info.id);
        }
        match self.gateway.group_info(handle.as_str()).await? {
            Some(info) => {
                debug!(group = %handle, id = %info.id, name = %info.name, "group resolved");
                self.remember(handle, &info).await;
                Ok(info.id)
            }
            None => Err(DomainError::Resolution(format!(
                "group '{}' not found",
                handle
            ))),
        }
    }

    /// Metadata for an already resolved group. Best effort: a failed or empty
    /// lookup yields a bare record for `id`.
    pub async fn describe(&self, handle: &GroupHandle, id: NumericGroupId) -> GroupInfo {
        if let Some(info) = self.cached(handle).await {
            return info;
        }
        let info = match self.gateway.group_info(&id.to_string()).await {
            Ok(Some(info)) => info,
            Ok(None) => GroupInfo::bare(id),
            Err(e) => {
                warn!(group = %handle, error = %e, "group lookup failed; using bare id");
                GroupInfo::bare(id)
            }
        };
        self.remember(handle, &info).await;
        info
    }

    async fn cached(&self, handle: &GroupHandle) -> Option<GroupInfo> {
        self.cache.lock().await.get(handle.as_str()).cloned()
    }

    async fn remember(&self, handle: &GroupHandle, info: &GroupInfo) {
        self.cache
            .lock()
            .await
            .insert(handle.as_str().to_string(), info.clone());
    }
}

//! Implements GroupGateway on top of any ApiPort.

use std::sync::Arc;

use crate::adapters::vk::client::VkApiClient;
use crate::adapters::vk::mapper;
use crate::domain::{Comment, DomainError, GroupInfo, NumericGroupId, Page, Post};
use crate::ports::{ApiPort, GatewayFactory, GroupGateway};

const GROUP_FIELDS: &str = "members_count,description,status,activity,site";

pub struct VkGateway {
    api: Arc<dyn ApiPort>,
}

impl VkGateway {
    pub fn new(api: Arc<dyn ApiPort>) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl GroupGateway for VkGateway {
    async fn group_info(&self, handle: &str) -> Result<Option<GroupInfo>, DomainError> {
        let value = self
            .api
            .call(
                "groups.getById",
                &[
                    ("group_ids", handle.to_string()),
                    ("fields", GROUP_FIELDS.to_string()),
                ],
            )
            .await?;
        mapper::group_info(value)
    }

    async fn wall_page(
        &self,
        group: NumericGroupId,
        offset: u32,
        count: u32,
    ) -> Result<Page<Post>, DomainError> {
        let value = self
            .api
            .call(
                "wall.get",
                &[
                    ("owner_id", group.owner_id().to_string()),
                    ("count", count.to_string()),
                    ("offset", offset.to_string()),
                    ("filter", "all".to_string()),
                ],
            )
            .await?;
        mapper::posts_page(value)
    }

    async fn comments_page(
        &self,
        group: NumericGroupId,
        post_id: i64,
        offset: u32,
        count: u32,
    ) -> Result<Page<Comment>, DomainError> {
        let value = self
            .api
            .call(
                "wall.getComments",
                &[
                    ("owner_id", group.owner_id().to_string()),
                    ("post_id", post_id.to_string()),
                    ("count", count.to_string()),
                    ("offset", offset.to_string()),
                    ("sort", "asc".to_string()),
                    ("need_likes", "1".to_string()),
                ],
            )
            .await?;
        mapper::comments_page(value, post_id)
    }
}

/// Builds a [`VkGateway`] per credential, sharing one HTTP connection pool.
pub struct VkGatewayFactory {
    http: reqwest::Client,
    base_url: String,
    version: String,
}

impl VkGatewayFactory {
    pub fn new(base_url: String, version: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            version,
        }
    }
}

impl GatewayFactory for VkGatewayFactory {
    fn connect(&self, access_token: &str) -> Arc<dyn GroupGateway> {
        let api = VkApiClient::with_client(
            self.http.clone(),
            self.base_url.clone(),
            access_token.to_string(),
            self.version.clone(),
        );
        Arc::new(VkGateway::new(Arc::new(api)))
    }
}

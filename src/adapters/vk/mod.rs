//! VK API adapter: HTTP client, payload mapping, typed gateway.

pub mod client;
pub mod gateway;
pub mod mapper;

pub use client::VkApiClient;
pub use gateway::{VkGateway, VkGatewayFactory};

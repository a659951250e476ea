//! vk-insight: VK group wall collection, engagement analysis and a small dashboard,
//! laid out as a hexagonal architecture.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;

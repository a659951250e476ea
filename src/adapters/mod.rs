//! Infrastructure adapters. Implement outbound ports and drive inbound ones.
//!
//! VK API, flat-file storage, SVG charts, the dashboard and the terminal UI.
//! Infrastructure errors are mapped to DomainError here.

pub mod charts;
pub mod persistence;
pub mod ui;
pub mod vk;
pub mod web;

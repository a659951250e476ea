//! Cross-cutting helpers shared by adapters and use cases.

pub mod config;
pub mod fs;

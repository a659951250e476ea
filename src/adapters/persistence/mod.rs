//! Flat-file persistence: JSON run files and CSV tables.

pub mod csv_export;
pub mod json_store;

pub use json_store::JsonResultStore;

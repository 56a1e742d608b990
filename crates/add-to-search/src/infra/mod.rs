//! Infrastructure adapters for configuration and file-backed documents.

pub mod config;
pub mod host;

//! Timestamp comment import - shared modules for the CLI binaries.

pub mod classify;
pub mod config;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod packager;
pub mod pipeline;
pub mod progress;
pub mod scoring;
pub mod search;
pub mod store;
pub mod video;

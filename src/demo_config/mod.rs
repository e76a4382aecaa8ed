//! Per-tenant demo configuration, fetched from the widget backend

pub mod client;
pub mod messages;

pub use client::{ConfigSource, HttpConfigFetcher, DEFAULT_CONFIG_URL};
pub use messages::{DemoConfigResponse, ErrorBody};

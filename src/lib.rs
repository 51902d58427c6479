pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;

pub use services::census::{extract_banded, extract_flat, ExtractionResult};

// Application state
#[derive(Clone)]
pub struct AppState {
    config: config::Config,
    cache: services::cache::ReportCache,
    http: reqwest::Client,
}

impl AppState {
    pub fn new(config: config::Config) -> Self {
        let cache = services::cache::ReportCache::new(config.cache_capacity);
        Self {
            config,
            cache,
            http: reqwest::Client::new(),
        }
    }
}

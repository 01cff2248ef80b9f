use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::pipeline::LogoPipeline;
use crate::services::fetcher::ImageFetcher;
use crate::services::generator::ImageGenerator;
use crate::services::ideas::IdeaSource;
use crate::services::rate_limiter::RateLimiter;
use crate::services::storage::ObjectStore;

/// Shared handles for every request handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub storage: Arc<dyn ObjectStore>,
    pub fetcher: Arc<dyn ImageFetcher>,
    pub generator: Arc<ImageGenerator>,
    pub pipeline: Arc<LogoPipeline>,
    pub ideas: Arc<dyn IdeaSource>,
    pub limiter: Arc<dyn RateLimiter>,
}

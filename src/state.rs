use crate::config::Config;
use crate::sessions::SessionRegistry;

/// Shared application state available to all request handlers via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Config,
    pub registry: SessionRegistry,
}

impl AppState {
    /// Build the state with an empty registry sized from `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let registry = SessionRegistry::new(config.pool_limit);
        Self { config, registry }
    }
}

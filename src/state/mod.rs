use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::providers::{ConfiguredProviders, ProviderSet, ProviderSetupError};
use crate::core::session::SessionRegistry;

/// Application state that can be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    /// Calls currently connected to this process
    pub sessions: Arc<SessionRegistry>,
    /// Producers every session runs against, selected once at startup
    pub providers: Arc<dyn ProviderSet>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, ProviderSetupError> {
        let providers = Arc::new(ConfiguredProviders::from_config(&config)?);
        Ok(Self::with_providers(config, providers))
    }

    pub fn with_providers(config: ServerConfig, providers: Arc<dyn ProviderSet>) -> Arc<Self> {
        Arc::new(Self {
            config,
            sessions: Arc::new(SessionRegistry::new()),
            providers,
        })
    }
}

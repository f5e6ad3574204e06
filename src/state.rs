use crate::auth::{
    clock::{Clock, SystemClock},
    jwt::TokenService,
    password::Argon2Hasher,
    services::AuthService,
    store::CredentialStore,
};
use crate::config::AppConfig;
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: AuthService,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env().context("load configuration")?;
        Self::from_config(config)
    }

    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Builds the state with one empty credential store for the process.
    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let hasher = Argon2Hasher::new(&config.password)?;
        let credentials = CredentialStore::in_memory(hasher)?;
        let tokens = TokenService::new(&config.jwt, clock);
        Ok(Self {
            config: Arc::new(config),
            auth: AuthService::new(credentials, tokens),
        })
    }
}

use std::sync::Arc;

use parley_core::config::{AppConfig, ConfigError, LoadOptions};
use parley_nlu::{DialogflowEngine, NluEngine, NluError};
use thiserror::Error;
use tracing::info;

use crate::api::GatewayState;

pub struct Application {
    pub config: AppConfig,
    pub state: GatewayState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("engine client construction failed: {0}")]
    Engine(#[from] NluError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        project_id = %config.nlu.project_id,
        "starting gateway bootstrap"
    );

    let engine: Arc<dyn NluEngine> = Arc::new(DialogflowEngine::from_config(&config.nlu)?);
    info!(
        event_name = "system.bootstrap.engine_ready",
        language = %config.nlu.language,
        time_zone = %config.nlu.time_zone,
        "engine client constructed"
    );

    let state = GatewayState::new(engine, config.console.session_id.clone());
    Ok(Application { config, state })
}

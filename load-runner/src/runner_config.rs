use config::load_config;
use config::shared::LoadRunnerConfig;

use crate::error::{LoadRunnerError, LoadRunnerResult};

/// Loads and validates the load runner configuration.
pub fn load_runner_config() -> LoadRunnerResult<LoadRunnerConfig> {
    let config = load_config::<LoadRunnerConfig>().map_err(LoadRunnerError::config)?;
    config.validate().map_err(LoadRunnerError::config)?;

    Ok(config)
}

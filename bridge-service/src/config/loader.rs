//! Configuration loading from files and environment variables.

use config::{Config, Environment, File};

use crate::error::{ServiceError, ServiceResult};

use super::ServiceConfig;

/// Environment variable prefix, e.g. `FOUNDRY_BRIDGE__SERVER__PORT=8080`
const ENV_PREFIX: &str = "FOUNDRY_BRIDGE";

/// Load configuration from an optional `config.*` file and env vars
pub fn load_config() -> ServiceResult<ServiceConfig> {
    Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| ServiceError::Config {
            message: format!("Failed to build config: {}", e),
        })?
        .try_deserialize()
        .map_err(|e| ServiceError::Config {
            message: format!("Failed to deserialize config: {}", e),
        })
}

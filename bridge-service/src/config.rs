//! Service configuration.
//!
//! Everything here is read once at startup: an optional `config` file, then
//! `FOUNDRY_BRIDGE__*` environment variables on top.

use serde::Deserialize;
use std::time::Duration;

use crate::queries::QuerySettings;

mod loader;
mod static_config;

pub use loader::load_config;
pub use static_config::{
    BridgeConfig, HostConfig, MapGenerationConfig, ServerConfig, UploadsConfig,
};

/// Complete service configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub bridge: BridgeConfig,

    #[serde(default)]
    pub host: HostConfig,

    #[serde(default)]
    pub map_generation: MapGenerationConfig,

    #[serde(default)]
    pub uploads: UploadsConfig,
}

impl ServiceConfig {
    /// Socket address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Per-call host timeout; `None` waits for the reply or the session to drop
    pub fn host_call_timeout(&self) -> Option<Duration> {
        self.host
            .call_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// The subset of settings query handlers read
    pub fn query_settings(&self) -> QuerySettings {
        QuerySettings {
            module_id: self.bridge.module_id.clone(),
            map_quality: self.map_generation.quality.clone(),
            generated_maps_dir: self.uploads.generated_maps_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:8765");
        assert_eq!(config.host_call_timeout(), None);

        let settings = config.query_settings();
        assert_eq!(settings.module_id, "foundry-mcp-bridge");
        assert_eq!(settings.map_quality, "low");
        assert_eq!(settings.generated_maps_dir, "ai-generated-maps");
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: ServiceConfig = serde_json::from_value(serde_json::json!({
            "server": {"port": 9000},
            "host": {"call_timeout_secs": 30},
            "map_generation": {"quality": "high"}
        }))
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert_eq!(config.host_call_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.query_settings().map_quality, "high");
        assert_eq!(config.bridge.module_id, "foundry-mcp-bridge");
    }

    #[test]
    fn test_zero_timeout_means_unbounded() {
        let mut config = ServiceConfig::default();
        config.host.call_timeout_secs = Some(0);
        assert_eq!(config.host_call_timeout(), None);
    }
}

//! Configuration sections and their defaults.

use serde::Deserialize;

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Query namespace settings
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Dispatch keys are registered as `{module_id}.{query}`
    #[serde(default = "default_module_id")]
    pub module_id: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            module_id: default_module_id(),
        }
    }
}

/// Host session settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostConfig {
    /// Seconds to wait for a host reply. Unset (or 0) waits indefinitely.
    #[serde(default)]
    pub call_timeout_secs: Option<u64>,
}

/// Map generation backend settings
#[derive(Debug, Clone, Deserialize)]
pub struct MapGenerationConfig {
    #[serde(default = "default_map_quality")]
    pub quality: String,
}

impl Default for MapGenerationConfig {
    fn default() -> Self {
        Self {
            quality: default_map_quality(),
        }
    }
}

/// Upload destinations
#[derive(Debug, Clone, Deserialize)]
pub struct UploadsConfig {
    /// Folder under `worlds/{world_id}/` receiving generated maps
    #[serde(default = "default_generated_maps_dir")]
    pub generated_maps_dir: String,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            generated_maps_dir: default_generated_maps_dir(),
        }
    }
}

// ==================== Default Value Functions ====================

pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8765
}

pub(crate) fn default_module_id() -> String {
    "foundry-mcp-bridge".to_string()
}

pub(crate) fn default_map_quality() -> String {
    "low".to_string()
}

pub(crate) fn default_generated_maps_dir() -> String {
    "ai-generated-maps".to_string()
}

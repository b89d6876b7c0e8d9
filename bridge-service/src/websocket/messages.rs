//! WebSocket message types.
//!
//! Defines the formats exchanged with the Foundry module: the module
//! authenticates as a Foundry user, then answers `host_call` messages with
//! `host_result`.

use serde::{Deserialize, Serialize};

/// Messages sent from the Foundry module to the bridge
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Authenticate the connection with user and world information
    Auth {
        user_id: String,
        user_name: String,
        role: u8,
        #[serde(default)]
        world_id: Option<String>,
        #[serde(default)]
        foundry_version: Option<String>,
    },
    /// Keepalive ping
    Ping,
    /// Outcome of a host call; exactly one of `result`/`error` is expected
    HostResult {
        request_id: String,
        #[serde(default)]
        result: Option<serde_json::Value>,
        #[serde(default)]
        error: Option<String>,
    },
}

/// Messages sent from the bridge to the Foundry module
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Response to authentication attempt
    AuthResponse {
        success: bool,
        session_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Keepalive pong response
    Pong { timestamp: u64 },
    /// Ask the host to perform one facade operation
    HostCall {
        request_id: String,
        operation: String,
        args: serde_json::Value,
    },
    /// Error message
    Error {
        code: String,
        message: String,
        recoverable: bool,
    },
}

//! WebSocket endpoint for the Foundry module.
//!
//! The module running inside Foundry VTT connects here, authenticates as a
//! Foundry user and then serves host calls issued by [`crate::host::RemoteHost`].

pub mod handlers;
pub mod manager;
pub mod messages;

pub use handlers::handle_ws_connection;
pub use manager::{ActiveSession, WebSocketManager};
pub use messages::{ClientMessage, ServerMessage};

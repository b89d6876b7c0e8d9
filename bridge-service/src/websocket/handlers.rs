//! WebSocket message handlers.
//!
//! Contains the logic for handling incoming WebSocket connections
//! and processing client messages.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::access::UserRole;
use crate::host::HostWorld;
use crate::service::BridgeService;

use super::manager::HostIdentity;
use super::messages::{ClientMessage, ServerMessage};

/// Handle a WebSocket connection
///
/// Registers the connection, forwards outgoing messages from the
/// connection's channel and processes incoming ones until the socket closes.
/// Host calls still waiting on this session fail once it is gone.
pub async fn handle_ws_connection(socket: WebSocket, service: Arc<BridgeService>) {
    let session_id = uuid::Uuid::new_v4().to_string();
    info!(session_id = %session_id, "New WebSocket connection");

    let ws_manager = service.ws_manager();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<ServerMessage>();

    ws_manager.add_connection(session_id.clone(), msg_tx);

    let session_id_clone = session_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_tx.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to serialize WebSocket message");
                }
            }
        }
        debug!(session_id = %session_id_clone, "WebSocket send task ended");
    });

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => {
                handle_client_message(&session_id, &text, &service);
            }
            Ok(Message::Binary(data)) => {
                // Try to parse binary as JSON text
                if let Ok(text) = String::from_utf8(data.to_vec()) {
                    handle_client_message(&session_id, &text, &service);
                }
            }
            Ok(Message::Ping(data)) => {
                debug!(session_id = %session_id, "Received ping: {:?}", data);
            }
            Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(session_id = %session_id, "WebSocket connection closed by client");
                break;
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    let user_name = ws_manager.user_name(&session_id);
    ws_manager.remove_connection(&session_id);
    let abandoned = service.remote_host().abandon_session(&session_id);
    if abandoned > 0 {
        warn!(
            session_id = %session_id,
            abandoned = abandoned,
            "Host session closed with calls in flight"
        );
    }
    send_task.abort();
    info!(session_id = %session_id, user_name = ?user_name, "WebSocket connection closed");
}

/// Handle a client message
pub(crate) fn handle_client_message(session_id: &str, text: &str, service: &BridgeService) {
    let ws_manager = service.ws_manager();
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(
                session_id = %session_id,
                error = %e,
                text = %text,
                "Failed to parse client message"
            );
            ws_manager.send_to(
                session_id,
                ServerMessage::Error {
                    code: "parse_error".to_string(),
                    message: format!("Failed to parse message: {}", e),
                    recoverable: true,
                },
            );
            return;
        }
    };

    match msg {
        ClientMessage::Auth {
            user_id,
            user_name,
            role,
            world_id,
            foundry_version,
        } => {
            debug!(
                session_id = %session_id,
                user_id = %user_id,
                user_name = %user_name,
                role = role,
                world_id = ?world_id,
                "Processing auth message"
            );

            let role = UserRole::from_u8(role);
            ws_manager.authenticate(
                session_id,
                HostIdentity {
                    user_id: user_id.clone(),
                    user_name,
                    role,
                    world: HostWorld {
                        world_id,
                        foundry_version,
                    },
                },
            );

            ws_manager.send_to(
                session_id,
                ServerMessage::AuthResponse {
                    success: true,
                    session_id: session_id.to_string(),
                    message: None,
                },
            );

            info!(
                session_id = %session_id,
                user_id = %user_id,
                gm = role.is_gm(),
                "Host session authenticated"
            );
        }
        ClientMessage::Ping => {
            let timestamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0);

            ws_manager.send_to(session_id, ServerMessage::Pong { timestamp });
        }
        ClientMessage::HostResult {
            request_id,
            result,
            error,
        } => {
            debug!(
                session_id = %session_id,
                request_id = %request_id,
                failed = error.is_some(),
                "Received host result via WebSocket"
            );

            let reply = match error {
                Some(message) => Err(message),
                None => Ok(result.unwrap_or(serde_json::Value::Null)),
            };
            service.remote_host().resolve(&request_id, reply);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;

    #[test]
    fn test_auth_message_registers_host_session() {
        let service = BridgeService::new(ServiceConfig::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        service.ws_manager().add_connection("s1".to_string(), tx);

        handle_client_message(
            "s1",
            r#"{"type":"auth","user_id":"gm1","user_name":"GM","role":4,"world_id":"w1"}"#,
            &service,
        );

        assert!(matches!(
            rx.try_recv(),
            Ok(ServerMessage::AuthResponse { success: true, .. })
        ));
        let active = service.ws_manager().active_session().unwrap();
        assert_eq!(active.session_id, "s1");
        assert_eq!(active.world.world_id.as_deref(), Some("w1"));
    }

    #[test]
    fn test_unknown_role_authenticates_without_gm_rights() {
        let service = BridgeService::new(ServiceConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        service.ws_manager().add_connection("s1".to_string(), tx);

        handle_client_message(
            "s1",
            r#"{"type":"auth","user_id":"u7","user_name":"Odd","role":7}"#,
            &service,
        );

        let active = service.ws_manager().active_session().unwrap();
        assert_eq!(active.caller.role, UserRole::None);
        assert!(!crate::access::validate_gm_access(&active.caller).allowed);
    }

    #[test]
    fn test_unparseable_message_gets_recoverable_error() {
        let service = BridgeService::new(ServiceConfig::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        service.ws_manager().add_connection("s1".to_string(), tx);

        handle_client_message("s1", "not json", &service);

        match rx.try_recv() {
            Ok(ServerMessage::Error {
                code, recoverable, ..
            }) => {
                assert_eq!(code, "parse_error");
                assert!(recoverable);
            }
            other => panic!("Expected error message, got {other:?}"),
        }
    }
}

//! HTTP API for the Foundry bridge.
//!
//! This module provides:
//! - Query dispatch and listing
//! - Health monitoring
//! - The WebSocket endpoint for Foundry host sessions

use axum::{
    Json, Router,
    extract::{Path, State, WebSocketUpgrade, rejection::JsonRejection},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{ServiceError, ServiceResult};
use crate::service::BridgeService;
use crate::websocket::handle_ws_connection;

/// Application state
pub struct AppState {
    pub service: Arc<BridgeService>,
    pub start_time: Instant,
}

/// Build the API router
pub fn router(service: Arc<BridgeService>) -> Router {
    let state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/queries", get(list_queries_handler))
        .route("/queries/{query}", post(query_handler));

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let ws_manager = state.service.ws_manager();
    let host_sessions = ws_manager.authenticated_count();
    let status = if host_sessions > 0 {
        "healthy"
    } else {
        "waiting for Foundry VTT"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        host_sessions,
        connections: ws_manager.connection_count(),
        pending_host_calls: state.service.remote_host().pending_count(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
    host_sessions: usize,
    connections: usize,
    pending_host_calls: usize,
}

// === Queries ===

/// Dispatch one query. Handler failures are still a 200 with the failure
/// envelope; only an unreadable body is rejected.
async fn query_handler(
    State(state): State<Arc<AppState>>,
    Path(query): Path<String>,
    body: Result<Option<Json<Value>>, JsonRejection>,
) -> ServiceResult<Json<Value>> {
    let payload = match body {
        Ok(Some(Json(payload))) => payload,
        Ok(None) => json!({}),
        Err(rejection) => {
            return Err(ServiceError::InvalidRequest {
                message: rejection.body_text(),
            });
        }
    };

    Ok(Json(state.service.query(&query, payload).await))
}

async fn list_queries_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "module": state.service.module_id(),
        "methods": state.service.registered_methods(),
    }))
}

// === WebSocket ===

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("WebSocket upgrade request received");
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state.service.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use tokio::sync::mpsc;

    fn state() -> Arc<AppState> {
        let service = Arc::new(BridgeService::new(ServiceConfig::default()));
        service.activate();
        Arc::new(AppState {
            service,
            start_time: Instant::now(),
        })
    }

    #[tokio::test]
    async fn test_missing_body_is_empty_payload() {
        let Json(result) = query_handler(State(state()), Path("ping".to_string()), Ok(None))
            .await
            .unwrap();
        assert_eq!(result["status"], "ok");
    }

    #[tokio::test]
    async fn test_failures_are_returned_as_payload() {
        let Json(result) = query_handler(
            State(state()),
            Path("listActors".to_string()),
            Ok(Some(Json(json!({"type": "npc"})))),
        )
        .await
        .unwrap();
        assert_eq!(result, json!({"error": "Access denied", "success": false}));

        let Json(result) =
            query_handler(State(state()), Path("notAQuery".to_string()), Ok(None))
                .await
                .unwrap();
        assert_eq!(
            result,
            json!({"error": "Query handler not found: foundry-mcp-bridge.notAQuery", "success": false})
        );
    }

    #[tokio::test]
    async fn test_list_queries() {
        let Json(result) = list_queries_handler(State(state())).await;
        assert_eq!(result["module"], "foundry-mcp-bridge");
        let methods = result["methods"].as_array().unwrap();
        assert!(methods.contains(&json!("ping")));
        assert!(methods.contains(&json!("upload-generated-map")));
    }

    #[tokio::test]
    async fn test_health_without_host() {
        let Json(health) = health_handler(State(state())).await;
        assert_eq!(health.host_sessions, 0);
        assert_eq!(health.connections, 0);
        assert_eq!(health.pending_host_calls, 0);
        assert_eq!(health.status, "waiting for Foundry VTT");
    }

    #[tokio::test]
    async fn test_health_counts_unauthenticated_connections() {
        let state = state();
        let (tx, _rx) = mpsc::unbounded_channel();
        state.service.ws_manager().add_connection("s1".to_string(), tx);

        let Json(health) = health_handler(State(state)).await;
        assert_eq!(health.connections, 1);
        assert_eq!(health.host_sessions, 0);
    }
}

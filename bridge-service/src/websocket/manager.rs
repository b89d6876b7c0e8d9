//! WebSocket connection manager.
//!
//! Tracks host sessions: who is connected, which Foundry user each session
//! authenticated as, and which session host calls are routed to.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::access::{Caller, UserRole};
use crate::host::HostWorld;

use super::messages::ServerMessage;

/// Foundry user a session authenticated as
#[derive(Debug, Clone)]
pub(crate) struct HostIdentity {
    pub(crate) user_id: String,
    pub(crate) user_name: String,
    pub(crate) role: UserRole,
    pub(crate) world: HostWorld,
}

/// State for a single WebSocket connection
pub(crate) struct ConnectionState {
    /// Connection order, used to keep session selection stable
    pub(crate) sequence: u64,
    pub(crate) identity: Option<HostIdentity>,
    pub(crate) tx: mpsc::UnboundedSender<ServerMessage>,
}

/// The session host calls are routed to, with the identity queries run as
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub session_id: String,
    pub caller: Caller,
    pub world: HostWorld,
}

/// Manager for all WebSocket connections
pub struct WebSocketManager {
    pub(crate) connections: DashMap<String, ConnectionState>,
    next_sequence: AtomicU64,
}

impl Default for WebSocketManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSocketManager {
    /// Create a new WebSocket manager
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            next_sequence: AtomicU64::new(0),
        }
    }

    /// Add a new connection
    pub(crate) fn add_connection(
        &self,
        session_id: String,
        tx: mpsc::UnboundedSender<ServerMessage>,
    ) {
        debug!(session_id = %session_id, "Adding WebSocket connection");
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        self.connections.insert(
            session_id,
            ConnectionState {
                sequence,
                identity: None,
                tx,
            },
        );
    }

    /// Remove a connection
    pub(crate) fn remove_connection(&self, session_id: &str) {
        debug!(session_id = %session_id, "Removing WebSocket connection");
        self.connections.remove(session_id);
    }

    /// Authenticate a connection
    pub(crate) fn authenticate(&self, session_id: &str, identity: HostIdentity) -> bool {
        if let Some(mut conn) = self.connections.get_mut(session_id) {
            conn.identity = Some(identity);
            true
        } else {
            false
        }
    }

    /// Send a message to a specific connection; false when it is gone
    pub fn send_to(&self, session_id: &str, msg: ServerMessage) -> bool {
        match self.connections.get(session_id) {
            Some(conn) => {
                if conn.tx.send(msg).is_err() {
                    warn!(session_id = %session_id, "Failed to send message to connection");
                    return false;
                }
                true
            }
            None => false,
        }
    }

    /// Get the number of active connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the number of authenticated host sessions
    pub fn authenticated_count(&self) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.value().identity.is_some())
            .count()
    }

    /// Pick the session host calls go to.
    ///
    /// GM sessions win over non-GM ones; among equals the oldest connection
    /// wins. Returns None when no session has authenticated.
    pub fn active_session(&self) -> Option<ActiveSession> {
        let mut best: Option<(bool, u64, ActiveSession)> = None;

        for entry in self.connections.iter() {
            let conn = entry.value();
            let Some(identity) = &conn.identity else {
                continue;
            };
            let is_gm = identity.role.is_gm();
            let better = match &best {
                None => true,
                Some((best_gm, best_sequence, _)) => {
                    (is_gm && !best_gm) || (is_gm == *best_gm && conn.sequence < *best_sequence)
                }
            };
            if better {
                best = Some((
                    is_gm,
                    conn.sequence,
                    ActiveSession {
                        session_id: entry.key().clone(),
                        caller: Caller::new(identity.user_id.clone(), identity.role),
                        world: identity.world.clone(),
                    },
                ));
            }
        }

        best.map(|(_, _, session)| session)
    }

    /// Display name of the user behind a session
    pub fn user_name(&self, session_id: &str) -> Option<String> {
        self.connections
            .get(session_id)
            .and_then(|conn| conn.identity.as_ref().map(|id| id.user_name.clone()))
    }
}

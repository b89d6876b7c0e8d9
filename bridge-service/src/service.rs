use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

use crate::access::Caller;
use crate::config::ServiceConfig;
use crate::host::{HostApi, RemoteHost};
use crate::queries::{DispatchTable, QueryHandlers, QueryRegistry, run_query};
use crate::websocket::WebSocketManager;

/// Main service coordinator
///
/// Owns the dispatch table, the host session manager and the remote host
/// facade the query handlers talk through.
pub struct BridgeService {
    ws_manager: Arc<WebSocketManager>,
    remote_host: Arc<RemoteHost>,
    registry: QueryRegistry,
    queries: RwLock<DispatchTable>,
}

impl BridgeService {
    /// Create a new service instance. Nothing is registered until [`activate`].
    ///
    /// [`activate`]: BridgeService::activate
    pub fn new(config: ServiceConfig) -> Self {
        info!("Initializing Foundry bridge service");

        let ws_manager = Arc::new(WebSocketManager::new());
        let remote_host = Arc::new(RemoteHost::new(
            ws_manager.clone(),
            config.host_call_timeout(),
        ));

        let host: Arc<dyn HostApi> = remote_host.clone();
        let handlers = Arc::new(QueryHandlers::new(host, config.query_settings()));
        let registry = QueryRegistry::new(handlers);

        Self {
            ws_manager,
            remote_host,
            registry,
            queries: RwLock::new(DispatchTable::new()),
        }
    }

    /// Register every query under the module namespace
    pub fn activate(&self) {
        let mut table = self.queries.write().unwrap_or_else(PoisonError::into_inner);
        self.registry.register(&mut table);
    }

    /// Remove this module's queries, returning how many keys went
    pub fn deactivate(&self) -> usize {
        let mut table = self.queries.write().unwrap_or_else(PoisonError::into_inner);
        self.registry.unregister(&mut table)
    }

    /// Dispatch `name` on behalf of the active host session's user.
    ///
    /// Always yields a JSON value: handler payloads pass through and failures
    /// become `{ "error": ..., "success": false }`.
    pub async fn query(&self, name: &str, payload: Value) -> Value {
        let key = self.registry.key(name);
        let handler = self
            .queries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key);

        let caller = self
            .ws_manager
            .active_session()
            .map(|session| session.caller)
            .unwrap_or_else(Caller::anonymous);
        debug!(query = %key, user_id = ?caller.user_id, "Dispatching query");

        run_query(&key, handler, caller, payload).await
    }

    /// Method names currently registered under the module namespace
    pub fn registered_methods(&self) -> Vec<String> {
        let table = self.queries.read().unwrap_or_else(PoisonError::into_inner);
        self.registry.registered_methods(&table)
    }

    pub fn module_id(&self) -> &str {
        self.registry.prefix()
    }

    pub fn ws_manager(&self) -> &Arc<WebSocketManager> {
        &self.ws_manager
    }

    pub fn remote_host(&self) -> &Arc<RemoteHost> {
        &self.remote_host
    }
}

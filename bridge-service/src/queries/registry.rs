//! Query registry and dispatch table.
//!
//! The service owns a [`DispatchTable`] mapping namespaced keys
//! (`"{module_id}.{name}"`) to handler closures. [`QueryRegistry`] fills it on
//! activation and clears its own namespace on deactivation.

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use strum::IntoEnumIterator;
use tracing::{debug, error};

use crate::access::Caller;
use crate::error::{QueryError, QueryResult};

use super::{Payload, QueryHandlers, QueryName, QueryResponse};

/// A registered handler: caller and raw payload in, result out
pub type QueryHandler = Arc<dyn Fn(Caller, Value) -> BoxFuture<'static, QueryResult> + Send + Sync>;

/// Key-to-handler mapping owned by the service
#[derive(Clone, Default)]
pub struct DispatchTable {
    handlers: HashMap<String, QueryHandler>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, handler: QueryHandler) {
        self.handlers.insert(key.into(), handler);
    }

    /// Remove every key starting with `prefix`, returning how many went
    pub fn remove_prefixed(&mut self, prefix: &str) -> usize {
        let before = self.handlers.len();
        self.handlers.retain(|key, _| !key.starts_with(prefix));
        before - self.handlers.len()
    }

    /// Clone of the handler under `key`
    pub fn get(&self, key: &str) -> Option<QueryHandler> {
        self.handlers.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handlers.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Run a looked-up handler and fold any failure into the failure envelope.
///
/// `handler` is `None` when nothing is registered under `key`.
pub async fn run_query(
    key: &str,
    handler: Option<QueryHandler>,
    caller: Caller,
    payload: Value,
) -> Value {
    let result = match handler {
        Some(handler) => handler(caller, payload).await,
        None => Err(QueryError::HandlerNotFound {
            name: key.to_string(),
        }),
    };

    match result {
        Ok(value) => value,
        Err(e) => {
            error!(query = %key, error = %e, "Query failed");
            QueryResponse::failure(e.to_string())
        }
    }
}

/// Binds every [`QueryName`] into a dispatch table under one namespace
pub struct QueryRegistry {
    handlers: Arc<QueryHandlers>,
    prefix: String,
}

impl QueryRegistry {
    pub fn new(handlers: Arc<QueryHandlers>) -> Self {
        let prefix = handlers.settings().module_id.clone();
        Self { handlers, prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Dispatch key for a bare method name
    pub fn key(&self, method: &str) -> String {
        format!("{}.{}", self.prefix, method)
    }

    /// Insert every query under its canonical name and aliases
    pub fn register(&self, table: &mut DispatchTable) {
        let mut count = 0;
        for name in QueryName::iter() {
            let handler = self.handler_for(name);
            for wire_name in name.wire_names() {
                table.insert(self.key(wire_name), handler.clone());
                count += 1;
            }
        }
        debug!(prefix = %self.prefix, count = count, "Registered query handlers");
    }

    /// Remove every handler in this registry's namespace
    pub fn unregister(&self, table: &mut DispatchTable) -> usize {
        let removed = table.remove_prefixed(&format!("{}.", self.prefix));
        debug!(prefix = %self.prefix, removed = removed, "Unregistered query handlers");
        removed
    }

    /// Registered method names with the namespace stripped, sorted
    pub fn registered_methods(&self, table: &DispatchTable) -> Vec<String> {
        let namespace = format!("{}.", self.prefix);
        let mut methods: Vec<String> = table
            .keys()
            .filter_map(|key| key.strip_prefix(&namespace))
            .map(str::to_string)
            .collect();
        methods.sort();
        methods
    }

    pub fn is_method_registered(&self, table: &DispatchTable, method: &str) -> bool {
        table.contains(&self.key(method))
    }

    fn handler_for(&self, name: QueryName) -> QueryHandler {
        let handlers = self.handlers.clone();
        Arc::new(move |caller: Caller, payload: Value| {
            let handlers = handlers.clone();
            async move { handlers.handle(name, &caller, Payload::new(payload)).await }.boxed()
        })
    }
}

//! # Service Handler Mapper
//!
//! Runtime lookup table from dispatch token to [`ServiceHandler`].
//!
//! The table is written while a definition is bound and read on every
//! request, so it is held in an [`ArcSwap`]: readers load a snapshot without
//! locking, and writers publish a modified copy. Concurrent writers are
//! serialised by `rcu`, so an add racing a remove never loses either update.

use crate::bridge::Invoker;
use crate::handler::ServiceHandler;
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// One mapper entry: the declared handler and, once a definition is bound,
/// the invoker resolved for it.
///
/// Dispatch always runs the invoker stored next to the handler it found, so
/// a shared mapper never pairs one definition's handler with another
/// definition's target.
#[derive(Debug)]
pub struct MappedHandler {
    handler: Arc<ServiceHandler>,
    invoker: Option<Invoker>,
}

impl MappedHandler {
    pub fn handler(&self) -> &Arc<ServiceHandler> {
        &self.handler
    }

    /// `None` for handlers added directly rather than through a bind.
    pub fn invoker(&self) -> Option<&Invoker> {
        self.invoker.as_ref()
    }
}

type HandlerTable = HashMap<String, Arc<MappedHandler>>;

/// Dispatch token to handler, last write wins.
pub struct ServiceHandlerMapper {
    handlers: ArcSwap<HandlerTable>,
}

impl Default for ServiceHandlerMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceHandlerMapper {
    pub fn new() -> Self {
        Self {
            handlers: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Insert `handler` under its dispatch key, replacing any previous entry.
    pub fn add_service_handler(&self, handler: ServiceHandler) -> &Self {
        self.insert(MappedHandler {
            handler: Arc::new(handler),
            invoker: None,
        });
        self
    }

    /// Insert a handler together with its resolved invoker. The returned
    /// entry identifies this registration for [`remove_entry`](Self::remove_entry).
    pub fn add_bound(&self, handler: Arc<ServiceHandler>, invoker: Invoker) -> Arc<MappedHandler> {
        self.insert(MappedHandler {
            handler,
            invoker: Some(invoker),
        })
    }

    fn insert(&self, entry: MappedHandler) -> Arc<MappedHandler> {
        let entry = Arc::new(entry);
        let key = entry.handler.dispatch_key();
        let previous = self.handlers.rcu(|table| {
            let mut next = HashMap::clone(table);
            next.insert(key.clone(), Arc::clone(&entry));
            next
        });

        if let Some(old) = previous.get(&key) {
            warn!(
                dispatch_key = %key,
                old_method = %old.handler.http_method(),
                new_method = %entry.handler.http_method(),
                "Replaced existing service handler"
            );
        } else {
            debug!(
                dispatch_key = %key,
                http_method = %entry.handler.http_method(),
                "Service handler registered"
            );
        }
        entry
    }

    /// Remove the entry keyed by `handler`'s dispatch key, if present.
    pub fn remove_service_handler(&self, handler: &ServiceHandler) -> &Self {
        let key = handler.dispatch_key();
        if !self.handlers.load().contains_key(&key) {
            return self;
        }
        self.handlers.rcu(|table| {
            let mut next = HashMap::clone(table);
            next.remove(&key);
            next
        });
        debug!(dispatch_key = %key, "Service handler removed");
        self
    }

    /// Remove `entry` only while it is still the one mapped under its key.
    /// Returns false when a later registration has replaced it.
    pub fn remove_entry(&self, entry: &Arc<MappedHandler>) -> bool {
        let key = entry.handler.dispatch_key();
        let mut removed = false;
        self.handlers.rcu(|table| {
            removed = table
                .get(&key)
                .is_some_and(|current| Arc::ptr_eq(current, entry));
            let mut next = HashMap::clone(table);
            if removed {
                next.remove(&key);
            }
            next
        });
        if removed {
            debug!(dispatch_key = %key, "Service handler removed");
        } else {
            debug!(dispatch_key = %key, "Service handler superseded, left in place");
        }
        removed
    }

    /// Look up the handler for a dispatch token.
    pub fn map(&self, key: &str) -> Option<Arc<ServiceHandler>> {
        self.handlers
            .load()
            .get(key)
            .map(|entry| Arc::clone(&entry.handler))
    }

    /// Look up the full entry for a dispatch token.
    pub fn lookup(&self, key: &str) -> Option<Arc<MappedHandler>> {
        self.handlers.load().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.load().is_empty()
    }

    /// Registered dispatch tokens, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.handlers.load().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.handlers.store(Arc::new(HashMap::new()));
    }
}

impl std::fmt::Debug for ServiceHandlerMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandlerMapper")
            .field("keys", &self.keys())
            .finish()
    }
}

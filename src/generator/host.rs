use crate::dispatcher::Dispatcher;
use crate::error::BindError;
use crate::ids::DefinitionId;
use crate::middleware::Middleware;
use crate::router::{RouteMeta, Router};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockWriteGuard};
use tracing::{debug, info};

/// The in-process web stack definitions are installed on.
///
/// Cloning shares the same router, dispatcher and base path claims; the
/// server reads the router and dispatcher, installers write them.
#[derive(Clone, Default)]
pub struct Host {
    router: Arc<RwLock<Router>>,
    dispatcher: Arc<RwLock<Dispatcher>>,
    claims: Arc<Mutex<HashMap<String, DefinitionId>>>,
}

impl Host {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn router(&self) -> Arc<RwLock<Router>> {
        Arc::clone(&self.router)
    }

    pub fn dispatcher(&self) -> Arc<RwLock<Dispatcher>> {
        Arc::clone(&self.dispatcher)
    }

    /// Add middleware to every dispatched request.
    pub fn add_middleware(&self, mw: Arc<dyn Middleware>) -> Result<(), BindError> {
        self.write_dispatcher()?.add_middleware(mw);
        Ok(())
    }

    pub(crate) fn write_router(&self) -> Result<RwLockWriteGuard<'_, Router>, BindError> {
        self.router.write().map_err(|e| BindError::Host {
            reason: format!("router lock poisoned: {e}"),
        })
    }

    pub(crate) fn write_dispatcher(&self) -> Result<RwLockWriteGuard<'_, Dispatcher>, BindError> {
        self.dispatcher.write().map_err(|e| BindError::Host {
            reason: format!("dispatcher lock poisoned: {e}"),
        })
    }

    /// Record `owner` as the definition bound at `base_path`.
    ///
    /// Returns `true` for a new claim and `false` when `owner` already held
    /// it. A claim held by another definition is `PathAlreadyBound`.
    pub fn claim(&self, base_path: &str, owner: DefinitionId) -> Result<bool, BindError> {
        let mut claims = self.claims.lock().map_err(|e| BindError::Host {
            reason: format!("claims lock poisoned: {e}"),
        })?;
        match claims.get(base_path) {
            Some(current) if *current == owner => Ok(false),
            Some(_) => Err(BindError::PathAlreadyBound {
                base_path: base_path.to_string(),
            }),
            None => {
                claims.insert(base_path.to_string(), owner);
                info!(base_path = %base_path, owner = %owner, "Base path claimed");
                Ok(true)
            }
        }
    }

    /// Drop `owner`'s claim on `base_path`. Claims held by others are kept.
    pub fn release(&self, base_path: &str, owner: DefinitionId) -> bool {
        let Ok(mut claims) = self.claims.lock() else {
            return false;
        };
        if claims.get(base_path) == Some(&owner) {
            claims.remove(base_path);
            debug!(base_path = %base_path, owner = %owner, "Base path released");
            true
        } else {
            false
        }
    }

    pub fn owner_of(&self, base_path: &str) -> Option<DefinitionId> {
        self.claims
            .lock()
            .ok()
            .and_then(|claims| claims.get(base_path).copied())
    }

    /// Claimed base paths, sorted.
    pub fn bound_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .claims
            .lock()
            .map(|claims| claims.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }

    /// Installed routes in match order.
    pub fn routes(&self) -> Vec<Arc<RouteMeta>> {
        self.router.read().map(|r| r.routes()).unwrap_or_default()
    }

    pub fn route_count(&self) -> usize {
        self.router.read().map(|r| r.len()).unwrap_or_default()
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("bound_paths", &self.bound_paths())
            .field("routes", &self.route_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims() {
        let host = Host::new();
        let a = DefinitionId::new();
        let b = DefinitionId::new();

        assert!(host.claim("/books", a).unwrap());
        assert!(!host.claim("/books", a).unwrap());
        assert_eq!(
            host.claim("/books", b).unwrap_err(),
            BindError::PathAlreadyBound {
                base_path: "/books".into()
            }
        );

        assert!(!host.release("/books", b));
        assert!(host.release("/books", a));
        assert!(host.claim("/books", b).unwrap());
        assert_eq!(host.bound_paths(), vec!["/books"]);
    }
}

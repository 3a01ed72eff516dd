use super::host::Host;
use super::installer::{InstallStyle, PageInstaller, ResourceInstaller, RouteInstaller};
use crate::bridge::{resolve_invoker, DispatchResource};
use crate::definition::ServiceDefinition;
use crate::error::BindError;
use crate::mapper::ServiceHandlerMapper;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Turns a definition into a live dispatch resource on some host stack.
pub trait ServiceDefinitionGenerator: Send + Sync {
    /// Register the definition's handlers in `mapper` and install the
    /// resource at its base path.
    fn generate(
        &self,
        definition: &ServiceDefinition,
        mapper: Arc<ServiceHandlerMapper>,
    ) -> Result<Arc<DispatchResource>, BindError>;

    /// Undo a previous `generate`.
    fn retract(
        &self,
        definition: &ServiceDefinition,
        resource: &DispatchResource,
    ) -> Result<(), BindError>;
}

/// Leading slash, no trailing slash, no placeholders; `/` becomes the root `""`.
pub fn normalize_base_path(path: &str) -> Result<String, BindError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(BindError::InvalidPath {
            path: path.to_string(),
        });
    }
    let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
    let has_placeholder = segments
        .iter()
        .any(|s| s.starts_with(':') || s.contains('{') || s.contains('}'));
    if has_placeholder {
        return Err(BindError::InvalidPath {
            path: path.to_string(),
        });
    }
    Ok(segments.iter().map(|s| format!("/{s}")).collect())
}

/// The registration algorithm, parameterised by the host-specific installer.
#[derive(Debug, Clone)]
pub struct RouteGenerator<I> {
    installer: I,
}

/// Generator for the annotated-resource style.
pub type ResourceGenerator = RouteGenerator<ResourceInstaller>;
/// Generator for the page style.
pub type PageGenerator = RouteGenerator<PageInstaller>;

impl<I: RouteInstaller> RouteGenerator<I> {
    pub fn new(installer: I) -> Self {
        Self { installer }
    }

    pub fn installer(&self) -> &I {
        &self.installer
    }
}

impl<I: RouteInstaller> ServiceDefinitionGenerator for RouteGenerator<I> {
    fn generate(
        &self,
        definition: &ServiceDefinition,
        mapper: Arc<ServiceHandlerMapper>,
    ) -> Result<Arc<DispatchResource>, BindError> {
        let base_path = normalize_base_path(definition.base_path().ok_or(BindError::MissingPath)?)?;
        let backing = definition.backing().ok_or(BindError::MissingEntity)?;

        // resolve everything before the host or the mapper is touched
        let resolved = definition
            .service_handlers()
            .iter()
            .map(|handler| Ok((handler, resolve_invoker(handler, backing)?)))
            .collect::<Result<Vec<_>, BindError>>()?;

        let host = self.installer.host();
        let newly_claimed = host.claim(&base_path, definition.id())?;

        let mut entries = HashMap::with_capacity(resolved.len());
        for (handler, invoker) in resolved {
            let entry = mapper.add_bound(Arc::new(handler.clone()), invoker);
            let key = handler.dispatch_key();
            if entries.insert(key.clone(), entry).is_some() {
                warn!(
                    base_path = %base_path,
                    dispatch_key = %key,
                    "Duplicate dispatch key; last handler wins"
                );
            }
        }

        let resource = Arc::new(DispatchResource::new(
            definition.id(),
            base_path.clone(),
            Arc::clone(&mapper),
            entries,
            definition.media_to_produce().to_vec(),
            definition.media_to_consume().to_vec(),
        ));

        if let Err(e) = self.installer.install(&base_path, Arc::clone(&resource)) {
            for entry in resource.entries().values() {
                mapper.remove_entry(entry);
            }
            if newly_claimed {
                host.release(&base_path, definition.id());
            }
            return Err(e);
        }

        info!(
            style = %self.installer.style(),
            definition_id = %definition.id(),
            base_path = %base_path,
            dispatch_keys = ?resource.dispatch_keys(),
            "Service definition generated"
        );
        Ok(resource)
    }

    fn retract(
        &self,
        definition: &ServiceDefinition,
        resource: &DispatchResource,
    ) -> Result<(), BindError> {
        self.installer.uninstall(resource.base_path())?;
        self.installer
            .host()
            .release(resource.base_path(), definition.id());
        // keys another definition has since re-registered stay mapped
        for entry in resource.entries().values() {
            resource.mapper().remove_entry(entry);
        }
        Ok(())
    }
}

/// Generator for `style` installing onto `host`.
pub fn generator_for(style: InstallStyle, host: &Host) -> Arc<dyn ServiceDefinitionGenerator> {
    match style {
        InstallStyle::Resource => Arc::new(ResourceGenerator::new(ResourceInstaller::new(host.clone()))),
        InstallStyle::Page => Arc::new(PageGenerator::new(PageInstaller::new(host.clone()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path("/books").unwrap(), "/books");
        assert_eq!(normalize_base_path("books/").unwrap(), "/books");
        assert_eq!(normalize_base_path("/a//b/").unwrap(), "/a/b");
        assert_eq!(normalize_base_path("/").unwrap(), "");
        assert!(normalize_base_path("").is_err());
        assert!(normalize_base_path("/books/{id}").is_err());
        assert!(normalize_base_path("/books/:id").is_err());
    }
}

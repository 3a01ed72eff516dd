//! # Service Definitions
//!
//! A [`ServiceDefinition`] describes one REST resource: its base path, the
//! entity or delegate action behind it, its handlers and the media types it
//! speaks. Calling [`ServiceDefinition::bind`] hands it to the injected
//! generator, which installs a live [`DispatchResource`] on the host stack.
//!
//! ```rust
//! use restdef::address_book::AddressBook;
//! use restdef::definition::{BindState, ServiceDefinition};
//! use restdef::generator::{Host, ResourceGenerator, ResourceInstaller};
//! use restdef::handler::ServiceHandler;
//! use std::sync::Arc;
//!
//! let host = Host::new();
//! let generator = Arc::new(ResourceGenerator::new(ResourceInstaller::new(host.clone())));
//!
//! let mut definition = ServiceDefinition::new(generator)
//!     .with_path("/books")
//!     .using_entity(AddressBook::default())
//!     .with_handler(ServiceHandler::get(None, "getAddressBook"));
//!
//! let resource = definition.bind().unwrap();
//! assert_eq!(definition.state(), BindState::Bound);
//! assert_eq!(resource.base_path(), "/books");
//! ```

use crate::bridge::DispatchResource;
use crate::entity::{Action, MethodTable, ServiceEntity};
use crate::error::BindError;
use crate::generator::ServiceDefinitionGenerator;
use crate::handler::ServiceHandler;
use crate::ids::DefinitionId;
use crate::mapper::ServiceHandlerMapper;
use crate::media::MediaType;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// What a definition dispatches into.
#[derive(Clone)]
pub enum Backing {
    /// Methods of a service entity, called by name and arity
    Entity(MethodTable),
    /// One action serving every handler that names a method
    Delegate(Arc<dyn Action>),
}

impl fmt::Debug for Backing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backing::Entity(table) => f.debug_tuple("Entity").field(&table.entity_type()).finish(),
            Backing::Delegate(action) => f.debug_tuple("Delegate").field(&action.name()).finish(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindState {
    Unbound,
    Bound,
}

/// Aggregate describing one REST resource.
pub struct ServiceDefinition {
    id: DefinitionId,
    base_path: Option<String>,
    backing: Option<Backing>,
    handlers: Vec<ServiceHandler>,
    media_to_produce: Vec<MediaType>,
    media_to_consume: Vec<MediaType>,
    generator: Arc<dyn ServiceDefinitionGenerator>,
    mapper: Arc<ServiceHandlerMapper>,
    resource: Option<Arc<DispatchResource>>,
}

impl ServiceDefinition {
    /// New unbound definition with its own empty mapper.
    pub fn new(generator: Arc<dyn ServiceDefinitionGenerator>) -> Self {
        Self {
            id: DefinitionId::new(),
            base_path: None,
            backing: None,
            handlers: Vec::new(),
            media_to_produce: Vec::new(),
            media_to_consume: Vec::new(),
            generator,
            mapper: Arc::new(ServiceHandlerMapper::new()),
            resource: None,
        }
    }

    /// Use a shared mapper instead of the definition's own.
    pub fn with_mapper(mut self, mapper: Arc<ServiceHandlerMapper>) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn with_path(mut self, base_path: &str) -> Self {
        self.base_path = Some(base_path.to_string());
        self
    }

    /// Back the definition with an entity's registered methods.
    pub fn using_entity<E: ServiceEntity>(self, entity: E) -> Self {
        self.using_shared_entity(Arc::new(entity))
    }

    pub fn using_shared_entity<E: ServiceEntity>(mut self, entity: Arc<E>) -> Self {
        self.backing = Some(Backing::Entity(MethodTable::for_entity(entity)));
        self
    }

    /// Back the definition with one action for every method-named handler.
    pub fn using_delegate<A: Action>(self, delegate: A) -> Self {
        self.using_shared_delegate(Arc::new(delegate))
    }

    pub fn using_shared_delegate(mut self, delegate: Arc<dyn Action>) -> Self {
        self.backing = Some(Backing::Delegate(delegate));
        self
    }

    pub fn with_handler(mut self, handler: ServiceHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Append a media type every handler can produce unless it declares its own.
    pub fn producing(mut self, media: MediaType) -> Self {
        self.media_to_produce.push(media);
        self
    }

    pub fn consuming(mut self, media: MediaType) -> Self {
        self.media_to_consume.push(media);
        self
    }

    /// Install the definition on the host stack.
    ///
    /// Fails before touching the host when the base path or backing is
    /// missing. Binding again replaces this definition's routes and returns
    /// a fresh resource.
    pub fn bind(&mut self) -> Result<Arc<DispatchResource>, BindError> {
        if self.base_path.is_none() {
            return Err(BindError::MissingPath);
        }
        if self.backing.is_none() {
            return Err(BindError::MissingEntity);
        }

        let rebinding = self.resource.is_some();
        let resource = self.generator.generate(self, Arc::clone(&self.mapper))?;
        info!(
            definition_id = %self.id,
            base_path = %resource.base_path(),
            handlers = self.handlers.len(),
            rebinding,
            "Service definition bound"
        );
        self.resource = Some(Arc::clone(&resource));
        Ok(resource)
    }

    /// Remove the definition's routes and release its base path.
    pub fn unbind(&mut self) -> Result<(), BindError> {
        if let Some(resource) = self.resource.take() {
            self.generator.retract(self, &resource)?;
            info!(
                definition_id = %self.id,
                base_path = %resource.base_path(),
                "Service definition unbound"
            );
        }
        Ok(())
    }

    pub fn state(&self) -> BindState {
        if self.resource.is_some() {
            BindState::Bound
        } else {
            BindState::Unbound
        }
    }

    pub fn id(&self) -> DefinitionId {
        self.id
    }

    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    pub fn backing(&self) -> Option<&Backing> {
        self.backing.as_ref()
    }

    pub fn service_handlers(&self) -> &[ServiceHandler] {
        &self.handlers
    }

    pub fn media_to_produce(&self) -> &[MediaType] {
        &self.media_to_produce
    }

    pub fn media_to_consume(&self) -> &[MediaType] {
        &self.media_to_consume
    }

    pub fn mapper(&self) -> &Arc<ServiceHandlerMapper> {
        &self.mapper
    }

    /// The live resource from the last successful bind.
    pub fn resource(&self) -> Option<&Arc<DispatchResource>> {
        self.resource.as_ref()
    }
}

impl fmt::Debug for ServiceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDefinition")
            .field("id", &self.id)
            .field("base_path", &self.base_path)
            .field("backing", &self.backing)
            .field("handlers", &self.handlers.len())
            .field("state", &self.state())
            .finish()
    }
}

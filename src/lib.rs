//! # restdef
//!
//! **restdef** declares REST resources once and binds them onto a host web
//! stack. A resource is a [`ServiceDefinition`](definition::ServiceDefinition):
//! a base path, an entity (or a single delegate action) and a list of
//! [`ServiceHandler`](handler::ServiceHandler)s, each mapping an HTTP verb
//! and a URL token to an entity method.
//!
//! ## Overview
//!
//! Requests arrive at `{base}/{service}/{id}`. The `service` segment selects
//! the handler, the `id` segment is the first argument of the entity method,
//! and declared form parameters supply the rest. Results are rendered in a
//! media type negotiated from `Accept` and the produced types.
//!
//! ## Architecture
//!
//! - **[`media`]** - media type values, parsing, negotiation
//! - **[`handler`]** - `ServiceHandler` builder (verb, token, target, form params, views)
//! - **[`entity`]** - `ServiceEntity` method tables and the `Action` delegate style
//! - **[`mapper`]** - concurrent `token -> handler` registry; each entry carries its bound invoker
//! - **[`definition`]** - the `ServiceDefinition` aggregate and `bind()` lifecycle
//! - **[`generator`]** - the registration algorithm and the two route installers
//! - **[`bridge`]** - per-request lookup, negotiation, invocation and rendering
//! - **[`router`]**, **[`dispatcher`]**, **[`middleware`]**, **[`server`]** - the
//!   coroutine HTTP host built on `may_minihttp`
//! - **[`config`]**, **[`logging`]**, **[`runtime_config`]**, **[`cli`]** - the binary's edge
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as server::AppService
//!     participant Router as router::Router
//!     participant Dispatcher as dispatcher::Dispatcher
//!     participant Bridge as bridge::DispatchResource
//!     participant Mapper as mapper::ServiceHandlerMapper
//!     participant Entity
//!
//!     Client->>Server: POST /addressbook/updateAddressBook/myBook
//!     Server->>Router: route(POST, path)
//!     Router-->>Server: RouteMatch {service, id}
//!     Server->>Dispatcher: dispatch(route_match, body, headers)
//!     Dispatcher->>Bridge: installer entry point
//!     Bridge->>Mapper: lookup("updateAddressBook")
//!     Mapper-->>Bridge: ServiceHandler + invoker
//!     Bridge->>Bridge: verb and media checks
//!     Bridge->>Entity: updateAddressBook(id, update)
//!     Entity-->>Bridge: Value
//!     Bridge-->>Server: rendered body + media type
//!     Server-->>Client: 200 OK
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use restdef::address_book::{address_book_definition, AddressBook};
//! use restdef::generator::{generator_for, Host, InstallStyle};
//! use restdef::server::{serve, AppService};
//!
//! let host = Host::new();
//! let generator = generator_for(InstallStyle::Resource, &host);
//! let mut definition =
//!     address_book_definition(generator, "/addressbook", AddressBook::default(), &["update"])
//!         .unwrap();
//! definition.bind().unwrap();
//!
//! let handle = serve(AppService::from_host(&host), "0.0.0.0:8080").unwrap();
//! handle.join().unwrap();
//! ```
//!
//! ## Runtime Considerations
//!
//! restdef uses the `may` coroutine runtime, not tokio. Handlers run on the
//! connection coroutine; the stack size is configurable via
//! `RESTDEF_STACK_SIZE`. A panicking entity method becomes a 500 reply.

pub mod address_book;
pub mod bridge;
pub mod cli;
pub mod config;
pub mod definition;
pub mod dispatcher;
pub mod entity;
pub mod error;
pub mod generator;
pub mod handler;
pub mod ids;
pub mod logging;
pub mod mapper;
pub mod media;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod server;

pub use definition::{BindState, ServiceDefinition};
pub use error::{BindError, DispatchError};
pub use handler::{HttpMethod, ServiceHandler};
pub use mapper::ServiceHandlerMapper;
pub use media::MediaType;

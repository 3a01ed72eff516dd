//! # Handler Module
//!
//! A [`ServiceHandler`] binds one HTTP verb and one dispatch token to the
//! operation that serves it. Handlers are plain descriptors: they carry no
//! reference to the entity they will eventually call, so the same handler
//! list can be bound against different entities or host stacks.
//!
//! ## Variants
//!
//! The verb is fixed by the constructor and cannot change afterwards:
//!
//! ```rust
//! use restdef::handler::{HttpMethod, ServiceHandler};
//! use restdef::media::MediaType;
//!
//! let get = ServiceHandler::get(None, "getAddressBook").producing(MediaType::APPLICATION_JSON);
//! assert_eq!(get.http_method(), HttpMethod::Get);
//!
//! let post = ServiceHandler::post(None, "updateAddressBook")
//!     .add_form_param("update")
//!     .unwrap();
//! assert_eq!(post.form_params(), ["update"]);
//! ```
//!
//! ## Dispatch keys
//!
//! A handler is looked up by its dispatch key: the first literal segment of
//! its declared `path`, or the target's method name when no path is set.
//! Placeholder segments (`:id` or `{id}`) name the id token handed to the
//! target.

mod core;

pub use core::{ConsumeType, HandlerError, HttpMethod, ServiceHandler, Target, ViewTransformer};

//! # Entity Module
//!
//! The backing side of a service definition comes in two styles:
//!
//! - **Entity style**: a plain struct implementing [`ServiceEntity`]. It
//!   declares its callable methods once, by name and arity, into a
//!   [`MethodRegistry`]. Handlers refer to those methods by name and the
//!   generator resolves each one into an [`EntityMethod`] at bind time, so
//!   nothing is looked up by reflection per request.
//! - **Action style**: a value implementing [`Action`]. Every request is
//!   delivered to the single `action()` method with an [`ActionContext`]
//!   describing the verb, tokens, parameters and decoded body; the action
//!   switches on the verb itself.
//!
//! ```rust
//! use restdef::entity::{EntityError, MethodRegistry, MethodTable, ServiceEntity};
//! use std::sync::Arc;
//!
//! struct Counter;
//!
//! impl ServiceEntity for Counter {
//!     fn register(registry: &mut MethodRegistry<Self>) {
//!         registry.unary("length", |_, id: &str| Ok::<_, EntityError>(id.len()));
//!     }
//! }
//!
//! let table = MethodTable::for_entity(Arc::new(Counter));
//! let length = table.resolve("length", 1).unwrap();
//! assert_eq!(length.invoke(&["abc".to_string()]).unwrap(), 3);
//! ```

mod action;
mod core;

pub use action::{Action, ActionContext};
pub use core::{EntityError, EntityMethod, MethodRegistry, MethodTable, ServiceEntity};

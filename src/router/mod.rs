//! # Router Module
//!
//! The host stack's routing table. Route installers add one [`RouteMeta`]
//! per HTTP verb when a service definition is bound and remove them again
//! when it is re-bound or retracted.
//!
//! Patterns accept both template syntaxes used by the installers:
//! `{name}` (resource style) and `:name` (page style).
//!
//! ```rust
//! use restdef::router::{RouteMeta, Router};
//! use http::Method;
//!
//! let mut router = Router::default();
//! router
//!     .add_route(RouteMeta {
//!         method: Method::GET,
//!         path_pattern: "/books/{service}/{id}".into(),
//!         handler_name: "books".into(),
//!         base_path: "/books".into(),
//!     })
//!     .unwrap();
//!
//! let m = router.route(Method::GET, "/books/getAddressBook/myBook").unwrap();
//! assert_eq!(m.get_path_param("service"), Some("getAddressBook"));
//! assert_eq!(m.get_path_param("id"), Some("myBook"));
//! ```

mod core;
#[cfg(test)]
mod tests;

pub use core::{ParamVec, RouteMatch, RouteMeta, Router, MAX_INLINE_PARAMS};

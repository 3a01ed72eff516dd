//! # Generators and Route Installers
//!
//! Binding a definition runs one registration algorithm,
//! [`RouteGenerator`]: normalise the base path, resolve every handler's
//! invoker, claim the base path on the [`Host`], register the handlers in the
//! mapper, and hand the resulting [`DispatchResource`](crate::bridge::DispatchResource)
//! to a [`RouteInstaller`].
//!
//! The installer is the only host-specific part. Two are provided:
//!
//! - [`ResourceInstaller`] uses `{base}/{service}/{id}` templates and reports
//!   an unknown service token as a 500 wrapping the lookup failure
//! - [`PageInstaller`] uses `{base}/:service/:id` templates and replies 404
//!
//! Both install GET, PUT, POST and DELETE entry points and otherwise behave
//! identically.

mod core;
mod host;
mod installer;

pub use core::{
    generator_for, normalize_base_path, PageGenerator, ResourceGenerator, RouteGenerator,
    ServiceDefinitionGenerator,
};
pub use host::Host;
pub use installer::{InstallStyle, PageInstaller, ResourceInstaller, RouteInstaller};

//! # CLI Module
//!
//! Command-line front end of the `restdef` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Bind the address-book definitions and serve them:
//!
//! ```bash
//! restdef serve --config restdef.yaml --addr 127.0.0.1:8080 --style page
//! ```
//!
//! - `--config <FILE>` - YAML configuration (optional; defaults otherwise)
//! - `--addr <ADDR>` - listen address, overrides `server.addr`
//! - `--style <STYLE>` - `resource` or `page`, overrides `server.style`
//!
//! The entity-style book is bound at `service.base_path` and the action-style
//! book at `service.action_base_path`; both share one store.
//!
//! ### `routes`
//!
//! Print the route table the same configuration would install:
//!
//! ```bash
//! restdef routes --style page
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{bind_address_books, run_cli, Cli, Commands};

//! # Dispatcher Module
//!
//! Name-keyed registry of request handlers for the host stack.
//!
//! Route installers register one handler per installed route; the server
//! matches a request with the [`Router`](crate::router::Router), then asks the
//! dispatcher to run the handler named by the match.
//!
//! ## Request Flow
//!
//! 1. Router matches incoming request to route metadata
//! 2. Dispatcher looks up the handler by name
//! 3. Middleware `before` hooks run; any of them may short-circuit
//! 4. The handler runs under panic recovery (panics become 500 responses)
//! 5. Middleware `after` hooks see the response and latency

mod core;

pub use core::{
    Dispatcher, HandlerFn, HandlerRequest, HandlerResponse, HeaderVec,
    RequestBody, ResponseBody, MAX_INLINE_HEADERS,
};

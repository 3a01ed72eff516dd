//! Dispatcher core module - hot path for request dispatch.
//!
//! Handlers are plain closures installed by the route installers and invoked
//! on the connection coroutine. Each call runs under `catch_unwind` so one
//! misbehaving entity cannot take the server down.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use crate::ids::RequestId;
use crate::middleware::Middleware;
use crate::router::{ParamVec, RouteMatch};
use http::Method;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage; names are lowercase.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Request entity as received by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestBody {
    /// No body, or an empty one
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded` fields in request order
    Form(ParamVec),
    /// Any other body, kept as text with its declared content type
    Raw {
        content_type: Option<String>,
        text: String,
    },
}

impl RequestBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }

    /// Form field by name, last write wins.
    pub fn form_field(&self, name: &str) -> Option<&str> {
        match self {
            RequestBody::Form(fields) => fields
                .iter()
                .rfind(|(k, _)| k.as_ref() == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

/// Request data passed to a handler
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    pub method: Method,
    /// Concrete request path
    pub path: String,
    /// Name of the handler that should process this request
    pub handler_name: String,
    /// Path parameters extracted from the URL
    pub path_params: ParamVec,
    pub query_params: ParamVec,
    pub headers: HeaderVec,
    pub body: RequestBody,
}

impl HandlerRequest {
    /// Get a path parameter by name
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Empty,
    /// Serialized with `serde_json` by the server
    Json(Value),
    /// Already rendered in the response's content type
    Text(String),
}

/// Response data returned by a handler
#[derive(Debug, Clone)]
pub struct HandlerResponse {
    pub status: u16,
    pub headers: HeaderVec,
    pub body: ResponseBody,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: ResponseBody) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a JSON response with default headers
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body: ResponseBody::Json(body),
        }
    }

    /// Pre-rendered body with an explicit content type.
    #[must_use]
    pub fn text(status: u16, content_type: &str, body: String) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), content_type.to_string()));
        Self {
            status,
            headers,
            body: ResponseBody::Text(body),
        }
    }

    /// Status-only response without an entity.
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            body: ResponseBody::Empty,
        }
    }

    /// Create an error response
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or update a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}

/// A registered request handler.
pub type HandlerFn = Arc<dyn Fn(&HandlerRequest) -> HandlerResponse + Send + Sync>;

/// Registry of named handlers plus the middleware pipeline around them.
#[derive(Clone, Default)]
pub struct Dispatcher {
    pub handlers: HashMap<String, HandlerFn>,
    /// Ordered list of middleware to apply to requests/responses
    pub middlewares: Vec<Arc<dyn Middleware>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler_fn` under `name`, replacing any previous handler.
    pub fn register_handler<F>(&mut self, name: &str, handler_fn: F)
    where
        F: Fn(&HandlerRequest) -> HandlerResponse + Send + Sync + 'static,
    {
        if self.handlers.insert(name.to_string(), Arc::new(handler_fn)).is_some() {
            warn!(
                handler_name = %name,
                total_handlers = self.handlers.len(),
                "Replaced existing handler"
            );
        } else {
            info!(
                handler_name = %name,
                total_handlers = self.handlers.len(),
                "Handler registered successfully"
            );
        }
    }

    /// Remove the handler registered under `name`.
    pub fn remove_handler(&mut self, name: &str) -> bool {
        let removed = self.handlers.remove(name).is_some();
        if removed {
            info!(
                handler_name = %name,
                total_handlers = self.handlers.len(),
                "Handler removed"
            );
        }
        removed
    }

    /// Registered handler names, sorted.
    #[must_use]
    pub fn handler_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Middleware is executed in the order it's added.
    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    /// Dispatch a matched request with a fresh request id.
    ///
    /// Returns `None` when no handler is registered under the route's name.
    #[must_use]
    pub fn dispatch(
        &self,
        route_match: RouteMatch,
        body: RequestBody,
        headers: HeaderVec,
    ) -> Option<HandlerResponse> {
        self.dispatch_with_request_id(route_match, body, headers, RequestId::new())
    }

    /// Dispatch a request with a pre-determined request id (for correlation)
    pub fn dispatch_with_request_id(
        &self,
        route_match: RouteMatch,
        body: RequestBody,
        headers: HeaderVec,
        request_id: RequestId,
    ) -> Option<HandlerResponse> {
        // D1: Handler lookup
        debug!(
            handler_name = %route_match.handler_name,
            available_handlers = self.handlers.len(),
            "Handler lookup"
        );

        let Some(handler) = self.handlers.get(&route_match.handler_name) else {
            // D2: Handler not found
            error!(
                handler_name = %route_match.handler_name,
                available_handlers = ?self.handler_names(),
                "Handler not found"
            );
            return None;
        };

        let request = HandlerRequest {
            request_id,
            method: route_match.route.method.clone(),
            path: route_match.route.path_pattern.clone(),
            handler_name: route_match.handler_name,
            path_params: route_match.path_params,
            query_params: route_match.query_params,
            headers,
            body,
        };

        // D3: Middleware before execution
        let mut early_resp: Option<HandlerResponse> = None;
        for mw in &self.middlewares {
            if early_resp.is_none() {
                early_resp = mw.before(&request);
            } else {
                mw.before(&request);
            }
        }

        let start = Instant::now();
        let mut resp = match early_resp {
            Some(r) => r,
            None => {
                // D4: Handler execution
                debug!(
                    request_id = %request.request_id,
                    handler_name = %request.handler_name,
                    method = %request.method,
                    "Request dispatched to handler"
                );
                match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    handler(&request)
                })) {
                    Ok(resp) => resp,
                    Err(panic) => {
                        // D5: Handler panic caught
                        let panic_message = panic_message(panic.as_ref());
                        error!(
                            request_id = %request.request_id,
                            handler_name = %request.handler_name,
                            panic_message = %panic_message,
                            "Handler panicked"
                        );
                        HandlerResponse::error(500, &format!("Handler panicked: {panic_message}"))
                    }
                }
            }
        };
        let latency: Duration = start.elapsed();

        // D6: Middleware after execution
        for mw in &self.middlewares {
            mw.after(&request, &mut resp, latency);
        }

        info!(
            request_id = %request.request_id,
            handler_name = %request.handler_name,
            status = resp.status,
            latency_ms = latency.as_millis() as u64,
            "Handler response"
        );
        Some(resp)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

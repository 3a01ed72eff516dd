//! Error types shared across binding and dispatch.
//!
//! Binding errors are configuration mistakes and surface from
//! [`ServiceDefinition::bind`](crate::definition::ServiceDefinition::bind)
//! before anything is installed. Dispatch errors belong to a single request
//! and are rendered into that request's response by the installer that owns
//! the route.

use crate::entity::EntityError;
use crate::handler::HttpMethod;
use crate::media::MediaType;
use std::fmt;

/// Configuration error raised while binding a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// `with_path` was never called
    MissingPath,
    /// Neither `using_entity` nor `using_delegate` was called
    MissingEntity,
    /// The base path is empty or contains placeholder segments
    InvalidPath { path: String },
    /// A handler names an entity method that is not registered with the
    /// arity its verb needs
    UnresolvedMethod {
        dispatch_key: String,
        method: String,
        expected_arities: Vec<usize>,
        registered_arities: Vec<usize>,
    },
    /// Another definition already owns the base path on this host
    PathAlreadyBound { base_path: String },
    /// The host stack refused the installation
    Host { reason: String },
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::MissingPath => write!(f, "service definition has no base path"),
            BindError::MissingEntity => {
                write!(f, "service definition has no backing entity or delegate")
            }
            BindError::InvalidPath { path } => write!(f, "invalid base path '{path}'"),
            BindError::UnresolvedMethod {
                dispatch_key,
                method,
                expected_arities,
                registered_arities,
            } => write!(
                f,
                "handler '{dispatch_key}' targets method '{method}' with arity {expected_arities:?}, \
                 but the entity registers arities {registered_arities:?}"
            ),
            BindError::PathAlreadyBound { base_path } => write!(
                f,
                "base path '{base_path}' is already bound by another service definition"
            ),
            BindError::Host { reason } => write!(f, "host stack error: {reason}"),
        }
    }
}

impl std::error::Error for BindError {}

/// Failure of a single request inside the dispatch bridge.
#[derive(Debug)]
pub enum DispatchError {
    /// No handler is registered for the service token
    NoHandler { service: String },
    /// The handler exists but is declared for a different verb
    MethodNotAllowed {
        service: String,
        allowed: HttpMethod,
        requested: HttpMethod,
    },
    /// None of the acceptable media types can be produced
    NotAcceptable {
        accept: String,
        produces: Vec<MediaType>,
    },
    /// The request body's media type cannot be consumed
    UnsupportedMediaType {
        content_type: String,
        consumes: Vec<MediaType>,
    },
    /// A POST carried neither form fields nor a body
    NoFormParams { service: String },
    /// A declared form field is missing from the request
    MissingFormParam { service: String, name: String },
    /// The body could not be decoded into the declared type
    MalformedBody { reason: String },
    /// The handler's target method has no overload for this request shape
    UnresolvedMethod { method: String, arity: usize },
    /// The entity method or action failed
    Invocation {
        service: String,
        source: EntityError,
    },
    /// The result could not be rendered in the negotiated media type
    Render { media: MediaType, reason: String },
}

impl DispatchError {
    /// Default transport status for this error.
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::NoHandler { .. } => 404,
            DispatchError::MethodNotAllowed { .. } => 405,
            DispatchError::NotAcceptable { .. } => 406,
            DispatchError::UnsupportedMediaType { .. } => 415,
            DispatchError::NoFormParams { .. }
            | DispatchError::MissingFormParam { .. }
            | DispatchError::MalformedBody { .. } => 400,
            DispatchError::UnresolvedMethod { .. }
            | DispatchError::Invocation { .. }
            | DispatchError::Render { .. } => 500,
        }
    }

    /// Short machine-readable kind, used in error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::NoHandler { .. } => "no_handler",
            DispatchError::MethodNotAllowed { .. } => "method_not_allowed",
            DispatchError::NotAcceptable { .. } => "not_acceptable",
            DispatchError::UnsupportedMediaType { .. } => "unsupported_media_type",
            DispatchError::NoFormParams { .. } => "no_form_params",
            DispatchError::MissingFormParam { .. } => "missing_form_param",
            DispatchError::MalformedBody { .. } => "malformed_body",
            DispatchError::UnresolvedMethod { .. } => "unresolved_method",
            DispatchError::Invocation { .. } => "invocation_failed",
            DispatchError::Render { .. } => "render_failed",
        }
    }
}

fn join_media(media: &[MediaType]) -> String {
    media
        .iter()
        .map(MediaType::to_media_type)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NoHandler { service } => {
                write!(f, "No ServiceHandler defined for service {service}")
            }
            DispatchError::MethodNotAllowed {
                service,
                allowed,
                requested,
            } => write!(
                f,
                "Method {requested} not allowed for service {service}; expected {allowed}"
            ),
            DispatchError::NotAcceptable { accept, produces } => write!(
                f,
                "Cannot produce any of '{accept}'; available: {}",
                join_media(produces)
            ),
            DispatchError::UnsupportedMediaType {
                content_type,
                consumes,
            } => write!(
                f,
                "Unsupported content type '{content_type}'; accepted: {}",
                join_media(consumes)
            ),
            DispatchError::NoFormParams { service } => {
                write!(f, "No form params for service {service}")
            }
            DispatchError::MissingFormParam { service, name } => {
                write!(f, "Missing form param '{name}' for service {service}")
            }
            DispatchError::MalformedBody { reason } => write!(f, "Malformed request body: {reason}"),
            DispatchError::UnresolvedMethod { method, arity } => {
                write!(f, "No method {method} taking {arity} argument(s)")
            }
            DispatchError::Invocation { service, source } => {
                write!(f, "Invocation of service {service} failed: {source}")
            }
            DispatchError::Render { media, reason } => {
                write!(f, "Cannot render response as {media}: {reason}")
            }
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Invocation { source, .. } => Some(source),
            _ => None,
        }
    }
}

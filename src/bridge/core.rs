use super::invoker::{Invoker, RAW_ARITY};
use super::render::render;
use crate::dispatcher::{HandlerRequest, HeaderVec, RequestBody};
use crate::entity::{ActionContext, EntityError, EntityMethod};
use crate::error::DispatchError;
use crate::handler::{HttpMethod, ServiceHandler};
use crate::ids::DefinitionId;
use crate::mapper::{MappedHandler, ServiceHandlerMapper};
use crate::media::{self, MediaType};
use crate::router::ParamVec;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Path parameter carrying the service token on every installed route.
pub const SERVICE_PARAM: &str = "service";
/// Path parameter carrying the id token on every installed route.
pub const ID_PARAM: &str = "id";

/// Media types consumed when neither the handler nor the definition says.
const DEFAULT_CONSUMES: [MediaType; 4] = [
    MediaType::APPLICATION_JSON,
    MediaType::APPLICATION_XML,
    MediaType::TEXT_PLAIN,
    MediaType::FORM_URLENCODED,
];

/// Media types produced when neither the handler nor the definition says.
const DEFAULT_PRODUCES: [MediaType; 1] = [MediaType::APPLICATION_JSON];

/// One inbound call as seen by the bridge.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub method: HttpMethod,
    pub service: String,
    pub id: String,
    /// Lowercase header names
    pub headers: HeaderVec,
    pub query: ParamVec,
    pub body: RequestBody,
}

impl DispatchRequest {
    pub fn new(method: HttpMethod, service: &str, id: &str) -> Self {
        Self {
            method,
            service: service.to_string(),
            id: id.to_string(),
            headers: HeaderVec::new(),
            query: ParamVec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .push((Arc::from(name.to_ascii_lowercase().as_str()), value.to_string()));
        self
    }

    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.query.push((Arc::from(name), value.to_string()));
        self
    }

    /// Attach a form-encoded body.
    pub fn with_form(mut self, fields: &[(&str, &str)]) -> Self {
        self.body = RequestBody::Form(
            fields
                .iter()
                .map(|(k, v)| (Arc::from(*k), (*v).to_string()))
                .collect(),
        );
        self
    }

    /// Attach a raw body with its content type.
    pub fn with_raw_body(mut self, content_type: &str, text: &str) -> Self {
        self.body = RequestBody::Raw {
            content_type: Some(content_type.to_string()),
            text: text.to_string(),
        };
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn accept(&self) -> Option<&str> {
        self.header("accept")
    }

    /// Content type of the entity, if there is one.
    pub fn content_type(&self) -> Option<String> {
        match &self.body {
            RequestBody::Empty => None,
            RequestBody::Form(_) => Some(MediaType::FORM_URLENCODED.to_media_type()),
            RequestBody::Raw { content_type, .. } => content_type
                .clone()
                .or_else(|| self.header("content-type").map(str::to_string)),
        }
    }

    /// Build from a routed host request. `None` for verbs a handler cannot
    /// be declared for.
    pub fn from_handler_request(req: &HandlerRequest) -> Option<Self> {
        let method = HttpMethod::from_http(&req.method)?;
        Some(Self {
            method,
            service: req.get_path_param(SERVICE_PARAM).unwrap_or_default().to_string(),
            id: req.get_path_param(ID_PARAM).unwrap_or_default().to_string(),
            headers: req.headers.clone(),
            query: req.query_params.clone(),
            body: req.body.clone(),
        })
    }
}

/// Outcome of a successful dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResponse {
    pub status: u16,
    /// Negotiated media type of `body`
    pub media: Option<MediaType>,
    pub body: Option<String>,
}

/// The live entry point produced by binding a definition.
///
/// Holds the definition's mapper and the entries this bind registered in it.
/// Requests only read this state.
#[derive(Debug)]
pub struct DispatchResource {
    definition_id: DefinitionId,
    base_path: String,
    mapper: Arc<ServiceHandlerMapper>,
    entries: HashMap<String, Arc<MappedHandler>>,
    produces: Vec<MediaType>,
    consumes: Vec<MediaType>,
}

impl DispatchResource {
    pub(crate) fn new(
        definition_id: DefinitionId,
        base_path: String,
        mapper: Arc<ServiceHandlerMapper>,
        entries: HashMap<String, Arc<MappedHandler>>,
        produces: Vec<MediaType>,
        consumes: Vec<MediaType>,
    ) -> Self {
        Self {
            definition_id,
            base_path,
            mapper,
            entries,
            produces,
            consumes,
        }
    }

    pub fn definition_id(&self) -> DefinitionId {
        self.definition_id
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn mapper(&self) -> &Arc<ServiceHandlerMapper> {
        &self.mapper
    }

    /// Mapper entries registered by this bind, keyed by dispatch token.
    pub fn entries(&self) -> &HashMap<String, Arc<MappedHandler>> {
        &self.entries
    }

    /// Dispatch tokens this bind registered, sorted.
    pub fn dispatch_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Run one request through lookup, verb check, negotiation, invocation
    /// and rendering.
    pub fn handle(&self, req: &DispatchRequest) -> Result<DispatchResponse, DispatchError> {
        let entry = self
            .mapper
            .lookup(&req.service)
            .ok_or_else(|| DispatchError::NoHandler {
                service: req.service.clone(),
            })?;
        let handler = entry.handler();

        if handler.http_method() != req.method {
            return Err(DispatchError::MethodNotAllowed {
                service: req.service.clone(),
                allowed: handler.http_method(),
                requested: req.method,
            });
        }

        self.check_content_type(handler, req)?;
        let media = self.negotiate(handler, req)?;

        debug!(
            base_path = %self.base_path,
            service = %req.service,
            id = %req.id,
            method = %req.method,
            media = %media,
            "Invoking service handler"
        );

        let value = self.invoke(&entry, req).inspect_err(|e| {
            if let DispatchError::Invocation { source, .. } = e {
                error!(
                    base_path = %self.base_path,
                    service = %req.service,
                    id = %req.id,
                    error = %source,
                    "Service invocation failed"
                );
            }
        })?;
        let value = match handler.transformer() {
            Some(visit) => visit(value),
            None => value,
        };

        let (status, body) = match req.method {
            HttpMethod::Put if value.is_null() => (201, None),
            HttpMethod::Put => (201, Some(value)),
            HttpMethod::Post if value.is_null() => (204, None),
            _ => (200, Some(value)),
        };

        let body = body.map(|v| render(&v, &media)).transpose()?;
        Ok(DispatchResponse {
            status,
            media: body.as_ref().map(|_| media),
            body,
        })
    }

    fn check_content_type(
        &self,
        handler: &ServiceHandler,
        req: &DispatchRequest,
    ) -> Result<(), DispatchError> {
        let Some(content_type) = req.content_type() else {
            return Ok(());
        };
        let mut consumes = pick(handler.media_to_consume(), &self.consumes, &DEFAULT_CONSUMES);
        if !handler.form_params().is_empty() && !consumes.contains(&MediaType::FORM_URLENCODED) {
            consumes.push(MediaType::FORM_URLENCODED);
        }
        if media::accepts(&content_type, &consumes) {
            Ok(())
        } else {
            warn!(service = %req.service, content_type = %content_type, "Unsupported content type");
            Err(DispatchError::UnsupportedMediaType {
                content_type,
                consumes,
            })
        }
    }

    fn negotiate(
        &self,
        handler: &ServiceHandler,
        req: &DispatchRequest,
    ) -> Result<MediaType, DispatchError> {
        let produces = pick(handler.media_to_produce(), &self.produces, &DEFAULT_PRODUCES);
        media::negotiate(req.accept(), &produces).ok_or_else(|| {
            warn!(service = %req.service, accept = ?req.accept(), "Not acceptable");
            DispatchError::NotAcceptable {
                accept: req.accept().unwrap_or_default().to_string(),
                produces,
            }
        })
    }

    fn invoke(&self, entry: &MappedHandler, req: &DispatchRequest) -> Result<Value, DispatchError> {
        let handler = entry.handler().as_ref();
        // the mapped entry may come from another definition sharing the mapper
        let invoker = entry
            .invoker()
            .ok_or_else(|| DispatchError::UnresolvedMethod {
                method: handler.target().name().to_string(),
                arity: expected_arity(handler, req),
            })?;
        let failed = |source: EntityError| DispatchError::Invocation {
            service: req.service.clone(),
            source,
        };

        match invoker {
            Invoker::Action(action) => {
                let ctx = self.action_context(handler, req)?;
                action.action(&ctx).map_err(failed)
            }
            Invoker::Entity { positional, raw } => {
                let (method, args) = entity_call(handler, req, positional.as_ref(), raw.as_ref())?;
                method.invoke(&args).map_err(failed)
            }
        }
    }

    fn action_context(
        &self,
        handler: &ServiceHandler,
        req: &DispatchRequest,
    ) -> Result<ActionContext, DispatchError> {
        let mut ctx = ActionContext::new(req.method, &req.service, &req.id)
            .with_path_param(SERVICE_PARAM, &req.service)
            .with_path_param(handler.id_param(), &req.id);
        for (name, value) in &req.headers {
            ctx = ctx.with_header(name, value);
        }
        for (name, value) in &req.query {
            ctx = ctx.with_query_param(name, value);
        }

        match &req.body {
            RequestBody::Empty if req.method == HttpMethod::Post => {
                return Err(DispatchError::NoFormParams {
                    service: req.service.clone(),
                });
            }
            RequestBody::Empty => {}
            RequestBody::Form(fields) => {
                for name in handler.form_params() {
                    if req.body.form_field(name).is_none() {
                        return Err(DispatchError::MissingFormParam {
                            service: req.service.clone(),
                            name: name.clone(),
                        });
                    }
                }
                for (name, value) in fields {
                    ctx = ctx.with_form_param(name, value);
                }
            }
            RequestBody::Raw { text, .. } => {
                ctx = ctx.with_body(decode_body(handler, req, text)?);
            }
        }
        Ok(ctx)
    }
}

/// Choose the entity overload and its positional arguments.
fn entity_call<'a>(
    handler: &ServiceHandler,
    req: &DispatchRequest,
    positional: Option<&'a EntityMethod>,
    raw: Option<&'a EntityMethod>,
) -> Result<(&'a EntityMethod, Vec<String>), DispatchError> {
    let unresolved = |arity: usize| DispatchError::UnresolvedMethod {
        method: handler.target().name().to_string(),
        arity,
    };

    if req.method != HttpMethod::Post {
        let method = positional.ok_or_else(|| unresolved(1))?;
        return Ok((method, vec![req.id.clone()]));
    }

    match &req.body {
        RequestBody::Raw { text, .. } => {
            let method = raw.ok_or_else(|| unresolved(RAW_ARITY))?;
            if handler.consume_type().is_some() {
                decode_body(handler, req, text)?;
            }
            Ok((method, vec![req.id.clone(), text.clone()]))
        }
        RequestBody::Form(_) if !handler.form_params().is_empty() => {
            let method = positional.ok_or_else(|| unresolved(1 + handler.form_params().len()))?;
            let mut args = Vec::with_capacity(1 + handler.form_params().len());
            args.push(req.id.clone());
            for name in handler.form_params() {
                let value = req.body.form_field(name).ok_or_else(|| {
                    DispatchError::MissingFormParam {
                        service: req.service.clone(),
                        name: name.clone(),
                    }
                })?;
                args.push(value.to_string());
            }
            Ok((method, args))
        }
        _ => Err(DispatchError::NoFormParams {
            service: req.service.clone(),
        }),
    }
}

/// Arity an entity method would need to serve `req` through `handler`.
fn expected_arity(handler: &ServiceHandler, req: &DispatchRequest) -> usize {
    match (req.method, &req.body) {
        (HttpMethod::Post, RequestBody::Raw { .. }) => RAW_ARITY,
        (HttpMethod::Post, _) if handler.form_params().is_empty() => RAW_ARITY,
        (HttpMethod::Post, _) => 1 + handler.form_params().len(),
        _ => 1,
    }
}

/// Decode a raw body as JSON and check it against the handler's consume type.
///
/// Without a consume type, a body that is not JSON is passed on as a string.
fn decode_body(
    handler: &ServiceHandler,
    req: &DispatchRequest,
    text: &str,
) -> Result<Value, DispatchError> {
    let is_json = req
        .content_type()
        .and_then(|ct| ct.parse::<MediaType>().ok())
        .map_or(true, |mt| mt.subtype() == "json" || mt.subtype().ends_with("+json"));

    match handler.consume_type() {
        Some(ty) => {
            let value: Value = serde_json::from_str(text).map_err(|e| {
                DispatchError::MalformedBody {
                    reason: format!("expected {}: {e}", ty.type_name()),
                }
            })?;
            ty.check(&value).map_err(|e| DispatchError::MalformedBody {
                reason: format!("expected {}: {e}", ty.type_name()),
            })?;
            Ok(value)
        }
        None if is_json => serde_json::from_str(text).map_err(|e| DispatchError::MalformedBody {
            reason: e.to_string(),
        }),
        None => Ok(Value::String(text.to_string())),
    }
}

fn pick(handler: &[MediaType], definition: &[MediaType], fallback: &[MediaType]) -> Vec<MediaType> {
    if !handler.is_empty() {
        handler.to_vec()
    } else if !definition.is_empty() {
        definition.to_vec()
    } else {
        fallback.to_vec()
    }
}

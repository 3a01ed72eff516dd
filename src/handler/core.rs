use crate::entity::Action;
use crate::media::MediaType;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// HTTP verbs a handler can be declared for.
///
/// `Head` is modelled so definitions can describe it, but installers only
/// create entry points for GET, PUT, POST and DELETE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
}

impl HttpMethod {
    /// Verbs that get an entry point on the host stack.
    pub const DISPATCHED: [HttpMethod; 4] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }

    pub fn to_http(self) -> http::Method {
        match self {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Delete => http::Method::DELETE,
            HttpMethod::Head => http::Method::HEAD,
        }
    }

    pub fn from_http(method: &http::Method) -> Option<Self> {
        method.as_str().parse().ok()
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            other => Err(format!("unsupported HTTP method '{other}'")),
        }
    }
}

/// What a handler invokes: a named method on the backing entity, or an
/// explicit [`Action`].
#[derive(Clone)]
pub enum Target {
    Method(String),
    Action(Arc<dyn Action>),
}

impl Target {
    /// Wrap an action value.
    pub fn action<A: Action>(action: A) -> Self {
        Target::Action(Arc::new(action))
    }

    /// Method name, or the action's name.
    pub fn name(&self) -> &str {
        match self {
            Target::Method(name) => name,
            Target::Action(action) => action.name(),
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Method(name) => f.debug_tuple("Method").field(name).finish(),
            Target::Action(action) => f.debug_tuple("Action").field(&action.name()).finish(),
        }
    }
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Target::Method(name.to_string())
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Target::Method(name)
    }
}

impl From<Arc<dyn Action>> for Target {
    fn from(action: Arc<dyn Action>) -> Self {
        Target::Action(action)
    }
}

/// Type descriptor for a request body.
///
/// Records the Rust type name and a check that the decoded JSON
/// deserializes into that type. Actions read the body back with
/// [`ActionContext::body_as`](crate::entity::ActionContext::body_as).
#[derive(Clone, Copy)]
pub struct ConsumeType {
    type_name: &'static str,
    check: fn(&Value) -> Result<(), serde_json::Error>,
}

fn check_as<T: DeserializeOwned>(value: &Value) -> Result<(), serde_json::Error> {
    T::deserialize(value).map(|_| ())
}

impl ConsumeType {
    pub fn of<T: DeserializeOwned>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            check: check_as::<T>,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn check(&self, value: &Value) -> Result<(), serde_json::Error> {
        (self.check)(value)
    }
}

impl fmt::Debug for ConsumeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConsumeType").field(&self.type_name).finish()
    }
}

/// Converts a raw return value into its public view shape before rendering.
pub type ViewTransformer = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Errors raised while building a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Form parameters were declared on a verb that does not take a form body
    FormParamsNotAllowed {
        method: HttpMethod,
        param: String,
    },
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::FormParamsNotAllowed { method, param } => write!(
                f,
                "form parameter '{param}' declared on a {method} handler; only POST handlers take form parameters"
            ),
        }
    }
}

impl std::error::Error for HandlerError {}

/// Descriptor binding one HTTP verb and dispatch token to a target.
#[derive(Clone)]
pub struct ServiceHandler {
    http_method: HttpMethod,
    path: Option<String>,
    target: Target,
    media_to_produce: Vec<MediaType>,
    media_to_consume: Vec<MediaType>,
    form_params: Vec<String>,
    consume_type: Option<ConsumeType>,
    transformer: Option<ViewTransformer>,
}

impl ServiceHandler {
    fn new(http_method: HttpMethod, path: Option<&str>, target: Target) -> Self {
        Self {
            http_method,
            path: path.map(str::to_string),
            target,
            media_to_produce: Vec::new(),
            media_to_consume: Vec::new(),
            form_params: Vec::new(),
            consume_type: None,
            transformer: None,
        }
    }

    pub fn get(path: Option<&str>, target: impl Into<Target>) -> Self {
        Self::new(HttpMethod::Get, path, target.into())
    }

    pub fn post(path: Option<&str>, target: impl Into<Target>) -> Self {
        Self::new(HttpMethod::Post, path, target.into())
    }

    pub fn put(path: Option<&str>, target: impl Into<Target>) -> Self {
        Self::new(HttpMethod::Put, path, target.into())
    }

    pub fn delete(path: Option<&str>, target: impl Into<Target>) -> Self {
        Self::new(HttpMethod::Delete, path, target.into())
    }

    pub fn head(path: Option<&str>, target: impl Into<Target>) -> Self {
        Self::new(HttpMethod::Head, path, target.into())
    }

    /// Append a media type this handler can render.
    pub fn producing(mut self, media: MediaType) -> Self {
        self.media_to_produce.push(media);
        self
    }

    /// Append a media type this handler accepts as a request body.
    pub fn consuming(mut self, media: MediaType) -> Self {
        self.media_to_consume.push(media);
        self
    }

    /// Accept `media` and decode the body as `T`.
    pub fn consume_with<T: DeserializeOwned>(mut self, media: MediaType) -> Self {
        self.media_to_consume.push(media);
        self.consume_type = Some(ConsumeType::of::<T>());
        self
    }

    /// Declare a form field passed positionally after the id token.
    ///
    /// Only POST handlers take form parameters.
    pub fn add_form_param(mut self, name: &str) -> Result<Self, HandlerError> {
        if self.http_method != HttpMethod::Post {
            return Err(HandlerError::FormParamsNotAllowed {
                method: self.http_method,
                param: name.to_string(),
            });
        }
        self.form_params.push(name.to_string());
        Ok(self)
    }

    /// Transform the target's return value before it is rendered.
    pub fn visiting<F>(mut self, transformer: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transformer = Some(Arc::new(transformer));
        self
    }

    pub fn http_method(&self) -> HttpMethod {
        self.http_method
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn media_to_produce(&self) -> &[MediaType] {
        &self.media_to_produce
    }

    pub fn media_to_consume(&self) -> &[MediaType] {
        &self.media_to_consume
    }

    pub fn form_params(&self) -> &[String] {
        &self.form_params
    }

    pub fn consume_type(&self) -> Option<&ConsumeType> {
        self.consume_type.as_ref()
    }

    pub fn transformer(&self) -> Option<&ViewTransformer> {
        self.transformer.as_ref()
    }

    /// Key under which the handler is registered in the mapper.
    pub fn dispatch_key(&self) -> String {
        self.path
            .as_deref()
            .and_then(|p| {
                p.split('/')
                    .filter(|s| !s.is_empty())
                    .take_while(|s| !is_placeholder(s))
                    .next()
            })
            .map(str::to_string)
            .unwrap_or_else(|| self.target.name().to_string())
    }

    /// Name the id token is exposed under; `id` unless the path declares one.
    pub fn id_param(&self) -> &str {
        self.path
            .as_deref()
            .and_then(|p| p.split('/').find(|s| is_placeholder(s)))
            .map(placeholder_name)
            .unwrap_or("id")
    }
}

impl fmt::Debug for ServiceHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandler")
            .field("http_method", &self.http_method)
            .field("path", &self.path)
            .field("target", &self.target)
            .field("media_to_produce", &self.media_to_produce)
            .field("media_to_consume", &self.media_to_consume)
            .field("form_params", &self.form_params)
            .field("consume_type", &self.consume_type)
            .field("transformer", &self.transformer.is_some())
            .finish()
    }
}

fn is_placeholder(segment: &str) -> bool {
    segment.starts_with(':') || (segment.starts_with('{') && segment.ends_with('}'))
}

fn placeholder_name(segment: &str) -> &str {
    segment
        .trim_start_matches(':')
        .trim_start_matches('{')
        .trim_end_matches('}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_tag_fixed_by_constructor() {
        assert_eq!(ServiceHandler::get(None, "a").http_method(), HttpMethod::Get);
        assert_eq!(ServiceHandler::put(None, "a").http_method(), HttpMethod::Put);
        assert_eq!(ServiceHandler::post(None, "a").http_method(), HttpMethod::Post);
        assert_eq!(
            ServiceHandler::delete(None, "a").http_method(),
            HttpMethod::Delete
        );
    }

    #[test]
    fn test_dispatch_key_falls_back_to_method_name() {
        let h = ServiceHandler::get(None, "getAddressBook");
        assert_eq!(h.dispatch_key(), "getAddressBook");
        assert_eq!(h.id_param(), "id");
    }

    #[test]
    fn test_dispatch_key_from_path() {
        let h = ServiceHandler::get(Some("/books/:book"), "getAddressBook");
        assert_eq!(h.dispatch_key(), "books");
        assert_eq!(h.id_param(), "book");

        let h = ServiceHandler::get(Some("{name}"), "getAddressBook");
        assert_eq!(h.dispatch_key(), "getAddressBook");
        assert_eq!(h.id_param(), "name");
    }

    #[test]
    fn test_form_params_only_on_post() {
        let post = ServiceHandler::post(None, "update")
            .add_form_param("a")
            .and_then(|h| h.add_form_param("b"))
            .unwrap();
        assert_eq!(post.form_params(), ["a", "b"]);

        let err = ServiceHandler::get(None, "read")
            .add_form_param("a")
            .unwrap_err();
        assert_eq!(
            err,
            HandlerError::FormParamsNotAllowed {
                method: HttpMethod::Get,
                param: "a".to_string()
            }
        );
    }

    #[test]
    fn test_media_builders_append_in_order() {
        let h = ServiceHandler::get(None, "read")
            .producing(MediaType::APPLICATION_JSON)
            .producing(MediaType::APPLICATION_XML);
        assert_eq!(
            h.media_to_produce(),
            [MediaType::APPLICATION_JSON, MediaType::APPLICATION_XML]
        );
    }

    #[test]
    fn test_consume_type_checks_shape() {
        #[derive(serde::Deserialize)]
        #[allow(dead_code)]
        struct Entry {
            name: String,
        }
        let h = ServiceHandler::put(None, "store")
            .consume_with::<Entry>(MediaType::APPLICATION_JSON);
        let ct = h.consume_type().unwrap();
        assert!(ct.check(&serde_json::json!({"name": "x"})).is_ok());
        assert!(ct.check(&serde_json::json!({"other": 1})).is_err());
        assert!(ct.type_name().ends_with("Entry"));
    }

    #[test]
    fn test_http_method_round_trip() {
        for m in HttpMethod::DISPATCHED {
            assert_eq!(HttpMethod::from_http(&m.to_http()), Some(m));
        }
        assert!("PATCH".parse::<HttpMethod>().is_err());
    }
}

use super::EntityError;
use crate::handler::HttpMethod;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

/// A single typed object serving every verb of a resource.
///
/// The dispatch bridge calls [`Action::action`] for each request; the
/// implementation switches on [`ActionContext::method`]. A null return value
/// renders as "no content" for POST.
pub trait Action: Send + Sync + 'static {
    /// Name used in logs and as the fallback dispatch key.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn action(&self, ctx: &ActionContext) -> Result<Value, EntityError>;
}

/// Everything an [`Action`] gets to see about one request.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub(crate) method: HttpMethod,
    pub(crate) service: String,
    pub(crate) path_value: String,
    pub(crate) path_params: HashMap<String, String>,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) query_params: HashMap<String, String>,
    pub(crate) form_params: HashMap<String, String>,
    pub(crate) body: Option<Value>,
}

impl ActionContext {
    pub fn new(method: HttpMethod, service: &str, path_value: &str) -> Self {
        Self {
            method,
            service: service.to_string(),
            path_value: path_value.to_string(),
            path_params: HashMap::new(),
            headers: HashMap::new(),
            query_params: HashMap::new(),
            form_params: HashMap::new(),
            body: None,
        }
    }

    pub fn with_path_param(mut self, name: &str, value: &str) -> Self {
        self.path_params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_query_param(mut self, name: &str, value: &str) -> Self {
        self.query_params
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_form_param(mut self, name: &str, value: &str) -> Self {
        self.form_params
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// The request verb.
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The service token the request was routed by.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The id token following the service token.
    pub fn path_value(&self) -> &str {
        &self.path_value
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    /// Header lookup, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    pub fn form_param(&self, name: &str) -> Option<&str> {
        self.form_params.get(name).map(String::as_str)
    }

    pub fn form_params(&self) -> &HashMap<String, String> {
        &self.form_params
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Deserialize the decoded body into `T`.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, EntityError> {
        let body = self
            .body
            .as_ref()
            .ok_or_else(|| EntityError::invalid_argument("request has no body"))?;
        T::deserialize(body).map_err(|e| EntityError::invalid_argument(e.to_string()))
    }
}

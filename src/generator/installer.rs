use super::host::Host;
use crate::bridge::{DispatchRequest, DispatchResource, DispatchResponse};
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::error::{BindError, DispatchError};
use crate::handler::HttpMethod;
use crate::router::RouteMeta;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which host-stack flavour a definition is installed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallStyle {
    /// Annotated-resource style: `{service}/{id}` templates, missing
    /// handlers surface as server errors
    #[default]
    Resource,
    /// Page style: `:service/:id` templates, missing handlers are 404 replies
    Page,
}

impl InstallStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallStyle::Resource => "resource",
            InstallStyle::Page => "page",
        }
    }
}

impl fmt::Display for InstallStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstallStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "resource" | "jaxrs" => Ok(InstallStyle::Resource),
            "page" | "sitebricks" => Ok(InstallStyle::Page),
            other => Err(format!("unknown install style '{other}' (expected resource|page)")),
        }
    }
}

/// Host-specific glue for installing a [`DispatchResource`].
///
/// Implementors supply the route template syntax and error rendering; the
/// provided `install` and `uninstall` create and remove one entry point per
/// dispatched verb at `{base}/{service}/{id}`.
pub trait RouteInstaller: Send + Sync + 'static {
    fn style(&self) -> InstallStyle;

    fn host(&self) -> &Host;

    /// Route template for a normalised base path.
    fn route_pattern(&self, base_path: &str) -> String;

    /// Reply for a request the bridge rejected.
    fn render_error(err: &DispatchError) -> HandlerResponse;

    /// Dispatcher name of the entry point for `method` at `base_path`.
    fn handler_name(&self, base_path: &str, method: HttpMethod) -> String {
        format!("{}:{}:{}", self.style(), base_path, method)
    }

    fn install(&self, base_path: &str, resource: Arc<DispatchResource>) -> Result<(), BindError>
    where
        Self: Sized,
    {
        let pattern = self.route_pattern(base_path);
        let host = self.host();
        let mut router = host.write_router()?;
        let mut dispatcher = host.write_dispatcher()?;

        for method in HttpMethod::DISPATCHED {
            let name = self.handler_name(base_path, method);
            router.remove_handler(&name);
            router
                .add_route(RouteMeta {
                    method: method.to_http(),
                    path_pattern: pattern.clone(),
                    handler_name: name.clone(),
                    base_path: base_path.to_string(),
                })
                .map_err(|e| BindError::Host {
                    reason: format!("cannot route '{pattern}': {e}"),
                })?;

            let resource = Arc::clone(&resource);
            dispatcher.register_handler(&name, move |req: &HandlerRequest| {
                serve::<Self>(&resource, req)
            });
        }

        info!(
            style = %self.style(),
            base_path = %base_path,
            route_pattern = %pattern,
            "Dispatch resource installed"
        );
        Ok(())
    }

    fn uninstall(&self, base_path: &str) -> Result<(), BindError> {
        let host = self.host();
        let mut router = host.write_router()?;
        let mut dispatcher = host.write_dispatcher()?;
        let mut removed = 0;
        for method in HttpMethod::DISPATCHED {
            let name = self.handler_name(base_path, method);
            removed += router.remove_handler(&name);
            dispatcher.remove_handler(&name);
        }
        debug!(
            style = %self.style(),
            base_path = %base_path,
            routes_removed = removed,
            "Dispatch resource uninstalled"
        );
        Ok(())
    }
}

fn serve<I: RouteInstaller>(resource: &DispatchResource, req: &HandlerRequest) -> HandlerResponse {
    let Some(dispatch) = DispatchRequest::from_handler_request(req) else {
        return HandlerResponse::error(405, &format!("Method {} not allowed", req.method));
    };
    match resource.handle(&dispatch) {
        Ok(resp) => to_handler_response(resp),
        Err(err) => {
            if err.status() < 500 {
                debug!(
                    request_id = %req.request_id,
                    service = %dispatch.service,
                    kind = err.kind(),
                    error = %err,
                    "Request rejected"
                );
            } else {
                warn!(
                    request_id = %req.request_id,
                    service = %dispatch.service,
                    kind = err.kind(),
                    error = %err,
                    "Request failed"
                );
            }
            I::render_error(&err)
        }
    }
}

fn to_handler_response(resp: DispatchResponse) -> HandlerResponse {
    match (resp.body, resp.media) {
        (Some(body), Some(media)) => HandlerResponse::text(resp.status, &media.to_media_type(), body),
        _ => HandlerResponse::empty(resp.status),
    }
}

/// JSON error body with the error's kind and message.
fn error_reply(status: u16, err: &DispatchError) -> HandlerResponse {
    let mut body = json!({
        "error": err.to_string(),
        "kind": err.kind(),
        "status": status,
    });
    if let DispatchError::Invocation { source, .. } = err {
        body["cause"] = json!(source.to_string());
    }
    let mut resp = HandlerResponse::json(status, body);
    if let DispatchError::MethodNotAllowed { allowed, .. } = err {
        resp.set_header("allow", allowed.to_string());
    }
    resp
}

/// Installs resources the way an annotated-resource container would.
#[derive(Debug, Clone)]
pub struct ResourceInstaller {
    host: Host,
}

impl ResourceInstaller {
    pub fn new(host: Host) -> Self {
        Self { host }
    }
}

impl RouteInstaller for ResourceInstaller {
    fn style(&self) -> InstallStyle {
        InstallStyle::Resource
    }

    fn host(&self) -> &Host {
        &self.host
    }

    fn route_pattern(&self, base_path: &str) -> String {
        format!("{base_path}/{{service}}/{{id}}")
    }

    /// A missing handler is a server-side failure wrapping the lookup error.
    fn render_error(err: &DispatchError) -> HandlerResponse {
        match err {
            DispatchError::NoHandler { .. } => HandlerResponse::json(
                500,
                json!({
                    "error": "Internal Server Error",
                    "kind": err.kind(),
                    "status": 500,
                    "cause": err.to_string(),
                }),
            ),
            _ => error_reply(err.status(), err),
        }
    }
}

/// Installs resources the way a page-oriented framework would.
#[derive(Debug, Clone)]
pub struct PageInstaller {
    host: Host,
}

impl PageInstaller {
    pub fn new(host: Host) -> Self {
        Self { host }
    }
}

impl RouteInstaller for PageInstaller {
    fn style(&self) -> InstallStyle {
        InstallStyle::Page
    }

    fn host(&self) -> &Host {
        &self.host
    }

    fn route_pattern(&self, base_path: &str) -> String {
        format!("{base_path}/:service/:id")
    }

    fn render_error(err: &DispatchError) -> HandlerResponse {
        error_reply(err.status(), err)
    }
}

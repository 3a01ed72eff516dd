use super::request::{parse_request, ParsedRequest};
use super::response::{write_handler_response, write_json_error};
use crate::dispatcher::Dispatcher;
use crate::generator::Host;
use crate::ids::RequestId;
use crate::middleware::MetricsMiddleware;
use crate::router::Router;
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use std::io;
use std::sync::{Arc, RwLock};
use tracing::error;

/// HTTP front of a [`Host`]: built-in endpoints, then route and dispatch.
#[derive(Clone)]
pub struct AppService {
    pub router: Arc<RwLock<Router>>,
    pub dispatcher: Arc<RwLock<Dispatcher>>,
    pub metrics: Option<Arc<MetricsMiddleware>>,
}

impl AppService {
    pub fn new(router: Arc<RwLock<Router>>, dispatcher: Arc<RwLock<Dispatcher>>) -> Self {
        Self {
            router,
            dispatcher,
            metrics: None,
        }
    }

    /// Serve whatever is currently installed on `host`.
    pub fn from_host(host: &Host) -> Self {
        Self::new(host.router(), host.dispatcher())
    }

    pub fn set_metrics_middleware(&mut self, metrics: Arc<MetricsMiddleware>) {
        self.metrics = Some(metrics);
    }
}

/// Basic health check endpoint returning `{ "status": "ok" }`.
pub fn health_endpoint(res: &mut Response) -> io::Result<()> {
    res.status_code(200, "OK");
    res.header("Content-Type: application/json");
    res.body_vec(json!({ "status": "ok" }).to_string().into_bytes());
    Ok(())
}

/// Metrics endpoint returning Prometheus text format statistics.
pub fn metrics_endpoint(res: &mut Response, metrics: &MetricsMiddleware) -> io::Result<()> {
    res.status_code(200, "OK");
    res.header("Content-Type: text/plain; version=0.0.4");
    res.body_vec(metrics.render_prometheus().into_bytes());
    Ok(())
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let ParsedRequest {
            method,
            path,
            headers,
            query_params,
            body,
        } = parse_request(req);

        if method == "GET" && path == "/health" {
            if let Some(metrics) = &self.metrics {
                metrics.inc_top_level_request();
            }
            return health_endpoint(res);
        }
        if method == "GET" && path == "/metrics" {
            if let Some(metrics) = &self.metrics {
                metrics.inc_top_level_request();
                return metrics_endpoint(res, metrics);
            }
        }

        let Ok(http_method) = method.parse::<http::Method>() else {
            write_json_error(
                res,
                405,
                json!({"error": "Method Not Allowed", "method": method, "path": path}),
            );
            return Ok(());
        };

        let route_opt = match self.router.read() {
            Ok(router) => router.route(http_method, &path),
            Err(e) => {
                error!(error = %e, "Router lock poisoned");
                None
            }
        };
        let Some(mut route_match) = route_opt else {
            write_json_error(
                res,
                404,
                json!({"error": "Not Found", "method": method, "path": path}),
            );
            return Ok(());
        };
        route_match.query_params = query_params;

        let request_id = RequestId::from_header_or_new(
            headers
                .iter()
                .find(|(k, _)| k.as_ref() == "x-request-id")
                .map(|(_, v)| v.as_str()),
        );

        let handler_response = match self.dispatcher.read() {
            Ok(dispatcher) => {
                dispatcher.dispatch_with_request_id(route_match, body, headers, request_id)
            }
            Err(e) => {
                error!(error = %e, "Dispatcher lock poisoned");
                None
            }
        };
        match handler_response {
            Some(hr) => write_handler_response(res, hr),
            None => write_json_error(
                res,
                500,
                json!({
                    "error": "Handler failed or not registered",
                    "method": method,
                    "path": path
                }),
            ),
        }
        Ok(())
    }
}

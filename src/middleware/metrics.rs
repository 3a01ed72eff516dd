use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use super::Middleware;
use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Request counters exported by the `/metrics` endpoint.
///
/// All counters are relaxed atomics; readers see eventually consistent values.
#[derive(Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    client_errors: AtomicUsize,
    server_errors: AtomicUsize,
    stack_size: AtomicUsize,
    top_level_requests: AtomicUsize,
}

impl MetricsMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that reached the dispatcher.
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Mean handler latency, zero before the first request.
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    /// Responses with a 4xx status.
    pub fn client_errors(&self) -> usize {
        self.client_errors.load(Ordering::Relaxed)
    }

    /// Responses with a 5xx status.
    pub fn server_errors(&self) -> usize {
        self.server_errors.load(Ordering::Relaxed)
    }

    /// Stack size of the last coroutine that served a request.
    pub fn stack_size(&self) -> usize {
        self.stack_size.load(Ordering::Relaxed)
    }

    /// Count a request served outside the dispatcher (`/health`, `/metrics`).
    pub fn inc_top_level_request(&self) {
        self.top_level_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn top_level_request_count(&self) -> usize {
        self.top_level_requests.load(Ordering::Relaxed)
    }

    /// Prometheus text exposition of every counter.
    pub fn render_prometheus(&self) -> String {
        let mut out = String::with_capacity(512);
        let mut gauge = |name: &str, help: &str, kind: &str, value: String| {
            out.push_str("# HELP ");
            out.push_str(name);
            out.push(' ');
            out.push_str(help);
            out.push_str("\n# TYPE ");
            out.push_str(name);
            out.push(' ');
            out.push_str(kind);
            out.push('\n');
            out.push_str(name);
            out.push(' ');
            out.push_str(&value);
            out.push('\n');
        };
        gauge(
            "restdef_requests_total",
            "Requests dispatched to service handlers",
            "counter",
            self.request_count().to_string(),
        );
        gauge(
            "restdef_top_level_requests_total",
            "Requests served by built-in endpoints",
            "counter",
            self.top_level_request_count().to_string(),
        );
        gauge(
            "restdef_client_errors_total",
            "Dispatched requests answered with a 4xx status",
            "counter",
            self.client_errors().to_string(),
        );
        gauge(
            "restdef_server_errors_total",
            "Dispatched requests answered with a 5xx status",
            "counter",
            self.server_errors().to_string(),
        );
        gauge(
            "restdef_request_latency_seconds",
            "Average handler latency",
            "gauge",
            format!("{:.6}", self.average_latency().as_secs_f64()),
        );
        gauge(
            "restdef_coroutine_stack_bytes",
            "Coroutine stack size",
            "gauge",
            self.stack_size().to_string(),
        );
        out
    }
}

impl Middleware for MetricsMiddleware {
    fn before(&self, _req: &HandlerRequest) -> Option<HandlerResponse> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn after(&self, _req: &HandlerRequest, res: &mut HandlerResponse, latency: Duration) {
        self.total_latency_ns
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
        match res.status {
            400..=499 => {
                self.client_errors.fetch_add(1, Ordering::Relaxed);
            }
            500..=599 => {
                self.server_errors.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
        let size = if may::coroutine::is_coroutine() {
            may::coroutine::current().stack_size()
        } else {
            may::config().get_stack_size()
        };
        self.stack_size.store(size, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{HeaderVec, RequestBody};
    use crate::ids::RequestId;
    use crate::router::ParamVec;
    use http::Method;

    fn request() -> HandlerRequest {
        HandlerRequest {
            request_id: RequestId::new(),
            method: Method::GET,
            path: "/x".into(),
            handler_name: "x".into(),
            path_params: ParamVec::new(),
            query_params: ParamVec::new(),
            headers: HeaderVec::new(),
            body: RequestBody::Empty,
        }
    }

    #[test]
    fn test_counts_statuses() {
        let m = MetricsMiddleware::new();
        let req = request();
        for status in [200, 404, 500] {
            assert!(m.before(&req).is_none());
            let mut res = HandlerResponse::empty(status);
            m.after(&req, &mut res, Duration::from_millis(2));
        }
        assert_eq!(m.request_count(), 3);
        assert_eq!(m.client_errors(), 1);
        assert_eq!(m.server_errors(), 1);
        assert_eq!(m.average_latency(), Duration::from_millis(2));

        let text = m.render_prometheus();
        assert!(text.contains("restdef_requests_total 3"));
        assert!(text.contains("# TYPE restdef_server_errors_total counter"));
    }
}

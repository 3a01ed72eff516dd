use std::time::Duration;

use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Hook around every dispatched request.
///
/// `before` may short-circuit by returning a response; `after` always runs.
pub trait Middleware: Send + Sync {
    fn before(&self, _req: &HandlerRequest) -> Option<HandlerResponse> {
        None
    }
    fn after(&self, _req: &HandlerRequest, _res: &mut HandlerResponse, _latency: Duration) {}
}

use std::time::Duration;

use tracing::{debug, info, warn};

use super::{Middleware, RequestHead, ResponseHead};
use crate::controller::HandlerResponse;

/// Emits structured start and completion events for every request
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn before(&self, req: &RequestHead) -> Option<HandlerResponse> {
        debug!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path(),
            "Request started"
        );
        None
    }

    fn after(&self, req: &RequestHead, res: &mut ResponseHead, latency: Duration) {
        let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        if res.status.is_server_error() {
            warn!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path(),
                status = res.status.as_u16(),
                latency_ms = latency_ms,
                "Request failed"
            );
        } else {
            info!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path(),
                status = res.status.as_u16(),
                latency_ms = latency_ms,
                "Request completed"
            );
        }
    }
}

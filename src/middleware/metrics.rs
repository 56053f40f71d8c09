use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use super::{Middleware, RequestHead, ResponseHead};
use crate::controller::HandlerResponse;

/// Middleware for collecting request metrics
///
/// All counters use atomic operations for thread-safe updates without locks.
/// Share one instance (`Arc<MetricsMiddleware>`) between the route tree and the
/// code that reads the counters.
#[derive(Debug, Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    completed_count: AtomicUsize,
    error_responses: AtomicUsize,
    total_latency_ns: AtomicU64,
}

impl MetricsMiddleware {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that reached this middleware
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Responses that passed back through this middleware
    pub fn completed_count(&self) -> usize {
        self.completed_count.load(Ordering::Relaxed)
    }

    /// Responses with a 4xx or 5xx status
    pub fn error_responses(&self) -> usize {
        self.error_responses.load(Ordering::Relaxed)
    }

    /// Mean latency over completed requests; zero before the first one
    pub fn average_latency(&self) -> Duration {
        let count = self.completed_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }
}

impl Middleware for MetricsMiddleware {
    fn before(&self, _req: &RequestHead) -> Option<HandlerResponse> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn after(&self, _req: &RequestHead, res: &mut ResponseHead, latency: Duration) {
        self.completed_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ns.fetch_add(
            u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX),
            Ordering::Relaxed,
        );
        if res.status.is_client_error() || res.status.is_server_error() {
            self.error_responses.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, Method, StatusCode};

    fn head() -> RequestHead {
        let (parts, _) = http::Request::builder()
            .method(Method::GET)
            .uri("/resource/1")
            .body(())
            .unwrap()
            .into_parts();
        RequestHead::from_parts(&parts)
    }

    #[test]
    fn test_counts_and_latency() {
        let metrics = MetricsMiddleware::new();
        let req = head();
        assert!(metrics.before(&req).is_none());
        assert!(metrics.before(&req).is_none());
        let mut ok = ResponseHead {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        };
        metrics.after(&req, &mut ok, Duration::from_millis(10));
        let mut bad = ResponseHead {
            status: StatusCode::BAD_REQUEST,
            headers: HeaderMap::new(),
        };
        metrics.after(&req, &mut bad, Duration::from_millis(30));

        assert_eq!(metrics.request_count(), 2);
        assert_eq!(metrics.completed_count(), 2);
        assert_eq!(metrics.error_responses(), 1);
        assert_eq!(metrics.average_latency(), Duration::from_millis(20));
    }
}

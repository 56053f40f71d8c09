use std::time::Duration;

use http::request::Parts;
use http::{HeaderMap, Method, StatusCode, Uri};

use crate::controller::HandlerResponse;
use crate::ids::RequestId;

/// Request line and headers as seen by middleware
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub request_id: RequestId,
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RequestHead {
    /// Snapshot of `parts`; the request id comes from its extensions or headers
    #[must_use]
    pub fn from_parts(parts: &Parts) -> Self {
        let request_id = parts
            .extensions
            .get::<RequestId>()
            .copied()
            .unwrap_or_else(|| RequestId::from_headers(&parts.headers));
        Self {
            request_id,
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }
}

/// Status and headers of an outgoing response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl From<&HandlerResponse> for ResponseHead {
    fn from(res: &HandlerResponse) -> Self {
        Self {
            status: res.status,
            headers: res.headers.clone(),
        }
    }
}

/// Request interceptor
///
/// `before` runs outermost-first and may answer the request itself, in which case
/// nothing further inside it runs. `after` runs innermost-first on the way out.
pub trait Middleware: Send + Sync {
    fn before(&self, _req: &RequestHead) -> Option<HandlerResponse> {
        None
    }
    fn after(&self, _req: &RequestHead, _res: &mut ResponseHead, _latency: Duration) {}
}

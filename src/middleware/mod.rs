//! # Middleware Module
//!
//! Middleware attaches to a controller (every route in its subtree, nested
//! controllers included) or to a single route. Node middleware wraps route
//! middleware, and within one list the first entry is the outermost.

mod core;
mod metrics;
mod tracing;

pub use core::{Middleware, RequestHead, ResponseHead};
pub use metrics::MetricsMiddleware;
pub use tracing::TracingMiddleware;

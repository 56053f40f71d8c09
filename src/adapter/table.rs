//! In-process router family that records every route
//!
//! `RouteTable` does no path matching. Routes are looked up by the exact
//! `(method, template)` pair they were registered under, which makes the table
//! useful for startup listings and for driving endpoints without a server.

use std::sync::Arc;
use std::time::Instant;

use http::Method;

use super::core::{
    default_error_hook, join_paths, Endpoint, ErrorHook, MountableRouter, RouteRegistration,
};
use crate::controller::HandlerResponse;
use crate::error::ConfigError;
use crate::middleware::{RequestHead, ResponseHead};
use crate::pipeline::RequestContext;
use crate::tree::MiddlewareRef;

/// One flattened route
#[derive(Clone)]
pub struct RouteEntry {
    pub method: Method,
    /// Full path template, e.g. `/resource/special/:id`
    pub path: String,
    /// `Controller.method`
    pub operation: String,
    /// Effective middleware chain, outermost first
    pub middleware: Vec<MiddlewareRef>,
    endpoint: Endpoint,
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("operation", &self.operation)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

/// Recording [`MountableRouter`]
#[derive(Clone)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
    middleware: Vec<MiddlewareRef>,
    on_error: ErrorHook,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            middleware: Vec::new(),
            on_error: default_error_hook(),
        }
    }

    #[must_use]
    pub fn with_error_hook(mut self, hook: ErrorHook) -> Self {
        self.on_error = hook;
        self
    }

    /// Every route with this table's own middleware applied
    #[must_use]
    pub fn routes(&self) -> Vec<RouteEntry> {
        self.entries
            .iter()
            .map(|entry| self.scoped(entry.clone()))
            .collect()
    }

    /// `(METHOD, path, operation)` triples, handy for logs and assertions
    #[must_use]
    pub fn listing(&self) -> Vec<(String, String, String)> {
        self.entries
            .iter()
            .map(|e| (e.method.to_string(), e.path.clone(), e.operation.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn find(&self, method: &Method, path: &str) -> Option<RouteEntry> {
        self.entries
            .iter()
            .find(|e| e.method == *method && e.path == path)
            .map(|e| self.scoped(e.clone()))
    }

    /// Run the route registered under exactly `method` and `template`
    ///
    /// Middleware runs as it would in a server: `before` outermost-first with
    /// short-circuit, `after` innermost-first. Returns `None` for an unknown route.
    pub async fn call(
        &self,
        method: &Method,
        template: &str,
        ctx: RequestContext,
    ) -> Option<HandlerResponse> {
        let route = self.find(method, template)?;
        let head = RequestHead::from_parts(&ctx.parts);
        let started = Instant::now();

        let mut entered = 0;
        let mut response = None;
        for mw in &route.middleware {
            if let Some(early) = mw.before(&head) {
                response = Some(early);
                break;
            }
            entered += 1;
        }
        let mut response = match response {
            Some(early) => early,
            None => match (route.endpoint)(ctx).await {
                Ok(response) => response,
                Err(err) => (self.on_error)(&err),
            },
        };

        let mut res_head = ResponseHead::from(&response);
        for mw in route.middleware[..entered].iter().rev() {
            mw.after(&head, &mut res_head, started.elapsed());
        }
        response.status = res_head.status;
        response.headers = res_head.headers;
        Some(response)
    }

    fn scoped(&self, mut entry: RouteEntry) -> RouteEntry {
        if !self.middleware.is_empty() {
            let mut chain = self.middleware.clone();
            chain.extend(entry.middleware);
            entry.middleware = chain;
        }
        entry
    }
}

impl MountableRouter for RouteTable {
    fn sub_router(&self) -> Self {
        Self {
            entries: Vec::new(),
            middleware: Vec::new(),
            on_error: Arc::clone(&self.on_error),
        }
    }

    fn attach_middleware(mut self, middleware: &[MiddlewareRef]) -> Self {
        self.middleware.extend(middleware.iter().map(Arc::clone));
        self
    }

    fn register(mut self, route: RouteRegistration) -> Result<Self, ConfigError> {
        if self
            .entries
            .iter()
            .any(|e| e.method == route.method && e.path == route.path)
        {
            return Err(ConfigError::DuplicateRoute {
                method: route.method,
                path: route.path,
            });
        }
        self.entries.push(RouteEntry {
            method: route.method,
            path: route.path,
            operation: route.operation,
            middleware: route.middleware,
            endpoint: route.endpoint,
        });
        Ok(self)
    }

    fn mount(mut self, prefix: &str, child: Self) -> Result<Self, ConfigError> {
        for entry in child.routes() {
            let path = join_paths(prefix, &entry.path);
            if self
                .entries
                .iter()
                .any(|e| e.method == entry.method && e.path == path)
            {
                return Err(ConfigError::MountConflict {
                    prefix: prefix.to_string(),
                });
            }
            self.entries.push(RouteEntry { path, ..entry });
        }
        Ok(self)
    }
}

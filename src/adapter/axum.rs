//! Router family backed by [`axum::Router`]
//!
//! Each tree node becomes its own `Router`, nested under its base path. Node
//! middleware is applied as a `from_fn` layer over the whole sub-router when it is
//! mounted, route middleware as a layer over the single `MethodRouter`.
//!
//! `axum` refuses two templates that name the same placeholder position
//! differently (`/:id` next to `/:book_id/covers`). Within one router the first
//! name wins and later routes are registered under it, with their path
//! parameters renamed back before the pipeline sees them. A route at `/` is
//! served both as `<prefix>` and `<prefix>/` once nested.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{OriginalUri, Path, Request};
use axum::middleware::{from_fn, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, on, MethodFilter, MethodRouter};
use axum::{Json, Router};
use http::Method;
use serde::Serialize;

use http_body_util::LengthLimitError;

use super::core::{
    default_error_hook, route_shape, Adapter, Endpoint, ErrorHook, MountableRouter,
    RouteRegistration,
};
use crate::controller::HandlerResponse;
use crate::error::{ConfigError, RouteError};
use crate::ids::RequestId;
use crate::middleware::{RequestHead, ResponseHead};
use crate::pipeline::RequestContext;
use crate::runtime_config::DEFAULT_MAX_BODY_BYTES;
use crate::tree::{MiddlewareRef, Registry};

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> Response {
        let mut response = if self.body.is_null() {
            self.status.into_response()
        } else {
            (self.status, Json(self.body)).into_response()
        };
        response.headers_mut().extend(self.headers);
        response
    }
}

/// [`MountableRouter`] over `axum::Router<()>`
pub struct AxumRouter {
    router: Router,
    middleware: Vec<MiddlewareRef>,
    mounted: HashSet<String>,
    /// Placeholder name per position, keyed by the shape of the path up to it
    placeholders: HashMap<String, String>,
    /// Every `(method, template)` reachable through this router
    routes: Vec<(Method, String)>,
    claimed: HashSet<(Method, String)>,
    /// Routes registered at `/`, kept to add the trailing-slash form when nested
    index: Option<MethodRouter>,
    on_error: ErrorHook,
    body_limit: usize,
}

impl Default for AxumRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl AxumRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::from_router(Router::new())
    }

    /// Mount onto an existing application router
    #[must_use]
    pub fn from_router(router: Router) -> Self {
        Self {
            router,
            middleware: Vec::new(),
            mounted: HashSet::new(),
            placeholders: HashMap::new(),
            routes: Vec::new(),
            claimed: HashSet::new(),
            index: None,
            on_error: default_error_hook(),
            body_limit: DEFAULT_MAX_BODY_BYTES,
        }
    }

    #[must_use]
    pub fn with_error_hook(mut self, hook: ErrorHook) -> Self {
        self.on_error = hook;
        self
    }

    #[must_use]
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// The finished router with this level's middleware applied
    #[must_use]
    pub fn into_router(self) -> Router {
        self.middleware
            .iter()
            .rev()
            .fold(self.router, layer_router)
    }

    /// Rewrite `path` to the placeholder names already in use on this router
    ///
    /// Returns the template to register and a map from registered name to the
    /// name `path` declared, for every placeholder that was renamed.
    fn canonicalize(&mut self, path: &str) -> (String, HashMap<String, String>) {
        let mut position = String::new();
        let mut used: HashSet<String> = HashSet::new();
        let mut renames = HashMap::new();
        let mut segments = Vec::new();
        for (i, segment) in path.split('/').enumerate() {
            if i > 0 {
                position.push('/');
            }
            let sigil = match segment.chars().next() {
                Some(c @ (':' | '*')) => c,
                _ => {
                    position.push_str(segment);
                    segments.push(segment.to_string());
                    continue;
                }
            };
            let name = &segment[1..];
            position.push(sigil);
            let canonical = self
                .placeholders
                .entry(position.clone())
                .or_insert_with(|| {
                    let mut candidate = name.to_string();
                    while used.contains(&candidate) {
                        candidate.push('_');
                    }
                    candidate
                })
                .clone();
            if canonical != name {
                renames.insert(canonical.clone(), name.to_string());
            }
            segments.push(format!("{sigil}{canonical}"));
            used.insert(canonical);
        }
        (segments.join("/"), renames)
    }

    fn claim(
        &mut self,
        method: &Method,
        template: &str,
        declared: &str,
    ) -> Result<(), ConfigError> {
        if !self.claimed.insert((method.clone(), route_shape(template))) {
            return Err(ConfigError::DuplicateRoute {
                method: method.clone(),
                path: declared.to_string(),
            });
        }
        self.routes.push((method.clone(), template.to_string()));
        Ok(())
    }
}

impl MountableRouter for AxumRouter {
    fn sub_router(&self) -> Self {
        Self {
            router: Router::new(),
            middleware: Vec::new(),
            mounted: HashSet::new(),
            placeholders: HashMap::new(),
            routes: Vec::new(),
            claimed: HashSet::new(),
            index: None,
            on_error: Arc::clone(&self.on_error),
            body_limit: self.body_limit,
        }
    }

    fn attach_middleware(mut self, middleware: &[MiddlewareRef]) -> Self {
        self.middleware.extend(middleware.iter().map(Arc::clone));
        self
    }

    fn register(mut self, route: RouteRegistration) -> Result<Self, ConfigError> {
        let filter = method_filter(&route.method)?;
        let (template, renames) = self.canonicalize(&route.path);
        self.claim(&route.method, &template, &route.path)?;

        let endpoint = route.endpoint;
        let renames = Arc::new(renames);
        let on_error = Arc::clone(&self.on_error);
        let body_limit = self.body_limit;
        let handler = move |path: Option<Path<HashMap<String, String>>>, req: Request| {
            let endpoint = Arc::clone(&endpoint);
            let on_error = Arc::clone(&on_error);
            let path_params = path
                .map(|Path(params)| rename_params(params, &renames))
                .unwrap_or_default();
            async move { serve(endpoint, on_error, body_limit, path_params, req).await }
        };
        let method_router = route
            .middleware
            .iter()
            .rev()
            .fold(on(filter, handler), layer_method_router);
        if template == "/" {
            self.index = Some(merge_index(self.index.take(), method_router.clone()));
        }
        self.router = self.router.route(&template, method_router);
        Ok(self)
    }

    fn mount(mut self, prefix: &str, mut child: Self) -> Result<Self, ConfigError> {
        let prefix = normalize_prefix(prefix);
        if prefix != "/" && !self.mounted.insert(prefix.clone()) {
            return Err(ConfigError::MountConflict { prefix });
        }

        let mut adopted = Vec::new();
        for (method, path) in &child.routes {
            adopted.push((method.clone(), nested_path(&prefix, path)));
            if prefix != "/" && path == "/" {
                adopted.push((method.clone(), format!("{prefix}/")));
            }
        }
        for (method, path) in adopted {
            let (template, renames) = self.canonicalize(&path);
            if !renames.is_empty() {
                return Err(ConfigError::RouteConflict {
                    path,
                    existing: template,
                });
            }
            self.claim(&method, &template, &path)?;
        }

        let index = child
            .index
            .take()
            .map(|index| child.middleware.iter().rev().fold(index, layer_method_router));
        let router = child.into_router();
        if prefix == "/" {
            self.router = self.router.merge(router);
            if let Some(index) = index {
                self.index = Some(merge_index(self.index.take(), index));
            }
        } else {
            self.router = self.router.nest(&prefix, router);
            if let Some(index) = index {
                self.router = self.router.route(&format!("{prefix}/"), index);
            }
        }
        Ok(self)
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Where axum serves `path` once its router is nested under `prefix`
fn nested_path(prefix: &str, path: &str) -> String {
    match (prefix, path) {
        ("/", _) => path.to_string(),
        (_, "/") => prefix.to_string(),
        _ => format!("{prefix}{path}"),
    }
}

fn merge_index(existing: Option<MethodRouter>, index: MethodRouter) -> MethodRouter {
    match existing {
        Some(existing) => existing.merge(index),
        None => index,
    }
}

fn rename_params(
    params: HashMap<String, String>,
    renames: &HashMap<String, String>,
) -> HashMap<String, String> {
    if renames.is_empty() {
        return params;
    }
    params
        .into_iter()
        .map(|(name, value)| (renames.get(&name).cloned().unwrap_or(name), value))
        .collect()
}

fn method_filter(method: &Method) -> Result<MethodFilter, ConfigError> {
    const FILTERS: [(Method, MethodFilter); 8] = [
        (Method::GET, MethodFilter::GET),
        (Method::POST, MethodFilter::POST),
        (Method::PUT, MethodFilter::PUT),
        (Method::PATCH, MethodFilter::PATCH),
        (Method::DELETE, MethodFilter::DELETE),
        (Method::HEAD, MethodFilter::HEAD),
        (Method::OPTIONS, MethodFilter::OPTIONS),
        (Method::TRACE, MethodFilter::TRACE),
    ];
    FILTERS
        .iter()
        .find(|(candidate, _)| candidate == method)
        .map(|(_, filter)| *filter)
        .ok_or_else(|| ConfigError::UnsupportedMethod {
            method: method.clone(),
        })
}

async fn serve(
    endpoint: Endpoint,
    on_error: ErrorHook,
    body_limit: usize,
    path_params: HashMap<String, String>,
    req: Request,
) -> Response {
    let (mut parts, body) = req.into_parts();
    // nested routers see the URI with their prefix stripped
    if let Some(OriginalUri(uri)) = parts.extensions.get::<OriginalUri>().cloned() {
        parts.uri = uri;
    }
    let outcome = match axum::body::to_bytes(body, body_limit).await {
        Ok(bytes) => endpoint(RequestContext::new(parts, path_params, bytes)).await,
        Err(err) => Err(body_error(err, body_limit)),
    };
    match outcome {
        Ok(response) => response.into_response(),
        Err(err) => on_error(&err).into_response(),
    }
}

fn body_error(err: axum::Error, limit: usize) -> RouteError {
    let inner = err.into_inner();
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&*inner);
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            return RouteError::PayloadTooLarge { limit };
        }
        source = err.source();
    }
    RouteError::BodyDecode {
        message: inner.to_string(),
    }
}

fn layer_router(router: Router, mw: &MiddlewareRef) -> Router {
    let mw = Arc::clone(mw);
    router.layer(from_fn(move |req: Request, next: Next| {
        let mw = Arc::clone(&mw);
        async move { run_middleware(mw, req, next).await }
    }))
}

fn layer_method_router(method_router: MethodRouter, mw: &MiddlewareRef) -> MethodRouter {
    let mw = Arc::clone(mw);
    method_router.layer(from_fn(move |req: Request, next: Next| {
        let mw = Arc::clone(&mw);
        async move { run_middleware(mw, req, next).await }
    }))
}

async fn run_middleware(mw: MiddlewareRef, req: Request, next: Next) -> Response {
    let started = Instant::now();
    let (mut parts, body) = req.into_parts();
    if parts.extensions.get::<RequestId>().is_none() {
        let id = RequestId::from_headers(&parts.headers);
        parts.extensions.insert(id);
    }
    let mut head = RequestHead::from_parts(&parts);
    if let Some(OriginalUri(uri)) = parts.extensions.get::<OriginalUri>() {
        head.uri = uri.clone();
    }
    if let Some(early) = mw.before(&head) {
        return early.into_response();
    }

    let response = next.run(Request::from_parts(parts, body)).await;
    let (mut res_parts, body) = response.into_parts();
    let mut res_head = ResponseHead {
        status: res_parts.status,
        headers: std::mem::take(&mut res_parts.headers),
    };
    mw.after(&head, &mut res_head, started.elapsed());
    res_parts.status = res_head.status;
    res_parts.headers = res_head.headers;
    Response::from_parts(res_parts, body)
}

/// Adapt the tree of `C` into a standalone axum router
///
/// The body limit comes from the adapter's configuration.
pub fn into_router<C: 'static>(adapter: &Adapter, registry: &Registry) -> Result<Router, ConfigError> {
    let base = AxumRouter::new().with_body_limit(adapter.config().max_body_bytes);
    Ok(adapter.adapt::<C, _>(registry, base)?.into_router())
}

/// A router serving `document` as JSON at `path`
pub fn document_router<T: Serialize>(path: &str, document: &T) -> Result<Router, ConfigError> {
    let doc = Arc::new(
        serde_json::to_value(document).map_err(|e| ConfigError::Document(e.to_string()))?,
    );
    Ok(Router::new().route(
        path,
        get(move || {
            let doc = Arc::clone(&doc);
            async move { Json((*doc).clone()) }
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("/resource/"), "/resource");
        assert_eq!(normalize_prefix("special"), "/special");
        assert_eq!(normalize_prefix("/"), "/");
        assert_eq!(normalize_prefix(""), "/");
    }

    #[test]
    fn test_nested_path() {
        assert_eq!(nested_path("/", "/:id"), "/:id");
        assert_eq!(nested_path("/books", "/"), "/books");
        assert_eq!(nested_path("/books", "/:id"), "/books/:id");
    }

    #[test]
    fn test_canonicalize_reuses_first_placeholder_name() {
        let mut router = AxumRouter::new();
        assert_eq!(router.canonicalize("/:id"), ("/:id".to_string(), HashMap::new()));

        let (template, renames) = router.canonicalize("/:book_id/covers/:cover");
        assert_eq!(template, "/:id/covers/:cover");
        assert_eq!(renames, HashMap::from([("id".to_string(), "book_id".to_string())]));

        let (template, renames) = router.canonicalize("/static/:x");
        assert_eq!(template, "/static/:x");
        assert!(renames.is_empty());
    }

    #[test]
    fn test_rename_params() {
        let renames = HashMap::from([("id".to_string(), "book_id".to_string())]);
        let params = HashMap::from([("id".to_string(), "7".to_string())]);
        assert_eq!(
            rename_params(params, &renames),
            HashMap::from([("book_id".to_string(), "7".to_string())])
        );
    }

    #[test]
    fn test_method_filter() {
        assert!(method_filter(&Method::GET).is_ok());
        let custom = Method::from_bytes(b"PURGE").unwrap();
        assert_eq!(
            method_filter(&custom).unwrap_err(),
            ConfigError::UnsupportedMethod { method: custom }
        );
    }
}

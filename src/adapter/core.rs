use std::collections::HashSet;
use std::sync::Arc;

use futures::future::BoxFuture;
use http::Method;
use serde_json::json;
use tracing::{debug, error, info};

use crate::controller::{Container, ControllerHandle, FreshInstance, HandlerResponse};
use crate::error::{ConfigError, RouteError};
use crate::pipeline::{resolve_params, RequestContext, ResolveOptions};
use crate::runtime_config::RuntimeConfig;
use crate::tree::{Child, MiddlewareRef, ParamDescriptor, Registry, RouteHandlerNode, RouterNode};
use crate::validator::log_issues;
use crate::validator_cache::{precompile_tree, SchemaEngine, ValidatorCache};

pub type EndpointFuture = BoxFuture<'static, Result<HandlerResponse, RouteError>>;

/// Request-serving closure built for one leaf
pub type Endpoint = Arc<dyn Fn(RequestContext) -> EndpointFuture + Send + Sync>;

/// Converts request-time errors into responses
pub type ErrorHook = Arc<dyn Fn(&RouteError) -> HandlerResponse + Send + Sync>;

/// One operation handed to a [`MountableRouter`]
pub struct RouteRegistration {
    pub method: Method,
    /// Path template relative to the router it is registered on, with a leading `/`
    pub path: String,
    /// `Controller.method`
    pub operation: String,
    /// Route-level middleware, outermost first
    pub middleware: Vec<MiddlewareRef>,
    pub endpoint: Endpoint,
}

/// A router family the adapter can target
///
/// The adapter only ever creates sub-routers, attaches middleware, registers
/// operations and mounts sub-routers under a prefix. Every method consumes and
/// returns the router so implementations can wrap builder-style APIs.
pub trait MountableRouter: Sized {
    /// A new, empty router of the same family
    fn sub_router(&self) -> Self;

    /// Middleware wrapping every route registered or mounted on this router
    fn attach_middleware(self, middleware: &[MiddlewareRef]) -> Self;

    fn register(self, route: RouteRegistration) -> Result<Self, ConfigError>;

    fn mount(self, prefix: &str, child: Self) -> Result<Self, ConfigError>;
}

/// Answers `{"error", "kind", "details"}` with the error's status
pub fn default_error_hook() -> ErrorHook {
    Arc::new(|err: &RouteError| {
        let details = match err {
            RouteError::Validation { violations, .. } => json!(violations),
            RouteError::Handler(source) => {
                error!(error = %source, "Handler failed");
                json!([])
            }
            _ => json!([]),
        };
        let kind = match err {
            RouteError::Validation { kind, .. } => kind.to_string(),
            _ => err.label().to_string(),
        };
        HandlerResponse::json(
            err.status(),
            json!({
                "error": err.to_string(),
                "kind": kind,
                "details": details,
            }),
        )
    })
}

/// Projects route trees onto a [`MountableRouter`]
#[derive(Clone)]
pub struct Adapter {
    container: Arc<dyn Container>,
    engine: Arc<dyn SchemaEngine>,
    config: RuntimeConfig,
}

impl Default for Adapter {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl Adapter {
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            container: Arc::new(FreshInstance),
            engine: Arc::new(ValidatorCache::new(config.schema_cache)),
            config,
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::new(RuntimeConfig::from_env())
    }

    #[must_use]
    pub fn with_container(mut self, container: impl Container + 'static) -> Self {
        self.container = Arc::new(container);
        self
    }

    #[must_use]
    pub fn with_schema_engine(mut self, engine: impl SchemaEngine + 'static) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Mount the tree of `C` onto `base`
    pub fn adapt<C: 'static, R: MountableRouter>(
        &self,
        registry: &Registry,
        base: R,
    ) -> Result<R, ConfigError> {
        self.adapt_node(registry.tree::<C>()?, base)
    }

    /// Validate `node`, compile its schemas and mount it onto `base`
    pub fn adapt_node<R: MountableRouter>(&self, node: &RouterNode, base: R) -> Result<R, ConfigError> {
        let issues = node.validate();
        if !issues.is_empty() {
            log_issues(node.owner.name(), &issues);
            return Err(ConfigError::InvalidTree {
                controller: node.owner.name().to_string(),
                issues,
            });
        }
        let schemas = precompile_tree(self.engine.as_ref(), node)?;
        let mut routes = 0;
        let router = self.map_router(node, base, "", &mut routes)?;
        info!(
            controller = node.owner.name(),
            base_path = %node.base_path,
            routes = routes,
            schemas = schemas,
            "Route tree mounted"
        );
        Ok(router)
    }

    /// Depth-first: build a sub-router for `node`, fill it, mount it on `parent`
    fn map_router<R: MountableRouter>(
        &self,
        node: &RouterNode,
        parent: R,
        prefix: &str,
        routes: &mut usize,
    ) -> Result<R, ConfigError> {
        let full_prefix = format!("{prefix}{}", node.base_path);
        let mut router = parent.sub_router().attach_middleware(&node.middleware);
        let mut seen: HashSet<(Method, String)> = HashSet::new();

        for (name, child) in &node.children {
            match child {
                Child::Subtree(nested) => {
                    router = self.map_router(nested, router, &full_prefix, routes)?;
                }
                Child::Leaf(leaf) => {
                    let (Some(method), Some(path)) = (leaf.method.clone(), leaf.absolute_path())
                    else {
                        continue;
                    };
                    if !seen.insert((method.clone(), route_shape(&path))) {
                        return Err(ConfigError::DuplicateRoute { method, path });
                    }
                    let operation = format!("{}.{}", node.owner.name(), name);
                    debug!(
                        method = %method,
                        path = %format!("{full_prefix}{path}"),
                        operation = %operation,
                        "Registering route"
                    );
                    router = router.register(RouteRegistration {
                        method,
                        path,
                        operation,
                        middleware: leaf.middleware.clone(),
                        endpoint: self.endpoint(&node.owner, name, leaf),
                    })?;
                    *routes += 1;
                }
            }
        }

        parent.mount(&node.base_path, router)
    }

    fn endpoint(&self, owner: &ControllerHandle, name: &str, leaf: &RouteHandlerNode) -> Endpoint {
        let container = Arc::clone(&self.container);
        let engine = Arc::clone(&self.engine);
        let owner = *owner;
        let method_name: Arc<str> = Arc::from(name);
        let params: Arc<[ParamDescriptor]> = leaf.sorted_params().into();
        let options = ResolveOptions {
            coerce_params: self.config.coerce_params,
        };

        Arc::new(move |ctx: RequestContext| -> EndpointFuture {
            let container = Arc::clone(&container);
            let engine = Arc::clone(&engine);
            let method_name = Arc::clone(&method_name);
            let params = Arc::clone(&params);
            Box::pin(async move {
                let controller = container.resolve(&owner);
                let ctx = Arc::new(ctx);
                let args = resolve_params(&params, &ctx, engine.as_ref(), options).await?;
                controller
                    .invoke(&method_name, args)
                    .await
                    .map_err(RouteError::Handler)
            })
        })
    }
}

/// `prefix` followed by `path`, without a doubled slash at the seam
#[must_use]
pub fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if path.is_empty() {
        if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        }
    } else if path.starts_with('/') {
        format!("{prefix}{path}")
    } else {
        format!("{prefix}/{path}")
    }
}

/// `path` with its placeholder names erased, e.g. `/books/:id` -> `/books/:`
///
/// Two templates with the same shape match the same requests.
#[must_use]
pub fn route_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.chars().next() {
            Some(':') => ":",
            Some('*') => "*",
            _ => segment,
        })
        .collect::<Vec<_>>()
        .join("/")
}

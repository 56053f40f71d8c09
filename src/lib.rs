//! # routetree
//!
//! **routetree** describes HTTP controllers as declarative route trees and projects
//! those trees onto two targets: a live router and an OpenAPI 3 contract document.
//!
//! ## Overview
//!
//! A controller declares, once, which of its methods serve which verb and path,
//! what arguments each method receives (request context, body, path placeholders,
//! query string), which JSON Schema each argument must satisfy and which
//! middleware wraps it. Controllers nest, so a tree mirrors the URL hierarchy.
//!
//! ## Architecture
//!
//! - **[`tree`]** - the route tree model and the [`Registry`] that builds it
//! - **[`controller`]** - the [`Controller`] trait and instantiation strategies
//! - **[`pipeline`]** - per-request parameter extraction and validation
//! - **[`validator_cache`]** - schema compilation and caching
//! - **[`adapter`]** - replays a tree onto a router (`axum`, or an in-process table)
//! - **[`middleware`]** - request interceptors
//! - **[`openapi`]** - contract projection
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Router as axum::Router
//!     participant MW as Middleware
//!     participant Pipeline as pipeline::resolve_params
//!     participant Container
//!     participant Controller
//!
//!     Client->>Router: GET /resource/1?query=hello
//!     Router->>MW: before()
//!     MW->>Pipeline: RequestContext
//!     Pipeline->>Pipeline: extract + validate each parameter
//!     alt validation fails
//!         Pipeline-->>Router: RouteError -> ErrorHook (400)
//!     else all valid
//!         Pipeline->>Container: resolve(owner)
//!         Container-->>Pipeline: Arc<dyn Controller>
//!         Pipeline->>Controller: invoke("get_one", args)
//!         Controller-->>Router: HandlerResponse
//!     end
//!     Router->>MW: after()
//!     MW-->>Client: response
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use routetree::adapter::{into_router, Adapter};
//! use routetree::tree::Registry;
//! use serde_json::json;
//!
//! let mut registry = Registry::new();
//! let _ = registry
//!     .controller::<Resource>()
//!     .base_path("/resource")
//!     .route("get_one", |r| {
//!         r.get("/:id")
//!             .path_params(0, json!({"type": "object", "properties": {"id": {"type": "string"}}}))
//!             .query(1, json!({"type": "object", "properties": {"query": {"type": "string"}}}));
//!     });
//!
//! let app = into_router::<Resource>(&Adapter::from_env(), &registry)?;
//! ```
//!
//! ## Configuration
//!
//! See [`runtime_config`] for the `ROUTETREE_*` environment variables and
//! [`logging`] for log output.

pub mod adapter;
pub mod controller;
pub mod error;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod openapi;
pub mod pipeline;
pub mod runtime_config;
pub mod tree;
pub mod validator;
pub mod validator_cache;

pub use adapter::{Adapter, AxumRouter, MountableRouter, RouteTable};
pub use controller::{Arguments, Controller, ControllerHandle, HandlerResponse};
pub use error::{ConfigError, RouteError, Violation};
pub use pipeline::RequestContext;
pub use tree::{ParamKind, Registry, RouterNode};

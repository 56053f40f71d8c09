//! # Route Tree Module
//!
//! A route tree is the declarative description of one controller: its base path,
//! the HTTP operations its methods serve, the arguments each method receives and
//! the middleware wrapped around them. Trees nest, so a controller can mount
//! other controllers under itself.
//!
//! Trees are built through a [`Registry`] and consumed by the
//! [`adapter`](crate::adapter) and [`openapi`](crate::openapi) modules.
//!
//! ```rust,ignore
//! let mut registry = Registry::new();
//! let _ = registry
//!     .controller::<Resource>()
//!     .base_path("/resource")
//!     .route("get_one", |r| {
//!         r.get("/:id").path_params(0, json!({"type": "object"}));
//!     });
//! ```

mod registry;
mod types;

pub use registry::{ControllerDecl, Registry, RouteDecl};
pub use types::{
    Child, MediaType, MiddlewareRef, ParamDescriptor, ParamKind, ResponseSpec, RouteHandlerNode,
    RouterNode, SecurityRequirement,
};

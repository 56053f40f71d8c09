//! # Adapter Module
//!
//! The adapter walks a route tree depth-first and replays it onto a concrete
//! router through the [`MountableRouter`] capability trait:
//!
//! ```text
//! map_router(node, parent):
//!     sub = parent.sub_router() + node middleware
//!     for each child:
//!         subtree -> map_router(child, sub)
//!         leaf    -> sub.register(method, path, leaf middleware, endpoint)
//!     parent.mount(node.base_path, sub)
//! ```
//!
//! Every registered endpoint obtains a controller instance from the
//! [`Container`](crate::controller::Container), resolves the leaf's parameters and
//! invokes the method by name. Resolution and handler failures go to the router's
//! [`ErrorHook`].
//!
//! Two router families ship with the crate:
//!
//! - [`AxumRouter`] - builds an `axum::Router`
//! - [`RouteTable`] - records flattened routes and can call them in-process

pub mod axum;
mod core;
mod table;

pub use self::axum::{document_router, into_router, AxumRouter};
pub use self::core::{
    default_error_hook, join_paths, route_shape, Adapter, Endpoint, EndpointFuture, ErrorHook,
    MountableRouter, RouteRegistration,
};
pub use self::table::{RouteEntry, RouteTable};

//! # Parameter Pipeline Module
//!
//! Turns a [`RequestContext`] into the positional [`Arguments`](crate::controller::Arguments)
//! a controller method declared.
//!
//! For each descriptor the pipeline extracts a raw value:
//!
//! | Kind | Source |
//! |------|--------|
//! | `Context` | the context itself, never validated |
//! | `Body` | the buffered body, decoded as JSON or form data |
//! | `PathParam` | the router's captured placeholders |
//! | `Query` | the parsed query string |
//!
//! and, when a schema is present, validates it. The first failure becomes a
//! [`RouteError`](crate::error::RouteError) and the controller is not invoked.

mod core;
mod request;

pub use core::{resolve_param, resolve_params, ResolveOptions};
pub use request::{coerce_params, decode_body, parse_query_params, string_map, RequestContext};

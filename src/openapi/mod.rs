//! # OpenAPI Module
//!
//! Projects a route tree onto an OpenAPI 3 document from the same declarations
//! the adapter mounts. Paths are the literal concatenation of base paths and leaf
//! paths; routers may accept more spellings than the document lists (the axum
//! family serves a nested `/` leaf both with and without a trailing slash).
//!
//! ## Projection
//!
//! - Base paths accumulate by concatenation as the traversal descends
//! - `:name` placeholders become `{name}`
//! - Path and query schemas must describe objects; every declared property becomes
//!   one required parameter, object-valued `additionalProperties` entries become
//!   parameters that are required only in the path
//! - The last body parameter becomes the request body (`multipart/formdata` for
//!   form bodies, `application/json` otherwise)
//! - Declared responses and security requirements are copied verbatim
//!
//! Paths the skeleton already defines take precedence over synthesized ones.

mod build;
mod load;

pub use build::{build_document, collect_paths, project, translate_path, PathMap};
pub use load::{load_skeleton, parse_skeleton};

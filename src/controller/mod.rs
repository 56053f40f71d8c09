//! # Controller Module
//!
//! Controllers are plain Rust types that implement [`Controller`]. The route tree
//! refers to them through a [`ControllerHandle`], and a [`Container`] decides which
//! instance serves each request.

mod container;
mod core;

pub use container::{Container, FreshInstance, Singleton};
pub use core::{
    short_type_name, unknown_method, Argument, Arguments, Controller, ControllerHandle,
    HandlerResponse,
};

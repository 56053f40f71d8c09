//! # Error Module
//!
//! Two error families flow through the crate:
//!
//! - [`ConfigError`] - raised while declaring, adapting or projecting a route tree.
//!   These are fatal setup failures and are never retried.
//! - [`RouteError`] - raised while serving a single request. Every variant reaches
//!   the adapter's [`ErrorHook`](crate::adapter::ErrorHook) so validation failures
//!   and handler failures are observed through one channel.

use std::fmt;

use http::{Method, StatusCode};
use serde::Serialize;

use crate::tree::ParamKind;
use crate::validator::ValidationIssue;

/// Build-time configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A nested controller was attached before its own tree was declared
    MissingRouterMetadata {
        /// Controller declaring the mount point
        controller: String,
        /// Name of the mount point field
        field: String,
    },
    /// A controller was adapted or projected without any declarations
    UnregisteredController {
        /// Controller type name
        controller: String,
    },
    /// The tree failed structural validation
    InvalidTree {
        /// Controller owning the tree
        controller: String,
        /// Every issue found during validation
        issues: Vec<ValidationIssue>,
    },
    /// Two leaves of one subtree registered the same verb and path
    DuplicateRoute {
        /// HTTP verb
        method: Method,
        /// Path template relative to the subtree
        path: String,
    },
    /// A mounted route names its placeholders differently from a route already
    /// matching the same requests
    RouteConflict {
        /// Full template of the mounted route
        path: String,
        /// Template already registered for the same position
        existing: String,
    },
    /// Two subtrees were mounted under the same prefix of one router
    MountConflict {
        /// The conflicting prefix
        prefix: String,
    },
    /// The target router cannot register this verb
    UnsupportedMethod {
        /// HTTP verb
        method: Method,
    },
    /// A parameter schema could not be compiled
    InvalidSchema {
        /// `Controller.method[index]` of the offending parameter
        location: String,
        /// Compiler message
        message: String,
    },
    /// A path or query parameter lacks an object schema for contract projection
    ParameterSchema {
        /// `Controller.method` of the offending operation
        operation: String,
        /// Parameter kind
        kind: ParamKind,
        /// Why the schema was rejected
        reason: String,
    },
    /// The projected document could not be assembled
    Document(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRouterMetadata { controller, field } => write!(
                f,
                "did not find router metadata in {controller}.{field}; declare the nested controller first"
            ),
            ConfigError::UnregisteredController { controller } => {
                write!(f, "no routing metadata found in {controller}")
            }
            ConfigError::InvalidTree { controller, issues } => {
                write!(f, "route tree of {controller} is invalid ({} issue(s))", issues.len())?;
                for issue in issues {
                    write!(f, "; [{}] {}: {}", issue.kind, issue.location, issue.message)?;
                }
                Ok(())
            }
            ConfigError::DuplicateRoute { method, path } => {
                write!(f, "route {method} {path} is registered twice in one subtree")
            }
            ConfigError::RouteConflict { path, existing } => {
                write!(f, "route template '{path}' conflicts with '{existing}'")
            }
            ConfigError::MountConflict { prefix } => {
                write!(f, "more than one subtree is mounted under '{prefix}'")
            }
            ConfigError::UnsupportedMethod { method } => {
                write!(f, "HTTP method {method} cannot be registered on this router")
            }
            ConfigError::InvalidSchema { location, message } => {
                write!(f, "schema for {location} does not compile: {message}")
            }
            ConfigError::ParameterSchema {
                operation,
                kind,
                reason,
            } => write!(f, "schema for {kind} parameter of {operation} required: {reason}"),
            ConfigError::Document(msg) => write!(f, "contract document error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// One schema violation reported by the validation engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// JSON pointer into the validated value
    pub instance_path: String,
    /// JSON pointer into the schema
    pub schema_path: String,
    /// Human readable message
    pub message: String,
}

/// Request-time error
///
/// Returned by the parameter resolution pipeline and by invoked controllers.
#[derive(Debug)]
pub enum RouteError {
    /// A parameter failed schema validation
    Validation {
        /// Kind of the parameter that failed
        kind: ParamKind,
        /// Structured violation list from the schema engine
        violations: Vec<Violation>,
    },
    /// The request body could not be decoded
    BodyDecode {
        /// Decoder message
        message: String,
    },
    /// The request body is larger than the configured limit
    PayloadTooLarge {
        /// Limit in bytes
        limit: usize,
    },
    /// A schema failed to compile at request time
    Schema {
        /// Compiler message
        message: String,
    },
    /// The controller method itself failed
    Handler(anyhow::Error),
}

impl RouteError {
    /// HTTP status the default error hook answers with
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            RouteError::Validation { .. } | RouteError::BodyDecode { .. } => {
                StatusCode::BAD_REQUEST
            }
            RouteError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RouteError::Schema { .. } | RouteError::Handler(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short machine readable label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            RouteError::Validation { .. } => "validation",
            RouteError::BodyDecode { .. } => "body_decode",
            RouteError::PayloadTooLarge { .. } => "payload_too_large",
            RouteError::Schema { .. } => "schema",
            RouteError::Handler(_) => "handler",
        }
    }
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::Validation { kind, violations } => write!(
                f,
                "parameter validation failed for {kind} ({} violation(s))",
                violations.len()
            ),
            RouteError::BodyDecode { message } => write!(f, "request body decode failed: {message}"),
            RouteError::PayloadTooLarge { limit } => {
                write!(f, "request body exceeds the limit of {limit} bytes")
            }
            RouteError::Schema { message } => write!(f, "schema compilation failed: {message}"),
            RouteError::Handler(err) => write!(f, "handler failed: {err}"),
        }
    }
}

impl std::error::Error for RouteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouteError::Handler(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for RouteError {
    fn from(err: anyhow::Error) -> Self {
        RouteError::Handler(err)
    }
}

use std::sync::Arc;

use futures::future::try_join_all;
use serde_json::Value;
use tracing::debug;

use super::request::{coerce_params, decode_body, string_map, RequestContext};
use crate::controller::{Argument, Arguments};
use crate::error::RouteError;
use crate::tree::{ParamDescriptor, ParamKind};
use crate::validator_cache::SchemaEngine;

/// Options for [`resolve_params`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Convert path and query strings to the scalar types their schema declares
    pub coerce_params: bool,
}

/// Resolve every declared parameter of a route against one request
///
/// Descriptors are resolved concurrently; the returned arguments are in ascending
/// `index` order regardless of the order the descriptors were given in. The first
/// failure aborts resolution and no argument list is produced.
pub async fn resolve_params(
    params: &[ParamDescriptor],
    ctx: &Arc<RequestContext>,
    engine: &dyn SchemaEngine,
    options: ResolveOptions,
) -> Result<Arguments, RouteError> {
    let mut ordered: Vec<&ParamDescriptor> = params.iter().collect();
    ordered.sort_by_key(|p| p.index);
    let args = try_join_all(
        ordered
            .into_iter()
            .map(|param| resolve_param(param, ctx, engine, options)),
    )
    .await?;
    Ok(Arguments::new(args))
}

/// Extract, optionally coerce, and validate one argument
pub async fn resolve_param(
    param: &ParamDescriptor,
    ctx: &Arc<RequestContext>,
    engine: &dyn SchemaEngine,
    options: ResolveOptions,
) -> Result<Argument, RouteError> {
    let value = match param.kind {
        ParamKind::Context => return Ok(Argument::Context(Arc::clone(ctx))),
        ParamKind::Body => decode_body(&ctx.body, param.media_type, ctx.content_type()).await?,
        ParamKind::PathParam => string_map(&ctx.path_params),
        ParamKind::Query => string_map(&ctx.query_params),
    };

    let Some(schema) = &param.schema else {
        return Ok(Argument::Value(value));
    };
    let value = match param.kind {
        ParamKind::PathParam | ParamKind::Query if options.coerce_params => {
            coerce_params(value, schema)
        }
        _ => value,
    };
    validate(param, &value, schema, engine)?;
    Ok(Argument::Value(value))
}

fn validate(
    param: &ParamDescriptor,
    value: &Value,
    schema: &Value,
    engine: &dyn SchemaEngine,
) -> Result<(), RouteError> {
    let compiled = engine
        .compile(schema)
        .map_err(|message| RouteError::Schema { message })?;
    compiled.check(value).map_err(|violations| {
        debug!(
            index = param.index,
            kind = %param.kind,
            violations = violations.len(),
            "Parameter failed validation"
        );
        RouteError::Validation {
            kind: param.kind,
            violations,
        }
    })
}

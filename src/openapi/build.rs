use std::collections::BTreeMap;
use std::sync::LazyLock;

use oas3::OpenApiV3Spec;
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::load::strip_unknown_verbs;
use crate::error::ConfigError;
use crate::tree::{
    Child, MediaType, ParamDescriptor, ParamKind, Registry, ResponseSpec, RouteHandlerNode,
    RouterNode,
};
use crate::validator::log_issues;

/// Path template -> lowercase verb -> operation object
pub type PathMap = BTreeMap<String, Map<String, Value>>;

static PLACEHOLDER: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r":(\w+)"));

/// `/resource/:id` -> `/resource/{id}`
pub fn translate_path(template: &str) -> Result<String, ConfigError> {
    let pattern = PLACEHOLDER
        .as_ref()
        .map_err(|e| ConfigError::Document(format!("placeholder pattern: {e}")))?;
    Ok(pattern.replace_all(template, "{${1}}").into_owned())
}

/// Synthesize the path entries of `node` and everything nested under it
///
/// `prefix` is the accumulated base path of the enclosing nodes.
pub fn collect_paths(node: &RouterNode, prefix: &str) -> Result<PathMap, ConfigError> {
    let base = format!("{prefix}{}", node.base_path);
    let mut paths = PathMap::new();
    for (name, child) in &node.children {
        match child {
            Child::Subtree(nested) => {
                for (path, item) in collect_paths(nested, &base)? {
                    paths.entry(path).or_default().extend(item);
                }
            }
            Child::Leaf(leaf) => {
                let (Some(method), Some(path)) = (&leaf.method, leaf.absolute_path()) else {
                    continue;
                };
                let operation_id = format!("{}.{}", node.owner.name(), name);
                let path = translate_path(&format!("{base}{path}"))?;
                let operation = operation(&operation_id, leaf)?;
                debug!(path = %path, method = %method, operation = %operation_id, "Projected operation");
                paths
                    .entry(path)
                    .or_default()
                    .insert(method.as_str().to_ascii_lowercase(), operation);
            }
        }
    }
    Ok(paths)
}

fn operation(operation_id: &str, leaf: &RouteHandlerNode) -> Result<Value, ConfigError> {
    let params = leaf.sorted_params();
    let mut parameters = Vec::new();
    for param in &params {
        parameters.extend(parameter_entries(operation_id, param)?);
    }

    let mut op = Map::new();
    op.insert("parameters".into(), Value::Array(parameters));
    if let Some(body) = params.iter().rev().find(|p| p.kind == ParamKind::Body) {
        op.insert("requestBody".into(), request_body(body));
    }
    if !leaf.responses.is_empty() {
        let responses: Map<String, Value> = leaf
            .responses
            .iter()
            .map(|(status, spec)| (status.clone(), response(spec)))
            .collect();
        op.insert("responses".into(), Value::Object(responses));
    }
    if !leaf.security.is_empty() {
        op.insert("security".into(), json!(leaf.security));
    }
    Ok(Value::Object(op))
}

fn request_body(param: &ParamDescriptor) -> Value {
    let content_type = match param.media_type {
        Some(MediaType::Form) => "multipart/formdata",
        _ => "application/json",
    };
    let mut media = Map::new();
    if let Some(schema) = &param.schema {
        media.insert("schema".into(), schema.clone());
    }
    let mut content = Map::new();
    content.insert(content_type.to_string(), Value::Object(media));
    json!({
        "required": true,
        "content": content,
    })
}

fn response(spec: &ResponseSpec) -> Value {
    let content: Map<String, Value> = spec
        .content
        .iter()
        .map(|(content_type, schema)| {
            let mut media = Map::new();
            if let Some(schema) = schema {
                media.insert("schema".into(), schema.clone());
            }
            (content_type.clone(), Value::Object(media))
        })
        .collect();
    json!({
        "description": spec.description,
        "content": content,
    })
}

/// One parameter object per property of a path or query schema
fn parameter_entries(operation_id: &str, param: &ParamDescriptor) -> Result<Vec<Value>, ConfigError> {
    let location = match param.kind {
        ParamKind::PathParam => "path",
        ParamKind::Query => "query",
        ParamKind::Body | ParamKind::Context => return Ok(Vec::new()),
    };
    let schema_error = |reason: &str| ConfigError::ParameterSchema {
        operation: operation_id.to_string(),
        kind: param.kind,
        reason: reason.to_string(),
    };
    let schema = param
        .schema
        .as_ref()
        .ok_or_else(|| schema_error("no schema declared"))?;
    if schema.get("type").and_then(Value::as_str) != Some("object") {
        return Err(schema_error("schema must describe an object"));
    }

    let declared = schema
        .get("properties")
        .and_then(Value::as_object)
        .into_iter()
        .flatten()
        .map(|(name, prop)| parameter(location, name, true, prop));
    let additional = schema
        .get("additionalProperties")
        .and_then(Value::as_object)
        .into_iter()
        .flatten()
        .filter(|(_, prop)| prop.is_object())
        .map(|(name, prop)| parameter(location, name, location == "path", prop));
    Ok(declared.chain(additional).collect())
}

fn parameter(location: &str, name: &str, required: bool, schema: &Value) -> Value {
    json!({
        "in": location,
        "name": name,
        "required": required,
        "schema": schema,
    })
}

/// Merge the synthesized paths of `node` into `skeleton`
///
/// Paths already present in the skeleton win over synthesized ones.
pub fn project(node: &RouterNode, skeleton: Value) -> Result<Value, ConfigError> {
    let issues = node.validate();
    if !issues.is_empty() {
        log_issues(node.owner.name(), &issues);
        return Err(ConfigError::InvalidTree {
            controller: node.owner.name().to_string(),
            issues,
        });
    }

    let Value::Object(mut doc) = skeleton else {
        return Err(ConfigError::Document("skeleton must be a JSON object".into()));
    };
    let mut paths: Map<String, Value> = collect_paths(node, "")?
        .into_iter()
        .map(|(path, item)| (path, Value::Object(item)))
        .collect();
    if let Some(Value::Object(existing)) = doc.remove("paths") {
        paths.extend(existing);
    }
    doc.insert("paths".into(), Value::Object(paths));

    let mut doc = Value::Object(doc);
    strip_unknown_verbs(&mut doc);
    Ok(doc)
}

/// Project the tree of `C` onto a typed OpenAPI document
pub fn build_document<C: 'static>(
    registry: &Registry,
    skeleton: &OpenApiV3Spec,
) -> Result<OpenApiV3Spec, ConfigError> {
    let skeleton = serde_json::to_value(skeleton).map_err(|e| ConfigError::Document(e.to_string()))?;
    let doc = project(registry.tree::<C>()?, skeleton)?;
    serde_json::from_value(doc).map_err(|e| ConfigError::Document(e.to_string()))
}

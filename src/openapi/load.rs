use std::path::Path;

use anyhow::Context;
use oas3::OpenApiV3Spec;
use serde_json::Value;

/// Drop path-item keys that are neither verbs nor standard path-item fields
pub(crate) fn strip_unknown_verbs(val: &mut Value) {
    const METHODS: [&str; 8] = ["get", "post", "put", "delete", "patch", "options", "head", "trace"];

    let Some(Value::Object(paths)) = val.get_mut("paths") else {
        return;
    };
    for item in paths.values_mut() {
        if let Value::Object(obj) = item {
            obj.retain(|k, _| {
                let lk = k.to_ascii_lowercase();
                match lk.as_str() {
                    "summary" | "description" | "servers" | "parameters" | "$ref" => true,
                    m if METHODS.contains(&m) => true,
                    _ => k.starts_with("x-"),
                }
            });
        }
    }
}

/// Parse a skeleton document from YAML or JSON text
pub fn parse_skeleton(content: &str, yaml: bool) -> anyhow::Result<OpenApiV3Spec> {
    let mut value: Value = if yaml {
        serde_yaml::from_str(content).context("skeleton is not valid YAML")?
    } else {
        serde_json::from_str(content).context("skeleton is not valid JSON")?
    };
    strip_unknown_verbs(&mut value);
    serde_json::from_value(value).context("skeleton is not an OpenAPI 3 document")
}

/// Load a skeleton document; `.yaml`/`.yml` files are parsed as YAML, anything else as JSON
pub fn load_skeleton(path: impl AsRef<Path>) -> anyhow::Result<OpenApiV3Spec> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read skeleton {}", path.display()))?;
    let yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    parse_skeleton(&content, yaml)
}

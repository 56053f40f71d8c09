//! # Schema Validator Cache Module
//!
//! Parameter schemas are compiled once and shared across requests.
//!
//! ## Overview
//!
//! The pipeline only depends on the [`SchemaEngine`] trait. Two engines ship with
//! the crate:
//!
//! - [`JsonSchemaEngine`] - compiles on every call, useful for tests
//! - [`ValidatorCache`] - compiles once per distinct schema and hands out
//!   `Arc`-wrapped validators afterwards
//!
//! ## Cache Keys
//!
//! Keys are the SHA-256 of the schema's serialized JSON, so two routes declaring
//! the same schema share one compiled validator.
//!
//! ## Thread Safety
//!
//! The cache uses `Arc<RwLock<HashMap>>`:
//! - Multiple readers can access the cache simultaneously
//! - Writers acquire exclusive access for insertions
//! - A poisoned lock is recovered, as the map holds no partial state
//!
//! ## Configuration
//!
//! The cache can be disabled via `ROUTETREE_SCHEMA_CACHE=off`.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use jsonschema::JSONSchema;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{ConfigError, Violation};
use crate::tree::{Child, ParamKind, RouterNode};

/// A compiled schema
pub trait CompiledSchema: Send + Sync {
    /// Validate `value`, returning every violation on failure
    fn check(&self, value: &Value) -> Result<(), Vec<Violation>>;
}

/// Compiles JSON Schemas into validators
pub trait SchemaEngine: Send + Sync {
    fn compile(&self, schema: &Value) -> Result<Arc<dyn CompiledSchema>, String>;
}

impl CompiledSchema for JSONSchema {
    fn check(&self, value: &Value) -> Result<(), Vec<Violation>> {
        JSONSchema::validate(self, value).map_err(|errors| {
            errors
                .map(|e| Violation {
                    instance_path: e.instance_path.to_string(),
                    schema_path: e.schema_path.to_string(),
                    message: e.to_string(),
                })
                .collect()
        })
    }
}

/// Compiles without caching
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaEngine;

impl SchemaEngine for JsonSchemaEngine {
    fn compile(&self, schema: &Value) -> Result<Arc<dyn CompiledSchema>, String> {
        let compiled = JSONSchema::compile(schema).map_err(|e| e.to_string())?;
        Ok(Arc::new(compiled))
    }
}

/// Thread-safe cache of compiled validators
#[derive(Clone)]
pub struct ValidatorCache {
    cache: Arc<RwLock<HashMap<String, Arc<JSONSchema>>>>,
    enabled: bool,
}

impl ValidatorCache {
    pub fn new(enabled: bool) -> Self {
        info!(enabled = enabled, "Initializing JSON Schema validator cache");
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            enabled,
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn cache_key(schema: &Value) -> String {
        let mut hasher = Sha256::new();
        hasher.update(schema.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Get a cached validator or compile and cache a new one
    pub fn get_or_compile(&self, schema: &Value) -> Result<Arc<JSONSchema>, String> {
        if !self.enabled {
            return JSONSchema::compile(schema)
                .map(Arc::new)
                .map_err(|e| e.to_string());
        }

        let key = Self::cache_key(schema);
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(validator) = cache.get(&key) {
                debug!(cache_key = %key, "Schema validator cache hit");
                return Ok(Arc::clone(validator));
            }
        }

        let compiled = Arc::new(JSONSchema::compile(schema).map_err(|e| e.to_string())?);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        // Another task may have compiled the same schema while we waited
        if let Some(existing) = cache.get(&key) {
            return Ok(Arc::clone(existing));
        }
        cache.insert(key.clone(), Arc::clone(&compiled));
        info!(
            cache_key = %key,
            cache_size = cache.len(),
            "Schema validator compiled and cached"
        );
        Ok(compiled)
    }

    /// Number of cached validators
    #[must_use]
    pub fn size(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn clear(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let dropped = cache.len();
        cache.clear();
        info!(dropped = dropped, "Schema validator cache cleared");
    }
}

impl Default for ValidatorCache {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SchemaEngine for ValidatorCache {
    fn compile(&self, schema: &Value) -> Result<Arc<dyn CompiledSchema>, String> {
        let compiled: Arc<dyn CompiledSchema> = self.get_or_compile(schema)?;
        Ok(compiled)
    }
}

/// Compile every parameter schema of a tree, nested controllers included
///
/// Context parameters are never validated and are skipped. Returns the number of
/// schemas compiled.
pub fn precompile_tree(engine: &dyn SchemaEngine, node: &RouterNode) -> Result<usize, ConfigError> {
    let mut compiled = 0;
    for (name, child) in &node.children {
        match child {
            Child::Subtree(nested) => compiled += precompile_tree(engine, nested)?,
            Child::Leaf(leaf) => {
                for param in &leaf.params {
                    if param.kind == ParamKind::Context {
                        continue;
                    }
                    let Some(schema) = &param.schema else {
                        continue;
                    };
                    engine
                        .compile(schema)
                        .map_err(|message| ConfigError::InvalidSchema {
                            location: format!("{}.{}[{}]", node.owner.name(), name, param.index),
                            message,
                        })?;
                    compiled += 1;
                }
            }
        }
    }
    Ok(compiled)
}

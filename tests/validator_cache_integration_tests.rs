//! Integration tests for JSON Schema validator caching
//!
//! # Test Coverage
//!
//! - Adapting a tree compiles every parameter schema up front
//! - Identical schemas on different routes share one validator
//! - Requests reuse the compiled validators
//! - A schema that does not compile fails adaptation with its location
//! - Validation behaves the same with the cache disabled

mod common;

use std::sync::Arc;
use std::thread;

use common::fixtures::{resource_registry, Resource};
use common::http_util::{get, send};
use http::StatusCode;
use routetree::adapter::{into_router, Adapter, RouteTable};
use routetree::tree::Registry;
use routetree::validator_cache::{precompile_tree, JsonSchemaEngine, ValidatorCache};
use routetree::ConfigError;
use serde_json::json;

#[tokio::test]
async fn test_adapt_precompiles_and_requests_reuse() {
    let cache = ValidatorCache::new(true);
    let adapter = Adapter::default().with_schema_engine(cache.clone());
    let app = into_router::<Resource>(&adapter, &resource_registry()).unwrap();

    // id, query and book schemas; Special reuses the id schema
    assert_eq!(cache.size(), 3);

    for uri in ["/resource/1?query=a", "/resource/2?query=b", "/resource/special/3"] {
        let (status, _) = send(app.clone(), get(uri)).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(cache.size(), 3, "requests must not compile new validators");
}

#[test]
fn test_precompile_counts_every_schema() {
    let registry = resource_registry();
    let tree = registry.tree::<Resource>().unwrap();
    // get_one: 2, create: 3, special.get_one: 1
    assert_eq!(precompile_tree(&JsonSchemaEngine, tree).unwrap(), 6);
}

#[test]
fn test_invalid_schema_fails_adaptation() {
    let mut registry = Registry::new();
    let _ = registry
        .controller::<Resource>()
        .base_path("/resource")
        .route("get_one", |r| {
            r.get("/:id")
                .context(0)
                .query(1, json!({"type": "object"}))
                .path_params(2, json!({"type": 42}));
        });

    let err = Adapter::default()
        .adapt::<Resource, _>(&registry, RouteTable::new())
        .err()
        .unwrap();
    match err {
        ConfigError::InvalidSchema { location, message } => {
            assert_eq!(location, "Resource.get_one[2]");
            assert!(!message.is_empty());
        }
        other => panic!("expected InvalidSchema, got {other:?}"),
    }
}

#[tokio::test]
async fn test_disabled_cache_still_validates() {
    let cache = ValidatorCache::new(false);
    let adapter = Adapter::default().with_schema_engine(cache.clone());
    let app = into_router::<Resource>(&adapter, &resource_registry()).unwrap();

    let (status, _) = send(app.clone(), get("/resource/1?query=a")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(app, get("/resource/1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "query");
    assert_eq!(cache.size(), 0);
}

#[test]
fn test_concurrent_compilation_converges() {
    let cache = ValidatorCache::new(true);
    let schema = Arc::new(json!({
        "type": "object",
        "properties": {"name": {"type": "string"}},
        "required": ["name"]
    }));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            let schema = Arc::clone(&schema);
            thread::spawn(move || cache.get_or_compile(&schema).unwrap())
        })
        .collect();
    let compiled: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(cache.size(), 1);
    let first = &compiled[0];
    assert!(compiled.iter().all(|c| Arc::ptr_eq(c, first)));
}

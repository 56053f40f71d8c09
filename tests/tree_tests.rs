mod common;

use common::fixtures::{declare_special, id_schema, resource_registry, Resource, Special};
use http::Method;
use routetree::adapter::{Adapter, RouteTable};
use routetree::tree::{ParamDescriptor, ParamKind, Registry};
use routetree::{ConfigError, ControllerHandle};
use serde_json::json;
use tracing::Level;
use tracing_util::TestTracing;

#[test]
fn test_resource_tree_shape() {
    let registry = resource_registry();
    let tree = registry.tree::<Resource>().unwrap();

    assert_eq!(tree.base_path, "/resource");
    assert_eq!(tree.owner, ControllerHandle::of::<Resource>());

    let get_one = tree.leaf("get_one").unwrap();
    assert_eq!(get_one.method, Some(Method::GET));
    assert_eq!(get_one.path.as_deref(), Some("/:id"));
    let kinds: Vec<_> = get_one.params.iter().map(|p| p.kind).collect();
    assert_eq!(kinds, vec![ParamKind::PathParam, ParamKind::Query]);

    let create = tree.leaf("create").unwrap();
    assert_eq!(create.method, Some(Method::POST));
    assert_eq!(create.params[2].kind, ParamKind::Body);

    let special = tree.subtree("special").unwrap();
    assert_eq!(special.base_path, "/special");
    assert_eq!(special.owner, ControllerHandle::of::<Special>());
    assert!(special.leaf("get_one").is_some());
}

#[test]
fn test_params_sorted_regardless_of_declaration_order() {
    let mut registry = Registry::new();
    registry.declare_param::<Resource>("search", ParamDescriptor::query(2));
    registry.declare_param::<Resource>("search", ParamDescriptor::context(0));
    registry.declare_param::<Resource>("search", ParamDescriptor::body(1));
    registry.declare_method::<Resource>("search", Method::POST, None);

    let leaf = registry.tree::<Resource>().unwrap().leaf("search").unwrap().clone();
    let indices: Vec<_> = leaf.params.iter().map(|p| p.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(leaf.path.as_deref(), Some("/search"));
}

#[test]
fn test_redeclared_param_replaces_previous() {
    let mut registry = Registry::new();
    let _ = registry.controller::<Resource>().route("get_one", |r| {
        r.get("/:id")
            .path_params(0, None::<serde_json::Value>)
            .path_params(0, id_schema());
    });
    let leaf = registry.tree::<Resource>().unwrap().leaf("get_one").unwrap().clone();
    assert_eq!(leaf.params.len(), 1);
    assert_eq!(leaf.params[0].schema, Some(id_schema()));
}

#[test]
fn test_default_base_path_is_type_name() {
    let mut registry = Registry::new();
    registry.declare_method::<Resource>("get_one", Method::GET, Some("/:id"));
    assert_eq!(registry.tree::<Resource>().unwrap().base_path, "/Resource");
}

#[test]
fn test_nesting_copies_tree_at_nesting_time() {
    let mut registry = Registry::new();
    declare_special(&mut registry);
    let _ = registry
        .controller::<Resource>()
        .base_path("/resource")
        .nested::<Special>("special")
        .unwrap();

    // declared after nesting: visible on Special, not on the copy inside Resource
    let _ = registry.controller::<Special>().route("list", |r| {
        r.get("/");
    });

    let own = registry.tree::<Special>().unwrap();
    assert!(own.leaf("list").is_some());
    let nested = registry.tree::<Resource>().unwrap().subtree("special").unwrap();
    assert!(nested.leaf("list").is_none());
    assert!(nested.leaf("get_one").is_some());
}

#[test]
fn test_nesting_undeclared_controller_fails() {
    let mut registry = Registry::new();
    let err = registry
        .controller::<Resource>()
        .nested::<Special>("special")
        .err()
        .unwrap();
    assert_eq!(
        err,
        ConfigError::MissingRouterMetadata {
            controller: "Resource".into(),
            field: "special".into(),
        }
    );
    assert!(err.to_string().contains("Resource.special"));
}

#[test]
fn test_unregistered_controller() {
    let registry = Registry::new();
    let err = registry.tree::<Resource>().unwrap_err();
    assert_eq!(
        err,
        ConfigError::UnregisteredController {
            controller: "Resource".into()
        }
    );
}

#[test]
fn test_validate_reports_missing_method_and_gap() {
    let mut registry = Registry::new();
    registry.declare_param::<Resource>("orphan", ParamDescriptor::query(0));
    registry.declare_method::<Resource>("gappy", Method::GET, Some("/gappy"));
    registry.declare_param::<Resource>("gappy", ParamDescriptor::context(0));
    registry.declare_param::<Resource>("gappy", ParamDescriptor::query(2));

    let issues = registry.tree::<Resource>().unwrap().validate();
    let kinds: Vec<_> = issues.iter().map(|i| (i.location.as_str(), i.kind.as_str())).collect();
    assert!(kinds.contains(&("Resource.orphan", "MissingMethod")));
    assert!(kinds.contains(&("Resource.gappy", "ParameterGap")));

    let err = Adapter::default()
        .adapt::<Resource, _>(&registry, RouteTable::new())
        .err()
        .unwrap();
    match err {
        ConfigError::InvalidTree { controller, issues } => {
            assert_eq!(controller, "Resource");
            assert_eq!(issues.len(), 2);
        }
        other => panic!("expected InvalidTree, got {other:?}"),
    }
}

#[test]
fn test_route_declaration_replacing_nested_router_warns() {
    let capture = TestTracing::init();
    let mut registry = Registry::new();
    declare_special(&mut registry);
    let decl = registry
        .controller::<Resource>()
        .nested::<Special>("special")
        .unwrap();
    let _ = decl.route("special", |r| {
        r.get("/special").body(0, json!({"type": "object"}));
    });

    let tree = registry.tree::<Resource>().unwrap();
    assert!(tree.subtree("special").is_none());
    assert!(tree.leaf("special").is_some());
    assert!(capture.saw(Level::WARN, "Replacing nested router"));
}

#[test]
fn test_fluent_responses_and_security() {
    let mut registry = Registry::new();
    let _ = registry.controller::<Resource>().route("get_one", |r| {
        r.get("/:id")
            .response("200", "application/json", "The resource", json!({"type": "object"}))
            .response("200", "text/plain", "", None::<serde_json::Value>)
            .secured("bearer", &["read"]);
    });
    let leaf = registry.tree::<Resource>().unwrap().leaf("get_one").unwrap().clone();
    let ok = &leaf.responses["200"];
    assert_eq!(ok.description, "The resource");
    assert_eq!(ok.content.len(), 2);
    assert_eq!(leaf.security[0]["bearer"], vec!["read".to_string()]);
}

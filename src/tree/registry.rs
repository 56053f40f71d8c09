use std::any::TypeId;
use std::collections::HashMap;
use std::marker::PhantomData;

use http::Method;
use serde_json::Value;
use tracing::{debug, warn};

use super::types::{
    Child, MediaType, MiddlewareRef, ParamDescriptor, ParamKind, ResponseSpec, RouteHandlerNode,
    RouterNode, SecurityRequirement,
};
use crate::controller::{short_type_name, Controller, ControllerHandle};
use crate::error::ConfigError;

/// Route trees keyed by controller type
///
/// Every declaration is a read-or-create on the controller's [`RouterNode`], so
/// declarations may arrive in any order. Nested controllers are copied into the
/// parent at the moment of nesting; declarations made on the nested controller
/// afterwards are not seen by the parent.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    trees: HashMap<TypeId, RouterNode>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree of controller `C`
    pub fn tree<C: 'static>(&self) -> Result<&RouterNode, ConfigError> {
        self.trees
            .get(&TypeId::of::<C>())
            .ok_or_else(|| ConfigError::UnregisteredController {
                controller: short_type_name::<C>().to_string(),
            })
    }

    #[must_use]
    pub fn contains<C: 'static>(&self) -> bool {
        self.trees.contains_key(&TypeId::of::<C>())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    fn node_mut<C: Controller + Default>(&mut self) -> &mut RouterNode {
        self.trees
            .entry(TypeId::of::<C>())
            .or_insert_with(|| RouterNode::new(ControllerHandle::of::<C>()))
    }

    fn with_leaf<C, F>(&mut self, name: &str, f: F)
    where
        C: Controller + Default,
        F: FnOnce(&mut RouteHandlerNode),
    {
        let node = self.node_mut::<C>();
        let owner = node.owner.name();
        let slot = node
            .children
            .entry(name.to_string())
            .or_insert_with(|| Child::Leaf(RouteHandlerNode::default()));
        if matches!(slot, Child::Subtree(_)) {
            warn!(
                controller = owner,
                name = name,
                "Replacing nested router with a route declaration"
            );
            *slot = Child::Leaf(RouteHandlerNode::default());
        }
        if let Child::Leaf(leaf) = slot {
            f(leaf);
        }
    }

    /// Mark `C` as a router; `None` keeps the default `/<TypeName>` base path
    pub fn declare_router<C: Controller + Default>(&mut self, base_path: Option<&str>) {
        let node = self.node_mut::<C>();
        if let Some(path) = base_path {
            node.base_path = path.to_string();
        }
        debug!(controller = node.owner.name(), base_path = %node.base_path, "Declared router");
    }

    /// Set the verb and path of `C::name`; `None` defaults the path to `/<name>`
    pub fn declare_method<C: Controller + Default>(
        &mut self,
        name: &str,
        method: Method,
        path: Option<&str>,
    ) {
        self.with_leaf::<C, _>(name, |leaf| set_method(leaf, name, method, path));
    }

    pub fn declare_param<C: Controller + Default>(&mut self, name: &str, param: ParamDescriptor) {
        self.with_leaf::<C, _>(name, |leaf| leaf.upsert_param(param));
    }

    /// Append middleware to a route (`Some(name)`) or to the whole controller (`None`)
    pub fn declare_middleware<C: Controller + Default>(
        &mut self,
        target: Option<&str>,
        middleware: MiddlewareRef,
    ) {
        match target {
            Some(name) => self.with_leaf::<C, _>(name, |leaf| leaf.middleware.push(middleware)),
            None => self.node_mut::<C>().middleware.push(middleware),
        }
    }

    /// Copy the current tree of `N` under `C.field`
    pub fn declare_nested<C: Controller + Default, N: 'static>(
        &mut self,
        field: &str,
    ) -> Result<(), ConfigError> {
        let nested = self
            .trees
            .get(&TypeId::of::<N>())
            .cloned()
            .ok_or_else(|| ConfigError::MissingRouterMetadata {
                controller: short_type_name::<C>().to_string(),
                field: field.to_string(),
            })?;
        let node = self.node_mut::<C>();
        let previous = node
            .children
            .insert(field.to_string(), Child::Subtree(nested));
        if let Some(Child::Leaf(_)) = previous {
            warn!(
                controller = node.owner.name(),
                field = field,
                "Replacing route declaration with a nested router"
            );
        }
        Ok(())
    }

    pub fn declare_response<C: Controller + Default>(
        &mut self,
        name: &str,
        status: &str,
        content_type: &str,
        description: &str,
        schema: Option<Value>,
    ) {
        self.with_leaf::<C, _>(name, |leaf| {
            add_response(leaf, status, content_type, description, schema)
        });
    }

    pub fn declare_security<C: Controller + Default>(
        &mut self,
        name: &str,
        requirement: SecurityRequirement,
    ) {
        self.with_leaf::<C, _>(name, |leaf| leaf.security.push(requirement));
    }

    /// Fluent declarations for controller `C`
    pub fn controller<C: Controller + Default>(&mut self) -> ControllerDecl<'_, C> {
        self.node_mut::<C>();
        ControllerDecl {
            registry: self,
            _controller: PhantomData,
        }
    }
}

fn set_method(leaf: &mut RouteHandlerNode, name: &str, method: Method, path: Option<&str>) {
    leaf.method = Some(method);
    match path {
        Some(path) => leaf.path = Some(path.to_string()),
        None if leaf.path.is_none() => leaf.path = Some(format!("/{name}")),
        None => {}
    }
}

fn add_response(
    leaf: &mut RouteHandlerNode,
    status: &str,
    content_type: &str,
    description: &str,
    schema: Option<Value>,
) {
    let response = leaf
        .responses
        .entry(status.to_string())
        .or_insert_with(ResponseSpec::default);
    if !description.is_empty() {
        response.description = description.to_string();
    }
    response.content.insert(content_type.to_string(), schema);
}

/// Builder returned by [`Registry::controller`]
pub struct ControllerDecl<'a, C> {
    registry: &'a mut Registry,
    _controller: PhantomData<fn() -> C>,
}

impl<'a, C: Controller + Default> ControllerDecl<'a, C> {
    #[must_use]
    pub fn base_path(self, path: &str) -> Self {
        self.registry.declare_router::<C>(Some(path));
        self
    }

    /// Middleware applied to every route of this controller and its nested controllers
    #[must_use]
    pub fn middleware(self, middleware: MiddlewareRef) -> Self {
        self.registry.declare_middleware::<C>(None, middleware);
        self
    }

    pub fn nested<N: 'static>(self, field: &str) -> Result<Self, ConfigError> {
        self.registry.declare_nested::<C, N>(field)?;
        Ok(self)
    }

    #[must_use]
    pub fn route<F>(self, name: &str, declare: F) -> Self
    where
        F: FnOnce(&mut RouteDecl<'_>),
    {
        self.registry.with_leaf::<C, _>(name, |leaf| {
            let mut decl = RouteDecl { leaf, name };
            declare(&mut decl);
        });
        self
    }

    /// The tree declared so far
    #[must_use]
    pub fn node(&self) -> Option<&RouterNode> {
        self.registry.trees.get(&TypeId::of::<C>())
    }
}

/// Declarations for one controller method
pub struct RouteDecl<'r> {
    leaf: &'r mut RouteHandlerNode,
    name: &'r str,
}

impl RouteDecl<'_> {
    pub fn method(&mut self, method: Method, path: Option<&str>) -> &mut Self {
        set_method(self.leaf, self.name, method, path);
        self
    }

    pub fn get(&mut self, path: &str) -> &mut Self {
        self.method(Method::GET, Some(path))
    }

    pub fn post(&mut self, path: &str) -> &mut Self {
        self.method(Method::POST, Some(path))
    }

    pub fn put(&mut self, path: &str) -> &mut Self {
        self.method(Method::PUT, Some(path))
    }

    pub fn patch(&mut self, path: &str) -> &mut Self {
        self.method(Method::PATCH, Some(path))
    }

    pub fn delete(&mut self, path: &str) -> &mut Self {
        self.method(Method::DELETE, Some(path))
    }

    pub fn param(&mut self, param: ParamDescriptor) -> &mut Self {
        self.leaf.upsert_param(param);
        self
    }

    pub fn context(&mut self, index: usize) -> &mut Self {
        self.param(ParamDescriptor::context(index))
    }

    pub fn body(&mut self, index: usize, schema: impl Into<Option<Value>>) -> &mut Self {
        self.schema_param(index, ParamKind::Body, schema.into())
    }

    /// Body decoded as a form: `multipart/form-data` or URL-encoded pairs
    pub fn body_form(&mut self, index: usize, schema: impl Into<Option<Value>>) -> &mut Self {
        let mut param = ParamDescriptor::body(index).with_media_type(MediaType::Form);
        param.schema = schema.into();
        self.param(param)
    }

    pub fn path_params(&mut self, index: usize, schema: impl Into<Option<Value>>) -> &mut Self {
        self.schema_param(index, ParamKind::PathParam, schema.into())
    }

    pub fn query(&mut self, index: usize, schema: impl Into<Option<Value>>) -> &mut Self {
        self.schema_param(index, ParamKind::Query, schema.into())
    }

    fn schema_param(&mut self, index: usize, kind: ParamKind, schema: Option<Value>) -> &mut Self {
        let mut param = ParamDescriptor::new(index, kind);
        param.schema = schema;
        self.param(param)
    }

    pub fn middleware(&mut self, middleware: MiddlewareRef) -> &mut Self {
        self.leaf.middleware.push(middleware);
        self
    }

    pub fn response(
        &mut self,
        status: &str,
        content_type: &str,
        description: &str,
        schema: impl Into<Option<Value>>,
    ) -> &mut Self {
        add_response(self.leaf, status, content_type, description, schema.into());
        self
    }

    /// Require a security scheme with the given scopes
    pub fn secured(&mut self, scheme: &str, scopes: &[&str]) -> &mut Self {
        let mut requirement = SecurityRequirement::new();
        requirement.insert(
            scheme.to_string(),
            scopes.iter().map(|s| (*s).to_string()).collect(),
        );
        self.leaf.security.push(requirement);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{unknown_method, Arguments, HandlerResponse};
    use async_trait::async_trait;
    use serde_json::json;

    #[derive(Default)]
    struct Books;

    #[async_trait]
    impl Controller for Books {
        async fn invoke(&self, method: &str, _args: Arguments) -> anyhow::Result<HandlerResponse> {
            Err(unknown_method("Books", method))
        }
    }

    #[test]
    fn test_declarations_in_any_order() {
        let mut registry = Registry::new();
        registry.declare_param::<Books>("list", ParamDescriptor::query(1));
        registry.declare_param::<Books>("list", ParamDescriptor::context(0));
        registry.declare_method::<Books>("list", Method::GET, None);
        registry.declare_router::<Books>(None);

        let tree = registry.tree::<Books>().unwrap();
        assert_eq!(tree.base_path, "/Books");
        let leaf = tree.leaf("list").unwrap();
        assert_eq!(leaf.path.as_deref(), Some("/list"));
        let kinds: Vec<_> = leaf.params.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![ParamKind::Context, ParamKind::Query]);
    }

    #[test]
    fn test_method_redeclaration_is_idempotent() {
        let mut registry = Registry::new();
        registry.declare_method::<Books>("show", Method::GET, Some("/:id"));
        registry.declare_method::<Books>("show", Method::GET, None);
        let leaf = registry.tree::<Books>().unwrap().leaf("show").unwrap().clone();
        assert_eq!(leaf.path.as_deref(), Some("/:id"));
        assert_eq!(leaf.method, Some(Method::GET));
    }

    #[test]
    fn test_nested_requires_metadata() {
        struct Missing;
        let mut registry = Registry::new();
        let err = registry.declare_nested::<Books, Missing>("missing").unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingRouterMetadata {
                controller: "Books".into(),
                field: "missing".into()
            }
        );
    }

    #[test]
    fn test_fluent_route() {
        let mut registry = Registry::new();
        let _ = registry.controller::<Books>().base_path("/books").route("create", |r| {
            r.post("/")
                .body(0, json!({"type": "object"}))
                .response("201", "application/json", "Created", None)
                .secured("bearer", &["books:write"]);
        });
        let tree = registry.tree::<Books>().unwrap();
        let leaf = tree.leaf("create").unwrap();
        assert_eq!(leaf.method, Some(Method::POST));
        assert_eq!(leaf.params[0].kind, ParamKind::Body);
        assert_eq!(leaf.responses["201"].description, "Created");
        assert_eq!(leaf.security[0]["bearer"], vec!["books:write".to_string()]);
    }
}

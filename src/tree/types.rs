use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use http::Method;
use serde_json::Value;

use crate::controller::ControllerHandle;
use crate::middleware::Middleware;
use crate::validator::ValidationIssue;

/// Shared reference to a request interceptor
pub type MiddlewareRef = Arc<dyn Middleware>;

/// Source of a handler argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// The raw request context itself
    Context,
    /// The decoded request body
    Body,
    /// The map of matched path placeholders
    PathParam,
    /// The map of parsed query-string values
    Query,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Context => write!(f, "context"),
            ParamKind::Body => write!(f, "body"),
            ParamKind::PathParam => write!(f, "param"),
            ParamKind::Query => write!(f, "query"),
        }
    }
}

/// Body decoding hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Json,
    Form,
}

/// One handler argument
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    /// Zero-based position in the handler's argument list
    pub index: usize,
    pub kind: ParamKind,
    /// JSON Schema the extracted value must satisfy
    pub schema: Option<Value>,
    /// Body only: how to decode the raw body
    pub media_type: Option<MediaType>,
}

impl ParamDescriptor {
    pub fn new(index: usize, kind: ParamKind) -> Self {
        Self {
            index,
            kind,
            schema: None,
            media_type: None,
        }
    }

    pub fn context(index: usize) -> Self {
        Self::new(index, ParamKind::Context)
    }

    pub fn body(index: usize) -> Self {
        Self::new(index, ParamKind::Body)
    }

    pub fn path_params(index: usize) -> Self {
        Self::new(index, ParamKind::PathParam)
    }

    pub fn query(index: usize) -> Self {
        Self::new(index, ParamKind::Query)
    }

    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    #[must_use]
    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = Some(media_type);
        self
    }
}

/// Documented response for one status code
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResponseSpec {
    pub description: String,
    /// Content type -> optional schema
    pub content: BTreeMap<String, Option<Value>>,
}

/// Named security schemes with their required scopes
pub type SecurityRequirement = BTreeMap<String, Vec<String>>;

/// One concrete HTTP operation
#[derive(Clone, Default)]
pub struct RouteHandlerNode {
    /// Path template relative to the owning node, e.g. `/:id`
    pub path: Option<String>,
    /// Canonical upper-case verb
    pub method: Option<Method>,
    pub middleware: Vec<MiddlewareRef>,
    /// Kept sorted by `index`
    pub params: Vec<ParamDescriptor>,
    /// Status code -> response documentation
    pub responses: BTreeMap<String, ResponseSpec>,
    pub security: Vec<SecurityRequirement>,
}

impl RouteHandlerNode {
    /// Insert or replace the descriptor at `param.index`
    pub fn upsert_param(&mut self, param: ParamDescriptor) {
        match self.params.binary_search_by_key(&param.index, |p| p.index) {
            Ok(pos) => self.params[pos] = param,
            Err(pos) => self.params.insert(pos, param),
        }
    }

    /// Parameters in ascending `index` order
    #[must_use]
    pub fn sorted_params(&self) -> Vec<ParamDescriptor> {
        let mut params = self.params.clone();
        params.sort_by_key(|p| p.index);
        params
    }

    /// Path with a guaranteed leading slash
    #[must_use]
    pub fn absolute_path(&self) -> Option<String> {
        self.path.as_deref().map(|p| {
            if p.starts_with('/') {
                p.to_string()
            } else {
                format!("/{p}")
            }
        })
    }
}

impl fmt::Debug for RouteHandlerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteHandlerNode")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("middleware", &self.middleware.len())
            .field("params", &self.params)
            .field("responses", &self.responses)
            .field("security", &self.security)
            .finish()
    }
}

/// Entry under a method or field name of a [`RouterNode`]
#[derive(Debug, Clone)]
pub enum Child {
    Leaf(RouteHandlerNode),
    Subtree(RouterNode),
}

impl Child {
    #[must_use]
    pub fn as_leaf(&self) -> Option<&RouteHandlerNode> {
        match self {
            Child::Leaf(leaf) => Some(leaf),
            Child::Subtree(_) => None,
        }
    }

    #[must_use]
    pub fn as_subtree(&self) -> Option<&RouterNode> {
        match self {
            Child::Subtree(node) => Some(node),
            Child::Leaf(_) => None,
        }
    }
}

/// Routing subtree of one controller
#[derive(Clone)]
pub struct RouterNode {
    pub base_path: String,
    pub owner: ControllerHandle,
    pub middleware: Vec<MiddlewareRef>,
    pub children: BTreeMap<String, Child>,
}

impl RouterNode {
    /// Empty node with the default `/<TypeName>` base path
    pub fn new(owner: ControllerHandle) -> Self {
        Self {
            base_path: format!("/{}", owner.name()),
            owner,
            middleware: Vec::new(),
            children: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn leaf(&self, name: &str) -> Option<&RouteHandlerNode> {
        self.children.get(name).and_then(Child::as_leaf)
    }

    #[must_use]
    pub fn subtree(&self, name: &str) -> Option<&RouterNode> {
        self.children.get(name).and_then(Child::as_subtree)
    }

    /// Leaves directly under this node, by method name
    pub fn leaves(&self) -> impl Iterator<Item = (&String, &RouteHandlerNode)> {
        self.children
            .iter()
            .filter_map(|(name, child)| child.as_leaf().map(|leaf| (name, leaf)))
    }

    /// Check the structural invariants of the whole tree
    ///
    /// Every leaf must declare a verb and a path, and its parameter indices must be
    /// exactly `0..n-1`.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        self.collect_issues(&mut issues);
        issues
    }

    fn collect_issues(&self, issues: &mut Vec<ValidationIssue>) {
        for (name, child) in &self.children {
            let location = format!("{}.{}", self.owner.name(), name);
            match child {
                Child::Subtree(node) => node.collect_issues(issues),
                Child::Leaf(leaf) => {
                    if leaf.method.is_none() || leaf.path.is_none() {
                        issues.push(ValidationIssue::new(
                            &location,
                            "MissingMethod",
                            "parameters or middleware were declared but no HTTP method",
                        ));
                    }
                    let indices: BTreeSet<usize> = leaf.params.iter().map(|p| p.index).collect();
                    if indices.len() != leaf.params.len() {
                        issues.push(ValidationIssue::new(
                            &location,
                            "DuplicateParameter",
                            "more than one descriptor shares an index",
                        ));
                    }
                    if let Some(gap) = (0..indices.len()).find(|i| !indices.contains(i)) {
                        issues.push(ValidationIssue::new(
                            &location,
                            "ParameterGap",
                            format!("no parameter declared at index {gap}"),
                        ));
                    }
                }
            }
        }
    }
}

impl fmt::Debug for RouterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterNode")
            .field("base_path", &self.base_path)
            .field("owner", &self.owner.name())
            .field("middleware", &self.middleware.len())
            .field("children", &self.children)
            .finish()
    }
}

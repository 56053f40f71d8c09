use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::pipeline::RequestContext;

/// A routable controller
///
/// Implementations receive the method name declared in the route tree and the
/// arguments resolved for it, in declaration order. Unknown method names should be
/// reported with [`unknown_method`].
#[async_trait]
pub trait Controller: Send + Sync + 'static {
    async fn invoke(&self, method: &str, args: Arguments) -> anyhow::Result<HandlerResponse>;
}

fn construct<C: Controller + Default>() -> Arc<dyn Controller> {
    Arc::new(C::default())
}

/// Type-level identity of a controller, plus a way to build one
///
/// Handles compare equal when they refer to the same controller type.
#[derive(Clone, Copy)]
pub struct ControllerHandle {
    type_id: TypeId,
    name: &'static str,
    construct: fn() -> Arc<dyn Controller>,
}

impl ControllerHandle {
    #[must_use]
    pub fn of<C: Controller + Default>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: short_type_name::<C>(),
            construct: construct::<C>,
        }
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Unqualified type name, e.g. `Resource`
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Build a fresh instance through the type's `Default` impl
    #[must_use]
    pub fn instantiate(&self) -> Arc<dyn Controller> {
        (self.construct)()
    }
}

impl PartialEq for ControllerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ControllerHandle {}

impl fmt::Debug for ControllerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ControllerHandle").field(&self.name).finish()
    }
}

/// Last path segment of a type name with generic arguments removed
#[must_use]
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Error for a method name the controller does not implement
pub fn unknown_method(controller: &str, method: &str) -> anyhow::Error {
    anyhow::anyhow!("{controller} has no handler named '{method}'")
}

/// One resolved handler argument
#[derive(Debug, Clone)]
pub enum Argument {
    /// The request context, passed through untouched
    Context(Arc<RequestContext>),
    /// A decoded (and possibly validated) value
    Value(Value),
}

/// Positional handler arguments
#[derive(Debug, Clone, Default)]
pub struct Arguments(Vec<Argument>);

impl Arguments {
    #[must_use]
    pub fn new(args: Vec<Argument>) -> Self {
        Self(args)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Argument> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Argument> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<Argument> {
        self.0
    }

    pub fn context(&self, index: usize) -> anyhow::Result<Arc<RequestContext>> {
        match self.0.get(index) {
            Some(Argument::Context(ctx)) => Ok(Arc::clone(ctx)),
            Some(Argument::Value(_)) => Err(anyhow::anyhow!("argument {index} is not the request context")),
            None => Err(anyhow::anyhow!("no argument at index {index}")),
        }
    }

    pub fn value(&self, index: usize) -> anyhow::Result<&Value> {
        match self.0.get(index) {
            Some(Argument::Value(value)) => Ok(value),
            Some(Argument::Context(_)) => Err(anyhow::anyhow!("argument {index} is the request context")),
            None => Err(anyhow::anyhow!("no argument at index {index}")),
        }
    }

    /// Deserialize the value at `index` into a typed struct
    pub fn parse<T: DeserializeOwned>(&self, index: usize) -> anyhow::Result<T> {
        let value = self.value(index)?;
        serde_json::from_value(value.clone())
            .map_err(|e| anyhow::anyhow!("argument {index} does not match the expected type: {e}"))
    }
}

/// What a controller method answers with
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// JSON body; `Null` produces an empty body
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    #[must_use]
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self::new(status, HeaderMap::new(), body)
    }

    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::json(StatusCode::OK, body)
    }

    #[must_use]
    pub fn no_content() -> Self {
        Self::json(StatusCode::NO_CONTENT, Value::Null)
    }

    /// Add a header, ignoring names or values that are not valid HTTP
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }
}

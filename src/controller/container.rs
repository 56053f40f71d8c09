use std::any::TypeId;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::core::{Controller, ControllerHandle};

/// Produces the controller instance that serves a request
///
/// Any `Fn(&ControllerHandle) -> Arc<dyn Controller>` closure is a container.
pub trait Container: Send + Sync {
    fn resolve(&self, owner: &ControllerHandle) -> Arc<dyn Controller>;
}

impl<F> Container for F
where
    F: Fn(&ControllerHandle) -> Arc<dyn Controller> + Send + Sync,
{
    fn resolve(&self, owner: &ControllerHandle) -> Arc<dyn Controller> {
        self(owner)
    }
}

/// Builds a new instance for every request
#[derive(Debug, Clone, Copy, Default)]
pub struct FreshInstance;

impl Container for FreshInstance {
    fn resolve(&self, owner: &ControllerHandle) -> Arc<dyn Controller> {
        owner.instantiate()
    }
}

/// Builds each controller once and shares it across requests
#[derive(Default)]
pub struct Singleton {
    instances: DashMap<TypeId, Arc<dyn Controller>>,
}

impl Singleton {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed an instance, e.g. one carrying its own dependencies
    pub fn insert<C: Controller>(&self, controller: C) {
        self.instances.insert(TypeId::of::<C>(), Arc::new(controller));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl Container for Singleton {
    fn resolve(&self, owner: &ControllerHandle) -> Arc<dyn Controller> {
        let entry = self.instances.entry(owner.type_id()).or_insert_with(|| {
            debug!(controller = owner.name(), "Instantiating singleton controller");
            owner.instantiate()
        });
        Arc::clone(entry.value())
    }
}

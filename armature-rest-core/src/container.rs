// Injection container consulted when reader and provider strategies are instantiated

use crate::Error;
use crate::logging::{debug, trace};
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Type-keyed registry of shared instances.
///
/// Populated at bootstrap; during binding it is only read.
#[derive(Clone, Default)]
pub struct Container {
    instances: Arc<RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>>,
}

impl Container {
    pub fn new() -> Self {
        debug!("Creating new injection container");
        Self::default()
    }

    /// Register an instance, replacing any previous one of the same type
    pub fn register<T: Send + Sync + 'static>(&self, instance: T) {
        self.register_arc(Arc::new(instance));
    }

    pub fn register_arc<T: Send + Sync + 'static>(&self, instance: Arc<T>) {
        let type_name = std::any::type_name::<T>();
        self.instances.write().insert(TypeId::of::<T>(), instance);
        debug!(instance = type_name, "Instance registered in injection container");
    }

    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, Error> {
        let type_name = std::any::type_name::<T>();
        trace!(instance = type_name, "Attempting to resolve instance");

        self.instances
            .read()
            .get(&TypeId::of::<T>())
            .and_then(|any| any.clone().downcast::<T>().ok())
            .ok_or_else(|| Error::ProviderNotFound(type_name.to_string()))
    }

    pub fn has<T: Send + Sync + 'static>(&self) -> bool {
        self.instances.read().contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut instances = self.instances.write();
        let count = instances.len();
        instances.clear();
        debug!(instance_count = count, "Cleared injection container");
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container").field("count", &self.len()).finish()
    }
}

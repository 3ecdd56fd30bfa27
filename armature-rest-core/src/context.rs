//! Context injection.
//!
//! Context parameters receive framework-supplied objects instead of values
//! parsed from request text. A [`ContextProvider`] produces such an object
//! from the request; the result is stored in a [`ContextCache`] that lives
//! exactly as long as one request, so a provider runs at most once per type
//! per request.
//!
//! # Example
//!
//! ```rust
//! use armature_rest_core::context::{ContextCache, ContextProviderRegistry};
//! use armature_rest_core::request::RequestContext;
//!
//! struct User(String);
//!
//! let mut providers = ContextProviderRegistry::new();
//! providers.register_fn::<User, _>(|request: &dyn RequestContext| {
//!     request.header("x-user").map(|name| User(name.to_string()))
//! });
//!
//! let mut cache = ContextCache::new();
//! cache.insert(User("ann".into()));
//! assert_eq!(cache.get::<User>().map(|u| u.0.as_str()), Some("ann"));
//! ```

use crate::container::Container;
use crate::definition::RouteDefinition;
use crate::logging::{debug, trace};
use crate::reader::Value;
use crate::request::RequestContext;
use crate::types::{TypeKey, ValueType};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("Can't provide context of type: {0}")]
    Unavailable(String),

    #[error("Context provider for {type_name} failed: {reason}")]
    Provider { type_name: String, reason: String },
}

/// Produces a context object from the request.
pub trait ContextProvider: Send + Sync {
    /// `Ok(None)` when the request carries no such context
    fn provide(&self, request: &dyn RequestContext) -> Result<Option<Value>, ContextError>;
}

struct FnContextProvider<T, F> {
    f: F,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> ContextProvider for FnContextProvider<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(&dyn RequestContext) -> Option<T> + Send + Sync,
{
    fn provide(&self, request: &dyn RequestContext) -> Result<Option<Value>, ContextError> {
        Ok((self.f)(request).map(|value| Arc::new(value) as Value))
    }
}

/// Per-request store of resolved context objects, keyed by type.
///
/// Create one per request and drop it with the request.
#[derive(Clone, Default)]
pub struct ContextCache {
    map: HashMap<TypeKey, Value>,
    /// Types whose provider already ran for this request
    attempted: HashSet<TypeKey>,
}

impl ContextCache {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a typed value, replacing any previous value of that type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.map.insert(TypeKey::of::<T>(), Arc::new(value));
    }

    /// Insert an untyped value under `key`; `value` must hold the type `key` names.
    pub fn insert_value(&mut self, key: TypeKey, value: Value) {
        self.map.insert(key, value);
    }

    #[inline]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeKey::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn get_value(&self, key: &TypeKey) -> Option<&Value> {
        self.map.get(key)
    }

    #[inline]
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.attempted.clear();
    }
}

impl fmt::Debug for ContextCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextCache")
            .field("types", &self.map.keys().collect::<Vec<_>>())
            .finish()
    }
}

type ProviderFactory = fn(&Container) -> Option<Arc<dyn ContextProvider>>;

#[derive(Clone)]
enum ProviderEntry {
    Instance(Arc<dyn ContextProvider>),
    Factory(ProviderFactory),
}

/// Context providers by the type they produce.
#[derive(Clone, Default)]
pub struct ContextProviderRegistry {
    providers: HashMap<TypeKey, ProviderEntry>,
}

impl ContextProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` as the source of `T` values
    pub fn register<T: 'static>(&mut self, provider: impl ContextProvider + 'static) -> &mut Self {
        self.providers
            .insert(TypeKey::of::<T>(), ProviderEntry::Instance(Arc::new(provider)));
        self
    }

    /// Register a closure producing `T` from the request
    pub fn register_fn<T, F>(&mut self, f: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&dyn RequestContext) -> Option<T> + Send + Sync + 'static,
    {
        self.register::<T>(FnContextProvider {
            f,
            _marker: PhantomData::<fn() -> T>,
        })
    }

    /// Register a provider built from the injection container on lookup
    pub fn register_factory<T: 'static>(&mut self, factory: ProviderFactory) -> &mut Self {
        self.providers
            .insert(TypeKey::of::<T>(), ProviderEntry::Factory(factory));
        self
    }

    /// Build factory providers from `injection` now.
    ///
    /// A factory that yields nothing stays registered and is retried on lookup.
    pub fn resolve_factories(&mut self, injection: &Container) -> &mut Self {
        for (key, entry) in self.providers.iter_mut() {
            if let ProviderEntry::Factory(factory) = *entry
                && let Some(provider) = factory(injection)
            {
                debug!(context = key.name(), "Context provider instantiated");
                *entry = ProviderEntry::Instance(provider);
            }
        }
        self
    }

    pub fn get(&self, injection: &Container, key: &TypeKey) -> Option<Arc<dyn ContextProvider>> {
        let provider = match self.providers.get(key)? {
            ProviderEntry::Instance(provider) => Some(provider.clone()),
            ProviderEntry::Factory(factory) => factory(injection),
        };
        trace!(context = key.name(), found = provider.is_some(), "Context provider lookup");
        provider
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.providers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for ContextProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextProviderRegistry")
            .field("types", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Resolution of context values against the per-request cache.
pub struct ContextProviderFactory;

impl ContextProviderFactory {
    /// Cache key for `target`; only custom types are context-injectable
    pub fn context_key(target: &ValueType) -> Option<TypeKey> {
        target.key()
    }

    /// Final value of a context argument.
    ///
    /// The route definition is always available. Other types must already be
    /// in `cache`. A `String` target falls back to its default value; an
    /// optional target may stay empty.
    pub fn provide_context(
        definition: &RouteDefinition,
        target: &ValueType,
        default_value: Option<&str>,
        cache: &ContextCache,
    ) -> Result<Option<Value>, ContextError> {
        if let Some(key) = Self::context_key(target) {
            if key == TypeKey::of::<RouteDefinition>() {
                return Ok(Some(Arc::new(definition.clone())));
            }
            if let Some(value) = cache.get_value(&key) {
                return Ok(Some(value.clone()));
            }
        }

        if let (ValueType::String, Some(default_value)) = (target.inner(), default_value) {
            return Ok(Some(Arc::new(default_value.to_string())));
        }

        if matches!(target, ValueType::Optional(_)) {
            return Ok(None);
        }

        Err(ContextError::Unavailable(target.type_name()))
    }

    /// Make sure the context of type `key` is cached for this request.
    ///
    /// Returns whether a value is now available. A provider already
    /// resolved for this request is not invoked again.
    pub fn ensure_context(
        definition: &RouteDefinition,
        key: TypeKey,
        request: &dyn RequestContext,
        providers: &ContextProviderRegistry,
        injection: &Container,
        cache: &mut ContextCache,
    ) -> Result<bool, ContextError> {
        if cache.contains(&key) {
            return Ok(true);
        }
        if cache.attempted.contains(&key) {
            return Ok(false);
        }

        if key == TypeKey::of::<RouteDefinition>() {
            cache.insert(definition.clone());
            return Ok(true);
        }

        let Some(provider) = providers.get(injection, &key) else {
            return Ok(false);
        };

        cache.attempted.insert(key);
        match provider.provide(request)? {
            Some(value) => {
                debug!(context = key.name(), "Context resolved for request");
                cache.insert_value(key, value);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

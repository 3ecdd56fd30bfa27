//! Route compilation.
//!
//! [`RouteCompiler::compile`] turns a handler type into a [`RouteTable`]:
//! one [`RouteDefinition`] per method that carries a verb, in the order the
//! collector discovered the methods. Any invalid route aborts the whole
//! type; no partial table is returned.

use crate::collector::{self, CollectedMethod};
use crate::config::RestConfig;
use crate::definition::RouteDefinition;
use crate::handler::{HandlerMethod, HandlerType, Resource};
use crate::logging::{debug, info, trace, warn};
use crate::{Error, Result};
use std::sync::Arc;

/// A compiled endpoint and the method it invokes.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    definition: Arc<RouteDefinition>,
    method: Arc<HandlerMethod>,
}

impl CompiledRoute {
    pub fn definition(&self) -> &Arc<RouteDefinition> {
        &self.definition
    }

    pub fn method(&self) -> &Arc<HandlerMethod> {
        &self.method
    }
}

/// Routes of one handler type.
#[derive(Debug, Clone)]
pub struct RouteTable {
    owner: String,
    routes: Vec<CompiledRoute>,
}

impl RouteTable {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompiledRoute> {
        self.routes.iter()
    }

    pub fn find(&self, method_name: &str) -> Option<&CompiledRoute> {
        self.routes.iter().find(|r| r.method.name() == method_name)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &RouteDefinition> {
        self.routes.iter().map(|r| r.definition.as_ref())
    }
}

impl<'a> IntoIterator for &'a RouteTable {
    type Item = &'a CompiledRoute;
    type IntoIter = std::slice::Iter<'a, CompiledRoute>;

    fn into_iter(self) -> Self::IntoIter {
        self.routes.iter()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteCompiler {
    config: RestConfig,
}

impl RouteCompiler {
    pub fn new(config: RestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    pub fn compile(&self, ty: &HandlerType) -> Result<RouteTable> {
        let root = RouteDefinition::root(ty).map_err(|e| {
            let message = match e {
                Error::InvalidMetadata(message) => message,
                other => other.to_string(),
            };
            warn!(owner = ty.name(), error = %message, "Invalid type-level metadata");
            Error::InvalidMetadata(format!("{} - {}", ty.name(), message))
        })?;

        let mut routes = Vec::new();
        for collected in collector::collect(ty) {
            let name = collected.method.name();
            if !collected.metadata.is_route() {
                trace!(owner = ty.name(), method = name, "Skipping method without verb");
                continue;
            }

            let definition = self.compile_method(&root, &collected).map_err(|e| {
                let error = Error::compilation(ty.name(), name, e);
                warn!(error = %error, "Route compilation failed");
                error
            })?;

            debug!(
                owner = ty.name(),
                method = name,
                route = %definition,
                params = definition.parameters().len(),
                "Compiled route"
            );

            routes.push(CompiledRoute {
                definition: Arc::new(definition),
                method: collected.method.clone(),
            });
        }

        info!(owner = ty.name(), routes = routes.len(), "Compiled handler type");

        Ok(RouteTable {
            owner: ty.name().to_string(),
            routes,
        })
    }

    pub fn compile_resource<R: Resource>(&self) -> Result<RouteTable> {
        self.compile(&R::handler_type())
    }

    fn compile_method(&self, root: &RouteDefinition, collected: &CollectedMethod) -> Result<RouteDefinition> {
        let mut definition = RouteDefinition::merge(root, &collected.metadata)?;
        definition.set_arguments(
            &collected.method,
            &collected.params,
            self.config.strict_body_arguments,
        )?;

        let has_path = definition
            .route_path()
            .is_some_and(|path| !path.trim().is_empty());
        if !has_path {
            return Err(Error::InvalidMetadata("Missing route path!".to_string()));
        }

        definition.apply_defaults(&self.config);
        Ok(definition)
    }
}

/// Compile `ty` with the default configuration
pub fn compile(ty: &HandlerType) -> Result<RouteTable> {
    RouteCompiler::default().compile(ty)
}

pub fn compile_resource<R: Resource>() -> Result<RouteTable> {
    RouteCompiler::default().compile_resource::<R>()
}

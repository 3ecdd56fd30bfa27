//! Request argument binding.
//!
//! Once a dispatcher has matched a request to a [`RouteDefinition`], the
//! binder produces the handler method's arguments from it. Each bound
//! parameter goes through three steps: its raw value is extracted from the
//! request according to its source; a missing value is replaced by the
//! declared default; the result is converted by a value reader, or resolved
//! by a context provider for context parameters.
//!
//! Binding only reads shared state. Everything it writes lives in the
//! returned [`Arguments`] and the per-request [`ContextCache`].

use crate::container::Container;
use crate::compiler::RouteTable;
use crate::context::{ContextCache, ContextError, ContextProviderFactory, ContextProviderRegistry};
use crate::definition::RouteDefinition;
use crate::error::BindingError;
use crate::handler::HandlerMethod;
use crate::logging::{debug, trace, warn};
use crate::parameter::{MethodParameter, ParameterSource};
use crate::reader::{ReadError, ReaderRegistry, Value};
use crate::request::{RequestContext, parse_query};
use crate::types::ValueType;
use crate::{Error, Result};
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Bound arguments, one slot per formal parameter.
///
/// Optional parameters hold their inner value; absence is an empty slot.
#[derive(Clone, Default)]
pub struct Arguments {
    values: Vec<Option<Value>>,
}

impl Arguments {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_present(&self, index: usize) -> bool {
        self.value(index).is_some()
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(Option::as_ref)
    }

    pub fn get<T: Any>(&self, index: usize) -> Option<&T> {
        self.value(index).and_then(|value| value.downcast_ref::<T>())
    }

    pub fn get_arc<T: Any + Send + Sync>(&self, index: usize) -> Option<Arc<T>> {
        self.value(index).and_then(|value| value.clone().downcast::<T>().ok())
    }

    pub fn into_values(self) -> Vec<Option<Value>> {
        self.values
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.values.iter().map(|v| if v.is_some() { "Some(..)" } else { "None" }))
            .finish()
    }
}

/// Bind the arguments of `method` for a request matched to `definition`.
///
/// Returns `Ok(None)` for methods without parameters. Context values are
/// resolved into a cache private to this call.
pub fn bind(
    method: &HandlerMethod,
    definition: &RouteDefinition,
    request: &dyn RequestContext,
    readers: &ReaderRegistry,
    providers: &ContextProviderRegistry,
    injection: &Container,
) -> Result<Option<Arguments>> {
    let mut cache = ContextCache::new();
    bind_with_cache(method, definition, request, readers, providers, injection, &mut cache)
}

/// Like [`bind`], resolving context values into `cache`.
///
/// Pass the same cache to every bind of one request, and to no other request.
pub fn bind_with_cache(
    method: &HandlerMethod,
    definition: &RouteDefinition,
    request: &dyn RequestContext,
    readers: &ReaderRegistry,
    providers: &ContextProviderRegistry,
    injection: &Container,
    cache: &mut ContextCache,
) -> Result<Option<Arguments>> {
    if let Some(name) = definition.method_name()
        && name != method.name()
    {
        return Err(Error::InvalidInput(format!(
            "Route definition of {}.{}() can't bind arguments of {}()",
            definition.owner(),
            name,
            method.name()
        )));
    }

    let formals = method.params();
    if formals.is_empty() {
        return Ok(None);
    }

    let binding = Binding {
        method,
        definition,
        request,
        readers,
        providers,
        injection,
    };

    let mut values: Vec<Option<Value>> = vec![None; formals.len()];
    for parameter in definition.parameters() {
        if !parameter.is_used_as_argument() {
            continue;
        }
        let Some(index) = parameter.index() else {
            continue;
        };
        if index >= values.len() {
            warn!(
                owner = definition.owner(),
                method = method.name(),
                parameter = %parameter,
                "Parameter index out of range, ignored"
            );
            continue;
        }

        values[index] = binding.bind_parameter(parameter, index, cache).inspect_err(|e| {
            debug!(error = %e, "Argument binding failed");
        })?;
    }

    for (index, formal) in formals.iter().enumerate() {
        if values[index].is_none() && formal.value_type().is_primitive() {
            let error = binding.missing(index);
            debug!(error = %error, "Required argument missing");
            return Err(error.into());
        }
    }

    Ok(Some(Arguments { values }))
}

/// Registries and container, shared across threads.
#[derive(Clone, Default)]
pub struct ArgumentBinder {
    readers: Arc<ReaderRegistry>,
    providers: Arc<ContextProviderRegistry>,
    injection: Container,
}

impl ArgumentBinder {
    pub fn new(readers: ReaderRegistry, providers: ContextProviderRegistry, injection: Container) -> Self {
        Self {
            readers: Arc::new(readers),
            providers: Arc::new(providers),
            injection,
        }
    }

    /// Resolve the reader overrides and factory providers of `table` up front.
    ///
    /// Call at bootstrap, before cloning the binder out to request handlers.
    /// Binding the prepared routes then never locks the injection container.
    pub fn prepare(&mut self, table: &RouteTable) -> &mut Self {
        let readers = Arc::make_mut(&mut self.readers);
        for definition in table.definitions() {
            readers.preload(&self.injection, definition);
        }
        Arc::make_mut(&mut self.providers).resolve_factories(&self.injection);
        debug!(owner = table.owner(), routes = table.len(), "Argument binder prepared");
        self
    }

    pub fn readers(&self) -> &ReaderRegistry {
        &self.readers
    }

    pub fn providers(&self) -> &ContextProviderRegistry {
        &self.providers
    }

    pub fn injection(&self) -> &Container {
        &self.injection
    }

    pub fn bind(
        &self,
        method: &HandlerMethod,
        definition: &RouteDefinition,
        request: &dyn RequestContext,
    ) -> Result<Option<Arguments>> {
        bind(method, definition, request, &self.readers, &self.providers, &self.injection)
    }

    pub fn bind_with_cache(
        &self,
        method: &HandlerMethod,
        definition: &RouteDefinition,
        request: &dyn RequestContext,
        cache: &mut ContextCache,
    ) -> Result<Option<Arguments>> {
        bind_with_cache(
            method,
            definition,
            request,
            &self.readers,
            &self.providers,
            &self.injection,
            cache,
        )
    }
}

impl fmt::Debug for ArgumentBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentBinder")
            .field("readers", &self.readers)
            .field("providers", &self.providers)
            .field("injection", &self.injection)
            .finish()
    }
}

enum Failure {
    Context(ContextError),
    Read(ReadError),
}

struct Binding<'a> {
    method: &'a HandlerMethod,
    definition: &'a RouteDefinition,
    request: &'a dyn RequestContext,
    readers: &'a ReaderRegistry,
    providers: &'a ContextProviderRegistry,
    injection: &'a Container,
}

impl Binding<'_> {
    fn bind_parameter(
        &self,
        parameter: &MethodParameter,
        index: usize,
        cache: &mut ContextCache,
    ) -> std::result::Result<Option<Value>, BindingError> {
        let raw = extract(self.definition, parameter, self.request);
        let value = raw.or_else(|| parameter.default_value().map(str::to_string));

        let formal_type = self.method.params()[index].value_type();
        let data_type = parameter.data_type().unwrap_or(formal_type);

        trace!(
            parameter = %parameter,
            index,
            present = value.is_some(),
            target = %data_type,
            "Binding argument"
        );

        let result = match parameter.source() {
            ParameterSource::Context => self
                .resolve_context(parameter, data_type, cache)
                .map_err(Failure::Context),
            _ => self.read(parameter, value.as_deref(), data_type, cache),
        };

        result.map_err(|failure| match failure {
            Failure::Context(e) => self.context_error(index, e),
            Failure::Read(e) => self.conversion_error(index, value.as_deref(), e),
        })
    }

    fn resolve_context(
        &self,
        parameter: &MethodParameter,
        data_type: &ValueType,
        cache: &mut ContextCache,
    ) -> std::result::Result<Option<Value>, ContextError> {
        if let Some(key) = ContextProviderFactory::context_key(data_type) {
            ContextProviderFactory::ensure_context(
                self.definition,
                key,
                self.request,
                self.providers,
                self.injection,
                cache,
            )?;
        }

        ContextProviderFactory::provide_context(
            self.definition,
            data_type,
            parameter.default_value(),
            cache,
        )
    }

    fn read(
        &self,
        parameter: &MethodParameter,
        value: Option<&str>,
        data_type: &ValueType,
        cache: &mut ContextCache,
    ) -> std::result::Result<Option<Value>, Failure> {
        let consumes = if parameter.is_body() {
            self.definition.consumes()
        } else {
            None
        };
        let reader = self
            .readers
            .get(self.injection, parameter, parameter.reader(), consumes);

        for key in reader.required_context() {
            let found = ContextProviderFactory::ensure_context(
                self.definition,
                key,
                self.request,
                self.providers,
                self.injection,
                cache,
            )
            .map_err(Failure::Context)?;
            if !found {
                return Err(Failure::Context(ContextError::Unavailable(key.to_string())));
            }
        }

        reader.read(value, data_type, cache).map_err(Failure::Read)
    }

    fn path(&self) -> &str {
        self.definition.path().unwrap_or_default()
    }

    fn error(&self, index: usize, message: String) -> BindingError {
        BindingError::new(
            self.definition.owner(),
            self.method.name(),
            index + 1,
            self.path(),
            message,
        )
    }

    fn conversion_error(&self, index: usize, value: Option<&str>, cause: ReadError) -> BindingError {
        let expected = self.method.params()[index].value_type().type_name();
        let received = if value.is_some() { "String" } else { "None" };

        let mut message = match self.definition.find_parameter(index) {
            Some(parameter) => format!(
                "Invalid parameter type for: {} for: {}, expected: {}",
                parameter,
                self.path(),
                expected
            ),
            None => format!("Invalid parameter type for {} argument, expected: {}", index + 1, expected),
        };
        if expected != received {
            message.push_str(&format!(", but got: {}", received));
        }
        message.push_str(&format!(" -> {}", cause));

        self.error(index, message)
    }

    fn context_error(&self, index: usize, cause: ContextError) -> BindingError {
        let message = match self.definition.find_parameter(index) {
            Some(parameter) => format!("{} for: {} for: {}", cause, parameter, self.path()),
            None => format!("{} for: {} argument", cause, index + 1),
        };
        self.error(index, message)
    }

    fn missing(&self, index: usize) -> BindingError {
        let message = match self.definition.find_parameter(index) {
            Some(parameter) => format!("Missing {} for: {}", parameter, self.path()),
            None => format!(
                "Missing {} argument, expected: {}, but: None was provided!",
                index + 1,
                self.method.params()[index].value_type()
            ),
        };
        self.error(index, message)
    }
}

/// Raw value of `parameter` from the request
fn extract(
    definition: &RouteDefinition,
    parameter: &MethodParameter,
    request: &dyn RequestContext,
) -> Option<String> {
    let name = parameter.name();
    match parameter.source() {
        ParameterSource::Path => path_value(definition, parameter, request),
        ParameterSource::Query => parse_query(request.query()?).remove(name?),
        ParameterSource::Header => request.header(name?).map(str::to_string),
        ParameterSource::Cookie => request.cookie(name?),
        ParameterSource::Form => request.form_attribute(name?),
        ParameterSource::Matrix => matrix_value(request.uri(), name?),
        ParameterSource::Body => request.body_as_string().map(Cow::into_owned),
        ParameterSource::Context | ParameterSource::Unknown => None,
    }
}

fn path_value(
    definition: &RouteDefinition,
    parameter: &MethodParameter,
    request: &dyn RequestContext,
) -> Option<String> {
    let value = if definition.path_is_regex() {
        regex_path_value(request, parameter.path_index()?)
    } else {
        request.path_param(parameter.name()?).map(str::to_string)
    }?;

    if definition.has_matrix_params() {
        return Some(strip_matrix(value));
    }
    Some(value)
}

/// Regex routes capture parameters as `param{index}`. When the dispatcher
/// exposes no such capture the value is taken from the request path by
/// segment position.
fn regex_path_value(request: &dyn RequestContext, path_index: usize) -> Option<String> {
    if let Some(value) = request.path_param(&format!("param{}", path_index)) {
        return Some(value.to_string());
    }

    let path = request.path();
    let path = match request.mount_point().map(str::trim).filter(|m| !m.is_empty()) {
        Some(mount_point) => path.strip_prefix(mount_point).unwrap_or(path),
        None => path,
    };

    path.split('/')
        .filter(|segment| !segment.is_empty())
        .nth(path_index)
        .map(str::to_string)
}

/// `42;lang=en` -> `42`
fn strip_matrix(mut value: String) -> String {
    if let Some(index) = value.find(';')
        && index > 0
    {
        value.truncate(index);
    }
    value
}

/// Finds `;name=value` in the URI, ignoring the query string
fn matrix_value(uri: &str, name: &str) -> Option<String> {
    let uri = uri.split('?').next().unwrap_or(uri);
    uri.split(';').find_map(|item| {
        let parts: Vec<&str> = item.split('=').collect();
        match parts.as_slice() {
            [key, value] if *key == name => Some(
                urlencoding::decode(value)
                    .map(Cow::into_owned)
                    .unwrap_or_else(|_| value.to_string()),
            ),
            _ => None,
        }
    })
}

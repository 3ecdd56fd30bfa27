//! Value readers: conversion of raw request strings into typed values.
//!
//! Readers are strategies. A route or parameter may name one through a
//! [`ReaderRef`]; otherwise the [`ReaderRegistry`] picks one by the
//! parameter's data type, then by the consumed media type for bodies, and
//! falls back to [`GenericValueReader`].

use crate::container::Container;
use crate::context::{ContextCache, ContextError};
use crate::definition::RouteDefinition;
use crate::logging::{debug, trace};
use crate::parameter::MethodParameter;
use crate::request::parse_form_map;
use crate::types::{TypeKey, ValueType};
use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// An untyped, shareable argument value.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Failure of a single conversion.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Failed to convert '{value}' to {target}: {reason}")]
    Parse {
        value: String,
        target: String,
        reason: String,
    },

    #[error("Unsupported target type: {0}")]
    Unsupported(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Form error: {0}")]
    Form(#[from] serde_urlencoded::de::Error),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("{0}")]
    Custom(String),
}

/// Converts a raw value into `target`.
///
/// `Ok(None)` means "no value"; the binder leaves the argument slot empty.
pub trait ValueReader: Send + Sync {
    fn read(
        &self,
        value: Option<&str>,
        target: &ValueType,
        context: &ContextCache,
    ) -> Result<Option<Value>, ReadError>;

    /// Context types this reader expects in the cache before `read` is called
    fn required_context(&self) -> Vec<TypeKey> {
        Vec::new()
    }
}

fn parse<T>(value: &str, target: &ValueType) -> Result<Value, ReadError>
where
    T: FromStr + Send + Sync + 'static,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map(|parsed| Arc::new(parsed) as Value)
        .map_err(|e| ReadError::Parse {
            value: value.to_string(),
            target: target.type_name(),
            reason: e.to_string(),
        })
}

/// Convert `value` into any non-custom target type.
pub fn read_scalar(value: &str, target: &ValueType) -> Result<Value, ReadError> {
    match target {
        ValueType::Bool => parse::<bool>(value, target),
        ValueType::Char => parse::<char>(value, target),
        ValueType::I8 => parse::<i8>(value, target),
        ValueType::I16 => parse::<i16>(value, target),
        ValueType::I32 => parse::<i32>(value, target),
        ValueType::I64 => parse::<i64>(value, target),
        ValueType::U8 => parse::<u8>(value, target),
        ValueType::U16 => parse::<u16>(value, target),
        ValueType::U32 => parse::<u32>(value, target),
        ValueType::U64 => parse::<u64>(value, target),
        ValueType::F32 => parse::<f32>(value, target),
        ValueType::F64 => parse::<f64>(value, target),
        ValueType::String => Ok(Arc::new(value.to_string())),
        ValueType::Optional(inner) => read_scalar(value, inner),
        ValueType::Json => Ok(Arc::new(serde_json::from_str::<serde_json::Value>(value)?)),
        ValueType::Map => Ok(Arc::new(parse_form_map(value.as_bytes())?)),
        ValueType::Custom(key) => Err(ReadError::Unsupported(key.name().to_string())),
    }
}

/// Reads plain text into scalars, strings, JSON values and form maps.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericValueReader;

impl ValueReader for GenericValueReader {
    fn read(
        &self,
        value: Option<&str>,
        target: &ValueType,
        _context: &ContextCache,
    ) -> Result<Option<Value>, ReadError> {
        value.map(|value| read_scalar(value, target)).transpose()
    }
}

/// Reads JSON documents.
///
/// String targets receive the raw text; scalar targets are parsed as text.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonValueReader;

impl ValueReader for JsonValueReader {
    fn read(
        &self,
        value: Option<&str>,
        target: &ValueType,
        _context: &ContextCache,
    ) -> Result<Option<Value>, ReadError> {
        let Some(value) = value else {
            return Ok(None);
        };

        match target.inner() {
            ValueType::Json => Ok(Some(Arc::new(serde_json::from_str::<serde_json::Value>(value)?))),
            ValueType::Map => {
                let map: HashMap<String, String> = serde_json::from_str(value)?;
                Ok(Some(Arc::new(map)))
            }
            ValueType::Custom(key) => Err(ReadError::Unsupported(format!(
                "{} (register a typed JSON reader for it)",
                key.name()
            ))),
            scalar => read_scalar(value, scalar).map(Some),
        }
    }
}

/// Deserializes JSON into `T`.
pub struct JsonReader<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonReader<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonReader<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonReader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsonReader<{}>", std::any::type_name::<T>())
    }
}

impl<T: DeserializeOwned + Send + Sync + 'static> ValueReader for JsonReader<T> {
    fn read(
        &self,
        value: Option<&str>,
        _target: &ValueType,
        _context: &ContextCache,
    ) -> Result<Option<Value>, ReadError> {
        let Some(value) = value else {
            return Ok(None);
        };
        let parsed: T = serde_json::from_str(value)?;
        Ok(Some(Arc::new(parsed)))
    }
}

/// Reads `application/x-www-form-urlencoded` bodies.
#[derive(Debug, Default, Clone, Copy)]
pub struct FormValueReader;

impl ValueReader for FormValueReader {
    fn read(
        &self,
        value: Option<&str>,
        target: &ValueType,
        _context: &ContextCache,
    ) -> Result<Option<Value>, ReadError> {
        let Some(value) = value else {
            return Ok(None);
        };

        match target.inner() {
            ValueType::Map => Ok(Some(Arc::new(parse_form_map(value.as_bytes())?))),
            ValueType::Custom(key) => Err(ReadError::Unsupported(format!(
                "{} (register a typed reader for it)",
                key.name()
            ))),
            other => read_scalar(value, other).map(Some),
        }
    }
}

/// Reference to a reader type.
///
/// The reader is resolved from the injection container when registered
/// there, else built with `Default`.
#[derive(Clone, Copy)]
pub struct ReaderRef {
    key: TypeKey,
    factory: fn(&Container) -> Arc<dyn ValueReader>,
}

fn instantiate<R: ValueReader + Default + 'static>(container: &Container) -> Arc<dyn ValueReader> {
    match container.resolve::<R>() {
        Ok(reader) => reader as Arc<dyn ValueReader>,
        Err(_) => Arc::new(R::default()),
    }
}

impl ReaderRef {
    pub fn of<R: ValueReader + Default + 'static>() -> Self {
        Self {
            key: TypeKey::of::<R>(),
            factory: instantiate::<R>,
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn type_name(&self) -> &'static str {
        self.key.name()
    }

    pub fn instantiate(&self, container: &Container) -> Arc<dyn ValueReader> {
        (self.factory)(container)
    }
}

impl PartialEq for ReaderRef {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ReaderRef {}

impl fmt::Debug for ReaderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReaderRef({})", self.key.name())
    }
}

/// Strip parameters and case from a media type (`Text/Plain; charset=utf-8` -> `text/plain`)
fn normalize_media_type(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Lookup of value readers.
#[derive(Clone)]
pub struct ReaderRegistry {
    generic: Arc<dyn ValueReader>,
    /// Reader instances by reader type, used for overrides
    instances: HashMap<TypeKey, Arc<dyn ValueReader>>,
    /// Readers by the type they produce
    by_type: HashMap<TypeKey, Arc<dyn ValueReader>>,
    by_media_type: HashMap<String, Arc<dyn ValueReader>>,
}

impl ReaderRegistry {
    /// Registry with the JSON, form and plain text readers
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry
            .register_media_type("application/json", Arc::new(JsonValueReader))
            .register_media_type("application/x-www-form-urlencoded", Arc::new(FormValueReader))
            .register_media_type("text/plain", Arc::new(GenericValueReader));
        registry
    }

    /// Registry holding only the generic reader
    pub fn empty() -> Self {
        Self {
            generic: Arc::new(GenericValueReader),
            instances: HashMap::new(),
            by_type: HashMap::new(),
            by_media_type: HashMap::new(),
        }
    }

    /// Register a configured reader instance; overrides naming its type use it
    pub fn register<R: ValueReader + 'static>(&mut self, reader: R) -> &mut Self {
        self.instances.insert(TypeKey::of::<R>(), Arc::new(reader));
        self
    }

    /// Read parameters of type `T` as JSON
    pub fn register_type<T: DeserializeOwned + Send + Sync + 'static>(&mut self) -> &mut Self {
        self.register_for_type(TypeKey::of::<T>(), Arc::new(JsonReader::<T>::new()))
    }

    pub fn register_for_type(&mut self, key: TypeKey, reader: Arc<dyn ValueReader>) -> &mut Self {
        self.by_type.insert(key, reader);
        self
    }

    pub fn register_media_type(&mut self, media_type: &str, reader: Arc<dyn ValueReader>) -> &mut Self {
        self.by_media_type.insert(normalize_media_type(media_type), reader);
        self
    }

    /// Replace the fallback reader
    pub fn set_generic(&mut self, reader: Arc<dyn ValueReader>) -> &mut Self {
        self.generic = reader;
        self
    }

    /// Instantiate the reader overrides of `definition` from `injection`.
    ///
    /// Overrides already held as instances are kept. Afterwards [`get`](Self::get)
    /// serves these overrides without touching the container.
    pub fn preload(&mut self, injection: &Container, definition: &RouteDefinition) -> &mut Self {
        for reader_ref in definition.parameters().iter().filter_map(MethodParameter::reader) {
            self.instances.entry(reader_ref.key()).or_insert_with(|| {
                debug!(reader = reader_ref.type_name(), "Reader override instantiated");
                reader_ref.instantiate(injection)
            });
        }
        self
    }

    /// Reader for `parameter`.
    ///
    /// `consumes` is only given for body parameters.
    pub fn get(
        &self,
        injection: &Container,
        parameter: &MethodParameter,
        reader_override: Option<&ReaderRef>,
        consumes: Option<&[String]>,
    ) -> Arc<dyn ValueReader> {
        if let Some(reader_ref) = reader_override {
            trace!(reader = reader_ref.type_name(), parameter = %parameter, "Using reader override");
            return match self.instances.get(&reader_ref.key()) {
                Some(reader) => reader.clone(),
                None => reader_ref.instantiate(injection),
            };
        }

        if let Some(reader) = parameter
            .data_type()
            .and_then(ValueType::key)
            .and_then(|key| self.by_type.get(&key))
        {
            trace!(parameter = %parameter, "Using reader registered for data type");
            return reader.clone();
        }

        if let Some(consumes) = consumes {
            let by_media_type = consumes
                .iter()
                .find_map(|media_type| self.by_media_type.get(&normalize_media_type(media_type)));
            if let Some(reader) = by_media_type {
                trace!(parameter = %parameter, "Using reader registered for media type");
                return reader.clone();
            }
        }

        self.generic.clone()
    }
}

impl Default for ReaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderRegistry")
            .field("instances", &self.instances.len())
            .field("types", &self.by_type.len())
            .field("media_types", &self.by_media_type.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::ParameterSource;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        name: String,
        age: u32,
    }

    #[derive(Default)]
    struct UpperReader;

    impl ValueReader for UpperReader {
        fn read(
            &self,
            value: Option<&str>,
            _target: &ValueType,
            _context: &ContextCache,
        ) -> Result<Option<Value>, ReadError> {
            Ok(value.map(|v| Arc::new(v.to_uppercase()) as Value))
        }
    }

    fn read(reader: &dyn ValueReader, value: &str, target: ValueType) -> Result<Option<Value>, ReadError> {
        reader.read(Some(value), &target, &ContextCache::new())
    }

    fn body_param(data_type: ValueType) -> MethodParameter {
        let mut param = MethodParameter::new(ParameterSource::Body, Some("body".into()));
        param.argument(data_type, 0);
        param
    }

    #[test]
    fn test_generic_scalars() {
        let value = read(&GenericValueReader, " 42 ", ValueType::I32).unwrap().unwrap();
        assert_eq!(value.downcast_ref::<i32>(), Some(&42));

        let value = read(&GenericValueReader, "true", ValueType::optional(ValueType::Bool))
            .unwrap()
            .unwrap();
        assert_eq!(value.downcast_ref::<bool>(), Some(&true));

        let error = read(&GenericValueReader, "abc", ValueType::U8).unwrap_err();
        assert!(error.to_string().starts_with("Failed to convert 'abc' to u8"));
    }

    #[test]
    fn test_generic_absent_value() {
        let result = GenericValueReader
            .read(None, &ValueType::I32, &ContextCache::new())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_generic_rejects_custom() {
        let result = read(&GenericValueReader, "{}", ValueType::custom::<User>());
        assert!(matches!(result, Err(ReadError::Unsupported(_))));
    }

    #[test]
    fn test_json_reader() {
        let value = read(&JsonValueReader, r#"{"a":1}"#, ValueType::Json).unwrap().unwrap();
        assert_eq!(
            value.downcast_ref::<serde_json::Value>(),
            Some(&serde_json::json!({"a": 1}))
        );

        let value = read(&JsonValueReader, "plain", ValueType::String).unwrap().unwrap();
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("plain"));
    }

    #[test]
    fn test_typed_json_reader() {
        let reader = JsonReader::<User>::new();
        let value = read(&reader, r#"{"name":"ann","age":31}"#, ValueType::custom::<User>())
            .unwrap()
            .unwrap();
        assert_eq!(
            value.downcast_ref::<User>(),
            Some(&User {
                name: "ann".into(),
                age: 31
            })
        );
        assert!(read(&reader, "{", ValueType::custom::<User>()).is_err());
    }

    #[test]
    fn test_form_reader() {
        let value = read(&FormValueReader, "a=1&b=two%20words", ValueType::Map)
            .unwrap()
            .unwrap();
        let map = value.downcast_ref::<HashMap<String, String>>().unwrap();
        assert_eq!(map.get("b").map(String::as_str), Some("two words"));
    }

    #[test]
    fn test_form_reader_rejects_custom_target() {
        let result = read(&FormValueReader, "name=ann&age=3", ValueType::custom::<User>());
        assert!(matches!(result, Err(ReadError::Unsupported(_))));

        let value = read(&FormValueReader, "7", ValueType::U32).unwrap().unwrap();
        assert_eq!(value.downcast_ref::<u32>(), Some(&7));
    }

    #[test]
    fn test_registry_override_first() {
        let registry = ReaderRegistry::new();
        let param = body_param(ValueType::String);
        let reader_ref = ReaderRef::of::<UpperReader>();

        let reader = registry.get(&Container::new(), &param, Some(&reader_ref), None);
        let value = read(reader.as_ref(), "abc", ValueType::String).unwrap().unwrap();
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("ABC"));
    }

    #[test]
    fn test_registry_type_before_media_type() {
        let mut registry = ReaderRegistry::new();
        registry.register_type::<User>();

        let param = body_param(ValueType::custom::<User>());
        let consumes = vec!["application/json".to_string()];
        let reader = registry.get(&Container::new(), &param, None, Some(&consumes));

        let value = read(reader.as_ref(), r#"{"name":"bo","age":2}"#, ValueType::custom::<User>())
            .unwrap()
            .unwrap();
        assert!(value.downcast_ref::<User>().is_some());
    }

    #[test]
    fn test_registry_media_type_ignores_parameters() {
        let registry = ReaderRegistry::new();
        let param = body_param(ValueType::Map);
        let consumes = vec!["Application/x-www-form-urlencoded; charset=UTF-8".to_string()];
        let reader = registry.get(&Container::new(), &param, None, Some(&consumes));

        let value = read(reader.as_ref(), "k=v", ValueType::Map).unwrap().unwrap();
        assert!(value.downcast_ref::<HashMap<String, String>>().is_some());
    }

    #[test]
    fn test_preload_keeps_registered_instance() {
        let ty = crate::handler::HandlerType::class("Keys").path("/keys").method(
            crate::handler::HandlerMethod::new("find").get().path("/{key}").param(
                crate::handler::FormalParam::new("key", ValueType::String)
                    .path("key")
                    .reader::<UpperReader>(),
            ),
        );
        let table = crate::compiler::compile(&ty).unwrap();
        let definition = table.find("find").unwrap().definition();

        let mut registry = ReaderRegistry::new();
        assert_eq!(registry.instances.len(), 0);
        registry.preload(&Container::new(), definition);
        assert!(registry.instances.contains_key(&TypeKey::of::<UpperReader>()));

        registry.register(GenericValueReader);
        registry.preload(&Container::new(), definition);
        assert_eq!(registry.instances.len(), 2);
    }

    #[test]
    fn test_reader_ref_equality() {
        assert_eq!(ReaderRef::of::<UpperReader>(), ReaderRef::of::<UpperReader>());
        assert_ne!(ReaderRef::of::<UpperReader>(), ReaderRef::of::<GenericValueReader>());
    }
}

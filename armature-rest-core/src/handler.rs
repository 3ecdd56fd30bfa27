//! Explicit descriptors of handler types.
//!
//! Handler types register their metadata once, at construction, instead of
//! having it discovered by reflection. A descriptor lists the type-level
//! metadata, the declared methods and the types it inherits from, in the
//! order they should be searched: the type itself, its interfaces, then its
//! superclass.
//!
//! ```
//! use armature_rest_core::handler::*;
//! use armature_rest_core::types::ValueType;
//!
//! let api = HandlerType::interface("EchoApi")
//!     .path("/echo")
//!     .method(
//!         HandlerMethod::new("echo")
//!             .get()
//!             .param(FormalParam::new("name", ValueType::String).query("name")),
//!     );
//!
//! let resource = HandlerType::class("EchoResource")
//!     .implements(api)
//!     .method(HandlerMethod::new("echo").param(FormalParam::new("name", ValueType::String)));
//!
//! assert_eq!(resource.interfaces().len(), 1);
//! ```

use crate::http::HttpMethod;
use crate::metadata::{Metadata, ParamMetadata, SourceMetadata, StrategyRef};
use crate::reader::{ReaderRef, ValueReader};
use crate::types::ValueType;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
}

/// A formal parameter of a handler method.
#[derive(Debug, Clone)]
pub struct FormalParam {
    name: String,
    value_type: ValueType,
    metadata: Vec<ParamMetadata>,
}

impl FormalParam {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            metadata: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn metadata(&self) -> &[ParamMetadata] {
        &self.metadata
    }

    pub fn with_metadata(mut self, item: ParamMetadata) -> Self {
        self.metadata.push(item);
        self
    }

    pub fn path(self, name: impl Into<String>) -> Self {
        self.with_metadata(ParamMetadata::Source(SourceMetadata::Path(name.into())))
    }

    pub fn query(self, name: impl Into<String>) -> Self {
        self.with_metadata(ParamMetadata::Source(SourceMetadata::Query(name.into())))
    }

    pub fn header(self, name: impl Into<String>) -> Self {
        self.with_metadata(ParamMetadata::Source(SourceMetadata::Header(name.into())))
    }

    pub fn cookie(self, name: impl Into<String>) -> Self {
        self.with_metadata(ParamMetadata::Source(SourceMetadata::Cookie(name.into())))
    }

    pub fn form(self, name: impl Into<String>) -> Self {
        self.with_metadata(ParamMetadata::Source(SourceMetadata::Form(name.into())))
    }

    pub fn matrix(self, name: impl Into<String>) -> Self {
        self.with_metadata(ParamMetadata::Source(SourceMetadata::Matrix(name.into())))
    }

    pub fn context(self) -> Self {
        self.with_metadata(ParamMetadata::Source(SourceMetadata::Context))
    }

    pub fn body(self) -> Self {
        self.with_metadata(ParamMetadata::Source(SourceMetadata::Body))
    }

    pub fn default_value(self, value: impl Into<String>) -> Self {
        self.with_metadata(ParamMetadata::Default(value.into()))
    }

    pub fn reader<R: ValueReader + Default + 'static>(self) -> Self {
        self.with_metadata(ParamMetadata::Reader(ReaderRef::of::<R>()))
    }

    /// Convert into `value_type` instead of the declared type
    pub fn data_type(self, value_type: ValueType) -> Self {
        self.with_metadata(ParamMetadata::DataType(value_type))
    }
}

/// A method of a handler type.
#[derive(Debug, Clone)]
pub struct HandlerMethod {
    name: String,
    params: Vec<FormalParam>,
    metadata: Vec<Metadata>,
}

impl HandlerMethod {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            metadata: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[FormalParam] {
        &self.params
    }

    pub fn metadata(&self) -> &[Metadata] {
        &self.metadata
    }

    pub fn param(mut self, param: FormalParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_metadata(mut self, item: Metadata) -> Self {
        self.metadata.push(item);
        self
    }

    pub fn http_method(self, method: HttpMethod) -> Self {
        self.with_metadata(Metadata::Method(method))
    }

    pub fn get(self) -> Self {
        self.http_method(HttpMethod::GET)
    }

    pub fn post(self) -> Self {
        self.http_method(HttpMethod::POST)
    }

    pub fn put(self) -> Self {
        self.http_method(HttpMethod::PUT)
    }

    pub fn delete(self) -> Self {
        self.http_method(HttpMethod::DELETE)
    }

    pub fn patch(self) -> Self {
        self.http_method(HttpMethod::PATCH)
    }

    pub fn head(self) -> Self {
        self.http_method(HttpMethod::HEAD)
    }

    pub fn options(self) -> Self {
        self.http_method(HttpMethod::OPTIONS)
    }

    pub fn trace(self) -> Self {
        self.http_method(HttpMethod::TRACE)
    }

    pub fn connect(self) -> Self {
        self.http_method(HttpMethod::CONNECT)
    }

    pub fn path(self, path: impl Into<String>) -> Self {
        self.with_metadata(Metadata::Path(path.into()))
    }

    pub fn consumes<S: Into<String>>(self, types: impl IntoIterator<Item = S>) -> Self {
        self.with_metadata(Metadata::Consumes(types.into_iter().map(Into::into).collect()))
    }

    pub fn produces<S: Into<String>>(self, types: impl IntoIterator<Item = S>) -> Self {
        self.with_metadata(Metadata::Produces(types.into_iter().map(Into::into).collect()))
    }

    pub fn catch_with(self, handlers: Vec<StrategyRef>) -> Self {
        self.with_metadata(Metadata::CatchWith(handlers))
    }

    pub fn reader<R: ValueReader + Default + 'static>(self) -> Self {
        self.with_metadata(Metadata::RequestReader(ReaderRef::of::<R>()))
    }

    pub fn writer<W: 'static>(self) -> Self {
        self.with_metadata(Metadata::ResponseWriter(StrategyRef::of::<W>()))
    }

    pub fn order(self, order: i32) -> Self {
        self.with_metadata(Metadata::Order(order))
    }

    pub fn suppress_check(self) -> Self {
        self.with_metadata(Metadata::SuppressCheck)
    }
}

/// Descriptor of a handler type and everything it inherits from.
#[derive(Debug, Clone)]
pub struct HandlerType {
    name: String,
    kind: TypeKind,
    metadata: Vec<Metadata>,
    methods: Vec<Arc<HandlerMethod>>,
    interfaces: Vec<Arc<HandlerType>>,
    superclass: Option<Arc<HandlerType>>,
}

impl HandlerType {
    fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            metadata: Vec::new(),
            methods: Vec::new(),
            interfaces: Vec::new(),
            superclass: None,
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Class)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Type-level metadata
    pub fn metadata(&self) -> &[Metadata] {
        &self.metadata
    }

    /// Methods declared directly on this type
    pub fn methods(&self) -> &[Arc<HandlerMethod>] {
        &self.methods
    }

    pub fn interfaces(&self) -> &[Arc<HandlerType>] {
        &self.interfaces
    }

    pub fn superclass(&self) -> Option<&Arc<HandlerType>> {
        self.superclass.as_ref()
    }

    pub fn has_path(&self) -> bool {
        self.metadata.iter().any(|m| matches!(m, Metadata::Path(_)))
    }

    pub fn with_metadata(mut self, item: Metadata) -> Self {
        self.metadata.push(item);
        self
    }

    pub fn path(self, path: impl Into<String>) -> Self {
        self.with_metadata(Metadata::Path(path.into()))
    }

    pub fn consumes<S: Into<String>>(self, types: impl IntoIterator<Item = S>) -> Self {
        self.with_metadata(Metadata::Consumes(types.into_iter().map(Into::into).collect()))
    }

    pub fn produces<S: Into<String>>(self, types: impl IntoIterator<Item = S>) -> Self {
        self.with_metadata(Metadata::Produces(types.into_iter().map(Into::into).collect()))
    }

    pub fn catch_with(self, handlers: Vec<StrategyRef>) -> Self {
        self.with_metadata(Metadata::CatchWith(handlers))
    }

    pub fn reader<R: ValueReader + Default + 'static>(self) -> Self {
        self.with_metadata(Metadata::RequestReader(ReaderRef::of::<R>()))
    }

    pub fn writer<W: 'static>(self) -> Self {
        self.with_metadata(Metadata::ResponseWriter(StrategyRef::of::<W>()))
    }

    pub fn method(mut self, method: HandlerMethod) -> Self {
        self.methods.push(Arc::new(method));
        self
    }

    pub fn implements(mut self, interface: impl Into<Arc<HandlerType>>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn extends(mut self, superclass: impl Into<Arc<HandlerType>>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }
}

/// Implemented by application types that expose routes.
pub trait Resource: 'static {
    fn handler_type() -> HandlerType;
}

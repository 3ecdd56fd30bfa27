//! Declarative facts attached to handler types, methods and parameters.
//!
//! A [`Metadata`] item is the unit the collector gathers while walking a
//! handler hierarchy. Items are keyed by [`MetadataKind`]; a method never
//! ends up with two items of the same kind, see [`MetadataSet`].

use crate::http::HttpMethod;
use crate::reader::ReaderRef;
use crate::types::{TypeKey, ValueType};
use smallvec::SmallVec;
use std::fmt;

/// Kinds of metadata the collector recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKind {
    Path,
    HttpMethod,
    Consumes,
    Produces,
    ErrorHandler,
    RequestReader,
    ResponseWriter,
    Order,
    SuppressCheck,
    ParameterSource,
}

/// Kinds that make a method a route candidate.
pub const ROUTE_KINDS: &[MetadataKind] = &[MetadataKind::Path, MetadataKind::HttpMethod];

/// Kinds that only refine a route.
pub const METHOD_KINDS: &[MetadataKind] = &[
    MetadataKind::Consumes,
    MetadataKind::Produces,
    MetadataKind::ErrorHandler,
    MetadataKind::RequestReader,
    MetadataKind::ResponseWriter,
    MetadataKind::Order,
    MetadataKind::SuppressCheck,
];

/// Method-level kinds in the order the collector records them.
pub const COLLECTED_KINDS: &[MetadataKind] = &[
    MetadataKind::Path,
    MetadataKind::HttpMethod,
    MetadataKind::Consumes,
    MetadataKind::Produces,
    MetadataKind::ErrorHandler,
    MetadataKind::RequestReader,
    MetadataKind::ResponseWriter,
    MetadataKind::Order,
    MetadataKind::SuppressCheck,
];

/// Reference to a strategy type the core only carries around
/// (response writers, error handlers).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrategyRef(TypeKey);

impl StrategyRef {
    pub fn of<T: 'static>() -> Self {
        Self(TypeKey::of::<T>())
    }

    pub fn key(&self) -> TypeKey {
        self.0
    }

    pub fn type_name(&self) -> &'static str {
        self.0.name()
    }
}

impl fmt::Debug for StrategyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StrategyRef({})", self.0.name())
    }
}

/// A method- or type-level metadata item.
#[derive(Debug, Clone, PartialEq)]
pub enum Metadata {
    Path(String),
    Method(HttpMethod),
    Consumes(Vec<String>),
    Produces(Vec<String>),
    CatchWith(Vec<StrategyRef>),
    RequestReader(ReaderRef),
    ResponseWriter(StrategyRef),
    Order(i32),
    SuppressCheck,
}

impl Metadata {
    pub fn kind(&self) -> MetadataKind {
        match self {
            Metadata::Path(_) => MetadataKind::Path,
            Metadata::Method(_) => MetadataKind::HttpMethod,
            Metadata::Consumes(_) => MetadataKind::Consumes,
            Metadata::Produces(_) => MetadataKind::Produces,
            Metadata::CatchWith(_) => MetadataKind::ErrorHandler,
            Metadata::RequestReader(_) => MetadataKind::RequestReader,
            Metadata::ResponseWriter(_) => MetadataKind::ResponseWriter,
            Metadata::Order(_) => MetadataKind::Order,
            Metadata::SuppressCheck => MetadataKind::SuppressCheck,
        }
    }
}

/// Where a parameter value comes from, as declared on the parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMetadata {
    Path(String),
    Query(String),
    Header(String),
    Cookie(String),
    Form(String),
    Matrix(String),
    Context,
    Body,
}

/// A parameter-level metadata item.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamMetadata {
    Source(SourceMetadata),
    Default(String),
    Reader(ReaderRef),
    DataType(ValueType),
}

impl ParamMetadata {
    pub fn kind(&self) -> ParamMetadataKind {
        match self {
            ParamMetadata::Source(_) => ParamMetadataKind::Source,
            ParamMetadata::Default(_) => ParamMetadataKind::Default,
            ParamMetadata::Reader(_) => ParamMetadataKind::Reader,
            ParamMetadata::DataType(_) => ParamMetadataKind::DataType,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMetadataKind {
    Source,
    Default,
    Reader,
    DataType,
}

/// Insertion-ordered metadata, at most one item per kind.
#[derive(Debug, Clone, Default)]
pub struct MetadataSet {
    items: SmallVec<[Metadata; 4]>,
}

impl MetadataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `item` unless an item of the same kind is already present.
    /// Returns whether it was added.
    pub fn insert(&mut self, item: Metadata) -> bool {
        if self.contains(item.kind()) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn contains(&self, kind: MetadataKind) -> bool {
        self.items.iter().any(|item| item.kind() == kind)
    }

    pub fn get(&self, kind: MetadataKind) -> Option<&Metadata> {
        self.items.iter().find(|item| item.kind() == kind)
    }

    /// A route must carry a verb
    pub fn is_route(&self) -> bool {
        self.contains(MetadataKind::HttpMethod)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Metadata> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<Metadata> for MetadataSet {
    fn from_iter<I: IntoIterator<Item = Metadata>>(iter: I) -> Self {
        let mut set = MetadataSet::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

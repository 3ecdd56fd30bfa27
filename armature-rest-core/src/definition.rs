//! Compiled description of one endpoint.
//!
//! A [`RouteDefinition`] is built in two steps. [`RouteDefinition::root`]
//! takes the type-level metadata of a handler type (base path, content
//! types, strategies); [`RouteDefinition::merge`] layers one method's
//! collected metadata on top. Method-level items replace type-level ones,
//! list-valued items included. The formal parameters are attached last and
//! the definition is read-only from then on.

use crate::collector::type_with_path;
use crate::config::RestConfig;
use crate::handler::{HandlerMethod, HandlerType};
use crate::http::HttpMethod;
use crate::metadata::{Metadata, MetadataSet, ParamMetadata, SourceMetadata, StrategyRef};
use crate::parameter::{MethodParameter, ParameterSource};
use crate::path::{self, PathSegment, PathTemplate};
use crate::reader::ReaderRef;
use crate::types::ValueType;
use crate::{Error, Result};
use regex::Regex;
use std::fmt;

const ROOT_PATH: &str = "/";

#[derive(Debug, Clone, Default)]
pub struct RouteDefinition {
    owner: String,
    method_name: Option<String>,
    path: Option<String>,
    template: Option<PathTemplate>,
    /// Set once a path item was applied, on the type or the method
    routable: bool,
    method: Option<HttpMethod>,
    consumes: Option<Vec<String>>,
    produces: Option<Vec<String>>,
    order: i32,
    suppress_check: bool,
    reader: Option<ReaderRef>,
    writer: Option<StrategyRef>,
    error_handlers: Vec<StrategyRef>,
    parameters: Vec<MethodParameter>,
}

impl RouteDefinition {
    /// Type-level definition of `ty`.
    ///
    /// The base path comes from the first type in the hierarchy declaring
    /// one; other type-level items from `ty` itself, then from that type.
    pub fn root(ty: &HandlerType) -> Result<Self> {
        let mut metadata: MetadataSet = ty.metadata().iter().cloned().collect();
        if let Some(source) = type_with_path(ty) {
            for item in source.metadata() {
                metadata.insert(item.clone());
            }
        }

        let mut definition = RouteDefinition {
            owner: ty.name().to_string(),
            path: Some(ROOT_PATH.to_string()),
            ..Default::default()
        };
        definition.apply(&metadata)?;
        Ok(definition)
    }

    /// Concrete definition: `root` overlaid with a method's metadata
    pub fn merge(root: &RouteDefinition, metadata: &MetadataSet) -> Result<Self> {
        let mut definition = root.clone();
        definition.parameters.clear();
        definition.apply(metadata)?;
        Ok(definition)
    }

    fn apply(&mut self, metadata: &MetadataSet) -> Result<()> {
        for item in metadata.iter() {
            match item {
                Metadata::Path(sub_path) => {
                    let base = self.path.as_deref().unwrap_or(ROOT_PATH);
                    self.path = Some(path::join(base, sub_path)?);
                    self.routable = true;
                }
                Metadata::Method(method) => self.method = Some(*method),
                Metadata::Consumes(types) => {
                    if let Some(types) = media_types(types) {
                        self.consumes = Some(types);
                    }
                }
                Metadata::Produces(types) => {
                    if let Some(types) = media_types(types) {
                        self.produces = Some(types);
                    }
                }
                Metadata::CatchWith(handlers) => self.error_handlers = handlers.clone(),
                Metadata::RequestReader(reader) => self.reader = Some(*reader),
                Metadata::ResponseWriter(writer) => self.writer = Some(*writer),
                Metadata::Order(order) => self.order = *order,
                Metadata::SuppressCheck => self.suppress_check = true,
            }
        }

        if self.routable {
            self.parse_template()?;
        }
        Ok(())
    }

    fn parse_template(&mut self) -> Result<()> {
        let Some(raw) = self.path.as_deref() else {
            return Ok(());
        };

        let template = PathTemplate::parse(raw)?;
        self.parameters = template
            .params()
            .filter_map(|segment| match segment {
                PathSegment::Param { name, path_index } => {
                    Some(MethodParameter::path(name, *path_index, None))
                }
                PathSegment::Regex {
                    name,
                    pattern,
                    path_index,
                    ..
                } => Some(MethodParameter::path(name, *path_index, Some(pattern.clone()))),
                PathSegment::Static(_) => None,
            })
            .collect();
        self.template = Some(template);
        Ok(())
    }

    /// Content types from configuration, for routes that resolved none
    pub(crate) fn apply_defaults(&mut self, config: &RestConfig) {
        if self.consumes.is_none() && !config.default_consumes.is_empty() {
            self.consumes = Some(config.default_consumes.clone());
        }
        if self.produces.is_none() && !config.default_produces.is_empty() {
            self.produces = Some(config.default_produces.clone());
        }
    }

    /// Attach the formal parameters of `method`.
    ///
    /// `params` holds the collected metadata for each formal index. With
    /// `strict_body` unset, parameters without a source on body-less verbs
    /// are left unbound instead of failing.
    pub(crate) fn set_arguments(
        &mut self,
        method: &HandlerMethod,
        params: &[Vec<ParamMetadata>],
        strict_body: bool,
    ) -> Result<()> {
        self.method_name = Some(method.name().to_string());

        for (index, formal) in method.params().iter().enumerate() {
            let metadata = params.get(index).map(Vec::as_slice).unwrap_or(formal.metadata());

            let mut source = None;
            let mut default_value = None;
            let mut reader = None;
            let mut data_type = None;
            for item in metadata {
                match item {
                    ParamMetadata::Source(s) => {
                        source.get_or_insert(s);
                    }
                    ParamMetadata::Default(v) => {
                        default_value.get_or_insert(v.clone());
                    }
                    ParamMetadata::Reader(r) => {
                        reader.get_or_insert(*r);
                    }
                    ParamMetadata::DataType(t) => {
                        data_type.get_or_insert(t.clone());
                    }
                }
            }
            let data_type = data_type.unwrap_or_else(|| formal.value_type().clone());

            let mut parameter = match source {
                Some(SourceMetadata::Path(name)) => {
                    self.bind_path_parameter(name, data_type, index, default_value, reader)?;
                    continue;
                }
                Some(SourceMetadata::Query(name)) => self.named(ParameterSource::Query, name)?,
                Some(SourceMetadata::Header(name)) => self.named(ParameterSource::Header, name)?,
                Some(SourceMetadata::Cookie(name)) => self.named(ParameterSource::Cookie, name)?,
                Some(SourceMetadata::Form(name)) => self.named(ParameterSource::Form, name)?,
                Some(SourceMetadata::Matrix(name)) => self.named(ParameterSource::Matrix, name)?,
                Some(SourceMetadata::Context) => {
                    MethodParameter::new(ParameterSource::Context, Some(formal.name().to_string()))
                }
                Some(SourceMetadata::Body) | None => {
                    if self.request_has_body() {
                        MethodParameter::new(ParameterSource::Body, Some(formal.name().to_string()))
                    } else if source.is_none() && !strict_body {
                        MethodParameter::new(ParameterSource::Unknown, Some(formal.name().to_string()))
                    } else {
                        return Err(Error::InvalidMetadata(format!(
                            "Missing argument source for: {}",
                            formal.name()
                        )));
                    }
                }
            };

            if parameter.is_body() && reader.is_none() {
                reader = self.reader;
            }
            parameter.argument(data_type, index);
            parameter.set_default_value(default_value);
            parameter.set_reader(reader);
            self.parameters.push(parameter);
        }

        self.parameters
            .sort_by_key(|parameter| parameter.index().unwrap_or(usize::MAX));
        Ok(())
    }

    fn bind_path_parameter(
        &mut self,
        name: &str,
        data_type: ValueType,
        index: usize,
        default_value: Option<String>,
        reader: Option<ReaderRef>,
    ) -> Result<()> {
        let route = self.path.clone().unwrap_or_default();
        let parameter = self
            .parameters
            .iter_mut()
            .find(|p| p.source() == ParameterSource::Path && p.name() == Some(name))
            .ok_or_else(|| {
                Error::InvalidMetadata(format!(
                    "Missing path parameter '{}' in route path: {}",
                    name, route
                ))
            })?;

        if parameter.index().is_some() {
            return Err(Error::InvalidMetadata(format!(
                "Path parameter '{}' is bound to more than one argument",
                name
            )));
        }

        parameter.argument(data_type, index);
        parameter.set_default_value(default_value);
        parameter.set_reader(reader);
        Ok(())
    }

    fn named(&self, source: ParameterSource, name: &str) -> Result<MethodParameter> {
        if self
            .parameters
            .iter()
            .any(|p| p.source() == source && p.name() == Some(name))
        {
            return Err(Error::InvalidMetadata(format!(
                "Duplicate {} parameter \"{}\"",
                source, name
            )));
        }
        Ok(MethodParameter::new(source, Some(name.to_string())))
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Name of the method the parameters were attached from
    pub fn method_name(&self) -> Option<&str> {
        self.method_name.as_deref()
    }

    /// Path template as joined from type and method paths
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Path a dispatcher registers the route under; `None` when no path
    /// item was applied
    pub fn route_path(&self) -> Option<String> {
        if !self.routable {
            return None;
        }
        self.template.as_ref().map(PathTemplate::route_path)
    }

    pub fn route_regex(&self) -> Option<&Regex> {
        self.template.as_ref().and_then(PathTemplate::regex)
    }

    pub fn template(&self) -> Option<&PathTemplate> {
        self.template.as_ref()
    }

    pub fn method(&self) -> Option<HttpMethod> {
        self.method
    }

    pub fn consumes(&self) -> Option<&[String]> {
        self.consumes.as_deref()
    }

    pub fn produces(&self) -> Option<&[String]> {
        self.produces.as_deref()
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn suppress_check(&self) -> bool {
        self.suppress_check
    }

    pub fn reader(&self) -> Option<&ReaderRef> {
        self.reader.as_ref()
    }

    pub fn writer(&self) -> Option<&StrategyRef> {
        self.writer.as_ref()
    }

    pub fn error_handlers(&self) -> &[StrategyRef] {
        &self.error_handlers
    }

    /// Parameters ordered by argument index; unbound path parameters last
    pub fn parameters(&self) -> &[MethodParameter] {
        &self.parameters
    }

    /// Parameter bound to the argument at `index`
    pub fn find_parameter(&self, index: usize) -> Option<&MethodParameter> {
        self.parameters.iter().find(|p| p.index() == Some(index))
    }

    pub fn path_is_regex(&self) -> bool {
        self.template.as_ref().is_some_and(PathTemplate::is_regex)
    }

    pub fn has_matrix_params(&self) -> bool {
        self.parameters
            .iter()
            .any(|p| p.source() == ParameterSource::Matrix)
    }

    /// Whether the verb carries a request body (anything but GET and HEAD)
    pub fn request_has_body(&self) -> bool {
        self.method.is_some_and(|method| method.has_body())
    }
}

impl fmt::Display for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.method {
            Some(method) => write!(f, "{} ", method)?,
            None => f.write_str("* ")?,
        }
        f.write_str(self.path.as_deref().unwrap_or(ROOT_PATH))
    }
}

fn media_types(types: &[String]) -> Option<Vec<String>> {
    let types: Vec<String> = types
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    (!types.is_empty()).then_some(types)
}

// Compiled description of how one formal argument is bound

use crate::reader::ReaderRef;
use crate::types::ValueType;
use std::fmt;

/// Where the raw value of a parameter is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterSource {
    Path,
    Query,
    Header,
    Cookie,
    Form,
    Matrix,
    Body,
    Context,
    /// Not bound from the request; the slot is left empty
    Unknown,
}

impl ParameterSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterSource::Path => "path",
            ParameterSource::Query => "query",
            ParameterSource::Header => "header",
            ParameterSource::Cookie => "cookie",
            ParameterSource::Form => "form",
            ParameterSource::Matrix => "matrix",
            ParameterSource::Body => "body",
            ParameterSource::Context => "context",
            ParameterSource::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ParameterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodParameter {
    source: ParameterSource,
    name: Option<String>,
    /// Zero-based position in the formal parameter list, once attached
    index: Option<usize>,
    /// Segment position, for path parameters
    path_index: Option<usize>,
    /// Pattern, for regex path parameters
    regex: Option<String>,
    default_value: Option<String>,
    data_type: Option<ValueType>,
    reader: Option<ReaderRef>,
}

impl MethodParameter {
    pub fn new(source: ParameterSource, name: Option<String>) -> Self {
        Self {
            source,
            name,
            index: None,
            path_index: None,
            regex: None,
            default_value: None,
            data_type: None,
            reader: None,
        }
    }

    pub(crate) fn path(name: &str, path_index: usize, regex: Option<String>) -> Self {
        let mut param = Self::new(ParameterSource::Path, Some(name.to_string()));
        param.path_index = Some(path_index);
        param.regex = regex;
        param
    }

    /// Attach to the formal argument at `index`
    pub(crate) fn argument(&mut self, data_type: ValueType, index: usize) {
        self.data_type = Some(data_type);
        self.index = Some(index);
    }

    pub(crate) fn set_default_value(&mut self, value: Option<String>) {
        self.default_value = value;
    }

    pub(crate) fn set_reader(&mut self, reader: Option<ReaderRef>) {
        self.reader = reader;
    }

    pub fn source(&self) -> ParameterSource {
        self.source
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn path_index(&self) -> Option<usize> {
        self.path_index
    }

    pub fn regex(&self) -> Option<&str> {
        self.regex.as_deref()
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn data_type(&self) -> Option<&ValueType> {
        self.data_type.as_ref()
    }

    pub fn reader(&self) -> Option<&ReaderRef> {
        self.reader.as_ref()
    }

    pub fn is_body(&self) -> bool {
        self.source == ParameterSource::Body
    }

    pub fn is_used_as_argument(&self) -> bool {
        self.source != ParameterSource::Unknown && self.index.is_some()
    }
}

impl fmt::Display for MethodParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} parameter \"{}\"", self.source, name),
            None => match self.index {
                Some(index) => write!(f, "{} parameter #{}", self.source, index + 1),
                None => write!(f, "{} parameter", self.source),
            },
        }
    }
}

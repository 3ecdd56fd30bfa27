//! Route path templates
//!
//! Templates name parameters as whole segments: `{id}` for a plain
//! parameter, `{id: [0-9]+}` for one constrained by a regular expression.
//! A template with at least one regex parameter is matched as a regex; its
//! parameters are then found by segment position rather than by name.

use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

const DELIMITER: &str = "/";

static PARAM_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\{\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*(?::\s*(.+?))?\s*\}$")
        .expect("parameter segment pattern is valid")
});

/// One non-empty segment of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Static(String),
    Param {
        name: String,
        path_index: usize,
    },
    Regex {
        name: String,
        pattern: String,
        path_index: usize,
        regex_index: usize,
    },
}

impl PathSegment {
    fn parse(segment: &str, path_index: usize, regex_index: usize) -> Result<Self> {
        if let Some(captures) = PARAM_SEGMENT.captures(segment) {
            let name = captures[1].to_string();
            return Ok(match captures.get(2) {
                Some(pattern) => PathSegment::Regex {
                    name,
                    pattern: pattern.as_str().to_string(),
                    path_index,
                    regex_index,
                },
                None => PathSegment::Param { name, path_index },
            });
        }

        if segment.contains('{') || segment.contains('}') {
            return Err(Error::InvalidMetadata(format!(
                "Malformed path parameter segment: '{}'",
                segment
            )));
        }

        Ok(PathSegment::Static(segment.to_string()))
    }

    pub fn param_name(&self) -> Option<&str> {
        match self {
            PathSegment::Static(_) => None,
            PathSegment::Param { name, .. } | PathSegment::Regex { name, .. } => Some(name),
        }
    }

    pub fn path_index(&self) -> Option<usize> {
        match self {
            PathSegment::Static(_) => None,
            PathSegment::Param { path_index, .. } | PathSegment::Regex { path_index, .. } => {
                Some(*path_index)
            }
        }
    }
}

/// A parsed route path.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<PathSegment>,
    regex: Option<Regex>,
}

impl PathTemplate {
    pub fn parse(path: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut regex_index = 0;

        for (path_index, part) in path.split('/').filter(|s| !s.is_empty()).enumerate() {
            let segment = PathSegment::parse(part, path_index, regex_index)?;
            if matches!(segment, PathSegment::Regex { .. }) {
                regex_index += 1;
            }
            segments.push(segment);
        }

        let mut template = Self {
            raw: path.to_string(),
            segments,
            regex: None,
        };

        if regex_index > 0 {
            let pattern = template.regex_pattern();
            let regex = Regex::new(&pattern).map_err(|e| {
                Error::InvalidMetadata(format!("Invalid regular expression in path '{}': {}", path, e))
            })?;
            template.regex = Some(regex);
        }

        Ok(template)
    }

    /// The template as declared
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_regex(&self) -> bool {
        self.regex.is_some()
    }

    pub fn regex(&self) -> Option<&Regex> {
        self.regex.as_ref()
    }

    /// Parameter segments in declaration order
    pub fn params(&self) -> impl Iterator<Item = &PathSegment> {
        self.segments.iter().filter(|s| !matches!(s, PathSegment::Static(_)))
    }

    /// Path in the form a dispatcher registers: `/users/:id` for plain
    /// templates, an anchored regex for regex templates.
    pub fn route_path(&self) -> String {
        if self.is_regex() {
            return self.regex_pattern();
        }

        if self.segments.is_empty() {
            return DELIMITER.to_string();
        }

        let mut route = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            route.push('/');
            match segment {
                PathSegment::Static(value) => route.push_str(value),
                PathSegment::Param { name, .. } | PathSegment::Regex { name, .. } => {
                    route.push(':');
                    route.push_str(name);
                }
            }
        }
        if self.raw.len() > 1 && self.raw.ends_with(DELIMITER) {
            route.push('/');
        }
        route
    }

    fn regex_pattern(&self) -> String {
        let mut pattern = String::from("^");
        for segment in &self.segments {
            pattern.push('/');
            match segment {
                PathSegment::Static(value) => pattern.push_str(&regex::escape(value)),
                PathSegment::Param { path_index, .. } => {
                    pattern.push_str(&format!("(?P<param{}>[^/]+)", path_index));
                }
                PathSegment::Regex {
                    pattern: expr,
                    path_index,
                    ..
                } => {
                    pattern.push_str(&format!("(?P<param{}>{})", path_index, expr));
                }
            }
        }
        if self.segments.is_empty() {
            pattern.push('/');
        }
        pattern.push('$');
        pattern
    }
}

/// Append `sub_path` to `base`.
///
/// A sub-path of `/` leaves the base untouched; a base of `/` is replaced.
pub fn join(base: &str, sub_path: &str) -> Result<String> {
    let sub_path = sub_path.trim();
    if sub_path.is_empty() {
        return Err(Error::InvalidMetadata("Missing or empty route path!".to_string()));
    }

    if sub_path == DELIMITER {
        return Ok(base.to_string());
    }

    let sub_path = if sub_path.starts_with(DELIMITER) {
        sub_path.to_string()
    } else {
        format!("{}{}", DELIMITER, sub_path)
    };

    if base == DELIMITER || base.is_empty() {
        return Ok(sub_path);
    }

    Ok(match base.strip_suffix(DELIMITER) {
        Some(trimmed) => format!("{}{}", trimmed, sub_path),
        None => format!("{}{}", base, sub_path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join() {
        assert_eq!(join("/", "users").unwrap(), "/users");
        assert_eq!(join("/api", "/users").unwrap(), "/api/users");
        assert_eq!(join("/api/", "/users").unwrap(), "/api/users");
        assert_eq!(join("/api", "/").unwrap(), "/api");
        assert!(join("/api", "   ").is_err());
    }

    #[test]
    fn test_plain_template() {
        let template = PathTemplate::parse("/users/{id}/posts/{ post }").unwrap();
        assert!(!template.is_regex());
        assert_eq!(template.route_path(), "/users/:id/posts/:post");

        let params: Vec<_> = template
            .params()
            .map(|p| (p.param_name().unwrap().to_string(), p.path_index().unwrap()))
            .collect();
        assert_eq!(params, vec![("id".to_string(), 1), ("post".to_string(), 3)]);
    }

    #[test]
    fn test_regex_template() {
        let template = PathTemplate::parse("/abstract/get/{param: [a-z]+}").unwrap();
        assert!(template.is_regex());
        assert_eq!(template.route_path(), "^/abstract/get/(?P<param2>[a-z]+)$");

        let captures = template.regex().unwrap().captures("/abstract/get/test").unwrap();
        assert_eq!(&captures["param2"], "test");
        assert!(!template.regex().unwrap().is_match("/abstract/get/TEST"));
    }

    #[test]
    fn test_regex_with_quantifier_braces() {
        let template = PathTemplate::parse("/codes/{code: [0-9]{3}}").unwrap();
        assert!(template.regex().unwrap().is_match("/codes/404"));
        assert!(!template.regex().unwrap().is_match("/codes/4040"));
    }

    #[test]
    fn test_malformed_segments() {
        assert!(PathTemplate::parse("/files/v{version}").is_err());
        assert!(PathTemplate::parse("/files/{id").is_err());
        assert!(PathTemplate::parse("/bad/{x: (}").is_err());
    }

    #[test]
    fn test_root_template() {
        let template = PathTemplate::parse("/").unwrap();
        assert_eq!(template.route_path(), "/");
        assert_eq!(template.params().count(), 0);
    }
}

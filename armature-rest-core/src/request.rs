//! Request data the binder reads from.
//!
//! The dispatcher owning the transport implements [`RequestContext`] over
//! its own request type. [`HttpRequest`] is a self-contained implementation
//! for dispatchers that buffer requests, and for tests.

use std::borrow::Cow;
use std::collections::HashMap;

/// Read access to a request that has been matched to a route.
pub trait RequestContext: Send + Sync {
    fn method(&self) -> &str;

    /// Full request URI, including matrix parameters and query
    fn uri(&self) -> &str;

    fn path(&self) -> &str;

    /// Raw query string, without the leading `?`
    fn query(&self) -> Option<&str>;

    /// Header value; names are case-insensitive
    fn header(&self, name: &str) -> Option<&str>;

    fn cookie(&self, name: &str) -> Option<String>;

    /// Attribute of a URL-encoded form body
    fn form_attribute(&self, name: &str) -> Option<String>;

    fn body_as_string(&self) -> Option<Cow<'_, str>>;

    /// Prefix the route set is mounted under
    fn mount_point(&self) -> Option<&str>;

    /// Path variable captured by the dispatcher's matcher
    fn path_param(&self, name: &str) -> Option<&str>;
}

/// Parse `name=value&...` pairs, percent-decoding both sides.
/// The last value of a repeated name wins.
pub fn parse_form_map(body: &[u8]) -> Result<HashMap<String, String>, serde_urlencoded::de::Error> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)?;
    Ok(pairs.into_iter().collect())
}

/// Parse a query string; malformed input yields no pairs.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    parse_form_map(query.as_bytes()).unwrap_or_default()
}

/// Parse a `Cookie` header into name/value pairs.
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|part| {
            let (name, value) = part.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().trim_matches('"').to_string()))
        })
        .collect()
}

/// Buffered HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub uri: String,
    pub path: String,
    pub query: Option<String>,
    /// Lowercased header names
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub path_params: HashMap<String, String>,
    pub mount_point: Option<String>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (uri.clone(), None),
        };

        Self {
            method: method.into(),
            uri,
            path,
            query,
            headers: HashMap::new(),
            body: Vec::new(),
            path_params: HashMap::new(),
            mount_point: None,
        }
    }

    pub fn get(uri: impl Into<String>) -> Self {
        Self::new("GET", uri)
    }

    pub fn post(uri: impl Into<String>) -> Self {
        Self::new("POST", uri)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// URL-encoded form body with the matching content type
    pub fn with_form<K: AsRef<str>, V: AsRef<str>>(self, fields: &[(K, V)]) -> Self {
        let pairs: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (k.as_ref(), v.as_ref())).collect();
        let body = serde_urlencoded::to_string(pairs).unwrap_or_default();
        self.with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body(body)
    }

    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    pub fn with_mount_point(mut self, mount_point: impl Into<String>) -> Self {
        self.mount_point = Some(mount_point.into());
        self
    }
}

impl RequestContext for HttpRequest {
    fn method(&self) -> &str {
        &self.method
    }

    fn uri(&self) -> &str {
        &self.uri
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    fn cookie(&self, name: &str) -> Option<String> {
        let header = self.header("cookie")?;
        parse_cookies(header).remove(name)
    }

    fn form_attribute(&self, name: &str) -> Option<String> {
        let content_type = self.header("content-type")?;
        if !content_type
            .to_lowercase()
            .starts_with("application/x-www-form-urlencoded")
        {
            return None;
        }
        parse_form_map(&self.body).ok()?.remove(name)
    }

    fn body_as_string(&self) -> Option<Cow<'_, str>> {
        if self.body.is_empty() {
            return None;
        }
        Some(String::from_utf8_lossy(&self.body))
    }

    fn mount_point(&self) -> Option<&str> {
        self.mount_point.as_deref()
    }

    fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_uri() {
        let request = HttpRequest::get("/search;lang=en?q=rust&page=2");
        assert_eq!(request.path(), "/search;lang=en");
        assert_eq!(request.query(), Some("q=rust&page=2"));
        assert_eq!(request.uri(), "/search;lang=en?q=rust&page=2");
    }

    #[test]
    fn test_parse_query_decodes_and_last_wins() {
        let params = parse_query("name=john%20doe&tag=a&tag=b");
        assert_eq!(params.get("name").map(String::as_str), Some("john doe"));
        assert_eq!(params.get("tag").map(String::as_str), Some("b"));
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let request = HttpRequest::get("/").with_header("X-Request-Id", "abc");
        assert_eq!(request.header("x-request-id"), Some("abc"));
        assert_eq!(request.header("X-REQUEST-ID"), Some("abc"));
    }

    #[test]
    fn test_cookies() {
        let request = HttpRequest::get("/").with_header("Cookie", "session=s1; theme=\"dark\"");
        assert_eq!(request.cookie("session").as_deref(), Some("s1"));
        assert_eq!(request.cookie("theme").as_deref(), Some("dark"));
        assert_eq!(request.cookie("missing"), None);
    }

    #[test]
    fn test_form_attributes_need_form_content_type() {
        let request = HttpRequest::post("/login").with_form(&[("user", "ann"), ("remember", "on")]);
        assert_eq!(request.form_attribute("user").as_deref(), Some("ann"));

        let json = HttpRequest::post("/login")
            .with_header("Content-Type", "application/json")
            .with_body("user=ann");
        assert_eq!(json.form_attribute("user"), None);
    }

    #[test]
    fn test_empty_body_is_absent() {
        assert!(HttpRequest::post("/").body_as_string().is_none());
        let request = HttpRequest::post("/").with_body("{}");
        assert_eq!(request.body_as_string().as_deref(), Some("{}"));
    }
}

//! Request values matched against expectations, and their builders.
//!
//! # Design
//! `HttpRequest` is what the matcher compares: method, content type, body,
//! path and the query-parameter set. `FullHttpRequest` adds the address part
//! (domain and port) so an expectation can be rendered as a full URL, but the
//! address never takes part in matching.
//!
//! Both values are produced by owning builders with a terminal `build()`.
//! Once built they are immutable, so a pattern handed to the provider cannot
//! change under it. Optional fields left unset are part of the value: a
//! request without a body is not equal to one with an empty-string body.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Deserialize;

use crate::error::RequestError;
use crate::http::{Method, QueryParameter};

const NOT_SPECIFIED: &str = "null";

/// Set of query parameters that remembers insertion order.
///
/// Iteration (and therefore URL rendering) follows the order parameters were
/// first added. Equality and hashing ignore that order.
#[derive(Debug, Clone, Default)]
pub struct QueryParameters {
    params: Vec<QueryParameter>,
}

impl QueryParameters {
    /// Adds `param` unless an equal pair is already present.
    fn insert(&mut self, param: QueryParameter) {
        if !self.params.contains(&param) {
            self.params.push(param);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueryParameter> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn contains(&self, param: &QueryParameter) -> bool {
        self.params.contains(param)
    }

    /// `k=v&k=v` in insertion order, values written verbatim.
    pub fn to_query_string(&self) -> String {
        self.params
            .iter()
            .map(QueryParameter::to_string)
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl PartialEq for QueryParameters {
    fn eq(&self, other: &Self) -> bool {
        // Entries are unique, so equal length plus containment is set equality.
        self.params.len() == other.params.len() && self.params.iter().all(|p| other.contains(p))
    }
}

impl Eq for QueryParameters {}

impl Hash for QueryParameters {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut sorted: Vec<&QueryParameter> = self.params.iter().collect();
        sorted.sort();
        sorted.hash(state);
    }
}

impl<'a> IntoIterator for &'a QueryParameters {
    type Item = &'a QueryParameter;
    type IntoIter = std::slice::Iter<'a, QueryParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

/// An HTTP request as seen by the matcher.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    content_type: Option<String>,
    content: Option<String>,
    path: Option<String>,
    query_parameters: QueryParameters,
}

impl HttpRequest {
    pub fn builder(method: Method) -> HttpRequestBuilder {
        HttpRequestBuilder {
            request: HttpRequest {
                method,
                content_type: None,
                content: None,
                path: None,
                query_parameters: QueryParameters::default(),
            },
        }
    }

    /// Builder pre-filled with a copy of every field of this request.
    pub fn to_builder(&self) -> HttpRequestBuilder {
        HttpRequestBuilder {
            request: self.clone(),
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn query_parameters(&self) -> &QueryParameters {
        &self.query_parameters
    }
}

impl PartialEq for HttpRequest {
    fn eq(&self, other: &Self) -> bool {
        self.method == other.method
            && self.content_type == other.content_type
            && self.content == other.content
            && self.path == other.path
            && self.query_parameters == other.query_parameters
    }
}

impl Eq for HttpRequest {}

impl Hash for HttpRequest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.method.hash(state);
        self.content_type.hash(state);
        self.content.hash(state);
        self.path.hash(state);
        self.query_parameters.hash(state);
    }
}

impl fmt::Display for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Method: {}", self.method)?;
        writeln!(f, "Content-Type: {}", self.content_type.as_deref().unwrap_or(NOT_SPECIFIED))?;
        writeln!(f, "Content: {}", self.content.as_deref().unwrap_or(NOT_SPECIFIED))?;
        writeln!(f, "Path: {}", self.path.as_deref().unwrap_or(NOT_SPECIFIED))?;
        if self.query_parameters.is_empty() {
            write!(f, "Query Parameters: {NOT_SPECIFIED}")
        } else {
            write!(f, "Query Parameters: {}", self.query_parameters.to_query_string())
        }
    }
}

/// Chained construction of an [`HttpRequest`].
#[derive(Debug, Clone)]
pub struct HttpRequestBuilder {
    request: HttpRequest,
}

impl HttpRequestBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.request.method = method;
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.request.content_type = Some(content_type.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.request.content = Some(content.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.request.path = Some(path.into());
        self
    }

    /// Adds a query parameter, failing right away on an empty key or value.
    pub fn query_parameter(
        self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, RequestError> {
        Ok(self.with_query_parameter(QueryParameter::new(key, value)?))
    }

    pub fn with_query_parameter(mut self, param: QueryParameter) -> Self {
        self.request.query_parameters.insert(param);
        self
    }

    pub fn build(self) -> HttpRequest {
        self.request
    }
}

/// An [`HttpRequest`] plus the address it was (or will be) sent to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FullHttpRequest {
    request: HttpRequest,
    domain: Option<String>,
    port: Option<u16>,
}

impl FullHttpRequest {
    pub fn builder(method: Method) -> FullHttpRequestBuilder {
        FullHttpRequestBuilder {
            request: HttpRequest::builder(method),
            domain: None,
            port: None,
        }
    }

    pub fn to_builder(&self) -> FullHttpRequestBuilder {
        FullHttpRequestBuilder {
            request: self.request.to_builder(),
            domain: self.domain.clone(),
            port: self.port,
        }
    }

    /// The part of the request that takes part in matching.
    pub fn as_request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn into_request(self) -> HttpRequest {
        self.request
    }

    pub fn method(&self) -> Method {
        self.request.method
    }

    pub fn content_type(&self) -> Option<&str> {
        self.request.content_type()
    }

    pub fn content(&self) -> Option<&str> {
        self.request.content()
    }

    pub fn path(&self) -> Option<&str> {
        self.request.path()
    }

    pub fn query_parameters(&self) -> &QueryParameters {
        self.request.query_parameters()
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Renders `http://{domain}{:port}{path}{?query}`.
    ///
    /// A missing domain renders as nothing, a missing path as `/`. Query
    /// parameters appear in insertion order and are not URL-encoded.
    pub fn url(&self) -> String {
        let mut url = format!("http://{}", self.domain.as_deref().unwrap_or_default());
        if let Some(port) = self.port {
            url.push_str(&format!(":{port}"));
        }
        url.push_str(self.request.path().unwrap_or("/"));
        if !self.request.query_parameters.is_empty() {
            url.push('?');
            url.push_str(&self.request.query_parameters.to_query_string());
        }
        url
    }
}

impl From<HttpRequest> for FullHttpRequest {
    fn from(request: HttpRequest) -> Self {
        Self {
            request,
            domain: None,
            port: None,
        }
    }
}

impl fmt::Display for FullHttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.request)?;
        writeln!(f, "Domain: {}", self.domain.as_deref().unwrap_or(NOT_SPECIFIED))?;
        match self.port {
            Some(port) => write!(f, "Port: {port}"),
            None => write!(f, "Port: {NOT_SPECIFIED}"),
        }
    }
}

impl<'de> Deserialize<'de> for FullHttpRequest {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Raw {
            method: Method,
            content_type: Option<String>,
            content: Option<String>,
            path: Option<String>,
            #[serde(default)]
            query_parameters: Vec<QueryParameter>,
            domain: Option<String>,
            port: Option<u16>,
        }

        let raw = Raw::deserialize(deserializer)?;
        let mut builder = FullHttpRequest::builder(raw.method);
        if let Some(content_type) = raw.content_type {
            builder = builder.content_type(content_type);
        }
        if let Some(content) = raw.content {
            builder = builder.content(content);
        }
        if let Some(path) = raw.path {
            builder = builder.path(path);
        }
        if let Some(domain) = raw.domain {
            builder = builder.domain(domain);
        }
        if let Some(port) = raw.port {
            builder = builder.port(port);
        }
        for param in raw.query_parameters {
            builder = builder.with_query_parameter(param);
        }
        Ok(builder.build())
    }
}

/// Chained construction of a [`FullHttpRequest`].
#[derive(Debug, Clone)]
pub struct FullHttpRequestBuilder {
    request: HttpRequestBuilder,
    domain: Option<String>,
    port: Option<u16>,
}

impl FullHttpRequestBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.request = self.request.method(method);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.request = self.request.content_type(content_type);
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.request = self.request.content(content);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.request = self.request.path(path);
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn query_parameter(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, RequestError> {
        self.request = self.request.query_parameter(key, value)?;
        Ok(self)
    }

    pub fn with_query_parameter(mut self, param: QueryParameter) -> Self {
        self.request = self.request.with_query_parameter(param);
        self
    }

    pub fn build(self) -> FullHttpRequest {
        FullHttpRequest {
            request: self.request.build(),
            domain: self.domain,
            port: self.port,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;

    use super::*;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    fn persons() -> HttpRequestBuilder {
        HttpRequest::builder(Method::Get)
            .path("/persons")
            .content_type("application/json")
            .content("{}")
    }

    #[test]
    fn query_parameter_order_does_not_affect_equality() {
        let a = persons()
            .query_parameter("name", "Smith")
            .unwrap()
            .query_parameter("gender", "female")
            .unwrap()
            .build();
        let b = persons()
            .query_parameter("gender", "female")
            .unwrap()
            .query_parameter("name", "Smith")
            .unwrap()
            .build();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn any_single_field_difference_breaks_equality() {
        let base = persons().query_parameter("name", "Smith").unwrap().build();
        let variants = [
            base.to_builder().method(Method::Post).build(),
            base.to_builder().path("/people").build(),
            base.to_builder().content_type("text/plain").build(),
            base.to_builder().content("[]").build(),
            persons().query_parameter("name", "Jones").unwrap().build(),
            base.to_builder().query_parameter("age", "40").unwrap().build(),
        ];
        for variant in &variants {
            assert_ne!(&base, variant, "{variant}");
        }
    }

    #[test]
    fn unset_fields_are_not_wildcards() {
        let with_path = HttpRequest::builder(Method::Get).path("/ping").build();
        let without_path = HttpRequest::builder(Method::Get).build();
        assert_ne!(with_path, without_path);

        let empty_body = HttpRequest::builder(Method::Post).content("").build();
        let no_body = HttpRequest::builder(Method::Post).build();
        assert_ne!(empty_body, no_body);
    }

    #[test]
    fn duplicate_pairs_collapse_but_repeated_keys_do_not() {
        let req = HttpRequest::builder(Method::Get)
            .query_parameter("tag", "a")
            .unwrap()
            .query_parameter("tag", "a")
            .unwrap()
            .query_parameter("tag", "b")
            .unwrap()
            .build();
        assert_eq!(req.query_parameters().len(), 2);
        assert_eq!(req.query_parameters().to_query_string(), "tag=a&tag=b");
    }

    #[test]
    fn builder_rejects_empty_query_parts_immediately() {
        let err = HttpRequest::builder(Method::Get).query_parameter("", "v").unwrap_err();
        assert!(matches!(err, RequestError::EmptyQueryKey));
        let err = FullHttpRequest::builder(Method::Get)
            .query_parameter("k", "")
            .unwrap_err();
        assert!(matches!(err, RequestError::EmptyQueryValue { .. }));
    }

    #[test]
    fn values_are_stored_verbatim() {
        let req = HttpRequest::builder(Method::Get)
            .content_type("Application/JSON")
            .path("/a b")
            .query_parameter("q", "x y")
            .unwrap()
            .build();
        assert_eq!(req.content_type(), Some("Application/JSON"));
        assert_eq!(req.path(), Some("/a b"));
        assert_eq!(req.query_parameters().to_query_string(), "q=x y");
    }

    #[test]
    fn copy_is_independent_of_source() {
        let original = FullHttpRequest::builder(Method::Get)
            .path("/persons")
            .query_parameter("name", "Smith")
            .unwrap()
            .build();
        let copy = original.clone();
        let changed = original
            .to_builder()
            .query_parameter("gender", "female")
            .unwrap()
            .domain("example.com")
            .build();

        assert_eq!(copy, original);
        assert_eq!(copy.query_parameters().len(), 1);
        assert_eq!(changed.query_parameters().len(), 2);
        assert!(copy.domain().is_none());
    }

    #[test]
    fn url_renders_full_address_in_insertion_order() {
        let req = FullHttpRequest::builder(Method::Get)
            .domain("localhost")
            .port(8081)
            .path("/persons")
            .query_parameter("name", "Smith")
            .unwrap()
            .query_parameter("gender", "female")
            .unwrap()
            .build();
        assert_eq!(req.url(), "http://localhost:8081/persons?name=Smith&gender=female");
    }

    #[test]
    fn url_defaults_for_missing_parts() {
        let req = FullHttpRequest::builder(Method::Get).build();
        assert_eq!(req.url(), "http:///");

        let req = FullHttpRequest::builder(Method::Get).domain("example.com").build();
        assert_eq!(req.url(), "http://example.com/");
    }

    #[test]
    fn display_lists_every_field() {
        let req = FullHttpRequest::builder(Method::Get)
            .path("/ping")
            .port(8080)
            .build();
        assert_eq!(
            req.to_string(),
            "Method: GET\nContent-Type: null\nContent: null\nPath: /ping\n\
             Query Parameters: null\nDomain: null\nPort: 8080"
        );
    }

    #[test]
    fn full_request_deserializes_through_builder() {
        let req: FullHttpRequest = serde_json::from_str(
            concat!(
                r#"{"method":"GET","path":"/persons","#,
                r#""query_parameters":[{"key":"name","value":"Smith"}],"port":8081}"#,
            ),
        )
        .unwrap();
        assert_eq!(req.path(), Some("/persons"));
        assert_eq!(req.port(), Some(8081));
        assert_eq!(req.query_parameters().to_query_string(), "name=Smith");

        let bad = serde_json::from_str::<FullHttpRequest>(r#"{"method":"GET","pth":"/x"}"#);
        assert!(bad.is_err());
    }
}

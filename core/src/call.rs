//! Description of one remote call before it is turned into an `HttpRequest`.

use serde_json::Value;

use crate::http::HttpMethod;

/// Which credential a call is authenticated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScope {
    /// The general key used by address, suggest, get, distance and typeahead.
    Lookup,
    /// The administrative key used by every account-management endpoint.
    Admin,
}

/// A request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Sent JSON-encoded with `content-type: application/json`.
    Json(Value),
    /// Sent verbatim with no content type.
    Text(String),
}

/// Method, path, query and credential scope for one endpoint.
///
/// Path segments are stored unencoded; each one is percent-encoded on its
/// own when the request is built, so a `/` inside a postcode or search term
/// can never introduce a new path segment.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub method: HttpMethod,
    pub scope: KeyScope,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Body>,
}

impl ApiCall {
    pub fn new(method: HttpMethod, scope: KeyScope) -> Self {
        Self {
            method,
            scope,
            segments: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(scope: KeyScope) -> Self {
        Self::new(HttpMethod::Get, scope)
    }

    pub fn post(scope: KeyScope) -> Self {
        Self::new(HttpMethod::Post, scope)
    }

    pub fn put(scope: KeyScope) -> Self {
        Self::new(HttpMethod::Put, scope)
    }

    pub fn delete(scope: KeyScope) -> Self {
        Self::new(HttpMethod::Delete, scope)
    }

    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn segments<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.segments.extend(segments.into_iter().map(Into::into));
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(Body::Json(body));
        self
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(Body::Text(body.into()));
        self
    }

    /// The unencoded path, for logging.
    pub fn path(&self) -> String {
        self.segments.join("/")
    }
}

//! HTTP request type.
//!
//! [`HttpRequest`] carries what the routing layer and the controllers need:
//! method, path, headers, GET/POST parameters, server metadata, and the slot
//! where the routing table caches the route matched for this request.

use std::collections::HashMap;
use std::sync::Arc;

use http::{HeaderMap, Method};

use crate::querydict::QueryDict;
use crate::routing::MatchedRoute;

/// An incoming HTTP request.
///
/// Instances are created from an axum request with [`HttpRequest::from_axum`]
/// or, in tests, with [`HttpRequest::builder`].
///
/// # Examples
///
/// ```
/// use portico_http::HttpRequest;
///
/// let request = HttpRequest::builder()
///     .method(http::Method::GET)
///     .path("/who/massimo")
///     .query_string("surname=naccari")
///     .build();
///
/// assert_eq!(request.path(), "/who/massimo");
/// assert_eq!(request.get().get("surname"), Some("naccari"));
/// ```
#[derive(Debug)]
pub struct HttpRequest {
    method: Method,
    path: String,
    query_string: String,
    content_type: Option<String>,
    get: QueryDict,
    post: QueryDict,
    headers: HeaderMap,
    meta: HashMap<String, String>,
    body: Vec<u8>,
    scheme: String,
    matched_route: Option<Arc<MatchedRoute>>,
}

impl HttpRequest {
    /// Creates a new [`HttpRequestBuilder`].
    pub fn builder() -> HttpRequestBuilder {
        HttpRequestBuilder::default()
    }

    /// Creates an `HttpRequest` from axum request parts and the collected body.
    pub fn from_axum(parts: http::request::Parts, body: Vec<u8>) -> Self {
        let uri = parts.uri;
        let headers = parts.headers;

        let path = uri.path().to_string();
        let query_string = uri.query().unwrap_or("").to_string();

        let content_type = headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let mut meta = HashMap::new();
        for (name, value) in &headers {
            if let Ok(v) = value.to_str() {
                meta.insert(
                    format!("HTTP_{}", name.as_str().to_uppercase().replace('-', "_")),
                    v.to_string(),
                );
            }
        }
        if let Some(host) = headers.get(http::header::HOST).and_then(|v| v.to_str().ok()) {
            meta.insert("SERVER_NAME".to_string(), host.to_string());
        }
        meta.insert("CONTENT_LENGTH".to_string(), body.len().to_string());

        let scheme = if headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "https")
            || uri.scheme_str() == Some("https")
        {
            "https"
        } else {
            "http"
        };

        HttpRequestBuilder {
            method: parts.method,
            path,
            query_string,
            content_type,
            headers,
            meta,
            body,
            scheme: scheme.to_string(),
        }
        .build()
    }

    /// Returns the HTTP method.
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path (without query string).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the raw query string (without the leading `?`).
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// Returns the content type of the request body, if set.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns the query parameters.
    pub const fn get(&self) -> &QueryDict {
        &self.get
    }

    /// Returns the form-encoded body parameters.
    pub const fn post(&self) -> &QueryDict {
        &self.post
    }

    /// Returns the request headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the server metadata (`REQUEST_METHOD`, `HTTP_*` headers, ...).
    pub const fn meta(&self) -> &HashMap<String, String> {
        &self.meta
    }

    /// Returns the raw request body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the URL scheme (`"http"` or `"https"`).
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Returns `true` if the request arrived over HTTPS.
    pub fn is_secure(&self) -> bool {
        self.scheme == "https"
    }

    /// Returns `true` for `XMLHttpRequest` requests.
    pub fn is_ajax(&self) -> bool {
        self.headers
            .get("x-requested-with")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("xmlhttprequest"))
    }

    /// Returns the host the request was addressed to, port included.
    pub fn host(&self) -> &str {
        self.headers
            .get(http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| self.meta.get("SERVER_NAME").map(String::as_str))
            .unwrap_or("localhost")
    }

    /// Returns the path followed by the query string, if any.
    pub fn full_path(&self) -> String {
        if self.query_string.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query_string)
        }
    }

    /// Returns the route matched for this request, once matched.
    pub const fn matched_route(&self) -> Option<&Arc<MatchedRoute>> {
        self.matched_route.as_ref()
    }

    /// Stores the route matched for this request.
    pub fn set_matched_route(&mut self, matched: Arc<MatchedRoute>) {
        self.matched_route = Some(matched);
    }
}

/// Builder for [`HttpRequest`] values outside a running server.
#[derive(Debug)]
pub struct HttpRequestBuilder {
    method: Method,
    path: String,
    query_string: String,
    content_type: Option<String>,
    headers: HeaderMap,
    meta: HashMap<String, String>,
    body: Vec<u8>,
    scheme: String,
}

impl Default for HttpRequestBuilder {
    fn default() -> Self {
        Self {
            method: Method::GET,
            path: "/".to_string(),
            query_string: String::new(),
            content_type: None,
            headers: HeaderMap::new(),
            meta: HashMap::new(),
            body: Vec::new(),
            scheme: "http".to_string(),
        }
    }
}

impl HttpRequestBuilder {
    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the request path.
    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Sets the query string (without leading `?`).
    #[must_use]
    pub fn query_string(mut self, qs: &str) -> Self {
        self.query_string = qs.to_string();
        self
    }

    /// Sets the content type.
    #[must_use]
    pub fn content_type(mut self, ct: &str) -> Self {
        self.content_type = Some(ct.to_string());
        self
    }

    /// Adds a header. Invalid names or values are ignored.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::header::HeaderName::from_bytes(name.as_bytes()),
            http::header::HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Sets the `Host` header.
    #[must_use]
    pub fn host(self, host: &str) -> Self {
        self.header("host", host)
    }

    /// Sets a form-encoded body.
    #[must_use]
    pub fn form(mut self, body: &str) -> Self {
        self.content_type = Some("application/x-www-form-urlencoded".to_string());
        self.body = body.as_bytes().to_vec();
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Sets the scheme (http or https).
    #[must_use]
    pub fn scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    /// Builds the [`HttpRequest`].
    pub fn build(self) -> HttpRequest {
        let get = QueryDict::parse(&self.query_string);

        let post = if self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        {
            QueryDict::parse(&String::from_utf8_lossy(&self.body))
        } else {
            QueryDict::new()
        };

        let mut meta = self.meta;
        meta.entry("REQUEST_METHOD".to_string())
            .or_insert_with(|| self.method.to_string());
        meta.entry("PATH_INFO".to_string())
            .or_insert_with(|| self.path.clone());
        meta.entry("QUERY_STRING".to_string())
            .or_insert_with(|| self.query_string.clone());

        HttpRequest {
            method: self.method,
            path: self.path,
            query_string: self.query_string,
            content_type: self.content_type,
            get,
            post,
            headers: self.headers,
            meta,
            body: self.body,
            scheme: self.scheme,
            matched_route: None,
        }
    }
}

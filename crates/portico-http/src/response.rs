//! HTTP response types.
//!
//! [`HttpResponse`] is the value controllers, filters and the dispatcher pass
//! around. It converts into an axum response through [`IntoResponse`].

use axum::response::IntoResponse;
use http::{HeaderMap, HeaderValue, StatusCode};

use portico_core::PorticoError;

/// The body of an HTTP response.
#[derive(Clone, PartialEq, Eq)]
pub enum ResponseContent {
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// UTF-8 text.
    Text(String),
}

impl std::fmt::Debug for ResponseContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Self::Text(t) => f
                .debug_tuple("Text")
                .field(&t.chars().take(100).collect::<String>())
                .finish(),
        }
    }
}

/// An HTTP response.
///
/// # Examples
///
/// ```
/// use portico_http::HttpResponse;
///
/// let response = HttpResponse::ok("Hello, World!");
/// assert_eq!(response.status(), http::StatusCode::OK);
/// assert_eq!(response.text(), Some("Hello, World!"));
/// ```
#[derive(Clone)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    content: ResponseContent,
    charset: String,
    content_type: String,
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("charset", &self.charset)
            .field("content", &self.content)
            .finish_non_exhaustive()
    }
}

impl HttpResponse {
    /// Creates a response with the given status code and text body.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            content: ResponseContent::Text(body.into()),
            charset: "utf-8".to_string(),
            content_type: "text/html".to_string(),
        }
    }

    /// Creates a response with the given status code and byte body.
    pub fn with_bytes(status: StatusCode, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            content: ResponseContent::Bytes(body),
            charset: "utf-8".to_string(),
            content_type: "application/octet-stream".to_string(),
        }
    }

    /// Creates a 200 OK response.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// Creates a 404 Not Found response.
    pub fn not_found(body: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, body)
    }

    /// Creates a 400 Bad Request response.
    pub fn bad_request(body: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, body)
    }

    /// Creates a 500 Internal Server Error response.
    pub fn server_error(body: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, body)
    }

    /// Creates a 503 Service Unavailable response.
    pub fn service_unavailable(body: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, body)
    }

    /// Creates a plain-text response describing `error`, with the error's status.
    pub fn from_error(error: &PorticoError) -> Self {
        let status = StatusCode::from_u16(error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = Self::new(status, error.to_string());
        response.set_content_type("text/plain");
        response
    }

    /// Returns the status code.
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status code.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Returns the headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the headers mutably.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Adds a header to the response.
    #[must_use]
    pub fn set_header(mut self, name: http::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns the charset.
    pub fn charset(&self) -> &str {
        &self.charset
    }

    /// Sets the charset.
    pub fn set_charset(&mut self, charset: impl Into<String>) {
        self.charset = charset.into();
    }

    /// Returns the content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Sets the content type.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = content_type.into();
    }

    /// Returns the body.
    pub const fn content(&self) -> &ResponseContent {
        &self.content
    }

    /// Returns the body as bytes.
    pub fn content_bytes(&self) -> &[u8] {
        match &self.content {
            ResponseContent::Bytes(b) => b,
            ResponseContent::Text(t) => t.as_bytes(),
        }
    }

    /// Returns the body as text, if it is a text body.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            ResponseContent::Text(t) => Some(t),
            ResponseContent::Bytes(_) => None,
        }
    }

    /// Returns the `Location` header, if set.
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(http::header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    fn full_content_type(&self) -> String {
        if self.content_type.starts_with("text/") || self.content_type.contains("json") {
            format!("{}; charset={}", self.content_type, self.charset)
        } else {
            self.content_type.clone()
        }
    }
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> axum::response::Response {
        let content_type = HeaderValue::from_str(&self.full_content_type()).ok();
        let body = match self.content {
            ResponseContent::Text(text) => axum::body::Body::from(text),
            ResponseContent::Bytes(bytes) => axum::body::Body::from(bytes),
        };

        let mut response = axum::response::Response::new(body);
        *response.status_mut() = self.status;
        if let Some(content_type) = content_type {
            response
                .headers_mut()
                .insert(http::header::CONTENT_TYPE, content_type);
        }
        for (key, value) in &self.headers {
            response.headers_mut().insert(key, value.clone());
        }
        response
    }
}

/// A JSON response.
pub struct JsonResponse;

impl JsonResponse {
    /// Serializes `data` into a 200 OK `application/json` response.
    ///
    /// A serialization failure yields a 500 response.
    pub fn new<T: serde::Serialize>(data: &T) -> HttpResponse {
        Self::with_status(StatusCode::OK, data)
    }

    /// Serializes `data` into an `application/json` response with `status`.
    pub fn with_status<T: serde::Serialize>(status: StatusCode, data: &T) -> HttpResponse {
        match serde_json::to_string(data) {
            Ok(json) => {
                let mut response = HttpResponse::new(status, json);
                response.set_content_type("application/json");
                response
            }
            Err(e) => HttpResponse::server_error(format!("JSON serialization error: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_defaults() {
        let resp = HttpResponse::ok("Hello");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.content_type(), "text/html");
        assert_eq!(resp.charset(), "utf-8");
        assert_eq!(resp.content_bytes(), b"Hello");
    }

    #[test]
    fn test_status_shortcuts() {
        assert_eq!(HttpResponse::not_found("").status(), StatusCode::NOT_FOUND);
        assert_eq!(HttpResponse::bad_request("").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            HttpResponse::server_error("").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            HttpResponse::service_unavailable("").status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_from_error_uses_status_code() {
        let resp = HttpResponse::from_error(&PorticoError::RouteNotFound("home".into()));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.content_type(), "text/plain");
        assert!(resp.text().is_some_and(|t| t.contains("home")));
    }

    #[test]
    fn test_bytes_body_has_no_text() {
        let resp = HttpResponse::with_bytes(StatusCode::OK, vec![0, 1]);
        assert_eq!(resp.text(), None);
        assert_eq!(resp.content_bytes(), &[0, 1]);
    }

    #[test]
    fn test_json_response() {
        let resp = JsonResponse::new(&serde_json::json!({"name": "Massimo"}));
        assert_eq!(resp.content_type(), "application/json");
        assert_eq!(resp.text(), Some(r#"{"name":"Massimo"}"#));
    }

    #[test]
    fn test_into_response_headers() {
        let resp = HttpResponse::ok("x").set_header(
            http::header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        );
        let axum_resp = resp.into_response();
        assert_eq!(axum_resp.status(), StatusCode::OK);
        assert_eq!(
            axum_resp.headers().get(http::header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        assert_eq!(
            axum_resp.headers().get(http::header::CACHE_CONTROL).unwrap(),
            "no-cache"
        );
    }
}

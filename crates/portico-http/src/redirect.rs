//! Redirect helpers.
//!
//! The routing table resolves a redirect target (absolute URI, path, or
//! route name) into a location; this module normalizes that location and
//! turns it into a response.

use http::{HeaderValue, StatusCode};

use crate::response::HttpResponse;

/// Returns `true` if `candidate` is an absolute URI with a host
/// (`https://example.com/x`, `ftp://host/file`).
///
/// # Examples
///
/// ```
/// use portico_http::redirect::is_valid_uri;
///
/// assert!(is_valid_uri("https://example.com/signin"));
/// assert!(!is_valid_uri("/signin"));
/// assert!(!is_valid_uri("home"));
/// ```
pub fn is_valid_uri(candidate: &str) -> bool {
    url::Url::parse(candidate).is_ok_and(|url| url.has_host())
}

/// Returns `true` for absolute paths (`/signin`).
pub fn is_absolute_path(candidate: &str) -> bool {
    candidate.starts_with('/')
}

/// Ensures a leading `/` and collapses runs of `/`.
///
/// # Examples
///
/// ```
/// use portico_http::redirect::normalize_url;
///
/// assert_eq!(normalize_url("who//massimo"), "/who/massimo");
/// assert_eq!(normalize_url(""), "/");
/// ```
pub fn normalize_url(url: &str) -> String {
    let mut normalized = String::with_capacity(url.len() + 1);
    normalized.push('/');
    for c in url.chars() {
        if c == '/' && normalized.ends_with('/') {
            continue;
        }
        normalized.push(c);
    }
    normalized
}

/// Returns the status used for a redirect with `code`.
///
/// Codes outside the 3xx range, or unknown to [`StatusCode`], fall back to
/// 302 Found.
pub fn redirect_status(code: u16) -> StatusCode {
    StatusCode::from_u16(code)
        .ok()
        .filter(|status| status.is_redirection() && status.canonical_reason().is_some())
        .unwrap_or(StatusCode::FOUND)
}

/// Builds a redirect response to `location`.
///
/// A location that is not a valid header value is replaced by `/`, so the
/// response always carries a `Location` header.
///
/// # Examples
///
/// ```
/// use portico_http::redirect::redirect_response;
///
/// let response = redirect_response("/signin", 999);
/// assert_eq!(response.status(), http::StatusCode::FOUND);
/// assert_eq!(response.location(), Some("/signin"));
/// ```
pub fn redirect_response(location: &str, code: u16) -> HttpResponse {
    let status = redirect_status(code);
    tracing::info!(
        location,
        status = status.as_u16(),
        reason = status.canonical_reason().unwrap_or_default(),
        "redirecting"
    );
    let value = HeaderValue::from_str(location).unwrap_or_else(|_| {
        tracing::warn!(location, "redirect location is not a valid header value, using '/'");
        HeaderValue::from_static("/")
    });
    let mut response = HttpResponse::new(status, "");
    response.headers_mut().insert(http::header::LOCATION, value);
    response
}

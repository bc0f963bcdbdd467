//! Core error types for the portico framework.
//!
//! [`PorticoError`] is the single error type shared by every crate in the
//! workspace. Configuration problems (bad route patterns, missing controller
//! parameters, unknown validator resolvers) fail fast when the routing table is
//! loaded; dispatch problems (forward loops, controllers returning values the
//! execution filter cannot interpret) surface while a request is handled.
//!
//! A route that simply does not match is never an error. The routing table
//! answers it with a synthesized not-found route instead.

use thiserror::Error;

/// The primary error type for the portico framework.
///
/// Each variant maps to an HTTP status code via [`PorticoError::status_code`].
#[derive(Error, Debug)]
pub enum PorticoError {
    // ── HTTP errors ──────────────────────────────────────────────────

    /// HTTP 400 Bad Request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// HTTP 404 Not Found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP 405 Method Not Allowed.
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// HTTP 503, raised while an application is switched off for maintenance.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// HTTP 500 Internal Server Error.
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The framework is improperly configured.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    /// A route pattern could not be parsed.
    #[error("Invalid route pattern '{pattern}': {reason}")]
    InvalidRoutePattern {
        /// The offending pattern.
        pattern: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A route was declared without a `_controller` parameter.
    #[error("Route '{0}' does not define a _controller parameter")]
    MissingControllerParameter(String),

    /// A validator refers to a collaborator that was never registered.
    #[error("Missing validator dependency: {0}")]
    MissingValidatorDependency(String),

    // ── Routing ──────────────────────────────────────────────────────

    /// A route name was looked up but is not registered.
    #[error("Route '{0}' is not registered")]
    RouteNotFound(String),

    /// A direct script invocation carried a raw `p` parameter while
    /// query-string dispatch is switched off.
    #[error("Query-string dispatch is not allowed: {0}")]
    QueryStringDispatchDisallowed(String),

    /// The request's host does not belong to any configured application.
    #[error("Domain '{0}' is not registered")]
    DomainNotRegistered(String),

    // ── Dispatch ─────────────────────────────────────────────────────

    /// More forwards than allowed happened while serving one request.
    #[error("Too many forwards ({count}) while dispatching {controller}::{action}")]
    ForwardLimitExceeded {
        /// Number of forwards attempted, including the rejected one.
        count: usize,
        /// Controller of the rejected forward.
        controller: String,
        /// Action of the rejected forward.
        action: String,
    },

    /// No controller is registered under the requested name.
    #[error("Controller '{0}' is not registered")]
    ControllerNotFound(String),

    /// A controller action produced a value the execution filter cannot use.
    #[error("Controller {controller}::{action} returned an invalid value: {found}")]
    InvalidControllerReturn {
        /// The controller that produced the value.
        controller: String,
        /// The action that produced the value.
        action: String,
        /// Short description of the rejected value.
        found: String,
    },

    /// The application is disabled by configuration.
    #[error("Application '{0}' is disabled")]
    ApplicationDisabled(String),

    // ── Templates ────────────────────────────────────────────────────

    /// The requested template was not found.
    #[error("Template does not exist: {0}")]
    TemplateDoesNotExist(String),

    /// A template failed to parse or render.
    #[error("Template error: {0}")]
    TemplateError(String),

    // ── Serialization ────────────────────────────────────────────────

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PorticoError {
    /// Returns the HTTP status code associated with this error.
    ///
    /// - `BadRequest`, `QueryStringDispatchDisallowed` -> 400
    /// - `NotFound`, `RouteNotFound`, `DomainNotRegistered` -> 404
    /// - `MethodNotAllowed` -> 405
    /// - `ServiceUnavailable`, `ApplicationDisabled` -> 503
    /// - Everything else -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) | Self::QueryStringDispatchDisallowed(_) => 400,
            Self::NotFound(_) | Self::RouteNotFound(_) | Self::DomainNotRegistered(_) => 404,
            Self::MethodNotAllowed(_) => 405,
            Self::ServiceUnavailable(_) | Self::ApplicationDisabled(_) => 503,
            Self::InternalServerError(_)
            | Self::ConfigurationError(_)
            | Self::ImproperlyConfigured(_)
            | Self::InvalidRoutePattern { .. }
            | Self::MissingControllerParameter(_)
            | Self::MissingValidatorDependency(_)
            | Self::ForwardLimitExceeded { .. }
            | Self::ControllerNotFound(_)
            | Self::InvalidControllerReturn { .. }
            | Self::TemplateDoesNotExist(_)
            | Self::TemplateError(_)
            | Self::SerializationError(_)
            | Self::IoError(_) => 500,
        }
    }

    /// Returns `true` for errors raised while building the route table or
    /// application, as opposed to errors raised while serving a request.
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationError(_)
                | Self::ImproperlyConfigured(_)
                | Self::InvalidRoutePattern { .. }
                | Self::MissingControllerParameter(_)
                | Self::MissingValidatorDependency(_)
        )
    }
}

impl From<serde_json::Error> for PorticoError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// A convenience type alias for `Result<T, PorticoError>`.
pub type PorticoResult<T> = Result<T, PorticoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portico_error_status_codes() {
        assert_eq!(PorticoError::BadRequest("x".into()).status_code(), 400);
        assert_eq!(PorticoError::NotFound("x".into()).status_code(), 404);
        assert_eq!(PorticoError::RouteNotFound("x".into()).status_code(), 404);
        assert_eq!(PorticoError::DomainNotRegistered("x".into()).status_code(), 404);
        assert_eq!(PorticoError::MethodNotAllowed("x".into()).status_code(), 405);
        assert_eq!(PorticoError::ApplicationDisabled("x".into()).status_code(), 503);
        assert_eq!(
            PorticoError::QueryStringDispatchDisallowed("x".into()).status_code(),
            400
        );
        assert_eq!(
            PorticoError::ForwardLimitExceeded {
                count: 6,
                controller: "A".into(),
                action: "b".into(),
            }
            .status_code(),
            500
        );
        assert_eq!(PorticoError::TemplateError("x".into()).status_code(), 500);
    }

    #[test]
    fn test_portico_error_display() {
        let err = PorticoError::MissingControllerParameter("home".into());
        assert_eq!(
            err.to_string(),
            "Route 'home' does not define a _controller parameter"
        );

        let err = PorticoError::InvalidRoutePattern {
            pattern: "who".into(),
            reason: "must start with '/'".into(),
        };
        assert!(err.to_string().contains("'who'"));
    }

    #[test]
    fn test_is_configuration_error() {
        assert!(PorticoError::MissingValidatorDependency("x".into()).is_configuration_error());
        assert!(PorticoError::InvalidRoutePattern {
            pattern: "x".into(),
            reason: "y".into(),
        }
        .is_configuration_error());
        assert!(!PorticoError::NotFound("x".into()).is_configuration_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: PorticoError = io_err.into();
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: PorticoError = json_err.into();
        assert!(matches!(err, PorticoError::SerializationError(_)));
    }
}

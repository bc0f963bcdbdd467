//! Logging integration for the portico framework.
//!
//! Provides helpers for configuring [`tracing`]-based logging from
//! [`Settings`](crate::settings::Settings) and for creating per-request spans.
//! Routing, the filter chain and the dispatcher log through `tracing` macros;
//! nothing is printed until a subscriber is installed.

use crate::settings::Settings;

/// Installs the global tracing subscriber based on the given settings.
///
/// The log level is read from `settings.log_level` (e.g. "debug", "info",
/// "portico_http=debug,info"). In debug mode a pretty, human-readable format
/// is used; otherwise a structured JSON format is used.
///
/// Calling this more than once is harmless: later calls leave the first
/// subscriber in place.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span for one dispatched request.
///
/// # Examples
///
/// ```
/// use portico_core::logging::request_span;
///
/// let span = request_span("abc-123", "/who/massimo");
/// let _guard = span.enter();
/// tracing::info!("handling request");
/// ```
pub fn request_span(request_id: &str, path: &str) -> tracing::Span {
    tracing::info_span!("request", id = request_id, path = path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_twice_does_not_panic() {
        let mut settings = Settings::default();
        settings.log_level = "not a level ===".to_string();
        setup_logging(&settings);
        settings.debug = false;
        setup_logging(&settings);
    }

    #[test]
    fn test_request_span_metadata() {
        let span = request_span("req-1", "/");
        if let Some(meta) = span.metadata() {
            assert_eq!(meta.name(), "request");
        }
    }
}

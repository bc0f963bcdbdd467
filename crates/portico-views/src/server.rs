//! HTTP server integration.
//!
//! Dispatching is synchronous: routing, controllers and rendering run to
//! completion on one thread. The axum adapter collects the request body,
//! then runs [`Project::handle`] on tokio's blocking pool, one dispatcher
//! per request, inside a request span tagged with a fresh request id.
//!
//! # Examples
//!
//! ```no_run
//! use portico_core::Settings;
//! use portico_views::application::{Application, Project};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let app = Application::builder(Settings::default()).build()?;
//! Project::single(app).run("0.0.0.0:8000").await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::response::IntoResponse;
use axum::routing::any;
use http::HeaderValue;
use tower_http::trace::TraceLayer;

use portico_core::logging::request_span;
use portico_core::PorticoError;
use portico_http::{HttpRequest, HttpResponse};

use crate::application::Project;

/// Response header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

impl Project {
    /// Converts the project into an axum router answering every path.
    pub fn into_axum_router(self) -> axum::Router {
        let project = Arc::new(self);

        let handler = move |req: Request<Body>| {
            let project = Arc::clone(&project);

            async move {
                let (parts, body) = req.into_parts();
                let body_bytes = axum::body::to_bytes(body, usize::MAX)
                    .await
                    .unwrap_or_default()
                    .to_vec();
                let request = HttpRequest::from_axum(parts, body_bytes);

                let request_id = uuid::Uuid::new_v4().to_string();
                let span = request_span(&request_id, request.path());

                let response = tokio::task::spawn_blocking(move || {
                    let _guard = span.enter();
                    project.handle(request)
                })
                .await
                .unwrap_or_else(|e| {
                    tracing::error!(request_id = %request_id, error = %e, "dispatcher task failed");
                    HttpResponse::server_error("Internal Server Error")
                });

                let mut response = response.into_response();
                if let Ok(value) = HeaderValue::from_str(&request_id) {
                    response.headers_mut().insert(REQUEST_ID_HEADER, value);
                }
                response
            }
        };

        axum::Router::new()
            .route("/{*path}", any(handler.clone()))
            .route("/", any(handler))
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the project as an HTTP server on `addr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the address or encounters
    /// a runtime error.
    pub async fn run(self, addr: &str) -> Result<(), PorticoError> {
        let domains: Vec<String> = self.domains().map(str::to_string).collect();
        let router = self.into_axum_router();
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            PorticoError::ImproperlyConfigured(format!("Failed to bind to {addr}: {e}"))
        })?;

        tracing::info!(?domains, "Starting server at http://{addr}/");

        axum::serve(listener, router)
            .await
            .map_err(|e| PorticoError::InternalServerError(format!("Server error: {e}")))?;

        Ok(())
    }
}

//! # portico
//!
//! A multi-site MVC web framework for Rust.
//!
//! This is the meta-crate that re-exports the sub-crates for convenient access.
//! Depend on `portico` to get the whole framework, or on individual crates
//! for finer-grained control.
//!
//! ```no_run
//! use portico::prelude::*;
//!
//! # async fn example() -> Result<(), PorticoError> {
//! let settings = Settings::default();
//! let app = Application::builder(settings)
//!     .controller(FnController::new("Homepage").action("index", |_| Ok(ActionResult::text("hello"))))
//!     .build()?;
//! Project::single(app).run("127.0.0.1:8000").await
//! # }
//! ```

/// Core types, settings, logging, and error types.
pub use portico_core as core;

/// HTTP layer: Request, Response, token routing and redirects.
#[cfg(feature = "http")]
pub use portico_http as http;

/// Controllers, the filter chain, the dispatcher and the axum adapter.
#[cfg(feature = "views")]
pub use portico_views as views;

// Third-party re-exports
pub use axum;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tower_http;
pub use tracing;
pub use tracing_subscriber;

/// The types most applications need.
pub mod prelude {
    pub use portico_core::{PorticoError, PorticoResult, Settings};

    #[cfg(feature = "http")]
    pub use portico_http::{HttpRequest, HttpResponse, JsonResponse};

    #[cfg(feature = "views")]
    pub use portico_views::{
        ActionResult, Application, Controller, Dispatcher, FnController, Project,
    };
}

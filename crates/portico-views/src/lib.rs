//! # portico-views
//!
//! Dispatch layer for the portico framework. A matched request is forwarded
//! to its controller through a filter chain; the execution filter runs the
//! controller action and the rendering filter renders its template.
//!
//! ## Modules
//!
//! - [`controller`] - The `Controller` trait, action results, and the controller registry
//! - [`filter`] - The filter chain with its execution and rendering filters
//! - [`dispatcher`] - Per-request dispatch, forwards, redirects and output buffering
//! - [`view`] - View state and the Tera renderer
//! - [`application`] - Applications and multi-site projects
//! - [`server`] - The axum adapter

pub mod application;
pub mod controller;
pub mod dispatcher;
pub mod filter;
pub mod server;
pub mod view;

pub use application::{Application, ApplicationBuilder, Project};
pub use controller::{ActionResult, Controller, ControllerRegistry, FnController};
pub use dispatcher::Dispatcher;
pub use filter::{Filter, FilterChain, Next};
pub use view::{Renderer, TeraRenderer, ViewState};

//! # Frontend demo
//!
//! A small site served by portico:
//!
//! - **Routes**: declared in `config/routing.toml`, including a template
//!   route and a redirect route
//! - **Controllers**: `Homepage` implements `Controller`; `StaticContent`
//!   and `Security` are closure controllers
//! - **Templates**: Tera templates decorated with `layouts/layout`
//! - **Settings**: `config/frontend.toml`, overridable with `PORTICO_*`
//!   environment variables
//!
//! ## Running
//!
//! ```bash
//! cargo run --package frontend-demo
//! ```
//!
//! Then visit `http://localhost:8000/`, `/who/massimo?surname=naccari`,
//! `/people/massimo` (redirects to `/who/massimo`), `/info/anything` or
//! `/index.php?p=StaticContent&_action=contact`.

mod controllers;

use std::path::Path;

use portico_core::logging::setup_logging;
use portico_core::{settings_loader, PorticoError, Settings};
use portico_views::application::{Application, Project};

const ADDRESS: &str = "127.0.0.1:8000";

fn load_settings() -> Result<Settings, PorticoError> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut settings = settings_loader::from_toml_file_with_env(root.join("config/frontend.toml"))?;

    settings.routing.routes_file = settings.routing.routes_file.map(|file| root.join(file));
    settings.views.template_dirs = settings
        .views
        .template_dirs
        .iter()
        .map(|dir| root.join(dir))
        .collect();
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<(), PorticoError> {
    let settings = load_settings()?;
    setup_logging(&settings);

    let app = controllers::install(Application::builder(settings)).build()?;
    tracing::info!(
        application = app.name(),
        routes = app.routing().len(),
        "frontend configured"
    );

    Project::single(app).run(ADDRESS).await
}

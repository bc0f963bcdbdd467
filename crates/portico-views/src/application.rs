//! Applications and projects.
//!
//! An [`Application`] is one site: its settings, routing table, controllers,
//! renderer and extra filters. A [`Project`] serves several applications
//! from one process and picks the application by the request's host.
//!
//! Both are immutable once built and can be shared between threads; every
//! request gets its own [`Dispatcher`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;

use portico_core::{PorticoError, PorticoResult, Settings};
use portico_http::routing::{RouteCache, ValidatorRegistry};
use portico_http::{HttpRequest, HttpResponse, Route, RoutingTable};

use crate::controller::{Controller, ControllerRegistry, FnController};
use crate::dispatcher::Dispatcher;
use crate::filter::Filter;
use crate::view::{Renderer, TeraRenderer};

/// One site served by the dispatcher.
///
/// # Examples
///
/// ```
/// use portico_core::Settings;
/// use portico_http::{HttpRequest, Route, RouteParams};
/// use portico_views::application::Application;
/// use portico_views::controller::{ActionResult, FnController};
///
/// let mut params = RouteParams::new();
/// params.insert("_controller", "Homepage");
///
/// let app = Application::builder(Settings::default())
///     .route(Route::new("home", "/", params).unwrap())
///     .controller(FnController::new("Homepage").action("index", |_| Ok(ActionResult::text("Hello!"))))
///     .build()
///     .unwrap();
///
/// let response = app.handle(HttpRequest::builder().path("/").build());
/// assert_eq!(response.text(), Some("Hello!"));
/// ```
pub struct Application {
    settings: Settings,
    routing: RoutingTable,
    controllers: ControllerRegistry,
    renderer: Arc<dyn Renderer>,
    filters: Vec<Arc<dyn Filter>>,
}

impl Application {
    /// Creates an [`ApplicationBuilder`].
    pub fn builder(settings: Settings) -> ApplicationBuilder {
        ApplicationBuilder::new(settings)
    }

    /// Returns the application name.
    pub fn name(&self) -> &str {
        &self.settings.application_name
    }

    /// Returns the settings.
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the routing table.
    pub const fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    /// Returns the controller registry.
    pub const fn controllers(&self) -> &ControllerRegistry {
        &self.controllers
    }

    /// Returns the renderer.
    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    /// Returns the filters added between rendering and execution.
    pub fn filters(&self) -> &[Arc<dyn Filter>] {
        &self.filters
    }

    /// Handles one request, converting errors into responses.
    ///
    /// A disabled application answers 503 with its maintenance message.
    /// Other errors answer with their status; the message is only shown in
    /// debug mode.
    pub fn handle(&self, request: HttpRequest) -> HttpResponse {
        let path = request.path().to_string();
        match Dispatcher::dispatch(self, request) {
            Ok(response) => response,
            Err(PorticoError::ApplicationDisabled(name)) => {
                tracing::warn!(application = %name, path = %path, "application disabled");
                HttpResponse::service_unavailable(self.settings.maintenance_message.clone())
            }
            Err(e) => {
                tracing::error!(application = self.name(), path = %path, error = %e, "request failed");
                if self.settings.debug {
                    return HttpResponse::from_error(&e);
                }
                let status = StatusCode::from_u16(e.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let mut response =
                    HttpResponse::new(status, status.canonical_reason().unwrap_or("Error"));
                response.set_content_type("text/plain");
                response
            }
        }
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.settings.application_name)
            .field("routes", &self.routing.len())
            .field("controllers", &self.controllers)
            .field("filters", &self.filters)
            .field("debug", &self.settings.debug)
            .finish_non_exhaustive()
    }
}

/// Builds an [`Application`].
///
/// Routes come from the route file named in the routing settings (through
/// the snapshot cache when `cache_dir` is set), followed by the routes added
/// with [`ApplicationBuilder::route`]. Routes added with
/// [`ApplicationBuilder::prepend_route`] go in front of everything.
///
/// Added routes get the configured routing extension, like routes from the
/// file, unless they already carry one.
pub struct ApplicationBuilder {
    settings: Settings,
    validators: ValidatorRegistry,
    routes: Vec<Route>,
    prepended: Vec<Route>,
    controllers: ControllerRegistry,
    renderer: Option<Arc<dyn Renderer>>,
    filters: Vec<Arc<dyn Filter>>,
}

impl ApplicationBuilder {
    /// Creates a builder with the built-in controllers registered.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            validators: ValidatorRegistry::new(),
            routes: Vec::new(),
            prepended: Vec::new(),
            controllers: ControllerRegistry::with_builtins(),
            renderer: None,
            filters: Vec::new(),
        }
    }

    /// Sets the resolvers available to validators in the route file.
    #[must_use]
    pub fn validators(mut self, validators: ValidatorRegistry) -> Self {
        self.validators = validators;
        self
    }

    /// Appends a route after the route file's routes.
    #[must_use]
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Puts a route in front of every other route.
    #[must_use]
    pub fn prepend_route(mut self, route: Route) -> Self {
        self.prepended.push(route);
        self
    }

    /// Registers a closure-based controller.
    #[must_use]
    pub fn controller(mut self, controller: FnController) -> Self {
        self.controllers.register_fn(controller);
        self
    }

    /// Registers a controller factory under `name`.
    #[must_use]
    pub fn controller_factory<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Controller> + Send + Sync + 'static,
    {
        self.controllers.register(name, factory);
        self
    }

    /// Replaces the renderer. By default templates are loaded from the
    /// configured template directories.
    #[must_use]
    pub fn renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    /// Adds a filter between the rendering and execution filters.
    #[must_use]
    pub fn filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Builds the application.
    ///
    /// # Errors
    ///
    /// Returns route file and route configuration errors, and template
    /// errors when loading the default renderer.
    pub fn build(self) -> PorticoResult<Application> {
        let mut routing = RoutingTable::from_settings(&self.settings);

        if let Some(path) = &self.settings.routing.routes_file {
            let cache = self.settings.routing.cache_dir.clone().map(RouteCache::new);
            routing.load_file(path, &self.validators, cache.as_ref())?;
        }
        let extension = self.settings.routing.extension.as_deref();
        for route in self.routes {
            routing.append(apply_extension(route, extension)?);
        }
        for route in self.prepended.into_iter().rev() {
            routing.prepend(apply_extension(route, extension)?);
        }

        let renderer = match self.renderer {
            Some(renderer) => renderer,
            None => Arc::new(TeraRenderer::from_dirs(
                &self.settings.views.template_dirs,
                &self.settings.views.template_extension,
            )?),
        };

        tracing::debug!(
            application = %self.settings.application_name,
            routes = routing.len(),
            controllers = self.controllers.names().len(),
            "application built"
        );

        Ok(Application {
            settings: self.settings,
            routing,
            controllers: self.controllers,
            renderer,
            filters: self.filters,
        })
    }
}

fn apply_extension(route: Route, extension: Option<&str>) -> PorticoResult<Route> {
    if route.extension().is_some() {
        return Ok(route);
    }
    route.with_extension(extension)
}

impl fmt::Debug for ApplicationBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationBuilder")
            .field("name", &self.settings.application_name)
            .field("routes", &(self.routes.len() + self.prepended.len()))
            .field("controllers", &self.controllers)
            .field("has_renderer", &self.renderer.is_some())
            .finish_non_exhaustive()
    }
}

/// Several applications served from one process, selected by host.
///
/// # Examples
///
/// ```
/// use portico_core::Settings;
/// use portico_views::application::{Application, Project};
///
/// let mut settings = Settings::default();
/// settings.domains.insert("www.example.com".into(), "example".into());
/// let project = Project::new().application(Application::builder(settings).build().unwrap());
///
/// assert!(project.application_for_host("www.example.com:8080").is_ok());
/// assert!(project.application_for_host("other.com").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Project {
    applications: BTreeMap<String, Arc<Application>>,
    default: Option<Arc<Application>>,
}

impl Project {
    /// Creates a project without applications.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a project answering every host with `app`.
    pub fn single(app: Application) -> Self {
        Self::new().default_application(app)
    }

    /// Registers `app` for every domain in its settings.
    #[must_use]
    pub fn application(mut self, app: Application) -> Self {
        let app = Arc::new(app);
        if app.settings().domains.is_empty() {
            tracing::warn!(application = app.name(), "application has no domains");
        }
        for domain in app.settings().domains.keys() {
            self.applications.insert(domain.clone(), Arc::clone(&app));
        }
        self
    }

    /// Registers `app` for its domains and for every unknown host.
    #[must_use]
    pub fn default_application(mut self, app: Application) -> Self {
        let app = Arc::new(app);
        for domain in app.settings().domains.keys() {
            self.applications.insert(domain.clone(), Arc::clone(&app));
        }
        self.default = Some(app);
        self
    }

    /// Returns the configured domains.
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.applications.keys().map(String::as_str)
    }

    /// Returns the application serving `host` (a port suffix is ignored).
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::DomainNotRegistered`] when no application
    /// serves `host` and there is no default application.
    pub fn application_for_host(&self, host: &str) -> PorticoResult<&Arc<Application>> {
        let domain = host.split(':').next().unwrap_or(host);
        self.applications
            .get(domain)
            .or(self.default.as_ref())
            .ok_or_else(|| PorticoError::DomainNotRegistered(domain.to_string()))
    }

    /// Handles one request with the application serving its host.
    pub fn handle(&self, request: HttpRequest) -> HttpResponse {
        match self.application_for_host(request.host()) {
            Ok(app) => app.handle(request),
            Err(e) => {
                tracing::warn!(host = request.host(), "no application for host");
                HttpResponse::from_error(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use portico_http::RouteParams;

    use super::*;
    use crate::controller::ActionResult;

    fn settings(name: &str, domain: &str) -> Settings {
        let mut settings = Settings::default();
        settings.application_name = name.to_string();
        settings.views.rendering = false;
        settings.domains.insert(domain.to_string(), name.to_string());
        settings
    }

    fn site(name: &str, domain: &str) -> Application {
        let mut params = RouteParams::new();
        params.insert("_controller", "Homepage");
        let body = format!("welcome to {name}");
        Application::builder(settings(name, domain))
            .route(Route::new("home", "/", params).unwrap())
            .controller(
                FnController::new("Homepage")
                    .action("index", move |_| Ok(ActionResult::text(body.clone()))),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_route_order() {
        let mut params = RouteParams::new();
        params.insert("_controller", "StaticContent");
        let app = Application::builder(Settings::default())
            .route(Route::new("static", "/:_action", params.clone()).unwrap())
            .prepend_route(Route::new("first", "/first", params.clone()).unwrap())
            .prepend_route(Route::new("second", "/second", params).unwrap())
            .build()
            .unwrap();
        let names: Vec<&str> = app.routing().iter().map(|route| route.name()).collect();
        assert_eq!(names, vec!["first", "second", "static"]);
    }

    #[test]
    fn test_builder_routes_get_routing_extension() {
        let mut settings = Settings::default();
        settings.routing.extension = Some("html".into());
        let mut params = RouteParams::new();
        params.insert("_controller", "StaticContent");
        let app = Application::builder(settings)
            .route(Route::new("who", "/who/:name", params.clone()).unwrap())
            .prepend_route(Route::new("feed", "/feed", params.clone()).unwrap())
            .route(
                Route::new("data", "/data", params)
                    .unwrap()
                    .with_extension(Some("json"))
                    .unwrap(),
            )
            .build()
            .unwrap();
        let routing = app.routing();

        let mut name = RouteParams::new();
        name.insert("name", "massimo");
        assert_eq!(routing.url_for("who", &name, false).unwrap(), "/who/massimo.html");
        assert_eq!(routing.url_for("feed", &RouteParams::new(), false).unwrap(), "/feed.html");
        assert_eq!(routing.match_path("/who/massimo.html").unwrap().name(), "who");
        assert_eq!(routing.match_path("/feed.html").unwrap().name(), "feed");
        assert_eq!(routing.get("data").unwrap().extension(), Some("json"));
    }

    #[test]
    fn test_handle_disabled_application() {
        let mut settings = settings("frontend", "www.example.com");
        settings.disabled = true;
        settings.maintenance_message = "back soon".into();
        let app = Application::builder(settings).build().unwrap();
        let response = app.handle(HttpRequest::builder().build());
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.text(), Some("back soon"));
    }

    #[test]
    fn test_handle_hides_errors_outside_debug() {
        let mut settings = settings("frontend", "www.example.com");
        settings.debug = false;
        let mut params = RouteParams::new();
        params.insert("_controller", "Missing");
        let app = Application::builder(settings)
            .route(Route::new("home", "/", params).unwrap())
            .build()
            .unwrap();
        let response = app.handle(HttpRequest::builder().build());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.text(), Some("Internal Server Error"));
    }

    #[test]
    fn test_project_routes_by_host() {
        let project = Project::new()
            .application(site("frontend", "www.example.com"))
            .application(site("backend", "admin.example.com"));
        assert_eq!(
            project.domains().collect::<Vec<_>>(),
            vec!["admin.example.com", "www.example.com"]
        );

        let response = project.handle(HttpRequest::builder().host("admin.example.com").build());
        assert_eq!(response.text(), Some("welcome to backend"));
        let response = project.handle(HttpRequest::builder().host("www.example.com:80").build());
        assert_eq!(response.text(), Some("welcome to frontend"));

        let response = project.handle(HttpRequest::builder().host("unknown.com").build());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_project_default_application() {
        let project = Project::single(site("frontend", "www.example.com"));
        let app = project.application_for_host("anything.local").unwrap();
        assert_eq!(app.name(), "frontend");
    }

    #[test]
    fn test_debug_format() {
        let app = site("frontend", "www.example.com");
        let debug = format!("{app:?}");
        assert!(debug.contains("Application"));
        assert!(debug.contains("frontend"));
        assert!(debug.contains("routes: 1"));
    }
}

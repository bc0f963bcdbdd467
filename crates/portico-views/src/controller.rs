//! Controllers and the controller registry.
//!
//! A controller handles the actions of one route family. The dispatcher
//! resolves a controller by name through the application's
//! [`ControllerRegistry`], creates it at most once per request, calls
//! [`Controller::configure`] on the fresh instance, and then runs its
//! actions through the filter chain.
//!
//! An action returns an [`ActionResult`], which the execution filter turns
//! into a response, buffered output, view variables, a forward, or a
//! redirect.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use serde_json::{Map, Value};

use portico_core::{PorticoError, PorticoResult};
use portico_http::routing::route::TEMPLATE_CONTROLLER;
use portico_http::HttpResponse;

use crate::application::Application;
use crate::dispatcher::Dispatcher;

/// Name the built-in not-found controller is registered under.
pub const NOT_FOUND_CONTROLLER: &str = "NotFound";

/// Template rendered by [`NotFoundController`] when the application has one.
pub const NOT_FOUND_TEMPLATE: &str = "errors/404";

/// What a controller action produced.
#[derive(Debug, Clone)]
pub enum ActionResult {
    /// A complete response. Rendering is skipped and buffered output is
    /// discarded.
    Response(HttpResponse),
    /// A literal body. Rendering is skipped.
    Text(String),
    /// Variables for the action template.
    Variables(Map<String, Value>),
    /// A dynamically shaped result: strings are bodies, objects are
    /// variables, anything else is rejected.
    Value(Value),
    /// Continue with another controller action.
    Forward {
        /// Target controller.
        controller: String,
        /// Target action.
        action: String,
    },
    /// Redirect to a URI, a path, or a route name.
    Redirect {
        /// Redirect target.
        target: String,
        /// HTTP status code.
        code: u16,
    },
    /// Forward to the configured not-found controller.
    NotFound(String),
}

impl ActionResult {
    /// Renders the action template without extra variables.
    pub fn render() -> Self {
        Self::Variables(Map::new())
    }

    /// A literal body.
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text(body.into())
    }

    /// Forwards to `controller::action`.
    pub fn forward(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Forward {
            controller: controller.into(),
            action: action.into(),
        }
    }

    /// A 302 redirect to `target`.
    pub fn redirect(target: impl Into<String>) -> Self {
        Self::Redirect {
            target: target.into(),
            code: StatusCode::FOUND.as_u16(),
        }
    }

    /// A not-found forward.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl From<HttpResponse> for ActionResult {
    fn from(response: HttpResponse) -> Self {
        Self::Response(response)
    }
}

impl From<Map<String, Value>> for ActionResult {
    fn from(variables: Map<String, Value>) -> Self {
        Self::Variables(variables)
    }
}

/// A controller.
///
/// Instances are created per request and shared by every forward that
/// reaches the same controller within that request, so per-request state
/// belongs in the [`Dispatcher`] (view variables, parameters) rather than in
/// the controller.
///
/// # Examples
///
/// ```
/// use portico_core::PorticoResult;
/// use portico_views::controller::{ActionResult, Controller};
/// use portico_views::dispatcher::Dispatcher;
///
/// struct Homepage;
///
/// impl Controller for Homepage {
///     fn handle(&self, action: &str, dispatcher: &mut Dispatcher<'_>) -> PorticoResult<ActionResult> {
///         match action {
///             "index" => {
///                 dispatcher.view_mut().add_variable("title", "Home".into());
///                 Ok(ActionResult::render())
///             }
///             other => Ok(ActionResult::not_found(format!("no action {other}"))),
///         }
///     }
/// }
/// ```
pub trait Controller: Send + Sync {
    /// Called once on a fresh instance, before its first action runs.
    fn configure(&mut self, _app: &Application) -> PorticoResult<()> {
        Ok(())
    }

    /// Called before every action.
    fn pre_execute(&self, _dispatcher: &mut Dispatcher<'_>) -> PorticoResult<()> {
        Ok(())
    }

    /// Runs `action`.
    fn handle(&self, action: &str, dispatcher: &mut Dispatcher<'_>)
        -> PorticoResult<ActionResult>;

    /// Called after every action whose result did not end the request.
    fn post_execute(&self, _dispatcher: &mut Dispatcher<'_>) -> PorticoResult<()> {
        Ok(())
    }
}

/// The closure type of a [`FnController`] action.
pub type ActionFn =
    Arc<dyn Fn(&mut Dispatcher<'_>) -> PorticoResult<ActionResult> + Send + Sync>;

/// A controller assembled from closures, one per action.
///
/// Unknown actions fall back to the closure set with
/// [`FnController::fallback`], or produce a not-found result.
///
/// # Examples
///
/// ```
/// use portico_views::controller::{ActionResult, FnController};
///
/// let controller = FnController::new("StaticContent")
///     .action("who", |dispatcher| {
///         let name = dispatcher.param_str("name").unwrap_or_default().to_string();
///         Ok(ActionResult::text(format!("who: {name}")))
///     });
/// assert!(controller.has_action("who"));
/// ```
#[derive(Clone)]
pub struct FnController {
    name: String,
    actions: HashMap<String, ActionFn>,
    fallback: Option<ActionFn>,
}

impl FnController {
    /// Creates a controller without actions.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            actions: HashMap::new(),
            fallback: None,
        }
    }

    /// Adds an action.
    #[must_use]
    pub fn action<F>(mut self, name: &str, action: F) -> Self
    where
        F: Fn(&mut Dispatcher<'_>) -> PorticoResult<ActionResult> + Send + Sync + 'static,
    {
        self.actions.insert(name.to_string(), Arc::new(action));
        self
    }

    /// Sets the closure run for actions without their own closure.
    #[must_use]
    pub fn fallback<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut Dispatcher<'_>) -> PorticoResult<ActionResult> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(action));
        self
    }

    /// Returns the controller name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if `action` has its own closure.
    pub fn has_action(&self, action: &str) -> bool {
        self.actions.contains_key(action)
    }
}

impl fmt::Debug for FnController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut actions: Vec<&String> = self.actions.keys().collect();
        actions.sort();
        f.debug_struct("FnController")
            .field("name", &self.name)
            .field("actions", &actions)
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

impl Controller for FnController {
    fn handle(
        &self,
        action: &str,
        dispatcher: &mut Dispatcher<'_>,
    ) -> PorticoResult<ActionResult> {
        match self.actions.get(action).or(self.fallback.as_ref()) {
            Some(run) => run(dispatcher),
            None => Ok(ActionResult::not_found(format!(
                "Action '{action}' is not defined on {}",
                self.name
            ))),
        }
    }
}

/// Renders the template named by a template route.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateController;

impl Controller for TemplateController {
    fn handle(
        &self,
        _action: &str,
        dispatcher: &mut Dispatcher<'_>,
    ) -> PorticoResult<ActionResult> {
        let matched = Arc::clone(dispatcher.matched_route());
        let template = matched.template().ok_or_else(|| {
            PorticoError::ImproperlyConfigured(format!(
                "route '{}' is not a template route",
                matched.name()
            ))
        })?;
        dispatcher.view_mut().set_template(template);
        Ok(ActionResult::Variables(dispatcher.params().to_json()))
    }
}

/// Answers requests no route matched.
///
/// Renders [`NOT_FOUND_TEMPLATE`] with status 404 when the renderer has it,
/// and a plain-text body otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotFoundController;

impl Controller for NotFoundController {
    fn handle(
        &self,
        _action: &str,
        dispatcher: &mut Dispatcher<'_>,
    ) -> PorticoResult<ActionResult> {
        let path = dispatcher.request().path().to_string();
        tracing::info!(path = %path, "page not found");
        dispatcher.view_mut().set_status(StatusCode::NOT_FOUND);

        if dispatcher.application().renderer().has_template(NOT_FOUND_TEMPLATE) {
            dispatcher.view_mut().set_template(NOT_FOUND_TEMPLATE);
            let mut variables = Map::new();
            variables.insert("path".into(), Value::String(path));
            return Ok(ActionResult::Variables(variables));
        }

        dispatcher.view_mut().set_content_type("text/plain");
        Ok(ActionResult::text(format!("Page not found: {path}")))
    }
}

/// Creates controller instances.
pub type ControllerFactory = Arc<dyn Fn() -> Box<dyn Controller> + Send + Sync>;

/// Maps controller names to factories.
///
/// # Examples
///
/// ```
/// use portico_views::controller::{ControllerRegistry, FnController};
///
/// let mut registry = ControllerRegistry::with_builtins();
/// registry.register_fn(FnController::new("Homepage"));
/// assert!(registry.contains("Homepage"));
/// assert!(registry.contains("Template"));
/// assert!(registry.create("Missing").is_err());
/// ```
#[derive(Clone, Default)]
pub struct ControllerRegistry {
    factories: HashMap<String, ControllerFactory>,
}

impl ControllerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the template and not-found controllers.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(TEMPLATE_CONTROLLER, || Box::new(TemplateController));
        registry.register(NOT_FOUND_CONTROLLER, || Box::new(NotFoundController));
        registry
    }

    /// Registers a factory under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Controller> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
    }

    /// Registers a [`FnController`] under its own name.
    pub fn register_fn(&mut self, controller: FnController) {
        let name = controller.name().to_string();
        self.register(&name, move || Box::new(controller.clone()));
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Returns the registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Creates a new instance of the controller registered as `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::ControllerNotFound`] for unknown names.
    pub fn create(&self, name: &str) -> PorticoResult<Box<dyn Controller>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| PorticoError::ControllerNotFound(name.to_string()))
    }
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("controllers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_result_helpers() {
        assert!(matches!(ActionResult::render(), ActionResult::Variables(v) if v.is_empty()));
        assert!(matches!(
            ActionResult::redirect("home"),
            ActionResult::Redirect { code: 302, .. }
        ));
        assert!(matches!(
            ActionResult::forward("Security", "signin"),
            ActionResult::Forward { controller, action } if controller == "Security" && action == "signin"
        ));
        assert!(matches!(
            ActionResult::from(HttpResponse::ok("x")),
            ActionResult::Response(_)
        ));
    }

    #[test]
    fn test_fn_controller_actions() {
        let controller = FnController::new("StaticContent")
            .action("who", |_| Ok(ActionResult::text("who")))
            .action("contact", |_| Ok(ActionResult::render()));
        assert_eq!(controller.name(), "StaticContent");
        assert!(controller.has_action("who"));
        assert!(!controller.has_action("missing"));
        let debug = format!("{controller:?}");
        assert!(debug.contains("\"contact\", \"who\""));
        assert!(debug.contains("has_fallback: false"));
    }

    #[test]
    fn test_registry_builtins() {
        let registry = ControllerRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["NotFound", "Template"]);
        assert!(registry.create("Template").is_ok());
        assert!(matches!(
            registry.create("Homepage"),
            Err(PorticoError::ControllerNotFound(name)) if name == "Homepage"
        ));
    }

    #[test]
    fn test_registry_register_replaces() {
        let mut registry = ControllerRegistry::new();
        registry.register_fn(FnController::new("Homepage"));
        registry.register_fn(FnController::new("Homepage"));
        assert_eq!(registry.names(), vec!["Homepage"]);
        assert!(format!("{registry:?}").contains("Homepage"));
    }
}

//! The per-request dispatcher.
//!
//! A [`Dispatcher`] owns everything one request needs while it travels
//! through controllers and filters: the request and its matched route, the
//! controllers created so far, the current controller and action, the view,
//! buffered output, and the response once one is produced.
//!
//! Dispatching a request forwards to the matched route's controller.
//! Every forward, the first one included, builds a fresh
//! [`FilterChain`] and runs it; at most [`MAX_FORWARDS`] forwards happen per
//! request. A 404 is a forward to the configured not-found controller.

use std::collections::HashMap;
use std::sync::Arc;

use http::StatusCode;
use serde_json::Value;

use portico_core::{PorticoError, PorticoResult, Settings};
use portico_http::redirect::redirect_response;
use portico_http::routing::route::RESERVED_PARAMS;
use portico_http::{HttpRequest, HttpResponse, MatchedRoute, ParamValue, RouteParams, RoutingTable};

use crate::application::Application;
use crate::controller::Controller;
use crate::filter::FilterChain;
use crate::view::ViewState;

/// Maximum number of forwards per request, the initial dispatch included.
pub const MAX_FORWARDS: usize = 5;

/// Dispatches one request.
pub struct Dispatcher<'a> {
    app: &'a Application,
    request: HttpRequest,
    matched: Arc<MatchedRoute>,
    params: RouteParams,
    controllers: HashMap<(String, String), Arc<dyn Controller>>,
    current: Option<Arc<dyn Controller>>,
    forwards: usize,
    controller_name: String,
    action_name: String,
    render: bool,
    view: ViewState,
    buffer: String,
    response: Option<HttpResponse>,
    halted: bool,
}

impl std::fmt::Debug for Dispatcher<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("application", &self.app.name())
            .field("path", &self.request.path())
            .field("route", &self.matched.name())
            .field("controller", &self.controller_name)
            .field("action", &self.action_name)
            .field("forwards", &self.forwards)
            .field("render", &self.render)
            .field("halted", &self.halted)
            .finish_non_exhaustive()
    }
}

impl<'a> Dispatcher<'a> {
    /// Dispatches `request` through `app` and returns the response.
    ///
    /// Redirect routes are answered directly. Every other match, the
    /// synthesized not-found match included, is forwarded to its
    /// controller. When no filter produced a response, the buffered output
    /// becomes the body.
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::ApplicationDisabled`] for disabled
    /// applications and any error raised while matching, forwarding,
    /// running controllers or rendering.
    pub fn dispatch(app: &'a Application, request: HttpRequest) -> PorticoResult<HttpResponse> {
        let mut dispatcher = Self::for_request(app, request)?;
        dispatcher.run()?;
        Ok(dispatcher.finish())
    }

    /// Matches `request` and prepares a dispatcher for it without running
    /// anything.
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::ApplicationDisabled`] for disabled
    /// applications and routing errors from
    /// [`RoutingTable::match_request`].
    pub fn for_request(app: &'a Application, mut request: HttpRequest) -> PorticoResult<Self> {
        if app.settings().disabled {
            return Err(PorticoError::ApplicationDisabled(app.name().to_string()));
        }
        let matched = app.routing().match_request(&mut request)?;
        Ok(Self {
            app,
            params: matched.params().clone(),
            matched,
            request,
            controllers: HashMap::new(),
            current: None,
            forwards: 0,
            controller_name: String::new(),
            action_name: String::new(),
            render: true,
            view: ViewState::new(app.settings().views.default_layout.clone()),
            buffer: String::new(),
            response: None,
            halted: false,
        })
    }

    fn run(&mut self) -> PorticoResult<()> {
        let matched = Arc::clone(&self.matched);
        if let Some((target, code)) = matched.redirect_target() {
            let mut params = self.params.clone();
            for reserved in RESERVED_PARAMS {
                params.remove(reserved);
            }
            return self.redirect_with_params(target, &params, code);
        }
        self.forward(matched.controller(), matched.action())
    }

    /// Consumes the dispatcher and returns its response: the produced one,
    /// or the buffered output with the view's status and content type.
    pub fn finish(self) -> HttpResponse {
        if let Some(response) = self.response {
            return response;
        }
        let mut response = HttpResponse::new(self.view.status(), self.buffer);
        response.set_content_type(self.view.content_type());
        response
    }

    // ── Forwarding ───────────────────────────────────────────────────

    /// Runs `controller::action` through a fresh filter chain.
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::ForwardLimitExceeded`] once more than
    /// [`MAX_FORWARDS`] forwards were requested,
    /// [`PorticoError::ControllerNotFound`] for unknown controllers, and any
    /// error raised by the chain.
    pub fn forward(&mut self, controller: &str, action: &str) -> PorticoResult<()> {
        if self.forwards >= MAX_FORWARDS {
            return Err(PorticoError::ForwardLimitExceeded {
                count: self.forwards + 1,
                controller: controller.to_string(),
                action: action.to_string(),
            });
        }
        self.forwards += 1;
        tracing::info!(
            controller,
            action,
            forward = self.forwards,
            "forwarding"
        );

        self.current = Some(self.initialize_controller(controller)?);
        self.controller_name = controller.to_string();
        self.action_name = action.to_string();

        let chain = FilterChain::load_configuration(self.app);
        chain.execute(self)
    }

    /// Forwards to the configured not-found controller and action.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::forward`].
    pub fn forward_404(&mut self) -> PorticoResult<()> {
        let app = self.app;
        let routing = &app.settings().routing;
        self.forward(&routing.not_found_controller, &routing.not_found_action)
    }

    /// Returns the controller registered as `name`, creating and
    /// configuring it on first use within this request.
    fn initialize_controller(&mut self, name: &str) -> PorticoResult<Arc<dyn Controller>> {
        let key = (self.app.name().to_string(), name.to_string());
        if let Some(controller) = self.controllers.get(&key) {
            return Ok(Arc::clone(controller));
        }
        let mut controller = self.app.controllers().create(name)?;
        controller.configure(self.app)?;
        let controller: Arc<dyn Controller> = Arc::from(controller);
        self.controllers.insert(key, Arc::clone(&controller));
        Ok(controller)
    }

    /// Returns the controller of the current forward.
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::InternalServerError`] before the first forward.
    pub fn controller(&self) -> PorticoResult<Arc<dyn Controller>> {
        self.current.clone().ok_or_else(|| {
            PorticoError::InternalServerError("no controller has been forwarded to".into())
        })
    }

    /// Returns the name of the current controller.
    pub fn controller_name(&self) -> &str {
        &self.controller_name
    }

    /// Returns the name of the current action.
    pub fn action_name(&self) -> &str {
        &self.action_name
    }

    /// Returns the number of forwards so far, the initial dispatch included.
    pub const fn forward_count(&self) -> usize {
        self.forwards
    }

    /// Returns the number of distinct controllers created for this request.
    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    // ── Output ───────────────────────────────────────────────────────

    /// Makes `response` the response of this request, discarding buffered
    /// output, and halts the dispatcher.
    pub fn send(&mut self, response: HttpResponse) {
        self.buffer.clear();
        self.response = Some(response);
        self.halted = true;
    }

    /// Redirects to `target` (a URI, a path, or a route name) with `code`.
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::RouteNotFound`] for unknown route names.
    pub fn redirect(&mut self, target: &str, code: u16) -> PorticoResult<()> {
        self.redirect_with_params(target, &RouteParams::new(), code)
    }

    /// Redirects to `target`, building route URLs from `params`.
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::RouteNotFound`] for unknown route names.
    pub fn redirect_with_params(
        &mut self,
        target: &str,
        params: &RouteParams,
        code: u16,
    ) -> PorticoResult<()> {
        let location = self.app.routing().redirect_location(target, params)?;
        self.send(redirect_response(&location, code));
        Ok(())
    }

    /// Appends to the buffered output.
    pub fn write(&mut self, output: &str) {
        self.buffer.push_str(output);
    }

    /// Returns the buffered output.
    pub fn output(&self) -> &str {
        &self.buffer
    }

    /// Returns the produced response, if any.
    pub const fn response(&self) -> Option<&HttpResponse> {
        self.response.as_ref()
    }

    /// Stops every remaining filter, in this chain and in the chains of
    /// enclosing forwards.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    /// Returns `true` once the request is finished.
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    // ── Rendering ────────────────────────────────────────────────────

    /// Tells the rendering filter not to render a template.
    pub fn suppress_rendering(&mut self) {
        self.render = false;
    }

    /// Returns `true` unless rendering was suppressed.
    pub const fn shall_render(&self) -> bool {
        self.render
    }

    /// Returns the default template of the current action,
    /// `<Controller>/<action>.<ext>`.
    pub fn action_template(&self) -> String {
        format!(
            "{}/{}.{}",
            self.controller_name,
            self.action_name,
            self.app.settings().views.template_extension
        )
    }

    /// Chooses the template to render; an empty name selects the action
    /// template.
    pub fn set_template(&mut self, name: &str) {
        let template = if name.is_empty() {
            self.action_template()
        } else {
            name.to_string()
        };
        self.view.set_template(template);
    }

    /// Returns the view.
    pub const fn view(&self) -> &ViewState {
        &self.view
    }

    /// Returns the view mutably.
    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    /// Sets the status of the response this request will produce.
    pub fn set_status(&mut self, status: StatusCode) {
        self.view.set_status(status);
    }

    // ── Request ──────────────────────────────────────────────────────

    /// Returns the application serving this request.
    pub const fn application(&self) -> &'a Application {
        self.app
    }

    /// Returns the application settings.
    pub fn settings(&self) -> &'a Settings {
        self.app.settings()
    }

    /// Returns the application's routing table.
    pub fn routing(&self) -> &'a RoutingTable {
        self.app.routing()
    }

    /// Returns the request.
    pub const fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Returns the route matched for this request.
    pub const fn matched_route(&self) -> &Arc<MatchedRoute> {
        &self.matched
    }

    /// Returns the request parameters: the matched route's parameters and
    /// any set with [`Dispatcher::set_param`].
    pub const fn params(&self) -> &RouteParams {
        &self.params
    }

    /// Returns one request parameter.
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Returns one scalar request parameter.
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.params.get_str(name)
    }

    /// Sets a request parameter for the rest of this request.
    pub fn set_param(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.params.insert(name, value);
    }

    /// Returns the cleaned value a route validator produced for `name`.
    pub fn cleaned_value(&self, name: &str) -> Option<&Value> {
        self.matched.cleaned_value(name)
    }

    /// Returns the lowercase request method, honouring a `request_method`
    /// parameter override.
    pub fn request_method(&self) -> String {
        RoutingTable::request_method(&self.request)
    }

    /// Returns `true` for POST requests (after overrides).
    pub fn is_post(&self) -> bool {
        self.request_method() == "post"
    }

    /// Generates a URL with the application's routing table.
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::RouteNotFound`] for unknown route names.
    pub fn url_for(
        &self,
        name_or_uri: &str,
        params: &RouteParams,
        absolute: bool,
    ) -> PorticoResult<String> {
        self.app.routing().url_for(name_or_uri, params, absolute)
    }
}

#[cfg(test)]
mod tests {
    use portico_http::Route;

    use super::*;
    use crate::controller::{ActionResult, FnController};

    fn params(pairs: &[(&str, &str)]) -> RouteParams {
        pairs.iter().copied().collect()
    }

    fn application() -> Application {
        let mut settings = Settings::default();
        settings.views.rendering = false;
        Application::builder(settings)
            .route(
                Route::new(
                    "who",
                    "/who/:name",
                    params(&[("_controller", "StaticContent"), ("_action", "who")]),
                )
                .unwrap(),
            )
            .route(Route::new("home", "/", params(&[("_controller", "Homepage")])).unwrap())
            .controller(FnController::new("StaticContent").action("who", |d| {
                let name = d.param_str("name").unwrap_or_default().to_string();
                Ok(ActionResult::text(format!("who: {name}")))
            }))
            .controller(FnController::new("Homepage").action("index", |_| {
                Ok(ActionResult::text("home"))
            }))
            .build()
            .unwrap()
    }

    #[test]
    fn test_for_request_binds_route() {
        let app = application();
        let request = HttpRequest::builder().path("/who/massimo").build();
        let dispatcher = Dispatcher::for_request(&app, request).unwrap();
        assert_eq!(dispatcher.matched_route().name(), "who");
        assert_eq!(dispatcher.param_str("name"), Some("massimo"));
        assert_eq!(dispatcher.forward_count(), 0);
        assert!(dispatcher.shall_render());
        assert!(!dispatcher.is_halted());
    }

    #[test]
    fn test_dispatch_text_result() {
        let app = application();
        let request = HttpRequest::builder().path("/who/massimo").build();
        let response = Dispatcher::dispatch(&app, request).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text(), Some("who: massimo"));
    }

    #[test]
    fn test_action_template() {
        let app = application();
        let mut dispatcher =
            Dispatcher::for_request(&app, HttpRequest::builder().path("/").build()).unwrap();
        dispatcher.forward("Homepage", "index").unwrap();
        assert_eq!(dispatcher.action_template(), "Homepage/index.html");
        dispatcher.set_template("");
        assert_eq!(dispatcher.view().template(), Some("Homepage/index.html"));
        dispatcher.set_template("Custom/page");
        assert_eq!(dispatcher.view().template(), Some("Custom/page"));
    }

    #[test]
    fn test_send_discards_buffer() {
        let app = application();
        let mut dispatcher =
            Dispatcher::for_request(&app, HttpRequest::builder().build()).unwrap();
        dispatcher.write("partial output");
        assert_eq!(dispatcher.output(), "partial output");
        dispatcher.send(HttpResponse::ok("final"));
        assert_eq!(dispatcher.output(), "");
        assert!(dispatcher.is_halted());
        assert_eq!(dispatcher.finish().text(), Some("final"));
    }

    #[test]
    fn test_finish_uses_buffer_and_view() {
        let app = application();
        let mut dispatcher =
            Dispatcher::for_request(&app, HttpRequest::builder().build()).unwrap();
        dispatcher.write("a");
        dispatcher.write("b");
        dispatcher.set_status(StatusCode::ACCEPTED);
        dispatcher.view_mut().set_content_type("text/plain");
        let response = dispatcher.finish();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.content_type(), "text/plain");
        assert_eq!(response.text(), Some("ab"));
    }

    #[test]
    fn test_controller_memoized_per_request() {
        let app = application();
        let mut dispatcher =
            Dispatcher::for_request(&app, HttpRequest::builder().build()).unwrap();
        assert!(dispatcher.controller().is_err());
        dispatcher.forward("Homepage", "index").unwrap();
        let first = dispatcher.controller().unwrap();
        dispatcher.forward("Homepage", "index").unwrap();
        let second = dispatcher.controller().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(dispatcher.controller_count(), 1);
        assert_eq!(dispatcher.forward_count(), 2);
    }

    #[test]
    fn test_unknown_controller() {
        let app = application();
        let mut dispatcher =
            Dispatcher::for_request(&app, HttpRequest::builder().build()).unwrap();
        assert!(matches!(
            dispatcher.forward("Missing", "index"),
            Err(PorticoError::ControllerNotFound(name)) if name == "Missing"
        ));
    }

    #[test]
    fn test_set_param_and_request_method() {
        let app = application();
        let mut dispatcher = Dispatcher::for_request(
            &app,
            HttpRequest::builder()
                .method(http::Method::POST)
                .path("/")
                .query_string("request_method=PUT")
                .build(),
        )
        .unwrap();
        assert_eq!(dispatcher.request_method(), "put");
        assert!(!dispatcher.is_post());
        dispatcher.set_param("page", "2");
        assert_eq!(dispatcher.param_str("page"), Some("2"));
        assert_eq!(dispatcher.matched_route().param_str("page"), None);
    }

    #[test]
    fn test_url_for() {
        let app = application();
        let dispatcher = Dispatcher::for_request(&app, HttpRequest::builder().build()).unwrap();
        assert_eq!(
            dispatcher
                .url_for("who", &params(&[("name", "massimo")]), false)
                .unwrap(),
            "/who/massimo"
        );
    }

    #[test]
    fn test_debug_format() {
        let app = application();
        let dispatcher = Dispatcher::for_request(&app, HttpRequest::builder().build()).unwrap();
        let debug = format!("{dispatcher:?}");
        assert!(debug.contains("Dispatcher"));
        assert!(debug.contains("home"));
    }
}

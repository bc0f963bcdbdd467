//! The routing table.
//!
//! An ordered collection of named routes. Matching walks the routes in
//! registration order and the first route that matches wins; there is no
//! specificity ranking, so route order is the only way to disambiguate
//! overlapping patterns.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use portico_core::settings::{RoutingSettings, Settings};
use portico_core::{PorticoError, PorticoResult};

use super::cache::RouteCache;
use super::definition::{RouteDefinition, RouteFile};
use super::matched::MatchedRoute;
use super::params::{ParamValue, RouteParams};
use super::route::{Route, CONTROLLER_PARAM};
use super::validators::ValidatorRegistry;
use crate::redirect::{is_absolute_path, is_valid_uri, normalize_url};
use crate::request::HttpRequest;

/// Query parameter naming the controller in direct script invocations.
pub const LEGACY_CONTROLLER_PARAM: &str = "p";

fn legacy_script_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^/[a-z]+\.php$").expect("legacy script regex is valid"))
}

/// Ordered, named routes plus the settings that govern matching.
///
/// # Examples
///
/// ```
/// use portico_core::RoutingSettings;
/// use portico_http::routing::{Route, RouteParams, RoutingTable};
///
/// let mut table = RoutingTable::new(RoutingSettings::default());
/// table.append(Route::new(
///     "static_content",
///     "/:_action",
///     [("_controller", "StaticContent")].into_iter().collect(),
/// ).unwrap());
///
/// let matched = table.match_path("/contact").unwrap();
/// assert_eq!(matched.action(), "contact");
/// assert!(table.match_path("/a/b").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    settings: RoutingSettings,
    base_url: String,
    routes: Vec<Arc<Route>>,
}

impl RoutingTable {
    /// Creates an empty table.
    pub fn new(settings: RoutingSettings) -> Self {
        Self {
            settings,
            base_url: String::new(),
            routes: Vec::new(),
        }
    }

    /// Creates an empty table from application settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            settings: settings.routing.clone(),
            base_url: settings.base_url.clone(),
            routes: Vec::new(),
        }
    }

    /// Returns the routing settings.
    pub const fn settings(&self) -> &RoutingSettings {
        &self.settings
    }

    /// Sets the prefix used for absolute URLs.
    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }

    /// Adds a route at the end. A route with the same name is replaced in place.
    pub fn append(&mut self, route: Route) {
        let route = Arc::new(route);
        match self.position(route.name()) {
            Some(index) => self.routes[index] = route,
            None => self.routes.push(route),
        }
    }

    /// Adds a route at the front, removing any route with the same name.
    pub fn prepend(&mut self, route: Route) {
        if let Some(index) = self.position(route.name()) {
            self.routes.remove(index);
        }
        self.routes.insert(0, Arc::new(route));
    }

    /// Inserts a route right before the route named `existing`.
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::RouteNotFound`] if `existing` is not registered.
    pub fn insert_before(&mut self, route: Route, existing: &str) -> PorticoResult<()> {
        let index = self
            .position(existing)
            .ok_or_else(|| PorticoError::RouteNotFound(existing.to_string()))?;
        if route.name() == existing {
            self.routes[index] = Arc::new(route);
            return Ok(());
        }
        if let Some(previous) = self.position(route.name()) {
            self.routes.remove(previous);
        }
        let index = self.position(existing).unwrap_or(index);
        self.routes.insert(index, Arc::new(route));
        Ok(())
    }

    /// Appends every route in order.
    pub fn add_routes(&mut self, routes: impl IntoIterator<Item = Route>) {
        for route in routes {
            self.append(route);
        }
    }

    /// Removes every route.
    pub fn clear(&mut self) {
        self.routes.clear();
    }

    /// Returns `true` if a route named `name` is registered.
    pub fn has(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Returns the route named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::RouteNotFound`] if no such route is registered.
    pub fn get(&self, name: &str) -> PorticoResult<&Arc<Route>> {
        self.routes
            .iter()
            .find(|route| route.name() == name)
            .ok_or_else(|| PorticoError::RouteNotFound(name.to_string()))
    }

    /// Iterates over the routes in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.iter()
    }

    /// Returns the number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no route is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.routes.iter().position(|route| route.name() == name)
    }

    /// Returns the first route matching `path`.
    pub fn match_path(&self, path: &str) -> Option<MatchedRoute> {
        self.routes.iter().find_map(|route| {
            route
                .match_path(path)
                .map(|matched| MatchedRoute::new(Arc::clone(route), matched, path))
        })
    }

    /// Matches `request`, caching the result on the request.
    ///
    /// A second call on the same request returns the cached match. Query and
    /// body parameters are laid over the path parameters. When no route
    /// matches, a not-found match bound to the configured not-found
    /// controller is returned instead of an error.
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::QueryStringDispatchDisallowed`] for direct
    /// script invocations (`/index.php?p=...`) when they are not allowed, and
    /// [`PorticoError::RouteNotFound`] if they are allowed but the default
    /// route is missing.
    pub fn match_request(&self, request: &mut HttpRequest) -> PorticoResult<Arc<MatchedRoute>> {
        if let Some(matched) = request.matched_route() {
            return Ok(Arc::clone(matched));
        }

        let path = request.path().to_string();
        let get = request.get().to_route_params();
        let post = request.post().to_route_params();

        let matched = if self.is_legacy_request(&path, &get) {
            if !self.settings.allow_query_string {
                return Err(PorticoError::QueryStringDispatchDisallowed(request.full_path()));
            }
            let route = self.get(&self.settings.default_route)?;
            let mut params = get;
            if let Some(controller) = params.remove(LEGACY_CONTROLLER_PARAM) {
                params.insert(CONTROLLER_PARAM, controller);
            }
            let mut matched = MatchedRoute::with_params(Arc::clone(route), &params, path.as_str());
            matched.overlay_request_inputs(&RouteParams::new(), &post);
            tracing::debug!(route = matched.name(), path = %path, "legacy query-string dispatch");
            matched
        } else if let Some(mut matched) = self.match_path(&path) {
            matched.overlay_request_inputs(&get, &post);
            tracing::debug!(
                route = matched.name(),
                controller = matched.controller(),
                action = matched.action(),
                path = %path,
                "route matched"
            );
            matched
        } else {
            tracing::debug!(path = %path, "no route matched");
            let route = Route::not_found(
                &self.settings.not_found_controller,
                &self.settings.not_found_action,
            );
            let mut matched = MatchedRoute::not_found(Arc::new(route), path.as_str());
            matched.overlay_request_inputs(&get, &post);
            matched
        };

        let matched = Arc::new(matched);
        request.set_matched_route(Arc::clone(&matched));
        Ok(matched)
    }

    fn is_legacy_request(&self, path: &str, get: &RouteParams) -> bool {
        legacy_script_regex().is_match(path)
            || (self.settings.legacy_query_dispatch && get.contains_key(LEGACY_CONTROLLER_PARAM))
    }

    /// Generates the URL for a route name, passing absolute URIs through.
    ///
    /// With `absolute`, the URL is prefixed with the `domain` parameter when
    /// present, otherwise with the configured base URL. The `domain`
    /// parameter is never part of the generated path.
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
        if is_valid_uri(name_or_uri) {
            return Ok(name_or_uri.to_string());
        }
        let route = self.get(name_or_uri)?;

        let mut params = params.clone();
        let domain = params.remove("domain");
        let path = route.create_url(&params);

        if !absolute {
            return Ok(path);
        }
        let prefix = match &domain {
            Some(ParamValue::Str(domain)) => domain.as_str(),
            _ => self.base_url.as_str(),
        };
        Ok(format!("{}{path}", prefix.trim_end_matches('/')))
    }

    /// Resolves a redirect target into a location.
    ///
    /// Absolute URIs and paths are used as given (paths are normalized);
    /// anything else is a route name whose URL is built from `params`.
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::RouteNotFound`] if the target is neither a
    /// URI, a path, nor a registered route name.
    pub fn redirect_location(&self, target: &str, params: &RouteParams) -> PorticoResult<String> {
        if is_valid_uri(target) {
            return Ok(target.to_string());
        }
        if is_absolute_path(target) {
            return Ok(normalize_url(target));
        }
        let route = self.get(target)?;
        Ok(normalize_url(&route.create_url(params)))
    }

    /// Builds and appends routes from declarations, in order.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error; routes before it stay registered.
    pub fn load_definitions(
        &mut self,
        definitions: &[RouteDefinition],
        registry: &ValidatorRegistry,
    ) -> PorticoResult<()> {
        for definition in definitions {
            let route = Route::from_definition(definition, registry, &self.settings)?;
            self.append(route);
        }
        Ok(())
    }

    /// Loads a TOML or JSON route file, optionally through a snapshot cache.
    ///
    /// The file is fully validated before any route is registered, so a
    /// broken file leaves the table untouched.
    ///
    /// # Errors
    ///
    /// Returns I/O, parse, or route configuration errors.
    pub fn load_file(
        &mut self,
        path: &Path,
        registry: &ValidatorRegistry,
        cache: Option<&RouteCache>,
    ) -> PorticoResult<usize> {
        let cached = match cache {
            Some(cache) => cache.read(path)?,
            None => None,
        };
        let from_cache = cached.is_some();
        let file = match cached {
            Some(file) => file,
            None => RouteFile::from_path(path)?,
        };

        let routes = file
            .routes
            .iter()
            .map(|definition| Route::from_definition(definition, registry, &self.settings))
            .collect::<PorticoResult<Vec<_>>>()?;

        if let (Some(cache), false) = (cache, from_cache) {
            cache.write(path, &file)?;
        }

        let count = routes.len();
        self.add_routes(routes);
        tracing::debug!(file = %path.display(), routes = count, from_cache, "loaded routes");
        Ok(count)
    }

    /// Returns the HTTP method of a request, honouring a `request_method`
    /// parameter override (used by forms emulating `PUT` or `DELETE`).
    pub fn request_method(request: &HttpRequest) -> String {
        request
            .matched_route()
            .and_then(|matched| matched.param_str("request_method"))
            .filter(|method| !method.is_empty())
            .map_or_else(
                || request.method().as_str().to_lowercase(),
                str::to_lowercase,
            )
    }
}

impl<'a> IntoIterator for &'a RoutingTable {
    type Item = &'a Arc<Route>;
    type IntoIter = std::slice::Iter<'a, Arc<Route>>;

    fn into_iter(self) -> Self::IntoIter {
        self.routes.iter()
    }
}

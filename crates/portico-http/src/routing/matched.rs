//! The outcome of matching a request against the routing table.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use super::params::{ParamValue, RouteParams};
use super::route::{Route, RouteKind, ACTION_PARAM, CONTROLLER_PARAM};

/// Parameters bound by [`Route::match_path`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathMatch {
    /// Route defaults overlaid with the values bound from the path.
    pub params: RouteParams,
    /// Cleaned values produced by each parameter's first validator.
    pub cleaned: BTreeMap<String, Value>,
}

/// A route bound to the parameters of one request.
///
/// The route template stays shared; everything request-specific lives here.
#[derive(Debug, Clone)]
pub struct MatchedRoute {
    route: Arc<Route>,
    params: RouteParams,
    cleaned: BTreeMap<String, Value>,
    path: String,
    not_found: bool,
}

impl MatchedRoute {
    /// Wraps a successful path match.
    pub fn new(route: Arc<Route>, matched: PathMatch, path: impl Into<String>) -> Self {
        Self {
            route,
            params: matched.params,
            cleaned: matched.cleaned,
            path: path.into(),
            not_found: false,
        }
    }

    /// Binds `route` to its defaults overlaid with `params`, without matching.
    pub fn with_params(route: Arc<Route>, params: &RouteParams, path: impl Into<String>) -> Self {
        let params = route.defaults().merged(params);
        Self {
            route,
            params,
            cleaned: BTreeMap::new(),
            path: path.into(),
            not_found: false,
        }
    }

    /// Builds the placeholder match for an unmatched path.
    pub fn not_found(route: Arc<Route>, path: impl Into<String>) -> Self {
        let params = route.defaults().clone();
        Self {
            route,
            params,
            cleaned: BTreeMap::new(),
            path: path.into(),
            not_found: true,
        }
    }

    /// Returns the matched route template.
    pub const fn route(&self) -> &Arc<Route> {
        &self.route
    }

    /// Returns the route name.
    pub fn name(&self) -> &str {
        self.route.name()
    }

    /// Returns the controller identifier.
    pub fn controller(&self) -> &str {
        self.params.get_str(CONTROLLER_PARAM).unwrap_or_default()
    }

    /// Returns the action identifier.
    pub fn action(&self) -> &str {
        self.params.get_str(ACTION_PARAM).unwrap_or_default()
    }

    /// Returns a bound parameter.
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Returns a bound scalar parameter.
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.params.get_str(name)
    }

    /// Returns every bound parameter.
    pub const fn params(&self) -> &RouteParams {
        &self.params
    }

    /// Returns the cleaned value a validator produced for `name`.
    pub fn cleaned_value(&self, name: &str) -> Option<&Value> {
        self.cleaned.get(name)
    }

    /// Returns the request path this match was computed for.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns `true` for the synthesized not-found match.
    pub const fn is_not_found(&self) -> bool {
        self.not_found
    }

    /// Returns `true` if the route answers with a redirect.
    pub fn is_redirect(&self) -> bool {
        matches!(self.route.kind(), RouteKind::Redirect { .. })
    }

    /// Returns the redirect target and status code of a redirect route.
    pub fn redirect_target(&self) -> Option<(&str, u16)> {
        match self.route.kind() {
            RouteKind::Redirect { target, code } => Some((target.as_str(), *code)),
            _ => None,
        }
    }

    /// Returns the template of a template route.
    pub fn template(&self) -> Option<&str> {
        match self.route.kind() {
            RouteKind::Template { template } => Some(template.as_str()),
            _ => None,
        }
    }

    /// Lays query parameters, then body parameters, over the bound ones.
    /// Later values win, `_controller` and `_action` included.
    pub fn overlay_request_inputs(&mut self, get: &RouteParams, post: &RouteParams) {
        self.params.overlay(get);
        self.params.overlay(post);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route() -> Arc<Route> {
        let params: RouteParams = [("_controller", "StaticContent"), ("_action", "who")]
            .into_iter()
            .collect();
        Arc::new(Route::new("who", "/who/:name", params).unwrap())
    }

    #[test]
    fn test_accessors() {
        let route = route();
        let path_match = route.match_path("/who/massimo").unwrap();
        let matched = MatchedRoute::new(route, path_match, "/who/massimo");
        assert_eq!(matched.name(), "who");
        assert_eq!(matched.controller(), "StaticContent");
        assert_eq!(matched.action(), "who");
        assert_eq!(matched.param_str("name"), Some("massimo"));
        assert_eq!(matched.path(), "/who/massimo");
        assert!(!matched.is_not_found());
        assert!(!matched.is_redirect());
        assert_eq!(matched.template(), None);
    }

    #[test]
    fn test_overlay_get_then_post() {
        let route = route();
        let path_match = route.match_path("/who/massimo").unwrap();
        let mut matched = MatchedRoute::new(route, path_match, "/who/massimo");
        let get: RouteParams = [("page", "1"), ("name", "query")].into_iter().collect();
        let post: RouteParams = [("page", "2")].into_iter().collect();
        matched.overlay_request_inputs(&get, &post);
        assert_eq!(matched.param_str("page"), Some("2"));
        assert_eq!(matched.param_str("name"), Some("query"));
    }

    #[test]
    fn test_overlay_rebinds_controller_and_action() {
        let route = route();
        let path_match = route.match_path("/who/massimo").unwrap();
        let mut matched = MatchedRoute::new(route, path_match, "/who/massimo");
        let get: RouteParams = [("_controller", "Admin"), ("_action", "contact")]
            .into_iter()
            .collect();
        let post: RouteParams = [("_action", "edit")].into_iter().collect();
        matched.overlay_request_inputs(&get, &post);
        assert_eq!(matched.controller(), "Admin");
        assert_eq!(matched.action(), "edit");
        assert_eq!(matched.route().defaults().get_str("_action"), Some("who"));
    }

    #[test]
    fn test_not_found_uses_defaults() {
        let matched = MatchedRoute::not_found(Arc::new(Route::not_found("NotFound", "index")), "/x");
        assert!(matched.is_not_found());
        assert_eq!(matched.controller(), "NotFound");
        assert_eq!(matched.action(), "index");
    }

    #[test]
    fn test_redirect_target() {
        let route = Arc::new(Route::redirect("old", "/old", "home", 301).unwrap());
        let matched = MatchedRoute::with_params(route, &RouteParams::new(), "/old");
        assert!(matched.is_redirect());
        assert_eq!(matched.redirect_target(), Some(("home", 301)));
    }
}

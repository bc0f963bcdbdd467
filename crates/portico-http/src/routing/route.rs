//! A single named route.
//!
//! A [`Route`] is an immutable template: matching a path never mutates it,
//! it produces a fresh [`PathMatch`] instead. Routes are shared between
//! requests behind an `Arc` by the [`RoutingTable`](super::RoutingTable).

use std::collections::BTreeMap;
use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

use portico_core::utils::text::hyphenate;
use portico_core::{PorticoError, PorticoResult};

use super::matched::PathMatch;
use super::params::{ParamValue, RouteParams};
use super::token::{split_path, tokenize, Token};
use super::validators::{RouteValidator, Validation};

/// Parameter naming the controller that handles a route.
pub const CONTROLLER_PARAM: &str = "_controller";

/// Parameter naming the controller action.
pub const ACTION_PARAM: &str = "_action";

/// Action used when a route names none.
pub const DEFAULT_ACTION: &str = "index";

/// Controller bound to template routes.
pub const TEMPLATE_CONTROLLER: &str = "Template";

/// Controller marker bound to redirect routes. Redirect routes never reach a
/// controller; the dispatcher answers them directly.
pub const REDIRECT_CONTROLLER: &str = "_redirect_";

/// Name of the route synthesized when nothing matches.
pub const NOT_FOUND_ROUTE: &str = "404";

/// Parameters naming the controller and action. Redirect routes drop them
/// before building their target URL.
pub const RESERVED_PARAMS: [&str; 2] = [CONTROLLER_PARAM, ACTION_PARAM];

/// Parameters never emitted as star pairs by [`Route::create_url`].
const STAR_SKIP: [&str; 3] = [CONTROLLER_PARAM, ACTION_PARAM, "query_string"];

/// Characters escaped when a value is substituted into a URL. `.` is escaped
/// too because it separates path components.
const URL_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

/// What a route does once matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteKind {
    /// Dispatch to the controller and action named by the parameters.
    Standard,
    /// Answer with an HTTP redirect to a URI or another route.
    Redirect {
        /// Absolute URI, path, or route name.
        target: String,
        /// HTTP status code of the redirect.
        code: u16,
    },
    /// Render a template through the built-in template controller.
    Template {
        /// Template name, relative to the template directories.
        template: String,
    },
}

/// A named URL pattern with default parameters and validators.
///
/// # Examples
///
/// ```
/// use portico_http::routing::{Route, RouteParams};
///
/// let params: RouteParams = [("_controller", "StaticContent"), ("_action", "who")]
///     .into_iter()
///     .collect();
/// let route = Route::new("who", "/who/:name", params).unwrap();
///
/// let matched = route.match_path("/who/massimo").unwrap();
/// assert_eq!(matched.params.get_str("name"), Some("massimo"));
/// assert_eq!(route.create_url(&[("name", "mario rossi")].into_iter().collect()), "/who/mario-rossi");
/// ```
#[derive(Debug, Clone)]
pub struct Route {
    name: String,
    pattern: String,
    tokens: Vec<Token>,
    is_directory: bool,
    extension: Option<String>,
    defaults: RouteParams,
    requirements: BTreeMap<String, Vec<Arc<dyn RouteValidator>>>,
    kind: RouteKind,
}

impl Route {
    /// Creates a standard route.
    ///
    /// Every `:variable` of the pattern is seeded with an empty default, then
    /// `params` is laid over. `_action` falls back to [`DEFAULT_ACTION`].
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::InvalidRoutePattern`] for malformed patterns and
    /// [`PorticoError::MissingControllerParameter`] when no `_controller` is
    /// given either as a parameter or as a pattern variable.
    pub fn new(name: &str, pattern: &str, params: RouteParams) -> PorticoResult<Self> {
        Self::build(name, pattern, params, RouteKind::Standard, DEFAULT_ACTION)
    }

    /// Creates a route answering with a redirect to `target`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for malformed patterns or an empty target.
    pub fn redirect(name: &str, pattern: &str, target: &str, code: u16) -> PorticoResult<Self> {
        if target.is_empty() {
            return Err(PorticoError::ImproperlyConfigured(format!(
                "Redirect route '{name}' needs a target"
            )));
        }
        Self::build(
            name,
            pattern,
            RouteParams::new(),
            RouteKind::Redirect {
                target: target.to_string(),
                code,
            },
            DEFAULT_ACTION,
        )
    }

    /// Creates a route rendering `template` through the template controller.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for malformed patterns or an empty template.
    pub fn template(name: &str, pattern: &str, template: &str) -> PorticoResult<Self> {
        Self::template_with_params(name, pattern, template, RouteParams::new())
    }

    /// Like [`Route::template`] with extra default parameters.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for malformed patterns or an empty template.
    pub fn template_with_params(
        name: &str,
        pattern: &str,
        template: &str,
        params: RouteParams,
    ) -> PorticoResult<Self> {
        if template.is_empty() {
            return Err(PorticoError::ImproperlyConfigured(format!(
                "Template route '{name}' needs a template"
            )));
        }
        Self::build(
            name,
            pattern,
            params,
            RouteKind::Template {
                template: template.to_string(),
            },
            DEFAULT_ACTION,
        )
    }

    pub(crate) fn build(
        name: &str,
        pattern: &str,
        params: RouteParams,
        kind: RouteKind,
        default_action: &str,
    ) -> PorticoResult<Self> {
        let parsed = tokenize(pattern, None)?;

        let mut defaults: RouteParams = parsed
            .variables
            .iter()
            .map(|variable| (variable.as_str(), ""))
            .collect();
        defaults.overlay(&params);

        match &kind {
            RouteKind::Standard => {}
            RouteKind::Redirect { .. } => {
                defaults.insert(CONTROLLER_PARAM, REDIRECT_CONTROLLER);
            }
            RouteKind::Template { .. } => {
                defaults.insert(CONTROLLER_PARAM, TEMPLATE_CONTROLLER);
            }
        }

        if !defaults.contains_key(CONTROLLER_PARAM) {
            return Err(PorticoError::MissingControllerParameter(name.to_string()));
        }
        if !defaults.contains_key(ACTION_PARAM) {
            defaults.insert(ACTION_PARAM, default_action);
        }

        Ok(Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            tokens: parsed.tokens,
            is_directory: parsed.is_directory,
            extension: None,
            defaults,
            requirements: BTreeMap::new(),
            kind,
        })
    }

    /// Synthesizes the route returned when no registered route matches.
    pub fn not_found(controller: &str, action: &str) -> Self {
        let defaults: RouteParams = [(CONTROLLER_PARAM, controller), (ACTION_PARAM, action)]
            .into_iter()
            .collect();
        Self {
            name: NOT_FOUND_ROUTE.to_string(),
            pattern: "/".to_string(),
            tokens: Vec::new(),
            is_directory: true,
            extension: None,
            defaults,
            requirements: BTreeMap::new(),
            kind: RouteKind::Standard,
        }
    }

    /// Adds a validator for `param`. Validators on one parameter are AND-combined.
    #[must_use]
    pub fn with_requirement(mut self, param: &str, validator: Arc<dyn RouteValidator>) -> Self {
        self.requirements
            .entry(param.to_string())
            .or_default()
            .push(validator);
        self
    }

    /// Enables extension matching, re-tokenizing the pattern.
    ///
    /// # Errors
    ///
    /// Propagates tokenizer errors, which cannot occur for a pattern that
    /// already tokenized once.
    pub fn with_extension(mut self, extension: Option<&str>) -> PorticoResult<Self> {
        let extension = extension.filter(|ext| !ext.is_empty());
        self.tokens = tokenize(&self.pattern, extension)?.tokens;
        self.extension = extension.map(str::to_string);
        Ok(self)
    }

    /// Drops every validator registered for `param`.
    pub fn remove_requirement(&mut self, param: &str) {
        self.requirements.remove(param);
    }

    /// Returns the route name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the pattern as written.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the parsed tokens.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Returns `true` when the pattern ends with `/`.
    pub const fn is_directory(&self) -> bool {
        self.is_directory
    }

    /// Returns `true` when the pattern ends with a star.
    pub fn has_star(&self) -> bool {
        self.tokens.last() == Some(&Token::Star)
    }

    /// Returns the extension this route matches and generates.
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// Returns the default parameters.
    pub const fn defaults(&self) -> &RouteParams {
        &self.defaults
    }

    /// Returns what this route does once matched.
    pub const fn kind(&self) -> &RouteKind {
        &self.kind
    }

    /// Returns the validators registered for `param`.
    pub fn requirements(&self, param: &str) -> &[Arc<dyn RouteValidator>] {
        self.requirements.get(param).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if at least one validator is registered for `param`.
    pub fn has_validator(&self, param: &str) -> bool {
        !self.requirements(param).is_empty()
    }

    /// Matches `path` against this route.
    ///
    /// Components are compared token by token with no backtracking. Star
    /// segments bind the remaining components as key/value pairs; an odd
    /// remainder is a non-match unless its last component is the route's
    /// extension.
    pub fn match_path(&self, path: &str) -> Option<PathMatch> {
        let components = split_path(path);
        let mut matched = PathMatch {
            params: self.defaults.clone(),
            cleaned: BTreeMap::new(),
        };
        let mut index = 0;

        for token in &self.tokens {
            match token {
                Token::Text(text) => {
                    if components.get(index)? != text {
                        return None;
                    }
                    index += 1;
                }
                Token::Variable(name) => {
                    let component = components.get(index)?;
                    self.bind(name, component, &mut matched)?;
                    index += 1;
                }
                Token::Star => {
                    let mut rest = &components[index..];
                    if rest.len() % 2 != 0 {
                        match (rest.split_last(), &self.extension) {
                            (Some((last, pairs)), Some(extension)) if last == extension => {
                                rest = pairs;
                            }
                            _ => return None,
                        }
                    }
                    for pair in rest.chunks_exact(2) {
                        self.bind(&pair[0], &pair[1], &mut matched)?;
                    }
                    index = components.len();
                }
            }
        }

        (index == components.len()).then_some(matched)
    }

    /// Returns `true` if `path` matches this route.
    pub fn matches(&self, path: &str) -> bool {
        self.match_path(path).is_some()
    }

    /// Runs the validators of `name` and binds the raw value on acceptance.
    fn bind(&self, name: &str, value: &str, matched: &mut PathMatch) -> Option<()> {
        let mut cleaned: Option<Value> = None;
        for (position, validator) in self.requirements(name).iter().enumerate() {
            match validator.validate(value) {
                Validation::Rejected => return None,
                Validation::Accepted { cleaned: value } => {
                    if position == 0 {
                        cleaned = value;
                    }
                }
            }
        }
        if let Some(cleaned) = cleaned {
            matched.cleaned.insert(name.to_string(), cleaned);
        }
        matched.params.insert(name, value);
        Some(())
    }

    /// Builds the URL for this route from its defaults overlaid with `params`.
    ///
    /// Variables are replaced by their normalized value (spaces become `-`,
    /// lowercased, percent-encoded). On star routes the remaining scalar
    /// parameters are appended as `/key/value` pairs. Array values are never
    /// written: a variable bound to an array stays as `:name` and arrays are
    /// left out of star pairs. The extension follows unless the URL ends with
    /// `/` or a `format` parameter is bound. A `query_string` parameter
    /// becomes the `?` suffix.
    pub fn create_url(&self, params: &RouteParams) -> String {
        let mut pool = self.defaults.merged(params);
        let query_string = pool.remove("query_string");

        let mut url = String::with_capacity(self.pattern.len());
        let mut rest = self.pattern.as_str();
        while !rest.is_empty() {
            let split = rest.find(['/', '.']).unwrap_or(rest.len());
            let (component, tail) = rest.split_at(split);
            match component.strip_prefix(':') {
                Some(variable) if pool.get_str(variable).is_some() => {
                    if let Some(ParamValue::Str(value)) = pool.remove(variable) {
                        url.push_str(&normalize_value(&value));
                    }
                }
                _ => url.push_str(component),
            }
            let separator_len = usize::from(!tail.is_empty());
            url.push_str(&tail[..separator_len]);
            rest = &tail[separator_len..];
        }

        if self.has_star() {
            if let Some(position) = url.find("/*") {
                url.truncate(position);
            }
            for (name, value) in &pool {
                if STAR_SKIP.contains(&name.as_str()) {
                    continue;
                }
                if let ParamValue::Str(value) = value {
                    url.push('/');
                    url.push_str(&normalize_value(name));
                    url.push('/');
                    url.push_str(&normalize_value(value));
                }
            }
            if url.is_empty() {
                url.push('/');
            }
        }

        if !self.is_directory
            && !url.ends_with('/')
            && !self.defaults.contains_key("format")
            && !params.contains_key("format")
        {
            if let Some(extension) = &self.extension {
                url.push('.');
                url.push_str(extension);
            }
        }

        if let Some(ParamValue::Str(query_string)) = query_string {
            if !query_string.is_empty() {
                url.push('?');
                url.push_str(&query_string);
            }
        }

        url
    }
}

/// Normalizes a value for use as a URL component.
fn normalize_value(value: &str) -> String {
    utf8_percent_encode(&hyphenate(value), URL_VALUE).to_string()
}

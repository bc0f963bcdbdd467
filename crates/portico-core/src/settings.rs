//! Settings for a portico application.
//!
//! [`Settings`] is a plain value: each application owns its own copy and
//! passes it by reference into the routing table and dispatcher it builds.
//! There is no process-wide settings singleton, so several applications (or
//! several test fixtures) can live side by side in one process.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Routing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    /// Extension appended to generated URLs and expected at the end of
    /// matched paths (e.g. `html`). `None` disables extension handling.
    pub extension: Option<String>,
    /// Serve direct script invocations (`/index.php?p=...`) through the
    /// default route instead of rejecting them.
    pub allow_query_string: bool,
    /// Treat any request carrying a raw `p` query parameter as a direct
    /// script invocation, whatever its path.
    pub legacy_query_dispatch: bool,
    /// Name of the route used for query-string dispatch.
    pub default_route: String,
    /// Action used when a route does not bind `_action`.
    pub default_action: String,
    /// Controller that handles unmatched requests.
    pub not_found_controller: String,
    /// Action that handles unmatched requests.
    pub not_found_action: String,
    /// Declarative route file (TOML or JSON) loaded at startup.
    pub routes_file: Option<PathBuf>,
    /// Directory holding compiled route snapshots. `None` disables caching.
    pub cache_dir: Option<PathBuf>,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            extension: None,
            allow_query_string: false,
            legacy_query_dispatch: false,
            default_route: "default".to_string(),
            default_action: "index".to_string(),
            not_found_controller: "NotFound".to_string(),
            not_found_action: "index".to_string(),
            routes_file: None,
            cache_dir: None,
        }
    }
}

/// View and rendering configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    /// Directories searched for templates.
    pub template_dirs: Vec<PathBuf>,
    /// Extension of action templates (`Homepage/index.html`).
    pub template_extension: String,
    /// Layout every rendered action is decorated with, if any.
    pub default_layout: Option<String>,
    /// Whether the rendering filter is installed in the chain.
    pub rendering: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            template_dirs: Vec::new(),
            template_extension: "html".to_string(),
            default_layout: None,
            rendering: true,
        }
    }
}

/// The complete set of settings for one application.
///
/// # Examples
///
/// ```
/// use portico_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.debug);
/// assert_eq!(settings.routing.default_action, "index");
/// assert_eq!(settings.views.template_extension, "html");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled.
    pub debug: bool,
    /// The application name. Controller instances are cached per
    /// application name.
    pub application_name: String,
    /// Base URL prefixed to absolute generated URLs
    /// (e.g. `https://www.example.com`).
    pub base_url: String,
    /// Domains served by this application, mapped to their site id.
    pub domains: BTreeMap<String, String>,

    // ── Maintenance ──────────────────────────────────────────────────

    /// When set, every request fails with `ApplicationDisabled`.
    pub disabled: bool,
    /// Body of the 503 response served while disabled.
    pub maintenance_message: String,

    // ── Logging ──────────────────────────────────────────────────────

    /// The log level (e.g. "info", "debug", "warn").
    pub log_level: String,

    // ── Routing ──────────────────────────────────────────────────────

    /// Routing table configuration.
    pub routing: RoutingSettings,

    // ── Views ────────────────────────────────────────────────────────

    /// Template and rendering configuration.
    pub views: ViewSettings,

    // ── Escape hatch ─────────────────────────────────────────────────

    /// Custom settings that don't fit into the above categories.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            application_name: "default".to_string(),
            base_url: String::new(),
            domains: BTreeMap::new(),

            disabled: false,
            maintenance_message: "Service temporarily unavailable".to_string(),

            log_level: "info".to_string(),

            routing: RoutingSettings::default(),
            views: ViewSettings::default(),

            extra: HashMap::new(),
        }
    }
}

impl Settings {
    /// Returns the site id configured for `domain`, ignoring any port suffix.
    pub fn site_for_domain(&self, domain: &str) -> Option<&str> {
        let host = domain.split(':').next().unwrap_or(domain);
        self.domains.get(host).map(String::as_str)
    }
}

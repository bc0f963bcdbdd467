//! Declarative route definitions.
//!
//! Route files list routes in priority order:
//!
//! ```toml
//! [[routes]]
//! name = "who"
//! url = "/who/:name"
//! params = { _controller = "StaticContent", _action = "who", extra = "val" }
//!
//! [[routes]]
//! name = "welcome"
//! kind = "template"
//! url = "/info/:_action"
//! template = "Info/welcome"
//!
//! [[routes]]
//! name = "old_home"
//! kind = "redirect"
//! url = "/index"
//! target = "home"
//! ```
//!
//! JSON files use the same shape.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use portico_core::settings::RoutingSettings;
use portico_core::settings_loader::toml_to_json;
use portico_core::{PorticoError, PorticoResult};

use super::params::RouteParams;
use super::route::{Route, RouteKind};
use super::validators::{ValidatorRegistry, ValidatorSpec};

/// Default status code of redirect routes.
pub const DEFAULT_REDIRECT_CODE: u16 = 301;

/// The kind of a declared route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    /// A standard controller route.
    #[default]
    Route,
    /// A redirect route.
    Redirect,
    /// A template route.
    Template,
}

/// One declared route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDefinition {
    /// Unique route name.
    pub name: String,
    /// URL pattern.
    pub url: String,
    /// Route kind.
    #[serde(default)]
    pub kind: DefinitionKind,
    /// Default parameters.
    #[serde(default)]
    pub params: RouteParams,
    /// Validators per parameter.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requirements: BTreeMap<String, Vec<ValidatorSpec>>,
    /// Redirect target (redirect routes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Redirect status code (redirect routes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    /// Template name (template routes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

/// The top level of a route file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteFile {
    /// Routes in priority order.
    #[serde(default)]
    pub routes: Vec<RouteDefinition>,
}

impl RouteFile {
    /// Parses a TOML route file.
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::ConfigurationError`] on malformed input.
    pub fn from_toml_str(input: &str) -> PorticoResult<Self> {
        let value: toml::Value = toml::from_str(input)
            .map_err(|e| PorticoError::ConfigurationError(format!("Invalid route file: {e}")))?;
        serde_json::from_value(toml_to_json(value))
            .map_err(|e| PorticoError::ConfigurationError(format!("Invalid route file: {e}")))
    }

    /// Parses a JSON route file.
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::ConfigurationError`] on malformed input.
    pub fn from_json_str(input: &str) -> PorticoResult<Self> {
        serde_json::from_str(input)
            .map_err(|e| PorticoError::ConfigurationError(format!("Invalid route file: {e}")))
    }

    /// Reads a route file, picking the format from the extension
    /// (`.json` for JSON, anything else for TOML).
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::IoError`] if the file cannot be read, or a
    /// configuration error if it cannot be parsed.
    pub fn from_path(path: &Path) -> PorticoResult<Self> {
        let content = std::fs::read_to_string(path)?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }
}

impl Route {
    /// Builds a route from its declaration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for malformed patterns, a missing
    /// `_controller`, a missing redirect target or template, or a validator
    /// that cannot be built.
    pub fn from_definition(
        definition: &RouteDefinition,
        registry: &ValidatorRegistry,
        settings: &RoutingSettings,
    ) -> PorticoResult<Self> {
        let name = definition.name.as_str();
        let kind = match definition.kind {
            DefinitionKind::Route => RouteKind::Standard,
            DefinitionKind::Redirect => RouteKind::Redirect {
                target: definition
                    .target
                    .clone()
                    .filter(|target| !target.is_empty())
                    .ok_or_else(|| {
                        PorticoError::ImproperlyConfigured(format!(
                            "Redirect route '{name}' needs a target"
                        ))
                    })?,
                code: definition.code.unwrap_or(DEFAULT_REDIRECT_CODE),
            },
            DefinitionKind::Template => RouteKind::Template {
                template: definition
                    .template
                    .clone()
                    .filter(|template| !template.is_empty())
                    .ok_or_else(|| {
                        PorticoError::ImproperlyConfigured(format!(
                            "Template route '{name}' needs a template"
                        ))
                    })?,
            },
        };

        let mut route = Self::build(
            name,
            &definition.url,
            definition.params.clone(),
            kind,
            &settings.default_action,
        )?
        .with_extension(settings.extension.as_deref())?;

        for (param, specs) in &definition.requirements {
            for spec in specs {
                route = route.with_requirement(param, spec.build(registry)?);
            }
        }

        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [[routes]]
        name = "who"
        url = "/who/:name"
        params = { _controller = "StaticContent", _action = "who", extra = "val" }
        requirements.name = [{ type = "regexp", pattern = "^[a-z]+$" }]

        [[routes]]
        name = "welcome"
        kind = "template"
        url = "/info/:_action"
        template = "Info/welcome"

        [[routes]]
        name = "old_home"
        kind = "redirect"
        url = "/index"
        target = "home"
    "#;

    #[test]
    fn test_parse_toml_route_file() {
        let file = RouteFile::from_toml_str(SAMPLE).unwrap();
        assert_eq!(file.routes.len(), 3);
        assert_eq!(file.routes[0].kind, DefinitionKind::Route);
        assert_eq!(file.routes[0].requirements["name"].len(), 1);
        assert_eq!(file.routes[1].template.as_deref(), Some("Info/welcome"));
        assert_eq!(file.routes[2].target.as_deref(), Some("home"));
    }

    #[test]
    fn test_parse_json_route_file() {
        let file = RouteFile::from_json_str(
            r#"{"routes": [{"name": "home", "url": "/", "params": {"_controller": "Homepage"}}]}"#,
        )
        .unwrap();
        assert_eq!(file.routes[0].params.get_str("_controller"), Some("Homepage"));
    }

    #[test]
    fn test_from_definition_builds_validators() {
        let file = RouteFile::from_toml_str(SAMPLE).unwrap();
        let route = Route::from_definition(
            &file.routes[0],
            &ValidatorRegistry::new(),
            &RoutingSettings::default(),
        )
        .unwrap();
        assert!(route.matches("/who/massimo"));
        assert!(!route.matches("/who/Massimo"));
    }

    #[test]
    fn test_from_definition_redirect_default_code() {
        let file = RouteFile::from_toml_str(SAMPLE).unwrap();
        let route = Route::from_definition(
            &file.routes[2],
            &ValidatorRegistry::new(),
            &RoutingSettings::default(),
        )
        .unwrap();
        assert_eq!(
            route.kind(),
            &RouteKind::Redirect {
                target: "home".into(),
                code: 301
            }
        );
    }

    #[test]
    fn test_from_definition_uses_settings() {
        let settings = RoutingSettings {
            extension: Some("html".into()),
            default_action: "execute".into(),
            ..RoutingSettings::default()
        };
        let definition = RouteDefinition {
            name: "signin".into(),
            url: "/signin".into(),
            kind: DefinitionKind::Route,
            params: [("_controller", "Security")].into_iter().collect(),
            requirements: BTreeMap::new(),
            target: None,
            code: None,
            template: None,
        };
        let route =
            Route::from_definition(&definition, &ValidatorRegistry::new(), &settings).unwrap();
        assert_eq!(route.defaults().get_str("_action"), Some("execute"));
        assert!(route.matches("/signin.html"));
    }

    #[test]
    fn test_from_definition_missing_template() {
        let definition = RouteDefinition {
            name: "bad".into(),
            url: "/bad".into(),
            kind: DefinitionKind::Template,
            params: RouteParams::new(),
            requirements: BTreeMap::new(),
            target: None,
            code: None,
            template: None,
        };
        let err = Route::from_definition(
            &definition,
            &ValidatorRegistry::new(),
            &RoutingSettings::default(),
        )
        .unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_from_path_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            RouteFile::from_path(&path),
            Err(PorticoError::ConfigurationError(_))
        ));
    }
}

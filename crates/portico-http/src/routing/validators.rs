//! Route parameter validators.
//!
//! A validator decides whether a path component may bind a parameter and can
//! hand back a "cleaned" value alongside its verdict (the matched choice, the
//! regex captures, ...). Several validators on one parameter are AND-combined
//! by the route matcher.
//!
//! Every validator first runs the raw value through [`RouteValidator::filter`]
//! (backslash-escaping by default) and then checks the filtered value.
//!
//! Declarative route files describe validators with [`ValidatorSpec`]; the
//! `callback_choice` kind names a resolver that must be registered in a
//! [`ValidatorRegistry`] before the routes are loaded.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use portico_core::utils::text::addslashes;
use portico_core::{PorticoError, PorticoResult};

/// The verdict of a validator.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// The value is acceptable, optionally with a cleaned representation.
    Accepted {
        /// Side-channel value produced by the validator.
        cleaned: Option<Value>,
    },
    /// The value is not acceptable; the route does not match.
    Rejected,
}

impl Validation {
    /// Accepted without a cleaned value.
    pub const fn accepted() -> Self {
        Self::Accepted { cleaned: None }
    }

    /// Accepted with a cleaned value.
    pub const fn cleaned(value: Value) -> Self {
        Self::Accepted {
            cleaned: Some(value),
        }
    }

    /// Returns `true` for accepted values.
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Returns the cleaned value, if any.
    pub const fn cleaned_value(&self) -> Option<&Value> {
        match self {
            Self::Accepted { cleaned } => cleaned.as_ref(),
            Self::Rejected => None,
        }
    }
}

/// A per-parameter acceptance rule used during route matching.
///
/// # Examples
///
/// ```
/// use portico_http::routing::validators::{RouteValidator, Validation};
///
/// #[derive(Debug)]
/// struct Numeric;
///
/// impl RouteValidator for Numeric {
///     fn name(&self) -> &'static str {
///         "numeric"
///     }
///
///     fn check(&self, value: &str) -> Validation {
///         if value.chars().all(|c| c.is_ascii_digit()) {
///             Validation::accepted()
///         } else {
///             Validation::Rejected
///         }
///     }
/// }
///
/// assert!(Numeric.validate("42").is_accepted());
/// assert!(!Numeric.validate("4x").is_accepted());
/// ```
pub trait RouteValidator: fmt::Debug + Send + Sync {
    /// A short name used in log output.
    fn name(&self) -> &'static str;

    /// Normalizes the raw value before it is checked.
    fn filter(&self, value: &str) -> String {
        addslashes(value)
    }

    /// Checks an already filtered value.
    fn check(&self, value: &str) -> Validation;

    /// Filters and checks a raw value.
    fn validate(&self, value: &str) -> Validation {
        let filtered = self.filter(value);
        let verdict = self.check(&filtered);
        if !verdict.is_accepted() {
            tracing::debug!(
                validator = self.name(),
                value = %filtered,
                "value rejected by route validator"
            );
        }
        verdict
    }
}

/// Accepts values found in a fixed list of choices.
///
/// The cleaned value is `{"key": <index>, "value": <choice>}`.
#[derive(Debug, Clone)]
pub struct Choice {
    choices: Vec<String>,
}

impl Choice {
    /// Creates a validator accepting exactly the given choices.
    pub fn new<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the accepted choices.
    pub fn choices(&self) -> &[String] {
        &self.choices
    }
}

impl RouteValidator for Choice {
    fn name(&self) -> &'static str {
        "choice"
    }

    fn check(&self, value: &str) -> Validation {
        self.choices
            .iter()
            .position(|choice| choice == value)
            .map_or(Validation::Rejected, |key| {
                Validation::cleaned(json!({"key": key, "value": self.choices[key]}))
            })
    }
}

/// Produces the records a [`CallbackChoice`] validates against.
pub type ChoiceResolver = Arc<dyn Fn() -> Vec<Value> + Send + Sync>;

/// Accepts values found among records produced on demand by a resolver.
///
/// When a `field` is configured each record is compared through that field,
/// otherwise the record itself is compared. The cleaned value is the matching
/// record.
#[derive(Clone)]
pub struct CallbackChoice {
    resolver: ChoiceResolver,
    field: Option<String>,
}

impl fmt::Debug for CallbackChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackChoice")
            .field("field", &self.field)
            .finish_non_exhaustive()
    }
}

impl CallbackChoice {
    /// Creates a validator backed by `resolver`.
    pub fn new(resolver: ChoiceResolver, field: Option<String>) -> Self {
        Self { resolver, field }
    }
}

impl RouteValidator for CallbackChoice {
    fn name(&self) -> &'static str {
        "callback_choice"
    }

    fn check(&self, value: &str) -> Validation {
        (self.resolver)()
            .into_iter()
            .find(|record| {
                let candidate = match &self.field {
                    Some(field) => record.get(field),
                    None => Some(record),
                };
                candidate.and_then(scalar_to_string).as_deref() == Some(value)
            })
            .map_or(Validation::Rejected, Validation::cleaned)
    }
}

/// Accepts values matching one field of compound records.
///
/// Each choice is either a scalar or an array; arrays are compared through the
/// element at `position`. The cleaned value is `{"key": <index>, "value": <choice>}`.
#[derive(Debug, Clone)]
pub struct MultiChoice {
    choices: Vec<Value>,
    position: usize,
}

impl MultiChoice {
    /// Creates a validator comparing array choices at `position`.
    pub fn new(choices: Vec<Value>, position: usize) -> Self {
        Self { choices, position }
    }
}

impl RouteValidator for MultiChoice {
    fn name(&self) -> &'static str {
        "multi_choice"
    }

    fn check(&self, value: &str) -> Validation {
        for (key, choice) in self.choices.iter().enumerate() {
            let candidate = match choice {
                Value::Array(items) => items.get(self.position),
                other => Some(other),
            };
            if candidate.and_then(scalar_to_string).as_deref() == Some(value) {
                return Validation::cleaned(json!({"key": key, "value": choice}));
            }
        }
        Validation::Rejected
    }
}

/// Accepts values matching a regular expression.
///
/// The cleaned value is the array of capture groups, group 0 first;
/// groups that did not participate are `null`.
#[derive(Debug, Clone)]
pub struct Regexp {
    regex: Regex,
}

impl Regexp {
    /// Compiles `pattern` into a validator.
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::ConfigurationError`] if the pattern is not a valid regex.
    pub fn new(pattern: &str) -> PorticoResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| {
            PorticoError::ConfigurationError(format!("Invalid validator regex '{pattern}': {e}"))
        })?;
        Ok(Self { regex })
    }

    /// Returns the source pattern.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

impl RouteValidator for Regexp {
    fn name(&self) -> &'static str {
        "regexp"
    }

    fn check(&self, value: &str) -> Validation {
        self.regex
            .captures(value)
            .map_or(Validation::Rejected, |captures| {
                let groups: Vec<Value> = captures
                    .iter()
                    .map(|m| m.map_or(Value::Null, |m| Value::String(m.as_str().to_string())))
                    .collect();
                Validation::cleaned(Value::Array(groups))
            })
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Named resolvers available to `callback_choice` validators.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    resolvers: HashMap<String, ChoiceResolver>,
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.resolvers.keys().collect();
        names.sort();
        f.debug_struct("ValidatorRegistry")
            .field("resolvers", &names)
            .finish()
    }
}

impl ValidatorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resolver under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, resolver: F)
    where
        F: Fn() -> Vec<Value> + Send + Sync + 'static,
    {
        self.resolvers.insert(name.into(), Arc::new(resolver));
    }

    /// Returns the resolver registered under `name`.
    pub fn resolver(&self, name: &str) -> Option<ChoiceResolver> {
        self.resolvers.get(name).cloned()
    }
}

/// Declarative description of a validator, as written in route files.
///
/// ```toml
/// [[routes]]
/// name = "who"
/// url = "/who/:name"
/// params = { _controller = "StaticContent", _action = "who" }
/// requirements.name = [{ type = "regexp", pattern = "^[a-z]+$" }]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidatorSpec {
    /// See [`Choice`].
    Choice {
        /// Accepted values.
        choices: Vec<String>,
    },
    /// See [`CallbackChoice`].
    CallbackChoice {
        /// Name of a resolver registered in the [`ValidatorRegistry`].
        resolver: String,
        /// Field compared on each record.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },
    /// See [`MultiChoice`].
    MultiChoice {
        /// Scalar or array choices.
        choices: Vec<Value>,
        /// Index compared inside array choices.
        #[serde(default)]
        position: usize,
    },
    /// See [`Regexp`].
    Regexp {
        /// The regular expression.
        pattern: String,
    },
}

impl ValidatorSpec {
    /// Builds the validator described by this spec.
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::MissingValidatorDependency`] when a
    /// `callback_choice` names an unregistered resolver, and
    /// [`PorticoError::ConfigurationError`] for invalid regexes.
    pub fn build(&self, registry: &ValidatorRegistry) -> PorticoResult<Arc<dyn RouteValidator>> {
        Ok(match self {
            Self::Choice { choices } => Arc::new(Choice::new(choices.iter().cloned())),
            Self::CallbackChoice { resolver, field } => {
                let callback = registry.resolver(resolver).ok_or_else(|| {
                    PorticoError::MissingValidatorDependency(format!(
                        "no choice resolver registered under '{resolver}'"
                    ))
                })?;
                Arc::new(CallbackChoice::new(callback, field.clone()))
            }
            Self::MultiChoice { choices, position } => {
                Arc::new(MultiChoice::new(choices.clone(), *position))
            }
            Self::Regexp { pattern } => Arc::new(Regexp::new(pattern)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_escapes_quotes() {
        let v = Choice::new(["it\\'s"]);
        assert!(v.validate("it's").is_accepted());
        assert!(!v.validate("it\\'s").is_accepted());
    }

    #[test]
    fn test_choice_cleaned_value() {
        let v = Choice::new(["en", "it"]);
        let verdict = v.validate("it");
        assert_eq!(
            verdict.cleaned_value(),
            Some(&json!({"key": 1, "value": "it"}))
        );
        assert_eq!(v.validate("fr"), Validation::Rejected);
    }

    #[test]
    fn test_callback_choice_with_field() {
        let resolver: ChoiceResolver = Arc::new(|| {
            vec![
                json!({"slug": "news", "id": 1}),
                json!({"slug": "sport", "id": 2}),
            ]
        });
        let v = CallbackChoice::new(resolver, Some("slug".into()));
        assert_eq!(
            v.validate("sport").cleaned_value(),
            Some(&json!({"slug": "sport", "id": 2}))
        );
        assert!(!v.validate("weather").is_accepted());
    }

    #[test]
    fn test_callback_choice_numeric_field() {
        let resolver: ChoiceResolver = Arc::new(|| vec![json!({"id": 7})]);
        let v = CallbackChoice::new(resolver, Some("id".into()));
        assert!(v.validate("7").is_accepted());
    }

    #[test]
    fn test_callback_choice_without_field() {
        let resolver: ChoiceResolver = Arc::new(|| vec![json!("a"), json!("b")]);
        let v = CallbackChoice::new(resolver, None);
        assert!(v.validate("b").is_accepted());
    }

    #[test]
    fn test_multi_choice_position() {
        let v = MultiChoice::new(
            vec![json!(["it", "Italiano"]), json!(["en", "English"])],
            1,
        );
        assert_eq!(
            v.validate("English").cleaned_value(),
            Some(&json!({"key": 1, "value": ["en", "English"]}))
        );
        assert!(!v.validate("en").is_accepted());
    }

    #[test]
    fn test_multi_choice_scalar_choices() {
        let v = MultiChoice::new(vec![json!("x"), json!(3)], 0);
        assert!(v.validate("3").is_accepted());
    }

    #[test]
    fn test_regexp_captures() {
        let v = Regexp::new(r"^(\d{4})-(\d{2})(x)?$").unwrap();
        assert_eq!(
            v.validate("2024-05").cleaned_value(),
            Some(&json!(["2024-05", "2024", "05", null]))
        );
        assert!(!v.validate("24-5").is_accepted());
    }

    #[test]
    fn test_regexp_invalid_pattern() {
        assert!(matches!(
            Regexp::new("(unclosed"),
            Err(PorticoError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_spec_deserialize_and_build() {
        let spec: ValidatorSpec =
            serde_json::from_value(json!({"type": "multi_choice", "choices": [["a", "b"]]}))
                .unwrap();
        assert_eq!(
            spec,
            ValidatorSpec::MultiChoice {
                choices: vec![json!(["a", "b"])],
                position: 0,
            }
        );
        let validator = spec.build(&ValidatorRegistry::new()).unwrap();
        assert!(validator.validate("a").is_accepted());
    }

    #[test]
    fn test_spec_missing_resolver() {
        let spec = ValidatorSpec::CallbackChoice {
            resolver: "categories".into(),
            field: None,
        };
        let err = spec.build(&ValidatorRegistry::new()).unwrap_err();
        assert!(matches!(err, PorticoError::MissingValidatorDependency(_)));
    }

    #[test]
    fn test_spec_registered_resolver() {
        let mut registry = ValidatorRegistry::new();
        registry.register("categories", || vec![json!("books")]);
        let spec = ValidatorSpec::CallbackChoice {
            resolver: "categories".into(),
            field: None,
        };
        let validator = spec.build(&registry).unwrap();
        assert!(validator.validate("books").is_accepted());
    }
}

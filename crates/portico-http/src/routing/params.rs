//! Route parameter values.
//!
//! Parameters bound by a route are usually plain strings, but query strings
//! may carry lists (`tag[]=a&tag[]=b`). [`RouteParams`] keeps them in a
//! sorted map so that iteration, and therefore star-segment URL generation,
//! is deterministic.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single route parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// A scalar value.
    Str(String),
    /// An array value, as produced by `key[]=a&key[]=b`.
    List(Vec<String>),
}

impl ParamValue {
    /// Returns the scalar value, or `None` for lists.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::List(_) => None,
        }
    }

    /// Returns `true` for array values.
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Converts the value to JSON for template contexts.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Str(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => items.iter().cloned().map(serde_json::Value::String).collect(),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// An ordered map of parameter name to [`ParamValue`].
///
/// # Examples
///
/// ```
/// use portico_http::routing::RouteParams;
///
/// let mut params = RouteParams::new();
/// params.insert("_controller", "StaticContent");
/// params.insert("_action", "who");
///
/// let mut overlay = RouteParams::new();
/// overlay.insert("_action", "contact");
/// params.overlay(&overlay);
///
/// assert_eq!(params.get_str("_action"), Some("contact"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteParams(BTreeMap<String, ParamValue>);

impl RouteParams {
    /// Creates an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// Returns the scalar value bound to `name`.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(ParamValue::as_str)
    }

    /// Binds `name` to `value`, returning the previous value.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Option<ParamValue> {
        self.0.insert(name.into(), value.into())
    }

    /// Removes `name`, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.0.remove(name)
    }

    /// Returns `true` if `name` is bound.
    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Copies every entry of `other` over this map. Entries of `other` win.
    pub fn overlay(&mut self, other: &Self) {
        for (name, value) in &other.0 {
            self.0.insert(name.clone(), value.clone());
        }
    }

    /// Returns a copy of this map with `other` laid over it.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.overlay(other);
        merged
    }

    /// Iterates over the entries in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, ParamValue> {
        self.0.iter()
    }

    /// Returns the number of bound parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts the map into a JSON object.
    pub fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.0
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect()
    }
}

impl<'a> IntoIterator for &'a RouteParams {
    type Item = (&'a String, &'a ParamValue);
    type IntoIter = btree_map::Iter<'a, String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for RouteParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_iter_and_get() {
        let params: RouteParams = [("_controller", "Homepage"), ("_action", "index")]
            .into_iter()
            .collect();
        assert_eq!(params.len(), 2);
        assert_eq!(params.get_str("_controller"), Some("Homepage"));
        assert_eq!(params.get_str("missing"), None);
    }

    #[test]
    fn test_list_has_no_str() {
        let mut params = RouteParams::new();
        params.insert("tags", vec!["a".to_string(), "b".to_string()]);
        assert!(params.get("tags").is_some_and(ParamValue::is_list));
        assert_eq!(params.get_str("tags"), None);
    }

    #[test]
    fn test_overlay_later_wins() {
        let mut base: RouteParams = [("a", "1"), ("b", "2")].into_iter().collect();
        let over: RouteParams = [("b", "3"), ("c", "4")].into_iter().collect();
        base.overlay(&over);
        assert_eq!(base.get_str("a"), Some("1"));
        assert_eq!(base.get_str("b"), Some("3"));
        assert_eq!(base.get_str("c"), Some("4"));
    }

    #[test]
    fn test_iteration_is_sorted() {
        let params: RouteParams = [("zeta", "1"), ("alpha", "2")].into_iter().collect();
        let names: Vec<&String> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_serde_shape() {
        let mut params = RouteParams::new();
        params.insert("name", "massimo");
        params.insert("ids", vec!["1".to_string()]);
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json, serde_json::json!({"ids": ["1"], "name": "massimo"}));
        let back: RouteParams = serde_json::from_value(json).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn test_display() {
        assert_eq!(ParamValue::from("x").to_string(), "x");
        assert_eq!(
            ParamValue::from(vec!["a".to_string(), "b".to_string()]).to_string(),
            "[a, b]"
        );
    }
}

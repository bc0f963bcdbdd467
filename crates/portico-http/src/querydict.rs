//! Query string dictionary for HTTP request parameters.
//!
//! [`QueryDict`] wraps [`MultiValueDict`] to hold GET and POST parameters.
//! [`to_route_params`](QueryDict::to_route_params) converts it into the
//! parameter map used by the routing layer.

use portico_core::utils::MultiValueDict;

use crate::routing::{ParamValue, RouteParams};

/// A read-only dictionary of query string or form data.
///
/// # Examples
///
/// ```
/// use portico_http::QueryDict;
///
/// let qd = QueryDict::parse("color=red&color=blue&size=large");
/// assert_eq!(qd.get("color"), Some("blue"));
/// assert_eq!(qd.get_list("color"), Some(&vec!["red".to_string(), "blue".to_string()]));
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryDict {
    data: MultiValueDict<String, String>,
}

impl QueryDict {
    /// Creates a new, empty `QueryDict`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a URL query string (e.g. `"key1=val1&key2=val2"`).
    ///
    /// Handles percent-encoding, `+` as space, and multiple values per key.
    pub fn parse(query_string: &str) -> Self {
        let mut data = MultiValueDict::new();

        for pair in query_string.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            data.append(percent_decode(key), percent_decode(value));
        }

        Self { data }
    }

    /// Returns the last value for the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(&key.to_string()).map(String::as_str)
    }

    /// Returns all values for the given key.
    pub fn get_list(&self, key: &str) -> Option<&Vec<String>> {
        self.data.get_list(&key.to_string())
    }

    /// Converts the dictionary into route parameters.
    ///
    /// A key written as `name[]`, or repeated, becomes a list parameter named
    /// `name`; any other key becomes a scalar holding its last value.
    pub fn to_route_params(&self) -> RouteParams {
        let mut params = RouteParams::new();
        for (key, values) in self.data.iter() {
            if let Some(name) = key.strip_suffix("[]") {
                let mut list = match params.remove(name) {
                    Some(ParamValue::List(existing)) => existing,
                    _ => Vec::new(),
                };
                list.extend(values.iter().cloned());
                params.insert(name, ParamValue::List(list));
            } else if values.len() > 1 {
                params.insert(key.as_str(), ParamValue::List(values.clone()));
            } else if let Some(value) = values.last() {
                params.insert(key.as_str(), value.as_str());
            }
        }
        params
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the `QueryDict` contains no keys.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Decodes a form-encoded component.
fn percent_decode(input: &str) -> String {
    let plus_decoded = input.replace('+', " ");
    percent_encoding::percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let qd = QueryDict::new();
        assert!(qd.is_empty());
        assert_eq!(qd.len(), 0);
    }

    #[test]
    fn test_parse_multiple_values() {
        let qd = QueryDict::parse("color=red&color=blue&color=green");
        assert_eq!(qd.get("color"), Some("green"));
        assert_eq!(qd.get_list("color").map(Vec::len), Some(3));
    }

    #[test]
    fn test_parse_percent_and_plus() {
        let qd = QueryDict::parse("name=John+Doe&city=New%20York&flag");
        assert_eq!(qd.get("name"), Some("John Doe"));
        assert_eq!(qd.get("city"), Some("New York"));
        assert_eq!(qd.get("flag"), Some(""));
    }

    #[test]
    fn test_parse_skips_empty_pairs() {
        let qd = QueryDict::parse("a=1&&b=2&");
        assert_eq!(qd.len(), 2);
    }

    #[test]
    fn test_to_route_params_scalars() {
        let params = QueryDict::parse("name=massimo&surname=naccari").to_route_params();
        assert_eq!(params.get_str("name"), Some("massimo"));
        assert_eq!(params.get_str("surname"), Some("naccari"));
    }

    #[test]
    fn test_to_route_params_lists() {
        let params = QueryDict::parse("tag[]=a&tag[]=b&id=1&id=2").to_route_params();
        assert_eq!(
            params.get("tag"),
            Some(&ParamValue::List(vec!["a".into(), "b".into()]))
        );
        assert_eq!(
            params.get("id"),
            Some(&ParamValue::List(vec!["1".into(), "2".into()]))
        );
    }
}

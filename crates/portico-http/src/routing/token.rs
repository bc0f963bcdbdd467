//! Route pattern tokenizer.
//!
//! A pattern such as `/search/:term/*` is split on `/` and `.` into
//! components. Each component becomes a [`Token`]:
//!
//! - `:name` is a variable bound from the matching path component,
//! - `*` is a star that swallows the rest of the path as key/value pairs,
//! - anything else is literal text.
//!
//! Incoming request paths are split with [`split_path`] using the same rule so
//! that both sides line up component by component.

use portico_core::{PorticoError, PorticoResult};

/// One parsed unit of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A literal component that must match verbatim.
    Text(String),
    /// A variable component binding the named parameter.
    Variable(String),
    /// A trailing wildcard consuming the remaining components pairwise.
    Star,
}

/// The result of tokenizing a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPattern {
    /// Tokens in pattern order.
    pub tokens: Vec<Token>,
    /// Names of the variable tokens, in pattern order.
    pub variables: Vec<String>,
    /// `true` when the pattern ends with `/`.
    pub is_directory: bool,
}

impl ParsedPattern {
    /// Returns `true` if the pattern ends with a star token.
    pub fn has_star(&self) -> bool {
        self.tokens.last() == Some(&Token::Star)
    }
}

/// Splits a pattern or path into its non-empty `/`- and `.`-separated components.
fn components(input: &str) -> impl Iterator<Item = &str> {
    input.split(['/', '.']).filter(|c| !c.is_empty())
}

/// Tokenizes a route pattern.
///
/// When `extension` is set and the pattern is neither directory-style nor
/// ending in a star or a `:format` variable, an implicit text token for the
/// extension is appended, so `/who/:name` with extension `html` matches
/// `/who/massimo.html`.
///
/// # Errors
///
/// Returns [`PorticoError::InvalidRoutePattern`] if the pattern does not start
/// with `/` or contains an unnamed variable (`:`).
///
/// # Examples
///
/// ```
/// use portico_http::routing::token::{tokenize, Token};
///
/// let parsed = tokenize("/who/:name", Some("html")).unwrap();
/// assert_eq!(
///     parsed.tokens,
///     vec![
///         Token::Text("who".into()),
///         Token::Variable("name".into()),
///         Token::Text("html".into()),
///     ]
/// );
/// ```
pub fn tokenize(pattern: &str, extension: Option<&str>) -> PorticoResult<ParsedPattern> {
    if !pattern.starts_with('/') {
        return Err(PorticoError::InvalidRoutePattern {
            pattern: pattern.to_string(),
            reason: "a route pattern must start with '/'".to_string(),
        });
    }

    let mut tokens = Vec::new();
    let mut variables = Vec::new();
    let mut parts = components(pattern);

    for part in parts.by_ref() {
        if let Some(name) = part.strip_prefix(':') {
            if name.is_empty() {
                return Err(PorticoError::InvalidRoutePattern {
                    pattern: pattern.to_string(),
                    reason: "variable component without a name".to_string(),
                });
            }
            variables.push(name.to_string());
            tokens.push(Token::Variable(name.to_string()));
        } else if part == "*" {
            tokens.push(Token::Star);
            break;
        } else {
            tokens.push(Token::Text(part.to_string()));
        }
    }

    let ignored: Vec<&str> = parts.collect();
    if !ignored.is_empty() {
        tracing::warn!(
            pattern,
            ignored = ?ignored,
            "components after '*' are ignored"
        );
    }

    let is_directory = pattern.ends_with('/');
    let parsed = ParsedPattern {
        tokens,
        variables,
        is_directory,
    };

    let wants_extension = !parsed.is_directory
        && !parsed.has_star()
        && !matches!(parsed.tokens.last(), Some(Token::Variable(name)) if name == "format");

    match extension.filter(|ext| !ext.is_empty()) {
        Some(ext) if wants_extension => {
            let mut parsed = parsed;
            parsed.tokens.push(Token::Text(ext.to_string()));
            Ok(parsed)
        }
        _ => Ok(parsed),
    }
}

/// Splits a request path into components, percent-decoding each one.
///
/// Decoding happens after splitting, so an encoded `%2F` or `%2E` stays
/// inside its component.
///
/// # Examples
///
/// ```
/// use portico_http::routing::token::split_path;
///
/// assert_eq!(split_path("/who/mario%20rossi.html"), vec!["who", "mario rossi", "html"]);
/// assert!(split_path("/").is_empty());
/// ```
pub fn split_path(path: &str) -> Vec<String> {
    components(path)
        .map(|c| {
            percent_encoding::percent_decode_str(c)
                .decode_utf8_lossy()
                .into_owned()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Token {
        Token::Text(s.to_string())
    }

    fn var(s: &str) -> Token {
        Token::Variable(s.to_string())
    }

    #[test]
    fn test_tokenize_root() {
        let parsed = tokenize("/", None).unwrap();
        assert!(parsed.tokens.is_empty());
        assert!(parsed.is_directory);
    }

    #[test]
    fn test_tokenize_text_and_variables() {
        let parsed = tokenize("/features/:_action", None).unwrap();
        assert_eq!(parsed.tokens, vec![text("features"), var("_action")]);
        assert_eq!(parsed.variables, vec!["_action".to_string()]);
        assert!(!parsed.is_directory);
    }

    #[test]
    fn test_tokenize_splits_on_dots() {
        let parsed = tokenize("/feed/:id.:format", None).unwrap();
        assert_eq!(parsed.tokens, vec![text("feed"), var("id"), var("format")]);
    }

    #[test]
    fn test_tokenize_star_stops_parsing() {
        let parsed = tokenize("/search/*/ignored", None).unwrap();
        assert_eq!(parsed.tokens, vec![text("search"), Token::Star]);
        assert!(parsed.has_star());
    }

    #[test]
    fn test_tokenize_extension_appended() {
        let parsed = tokenize("/signin", Some("html")).unwrap();
        assert_eq!(parsed.tokens, vec![text("signin"), text("html")]);
    }

    #[test]
    fn test_tokenize_extension_skipped_for_directory_star_and_format() {
        assert_eq!(tokenize("/blog/", Some("html")).unwrap().tokens, vec![text("blog")]);
        assert_eq!(
            tokenize("/search/*", Some("html")).unwrap().tokens,
            vec![text("search"), Token::Star]
        );
        assert_eq!(
            tokenize("/feed.:format", Some("html")).unwrap().tokens,
            vec![text("feed"), var("format")]
        );
    }

    #[test]
    fn test_tokenize_rejects_relative_pattern() {
        let err = tokenize("who/:name", None).unwrap_err();
        assert!(matches!(err, PorticoError::InvalidRoutePattern { .. }));
    }

    #[test]
    fn test_tokenize_rejects_unnamed_variable() {
        assert!(tokenize("/who/:", None).is_err());
    }

    #[test]
    fn test_split_path_collapses_empty_components() {
        assert_eq!(split_path("//who///massimo"), vec!["who", "massimo"]);
    }

    #[test]
    fn test_split_path_keeps_encoded_separators() {
        assert_eq!(split_path("/files/a%2Fb%2Ec"), vec!["files", "a/b.c"]);
    }
}

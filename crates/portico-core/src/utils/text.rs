//! String utility functions.

/// Escapes quotes, backslashes and NUL bytes with a backslash.
///
/// This is the default pre-validation filter applied to route parameters.
///
/// # Examples
///
/// ```
/// use portico_core::utils::text::addslashes;
///
/// assert_eq!(addslashes("it's"), "it\\'s");
/// assert_eq!(addslashes("plain"), "plain");
/// ```
pub fn addslashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\'' | '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out
}

/// Lower-cases a value and replaces each space with a hyphen.
///
/// Used when substituting parameters into generated URLs.
///
/// # Examples
///
/// ```
/// use portico_core::utils::text::hyphenate;
///
/// assert_eq!(hyphenate("Hello World"), "hello-world");
/// ```
pub fn hyphenate(s: &str) -> String {
    s.replace(' ', "-").to_lowercase()
}

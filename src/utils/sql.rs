//! SQL utility functions

/// Escape SQL LIKE metacharacters (%, _, \) in user input
///
/// Used when the compiler builds LIKE patterns itself (`$startsWith`,
/// `$endsWith`), so a stored value like `100%` matches literally instead
/// of acting as a wildcard.
///
/// # Example
///
/// ```
/// use sqlsift::utils::sql::escape_like_pattern;
///
/// assert_eq!(escape_like_pattern("100% match_test"), "100\\% match\\_test");
/// ```
pub fn escape_like_pattern(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_special_chars() {
        assert_eq!(escape_like_pattern("hello"), "hello");
    }

    #[test]
    fn escapes_percent_and_underscore() {
        assert_eq!(escape_like_pattern("100%_done"), "100\\%\\_done");
    }

    #[test]
    fn escapes_backslash_first() {
        assert_eq!(escape_like_pattern("a\\%b"), "a\\\\\\%b");
    }

    #[test]
    fn empty_input() {
        assert_eq!(escape_like_pattern(""), "");
    }
}

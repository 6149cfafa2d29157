//! Path helpers. Paths are `/`-separated lists of non-empty segments.

use crate::error::{GraphError, GraphResult};

pub const SEPARATOR: char = '/';

/// Validate a path: non-empty, no empty segments, no leading/trailing `/`.
pub fn validate(path: &str) -> GraphResult<()> {
    if path.is_empty() {
        return Err(GraphError::invalid_path(path, "path must not be empty"));
    }
    if path.split(SEPARATOR).any(str::is_empty) {
        return Err(GraphError::invalid_path(path, "path segments must not be empty"));
    }
    Ok(())
}

/// Split a path into its parent node and final key.
pub fn split(path: &str) -> GraphResult<(&str, &str)> {
    validate(path)?;
    path.rsplit_once(SEPARATOR)
        .ok_or_else(|| GraphError::invalid_path(path, "a value path needs a parent node"))
}

/// Append a key to a node path.
pub fn join(parent: &str, key: &str) -> String {
    format!("{parent}{SEPARATOR}{key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_uses_last_segment() {
        assert_eq!(split("a/b/c").unwrap(), ("a/b", "c"));
    }

    #[test]
    fn split_needs_a_parent() {
        assert!(split("root").is_err());
    }

    #[test]
    fn rejects_empty_segments() {
        assert!(validate("").is_err());
        assert!(validate("a//b").is_err());
        assert!(validate("/a").is_err());
        assert!(validate("a/").is_err());
        assert!(validate("a/b").is_ok());
    }

    #[test]
    fn join_then_split() {
        let joined = join("users/x", "posts");
        assert_eq!(split(&joined).unwrap(), ("users/x", "posts"));
    }
}

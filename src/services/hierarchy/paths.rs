//! Folder paths and object keys.
//!
//! A folder path is a store prefix ending in `/`; root is the empty string,
//! never `/`. File keys never end in `/`. Every function here is pure and
//! never produces `//`.

use crate::errors::{HierarchyError, HierarchyResult};

pub const DELIMITER: &str = "/";

/// Canonical folder form: no leading `/`, no empty segments, trailing `/`
/// unless root.
pub fn normalize_folder(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        out.push_str(segment);
        out.push('/');
    }
    out
}

/// Validate one caller-supplied path segment.
pub fn validate_name(name: &str) -> HierarchyResult<&str> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.contains('/') {
        "name contains `/`"
    } else if name == "." || name == ".." {
        "name is a relative path component"
    } else if name.chars().any(|c| c.is_control() || c == '\\') {
        "name contains control characters or `\\`"
    } else if name.trim() != name {
        "name has leading or trailing whitespace"
    } else {
        return Ok(name);
    };
    Err(HierarchyError::invalid_path(name, reason))
}

/// Normalize a caller-supplied folder path and validate every segment.
pub fn validate_folder(path: &str) -> HierarchyResult<String> {
    let normalized = normalize_folder(path);
    for segment in normalized.split('/').filter(|s| !s.is_empty()) {
        validate_name(segment).map_err(|_| {
            HierarchyError::invalid_path(path, "folder path has an invalid segment")
        })?;
    }
    Ok(normalized)
}

/// Validate a caller-supplied file key.
pub fn validate_key(key: &str) -> HierarchyResult<&str> {
    if key.ends_with('/') {
        return Err(HierarchyError::invalid_path(key, "file keys cannot end with `/`"));
    }
    validate_name(name_of(key))
        .map_err(|_| HierarchyError::invalid_path(key, "file name is invalid"))?;
    validate_folder(parent_of(key).as_str())?;
    if normalize_folder(&parent_of(key)) + name_of(key) != key {
        return Err(HierarchyError::invalid_path(key, "key is not in canonical form"));
    }
    Ok(key)
}

/// Key of file `name` inside `parent`.
pub fn child_key(parent: &str, name: &str) -> String {
    let mut key = normalize_folder(parent);
    key.push_str(name);
    key
}

/// Folder path of `name` inside `parent`.
pub fn child_folder(parent: &str, name: &str) -> String {
    let mut path = child_key(parent, name);
    path.push('/');
    path
}

/// Last `/`-separated segment of a key; the whole key if it has no `/`.
pub fn name_of(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Last non-empty segment of a folder path; empty for root.
pub fn folder_name(path: &str) -> &str {
    path.split('/').filter(|s| !s.is_empty()).next_back().unwrap_or("")
}

/// Folder containing `path` (a folder path or a file key).
pub fn parent_of(path: &str) -> String {
    match path.trim_end_matches('/').rsplit_once('/') {
        Some((parent, _)) => normalize_folder(parent),
        None => String::new(),
    }
}

/// Folder path `new_name` next to `path`, under the same parent.
pub fn sibling_folder(path: &str, new_name: &str) -> String {
    child_folder(&parent_of(path), new_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folder() {
        assert_eq!(normalize_folder(""), "");
        assert_eq!(normalize_folder("/"), "");
        assert_eq!(normalize_folder("a"), "a/");
        assert_eq!(normalize_folder("/a//b/"), "a/b/");
        let once = normalize_folder("x//y");
        assert_eq!(normalize_folder(&once), once);
    }

    #[test]
    fn test_child_keys() {
        assert_eq!(child_key("", "a.txt"), "a.txt");
        assert_eq!(child_key("docs/", "a.txt"), "docs/a.txt");
        assert_eq!(child_key("docs", "a.txt"), "docs/a.txt");
        assert_eq!(child_folder("", "Docs"), "Docs/");
        assert_eq!(child_folder("a/b/", "c"), "a/b/c/");
    }

    #[test]
    fn test_names() {
        assert_eq!(name_of("a/b/c.png"), "c.png");
        assert_eq!(name_of("c.png"), "c.png");
        assert_eq!(folder_name("a/b/"), "b");
        assert_eq!(folder_name("a/"), "a");
        assert_eq!(folder_name(""), "");
    }

    #[test]
    fn test_parent_and_sibling() {
        assert_eq!(parent_of("a/b/"), "a/");
        assert_eq!(parent_of("a/"), "");
        assert_eq!(parent_of(""), "");
        assert_eq!(parent_of("a/b/c.txt"), "a/b/");
        assert_eq!(parent_of("c.txt"), "");
        assert_eq!(sibling_folder("a/b/", "z"), "a/z/");
        assert_eq!(sibling_folder("a/", "z"), "z/");
    }

    #[test]
    fn test_validation() {
        assert!(validate_name("Docs").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name(" padded").is_err());
        assert_eq!(validate_folder("/a//b").unwrap(), "a/b/");
        assert!(validate_folder("a/../b").is_err());
        assert!(validate_key("a/b.txt").is_ok());
        assert!(validate_key("a/").is_err());
        assert!(validate_key("a//b.txt").is_err());
    }
}

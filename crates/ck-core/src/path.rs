//! Path normalization and containment checks.
//!
//! Editor events carry whatever path the host hands us: it may contain `.`
//! or `..` segments, doubled separators, or a trailing slash. Before asking
//! whether a file lies inside a watched root, both sides are normalized and
//! compared component by component.
//!
//! # Examples
//!
//! ```
//! use ck_core::is_path_a_child_of_path;
//!
//! assert!(is_path_a_child_of_path("/proj/src/a.js", "/proj"));
//! assert!(is_path_a_child_of_path("/proj", "/proj"));
//! assert!(!is_path_a_child_of_path("/project2/a.js", "/proj"));
//! assert!(!is_path_a_child_of_path("/proj/../other/a.js", "/proj"));
//! ```

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Normalizes a path lexically, without touching the filesystem.
///
/// - `.` segments are removed
/// - `..` removes the preceding normal segment; at the root it is dropped,
///   and in a relative path with nothing left to remove it is kept
/// - repeated and trailing separators collapse
///
/// # Examples
///
/// ```
/// use ck_core::normalize_path;
///
/// assert_eq!(normalize_path("/proj/./src//a.js".as_ref()), "/proj/src/a.js");
/// assert_eq!(normalize_path("/proj/src/../lib/".as_ref()), "/proj/lib");
/// assert_eq!(normalize_path("/../etc".as_ref()), "/etc");
/// assert_eq!(normalize_path("../a/../b".as_ref()), "../b");
/// ```
#[must_use]
pub fn normalize_path(path: &Utf8Path) -> Utf8PathBuf {
    let mut parts: Vec<Utf8Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => match parts.last() {
                Some(Utf8Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Utf8Component::RootDir | Utf8Component::Prefix(_)) => {}
                Some(Utf8Component::ParentDir | Utf8Component::CurDir) | None => {
                    parts.push(component);
                }
            },
            other => parts.push(other),
        }
    }

    parts.iter().map(Utf8Component::as_str).collect()
}

/// Resolves symlinks in a path as far as the filesystem allows.
///
/// The deepest existing ancestor is canonicalized and the remaining
/// (not yet existing) segments are appended to it. A path with no existing
/// ancestor falls back to [`normalize_path`]. This keeps a deleted or
/// not-yet-written file comparable with a canonicalized root.
#[must_use]
pub fn resolve_path(path: &Utf8Path) -> Utf8PathBuf {
    let normalized = normalize_path(path);
    let mut existing = normalized.as_path();
    let mut tail: Vec<&str> = Vec::new();

    loop {
        if let Ok(mut resolved) = existing.canonicalize_utf8() {
            for segment in tail.iter().rev() {
                resolved.push(segment);
            }
            return resolved;
        }

        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name);
                existing = parent;
            }
            _ => {
                tracing::trace!(path = %normalized, "No existing ancestor, using lexical path");
                return normalized;
            }
        }
    }
}

/// Returns `true` if `candidate` lies at or beneath `parent`.
///
/// Both paths are normalized with [`normalize_path`] and then compared
/// component by component, so `/foo/bar` is not a child of `/foo/ba`.
/// A path counts as a child of itself. An empty argument, or an absolute
/// path compared against a relative one, yields `false`.
///
/// The check never touches the filesystem; callers that want symlinks
/// resolved run both sides through [`resolve_path`] first.
#[must_use]
pub fn is_path_a_child_of_path(candidate: impl AsRef<Utf8Path>, parent: impl AsRef<Utf8Path>) -> bool {
    let candidate = candidate.as_ref();
    let parent = parent.as_ref();

    if candidate.as_str().is_empty() || parent.as_str().is_empty() {
        return false;
    }

    normalize_path(candidate).starts_with(normalize_path(parent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_child_inclusive_root() {
        assert!(is_path_a_child_of_path("/proj", "/proj"));
        assert!(is_path_a_child_of_path("/proj/", "/proj"));
        assert!(is_path_a_child_of_path("/proj", "/proj/"));
    }

    #[test]
    fn test_child_descendant() {
        assert!(is_path_a_child_of_path("/proj/src/a.js", "/proj"));
        assert!(is_path_a_child_of_path("/proj/src/deep/er/b.scss", "/proj/src"));
        assert!(is_path_a_child_of_path("/proj/a.js", "/"));
    }

    #[test]
    fn test_child_component_boundary() {
        assert!(!is_path_a_child_of_path("/project2/a.js", "/proj"));
        assert!(!is_path_a_child_of_path("/foo/bar", "/foo/ba"));
    }

    #[test]
    fn test_child_sibling_after_parent_dir() {
        assert!(!is_path_a_child_of_path("/proj/../other/a.js", "/proj"));
        assert!(is_path_a_child_of_path("/other/../proj/a.js", "/proj"));
        assert!(is_path_a_child_of_path("/proj/./src/../a.js", "/proj"));
    }

    #[test]
    fn test_child_parent_is_deeper() {
        assert!(!is_path_a_child_of_path("/proj", "/proj/src"));
        assert!(!is_path_a_child_of_path("/", "/proj"));
    }

    #[test]
    fn test_child_empty_inputs() {
        assert!(!is_path_a_child_of_path("", "/proj"));
        assert!(!is_path_a_child_of_path("/proj/a.js", ""));
        assert!(!is_path_a_child_of_path("", ""));
    }

    #[test]
    fn test_child_absolute_vs_relative() {
        assert!(!is_path_a_child_of_path("proj/a.js", "/proj"));
        assert!(!is_path_a_child_of_path("/proj/a.js", "proj"));
        assert!(is_path_a_child_of_path("proj/a.js", "proj"));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Utf8Path::new("/a/b/../c")), "/a/c");
        assert_eq!(normalize_path(Utf8Path::new("/a/./b/")), "/a/b");
        assert_eq!(normalize_path(Utf8Path::new("/a//b")), "/a/b");
        assert_eq!(normalize_path(Utf8Path::new("/..")), "/");
        assert_eq!(normalize_path(Utf8Path::new("a/../../b")), "../b");
        assert_eq!(normalize_path(Utf8Path::new("")), "");
    }

    #[test]
    fn test_resolve_path_missing_falls_back_to_lexical() {
        let resolved = resolve_path(Utf8Path::new("/definitely/not/here/../there/a.js"));
        assert_eq!(resolved, "/definitely/not/there/a.js");
    }

    #[test]
    fn test_resolve_path_keeps_missing_tail() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = Utf8Path::from_path(temp_dir.path()).expect("Invalid path");
        let canonical_root = root.canonicalize_utf8().expect("Failed to canonicalize");

        let resolved = resolve_path(&root.join("not-yet").join("written.js"));
        assert_eq!(resolved, canonical_root.join("not-yet").join("written.js"));
        assert!(is_path_a_child_of_path(&resolved, &canonical_root));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_path_follows_symlink() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = Utf8Path::from_path(temp_dir.path()).expect("Invalid path");
        let real = root.join("real");
        std::fs::create_dir(&real).expect("Failed to create dir");
        let link = root.join("link");
        std::os::unix::fs::symlink(&real, &link).expect("Failed to create symlink");

        let through_link = resolve_path(&link.join("a.js"));
        let direct = resolve_path(&real.join("a.js"));
        assert_eq!(through_link, direct);

        // Lexically the link is a different directory
        assert!(!is_path_a_child_of_path(link.join("a.js"), &real));
        assert!(is_path_a_child_of_path(&through_link, resolve_path(&real)));
    }
}

//! Path manipulation utilities for recipe sources
//!
//! Glob patterns are matched one path component at a time. A component
//! containing `*` matches exactly one path component (`*.txt` matches
//! `a.txt`). A component starting with `**` matches one or more components,
//! and the last of them must end with whatever follows the `**` (`**.txt`
//! matches `c/d/e.txt`). A bare `**` component followed by more pattern
//! components may also match zero components.

use crate::error::Result;
use crate::filesystem::DirectoryListing;
use glob::Pattern;
use std::path::{Component, Path, PathBuf};

/// Whether a path string contains a wildcard.
pub fn has_glob(path: &str) -> bool {
    path.contains('*')
}

fn components_of(path: &str) -> Vec<&str> {
    path.split(['/', '\\'])
        .filter(|c| !c.is_empty() && *c != ".")
        .collect()
}

/// The fixed directory prefix of a glob pattern: every component before the
/// first one containing a wildcard.
///
/// `path_before_glob("a/b/*.txt/c/*.d")` is `a/b`. A pattern without a
/// wildcard is returned unchanged.
pub fn path_before_glob(pattern: &str) -> PathBuf {
    let mut result = if pattern.starts_with('/') {
        PathBuf::from("/")
    } else {
        PathBuf::new()
    };
    for component in components_of(pattern) {
        if has_glob(component) {
            break;
        }
        result.push(component);
    }
    result
}

/// `path` with `prefix` removed, or `None` if `prefix` is not a leading part
/// of `path`.
pub fn path_strip_prefix(path: &Path, prefix: &Path) -> Option<PathBuf> {
    path.strip_prefix(prefix).ok().map(Path::to_path_buf)
}

/// Whether `path` matches the glob `pattern`.
///
/// Fails with [`Error::Glob`](crate::error::Error::Glob) when a wildcard
/// component is not a valid pattern.
pub fn path_matches_glob(path: &str, pattern: &str) -> Result<bool> {
    let path = components_of(path);
    let pattern = components_of(pattern);
    match_components(&path, &pattern)
}

fn match_components(path: &[&str], pattern: &[&str]) -> Result<bool> {
    let Some((first, rest)) = pattern.split_first() else {
        return Ok(path.is_empty());
    };

    if let Some(suffix) = first.strip_prefix("**") {
        if suffix.is_empty() && !rest.is_empty() && match_components(path, rest)? {
            return Ok(true);
        }
        for taken in 1..=path.len() {
            if path[taken - 1].ends_with(suffix) && match_components(&path[taken..], rest)? {
                return Ok(true);
            }
        }
        return Ok(false);
    }

    let Some((head, tail)) = path.split_first() else {
        return Ok(false);
    };

    let head_matches = if has_glob(first) {
        Pattern::new(first)?.matches(head)
    } else {
        first == head
    };

    Ok(head_matches && match_components(tail, rest)?)
}

/// Expand a path pattern into the concrete paths it matches.
///
/// A pattern without wildcards is returned as the only element, whether or
/// not it exists. Matches include directories; results are sorted.
pub fn expand_path_globs(pattern: &Path, listing: &dyn DirectoryListing) -> Result<Vec<PathBuf>> {
    let pattern_str = pattern.to_string_lossy();
    if !has_glob(&pattern_str) {
        return Ok(vec![pattern.to_path_buf()]);
    }

    let root = path_before_glob(&pattern_str);
    let glob_components = components_of(&pattern_str).len() - components_of(&root.to_string_lossy()).len();
    let max_depth = if pattern_str.contains("**") {
        None
    } else {
        Some(glob_components)
    };

    let mut matches = Vec::new();
    for candidate in listing.list(&root, max_depth)? {
        if path_matches_glob(&candidate.to_string_lossy(), &pattern_str)? {
            matches.push(candidate);
        }
    }
    matches.sort();
    matches.dedup();
    Ok(matches)
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component where one exists.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    parts.iter().collect()
}

/// The path that leads from directory `base` to `path`, computed lexically.
///
/// When exactly one side is absolute, the other is made absolute against the
/// current directory first. An empty result is returned as `.`.
pub fn relative_path(path: &Path, base: &Path) -> Result<PathBuf> {
    let (path, base) = if path.is_absolute() != base.is_absolute() {
        (std::path::absolute(path)?, std::path::absolute(base)?)
    } else {
        (path.to_path_buf(), base.to_path_buf())
    };

    let path = normalize_path(&path);
    let base = normalize_path(&base);
    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base.components().collect();

    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    if base_parts[common..].contains(&Component::ParentDir) {
        if path.is_absolute() {
            return Err(crate::error::Error::Path {
                message: format!(
                    "cannot express {} relative to {}",
                    path.display(),
                    base.display()
                ),
            });
        }
        // `..` in the base cannot be undone lexically without knowing where
        // it leads.
        return relative_path(&std::path::absolute(&path)?, &std::path::absolute(&base)?);
    }

    let mut result = PathBuf::new();
    for _ in &base_parts[common..] {
        result.push("..");
    }
    for part in &path_parts[common..] {
        result.push(part);
    }

    if result.as_os_str().is_empty() {
        result.push(".");
    }
    Ok(result)
}

/// Whether a relative path escapes its root through `..`, or is absolute.
pub fn escapes_root(path: &Path) -> bool {
    let mut depth: usize = 0;
    for component in path.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return true;
                }
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return true,
        }
    }
    false
}

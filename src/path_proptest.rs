//! Property-based tests for path manipulation functions.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::path::{
        escapes_root, normalize_path, path_before_glob, path_matches_glob, relative_path,
    };
    use proptest::prelude::*;
    use std::path::{Path, PathBuf};

    fn component() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,7}"
    }

    fn relative_components() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(component(), 0..5)
    }

    // ============================================================================
    // relative_path property tests
    // ============================================================================

    proptest! {
        /// Property: base / relative_path(path, base) normalizes back to path
        #[test]
        fn relative_path_rebases_back(
            path in relative_components(),
            base in relative_components(),
        ) {
            let path: PathBuf = path.iter().collect();
            let base: PathBuf = base.iter().collect();
            let relative = relative_path(&path, &base).unwrap();
            prop_assert_eq!(normalize_path(&base.join(&relative)), normalize_path(&path));
        }

        /// Property: a path below its base never needs `..`
        #[test]
        fn relative_path_below_base_has_no_parent_dirs(
            base in relative_components(),
            rest in prop::collection::vec(component(), 1..4),
        ) {
            let base: PathBuf = base.iter().collect();
            let path = base.join(rest.iter().collect::<PathBuf>());
            let relative = relative_path(&path, &base).unwrap();
            prop_assert!(!escapes_root(&relative));
            prop_assert_eq!(relative, rest.iter().collect::<PathBuf>());
        }

        /// Property: normalization is idempotent
        #[test]
        fn normalize_path_is_idempotent(parts in prop::collection::vec("[a-z]{1,3}|\\.|\\.\\.", 0..8)) {
            let path: PathBuf = parts.iter().collect();
            let once = normalize_path(&path);
            prop_assert_eq!(normalize_path(&once), once);
        }
    }

    // ============================================================================
    // glob property tests
    // ============================================================================

    proptest! {
        /// Property: a pattern without wildcards only matches itself
        #[test]
        fn literal_pattern_matches_itself(parts in prop::collection::vec(component(), 1..5)) {
            let path = parts.join("/");
            prop_assert!(path_matches_glob(&path, &path).unwrap());
            let other = format!("{}/extra", path);
            prop_assert!(!path_matches_glob(&other, &path).unwrap());
        }

        /// Property: "<dir>/*" matches every direct child of <dir>
        #[test]
        fn star_matches_direct_children(
            dir in prop::collection::vec(component(), 1..4),
            child in component(),
        ) {
            let dir = dir.join("/");
            let pattern = format!("{}/*", dir);
            let direct = format!("{}/{}", dir, child);
            prop_assert!(path_matches_glob(&direct, &pattern).unwrap());
            let nested = format!("{}/{}/{}", dir, child, child);
            prop_assert!(!path_matches_glob(&nested, &pattern).unwrap());
        }

        /// Property: "<dir>/**.ext" matches files at any depth below <dir>
        #[test]
        fn double_star_matches_any_depth(
            dir in prop::collection::vec(component(), 1..3),
            middle in prop::collection::vec(component(), 0..4),
            name in component(),
        ) {
            let dir = dir.join("/");
            let mut parts = vec![dir.clone()];
            parts.extend(middle);
            parts.push(format!("{}.txt", name));
            let path = parts.join("/");
            let pattern = format!("{}/**.txt", dir);
            prop_assert!(path_matches_glob(&path, &pattern).unwrap());
        }

        /// Property: the fixed prefix of a pattern is a prefix of every match
        #[test]
        fn glob_prefix_is_prefix_of_matches(
            dir in prop::collection::vec(component(), 1..4),
            child in component(),
        ) {
            let dir_path = dir.join("/");
            let pattern = format!("{}/*", dir_path);
            let prefix = path_before_glob(&pattern);
            let candidate = format!("{}/{}", dir_path, child);
            prop_assert!(path_matches_glob(&candidate, &pattern).unwrap());
            prop_assert!(Path::new(&candidate).starts_with(&prefix));
        }
    }
}

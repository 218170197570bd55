//! Shared test utilities for integration and E2E tests.
//!
//! This module provides common fixtures, helper functions, and macros
//! to reduce duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_recipe("runtime.yml", recipes::RUNTIME);
//!     // ... test code
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::recipes;
    pub use super::TestFixture;
}

/// Common recipe YAML snippets for testing.
#[allow(dead_code)]
pub mod recipes {
    /// Core runtime that needs serialization from another recipe.
    pub const RUNTIME: &str = r#"
name: runtime
exports:
  - ecsact_create_registry
  - ecsact_destroy_registry
imports:
  - ecsact_serialize_action
sources:
  - src/runtime.cc
  - path: include/*.hh
    outdir: include
system_libs:
  - pthread
"#;

    /// Serialization module satisfying the runtime's import.
    pub const SERIALIZE: &str = r#"
name: serialize
exports:
  - ecsact_serialize_action
sources:
  - path: serialize.cc
    outdir: serialize
"#;

    /// Exports a function the runtime also exports.
    pub const CONFLICTING: &str = r#"
name: conflicting
exports:
  - ecsact_create_registry
"#;

    /// A recipe without exports.
    pub const NO_EXPORTS: &str = r#"
name: empty
sources: [main.cc]
"#;

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "exports: [unclosed";
}

/// A test fixture that provides a temporary directory with recipes and the
/// files they reference.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new()
///     .with_recipe("serialize.yml", recipes::SERIALIZE)
///     .with_file("serialize.cc", "int serialize;");
///
/// fixture
///     .command()
///     .args(["validate", "serialize.yml"])
///     .assert()
///     .success();
/// ```
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a recipe file with the given content.
    pub fn with_recipe(self, path: &str, content: &str) -> Self {
        self.with_file(path, content)
    }

    /// Add the runtime and serialize recipes with every file they reference.
    #[allow(dead_code)]
    pub fn with_runtime_recipes(self) -> Self {
        self.with_recipe("runtime.yml", recipes::RUNTIME)
            .with_recipe("serialize.yml", recipes::SERIALIZE)
            .with_file("src/runtime.cc", "int runtime;")
            .with_file("include/runtime.hh", "#pragma once")
            .with_file("include/registry.hh", "#pragma once")
            .with_file("serialize.cc", "int serialize;")
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Add a binary file with the given path and content.
    #[allow(dead_code)]
    pub fn with_binary_file(self, path: &str, content: &[u8]) -> Self {
        self.temp_dir
            .child(path)
            .write_binary(content)
            .expect("Failed to write binary file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Directory bundles are extracted into during tests.
    pub fn extract_dir(&self) -> PathBuf {
        self.temp_dir.path().join(".extract")
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture {
    /// Create a command configured to run in this fixture's directory, with
    /// bundle extraction and plugin lookup kept inside the fixture.
    #[allow(dead_code)]
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("ecsact-recipe");
        cmd.current_dir(self.path())
            .env("ECSACT_RECIPE_TEMP_DIR", self.extract_dir())
            .env("ECSACT_RECIPE_PLUGIN_DIR", self.path().join(".plugins"))
            .env("NO_COLOR", "1");
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
    }

    #[test]
    fn test_fixture_with_recipe() {
        let fixture = TestFixture::new().with_recipe("runtime.yml", recipes::RUNTIME);
        assert!(fixture.path().join("runtime.yml").exists());
    }

    #[test]
    fn test_recipes_are_valid_yaml() {
        let recipes = [
            recipes::RUNTIME,
            recipes::SERIALIZE,
            recipes::CONFLICTING,
            recipes::NO_EXPORTS,
        ];
        for recipe in recipes {
            assert!(serde_yaml::from_str::<serde_yaml::Value>(recipe).is_ok());
        }
    }
}

//! # Error Handling
//!
//! This module defines the centralized error handling for the `ecsact-recipe`
//! library. It uses `thiserror` to describe every anticipated failure mode of
//! the cooking pipeline with enough context to point the user at the recipe,
//! source or plugin involved.
//!
//! ## Key Components
//!
//! - **`ParseError`**: The closed set of reasons a recipe document can be
//!   rejected while parsing.
//! - **`MergeError`**: The closed set of reasons two recipes cannot be
//!   composed.
//! - **`Error`**: The crate-wide error. Parse and merge failures convert into
//!   it, alongside bundle, archive, fetch, integrity, plugin and codegen
//!   failures.
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.

use std::path::PathBuf;

use thiserror::Error;

/// Reasons a recipe document is rejected by the parser.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The recipe file could not be read or is not valid YAML.
    #[error("bad recipe file {path}: {message}")]
    BadFile { path: PathBuf, message: String },

    /// `exports` is absent, not a sequence, or empty.
    #[error("recipe is missing a non-empty 'exports' sequence")]
    MissingExports,

    /// The document root is not a mapping.
    #[error("expected a map at the top level of the recipe")]
    ExpectedMapTopLevel,

    /// A `sources` entry is neither a path string nor a map with exactly one
    /// of `codegen`, `fetch` or `path`.
    #[error("invalid source at index {index}: {message}")]
    InvalidSource { index: usize, message: String },

    /// One or more imports are not part of the known runtime API.
    #[error("unknown import method(s): {}", names.join(", "))]
    UnknownImportMethod { names: Vec<String> },

    /// One or more exports are not part of the known runtime API.
    #[error("unknown export method(s): {}", names.join(", "))]
    UnknownExportMethod { names: Vec<String> },

    /// A runtime API module is partially imported and partially exported.
    #[error("module(s) {} appear in both imports and exports", modules.join(", "))]
    ConflictingImportExportMethodModules { modules: Vec<String> },

    /// A known field has the wrong shape (for example a list of numbers
    /// where strings are expected).
    #[error("invalid '{field}' field: {message}")]
    InvalidField { field: String, message: String },
}

/// Reasons two recipes cannot be merged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// Both recipes export the same runtime API function.
    #[error("conflicting export '{name}' in '{base}' and '{target}'")]
    ConflictingExport {
        name: String,
        base: String,
        target: String,
    },
}

/// Main error type for ecsact-recipe operations
#[derive(Error, Debug)]
pub enum Error {
    /// A recipe failed to parse.
    #[error("Recipe parse error in {recipe}: {source}")]
    Parse {
        recipe: String,
        #[source]
        source: ParseError,
    },

    /// Two recipes could not be merged.
    #[error("Recipe merge error: {0}")]
    Merge(#[from] MergeError),

    /// No recipe was supplied to an operation that needs at least one.
    #[error("No recipe given")]
    NoRecipe,

    /// A recipe argument could not be turned into a recipe file.
    #[error("Invalid recipe argument '{arg}': {message}")]
    RecipeArgument { arg: String, message: String },

    /// The composed recipe still imports functions nobody exports.
    #[error("Unresolved imports: {}", imports.join(", "))]
    UnresolvedImports { imports: Vec<String> },

    /// A source could not be materialized into the working directory.
    #[error("Source {index} of recipe '{recipe}' failed: {message}")]
    Source {
        recipe: String,
        index: usize,
        message: String,
    },

    /// A bundle could not be created or extracted.
    #[error("Bundle error: {message}")]
    Bundle { message: String },

    /// An archive byte stream could not be read or written.
    #[error("Archive error: {message}")]
    Archive { message: String },

    /// A download failed.
    #[error("Fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Downloaded bytes do not match the declared digest.
    #[error("Integrity mismatch for {url}: expected {expected}, got {actual}")]
    Integrity {
        url: String,
        expected: String,
        actual: String,
    },

    /// An integrity string could not be parsed.
    #[error("Invalid integrity '{value}': {message}")]
    InvalidIntegrity { value: String, message: String },

    /// A codegen plugin could not be located.
    #[error("Unable to find codegen plugin '{plugin}', checked:{}", checked.iter().map(|p| format!("\n  {}", p.display())).collect::<String>())]
    PluginNotFound {
        plugin: String,
        checked: Vec<PathBuf>,
    },

    /// A codegen plugin could not be loaded or misbehaved.
    #[error("Codegen plugin error: {plugin} - {message}")]
    Plugin { plugin: String, message: String },

    /// A codegen pass failed.
    #[error("Codegen error: {message}")]
    Codegen { message: String },

    /// The built artifact does not provide what the recipe declares.
    #[error("Artifact is missing {} declared symbol(s): {}", missing.len(), missing.join(", "))]
    Taste { missing: Vec<String> },

    /// A built artifact could not be inspected.
    #[error("Artifact error: {path}: {message}")]
    Artifact { path: PathBuf, message: String },

    /// An error occurred with an in-memory filesystem operation.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// An error occurred with a path-related operation.
    #[error("Path operation error: {message}")]
    Path { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML error, wrapped from `serde_yaml::Error`.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Wraps a [`ParseError`] with the recipe it came from.
    pub fn parse(recipe: impl Into<String>, source: ParseError) -> Self {
        Error::Parse {
            recipe: recipe.into(),
            source,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_parse() {
        let error = Error::parse("a.yml", ParseError::MissingExports);
        let display = format!("{}", error);
        assert!(display.contains("Recipe parse error in a.yml"));
        assert!(display.contains("exports"));
    }

    #[test]
    fn test_error_display_unknown_methods() {
        let error = ParseError::UnknownExportMethod {
            names: vec!["ecsact_nope".to_string(), "ecsact_nah".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "unknown export method(s): ecsact_nope, ecsact_nah"
        );
    }

    #[test]
    fn test_error_from_merge_error() {
        let error: Error = MergeError::ConflictingExport {
            name: "ecsact_create_registry".to_string(),
            base: "A".to_string(),
            target: "B".to_string(),
        }
        .into();
        let display = format!("{}", error);
        assert!(display.contains("Recipe merge error"));
        assert!(display.contains("ecsact_create_registry"));
    }

    #[test]
    fn test_error_display_plugin_not_found_lists_paths() {
        let error = Error::PluginNotFound {
            plugin: "cpp_header".to_string(),
            checked: vec![
                PathBuf::from("/share/ecsact/plugins/ecsact_cpp_header_codegen.so"),
                PathBuf::from("cpp_header"),
            ],
        };
        let display = format!("{}", error);
        assert!(display.contains("cpp_header"));
        assert!(display.contains("\n  /share/ecsact/plugins/ecsact_cpp_header_codegen.so"));
        assert!(display.contains("\n  cpp_header"));
    }

    #[test]
    fn test_error_display_source() {
        let error = Error::Source {
            recipe: "runtime".to_string(),
            index: 2,
            message: "file does not exist".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Source 2 of recipe 'runtime' failed: file does not exist"
        );
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_yaml_error() {
        let yaml_str = "invalid: [unclosed";
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let error: Error = yaml_error.into();
        let display = format!("{}", error);
        assert!(display.contains("YAML error"));
    }

    #[test]
    fn test_error_taste_counts_missing() {
        let error = Error::Taste {
            missing: vec!["ecsact_create_registry".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "Artifact is missing 1 declared symbol(s): ecsact_create_registry"
        );
    }
}

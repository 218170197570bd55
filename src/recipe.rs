//! # Recipe Model
//!
//! A recipe describes what goes into a runtime build: the runtime API
//! functions it exports and imports, the sources that make it up and the
//! system libraries it links against.
//!
//! ## Recipe document
//!
//! ```yaml
//! name: my runtime
//! exports:
//!   - ecsact_create_registry
//! imports:
//!   - ecsact_serialize_action
//! system_libs: [pthread]
//! sources:
//!   - src/runtime.cc                  # path source, no outdir
//!   - path: include/**.hh
//!     outdir: include
//!   - path: extra/local.cc
//!     relative_to_cwd: true
//!   - fetch: https://example.com/lib.tar.gz
//!     integrity: sha256-...
//!     strip_prefix: lib-1.0
//!     paths: [include/lib.h]
//!     outdir: third_party
//!   - codegen: [cpp_header, ./plugins/my_plugin.so]
//!     outdir: generated
//! ```
//!
//! Relative path sources are stored as written and resolve against the
//! recipe's base directory (the directory of the recipe file) unless
//! `relative_to_cwd` is set.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::error::{Error, ParseError, Result};
use crate::integrity::Integrity;
use crate::modules::group_by_module;

/// Name of a recipe that does not declare one.
pub const DEFAULT_RECIPE_NAME: &str = "(unnamed)";

/// A source that copies local files.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSource {
    /// File, directory or glob pattern.
    pub path: PathBuf,
    /// Destination directory below the working directory.
    pub outdir: Option<PathBuf>,
    /// Resolve `path` against the process working directory instead of the
    /// recipe base directory.
    pub relative_to_cwd: bool,
}

impl PathSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            outdir: None,
            relative_to_cwd: false,
        }
    }

    pub fn with_outdir(mut self, outdir: impl Into<PathBuf>) -> Self {
        self.outdir = Some(outdir.into());
        self
    }
}

/// A source downloaded from a URL.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSource {
    pub url: String,
    /// Expected digest of the downloaded bytes.
    pub integrity: Option<Integrity>,
    /// Leading directory removed from archive entries.
    pub strip_prefix: Option<PathBuf>,
    pub outdir: Option<PathBuf>,
    /// Archive entries to keep (after `strip_prefix`). Empty keeps all.
    pub paths: Vec<String>,
}

impl FetchSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            integrity: None,
            strip_prefix: None,
            outdir: None,
            paths: Vec::new(),
        }
    }
}

/// A source produced by running codegen plugins.
#[derive(Debug, Clone, PartialEq)]
pub struct CodegenSource {
    /// Built-in plugin names or plugin paths.
    pub plugins: Vec<String>,
    pub outdir: Option<PathBuf>,
}

/// One ingredient of a recipe.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Path(PathSource),
    Fetch(FetchSource),
    Codegen(CodegenSource),
}

impl Source {
    pub fn outdir(&self) -> Option<&Path> {
        match self {
            Source::Path(src) => src.outdir.as_deref(),
            Source::Fetch(src) => src.outdir.as_deref(),
            Source::Codegen(src) => src.outdir.as_deref(),
        }
    }

    /// Short description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Source::Path(src) => format!("path {}", src.path.display()),
            Source::Fetch(src) => format!("fetch {}", src.url),
            Source::Codegen(src) => format!("codegen {}", src.plugins.join(", ")),
        }
    }
}

/// A parsed build recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub(crate) name: String,
    pub(crate) base_directory: PathBuf,
    pub(crate) exports: Vec<String>,
    pub(crate) imports: Vec<String>,
    pub(crate) sources: Vec<Source>,
    pub(crate) system_libs: Vec<String>,
}

impl Recipe {
    /// Read and parse a recipe file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> std::result::Result<Self, ParseError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ParseError::BadFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&content, path)
    }

    /// Parse a recipe document as if it was loaded from `recipe_path`.
    pub fn from_yaml_str(
        yaml: &str,
        recipe_path: impl AsRef<Path>,
    ) -> std::result::Result<Self, ParseError> {
        let recipe_path = recipe_path.as_ref();
        let doc: Value = serde_yaml::from_str(yaml).map_err(|e| ParseError::BadFile {
            path: recipe_path.to_path_buf(),
            message: e.to_string(),
        })?;

        let Value::Mapping(doc) = doc else {
            return Err(ParseError::ExpectedMapTopLevel);
        };

        let name = match doc.get("name") {
            None | Some(Value::Null) => DEFAULT_RECIPE_NAME.to_string(),
            Some(Value::String(name)) => name.clone(),
            Some(_) => {
                return Err(ParseError::InvalidField {
                    field: "name".to_string(),
                    message: "expected a string".to_string(),
                })
            }
        };

        let exports = match doc.get("exports") {
            Some(value @ Value::Sequence(_)) => string_list("exports", value)?,
            _ => return Err(ParseError::MissingExports),
        };
        let imports = optional_string_list(&doc, "imports")?;
        let sources = parse_sources(doc.get("sources"))?;
        let system_libs = optional_string_list(&doc, "system_libs")?;

        if exports.is_empty() {
            return Err(ParseError::MissingExports);
        }

        check_methods(&imports, &exports)?;

        Ok(Self {
            name,
            base_directory: recipe_path.parent().map(Path::to_path_buf).unwrap_or_default(),
            exports,
            imports,
            sources,
            system_libs,
        })
    }

    pub(crate) fn from_parts(
        name: String,
        base_directory: PathBuf,
        exports: Vec<String>,
        imports: Vec<String>,
        sources: Vec<Source>,
        system_libs: Vec<String>,
    ) -> Self {
        Self {
            name,
            base_directory,
            exports,
            imports,
            sources,
            system_libs,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory the recipe was loaded from.
    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn exports(&self) -> &[String] {
        &self.exports
    }

    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn system_libs(&self) -> &[String] {
        &self.system_libs
    }

    /// Replace the sources, used after bundling rewrites them.
    pub fn update_sources(&mut self, sources: Vec<Source>) {
        self.sources = sources;
    }

    /// Where a path source's files actually live.
    pub fn resolved_source_path(&self, source: &PathSource) -> PathBuf {
        if source.relative_to_cwd || source.path.is_absolute() {
            source.path.clone()
        } else {
            self.base_directory.join(&source.path)
        }
    }

    /// Serialize back into a recipe document.
    pub fn to_yaml_string(&self) -> Result<String> {
        let raw = RawRecipe {
            name: &self.name,
            exports: &self.exports,
            imports: &self.imports,
            sources: self.sources.iter().map(RawSource::from).collect(),
            system_libs: &self.system_libs,
        };
        serde_yaml::to_string(&raw).map_err(Error::Yaml)
    }

    pub fn to_yaml_bytes(&self) -> Result<Vec<u8>> {
        self.to_yaml_string().map(String::into_bytes)
    }
}

fn invalid_field(field: &str, message: impl Into<String>) -> ParseError {
    ParseError::InvalidField {
        field: field.to_string(),
        message: message.into(),
    }
}

fn string_list(field: &str, value: &Value) -> std::result::Result<Vec<String>, ParseError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid_field(field, "expected a list of strings"))
            })
            .collect(),
        _ => Err(invalid_field(field, "expected a list")),
    }
}

fn optional_string_list(doc: &Mapping, field: &str) -> std::result::Result<Vec<String>, ParseError> {
    match doc.get(field) {
        None => Ok(Vec::new()),
        Some(value) => string_list(field, value),
    }
}

fn check_methods(imports: &[String], exports: &[String]) -> std::result::Result<(), ParseError> {
    let import_modules = group_by_module(imports);
    let export_modules = group_by_module(exports);

    if !import_modules.unknown_methods.is_empty() {
        return Err(ParseError::UnknownImportMethod {
            names: import_modules.unknown_methods,
        });
    }
    if !export_modules.unknown_methods.is_empty() {
        return Err(ParseError::UnknownExportMethod {
            names: export_modules.unknown_methods,
        });
    }

    let conflicting: Vec<String> = import_modules
        .module_methods
        .keys()
        .filter(|module| export_modules.module_methods.contains_key(*module))
        .map(|module| module.to_string())
        .collect();
    if !conflicting.is_empty() {
        return Err(ParseError::ConflictingImportExportMethodModules {
            modules: conflicting,
        });
    }

    Ok(())
}

fn parse_sources(value: Option<&Value>) -> std::result::Result<Vec<Source>, ParseError> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Sequence(items)) => items,
        Some(_) => return Err(invalid_field("sources", "expected a list")),
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_source(index, item))
        .collect()
}

fn parse_source(index: usize, value: &Value) -> std::result::Result<Source, ParseError> {
    let invalid = |message: &str| ParseError::InvalidSource {
        index,
        message: message.to_string(),
    };

    let map = match value {
        Value::String(path) => return Ok(Source::Path(PathSource::new(path))),
        Value::Mapping(map) => map,
        _ => return Err(invalid("expected a path string or a map")),
    };

    let optional_string = |key: &str| -> std::result::Result<Option<String>, ParseError> {
        match map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(invalid(&format!("'{}' must be a string", key))),
        }
    };

    let codegen = map.get("codegen");
    let fetch = map.get("fetch");
    let path = map.get("path");
    let kinds = [codegen, fetch, path].iter().filter(|v| v.is_some()).count();
    if kinds != 1 {
        return Err(invalid("expected exactly one of 'codegen', 'fetch' or 'path'"));
    }

    let outdir = optional_string("outdir")?.map(PathBuf::from);

    if let Some(codegen) = codegen {
        let plugins = match codegen {
            Value::String(plugin) => vec![plugin.clone()],
            Value::Sequence(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| invalid("'codegen' entries must be strings"))
                })
                .collect::<std::result::Result<Vec<_>, _>>()?,
            _ => return Err(invalid("'codegen' must be a string or a list of strings")),
        };
        if plugins.is_empty() {
            return Err(invalid("'codegen' lists no plugins"));
        }
        return Ok(Source::Codegen(CodegenSource { plugins, outdir }));
    }

    if fetch.is_some() {
        let url = optional_string("fetch")?.ok_or_else(|| invalid("'fetch' must be a URL"))?;
        let integrity = match optional_string("integrity")? {
            Some(text) => {
                let integrity = Integrity::from_string(&text).map_err(|e| invalid(&e.to_string()))?;
                if integrity.is_unknown() {
                    return Err(invalid("'integrity' must be a digest"));
                }
                Some(integrity)
            }
            None => None,
        };
        let paths = match map.get("paths") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| invalid("'paths' entries must be strings"))
                })
                .collect::<std::result::Result<Vec<_>, _>>()?,
            Some(_) => return Err(invalid("'paths' must be a list")),
        };
        return Ok(Source::Fetch(FetchSource {
            url,
            integrity,
            strip_prefix: optional_string("strip_prefix")?.map(PathBuf::from),
            outdir,
            paths,
        }));
    }

    let path = optional_string("path")?.ok_or_else(|| invalid("'path' must be a string"))?;
    let relative_to_cwd = match map.get("relative_to_cwd") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => return Err(invalid("'relative_to_cwd' must be a boolean")),
    };
    Ok(Source::Path(PathSource {
        path: PathBuf::from(path),
        outdir,
        relative_to_cwd,
    }))
}

/// Path text as written to a recipe document, with `/` separators.
pub(crate) fn path_to_yaml(path: &Path) -> String {
    let text = path.to_string_lossy().into_owned();
    if cfg!(windows) {
        text.replace('\\', "/")
    } else {
        text
    }
}

#[derive(Serialize)]
struct RawRecipe<'a> {
    name: &'a str,
    exports: &'a [String],
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    imports: &'a [String],
    sources: Vec<RawSource>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    system_libs: &'a [String],
}

#[derive(Serialize)]
#[serde(untagged)]
enum RawSource {
    Path(String),
    Map(RawSourceMap),
}

#[derive(Serialize, Default)]
struct RawSourceMap {
    #[serde(skip_serializing_if = "Option::is_none")]
    codegen: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fetch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    integrity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    strip_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    paths: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outdir: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    relative_to_cwd: bool,
}

impl From<&Source> for RawSource {
    fn from(source: &Source) -> Self {
        match source {
            Source::Path(src) if src.outdir.is_none() && !src.relative_to_cwd => {
                RawSource::Path(path_to_yaml(&src.path))
            }
            Source::Path(src) => RawSource::Map(RawSourceMap {
                path: Some(path_to_yaml(&src.path)),
                outdir: src.outdir.as_deref().map(path_to_yaml),
                relative_to_cwd: src.relative_to_cwd,
                ..Default::default()
            }),
            Source::Fetch(src) => RawSource::Map(RawSourceMap {
                fetch: Some(src.url.clone()),
                integrity: src.integrity.map(|i| i.to_string()),
                strip_prefix: src.strip_prefix.as_deref().map(path_to_yaml),
                paths: (!src.paths.is_empty()).then(|| src.paths.clone()),
                outdir: src.outdir.as_deref().map(path_to_yaml),
                ..Default::default()
            }),
            Source::Codegen(src) => RawSource::Map(RawSourceMap {
                codegen: Some(src.plugins.clone()),
                outdir: src.outdir.as_deref().map(path_to_yaml),
                ..Default::default()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_RECIPE: &str = r#"
name: full
exports:
  - ecsact_create_registry
  - ecsact_destroy_registry
imports:
  - ecsact_serialize_action
system_libs: [pthread, dl]
sources:
  - src/runtime.cc
  - path: include/**.hh
    outdir: include
  - path: extra/local.cc
    relative_to_cwd: true
  - fetch: https://example.com/lib.tar.gz
    integrity: sha256-LPJNul+wow4m6DsqxbninhsWHlwfp0JecwQzYpOLmCQ=
    strip_prefix: lib-1.0
    paths: [include/lib.h]
    outdir: third_party
  - codegen: cpp_header
  - codegen: [cpp_systems_header, ./plugins/mine.so]
    outdir: generated
"#;

    fn parse(yaml: &str) -> std::result::Result<Recipe, ParseError> {
        Recipe::from_yaml_str(yaml, "recipes/runtime.yml")
    }

    #[test]
    fn test_parse_full_recipe() {
        let recipe = parse(FULL_RECIPE).unwrap();
        assert_eq!(recipe.name(), "full");
        assert_eq!(recipe.base_directory(), Path::new("recipes"));
        assert_eq!(recipe.exports().len(), 2);
        assert_eq!(recipe.imports(), ["ecsact_serialize_action".to_string()]);
        assert_eq!(recipe.system_libs(), ["pthread".to_string(), "dl".to_string()]);
        assert_eq!(recipe.sources().len(), 6);

        match &recipe.sources()[0] {
            Source::Path(src) => {
                assert_eq!(src.path, PathBuf::from("src/runtime.cc"));
                assert_eq!(src.outdir, None);
                assert!(!src.relative_to_cwd);
                assert_eq!(
                    recipe.resolved_source_path(src),
                    PathBuf::from("recipes/src/runtime.cc")
                );
            }
            other => panic!("Expected path source, got {:?}", other),
        }

        match &recipe.sources()[2] {
            Source::Path(src) => {
                assert!(src.relative_to_cwd);
                assert_eq!(recipe.resolved_source_path(src), PathBuf::from("extra/local.cc"));
            }
            other => panic!("Expected path source, got {:?}", other),
        }

        match &recipe.sources()[3] {
            Source::Fetch(src) => {
                assert_eq!(src.url, "https://example.com/lib.tar.gz");
                assert!(src.integrity.unwrap().verify(b"hello"));
                assert_eq!(src.strip_prefix, Some(PathBuf::from("lib-1.0")));
                assert_eq!(src.paths, vec!["include/lib.h".to_string()]);
                assert_eq!(src.outdir, Some(PathBuf::from("third_party")));
            }
            other => panic!("Expected fetch source, got {:?}", other),
        }

        match &recipe.sources()[4] {
            Source::Codegen(src) => {
                assert_eq!(src.plugins, vec!["cpp_header".to_string()]);
                assert_eq!(src.outdir, None);
            }
            other => panic!("Expected codegen source, got {:?}", other),
        }

        match &recipe.sources()[5] {
            Source::Codegen(src) => {
                assert_eq!(src.plugins.len(), 2);
                assert_eq!(src.outdir, Some(PathBuf::from("generated")));
            }
            other => panic!("Expected codegen source, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let recipe = parse("exports: [ecsact_create_registry]").unwrap();
        assert_eq!(recipe.name(), DEFAULT_RECIPE_NAME);
        assert!(recipe.imports().is_empty());
        assert!(recipe.sources().is_empty());
        assert!(recipe.system_libs().is_empty());
    }

    #[test]
    fn test_expected_map_top_level() {
        assert_eq!(parse("- a\n- b\n"), Err(ParseError::ExpectedMapTopLevel));
        assert_eq!(parse("just a string"), Err(ParseError::ExpectedMapTopLevel));
    }

    #[test]
    fn test_missing_exports() {
        assert_eq!(parse("name: x\n"), Err(ParseError::MissingExports));
        assert_eq!(parse("exports: []\n"), Err(ParseError::MissingExports));
        assert_eq!(parse("exports: ecsact_create_registry\n"), Err(ParseError::MissingExports));
    }

    #[test]
    fn test_bad_file() {
        assert!(matches!(parse("exports: [unclosed"), Err(ParseError::BadFile { .. })));
        assert!(matches!(
            Recipe::from_yaml_file("definitely/not/here.yml"),
            Err(ParseError::BadFile { .. })
        ));
    }

    #[test]
    fn test_invalid_source() {
        let both = r#"
exports: [ecsact_create_registry]
sources:
  - a.cc
  - path: b.cc
    fetch: https://example.com/b.cc
"#;
        assert!(matches!(parse(both), Err(ParseError::InvalidSource { index: 1, .. })));

        let neither = r#"
exports: [ecsact_create_registry]
sources:
  - outdir: x
"#;
        assert!(matches!(parse(neither), Err(ParseError::InvalidSource { index: 0, .. })));

        let number = r#"
exports: [ecsact_create_registry]
sources: [42]
"#;
        assert!(matches!(parse(number), Err(ParseError::InvalidSource { index: 0, .. })));

        let empty_codegen = r#"
exports: [ecsact_create_registry]
sources:
  - codegen: []
"#;
        assert!(matches!(
            parse(empty_codegen),
            Err(ParseError::InvalidSource { index: 0, .. })
        ));

        let bad_integrity = r#"
exports: [ecsact_create_registry]
sources:
  - fetch: https://example.com/a.h
    integrity: md5-abc
"#;
        assert!(matches!(
            parse(bad_integrity),
            Err(ParseError::InvalidSource { index: 0, .. })
        ));
    }

    #[test]
    fn test_unknown_methods() {
        assert_eq!(
            parse("exports: [ecsact_create_registry]\nimports: [ecsact_bogus]\n"),
            Err(ParseError::UnknownImportMethod {
                names: vec!["ecsact_bogus".to_string()]
            })
        );
        assert_eq!(
            parse("exports: [ecsact_bogus]\n"),
            Err(ParseError::UnknownExportMethod {
                names: vec!["ecsact_bogus".to_string()]
            })
        );
    }

    #[test]
    fn test_conflicting_import_export_modules() {
        let yaml = r#"
exports: [ecsact_create_registry]
imports: [ecsact_destroy_registry]
"#;
        assert_eq!(
            parse(yaml),
            Err(ParseError::ConflictingImportExportMethodModules {
                modules: vec!["core".to_string()]
            })
        );
    }

    #[test]
    fn test_invalid_field_types() {
        assert!(matches!(
            parse("exports: [1, 2]\n"),
            Err(ParseError::InvalidField { .. })
        ));
        assert!(matches!(
            parse("exports: [ecsact_create_registry]\nsystem_libs: pthread\n"),
            Err(ParseError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_serialize_round_trip() {
        let recipe = parse(FULL_RECIPE).unwrap();
        let yaml = recipe.to_yaml_string().unwrap();
        let reparsed = parse(&yaml).unwrap();
        assert_eq!(reparsed, recipe);
    }

    #[test]
    fn test_serialize_uses_scalar_for_plain_paths() {
        let recipe = parse("exports: [ecsact_create_registry]\nsources: [a/b.cc]\n").unwrap();
        let yaml = recipe.to_yaml_string().unwrap();
        assert!(yaml.contains("- a/b.cc"));
        assert!(!yaml.contains("imports"));
        assert!(!yaml.contains("relative_to_cwd"));
    }

    #[test]
    fn test_update_sources() {
        let mut recipe = parse(FULL_RECIPE).unwrap();
        recipe.update_sources(vec![Source::Path(PathSource::new("files/a.cc"))]);
        assert_eq!(recipe.sources().len(), 1);
        assert_eq!(recipe.sources()[0].describe(), "path files/a.cc");
    }
}

//! Recipe composition
//!
//! `merge(base, target)` folds `target` into `base`. The result keeps the
//! base directory of `base`, so every relative path `target` carries is
//! rewritten to stay pointed at the same file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::MergeError;
use crate::path::relative_path;
use crate::plugin::is_builtin_plugin_name;
use crate::recipe::{CodegenSource, PathSource, Recipe, Source};

/// Compose two recipes into one.
///
/// Fails when both recipes export the same function. Imports satisfied by
/// either recipe's exports are dropped from the result.
pub fn merge(base: &Recipe, target: &Recipe) -> Result<Recipe, MergeError> {
    let base_exports: HashSet<&str> = base.exports().iter().map(String::as_str).collect();
    if let Some(name) = target
        .exports()
        .iter()
        .find(|name| base_exports.contains(name.as_str()))
    {
        return Err(MergeError::ConflictingExport {
            name: name.clone(),
            base: base.name().to_string(),
            target: target.name().to_string(),
        });
    }

    let exports: Vec<String> = base
        .exports()
        .iter()
        .chain(target.exports())
        .cloned()
        .collect();

    let mut imports: Vec<String> = Vec::new();
    for import in base.imports().iter().chain(target.imports()) {
        if !exports.contains(import) && !imports.contains(import) {
            imports.push(import.clone());
        }
    }

    let system_libs = base
        .system_libs()
        .iter()
        .chain(target.system_libs())
        .cloned()
        .collect();

    let mut sources = base.sources().to_vec();
    sources.extend(
        target
            .sources()
            .iter()
            .map(|source| rebase_source(source, target.base_directory(), base.base_directory())),
    );

    Ok(Recipe::from_parts(
        format!("{} + {}", base.name(), target.name()),
        base.base_directory().to_path_buf(),
        exports,
        imports,
        sources,
        system_libs,
    ))
}

/// Express `path`, relative to `from`, as a path relative to `to`.
fn rebase(path: &Path, from: &Path, to: &Path) -> PathBuf {
    let joined = from.join(path);
    match relative_path(&joined, to) {
        Ok(rebased) => rebased,
        Err(err) => {
            log::warn!(
                "unable to rebase {} onto {}: {}",
                joined.display(),
                to.display(),
                err
            );
            joined
        }
    }
}

fn rebase_source(source: &Source, from: &Path, to: &Path) -> Source {
    match source {
        Source::Path(src) if !src.relative_to_cwd && !src.path.is_absolute() => {
            Source::Path(PathSource {
                path: rebase(&src.path, from, to),
                ..src.clone()
            })
        }
        Source::Codegen(src) => Source::Codegen(CodegenSource {
            plugins: src
                .plugins
                .iter()
                .map(|plugin| {
                    if is_builtin_plugin_name(plugin) || Path::new(plugin).is_absolute() {
                        plugin.clone()
                    } else {
                        crate::recipe::path_to_yaml(&rebase(Path::new(plugin), from, to))
                    }
                })
                .collect(),
            outdir: src.outdir.clone(),
        }),
        other => other.clone(),
    }
}

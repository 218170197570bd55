//! Phase 4: Tasting the Artifact
//!
//! After the working directory has been compiled into a runtime library, the
//! library's symbol table is checked against the recipe: every export must be
//! defined and every import must at least be referenced.
//!
//! Symbol tables are read with `goblin`, so ELF, PE and Mach-O artifacts can
//! be checked on any host without loading them.

use std::collections::BTreeSet;
use std::path::Path;

use goblin::elf::Elf;
use goblin::mach::Mach;
use goblin::Object;

use crate::error::{Error, Result};
use crate::recipe::Recipe;
use crate::report::Reporter;

/// Symbols of a built artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSymbols {
    /// Symbols the artifact defines and exports.
    pub exports: BTreeSet<String>,
    /// Symbols the artifact expects from elsewhere.
    pub imports: BTreeSet<String>,
}

impl ArtifactSymbols {
    /// Whether `name` appears anywhere in the symbol table.
    pub fn contains(&self, name: &str) -> bool {
        self.exports.contains(name) || self.imports.contains(name)
    }
}

fn artifact_error(path: &Path, message: impl Into<String>) -> Error {
    Error::Artifact {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn collect_elf(elf: &Elf, symbols: &mut ArtifactSymbols) {
    let tables = [(&elf.dynsyms, &elf.dynstrtab), (&elf.syms, &elf.strtab)];
    for (table, strtab) in tables {
        for sym in table.iter() {
            let Some(name) = strtab.get_at(sym.st_name) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            if sym.is_import() {
                symbols.imports.insert(name.to_string());
            } else if sym.st_bind() != goblin::elf::sym::STB_LOCAL && sym.st_value != 0 {
                symbols.exports.insert(name.to_string());
            }
        }
    }
}

/// Mach-O symbols carry a leading underscore.
fn macho_symbol(name: &str) -> String {
    name.strip_prefix('_').unwrap_or(name).to_string()
}

/// Parse the symbol table of an in-memory artifact.
pub fn parse_symbols(path: &Path, bytes: &[u8]) -> Result<ArtifactSymbols> {
    let mut symbols = ArtifactSymbols::default();
    match Object::parse(bytes).map_err(|e| artifact_error(path, e.to_string()))? {
        Object::Elf(elf) => collect_elf(&elf, &mut symbols),
        Object::PE(pe) => {
            for export in &pe.exports {
                if let Some(name) = export.name {
                    symbols.exports.insert(name.to_string());
                }
            }
            for import in &pe.imports {
                symbols.imports.insert(import.name.to_string());
            }
        }
        Object::Mach(Mach::Binary(macho)) => {
            let exports = macho
                .exports()
                .map_err(|e| artifact_error(path, e.to_string()))?;
            for export in exports {
                symbols.exports.insert(macho_symbol(&export.name));
            }
            let imports = macho
                .imports()
                .map_err(|e| artifact_error(path, e.to_string()))?;
            for import in imports {
                symbols.imports.insert(macho_symbol(import.name));
            }
        }
        Object::Mach(Mach::Fat(_)) => {
            return Err(artifact_error(path, "universal Mach-O binaries are not supported"))
        }
        _ => return Err(artifact_error(path, "not a shared library or executable")),
    }
    Ok(symbols)
}

/// Read the symbol table of an artifact on disk.
pub fn exported_symbols(path: &Path) -> Result<ArtifactSymbols> {
    let bytes = std::fs::read(path).map_err(|e| artifact_error(path, e.to_string()))?;
    parse_symbols(path, &bytes)
}

/// Check an artifact's symbols against a recipe. Every missing symbol is
/// reported before failing.
pub fn taste(recipe: &Recipe, symbols: &ArtifactSymbols, reporter: &dyn Reporter) -> Result<()> {
    let mut missing = Vec::new();

    for export in recipe.exports() {
        if !symbols.exports.contains(export) {
            reporter.error(&format!("Missing export symbol '{}'", export));
            missing.push(export.clone());
        }
    }
    for import in recipe.imports() {
        if !symbols.contains(import) {
            reporter.error(&format!("Missing import symbol '{}'", import));
            missing.push(import.clone());
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::Taste { missing })
    }
}

/// Execute Phase 4: Taste the artifact at `artifact_path`.
pub fn execute(recipe: &Recipe, artifact_path: &Path, reporter: &dyn Reporter) -> Result<()> {
    let symbols = exported_symbols(artifact_path).inspect_err(|err| {
        reporter.error(&format!("Unable to read artifact: {}", err));
    })?;
    log::debug!(
        "{} exports {} symbol(s) and imports {}",
        artifact_path.display(),
        symbols.exports.len(),
        symbols.imports.len()
    );
    taste(recipe, &symbols, reporter)
}

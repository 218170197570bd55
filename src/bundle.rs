//! # Recipe Bundles
//!
//! A bundle is a single xz-compressed tar archive that carries a recipe with
//! everything it references, so it can be cooked on another machine without
//! network access or the original source tree.
//!
//! ## Layout
//!
//! ```text
//! ecsact-build-recipe.yml    the rewritten recipe
//! files/<outdir>/...         path sources and fetched downloads
//! codegen/<plugin file>      plugin binaries
//! ```
//!
//! Every path and fetch source of the original recipe becomes a path source
//! pointing into `files/`, and non built-in plugins point into `codegen/`.
//!
//! Extraction is content addressed: a bundle always lands in
//! `<extract_dir>/ecsact-recipe-bundle/<xxh3-64 of the bundle bytes>`, and an
//! existing directory is reused as is.

use std::fs;
use std::path::{Path, PathBuf};

use xxhash_rust::xxh3::xxh3_64;

use crate::archive::{read_archive, ArchiveFormat, ArchiveWriter};
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::filesystem::{DirectoryListing, File, MemoryFS};
use crate::materialize::{fetch_source_files, path_source_files, MaterializedFile};
use crate::path::{escapes_root, normalize_path};
use crate::plugin::{is_builtin_plugin_name, resolve_plugin_path, PluginSearch};
use crate::recipe::{CodegenSource, PathSource, Recipe, Source};
use crate::report::Reporter;

/// Name of the recipe file at the root of a bundle.
pub const RECIPE_FILE: &str = "ecsact-build-recipe.yml";

/// Directory below the extract directory that holds extracted bundles.
pub const BUNDLE_DIR: &str = "ecsact-recipe-bundle";

/// Conventional bundle file extension.
pub const BUNDLE_EXTENSION: &str = "ecsact-recipe-bundle";

const FILES_DIR: &str = "files";
const CODEGEN_DIR: &str = "codegen";

/// What bundle creation needs from the outside world.
pub struct BundleContext<'a> {
    pub fetcher: &'a dyn Fetcher,
    pub listing: &'a dyn DirectoryListing,
    /// Directory holding built-in codegen plugins.
    pub default_plugins_dir: Option<PathBuf>,
    pub reporter: &'a dyn Reporter,
}

/// The bytes of a recipe bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeBundle {
    bytes: Vec<u8>,
}

fn bundle_error(message: impl Into<String>) -> Error {
    Error::Bundle {
        message: message.into(),
    }
}

impl RecipeBundle {
    /// Package a recipe and everything it references.
    pub fn create(recipe: &Recipe, context: &BundleContext<'_>) -> Result<Self> {
        let mut entries = MemoryFS::new();
        let mut sources = Vec::with_capacity(recipe.sources().len());

        for (index, source) in recipe.sources().iter().enumerate() {
            let source_error = |err: Error| Error::Source {
                recipe: recipe.name().to_string(),
                index,
                message: err.to_string(),
            };
            match source {
                Source::Path(src) => {
                    let files = path_source_files(recipe, src, context.listing, context.reporter)
                        .map_err(source_error)?;
                    sources.extend(embed_files(&mut entries, files)?);
                }
                Source::Fetch(src) => {
                    let files = fetch_source_files(src, context.fetcher, context.reporter)
                        .map_err(source_error)?;
                    sources.extend(embed_files(&mut entries, files)?);
                }
                Source::Codegen(src) => {
                    let plugins = embed_plugins(recipe, src, &mut entries, context)
                        .map_err(source_error)?;
                    sources.push(Source::Codegen(CodegenSource {
                        plugins,
                        outdir: src.outdir.clone(),
                    }));
                }
            }
        }

        let mut bundled = recipe.clone();
        bundled.update_sources(sources);
        let recipe_yaml = bundled.to_yaml_bytes()?;

        let mut writer = ArchiveWriter::new(Vec::new());
        writer.add_entry(Path::new(RECIPE_FILE), &recipe_yaml, 0o644)?;
        for (path, file) in entries.files() {
            writer.add_entry(path, &file.content, file.permissions)?;
        }

        let bytes = writer.finish()?;
        log::debug!(
            "created bundle for '{}' with {} file(s), {} bytes",
            recipe.name(),
            entries.len(),
            bytes.len()
        );
        Ok(Self { bytes })
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Read a bundle file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .map_err(|e| bundle_error(format!("failed to read {}: {}", path.display(), e)))?;
        Ok(Self { bytes })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Write the bundle bytes to a file.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, &self.bytes)
            .map_err(|e| bundle_error(format!("failed to write {}: {}", path.display(), e)))
    }

    /// XXH3-64 of the bundle bytes.
    pub fn hash(&self) -> u64 {
        xxh3_64(&self.bytes)
    }

    /// Directory this bundle extracts into below `extract_dir`.
    pub fn extract_path(&self, extract_dir: &Path) -> PathBuf {
        extract_dir.join(BUNDLE_DIR).join(self.hash().to_string())
    }

    /// Extract the bundle and return the path of its recipe file.
    ///
    /// Every entry is validated before anything is written. The tree is
    /// staged next to its final location and renamed into place.
    pub fn extract(&self, extract_dir: &Path) -> Result<PathBuf> {
        let dir = self.extract_path(extract_dir);
        let recipe_path = dir.join(RECIPE_FILE);

        if dir.exists() {
            if recipe_path.is_file() {
                log::debug!("bundle already extracted at {}", dir.display());
                return Ok(recipe_path);
            }
            return Err(bundle_error(format!(
                "{} exists but contains no {}",
                dir.display(),
                RECIPE_FILE
            )));
        }

        let staged = self.read_entries()?;

        let staging = dir.with_extension("partial");
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        staged.write_to_dir(&staging)?;

        if let Err(err) = fs::rename(&staging, &dir) {
            let _ = fs::remove_dir_all(&staging);
            if !recipe_path.is_file() {
                return Err(bundle_error(format!(
                    "failed to move bundle into {}: {}",
                    dir.display(),
                    err
                )));
            }
        }

        log::debug!("extracted bundle into {}", dir.display());
        Ok(recipe_path)
    }

    fn read_entries(&self) -> Result<MemoryFS> {
        if ArchiveFormat::from_magic_bytes(&self.bytes) != Some(ArchiveFormat::TarXz) {
            return Err(bundle_error("not a recipe bundle (expected an xz compressed tar)"));
        }

        let mut staged = MemoryFS::new();
        for entry in read_archive(ArchiveFormat::TarXz, &self.bytes)? {
            if !is_valid_entry_path(&entry.path) {
                return Err(bundle_error(format!(
                    "invalid bundle entry path {}",
                    entry.path.display()
                )));
            }
            if entry.declared_size == 0 {
                return Err(bundle_error(format!(
                    "bundle entry {} is empty",
                    entry.path.display()
                )));
            }
            if entry.declared_size != entry.data.len() as u64 {
                return Err(bundle_error(format!(
                    "bundle entry {} declares {} bytes but {} were read",
                    entry.path.display(),
                    entry.declared_size,
                    entry.data.len()
                )));
            }

            let permissions = entry.mode.map(|mode| mode & 0o777).unwrap_or(0o644);
            staged.add_file_unique(
                normalize_path(&entry.path),
                File {
                    content: entry.data,
                    permissions,
                },
            )?;
        }

        if !staged.exists(RECIPE_FILE) {
            return Err(bundle_error(format!("bundle has no {}", RECIPE_FILE)));
        }
        Ok(staged)
    }
}

/// Entries may only be the root recipe file or live below `files/` or
/// `codegen/`, without escaping them.
fn is_valid_entry_path(path: &Path) -> bool {
    if escapes_root(path) {
        return false;
    }
    let normalized = normalize_path(path);
    if normalized == Path::new(RECIPE_FILE) {
        return true;
    }
    [FILES_DIR, CODEGEN_DIR].iter().any(|dir| {
        normalized
            .strip_prefix(dir)
            .map(|rest| !rest.as_os_str().is_empty())
            .unwrap_or(false)
    })
}

/// Add materialized files under `files/` and return path sources pointing at
/// them.
fn embed_files(entries: &mut MemoryFS, files: Vec<MaterializedFile>) -> Result<Vec<Source>> {
    let mut sources = Vec::with_capacity(files.len());
    for MaterializedFile {
        destination,
        origin,
        file,
    } in files
    {
        if file.content.is_empty() {
            return Err(bundle_error(format!("{} is empty and cannot be bundled", origin)));
        }
        if escapes_root(&destination) {
            return Err(bundle_error(format!(
                "{} would be bundled outside of {}/ as {}",
                origin,
                FILES_DIR,
                destination.display()
            )));
        }

        let entry_path = normalize_path(&Path::new(FILES_DIR).join(&destination));
        entries
            .add_file_unique(&entry_path, file)
            .map_err(|_| bundle_error(format!("{} conflicts with another bundled file at {}", origin, entry_path.display())))?;

        let outdir = destination
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf);
        sources.push(Source::Path(PathSource {
            path: entry_path,
            outdir,
            relative_to_cwd: false,
        }));
    }
    Ok(sources)
}

/// Add plugin binaries under `codegen/` and return the rewritten plugin list.
fn embed_plugins(
    recipe: &Recipe,
    source: &CodegenSource,
    entries: &mut MemoryFS,
    context: &BundleContext<'_>,
) -> Result<Vec<String>> {
    let search = PluginSearch {
        default_plugins_dir: context.default_plugins_dir.clone(),
        base_directory: recipe.base_directory().to_path_buf(),
        additional_dirs: Vec::new(),
    };

    let mut plugins = Vec::with_capacity(source.plugins.len());
    for plugin in &source.plugins {
        if is_builtin_plugin_name(plugin) {
            context.reporter.warning(&format!(
                "Built-in codegen plugin '{}' is not bundled and must be available where the bundle is cooked",
                plugin
            ));
            plugins.push(plugin.clone());
            continue;
        }

        let plugin_path = resolve_plugin_path(plugin, &search)?;
        let filename = plugin_path.file_name().ok_or_else(|| Error::Plugin {
            plugin: plugin.clone(),
            message: "resolved plugin path has no file name".to_string(),
        })?;
        if plugin_path.extension().map(|ext| ext != "wasm").unwrap_or(true) {
            context.reporter.warning(&format!(
                "Bundled codegen plugin {} is platform specific, the bundle only works on this platform",
                filename.to_string_lossy()
            ));
        }

        let content = fs::read(&plugin_path)?;
        if content.is_empty() {
            return Err(bundle_error(format!(
                "{} is empty and cannot be bundled",
                plugin_path.display()
            )));
        }

        let entry_path = Path::new(CODEGEN_DIR).join(filename);
        entries
            .add_file_unique(&entry_path, File::executable(content))
            .map_err(|_| {
                bundle_error(format!(
                    "plugin {} conflicts with another bundled plugin at {}",
                    plugin_path.display(),
                    entry_path.display()
                ))
            })?;
        plugins.push(crate::recipe::path_to_yaml(&entry_path));
    }
    Ok(plugins)
}

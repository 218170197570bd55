//! Phase 3: Resolving Sources
//!
//! Materializes every source of the composite recipe into the working
//! directory, in declaration order. The first failing source stops the
//! phase.
//!
//! ## Source kinds
//!
//! - **path**: local files (literal or glob) copied below `work_dir/outdir`.
//! - **fetch**: downloaded, checked against its integrity, and either
//!   unpacked (archives) or stored under its basename.
//! - **codegen**: plugins located and run over the language host's packages
//!   with output into `work_dir/outdir`.

use std::path::{Path, PathBuf};

use crate::codegen::{run_codegen, CodegenHost, CodegenOptions};
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::filesystem::{DirectoryListing, MemoryFS};
use crate::materialize::{fetch_source_files, path_source_files, MaterializedFile};
use crate::plugin::{resolve_plugin_path, PluginLoader, PluginSearch};
use crate::recipe::{CodegenSource, Recipe, Source};
use crate::report::Reporter;

/// Materializes recipe sources into a working directory.
///
/// The capabilities it needs are injected so tests can run without network
/// access or real plugins.
pub struct SourceResolver<'a> {
    fetcher: Box<dyn Fetcher + 'a>,
    listing: Box<dyn DirectoryListing + 'a>,
    loader: Box<dyn PluginLoader + 'a>,
    host: Option<&'a dyn CodegenHost>,
    default_plugins_dir: Option<PathBuf>,
    additional_plugin_dirs: Vec<PathBuf>,
}

impl<'a> SourceResolver<'a> {
    pub fn new(
        fetcher: Box<dyn Fetcher + 'a>,
        listing: Box<dyn DirectoryListing + 'a>,
        loader: Box<dyn PluginLoader + 'a>,
    ) -> Self {
        Self {
            fetcher,
            listing,
            loader,
            host: None,
            default_plugins_dir: None,
            additional_plugin_dirs: Vec::new(),
        }
    }

    /// Language host used by codegen sources.
    pub fn with_host(mut self, host: &'a dyn CodegenHost) -> Self {
        self.host = Some(host);
        self
    }

    pub fn with_default_plugins_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.default_plugins_dir = dir;
        self
    }

    /// Add directories searched for relative plugin paths, after any added
    /// before.
    pub fn with_additional_plugin_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        for dir in dirs {
            if !self.additional_plugin_dirs.contains(&dir) {
                self.additional_plugin_dirs.push(dir);
            }
        }
        self
    }

    /// Materialize one source into `work_dir`. Returns the files written.
    pub fn resolve_source(
        &self,
        recipe: &Recipe,
        source: &Source,
        work_dir: &Path,
        reporter: &dyn Reporter,
    ) -> Result<Vec<PathBuf>> {
        match source {
            Source::Path(src) => {
                let files = path_source_files(recipe, src, self.listing.as_ref(), reporter)?;
                write_files(files, work_dir)
            }
            Source::Fetch(src) => {
                let files = fetch_source_files(src, self.fetcher.as_ref(), reporter)?;
                write_files(files, work_dir)
            }
            Source::Codegen(src) => self.run_codegen_source(recipe, src, work_dir, reporter),
        }
    }

    fn run_codegen_source(
        &self,
        recipe: &Recipe,
        source: &CodegenSource,
        work_dir: &Path,
        reporter: &dyn Reporter,
    ) -> Result<Vec<PathBuf>> {
        let search = PluginSearch {
            default_plugins_dir: self.default_plugins_dir.clone(),
            base_directory: recipe.base_directory().to_path_buf(),
            additional_dirs: self.additional_plugin_dirs.clone(),
        };
        let plugin_paths = source
            .plugins
            .iter()
            .map(|plugin| resolve_plugin_path(plugin, &search))
            .collect::<Result<Vec<_>>>()?;

        let Some(host) = self.host else {
            return Err(Error::Codegen {
                message: "codegen sources need a language host with compiled packages"
                    .to_string(),
            });
        };

        let outdir = match &source.outdir {
            Some(outdir) => work_dir.join(outdir),
            None => work_dir.to_path_buf(),
        };
        run_codegen(
            CodegenOptions::new(plugin_paths).with_outdir(outdir),
            host,
            self.loader.as_ref(),
            reporter,
        )
    }
}

fn write_files(files: Vec<MaterializedFile>, work_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut staged = MemoryFS::new();
    for file in files {
        staged.add_file(&file.destination, file.file)?;
    }
    staged.write_to_dir(work_dir)?;
    Ok(staged.list_files().iter().map(|path| work_dir.join(path)).collect())
}

/// Execute Phase 3: Resolve every source of `recipe` into `work_dir`.
///
/// Stops at the first failing source; the failure names the recipe and the
/// source index.
pub fn execute(
    recipe: &Recipe,
    resolver: &SourceResolver<'_>,
    work_dir: &Path,
    reporter: &dyn Reporter,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(work_dir)?;

    let mut written = Vec::new();
    for (index, source) in recipe.sources().iter().enumerate() {
        log::debug!("resolving source {} ({})", index, source.describe());
        match resolver.resolve_source(recipe, source, work_dir, reporter) {
            Ok(files) => written.extend(files),
            Err(err) => {
                let err = Error::Source {
                    recipe: recipe.name().to_string(),
                    index,
                    message: format!("{}: {}", source.describe(), err),
                };
                reporter.error(&err.to_string());
                return Err(err);
            }
        }
    }
    Ok(written)
}

//! Orchestrator for cooking recipes
//!
//! This module coordinates the phases to provide a clean API for the cook
//! operation: load, compose and resolve into a working directory.

use std::path::{Path, PathBuf};

use super::resolve::SourceResolver;
use super::{phase1, phase2, phase3};
use crate::error::Result;
use crate::recipe::Recipe;
use crate::report::Reporter;

/// Settings for a cook run.
#[derive(Debug, Clone)]
pub struct CookOptions {
    pub load: phase1::LoadOptions,
    pub allow_unresolved_imports: bool,
    pub work_dir: PathBuf,
}

/// What a cook run produced.
#[derive(Debug, Clone)]
pub struct CookedRecipe {
    /// The composite recipe.
    pub recipe: Recipe,
    /// Every file written into the working directory.
    pub files: Vec<PathBuf>,
}

/// Execute the cook operation (Phases 1-3)
///
/// 1. Load every recipe argument, extracting bundles
/// 2. Merge the recipes into one composite
/// 3. Resolve every source into the working directory
///
/// The directories of the recipe arguments are added to the resolver's
/// plugin search directories.
pub fn execute_cook(
    recipe_args: &[String],
    options: &CookOptions,
    resolver: SourceResolver<'_>,
    reporter: &dyn Reporter,
) -> Result<CookedRecipe> {
    // Phase 1: Load
    let loaded = phase1::execute(recipe_args, &options.load, reporter)?;

    // Phase 2: Compose
    let recipe = phase2::execute(&loaded.recipes, options.allow_unresolved_imports, reporter)?;

    // Phase 3: Resolve
    let resolver = resolver.with_additional_plugin_dirs(loaded.plugin_dirs);
    let files = phase3::execute(&recipe, &resolver, &options.work_dir, reporter)?;

    Ok(CookedRecipe { recipe, files })
}

/// Load and compose recipes without touching a working directory.
pub fn execute_compose(
    recipe_args: &[String],
    load: &phase1::LoadOptions,
    allow_unresolved_imports: bool,
    reporter: &dyn Reporter,
) -> Result<Recipe> {
    let loaded = phase1::execute(recipe_args, load, reporter)?;
    phase2::execute(&loaded.recipes, allow_unresolved_imports, reporter)
}

/// Cook, then taste the artifact a build produced from the working
/// directory.
pub fn execute_taste(
    recipe_args: &[String],
    load: &phase1::LoadOptions,
    artifact: &Path,
    reporter: &dyn Reporter,
) -> Result<()> {
    let recipe = execute_compose(recipe_args, load, true, reporter)?;
    super::phase4::execute(&recipe, artifact, reporter)
}

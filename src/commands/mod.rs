//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `ecsact-recipe` command-line tool. Each subcommand is defined in its own
//! file to keep the logic separated and maintainable.
//!
//! ## Structure
//!
//! Each command module typically contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic.
//!
//! Commands that take recipe arguments share [`RecipeArgs`], which knows
//! where built-in recipes live and where bundles are extracted.

pub mod bundle;
pub mod cook;
pub mod extract;
pub mod taste;
pub mod validate;

use std::path::PathBuf;

use clap::Args;

use ecsact_recipe::defaults;
use ecsact_recipe::phases::phase1::LoadOptions;

/// Recipe arguments and the locations needed to load them.
#[derive(Args, Debug, Clone)]
pub struct RecipeArgs {
    /// Recipes to load: recipe files, bundles, or built-in recipe names.
    #[arg(value_name = "RECIPE", required = true)]
    pub recipes: Vec<String>,

    /// Directory bundles are extracted into.
    ///
    /// Defaults to the system's cache directory
    /// (e.g., `~/.cache/ecsact-recipe` on Linux).
    #[arg(long, value_name = "DIR", env = "ECSACT_RECIPE_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Directory holding built-in recipe bundles.
    ///
    /// Defaults to `share/ecsact/recipes` next to the installation's `bin`.
    #[arg(long, value_name = "DIR")]
    pub recipes_dir: Option<PathBuf>,
}

impl RecipeArgs {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            builtin_recipes_dir: self
                .recipes_dir
                .clone()
                .or_else(defaults::default_recipes_dir),
            extract_dir: self
                .temp_dir
                .clone()
                .unwrap_or_else(defaults::default_extract_dir),
        }
    }
}

/// Location of built-in codegen plugins.
#[derive(Args, Debug, Clone)]
pub struct PluginDirArgs {
    /// Directory holding built-in codegen plugins.
    ///
    /// Defaults to `share/ecsact/plugins` next to the installation's `bin`.
    #[arg(long, value_name = "DIR", env = "ECSACT_RECIPE_PLUGIN_DIR")]
    pub plugin_dir: Option<PathBuf>,
}

impl PluginDirArgs {
    pub fn plugins_dir(&self) -> Option<PathBuf> {
        self.plugin_dir
            .clone()
            .or_else(defaults::default_plugins_dir)
    }
}

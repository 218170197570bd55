//! # Cook Command Implementation
//!
//! This module implements the `cook` subcommand: recipes are loaded and
//! merged, then every source is materialized into the working directory,
//! ready for the build step that compiles it.
//!
//! Codegen sources need a language host with compiled Ecsact packages. The
//! command line has none, so recipes with codegen sources fail at that
//! source with a message saying so.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use ecsact_recipe::fetch::HttpFetcher;
use ecsact_recipe::filesystem::OsDirectoryListing;
use ecsact_recipe::output::{marker, Marker, OutputConfig};
use ecsact_recipe::phases::orchestrator::{self, CookOptions};
use ecsact_recipe::phases::resolve::SourceResolver;
use ecsact_recipe::plugin::DylibLoader;
use ecsact_recipe::report::LogReporter;

use super::{PluginDirArgs, RecipeArgs};

/// Materialize recipe sources into a working directory
#[derive(Args, Debug)]
pub struct CookArgs {
    #[command(flatten)]
    pub recipes: RecipeArgs,

    #[command(flatten)]
    pub plugins: PluginDirArgs,

    /// Directory the sources are written into.
    #[arg(long, value_name = "DIR")]
    pub work_dir: PathBuf,

    /// Accept imports that no recipe exports.
    #[arg(long)]
    pub allow_unresolved_imports: bool,

    /// Extra directory searched for relative codegen plugin paths.
    #[arg(long = "extra-plugin-dir", value_name = "DIR")]
    pub extra_plugin_dirs: Vec<PathBuf>,
}

/// Execute the `cook` command.
///
/// # Arguments
/// * `args` - The command arguments
/// * `color_flag` - The value of the global --color flag ("always", "never", or "auto")
pub fn execute(args: CookArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    println!(
        "{} Cooking {} recipe(s) into {}",
        marker(&out, Marker::Cook),
        args.recipes.recipes.len(),
        args.work_dir.display()
    );

    let resolver = SourceResolver::new(
        Box::new(HttpFetcher::new()?),
        Box::new(OsDirectoryListing),
        Box::new(DylibLoader),
    )
    .with_default_plugins_dir(args.plugins.plugins_dir())
    .with_additional_plugin_dirs(args.extra_plugin_dirs);

    let options = CookOptions {
        load: args.recipes.load_options(),
        allow_unresolved_imports: args.allow_unresolved_imports,
        work_dir: args.work_dir,
    };

    let cooked = orchestrator::execute_cook(&args.recipes.recipes, &options, resolver, &LogReporter)
        .map_err(|e| {
            println!("{} Cooking failed: {}", marker(&out, Marker::Err), e);
            anyhow::anyhow!("Cooking failed: {}", e)
        })?;

    println!(
        "{} Cooked '{}': {} file(s) written",
        marker(&out, Marker::Ok),
        cooked.recipe.name(),
        cooked.files.len()
    );
    if !cooked.recipe.system_libs().is_empty() {
        println!(
            "   System libraries: {}",
            cooked.recipe.system_libs().join(", ")
        );
    }
    Ok(())
}

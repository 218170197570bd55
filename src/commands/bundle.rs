//! # Bundle Command Implementation
//!
//! This module implements the `bundle` subcommand. It loads and merges the
//! given recipes, then packs the composite recipe and every file, download
//! and codegen plugin it references into a single recipe bundle.
//!
//! Unresolved imports are allowed: a bundle may be one half of a runtime
//! that another recipe completes at cook time.

use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};

use ecsact_recipe::bundle::{BundleContext, RecipeBundle, BUNDLE_EXTENSION};
use ecsact_recipe::fetch::HttpFetcher;
use ecsact_recipe::filesystem::OsDirectoryListing;
use ecsact_recipe::output::{marker, Marker, OutputConfig};
use ecsact_recipe::phases::orchestrator;
use ecsact_recipe::report::LogReporter;

use super::{PluginDirArgs, RecipeArgs};

/// Package recipes into a recipe bundle
#[derive(Args, Debug)]
pub struct BundleArgs {
    #[command(flatten)]
    pub recipes: RecipeArgs,

    #[command(flatten)]
    pub plugins: PluginDirArgs,

    /// Path of the bundle to write.
    ///
    /// `.ecsact-recipe-bundle` is appended when the path has no extension.
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,
}

/// Bundle output path with the conventional extension added when missing.
pub fn bundle_output_path(output: &Path) -> PathBuf {
    if output.extension().is_some() {
        output.to_path_buf()
    } else {
        output.with_extension(BUNDLE_EXTENSION)
    }
}

/// Execute the `bundle` command.
///
/// # Arguments
/// * `args` - The command arguments
/// * `color_flag` - The value of the global --color flag ("always", "never", or "auto")
pub fn execute(args: BundleArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let reporter = LogReporter;

    let recipe = orchestrator::execute_compose(
        &args.recipes.recipes,
        &args.recipes.load_options(),
        true,
        &reporter,
    )?;

    println!(
        "{} Bundling recipe '{}'",
        marker(&out, Marker::Bundle),
        recipe.name()
    );

    let fetcher = HttpFetcher::new()?;
    let context = BundleContext {
        fetcher: &fetcher,
        listing: &OsDirectoryListing,
        default_plugins_dir: args.plugins.plugins_dir(),
        reporter: &reporter,
    };
    let bundle = RecipeBundle::create(&recipe, &context).map_err(|e| {
        println!("{} Bundle creation failed: {}", marker(&out, Marker::Err), e);
        anyhow::anyhow!("Bundle creation failed: {}", e)
    })?;

    let output = bundle_output_path(&args.output);
    bundle.write_to(&output)?;

    println!(
        "{} Wrote {} ({} bytes)",
        marker(&out, Marker::Ok),
        output.display(),
        bundle.bytes().len()
    );
    Ok(())
}

//! # Validate Command Implementation
//!
//! This module implements the `validate` subcommand, which loads and merges
//! recipes without fetching, bundling or writing anything.
//!
//! ## Functionality
//!
//! - **Recipe Validation**: Parses every recipe argument, extracting bundles
//!   as needed.
//! - **Merge Validation**: Merges the recipes and detects conflicting exports.
//! - **Import Resolution**: Reports imports no recipe exports.
//! - **Summary**: Prints the composite recipe's exports grouped by runtime
//!   API module, its imports and its sources.

use anyhow::Result;
use clap::Args;

use ecsact_recipe::modules::group_by_module;
use ecsact_recipe::output::{marker, Marker, OutputConfig};
use ecsact_recipe::phases::orchestrator;
use ecsact_recipe::report::LogReporter;

use super::RecipeArgs;

/// Validate that recipes load and merge
#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub recipes: RecipeArgs,

    /// Accept imports that no recipe exports.
    #[arg(long)]
    pub allow_unresolved_imports: bool,
}

/// Execute the `validate` command.
///
/// # Arguments
/// * `args` - The command arguments
/// * `color_flag` - The value of the global --color flag ("always", "never", or "auto")
pub fn execute(args: ValidateArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    println!(
        "{} Validating {} recipe(s)",
        marker(&out, Marker::Scan),
        args.recipes.recipes.len()
    );

    let recipe = match orchestrator::execute_compose(
        &args.recipes.recipes,
        &args.recipes.load_options(),
        args.allow_unresolved_imports,
        &LogReporter,
    ) {
        Ok(recipe) => {
            println!("{} Recipes merged successfully", marker(&out, Marker::Ok));
            recipe
        }
        Err(e) => {
            println!("{} Validation failed: {}", marker(&out, Marker::Err), e);
            return Err(anyhow::anyhow!("Validation failed: {}", e));
        }
    };

    println!("\n{} Recipe Summary:", marker(&out, Marker::Info));
    println!("   Name: {}", recipe.name());

    println!("   Exports: {}", recipe.exports().len());
    for (module, functions) in group_by_module(recipe.exports()).module_methods {
        println!("     {}: {}", module, functions.join(", "));
    }

    if !recipe.imports().is_empty() {
        println!("   Unresolved imports: {}", recipe.imports().len());
        for import in recipe.imports() {
            println!("     {}", import);
        }
    }

    println!("   Sources: {}", recipe.sources().len());
    for source in recipe.sources() {
        println!("     {}", source.describe());
    }

    if !recipe.system_libs().is_empty() {
        println!("   System libraries: {}", recipe.system_libs().join(", "));
    }

    Ok(())
}

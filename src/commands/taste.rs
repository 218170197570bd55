//! # Taste Command Implementation
//!
//! This module implements the `taste` subcommand, which checks a built
//! runtime library against the composite of the given recipes: every
//! exported function must be defined by the library, and every import must
//! appear in its symbol table.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use ecsact_recipe::output::{marker, Marker, OutputConfig};
use ecsact_recipe::phases::orchestrator;
use ecsact_recipe::report::LogReporter;

use super::RecipeArgs;

/// Check a built runtime library against recipes
#[derive(Args, Debug)]
pub struct TasteArgs {
    #[command(flatten)]
    pub recipes: RecipeArgs,

    /// The built runtime library to check.
    #[arg(long, value_name = "FILE")]
    pub artifact: PathBuf,
}

/// Execute the `taste` command.
pub fn execute(args: TasteArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    println!(
        "{} Tasting {}",
        marker(&out, Marker::Taste),
        args.artifact.display()
    );

    orchestrator::execute_taste(
        &args.recipes.recipes,
        &args.recipes.load_options(),
        &args.artifact,
        &LogReporter,
    )
    .map_err(|e| {
        println!("{} {}", marker(&out, Marker::Err), e);
        anyhow::anyhow!("Taste failed: {}", e)
    })?;

    println!(
        "{} {} provides everything the recipes declare",
        marker(&out, Marker::Ok),
        args.artifact.display()
    );
    Ok(())
}

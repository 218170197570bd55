//! # Extract Command Implementation
//!
//! This module implements the `extract` subcommand. The bundle is extracted
//! into its content-addressed directory and the path of the extracted recipe
//! is printed on stdout, so scripts can capture it.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use ecsact_recipe::bundle::RecipeBundle;
use ecsact_recipe::defaults;
use ecsact_recipe::output::{marker, Marker, OutputConfig};

/// Extract a recipe bundle
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// The bundle file to extract.
    #[arg(value_name = "BUNDLE")]
    pub bundle: PathBuf,

    /// Directory to extract into.
    ///
    /// Defaults to the system's cache directory
    /// (e.g., `~/.cache/ecsact-recipe` on Linux).
    #[arg(long, value_name = "DIR", env = "ECSACT_RECIPE_TEMP_DIR")]
    pub dir: Option<PathBuf>,
}

/// Execute the `extract` command.
pub fn execute(args: ExtractArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let extract_dir = args.dir.unwrap_or_else(defaults::default_extract_dir);

    let bundle = RecipeBundle::from_file(&args.bundle)?;
    let recipe_path = bundle.extract(&extract_dir).map_err(|e| {
        eprintln!("{} Extraction failed: {}", marker(&out, Marker::Err), e);
        anyhow::anyhow!("Failed to extract {}: {}", args.bundle.display(), e)
    })?;

    println!("{}", recipe_path.display());
    Ok(())
}

//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Ecsact Recipe - Bundle and cook Ecsact runtime build recipes
#[derive(Parser, Debug)]
#[command(name = "ecsact-recipe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Package recipes and everything they reference into a single bundle
    Bundle(commands::bundle::BundleArgs),

    /// Extract a recipe bundle and print the path of its recipe
    Extract(commands::extract::ExtractArgs),

    /// Load and merge recipes without producing anything
    Validate(commands::validate::ValidateArgs),

    /// Materialize the sources of recipes into a working directory
    Cook(commands::cook::CookArgs),

    /// Check a built runtime library against recipes
    Taste(commands::taste::TasteArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        match self.command {
            Commands::Bundle(args) => commands::bundle::execute(args, &self.color),
            Commands::Extract(args) => commands::extract::execute(args, &self.color),
            Commands::Validate(args) => commands::validate::execute(args, &self.color),
            Commands::Cook(args) => commands::cook::execute(args, &self.color),
            Commands::Taste(args) => commands::taste::execute(args, &self.color),
        }
    }
}

/// `RUST_LOG` takes precedence over `--log-level`.
fn init_logging(log_level: &str) {
    let env = env_logger::Env::default().default_filter_or(log_level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}

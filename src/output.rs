//! # Output Configuration
//!
//! Controls how the CLI presents results: emoji markers when the terminal
//! supports color, plain bracketed markers otherwise. Every command prints
//! its status lines through [`marker`], so one run never mixes the styles.
//!
//! Color is decided by the `--color=never|always|auto` flag. In auto mode
//! `NO_COLOR` (https://no-color.org/), `CLICOLOR=0` and `TERM=dumb` turn it
//! off, and `CLICOLOR_FORCE=1` turns it on for non-TTY output.
//!
//! ```rust,ignore
//! use ecsact_recipe::output::{marker, Marker, OutputConfig};
//!
//! let config = OutputConfig::from_env_and_flag("auto");
//! println!("{} Cooking...", marker(&config, Marker::Cook));
//! ```

use std::env;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `color_flag` is the value of the `--color` flag: "always", "never" or
    /// "auto". In auto mode colors are disabled when `NO_COLOR` is set,
    /// `CLICOLOR=0`, `TERM=dumb`, or stdout is not a TTY (unless
    /// `CLICOLOR_FORCE=1`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // The presence of the variable (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns the emoji when colors are enabled, the plain text otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Status line markers used by the commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Scan,
    Ok,
    Err,
    Info,
    Bundle,
    Cook,
    Taste,
}

pub fn marker(config: &OutputConfig, marker: Marker) -> &'static str {
    match marker {
        Marker::Scan => emoji(config, "🔍", "[SCAN]"),
        Marker::Ok => emoji(config, "✅", "[OK]"),
        Marker::Err => emoji(config, "❌", "[ERR]"),
        Marker::Info => emoji(config, "📊", "[INFO]"),
        Marker::Bundle => emoji(config, "📦", "[BUNDLE]"),
        Marker::Cook => emoji(config, "🍳", "[COOK]"),
        Marker::Taste => emoji(config, "👅", "[TASTE]"),
    }
}

//! Default locations for ecsact-recipe.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::path::{Path, PathBuf};

/// Installation prefix of a binary at `<prefix>/bin/<exe>`.
pub fn install_prefix_of(exe: &Path) -> Option<PathBuf> {
    exe.parent()?.parent().map(Path::to_path_buf)
}

/// Installation prefix of the running executable.
pub fn install_prefix() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let exe = exe.canonicalize().unwrap_or(exe);
    install_prefix_of(&exe)
}

/// Directory holding built-in codegen plugins: `<prefix>/share/ecsact/plugins`.
///
/// This can be overridden by the `--plugin-dir` CLI flag or the
/// `ECSACT_RECIPE_PLUGIN_DIR` environment variable.
pub fn default_plugins_dir() -> Option<PathBuf> {
    install_prefix().map(|prefix| prefix.join("share").join("ecsact").join("plugins"))
}

/// Directory holding built-in recipe bundles: `<prefix>/share/ecsact/recipes`.
pub fn default_recipes_dir() -> Option<PathBuf> {
    install_prefix().map(|prefix| prefix.join("share").join("ecsact").join("recipes"))
}

/// Returns the default directory bundles are extracted into.
///
/// Uses the platform-appropriate cache directory:
/// - Linux: `~/.cache/ecsact-recipe` (XDG Base Directory)
/// - macOS: `~/Library/Caches/ecsact-recipe`
/// - Windows: `{FOLDERID_LocalAppData}\ecsact-recipe`
///
/// Falls back to the system temp directory if the platform cache directory
/// cannot be determined. Extraction is content addressed, so a persistent
/// location lets repeated runs reuse extracted bundles.
///
/// This can be overridden by the `--temp-dir` CLI flag or the
/// `ECSACT_RECIPE_TEMP_DIR` environment variable.
pub fn default_extract_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ecsact-recipe")
}

//! Phase 1: Loading Recipes
//!
//! This is the first phase of cooking. It turns the recipe arguments given by
//! the user into parsed recipes.
//!
//! ## Process
//!
//! 1.  **Resolve Argument**: A built-in recipe name is looked up in the
//!     built-in recipes directory as `ecsact_<name>.ecsact-recipe-bundle`.
//!     Anything else is a path, which must have one of the allowed
//!     extensions. A path without an extension is a bundle.
//!
//! 2.  **Extract Bundles**: Bundles are extracted into the extract directory
//!     and their root recipe file is used instead.
//!
//! 3.  **Parse**: Every recipe file is parsed.
//!
//! 4.  **Plugin Directories**: The directory of every recipe argument becomes
//!     an extra place to look for codegen plugins.

use std::path::{Path, PathBuf};

use crate::bundle::{RecipeBundle, BUNDLE_EXTENSION};
use crate::error::{Error, Result};
use crate::recipe::Recipe;
use crate::report::Reporter;

/// Recipe file extensions accepted on the command line. The empty entry is a
/// path without an extension, treated as a bundle.
pub const ALLOWED_RECIPE_EXTENSIONS: &[&str] = &["", BUNDLE_EXTENSION, "yml", "yaml", "json"];

/// Where to find built-in recipes and where to extract bundles.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub builtin_recipes_dir: Option<PathBuf>,
    pub extract_dir: PathBuf,
}

/// Output of the load phase.
#[derive(Debug, Clone)]
pub struct LoadedRecipes {
    /// Parsed recipes in argument order.
    pub recipes: Vec<Recipe>,
    /// Extra codegen plugin directories, one per recipe argument with a
    /// parent directory.
    pub plugin_dirs: Vec<PathBuf>,
}

/// Look up a built-in recipe by name.
pub fn find_builtin_recipe(name: &str, builtin_recipes_dir: &Path) -> Option<PathBuf> {
    let path = builtin_recipes_dir.join(format!("ecsact_{}.{}", name, BUNDLE_EXTENSION));
    path.is_file().then_some(path)
}

/// Turn a recipe argument into the path of a recipe or bundle file.
pub fn resolve_recipe_argument(arg: &str, builtin_recipes_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = builtin_recipes_dir.and_then(|dir| find_builtin_recipe(arg, dir)) {
        return Ok(path);
    }

    let mut path = PathBuf::from(arg);
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !ALLOWED_RECIPE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(Error::RecipeArgument {
            arg: arg.to_string(),
            message: format!("invalid recipe file extension '.{}'", extension),
        });
    }
    if extension.is_empty() {
        path.set_extension(BUNDLE_EXTENSION);
    }
    Ok(path)
}

fn is_bundle_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == BUNDLE_EXTENSION)
        .unwrap_or(false)
}

/// Load a single recipe argument, extracting it first when it is a bundle.
pub fn load_recipe(
    arg: &str,
    options: &LoadOptions,
    reporter: &dyn Reporter,
) -> Result<(Recipe, PathBuf)> {
    let mut recipe_path = resolve_recipe_argument(arg, options.builtin_recipes_dir.as_deref())?;

    if is_bundle_path(&recipe_path) {
        let bundle = RecipeBundle::from_file(&recipe_path)?;
        recipe_path = bundle.extract(&options.extract_dir)?;
        reporter.info(&format!(
            "Extracted build recipe bundle to {}",
            recipe_path
                .parent()
                .map(|dir| dir.display().to_string())
                .unwrap_or_default()
        ));
    }

    let recipe = Recipe::from_yaml_file(&recipe_path)
        .map_err(|e| Error::parse(recipe_path.display().to_string(), e))?;
    log::debug!(
        "loaded recipe '{}' from {}",
        recipe.name(),
        recipe_path.display()
    );
    Ok((recipe, recipe_path))
}

/// Execute Phase 1: Load every recipe argument.
pub fn execute(
    args: &[String],
    options: &LoadOptions,
    reporter: &dyn Reporter,
) -> Result<LoadedRecipes> {
    let mut recipes = Vec::with_capacity(args.len());
    let mut plugin_dirs = Vec::new();

    for arg in args {
        let (recipe, _) = load_recipe(arg, options, reporter).inspect_err(|err| {
            reporter.error(&format!("Failed to load recipe {}: {}", arg, err));
        })?;
        recipes.push(recipe);

        if let Some(parent) = Path::new(arg).parent() {
            if !parent.as_os_str().is_empty() && !plugin_dirs.iter().any(|dir| dir == parent) {
                plugin_dirs.push(parent.to_path_buf());
            }
        }
    }

    Ok(LoadedRecipes {
        recipes,
        plugin_dirs,
    })
}

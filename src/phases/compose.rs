//! Phase 2: Composing Recipes
//!
//! Folds every loaded recipe into one composite recipe with
//! [`merge`](crate::merge::merge), left to right. The first recipe's base
//! directory becomes the composite's base directory.
//!
//! Imports left over after merging are functions no recipe exports. They are
//! an error unless the caller explicitly allows unresolved imports.

use crate::error::{Error, Result};
use crate::merge::merge;
use crate::recipe::Recipe;
use crate::report::Reporter;

/// Execute Phase 2: Merge recipes into one composite.
pub fn execute(
    recipes: &[Recipe],
    allow_unresolved_imports: bool,
    reporter: &dyn Reporter,
) -> Result<Recipe> {
    let Some((first, rest)) = recipes.split_first() else {
        reporter.error("No recipe");
        return Err(Error::NoRecipe);
    };

    let mut composite = first.clone();
    for recipe in rest {
        composite = merge(&composite, recipe).map_err(|err| {
            reporter.error(&format!("Recipe merge error: {}", err));
            Error::from(err)
        })?;
    }

    if !composite.imports().is_empty() {
        if allow_unresolved_imports {
            for import in composite.imports() {
                reporter.warning(&format!("Unresolved import '{}'", import));
            }
        } else {
            for import in composite.imports() {
                reporter.error(&format!("Unresolved import '{}'", import));
            }
            reporter.error(
                "Build recipes do not resolve all imports. Make sure all imported \
                 functions in provided recipes are also exported by another recipe.",
            );
            return Err(Error::UnresolvedImports {
                imports: composite.imports().to_vec(),
            });
        }
    }

    Ok(composite)
}

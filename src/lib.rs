//! # Ecsact Recipe Library
//!
//! This library implements the recipe cooking pipeline of the Ecsact build
//! tool. A recipe describes the sources of one Ecsact runtime implementation:
//! the runtime API functions it exports and imports, local files, downloads
//! and codegen plugin invocations. Recipes can be merged, bundled into a
//! single portable archive, and cooked into a working directory ready for
//! compilation.
//!
//! ## Quick Example
//!
//! ```
//! use ecsact_recipe::merge::merge;
//! use ecsact_recipe::recipe::Recipe;
//!
//! let runtime = Recipe::from_yaml_str(
//!     "name: runtime\nexports: [ecsact_create_registry]\nimports: [ecsact_serialize_action]\n",
//!     "runtime.yml",
//! )
//! .unwrap();
//! let serialize = Recipe::from_yaml_str(
//!     "name: serialize\nexports: [ecsact_serialize_action]\n",
//!     "serialize.yml",
//! )
//! .unwrap();
//!
//! let merged = merge(&runtime, &serialize).unwrap();
//! assert_eq!(merged.name(), "runtime + serialize");
//! assert!(merged.imports().is_empty());
//! ```
//!
//! ## Core Concepts
//!
//! - **Recipes (`recipe`, `merge`, `modules`)**: The recipe document model,
//!   the merge engine, and the runtime API module catalog used to classify
//!   exported and imported functions.
//! - **Sources (`materialize`, `fetch`, `integrity`, `archive`)**: Turning
//!   path and fetch sources into files, with SHA-256 integrity checks and
//!   archive unpacking.
//! - **Bundles (`bundle`)**: Packing a recipe with everything it references
//!   into a single xz-compressed tar file, and extracting it again.
//! - **Codegen (`plugin`, `codegen`)**: Locating, loading and driving codegen
//!   plugin shared libraries.
//! - **Phases (`phases`)**: The cooking pipeline, from loading recipe
//!   arguments to tasting the built artifact.
//!
//! ## Execution Flow
//!
//! The main entry point is the `phases::orchestrator`, which executes the
//! following high-level steps:
//!
//! 1.  **Load**: Resolve recipe arguments, extract bundles and parse recipes.
//! 2.  **Compose**: Merge all recipes into a single composite recipe.
//! 3.  **Resolve**: Materialize every source into the working directory.
//! 4.  **Taste**: Check a built artifact's symbols against the recipe.

pub mod archive;
pub mod bundle;
pub mod codegen;
pub mod defaults;
pub mod error;
pub mod fetch;
pub mod filesystem;
pub mod integrity;
pub mod materialize;
pub mod merge;
pub mod modules;
pub mod output;
pub mod path;
pub mod phases;
pub mod plugin;
pub mod recipe;
pub mod report;

#[cfg(test)]
mod path_proptest;

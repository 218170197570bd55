//! Implementation of the phases of cooking a recipe.
//!
//! ## Overview
//!
//! Cooking follows these phases:
//! 1. Load - Turn recipe arguments into parsed recipes, extracting bundles
//! 2. Compose - Merge every recipe into one and check its imports
//! 3. Resolve - Materialize every source into the working directory
//! 4. Taste - Check a built artifact against the recipe's exports and imports
//!
//! Compiling the working directory into an artifact happens between phases 3
//! and 4 and is outside of this crate.

pub mod compose;
pub mod load;
pub mod orchestrator;
pub mod resolve;
pub mod taste;

pub use load as phase1;
pub use compose as phase2;
pub use resolve as phase3;
pub use taste as phase4;

//! Workshop Recipes -- expands workshop material needs into a full,
//! dependency-ordered shopping and crafting list.
//!
//! [`book::RecipeBook`] is the frozen view of the game's recipe, vendor and
//! gathering data. [`resolver::RecipeResolver`] walks it: every requested
//! material is classified (shop, craftable, gatherable, other), craftable
//! materials are expanded into their ingredients level by level, quantities
//! are rounded up to whole crafts, and the result is ordered so that every
//! ingredient appears before the items made from it.

pub mod book;
pub mod resolver;

pub use book::{Recipe, RecipeBook, RecipeBookBuilder, RecipeBookError, RecipeIngredient};
pub use resolver::{
    IngredientKind, RecipeResolver, RequestedItem, ResolveError, ResolvedIngredient,
};

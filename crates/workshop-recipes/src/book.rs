use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use workshop_core::id::ItemId;

use crate::resolver::IngredientKind;

/// Recipes list at most this many distinct ingredients.
pub const MAX_INGREDIENTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub item_id: ItemId,
    pub amount: u32,
}

/// How to craft one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub result: ItemId,
    /// Items produced by one craft.
    pub amount_result: u32,
    pub ingredients: Vec<RecipeIngredient>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct RecipeBookBuilder {
    names: HashMap<ItemId, String>,
    recipes: Vec<Recipe>,
    shop_items: HashSet<ItemId>,
    gatherable: HashSet<ItemId>,
}

impl RecipeBookBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_item(&mut self, item_id: ItemId, name: &str) -> &mut Self {
        self.names.insert(item_id, name.to_string());
        self
    }

    pub fn register_recipe(&mut self, recipe: Recipe) -> &mut Self {
        self.recipes.push(recipe);
        self
    }

    /// Mark an item as sold by a supply vendor.
    pub fn register_shop_item(&mut self, item_id: ItemId) -> &mut Self {
        self.shop_items.insert(item_id);
        self
    }

    /// Mark an item as obtainable from gathering nodes or ventures.
    pub fn register_gatherable(&mut self, item_id: ItemId) -> &mut Self {
        self.gatherable.insert(item_id);
        self
    }

    /// Validate and freeze. When several recipes make the same item the
    /// first registered one wins.
    pub fn build(self) -> Result<RecipeBook, RecipeBookError> {
        let mut recipes = HashMap::with_capacity(self.recipes.len());
        for recipe in self.recipes {
            if recipe.amount_result == 0 {
                return Err(RecipeBookError::ZeroYield(recipe.result));
            }
            if recipe.ingredients.len() > MAX_INGREDIENTS {
                return Err(RecipeBookError::TooManyIngredients {
                    result: recipe.result,
                    count: recipe.ingredients.len(),
                });
            }
            for item in std::iter::once(recipe.result)
                .chain(recipe.ingredients.iter().map(|ingredient| ingredient.item_id))
            {
                if !self.names.contains_key(&item) {
                    return Err(RecipeBookError::UnknownItem(item));
                }
            }
            if recipes.contains_key(&recipe.result) {
                tracing::debug!(result = %recipe.result, "ignoring alternative recipe");
                continue;
            }
            recipes.insert(recipe.result, recipe);
        }

        Ok(RecipeBook {
            names: self.names,
            recipes,
            shop_items: self.shop_items,
            gatherable: self.gatherable,
        })
    }
}

// ---------------------------------------------------------------------------
// RecipeBook
// ---------------------------------------------------------------------------

/// Immutable item, recipe, vendor and gathering data. Frozen after build().
#[derive(Debug, Clone, Default)]
pub struct RecipeBook {
    names: HashMap<ItemId, String>,
    recipes: HashMap<ItemId, Recipe>,
    shop_items: HashSet<ItemId>,
    gatherable: HashSet<ItemId>,
}

impl RecipeBook {
    /// Display name of an item, or `None` for items the book does not know.
    pub fn name_of(&self, item_id: ItemId) -> Option<&str> {
        self.names.get(&item_id).map(String::as_str)
    }

    pub fn recipe_for(&self, item_id: ItemId) -> Option<&Recipe> {
        self.recipes.get(&item_id)
    }

    pub fn is_shop_item(&self, item_id: ItemId) -> bool {
        self.shop_items.contains(&item_id)
    }

    pub fn is_gatherable(&self, item_id: ItemId) -> bool {
        self.gatherable.contains(&item_id)
    }

    /// Shop beats craftable beats gatherable.
    pub fn classify(&self, item_id: ItemId) -> IngredientKind {
        if self.is_shop_item(item_id) {
            IngredientKind::ShopPurchasable
        } else if self.recipes.contains_key(&item_id) {
            IngredientKind::Craftable
        } else if self.is_gatherable(item_id) {
            IngredientKind::Gatherable
        } else {
            IngredientKind::Other
        }
    }

    pub fn item_count(&self) -> usize {
        self.names.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecipeBookError {
    #[error("recipe for {0} yields nothing")]
    ZeroYield(ItemId),
    #[error("recipe for {result} lists {count} ingredients")]
    TooManyIngredients { result: ItemId, count: usize },
    #[error("recipe references unknown item {0}")]
    UnknownItem(ItemId),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(result: u32, amount_result: u32, ingredients: &[(u32, u32)]) -> Recipe {
        Recipe {
            result: ItemId(result),
            amount_result,
            ingredients: ingredients
                .iter()
                .map(|&(item, amount)| RecipeIngredient {
                    item_id: ItemId(item),
                    amount,
                })
                .collect(),
        }
    }

    fn named(builder: &mut RecipeBookBuilder, ids: &[u32]) {
        for &id in ids {
            builder.register_item(ItemId(id), &format!("Item {id}"));
        }
    }

    #[test]
    fn classify_prefers_shop_over_recipe() {
        let mut builder = RecipeBookBuilder::new();
        named(&mut builder, &[1, 2, 3, 4]);
        builder
            .register_recipe(recipe(1, 1, &[(2, 1)]))
            .register_shop_item(ItemId(1))
            .register_recipe(recipe(3, 1, &[(2, 1)]))
            .register_gatherable(ItemId(3))
            .register_gatherable(ItemId(2));
        let book = builder.build().unwrap();

        assert_eq!(book.classify(ItemId(1)), IngredientKind::ShopPurchasable);
        assert_eq!(book.classify(ItemId(3)), IngredientKind::Craftable);
        assert_eq!(book.classify(ItemId(2)), IngredientKind::Gatherable);
        assert_eq!(book.classify(ItemId(4)), IngredientKind::Other);
    }

    #[test]
    fn first_recipe_wins() {
        let mut builder = RecipeBookBuilder::new();
        named(&mut builder, &[1, 2, 3]);
        builder
            .register_recipe(recipe(1, 1, &[(2, 4)]))
            .register_recipe(recipe(1, 1, &[(3, 9)]));
        let book = builder.build().unwrap();

        assert_eq!(book.recipe_for(ItemId(1)).unwrap().ingredients[0].item_id, ItemId(2));
        assert_eq!(book.recipe_count(), 1);
    }

    #[test]
    fn zero_yield_is_rejected() {
        let mut builder = RecipeBookBuilder::new();
        named(&mut builder, &[1, 2]);
        builder.register_recipe(recipe(1, 0, &[(2, 1)]));
        assert_eq!(builder.build().unwrap_err(), RecipeBookError::ZeroYield(ItemId(1)));
    }

    #[test]
    fn unknown_ingredient_is_rejected() {
        let mut builder = RecipeBookBuilder::new();
        named(&mut builder, &[1]);
        builder.register_recipe(recipe(1, 1, &[(77, 1)]));
        assert_eq!(builder.build().unwrap_err(), RecipeBookError::UnknownItem(ItemId(77)));
    }

    #[test]
    fn too_many_ingredients_is_rejected() {
        let ids: Vec<u32> = (1..=12).collect();
        let mut builder = RecipeBookBuilder::new();
        named(&mut builder, &ids);
        let ingredients: Vec<(u32, u32)> = (2..=12).map(|id| (id, 1)).collect();
        builder.register_recipe(recipe(1, 1, &ingredients));
        assert_eq!(
            builder.build().unwrap_err(),
            RecipeBookError::TooManyIngredients {
                result: ItemId(1),
                count: 11,
            }
        );
    }
}

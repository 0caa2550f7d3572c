//! Expansion of requested materials into a dependency-ordered list.
//!
//! Resolution runs in four passes:
//!
//! 1. **Expand** -- craftable nodes are replaced level by level with their
//!    ingredients, each scaled by the parent's required quantity.
//! 2. **Merge** -- nodes are grouped by item; quantities are summed and the
//!    first-seen metadata is kept.
//! 3. **Batch rounding** -- ingredients of a recipe that yields `k` items per
//!    craft are rounded up to a whole multiple of `k`.
//! 4. **Order** -- Kahn-style rounds: every node whose dependencies are all
//!    placed becomes eligible, eligible nodes are placed sorted by name.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use workshop_core::id::ItemId;

use crate::book::RecipeBook;

/// Maximum number of expansion levels before the graph is deemed cyclic.
pub const MAX_EXPANSION_DEPTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IngredientKind {
    ShopPurchasable,
    Craftable,
    Gatherable,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedItem {
    pub item_id: ItemId,
    pub quantity: u64,
}

/// One line of a resolved material list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIngredient {
    pub item_id: ItemId,
    pub name: String,
    pub total_quantity: u64,
    pub kind: IngredientKind,
    /// Items produced by one craft of this ingredient's recipe (1 when
    /// there is no recipe).
    pub amount_crafted: u32,
    /// Direct ingredients of this item's recipe. Empty for shop items.
    pub depends_on: Vec<ItemId>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("recipe expansion exceeded {limit} levels ({pending} craftable items left)")]
    DepthExceeded { limit: usize, pending: usize },
    #[error("unable to order {remaining} ingredients, dependency cycle")]
    Unsortable { remaining: usize },
}

// ---------------------------------------------------------------------------
// RecipeResolver
// ---------------------------------------------------------------------------

/// Resolves material lists against a [`RecipeBook`]. Pure and deterministic
/// for a fixed book.
#[derive(Debug, Clone, Copy)]
pub struct RecipeResolver<'a> {
    book: &'a RecipeBook,
    max_depth: usize,
}

impl<'a> RecipeResolver<'a> {
    pub fn new(book: &'a RecipeBook) -> Self {
        Self {
            book,
            max_depth: MAX_EXPANSION_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn resolve(&self, requested: &[RequestedItem]) -> Result<Vec<ResolvedIngredient>, ResolveError> {
        let expanded = self.expand(requested)?;
        let mut merged = merge(expanded);
        round_to_batches(&mut merged);
        order(merged)
    }

    fn node(&self, item_id: ItemId, total_quantity: u64) -> ResolvedIngredient {
        let recipe = self.book.recipe_for(item_id);
        ResolvedIngredient {
            item_id,
            name: self
                .book
                .name_of(item_id)
                .map_or_else(|| item_id.to_string(), str::to_string),
            total_quantity,
            kind: self.book.classify(item_id),
            amount_crafted: recipe.map_or(1, |recipe| recipe.amount_result),
            depends_on: recipe.map_or_else(Vec::new, |recipe| {
                let mut deps = Vec::with_capacity(recipe.ingredients.len());
                for ingredient in &recipe.ingredients {
                    if !deps.contains(&ingredient.item_id) {
                        deps.push(ingredient.item_id);
                    }
                }
                deps
            }),
        }
    }

    fn expand(&self, requested: &[RequestedItem]) -> Result<Vec<ResolvedIngredient>, ResolveError> {
        let mut frontier: Vec<ResolvedIngredient> = requested
            .iter()
            .map(|item| self.node(item.item_id, item.quantity))
            .collect();
        let mut all = frontier.clone();
        let mut depth = 0;

        loop {
            let pending = frontier
                .iter()
                .filter(|node| node.kind == IngredientKind::Craftable)
                .count();
            if pending == 0 {
                break;
            }
            if depth == self.max_depth {
                return Err(ResolveError::DepthExceeded {
                    limit: self.max_depth,
                    pending,
                });
            }
            depth += 1;

            let mut next = Vec::new();
            for parent in frontier.iter().filter(|node| node.kind == IngredientKind::Craftable) {
                let Some(recipe) = self.book.recipe_for(parent.item_id) else {
                    continue;
                };
                tracing::debug!(item = %parent.name, depth, "expanding recipe");
                for ingredient in &recipe.ingredients {
                    next.push(self.node(
                        ingredient.item_id,
                        parent.total_quantity.saturating_mul(u64::from(ingredient.amount)),
                    ));
                }
            }
            all.extend(next.iter().cloned());
            frontier = next;
        }

        Ok(all)
    }
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

/// Group by item, keeping first-seen order and metadata.
fn merge(nodes: Vec<ResolvedIngredient>) -> Vec<ResolvedIngredient> {
    let mut merged: Vec<ResolvedIngredient> = Vec::new();
    let mut index: HashMap<ItemId, usize> = HashMap::new();
    for node in nodes {
        match index.get(&node.item_id) {
            Some(&position) => {
                let existing = &mut merged[position];
                existing.total_quantity = existing.total_quantity.saturating_add(node.total_quantity);
            }
            None => {
                index.insert(node.item_id, merged.len());
                merged.push(node);
            }
        }
    }
    merged
}

fn round_up(quantity: u64, batch: u64) -> u64 {
    quantity.div_ceil(batch).saturating_mul(batch)
}

/// Partial crafts are impossible, so the ingredients of a multi-yield recipe
/// are rounded up to a whole number of crafts. Applied in list order.
fn round_to_batches(nodes: &mut [ResolvedIngredient]) {
    for position in 0..nodes.len() {
        let batch = u64::from(nodes[position].amount_crafted);
        if batch <= 1 {
            continue;
        }
        let deps = nodes[position].depends_on.clone();
        tracing::debug!(item = %nodes[position].name, batch, "rounding ingredients to whole crafts");
        for part in nodes.iter_mut().filter(|node| deps.contains(&node.item_id)) {
            part.total_quantity = round_up(part.total_quantity, batch);
        }
    }
}

/// Order so every node follows its dependencies. Shop items ignore theirs.
fn order(mut nodes: Vec<ResolvedIngredient>) -> Result<Vec<ResolvedIngredient>, ResolveError> {
    for node in nodes.iter_mut().filter(|node| node.kind == IngredientKind::ShopPurchasable) {
        node.depends_on.clear();
    }

    let mut placed: HashSet<ItemId> = HashSet::with_capacity(nodes.len());
    let mut sorted = Vec::with_capacity(nodes.len());
    let mut remaining = nodes;

    while !remaining.is_empty() {
        let (mut eligible, rest): (Vec<_>, Vec<_>) = remaining
            .into_iter()
            .partition(|node| node.depends_on.iter().all(|dep| placed.contains(dep)));
        if eligible.is_empty() {
            return Err(ResolveError::Unsortable {
                remaining: rest.len(),
            });
        }
        eligible.sort_by(|a, b| a.name.cmp(&b.name));
        placed.extend(eligible.iter().map(|node| node.item_id));
        sorted.extend(eligible);
        remaining = rest;
    }

    Ok(sorted)
}

//! Loading pipeline: finds the data files, deserializes them, resolves item
//! references and builds the frozen catalog and recipe book.
//!
//! Files are looked up by base name in one directory. Each may be RON, TOML
//! or JSON (detected from the extension); two formats for the same base name
//! is an error.
//!
//! | base name   | required | TOML key    |
//! |-------------|----------|-------------|
//! | `items`     | yes      | `items`     |
//! | `crafts`    | yes      | `crafts`    |
//! | `recipes`   | no       | `recipes`   |
//! | `vendors`   | no       | `vendors`   |
//! | `gathering` | no       | `gatherable`|
//! | `settings`  | no       | (whole file)|

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use workshop_core::catalog::{
    CatalogError, WorkshopCatalog, WorkshopCatalogBuilder, WorkshopCraft, WorkshopCraftItem,
    WorkshopCraftPhase,
};
use workshop_core::id::{CraftId, ItemId};
use workshop_core::settings::AutomationSettings;
use workshop_recipes::{Recipe, RecipeBook, RecipeBookBuilder, RecipeBookError, RecipeIngredient};

use crate::schema::{CraftData, ItemData, RecipeData, VendorData};

/// Vendors whose stock counts as "buy from a shop" for the resolver.
pub const SUPPLY_VENDORS: [u32; 8] = [
    262461, 262462, 262463, 262471, 262472, 262692, 262422, 262211,
];

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error("unresolved {expected_kind} reference {id} in {file}")]
    UnresolvedRef {
        file: PathBuf,
        id: u32,
        expected_kind: &'static str,
    },

    #[error("duplicate {kind} id {id} in {file}")]
    DuplicateId {
        file: PathBuf,
        id: u32,
        kind: &'static str,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Recipes(#[from] RecipeBookError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Look for `{base_name}.ron`, `.toml` or `.json` in `dir`.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;
    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }
    Ok(found)
}

pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, err: impl std::fmt::Display) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: err.to_string(),
    }
}

pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list. TOML files hold it under `toml_key` in the top-level
/// table; RON and JSON files are the list itself.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => {
            let table: toml::Value = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
            let array = table
                .get(toml_key)
                .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
                .clone();
            array
                .try_into()
                .map_err(|e: toml::de::Error| parse_error(path, e))
        }
    }
}

fn load_optional_list<T: DeserializeOwned>(
    dir: &Path,
    base_name: &str,
    toml_key: &str,
) -> Result<(Vec<T>, Option<PathBuf>), DataLoadError> {
    match find_data_file(dir, base_name)? {
        Some(path) => Ok((deserialize_list(&path, toml_key)?, Some(path))),
        None => Ok((Vec::new(), None)),
    }
}

// ===========================================================================
// Reference resolution
// ===========================================================================

/// Look up an item name, failing with `UnresolvedRef`.
pub fn resolve_item<'a>(
    names: &'a HashMap<u32, String>,
    id: u32,
    file: &Path,
) -> Result<&'a str, DataLoadError> {
    names
        .get(&id)
        .map(String::as_str)
        .ok_or_else(|| DataLoadError::UnresolvedRef {
            file: file.to_path_buf(),
            id,
            expected_kind: "item",
        })
}

fn index_items(items: &[ItemData], file: &Path) -> Result<HashMap<u32, String>, DataLoadError> {
    let mut names = HashMap::with_capacity(items.len());
    for item in items {
        if names.insert(item.id, item.name.clone()).is_some() {
            return Err(DataLoadError::DuplicateId {
                file: file.to_path_buf(),
                id: item.id,
                kind: "item",
            });
        }
    }
    Ok(names)
}

fn convert_craft(
    data: &CraftData,
    names: &HashMap<u32, String>,
    file: &Path,
) -> Result<WorkshopCraft, DataLoadError> {
    resolve_item(names, data.result_item, file)?;
    let phases = data
        .phases
        .iter()
        .map(|phase| {
            let items = phase
                .items
                .iter()
                .map(|entry| {
                    Ok(WorkshopCraftItem {
                        item_id: ItemId(entry.item()),
                        name: resolve_item(names, entry.item(), file)?.to_string(),
                        quantity_per_set: entry.quantity_per_set(),
                        sets_required: entry.sets_required(),
                    })
                })
                .collect::<Result<Vec<_>, DataLoadError>>()?;
            Ok(WorkshopCraftPhase {
                name: phase.name.clone(),
                items,
            })
        })
        .collect::<Result<Vec<_>, DataLoadError>>()?;

    Ok(WorkshopCraft {
        craft_id: CraftId(data.id),
        result_item: ItemId(data.result_item),
        name: data.name.clone(),
        category: data.category,
        craft_type: data.craft_type,
        phases,
    })
}

fn convert_recipe(data: &RecipeData) -> Recipe {
    Recipe {
        result: ItemId(data.result),
        amount_result: data.amount_result,
        ingredients: data
            .ingredients
            .iter()
            .map(|ingredient| RecipeIngredient {
                item_id: ItemId(ingredient.item()),
                amount: ingredient.amount(),
            })
            .collect(),
    }
}

// ===========================================================================
// Pipeline
// ===========================================================================

/// Everything the automation needs from disk, frozen.
#[derive(Debug, Clone)]
pub struct WorkshopData {
    pub catalog: WorkshopCatalog,
    pub recipes: RecipeBook,
    pub settings: AutomationSettings,
}

/// Load every data file in `dir`.
pub fn load_workshop_data(dir: &Path) -> Result<WorkshopData, DataLoadError> {
    let items_path = require_data_file(dir, "items")?;
    let items: Vec<ItemData> = deserialize_list(&items_path, "items")?;
    let names = index_items(&items, &items_path)?;

    let crafts_path = require_data_file(dir, "crafts")?;
    let crafts: Vec<CraftData> = deserialize_list(&crafts_path, "crafts")?;
    let mut catalog = WorkshopCatalogBuilder::new();
    for craft in &crafts {
        catalog.register_craft(convert_craft(craft, &names, &crafts_path)?);
    }
    let catalog = catalog.build()?;

    let mut book = RecipeBookBuilder::new();
    for item in &items {
        book.register_item(ItemId(item.id), &item.name);
    }

    let (recipes, _) = load_optional_list::<RecipeData>(dir, "recipes", "recipes")?;
    for recipe in &recipes {
        book.register_recipe(convert_recipe(recipe));
    }

    let (vendors, _) = load_optional_list::<VendorData>(dir, "vendors", "vendors")?;
    let mut shop_items = 0usize;
    for entry in &vendors {
        if entry.vendors.iter().any(|vendor| SUPPLY_VENDORS.contains(vendor)) {
            book.register_shop_item(ItemId(entry.item));
            shop_items += 1;
        }
    }

    let (gatherable, _) = load_optional_list::<u32>(dir, "gathering", "gatherable")?;
    for item in &gatherable {
        book.register_gatherable(ItemId(*item));
    }
    let recipes_book = book.build()?;

    let settings = match find_data_file(dir, "settings")? {
        Some(path) => deserialize_file(&path)?,
        None => AutomationSettings::default(),
    };

    tracing::info!(
        dir = %dir.display(),
        crafts = catalog.len(),
        items = recipes_book.item_count(),
        recipes = recipes_book.recipe_count(),
        shop_items,
        gatherable = gatherable.len(),
        "loaded workshop data"
    );

    Ok(WorkshopData {
        catalog,
        recipes: recipes_book,
        settings,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use workshop_recipes::IngredientKind;

    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "workshop_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    const ITEMS_RON: &str = r#"[
        (id: 5101, name: "Lumber"),
        (id: 5102, name: "Iron Ingot"),
        (id: 5103, name: "Log"),
        (id: 9101, name: "Shark-class Bow"),
    ]"#;

    const CRAFTS_RON: &str = r#"[
        (
            id: 101,
            result_item: 9101,
            name: "Shark-class Bow",
            category: 1,
            phases: [
                (name: "Frame", items: [(5101, 3, 2)]),
                (name: "Finish", items: [(item: 5102, quantity_per_set: 2, sets_required: 2)]),
            ],
        ),
    ]"#;

    // -----------------------------------------------------------------------
    // detect_format / find_data_file
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("items.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("items.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("items.json")).unwrap(), Format::Json);
        assert!(matches!(
            detect_format(Path::new("items.yaml")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
        assert!(detect_format(Path::new("items")).is_err());
    }

    #[test]
    fn find_data_file_conflict() {
        let dir = make_test_dir("find_conflict");
        fs::write(dir.join("items.ron"), "[]").unwrap();
        fs::write(dir.join("items.json"), "[]").unwrap();

        assert!(matches!(
            find_data_file(&dir, "items"),
            Err(DataLoadError::ConflictingFormats { .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn require_data_file_missing() {
        let dir = make_test_dir("require_missing");
        let err = require_data_file(&dir, "crafts").unwrap_err();
        assert!(err.to_string().contains("'crafts'"));
        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // deserialize_list
    // -----------------------------------------------------------------------

    #[test]
    fn toml_lists_live_under_a_key() {
        let dir = make_test_dir("list_toml");
        let path = dir.join("gathering.toml");
        fs::write(&path, "gatherable = [5103, 5111]\n").unwrap();

        let ids: Vec<u32> = deserialize_list(&path, "gatherable").unwrap();
        assert_eq!(ids, vec![5103, 5111]);
        assert!(deserialize_list::<u32>(&path, "other").is_err());
        cleanup(&dir);
    }

    #[test]
    fn json_items_parse() {
        let dir = make_test_dir("list_json");
        let path = dir.join("items.json");
        fs::write(&path, r#"[{"id": 1, "name": "Gil"}]"#).unwrap();

        let items: Vec<ItemData> = deserialize_list(&path, "items").unwrap();
        assert_eq!(items[0].name, "Gil");
        cleanup(&dir);
    }

    #[test]
    fn parse_error_names_the_file() {
        let dir = make_test_dir("parse_err");
        let path = dir.join("items.ron");
        fs::write(&path, "[(id: )]").unwrap();

        let err = deserialize_list::<ItemData>(&path, "items").unwrap_err();
        assert!(matches!(err, DataLoadError::Parse { ref file, .. } if file == &path));
        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // load_workshop_data
    // -----------------------------------------------------------------------

    #[test]
    fn loads_minimal_directory() {
        let dir = make_test_dir("minimal");
        fs::write(dir.join("items.ron"), ITEMS_RON).unwrap();
        fs::write(dir.join("crafts.ron"), CRAFTS_RON).unwrap();

        let data = load_workshop_data(&dir).unwrap();
        let bow = data.catalog.require(CraftId(101)).unwrap();
        assert_eq!(bow.phase_count(), 2);
        assert_eq!(bow.phases[0].items[0].name, "Lumber");
        assert_eq!(bow.phases[0].items[0].total_quantity(), 6);
        assert_eq!(bow.phases[1].items[0].name, "Iron Ingot");
        assert_eq!(data.recipes.recipe_count(), 0);
        assert_eq!(data.settings, AutomationSettings::default());
        cleanup(&dir);
    }

    #[test]
    fn optional_files_feed_the_recipe_book() {
        let dir = make_test_dir("optional");
        fs::write(dir.join("items.ron"), ITEMS_RON).unwrap();
        fs::write(dir.join("crafts.ron"), CRAFTS_RON).unwrap();
        fs::write(
            dir.join("recipes.ron"),
            "[(result: 5101, amount_result: 1, ingredients: [(5103, 3)])]",
        )
        .unwrap();
        fs::write(
            dir.join("vendors.json"),
            r#"[{"item": 5102, "vendors": [1000, 262461]}, {"item": 5101, "vendors": [1000]}]"#,
        )
        .unwrap();
        fs::write(dir.join("gathering.toml"), "gatherable = [5103]\n").unwrap();
        fs::write(
            dir.join("settings.toml"),
            "[timings]\nbranch_watchdog_ms = 4000\n",
        )
        .unwrap();

        let data = load_workshop_data(&dir).unwrap();
        assert_eq!(data.recipes.classify(ItemId(5101)), IngredientKind::Craftable);
        assert_eq!(data.recipes.classify(ItemId(5102)), IngredientKind::ShopPurchasable);
        assert_eq!(data.recipes.classify(ItemId(5103)), IngredientKind::Gatherable);
        assert_eq!(data.settings.timings.branch_watchdog_ms, 4000);
        assert_eq!(data.settings.timings.contribute_delay_ms, 1000);
        cleanup(&dir);
    }

    #[test]
    fn unknown_material_is_unresolved() {
        let dir = make_test_dir("unresolved");
        fs::write(dir.join("items.ron"), r#"[(id: 9101, name: "Shark-class Bow")]"#).unwrap();
        fs::write(dir.join("crafts.ron"), CRAFTS_RON).unwrap();

        let err = load_workshop_data(&dir).unwrap_err();
        assert!(matches!(
            err,
            DataLoadError::UnresolvedRef { id: 5101, expected_kind: "item", .. }
        ));
        cleanup(&dir);
    }

    #[test]
    fn duplicate_item_ids_are_rejected() {
        let dir = make_test_dir("dup_items");
        fs::write(
            dir.join("items.ron"),
            r#"[(id: 1, name: "Gil"), (id: 1, name: "Also Gil")]"#,
        )
        .unwrap();
        fs::write(dir.join("crafts.ron"), "[]").unwrap();

        assert!(matches!(
            load_workshop_data(&dir),
            Err(DataLoadError::DuplicateId { id: 1, .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn catalog_errors_surface() {
        let dir = make_test_dir("empty_phases");
        fs::write(dir.join("items.ron"), ITEMS_RON).unwrap();
        fs::write(
            dir.join("crafts.ron"),
            r#"[(id: 7, result_item: 9101, name: "Nothing", phases: [])]"#,
        )
        .unwrap();

        assert!(matches!(
            load_workshop_data(&dir),
            Err(DataLoadError::Catalog(CatalogError::NoPhases(_)))
        ));
        cleanup(&dir);
    }

    #[test]
    fn bundled_sample_data_loads() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
        let data = load_workshop_data(&dir).unwrap();
        assert!(!data.catalog.is_empty());
        assert!(data.recipes.recipe_count() > 0);
    }
}

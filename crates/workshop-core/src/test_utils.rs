//! Shared fixtures and fakes for tests across the workspace.
//!
//! Enabled inside this crate's own tests and, for other crates, through the
//! `test-utils` feature.

use crate::catalog::{
    WorkshopCatalog, WorkshopCatalogBuilder, WorkshopCraft, WorkshopCraftItem, WorkshopCraftPhase,
};
use crate::controller::{StageController, TickContext};
use crate::coordinator::ExternalAutomationCoordinator;
use crate::host::{
    ActorEnvironment, ActorStatus, ConfigStore, ExternalAutomation, InventoryQuery,
    UiSnapshotProvider,
};
use crate::id::{CraftId, ItemId};
use crate::snapshot::{
    CallbackArg, CraftLogEntry, CraftLogSnapshot, CraftSnapshot, CraftSnapshotItem, Panel,
    ReadError, ShopListing,
};
use crate::state::{AutomationState, StoreError};
use crate::time::Timestamp;
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

pub fn plank() -> ItemId {
    ItemId(5101)
}
pub fn ingot() -> ItemId {
    ItemId(5102)
}
pub fn cloth() -> ItemId {
    ItemId(5104)
}

fn item_name(item: ItemId) -> &'static str {
    match item.0 {
        5101 => "Lumber",
        5102 => "Iron Ingot",
        5104 => "Canvas",
        _ => "Unknown",
    }
}

// ---------------------------------------------------------------------------
// Crafts
// ---------------------------------------------------------------------------

pub fn craft_item(item: ItemId, quantity_per_set: u32, sets_required: u32) -> WorkshopCraftItem {
    WorkshopCraftItem {
        item_id: item,
        name: item_name(item).to_string(),
        quantity_per_set,
        sets_required,
    }
}

/// Two phases: lumber 3x2, then iron ingot 2x2.
pub fn shark_bow() -> WorkshopCraft {
    WorkshopCraft {
        craft_id: CraftId(101),
        result_item: ItemId(9101),
        name: "Shark-class Bow".into(),
        category: 1,
        craft_type: 0,
        phases: vec![
            WorkshopCraftPhase {
                name: "Phase 1".into(),
                items: vec![craft_item(plank(), 3, 2)],
            },
            WorkshopCraftPhase {
                name: "Phase 2".into(),
                items: vec![craft_item(ingot(), 2, 2)],
            },
        ],
    }
}

/// One phase: lumber 2x3 and canvas 1x3.
pub fn oak_bench() -> WorkshopCraft {
    WorkshopCraft {
        craft_id: CraftId(202),
        result_item: ItemId(9202),
        name: "Oak Bench".into(),
        category: 3,
        craft_type: 2,
        phases: vec![WorkshopCraftPhase {
            name: "Phase 1".into(),
            items: vec![craft_item(plank(), 2, 3), craft_item(cloth(), 1, 3)],
        }],
    }
}

pub fn single_phase_craft(
    craft_id: CraftId,
    name: &str,
    item: ItemId,
    quantity_per_set: u32,
    sets_required: u32,
) -> WorkshopCraft {
    WorkshopCraft {
        craft_id,
        result_item: ItemId(9000 + craft_id.0),
        name: name.to_string(),
        category: 0,
        craft_type: 0,
        phases: vec![WorkshopCraftPhase {
            name: "Phase 1".into(),
            items: vec![craft_item(item, quantity_per_set, sets_required)],
        }],
    }
}

pub fn sample_catalog() -> WorkshopCatalog {
    let mut builder = WorkshopCatalogBuilder::new();
    builder.register_craft(shark_bow()).register_craft(oak_bench());
    builder.build().expect("sample catalog is valid")
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

pub fn snapshot_row(
    item: ItemId,
    name: &str,
    count_per_step: u32,
    steps_complete: u32,
    steps_total: u32,
) -> CraftSnapshotItem {
    CraftSnapshotItem {
        item_id: item,
        name: name.to_string(),
        count_per_step,
        count_nq: 0,
        count_hq: 0,
        steps_complete,
        steps_total,
        finished: false,
    }
}

/// Fresh delivery panel for `phase` of `craft`, nothing contributed yet.
pub fn delivery_snapshot_for(craft: &WorkshopCraft, phase: usize) -> CraftSnapshot {
    CraftSnapshot {
        result_item: craft.result_item,
        steps_complete: phase as u32,
        steps_total: craft.phase_count() as u32,
        items: craft.phases[phase]
            .items
            .iter()
            .map(|item| {
                snapshot_row(item.item_id, &item.name, item.quantity_per_set, 0, item.sets_required)
            })
            .collect(),
    }
}

pub fn craft_log_with(crafts: &[&WorkshopCraft]) -> CraftLogSnapshot {
    CraftLogSnapshot {
        entries: crafts
            .iter()
            .map(|craft| CraftLogEntry {
                craft_id: craft.craft_id,
                name: craft.name.clone(),
            })
            .collect(),
    }
}

pub fn at_station() -> ActorStatus {
    ActorStatus {
        logged_in: true,
        zone: Some(423),
        in_blocking_activity: false,
        distance_to_station: Some(2.0),
        job_id: Some(8),
    }
}

// ---------------------------------------------------------------------------
// ScriptedUi
// ---------------------------------------------------------------------------

/// An interaction fired at the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FiredAction {
    Choice {
        panel: Panel,
        index: usize,
    },
    Callback {
        panel: Panel,
        request_id: i32,
        args: Vec<CallbackArg>,
    },
}

/// A UI whose panels are set up by the test between ticks. It records every
/// fired interaction and never changes on its own.
#[derive(Debug, Default)]
pub struct ScriptedUi {
    open: HashSet<Panel>,
    entries: HashMap<Panel, Vec<String>>,
    craft_snapshot: Option<Result<CraftSnapshot, ReadError>>,
    craft_log: Option<CraftLogSnapshot>,
    shops: HashMap<Panel, ShopListing>,
    fired: Vec<FiredAction>,
}

impl ScriptedUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, panel: Panel) {
        self.open.insert(panel);
    }

    pub fn close(&mut self, panel: Panel) {
        self.open.remove(&panel);
    }

    /// Open a list menu with the given entries.
    pub fn show_menu(&mut self, entries: &[&str]) {
        self.entries.insert(
            Panel::SelectString,
            entries.iter().map(|entry| entry.to_string()).collect(),
        );
        self.open(Panel::SelectString);
    }

    /// Open a yes/no prompt with the given text.
    pub fn show_prompt(&mut self, text: &str) {
        self.entries.insert(Panel::SelectYesNo, vec![text.to_string()]);
        self.open(Panel::SelectYesNo);
    }

    pub fn set_craft_snapshot(&mut self, snapshot: CraftSnapshot) {
        self.craft_snapshot = Some(Ok(snapshot));
        self.open(Panel::MaterialDelivery);
    }

    pub fn set_craft_read_error(&mut self, err: ReadError) {
        self.craft_snapshot = Some(Err(err));
        self.open(Panel::MaterialDelivery);
    }

    pub fn craft_snapshot_mut(&mut self) -> Option<&mut CraftSnapshot> {
        self.craft_snapshot.as_mut().and_then(|result| result.as_mut().ok())
    }

    pub fn set_craft_log(&mut self, log: CraftLogSnapshot) {
        self.craft_log = Some(log);
        self.open(Panel::CraftLog);
    }

    pub fn set_shop(&mut self, panel: Panel, listing: ShopListing) {
        self.shops.insert(panel, listing);
        self.open(panel);
    }

    pub fn shop_mut(&mut self, panel: Panel) -> Option<&mut ShopListing> {
        self.shops.get_mut(&panel)
    }

    pub fn fired(&self) -> &[FiredAction] {
        &self.fired
    }

    pub fn clear_fired(&mut self) {
        self.fired.clear();
    }

    pub fn take_fired(&mut self) -> Vec<FiredAction> {
        std::mem::take(&mut self.fired)
    }

    /// Indices chosen on `panel`, in order.
    pub fn choices(&self, panel: Panel) -> Vec<usize> {
        self.fired
            .iter()
            .filter_map(|action| match action {
                FiredAction::Choice { panel: p, index } if *p == panel => Some(*index),
                _ => None,
            })
            .collect()
    }

    /// Callbacks fired on `panel`, in order.
    pub fn callbacks(&self, panel: Panel) -> Vec<(i32, Vec<CallbackArg>)> {
        self.fired
            .iter()
            .filter_map(|action| match action {
                FiredAction::Callback {
                    panel: p,
                    request_id,
                    args,
                } if *p == panel => Some((*request_id, args.clone())),
                _ => None,
            })
            .collect()
    }
}

impl UiSnapshotProvider for ScriptedUi {
    fn is_ready(&self, panel: Panel) -> bool {
        self.open.contains(&panel)
    }

    fn read_craft_snapshot(&self) -> Result<CraftSnapshot, ReadError> {
        if !self.is_ready(Panel::MaterialDelivery) {
            return Err(ReadError::NotReady(Panel::MaterialDelivery));
        }
        self.craft_snapshot
            .clone()
            .unwrap_or(Err(ReadError::NotReady(Panel::MaterialDelivery)))
    }

    fn read_craft_log(&self) -> Result<CraftLogSnapshot, ReadError> {
        match &self.craft_log {
            Some(log) if self.is_ready(Panel::CraftLog) => Ok(log.clone()),
            _ => Err(ReadError::NotReady(Panel::CraftLog)),
        }
    }

    fn read_shop_snapshot(&self, panel: Panel) -> Result<ShopListing, ReadError> {
        match self.shops.get(&panel) {
            Some(listing) if self.is_ready(panel) => Ok(listing.clone()),
            _ => Err(ReadError::NotReady(panel)),
        }
    }

    fn read_selectable_text(&self, panel: Panel, index: usize) -> Option<String> {
        if !self.is_ready(panel) {
            return None;
        }
        self.entries.get(&panel)?.get(index).cloned()
    }

    fn fire_choice(&mut self, panel: Panel, index: usize) {
        self.fired.push(FiredAction::Choice { panel, index });
    }

    fn fire_callback(&mut self, panel: Panel, request_id: i32, args: &[CallbackArg]) {
        self.fired.push(FiredAction::Callback {
            panel,
            request_id,
            args: args.to_vec(),
        });
    }
}

// ---------------------------------------------------------------------------
// FakeInventory
// ---------------------------------------------------------------------------

/// Inventory made of explicit stacks.
#[derive(Debug, Clone)]
pub struct FakeInventory {
    stacks: Vec<(ItemId, u32)>,
    free_slots: u32,
    max_batch: HashMap<ItemId, u32>,
}

impl Default for FakeInventory {
    fn default() -> Self {
        Self {
            stacks: Vec::new(),
            free_slots: 10,
            max_batch: HashMap::new(),
        }
    }
}

impl FakeInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stack(mut self, item: ItemId, count: u32) -> Self {
        self.add_stack(item, count);
        self
    }

    pub fn with_free_slots(mut self, free_slots: u32) -> Self {
        self.free_slots = free_slots;
        self
    }

    pub fn with_max_batch(mut self, item: ItemId, batch: u32) -> Self {
        self.max_batch.insert(item, batch);
        self
    }

    pub fn add_stack(&mut self, item: ItemId, count: u32) {
        self.stacks.push((item, count));
    }

    /// Remove `count` items from the first stack holding that many.
    pub fn take_from_stack(&mut self, item: ItemId, count: u32) -> bool {
        match self
            .stacks
            .iter_mut()
            .find(|(id, held)| *id == item && *held >= count)
        {
            Some((_, held)) => {
                *held -= count;
                true
            }
            None => false,
        }
    }

    pub fn set_free_slots(&mut self, free_slots: u32) {
        self.free_slots = free_slots;
    }

    pub fn set_max_batch(&mut self, item: ItemId, batch: u32) {
        self.max_batch.insert(item, batch);
    }
}

impl InventoryQuery for FakeInventory {
    fn has_in_single_slot(&self, item: ItemId, count: u32) -> bool {
        self.stacks.iter().any(|(id, held)| *id == item && *held >= count)
    }

    fn count_total(&self, item: ItemId) -> u32 {
        self.stacks
            .iter()
            .filter(|(id, _)| *id == item)
            .map(|(_, held)| *held)
            .sum()
    }

    fn free_slot_count(&self) -> u32 {
        self.free_slots
    }

    fn max_batch_size_for(&self, item: ItemId) -> u32 {
        self.max_batch.get(&item).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// FakeActor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FakeActor {
    pub status: ActorStatus,
    pub interact_succeeds: bool,
    interactions: u32,
}

impl Default for FakeActor {
    fn default() -> Self {
        Self {
            status: at_station(),
            interact_succeeds: true,
            interactions: 0,
        }
    }
}

impl FakeActor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interactions(&self) -> u32 {
        self.interactions
    }
}

impl ActorEnvironment for FakeActor {
    fn status(&self) -> ActorStatus {
        self.status.clone()
    }

    fn interact_with_station(&mut self) -> bool {
        if self.interact_succeeds {
            self.interactions += 1;
        }
        self.interact_succeeds
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub saved: Option<AutomationState>,
    pub save_count: u32,
    pub fail_saves: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: AutomationState) -> Self {
        Self {
            saved: Some(state),
            ..Self::default()
        }
    }
}

impl ConfigStore for MemoryStore {
    fn load(&mut self) -> Result<Option<AutomationState>, StoreError> {
        Ok(self.saved.clone())
    }

    fn save(&mut self, state: &AutomationState) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.saved = Some(state.clone());
        self.save_count += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingAutomation
// ---------------------------------------------------------------------------

/// External automation feature whose flag stays observable after it is
/// boxed into a coordinator. Clones share state.
#[derive(Debug, Clone)]
pub struct RecordingAutomation {
    installed: bool,
    enabled: Rc<Cell<bool>>,
    enable_calls: Rc<Cell<u32>>,
    disable_calls: Rc<Cell<u32>>,
}

impl RecordingAutomation {
    pub fn installed(enabled: bool) -> Self {
        Self {
            installed: true,
            enabled: Rc::new(Cell::new(enabled)),
            enable_calls: Rc::new(Cell::new(0)),
            disable_calls: Rc::new(Cell::new(0)),
        }
    }

    pub fn missing() -> Self {
        Self {
            installed: false,
            ..Self::installed(false)
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn enable_calls(&self) -> u32 {
        self.enable_calls.get()
    }

    pub fn disable_calls(&self) -> u32 {
        self.disable_calls.get()
    }
}

impl ExternalAutomation for RecordingAutomation {
    fn name(&self) -> &str {
        "recording"
    }

    fn disable_if_enabled(&mut self) -> Option<bool> {
        if !self.installed {
            return None;
        }
        self.disable_calls.set(self.disable_calls.get() + 1);
        Some(self.enabled.replace(false))
    }

    fn enable(&mut self) {
        self.enable_calls.set(self.enable_calls.get() + 1);
        self.enabled.set(true);
    }
}

// ---------------------------------------------------------------------------
// TestHost
// ---------------------------------------------------------------------------

/// Bundles the fakes and a manual clock for driving a [`StageController`].
#[derive(Debug, Default)]
pub struct TestHost {
    pub ui: ScriptedUi,
    pub inventory: FakeInventory,
    pub actor: FakeActor,
    pub coordinator: ExternalAutomationCoordinator,
    pub store: MemoryStore,
    pub now: Timestamp,
}

impl TestHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, millis: u64) {
        self.now = self.now.after(millis);
    }

    pub fn tick(
        &mut self,
        controller: &mut StageController,
        state: &mut AutomationState,
        catalog: &WorkshopCatalog,
    ) {
        let mut ctx = TickContext {
            now: self.now,
            ui: &mut self.ui,
            inventory: &self.inventory,
            actor: &mut self.actor,
            coordinator: &mut self.coordinator,
            store: &mut self.store,
        };
        controller.tick(state, catalog, &mut ctx);
    }

    /// Jump the clock to the controller's next deadline, then tick.
    pub fn tick_when_due(
        &mut self,
        controller: &mut StageController,
        state: &mut AutomationState,
        catalog: &WorkshopCatalog,
    ) {
        if controller.not_before() > self.now && controller.not_before() != Timestamp::NEVER {
            self.now = controller.not_before();
        }
        self.tick(controller, state, catalog);
    }
}

//! A simulated fabrication station shared by the integration tests.
//!
//! Unlike `ScriptedUi`, the simulated world reacts to what the automation
//! fires: choosing "Contribute materials." opens the delivery panel, a
//! delivery callback raises the confirmation prompt, answering it hands the
//! items over, and so on. The UI, actor and inventory ports are separate
//! handles onto one shared world so they can be borrowed independently.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use workshop_core::catalog::{WorkshopCatalog, WorkshopCraft};
use workshop_core::host::{ActorEnvironment, ActorStatus, InventoryQuery, UiSnapshotProvider};
use workshop_core::id::{CraftId, ItemId};
use workshop_core::snapshot::{
    CallbackArg, CraftLogEntry, CraftLogSnapshot, CraftSnapshot, CraftSnapshotItem, Panel,
    ReadError, ShopListing, ShopSnapshot,
};
use workshop_core::test_utils::{MemoryStore, at_station};
use workshop_core::time::Timestamp;
use workshop_plugin::{HostFrame, Workshop};

// ===========================================================================
// World
// ===========================================================================

#[derive(Debug, Clone)]
pub struct Project {
    pub craft: WorkshopCraft,
    pub phase: usize,
    /// Steps delivered per row of the current phase.
    pub steps: Vec<u32>,
    pub constructed: bool,
}

impl Project {
    fn new(craft: WorkshopCraft) -> Self {
        let steps = vec![0; craft.phases[0].items.len()];
        Self {
            craft,
            phase: 0,
            steps,
            constructed: false,
        }
    }

    fn phase_done(&self) -> bool {
        self.craft.phases[self.phase]
            .items
            .iter()
            .zip(&self.steps)
            .all(|(item, done)| *done >= item.sets_required)
    }

    fn is_last_phase(&self) -> bool {
        self.phase + 1 == self.craft.phases.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    ConfirmCraft(CraftId),
    HighQuality { row: usize, count: u32 },
    Deliver { row: usize, count: u32 },
    Retrieve,
    Purchase { quantity: u32 },
}

#[derive(Debug, Clone)]
pub struct CreditShopState {
    pub credits: u32,
    pub price: u32,
    pub item_id: ItemId,
}

#[derive(Debug)]
pub struct World {
    pub catalog: WorkshopCatalog,
    pub unlocked: Vec<CraftId>,
    pub project: Option<Project>,
    pub menu: Option<Vec<String>>,
    pub craft_log_open: bool,
    pub delivery_open: bool,
    pub prompt: Option<(String, PromptKind)>,
    pub stacks: Vec<(ItemId, u32)>,
    pub free_slots: u32,
    pub max_batch: Vec<(ItemId, u32)>,
    pub status: ActorStatus,
    /// Raise the high-quality warning before the next delivery prompt.
    pub hq_warning_next: bool,
    /// Swallow the next delivery callback without raising a prompt.
    pub drop_next_delivery: bool,
    pub credit_shop: Option<CreditShopState>,
    pub delivery_requests: u32,
    pub deliveries_confirmed: u32,
    pub collections: u32,
    pub interactions: u32,
    pub purchases: Vec<u32>,
}

impl World {
    pub fn new(catalog: WorkshopCatalog) -> Self {
        let unlocked = catalog.crafts().iter().map(|craft| craft.craft_id).collect();
        Self {
            catalog,
            unlocked,
            project: None,
            menu: None,
            craft_log_open: false,
            delivery_open: false,
            prompt: None,
            stacks: Vec::new(),
            free_slots: 20,
            max_batch: Vec::new(),
            status: at_station(),
            hq_warning_next: false,
            drop_next_delivery: false,
            credit_shop: None,
            delivery_requests: 0,
            deliveries_confirmed: 0,
            collections: 0,
            interactions: 0,
            purchases: Vec::new(),
        }
    }

    pub fn give(&mut self, item: ItemId, count: u32) {
        self.stacks.push((item, count));
    }

    /// Give one stack per craft material, big enough for `units` crafts.
    pub fn stock_for(&mut self, craft_id: CraftId, units: u32) {
        let Some(craft) = self.catalog.get(craft_id).cloned() else {
            return;
        };
        for item in craft.all_items() {
            self.give(item.item_id, item.total_quantity() * units);
        }
    }

    pub fn count(&self, item: ItemId) -> u32 {
        self.stacks
            .iter()
            .filter(|(id, _)| *id == item)
            .map(|(_, held)| *held)
            .sum()
    }

    fn take(&mut self, item: ItemId, count: u32) {
        if let Some((_, held)) = self
            .stacks
            .iter_mut()
            .find(|(id, held)| *id == item && *held >= count)
        {
            *held -= count;
        }
    }

    fn station_menu(&self) -> Vec<String> {
        let Some(project) = &self.project else {
            return vec!["View company crafting log.".into(), "Nothing.".into()];
        };
        let first = if project.constructed {
            "Collect finished product.".to_string()
        } else if !project.phase_done() {
            "Contribute materials.".to_string()
        } else if project.is_last_phase() {
            format!("Complete the construction of the {}.", project.craft.name)
        } else {
            "Advance to the next phase of production.".to_string()
        };
        vec![first, "Nothing.".into()]
    }

    fn delivery_snapshot(&self) -> CraftSnapshot {
        let Some(project) = &self.project else {
            return CraftSnapshot {
                result_item: ItemId::NONE,
                steps_complete: 0,
                steps_total: 0,
                items: Vec::new(),
            };
        };
        let items = project.craft.phases[project.phase]
            .items
            .iter()
            .zip(&project.steps)
            .map(|(item, done)| CraftSnapshotItem {
                item_id: item.item_id,
                name: item.name.clone(),
                count_per_step: item.quantity_per_set,
                count_nq: self.count(item.item_id),
                count_hq: 0,
                steps_complete: *done,
                steps_total: item.sets_required,
                finished: *done >= item.sets_required,
            })
            .collect();
        CraftSnapshot {
            result_item: project.craft.result_item,
            steps_complete: project.phase as u32,
            steps_total: project.craft.phases.len() as u32,
            items,
        }
    }

    fn choose_menu_entry(&mut self, index: usize) {
        let Some(entry) = self.menu.as_ref().and_then(|menu| menu.get(index)).cloned() else {
            return;
        };
        self.menu = None;
        if entry == "View company crafting log." {
            self.craft_log_open = true;
        } else if entry == "Contribute materials." {
            self.delivery_open = true;
        } else if entry.starts_with("Advance to the next phase") {
            if let Some(project) = self.project.as_mut() {
                project.phase += 1;
                project.steps = vec![0; project.craft.phases[project.phase].items.len()];
            }
        } else if entry.starts_with("Complete the construction") {
            if let Some(project) = self.project.as_mut() {
                project.constructed = true;
            }
        } else if entry == "Collect finished product." {
            if let Some(project) = &self.project {
                self.prompt = Some((
                    format!("Retrieve the {}?", project.craft.name),
                    PromptKind::Retrieve,
                ));
            }
        }
    }

    fn answer_prompt(&mut self, index: usize) {
        let Some((_, kind)) = self.prompt.take() else {
            return;
        };
        if index != 0 {
            return;
        }
        match kind {
            PromptKind::ConfirmCraft(craft_id) => {
                if let Some(craft) = self.catalog.get(craft_id).cloned() {
                    self.project = Some(Project::new(craft));
                    self.menu = Some(self.station_menu());
                }
            }
            PromptKind::HighQuality { row, count } => {
                self.prompt = Some(self.delivery_prompt(row, count));
            }
            PromptKind::Deliver { row, count } => self.deliver(row, count),
            PromptKind::Retrieve => {
                if let Some(project) = self.project.take() {
                    self.give(project.craft.result_item, 1);
                    self.collections += 1;
                }
            }
            PromptKind::Purchase { quantity } => {
                if let Some(shop) = self.credit_shop.as_mut() {
                    shop.credits -= shop.price * quantity;
                    let item = shop.item_id;
                    self.give(item, quantity);
                    self.purchases.push(quantity);
                }
            }
        }
    }

    fn delivery_prompt(&self, row: usize, count: u32) -> (String, PromptKind) {
        let name = self
            .project
            .as_ref()
            .map(|project| project.craft.phases[project.phase].items[row].name.clone())
            .unwrap_or_default();
        (
            format!("Contribute {count} {name}\nto the company project?"),
            PromptKind::Deliver { row, count },
        )
    }

    fn deliver(&mut self, row: usize, count: u32) {
        let Some(project) = self.project.as_mut() else {
            return;
        };
        let item = project.craft.phases[project.phase].items[row].item_id;
        project.steps[row] += 1;
        let phase_done = project.phase_done();
        self.take(item, count);
        self.deliveries_confirmed += 1;
        if phase_done {
            self.delivery_open = false;
            self.menu = Some(self.station_menu());
        }
    }

    fn request_delivery(&mut self, args: &[CallbackArg]) {
        let (Some(CallbackArg::UInt(row)), Some(CallbackArg::UInt(count))) =
            (args.first(), args.get(1))
        else {
            return;
        };
        self.delivery_requests += 1;
        if self.drop_next_delivery {
            self.drop_next_delivery = false;
            return;
        }
        let row = *row as usize;
        if self.hq_warning_next {
            self.hq_warning_next = false;
            self.prompt = Some((
                "You are about to contribute a high-quality item. Continue?".into(),
                PromptKind::HighQuality { row, count: *count },
            ));
        } else {
            self.prompt = Some(self.delivery_prompt(row, *count));
        }
    }

    fn select_craft(&mut self, args: &[CallbackArg]) {
        let Some(CallbackArg::UInt(id)) = args.get(3) else {
            return;
        };
        let craft_id = CraftId(*id);
        if let Some(craft) = self.catalog.get(craft_id) {
            self.craft_log_open = false;
            self.prompt = Some((
                format!("Craft {}?", craft.name),
                PromptKind::ConfirmCraft(craft_id),
            ));
        }
    }

    fn purchase(&mut self, args: &[CallbackArg]) {
        if let Some(CallbackArg::UInt(quantity)) = args.get(1) {
            self.prompt = Some((
                format!("Purchase {quantity} tanks?"),
                PromptKind::Purchase {
                    quantity: *quantity,
                },
            ));
        }
    }
}

// ===========================================================================
// Ports
// ===========================================================================

pub type SharedWorld = Rc<RefCell<World>>;

#[derive(Debug, Clone)]
pub struct SimUi(pub SharedWorld);

impl UiSnapshotProvider for SimUi {
    fn is_ready(&self, panel: Panel) -> bool {
        let world = self.0.borrow();
        match panel {
            Panel::SelectString => world.menu.is_some(),
            Panel::SelectYesNo => world.prompt.is_some(),
            Panel::CraftLog => world.craft_log_open,
            Panel::MaterialDelivery => world.delivery_open,
            Panel::CreditShop => world.credit_shop.is_some(),
            Panel::GilShop => false,
        }
    }

    fn read_craft_snapshot(&self) -> Result<CraftSnapshot, ReadError> {
        let world = self.0.borrow();
        if !world.delivery_open {
            return Err(ReadError::NotReady(Panel::MaterialDelivery));
        }
        Ok(world.delivery_snapshot())
    }

    fn read_craft_log(&self) -> Result<CraftLogSnapshot, ReadError> {
        let world = self.0.borrow();
        if !world.craft_log_open {
            return Err(ReadError::NotReady(Panel::CraftLog));
        }
        Ok(CraftLogSnapshot {
            entries: world
                .catalog
                .crafts()
                .iter()
                .filter(|craft| world.unlocked.contains(&craft.craft_id))
                .map(|craft| CraftLogEntry {
                    craft_id: craft.craft_id,
                    name: craft.name.clone(),
                })
                .collect(),
        })
    }

    fn read_shop_snapshot(&self, panel: Panel) -> Result<ShopListing, ReadError> {
        let world = self.0.borrow();
        match (&world.credit_shop, panel) {
            (Some(shop), Panel::CreditShop) => Ok(ShopListing {
                currency: Some(shop.credits),
                items: vec![ShopSnapshot {
                    slot_position: 0,
                    item_id: shop.item_id,
                    name: "Ceruleum Tank".into(),
                    unit_price: shop.price,
                    owned_quantity: world.count(shop.item_id),
                }],
            }),
            _ => Err(ReadError::NotReady(panel)),
        }
    }

    fn read_selectable_text(&self, panel: Panel, index: usize) -> Option<String> {
        let world = self.0.borrow();
        match panel {
            Panel::SelectString => world.menu.as_ref()?.get(index).cloned(),
            Panel::SelectYesNo if index == 0 => world.prompt.as_ref().map(|(text, _)| text.clone()),
            _ => None,
        }
    }

    fn fire_choice(&mut self, panel: Panel, index: usize) {
        let mut world = self.0.borrow_mut();
        match panel {
            Panel::SelectString => world.choose_menu_entry(index),
            Panel::SelectYesNo => world.answer_prompt(index),
            _ => {}
        }
    }

    fn fire_callback(&mut self, panel: Panel, request_id: i32, args: &[CallbackArg]) {
        let mut world = self.0.borrow_mut();
        match (panel, request_id) {
            (Panel::MaterialDelivery, 0) => world.request_delivery(args),
            (Panel::CraftLog, 1) => world.select_craft(args),
            (Panel::CreditShop, 0) => world.purchase(args),
            _ => {}
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimActor(pub SharedWorld);

impl ActorEnvironment for SimActor {
    fn status(&self) -> ActorStatus {
        self.0.borrow().status.clone()
    }

    fn interact_with_station(&mut self) -> bool {
        let mut world = self.0.borrow_mut();
        world.interactions += 1;
        world.craft_log_open = false;
        world.delivery_open = false;
        world.menu = Some(world.station_menu());
        true
    }
}

#[derive(Debug, Clone)]
pub struct SimInventory(pub SharedWorld);

impl InventoryQuery for SimInventory {
    fn has_in_single_slot(&self, item: ItemId, count: u32) -> bool {
        self.0
            .borrow()
            .stacks
            .iter()
            .any(|(id, held)| *id == item && *held >= count)
    }

    fn count_total(&self, item: ItemId) -> u32 {
        self.0.borrow().count(item)
    }

    fn free_slot_count(&self) -> u32 {
        self.0.borrow().free_slots
    }

    fn max_batch_size_for(&self, item: ItemId) -> u32 {
        self.0
            .borrow()
            .max_batch
            .iter()
            .find(|(id, _)| *id == item)
            .map_or(0, |(_, batch)| *batch)
    }
}

// ===========================================================================
// Harness
// ===========================================================================

/// A workshop wired to the simulated station, with a manual clock.
pub struct Harness {
    pub world: SharedWorld,
    pub workshop: Workshop<MemoryStore>,
    ui: SimUi,
    actor: SimActor,
    inventory: SimInventory,
    pub now: Timestamp,
}

/// Milliseconds per simulated frame.
pub const FRAME_MS: u64 = 50;

impl Harness {
    pub fn new(world: World, workshop: Workshop<MemoryStore>) -> Self {
        let world = Rc::new(RefCell::new(world));
        Self {
            ui: SimUi(world.clone()),
            actor: SimActor(world.clone()),
            inventory: SimInventory(world.clone()),
            world,
            workshop,
            now: Timestamp::ZERO,
        }
    }

    pub fn inventory(&self) -> &SimInventory {
        &self.inventory
    }

    pub fn tick(&mut self) {
        self.now = self.now.after(FRAME_MS);
        self.workshop.tick(HostFrame {
            now: self.now,
            ui: &mut self.ui,
            inventory: &self.inventory,
            actor: &mut self.actor,
        });
    }

    /// Tick until `done` holds, at most `max_frames` frames. Returns whether
    /// it held.
    pub fn run_until(&mut self, max_frames: u32, mut done: impl FnMut(&Self) -> bool) -> bool {
        for _ in 0..max_frames {
            if done(self) {
                return true;
            }
            self.tick();
        }
        done(self)
    }
}

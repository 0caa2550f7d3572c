//! The [`Workshop`] facade and its command surface.

use std::path::Path;

use workshop_core::catalog::{CatalogError, WorkshopCatalog};
use workshop_core::controller::{StageController, TickContext};
use workshop_core::coordinator::ExternalAutomationCoordinator;
use workshop_core::event::AutomationEvent;
use workshop_core::host::{
    ActorEnvironment, ConfigStore, ExternalAutomation, InventoryQuery, UiSnapshotProvider,
};
use workshop_core::id::CraftId;
use workshop_core::settings::AutomationSettings;
use workshop_core::stage::Stage;
use workshop_core::state::{AutomationState, QueuedItem, StoreError, clamp_quantity};
use workshop_core::time::Timestamp;
use workshop_data::{
    ClipboardError, DataLoadError, WorkshopData, export_queue, import_queue, load_workshop_data,
};
use workshop_recipes::{RecipeBook, RecipeResolver, RequestedItem, ResolveError, ResolvedIngredient};
use workshop_shop::{
    CeruleumTankPlan, CeruleumTankShop, DARK_MATTER_CLUSTER, PurchaseError, PurchaseProtocol,
    RepairKitShop, ShopAdapter, missing_dark_matter,
};

use crate::status::{CurrentCraftStatus, QueueEntryStatus, WorkshopStatus};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("unknown workshop craft {0}")]
    UnknownCraft(CraftId),
    #[error("the automation must be stopped first")]
    NotStopped,
    #[error("an auto-buy is running")]
    AutoBuyActive,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("could not resolve materials: {0}")]
    Resolve(#[from] ResolveError),
    #[error("state store: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Data(#[from] DataLoadError),
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
    #[error(transparent)]
    Purchase(#[from] PurchaseError),
}

// ---------------------------------------------------------------------------
// Workshop
// ---------------------------------------------------------------------------

/// The host ports for one frame.
pub struct HostFrame<'a> {
    pub now: Timestamp,
    pub ui: &'a mut dyn UiSnapshotProvider,
    pub inventory: &'a dyn InventoryQuery,
    pub actor: &'a mut dyn ActorEnvironment,
}

#[derive(Debug)]
pub struct Workshop<S: ConfigStore> {
    catalog: WorkshopCatalog,
    recipes: RecipeBook,
    settings: AutomationSettings,
    state: AutomationState,
    controller: StageController,
    coordinator: ExternalAutomationCoordinator,
    store: S,
    ceruleum_tanks: PurchaseProtocol<CeruleumTankShop>,
    repair_kits: PurchaseProtocol<RepairKitShop>,
}

impl<S: ConfigStore> Workshop<S> {
    /// Build the facade and load the persisted state from `store`.
    ///
    /// Saved queue entries and progress for crafts missing from the catalog
    /// are dropped.
    pub fn new(data: WorkshopData, mut store: S) -> Result<Self, CommandError> {
        let WorkshopData {
            catalog,
            recipes,
            settings,
        } = data;

        let mut state = store.load()?.unwrap_or_default();
        state.queue.retain(|entry| {
            let known = catalog.get(entry.craft_id).is_some();
            if !known {
                tracing::warn!(craft = %entry.craft_id, "dropping unknown craft from saved queue");
            }
            known
        });
        if let Some(current) = &state.current_item {
            if catalog.get(current.craft_id).is_none() {
                tracing::warn!(craft = %current.craft_id, "dropping progress for unknown craft");
                state.current_item = None;
            }
        }

        tracing::info!(
            crafts = catalog.len(),
            queued = state.total_queued(),
            resuming = state.current_item.is_some(),
            "workshop ready"
        );

        Ok(Self {
            controller: StageController::new(settings.clone()),
            ceruleum_tanks: PurchaseProtocol::new(CeruleumTankShop, &settings),
            repair_kits: PurchaseProtocol::new(RepairKitShop, &settings),
            coordinator: ExternalAutomationCoordinator::new(),
            catalog,
            recipes,
            settings,
            state,
            store,
        })
    }

    /// Load the data directory, then [`Workshop::new`].
    pub fn load(dir: &Path, store: S) -> Result<Self, CommandError> {
        Self::new(load_workshop_data(dir)?, store)
    }

    /// Register an automation feature to suppress while running.
    pub fn with_automation(mut self, feature: Box<dyn ExternalAutomation>) -> Self {
        self.coordinator.add_feature(feature);
        self
    }

    pub fn catalog(&self) -> &WorkshopCatalog {
        &self.catalog
    }

    pub fn recipes(&self) -> &RecipeBook {
        &self.recipes
    }

    pub fn settings(&self) -> &AutomationSettings {
        &self.settings
    }

    pub fn state(&self) -> &AutomationState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn stage(&self) -> Stage {
        self.controller.stage()
    }

    pub fn coordinator(&self) -> &ExternalAutomationCoordinator {
        &self.coordinator
    }

    pub fn ceruleum_tanks(&self) -> &PurchaseProtocol<CeruleumTankShop> {
        &self.ceruleum_tanks
    }

    pub fn repair_kits(&self) -> &PurchaseProtocol<RepairKitShop> {
        &self.repair_kits
    }

    pub fn drain_events(&mut self) -> Vec<AutomationEvent> {
        self.controller.drain_events()
    }

    // -----------------------------------------------------------------------
    // Queue commands
    // -----------------------------------------------------------------------

    /// Add `quantity` units of a craft. An existing entry for the same craft
    /// is topped up; negative quantities count as zero.
    pub fn enqueue(&mut self, craft_id: CraftId, quantity: i64) -> Result<(), CommandError> {
        if self.catalog.get(craft_id).is_none() {
            return Err(CommandError::UnknownCraft(craft_id));
        }
        let quantity = clamp_quantity(quantity);
        match self
            .state
            .queue
            .iter_mut()
            .find(|entry| entry.craft_id == craft_id)
        {
            Some(entry) => entry.quantity = entry.quantity.saturating_add(quantity),
            None => self.state.queue.push(QueuedItem { craft_id, quantity }),
        }
        tracing::info!(craft = %craft_id, quantity, "queued");
        self.persist();
        Ok(())
    }

    /// Remove every queue entry for `craft_id`. Returns whether any existed.
    pub fn dequeue_remove(&mut self, craft_id: CraftId) -> bool {
        let before = self.state.queue.len();
        self.state.queue.retain(|entry| entry.craft_id != craft_id);
        let removed = self.state.queue.len() != before;
        if removed {
            tracing::info!(craft = %craft_id, "removed from queue");
            self.persist();
        }
        removed
    }

    /// Forget the in-progress craft.
    pub fn cancel_current(&mut self) -> Result<(), CommandError> {
        if self.controller.stage() != Stage::Stopped {
            return Err(CommandError::NotStopped);
        }
        if let Some(current) = self.state.current_item.take() {
            tracing::info!(craft = %current.craft_id, "cancelled current craft");
            self.persist();
        }
        Ok(())
    }

    pub fn export_queue(&self) -> Result<String, CommandError> {
        Ok(export_queue(&self.state.queue)?)
    }

    /// Append a clipboard queue. Returns the number of entries added.
    pub fn import_queue(&mut self, text: &str) -> Result<usize, CommandError> {
        let imported = import_queue(text, &self.catalog)?;
        let count = imported.len();
        self.state.queue.extend(imported);
        tracing::info!(entries = count, "imported queue");
        self.persist();
        Ok(count)
    }

    /// Expand everything the queue still needs into an ordered shopping and
    /// crafting list.
    pub fn resolve_queue_materials(&self) -> Result<Vec<ResolvedIngredient>, CommandError> {
        let requested: Vec<RequestedItem> = self
            .state
            .required_materials(&self.catalog)?
            .into_iter()
            .filter(|requirement| requirement.quantity > 0)
            .map(|requirement| RequestedItem {
                item_id: requirement.item_id,
                quantity: u64::from(requirement.quantity),
            })
            .collect();
        Ok(RecipeResolver::new(&self.recipes).resolve(&requested)?)
    }

    // -----------------------------------------------------------------------
    // Run control
    // -----------------------------------------------------------------------

    pub fn start(&mut self) -> Result<(), CommandError> {
        if self.auto_buy_active() {
            return Err(CommandError::AutoBuyActive);
        }
        self.controller.request_start();
        Ok(())
    }

    pub fn pause(&mut self) {
        self.controller.request_pause();
    }

    pub fn tick(&mut self, frame: HostFrame<'_>) {
        let HostFrame {
            now,
            ui,
            inventory,
            actor,
        } = frame;

        let mut ctx = TickContext {
            now,
            ui: &mut *ui,
            inventory,
            actor,
            coordinator: &mut self.coordinator,
            store: &mut self.store,
        };
        self.controller
            .tick(&mut self.state, &self.catalog, &mut ctx);

        // Shops only act while the workshop run is idle.
        if self.controller.stage() != Stage::Stopped || self.controller.has_pending_request() {
            return;
        }
        if self.settings.shops.enable_ceruleum_tanks {
            self.ceruleum_tanks
                .observe(now, &*ui, inventory, &mut self.coordinator);
            self.ceruleum_tanks
                .advance(now, &mut *ui, inventory, &mut self.coordinator);
        }
        if self.settings.shops.enable_repair_kits {
            self.repair_kits
                .observe(now, &*ui, inventory, &mut self.coordinator);
            self.repair_kits
                .advance(now, &mut *ui, inventory, &mut self.coordinator);
        }
    }

    // -----------------------------------------------------------------------
    // Auto-buy
    // -----------------------------------------------------------------------

    pub fn auto_buy_active(&self) -> bool {
        self.ceruleum_tanks.is_active() || self.repair_kits.is_active()
    }

    /// Buy `stacks` stacks of ceruleum tanks, optionally topping up the
    /// partial one. Returns the number of tanks to buy.
    pub fn buy_ceruleum_tanks(
        &mut self,
        stacks: i64,
        fill_partial_stack: bool,
        inventory: &dyn InventoryQuery,
    ) -> Result<u32, CommandError> {
        self.ensure_can_buy()?;
        let owned = self
            .ceruleum_tanks
            .item_for_sale()
            .ok_or(PurchaseError::NoItemForSale)?
            .owned_quantity;
        let plan = CeruleumTankPlan::new(stacks, fill_partial_stack, inventory.free_slot_count());
        let quantity = self.ceruleum_tanks.purchasable(plan.missing_items(owned));
        self.ceruleum_tanks
            .start_buying(quantity, &mut self.coordinator)?;
        Ok(quantity)
    }

    /// Buy enough grade 6 dark matter for every cluster held. Returns the
    /// number of units to buy.
    pub fn buy_repair_kits(&mut self, inventory: &dyn InventoryQuery) -> Result<u32, CommandError> {
        self.ensure_can_buy()?;
        let owned = self
            .repair_kits
            .item_for_sale()
            .ok_or(PurchaseError::NoItemForSale)?
            .owned_quantity;
        let clusters = inventory.count_total(DARK_MATTER_CLUSTER);
        let quantity = self
            .repair_kits
            .purchasable(missing_dark_matter(clusters, owned));
        self.repair_kits
            .start_buying(quantity, &mut self.coordinator)?;
        Ok(quantity)
    }

    pub fn cancel_auto_buy(&mut self) {
        self.ceruleum_tanks.cancel(&mut self.coordinator);
        self.repair_kits.cancel(&mut self.coordinator);
    }

    fn ensure_can_buy(&self) -> Result<(), CommandError> {
        if self.controller.stage() != Stage::Stopped || self.controller.has_pending_request() {
            return Err(CommandError::NotStopped);
        }
        if self.auto_buy_active() {
            return Err(CommandError::AutoBuyActive);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    pub fn status(&self) -> WorkshopStatus {
        let current_craft = self.state.current_item.as_ref().map(|current| {
            let craft = self.catalog.get(current.craft_id);
            CurrentCraftStatus {
                craft_id: current.craft_id,
                name: craft.map_or_else(|| current.craft_id.to_string(), |c| c.name.clone()),
                started_crafting: current.started_crafting,
                phases_complete: current.phases_complete,
                phase_count: craft.map_or(0, |c| c.phase_count()),
            }
        });
        let queue = self
            .state
            .queue
            .iter()
            .map(|entry| QueueEntryStatus {
                craft_id: entry.craft_id,
                name: self
                    .catalog
                    .get(entry.craft_id)
                    .map_or_else(|| entry.craft_id.to_string(), |c| c.name.clone()),
                quantity: entry.quantity,
            })
            .collect();
        let auto_buy = if self.ceruleum_tanks.is_active() {
            Some(self.ceruleum_tanks.adapter().label().to_string())
        } else if self.repair_kits.is_active() {
            Some(self.repair_kits.adapter().label().to_string())
        } else {
            None
        };

        WorkshopStatus {
            stage: self.controller.stage(),
            readiness: self.controller.readiness().clone(),
            current_craft,
            queue,
            auto_buy,
        }
    }

    fn persist(&mut self) {
        if let Err(err) = self.store.save(&self.state) {
            tracing::error!(error = %err, "failed to save workshop state");
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

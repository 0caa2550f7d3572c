//! The generic repeat-purchase protocol.
//!
//! A purchase is "active" while a [`PurchaseState`] exists. Each
//! [`PurchaseProtocol::advance`] call does at most one thing: answer the
//! purchase prompt, issue one batch, or finish. After a batch is issued the
//! protocol blocks until [`PurchaseProtocol::observe`] sees the owned
//! quantity change, then waits a short settle delay before the next batch.

use workshop_core::coordinator::ExternalAutomationCoordinator;
use workshop_core::host::{InventoryQuery, UiSnapshotProvider};
use workshop_core::id::ItemId;
use workshop_core::settings::{AutomationSettings, TextPattern, normalize_prompt};
use workshop_core::snapshot::{Panel, ReadError, ShopListing, ShopSnapshot};
use workshop_core::time::Timestamp;

// ---------------------------------------------------------------------------
// ShopAdapter
// ---------------------------------------------------------------------------

/// What one shop looks like to the protocol.
pub trait ShopAdapter: std::fmt::Debug {
    /// Human-readable name used in logs.
    fn label(&self) -> &str;

    fn panel(&self) -> Panel;

    /// The item this shop is used to buy.
    fn item_id(&self) -> ItemId;

    /// Whether the shop is worth offering at all.
    fn is_available(&self, inventory: &dyn InventoryQuery) -> bool {
        let _ = inventory;
        true
    }

    /// Currency the player can spend here.
    fn currency(&self, listing: &ShopListing, inventory: &dyn InventoryQuery) -> u32;

    fn price_of(&self, item: &ShopSnapshot) -> u32 {
        item.unit_price
    }

    /// Read the shop panel and pick out this shop's item.
    fn read_snapshot(
        &self,
        ui: &dyn UiSnapshotProvider,
        inventory: &dyn InventoryQuery,
    ) -> Result<Option<ShopObservation>, ReadError> {
        let listing = ui.read_shop_snapshot(self.panel())?;
        Ok(listing.find(self.item_id()).map(|item| ShopObservation {
            item: item.clone(),
            currency: self.currency(&listing, inventory),
        }))
    }

    fn issue_purchase(&self, ui: &mut dyn UiSnapshotProvider, slot_position: usize, quantity: u32);
}

/// The shop item together with the currency available for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopObservation {
    pub item: ShopSnapshot,
    pub currency: u32,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseState {
    pub desired_quantity: u32,
    pub observed_owned: u32,
    pub next_attempt_at: Timestamp,
    pub awaiting_confirmation: bool,
}

impl PurchaseState {
    pub fn remaining(&self) -> u32 {
        self.desired_quantity.saturating_sub(self.observed_owned)
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }
}

/// What a call to [`PurchaseProtocol::advance`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseStep {
    /// No purchase is active.
    Idle,
    /// The purchase prompt was answered.
    Confirmed,
    Issued { quantity: u32 },
    Waiting,
    /// The desired quantity is owned; the purchase ended.
    Completed,
    /// No room for another unit; the purchase was abandoned.
    StorageFull,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PurchaseError {
    #[error("an auto-buy is already running")]
    AlreadyActive,
    #[error("the shop does not offer the item")]
    NoItemForSale,
    #[error("already own the desired quantity")]
    NothingToBuy,
}

// ---------------------------------------------------------------------------
// PurchaseProtocol
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct PurchaseProtocol<A: ShopAdapter> {
    adapter: A,
    settle_delay_ms: u64,
    confirm_prompt: TextPattern,
    observation: Option<ShopObservation>,
    panel_open: bool,
    state: Option<PurchaseState>,
}

impl<A: ShopAdapter> PurchaseProtocol<A> {
    pub fn new(adapter: A, settings: &AutomationSettings) -> Self {
        Self {
            adapter,
            settle_delay_ms: settings.timings.shop_settle_ms,
            confirm_prompt: settings.prompts.confirm_purchase.clone(),
            observation: None,
            panel_open: false,
            state: None,
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn item_for_sale(&self) -> Option<&ShopSnapshot> {
        self.observation.as_ref().map(|observation| &observation.item)
    }

    pub fn currency(&self) -> u32 {
        self.observation.as_ref().map_or(0, |observation| observation.currency)
    }

    pub fn state(&self) -> Option<&PurchaseState> {
        self.state.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// How many units the available currency pays for.
    pub fn max_affordable(&self) -> u32 {
        match &self.observation {
            Some(observation) => match self.adapter.price_of(&observation.item) {
                0 => 0,
                price => observation.currency / price,
            },
            None => 0,
        }
    }

    /// Units to buy for `missing`, capped by what is affordable.
    pub fn purchasable(&self, missing: u32) -> u32 {
        self.max_affordable().min(missing)
    }

    /// Re-read the shop panel.
    ///
    /// A changed owned quantity unblocks the next batch after the settle
    /// delay. A panel that closes cancels an active purchase.
    pub fn observe(
        &mut self,
        now: Timestamp,
        ui: &dyn UiSnapshotProvider,
        inventory: &dyn InventoryQuery,
        coordinator: &mut ExternalAutomationCoordinator,
    ) {
        if !ui.is_ready(self.adapter.panel()) {
            if self.panel_open {
                tracing::debug!(shop = self.adapter.label(), "shop closed");
                if self.state.is_some() {
                    self.cancel(coordinator);
                }
            }
            self.panel_open = false;
            self.observation = None;
            return;
        }
        self.panel_open = true;

        if !self.adapter.is_available(inventory) {
            self.observation = None;
            return;
        }

        match self.adapter.read_snapshot(ui, inventory) {
            Ok(observation) => self.observation = observation,
            Err(ReadError::NotReady(_)) => return,
            Err(err) => {
                tracing::error!(shop = self.adapter.label(), error = %err, "unreadable shop panel");
                self.observation = None;
                return;
            }
        }

        if let (Some(observation), Some(state)) = (&self.observation, self.state.as_mut()) {
            let owned = observation.item.owned_quantity;
            if state.observed_owned != owned {
                state.observed_owned = owned;
                state.next_attempt_at = now.after(self.settle_delay_ms);
            }
        }
    }

    /// Buy until `desired_quantity` units are owned.
    pub fn start(
        &mut self,
        desired_quantity: u32,
        coordinator: &mut ExternalAutomationCoordinator,
    ) -> Result<(), PurchaseError> {
        if self.state.is_some() {
            return Err(PurchaseError::AlreadyActive);
        }
        let Some(observation) = &self.observation else {
            return Err(PurchaseError::NoItemForSale);
        };
        let owned = observation.item.owned_quantity;
        if desired_quantity <= owned {
            return Err(PurchaseError::NothingToBuy);
        }

        tracing::info!(
            shop = self.adapter.label(),
            item = %observation.item.name,
            owned,
            desired = desired_quantity,
            "starting auto-buy"
        );
        self.state = Some(PurchaseState {
            desired_quantity,
            observed_owned: owned,
            next_attempt_at: Timestamp::ZERO,
            awaiting_confirmation: false,
        });
        coordinator.suppress();
        Ok(())
    }

    /// Buy `quantity` more units than currently owned.
    pub fn start_buying(
        &mut self,
        quantity: u32,
        coordinator: &mut ExternalAutomationCoordinator,
    ) -> Result<(), PurchaseError> {
        let owned = self
            .item_for_sale()
            .ok_or(PurchaseError::NoItemForSale)?
            .owned_quantity;
        self.start(owned.saturating_add(quantity), coordinator)
    }

    pub fn advance(
        &mut self,
        now: Timestamp,
        ui: &mut dyn UiSnapshotProvider,
        inventory: &dyn InventoryQuery,
        coordinator: &mut ExternalAutomationCoordinator,
    ) -> PurchaseStep {
        let Some(state) = self.state.as_mut() else {
            return PurchaseStep::Idle;
        };

        if state.awaiting_confirmation && prompt_matches(ui, &self.confirm_prompt) {
            ui.fire_choice(Panel::SelectYesNo, 0);
            state.awaiting_confirmation = false;
            return PurchaseStep::Confirmed;
        }

        let max_batch = inventory.max_batch_size_for(self.adapter.item_id());
        if max_batch == 0 && inventory.free_slot_count() == 0 {
            tracing::warn!(shop = self.adapter.label(), "no free inventory slots, stopping auto-buy");
            self.stop(coordinator);
            return PurchaseStep::StorageFull;
        }

        let remaining = state.remaining();
        if remaining == 0 {
            tracing::info!(
                shop = self.adapter.label(),
                desired = state.desired_quantity,
                owned = state.observed_owned,
                "stopping auto-buy"
            );
            self.stop(coordinator);
            return PurchaseStep::Completed;
        }

        let Some(observation) = &self.observation else {
            return PurchaseStep::Waiting;
        };
        if !state.next_attempt_at.is_due(now) || !ui.is_ready(self.adapter.panel()) {
            return PurchaseStep::Waiting;
        }

        let batch = if max_batch == 0 {
            remaining
        } else {
            remaining.min(max_batch)
        };
        tracing::info!(shop = self.adapter.label(), item = %observation.item.name, batch, "buying");
        self.adapter
            .issue_purchase(ui, observation.item.slot_position, batch);
        state.next_attempt_at = Timestamp::NEVER;
        state.awaiting_confirmation = true;
        PurchaseStep::Issued { quantity: batch }
    }

    /// Abandon the purchase. Coordination is released only if a purchase
    /// was active.
    pub fn cancel(&mut self, coordinator: &mut ExternalAutomationCoordinator) {
        if self.state.is_some() {
            tracing::info!(shop = self.adapter.label(), "cancelling auto-buy");
            self.stop(coordinator);
        }
    }

    fn stop(&mut self, coordinator: &mut ExternalAutomationCoordinator) {
        self.state = None;
        coordinator.restore();
    }
}

fn prompt_matches(ui: &dyn UiSnapshotProvider, pattern: &TextPattern) -> bool {
    ui.is_ready(Panel::SelectYesNo)
        && ui
            .read_selectable_text(Panel::SelectYesNo, 0)
            .is_some_and(|text| pattern.matches(&normalize_prompt(&text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ceruleum::{CERULEUM_TANK, CeruleumTankShop};
    use workshop_core::snapshot::CallbackArg;
    use workshop_core::test_utils::*;

    fn tank_listing(owned: u32, credits: u32) -> ShopListing {
        ShopListing {
            currency: Some(credits),
            items: vec![
                ShopSnapshot {
                    slot_position: 0,
                    item_id: ItemId(10373),
                    name: "Magitek Repair Materials".into(),
                    unit_price: 250,
                    owned_quantity: 0,
                },
                ShopSnapshot {
                    slot_position: 1,
                    item_id: CERULEUM_TANK,
                    name: "Ceruleum Tank".into(),
                    unit_price: 100,
                    owned_quantity: owned,
                },
            ],
        }
    }

    struct Fixture {
        shop: PurchaseProtocol<CeruleumTankShop>,
        ui: ScriptedUi,
        inventory: FakeInventory,
        coordinator: ExternalAutomationCoordinator,
        feature: RecordingAutomation,
        now: Timestamp,
    }

    impl Fixture {
        fn new(owned: u32, credits: u32) -> Self {
            let feature = RecordingAutomation::installed(true);
            let mut ui = ScriptedUi::new();
            ui.set_shop(Panel::CreditShop, tank_listing(owned, credits));
            Self {
                shop: PurchaseProtocol::new(CeruleumTankShop, &AutomationSettings::default()),
                ui,
                inventory: FakeInventory::new().with_max_batch(CERULEUM_TANK, 999),
                coordinator: ExternalAutomationCoordinator::new().with_feature(Box::new(feature.clone())),
                feature,
                now: Timestamp::ZERO,
            }
        }

        fn observe(&mut self) {
            self.shop
                .observe(self.now, &self.ui, &self.inventory, &mut self.coordinator);
        }

        fn advance(&mut self) -> PurchaseStep {
            self.shop
                .advance(self.now, &mut self.ui, &self.inventory, &mut self.coordinator)
        }

        fn set_owned(&mut self, owned: u32) {
            self.ui.shop_mut(Panel::CreditShop).unwrap().items[1].owned_quantity = owned;
        }
    }

    // -----------------------------------------------------------------------
    // Observation and planning
    // -----------------------------------------------------------------------

    #[test]
    fn observe_picks_the_shop_item() {
        let mut fx = Fixture::new(12, 1_050);
        fx.observe();

        let item = fx.shop.item_for_sale().unwrap();
        assert_eq!(item.slot_position, 1);
        assert_eq!(item.owned_quantity, 12);
        assert_eq!(fx.shop.currency(), 1_050);
        assert_eq!(fx.shop.max_affordable(), 10);
        assert_eq!(fx.shop.purchasable(4), 4);
        assert_eq!(fx.shop.purchasable(40), 10);
    }

    #[test]
    fn item_leaving_listing_clears_observation() {
        let mut fx = Fixture::new(0, 100);
        fx.observe();
        assert!(fx.shop.item_for_sale().is_some());

        fx.ui.shop_mut(Panel::CreditShop).unwrap().items.clear();
        fx.observe();
        assert!(fx.shop.item_for_sale().is_none());
    }

    // -----------------------------------------------------------------------
    // start
    // -----------------------------------------------------------------------

    #[test]
    fn start_without_item_fails() {
        let mut fx = Fixture::new(0, 100);
        assert_eq!(
            fx.shop.start(10, &mut fx.coordinator),
            Err(PurchaseError::NoItemForSale)
        );
        assert!(fx.feature.is_enabled());
    }

    #[test]
    fn start_requires_something_to_buy() {
        let mut fx = Fixture::new(20, 100);
        fx.observe();
        assert_eq!(
            fx.shop.start(20, &mut fx.coordinator),
            Err(PurchaseError::NothingToBuy)
        );
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut fx = Fixture::new(0, 100);
        fx.observe();
        fx.shop.start_buying(5, &mut fx.coordinator).unwrap();
        assert_eq!(
            fx.shop.start_buying(5, &mut fx.coordinator),
            Err(PurchaseError::AlreadyActive)
        );
        assert_eq!(fx.shop.state().unwrap().desired_quantity, 5);
        assert!(!fx.feature.is_enabled());
    }

    // -----------------------------------------------------------------------
    // advance
    // -----------------------------------------------------------------------

    #[test]
    fn batches_are_capped_and_wait_for_observation() {
        let mut fx = Fixture::new(0, 1_000_000);
        fx.inventory.set_max_batch(CERULEUM_TANK, 999);
        fx.observe();
        fx.shop.start(1_500, &mut fx.coordinator).unwrap();

        assert_eq!(fx.advance(), PurchaseStep::Issued { quantity: 999 });
        assert_eq!(
            fx.ui.callbacks(Panel::CreditShop),
            vec![(0, vec![CallbackArg::UInt(1), CallbackArg::UInt(999)])]
        );
        assert_eq!(fx.shop.state().unwrap().next_attempt_at, Timestamp::NEVER);

        // Nothing observed yet: blocked.
        fx.now = fx.now.after(5_000);
        assert_eq!(fx.advance(), PurchaseStep::Waiting);

        fx.set_owned(999);
        fx.observe();
        assert_eq!(fx.shop.state().unwrap().next_attempt_at, fx.now.after(250));
        assert_eq!(fx.advance(), PurchaseStep::Waiting);

        fx.now = fx.now.after(250);
        assert_eq!(fx.advance(), PurchaseStep::Issued { quantity: 501 });

        fx.set_owned(1_500);
        fx.observe();
        assert_eq!(fx.advance(), PurchaseStep::Completed);
        assert!(!fx.shop.is_active());
        assert!(fx.feature.is_enabled());
    }

    #[test]
    fn unstacked_items_buy_everything_at_once() {
        let mut fx = Fixture::new(0, 10_000);
        fx.inventory.set_max_batch(CERULEUM_TANK, 0);
        fx.observe();
        fx.shop.start(30, &mut fx.coordinator).unwrap();
        assert_eq!(fx.advance(), PurchaseStep::Issued { quantity: 30 });
    }

    #[test]
    fn purchase_prompt_is_answered_while_awaiting() {
        let mut fx = Fixture::new(0, 10_000);
        fx.observe();
        fx.shop.start(10, &mut fx.coordinator).unwrap();
        fx.ui.show_prompt("Purchase 10 Ceruleum Tank?");

        // Not awaiting yet: the prompt is left alone and a batch is issued.
        assert_eq!(fx.advance(), PurchaseStep::Issued { quantity: 10 });
        assert_eq!(fx.advance(), PurchaseStep::Confirmed);
        assert_eq!(fx.ui.choices(Panel::SelectYesNo), vec![0]);
        assert!(!fx.shop.state().unwrap().awaiting_confirmation);
    }

    #[test]
    fn full_inventory_abandons_purchase() {
        let mut fx = Fixture::new(0, 10_000);
        fx.observe();
        fx.shop.start(10, &mut fx.coordinator).unwrap();
        fx.inventory.set_max_batch(CERULEUM_TANK, 0);
        fx.inventory.set_free_slots(0);

        assert_eq!(fx.advance(), PurchaseStep::StorageFull);
        assert!(!fx.shop.is_active());
        assert!(fx.feature.is_enabled());
        assert!(fx.ui.fired().is_empty());
    }

    #[test]
    fn closed_panel_blocks_purchase() {
        let mut fx = Fixture::new(0, 10_000);
        fx.observe();
        fx.shop.start(10, &mut fx.coordinator).unwrap();
        fx.ui.close(Panel::CreditShop);
        assert_eq!(fx.advance(), PurchaseStep::Waiting);
    }

    #[test]
    fn idle_protocol_does_nothing() {
        let mut fx = Fixture::new(0, 10_000);
        fx.observe();
        assert_eq!(fx.advance(), PurchaseStep::Idle);
    }

    // -----------------------------------------------------------------------
    // cancel
    // -----------------------------------------------------------------------

    #[test]
    fn closing_the_panel_cancels() {
        let mut fx = Fixture::new(0, 10_000);
        fx.observe();
        fx.shop.start(10, &mut fx.coordinator).unwrap();

        fx.ui.close(Panel::CreditShop);
        fx.observe();
        assert!(!fx.shop.is_active());
        assert!(fx.shop.item_for_sale().is_none());
        assert_eq!(fx.feature.enable_calls(), 1);
    }

    #[test]
    fn cancel_releases_coordination_once() {
        let mut fx = Fixture::new(0, 10_000);
        fx.observe();
        fx.shop.start(10, &mut fx.coordinator).unwrap();
        fx.advance();

        fx.shop.cancel(&mut fx.coordinator);
        fx.shop.cancel(&mut fx.coordinator);
        assert!(!fx.shop.is_active());
        assert_eq!(fx.feature.enable_calls(), 1);
    }

    #[test]
    fn cancel_when_idle_leaves_coordination_alone() {
        let mut fx = Fixture::new(0, 10_000);
        fx.coordinator.suppress();
        fx.shop.cancel(&mut fx.coordinator);
        assert!(fx.coordinator.is_suppressed());
    }
}

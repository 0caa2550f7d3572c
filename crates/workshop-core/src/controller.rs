//! The stage machine that drives one workshop craft after another.
//!
//! [`StageController::tick`] is called once per host frame. Each tick runs at
//! most one stage handler, and each handler performs at most one externally
//! observable action (a panel choice, a callback or a station interaction).
//! Waiting is expressed with a `not_before` deadline, never by blocking.

use crate::catalog::{WorkshopCatalog, WorkshopCraft};
use crate::contribution::{ConfirmOutcome, ContributeOutcome, ContributionEngine};
use crate::coordinator::ExternalAutomationCoordinator;
use crate::event::{AbortReason, AutomationEvent};
use crate::host::{ActorEnvironment, ConfigStore, InventoryQuery, UiSnapshotProvider};
use crate::settings::{AutomationSettings, PromptSettings, TextPattern, normalize_prompt};
use crate::snapshot::{CallbackArg, Panel, ReadError};
use crate::stage::{Readiness, Stage};
use crate::state::{AutomationState, CurrentItem};
use crate::time::Timestamp;

/// Upper bound on entries scanned in a list menu.
const MAX_MENU_ENTRIES: usize = 16;

/// Craft log callback that selects a craft type and category tab.
const CRAFT_LOG_SELECT_CATEGORY: i32 = 2;
/// Craft log callback that selects a craft.
const CRAFT_LOG_SELECT_CRAFT: i32 = 1;

// ---------------------------------------------------------------------------
// TickContext
// ---------------------------------------------------------------------------

/// Everything a tick may observe or act on, borrowed for one tick.
pub struct TickContext<'a> {
    pub now: Timestamp,
    pub ui: &'a mut dyn UiSnapshotProvider,
    pub inventory: &'a dyn InventoryQuery,
    pub actor: &'a mut dyn ActorEnvironment,
    pub coordinator: &'a mut ExternalAutomationCoordinator,
    pub store: &'a mut dyn ConfigStore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UserRequest {
    Start,
    Pause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BranchChoice {
    Contribute,
    AdvancePhase,
    Collect,
}

impl BranchChoice {
    fn classify(text: &str, prompts: &PromptSettings) -> Option<Self> {
        if prompts.contribute.matches(text) {
            Some(BranchChoice::Contribute)
        } else if prompts.advance_phase.matches(text) || prompts.complete_construction.matches(text) {
            Some(BranchChoice::AdvancePhase)
        } else if prompts.collect_product.matches(text) {
            Some(BranchChoice::Collect)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// StageController
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct StageController {
    settings: AutomationSettings,
    stage: Stage,
    not_before: Timestamp,
    readiness: Readiness,
    request: Option<UserRequest>,
    contribution: ContributionEngine,
    delivery_deadline: Timestamp,
    branch_deadline: Timestamp,
    events: Vec<AutomationEvent>,
}

impl StageController {
    pub fn new(settings: AutomationSettings) -> Self {
        Self {
            settings,
            stage: Stage::Stopped,
            not_before: Timestamp::ZERO,
            readiness: Readiness::Ready,
            request: None,
            contribution: ContributionEngine::new(),
            delivery_deadline: Timestamp::NEVER,
            branch_deadline: Timestamp::NEVER,
            events: Vec::new(),
        }
    }

    pub fn settings(&self) -> &AutomationSettings {
        &self.settings
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Result of the last precondition check.
    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    pub fn not_before(&self) -> Timestamp {
        self.not_before
    }

    /// Ask the controller to start on its next tick.
    pub fn request_start(&mut self) {
        self.request = Some(UserRequest::Start);
    }

    /// Ask the controller to stop on its next tick.
    pub fn request_pause(&mut self) {
        self.request = Some(UserRequest::Pause);
    }

    pub fn has_pending_request(&self) -> bool {
        self.request.is_some()
    }

    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<AutomationEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advance the state machine by one tick.
    pub fn tick(
        &mut self,
        state: &mut AutomationState,
        catalog: &WorkshopCatalog,
        ctx: &mut TickContext<'_>,
    ) {
        // User requests are honoured ahead of gating and stage deadlines.
        if let Some(request) = self.request.take() {
            if self.handle_request(request, state, ctx) {
                return;
            }
        }

        match self.stage {
            Stage::Stopped => {
                self.readiness = Readiness::for_start(&ctx.actor.status(), &self.settings.station);
                return;
            }
            Stage::RequestStop => {
                self.finish_run(ctx);
                return;
            }
            _ => {}
        }

        self.readiness = Readiness::for_tick(&ctx.actor.status(), &self.settings.station);
        if let Readiness::NotReady(reason) = &self.readiness {
            tracing::trace!(stage = %self.stage, %reason, "waiting for the actor");
            return;
        }

        if !self.not_before.is_due(ctx.now) {
            return;
        }

        match self.stage {
            Stage::Dequeue => self.dequeue(state, catalog, ctx),
            Stage::TravelToStation => self.travel_to_station(state, ctx),
            Stage::OpenLog => self.open_log(ctx),
            Stage::PickCategory => self.pick_category(state, catalog, ctx),
            Stage::PickCraft => self.pick_craft(state, catalog, ctx),
            Stage::ConfirmCraft => self.confirm_craft(state, ctx),
            Stage::Branch => self.branch(state, catalog, ctx),
            Stage::ContributeMaterials => self.contribute_materials(ctx),
            Stage::ConfirmDelivery => self.confirm_delivery(state, ctx),
            Stage::ConfirmCollect => self.confirm_collect(state, ctx),
            Stage::RequestStop | Stage::Stopped => {}
        }
    }

    // -----------------------------------------------------------------------
    // Requests and transitions
    // -----------------------------------------------------------------------

    /// Returns whether the request consumed the tick.
    fn handle_request(
        &mut self,
        request: UserRequest,
        state: &AutomationState,
        ctx: &mut TickContext<'_>,
    ) -> bool {
        match request {
            UserRequest::Start if self.stage == Stage::Stopped => {
                self.readiness = Readiness::for_start(&ctx.actor.status(), &self.settings.station);
                if let Readiness::NotReady(reason) = &self.readiness {
                    tracing::warn!(%reason, "cannot start crafting");
                    return true;
                }
                if !state.has_work() {
                    tracing::info!("nothing queued, not starting");
                    return true;
                }
                ctx.coordinator.suppress();
                self.transition(Stage::Dequeue, ctx.now, 0);
                true
            }
            UserRequest::Start if self.stage == Stage::RequestStop => {
                // Kept until the stop completes.
                self.request = Some(UserRequest::Start);
                false
            }
            UserRequest::Pause if self.stage.is_active() => {
                tracing::info!(stage = %self.stage, "pausing");
                self.contribution.reset();
                self.transition(Stage::RequestStop, ctx.now, 0);
                true
            }
            _ => false,
        }
    }

    fn transition(&mut self, to: Stage, now: Timestamp, delay_ms: u64) {
        if self.stage != to {
            tracing::info!(from = %self.stage, to = %to, "changing stage");
            self.events.push(AutomationEvent::StageChanged {
                from: self.stage,
                to,
                at: now,
            });
            self.stage = to;
        }
        self.not_before = now.after(delay_ms);
    }

    fn enter_branch(&mut self, now: Timestamp, delay_ms: u64) {
        self.transition(Stage::Branch, now, delay_ms);
        self.branch_deadline = now.after(delay_ms + self.settings.timings.branch_watchdog_ms);
    }

    fn finish_run(&mut self, ctx: &mut TickContext<'_>) {
        ctx.coordinator.restore();
        self.contribution.reset();
        self.delivery_deadline = Timestamp::NEVER;
        self.branch_deadline = Timestamp::NEVER;
        self.transition(Stage::Stopped, ctx.now, 0);
    }

    fn abort(&mut self, reason: AbortReason, now: Timestamp) {
        tracing::error!(?reason, stage = %self.stage, "stopping crafting");
        self.events.push(AutomationEvent::RunAborted { reason, at: now });
        self.contribution.reset();
        self.transition(Stage::RequestStop, now, 0);
    }

    /// Log a failed panel read. The stage is retried on the next tick.
    fn defer(&self, err: ReadError) {
        match err {
            ReadError::NotReady(panel) => tracing::trace!(%panel, "panel not ready"),
            ReadError::ShapeMismatch {
                panel,
                expected,
                observed,
            } => tracing::error!(%panel, expected, observed, "unexpected panel layout"),
        }
    }

    fn current_craft<'c>(
        &mut self,
        state: &AutomationState,
        catalog: &'c WorkshopCatalog,
        now: Timestamp,
    ) -> Option<&'c WorkshopCraft> {
        let Some(current) = &state.current_item else {
            self.transition(Stage::Dequeue, now, 0);
            return None;
        };
        let craft = catalog.get(current.craft_id);
        if craft.is_none() {
            self.abort(AbortReason::UnknownCraft(current.craft_id), now);
        }
        craft
    }

    // -----------------------------------------------------------------------
    // Stage handlers
    // -----------------------------------------------------------------------

    fn dequeue(
        &mut self,
        state: &mut AutomationState,
        catalog: &WorkshopCatalog,
        ctx: &mut TickContext<'_>,
    ) {
        if let Some(current) = &state.current_item {
            tracing::info!(craft = %current.craft_id, "continuing current craft");
            self.transition(Stage::TravelToStation, ctx.now, 0);
            return;
        }

        let Some(index) = state.next_queued_index() else {
            tracing::info!("queue finished");
            self.finish_run(ctx);
            return;
        };

        let craft_id = state.queue[index].craft_id;
        let Some(craft) = catalog.get(craft_id) else {
            self.abort(AbortReason::UnknownCraft(craft_id), ctx.now);
            return;
        };

        state.take_from_queue(index);
        state.current_item = Some(CurrentItem::new(craft_id));
        persist(state, ctx.store);

        tracing::info!(craft = %craft_id, name = %craft.name, "starting craft");
        self.events.push(AutomationEvent::CraftStarted {
            craft_id,
            at: ctx.now,
        });
        self.transition(Stage::TravelToStation, ctx.now, 0);
    }

    fn travel_to_station(&mut self, state: &AutomationState, ctx: &mut TickContext<'_>) {
        let Some(current) = &state.current_item else {
            self.transition(Stage::Dequeue, ctx.now, 0);
            return;
        };

        if !ctx.actor.interact_with_station() {
            tracing::trace!("station interaction not issued");
            return;
        }

        if current.started_crafting {
            self.enter_branch(ctx.now, 0);
        } else {
            self.transition(Stage::OpenLog, ctx.now, 0);
        }
    }

    fn open_log(&mut self, ctx: &mut TickContext<'_>) {
        if ctx.ui.is_ready(Panel::CraftLog) {
            self.transition(Stage::PickCategory, ctx.now, 0);
            return;
        }

        let Some(index) = find_menu_entry(ctx.ui, &self.settings.prompts.open_log) else {
            return;
        };
        ctx.ui.fire_choice(Panel::SelectString, index);
        self.transition(Stage::PickCategory, ctx.now, self.settings.timings.log_navigation_ms);
    }

    fn pick_category(
        &mut self,
        state: &AutomationState,
        catalog: &WorkshopCatalog,
        ctx: &mut TickContext<'_>,
    ) {
        let Some(craft) = self.current_craft(state, catalog, ctx.now) else {
            return;
        };
        if !ctx.ui.is_ready(Panel::CraftLog) {
            tracing::trace!("waiting for the craft log");
            return;
        }

        tracing::info!(craft_type = craft.craft_type, category = craft.category, "selecting category");
        ctx.ui.fire_callback(
            Panel::CraftLog,
            CRAFT_LOG_SELECT_CATEGORY,
            &[
                CallbackArg::Int(0),
                CallbackArg::UInt(craft.craft_type),
                CallbackArg::UInt(u32::from(craft.category)),
            ],
        );
        self.transition(Stage::PickCraft, ctx.now, self.settings.timings.log_navigation_ms);
    }

    fn pick_craft(
        &mut self,
        state: &AutomationState,
        catalog: &WorkshopCatalog,
        ctx: &mut TickContext<'_>,
    ) {
        let Some(craft) = self.current_craft(state, catalog, ctx.now) else {
            return;
        };

        match ctx.ui.read_craft_log() {
            Ok(log) if log.contains(craft.craft_id) => {
                tracing::info!(craft = %craft.craft_id, name = %craft.name, "selecting craft");
                ctx.ui.fire_callback(
                    Panel::CraftLog,
                    CRAFT_LOG_SELECT_CRAFT,
                    &[
                        CallbackArg::Int(0),
                        CallbackArg::Int(0),
                        CallbackArg::Int(0),
                        CallbackArg::UInt(craft.craft_id.0),
                        CallbackArg::Int(0),
                        CallbackArg::Int(0),
                        CallbackArg::Int(0),
                    ],
                );
                self.transition(Stage::ConfirmCraft, ctx.now, self.settings.timings.log_navigation_ms);
            }
            Ok(_) => {
                tracing::error!(name = %craft.name, "craft is not listed in the craft log, is it unlocked?");
                self.abort(AbortReason::CraftNotUnlocked(craft.craft_id), ctx.now);
            }
            Err(err) => self.defer(err),
        }
    }

    fn confirm_craft(&mut self, state: &mut AutomationState, ctx: &mut TickContext<'_>) {
        if !answer_prompt(ctx.ui, &self.settings.prompts.confirm_craft) {
            return;
        }
        if let Some(current) = state.current_item.as_mut() {
            current.started_crafting = true;
        }
        persist(state, ctx.store);
        self.enter_branch(ctx.now, 0);
    }

    fn branch(
        &mut self,
        state: &mut AutomationState,
        catalog: &WorkshopCatalog,
        ctx: &mut TickContext<'_>,
    ) {
        let choice = first_menu_entry(ctx.ui)
            .and_then(|text| BranchChoice::classify(&text, &self.settings.prompts));
        let timings = &self.settings.timings;

        match choice {
            Some(BranchChoice::Contribute) => {
                let delay = timings.contribute_delay_ms;
                ctx.ui.fire_choice(Panel::SelectString, 0);
                self.transition(Stage::ContributeMaterials, ctx.now, delay);
            }
            Some(BranchChoice::AdvancePhase) => {
                let delay = timings.advance_delay_ms;
                ctx.ui.fire_choice(Panel::SelectString, 0);
                if let Some(current) = state.current_item.as_mut() {
                    let phase_count = catalog
                        .get(current.craft_id)
                        .map_or(usize::MAX, WorkshopCraft::phase_count);
                    current.advance_phase(phase_count);
                    tracing::info!(craft = %current.craft_id, phases_complete = current.phases_complete, "advancing phase");
                    self.events.push(AutomationEvent::PhaseAdvanced {
                        craft_id: current.craft_id,
                        phases_complete: current.phases_complete,
                        at: ctx.now,
                    });
                }
                persist(state, ctx.store);
                self.transition(Stage::TravelToStation, ctx.now, delay);
            }
            Some(BranchChoice::Collect) => {
                let delay = timings.collect_delay_ms;
                ctx.ui.fire_choice(Panel::SelectString, 0);
                self.transition(Stage::ConfirmCollect, ctx.now, delay);
            }
            None if self.branch_deadline.is_due(ctx.now) => {
                tracing::warn!("no usable station menu, interacting again");
                self.transition(Stage::TravelToStation, ctx.now, 0);
            }
            None => {}
        }
    }

    fn contribute_materials(&mut self, ctx: &mut TickContext<'_>) {
        let snapshot = match ctx.ui.read_craft_snapshot() {
            Ok(snapshot) if snapshot.is_loaded() => snapshot,
            Ok(_) => {
                tracing::warn!("delivery panel has no craft loaded");
                self.not_before = ctx.now.after(self.settings.timings.read_retry_ms);
                return;
            }
            Err(err) => {
                self.defer(err);
                return;
            }
        };

        match self.contribution.contribute(&snapshot, ctx.inventory, ctx.ui) {
            ContributeOutcome::Issued(pending) => {
                tracing::info!(item = %pending.item_id, name = %pending.name, count = pending.count, "contributing");
                self.events.push(AutomationEvent::DeliveryIssued {
                    item_id: pending.item_id,
                    quantity: pending.count,
                    at: ctx.now,
                });
                let delay = self.settings.timings.delivery_delay_ms;
                self.delivery_deadline = ctx
                    .now
                    .after(delay + self.settings.timings.confirmation_watchdog_ms);
                self.transition(Stage::ConfirmDelivery, ctx.now, delay);
            }
            ContributeOutcome::PhaseComplete => {
                tracing::info!("all materials for this phase are delivered");
                self.enter_branch(ctx.now, 0);
            }
            ContributeOutcome::Shortfall {
                item_id,
                name,
                needed,
            } => {
                tracing::error!(item = %item_id, %name, needed, "not enough materials in a single stack");
                self.abort(
                    AbortReason::MaterialShortfall {
                        item_id,
                        name,
                        needed,
                    },
                    ctx.now,
                );
            }
        }
    }

    fn confirm_delivery(&mut self, state: &mut AutomationState, ctx: &mut TickContext<'_>) {
        let timed_out = self.delivery_deadline.is_due(ctx.now);
        let mut snapshot = match ctx.ui.read_craft_snapshot() {
            Ok(snapshot) => snapshot,
            Err(err) if timed_out => {
                tracing::debug!(error = %err, "delivery panel unreadable at timeout");
                self.delivery_timed_out(ctx.now);
                return;
            }
            Err(err) => {
                self.defer(err);
                return;
            }
        };

        let prompt = read_prompt(ctx.ui);
        match self.contribution.confirm(
            &mut snapshot,
            prompt.as_deref(),
            &self.settings.prompts,
            ctx.ui,
            timed_out,
        ) {
            ConfirmOutcome::HighQualityWarning => {
                tracing::info!("accepting high-quality warning");
                let delay = self.settings.timings.delivery_delay_ms;
                self.delivery_deadline = ctx
                    .now
                    .after(delay + self.settings.timings.confirmation_watchdog_ms);
                self.transition(Stage::ConfirmDelivery, ctx.now, delay);
            }
            ConfirmOutcome::Confirmed {
                item_id,
                quantity,
                phase_complete,
            } => {
                if let Some(current) = state.current_item.as_mut() {
                    current.record_contribution(item_id, quantity);
                }
                persist(state, ctx.store);
                self.events.push(AutomationEvent::ContributionConfirmed {
                    item_id,
                    quantity,
                    phase_complete,
                    at: ctx.now,
                });
                self.delivery_deadline = Timestamp::NEVER;
                if phase_complete {
                    self.enter_branch(ctx.now, self.settings.timings.phase_complete_delay_ms);
                } else {
                    self.transition(
                        Stage::ContributeMaterials,
                        ctx.now,
                        self.settings.timings.confirm_to_contribute_ms,
                    );
                }
            }
            ConfirmOutcome::Waiting => {}
            ConfirmOutcome::TimedOut => self.delivery_timed_out(ctx.now),
        }
    }

    fn delivery_timed_out(&mut self, now: Timestamp) {
        let item_id = self.contribution.pending().map(|pending| pending.item_id);
        self.contribution.reset();
        tracing::warn!(item = ?item_id, "no delivery confirmation, contributing again");
        self.events.push(AutomationEvent::ConfirmationTimedOut { item_id, at: now });
        self.delivery_deadline = Timestamp::NEVER;
        self.transition(Stage::ContributeMaterials, now, 0);
    }

    fn confirm_collect(&mut self, state: &mut AutomationState, ctx: &mut TickContext<'_>) {
        if !answer_prompt(ctx.ui, &self.settings.prompts.retrieve_product) {
            return;
        }
        if let Some(current) = state.current_item.take() {
            tracing::info!(craft = %current.craft_id, "craft collected");
            self.events.push(AutomationEvent::CraftCollected {
                craft_id: current.craft_id,
                at: ctx.now,
            });
        }
        persist(state, ctx.store);
        self.transition(Stage::Dequeue, ctx.now, self.settings.timings.collect_delay_ms);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn persist(state: &AutomationState, store: &mut dyn ConfigStore) {
    if let Err(err) = store.save(state) {
        tracing::error!(error = %err, "failed to save automation state");
    }
}

/// Normalized text of the open yes/no prompt.
fn read_prompt(ui: &dyn UiSnapshotProvider) -> Option<String> {
    if !ui.is_ready(Panel::SelectYesNo) {
        return None;
    }
    ui.read_selectable_text(Panel::SelectYesNo, 0)
        .map(|text| normalize_prompt(&text))
}

/// Answer "yes" when the open prompt matches. Returns whether it did.
fn answer_prompt(ui: &mut dyn UiSnapshotProvider, pattern: &TextPattern) -> bool {
    match read_prompt(ui) {
        Some(text) if pattern.matches(&text) => {
            tracing::info!(prompt = %text, "confirming");
            ui.fire_choice(Panel::SelectYesNo, 0);
            true
        }
        Some(text) => {
            tracing::trace!(prompt = %text, "ignoring prompt");
            false
        }
        None => false,
    }
}

fn first_menu_entry(ui: &dyn UiSnapshotProvider) -> Option<String> {
    if !ui.is_ready(Panel::SelectString) {
        return None;
    }
    ui.read_selectable_text(Panel::SelectString, 0)
        .map(|text| normalize_prompt(&text))
}

fn find_menu_entry(ui: &dyn UiSnapshotProvider, pattern: &TextPattern) -> Option<usize> {
    if !ui.is_ready(Panel::SelectString) {
        return None;
    }
    (0..MAX_MENU_ENTRIES)
        .map_while(|index| ui.read_selectable_text(Panel::SelectString, index).map(|text| (index, text)))
        .find(|(_, text)| pattern.matches(&normalize_prompt(text)))
        .map(|(index, _)| index)
}

// ===========================================================================
// Tests
// ===========================================================================

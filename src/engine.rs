use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::aggregator::{self, CategoryCounter};
use crate::config::Config;
use crate::geometry::{LayoutProbe, TooltipPositioner, TooltipState, ViewportTransform};
use crate::gesture::{GestureContext, GestureController, GestureEvent, GestureOutput, GestureState};
use crate::models::{Category, Inventory, Ticket, ToggleIntent};
use crate::overlay::{CounterView, OverlayFrame, TooltipContent, TooltipView};
use crate::registry::{self, SeatRegistry};
use crate::scheme::{self, FitRequest, SceneGraph};
use crate::services::expiry::ExpirySweeper;

/// Один экземпляр движка на одну поверхность схемы.
///
/// Все операции выполняются до конца за один вызов; внешний цикл событий
/// подаёт жесты и списки билетов строго по очереди.
pub struct SeatMapEngine {
    config: Config,
    categories: Vec<Category>,
    scene: SceneGraph,
    inventory: Inventory,
    registry: SeatRegistry,
    gesture: GestureController,
    tooltip: TooltipPositioner,
    sweeper: ExpirySweeper,
    highlight: Option<String>,
}

impl SeatMapEngine {
    pub fn new(config: Config, categories: Vec<Category>) -> Self {
        let surface = format!("event-{}", config.source.event_id);
        Self {
            gesture: GestureController::new(config.gesture.clone(), &surface),
            tooltip: TooltipPositioner::new(config.tooltip.clone()),
            config,
            categories,
            scene: SceneGraph::empty(),
            inventory: Inventory::default(),
            registry: SeatRegistry::default(),
            sweeper: ExpirySweeper::new(),
            highlight: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn registry(&self) -> &SeatRegistry {
        &self.registry
    }

    pub fn tooltip_state(&self) -> &TooltipState {
        self.tooltip.state()
    }

    pub fn gesture_state(&self) -> &GestureState {
        self.gesture.state()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.gesture.next_deadline()
    }

    /// Новая разметка полностью заменяет сцену; привязка и подсветка пересчитываются.
    pub fn load_scheme(&mut self, markup: &str, request: &FitRequest) {
        self.scene = scheme::normalize(markup, &self.categories, request);
        self.rebind();
        self.apply_highlight();
        self.gesture.reset();
        self.tooltip = TooltipPositioner::new(self.config.tooltip.clone());
    }

    /// Авторитетный список билетов: полная перепривязка до следующего жеста.
    pub fn update_tickets(
        &mut self,
        tickets: Vec<Ticket>,
        layout: &dyn LayoutProbe,
        viewport: &dyn ViewportTransform,
    ) {
        self.inventory = Inventory::new(tickets);
        self.refresh(layout, viewport);
    }

    pub fn handle_gesture(
        &mut self,
        event: GestureEvent,
        now: Instant,
        layout: &dyn LayoutProbe,
        viewport: &dyn ViewportTransform,
    ) -> Vec<ToggleIntent> {
        let ctx = GestureContext { registry: &self.registry, inventory: &self.inventory };
        let outputs = self.gesture.handle(event, ctx, now);
        self.dispatch(outputs, layout, viewport)
    }

    pub fn tick(&mut self, now: Instant, layout: &dyn LayoutProbe, viewport: &dyn ViewportTransform) {
        let outputs = self.gesture.tick(now);
        self.dispatch(outputs, layout, viewport);
    }

    pub fn set_desired_count(&self, category: &str, desired: usize) -> Vec<ToggleIntent> {
        aggregator::set_desired_count(&self.inventory, category, desired)
    }

    /// Оптимистично применить отправленные намерения к локальной копии.
    pub fn apply_local(
        &mut self,
        intents: &[ToggleIntent],
        now: DateTime<Utc>,
        layout: &dyn LayoutProbe,
        viewport: &dyn ViewportTransform,
    ) {
        let hold = self.config.booking.hold();
        let mut changed = 0;
        for intent in intents {
            if self.inventory.apply_optimistic(intent, now, hold) {
                changed += 1;
            }
        }
        if changed > 0 {
            debug!("Applied {} intents to local inventory", changed);
            self.refresh(layout, viewport);
        }
    }

    /// Намерения для билетов с истёкшей бронью.
    pub fn release_expired(&self, now: DateTime<Utc>) -> Vec<ToggleIntent> {
        self.sweeper.sweep(&self.inventory, now)
    }

    pub fn set_highlight(&mut self, category: Option<String>) {
        if self.highlight != category {
            self.highlight = category;
            self.apply_highlight();
        }
    }

    pub fn counters(&self) -> Vec<CategoryCounter> {
        aggregator::counters(&self.scene, &self.registry, &self.inventory)
    }

    /// Снимок для слоя представления.
    pub fn frame(&self) -> OverlayFrame {
        let state = self.tooltip.state();
        let tooltip = state
            .node
            .filter(|_| state.visible)
            .and_then(|node| self.scene.node(node))
            .map(|seat| {
                let ticket = state.ticket_id.as_ref().and_then(|id| self.inventory.get(id));
                let content = TooltipContent::build(
                    seat,
                    ticket,
                    &self.categories,
                    &self.config.display.currency,
                    self.gesture.last_input(),
                );
                TooltipView::new(state, content)
            });

        OverlayFrame {
            tooltip,
            counters: self.counters().iter().filter_map(CounterView::from_counter).collect(),
            booking_limit: self.inventory.booking_limit(),
            highlight: self.highlight.clone(),
        }
    }

    pub fn to_svg(&self) -> String {
        self.scene.to_svg()
    }

    pub fn teardown(&mut self) {
        self.gesture.teardown();
        info!("Seat map engine torn down");
    }

    fn rebind(&mut self) {
        let (registry, patches) = SeatRegistry::bind(&self.scene, &self.inventory);
        registry::apply_patches(&mut self.scene, &patches);
        self.registry = registry;
    }

    fn refresh(&mut self, layout: &dyn LayoutProbe, viewport: &dyn ViewportTransform) {
        self.rebind();
        let ctx = GestureContext { registry: &self.registry, inventory: &self.inventory };
        let outputs = self.gesture.on_rebind(ctx);
        self.dispatch(outputs, layout, viewport);

        if let Some((_, ticket)) = self.gesture.state().open_seat() {
            self.tooltip.refresh(Some(ticket.clone()), layout, viewport);
        }
    }

    fn apply_highlight(&mut self) {
        let patches = registry::highlight(&self.scene, self.highlight.as_deref());
        registry::apply_highlight(&mut self.scene, &patches);
    }

    fn dispatch(
        &mut self,
        outputs: Vec<GestureOutput>,
        layout: &dyn LayoutProbe,
        viewport: &dyn ViewportTransform,
    ) -> Vec<ToggleIntent> {
        let mut intents = Vec::new();
        for output in outputs {
            match output {
                GestureOutput::Tooltip(command) => self.tooltip.apply(&command, layout, viewport),
                GestureOutput::Toggle(intent) => intents.push(intent),
            }
        }
        intents
    }
}

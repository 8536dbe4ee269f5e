//! gesture
//!
//! Контроллер жестов: мышь (hover/click) и одиночный тап сведены в один поток намерений.
//!
//! Контроллер - чистый автомат состояний. Время передаётся явно (`now`),
//! таймер скрытия живёт внутри состояния `PendingHide`, поэтому один экземпляр
//! таймера и его сброс при любом переходе гарантируются типом. Драйвер событий
//! спрашивает `next_deadline()` и вызывает `tick()` по истечении.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, debug_span, info, Span};

use crate::aggregator;
use crate::config::GestureConfig;
use crate::models::{Inventory, TicketId, ToggleIntent};
use crate::registry::{SeatKind, SeatRegistry};
use crate::scheme::NodeId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    #[default]
    Pointer,
    Touch,
}

/// Событие от хоста. Для мыши `Tap` - это клик.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GestureEvent {
    Enter {
        node: NodeId,
        #[serde(default)]
        input: InputKind,
    },
    Leave {
        node: NodeId,
        #[serde(default)]
        input: InputKind,
    },
    Tap {
        #[serde(default)]
        target: Option<NodeId>,
        #[serde(default)]
        input: InputKind,
    },
    /// Кнопка "выбрать" внутри тултипа.
    TooltipSelect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    Hovering { node: NodeId },
    TooltipOpen { node: NodeId, ticket: TicketId },
    PendingHide { node: NodeId, ticket: TicketId, deadline: Instant, delay: Duration },
}

impl GestureState {
    fn name(&self) -> &'static str {
        match self {
            GestureState::Idle => "idle",
            GestureState::Hovering { .. } => "hovering",
            GestureState::TooltipOpen { .. } => "open",
            GestureState::PendingHide { .. } => "pending_hide",
        }
    }

    /// Место и билет открытого (или ещё не скрытого) тултипа.
    pub fn open_seat(&self) -> Option<(NodeId, &TicketId)> {
        match self {
            GestureState::TooltipOpen { node, ticket } | GestureState::PendingHide { node, ticket, .. } => {
                Some((*node, ticket))
            }
            _ => None,
        }
    }
}

/// Команды позиционеру тултипа.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TooltipCommand {
    Show { node: NodeId, ticket_id: Option<TicketId> },
    /// Тултип виден, но будет скрыт через `delay`.
    ArmHide { delay: Duration },
    Hide { delay: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureOutput {
    Tooltip(TooltipCommand),
    Toggle(ToggleIntent),
}

/// То, что контроллер читает на каждом событии. Сам он ничего из этого не хранит.
#[derive(Clone, Copy)]
pub struct GestureContext<'a> {
    pub registry: &'a SeatRegistry,
    pub inventory: &'a Inventory,
}

/// Цель жеста после разрешения через реестр.
enum Target<'a> {
    Discrete { node: NodeId, ticket: &'a TicketId },
    Zone { category: &'a str },
    Dead,
}

fn resolve<'a>(ctx: &GestureContext<'a>, node: Option<NodeId>) -> Target<'a> {
    let Some(entry) = node.and_then(|node| ctx.registry.entry(node)).filter(|e| e.sellable) else {
        return Target::Dead;
    };
    match (&entry.kind, node) {
        (SeatKind::Discrete { ticket_id: Some(ticket) }, Some(node)) => Target::Discrete { node, ticket },
        (SeatKind::Zone { .. }, _) => Target::Zone { category: &entry.category },
        _ => Target::Dead,
    }
}

pub struct GestureController {
    config: GestureConfig,
    state: GestureState,
    last_input: InputKind,
    span: Span,
    torn_down: bool,
}

impl GestureController {
    pub fn new(config: GestureConfig, surface: &str) -> Self {
        Self {
            config,
            state: GestureState::Idle,
            last_input: InputKind::Pointer,
            span: debug_span!("gesture", surface = %surface),
            torn_down: false,
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn last_input(&self) -> InputKind {
        self.last_input
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Срок сработки таймера скрытия, если он взведён.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            GestureState::PendingHide { deadline, .. } => Some(deadline),
            _ => None,
        }
    }

    pub fn handle(&mut self, event: GestureEvent, ctx: GestureContext<'_>, now: Instant) -> Vec<GestureOutput> {
        if self.torn_down {
            return Vec::new();
        }
        let span = self.span.clone();
        let _enter = span.enter();

        match event {
            GestureEvent::Enter { node, input } => {
                self.last_input = input;
                self.on_enter(node, input, &ctx)
            }
            GestureEvent::Leave { node, input } => {
                self.last_input = input;
                self.on_leave(node, input, now)
            }
            GestureEvent::Tap { target, input } => {
                self.last_input = input;
                self.on_tap(target, input, &ctx, now)
            }
            GestureEvent::TooltipSelect => self.on_select(&ctx, now),
        }
    }

    /// Проверить таймер скрытия.
    pub fn tick(&mut self, now: Instant) -> Vec<GestureOutput> {
        match self.state {
            GestureState::PendingHide { deadline, .. } if !self.torn_down && now >= deadline => {
                let span = self.span.clone();
                let _enter = span.enter();
                self.transition(GestureState::Idle);
                vec![GestureOutput::Tooltip(TooltipCommand::Hide { delay: Duration::ZERO })]
            }
            _ => Vec::new(),
        }
    }

    /// После перепривязки: открытый тултип остаётся на своём месте с новым билетом,
    /// если место всё ещё продаётся; иначе скрывается.
    pub fn on_rebind(&mut self, ctx: GestureContext<'_>) -> Vec<GestureOutput> {
        let Some((node, _)) = self.state.open_seat() else {
            return Vec::new();
        };
        let span = self.span.clone();
        let _enter = span.enter();

        match resolve(&ctx, Some(node)) {
            Target::Discrete { ticket, .. } => {
                match &mut self.state {
                    GestureState::TooltipOpen { ticket: current, .. }
                    | GestureState::PendingHide { ticket: current, .. } => *current = ticket.clone(),
                    _ => {}
                }
                Vec::new()
            }
            _ => {
                debug!("Seat {:?} is no longer sellable, closing tooltip", node);
                self.dismiss()
            }
        }
    }

    /// Закрыть тултип без задержки: узлы прежней сцены больше не существуют.
    pub fn reset(&mut self) {
        let span = self.span.clone();
        let _enter = span.enter();
        self.transition(GestureState::Idle);
    }

    /// Освободить таймер и больше не реагировать на события.
    pub fn teardown(&mut self) {
        let span = self.span.clone();
        let _enter = span.enter();
        self.transition(GestureState::Idle);
        self.torn_down = true;
        info!("Gesture controller torn down");
    }

    fn on_enter(&mut self, node: NodeId, input: InputKind, ctx: &GestureContext<'_>) -> Vec<GestureOutput> {
        // на тач-устройствах hover не бывает
        if input == InputKind::Touch {
            return Vec::new();
        }
        match resolve(ctx, Some(node)) {
            Target::Discrete { node, ticket } => {
                self.transition(GestureState::Hovering { node });
                self.open(node, ticket.clone())
            }
            _ => Vec::new(),
        }
    }

    fn on_leave(&mut self, node: NodeId, input: InputKind, now: Instant) -> Vec<GestureOutput> {
        if input == InputKind::Touch {
            return Vec::new();
        }
        match &self.state {
            GestureState::TooltipOpen { node: open, ticket } if *open == node => {
                let delay = self.config.leave_hide();
                let ticket = ticket.clone();
                self.arm_hide(node, ticket, now, delay)
            }
            _ => Vec::new(),
        }
    }

    fn on_tap(
        &mut self,
        target: Option<NodeId>,
        input: InputKind,
        ctx: &GestureContext<'_>,
        now: Instant,
    ) -> Vec<GestureOutput> {
        match resolve(ctx, target) {
            Target::Discrete { node, ticket } if input == InputKind::Touch => self.open(node, ticket.clone()),
            Target::Discrete { node, ticket } => {
                let mut out = Vec::new();
                if self.state.open_seat().map(|(open, _)| open) != Some(node) {
                    out.extend(self.open(node, ticket.clone()));
                }
                out.extend(self.toggle(node, ticket.clone(), ctx, now));
                out
            }
            Target::Zone { category } => {
                let Some(ticket) = aggregator::first_available(ctx.inventory, category) else {
                    debug!("Zone {} has nothing left to add", category);
                    return self.dismiss();
                };
                let intent = ToggleIntent::add(ticket.id.clone());
                info!("Zone tap on {}: adding ticket {}", category, intent.ticket_id);
                let mut out = match self.state {
                    GestureState::Idle => Vec::new(),
                    _ => self.dismiss(),
                };
                out.push(GestureOutput::Toggle(intent));
                out
            }
            Target::Dead => self.dismiss(),
        }
    }

    fn on_select(&mut self, ctx: &GestureContext<'_>, now: Instant) -> Vec<GestureOutput> {
        let Some((node, ticket)) = self.state.open_seat() else {
            return Vec::new();
        };
        let ticket = ticket.clone();
        self.toggle(node, ticket, ctx, now)
    }

    fn open(&mut self, node: NodeId, ticket: TicketId) -> Vec<GestureOutput> {
        let ticket_id = Some(ticket.clone());
        self.transition(GestureState::TooltipOpen { node, ticket });
        vec![GestureOutput::Tooltip(TooltipCommand::Show { node, ticket_id })]
    }

    fn toggle(
        &mut self,
        node: NodeId,
        ticket: TicketId,
        ctx: &GestureContext<'_>,
        now: Instant,
    ) -> Vec<GestureOutput> {
        let Some(current) = ctx.inventory.get(&ticket) else {
            return self.dismiss();
        };
        let intent = ToggleIntent { ticket_id: ticket.clone(), in_cart: !current.in_cart };
        info!("Toggle {} -> in_cart={}", intent.ticket_id, intent.in_cart);

        let delay = self.config.action_hide();
        let mut out = vec![GestureOutput::Toggle(intent)];
        out.extend(self.arm_hide(node, ticket, now, delay));
        out
    }

    fn arm_hide(&mut self, node: NodeId, ticket: TicketId, now: Instant, delay: Duration) -> Vec<GestureOutput> {
        self.transition(GestureState::PendingHide { node, ticket, deadline: now + delay, delay });
        vec![GestureOutput::Tooltip(TooltipCommand::ArmHide { delay })]
    }

    fn dismiss(&mut self) -> Vec<GestureOutput> {
        self.transition(GestureState::Idle);
        vec![GestureOutput::Tooltip(TooltipCommand::Hide { delay: self.config.dismiss_hide() })]
    }

    fn transition(&mut self, next: GestureState) {
        if self.state != next {
            debug!("{} -> {}", self.state.name(), next.name());
        }
        self.state = next;
    }
}

use chrono::Utc;
use futures::future;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::engine::SeatMapEngine;
use crate::geometry::{Rect, StaticViewport, ViewportTransform};
use crate::gesture::GestureEvent;
use crate::models::{Ticket, ToggleIntent};
use crate::overlay::OverlayFrame;
use crate::scheme::FitRequest;

/// Входящие события цикла движка.
#[derive(Debug, Clone)]
pub enum EngineInput {
    Gesture(GestureEvent),
    Tickets(Vec<Ticket>),
    Scheme { markup: String, request: FitRequest },
    DesiredCount { category: String, count: usize },
    Highlight(Option<String>),
    Zoom(f64),
    Pan { dx: f64, dy: f64 },
    Viewport(Rect),
    Shutdown,
}

/// Ручка запущенного драйвера: вход, намерения наружу, кадры для отрисовки.
pub struct DriverHandle {
    pub inputs: mpsc::Sender<EngineInput>,
    pub intents: mpsc::UnboundedReceiver<ToggleIntent>,
    pub frames: watch::Receiver<OverlayFrame>,
    pub task: JoinHandle<SeatMapEngine>,
}

/// Цикл событий вокруг одного движка. Жесты, списки билетов, таймер скрытия
/// и проверка истёкших броней обрабатываются строго по одному.
pub struct EngineDriver {
    engine: SeatMapEngine,
    layout: StaticViewport,
    intents: mpsc::UnboundedSender<ToggleIntent>,
    frames: watch::Sender<OverlayFrame>,
    sweep_interval: Duration,
}

impl EngineDriver {
    pub fn spawn(engine: SeatMapEngine, viewport: Rect) -> DriverHandle {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = watch::channel(engine.frame());

        let mut layout = StaticViewport::new(engine.scene(), viewport);
        layout.set_scale(engine.config().scheme.initial_scale);

        let driver = Self {
            sweep_interval: engine.config().booking.sweep_interval(),
            engine,
            layout,
            intents: intent_tx,
            frames: frame_tx,
        };
        let task = tokio::spawn(driver.run(input_rx));

        DriverHandle { inputs: input_tx, intents: intent_rx, frames: frame_rx, task }
    }

    async fn run(mut self, mut inputs: mpsc::Receiver<EngineInput>) -> SeatMapEngine {
        let mut sweep = time::interval(self.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🚀 Seat map driver started");

        loop {
            let deadline = self.engine.next_deadline();
            tokio::select! {
                input = inputs.recv() => match input {
                    Some(EngineInput::Shutdown) | None => break,
                    Some(input) => self.on_input(input),
                },
                _ = hide_timer(deadline) => {
                    self.engine.tick(Instant::now(), &self.layout, &self.layout);
                }
                _ = sweep.tick() => {
                    let expired = self.engine.release_expired(Utc::now());
                    self.dispatch(expired);
                }
            }
            self.frames.send_replace(self.engine.frame());
        }

        self.engine.teardown();
        info!("Seat map driver stopped");
        self.engine
    }

    fn on_input(&mut self, input: EngineInput) {
        match input {
            EngineInput::Gesture(event) => {
                let intents = self
                    .engine
                    .handle_gesture(event, Instant::now(), &self.layout, &self.layout);
                self.dispatch(intents);
            }
            EngineInput::Tickets(tickets) => {
                self.engine.update_tickets(tickets, &self.layout, &self.layout);
            }
            EngineInput::Scheme { markup, request } => {
                self.engine.load_scheme(&markup, &request);
                let viewport = self.layout.viewport_rect();
                let zoom = self.layout.scale();
                self.layout = StaticViewport::new(self.engine.scene(), viewport);
                self.layout.set_scale(zoom);
            }
            EngineInput::DesiredCount { category, count } => {
                let intents = self.engine.set_desired_count(&category, count);
                self.dispatch(intents);
            }
            EngineInput::Highlight(category) => self.engine.set_highlight(category),
            EngineInput::Zoom(zoom) => self.layout.set_scale(zoom),
            EngineInput::Pan { dx, dy } => self.layout.pan_by(dx, dy),
            EngineInput::Viewport(rect) => self.layout.set_viewport(rect),
            EngineInput::Shutdown => {}
        }
    }

    /// Отправить намерения наружу и сразу применить их к локальной копии.
    fn dispatch(&mut self, intents: Vec<ToggleIntent>) {
        if intents.is_empty() {
            return;
        }
        self.engine
            .apply_local(&intents, Utc::now(), &self.layout, &self.layout);
        for intent in intents {
            if self.intents.send(intent).is_err() {
                debug!("Intent receiver dropped, intent discarded");
            }
        }
    }
}

async fn hide_timer(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending::<()>().await,
    }
}

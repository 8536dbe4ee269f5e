use anyhow::Context;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seatmap_engine::{
    config::Config,
    geometry::Rect,
    gesture::GestureEvent,
    scheme::FitRequest,
    services::{EngineDriver, EngineInput, HttpTicketSource, TicketSource},
    SeatMapEngine,
};

/// Строка со stdin: жест либо управляющая команда хоста.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HostLine {
    Gesture(GestureEvent),
    Control(ControlCommand),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ControlCommand {
    DesiredCount { category: String, count: usize },
    Highlight { category: Option<String> },
    Zoom { scale: f64 },
    Pan { dx: f64, dy: f64 },
    ClearCart,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::load().context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting seat map for event {}", config.source.event_id);

    let source = HttpTicketSource::from_config(&config.source, &config.circuit_breaker)
        .context("Failed to create ticket source")?;
    let snapshot = source.fetch_event().await.context("Failed to fetch event")?;

    let markup = match &config.scheme.path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read scheme from {path}"))?,
        None => snapshot.scheme,
    };

    let mut engine = SeatMapEngine::new(config.clone(), snapshot.categories);
    engine.load_scheme(&markup, &FitRequest::from(&config.scheme));

    let fit = engine.scene().fit();
    let viewport = Rect::new(
        0.0,
        0.0,
        config.scheme.viewport_width.or(fit.map(|f| f.width)).unwrap_or_default(),
        config.scheme.viewport_height.or(fit.map(|f| f.height)).unwrap_or_default(),
    );

    let handle = EngineDriver::spawn(engine, viewport);
    handle
        .inputs
        .send(EngineInput::Tickets(snapshot.tickets))
        .await
        .context("Engine driver stopped before start")?;

    // Намерения -> источник, затем свежий список билетов обратно в движок
    let (refetch_tx, mut refetch_rx) = mpsc::unbounded_channel::<()>();
    let forward_source = source.clone();
    let mut intents = handle.intents;
    tokio::spawn(async move {
        while let Some(intent) = intents.recv().await {
            if let Err(e) = forward_source.toggle_in_cart(&intent).await {
                error!("Failed to update cart for {}: {}", intent.ticket_id, e);
            }
            let _ = refetch_tx.send(());
        }
    });

    let refetch_source = source.clone();
    let refetch_inputs = handle.inputs.clone();
    tokio::spawn(async move {
        while refetch_rx.recv().await.is_some() {
            // пачку намерений достаточно перечитать один раз
            while refetch_rx.try_recv().is_ok() {}
            match refetch_source.fetch_tickets().await {
                Ok(tickets) => {
                    if refetch_inputs.send(EngineInput::Tickets(tickets)).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Failed to refetch tickets: {}", e),
            }
        }
    });

    let mut frames = handle.frames.clone();
    tokio::spawn(async move {
        while frames.changed().await.is_ok() {
            let frame = frames.borrow_and_update().clone();
            match serde_json::to_string(&frame) {
                Ok(json) => println!("{json}"),
                Err(e) => error!("Failed to serialize frame: {}", e),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let input = match serde_json::from_str::<HostLine>(line) {
            Ok(HostLine::Gesture(event)) => EngineInput::Gesture(event),
            Ok(HostLine::Control(ControlCommand::DesiredCount { category, count })) => {
                EngineInput::DesiredCount { category, count }
            }
            Ok(HostLine::Control(ControlCommand::Highlight { category })) => EngineInput::Highlight(category),
            Ok(HostLine::Control(ControlCommand::Zoom { scale })) => EngineInput::Zoom(scale),
            Ok(HostLine::Control(ControlCommand::Pan { dx, dy })) => EngineInput::Pan { dx, dy },
            Ok(HostLine::Control(ControlCommand::ClearCart)) => {
                if let Err(e) = source.clear_cart().await {
                    error!("Failed to clear cart: {}", e);
                }
                match source.fetch_tickets().await {
                    Ok(tickets) => EngineInput::Tickets(tickets),
                    Err(e) => {
                        warn!("Failed to refetch tickets: {}", e);
                        continue;
                    }
                }
            }
            Err(e) => {
                warn!("Skipping unrecognized input line: {}", e);
                continue;
            }
        };
        if handle.inputs.send(input).await.is_err() {
            break;
        }
    }

    let _ = handle.inputs.send(EngineInput::Shutdown).await;
    let engine = handle.task.await.context("Engine driver panicked")?;
    info!(
        "Seat map closed: {} seats bound, {} tickets in inventory",
        engine.registry().len(),
        engine.inventory().len()
    );
    Ok(())
}

//! source.rs
//!
//! Внешний источник данных события: схема, категории, билеты и изменение корзины.
//!
//! 1.  **TicketSource**: то, что нужно хосту от бэкенда. Движок о нём не знает.
//! 2.  **CircuitBreaker**: "автоматический выключатель" - после серии сетевых сбоев
//!     запросы временно блокируются, затем пропускается один пробный.
//! 3.  **HttpTicketSource**: реализация поверх `reqwest`. Ответы приходят в конверте
//!     `{code, status, data}`; `code >= 300` или `status != "success"` - отказ.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::config::{CircuitBreakerConfig, SourceConfig};
use crate::error::SourceError;
use crate::models::{Category, Ticket, ToggleIntent};

/// Всё, что нужно для первой отрисовки события.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventSnapshot {
    pub scheme: String,
    pub categories: Vec<Category>,
    pub tickets: Vec<Ticket>,
}

#[async_trait]
pub trait TicketSource: Send + Sync {
    async fn fetch_event(&self) -> Result<EventSnapshot, SourceError>;
    async fn fetch_tickets(&self) -> Result<Vec<Ticket>, SourceError>;
    async fn toggle_in_cart(&self, intent: &ToggleIntent) -> Result<(), SourceError>;
    async fn clear_cart(&self) -> Result<(), SourceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Запросы разрешены.
    Closed,
    /// Запросы блокируются до истечения таймаута.
    Open,
    /// Пропускается пробный запрос.
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failures: u32,
    opened_at: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    failure_threshold: u32,
    timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, timeout_seconds: u64) -> Self {
        Self {
            inner: Mutex::new(BreakerInner { state: CircuitState::Closed, failures: 0, opened_at: None }),
            failure_threshold: failure_threshold.max(1),
            timeout: Duration::from_secs(timeout_seconds),
        }
    }

    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(config.failure_threshold, config.timeout_seconds)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn can_execute(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = inner.opened_at.map_or(Duration::MAX, |at| at.elapsed());
                if elapsed >= self.timeout {
                    inner.state = CircuitState::HalfOpen;
                    info!("Circuit breaker transitioning to HalfOpen state");
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            info!("Circuit breaker recovered - transitioning to Closed state");
        }
        inner.state = CircuitState::Closed;
        inner.failures = 0;
        inner.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.failures += 1;
        match inner.state {
            CircuitState::Closed if inner.failures >= self.failure_threshold => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                error!(
                    "Circuit breaker OPENED - {} failures reached threshold {}",
                    inner.failures, self.failure_threshold
                );
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                warn!("Circuit breaker test failed - returning to Open state");
            }
            _ => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }
}

/// Снять конверт ответа. Без `code`/`status` тело считается самими данными.
fn unwrap_envelope<T: DeserializeOwned>(mut body: Value) -> Result<T, SourceError> {
    let code = body.get("code").and_then(code_number);
    let status = body.get("status").and_then(Value::as_str).map(str::to_string);

    if let (Some(code), Some(status)) = (code, status) {
        if code >= 300 || status != "success" {
            return Err(SourceError::Rejected { code: code.to_string(), status });
        }
    }

    let payload = match body.get_mut("data") {
        Some(data) => data.take(),
        None => body,
    };
    Ok(serde_json::from_value(payload)?)
}

fn code_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Clone)]
pub struct HttpTicketSource {
    base_url: String,
    event_id: String,
    http_client: reqwest::Client,
    circuit_breaker: std::sync::Arc<CircuitBreaker>,
}

impl HttpTicketSource {
    pub fn from_config(source: &SourceConfig, breaker: &CircuitBreakerConfig) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(source.timeout_seconds))
            .build()?;

        Ok(Self {
            base_url: source.base_url.trim_end_matches('/').to_string(),
            event_id: source.event_id.clone(),
            http_client,
            circuit_breaker: std::sync::Arc::new(CircuitBreaker::from_config(breaker)),
        })
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    /// Сетевой запрос через Circuit Breaker. Отказ по конверту сбоем не считается.
    async fn execute<F>(&self, operation: F) -> Result<Value, SourceError>
    where
        F: std::future::Future<Output = Result<Value, reqwest::Error>>,
    {
        if !self.circuit_breaker.can_execute() {
            warn!("Circuit breaker is OPEN - blocking ticket source request");
            return Err(SourceError::CircuitOpen);
        }

        match operation.await {
            Ok(body) => {
                self.circuit_breaker.record_success();
                Ok(body)
            }
            Err(e) => {
                error!("Ticket source request failed: {:?}", e);
                self.circuit_breaker.record_failure();
                Err(SourceError::Http(e))
            }
        }
    }

    async fn get(&self, path: &str) -> Result<Value, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        self.execute(async {
            self.http_client
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json::<Value>()
                .await
        })
        .await
    }

    async fn send_json<B: serde::Serialize + Sync>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<Value, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        self.execute(async {
            self.http_client
                .request(method, &url)
                .json(body)
                .send()
                .await?
                .error_for_status()?
                .json::<Value>()
                .await
        })
        .await
    }
}

#[async_trait]
impl TicketSource for HttpTicketSource {
    async fn fetch_event(&self) -> Result<EventSnapshot, SourceError> {
        let body = self.get(&format!("/events/{}", self.event_id)).await?;
        let snapshot: EventSnapshot = unwrap_envelope(body)?;
        info!(
            "🎫 Event {} loaded: {} categories, {} tickets",
            self.event_id,
            snapshot.categories.len(),
            snapshot.tickets.len()
        );
        Ok(snapshot)
    }

    async fn fetch_tickets(&self) -> Result<Vec<Ticket>, SourceError> {
        let body = self.get(&format!("/events/{}/tickets", self.event_id)).await?;
        unwrap_envelope(body)
    }

    async fn toggle_in_cart(&self, intent: &ToggleIntent) -> Result<(), SourceError> {
        info!("🛒 Cart update: ticket={}, in_cart={}", intent.ticket_id, intent.in_cart);
        let body = self.send_json(reqwest::Method::POST, "/cart", intent).await?;
        unwrap_envelope::<Value>(body).map(|_| ())
    }

    async fn clear_cart(&self) -> Result<(), SourceError> {
        let body = self
            .send_json(reqwest::Method::DELETE, "/cart", &serde_json::json!({ "eventId": self.event_id }))
            .await?;
        unwrap_envelope::<Value>(body).map(|_| ())
    }
}

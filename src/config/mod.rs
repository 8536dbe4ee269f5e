use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::error::ConfigError;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub scheme: SchemeConfig,
    pub gesture: GestureConfig,
    pub tooltip: TooltipConfig,
    pub booking: BookingConfig,
    pub source: SourceConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub display: DisplayConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: String,
    pub rust_log: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            rust_log: "seatmap_engine=debug".to_string(),
        }
    }
}

// Настройки схемы зала и подгонки поверхности
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchemeConfig {
    /// Локальный файл со схемой; если не задан, схема берется из источника билетов.
    pub path: Option<String>,
    /// Ширина окна, ниже которой поверхность подгоняется под ширину окна.
    pub narrow_breakpoint: f64,
    pub viewport_width: Option<f64>,
    pub viewport_height: Option<f64>,
    pub window_width: Option<f64>,
    /// Начальный масштаб внешнего zoom/pan (читается только для headless-хоста).
    pub initial_scale: f64,
}

impl Default for SchemeConfig {
    fn default() -> Self {
        Self {
            path: None,
            narrow_breakpoint: 1024.0,
            viewport_width: None,
            viewport_height: None,
            window_width: None,
            initial_scale: 1.0,
        }
    }
}

// Задержки скрытия тултипа
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub leave_hide_ms: u64,
    pub action_hide_ms: u64,
    pub dismiss_hide_ms: u64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            leave_hide_ms: 1000,
            action_hide_ms: 500,
            dismiss_hide_ms: 0,
        }
    }
}

impl GestureConfig {
    pub fn leave_hide(&self) -> Duration {
        Duration::from_millis(self.leave_hide_ms)
    }

    pub fn action_hide(&self) -> Duration {
        Duration::from_millis(self.action_hide_ms)
    }

    pub fn dismiss_hide(&self) -> Duration {
        Duration::from_millis(self.dismiss_hide_ms)
    }
}

// Геометрия тултипа
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TooltipConfig {
    /// Если до нижнего края вьюпорта меньше этого расстояния - тултип переворачивается вверх.
    pub height_threshold: f64,
    pub edge_margin: f64,
    /// Ширина тултипа, если слой представления не сообщил реальную.
    pub default_width: f64,
}

impl Default for TooltipConfig {
    fn default() -> Self {
        Self {
            height_threshold: 120.0,
            edge_margin: 10.0,
            default_width: 220.0,
        }
    }
}

// Удержание билетов в корзине
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    pub hold_seconds: i64,
    pub sweep_interval_seconds: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            // 15 минут + 59 секунд запаса
            hold_seconds: 15 * 60 + 59,
            sweep_interval_seconds: 5,
        }
    }
}

impl BookingConfig {
    pub fn hold(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.hold_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds.max(1))
    }
}

// Внешний источник билетов
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub event_id: String,
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/v1".to_string(),
            event_id: "1".to_string(),
            timeout_seconds: 30,
        }
    }
}

// Настройки Circuit Breaker
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub currency: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency: "₸".to_string(),
        }
    }
}

impl Config {
    /// Дефолты -> необязательный файл `seatmap.*` -> переменные `SEATMAP__SECTION__KEY`.
    /// `RUST_LOG` перекрывает `app.rust_log`, как и раньше.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("seatmap")
    }

    pub fn load_from(file_stem: &str) -> Result<Self, ConfigError> {
        let raw = config::Config::builder()
            .add_source(config::File::with_name(file_stem).required(false))
            .add_source(
                config::Environment::with_prefix("SEATMAP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Config = raw.try_deserialize()?;

        if let Ok(rust_log) = env::var("RUST_LOG") {
            config.app.rust_log = rust_log;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scheme.initial_scale <= 0.0 {
            return Err(ConfigError::Invalid("scheme.initial_scale must be > 0"));
        }
        if self.tooltip.height_threshold < 0.0 || self.tooltip.edge_margin < 0.0 {
            return Err(ConfigError::Invalid("tooltip geometry must be non-negative"));
        }
        if self.booking.hold_seconds <= 0 {
            return Err(ConfigError::Invalid("booking.hold_seconds must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_timings() {
        let config = Config::default();
        assert_eq!(config.gesture.leave_hide(), Duration::from_millis(1000));
        assert_eq!(config.gesture.action_hide(), Duration::from_millis(500));
        assert_eq!(config.gesture.dismiss_hide(), Duration::ZERO);
        assert_eq!(config.tooltip.height_threshold, 120.0);
        assert_eq!(config.booking.hold(), chrono::Duration::seconds(959));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load_from("definitely-not-a-seatmap-config").unwrap();
        assert_eq!(config.scheme.narrow_breakpoint, 1024.0);
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
    }

    #[test]
    fn rejects_non_positive_scale() {
        let mut config = Config::default();
        config.scheme.initial_scale = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}

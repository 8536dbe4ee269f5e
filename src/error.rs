use thiserror::Error;

/// Ошибки разбора схемы. Наружу не пробрасываются: нормализатор превращает их в пустую сцену.
#[derive(Debug, Error)]
pub enum SchemeError {
    #[error("scheme markup is empty")]
    Empty,
    #[error("malformed scheme markup: {0}")]
    Malformed(#[from] roxmltree::Error),
    #[error("scheme root is <{0}>, expected <svg>")]
    UnexpectedRoot(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Ошибки обращения к внешнему источнику билетов.
#[cfg(feature = "http-source")]
#[derive(Debug, Error)]
pub enum SourceError {
    /// Circuit Breaker в состоянии Open и блокирует запрос.
    #[error("circuit breaker is open - ticket source temporarily unavailable")]
    CircuitOpen,
    #[error("ticket source request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("ticket source rejected request: code={code}, status={status}")]
    Rejected { code: String, status: String },
    #[error("unexpected ticket source payload: {0}")]
    Decode(#[from] serde_json::Error),
}

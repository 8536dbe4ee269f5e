pub mod driver;
pub mod expiry;
#[cfg(feature = "http-source")]
pub mod source;

pub use driver::{DriverHandle, EngineDriver, EngineInput};
pub use expiry::{ExpirySweeper, ExpiryStats};
#[cfg(feature = "http-source")]
pub use source::{CircuitBreaker, CircuitState, EventSnapshot, HttpTicketSource, TicketSource};

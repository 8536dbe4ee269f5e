pub mod aggregator;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod models;
pub mod overlay;
pub mod registry;
pub mod scheme;
pub mod services;

pub use engine::SeatMapEngine;

//! Adaptive personality inventory: item selection, trait scoring, and
//! reference-profile matching for a single-process assessment client.

pub mod config;
pub mod error;
pub mod inventory;
pub mod telemetry;

pub use error::AppError;

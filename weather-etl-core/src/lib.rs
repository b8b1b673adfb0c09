//! Core library for the `weather-etl` pipeline.
//!
//! This crate defines:
//! - Configuration & logging setup
//! - The extract, transform and load stages with their test seams
//! - The SQLite-backed observation store and its read-side queries
//! - The pipeline orchestrator and the hourly scheduler
//!
//! It is used by `weather-etl-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod extract;
pub mod load;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod scheduler;
pub mod store;
pub mod transform;

pub use config::Config;
pub use extract::{Extract, WeatherExtractor};
pub use load::{Load, WeatherLoader};
pub use model::{RawObservation, WeatherRecord};
pub use pipeline::{EtlPipeline, TickOutcome};
pub use scheduler::Scheduler;
pub use store::Store;
pub use transform::WeatherTransformer;

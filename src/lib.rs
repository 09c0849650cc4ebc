//! # Weathercast
//!
//! A Rust library for short-horizon (7-day) city temperature forecasting
//! over several independent backends.
//!
//! ## Features
//!
//! - Validated daily temperature series with CSV and in-memory stores
//! - Four forecasting backends behind one train/forecast contract:
//!   autoregressive (ARIMA), windowed sequence regression, additive
//!   trend decomposition, and Monte Carlo resampling with 5th-95th
//!   percentile confidence bands
//! - A file-backed model registry with atomic, latest-wins persistence
//!   per `(backend, city)` key
//! - A forecast service that orchestrates the pieces behind a uniform
//!   error seam for a request-serving layer
//!
//! ## Quick Start
//!
//! ```no_run
//! use weathercast::{BackendKind, CsvObservationStore, ForecastService, ModelRegistry};
//!
//! # fn main() -> weathercast::Result<()> {
//! let store = CsvObservationStore::new("data");
//! let registry = ModelRegistry::new("models")?;
//! let service = ForecastService::new(store, registry);
//!
//! service.train(BackendKind::Arima, "toronto")?;
//! let forecast = service.forecast(BackendKind::Arima, "toronto", 7)?;
//! println!("{:?}", forecast.rounded_points(2));
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod error;
pub mod models;
pub mod registry;
pub mod service;

// Re-export commonly used types
pub use crate::data::{
    CsvObservationStore, MemoryObservationStore, Observation, ObservationStore, TimeSeries,
};
pub use crate::error::{ForecastError, Result};
pub use crate::models::{
    Forecast, ForecastModel, ForecastResult, TrainedForecastModel, DEFAULT_HORIZON_DAYS,
};
pub use crate::registry::{BackendKind, ModelArtifact, ModelKey, ModelRegistry, ModelState};
pub use crate::service::ForecastService;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

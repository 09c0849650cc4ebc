//! Forecasting backends for daily temperature series

use std::fmt::Debug;

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::registry::{BackendKind, ModelKey};

pub mod arima;
pub mod monte_carlo;
pub mod sequence;
pub mod trend;

/// Default forecast horizon in days
pub const DEFAULT_HORIZON_DAYS: usize = 7;

/// Raw backend output: point values plus optional percentile bands.
///
/// Only the stochastic-simulation backend produces bands; the other
/// backends return a single deterministic trajectory.
#[derive(Debug, Clone)]
pub struct Forecast {
    values: Vec<f64>,
    bands: Option<(Vec<f64>, Vec<f64>)>,
}

impl Forecast {
    /// Create a point forecast without bands.
    pub fn point(values: Vec<f64>) -> Self {
        Self {
            values,
            bands: None,
        }
    }

    /// Create a forecast with lower/upper percentile bands.
    pub fn with_bands(values: Vec<f64>, lower: Vec<f64>, upper: Vec<f64>) -> Result<Self> {
        if lower.len() != values.len() || upper.len() != values.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "band length ({}/{}) does not match forecast length ({})",
                lower.len(),
                upper.len(),
                values.len()
            )));
        }

        Ok(Self {
            values,
            bands: Some((lower, upper)),
        })
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the percentile bands, if present
    pub fn bands(&self) -> Option<(&[f64], &[f64])> {
        self.bands
            .as_ref()
            .map(|(lower, upper)| (lower.as_slice(), upper.as_slice()))
    }
}

/// Forecast for one `(backend, city)` key, as handed to callers.
///
/// Created per request and immutable once returned; never persisted.
#[derive(Debug, Clone)]
pub struct ForecastResult {
    kind: BackendKind,
    city: String,
    horizon_days: usize,
    points: Vec<f64>,
    lower_band: Option<Vec<f64>>,
    upper_band: Option<Vec<f64>>,
}

impl ForecastResult {
    /// Stamp a raw backend forecast with its key.
    pub fn from_forecast(key: &ModelKey, forecast: Forecast) -> Self {
        let Forecast { values, bands } = forecast;
        let (lower_band, upper_band) = match bands {
            Some((lower, upper)) => (Some(lower), Some(upper)),
            None => (None, None),
        };

        Self {
            kind: key.kind(),
            city: key.city().to_string(),
            horizon_days: values.len(),
            points: values,
            lower_band,
            upper_band,
        }
    }

    /// Get the backend that produced this forecast
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Get the city this forecast is for
    pub fn city(&self) -> &str {
        &self.city
    }

    /// Get the number of forecasted days
    pub fn horizon_days(&self) -> usize {
        self.horizon_days
    }

    /// Get the point forecast, one value per day
    pub fn points(&self) -> &[f64] {
        &self.points
    }

    /// Get the lower percentile band, if present
    pub fn lower_band(&self) -> Option<&[f64]> {
        self.lower_band.as_deref()
    }

    /// Get the upper percentile band, if present
    pub fn upper_band(&self) -> Option<&[f64]> {
        self.upper_band.as_deref()
    }

    /// Point forecast rounded for the serving layer (2 decimals there).
    pub fn rounded_points(&self, decimals: u32) -> Vec<f64> {
        let factor = 10_f64.powi(decimals as i32);
        self.points
            .iter()
            .map(|v| (v * factor).round() / factor)
            .collect()
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Generate a forecast for the given number of days ahead
    fn forecast(&self, horizon_days: usize) -> Result<Forecast>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on a temperature series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on a validated time series
    fn train(&self, series: &TimeSeries) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// Reject non-positive horizons before any backend work.
pub(crate) fn validate_horizon(horizon_days: usize) -> Result<()> {
    if horizon_days == 0 {
        return Err(ForecastError::InvalidParameter(
            "forecast horizon must be at least 1 day".to_string(),
        ));
    }
    Ok(())
}

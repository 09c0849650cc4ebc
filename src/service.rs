//! Orchestration of training and forecasting across backends

use log::{info, warn};

use crate::data::{ObservationStore, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::ArimaModel;
use crate::models::monte_carlo::MonteCarloModel;
use crate::models::sequence::SequenceModel;
use crate::models::trend::TrendModel;
use crate::models::{Forecast, ForecastModel, ForecastResult, TrainedForecastModel};
use crate::registry::{BackendKind, ModelArtifact, ModelKey, ModelRegistry, ModelState};

/// Orchestrates "train city X with backend Y" and "forecast city X with
/// backend Y" over an observation store and a model registry.
///
/// This is the single seam a request-serving layer depends on: every
/// failure surfaces as a tagged [`ForecastError`], with
/// `ArtifactNotFound` distinguishable so it can map to a "not found"
/// response rather than a generic error.
#[derive(Debug)]
pub struct ForecastService<S: ObservationStore> {
    store: S,
    registry: ModelRegistry,
}

impl<S: ObservationStore> ForecastService<S> {
    /// Create a service over a store and a registry.
    pub fn new(store: S, registry: ModelRegistry) -> Self {
        Self { store, registry }
    }

    /// Train one backend for one city and persist the artifact.
    pub fn train(&self, kind: BackendKind, city: &str) -> Result<ModelArtifact> {
        let key = ModelKey::new(kind, city);
        let series = self.store.series(key.city())?;

        let state = train_backend(kind, &series).map_err(|err| tag_training(err, &key))?;
        let artifact = ModelArtifact::new(&key, series.len(), state)?;
        self.registry.save(&artifact)?;

        info!("trained {} on {} observations", key, series.len());
        Ok(artifact)
    }

    /// Forecast `horizon_days` ahead from the persisted artifact.
    pub fn forecast(
        &self,
        kind: BackendKind,
        city: &str,
        horizon_days: usize,
    ) -> Result<ForecastResult> {
        let key = ModelKey::new(kind, city);
        let artifact = self.registry.load(&key)?;
        let forecast = forecast_state(artifact.state(), kind, horizon_days)?;
        Ok(ForecastResult::from_forecast(&key, forecast))
    }

    /// Check whether a trained artifact exists for this key.
    pub fn exists(&self, kind: BackendKind, city: &str) -> bool {
        self.registry.exists(&ModelKey::new(kind, city))
    }

    /// Train one backend for many cities, isolating each city's failure.
    ///
    /// One bad city never aborts the batch; its error is reported in its
    /// own slot and the loop continues.
    pub fn train_many(&self, kind: BackendKind, cities: &[&str]) -> Vec<(String, Result<()>)> {
        cities
            .iter()
            .map(|city| {
                let outcome = self.train(kind, city).map(|_| ());
                if let Err(err) = &outcome {
                    warn!("training {} for '{}' failed: {}", kind, city, err);
                }
                (city.to_lowercase(), outcome)
            })
            .collect()
    }
}

/// Train the adapter for one backend kind.
fn train_backend(kind: BackendKind, series: &TimeSeries) -> Result<ModelState> {
    match kind {
        BackendKind::Arima => ArimaModel::default().train(series).map(ModelState::Arima),
        BackendKind::Sequence => SequenceModel::default()
            .train(series)
            .map(ModelState::Sequence),
        BackendKind::Trend => TrendModel::default().train(series).map(ModelState::Trend),
        BackendKind::MonteCarlo => MonteCarloModel::default()
            .train(series)
            .map(ModelState::MonteCarlo),
    }
}

/// Dispatch a forecast to the adapter matching the artifact state.
fn forecast_state(state: &ModelState, kind: BackendKind, horizon_days: usize) -> Result<Forecast> {
    if state.kind() != kind {
        return Err(ForecastError::ArtifactIncompatible(format!(
            "artifact was trained by {} but {} was requested",
            state.kind(),
            kind
        )));
    }

    match state {
        ModelState::Arima(model) => model.forecast(horizon_days),
        ModelState::Sequence(model) => model.forecast(horizon_days),
        ModelState::Trend(model) => model.forecast(horizon_days),
        ModelState::MonteCarlo(model) => model.forecast(horizon_days),
    }
}

/// Attach kind and city to numeric training failures. Data-shape errors
/// pass through untouched: the caller must fix the data, not retry.
fn tag_training(err: ForecastError, key: &ModelKey) -> ForecastError {
    match err {
        err @ (ForecastError::MalformedSeries(_) | ForecastError::InsufficientData(_)) => err,
        other => ForecastError::TrainingFailure {
            kind: key.kind(),
            city: key.city().to_string(),
            message: other.to_string(),
        },
    }
}

//! Stochastic-simulation backend and its ensemble engine

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{validate_horizon, Forecast, ForecastModel, TrainedForecastModel};

/// Default number of simulated trajectories
pub const DEFAULT_NUM_SIMULATIONS: usize = 1000;

/// Lower band percentile
pub const LOWER_PERCENTILE: f64 = 5.0;
/// Upper band percentile
pub const UPPER_PERCENTILE: f64 = 95.0;

/// Monte Carlo resampling model.
///
/// Training stores only the historical mean and standard deviation; the
/// forecast resamples them into an ensemble and reduces it to a point
/// forecast and a 5th-95th percentile band.
#[derive(Debug, Clone)]
pub struct MonteCarloModel {
    name: String,
    num_simulations: usize,
    seed: Option<u64>,
}

/// Trained Monte Carlo model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedMonteCarlo {
    /// Name of the model
    name: String,
    /// Historical mean temperature
    mean: f64,
    /// Historical population standard deviation
    std_dev: f64,
    /// Trajectories drawn per forecast
    num_simulations: usize,
    /// Fixed RNG seed, if reproducibility was requested
    seed: Option<u64>,
}

impl MonteCarloModel {
    /// Create a model with the given trajectory count.
    pub fn new(num_simulations: usize) -> Result<Self> {
        if num_simulations == 0 {
            return Err(ForecastError::InvalidParameter(
                "simulation count must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Monte Carlo ({} runs)", num_simulations),
            num_simulations,
            seed: None,
        })
    }

    /// Fix the RNG seed so forecasts are reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Minimum observations for a meaningful variance estimate.
    pub fn min_observations(&self) -> usize {
        2
    }
}

impl Default for MonteCarloModel {
    fn default() -> Self {
        Self {
            name: format!("Monte Carlo ({} runs)", DEFAULT_NUM_SIMULATIONS),
            num_simulations: DEFAULT_NUM_SIMULATIONS,
            seed: None,
        }
    }
}

impl ForecastModel for MonteCarloModel {
    type Trained = TrainedMonteCarlo;

    fn train(&self, series: &TimeSeries) -> Result<TrainedMonteCarlo> {
        if series.len() < self.min_observations() {
            return Err(ForecastError::InsufficientData(format!(
                "Monte Carlo needs at least {} observations for a variance estimate, got {}",
                self.min_observations(),
                series.len()
            )));
        }

        Ok(TrainedMonteCarlo {
            name: self.name.clone(),
            mean: series.mean(),
            std_dev: series.std_dev(),
            num_simulations: self.num_simulations,
            seed: self.seed,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForecastModel for TrainedMonteCarlo {
    fn forecast(&self, horizon_days: usize) -> Result<Forecast> {
        validate_horizon(horizon_days)?;

        let engine = SimulationEngine {
            mean: self.mean,
            std_dev: self.std_dev,
            num_simulations: self.num_simulations,
        };
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let ensemble = engine.run(horizon_days, &mut rng)?;

        let values = ensemble.mean_by_index();
        let lower = ensemble.percentile_by_index(LOWER_PERCENTILE);
        let upper = ensemble.percentile_by_index(UPPER_PERCENTILE);
        Forecast::with_bands(values, lower, upper)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Ensemble generator: independent normal draws per day and trajectory.
///
/// Trajectory generation is embarrassingly parallel; a single-threaded
/// loop is the deliberate default here, the reduction dominates nothing.
#[derive(Debug, Clone, Copy)]
pub struct SimulationEngine {
    /// Mean of the sampled distribution
    pub mean: f64,
    /// Standard deviation of the sampled distribution; zero degenerates
    /// every draw to the mean
    pub std_dev: f64,
    /// Number of trajectories
    pub num_simulations: usize,
}

impl SimulationEngine {
    /// Draw the full ensemble. Exists only transiently during one
    /// forecast call.
    pub fn run<R: Rng>(&self, horizon_days: usize, rng: &mut R) -> Result<Ensemble> {
        let normal = Normal::new(self.mean, self.std_dev).map_err(|err| {
            ForecastError::InvalidParameter(format!("invalid normal parameters: {}", err))
        })?;

        let trajectories = (0..self.num_simulations)
            .map(|_| (0..horizon_days).map(|_| rng.sample(normal)).collect())
            .collect();

        Ok(Ensemble { trajectories })
    }
}

/// A drawn ensemble of equally long trajectories.
#[derive(Debug, Clone)]
pub struct Ensemble {
    trajectories: Vec<Vec<f64>>,
}

impl Ensemble {
    /// Arithmetic mean across trajectories, independently per day.
    pub fn mean_by_index(&self) -> Vec<f64> {
        self.reduce_by_index(|column| column.iter().mean())
    }

    /// Percentile across trajectories, independently per day.
    pub fn percentile_by_index(&self, pct: f64) -> Vec<f64> {
        self.reduce_by_index(|column| percentile(column, pct))
    }

    fn reduce_by_index<F: Fn(&[f64]) -> f64>(&self, reduce: F) -> Vec<f64> {
        let horizon = self.trajectories.first().map_or(0, Vec::len);
        (0..horizon)
            .map(|day| {
                let column: Vec<f64> = self
                    .trajectories
                    .iter()
                    .map(|trajectory| trajectory[day])
                    .collect();
                reduce(&column)
            })
            .collect()
    }
}

/// Percentile with linear interpolation between order statistics.
///
/// Matches the numpy default: rank `(n - 1) * pct / 100` with the
/// fractional part interpolated between neighbours.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    debug_assert!(!values.is_empty());
    debug_assert!((0.0..=100.0).contains(&pct));

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (sorted.len() - 1) as f64 * pct / 100.0;
    let below = rank.floor() as usize;
    let above = rank.ceil() as usize;
    if below == above {
        sorted[below]
    } else {
        let fraction = rank - below as f64;
        sorted[below] + (sorted[above] - sorted[below]) * fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_linearly() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 4.0);
        assert!((percentile(&values, 50.0) - 2.5).abs() < 1e-12);
        // rank 0.15 between the first two order statistics
        assert!((percentile(&values, 5.0) - 1.15).abs() < 1e-12);
    }

    #[test]
    fn percentile_is_order_independent() {
        let values = vec![4.0, 1.0, 3.0, 2.0];
        assert!((percentile(&values, 50.0) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn zero_variance_collapses_the_ensemble() {
        let engine = SimulationEngine {
            mean: 20.0,
            std_dev: 0.0,
            num_simulations: 50,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let ensemble = engine.run(7, &mut rng).unwrap();
        for value in ensemble.mean_by_index() {
            assert_eq!(value, 20.0);
        }
        for value in ensemble.percentile_by_index(5.0) {
            assert_eq!(value, 20.0);
        }
    }
}

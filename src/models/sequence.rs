//! Sequence-network backend: windowed next-value regression with
//! iterative multi-step rollout

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{validate_horizon, Forecast, ForecastModel, TrainedForecastModel};

/// Length of the input window feeding each next-value prediction
pub const WINDOW_SIZE: usize = 10;

const HIDDEN_ONE: usize = 64;
const HIDDEN_TWO: usize = 32;
const DEFAULT_EPOCHS: usize = 30;
const DEFAULT_LEARNING_RATE: f64 = 0.01;
const DEFAULT_SEED: u64 = 7;

/// Sequence regression model over fixed-length windows.
///
/// Values are min-max scaled into [0, 1], then overlapping windows of
/// [`WINDOW_SIZE`] values are regressed onto the value that follows them
/// by a two-hidden-layer (64, 32) tanh network trained with plain SGD.
#[derive(Debug, Clone)]
pub struct SequenceModel {
    name: String,
    epochs: usize,
    learning_rate: f64,
    seed: u64,
}

/// Trained sequence model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedSequence {
    /// Name of the model
    name: String,
    /// Scaling fitted once on the training series
    scaler: MinMaxScaler,
    /// First hidden layer (64 units)
    hidden_one: Dense,
    /// Second hidden layer (32 units)
    hidden_two: Dense,
    /// Linear output layer (1 unit)
    output: Dense,
    /// Last [`WINDOW_SIZE`] scaled observations, rollout seed
    seed_window: Vec<f64>,
}

/// Min-max scaling into [0, 1], invertible at forecast time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: f64,
    max: f64,
}

impl MinMaxScaler {
    /// Fit the scaler on the training series.
    pub fn fit(values: &[f64]) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &value in values {
            min = min.min(value);
            max = max.max(value);
        }
        Self { min, max }
    }

    /// Scale one value into [0, 1]. A constant series maps to 0.5.
    pub fn scale(&self, value: f64) -> f64 {
        if self.max == self.min {
            0.5
        } else {
            (value - self.min) / (self.max - self.min)
        }
    }

    /// Invert the scaling.
    pub fn invert(&self, scaled: f64) -> f64 {
        if self.max == self.min {
            self.min
        } else {
            scaled * (self.max - self.min) + self.min
        }
    }
}

/// One fully connected layer: `weights[out][in]` and one bias per unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Dense {
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
}

impl Dense {
    fn init(outputs: usize, inputs: usize, rng: &mut StdRng) -> Self {
        let bound = 1.0 / (inputs as f64).sqrt();
        let weights = (0..outputs)
            .map(|_| (0..inputs).map(|_| rng.gen_range(-bound..bound)).collect())
            .collect();
        Self {
            weights,
            biases: vec![0.0; outputs],
        }
    }

    fn affine(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(self.biases.iter())
            .map(|(row, bias)| {
                bias + row
                    .iter()
                    .zip(input.iter())
                    .map(|(w, x)| w * x)
                    .sum::<f64>()
            })
            .collect()
    }
}

/// Build the overlapping (window, target) training pairs.
///
/// For a series of length `n >= window + 1` this produces exactly
/// `n - window` pairs: `window[i] = values[i..i+window]`,
/// `target[i] = values[i+window]`.
pub fn window_pairs(values: &[f64], window: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    let mut windows = Vec::new();
    let mut targets = Vec::new();
    for i in window..values.len() {
        windows.push(values[i - window..i].to_vec());
        targets.push(values[i]);
    }
    (windows, targets)
}

impl SequenceModel {
    /// Create a sequence model with the default training schedule.
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Create a sequence model with a specific RNG seed for weight
    /// initialization and batch shuffling.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            name: format!("Sequence(window={})", WINDOW_SIZE),
            epochs: DEFAULT_EPOCHS,
            learning_rate: DEFAULT_LEARNING_RATE,
            seed,
        }
    }

    /// Override the number of training epochs.
    pub fn with_epochs(mut self, epochs: usize) -> Result<Self> {
        if epochs == 0 {
            return Err(ForecastError::InvalidParameter(
                "epoch count must be at least 1".to_string(),
            ));
        }
        self.epochs = epochs;
        Ok(self)
    }

    /// Minimum observations: one full window plus its target.
    pub fn min_observations(&self) -> usize {
        WINDOW_SIZE + 1
    }
}

impl Default for SequenceModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastModel for SequenceModel {
    type Trained = TrainedSequence;

    fn train(&self, series: &TimeSeries) -> Result<TrainedSequence> {
        if series.len() < self.min_observations() {
            return Err(ForecastError::InsufficientData(format!(
                "sequence model needs at least {} observations, got {}",
                self.min_observations(),
                series.len()
            )));
        }

        let scaler = MinMaxScaler::fit(series.values());
        let scaled: Vec<f64> = series.values().iter().map(|v| scaler.scale(*v)).collect();
        let (windows, targets) = window_pairs(&scaled, WINDOW_SIZE);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut hidden_one = Dense::init(HIDDEN_ONE, WINDOW_SIZE, &mut rng);
        let mut hidden_two = Dense::init(HIDDEN_TWO, HIDDEN_ONE, &mut rng);
        let mut output = Dense::init(1, HIDDEN_TWO, &mut rng);

        let mut order: Vec<usize> = (0..windows.len()).collect();
        for _ in 0..self.epochs {
            order.shuffle(&mut rng);
            for &i in &order {
                sgd_step(
                    &mut hidden_one,
                    &mut hidden_two,
                    &mut output,
                    &windows[i],
                    targets[i],
                    self.learning_rate,
                );
            }
        }

        let seed_window = scaled[scaled.len() - WINDOW_SIZE..].to_vec();
        Ok(TrainedSequence {
            name: self.name.clone(),
            scaler,
            hidden_one,
            hidden_two,
            output,
            seed_window,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForecastModel for TrainedSequence {
    /// Iterative multi-step rollout on a fixed-size window buffer: each
    /// prediction is appended, the oldest value dropped, and the updated
    /// window fed back in. Forecast error compounds with the horizon;
    /// that is inherent to predicting on the model's own output.
    fn forecast(&self, horizon_days: usize) -> Result<Forecast> {
        validate_horizon(horizon_days)?;

        let mut window = self.seed_window.clone();
        let mut values = Vec::with_capacity(horizon_days);
        for _ in 0..horizon_days {
            let prediction = self.forward(&window);
            window.rotate_left(1);
            window[WINDOW_SIZE - 1] = prediction;
            values.push(self.scaler.invert(prediction));
        }

        Ok(Forecast::point(values))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedSequence {
    fn forward(&self, window: &[f64]) -> f64 {
        let h1: Vec<f64> = self
            .hidden_one
            .affine(window)
            .into_iter()
            .map(f64::tanh)
            .collect();
        let h2: Vec<f64> = self
            .hidden_two
            .affine(&h1)
            .into_iter()
            .map(f64::tanh)
            .collect();
        self.output.affine(&h2)[0]
    }
}

/// One stochastic-gradient step on the squared error of a single pair.
fn sgd_step(
    hidden_one: &mut Dense,
    hidden_two: &mut Dense,
    output: &mut Dense,
    window: &[f64],
    target: f64,
    learning_rate: f64,
) {
    // Forward pass with cached activations.
    let h1: Vec<f64> = hidden_one.affine(window).into_iter().map(f64::tanh).collect();
    let h2: Vec<f64> = hidden_two.affine(&h1).into_iter().map(f64::tanh).collect();
    let prediction = output.affine(&h2)[0];

    // Backward pass. d_y is the derivative of 0.5 * (y - t)^2.
    let d_y = prediction - target;

    let d_h2: Vec<f64> = h2
        .iter()
        .zip(output.weights[0].iter())
        .map(|(h, w)| d_y * w * (1.0 - h * h))
        .collect();
    let d_h1: Vec<f64> = (0..h1.len())
        .map(|i| {
            let upstream: f64 = d_h2
                .iter()
                .zip(hidden_two.weights.iter())
                .map(|(d, row)| d * row[i])
                .sum();
            upstream * (1.0 - h1[i] * h1[i])
        })
        .collect();

    for (w, h) in output.weights[0].iter_mut().zip(h2.iter()) {
        *w -= learning_rate * d_y * h;
    }
    output.biases[0] -= learning_rate * d_y;

    for (row, d) in hidden_two.weights.iter_mut().zip(d_h2.iter()) {
        for (w, h) in row.iter_mut().zip(h1.iter()) {
            *w -= learning_rate * d * h;
        }
    }
    for (bias, d) in hidden_two.biases.iter_mut().zip(d_h2.iter()) {
        *bias -= learning_rate * d;
    }

    for (row, d) in hidden_one.weights.iter_mut().zip(d_h1.iter()) {
        for (w, x) in row.iter_mut().zip(window.iter()) {
            *w -= learning_rate * d * x;
        }
    }
    for (bias, d) in hidden_one.biases.iter_mut().zip(d_h1.iter()) {
        *bias -= learning_rate * d;
    }
}

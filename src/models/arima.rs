//! Autoregressive-with-differencing backend, ARIMA(p,1,0) by default

use serde::{Deserialize, Serialize};

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{validate_horizon, Forecast, ForecastModel, TrainedForecastModel};

/// Ridge term added to the normal equations so collinear regressors
/// (e.g. a constant differenced series) stay solvable.
const RIDGE: f64 = 1e-6;

/// ARIMA model (AutoRegressive Integrated, no moving-average term)
#[derive(Debug, Clone)]
pub struct ArimaModel {
    /// Name of the model
    name: String,
    /// AR order (p)
    p: usize,
    /// Differencing order (d)
    d: usize,
}

/// Trained ARIMA model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedArima {
    /// Name of the model
    name: String,
    /// AR order (p)
    p: usize,
    /// Differencing order (d)
    d: usize,
    /// Fitted intercept on the differenced series
    intercept: f64,
    /// Fitted AR coefficients, lag 1 first
    coefficients: Vec<f64>,
    /// Last observed level, start of un-differencing
    last_level: f64,
    /// Last p differenced values, most recent last
    recent_diffs: Vec<f64>,
}

impl ArimaModel {
    /// Create a new ARIMA model with the given AR and differencing orders.
    pub fn new(p: usize, d: usize) -> Result<Self> {
        if p == 0 {
            return Err(ForecastError::InvalidParameter(
                "AR order must be at least 1".to_string(),
            ));
        }
        if d > 1 {
            return Err(ForecastError::InvalidParameter(
                "differencing order above 1 is not supported".to_string(),
            ));
        }

        Ok(Self {
            name: format!("ARIMA({},{},0)", p, d),
            p,
            d,
        })
    }

    /// Minimum observations needed for one regression row.
    pub fn min_observations(&self) -> usize {
        self.p + self.d + 1
    }
}

impl Default for ArimaModel {
    /// The standard order used for daily temperature series.
    fn default() -> Self {
        Self {
            name: "ARIMA(5,1,0)".to_string(),
            p: 5,
            d: 1,
        }
    }
}

impl ForecastModel for ArimaModel {
    type Trained = TrainedArima;

    fn train(&self, series: &TimeSeries) -> Result<TrainedArima> {
        let values = series.values();
        if values.len() < self.min_observations() {
            return Err(ForecastError::InsufficientData(format!(
                "{} needs at least {} observations, got {}",
                self.name,
                self.min_observations(),
                values.len()
            )));
        }

        let diffs = if self.d == 1 {
            difference(values)
        } else {
            values.to_vec()
        };

        let (intercept, coefficients) = fit_ar(&diffs, self.p);

        Ok(TrainedArima {
            name: self.name.clone(),
            p: self.p,
            d: self.d,
            intercept,
            coefficients,
            last_level: values[values.len() - 1],
            recent_diffs: diffs[diffs.len() - self.p..].to_vec(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForecastModel for TrainedArima {
    /// Deterministic multi-step roll-forward: each step's prediction joins
    /// the conditioning history for the next.
    fn forecast(&self, horizon_days: usize) -> Result<Forecast> {
        validate_horizon(horizon_days)?;

        let mut history = self.recent_diffs.clone();
        let mut diff_forecasts = Vec::with_capacity(horizon_days);
        for _ in 0..horizon_days {
            let mut next = self.intercept;
            for (lag, coefficient) in self.coefficients.iter().enumerate() {
                next += coefficient * history[history.len() - 1 - lag];
            }
            history.push(next);
            diff_forecasts.push(next);
        }

        let values = if self.d == 1 {
            // Cumulate predicted increments from the last observed level.
            let mut level = self.last_level;
            diff_forecasts
                .iter()
                .map(|delta| {
                    level += delta;
                    level
                })
                .collect()
        } else {
            diff_forecasts
        };

        Ok(Forecast::point(values))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// First difference of a series.
fn difference(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

/// Fit an AR(p) model with intercept by ridge-stabilized least squares.
///
/// Falls back to a drift-only model (mean increment, zero AR terms) when
/// the normal equations are still singular.
fn fit_ar(diffs: &[f64], p: usize) -> (f64, Vec<f64>) {
    let rows = diffs.len() - p;
    let dim = p + 1;

    // Normal equations X'X b = X'y with an intercept column of ones.
    let mut xtx = vec![vec![0.0; dim]; dim];
    let mut xty = vec![0.0; dim];
    for t in p..diffs.len() {
        let y = diffs[t];
        let mut row = Vec::with_capacity(dim);
        row.push(1.0);
        for lag in 1..=p {
            row.push(diffs[t - lag]);
        }
        for i in 0..dim {
            xty[i] += row[i] * y;
            for j in 0..dim {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for (i, row) in xtx.iter_mut().enumerate() {
        row[i] += RIDGE * rows.max(1) as f64;
    }

    match solve(xtx, xty) {
        Some(solution) => (solution[0], solution[1..].to_vec()),
        None => {
            let drift = diffs.iter().sum::<f64>() / diffs.len() as f64;
            (drift, vec![0.0; p])
        }
    }
}

/// Solve a small dense linear system by Gaussian elimination with
/// partial pivoting. Returns None when a pivot vanishes.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot_row = (col..n).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if a[pivot_row][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for col in (row + 1)..n {
            sum -= a[row][col] * x[col];
        }
        x[row] = sum / a[row][row];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solve_small_system() {
        // 2x + y = 5, x + 3y = 10
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let b = vec![5.0, 10.0];
        let x = solve(a, b).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-9);
        assert!((x[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn solve_detects_singular_system() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        let b = vec![1.0, 2.0];
        assert!(solve(a, b).is_none());
    }

    #[test]
    fn constant_increments_fit_a_unit_drift() {
        let diffs = vec![1.0; 20];
        let (intercept, coefficients) = fit_ar(&diffs, 5);
        let predicted: f64 = intercept + coefficients.iter().sum::<f64>();
        assert!((predicted - 1.0).abs() < 1e-3);
    }
}

//! Additive trend + seasonality backend

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{validate_horizon, Forecast, ForecastModel, TrainedForecastModel};

/// Additive decomposition model: linear trend over the date index plus a
/// day-of-week seasonal component fitted on the trend residuals.
#[derive(Debug, Clone)]
pub struct TrendModel {
    name: String,
}

impl Default for TrendModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Trained trend decomposition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedTrend {
    /// Name of the model
    name: String,
    /// Trend intercept at the first observed date
    intercept: f64,
    /// Trend slope per day
    slope: f64,
    /// Additive seasonal term per weekday, Monday first
    seasonal: [f64; 7],
    /// First observed date, origin of the trend index
    first_date: NaiveDate,
    /// Last observed date, start of the future frame
    last_date: NaiveDate,
}

impl TrendModel {
    /// Create a new trend decomposition model.
    pub fn new() -> Self {
        Self {
            name: "Trend + weekly seasonality".to_string(),
        }
    }

    /// Minimum observations for a non-degenerate trend line.
    pub fn min_observations(&self) -> usize {
        2
    }
}

impl ForecastModel for TrendModel {
    type Trained = TrainedTrend;

    fn train(&self, series: &TimeSeries) -> Result<TrainedTrend> {
        if series.len() < self.min_observations() {
            return Err(ForecastError::InsufficientData(format!(
                "trend decomposition needs at least {} observations, got {}",
                self.min_observations(),
                series.len()
            )));
        }

        let first_date = series.first_date();
        let xs: Vec<f64> = series
            .dates()
            .iter()
            .map(|date| (*date - first_date).num_days() as f64)
            .collect();
        let ys = series.values();

        // Ordinary least squares on the day index. Dates are strictly
        // increasing with n >= 2, so the denominator never vanishes.
        let n = xs.len() as f64;
        let x_mean = xs.iter().sum::<f64>() / n;
        let y_mean = ys.iter().sum::<f64>() / n;
        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (x, y) in xs.iter().zip(ys.iter()) {
            numerator += (x - x_mean) * (y - y_mean);
            denominator += (x - x_mean) * (x - x_mean);
        }
        let slope = numerator / denominator;
        let intercept = y_mean - slope * x_mean;

        // Mean trend residual per weekday; weekdays with no observations
        // contribute nothing to the forecast.
        let mut residual_sums = [0.0; 7];
        let mut residual_counts = [0usize; 7];
        for ((date, x), y) in series.dates().iter().zip(xs.iter()).zip(ys.iter()) {
            let weekday = date.weekday().num_days_from_monday() as usize;
            residual_sums[weekday] += y - (intercept + slope * x);
            residual_counts[weekday] += 1;
        }
        let mut seasonal = [0.0; 7];
        for weekday in 0..7 {
            if residual_counts[weekday] > 0 {
                seasonal[weekday] = residual_sums[weekday] / residual_counts[weekday] as f64;
            }
        }

        Ok(TrainedTrend {
            name: self.name.clone(),
            intercept,
            slope,
            seasonal,
            first_date,
            last_date: series.last_date(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForecastModel for TrainedTrend {
    /// Extend the date frame past the last observation and return the
    /// fitted value at each future date.
    fn forecast(&self, horizon_days: usize) -> Result<Forecast> {
        validate_horizon(horizon_days)?;

        let mut values = Vec::with_capacity(horizon_days);
        for day in 1..=horizon_days as u64 {
            let date = self
                .last_date
                .checked_add_days(Days::new(day))
                .ok_or_else(|| {
                    ForecastError::InvalidParameter(format!(
                        "forecast date overflows the calendar at day {}",
                        day
                    ))
                })?;
            let x = (date - self.first_date).num_days() as f64;
            let weekday = date.weekday().num_days_from_monday() as usize;
            values.push(self.intercept + self.slope * x + self.seasonal[weekday]);
        }

        Ok(Forecast::point(values))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TimeSeries;

    fn linear_series(n: usize) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let dates = (0..n as u64).map(|i| start + Days::new(i)).collect();
        let values = (0..n).map(|i| 10.0 + i as f64).collect();
        TimeSeries::new(dates, values).unwrap()
    }

    #[test]
    fn linear_series_is_fit_exactly() {
        let series = linear_series(14);
        let trained = TrendModel::new().train(&series).unwrap();
        let forecast = trained.forecast(7).unwrap();
        for (i, value) in forecast.values().iter().enumerate() {
            let expected = 10.0 + (14 + i) as f64;
            assert!((value - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn two_points_are_enough() {
        let series = linear_series(2);
        let trained = TrendModel::new().train(&series).unwrap();
        let forecast = trained.forecast(3).unwrap();
        assert_eq!(forecast.values().len(), 3);
    }
}

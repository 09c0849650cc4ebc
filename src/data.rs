//! Observation time series handling

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use statrs::statistics::Statistics;

use crate::error::{ForecastError, Result};

/// One daily weather observation as written by the acquisition job.
///
/// The acquisition job writes more columns than the models consume
/// (`feels_like`, `humidity`, `pressure`, `wind_speed`, `weather`); only
/// `date` and `temperature` are read here, extra columns are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Observation {
    /// Observation date
    pub date: NaiveDate,
    /// Daily temperature in degrees Celsius
    pub temperature: f64,
}

/// Validated, immutable time series of daily temperatures.
///
/// Invariants enforced at construction: non-empty, strictly increasing
/// dates, all values finite. Adapters only ever see immutable views.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a new time series, validating the shape contract.
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::MalformedSeries(format!(
                "date count ({}) does not match value count ({})",
                dates.len(),
                values.len()
            )));
        }
        if dates.is_empty() {
            return Err(ForecastError::MalformedSeries(
                "series is empty".to_string(),
            ));
        }
        for pair in dates.windows(2) {
            if pair[1] <= pair[0] {
                return Err(ForecastError::MalformedSeries(format!(
                    "dates not strictly increasing at {}",
                    pair[1]
                )));
            }
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(ForecastError::MalformedSeries(format!(
                "non-finite value in series: {}",
                bad
            )));
        }

        Ok(Self { dates, values })
    }

    /// Build a series from observation rows, sorting by date first.
    ///
    /// Duplicate dates still fail validation: sorting never invents an
    /// ordering for rows recorded on the same day.
    pub fn from_observations(mut rows: Vec<Observation>) -> Result<Self> {
        rows.sort_by_key(|row| row.date);
        let dates = rows.iter().map(|row| row.date).collect();
        let values = rows.iter().map(|row| row.temperature).collect();
        Self::new(dates, values)
    }

    /// Get the number of observations
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// A valid series is never empty, so this always returns false; kept
    /// so callers can treat the type like other collections.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Get the temperature values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the observation dates
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Get the first observation date
    pub fn first_date(&self) -> NaiveDate {
        self.dates[0]
    }

    /// Get the last observation date
    pub fn last_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    /// Calculate the mean temperature
    pub fn mean(&self) -> f64 {
        self.values.iter().mean()
    }

    /// Calculate the population standard deviation of the temperatures
    pub fn std_dev(&self) -> f64 {
        self.values.iter().population_std_dev()
    }
}

/// Source of per-city observation series.
///
/// Populated out of band; the crate only assumes it receives whatever
/// rows are present for a city.
pub trait ObservationStore {
    /// Load the full observation series for a city.
    fn series(&self, city: &str) -> Result<TimeSeries>;
}

/// Observation store backed by one CSV file per city.
///
/// Files live in a single data directory and are named
/// `<city>_weather.csv` with at least `date` and `temperature` columns.
#[derive(Debug, Clone)]
pub struct CsvObservationStore {
    dir: PathBuf,
}

impl CsvObservationStore {
    /// Create a store rooted at the given data directory.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn file_for(&self, city: &str) -> PathBuf {
        self.dir.join(format!("{}_weather.csv", city.to_lowercase()))
    }
}

impl ObservationStore for CsvObservationStore {
    fn series(&self, city: &str) -> Result<TimeSeries> {
        let path = self.file_for(city);
        if !path.is_file() {
            return Err(ForecastError::NoDataForCity(city.to_lowercase()));
        }

        let mut reader = csv::Reader::from_path(&path)?;
        let mut rows = Vec::new();
        for record in reader.deserialize() {
            let row: Observation = record?;
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(ForecastError::NoDataForCity(city.to_lowercase()));
        }

        TimeSeries::from_observations(rows)
    }
}

/// In-memory observation store for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryObservationStore {
    by_city: HashMap<String, TimeSeries>,
}

impl MemoryObservationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the series for a city.
    pub fn insert(&mut self, city: &str, series: TimeSeries) {
        self.by_city.insert(city.to_lowercase(), series);
    }
}

impl ObservationStore for MemoryObservationStore {
    fn series(&self, city: &str) -> Result<TimeSeries> {
        self.by_city
            .get(&city.to_lowercase())
            .cloned()
            .ok_or_else(|| ForecastError::NoDataForCity(city.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        (0..n as u64)
            .map(|i| start + chrono::Days::new(i))
            .collect()
    }

    #[test]
    fn rejects_empty_series() {
        let result = TimeSeries::new(Vec::new(), Vec::new());
        assert!(matches!(result, Err(ForecastError::MalformedSeries(_))));
    }

    #[test]
    fn rejects_unsorted_dates() {
        let mut ds = dates(3);
        ds.swap(0, 2);
        let result = TimeSeries::new(ds, vec![1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(ForecastError::MalformedSeries(_))));
    }

    #[test]
    fn rejects_duplicate_dates() {
        let mut ds = dates(3);
        ds[2] = ds[1];
        let result = TimeSeries::new(ds, vec![1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(ForecastError::MalformedSeries(_))));
    }

    #[test]
    fn rejects_non_finite_values() {
        let result = TimeSeries::new(dates(2), vec![1.0, f64::NAN]);
        assert!(matches!(result, Err(ForecastError::MalformedSeries(_))));
    }

    #[test]
    fn sorts_observations_by_date() {
        let ds = dates(3);
        let rows = vec![
            Observation {
                date: ds[2],
                temperature: 3.0,
            },
            Observation {
                date: ds[0],
                temperature: 1.0,
            },
            Observation {
                date: ds[1],
                temperature: 2.0,
            },
        ];
        let series = TimeSeries::from_observations(rows).unwrap();
        assert_eq!(series.values(), &[1.0, 2.0, 3.0]);
        assert_eq!(series.first_date(), ds[0]);
        assert_eq!(series.last_date(), ds[2]);
    }

    #[test]
    fn population_moments() {
        let series = TimeSeries::new(dates(4), vec![2.0, 4.0, 4.0, 6.0]).unwrap();
        assert!((series.mean() - 4.0).abs() < 1e-12);
        // population std dev of [2, 4, 4, 6] is sqrt(2)
        assert!((series.std_dev() - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn single_point_series_has_zero_std_dev() {
        let series = TimeSeries::new(dates(1), vec![20.0]).unwrap();
        assert_eq!(series.std_dev(), 0.0);
    }
}

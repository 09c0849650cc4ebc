use chrono::{Days, NaiveDate};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use weathercast::{
    BackendKind, ForecastError, ForecastService, MemoryObservationStore, ModelRegistry, TimeSeries,
};

fn series(values: Vec<f64>) -> TimeSeries {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let dates = (0..values.len() as u64)
        .map(|i| start + Days::new(i))
        .collect();
    TimeSeries::new(dates, values).unwrap()
}

// The TempDir guard is returned so the registry directory outlives the
// service under test.
fn service_with_city(
    city: &str,
    values: Vec<f64>,
) -> (ForecastService<MemoryObservationStore>, tempfile::TempDir) {
    let mut store = MemoryObservationStore::new();
    store.insert(city, series(values));
    let dir = tempdir().unwrap();
    let registry = ModelRegistry::new(dir.path()).unwrap();
    (ForecastService::new(store, registry), dir)
}

#[test]
fn train_then_forecast_for_every_backend() {
    let values: Vec<f64> = (0..30).map(|i| 12.0 + (i as f64 / 5.0).sin()).collect();
    let (service, _registry_dir) = service_with_city("Toronto", values);

    for kind in BackendKind::ALL {
        service.train(kind, "Toronto").unwrap();
        let forecast = service.forecast(kind, "toronto", 7).unwrap();

        assert_eq!(forecast.kind(), kind);
        assert_eq!(forecast.city(), "toronto");
        assert_eq!(forecast.horizon_days(), 7);
        assert_eq!(forecast.points().len(), 7);

        // Bands are a Monte Carlo exclusive.
        if kind == BackendKind::MonteCarlo {
            assert!(forecast.lower_band().is_some());
            assert!(forecast.upper_band().is_some());
        } else {
            assert!(forecast.lower_band().is_none());
            assert!(forecast.upper_band().is_none());
        }
    }
}

#[test]
fn forecast_before_train_is_not_found() {
    let (service, _registry_dir) =
        service_with_city("toronto", (0..30).map(|i| i as f64).collect());
    let result = service.forecast(BackendKind::Trend, "toronto", 7);
    assert!(matches!(
        result,
        Err(ForecastError::ArtifactNotFound { .. })
    ));
}

#[test]
fn unknown_city_surfaces_no_data() {
    let (service, _registry_dir) =
        service_with_city("toronto", (0..30).map(|i| i as f64).collect());
    let result = service.train(BackendKind::Arima, "atlantis");
    match result {
        Err(ForecastError::NoDataForCity(city)) => assert_eq!(city, "atlantis"),
        other => panic!("expected NoDataForCity, got {:?}", other),
    }
}

#[test]
fn short_series_keeps_its_insufficient_data_tag() {
    let (service, _registry_dir) = service_with_city("toronto", vec![1.0, 2.0, 3.0]);
    let result = service.train(BackendKind::Sequence, "toronto");
    // Data-shape failures are not wrapped as TrainingFailure: the caller
    // must fix the data, not retry.
    assert!(matches!(result, Err(ForecastError::InsufficientData(_))));
}

#[test]
fn train_many_isolates_failures_per_city() {
    let mut store = MemoryObservationStore::new();
    store.insert("toronto", series((0..30).map(|i| 10.0 + i as f64).collect()));
    store.insert("ottawa", series((0..30).map(|i| 8.0 + i as f64).collect()));
    let dir = tempdir().unwrap();
    let service = ForecastService::new(store, ModelRegistry::new(dir.path()).unwrap());

    let outcomes = service.train_many(BackendKind::Arima, &["toronto", "atlantis", "ottawa"]);
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].1.is_ok());
    assert!(outcomes[1].1.is_err());
    // The failure in the middle does not abort the batch.
    assert!(outcomes[2].1.is_ok());
    assert!(service.exists(BackendKind::Arima, "ottawa"));
}

#[test]
fn city_keys_are_case_insensitive() {
    let (service, _registry_dir) =
        service_with_city("Toronto", (0..30).map(|i| 15.0 + i as f64).collect());
    service.train(BackendKind::MonteCarlo, "TORONTO").unwrap();
    assert!(service.exists(BackendKind::MonteCarlo, "toronto"));
    assert!(service
        .forecast(BackendKind::MonteCarlo, "Toronto", 7)
        .is_ok());
}

#[test]
fn rounded_points_for_the_serving_layer() {
    let (service, _registry_dir) =
        service_with_city("toronto", (0..30).map(|i| 20.0 + 0.123 * i as f64).collect());
    service.train(BackendKind::Trend, "toronto").unwrap();
    let forecast = service.forecast(BackendKind::Trend, "toronto", 3).unwrap();

    for value in forecast.rounded_points(2) {
        assert_eq!((value * 100.0).round() / 100.0, value);
    }
}

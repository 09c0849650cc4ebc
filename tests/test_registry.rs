use chrono::{Days, NaiveDate};
use tempfile::tempdir;

use weathercast::models::arima::ArimaModel;
use weathercast::models::monte_carlo::MonteCarloModel;
use weathercast::{
    BackendKind, ForecastError, ForecastModel, ModelArtifact, ModelKey, ModelRegistry, ModelState,
    TimeSeries, TrainedForecastModel,
};

fn series(values: Vec<f64>) -> TimeSeries {
    let start = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
    let dates = (0..values.len() as u64)
        .map(|i| start + Days::new(i))
        .collect();
    TimeSeries::new(dates, values).unwrap()
}

fn arima_artifact(key: &ModelKey, data: &TimeSeries) -> ModelArtifact {
    let trained = ArimaModel::default().train(data).unwrap();
    ModelArtifact::new(key, data.len(), ModelState::Arima(trained)).unwrap()
}

#[test]
fn load_on_unknown_key_is_artifact_not_found() {
    let dir = tempdir().unwrap();
    let registry = ModelRegistry::new(dir.path()).unwrap();

    let result = registry.load(&ModelKey::new(BackendKind::Arima, "atlantis"));
    match result {
        Err(ForecastError::ArtifactNotFound { kind, city }) => {
            assert_eq!(kind, BackendKind::Arima);
            assert_eq!(city, "atlantis");
        }
        other => panic!("expected ArtifactNotFound, got {:?}", other),
    }
}

#[test]
fn save_then_load_round_trips_the_forecast() {
    let dir = tempdir().unwrap();
    let registry = ModelRegistry::new(dir.path()).unwrap();
    let data = series((1..=30).map(|i| i as f64).collect());

    let key = ModelKey::new(BackendKind::MonteCarlo, "toronto");
    let trained = MonteCarloModel::new(500)
        .unwrap()
        .with_seed(21)
        .train(&data)
        .unwrap();
    let in_memory = trained.forecast(7).unwrap();

    let artifact =
        ModelArtifact::new(&key, data.len(), ModelState::MonteCarlo(trained)).unwrap();
    registry.save(&artifact).unwrap();

    let loaded = registry.load(&key).unwrap();
    assert_eq!(loaded.training_len(), 30);
    let from_disk = match loaded.state() {
        ModelState::MonteCarlo(model) => model.forecast(7).unwrap(),
        other => panic!("wrong state kind: {:?}", other),
    };

    // Seeded RNG: persistence must lose no information.
    assert_eq!(in_memory.values(), from_disk.values());
    assert_eq!(in_memory.bands(), from_disk.bands());
}

#[test]
fn latest_save_supersedes_the_previous_artifact() {
    let dir = tempdir().unwrap();
    let registry = ModelRegistry::new(dir.path()).unwrap();
    let key = ModelKey::new(BackendKind::Arima, "toronto");

    let first = arima_artifact(&key, &series((1..=30).map(|i| i as f64).collect()));
    registry.save(&first).unwrap();
    assert_eq!(registry.load(&key).unwrap().training_len(), 30);

    let second = arima_artifact(&key, &series((1..=60).map(|i| i as f64).collect()));
    registry.save(&second).unwrap();

    // A load after the second save sees the post-state in full.
    let loaded = registry.load(&key).unwrap();
    assert_eq!(loaded.training_len(), 60);

    // The commit is rename-based: no temp file may linger.
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "stale temp files: {:?}", leftovers);
}

#[test]
fn interrupted_save_leaves_the_committed_artifact_intact() {
    let dir = tempdir().unwrap();
    let registry = ModelRegistry::new(dir.path()).unwrap();
    let key = ModelKey::new(BackendKind::Arima, "toronto");

    let artifact = arima_artifact(&key, &series((1..=30).map(|i| i as f64).collect()));
    registry.save(&artifact).unwrap();

    // A save that died before its rename leaves a partial temp file
    // next to the committed blob. It must be invisible to readers.
    std::fs::write(
        dir.path().join(format!("{}.tmp", key.file_name())),
        b"{\"backend\":\"ari",
    )
    .unwrap();

    assert!(registry.exists(&key));
    let loaded = registry.load(&key).unwrap();
    assert_eq!(loaded.training_len(), 30);
    assert_eq!(loaded.kind(), BackendKind::Arima);
}

#[test]
fn partial_temp_file_alone_is_not_an_artifact() {
    let dir = tempdir().unwrap();
    let registry = ModelRegistry::new(dir.path()).unwrap();
    let key = ModelKey::new(BackendKind::Trend, "ottawa");

    // Only the wreckage of an interrupted first save exists.
    std::fs::write(
        dir.path().join(format!("{}.tmp", key.file_name())),
        b"not json",
    )
    .unwrap();

    assert!(!registry.exists(&key));
    assert!(matches!(
        registry.load(&key),
        Err(ForecastError::ArtifactNotFound { .. })
    ));
}

#[test]
fn exists_without_loading() {
    let dir = tempdir().unwrap();
    let registry = ModelRegistry::new(dir.path()).unwrap();
    let key = ModelKey::new(BackendKind::Arima, "toronto");

    assert!(!registry.exists(&key));
    registry
        .save(&arima_artifact(&key, &series((1..=30).map(|i| i as f64).collect())))
        .unwrap();
    assert!(registry.exists(&key));
    // Keys are independent per backend kind.
    assert!(!registry.exists(&ModelKey::new(BackendKind::Trend, "toronto")));
}

#[test]
fn renamed_blob_is_detected_on_load() {
    let dir = tempdir().unwrap();
    let registry = ModelRegistry::new(dir.path()).unwrap();
    let key = ModelKey::new(BackendKind::Arima, "toronto");
    registry
        .save(&arima_artifact(&key, &series((1..=30).map(|i| i as f64).collect())))
        .unwrap();

    // Simulate an operator copying the blob onto another city's slot.
    let other = ModelKey::new(BackendKind::Arima, "ottawa");
    std::fs::copy(
        dir.path().join(key.file_name()),
        dir.path().join(other.file_name()),
    )
    .unwrap();

    let result = registry.load(&other);
    assert!(matches!(
        result,
        Err(ForecastError::ArtifactIncompatible(_))
    ));
}

#[test]
fn artifact_rejects_a_mismatched_state() {
    let data = series((1..=30).map(|i| i as f64).collect());
    let trained = ArimaModel::default().train(&data).unwrap();
    let wrong_key = ModelKey::new(BackendKind::Trend, "toronto");

    let result = ModelArtifact::new(&wrong_key, data.len(), ModelState::Arima(trained));
    assert!(matches!(
        result,
        Err(ForecastError::ArtifactIncompatible(_))
    ));
}

use cadence_core::{ConfigError, DetectionConfig};
use tempfile::TempDir;

#[test]
fn missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = DetectionConfig::load(&dir.path().join("absent.json")).unwrap();
    assert_eq!(config, DetectionConfig::default());
}

#[test]
fn partial_file_fills_in_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("detection.json");
    std::fs::write(&path, r#"{"fuzziness_days": 2, "max_search_depth": 4}"#).unwrap();

    let config = DetectionConfig::load(&path).unwrap();
    assert_eq!(config.fuzziness_days, 2);
    assert_eq!(config.max_search_depth, 4);
    assert_eq!(config.min_confidence_percent, 75);
    assert_eq!(config.candidate_sample, 10);
}

#[test]
fn save_then_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("detection.json");
    let config = DetectionConfig {
        recency_decay: 0.8,
        kmeans_restarts: 4,
        ..DetectionConfig::default()
    };
    config.save(&path).unwrap();
    assert_eq!(DetectionConfig::load(&path).unwrap(), config);
}

#[test]
fn malformed_json_is_a_serde_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("detection.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(DetectionConfig::load(&path), Err(ConfigError::Serde(_))));
}

#[test]
fn out_of_range_values_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("detection.json");
    std::fs::write(&path, r#"{"min_confidence_percent": 120}"#).unwrap();
    assert!(matches!(DetectionConfig::load(&path), Err(ConfigError::Invalid(_))));
}

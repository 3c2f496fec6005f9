use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::errors::ConfigError;

const CONFIG_DIR_NAME: &str = "cadence";
const CONFIG_FILE_NAME: &str = "detection.json";
const TMP_SUFFIX: &str = "tmp";

/// Tunables for matching, search, and validation. Every field is optional on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Maximum day difference when pairing a prediction with an observation.
    pub fuzziness_days: u32,
    /// Predictions start this many days before the earliest observation.
    pub lead_days: u32,
    /// Per-step weight decay for the recency-weighted match score.
    pub recency_decay: f64,
    pub min_confidence_percent: u32,
    /// Observed-matched percentage must be strictly above this value.
    pub min_observed_match_percent: u32,
    pub initial_window: usize,
    pub max_search_depth: usize,
    pub candidates_per_family: usize,
    /// How many of the most recent observations feed candidate extraction.
    pub candidate_sample: usize,
    pub revalidation_floor: usize,
    pub kmeans_restarts: usize,
    pub kmeans_max_iterations: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            fuzziness_days: 3,
            lead_days: 3,
            recency_decay: 0.9,
            min_confidence_percent: 75,
            min_observed_match_percent: 50,
            initial_window: 3,
            max_search_depth: 6,
            candidates_per_family: 3,
            candidate_sample: 10,
            revalidation_floor: 3,
            kmeans_restarts: 8,
            kmeans_max_iterations: 100,
        }
    }
}

impl DetectionConfig {
    /// `<config dir>/cadence/detection.json`, falling back to the working directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Reads a JSON config; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no detection config found, using defaults");
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        let config: DetectionConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the config next to `path` first, then renames it into place.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let json = serde_json::to_string_pretty(self)?;
        let tmp = tmp_path(path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, path)?;
        tracing::debug!(path = %path.display(), "detection config saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.recency_decay > 0.0 && self.recency_decay <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "recency_decay must be in (0, 1], got {}",
                self.recency_decay
            )));
        }
        if self.min_confidence_percent > 100 || self.min_observed_match_percent > 100 {
            return Err(ConfigError::Invalid(
                "percent thresholds must not exceed 100".into(),
            ));
        }
        if self.initial_window == 0 || self.candidates_per_family == 0 || self.candidate_sample == 0
        {
            return Err(ConfigError::Invalid(
                "initial_window, candidates_per_family and candidate_sample must be positive"
                    .into(),
            ));
        }
        if self.kmeans_restarts == 0 || self.kmeans_max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "k-means restarts and iterations must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

//! Loader configuration.
//!
//! A [`LoaderConfig`] can be built three ways, later sources overriding
//! earlier ones in the binary:
//!
//! 1. [`LoaderConfig::default`] - `./data`, one worker per CPU
//! 2. [`LoaderConfig::from_json_file`] - a JSON document with any subset of
//!    the fields
//! 3. [`LoaderConfig::apply_env`] - `CINEGRAPH_*` variables, after `.env`
//!    has been loaded
//!
//! The filter rules are configuration too; their defaults are the constants
//! below.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::datasets::Dataset;
use crate::error::{ConfigError, ConfigResult};
use crate::pipeline::PipelineOptions;

// =============================================================================
// Defaults
// =============================================================================

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_REGIONS: [&str; 2] = ["us", "ru"];
pub const DEFAULT_LANGUAGES: [&str; 2] = ["en", "ru"];
pub const DEFAULT_ROLES: [&str; 3] = ["director", "actor", "actress"];
pub const DEFAULT_RELEVANCE_THRESHOLD: f64 = 0.5;
pub const DEFAULT_ERROR_REPORT_LIMIT: usize = 5;

pub const ENV_DATA_DIR: &str = "CINEGRAPH_DATA_DIR";
pub const ENV_WORKERS: &str = "CINEGRAPH_WORKERS";
pub const ENV_CHANNEL_CAPACITY: &str = "CINEGRAPH_CHANNEL_CAPACITY";
pub const ENV_RELEVANCE_THRESHOLD: &str = "CINEGRAPH_RELEVANCE_THRESHOLD";

// =============================================================================
// Filter Rules
// =============================================================================

/// Which raw lines survive the filter stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRules {
    /// Accepted movie regions (case-insensitive).
    pub regions: Vec<String>,
    /// Accepted movie languages (case-insensitive).
    pub languages: Vec<String>,
    /// Role categories that produce edges.
    pub roles: Vec<String>,
    /// A tag attaches only when its relevance is strictly greater.
    pub relevance_threshold: f64,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            regions: to_strings(&DEFAULT_REGIONS),
            languages: to_strings(&DEFAULT_LANGUAGES),
            roles: to_strings(&DEFAULT_ROLES),
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

// =============================================================================
// Loader Config
// =============================================================================

/// Everything the loader needs to know before phase 1 starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Directory holding the seven input files.
    pub data_dir: PathBuf,

    /// File name overrides, relative to `data_dir` unless absolute.
    pub files: HashMap<Dataset, PathBuf>,

    /// Fan-out width of the filter, parse and merge stages.
    pub workers: usize,

    /// Capacity of every bounded channel; per-dataset defaults when unset.
    pub channel_capacity: Option<usize>,

    /// Skipped records reported individually per dataset.
    pub error_report_limit: usize,

    pub rules: FilterRules,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            files: HashMap::new(),
            workers: num_cpus::get(),
            channel_capacity: None,
            error_report_limit: DEFAULT_ERROR_REPORT_LIMIT,
            rules: FilterRules::default(),
        }
    }
}

impl LoaderConfig {
    /// Default configuration rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `CINEGRAPH_*` variables (and `.env`).
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from the process environment, loading `.env` first.
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        let _ = dotenvy::dotenv();
        self.apply_vars(|key| env::var(key).ok())
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<()> {
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_WORKERS) {
            self.workers = parse_setting("workers", &raw)?;
        }
        if let Some(raw) = lookup(ENV_CHANNEL_CAPACITY) {
            self.channel_capacity = Some(parse_setting("channel_capacity", &raw)?);
        }
        if let Some(raw) = lookup(ENV_RELEVANCE_THRESHOLD) {
            self.rules.relevance_threshold = parse_setting("relevance_threshold", &raw)?;
        }
        self.validate()
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.workers == 0 {
            return Err(invalid("workers", "must be at least 1"));
        }
        if self.channel_capacity == Some(0) {
            return Err(invalid("channel_capacity", "must be at least 1"));
        }
        let threshold = self.rules.relevance_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(invalid(
                "relevance_threshold",
                format!("{threshold} is outside 0.0..=1.0"),
            ));
        }
        Ok(())
    }

    /// Resolved path of a dataset file.
    pub fn path_for(&self, dataset: Dataset) -> PathBuf {
        match self.files.get(&dataset) {
            Some(file) => self.data_dir.join(file),
            None => self.data_dir.join(dataset.default_file_name()),
        }
    }

    /// Input files that do not exist, in dataset order.
    pub fn missing_sources(&self) -> Vec<PathBuf> {
        Dataset::ALL
            .into_iter()
            .map(|d| self.path_for(d))
            .filter(|p| !p.is_file())
            .collect()
    }

    pub fn capacity_for(&self, dataset: Dataset) -> usize {
        self.channel_capacity.unwrap_or_else(|| dataset.default_capacity())
    }

    pub fn pipeline_options(&self, dataset: Dataset) -> PipelineOptions {
        PipelineOptions {
            workers: self.workers,
            capacity: self.capacity_for(dataset),
            error_report_limit: self.error_report_limit,
        }
    }
}

fn parse_setting<T: std::str::FromStr>(setting: &'static str, raw: &str) -> ConfigResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| invalid(setting, format!("'{raw}' is not a valid number")))
}

fn invalid(setting: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        setting,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = LoaderConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.workers >= 1);
        assert_eq!(config.rules.relevance_threshold, 0.5);
        assert_eq!(
            config.path_for(Dataset::Ratings),
            PathBuf::from("data").join("Ratings_IMDB.tsv")
        );
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = LoaderConfig {
            workers: 0,
            ..LoaderConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("workers"));
    }

    #[test]
    fn test_validate_rejects_threshold_out_of_range() {
        let mut config = LoaderConfig::default();
        config.rules.relevance_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_vars_overrides() {
        let mut config = LoaderConfig::default();
        config
            .apply_vars(|key| match key {
                ENV_DATA_DIR => Some("/srv/imdb".into()),
                ENV_WORKERS => Some("3".into()),
                ENV_CHANNEL_CAPACITY => Some("64".into()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/imdb"));
        assert_eq!(config.workers, 3);
        assert_eq!(config.capacity_for(Dataset::Movies), 64);
        assert_eq!(config.capacity_for(Dataset::IdLinks), 64);
    }

    #[test]
    fn test_apply_vars_rejects_garbage() {
        let mut config = LoaderConfig::default();
        let err = config
            .apply_vars(|key| (key == ENV_WORKERS).then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { setting: "workers", .. }));
    }

    #[test]
    fn test_from_json_file_partial() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cinegraph.json");
        std::fs::write(
            &path,
            r#"{
                "data_dir": "/tmp/movies",
                "workers": 2,
                "files": { "ratings": "ratings-2024.tsv" },
                "rules": { "relevance_threshold": 0.7 }
            }"#,
        )
        .unwrap();

        let config = LoaderConfig::from_json_file(&path).unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.rules.relevance_threshold, 0.7);
        assert_eq!(config.rules.roles.len(), 3);
        assert_eq!(
            config.path_for(Dataset::Ratings),
            PathBuf::from("/tmp/movies/ratings-2024.tsv")
        );
        assert_eq!(config.error_report_limit, DEFAULT_ERROR_REPORT_LIMIT);
    }

    #[test]
    fn test_missing_sources() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("MovieCodes_IMDB.tsv"), "header\n").unwrap();

        let config = LoaderConfig::with_data_dir(dir.path());
        let missing = config.missing_sources();
        assert_eq!(missing.len(), 6);
        assert!(!missing.iter().any(|p| p.ends_with("MovieCodes_IMDB.tsv")));
    }
}

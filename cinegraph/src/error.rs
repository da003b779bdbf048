//! Error types for the cinegraph loading pipeline.
//!
//! The hierarchy mirrors the two failure classes of a load:
//!
//! - [`SourceError`] - a dataset file cannot be opened or read (fatal)
//! - [`RecordError`] - a single line is malformed (recoverable, counted)
//! - [`ConfigError`] - the loader configuration is unusable (fatal)
//! - [`LoadError`] - top-level orchestration errors returned by the loader
//! - [`ExportError`] - snapshot export failures
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::datasets::Dataset;
use crate::pipeline::Stage;

// =============================================================================
// Source Errors
// =============================================================================

/// Errors while opening or streaming a dataset file.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The file could not be opened.
    #[error("Cannot open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading failed part-way through the file.
    #[error("Read failed in '{path}' after line {line}: {source}")]
    Read {
        path: PathBuf,
        line: usize,
        #[source]
        source: std::io::Error,
    },

    /// The file has no header line.
    #[error("'{0}' is empty (no header line)")]
    Empty(PathBuf),
}

// =============================================================================
// Record Errors (recoverable)
// =============================================================================

/// A malformed input line.
///
/// Record errors never abort a load. The coordinator counts them and reports
/// the first few individually.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordError {
    pub line: usize,
    pub field: Option<&'static str>,
    pub value: Option<String>,
    pub message: String,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.field, &self.value) {
            (Some(field), Some(value)) => {
                write!(f, "Line {}, field '{}' (value '{}'): {}", self.line, field, value, self.message)
            }
            (Some(field), None) => {
                write!(f, "Line {}, field '{}': {}", self.line, field, self.message)
            }
            _ => write!(f, "Line {}: {}", self.line, self.message),
        }
    }
}

impl std::error::Error for RecordError {}

impl RecordError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            field: None,
            value: None,
            message: message.into(),
        }
    }

    /// Shorthand for a field that is absent from the line.
    pub fn missing(line: usize, field: &'static str) -> Self {
        Self::new(line, "missing field").with_field(field)
    }

    pub fn with_field(mut self, field: &'static str) -> Self {
        self.field = Some(field);
        self
    }

    /// Attach the offending raw value, truncated to keep log lines short.
    pub fn with_value(mut self, value: &str) -> Self {
        let mut end = value.len().min(64);
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        self.value = Some(value[..end].to_string());
        self
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors in the loader configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric setting is outside its accepted range.
    #[error("Invalid value for '{setting}': {message}")]
    InvalidValue { setting: &'static str, message: String },

    /// Config file could not be read.
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for [`crate::config::LoaderConfig`].
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Load Errors (top-level)
// =============================================================================

/// Fatal errors of a load.
///
/// This is the error type returned by [`crate::loader::load`]. Every variant
/// names the dataset (and where relevant the stage) that failed.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A dataset source failed to open or read.
    #[error("{dataset} source failed: {source}")]
    Source {
        dataset: Dataset,
        #[source]
        source: SourceError,
    },

    /// A worker thread panicked.
    #[error("{dataset} pipeline ({}): {stage} stage panicked", .path.display())]
    StagePanicked {
        dataset: Dataset,
        path: PathBuf,
        stage: Stage,
    },

    /// Input files are absent; checked before phase 1 starts.
    #[error("Missing input files: {}", display_paths(.0))]
    MissingSources(Vec<PathBuf>),

    /// Configuration rejected.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing a graph snapshot.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Filesystem error.
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer error.
    #[error("Export CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Report serialization error.
    #[error("Export JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for single-record parsing.
pub type RecordResult<T> = Result<T, RecordError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for loads.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for exports.
pub type ExportResult<T> = Result<T, ExportError>;

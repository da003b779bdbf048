//! # Cinegraph - concurrent IMDb / MovieLens graph loader
//!
//! Cinegraph streams seven flat-file exports (IMDb titles, names, roles and
//! ratings; MovieLens tags, tag scores and id links) through per-dataset
//! pipelines and joins them into one in-memory graph of movies, people and
//! tags.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐    ┌────────┐    ┌────────┐    ┌────────┐    ┌─────────────┐
//! │ TSV / CSV  │───▶│ source │───▶│ filter │───▶│ parse  │───▶│    merge    │
//! │  7 files   │    │ 1 thr  │    │ N thr  │    │ N thr  │    │ EntityGraph │
//! └────────────┘    └────────┘    └────────┘    └────────┘    └──────┬──────┘
//!                        bounded channels between every stage        │ freeze
//!                                                              ┌──────▼──────┐
//!                                                              │ MovieGraph  │
//!                                                              │ + indexes   │
//!                                                              └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cinegraph::{load, LoaderConfig};
//!
//! let loaded = load(&LoaderConfig::with_data_dir("data"))?;
//! let stats = loaded.graph.stats();
//! println!("{} movies, {} rated", stats.movies, stats.rated_movies);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`config`] - Loader configuration and filter rules
//! - [`models`] - Live entities and surrogate ids
//! - [`parser`] - Field extraction and typed record parsers
//! - [`datasets`] - Dataset descriptors, filters and pipeline bindings
//! - [`pipeline`] - Source, stage boundaries and the pipeline coordinator
//! - [`graph`] - Concurrent graph, merge operations, frozen graph, indexes
//! - [`loader`] - Two-phase load
//! - [`observe`] / [`report`] - Progress events and load reports
//! - [`export`] - CSV snapshot and JSON report output
//! - [`views`] - Text views used by the CLI

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Pipeline
pub mod datasets;
pub mod pipeline;

// Graph
pub mod graph;

// Orchestration
pub mod loader;
pub mod observe;
pub mod report;

// Output
pub mod export;
pub mod views;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, ExportError, LoadError, LoadResult, RecordError, SourceError,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{FilterRules, LoaderConfig};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Movie, MovieId, Person, PersonDetails, PersonId, Role, Tag, TagId};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use datasets::{Dataset, Phase};
pub use pipeline::{BoundaryState, Line, Pipeline, PipelineOptions, Stage};

// =============================================================================
// Re-exports - Graph
// =============================================================================

pub use graph::{
    Asymmetry, EntityGraph, GraphIndexes, GraphStats, MergeOutcome, MovieGraph, MovieNode,
    PersonNode, TagNode,
};

// =============================================================================
// Re-exports - Loader
// =============================================================================

pub use loader::{load, load_with_observer, LoadedGraph};
pub use observe::{EventLog, LoadEvent, LoadObserver, NoopObserver, TracingObserver};
pub use report::{DatasetReport, LoadReport, RecordCounts};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{write_csv_snapshot, write_report_json};

//! High-level load API: seven files in, one frozen graph out.
//!
//! ```text
//! phase 1 (entities)    movies ─┐
//!                       people ─┼─► EntityGraph ── join ──┐
//!                    tag codes ─┤                         │
//!                     id links ─┘                         ▼
//! phase 2 (relations)  ratings ─┐
//!                   role links ─┼─► EntityGraph ── join ──► freeze
//!                   tag scores ─┘                          + indexes
//! ```
//!
//! Pipelines within a phase run concurrently. Phase 2 starts only after
//! every phase-1 pipeline has been joined, so relation records never race
//! the creation of the entities they point to.
//!
//! # Example
//!
//! ```rust,ignore
//! use cinegraph::{load, LoaderConfig};
//!
//! let loaded = load(&LoaderConfig::with_data_dir("data"))?;
//! println!("{} movies", loaded.graph.movies().len());
//! ```

use std::thread;
use std::time::Instant;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::config::LoaderConfig;
use crate::datasets::{self, Dataset, Phase};
use crate::error::{LoadError, LoadResult};
use crate::graph::{EntityGraph, GraphIndexes, MovieGraph};
use crate::observe::{LoadEvent, LoadObserver, TracingObserver};
use crate::pipeline::Stage;
use crate::report::{DatasetReport, LoadReport, PhaseReport};

/// Result of a successful load.
#[derive(Debug, Clone)]
pub struct LoadedGraph {
    pub graph: MovieGraph,
    pub indexes: GraphIndexes,
    pub report: LoadReport,
}

/// Load every dataset described by `config`, logging through `tracing`.
pub fn load(config: &LoaderConfig) -> LoadResult<LoadedGraph> {
    load_with_observer(config, &TracingObserver)
}

/// Load every dataset, reporting progress to `observer`.
///
/// Fails before any pipeline starts if the configuration is invalid or an
/// input file is missing.
pub fn load_with_observer(
    config: &LoaderConfig,
    observer: &dyn LoadObserver,
) -> LoadResult<LoadedGraph> {
    config.validate()?;
    let missing = config.missing_sources();
    if !missing.is_empty() {
        return Err(LoadError::MissingSources(missing));
    }

    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    debug!(%run_id, data_dir = %config.data_dir.display(), "load started");

    let graph = EntityGraph::new();
    let mut phases = Vec::new();
    let mut datasets = Vec::new();
    for phase in Phase::ALL {
        let (timing, reports) = run_phase(phase, &graph, config, observer)?;
        phases.push(timing);
        datasets.extend(reports);
    }

    let graph = graph.freeze();
    let indexes = GraphIndexes::build(&graph);
    let report = LoadReport {
        run_id,
        started_at,
        finished_at: Utc::now(),
        workers: config.workers,
        phases,
        datasets,
        stats: graph.stats(),
    };

    Ok(LoadedGraph {
        graph,
        indexes,
        report,
    })
}

/// Run all pipelines of one phase concurrently and wait for all of them.
///
/// Every pipeline is joined even when one fails; the first failure in
/// dataset order is returned.
pub fn run_phase(
    phase: Phase,
    graph: &EntityGraph,
    config: &LoaderConfig,
    observer: &dyn LoadObserver,
) -> LoadResult<(PhaseReport, Vec<DatasetReport>)> {
    let members = phase.datasets();
    observer.on_event(&LoadEvent::PhaseStarted {
        phase,
        datasets: members.clone(),
    });
    let started = Instant::now();

    let results: Vec<LoadResult<DatasetReport>> = thread::scope(|s| {
        let handles: Vec<(Dataset, _)> = members
            .iter()
            .map(|&dataset| {
                let handle = s.spawn(move || datasets::load_dataset(dataset, graph, config, observer));
                (dataset, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(dataset, handle)| {
                handle.join().unwrap_or_else(|_| {
                    Err(LoadError::StagePanicked {
                        dataset,
                        path: config.path_for(dataset),
                        stage: Stage::Coordinator,
                    })
                })
            })
            .collect()
    });

    let reports = results.into_iter().collect::<LoadResult<Vec<_>>>()?;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    observer.on_event(&LoadEvent::PhaseFinished { phase, elapsed_ms });

    Ok((
        PhaseReport {
            phase,
            datasets: members,
            elapsed_ms,
        },
        reports,
    ))
}

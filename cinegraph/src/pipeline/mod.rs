//! Per-dataset streaming pipeline.
//!
//! ```text
//!  ┌────────┐ lines ┌────────┐ accepted ┌────────┐ parsed ┌────────┐
//!  │ source │──────►│ filter │─────────►│ parse  │───────►│ merge  │──► graph
//!  │ 1 thr  │       │ N thr  │          │ N thr  │        │ N thr  │
//!  └────────┘       └────────┘          └────────┘        └────────┘
//! ```
//!
//! Every arrow is a bounded channel, the only backpressure mechanism: a fast
//! source blocks as soon as the slowest downstream stage falls `capacity`
//! items behind. Datasets without a filter connect the source directly to
//! the parse stage.
//!
//! All workers run on scoped threads, so the closures may borrow the graph
//! and the configuration. A panicking worker is reported as
//! [`LoadError::StagePanicked`] once the whole pipeline has been joined.

pub mod source;
pub mod stage;

pub use source::{detect_encoding, Line, LineSource};
pub use stage::{BoundaryMonitor, BoundaryState, Inlet, Outlet, Stage};

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, ScopedJoinHandle};
use std::time::Instant;

use crate::datasets::Dataset;
use crate::error::{LoadError, LoadResult, RecordError, RecordResult};
use crate::graph::MergeOutcome;
use crate::observe::{LoadEvent, LoadObserver};
use crate::report::{DatasetReport, StageCounters};

// =============================================================================
// Options
// =============================================================================

/// Shape of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Workers per fan-out stage.
    pub workers: usize,
    /// Capacity of every boundary channel.
    pub capacity: usize,
    /// Skipped records reported individually.
    pub error_report_limit: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            capacity: 10_000,
            error_report_limit: 5,
        }
    }
}

type LineFilter<'a> = Box<dyn Fn(&str) -> bool + Send + Sync + 'a>;

// =============================================================================
// Pipeline
// =============================================================================

/// Source → (filter) → parse → merge for one dataset file.
pub struct Pipeline<'a> {
    dataset: Dataset,
    path: &'a Path,
    options: PipelineOptions,
    filter: Option<LineFilter<'a>>,
}

impl<'a> Pipeline<'a> {
    pub fn new(dataset: Dataset, path: &'a Path, options: PipelineOptions) -> Self {
        Self {
            dataset,
            path,
            options,
            filter: None,
        }
    }

    /// Insert a filter stage that drops raw lines failing `predicate`.
    pub fn with_filter(mut self, predicate: impl Fn(&str) -> bool + Send + Sync + 'a) -> Self {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Run the pipeline to completion.
    ///
    /// Opening the file happens before any thread is spawned, so a missing
    /// source fails fast. Malformed lines are counted, never fatal.
    pub fn run<T, P, M>(
        self,
        observer: &dyn LoadObserver,
        parse: P,
        merge: M,
    ) -> LoadResult<DatasetReport>
    where
        T: Send,
        P: Fn(&Line) -> RecordResult<T> + Sync,
        M: Fn(T) -> MergeOutcome + Sync,
    {
        let dataset = self.dataset;
        let path = self.path;
        let PipelineOptions {
            workers,
            capacity,
            error_report_limit,
        } = self.options;
        let workers = workers.max(1);

        let source = LineSource::open(self.path)
            .map_err(|source| LoadError::Source { dataset, source })?;

        observer.on_event(&LoadEvent::DatasetStarted {
            dataset,
            path: self.path.to_path_buf(),
            workers,
            capacity,
        });
        let started = Instant::now();

        let lines = BoundaryMonitor::new(dataset, "lines", capacity);
        let accepted = BoundaryMonitor::new(dataset, "accepted", capacity);
        let parsed = BoundaryMonitor::new(dataset, "parsed", capacity);
        let counters = StageCounters::default();
        let skips = SkipReporter::new(dataset, error_report_limit, observer);

        let filter = self.filter.as_deref();
        let (counters, skips, parse, merge) = (&counters, &skips, &parse, &merge);

        let outcome = thread::scope(|s| {
            let mut workers_by_stage: Vec<(Stage, ScopedJoinHandle<'_, ()>)> = Vec::new();

            let (line_out, line_in) = lines.channel::<Line>();
            let source_handle = s.spawn(move || source.pump(line_out, &counters.read));

            // Filter stage (optional)
            let parse_in = match filter {
                Some(predicate) => {
                    let (out, inlet) = accepted.channel::<Line>();
                    for _ in 0..workers {
                        let (input, out) = (line_in.clone(), out.clone());
                        workers_by_stage.push((Stage::Filter, s.spawn(move || {
                            while let Some(line) = input.recv() {
                                if !predicate(&line.text) {
                                    StageCounters::bump(&counters.rejected);
                                    continue;
                                }
                                StageCounters::bump(&counters.accepted);
                                if !out.send(line) {
                                    break;
                                }
                            }
                        })));
                    }
                    drop(line_in);
                    inlet
                }
                None => line_in,
            };

            // Parse stage
            let (record_out, merge_in) = parsed.channel::<T>();
            for _ in 0..workers {
                let (input, out) = (parse_in.clone(), record_out.clone());
                workers_by_stage.push((Stage::Parse, s.spawn(move || {
                    while let Some(line) = input.recv() {
                        match parse(&line) {
                            Ok(record) => {
                                StageCounters::bump(&counters.parsed);
                                if !out.send(record) {
                                    break;
                                }
                            }
                            Err(err) => {
                                StageCounters::bump(&counters.skipped);
                                skips.report(err);
                            }
                        }
                    }
                })));
            }
            drop(parse_in);
            drop(record_out);

            // Merge stage
            for _ in 0..workers {
                let input = merge_in.clone();
                workers_by_stage.push((Stage::Merge, s.spawn(move || {
                    while let Some(record) = input.recv() {
                        counters.record(merge(record));
                    }
                })));
            }
            drop(merge_in);

            let source_result = source_handle.join();
            let mut panicked = None;
            for (stage, handle) in workers_by_stage {
                if handle.join().is_err() && panicked.is_none() {
                    panicked = Some(stage);
                }
            }

            match source_result {
                Err(_) => Err(LoadError::StagePanicked {
                    dataset,
                    path: path.to_path_buf(),
                    stage: Stage::Source,
                }),
                Ok(Err(source)) => Err(LoadError::Source { dataset, source }),
                Ok(Ok(())) => match panicked {
                    Some(stage) => Err(LoadError::StagePanicked {
                        dataset,
                        path: path.to_path_buf(),
                        stage,
                    }),
                    None => Ok(()),
                },
            }
        });
        outcome?;

        let mut boundaries = vec![lines.snapshot()];
        if filter.is_some() {
            boundaries.push(accepted.snapshot());
        }
        boundaries.push(parsed.snapshot());

        let report = DatasetReport {
            dataset,
            path: self.path.to_path_buf(),
            workers,
            counts: counters.snapshot(filter.is_some()),
            boundaries,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        observer.on_event(&LoadEvent::DatasetFinished {
            report: report.clone(),
        });
        Ok(report)
    }
}

// =============================================================================
// Skip Reporting
// =============================================================================

/// Counts malformed lines and reports the first few to the observer.
struct SkipReporter<'a> {
    dataset: Dataset,
    limit: usize,
    seen: AtomicUsize,
    observer: &'a dyn LoadObserver,
}

impl<'a> SkipReporter<'a> {
    fn new(dataset: Dataset, limit: usize, observer: &'a dyn LoadObserver) -> Self {
        Self {
            dataset,
            limit,
            seen: AtomicUsize::new(0),
            observer,
        }
    }

    fn report(&self, err: RecordError) {
        if self.seen.fetch_add(1, Ordering::Relaxed) < self.limit {
            self.observer.on_event(&LoadEvent::RecordSkipped {
                dataset: self.dataset,
                line: err.line,
                message: err.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::{EventLog, NoopObserver};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn numbers_file(count: usize) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "value").unwrap();
        for i in 0..count {
            writeln!(file, "{i}").unwrap();
        }
        file
    }

    fn parse_number(line: &Line) -> RecordResult<u64> {
        line.text
            .parse()
            .map_err(|_| RecordError::new(line.number, "not a number").with_value(&line.text))
    }

    #[test]
    fn test_unfiltered_pipeline_has_two_boundaries() {
        let file = numbers_file(500);
        let total = AtomicUsize::new(0);
        let options = PipelineOptions { workers: 3, capacity: 8, error_report_limit: 5 };

        let report = Pipeline::new(Dataset::IdLinks, file.path(), options)
            .run(&NoopObserver, parse_number, |n| {
                total.fetch_add(n as usize, Ordering::Relaxed);
                MergeOutcome::Inserted
            })
            .unwrap();

        assert_eq!(total.load(Ordering::Relaxed), (0..500).sum::<usize>());
        assert_eq!(report.counts.read, 500);
        assert_eq!(report.counts.accepted, 500);
        assert_eq!(report.counts.inserted, 500);
        let names: Vec<&str> = report.boundaries.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["lines", "parsed"]);
    }

    #[test]
    fn test_skip_reports_are_capped() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "value").unwrap();
        for _ in 0..20 {
            writeln!(file, "x").unwrap();
        }
        let log = EventLog::new();
        let options = PipelineOptions { workers: 2, capacity: 4, error_report_limit: 3 };

        let report = Pipeline::new(Dataset::Ratings, file.path(), options)
            .run(&log, parse_number, |_| MergeOutcome::Updated)
            .unwrap();

        assert_eq!(report.counts.skipped, 20);
        assert_eq!(report.counts.parsed, 0);
        assert_eq!(log.skipped(Dataset::Ratings).len(), 3);
    }

    #[test]
    fn test_empty_file_is_a_source_error() {
        let file = NamedTempFile::new().unwrap();
        let err = Pipeline::new(Dataset::People, file.path(), PipelineOptions::default())
            .run(&NoopObserver, parse_number, |_| MergeOutcome::Inserted)
            .unwrap_err();
        assert!(matches!(err, LoadError::Source { dataset: Dataset::People, .. }));
    }
}

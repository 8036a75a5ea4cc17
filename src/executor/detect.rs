// Divide-and-conquer execution of a batch of detector workers
use super::progress::ProgressTracker;
use crate::error::Result;
use crate::model::{DetectorWorker, RawResult};
use std::sync::Arc;

/// Runs each worker of a batch exactly once, in parallel
///
/// Ranges longer than the split threshold are halved and both halves run
/// through `rayon::join`; ranges at or below it run sequentially. The split
/// threshold only affects scheduling: the set of results is the same for any
/// threshold.
pub struct DetectionTask {
    workers: Vec<Box<dyn DetectorWorker>>,
    threshold: usize,
    progress: Arc<dyn ProgressTracker>,
}

impl DetectionTask {
    /// Create a task over `workers`
    ///
    /// # Arguments
    /// * `workers` - Workers to execute, each exactly once
    /// * `threshold` - Largest range run sequentially; clamped to at least 1
    /// * `progress` - Incremented once per processed worker
    pub fn new(
        workers: Vec<Box<dyn DetectorWorker>>,
        threshold: usize,
        progress: Arc<dyn ProgressTracker>,
    ) -> Self {
        Self {
            workers,
            threshold: threshold.max(1),
            progress,
        }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Execute all workers and collect their non-empty results
    ///
    /// Result order is unspecified. The first worker error fails the whole
    /// task; results of workers that did succeed are discarded.
    pub fn compute(mut self) -> Result<Vec<Arc<dyn RawResult>>> {
        tracing::debug!(
            "Running {} detector workers (split threshold {})",
            self.workers.len(),
            self.threshold
        );
        run_range(&mut self.workers, self.threshold, self.progress.as_ref())
    }
}

fn run_range(
    workers: &mut [Box<dyn DetectorWorker>],
    threshold: usize,
    progress: &dyn ProgressTracker,
) -> Result<Vec<Arc<dyn RawResult>>> {
    if workers.len() > threshold {
        let middle = workers.len() / 2;
        let (left, right) = workers.split_at_mut(middle);

        let (left, right) = rayon::join(
            || run_range(left, threshold, progress),
            || run_range(right, threshold, progress),
        );

        let mut results = right?;
        results.extend(left?);
        return Ok(results);
    }

    let mut results = Vec::with_capacity(workers.len());
    for worker in workers.iter_mut() {
        if let Some(raw) = run_worker(worker.as_mut())? {
            results.push(raw);
        }
        progress.increment_progress();
    }
    Ok(results)
}

fn run_worker(worker: &mut dyn DetectorWorker) -> Result<Option<Arc<dyn RawResult>>> {
    if let Err(e) = worker.execute() {
        tracing::warn!("Detector worker '{}' failed: {}", worker.name(), e);
        return Err(e);
    }
    tracing::trace!("Detector worker '{}' finished", worker.name());
    Ok(worker.raw_result())
}

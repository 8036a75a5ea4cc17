// Shared progress counter for detection jobs
use std::sync::atomic::{AtomicUsize, Ordering};

/// Write-only progress sink used by detection tasks
///
/// Incremented once per processed worker from many leaf tasks at once, so
/// implementations must tolerate concurrent, unordered calls.
pub trait ProgressTracker: Send + Sync {
    fn increment_progress(&self);
}

/// Atomic progress counter for one job
#[derive(Debug, Default)]
pub struct JobProgress {
    total: usize,
    processed: AtomicUsize,
}

impl JobProgress {
    /// Create a tracker expecting `total` workers
    pub fn new(total: usize) -> Self {
        Self {
            total,
            processed: AtomicUsize::new(0),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Acquire)
    }

    /// Fraction of workers processed, 1.0 for an empty job
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        (self.processed() as f32 / self.total as f32).min(1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.processed() >= self.total
    }
}

impl ProgressTracker for JobProgress {
    fn increment_progress(&self) {
        let done = self.processed.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::trace!("Progress {}/{}", done, self.total);
    }
}

// Detector worker contract and the polymorphic raw result it yields
use crate::error::Result;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Per-algorithm accumulator of matches produced during detection
///
/// Concrete variants are later merged and aggregated by the caller. Before
/// merging two results, callers check `test_type` against a baseline.
pub trait RawResult: fmt::Display + Send + Sync + 'static {
    /// True when no matches have been recorded
    fn is_empty(&self) -> bool;

    /// Number of matches recorded
    fn size(&self) -> usize;

    /// True if `baseline` is the same concrete variant carrying the same
    /// payload type. A mismatch is a signal, never an error.
    fn test_type(&self, baseline: &dyn RawResult) -> bool;

    /// Downcasting hook for `test_type` and for callers merging results
    fn as_any(&self) -> &dyn Any;
}

/// A pluggable unit performing one comparison step
///
/// A worker is executed exactly once and yields at most one raw result.
/// Several workers may share the same result (e.g. a match record for one
/// file pair), which is why results are reference counted.
pub trait DetectorWorker: Send {
    /// Name used in logs and error messages
    fn name(&self) -> &str {
        "detector"
    }

    /// Run the comparison. Errors fail the enclosing detection task.
    fn execute(&mut self) -> Result<()>;

    /// Result produced by `execute`, if any
    fn raw_result(&self) -> Option<Arc<dyn RawResult>>;
}

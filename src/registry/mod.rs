//! Explicit detector registry
//!
//! Detectors are registered by id at startup; nothing is discovered at
//! runtime. The engine looks detectors up here to build the workers of a
//! detection job.

use crate::error::{Result, SherlockError};
use crate::model::{DetectorWorker, SourceFile};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A similarity detection algorithm
///
/// The detector splits a comparison over `files` into independent workers;
/// how it tokenizes or hashes the files is its own business.
pub trait Detector: Send + Sync {
    /// Human readable name for logs
    fn name(&self) -> &str;

    /// Build the workers comparing `files`
    fn build_workers(&self, files: &[Arc<SourceFile>]) -> Result<Vec<Box<dyn DetectorWorker>>>;
}

/// Registered detectors keyed by capability id
#[derive(Default, Clone)]
pub struct DetectorRegistry {
    detectors: BTreeMap<String, Arc<dyn Detector>>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a detector under `id`
    ///
    /// # Errors
    /// `DuplicateDetector` if `id` is already taken
    pub fn register(&mut self, id: impl Into<String>, detector: Arc<dyn Detector>) -> Result<()> {
        let id = id.into();
        if self.detectors.contains_key(&id) {
            return Err(SherlockError::DuplicateDetector(id));
        }

        tracing::info!("Registering detector: {} ({})", id, detector.name());
        self.detectors.insert(id, detector);
        Ok(())
    }

    /// Look up a detector by id
    pub fn get(&self, id: &str) -> Result<Arc<dyn Detector>> {
        self.detectors
            .get(id)
            .cloned()
            .ok_or_else(|| SherlockError::UnknownDetector(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.detectors.contains_key(id)
    }

    /// Registered ids in sorted order
    pub fn ids(&self) -> Vec<&str> {
        self.detectors.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullDetector;

    impl Detector for NullDetector {
        fn name(&self) -> &str {
            "null"
        }

        fn build_workers(
            &self,
            _files: &[Arc<SourceFile>],
        ) -> Result<Vec<Box<dyn DetectorWorker>>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = DetectorRegistry::new();
        registry.register("null", Arc::new(NullDetector)).unwrap();
        registry.register("another", Arc::new(NullDetector)).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids(), vec!["another", "null"]);
        assert_eq!(registry.get("null").unwrap().name(), "null");
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = DetectorRegistry::new();
        registry.register("null", Arc::new(NullDetector)).unwrap();

        let result = registry.register("null", Arc::new(NullDetector));
        assert!(matches!(result, Err(SherlockError::DuplicateDetector(id)) if id == "null"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_detector() {
        let registry = DetectorRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.get("ngram"),
            Err(SherlockError::UnknownDetector(_))
        ));
    }
}

//! Detection engine
//!
//! Ties the pieces together: registered detectors build workers for a set of
//! files, the workers run as one prioritized detection job, and collected
//! matches are grouped and scored afterwards.

use crate::config::Config;
use crate::error::Result;
use crate::executor::{DetectionTask, JobHandle, JobProgress, Priority, PriorityWorkScheduler};
use crate::model::{DetectorWorker, Match, RawResult, SourceFile};
use crate::registry::DetectorRegistry;
use crate::scoring::{group_matches, score_groups, CodeBlockGroup, MatchScorer};
use std::sync::Arc;

/// A queued detection job
pub struct DetectionJob {
    progress: Arc<JobProgress>,
    handle: JobHandle<Vec<Arc<dyn RawResult>>>,
}

impl DetectionJob {
    /// Live progress of the job's workers
    pub fn progress(&self) -> Arc<JobProgress> {
        self.progress.clone()
    }

    pub async fn wait(self) -> Result<Vec<Arc<dyn RawResult>>> {
        self.handle.wait().await
    }

    pub fn wait_blocking(self) -> Result<Vec<Arc<dyn RawResult>>> {
        self.handle.wait_blocking()
    }
}

pub struct Engine {
    config: Config,
    registry: DetectorRegistry,
    scheduler: PriorityWorkScheduler,
}

impl Engine {
    /// Create an engine and start its scheduler
    pub fn new(config: Config, registry: DetectorRegistry) -> Result<Self> {
        let scheduler = PriorityWorkScheduler::new(&config.scheduler)?;

        tracing::info!(
            "Engine ready with {} detectors: {:?}",
            registry.len(),
            registry.ids()
        );

        Ok(Self {
            config,
            registry,
            scheduler,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &DetectorRegistry {
        &self.registry
    }

    /// Queue a detection job running every listed detector over `files`
    ///
    /// Workers are built before queueing, so an unknown detector id or a
    /// detector failing to build its workers is reported here rather than
    /// through the job.
    pub fn detect(
        &self,
        detector_ids: &[&str],
        files: &[Arc<SourceFile>],
        priority: Priority,
    ) -> Result<DetectionJob> {
        let mut workers: Vec<Box<dyn DetectorWorker>> = Vec::new();
        for id in detector_ids {
            let detector = self.registry.get(id)?;
            let built = detector.build_workers(files)?;
            tracing::debug!("Detector {} built {} workers", id, built.len());
            workers.extend(built);
        }

        let progress = Arc::new(JobProgress::new(workers.len()));
        let task = DetectionTask::new(
            workers,
            self.config.detection.split_threshold,
            progress.clone(),
        );

        tracing::info!(
            "Submitting detection job: {} workers over {} files (priority {})",
            task.len(),
            files.len(),
            priority
        );

        let handle = self.scheduler.schedule(priority, move || task.compute())?;
        Ok(DetectionJob { progress, handle })
    }

    /// Scorer configured with the commonality threshold
    pub fn scorer(&self) -> MatchScorer {
        MatchScorer::new(self.config.scoring.common_threshold)
    }

    /// Group collected matches and score the groups that are not too common
    pub fn postprocess(
        &self,
        matches: Vec<Match>,
        corpus_size: usize,
    ) -> Result<Vec<CodeBlockGroup>> {
        let groups = group_matches(matches);
        let mut scorer = self.scorer();
        score_groups(&mut scorer, corpus_size, &groups)
    }

    /// Stop the scheduler; pending jobs are cancelled
    pub fn shutdown(&mut self) {
        self.scheduler.shutdown();
    }
}

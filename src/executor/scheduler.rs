// Priority-ordered, strictly serial dispatch of jobs onto a shared pool

use crate::config::SchedulerConfig;
use crate::error::{Result, SherlockError};
use rayon::ThreadPool;
use std::any::Any;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Instant;
use tokio::sync::oneshot;

/// Job priority. Lower values are dispatched first.
pub type Priority = u32;

type Action = Box<dyn FnOnce() + Send + 'static>;

/// A unit of work for the scheduler
///
/// Created together with the [`JobHandle`] that receives its outcome.
pub struct Job {
    priority: Priority,
    action: Action,
}

impl Job {
    /// Wrap `action` as a job
    ///
    /// Errors returned by the action and panics raised inside it are
    /// delivered to the handle only; they never reach the dispatch loop.
    pub fn new<R, F>(priority: Priority, action: F) -> (Self, JobHandle<R>)
    where
        R: Send + 'static,
        F: FnOnce() -> Result<R> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();

        let action: Action = Box::new(move || {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(action)) {
                Ok(outcome) => outcome,
                Err(payload) => {
                    let message = panic_message(&*payload);
                    tracing::error!("Job panicked: {}", message);
                    Err(SherlockError::JobPanicked(message))
                }
            };
            // Nobody may be waiting any more
            let _ = tx.send(outcome);
        });

        (Self { priority, action }, JobHandle::new(rx))
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Completion point of a submitted job
pub struct JobHandle<R> {
    rx: oneshot::Receiver<Result<R>>,
    outcome: Option<Result<R>>,
}

impl<R> JobHandle<R> {
    fn new(rx: oneshot::Receiver<Result<R>>) -> Self {
        Self { rx, outcome: None }
    }

    /// Wait for the job from async code
    pub async fn wait(mut self) -> Result<R> {
        if let Some(outcome) = self.outcome.take() {
            return outcome;
        }
        self.rx.await.unwrap_or(Err(SherlockError::JobCancelled))
    }

    /// Block the current thread until the job completes
    ///
    /// Must not be called from within an async runtime; use `wait` there.
    pub fn wait_blocking(mut self) -> Result<R> {
        if let Some(outcome) = self.outcome.take() {
            return outcome;
        }
        self.rx
            .blocking_recv()
            .unwrap_or(Err(SherlockError::JobCancelled))
    }

    /// Outcome if the job already finished, without waiting
    ///
    /// A received outcome is kept in the handle: later calls see the same
    /// outcome and `wait`/`wait_blocking` still return it.
    pub fn try_result(&mut self) -> Option<&Result<R>> {
        if self.outcome.is_none() {
            match self.rx.try_recv() {
                Ok(outcome) => self.outcome = Some(outcome),
                Err(oneshot::error::TryRecvError::Empty) => return None,
                Err(oneshot::error::TryRecvError::Closed) => {
                    self.outcome = Some(Err(SherlockError::JobCancelled))
                }
            }
        }
        self.outcome.as_ref()
    }
}

/// Heap entry; ordered so the lowest priority value, then the earliest
/// submission, sits at the top of the max-heap
struct QueuedJob {
    priority: Priority,
    seq: u64,
    action: Action,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct QueueState {
    queue: BinaryHeap<QueuedJob>,
    next_seq: u64,
    shutdown: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until a job is queued or the scheduler shuts down
    fn next_job(&self) -> Option<QueuedJob> {
        let mut state = self.lock();
        loop {
            if state.shutdown {
                return None;
            }
            if let Some(job) = state.queue.pop() {
                return Some(job);
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Scheduler running one job at a time, highest priority first
///
/// A single dispatch thread takes the next job, runs its action inside the
/// shared rayon pool and waits for it to finish before taking another, so at
/// most one job fans out over the pool at any moment. Queue intake is
/// unbounded; the serial dispatch is the admission control.
pub struct PriorityWorkScheduler {
    shared: Arc<Shared>,
    dispatcher: Option<thread::JoinHandle<()>>,
}

impl PriorityWorkScheduler {
    /// Create a scheduler with its own pool sized from configuration
    pub fn new(config: &SchedulerConfig) -> Result<Self> {
        let mut builder = rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("sherlock-worker-{}", i));
        if config.pool_threads > 0 {
            builder = builder.num_threads(config.pool_threads);
        }
        let pool = builder.build().map_err(|e| {
            SherlockError::Other(anyhow::anyhow!("rayon thread pool build failed: {}", e))
        })?;

        Self::with_pool(config.queue_capacity, Arc::new(pool))
    }

    /// Create a scheduler dispatching onto an existing pool
    pub fn with_pool(queue_capacity: usize, pool: Arc<ThreadPool>) -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                queue: BinaryHeap::with_capacity(queue_capacity),
                next_seq: 0,
                shutdown: false,
            }),
            available: Condvar::new(),
        });

        let loop_shared = shared.clone();
        let dispatcher = thread::Builder::new()
            .name("sherlock-dispatch".to_string())
            .spawn(move || dispatch_loop(loop_shared, pool))
            .map_err(|e| SherlockError::Io {
                source: e,
                context: "Failed to spawn dispatch thread".to_string(),
            })?;

        tracing::info!(
            "Priority work scheduler started (queue capacity {})",
            queue_capacity
        );

        Ok(Self {
            shared,
            dispatcher: Some(dispatcher),
        })
    }

    /// Queue a job without blocking
    ///
    /// After shutdown the job is dropped, its handle resolves to
    /// `JobCancelled`, and `SchedulerShutdown` is returned.
    pub fn submit(&self, job: Job) -> Result<()> {
        let mut state = self.shared.lock();
        if state.shutdown {
            return Err(SherlockError::SchedulerShutdown);
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        tracing::debug!("Queued job #{} with priority {}", seq, job.priority);

        state.queue.push(QueuedJob {
            priority: job.priority,
            seq,
            action: job.action,
        });
        drop(state);

        self.shared.available.notify_one();
        Ok(())
    }

    /// Build a job from `action` and queue it
    pub fn schedule<R, F>(&self, priority: Priority, action: F) -> Result<JobHandle<R>>
    where
        R: Send + 'static,
        F: FnOnce() -> Result<R> + Send + 'static,
    {
        let (job, handle) = Job::new(priority, action);
        self.submit(job)?;
        Ok(handle)
    }

    /// Number of jobs waiting to be dispatched
    pub fn pending(&self) -> usize {
        self.shared.lock().queue.len()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.lock().shutdown
    }

    /// Stop dispatching and wait for the dispatch thread to exit
    ///
    /// Queued jobs are dropped (their handles resolve to `JobCancelled`). A
    /// job already running is left to finish.
    pub fn shutdown(&mut self) {
        let dropped = {
            let mut state = self.shared.lock();
            state.shutdown = true;
            let dropped = state.queue.len();
            state.queue.clear();
            dropped
        };
        self.shared.available.notify_all();

        if let Some(dispatcher) = self.dispatcher.take() {
            if dispatcher.join().is_err() {
                tracing::error!("Dispatch thread panicked");
            }
            tracing::info!(
                "Priority work scheduler stopped ({} pending jobs cancelled)",
                dropped
            );
        }
    }
}

impl Drop for PriorityWorkScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn dispatch_loop(shared: Arc<Shared>, pool: Arc<ThreadPool>) {
    while let Some(job) = shared.next_job() {
        tracing::debug!("Dispatching job #{} (priority {})", job.seq, job.priority);
        let started = Instant::now();

        // Blocks until every task forked by the action has joined
        pool.install(job.action);

        tracing::debug!("Job #{} finished in {:?}", job.seq, started.elapsed());
    }
    tracing::debug!("Dispatch loop exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::mpsc;
    use std::time::Duration;

    fn scheduler() -> PriorityWorkScheduler {
        PriorityWorkScheduler::new(&SchedulerConfig {
            queue_capacity: 4,
            pool_threads: 4,
        })
        .unwrap()
    }

    /// Job that blocks the dispatcher until released
    fn gate(
        scheduler: &PriorityWorkScheduler,
    ) -> (JobHandle<()>, mpsc::Sender<()>, mpsc::Receiver<()>) {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (started_tx, started_rx) = mpsc::channel::<()>();
        let handle = scheduler
            .schedule(0, move || {
                let _ = started_tx.send(());
                let _ = release_rx.recv();
                Ok(())
            })
            .unwrap();
        (handle, release_tx, started_rx)
    }

    #[test]
    fn test_job_result_delivered() {
        let scheduler = scheduler();
        let handle = scheduler
            .schedule(1, || Ok((1..=10u64).into_par_iter().sum::<u64>()))
            .unwrap();

        assert_eq!(handle.wait_blocking().unwrap(), 55);
    }

    #[test]
    fn test_priority_order_with_fifo_ties() {
        let scheduler = scheduler();
        let (gate_handle, release, started) = gate(&scheduler);
        started.recv().unwrap();

        let order = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for (priority, label) in [(5, "low"), (1, "first"), (3, "mid"), (1, "second")] {
            let order = order.clone();
            handles.push(
                scheduler
                    .schedule(priority, move || {
                        order.lock().unwrap().push(label);
                        Ok(())
                    })
                    .unwrap(),
            );
        }
        assert_eq!(scheduler.pending(), 4);

        release.send(()).unwrap();
        gate_handle.wait_blocking().unwrap();
        for handle in handles {
            handle.wait_blocking().unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "mid", "low"]);
    }

    #[test]
    fn test_one_job_active_at_a_time() {
        let scheduler = scheduler();
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let active = active.clone();
                let max_active = max_active.clone();
                scheduler
                    .schedule(i, move || {
                        let now = active.fetch_add(1, AtomicOrdering::SeqCst) + 1;
                        max_active.fetch_max(now, AtomicOrdering::SeqCst);
                        (0..64).into_par_iter().for_each(|_| {
                            thread::sleep(Duration::from_micros(200));
                        });
                        active.fetch_sub(1, AtomicOrdering::SeqCst);
                        Ok(i)
                    })
                    .unwrap()
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.wait_blocking().unwrap(), i as u32);
        }
        assert_eq!(max_active.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn test_failed_job_does_not_stop_dispatch() {
        let scheduler = scheduler();

        let failing = scheduler
            .schedule(1, || -> Result<()> { Err(SherlockError::worker("w", "boom")) })
            .unwrap();
        let panicking = scheduler
            .schedule(2, || -> Result<()> { panic!("detector blew up") })
            .unwrap();
        let healthy = scheduler.schedule(3, || Ok("done")).unwrap();

        assert!(matches!(
            failing.wait_blocking(),
            Err(SherlockError::Worker { .. })
        ));
        match panicking.wait_blocking() {
            Err(SherlockError::JobPanicked(message)) => {
                assert!(message.contains("detector blew up"))
            }
            other => panic!("expected panic error, got {:?}", other),
        }
        assert_eq!(healthy.wait_blocking().unwrap(), "done");
    }

    #[test]
    fn test_shutdown_cancels_pending() {
        let mut scheduler = scheduler();
        let (gate_handle, release, started) = gate(&scheduler);
        started.recv().unwrap();

        let pending = scheduler.schedule(1, || Ok(())).unwrap();

        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            let _ = release.send(());
        });
        scheduler.shutdown();
        releaser.join().unwrap();

        // The running job finishes, the queued one never runs
        assert!(gate_handle.wait_blocking().is_ok());
        assert!(matches!(
            pending.wait_blocking(),
            Err(SherlockError::JobCancelled)
        ));
        assert!(scheduler.is_shutdown());
    }

    #[test]
    fn test_submit_after_shutdown() {
        let mut scheduler = scheduler();
        scheduler.shutdown();

        let (job, handle) = Job::new(1, || Ok(()));
        assert!(matches!(
            scheduler.submit(job),
            Err(SherlockError::SchedulerShutdown)
        ));
        assert!(matches!(
            handle.wait_blocking(),
            Err(SherlockError::JobCancelled)
        ));
    }

    #[test]
    fn test_idle_shutdown_is_clean() {
        let mut scheduler = scheduler();
        scheduler.shutdown();
        scheduler.shutdown();
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_wait_from_async() {
        let scheduler = scheduler();
        let handle = scheduler.schedule(1, || Ok(vec![1, 2, 3])).unwrap();
        assert_eq!(handle.wait().await.unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_try_result() {
        let scheduler = scheduler();
        let (gate_handle, release, started) = gate(&scheduler);
        started.recv().unwrap();

        let mut handle = scheduler.schedule(1, || Ok(7)).unwrap();
        assert!(handle.try_result().is_none());

        release.send(()).unwrap();
        gate_handle.wait_blocking().unwrap();
        assert_eq!(handle.wait_blocking().unwrap(), 7);
    }

    fn poll_until_done<R>(handle: &mut JobHandle<R>) {
        for _ in 0..500 {
            if handle.try_result().is_some() {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("job did not finish");
    }

    #[test]
    fn test_try_result_keeps_outcome() {
        let scheduler = scheduler();
        let mut handle = scheduler.schedule(1, || Ok(7u32)).unwrap();

        poll_until_done(&mut handle);
        assert!(matches!(handle.try_result(), Some(Ok(7))));
        assert!(matches!(handle.try_result(), Some(Ok(7))));
        assert_eq!(handle.wait_blocking().unwrap(), 7);
    }

    #[test]
    fn test_try_result_keeps_failure() {
        let scheduler = scheduler();
        let mut handle = scheduler
            .schedule(1, || -> Result<u32> {
                Err(SherlockError::worker("lexer", "bad input"))
            })
            .unwrap();

        poll_until_done(&mut handle);
        assert!(matches!(
            handle.try_result(),
            Some(Err(SherlockError::Worker { .. }))
        ));
        assert!(matches!(
            handle.wait_blocking(),
            Err(SherlockError::Worker { .. })
        ));
    }

    #[tokio::test]
    async fn test_wait_after_try_result() {
        let scheduler = scheduler();
        let mut handle = scheduler.schedule(2, || Ok("done")).unwrap();

        while handle.try_result().is_none() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(handle.wait().await.unwrap(), "done");
    }
}

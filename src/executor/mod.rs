// Execution engine: divide-and-conquer detection tasks admitted one job at a
// time by a priority scheduler

mod detect;
mod progress;
mod scheduler;

pub use detect::DetectionTask;
pub use progress::{JobProgress, ProgressTracker};
pub use scheduler::{Job, JobHandle, Priority, PriorityWorkScheduler};

// Shared domain types: file identity, match evidence, raw results and the
// detector worker contract

mod file;
mod result;
mod types;

pub use file::{FileId, FileLookup, InMemoryFileStore, SourceFile};
pub use result::{DetectorWorker, RawResult};
pub use types::{BlockLocation, LineRange, Match};

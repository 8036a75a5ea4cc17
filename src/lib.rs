//! Sherlock - source code similarity detection core
//!
//! Runs pluggable detector workers over a corpus of submitted files in
//! parallel, accumulates pairwise match evidence in thread-safe records, and
//! groups and scores the matches while filtering out those common to too much
//! of the corpus to mean anything.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod model;
pub mod record;
pub mod registry;
pub mod scoring;

pub use error::{Result, SherlockError};

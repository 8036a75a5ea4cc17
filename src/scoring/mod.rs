// Match aggregation and scoring
//
// Matches are evaluated one group at a time: the scorer accumulates per-file
// similarity for the group, the commonality filter drops groups touching too
// large a share of the corpus, and surviving files get an averaged score.

mod grouping;

pub use grouping::{group_matches, score_groups};

use crate::error::{Result, SherlockError};
use crate::model::{FileId, LineRange, Match};
use ahash::{HashMap, HashMapExt};
use serde::{Deserialize, Serialize};

/// Receives scored blocks for one output group
pub trait CodeBlockSink {
    fn add_code_block(&mut self, file: FileId, score: f32, lines: LineRange);
}

/// A file's block within a kept match group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredBlock {
    pub file: FileId,
    pub score: f32,
    pub lines: LineRange,
}

/// Output group collecting scored blocks in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeBlockGroup {
    pub blocks: Vec<ScoredBlock>,
}

impl CodeBlockGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block recorded for a file, if any
    pub fn block(&self, file: FileId) -> Option<&ScoredBlock> {
        self.blocks.iter().find(|b| b.file == file)
    }
}

impl CodeBlockSink for CodeBlockGroup {
    fn add_code_block(&mut self, file: FileId, score: f32, lines: LineRange) {
        self.blocks.push(ScoredBlock { file, score, lines });
    }
}

/// Cumulative similarity for one file within the current group
#[derive(Debug, Clone, PartialEq)]
pub struct FileAccumulator {
    /// Sum of all similarity scores involving this file
    pub total_similarity: f32,
    /// Number of matches folded into the total
    pub similar_files: u32,
    /// Block range from the first match seen for this file
    pub lines: LineRange,
}

impl FileAccumulator {
    fn new(similarity: f32, lines: LineRange) -> Self {
        Self {
            total_similarity: similarity,
            similar_files: 1,
            lines,
        }
    }

    fn add(&mut self, similarity: f32) {
        self.total_similarity += similarity;
        self.similar_files += 1;
    }

    /// Unweighted mean of the folded similarities
    pub fn score(&self) -> f32 {
        self.total_similarity / self.similar_files as f32
    }
}

/// Groups matches by file and scores them, one match group at a time
///
/// Working state belongs to the current group and is reset by `new_group`.
/// Mutation requires `&mut self`, so a scorer cannot be shared across groups
/// being built concurrently.
pub struct MatchScorer {
    /// Largest fraction of the corpus a group may touch and still be kept
    threshold: f32,
    /// Distinct files in the current group, in first-seen order
    files: Vec<FileId>,
    /// File id -> position in `files` / `accumulators`
    index: HashMap<FileId, usize>,
    accumulators: Vec<FileAccumulator>,
}

impl MatchScorer {
    /// Create a scorer
    ///
    /// # Arguments
    /// * `threshold` - Corpus fraction above which a group counts as common
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            files: Vec::new(),
            index: HashMap::new(),
            accumulators: Vec::new(),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Reset working state for the next match group
    pub fn new_group(&mut self) {
        self.files.clear();
        self.index.clear();
        self.accumulators.clear();
    }

    /// Fold a match into the current group
    ///
    /// A file seen earlier in the group only has its score accumulated; its
    /// recorded block range stays the one from its first match.
    pub fn add(&mut self, pair: &Match) {
        for (file, lines) in pair.files.iter().zip(pair.lines.iter()) {
            match self.index.get(file) {
                Some(&i) => self.accumulators[i].add(pair.similarity),
                None => {
                    self.index.insert(*file, self.files.len());
                    self.files.push(*file);
                    self.accumulators
                        .push(FileAccumulator::new(pair.similarity, *lines));
                }
            }
        }
    }

    /// Distinct files in the current group, in first-seen order
    pub fn files(&self) -> &[FileId] {
        &self.files
    }

    pub fn accumulator(&self, file: FileId) -> Option<&FileAccumulator> {
        self.index.get(&file).map(|&i| &self.accumulators[i])
    }

    /// Commonality filter for the current group
    ///
    /// Returns true (keep) when the share of corpus files touched by the group
    /// is at most the threshold, false (discard) otherwise. `_matches` is
    /// accepted for callers that pass the group's matches; only the file
    /// fraction decides.
    pub fn check_size(&self, corpus_file_count: usize, _matches: &[Match]) -> bool {
        if corpus_file_count == 0 {
            tracing::debug!("Empty corpus, discarding group of {} files", self.files.len());
            return false;
        }

        let fraction = self.files.len() as f32 / corpus_file_count as f32;
        let keep = fraction <= self.threshold;

        tracing::debug!(
            "Group touches {}/{} files ({:.3}), threshold {:.3}: {}",
            self.files.len(),
            corpus_file_count,
            fraction,
            self.threshold,
            if keep { "keep" } else { "discard" }
        );

        keep
    }

    /// Score a file of the current group and forward its block to `sink`
    pub fn add_scored_block(&self, file: FileId, sink: &mut dyn CodeBlockSink) -> Result<()> {
        let info = self
            .accumulator(file)
            .ok_or(SherlockError::FileNotInGroup(file))?;

        sink.add_code_block(file, info.score(), info.lines);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: u64, b: u64, similarity: f32, la: (u32, u32), lb: (u32, u32)) -> Match {
        Match::new(
            FileId(a),
            LineRange::new(la.0, la.1),
            FileId(b),
            LineRange::new(lb.0, lb.1),
            similarity,
        )
    }

    #[test]
    fn test_shared_file_accumulates() {
        let mut scorer = MatchScorer::new(0.5);
        scorer.new_group();
        scorer.add(&pair(1, 2, 0.6, (1, 5), (10, 14)));
        scorer.add(&pair(1, 3, 0.8, (1, 5), (20, 24)));

        let info = scorer.accumulator(FileId(1)).unwrap();
        assert_eq!(info.similar_files, 2);
        assert!((info.total_similarity - 1.4).abs() < 1e-6);

        let mut out = CodeBlockGroup::new();
        scorer.add_scored_block(FileId(1), &mut out).unwrap();

        let block = out.block(FileId(1)).unwrap();
        assert!((block.score - 0.7).abs() < 1e-6);
        assert_eq!(block.lines, LineRange::new(1, 5));
    }

    #[test]
    fn test_first_seen_range_wins() {
        let mut scorer = MatchScorer::new(0.5);
        scorer.new_group();
        scorer.add(&pair(1, 2, 0.5, (1, 5), (10, 14)));
        scorer.add(&pair(3, 1, 0.5, (7, 9), (40, 50)));

        assert_eq!(
            scorer.accumulator(FileId(1)).unwrap().lines,
            LineRange::new(1, 5)
        );
        assert_eq!(scorer.files(), &[FileId(1), FileId(2), FileId(3)]);
    }

    #[test]
    fn test_check_size_keeps_uncommon() {
        let mut scorer = MatchScorer::new(0.2);
        scorer.new_group();
        scorer.add(&pair(1, 1, 0.9, (1, 2), (5, 6)));

        assert_eq!(scorer.files().len(), 1);
        assert!(scorer.check_size(10, &[]));
    }

    #[test]
    fn test_check_size_discards_common() {
        let mut scorer = MatchScorer::new(0.2);
        scorer.new_group();
        scorer.add(&pair(1, 2, 0.9, (1, 2), (5, 6)));
        scorer.add(&pair(2, 3, 0.9, (5, 6), (8, 9)));

        assert_eq!(scorer.files().len(), 3);
        assert!(!scorer.check_size(10, &[]));
    }

    #[test]
    fn test_check_size_uses_real_division() {
        // 2/3 truncates to 0 with integer division and would be kept
        let mut scorer = MatchScorer::new(0.5);
        scorer.new_group();
        scorer.add(&pair(1, 2, 0.9, (1, 2), (5, 6)));

        assert!(!scorer.check_size(3, &[]));
        assert!(scorer.check_size(4, &[]));
    }

    #[test]
    fn test_check_size_empty_corpus() {
        let mut scorer = MatchScorer::new(1.0);
        scorer.new_group();
        assert!(!scorer.check_size(0, &[]));
    }

    #[test]
    fn test_new_group_resets_state() {
        let mut scorer = MatchScorer::new(0.5);
        scorer.new_group();
        scorer.add(&pair(1, 2, 0.4, (1, 1), (2, 2)));

        scorer.new_group();
        assert!(scorer.files().is_empty());
        assert!(scorer.accumulator(FileId(1)).is_none());

        scorer.add(&pair(1, 3, 0.9, (3, 3), (4, 4)));
        let info = scorer.accumulator(FileId(1)).unwrap();
        assert_eq!(info.similar_files, 1);
        assert_eq!(info.lines, LineRange::line(3));
    }

    #[test]
    fn test_scored_block_for_unknown_file() {
        let mut scorer = MatchScorer::new(0.5);
        scorer.new_group();
        scorer.add(&pair(1, 2, 0.4, (1, 1), (2, 2)));

        let mut out = CodeBlockGroup::new();
        let result = scorer.add_scored_block(FileId(9), &mut out);

        assert!(matches!(result, Err(SherlockError::FileNotInGroup(FileId(9)))));
        assert!(out.is_empty());
    }
}

// Match evidence types shared by records and the scorer
use super::FileId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive line range of a matched block within one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Block covering a single line
    pub fn line(line: u32) -> Self {
        Self::new(line, line)
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Location of one matched block in both files of a compared pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockLocation {
    pub file1: LineRange,
    pub file2: LineRange,
}

impl BlockLocation {
    pub fn new(file1_start: u32, file1_end: u32, file2_start: u32, file2_end: u32) -> Self {
        Self {
            file1: LineRange::new(file1_start, file1_end),
            file2: LineRange::new(file2_start, file2_end),
        }
    }
}

impl fmt::Display for BlockLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.file1.start, self.file1.end, self.file2.start, self.file2.end
        )
    }
}

/// Evidence that two files share a similar block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// The two files, in comparison order
    pub files: [FileId; 2],
    /// Similarity score in [0, 1]
    pub similarity: f32,
    /// Matched block in each file, index-aligned with `files`
    pub lines: [LineRange; 2],
}

impl Match {
    pub fn new(
        file1: FileId,
        lines1: LineRange,
        file2: FileId,
        lines2: LineRange,
        similarity: f32,
    ) -> Self {
        Self {
            files: [file1, file2],
            similarity,
            lines: [lines1, lines2],
        }
    }
}

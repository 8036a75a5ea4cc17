//! Thread-safe accumulator of match evidence for one pair of files
//!
//! Detector workers comparing the same pair of files write into a shared
//! [`MatchRecord`] concurrently. Every read and mutation goes through a single
//! mutex guarding both backing sequences, so readers always observe the
//! payloads and their locations index-aligned.

use crate::error::{Result, SherlockError};
use crate::model::{BlockLocation, FileId, FileLookup, Match, RawResult, SourceFile};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Match payloads and their block locations, index-aligned
struct Entries<T> {
    objects: Vec<T>,
    locations: Vec<BlockLocation>,
}

impl<T> Entries<T> {
    fn is_aligned(&self) -> bool {
        self.objects.len() == self.locations.len()
    }
}

/// Set of match payloads recorded for a pair of compared files
///
/// Files are kept as persistent ids only and resolved on demand through a
/// [`FileLookup`].
pub struct MatchRecord<T> {
    file1: FileId,
    file2: FileId,
    entries: Mutex<Entries<T>>,
}

impl<T> MatchRecord<T>
where
    T: Clone + fmt::Display + Send + Sync + 'static,
{
    /// Create an empty record for two compared files
    pub fn new(file1: &SourceFile, file2: &SourceFile) -> Self {
        Self::from_ids(file1.id, file2.id)
    }

    /// Create an empty record from persistent ids
    pub fn from_ids(file1: FileId, file2: FileId) -> Self {
        Self {
            file1,
            file2,
            entries: Mutex::new(Entries {
                objects: Vec::new(),
                locations: Vec::new(),
            }),
        }
    }

    pub fn file1_id(&self) -> FileId {
        self.file1
    }

    pub fn file2_id(&self) -> FileId {
        self.file2
    }

    /// Resolve the first file of the pair
    pub fn file1(&self, lookup: &dyn FileLookup) -> Option<Arc<SourceFile>> {
        lookup.source_file(self.file1)
    }

    /// Resolve the second file of the pair
    pub fn file2(&self, lookup: &dyn FileLookup) -> Option<Arc<SourceFile>> {
        lookup.source_file(self.file2)
    }

    /// Store one matched block
    ///
    /// If the backing sequences are found misaligned the record is left
    /// untouched and `RecordMisaligned` is returned. This is a report, not a
    /// fault: concurrent producers are free to ignore it and carry on.
    pub fn put(
        &self,
        object: T,
        file1_start: u32,
        file1_end: u32,
        file2_start: u32,
        file2_end: u32,
    ) -> Result<()> {
        let mut entries = self.lock();

        if !entries.is_aligned() {
            tracing::warn!(
                "Match record {} / {} misaligned: {} objects, {} locations; dropping put",
                self.file1,
                self.file2,
                entries.objects.len(),
                entries.locations.len()
            );
            return Err(SherlockError::RecordMisaligned {
                objects: entries.objects.len(),
                locations: entries.locations.len(),
            });
        }

        entries.objects.push(object);
        entries.locations.push(BlockLocation::new(
            file1_start,
            file1_end,
            file2_start,
            file2_end,
        ));
        Ok(())
    }

    /// Store a match where both blocks are a single line
    pub fn put_line(&self, object: T, file1_line: u32, file2_line: u32) -> Result<()> {
        self.put(object, file1_line, file1_line, file2_line, file2_line)
    }

    /// Point-in-time copy of the stored payloads
    pub fn objects(&self) -> Vec<T> {
        self.lock().objects.clone()
    }

    /// Point-in-time copy of the block locations, ordered file1 start, file1
    /// end, file2 start, file2 end
    pub fn locations(&self) -> Vec<BlockLocation> {
        self.lock().locations.clone()
    }

    /// Payloads paired with their locations, taken under one lock
    pub fn snapshot(&self) -> Vec<(T, BlockLocation)> {
        let entries = self.lock();
        entries
            .objects
            .iter()
            .cloned()
            .zip(entries.locations.iter().copied())
            .collect()
    }

    /// Convert the current entries into matches for the scorer
    pub fn to_matches(&self, similarity: impl Fn(&T) -> f32) -> Vec<Match> {
        self.snapshot()
            .into_iter()
            .map(|(object, location)| {
                Match::new(
                    self.file1,
                    location.file1,
                    self.file2,
                    location.file2,
                    similarity(&object),
                )
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Entries<T>> {
        // Poisoned data is still usable; misalignment is caught by `put`
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn push_stray_location(&self, location: BlockLocation) {
        self.lock().locations.push(location);
    }
}

impl<T> RawResult for MatchRecord<T>
where
    T: Clone + fmt::Display + Send + Sync + 'static,
{
    fn is_empty(&self) -> bool {
        self.lock().objects.is_empty()
    }

    fn size(&self) -> usize {
        self.lock().objects.len()
    }

    /// Same variant with the same payload type. Payloads are statically typed,
    /// so this holds for empty records too.
    fn test_type(&self, baseline: &dyn RawResult) -> bool {
        baseline.as_any().downcast_ref::<Self>().is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T> fmt::Display for MatchRecord<T>
where
    T: Clone + fmt::Display + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.lock();
        if !entries.is_aligned() {
            tracing::warn!(
                "Formatting misaligned match record: {} objects, {} locations",
                entries.objects.len(),
                entries.locations.len()
            );
        }

        for (object, location) in entries.objects.iter().zip(entries.locations.iter()) {
            writeln!(f, "{} - {}", object, location)?;
        }
        Ok(())
    }
}

impl<T> fmt::Debug for MatchRecord<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("MatchRecord")
            .field("file1", &self.file1)
            .field("file2", &self.file2)
            .field("objects", &entries.objects.len())
            .field("locations", &entries.locations.len())
            .finish()
    }
}

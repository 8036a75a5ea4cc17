// Partition matches into groups of transitively connected files and run
// the scorer over each group
use super::{CodeBlockGroup, MatchScorer};
use crate::error::Result;
use crate::model::{FileId, Match};
use ahash::{HashMap, HashMapExt};
use petgraph::unionfind::UnionFind;

/// Split matches into match groups: maximal sets of files connected by
/// matches. Groups come out in order of first appearance and keep the input
/// order of their matches.
pub fn group_matches(matches: Vec<Match>) -> Vec<Vec<Match>> {
    // Dense index per file for the union-find
    let mut index: HashMap<FileId, usize> = HashMap::new();
    for pair in &matches {
        for file in pair.files {
            let next = index.len();
            index.entry(file).or_insert(next);
        }
    }

    let mut sets = UnionFind::<usize>::new(index.len());
    for pair in &matches {
        sets.union(index[&pair.files[0]], index[&pair.files[1]]);
    }

    let mut slots: HashMap<usize, usize> = HashMap::new();
    let mut groups: Vec<Vec<Match>> = Vec::new();

    for pair in matches {
        let root = sets.find_mut(index[&pair.files[0]]);
        let slot = *slots.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(pair);
    }

    groups
}

/// Score every match group, dropping groups the commonality filter rejects
///
/// # Arguments
/// * `scorer` - Scorer carrying the commonality threshold
/// * `corpus_size` - Number of files in the compared corpus
/// * `groups` - Match groups, e.g. from [`group_matches`]
///
/// # Returns
/// One output group per kept match group, with a scored block per file
pub fn score_groups(
    scorer: &mut MatchScorer,
    corpus_size: usize,
    groups: &[Vec<Match>],
) -> Result<Vec<CodeBlockGroup>> {
    let mut kept = Vec::new();

    for group in groups {
        scorer.new_group();
        for pair in group {
            scorer.add(pair);
        }

        if !scorer.check_size(corpus_size, group) {
            continue;
        }

        let mut out = CodeBlockGroup::new();
        for &file in scorer.files() {
            scorer.add_scored_block(file, &mut out)?;
        }
        kept.push(out);
    }

    tracing::debug!("Kept {} of {} match groups", kept.len(), groups.len());
    Ok(kept)
}

//! Similarity index with deterministic top-k ranking.
//!
//! The index is immutable: it is built once per snapshot generation from
//! the nodes in insertion order and replaced wholesale on rebuild. Ties are
//! broken by that insertion order, so the same query against the same
//! snapshot always returns the same ordered results.

use std::collections::HashMap;

use noema_core::types::NodeId;

use crate::features::SparseVector;

/// A single hit returned from a similarity ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: NodeId,
    /// Cosine similarity, always within [-1, 1].
    pub score: f64,
}

/// Immutable cosine-similarity index over one snapshot's node vectors.
#[derive(Debug, Clone, Default)]
pub struct SimilarityIndex {
    entries: Vec<(NodeId, SparseVector)>,
    by_id: HashMap<NodeId, usize>,
}

impl SimilarityIndex {
    /// Build an index from `(id, vector)` entries in snapshot order.
    ///
    /// If an id appears more than once the first entry wins.
    pub fn new(entries: Vec<(NodeId, SparseVector)>) -> Self {
        let mut by_id = HashMap::with_capacity(entries.len());
        for (pos, (id, _)) in entries.iter().enumerate() {
            by_id.entry(id.clone()).or_insert(pos);
        }
        Self { entries, by_id }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The vector stored for a node, if the node is in this snapshot.
    pub fn vector(&self, id: &NodeId) -> Option<&SparseVector> {
        self.by_id.get(id).map(|&pos| &self.entries[pos].1)
    }

    /// Rank every entry against the query, best first.
    ///
    /// Never returns more than `k` hits; an empty index yields an empty
    /// list. Equal scores keep snapshot order.
    pub fn rank(&self, query: &SparseVector, k: usize) -> Vec<SearchHit> {
        let positions: Vec<usize> = (0..self.entries.len()).collect();
        self.rank_positions(query, positions, k, None)
    }

    /// Rank only the given candidate ids against the query.
    ///
    /// Unknown ids are skipped; duplicates count once. An empty candidate
    /// set yields an empty list, never an error.
    pub fn rank_subset(&self, query: &SparseVector, candidates: &[NodeId], k: usize) -> Vec<SearchHit> {
        let mut positions: Vec<usize> = candidates
            .iter()
            .filter_map(|id| self.by_id.get(id).copied())
            .collect();
        // Snapshot order is the tie-break order regardless of how the
        // caller ordered its candidates.
        positions.sort_unstable();
        positions.dedup();
        self.rank_positions(query, positions, k, None)
    }

    /// Rank every entry against an existing node's own vector.
    ///
    /// The seed node itself is always excluded; its self-similarity is 1.0
    /// by convention and is never computed. Unknown seed ids yield an empty
    /// list.
    pub fn top_k(&self, id: &NodeId, k: usize) -> Vec<SearchHit> {
        let Some(&seed_pos) = self.by_id.get(id) else {
            return Vec::new();
        };
        let query = self.entries[seed_pos].1.clone();
        let positions: Vec<usize> = (0..self.entries.len()).collect();
        self.rank_positions(&query, positions, k, Some(seed_pos))
    }

    fn rank_positions(
        &self,
        query: &SparseVector,
        positions: Vec<usize>,
        k: usize,
        exclude: Option<usize>,
    ) -> Vec<SearchHit> {
        if k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = positions
            .into_iter()
            .filter(|pos| Some(*pos) != exclude)
            .map(|pos| (pos, query.cosine(&self.entries[pos].1)))
            .collect();

        // Descending score; equal scores fall back to snapshot position.
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(pos, score)| SearchHit {
                id: self.entries[pos].0.clone(),
                score,
            })
            .collect()
    }
}

//! Similarity clustering over one graph snapshot.
//!
//! Greedy, seed-first agglomerative grouping: nodes are visited in
//! snapshot insertion order, each unassigned node seeds a new cluster and
//! pulls in every later unassigned node whose similarity to the seed
//! exceeds the threshold. Single-link and deliberately not a global
//! optimum: fast, explainable, and deterministic for the same snapshot.

use serde::{Deserialize, Serialize};

use noema_core::types::NodeId;

use crate::store::GraphSnapshot;

/// One cluster assignment: a generated id and the member node ids.
///
/// The seed is always the first member; remaining members follow snapshot
/// order. Cluster ordering in the output is not part of the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Generated id of the form `cluster-<n>`, `n` increasing from 0.
    pub id: String,
    pub members: Vec<NodeId>,
}

/// Groups snapshot nodes whose pairwise similarity to a seed exceeds a
/// caller-supplied threshold.
pub struct SimilarityClusterer {
    /// Minimum cosine similarity to the cluster seed, exclusive.
    pub threshold: f64,
}

impl SimilarityClusterer {
    /// Create a new clusterer with the given similarity threshold.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Assign every snapshot node to exactly one cluster.
    ///
    /// Computed fresh on every call; assignments are never cached because
    /// the threshold may differ per call.
    pub fn cluster(&self, snapshot: &GraphSnapshot) -> Vec<Cluster> {
        let nodes = snapshot.nodes();
        if nodes.is_empty() {
            return vec![];
        }

        let index = snapshot.index();
        let mut assigned = vec![false; nodes.len()];
        let mut clusters = Vec::new();

        for seed in 0..nodes.len() {
            if assigned[seed] {
                continue;
            }
            assigned[seed] = true;
            let mut members = vec![nodes[seed].id.clone()];

            if let Some(seed_vector) = index.vector(&nodes[seed].id) {
                for other in (seed + 1)..nodes.len() {
                    if assigned[other] {
                        continue;
                    }
                    let Some(other_vector) = index.vector(&nodes[other].id) else {
                        continue;
                    };
                    if seed_vector.cosine(other_vector) > self.threshold {
                        assigned[other] = true;
                        members.push(nodes[other].id.clone());
                    }
                }
            }

            clusters.push(Cluster {
                id: format!("cluster-{}", clusters.len()),
                members,
            });
        }

        clusters
    }
}

impl Default for SimilarityClusterer {
    fn default() -> Self {
        Self::new(0.35)
    }
}

//! In-memory graph store with atomic snapshot replacement.
//!
//! A rebuild computes the whole new snapshot (deduplicated nodes, dangling
//! edges dropped, corpus statistics, vectors, index, adjacency) off to the
//! side and swaps it in as a single assignment. In-flight readers keep the
//! `Arc` of the snapshot they started with, so they see the old generation
//! in full or the new one in full, never a mix.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use noema_core::error::{NoemaError, Result};
use noema_core::types::{Edge, EdgeKind, Node, NodeId};
use noema_vector::{FeatureExtractor, SimilarityIndex};

/// Diagnostics from one rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
    /// Nodes kept in the snapshot (after id deduplication).
    pub nodes: usize,
    /// Edges kept in the snapshot.
    pub edges: usize,
    /// Edges dropped because an endpoint was missing from the node set.
    pub dropped_edges: usize,
}

/// One undirected adjacency entry, tagged with the edge's kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbor {
    pub id: NodeId,
    pub kind: EdgeKind,
}

/// One immutable generation of the graph.
///
/// Nodes are stored in insertion order; that order is the canonical order
/// for clustering seeds and for similarity tie-breaks, and is part of the
/// engine's determinism contract.
#[derive(Debug, Default)]
pub struct GraphSnapshot {
    nodes: Vec<Node>,
    by_id: HashMap<NodeId, usize>,
    adjacency: HashMap<NodeId, Vec<Neighbor>>,
    edge_count: usize,
    extractor: FeatureExtractor,
    index: SimilarityIndex,
}

impl GraphSnapshot {
    /// The snapshot of a never-built graph: no nodes, no edges.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from caller data.
    ///
    /// Duplicate node ids keep the first occurrence. Edges referencing an
    /// unknown endpoint are dropped and counted, never an error.
    pub fn build(
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        content_window_chars: usize,
    ) -> (Self, RebuildReport) {
        let mut kept_nodes: Vec<Node> = Vec::with_capacity(nodes.len());
        let mut by_id: HashMap<NodeId, usize> = HashMap::with_capacity(nodes.len());

        for node in nodes {
            if by_id.contains_key(&node.id) {
                warn!(node_id = %node.id, "duplicate node id in snapshot, keeping first");
                continue;
            }
            by_id.insert(node.id.clone(), kept_nodes.len());
            kept_nodes.push(node);
        }

        // Corpus statistics and vectors belong to this generation only.
        let extractor = FeatureExtractor::from_nodes(content_window_chars, &kept_nodes);
        let entries = kept_nodes
            .iter()
            .map(|n| (n.id.clone(), extractor.node_vector(n)))
            .collect();
        let index = SimilarityIndex::new(entries);

        let mut adjacency: HashMap<NodeId, Vec<Neighbor>> = HashMap::new();
        let mut edge_count = 0;
        let mut dropped_edges = 0;

        for edge in edges {
            if !by_id.contains_key(&edge.source_id) || !by_id.contains_key(&edge.target_id) {
                debug!(edge_id = %edge.id, "dropping edge with unknown endpoint");
                dropped_edges += 1;
                continue;
            }
            edge_count += 1;
            adjacency
                .entry(edge.source_id.clone())
                .or_default()
                .push(Neighbor {
                    id: edge.target_id.clone(),
                    kind: edge.kind,
                });
            adjacency.entry(edge.target_id).or_default().push(Neighbor {
                id: edge.source_id,
                kind: edge.kind,
            });
        }

        let report = RebuildReport {
            nodes: kept_nodes.len(),
            edges: edge_count,
            dropped_edges,
        };

        (
            Self {
                nodes: kept_nodes,
                by_id,
                adjacency,
                edge_count,
                extractor,
                index,
            },
            report,
        )
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.by_id.get(id).map(|&pos| &self.nodes[pos])
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.by_id.contains_key(id)
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids connected to `id` by an edge in either direction,
    /// optionally filtered by edge kind.
    ///
    /// Ids are deduplicated preserving edge order. Unknown ids yield an
    /// empty list: a caller may query right after a rebuild race.
    pub fn neighbors(&self, id: &NodeId, filter: Option<EdgeKind>) -> Vec<NodeId> {
        let Some(entries) = self.adjacency.get(id) else {
            return Vec::new();
        };

        let mut seen: HashSet<&NodeId> = HashSet::new();
        entries
            .iter()
            .filter(|n| filter.is_none_or(|kind| n.kind == kind))
            .filter(|n| seen.insert(&n.id))
            .map(|n| n.id.clone())
            .collect()
    }

    /// The feature extractor (and corpus statistics) of this generation.
    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// The similarity index of this generation.
    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }
}

/// Thread-safe handle owning the current snapshot.
#[derive(Debug)]
pub struct GraphStore {
    snapshot: RwLock<Arc<GraphSnapshot>>,
    content_window_chars: usize,
}

impl GraphStore {
    /// Create a store with an empty snapshot.
    pub fn new(content_window_chars: usize) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(GraphSnapshot::empty())),
            content_window_chars,
        }
    }

    /// Replace the snapshot wholesale from caller data.
    ///
    /// This is the only mutation path. The new snapshot is fully built
    /// before the swap, so concurrent readers never observe a partial
    /// graph.
    pub fn rebuild(&self, nodes: Vec<Node>, edges: Vec<Edge>) -> Result<RebuildReport> {
        let (snapshot, report) = GraphSnapshot::build(nodes, edges, self.content_window_chars);

        let mut guard = self
            .snapshot
            .write()
            .map_err(|e| NoemaError::Graph(format!("Lock poisoned: {}", e)))?;
        *guard = Arc::new(snapshot);

        info!(
            nodes = report.nodes,
            edges = report.edges,
            dropped_edges = report.dropped_edges,
            "graph snapshot rebuilt"
        );
        Ok(report)
    }

    /// The current snapshot.
    ///
    /// Readers hold the returned `Arc`, not the lock, so long-running
    /// scans never block a rebuild. A poisoned lock still yields the last
    /// fully-built snapshot: the swap is a single assignment, so the inner
    /// value is always consistent.
    pub fn snapshot(&self) -> Arc<GraphSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Look up a node by id in the current snapshot.
    pub fn get(&self, id: &NodeId) -> Option<Node> {
        self.snapshot().get(id).cloned()
    }

    /// Neighbors of a node in the current snapshot.
    pub fn neighbors(&self, id: &NodeId, filter: Option<EdgeKind>) -> Vec<NodeId> {
        self.snapshot().neighbors(id, filter)
    }

    pub fn node_count(&self) -> usize {
        self.snapshot().node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

//! Noema Graph crate - snapshot store and similarity clustering.
//!
//! The graph store owns the current snapshot (nodes, typed edges, feature
//! corpus, and similarity index) and replaces it atomically on rebuild.
//! Clustering runs over a snapshot it is handed, never over live state.

pub mod cluster;
pub mod store;

pub use cluster::{Cluster, SimilarityClusterer};
pub use store::{GraphSnapshot, GraphStore, Neighbor, RebuildReport};

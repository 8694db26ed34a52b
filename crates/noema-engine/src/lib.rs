//! Noema Engine crate - the single entry point for the host application.
//!
//! A [`KnowledgeEngine`] owns one graph snapshot and one session table and
//! delegates to the feature, graph, clustering, enrichment, and session
//! subsystems. Construct one engine per host session and pass it by
//! reference; there is no global instance.

pub mod engine;

pub use engine::{KnowledgeEngine, RelatedNode, ScoredNode};

// Re-export the public surface the host needs alongside the engine.
pub use noema_core::config::NoemaConfig;
pub use noema_core::error::{NoemaError, Result};
pub use noema_core::types::{
    Confidence, ConnectionKind, Edge, EdgeKind, Node, NodeId, NodeKind, SearchMode, SessionId,
};
pub use noema_enrich::{ConceptMention, EnrichmentReport, RelationCandidate};
pub use noema_graph::{Cluster, RebuildReport};
pub use noema_session::{FlowStage, FlowStep, Intent, LogicFlow, Session, SessionSweeper};

//! The engine facade: rebuild, search, cluster, enrich, sessions.
//!
//! Rebuilds are the only mutation; everything else reads the snapshot that
//! was current when the call started. Every method is safe to call before
//! the first rebuild and returns empty results rather than errors.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use noema_core::config::NoemaConfig;
use noema_core::error::Result;
use noema_core::types::{ConnectionKind, Edge, Node, NodeId, SearchMode, SessionId};
use noema_enrich::{DocumentEnricher, EnrichmentReport, Vocabulary};
use noema_graph::{Cluster, GraphStore, RebuildReport, SimilarityClusterer};
use noema_session::{build_logic_flow, LogicFlow, Session, SessionManager, SessionSweeper};

/// One semantic search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredNode {
    pub node: Node,
    pub similarity: f64,
}

/// One result of node-seeded similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedNode {
    pub node: Node,
    pub similarity: f64,
    pub connection: ConnectionKind,
}

/// The semantic knowledge-graph engine.
///
/// One instance per host session. The engine holds exactly two pieces of
/// state: the current graph snapshot and the session table; all methods
/// take plain data and return plain data.
#[derive(Debug)]
pub struct KnowledgeEngine {
    config: NoemaConfig,
    graph: GraphStore,
    sessions: Arc<SessionManager>,
}

impl KnowledgeEngine {
    /// Create an engine with the given configuration and an empty graph.
    pub fn new(config: NoemaConfig) -> Self {
        let graph = GraphStore::new(config.features.content_window_chars);
        let sessions = Arc::new(SessionManager::new(
            config.session.ttl_minutes,
            config.session.confidence_window,
        ));
        Self {
            config,
            graph,
            sessions,
        }
    }

    pub fn config(&self) -> &NoemaConfig {
        &self.config
    }

    /// The graph store, for read-only collaborators.
    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    /// The session manager, shared so a sweeper task can own a handle.
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// A background sweeper over this engine's sessions, configured with
    /// the engine's sweep interval. The host spawns `run()` and keeps the
    /// sweeper to `shutdown()` it later.
    pub fn session_sweeper(&self) -> SessionSweeper {
        SessionSweeper::new(
            Arc::clone(&self.sessions),
            Duration::from_secs(self.config.session.sweep_interval_secs),
        )
    }

    // -------------------------------------------------------------------------
    // Graph surface
    // -------------------------------------------------------------------------

    /// Rebuild the graph wholesale from the host's entity snapshot.
    ///
    /// The only rebuild path: feature corpus statistics are recomputed as
    /// part of the same operation so vectors and IDF always agree.
    pub fn build_from_entities(
        &self,
        entities: Vec<Node>,
        relationships: Vec<Edge>,
    ) -> Result<RebuildReport> {
        self.graph.rebuild(entities, relationships)
    }

    /// Free-text semantic search over all nodes.
    ///
    /// The query goes through the same feature pipeline as node text.
    /// Empty graph or empty query yields an empty list.
    pub fn semantic_search(&self, query: &str, limit: usize) -> Vec<ScoredNode> {
        let snapshot = self.graph.snapshot();
        let vector = snapshot.extractor().vector(query);
        let hits = snapshot.index().rank(&vector, self.cap(limit));
        debug!(query, results = hits.len(), "semantic search");

        hits.into_iter()
            .filter_map(|hit| {
                snapshot.get(&hit.id).map(|node| ScoredNode {
                    node: node.clone(),
                    similarity: hit.score,
                })
            })
            .collect()
    }

    /// Nodes similar to an existing node.
    ///
    /// `SearchMode::Direct` restricts candidates to the node's graph
    /// neighbors and tags results as direct connections; `Global` ranks
    /// the whole graph. The seed node is never returned. Unknown ids
    /// yield an empty list.
    pub fn find_similar_nodes(
        &self,
        id: &NodeId,
        limit: usize,
        mode: SearchMode,
    ) -> Vec<RelatedNode> {
        let snapshot = self.graph.snapshot();
        if !snapshot.contains(id) {
            return Vec::new();
        }

        let (hits, connection) = match mode {
            SearchMode::Direct => {
                let candidates: Vec<NodeId> = snapshot
                    .neighbors(id, None)
                    .into_iter()
                    .filter(|n| n != id)
                    .collect();
                let Some(vector) = snapshot.index().vector(id) else {
                    return Vec::new();
                };
                (
                    snapshot
                        .index()
                        .rank_subset(vector, &candidates, self.cap(limit)),
                    ConnectionKind::Direct,
                )
            }
            SearchMode::Global => (
                snapshot.index().top_k(id, self.cap(limit)),
                ConnectionKind::Similar,
            ),
        };

        hits.into_iter()
            .filter_map(|hit| {
                snapshot.get(&hit.id).map(|node| RelatedNode {
                    node: node.clone(),
                    similarity: hit.score,
                    connection,
                })
            })
            .collect()
    }

    /// Group all nodes into similarity clusters at the given threshold.
    ///
    /// Computed fresh on each call; results are never cached across
    /// rebuilds.
    pub fn cluster_nodes(&self, threshold: f64) -> Vec<Cluster> {
        SimilarityClusterer::new(threshold).cluster(&self.graph.snapshot())
    }

    /// Mine a markdown document for concept and relationship candidates.
    ///
    /// Known names and domain terms come from the current snapshot. The
    /// report is advisory; nothing is merged into the graph.
    pub fn enrich_from_markdown(&self, title: &str, text: &str) -> EnrichmentReport {
        let snapshot = self.graph.snapshot();
        let vocabulary = Vocabulary::from_entries(
            snapshot
                .nodes()
                .iter()
                .map(|n| (n.name.as_str(), n.tags.as_slice())),
        );
        DocumentEnricher::new(self.config.enrichment.relation_confidence)
            .enrich(title, text, &vocabulary)
    }

    // -------------------------------------------------------------------------
    // Session surface
    // -------------------------------------------------------------------------

    /// Create or update a conversation session from its message history.
    pub fn update_session(&self, id: &SessionId, messages: &[String]) -> Result<Session> {
        self.sessions.create_or_update(id, messages, &self.graph)
    }

    /// Read a session without touching it.
    pub fn session(&self, id: &SessionId) -> Result<Option<Session>> {
        self.sessions.get(id)
    }

    /// Remove sessions idle past the TTL as of `now`; returns the count.
    pub fn clear_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        self.sessions.clear_expired(now)
    }

    /// Diagnostic decomposition of a question into retrieval steps.
    pub fn logic_flow(&self, question: &str, session_id: Option<&SessionId>) -> Result<LogicFlow> {
        let session = match session_id {
            Some(id) => self.sessions.get(id)?,
            None => None,
        };
        Ok(build_logic_flow(
            question,
            session.as_ref(),
            &self.graph,
            self.config.search.default_limit,
        ))
    }

    fn cap(&self, limit: usize) -> usize {
        limit.min(self.config.search.max_limit)
    }
}

impl Default for KnowledgeEngine {
    fn default() -> Self {
        Self::new(NoemaConfig::default())
    }
}

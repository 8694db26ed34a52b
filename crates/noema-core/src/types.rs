use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// The category of a knowledge-base entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// An abstract concept (e.g., "Fair Value Gap").
    Concept,
    /// A trading model or strategy.
    Model,
    /// A recorded trade.
    Trade,
    /// An imported document.
    Document,
    /// A free-form note.
    Note,
}

/// The semantic link carried by a directed edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Source applies or depends on the target.
    Uses,
    /// Source produces or results in the target.
    Produces,
    /// Target must be understood before the source.
    Prerequisite,
    /// Loose association without a stronger type.
    RelatedTo,
    /// Source is a component of the target.
    PartOf,
}

/// Candidate scope for node-seeded similarity search.
///
/// An explicit enum rather than a boolean so that call sites read as
/// `SearchMode::Direct` instead of a bare `true`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Restrict candidates to the seed node's graph neighbors.
    Direct,
    /// Rank the entire graph.
    #[default]
    Global,
}

/// How a similarity result is connected to the seed node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    /// Linked to the seed by an edge.
    Direct,
    /// Related by vector similarity only.
    Similar,
}

// =============================================================================
// Newtype Wrappers - Identity
// =============================================================================

/// Opaque, caller-supplied identifier for a node.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Opaque, caller-supplied identifier for a conversation session.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// =============================================================================
// Newtype Wrappers - Numeric
// =============================================================================

/// Confidence value. Range: 0.0 (none) to 1.0 (certain). Clamped on creation.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Confidence(pub f64);

impl Confidence {
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }
}

// =============================================================================
// Entity Structs
// =============================================================================

/// One knowledge-base entity as supplied by the host's snapshot.
///
/// Nodes are immutable once a snapshot generation is built; the engine
/// never mutates caller data in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Grouping label, e.g. "price-action" or "risk".
    pub domain: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    /// Optional full text body; only a bounded window feeds the features.
    pub content: Option<String>,
}

/// One directed, typed relationship between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub kind: EdgeKind,
}

// =============================================================================
// Tests
// =============================================================================

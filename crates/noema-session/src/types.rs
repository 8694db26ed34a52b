use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use noema_core::types::{Confidence, NodeId, SessionId};

/// Coarse intent detected in the latest message of a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Explicit retrieval request ("find", "show me", ...).
    Search,
    /// Interrogative phrasing without a retrieval verb.
    Question,
    /// Everything else.
    Statement,
}

/// State for one active conversation.
///
/// Owned exclusively by the [`SessionManager`](crate::SessionManager); the
/// host only ever references a session by id and receives clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    /// Node id to cumulative mention weight. Weights decay each turn so
    /// recent mentions dominate; near-zero entries are pruned.
    pub referenced_concepts: HashMap<NodeId, f64>,
    /// Name of the concept-kind node with the highest cumulative weight.
    pub topic: Option<String>,
    /// How consistently recent turns grounded to known concepts.
    pub confidence: Confidence,
    /// Intent detected in the latest message.
    pub last_inference: Option<Intent>,
    /// Whether each of the last N turns resolved to at least one known
    /// concept, oldest first.
    pub grounding: Vec<bool>,
}

impl Session {
    /// A fresh session created at `now`.
    pub fn new(id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at: now,
            last_active_at: now,
            referenced_concepts: HashMap::new(),
            topic: None,
            confidence: Confidence::new(0.0),
            last_inference: None,
            grounding: Vec::new(),
        }
    }
}

//! Diagnostic "logic flow" decomposition of a question.
//!
//! Produces a deterministic plan object describing how the engine would
//! gather candidates for a question: explicit mentions first, semantic
//! search as a fallback, then one hop of relationship expansion. Purely
//! descriptive; building a flow has no side effects.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use noema_core::types::NodeId;
use noema_graph::GraphStore;

use crate::manager::resolve_mentions;
use crate::types::Session;

/// The retrieval strategy a step stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStage {
    /// Resolve entity names mentioned in the question (and carried by the
    /// session) against the live graph.
    ResolveMentions,
    /// Fall back to semantic search over the whole graph.
    SemanticSearch,
    /// Expand one hop from already-gathered candidates via relationships.
    ExpandNeighbors,
}

/// One step of the plan, tagged with the candidates it contributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStep {
    pub stage: FlowStage,
    pub description: String,
    /// Candidates this step added that no earlier step contributed.
    pub candidates: Vec<NodeId>,
}

/// An ordered retrieval plan for one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicFlow {
    /// Generated id for logging and diagnostics.
    pub id: Uuid,
    pub question: String,
    pub steps: Vec<FlowStep>,
}

impl LogicFlow {
    /// Every candidate across all steps, in contribution order.
    pub fn all_candidates(&self) -> Vec<NodeId> {
        self.steps
            .iter()
            .flat_map(|s| s.candidates.iter().cloned())
            .collect()
    }
}

/// How many concepts the session contributes to mention resolution.
const SESSION_CONTEXT_LIMIT: usize = 3;

/// Decompose a question into an ordered list of retrieval steps.
///
/// Deterministic for a given question, session state, and snapshot: each
/// step only reports candidates not contributed by an earlier step.
pub fn build_logic_flow(
    question: &str,
    session: Option<&Session>,
    graph: &GraphStore,
    limit: usize,
) -> LogicFlow {
    let snapshot = graph.snapshot();
    let mut seen: Vec<NodeId> = Vec::new();

    // Step 1: explicit mentions, then the session's strongest concepts.
    let mut mention_candidates = resolve_mentions(question, &snapshot);
    if let Some(session) = session {
        let mut carried: Vec<(&NodeId, f64)> = session
            .referenced_concepts
            .iter()
            .filter(|(id, _)| snapshot.contains(id))
            .map(|(id, w)| (id, *w))
            .collect();
        carried.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(b.0))
        });
        for (id, _) in carried.into_iter().take(SESSION_CONTEXT_LIMIT) {
            mention_candidates.push(id.clone());
        }
    }
    let mention_candidates = dedup_new(&mut seen, mention_candidates);

    // Step 2: semantic fallback over the whole graph.
    let query = snapshot.extractor().vector(question);
    let semantic_candidates: Vec<NodeId> = snapshot
        .index()
        .rank(&query, limit)
        .into_iter()
        .filter(|hit| hit.score > 0.0)
        .map(|hit| hit.id)
        .collect();
    let semantic_candidates = dedup_new(&mut seen, semantic_candidates);

    // Step 3: one hop out from everything gathered so far.
    let mut expanded: Vec<NodeId> = Vec::new();
    for id in seen.clone() {
        expanded.extend(snapshot.neighbors(&id, None));
    }
    let expanded = dedup_new(&mut seen, expanded);

    LogicFlow {
        id: Uuid::new_v4(),
        question: question.to_string(),
        steps: vec![
            FlowStep {
                stage: FlowStage::ResolveMentions,
                description: "resolve explicit entity mentions against the graph".to_string(),
                candidates: mention_candidates,
            },
            FlowStep {
                stage: FlowStage::SemanticSearch,
                description: "fall back to semantic search over all nodes".to_string(),
                candidates: semantic_candidates,
            },
            FlowStep {
                stage: FlowStage::ExpandNeighbors,
                description: "expand one hop via relationships".to_string(),
                candidates: expanded,
            },
        ],
    }
}

/// Keep only ids not seen before, recording them as seen.
fn dedup_new(seen: &mut Vec<NodeId>, candidates: Vec<NodeId>) -> Vec<NodeId> {
    let mut fresh = Vec::new();
    for id in candidates {
        if !seen.contains(&id) {
            seen.push(id.clone());
            fresh.push(id);
        }
    }
    fresh
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use noema_core::types::{Edge, EdgeKind, Node, NodeKind, SessionId};

    fn make_node(id: &str, name: &str, description: &str) -> Node {
        Node {
            id: NodeId::from(id),
            kind: NodeKind::Concept,
            domain: "test".to_string(),
            name: name.to_string(),
            description: description.to_string(),
            tags: vec![],
            content: None,
        }
    }

    fn make_graph() -> GraphStore {
        let store = GraphStore::new(512);
        store
            .rebuild(
                vec![
                    make_node("fvg", "Fair Value Gap", "an imbalance in price"),
                    make_node("ob", "Order Block", "institutional footprint"),
                    make_node("ts", "Turtle Soup", "failed breakout reversal"),
                ],
                vec![Edge {
                    id: "e1".to_string(),
                    source_id: NodeId::from("fvg"),
                    target_id: NodeId::from("ob"),
                    kind: EdgeKind::RelatedTo,
                }],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_flow_has_three_ordered_steps() {
        let graph = make_graph();
        let flow = build_logic_flow("anything", None, &graph, 5);
        let stages: Vec<FlowStage> = flow.steps.iter().map(|s| s.stage).collect();
        assert_eq!(
            stages,
            vec![
                FlowStage::ResolveMentions,
                FlowStage::SemanticSearch,
                FlowStage::ExpandNeighbors
            ]
        );
    }

    #[test]
    fn test_explicit_mention_lands_in_first_step() {
        let graph = make_graph();
        let flow = build_logic_flow("is the fair value gap filled?", None, &graph, 5);
        assert_eq!(flow.steps[0].candidates, vec![NodeId::from("fvg")]);
    }

    #[test]
    fn test_semantic_step_excludes_mentioned() {
        let graph = make_graph();
        let flow = build_logic_flow("is the fair value gap filled?", None, &graph, 5);
        assert!(!flow.steps[1].candidates.contains(&NodeId::from("fvg")));
    }

    #[test]
    fn test_semantic_fallback_finds_by_meaning() {
        let graph = make_graph();
        let flow = build_logic_flow("imbalance in price", None, &graph, 5);
        // No node name is mentioned verbatim, so step 1 is empty and the
        // semantic step carries the match.
        assert!(flow.steps[0].candidates.is_empty());
        assert!(flow.steps[1].candidates.contains(&NodeId::from("fvg")));
    }

    #[test]
    fn test_expansion_contributes_neighbors() {
        let graph = make_graph();
        let flow = build_logic_flow("tell me about the Fair Value Gap", None, &graph, 0);
        // Step 2 is disabled via limit 0; step 3 expands fvg -> ob.
        assert_eq!(flow.steps[0].candidates, vec![NodeId::from("fvg")]);
        assert!(flow.steps[1].candidates.is_empty());
        assert_eq!(flow.steps[2].candidates, vec![NodeId::from("ob")]);
    }

    #[test]
    fn test_session_context_feeds_first_step() {
        let graph = make_graph();
        let mut session = Session::new(SessionId::from("s1"), Utc::now());
        session.referenced_concepts.insert(NodeId::from("ts"), 2.0);

        let flow = build_logic_flow("unrelated words entirely", Some(&session), &graph, 0);
        assert_eq!(flow.steps[0].candidates, vec![NodeId::from("ts")]);
    }

    #[test]
    fn test_session_concepts_missing_from_graph_are_skipped() {
        let graph = make_graph();
        let mut session = Session::new(SessionId::from("s1"), Utc::now());
        session
            .referenced_concepts
            .insert(NodeId::from("deleted-node"), 5.0);

        let flow = build_logic_flow("unrelated", Some(&session), &graph, 0);
        assert!(flow.steps[0].candidates.is_empty());
    }

    #[test]
    fn test_no_candidate_reported_twice() {
        let graph = make_graph();
        let flow = build_logic_flow("fair value gap and order block", None, &graph, 5);
        let all = flow.all_candidates();
        let unique: std::collections::HashSet<_> = all.iter().collect();
        assert_eq!(all.len(), unique.len());
    }

    #[test]
    fn test_flow_on_empty_graph() {
        let graph = GraphStore::new(512);
        let flow = build_logic_flow("anything at all", None, &graph, 5);
        assert!(flow.steps.iter().all(|s| s.candidates.is_empty()));
    }

    #[test]
    fn test_flow_steps_are_deterministic() {
        let graph = make_graph();
        let a = build_logic_flow("order block near a gap", None, &graph, 5);
        let b = build_logic_flow("order block near a gap", None, &graph, 5);
        assert_eq!(a.steps, b.steps);
        // Ids are diagnostic and differ per flow.
        assert_ne!(a.id, b.id);
    }
}

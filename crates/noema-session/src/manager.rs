//! Session lifecycle: lazy creation, per-turn updates, TTL expiry.
//!
//! One mutex guards the session table; every read/mutate/remove takes it,
//! so the expiry sweep can never observe a session mid-update. Session
//! volume is small (one per live conversation), so the single lock is the
//! whole concurrency story.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use noema_core::error::{NoemaError, Result};
use noema_core::types::{Confidence, NodeId, NodeKind, SessionId};
use noema_graph::{GraphSnapshot, GraphStore};

use crate::types::{Intent, Session};

/// Per-turn multiplier applied to existing mention weights, so recent
/// mentions dominate the topic.
const MENTION_DECAY: f64 = 0.9;

/// Weights below this are pruned; without it a long session would keep an
/// entry for every concept it ever brushed past.
const MENTION_FLOOR: f64 = 0.05;

/// Per-turn decay used in the confidence score: the newest turn counts
/// full, each older turn 0.7x the one after it.
const CONFIDENCE_DECAY: f64 = 0.7;

/// Owns every session record and the mutual-exclusion boundary around them.
#[derive(Debug)]
pub struct SessionManager {
    sessions: Mutex<HashMap<SessionId, Session>>,
    ttl: Duration,
    confidence_window: usize,
}

impl SessionManager {
    /// Create a manager with the given idle TTL and confidence window.
    pub fn new(ttl_minutes: u32, confidence_window: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl: Duration::minutes(i64::from(ttl_minutes)),
            confidence_window: confidence_window.max(1),
        }
    }

    /// The configured idle time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create the session if absent, then fold the latest message into it.
    ///
    /// Resolves node-name mentions against the live graph, re-weights
    /// referenced concepts, recomputes the topic and confidence, and
    /// resets the TTL clock. Returns a clone of the updated record.
    pub fn create_or_update(
        &self,
        id: &SessionId,
        messages: &[String],
        graph: &GraphStore,
    ) -> Result<Session> {
        let now = Utc::now();
        let snapshot = graph.snapshot();
        let latest = messages.last().map(String::as_str).unwrap_or("");
        let mentioned = resolve_mentions(latest, &snapshot);

        let mut sessions = lock(&self.sessions)?;
        let session = sessions
            .entry(id.clone())
            .or_insert_with(|| {
                debug!(session_id = %id, "session created");
                Session::new(id.clone(), now)
            });

        session.last_active_at = now;

        for weight in session.referenced_concepts.values_mut() {
            *weight *= MENTION_DECAY;
        }
        for node_id in &mentioned {
            *session
                .referenced_concepts
                .entry(node_id.clone())
                .or_insert(0.0) += 1.0;
        }
        session
            .referenced_concepts
            .retain(|_, weight| *weight > MENTION_FLOOR);

        session.topic = infer_topic(&session.referenced_concepts, &snapshot);

        session.grounding.push(!mentioned.is_empty());
        let overflow = session.grounding.len().saturating_sub(self.confidence_window);
        if overflow > 0 {
            session.grounding.drain(..overflow);
        }
        session.confidence = grounding_confidence(&session.grounding);

        session.last_inference = classify_intent(latest);

        Ok(session.clone())
    }

    /// Look up a session by id. Pure read; never mutates or touches the
    /// TTL clock.
    pub fn get(&self, id: &SessionId) -> Result<Option<Session>> {
        let sessions = lock(&self.sessions)?;
        Ok(sessions.get(id).cloned())
    }

    /// Remove every session idle longer than the TTL as of `now`.
    ///
    /// The clock is injected so expiry stays trivially testable; the
    /// background sweeper passes `Utc::now()`.
    pub fn clear_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut sessions = lock(&self.sessions)?;
        let before = sessions.len();
        sessions.retain(|_, session| now.signed_duration_since(session.last_active_at) <= self.ttl);
        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, remaining = sessions.len(), "expired sessions cleared");
        }
        Ok(removed)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock<'a>(
    sessions: &'a Mutex<HashMap<SessionId, Session>>,
) -> Result<std::sync::MutexGuard<'a, HashMap<SessionId, Session>>> {
    sessions
        .lock()
        .map_err(|e| NoemaError::Session(format!("Lock poisoned: {}", e)))
}

/// Node ids whose names occur in the message, in snapshot order.
///
/// Case-insensitive whole-name substring match; names shorter than three
/// characters never match.
pub(crate) fn resolve_mentions(message: &str, snapshot: &GraphSnapshot) -> Vec<NodeId> {
    if message.trim().is_empty() {
        return Vec::new();
    }
    let message_lower = message.to_lowercase();
    snapshot
        .nodes()
        .iter()
        .filter(|node| node.name.len() >= 3)
        .filter(|node| message_lower.contains(&node.name.to_lowercase()))
        .map(|node| node.id.clone())
        .collect()
}

/// The concept-kind node with the highest cumulative mention weight.
///
/// Ties keep the earliest node in snapshot order, so the topic is
/// deterministic for a given session history.
fn infer_topic(weights: &HashMap<NodeId, f64>, snapshot: &GraphSnapshot) -> Option<String> {
    let mut best: Option<(&str, f64)> = None;
    for node in snapshot.nodes() {
        if node.kind != NodeKind::Concept {
            continue;
        }
        let Some(&weight) = weights.get(&node.id) else {
            continue;
        };
        if best.is_none_or(|(_, w)| weight > w) {
            best = Some((node.name.as_str(), weight));
        }
    }
    best.map(|(name, _)| name.to_string())
}

/// Recency-weighted fraction of recent turns that grounded to a concept.
fn grounding_confidence(grounding: &[bool]) -> Confidence {
    let mut num = 0.0;
    let mut den = 0.0;
    for (age, grounded) in grounding.iter().rev().enumerate() {
        let weight = CONFIDENCE_DECAY.powi(age as i32);
        den += weight;
        if *grounded {
            num += weight;
        }
    }
    if den == 0.0 {
        Confidence::new(0.0)
    } else {
        Confidence::new(num / den)
    }
}

/// Coarse intent of the latest message. Retrieval verbs win over
/// interrogative phrasing.
fn classify_intent(message: &str) -> Option<Intent> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_lowercase();

    const SEARCH_MARKERS: &[&str] = &["find", "show me", "search", "look for", "look up", "what did"];
    if SEARCH_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(Intent::Search);
    }

    const QUESTION_STARTERS: &[&str] = &["what", "how", "why", "when", "where", "who", "which", "is ", "are ", "does ", "can "];
    if lower.ends_with('?') || QUESTION_STARTERS.iter().any(|q| lower.starts_with(q)) {
        return Some(Intent::Question);
    }

    Some(Intent::Statement)
}

// =============================================================================
// Tests
// =============================================================================

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use noema_core::types::Confidence;
use noema_vector::tokenize;

/// One candidate concept found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptMention {
    /// Display name of the concept as it appeared (or as the graph spells it).
    pub name: String,
    /// True if the name matches a node already in the graph.
    pub known: bool,
    /// How many times it occurred in the document.
    pub occurrences: usize,
}

/// One candidate relationship between two extracted concepts.
///
/// Always untyped ("related") and low confidence: paragraph co-occurrence
/// is a hint, never evidence for a typed edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationCandidate {
    pub source: String,
    pub target: String,
    pub label: String,
    pub confidence: Confidence,
}

/// The advisory output of enriching one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentReport {
    /// Generated id for diagnostics and logging.
    pub id: Uuid,
    pub title: String,
    pub concepts: Vec<ConceptMention>,
    pub relations: Vec<RelationCandidate>,
    /// Heuristic technical complexity, 0.0 (trivial) to 1.0 (dense).
    pub complexity: f64,
}

/// Names and domain terms from the current graph snapshot.
///
/// Built by the caller from live nodes so the enricher can recognize known
/// concepts and measure domain-term density without depending on the graph
/// crate.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    names: Vec<String>,
    domain_terms: HashSet<String>,
}

impl Vocabulary {
    /// Build from `(name, tags)` pairs of live nodes.
    ///
    /// Names shorter than 3 characters are skipped: they match too much.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a [String])>) -> Self {
        let mut names = Vec::new();
        let mut domain_terms = HashSet::new();

        for (name, tags) in entries {
            if name.trim().len() >= 3 {
                names.push(name.trim().to_string());
            }
            for token in tokenize(name) {
                domain_terms.insert(token);
            }
            for tag in tags {
                for token in tokenize(tag) {
                    domain_terms.insert(token);
                }
            }
        }

        Self {
            names,
            domain_terms,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.domain_terms.is_empty()
    }

    /// Known node names, original casing preserved.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// True if a lowercase token comes from a node name or tag.
    pub fn is_domain_term(&self, token: &str) -> bool {
        self.domain_terms.contains(token)
    }
}

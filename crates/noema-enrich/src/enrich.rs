//! Document enrichment: concept mentions, co-occurrence relations, and a
//! complexity heuristic.
//!
//! Markdown syntax is stripped before analysis so code fences and heading
//! markers cannot masquerade as concepts.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use uuid::Uuid;

use noema_core::types::Confidence;

use crate::types::{ConceptMention, EnrichmentReport, RelationCandidate, Vocabulary};

static CODE_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static INLINE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`[^`]*`").unwrap());
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#{1,6}[ \t]*").unwrap());
static EMPHASIS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[*_]{1,3}").unwrap());

/// Capitalized multi-word phrase: two or more capitalized words in a row.
static CAP_PHRASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z0-9]+(?:\s+[A-Z][a-z0-9]+)+\b").unwrap());

static PARAGRAPH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n[ \t]*\n").unwrap());

/// Extracts advisory concept and relationship candidates from free text.
pub struct DocumentEnricher {
    /// Confidence attached to every co-occurrence relation.
    pub relation_confidence: f64,
}

impl DocumentEnricher {
    pub fn new(relation_confidence: f64) -> Self {
        Self {
            relation_confidence,
        }
    }

    /// Enrich one document against the given graph vocabulary.
    ///
    /// The output is advisory only: candidate concepts and relations are
    /// never merged into the graph by the engine.
    pub fn enrich(&self, title: &str, text: &str, vocabulary: &Vocabulary) -> EnrichmentReport {
        let stripped = strip_markdown(text);
        let full = if title.trim().is_empty() {
            stripped
        } else {
            format!("{}\n\n{}", title.trim(), stripped)
        };

        // Candidate concepts: capitalized phrases, then known node names.
        // Keyed by lowercase so spellings merge; BTreeMap keeps the output
        // order deterministic.
        let mut mentions: BTreeMap<String, ConceptMention> = BTreeMap::new();

        for m in CAP_PHRASE_RE.find_iter(&full) {
            let Some(phrase) = trim_leading_common_words(m.as_str()) else {
                continue;
            };
            let entry = mentions
                .entry(phrase.to_lowercase())
                .or_insert(ConceptMention {
                    name: phrase,
                    known: false,
                    occurrences: 0,
                });
            entry.occurrences += 1;
        }

        let lower_full = full.to_lowercase();
        for name in vocabulary.names() {
            let needle = name.to_lowercase();
            let count = lower_full.matches(&needle).count();
            if count == 0 {
                continue;
            }
            let entry = mentions.entry(needle).or_insert(ConceptMention {
                name: name.clone(),
                known: true,
                occurrences: 0,
            });
            entry.known = true;
            // Prefer the graph's spelling over whatever the document used.
            entry.name = name.clone();
            entry.occurrences = entry.occurrences.max(count);
        }

        let concepts: Vec<ConceptMention> = mentions.into_values().collect();

        // Candidate relations: two concepts in the same paragraph.
        let mut pairs: BTreeSet<(String, String)> = BTreeSet::new();
        for paragraph in PARAGRAPH_RE.split(&full) {
            let paragraph_lower = paragraph.to_lowercase();
            let present: Vec<&ConceptMention> = concepts
                .iter()
                .filter(|c| paragraph_lower.contains(&c.name.to_lowercase()))
                .collect();
            for i in 0..present.len() {
                for j in (i + 1)..present.len() {
                    let (a, b) = (&present[i].name, &present[j].name);
                    let pair = if a.to_lowercase() <= b.to_lowercase() {
                        (a.clone(), b.clone())
                    } else {
                        (b.clone(), a.clone())
                    };
                    pairs.insert(pair);
                }
            }
        }

        let relations: Vec<RelationCandidate> = pairs
            .into_iter()
            .map(|(source, target)| RelationCandidate {
                source,
                target,
                label: "related".to_string(),
                confidence: Confidence::new(self.relation_confidence),
            })
            .collect();

        let complexity = complexity_score(&full, vocabulary);

        debug!(
            concepts = concepts.len(),
            relations = relations.len(),
            complexity,
            "document enriched"
        );

        EnrichmentReport {
            id: Uuid::new_v4(),
            title: title.to_string(),
            concepts,
            relations,
            complexity,
        }
    }
}

impl Default for DocumentEnricher {
    fn default() -> Self {
        Self::new(0.3)
    }
}

/// Remove markdown structure that would otherwise pollute extraction.
fn strip_markdown(text: &str) -> String {
    let text = CODE_FENCE_RE.replace_all(text, " ");
    let text = INLINE_CODE_RE.replace_all(&text, " ");
    let text = LINK_RE.replace_all(&text, "$1");
    let text = HEADING_RE.replace_all(&text, "");
    EMPHASIS_RE.replace_all(&text, "").into_owned()
}

/// Drop sentence-start words that capitalize for grammar, not meaning.
///
/// Returns the trimmed phrase if at least two words survive.
fn trim_leading_common_words(phrase: &str) -> Option<String> {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    let start = words
        .iter()
        .position(|w| !is_common_word(w))
        .unwrap_or(words.len());
    let rest = &words[start..];
    if rest.len() >= 2 {
        Some(rest.join(" "))
    } else {
        None
    }
}

/// Words that start sentences without naming anything.
fn is_common_word(s: &str) -> bool {
    matches!(
        s,
        "The"
            | "This"
            | "That"
            | "These"
            | "Those"
            | "There"
            | "Here"
            | "When"
            | "Where"
            | "What"
            | "Which"
            | "While"
            | "Why"
            | "How"
            | "They"
            | "It"
            | "If"
            | "In"
            | "On"
            | "At"
            | "For"
            | "With"
            | "From"
            | "And"
            | "But"
            | "Or"
            | "As"
            | "Is"
            | "Are"
            | "Was"
            | "Were"
            | "Be"
            | "To"
            | "Of"
            | "An"
            | "Any"
            | "Some"
            | "Most"
            | "Many"
            | "After"
            | "Before"
            | "During"
            | "Once"
            | "Then"
            | "Note"
            | "See"
    )
}

/// Normalized blend of vocabulary richness, sentence length, and density of
/// domain-specific terms.
fn complexity_score(text: &str, vocabulary: &Vocabulary) -> f64 {
    let words: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    if words.is_empty() {
        return 0.0;
    }

    let distinct: std::collections::HashSet<&String> = words.iter().collect();
    let distinct_ratio = distinct.len() as f64 / words.len() as f64;

    let sentence_count = text
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count()
        .max(1);
    let avg_sentence_len = words.len() as f64 / sentence_count as f64;
    let sentence_norm = (avg_sentence_len / 25.0).min(1.0);

    let domain_hits = words
        .iter()
        .filter(|w| vocabulary.is_domain_term(w))
        .count();
    let domain_density = domain_hits as f64 / words.len() as f64;

    (0.4 * distinct_ratio + 0.3 * sentence_norm + 0.3 * domain_density).clamp(0.0, 1.0)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        let tags_a = vec!["imbalance".to_string()];
        let tags_b = vec!["smart-money".to_string()];
        Vocabulary::from_entries([
            ("Fair Value Gap", tags_a.as_slice()),
            ("Order Block", tags_b.as_slice()),
        ])
    }

    fn enricher() -> DocumentEnricher {
        DocumentEnricher::new(0.3)
    }

    #[test]
    fn test_extracts_capitalized_phrases() {
        let report = enricher().enrich(
            "",
            "We watched the Turtle Soup setup form near the open.",
            &Vocabulary::default(),
        );
        let names: Vec<&str> = report.concepts.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"Turtle Soup"));
    }

    #[test]
    fn test_phrase_requires_two_words() {
        let report = enricher().enrich(
            "",
            "Momentum faded after lunch. Volume was thin.",
            &Vocabulary::default(),
        );
        assert!(report.concepts.is_empty());
    }

    #[test]
    fn test_leading_common_word_stripped() {
        let report = enricher().enrich(
            "",
            "The Order Block held on the retest.",
            &Vocabulary::default(),
        );
        let names: Vec<&str> = report.concepts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Order Block"]);
    }

    #[test]
    fn test_known_names_matched_case_insensitively() {
        let report = enricher().enrich(
            "",
            "price filled the fair value gap within an hour.",
            &vocab(),
        );
        let mention = report
            .concepts
            .iter()
            .find(|c| c.name == "Fair Value Gap")
            .expect("known name should be found");
        assert!(mention.known);
        assert_eq!(mention.occurrences, 1);
    }

    #[test]
    fn test_phrase_matching_known_name_is_merged() {
        let report = enricher().enrich("", "A clean Fair Value Gap appeared.", &vocab());
        let matches: Vec<&ConceptMention> = report
            .concepts
            .iter()
            .filter(|c| c.name.eq_ignore_ascii_case("fair value gap"))
            .collect();
        assert_eq!(matches.len(), 1);
        assert!(matches[0].known);
    }

    #[test]
    fn test_unknown_phrase_not_marked_known() {
        let report = enricher().enrich("", "The Silver Bullet window opened.", &vocab());
        let mention = report
            .concepts
            .iter()
            .find(|c| c.name == "Silver Bullet")
            .unwrap();
        assert!(!mention.known);
    }

    #[test]
    fn test_occurrences_counted() {
        let report = enricher().enrich(
            "",
            "Turtle Soup failed today. Yesterday the Turtle Soup worked.",
            &Vocabulary::default(),
        );
        let mention = report
            .concepts
            .iter()
            .find(|c| c.name == "Turtle Soup")
            .unwrap();
        assert_eq!(mention.occurrences, 2);
    }

    #[test]
    fn test_relation_from_same_paragraph() {
        let report = enricher().enrich(
            "",
            "The Fair Value Gap formed right above an Order Block.",
            &vocab(),
        );
        assert_eq!(report.relations.len(), 1);
        let rel = &report.relations[0];
        assert_eq!(rel.label, "related");
        assert_eq!(rel.source, "Fair Value Gap");
        assert_eq!(rel.target, "Order Block");
        assert!((rel.confidence.0 - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_no_relation_across_paragraphs() {
        let report = enricher().enrich(
            "",
            "The Fair Value Gap formed early.\n\nLater an Order Block held.",
            &vocab(),
        );
        assert!(report.relations.is_empty());
        assert_eq!(report.concepts.len(), 2);
    }

    #[test]
    fn test_relations_deduplicated_across_paragraphs() {
        let text = "Fair Value Gap met Order Block.\n\nAgain the Fair Value Gap met the Order Block.";
        let report = enricher().enrich("", text, &vocab());
        assert_eq!(report.relations.len(), 1);
    }

    #[test]
    fn test_title_participates_in_extraction() {
        let report = enricher().enrich("Order Block review", "Nothing else here.", &vocab());
        assert!(report.concepts.iter().any(|c| c.name == "Order Block"));
        assert_eq!(report.title, "Order Block review");
    }

    #[test]
    fn test_markdown_is_stripped() {
        let text = "# Heading Words\n\n```\nCode Fence Text ignored\n```\nSee the [Order Block](http://x) link and `Inline Code`.";
        let report = enricher().enrich("", text, &vocab());
        let names: Vec<&str> = report.concepts.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"Order Block"));
        assert!(!names.contains(&"Code Fence Text"));
        assert!(!names.contains(&"Inline Code"));
    }

    #[test]
    fn test_complexity_empty_text() {
        let report = enricher().enrich("", "", &vocab());
        assert_eq!(report.complexity, 0.0);
    }

    #[test]
    fn test_complexity_within_unit_range() {
        let texts = [
            "word",
            "word word word word word",
            "The Fair Value Gap is an imbalance the market tends to revisit, \
             and an Order Block marks where smart money positioned before the move.",
        ];
        for text in texts {
            let report = enricher().enrich("", text, &vocab());
            assert!(
                (0.0..=1.0).contains(&report.complexity),
                "complexity out of range for {:?}",
                text
            );
        }
    }

    #[test]
    fn test_complexity_rewards_domain_density() {
        let domain_heavy = enricher().enrich(
            "",
            "Fair value gap imbalance meets order block money flow.",
            &vocab(),
        );
        let generic = enricher().enrich(
            "",
            "We went for a pleasant walk around the quiet park today.",
            &vocab(),
        );
        assert!(domain_heavy.complexity > generic.complexity);
    }

    #[test]
    fn test_reports_get_distinct_ids() {
        let a = enricher().enrich("", "text", &vocab());
        let b = enricher().enrich("", "text", &vocab());
        assert_ne!(a.id, b.id);
    }
}

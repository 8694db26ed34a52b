//! Deterministic sparse feature extraction.
//!
//! A node's text (name, description, tags, and a bounded window of content)
//! is turned into a sparse vector keyed by hashed n-grams: word unigrams
//! and bigrams for meaning, character trigrams to tolerate minor
//! misspellings. Weights are term frequency scaled by smoothed inverse
//! document frequency over the snapshot's node corpus, so vectors are only
//! comparable within one snapshot generation.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use noema_core::types::Node;

/// FNV-1a 64-bit hash. Stable across platforms and toolchains, unlike
/// `DefaultHasher`, which makes feature ids reproducible between runs.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Tokenize text into lowercase words.
///
/// Filters out single characters, stop words, and pure numbers.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .filter(|s| s.len() > 1)
        .filter(|s| !is_stop_word(s))
        .filter(|s| !s.chars().all(|c| c.is_numeric()))
        .map(String::from)
        .collect()
}

/// Check if a word is a stop word.
fn is_stop_word(word: &str) -> bool {
    const STOP_WORDS: &[&str] = &[
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is",
        "it", "its", "of", "on", "or", "that", "the", "to", "was", "were", "will", "with", "this",
        "they", "but", "have", "had", "what", "when", "where", "who", "which", "why", "how", "not",
        "can", "do", "does", "into", "than", "then", "there", "these", "those", "we", "you",
    ];
    STOP_WORDS.contains(&word)
}

/// Raw hashed feature counts for one piece of text.
///
/// Word n-grams and character trigrams are namespaced before hashing so the
/// two feature spaces cannot collide.
fn feature_counts(text: &str) -> HashMap<u64, f32> {
    let tokens = tokenize(text);
    let mut counts: HashMap<u64, f32> = HashMap::new();

    // Word unigrams.
    for token in &tokens {
        let key = fnv1a(format!("w1:{}", token).as_bytes());
        *counts.entry(key).or_insert(0.0) += 1.0;
    }

    // Word bigrams.
    for pair in tokens.windows(2) {
        let key = fnv1a(format!("w2:{} {}", pair[0], pair[1]).as_bytes());
        *counts.entry(key).or_insert(0.0) += 1.0;
    }

    // Character trigrams within each token.
    for token in &tokens {
        let chars: Vec<char> = token.chars().collect();
        for gram in chars.windows(3) {
            let gram: String = gram.iter().collect();
            let key = fnv1a(format!("c3:{}", gram).as_bytes());
            *counts.entry(key).or_insert(0.0) += 1.0;
        }
    }

    counts
}

// =============================================================================
// SparseVector
// =============================================================================

/// A sparse feature vector with its Euclidean norm cached at construction.
///
/// Terms are sorted by feature id, which keeps the dot product a single
/// merge walk and makes equality checks deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    terms: Vec<(u64, f32)>,
    norm: f32,
}

impl SparseVector {
    /// Build a vector from weighted features, dropping zero weights.
    pub fn from_weights(weights: HashMap<u64, f32>) -> Self {
        let mut terms: Vec<(u64, f32)> = weights
            .into_iter()
            .filter(|(_, w)| w.is_finite() && *w != 0.0)
            .collect();
        terms.sort_by_key(|(key, _)| *key);
        let norm = terms.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        Self { terms, norm }
    }

    /// A vector with no features (e.g. a node with empty text).
    pub fn zero() -> Self {
        Self::default()
    }

    /// True if the vector has no features. A zero vector has similarity
    /// 0.0 to everything, including another zero vector.
    pub fn is_zero(&self) -> bool {
        self.norm == 0.0
    }

    /// Number of non-zero features.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn norm(&self) -> f32 {
        self.norm
    }

    /// Cosine similarity with another vector.
    ///
    /// Returns 0.0 if either vector has zero magnitude. Clamped to [-1, 1]
    /// so float rounding can never leak an out-of-range score.
    pub fn cosine(&self, other: &SparseVector) -> f64 {
        if self.norm == 0.0 || other.norm == 0.0 {
            return 0.0;
        }

        let mut dot = 0.0f64;
        let (mut i, mut j) = (0, 0);
        while i < self.terms.len() && j < other.terms.len() {
            match self.terms[i].0.cmp(&other.terms[j].0) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    dot += f64::from(self.terms[i].1) * f64::from(other.terms[j].1);
                    i += 1;
                    j += 1;
                }
            }
        }

        (dot / (f64::from(self.norm) * f64::from(other.norm))).clamp(-1.0, 1.0)
    }
}

// =============================================================================
// CorpusStats
// =============================================================================

/// Document frequencies over one snapshot's node corpus.
///
/// Rebuilt whenever the graph is rebuilt: IDF depends on the whole corpus,
/// so stats from one generation must never score vectors of another.
#[derive(Debug, Clone, Default)]
pub struct CorpusStats {
    doc_frequencies: HashMap<u64, usize>,
    doc_count: usize,
}

impl CorpusStats {
    /// Compute document frequencies from a corpus of documents.
    pub fn from_documents<'a>(documents: impl IntoIterator<Item = &'a str>) -> Self {
        let mut doc_frequencies: HashMap<u64, usize> = HashMap::new();
        let mut doc_count = 0;

        for doc in documents {
            doc_count += 1;
            let features: HashSet<u64> = feature_counts(doc).into_keys().collect();
            for feature in features {
                *doc_frequencies.entry(feature).or_insert(0) += 1;
            }
        }

        Self {
            doc_frequencies,
            doc_count,
        }
    }

    /// Smoothed inverse document frequency: `ln((N + 1) / (df + 1)) + 1`.
    ///
    /// Features absent from the corpus score 0 so that query terms outside
    /// the snapshot's vocabulary contribute nothing.
    pub fn idf(&self, feature: u64) -> f32 {
        let df = *self.doc_frequencies.get(&feature).unwrap_or(&0) as f32;
        if df == 0.0 {
            return 0.0;
        }
        let n = self.doc_count as f32;
        ((n + 1.0) / (df + 1.0)).ln() + 1.0
    }

    pub fn doc_count(&self) -> usize {
        self.doc_count
    }
}

// =============================================================================
// FeatureExtractor
// =============================================================================

/// Turns node and query text into TF-IDF weighted sparse vectors.
///
/// One extractor belongs to one snapshot generation; the graph store builds
/// a fresh one on every rebuild so vectors and corpus stats stay consistent.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    content_window_chars: usize,
    stats: CorpusStats,
}

impl FeatureExtractor {
    /// Build an extractor over the given node corpus.
    pub fn from_nodes(content_window_chars: usize, nodes: &[Node]) -> Self {
        let texts: Vec<String> = nodes
            .iter()
            .map(|n| node_text(n, content_window_chars))
            .collect();
        let stats = CorpusStats::from_documents(texts.iter().map(String::as_str));
        Self {
            content_window_chars,
            stats,
        }
    }

    /// The corpus text for one node: name, description, tags, domain
    /// label, and a bounded window of content.
    pub fn node_text(&self, node: &Node) -> String {
        node_text(node, self.content_window_chars)
    }

    /// Embed a node through the same pipeline as the corpus.
    pub fn node_vector(&self, node: &Node) -> SparseVector {
        self.vector(&self.node_text(node))
    }

    /// Embed arbitrary text (e.g. a search query) against this corpus.
    ///
    /// Empty or all-stop-word text yields the zero vector.
    pub fn vector(&self, text: &str) -> SparseVector {
        let counts = feature_counts(text);
        let total: f32 = counts.values().sum();
        if total == 0.0 {
            return SparseVector::zero();
        }

        let weights: HashMap<u64, f32> = counts
            .into_iter()
            .map(|(feature, count)| {
                let tf = count / total;
                (feature, tf * self.stats.idf(feature))
            })
            .collect();

        SparseVector::from_weights(weights)
    }

    pub fn stats(&self) -> &CorpusStats {
        &self.stats
    }
}

fn node_text(node: &Node, content_window_chars: usize) -> String {
    let mut text = String::new();
    text.push_str(&node.name);
    text.push(' ');
    text.push_str(&node.description);
    for tag in &node.tags {
        text.push(' ');
        text.push_str(tag);
    }
    if !node.domain.is_empty() {
        text.push(' ');
        text.push_str(&node.domain);
    }
    if let Some(content) = &node.content {
        text.push(' ');
        // char-based window so a multi-byte boundary cannot split.
        text.extend(content.chars().take(content_window_chars));
    }
    text
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use noema_core::types::{NodeId, NodeKind};

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

    fn extractor_over(texts: &[&str]) -> FeatureExtractor {
        let nodes: Vec<Node> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| make_node(&format!("n{}", i), t, ""))
            .collect();
        FeatureExtractor::from_nodes(512, &nodes)
    }

    #[test]
    fn test_tokenize_filters() {
        let tokens = tokenize("The Quick-Brown FOX, a 42 x!");
        assert_eq!(tokens, vec!["quick", "brown", "fox"]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("the a an of").is_empty());
    }

    #[test]
    fn test_fnv1a_known_value() {
        // FNV-1a 64 of the empty input is the offset basis.
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        // Deterministic for the same input.
        assert_eq!(fnv1a(b"w1:gap"), fnv1a(b"w1:gap"));
        assert_ne!(fnv1a(b"w1:gap"), fnv1a(b"c3:gap"));
    }

    #[test]
    fn test_vector_is_deterministic() {
        let extractor = extractor_over(&["price imbalance left by a fast move", "order block"]);
        let a = extractor.vector("price imbalance");
        let b = extractor.vector("price imbalance");
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_text_yields_zero_vector() {
        let extractor = extractor_over(&["some corpus text"]);
        let v = extractor.vector("");
        assert!(v.is_zero());
        assert!(v.is_empty());
        assert_eq!(v.norm(), 0.0);
    }

    #[test]
    fn test_self_cosine_is_one() {
        let extractor = extractor_over(&["fair value gap imbalance", "order block"]);
        let v = extractor.vector("fair value gap imbalance");
        assert!(!v.is_zero());
        assert!((v.cosine(&v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_is_symmetric() {
        let extractor = extractor_over(&["alpha beta gamma", "beta gamma delta"]);
        let a = extractor.vector("alpha beta gamma");
        let b = extractor.vector("beta gamma delta");
        assert!((a.cosine(&b) - b.cosine(&a)).abs() < 1e-9);
    }

    #[test]
    fn test_zero_vector_similarity_is_zero() {
        let extractor = extractor_over(&["alpha beta"]);
        let zero = extractor.vector("");
        let v = extractor.vector("alpha beta");
        assert_eq!(zero.cosine(&v), 0.0);
        assert_eq!(v.cosine(&zero), 0.0);
        // Two zero vectors are similarity 0 as well; 1.0 only holds for a
        // node with itself, by convention, and is never computed.
        assert_eq!(zero.cosine(&zero), 0.0);
    }

    #[test]
    fn test_char_trigrams_tolerate_misspelling() {
        let extractor = extractor_over(&["imbalance in price movement", "order block zone"]);
        let correct = extractor.vector("imbalance");
        let misspelled = extractor.vector("imbalanse");
        // No shared word n-gram, but shared character trigrams keep the
        // similarity above zero.
        assert!(correct.cosine(&misspelled) > 0.0);
    }

    #[test]
    fn test_idf_downweights_common_terms() {
        // "market" appears in every document, "wyckoff" in one.
        let extractor = extractor_over(&[
            "market structure wyckoff",
            "market session",
            "market volume",
        ]);
        let common = fnv1a(b"w1:market");
        let rare = fnv1a(b"w1:wyckoff");
        assert!(extractor.stats().idf(rare) > extractor.stats().idf(common));
    }

    #[test]
    fn test_idf_unknown_feature_is_zero() {
        let extractor = extractor_over(&["alpha beta"]);
        assert_eq!(extractor.stats().idf(fnv1a(b"w1:zzzzz")), 0.0);
    }

    #[test]
    fn test_out_of_vocabulary_query_is_zero_vector() {
        let extractor = extractor_over(&["alpha beta gamma"]);
        let v = extractor.vector("zzz qqq xxx");
        assert!(v.is_zero());
    }

    #[test]
    fn test_content_window_bounds_cost() {
        let mut node = make_node("n1", "name", "desc");
        node.content = Some("word ".repeat(100_000));

        let short = FeatureExtractor::from_nodes(16, std::slice::from_ref(&node));
        let text = short.node_text(&node);
        // name + desc + 16 chars of content, give or take separators.
        assert!(text.len() < 40);
    }

    #[test]
    fn test_corpus_stats_doc_count() {
        let stats = CorpusStats::from_documents(["a b", "c d", "e f"]);
        assert_eq!(stats.doc_count(), 3);
        let empty = CorpusStats::from_documents([]);
        assert_eq!(empty.doc_count(), 0);
    }

    #[test]
    fn test_node_text_includes_tags() {
        let mut node = make_node("n1", "Order Block", "institutional footprint");
        node.tags = vec!["smart-money".to_string()];
        let extractor = FeatureExtractor::from_nodes(512, std::slice::from_ref(&node));
        let tagged = extractor.vector("smart money");
        let own = extractor.node_vector(&node);
        assert!(own.cosine(&tagged) > 0.0);
    }

    #[test]
    fn test_from_weights_drops_zeros() {
        let mut weights = HashMap::new();
        weights.insert(1u64, 0.0f32);
        weights.insert(2u64, 0.5f32);
        let v = SparseVector::from_weights(weights);
        assert_eq!(v.len(), 1);
    }
}

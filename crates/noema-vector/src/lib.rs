//! Noema Vector crate - deterministic text features and similarity ranking.
//!
//! Provides the feature extraction pipeline (hashed word and character
//! n-grams weighted by TF-IDF over the current snapshot corpus) and a
//! similarity index with stable, deterministic top-k ranking. No external
//! embedding model and no network calls: the same text and corpus always
//! produce the same vector.

pub mod features;
pub mod index;

pub use features::{tokenize, CorpusStats, FeatureExtractor, SparseVector};
pub use index::{SearchHit, SimilarityIndex};

//! Noema Enrich crate - concept and relationship mining from free text.
//!
//! Scans a document (typically markdown) for candidate concept names,
//! candidate relationships between them, and a heuristic complexity score.
//! Everything produced here is advisory: nothing is ever merged into the
//! graph automatically; the caller decides whether to promote candidates
//! into real entities.

pub mod enrich;
pub mod types;

pub use enrich::DocumentEnricher;
pub use types::{ConceptMention, EnrichmentReport, RelationCandidate, Vocabulary};

use thiserror::Error;

/// Top-level error type for the Noema engine.
///
/// Subsystem crates define their own error types where they have dedicated
/// failure modes and convert into `NoemaError` at the facade boundary so
/// that the `?` operator works across crate seams.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NoemaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Enrichment error: {0}")]
    Enrichment(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for NoemaError {
    fn from(err: toml::de::Error) -> Self {
        NoemaError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for NoemaError {
    fn from(err: toml::ser::Error) -> Self {
        NoemaError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for NoemaError {
    fn from(err: serde_json::Error) -> Self {
        NoemaError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Noema operations.
pub type Result<T> = std::result::Result<T, NoemaError>;

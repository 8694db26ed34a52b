use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Top-level configuration for a Noema engine instance.
///
/// Loaded from a TOML file by the host; every field has a default so an
/// empty file (or no file at all) yields a working engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoemaConfig {
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl NoemaConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: NoemaConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// Feature extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// How many leading characters of a node's `content` feed the features.
    pub content_window_chars: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            content_window_chars: 512,
        }
    }
}

/// Similarity search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Result count when the caller does not supply a limit.
    pub default_limit: usize,
    /// Upper bound on any caller-supplied limit.
    pub max_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

/// Clustering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Threshold when the caller does not supply one.
    pub default_threshold: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            default_threshold: 0.35,
        }
    }
}

/// Document enrichment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Confidence attached to paragraph co-occurrence relations.
    pub relation_confidence: f64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            relation_confidence: 0.3,
        }
    }
}

/// Conversation session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle minutes before a session is reclaimed.
    pub ttl_minutes: u32,
    /// Seconds between background expiry sweeps.
    pub sweep_interval_secs: u64,
    /// How many recent turns feed the confidence score.
    pub confidence_window: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 60,
            sweep_interval_secs: 3600,
            confidence_window: 5,
        }
    }
}

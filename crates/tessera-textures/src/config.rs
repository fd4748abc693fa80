//! Import pipeline configuration.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::TextureError;

/// When cached images are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Keep every decoded image for the lifetime of the importer.
    #[default]
    Never,
    /// Keep at most `capacity` images, dropping the least recently used.
    Lru { capacity: NonZeroUsize },
    /// At the end of each tick, drop images whose address no live
    /// `TextureRequest` mentions.
    ReleaseUnreferenced,
}

/// What a request does when its bytes are present but undecodable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeFailurePolicy {
    /// Treat it like missing bytes: keep retrying until the timeout.
    #[default]
    Retry,
    /// Give up immediately with `NotFound`.
    FailFast,
}

/// Settings for [`TextureImportSystem`](crate::import::TextureImportSystem).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    /// Timeout in seconds for requests built by the importer.
    pub default_timeout: f64,
    pub eviction: EvictionPolicy,
    pub decode_failure: DecodeFailurePolicy,
}

impl Default for ImportConfig {
    /// Five second timeout, unbounded cache, retry on malformed images.
    fn default() -> Self {
        Self {
            default_timeout: 5.0,
            eviction: EvictionPolicy::Never,
            decode_failure: DecodeFailurePolicy::Retry,
        }
    }
}

impl ImportConfig {
    /// Parse and validate a JSON document. Missing fields take their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self, TextureError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TextureError> {
        if !(self.default_timeout.is_finite() && self.default_timeout > 0.0) {
            return Err(TextureError::InvalidConfig(format!(
                "default_timeout must be positive and finite, got {}",
                self.default_timeout
            )));
        }
        Ok(())
    }
}

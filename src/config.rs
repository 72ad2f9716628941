use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables of a validation run. Every field has a default, so partial
/// JSON/YAML documents are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Upper bound for a single vocabulary download.
    pub download_timeout_secs: u64,
    /// Entries shorter than this get no "Similar" hint.
    pub similar_min_length: usize,
    /// Characters dropped from the end of an entry to build the search prefix.
    pub similar_trim: usize,
    /// How much longer than the entry a similar match may be.
    pub similar_length_window: usize,
    pub similar_limit: usize,
    /// Search page used for the fallback hint; the entry is appended as `?q=`.
    pub suggestion_url: String,
    /// Re-parse line by line after a syntax error to report every broken line.
    pub line_by_line_fallback: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            download_timeout_secs: 30,
            similar_min_length: 6,
            similar_trim: 2,
            similar_length_window: 2,
            similar_limit: 20,
            suggestion_url: "https://www.ebi.ac.uk/ols/search".to_string(),
            line_by_line_fallback: true,
        }
    }
}

impl ValidatorConfig {
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Json(e.to_string()))
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|e| ConfigError::Yaml(e.to_string()))
    }
}

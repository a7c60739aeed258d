//! Retrieval service configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Where the clinical context retrieval service lives.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    /// Base URL of the retrieval service
    pub base_url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl RetrievalConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate retrieval configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired("RETRIEVAL__BASE_URL"));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ValidationError::InvalidUrl("retrieval.base_url"));
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("retrieval.timeout_secs"));
        }
        Ok(())
    }
}

fn default_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_accepts_http_and_https() {
        for url in ["http://localhost:9000", "https://retrieval.internal"] {
            let config = RetrievalConfig {
                base_url: url.to_string(),
                timeout_secs: 30,
            };
            assert!(config.validate().is_ok(), "{url} should be valid");
        }
    }

    #[test]
    fn test_validation_rejects_missing_or_bad_url() {
        let config = RetrievalConfig {
            base_url: String::new(),
            timeout_secs: 30,
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("RETRIEVAL__BASE_URL"))
        );

        let config = RetrievalConfig {
            base_url: "ftp://files".to_string(),
            timeout_secs: 30,
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidUrl("retrieval.base_url"))
        );
    }
}

//! AI provider configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// OpenAI chat-completions configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// OpenAI API key
    pub openai_api_key: SecretString,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Maximum tokens to generate per answer
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Confidence score reported with every answer
    #[serde(default = "default_confidence")]
    pub confidence: f64,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries on retryable failures (non-streaming only)
    #[serde(default = "default_retries")]
    pub max_retries: u32,

    /// Stream tokens as the model produces them
    #[serde(default = "default_streaming")]
    pub streaming: bool,
}

impl AiConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate AI configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.openai_api_key.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("AI__OPENAI_API_KEY"));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ValidationError::InvalidUrl("ai.base_url"));
        }
        if self.max_tokens == 0 {
            return Err(ValidationError::InvalidMaxTokens);
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ValidationError::InvalidTemperature);
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ValidationError::InvalidConfidence);
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("ai.timeout_secs"));
        }
        Ok(())
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_confidence() -> f64 {
    0.85
}

fn default_timeout() -> u64 {
    60
}

fn default_retries() -> u32 {
    2
}

fn default_streaming() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AiConfig {
        AiConfig {
            openai_api_key: SecretString::new("sk-test".to_string()),
            model: default_model(),
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            confidence: default_confidence(),
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
            streaming: default_streaming(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AiConfig {
            timeout_secs: 45,
            ..valid_config()
        };
        assert_eq!(config.timeout(), Duration::from_secs(45));
    }

    #[test]
    fn test_validation_missing_key() {
        let config = AiConfig {
            openai_api_key: SecretString::new(String::new()),
            ..valid_config()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("AI__OPENAI_API_KEY"))
        );
    }

    #[test]
    fn test_validation_confidence_range() {
        let config = AiConfig {
            confidence: 1.5,
            ..valid_config()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidConfidence));

        let config = AiConfig {
            confidence: 0.0,
            ..valid_config()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_base_url_scheme() {
        let config = AiConfig {
            base_url: "api.openai.com".to_string(),
            ..valid_config()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidUrl("ai.base_url"))
        );
    }

    #[test]
    fn test_validation_zero_max_tokens() {
        let config = AiConfig {
            max_tokens: 0,
            ..valid_config()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidMaxTokens));
    }
}

//! Agent configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::backoff::BackoffConfig;
use super::serde_utils::duration_secs;
use crate::error::ConfigError;
use crate::types::ApiToken;

/// Configuration for the monitoring agent's API connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// API server address, `host` or `host:port`.
    ///
    /// The part before the last colon is used as the TLS server name, so
    /// IPv6 literals must not be written unbracketed.
    pub api_server_address: String,

    /// Token sent as `authorization: Bearer <token>` on every call
    pub api_token: ApiToken,

    /// Dial the API server in plaintext.
    ///
    /// **Warning**: the bearer token is then sent unencrypted.
    pub allow_insecure: bool,

    /// How long a single dial may take before giving up
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Backoff configuration for reconnections
    pub backoff: BackoffConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_server_address: "localhost:4031".to_string(),
            api_token: ApiToken::default(),
            allow_insecure: false,
            connect_timeout: Duration::from_secs(30),
            backoff: BackoffConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Check the configuration for values the agent cannot run with.
    ///
    /// An empty token is allowed here; it is the API server's job to
    /// reject it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_server_address.trim().is_empty() {
            return Err(ConfigError::MissingField("api_server_address".to_string()));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "connect_timeout must be greater than zero".to_string(),
            ));
        }
        self.backoff.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_secure() {
        let config = AgentConfig::default();
        assert!(!config.allow_insecure);
        assert!(config.api_token.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AgentConfig = toml::from_str(
            r#"
            api_server_address = "api.example.net:443"
            api_token = "abc"
            "#,
        )
        .unwrap();
        assert_eq!(config.api_server_address, "api.example.net:443");
        assert_eq!(config.api_token.expose(), "abc");
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.backoff.initial, Duration::from_millis(500));
    }

    #[test]
    fn test_insecure_and_timeout_from_toml() {
        let config: AgentConfig = toml::from_str(
            r#"
            allow_insecure = true
            connect_timeout = 5

            [backoff]
            initial = 100
            max = 2000
            multiplier = 1.5
            jitter = 0.0
            "#,
        )
        .unwrap();
        assert!(config.allow_insecure);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.backoff.max, Duration::from_secs(2));
    }

    #[test]
    fn test_validate_rejects_empty_address() {
        let config = AgentConfig {
            api_server_address: "  ".to_string(),
            ..AgentConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField(field)) if field == "api_server_address"
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = AgentConfig {
            connect_timeout: Duration::ZERO,
            ..AgentConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let config = AgentConfig {
            api_token: "super-secret".into(),
            ..AgentConfig::default()
        };
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}

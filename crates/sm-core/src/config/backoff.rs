//! Reconnect backoff configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::duration_millis;
use crate::error::ConfigError;

/// Exponential backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Initial delay, in milliseconds
    #[serde(with = "duration_millis")]
    pub initial: Duration,

    /// Maximum delay, in milliseconds
    #[serde(with = "duration_millis")]
    pub max: Duration,

    /// Multiplier for each retry
    pub multiplier: f64,

    /// Jitter factor (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: 0.25,
        }
    }
}

impl BackoffConfig {
    /// Reject parameters that would make the backoff shrink or never grow.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial > self.max {
            return Err(ConfigError::Invalid(format!(
                "backoff.initial ({:?}) exceeds backoff.max ({:?})",
                self.initial, self.max
            )));
        }
        if self.multiplier.is_nan() || self.multiplier < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "backoff.multiplier must be >= 1.0, got {}",
                self.multiplier
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ConfigError::Invalid(format!(
                "backoff.jitter must be within 0.0..=1.0, got {}",
                self.jitter
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff_is_valid() {
        assert!(BackoffConfig::default().validate().is_ok());
    }

    #[test]
    fn test_initial_above_max_is_invalid() {
        let config = BackoffConfig {
            initial: Duration::from_secs(120),
            ..BackoffConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shrinking_multiplier_is_invalid() {
        let config = BackoffConfig {
            multiplier: 0.5,
            ..BackoffConfig::default()
        };
        assert!(config.validate().is_err());

        let config = BackoffConfig {
            multiplier: f64::NAN,
            ..BackoffConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_jitter_out_of_range_is_invalid() {
        let config = BackoffConfig {
            jitter: 1.5,
            ..BackoffConfig::default()
        };
        assert!(config.validate().is_err());
    }
}

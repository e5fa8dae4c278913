//! # Relationship Engine Configuration

use serde::{Deserialize, Serialize};
use std::env;

/// Envelope protocol tag on the main network.
pub const PROTOCOL_ID: &[u8] = b"RV";
/// Envelope protocol tag on test networks.
pub const TEST_PROTOCOL_ID: &[u8] = b"test.RV";

/// Configuration for the relationship engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipsConfig {
    /// Positions searched past a chain's current index when a key does not
    /// match the expected one. Every party must agree on this value.
    pub lookahead_window: u32,
    /// Value of receiver (P2PK) outputs.
    pub dust_limit: u64,
    /// Envelope protocol tag.
    pub protocol_id: Vec<u8>,
}

impl Default for RelationshipsConfig {
    fn default() -> Self {
        Self {
            lookahead_window: 10,
            dust_limit: 576,
            protocol_id: PROTOCOL_ID.to_vec(),
        }
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl RelationshipsConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `RV_LOOKAHEAD_WINDOW`: lookahead window (default: 10)
    /// - `RV_DUST_LIMIT`: receiver output value (default: 576)
    /// - `RV_IS_TEST`: use the test protocol tag (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let is_test = env::var("RV_IS_TEST")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        Self {
            lookahead_window: env::var("RV_LOOKAHEAD_WINDOW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.lookahead_window),

            dust_limit: env::var("RV_DUST_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.dust_limit),

            protocol_id: if is_test {
                TEST_PROTOCOL_ID.to_vec()
            } else {
                defaults.protocol_id
            },
        }
    }

    /// Test-network configuration.
    pub fn for_testing() -> Self {
        Self {
            protocol_id: TEST_PROTOCOL_ID.to_vec(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lookahead_window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "lookahead_window",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.dust_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "dust_limit",
                reason: "must be positive".to_string(),
            });
        }
        if self.protocol_id.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "protocol_id",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelationshipsConfig::default();
        assert_eq!(config.lookahead_window, 10);
        assert_eq!(config.protocol_id, PROTOCOL_ID);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = RelationshipsConfig {
            lookahead_window: 0,
            ..RelationshipsConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "lookahead_window",
                ..
            })
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RelationshipsConfig =
            serde_json::from_str(r#"{"lookahead_window": 25}"#).unwrap();
        assert_eq!(config.lookahead_window, 25);
        assert_eq!(config.dust_limit, 576);
    }

    #[test]
    fn test_testing_protocol() {
        assert_eq!(RelationshipsConfig::for_testing().protocol_id, TEST_PROTOCOL_ID);
    }
}

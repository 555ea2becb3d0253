//! TOML fixture configuration for the failing messaging double.
//!
//! ```toml
//! success_status_code = 202
//!
//! [failure]
//! timeout_ms = 50
//!
//! [failure.fails]
//! order-1 = 2
//!
//! [failure.timeouts]
//! order-2 = 1
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Configuration for a [`FailingMessaging`](crate::FailingMessaging) double.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FailingMessagingConfig {
    /// Status code for successful invocations. Defaults to 200.
    #[serde(default)]
    pub success_status_code: Option<i32>,
    /// Per-key failure budgets.
    #[serde(default)]
    pub failure: FailureConfig,
}

/// Per-key failure budgets for a [`KeyedFailure`](crate::KeyedFailure) policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FailureConfig {
    /// Number of forced failures per key.
    #[serde(default)]
    pub fails: HashMap<String, u32>,
    /// Number of simulated timeouts per key.
    #[serde(default)]
    pub timeouts: HashMap<String, u32>,
    /// How long a simulated timeout sleeps, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Message carried by forced failures.
    #[serde(default = "default_message")]
    pub message: String,
}

impl Default for FailureConfig {
    fn default() -> Self {
        Self {
            fails: HashMap::new(),
            timeouts: HashMap::new(),
            timeout_ms: default_timeout_ms(),
            message: default_message(),
        }
    }
}

impl FailureConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl FailingMessagingConfig {
    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(code) = self.success_status_code
            && !(100..=999).contains(&code)
        {
            return Err(ConfigError::Invalid(format!(
                "success_status_code must be between 100 and 999, got {code}"
            )));
        }
        Ok(())
    }
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_message() -> String {
    "forced failure".to_owned()
}

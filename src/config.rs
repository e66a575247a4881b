//! Configuration module for the transaction sender
//!
//! This module handles configuration loading from TOML files and
//! environment variables, and provides structured configuration types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{SenderError, SenderResult};

pub const ENV_RPC_URL: &str = "NEAR_RPC_URL";
pub const ENV_NETWORK_ID: &str = "NEAR_NETWORK_ID";
pub const ENV_ACCOUNT_ID: &str = "NEAR_ACCOUNT_ID";
pub const ENV_PRIVATE_KEY: &str = "NEAR_PRIVATE_KEY";

/// Main sender configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SenderConfig {
    /// Node RPC configuration
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Account the sender signs for
    #[serde(default)]
    pub account: AccountConfig,

    /// Key material
    #[serde(default)]
    pub signer: SignerConfig,

    /// Broadcast retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Diagnostic output
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default)]
    pub account_id: String,

    #[serde(default = "default_network_id")]
    pub network_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignerConfig {
    /// `ed25519:<base58>` secret key; prefer the NEAR_PRIVATE_KEY environment variable
    #[serde(default)]
    pub private_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Wait before the second attempt, in milliseconds
    #[serde(default = "default_initial_wait_ms")]
    pub initial_wait_ms: u64,

    /// Multiplier applied to the wait after each retryable failure
    #[serde(default = "default_wait_backoff")]
    pub wait_backoff: f64,

    /// Maximum number of attempts (including the first one)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit receipt logs and failure warnings. NEAR_NO_LOGS overrides this to false.
    #[serde(default = "default_true")]
    pub diagnostics: bool,
}

// Default value functions
fn default_rpc_url() -> String { "https://rpc.testnet.near.org".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_network_id() -> String { "testnet".to_string() }
fn default_initial_wait_ms() -> u64 { 500 }
fn default_wait_backoff() -> f64 { 1.5 }
fn default_max_attempts() -> u32 { 12 }
fn default_true() -> bool { true }

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            timeout_secs: default_rpc_timeout(),
        }
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            network_id: default_network_id(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_wait_ms: default_initial_wait_ms(),
            wait_backoff: default_wait_backoff(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            diagnostics: default_true(),
        }
    }
}

impl RpcConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RetryConfig {
    pub fn initial_wait(&self) -> Duration {
        Duration::from_millis(self.initial_wait_ms)
    }

    pub fn validate(&self) -> SenderResult<()> {
        if self.max_attempts == 0 {
            return Err(SenderError::Configuration(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if !self.wait_backoff.is_finite() || self.wait_backoff < 1.0 {
            return Err(SenderError::Configuration(format!(
                "retry.wait_backoff must be >= 1.0, got {}",
                self.wait_backoff
            )));
        }
        Ok(())
    }
}

impl SenderConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> SenderResult<Self> {
        toml::from_str(content).map_err(|e| SenderError::Configuration(e.to_string()))
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&content)?)
    }

    /// Load configuration with `.env` and environment variable overrides
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Defaults with `.env` and environment variable overrides, for runs without a config file
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Override fields from environment-style lookups; empty values are ignored
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = get(ENV_RPC_URL) {
            self.rpc.url = url;
        }
        if let Some(network_id) = get(ENV_NETWORK_ID) {
            self.account.network_id = network_id;
        }
        if let Some(account_id) = get(ENV_ACCOUNT_ID) {
            self.account.account_id = account_id;
        }
        if let Some(private_key) = get(ENV_PRIVATE_KEY) {
            self.signer.private_key = Some(private_key);
        }
    }

    /// Check the fields the sender cannot run without
    pub fn validate(&self) -> SenderResult<()> {
        if self.account.account_id.trim().is_empty() {
            return Err(SenderError::Configuration(format!(
                "account.account_id is empty (set it in the config file or {})",
                ENV_ACCOUNT_ID
            )));
        }
        if self.account.network_id.trim().is_empty() {
            return Err(SenderError::Configuration(
                "account.network_id is empty".to_string(),
            ));
        }
        if self.rpc.url.trim().is_empty() {
            return Err(SenderError::Configuration("rpc.url is empty".to_string()));
        }
        self.retry.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_match_broadcast_policy() {
        let config = SenderConfig::default();
        assert_eq!(config.retry.initial_wait(), Duration::from_millis(500));
        assert_eq!(config.retry.wait_backoff, 1.5);
        assert_eq!(config.retry.max_attempts, 12);
        assert_eq!(config.account.network_id, "testnet");
        assert!(config.logging.diagnostics);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[account]
account_id = "alice.testnet"

[retry]
max_attempts = 3
"#
        )
        .unwrap();

        let config = SenderConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.account.account_id, "alice.testnet");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_wait_ms, 500);
        assert_eq!(config.rpc.timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SenderConfig::default();
        let env: HashMap<&str, &str> = [
            (ENV_ACCOUNT_ID, "bob.testnet"),
            (ENV_RPC_URL, "http://localhost:3030"),
            (ENV_NETWORK_ID, ""),
        ]
        .into_iter()
        .collect();

        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.account.account_id, "bob.testnet");
        assert_eq!(config.rpc.url, "http://localhost:3030");
        // Empty values do not override
        assert_eq!(config.account.network_id, "testnet");
        assert!(config.signer.private_key.is_none());
    }

    #[test]
    fn test_validation_rejects_bad_retry_policy() {
        let mut config = SenderConfig::default();
        config.account.account_id = "alice.testnet".to_string();

        config.retry.max_attempts = 0;
        assert_eq!(config.validate().unwrap_err().error_type(), "ConfigurationError");

        config.retry.max_attempts = 12;
        config.retry.wait_backoff = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_account_is_rejected() {
        let err = SenderConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains(ENV_ACCOUNT_ID));
    }
}

// crates/policy-sync-config/src/config.rs
// ============================================================================
// Module: Policy Sync Configuration
// Description: Configuration loading and validation for policy sync hosts.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: policy-sync-core, policy-sync-http, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section has defaults, unknown keys are rejected, and invalid values
//! fail the load rather than being clamped. A validated config converts into
//! the engine and HTTP client configs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use policy_sync_core::DEFAULT_BACKOFF_MULTIPLIER;
use policy_sync_core::DEFAULT_CONSISTENCY_TIMEOUT;
use policy_sync_core::DEFAULT_INITIAL_BACKOFF;
use policy_sync_core::DEFAULT_MAX_BACKOFF;
use policy_sync_core::DEFAULT_POLL_INTERVAL;
use policy_sync_core::DEFAULT_RETRY_BUDGET;
use policy_sync_core::EngineConfig;
use policy_sync_core::RetryPolicy;
use policy_sync_http::DEFAULT_CHROME_POLICY_BASE;
use policy_sync_http::DEFAULT_CUSTOMER_ID;
use policy_sync_http::DEFAULT_DIRECTORY_BASE;
use policy_sync_http::DEFAULT_MAX_RESPONSE_BYTES;
use policy_sync_http::DEFAULT_TIMEOUT_MS;
use policy_sync_http::HttpClientConfig;
use policy_sync_http::validate_base_url;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "policy-sync.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "POLICY_SYNC_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum customer id length.
const MAX_CUSTOMER_ID_LENGTH: usize = 128;
/// Maximum user agent length.
const MAX_USER_AGENT_LENGTH: usize = 256;
/// Minimum request timeout in milliseconds.
pub const MIN_REQUEST_TIMEOUT_MS: u64 = 100;
/// Maximum request timeout in milliseconds.
pub const MAX_REQUEST_TIMEOUT_MS: u64 = 300_000;
/// Maximum response size cap in bytes.
pub const MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;
/// Maximum retry budget in milliseconds.
pub const MAX_RETRY_BUDGET_MS: u64 = 3_600_000;
/// Maximum backoff multiplier.
pub const MAX_BACKOFF_MULTIPLIER: u32 = 16;
/// Maximum consistency timeout in milliseconds.
pub const MAX_CONSISTENCY_TIMEOUT_MS: u64 = 3_600_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Policy sync host configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicySyncConfig {
    /// Remote API endpoints and transport limits.
    #[serde(default)]
    pub api: ApiConfig,
    /// Retry budget applied to every remote call.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Consistency wait defaults.
    #[serde(default)]
    pub consistency: ConsistencyConfig,
}

impl PolicySyncConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit `path`, then [`CONFIG_ENV_VAR`], then
    /// `policy-sync.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api.validate()?;
        self.retry.validate()?;
        self.consistency.validate()?;
        Ok(())
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            api_retry: self.retry.policy(),
            consistency_timeout: Duration::from_millis(self.consistency.timeout_ms),
            poll_interval: Duration::from_millis(self.consistency.poll_interval_ms),
        }
    }

    /// Returns the HTTP client configuration.
    #[must_use]
    pub fn http_config(&self) -> HttpClientConfig {
        self.api.http_config()
    }
}

/// Remote API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Customer identifier used in resource paths.
    #[serde(default = "default_customer_id")]
    pub customer_id: String,
    /// Base URL of the browser policy API.
    #[serde(default = "default_chrome_policy_base")]
    pub chrome_policy_base: String,
    /// Base URL of the directory API.
    #[serde(default = "default_directory_base")]
    pub directory_base: String,
    /// Allow cleartext HTTP base URLs.
    #[serde(default)]
    pub allow_http: bool,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum response size in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// User agent override.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            customer_id: default_customer_id(),
            chrome_policy_base: default_chrome_policy_base(),
            directory_base: default_directory_base(),
            allow_http: false,
            timeout_ms: default_request_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
            user_agent: None,
        }
    }
}

impl ApiConfig {
    /// Validates API configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let customer_id = self.customer_id.trim();
        if customer_id.is_empty() {
            return Err(ConfigError::Invalid("api.customer_id must be non-empty".to_string()));
        }
        if customer_id.len() > MAX_CUSTOMER_ID_LENGTH {
            return Err(ConfigError::Invalid("api.customer_id exceeds max length".to_string()));
        }
        validate_base_url(&self.chrome_policy_base, self.allow_http).map_err(|err| {
            ConfigError::Invalid(format!("api.chrome_policy_base rejected: {err}"))
        })?;
        validate_base_url(&self.directory_base, self.allow_http)
            .map_err(|err| ConfigError::Invalid(format!("api.directory_base rejected: {err}")))?;
        if !(MIN_REQUEST_TIMEOUT_MS ..= MAX_REQUEST_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "api.timeout_ms must be between {MIN_REQUEST_TIMEOUT_MS} and \
                 {MAX_REQUEST_TIMEOUT_MS}",
            )));
        }
        if self.max_response_bytes == 0 {
            return Err(ConfigError::Invalid("api.max_response_bytes must be > 0".to_string()));
        }
        if self.max_response_bytes > MAX_RESPONSE_BYTES {
            return Err(ConfigError::Invalid("api.max_response_bytes too large".to_string()));
        }
        if let Some(user_agent) = &self.user_agent {
            if user_agent.trim().is_empty() {
                return Err(ConfigError::Invalid("api.user_agent must be non-empty".to_string()));
            }
            if user_agent.len() > MAX_USER_AGENT_LENGTH {
                return Err(ConfigError::Invalid("api.user_agent exceeds max length".to_string()));
            }
        }
        Ok(())
    }

    /// Returns the HTTP client configuration.
    #[must_use]
    pub fn http_config(&self) -> HttpClientConfig {
        let defaults = HttpClientConfig::default();
        HttpClientConfig {
            customer_id: self.customer_id.trim().to_string(),
            chrome_policy_base: self.chrome_policy_base.clone(),
            directory_base: self.directory_base.clone(),
            allow_http: self.allow_http,
            timeout_ms: self.timeout_ms,
            max_response_bytes: self.max_response_bytes,
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }
}

/// Retry configuration for remote calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total retry budget in milliseconds, measured from the first attempt.
    #[serde(default = "default_retry_budget_ms")]
    pub budget_ms: u64,
    /// First backoff delay in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Backoff cap in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Backoff growth factor.
    #[serde(default = "default_backoff_multiplier")]
    pub multiplier: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            budget_ms: default_retry_budget_ms(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    /// Validates retry configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.budget_ms == 0 {
            return Err(ConfigError::Invalid("retry.budget_ms must be > 0".to_string()));
        }
        if self.budget_ms > MAX_RETRY_BUDGET_MS {
            return Err(ConfigError::Invalid("retry.budget_ms too large".to_string()));
        }
        if self.initial_backoff_ms == 0 {
            return Err(ConfigError::Invalid("retry.initial_backoff_ms must be > 0".to_string()));
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(ConfigError::Invalid(
                "retry.max_backoff_ms must be >= retry.initial_backoff_ms".to_string(),
            ));
        }
        if self.multiplier == 0 || self.multiplier > MAX_BACKOFF_MULTIPLIER {
            return Err(ConfigError::Invalid(format!(
                "retry.multiplier must be between 1 and {MAX_BACKOFF_MULTIPLIER}",
            )));
        }
        Ok(())
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            budget: Duration::from_millis(self.budget_ms),
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            multiplier: self.multiplier,
        }
    }
}

/// Consistency wait configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsistencyConfig {
    /// Wait budget in milliseconds when the caller does not name one.
    #[serde(default = "default_consistency_timeout_ms")]
    pub timeout_ms: u64,
    /// Delay between conditional reads in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_consistency_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl ConsistencyConfig {
    /// Validates consistency configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("consistency.timeout_ms must be > 0".to_string()));
        }
        if self.timeout_ms > MAX_CONSISTENCY_TIMEOUT_MS {
            return Err(ConfigError::Invalid("consistency.timeout_ms too large".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "consistency.poll_interval_ms must be > 0".to_string(),
            ));
        }
        if self.poll_interval_ms > self.timeout_ms {
            return Err(ConfigError::Invalid(
                "consistency.poll_interval_ms must be <= consistency.timeout_ms".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Converts a duration to whole milliseconds, saturating.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Default customer id.
fn default_customer_id() -> String {
    DEFAULT_CUSTOMER_ID.to_string()
}

/// Default policy API base URL.
fn default_chrome_policy_base() -> String {
    DEFAULT_CHROME_POLICY_BASE.to_string()
}

/// Default directory API base URL.
fn default_directory_base() -> String {
    DEFAULT_DIRECTORY_BASE.to_string()
}

/// Default request timeout.
const fn default_request_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Default response size cap.
const fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

/// Default retry budget.
fn default_retry_budget_ms() -> u64 {
    millis(DEFAULT_RETRY_BUDGET)
}

/// Default first backoff.
fn default_initial_backoff_ms() -> u64 {
    millis(DEFAULT_INITIAL_BACKOFF)
}

/// Default backoff cap.
fn default_max_backoff_ms() -> u64 {
    millis(DEFAULT_MAX_BACKOFF)
}

/// Default backoff multiplier.
const fn default_backoff_multiplier() -> u32 {
    DEFAULT_BACKOFF_MULTIPLIER
}

/// Default consistency timeout.
fn default_consistency_timeout_ms() -> u64 {
    millis(DEFAULT_CONSISTENCY_TIMEOUT)
}

/// Default poll interval.
fn default_poll_interval_ms() -> u64 {
    millis(DEFAULT_POLL_INTERVAL)
}

//! Configuration module for gcore-dns01
//!
//! This module handles loading and validating configuration from files and environment variables.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result};
use zeroize::Zeroizing;

use crate::constants::{
    DEFAULT_LISTEN_ADDR, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_SECS, DEFAULT_TTL_SECS,
    ENV_API_TOKEN, ENV_API_URL, ENV_LISTEN_ADDR, ENV_MAX_ATTEMPTS, ENV_PROVIDER_TYPE, ENV_TTL,
    GCORE_API_BASE, MAX_ATTEMPTS_LIMIT, MAX_TIMEOUT_SECS, MAX_TTL_SECS, MIN_API_TOKEN_LENGTH,
    MIN_TIMEOUT_SECS, MIN_TTL_SECS,
};
use crate::validation::validate_record_name;

//==============================================================================
// Config
//==============================================================================

/// Which [`DnsProvider`](crate::provider::DnsProvider) backs the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    /// G-Core DNS API
    Gcore,
    /// In-process provider, nothing leaves the machine
    Memory,
}

/// Configuration for the gcore-dns01 service
///
/// # Configuration Loading Priority
///
/// Configuration is loaded from multiple sources in order of precedence:
/// 1. Environment variables (highest priority)
/// 2. Config file (passed with `--config`)
/// 3. Defaults (lowest priority)
///
/// The API token is held in [`Zeroizing`] so it is cleared from memory on
/// drop, and `Debug` output never contains it.
#[derive(Clone)]
pub struct Config {
    /// G-Core API token with DNS edit permissions
    ///
    /// Can be set via the `GCORE_API_TOKEN` environment variable.
    pub api_token: Zeroizing<String>,
    /// G-Core DNS API base URL
    ///
    /// Default: `https://api.gcore.com/dns`
    pub api_url: String,
    /// Default TTL for challenge TXT records in seconds
    ///
    /// Default: 120. Requests may override it through their config blob.
    pub ttl: u32,
    /// HTTP request timeout towards the provider
    ///
    /// Default: 30 seconds
    pub timeout: Duration,
    /// Address of the HTTP surface (`serve`)
    ///
    /// Default: `0.0.0.0:8080`
    pub listen_addr: SocketAddr,
    /// Total attempts for one-shot CLI operations
    ///
    /// Default: 3
    pub max_attempts: u32,
    /// Provider backing the solver
    ///
    /// Default: `ProviderType::Gcore`
    pub provider_type: ProviderType,
    /// Zones hosted by the in-memory provider
    pub memory_zones: Vec<String>,
    /// Enable verbose logging
    pub verbose: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_token", &"***REDACTED***")
            .field("api_url", &self.api_url)
            .field("ttl", &self.ttl)
            .field("timeout", &self.timeout)
            .field("listen_addr", &self.listen_addr)
            .field("max_attempts", &self.max_attempts)
            .field("provider_type", &self.provider_type)
            .field("memory_zones", &self.memory_zones)
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_token: Zeroizing::new(String::new()),
            api_url: GCORE_API_BASE.to_string(),
            ttl: DEFAULT_TTL_SECS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            listen_addr: DEFAULT_LISTEN_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8080))),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            provider_type: ProviderType::Gcore,
            memory_zones: Vec::new(),
            verbose: false,
        }
    }
}

impl Config {
    /// Loads configuration from file and environment variables
    ///
    /// This method loads configuration in the following order:
    /// 1. Loads from the specified config file (if provided and exists)
    /// 2. Overrides with environment variables (if set and non-empty)
    /// 3. Validates the final configuration
    ///
    /// # Environment Variables
    ///
    /// - `GCORE_API_TOKEN` - G-Core API token
    /// - `GCORE_API_URL` - G-Core DNS API base URL
    /// - `GCORE_TTL` - Default TXT record TTL
    /// - `DNS01_LISTEN_ADDR` - HTTP listen address
    /// - `DNS01_MAX_ATTEMPTS` - Attempts for CLI operations
    /// - `DNS01_PROVIDER_TYPE` - Provider type (gcore|memory)
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::load_from_file(config_path)?;
        Self::override_with_env(&mut config)?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Loads configuration from a TOML file, defaults for anything missing
    fn load_from_file(config_path: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::default();

        let Some(path) = config_path else {
            return Ok(config);
        };
        if !path.exists() {
            return Ok(config);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let toml_config: TomlConfig =
            toml::from_str(&content).with_context(|| "Failed to parse config file")?;

        if let Some(v) = toml_config.api_token {
            config.api_token = Zeroizing::new(v);
        }
        if let Some(v) = toml_config.api_url {
            config.api_url = v;
        }
        if let Some(v) = toml_config.ttl {
            config.ttl = v;
        }
        if let Some(v) = toml_config.timeout {
            config.timeout = Duration::from_secs(v);
        }
        if let Some(v) = toml_config.listen_addr.as_deref() {
            config.listen_addr = parse_listen_addr(v)?;
        }
        if let Some(v) = toml_config.max_attempts {
            config.max_attempts = v;
        }
        if let Some(v) = toml_config.provider_type.as_deref() {
            config.provider_type = parse_provider_type(v)?;
        }
        if let Some(v) = toml_config.memory_zones {
            config.memory_zones = v;
        }
        config.verbose = toml_config.verbose.unwrap_or(false);

        Ok(config)
    }

    /// Overrides configuration values with non-empty environment variables
    fn override_with_env(config: &mut Self) -> Result<()> {
        if let Some(v) = env_value(ENV_API_TOKEN) {
            config.api_token = Zeroizing::new(v);
        }
        if let Some(v) = env_value(ENV_API_URL) {
            config.api_url = v;
        }
        if let Some(v) = env_value(ENV_TTL) {
            config.ttl = v
                .parse()
                .with_context(|| format!("Invalid {} value", ENV_TTL))?;
        }
        if let Some(v) = env_value(ENV_LISTEN_ADDR) {
            config.listen_addr = parse_listen_addr(&v)?;
        }
        if let Some(v) = env_value(ENV_MAX_ATTEMPTS) {
            config.max_attempts = v
                .parse()
                .with_context(|| format!("Invalid {} value", ENV_MAX_ATTEMPTS))?;
        }
        if let Some(v) = env_value(ENV_PROVIDER_TYPE) {
            config.provider_type = parse_provider_type(&v)?;
        }
        Ok(())
    }

    /// Validates the configuration
    ///
    /// Returns an error if:
    /// - The G-Core provider is selected and the API token is missing or too short
    /// - The API URL is not an http(s) URL
    /// - TTL, timeout or max_attempts are out of range
    /// - A memory zone is not a valid DNS name
    fn validate(&self) -> Result<()> {
        if self.provider_type == ProviderType::Gcore {
            if self.api_token.as_str().is_empty() {
                return Err(anyhow::anyhow!("Missing {}", ENV_API_TOKEN));
            }
            if self.api_token.as_str().len() < MIN_API_TOKEN_LENGTH {
                return Err(anyhow::anyhow!(
                    "{} is too short ({} chars, minimum {})",
                    ENV_API_TOKEN,
                    self.api_token.as_str().len(),
                    MIN_API_TOKEN_LENGTH
                ));
            }
        }

        if !(self.api_url.starts_with("https://") || self.api_url.starts_with("http://")) {
            return Err(anyhow::anyhow!(
                "{} must be an http(s) URL, got: {}",
                ENV_API_URL,
                self.api_url
            ));
        }

        if !(MIN_TTL_SECS..=MAX_TTL_SECS).contains(&self.ttl) {
            return Err(anyhow::anyhow!(
                "ttl must be between {} and {} seconds, got {}",
                MIN_TTL_SECS,
                MAX_TTL_SECS,
                self.ttl
            ));
        }

        let timeout_secs = self.timeout.as_secs();
        if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&timeout_secs) {
            return Err(anyhow::anyhow!(
                "timeout must be between {} and {} seconds, got {}",
                MIN_TIMEOUT_SECS,
                MAX_TIMEOUT_SECS,
                timeout_secs
            ));
        }

        if !(1..=MAX_ATTEMPTS_LIMIT).contains(&self.max_attempts) {
            return Err(anyhow::anyhow!(
                "max_attempts must be between 1 and {}, got {}",
                MAX_ATTEMPTS_LIMIT,
                self.max_attempts
            ));
        }

        for zone in &self.memory_zones {
            validate_record_name(zone)
                .with_context(|| format!("Invalid memory zone: {}", zone))?;
        }

        Ok(())
    }

    /// Replaces the API token in `message` with `***REDACTED***`
    #[must_use]
    pub fn redact(&self, message: &str) -> String {
        redact_secret(message, self.api_token.as_str())
    }
}

/// Redacts `secret` from `message`
///
/// ```
/// use gcore_dns01::config::redact_secret;
///
/// let redacted = redact_secret("auth APIKey secret123 rejected", "secret123");
/// assert_eq!(redacted, "auth APIKey ***REDACTED*** rejected");
/// ```
#[must_use]
pub fn redact_secret(message: &str, secret: &str) -> String {
    if secret.is_empty() {
        return message.to_string();
    }
    message.replace(secret, "***REDACTED***")
}

fn env_value(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_listen_addr(value: &str) -> Result<SocketAddr> {
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid listen address: {}", value))
}

/// TOML configuration file structure
#[derive(Debug, serde::Deserialize)]
struct TomlConfig {
    api_token: Option<String>,
    api_url: Option<String>,
    ttl: Option<u32>,
    timeout: Option<u64>,
    listen_addr: Option<String>,
    max_attempts: Option<u32>,
    provider_type: Option<String>,
    memory_zones: Option<Vec<String>>,
    verbose: Option<bool>,
}

/// Parses a provider type string
///
/// Accepts "gcore" (alias "g-core") and "memory" (alias "in-memory").
pub fn parse_provider_type(value: &str) -> Result<ProviderType> {
    match value.trim().to_ascii_lowercase().as_str() {
        "gcore" | "g-core" => Ok(ProviderType::Gcore),
        "memory" | "in-memory" => Ok(ProviderType::Memory),
        _ => Err(anyhow::anyhow!(
            "Invalid provider_type: '{}'. Use: gcore|memory",
            value
        )),
    }
}

//==============================================================================
// Tests
//==============================================================================

//! Relay Prover Configuration
//!
//! Shared configuration crate for the tendermint-zk relay components.
//!
//! Handles loading configuration from:
//! 1. TMZK_CONFIG env var (explicit path)
//! 2. ./config.toml (current directory)
//! 3. ~/.tmzk/config.toml (user home)
//!
//! Environment variables take precedence over TOML config.

mod duration;

pub use duration::parse_duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".tmzk";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_PROVER_ADDR: &str = "http://127.0.0.1:3000";
const DEFAULT_DIGEST: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";
const DEFAULT_TRUSTING_PERIOD: &str = "336h";
const DEFAULT_CHAIN_ID: &str = "ibc0";
const DEFAULT_RPC_ADDR: &str = "http://127.0.0.1:26657";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
const DEFAULT_PROOF_TIMEOUT_SECS: u64 = 600;

/// Verifier digests are SHA-256 sized
pub const DIGEST_SIZE: usize = 32;

/// Digests are public proof inputs and must stay below 2^253
const DIGEST_TOP_BYTE_MASK: u8 = 0x1f;

// ============================================================================
// Errors
// ============================================================================

/// Validation failures for an otherwise well-formed config file
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("zk prover address cannot be empty for the {0} prover")]
    MissingProverAddr(&'static str),

    #[error("invalid {name} verifier digest: {reason}")]
    InvalidDigest { name: &'static str, reason: String },

    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),

    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
}

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RelayerConfig {
    #[serde(default)]
    pub prover: ProverTomlConfig,
    #[serde(default)]
    pub chain: ChainTomlConfig,
    #[serde(default)]
    pub polling: PollingTomlConfig,
}

/// Prover configuration (TOML format)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProverTomlConfig {
    /// Prover backend: "mock", "groth16" or "groth16-commitment" (default: "mock")
    #[serde(default)]
    pub prover_type: ProverTypeToml,
    #[serde(default = "default_prover_addr")]
    pub zk_prover_addr: String,
    /// Hex, with or without 0x prefix
    #[serde(default = "default_digest")]
    pub step_verifier_digest: String,
    #[serde(default = "default_digest")]
    pub skip_verifier_digest: String,
    #[serde(default = "default_trusting_period")]
    pub trusting_period: String,
}

/// Prover backend for TOML config
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ProverTypeToml {
    #[default]
    Mock,
    Groth16,
    Groth16Commitment,
}

impl ProverTypeToml {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProverTypeToml::Mock => "mock",
            ProverTypeToml::Groth16 => "groth16",
            ProverTypeToml::Groth16Commitment => "groth16-commitment",
        }
    }
}

impl Default for ProverTomlConfig {
    fn default() -> Self {
        Self {
            prover_type: ProverTypeToml::Mock,
            zk_prover_addr: DEFAULT_PROVER_ADDR.into(),
            step_verifier_digest: DEFAULT_DIGEST.into(),
            skip_verifier_digest: DEFAULT_DIGEST.into(),
            trusting_period: DEFAULT_TRUSTING_PERIOD.into(),
        }
    }
}

fn default_prover_addr() -> String {
    DEFAULT_PROVER_ADDR.into()
}
fn default_digest() -> String {
    DEFAULT_DIGEST.into()
}
fn default_trusting_period() -> String {
    DEFAULT_TRUSTING_PERIOD.into()
}

/// Counterparty chain configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainTomlConfig {
    #[serde(default = "default_chain_id")]
    pub chain_id: String,
    #[serde(default = "default_rpc_addr")]
    pub rpc_addr: String,
}

impl Default for ChainTomlConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID.into(),
            rpc_addr: DEFAULT_RPC_ADDR.into(),
        }
    }
}

fn default_chain_id() -> String {
    DEFAULT_CHAIN_ID.into()
}
fn default_rpc_addr() -> String {
    DEFAULT_RPC_ADDR.into()
}

/// Proof wait configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollingTomlConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_proof_timeout")]
    pub proof_timeout_secs: u64,
}

impl Default for PollingTomlConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            proof_timeout_secs: DEFAULT_PROOF_TIMEOUT_SECS,
        }
    }
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
fn default_proof_timeout() -> u64 {
    DEFAULT_PROOF_TIMEOUT_SECS
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set field from the lookup if present
fn env_string(lookup: &impl Fn(&str) -> Option<String>, key: &str, field: &mut String) {
    if let Some(v) = lookup(key) {
        *field = v;
    }
}

/// Set field from the lookup if present and parseable
fn env_parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    field: &mut T,
) {
    if let Some(v) = lookup(key) {
        if let Ok(parsed) = v.parse() {
            *field = parsed;
        } else {
            log::warn!("Ignoring unparseable value for {}: {}", key, v);
        }
    }
}

fn decode_digest(name: &'static str, value: &str) -> Result<[u8; DIGEST_SIZE], ConfigError> {
    let raw = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(raw).map_err(|e| ConfigError::InvalidDigest {
        name,
        reason: e.to_string(),
    })?;
    let digest: [u8; DIGEST_SIZE] =
        bytes
            .try_into()
            .map_err(|b: Vec<u8>| ConfigError::InvalidDigest {
                name,
                reason: format!("expected {} bytes, got {}", DIGEST_SIZE, b.len()),
            })?;
    if digest[0] & !DIGEST_TOP_BYTE_MASK != 0 {
        return Err(ConfigError::InvalidDigest {
            name,
            reason: "value does not fit in 253 bits".to_string(),
        });
    }
    Ok(digest)
}

// ============================================================================
// Implementation
// ============================================================================

impl RelayerConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::read_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check TMZK_CONFIG env var
        if let Ok(path) = env::var("TMZK_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check ./config.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.tmzk/config.toml
        Self::default_config_path().filter(|p| p.exists())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from any key/value source (the process environment in practice)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Prover
        if let Some(v) = lookup("TMZK_PROVER_TYPE") {
            self.prover.prover_type = match v.to_ascii_lowercase().as_str() {
                "groth16" => ProverTypeToml::Groth16,
                "groth16-commitment" => ProverTypeToml::Groth16Commitment,
                "mock" => ProverTypeToml::Mock,
                other => {
                    log::warn!(
                        "Unknown TMZK_PROVER_TYPE {}, keeping {}",
                        other,
                        self.prover.prover_type.as_str()
                    );
                    self.prover.prover_type
                }
            };
        }
        env_string(&lookup, "TMZK_PROVER_ADDR", &mut self.prover.zk_prover_addr);
        env_string(
            &lookup,
            "TMZK_STEP_VERIFIER_DIGEST",
            &mut self.prover.step_verifier_digest,
        );
        env_string(
            &lookup,
            "TMZK_SKIP_VERIFIER_DIGEST",
            &mut self.prover.skip_verifier_digest,
        );
        env_string(&lookup, "TMZK_TRUSTING_PERIOD", &mut self.prover.trusting_period);

        // Chain
        env_string(&lookup, "TMZK_CHAIN_ID", &mut self.chain.chain_id);
        env_string(&lookup, "TMZK_RPC_ADDR", &mut self.chain.rpc_addr);

        // Polling
        env_parse(
            &lookup,
            "TMZK_POLL_INTERVAL_SECS",
            &mut self.polling.poll_interval_secs,
        );
        env_parse(
            &lookup,
            "TMZK_PROOF_TIMEOUT_SECS",
            &mut self.polling.proof_timeout_secs,
        );
    }

    /// Check every field that is parsed lazily by the getters below
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prover.zk_prover_addr.is_empty()
            && self.prover.prover_type != ProverTypeToml::Mock
        {
            return Err(ConfigError::MissingProverAddr(self.prover.prover_type.as_str()));
        }
        self.step_verifier_digest()?;
        self.skip_verifier_digest()?;
        self.trusting_period()?;
        if self.polling.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval("poll_interval_secs"));
        }
        if self.polling.proof_timeout_secs == 0 {
            return Err(ConfigError::ZeroInterval("proof_timeout_secs"));
        }
        Ok(())
    }

    pub fn step_verifier_digest(&self) -> Result<[u8; DIGEST_SIZE], ConfigError> {
        decode_digest("step", &self.prover.step_verifier_digest)
    }

    pub fn skip_verifier_digest(&self) -> Result<[u8; DIGEST_SIZE], ConfigError> {
        decode_digest("skip", &self.prover.skip_verifier_digest)
    }

    pub fn trusting_period(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.prover.trusting_period)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.poll_interval_secs)
    }

    pub fn proof_timeout(&self) -> Duration {
        Duration::from_secs(self.polling.proof_timeout_secs)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.prover.prover_type = ProverTypeToml::Groth16;
        toml::to_string_pretty(&sample).unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================

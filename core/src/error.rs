//! Relay errors
//!
//! Every failure aborts the relay attempt it belongs to. Retry policy is left
//! to the caller.

use alloy_primitives::U256;
use thiserror::Error;
use tmzk_config::ConfigError;
use tmzk_zkp::DecodeError;

#[derive(Error, Debug)]
pub enum RelayError {
    /// Caller error, rejected before any I/O
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Header is missing a field needed for its commitment
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Membership proof did not verify against the committed root
    #[error("Verification failed: {0}")]
    Verification(String),

    /// Remote prover answered with public inputs that disagree with the local derivation
    #[error("input mismatch({index}): expected={expected} actual={actual}")]
    InputMismatch {
        index: usize,
        expected: U256,
        actual: U256,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("timeout trusted_height: {trusted_height}, target_height: {target_height}")]
    Timeout {
        trusted_height: u64,
        target_height: u64,
    },

    /// The proof task finished without delivering a proof
    #[error("failed to get proof trusted_height: {trusted_height}, target_height: {target_height}")]
    ProofUnavailable {
        trusted_height: u64,
        target_height: u64,
    },

    #[error("Chain error: {0}")]
    Chain(#[from] anyhow::Error),
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::Network(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;

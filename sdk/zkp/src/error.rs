//! Decoding errors shared by every proof codec.
use thiserror::Error;

/// Errors raised while decoding proof bytes or proof-shaped payloads
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Input ended before all fixed-width chunks were read
    #[error("Truncated proof: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Groth16 commitment proofs must carry exactly one commitment
    #[error("commitmentCount != nbCommitments: expected {expected}, got {actual}")]
    CommitmentCount { expected: u32, actual: u32 },

    /// A merkle proof must have exactly one layer per store
    #[error("Invalid merkle proof: expected {expected} layers, got {actual}")]
    LayerCount { expected: usize, actual: usize },

    /// Merkle proof layer is not an existence proof
    #[error("Invalid merkle proof[{0}]: not an existence proof")]
    NotExistence(usize),

    /// Public input does not fit the circuit field
    #[error("Public input {index} exceeds 253 bits")]
    FieldOverflow { index: usize },

    /// Unknown prover type selector
    #[error("Unsupported proof type: {0}")]
    UnsupportedProverType(String),

    /// Ethereum ABI decoding failed
    #[error("ABI decoding error: {0}")]
    Abi(String),

    /// Protobuf decoding failed
    #[error("Protobuf decoding error: {0}")]
    Protobuf(String),

    /// Prover response was not valid JSON
    #[error("JSON decoding error: {0}")]
    Json(String),

    /// Hex or base64 field could not be decoded
    #[error("Invalid encoding: {0}")]
    Encoding(String),
}

/// Result type for decoding operations
pub type Result<T> = std::result::Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commitment_count_message_reports_both_values() {
        let err = DecodeError::CommitmentCount {
            expected: 1,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "commitmentCount != nbCommitments: expected 1, got 2"
        );
    }

    #[test]
    fn test_truncated_message() {
        let err = DecodeError::Truncated {
            expected: 256,
            actual: 10,
        };
        assert_eq!(err.to_string(), "Truncated proof: need 256 bytes, got 10");
    }
}

//! tendermint-zk proof codecs
//!
//! Fixed-width encodings of the proofs produced by the gnark prover and the
//! Ethereum ABI layouts expected by the on-chain verifier contract.
//!
//! ```text
//!   prover bytes ──parse──▶ ZkProof ──encode_abi──▶ verifier calldata
//!                              ▲                        │
//!                              └──────decode_abi────────┘
//! ```

pub mod error;
pub mod groth16;
pub mod groth16_commitment;

use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;

pub use error::{DecodeError, Result};
pub use groth16::Groth16Proof;
pub use groth16_commitment::Groth16CommitmentProof;

/// Size of one field element chunk in the prover's raw proof bytes
pub const FP_SIZE: usize = 32;

/// Public inputs of the wrapped circuit: verifier digest, input hash, output hash
pub const NB_PUBLIC_INPUTS: usize = 3;

/// Public inputs must stay below 2^253 to fit the circuit's native field
pub const FIELD_BITS: usize = 253;

/// Clears the top 3 bits of the first byte of a big-endian 256-bit value
pub const FIELD_MASK: u8 = 0x1f;

/// ABI encoding of the mock proof
pub const MOCK_PROOF: &[u8] = b"mock";

/// Prover backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProverType {
    /// Local reference derivation, no network
    #[default]
    Mock,
    /// Remote prover returning a plain Groth16 proof
    Groth16,
    /// Remote prover returning a Groth16 proof with one commitment
    Groth16Commitment,
}

impl ProverType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProverType::Mock => "mock",
            ProverType::Groth16 => "groth16",
            ProverType::Groth16Commitment => "groth16-commitment",
        }
    }
}

impl fmt::Display for ProverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProverType {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mock" => Ok(ProverType::Mock),
            "groth16" => Ok(ProverType::Groth16),
            "groth16-commitment" => Ok(ProverType::Groth16Commitment),
            other => Err(DecodeError::UnsupportedProverType(other.to_string())),
        }
    }
}

/// A proof in one of the shapes the verifier contract accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZkProof {
    Mock,
    Groth16(Groth16Proof),
    Groth16Commitment(Groth16CommitmentProof),
}

impl ZkProof {
    /// Parse raw prover output according to the configured backend
    pub fn parse(prover_type: ProverType, proof_bytes: &[u8]) -> Result<Self> {
        match prover_type {
            ProverType::Mock => Ok(ZkProof::Mock),
            ProverType::Groth16 => Groth16Proof::parse(proof_bytes).map(ZkProof::Groth16),
            ProverType::Groth16Commitment => {
                Groth16CommitmentProof::parse(proof_bytes).map(ZkProof::Groth16Commitment)
            }
        }
    }

    pub fn prover_type(&self) -> ProverType {
        match self {
            ZkProof::Mock => ProverType::Mock,
            ZkProof::Groth16(_) => ProverType::Groth16,
            ZkProof::Groth16Commitment(_) => ProverType::Groth16Commitment,
        }
    }

    /// Bytes submitted to the verifier contract
    pub fn encode_abi(&self) -> Vec<u8> {
        match self {
            ZkProof::Mock => MOCK_PROOF.to_vec(),
            ZkProof::Groth16(p) => p.encode_abi(),
            ZkProof::Groth16Commitment(p) => p.encode_abi(),
        }
    }
}

/// Reject public inputs that do not fit the circuit field
pub fn check_field_element(index: usize, value: &U256) -> Result<()> {
    if value.bit_len() > FIELD_BITS {
        return Err(DecodeError::FieldOverflow { index });
    }
    Ok(())
}

/// Interpret a SHA-256 digest as a field element by masking its high bits
pub fn masked_field_element(mut digest: [u8; 32]) -> U256 {
    digest[0] &= FIELD_MASK;
    U256::from_be_bytes(digest)
}

fn ensure_len(bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() < expected {
        return Err(DecodeError::Truncated {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

fn read_chunk(bytes: &[u8], index: usize, base: usize) -> U256 {
    let start = base + index * FP_SIZE;
    U256::from_be_slice(&bytes[start..start + FP_SIZE])
}

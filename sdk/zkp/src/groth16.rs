//! Plain Groth16 proofs (`uint256[8]`).
use alloy_primitives::U256;
use alloy_sol_types::{SolType, sol};

use crate::{DecodeError, FP_SIZE, Result, ensure_len, read_chunk};

/// A.x, A.y, B.x[2], B.y[2], C.x, C.y
pub const GROTH16_PROOF_ELEMENTS: usize = 8;

/// Size of the prover's raw proof and of the ABI encoding
pub const GROTH16_PROOF_SIZE: usize = GROTH16_PROOF_ELEMENTS * FP_SIZE;

pub type Groth16ProofAbi = sol! { uint256[8] };

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Groth16Proof(pub [U256; GROTH16_PROOF_ELEMENTS]);

impl Groth16Proof {
    /// Read exactly 8 big-endian 32-byte chunks from the prover output
    pub fn parse(proof_bytes: &[u8]) -> Result<Self> {
        ensure_len(proof_bytes, GROTH16_PROOF_SIZE)?;
        let mut elements = [U256::ZERO; GROTH16_PROOF_ELEMENTS];
        for (i, element) in elements.iter_mut().enumerate() {
            *element = read_chunk(proof_bytes, i, 0);
        }
        Ok(Self(elements))
    }

    pub fn encode_abi(&self) -> Vec<u8> {
        Groth16ProofAbi::abi_encode(&self.0)
    }

    pub fn decode_abi(data: &[u8]) -> Result<Self> {
        ensure_len(data, GROTH16_PROOF_SIZE)?;
        let elements = Groth16ProofAbi::abi_decode(data, true)
            .map_err(|e| DecodeError::Abi(e.to_string()))?;
        Ok(Self(elements))
    }

    pub fn elements(&self) -> &[U256; GROTH16_PROOF_ELEMENTS] {
        &self.0
    }
}

//! Groth16 proofs carrying a Pedersen commitment (`(uint256[8], uint256[2], uint256[2])`).
//!
//! Raw prover layout:
//!
//! ```text
//! | Ar, Bs, Krs (8 x 32) | count (4, BE) | commitments (count x 64) | pok (64) |
//! ```
use alloy_primitives::U256;
use alloy_sol_types::{SolType, sol};

use crate::groth16::{GROTH16_PROOF_ELEMENTS, GROTH16_PROOF_SIZE};
use crate::{DecodeError, FP_SIZE, Result, ensure_len, read_chunk};

/// The verifier contract supports exactly one commitment
pub const NB_COMMITMENTS: u32 = 1;

const COMMITMENT_COUNT_SIZE: usize = 4;

/// Raw size for a proof with exactly one commitment
pub const GROTH16_COMMITMENT_PROOF_SIZE: usize =
    GROTH16_PROOF_SIZE + COMMITMENT_COUNT_SIZE + 2 * FP_SIZE * NB_COMMITMENTS as usize + 2 * FP_SIZE;

/// Size of the ABI encoding
pub const GROTH16_COMMITMENT_ABI_SIZE: usize = (GROTH16_PROOF_ELEMENTS + 2 + 2) * FP_SIZE;

pub type Groth16CommitmentProofAbi = sol! { tuple(uint256[8], uint256[2], uint256[2]) };

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Groth16CommitmentProof {
    pub proof: [U256; GROTH16_PROOF_ELEMENTS],
    pub commitments: [U256; 2],
    pub commitment_pok: [U256; 2],
}

impl Groth16CommitmentProof {
    pub fn parse(proof_bytes: &[u8]) -> Result<Self> {
        ensure_len(proof_bytes, GROTH16_PROOF_SIZE + COMMITMENT_COUNT_SIZE)?;

        let mut count = [0u8; COMMITMENT_COUNT_SIZE];
        count.copy_from_slice(
            &proof_bytes[GROTH16_PROOF_SIZE..GROTH16_PROOF_SIZE + COMMITMENT_COUNT_SIZE],
        );
        let commitment_count = u32::from_be_bytes(count);
        if commitment_count != NB_COMMITMENTS {
            return Err(DecodeError::CommitmentCount {
                expected: NB_COMMITMENTS,
                actual: commitment_count,
            });
        }
        ensure_len(proof_bytes, GROTH16_COMMITMENT_PROOF_SIZE)?;

        let mut proof = [U256::ZERO; GROTH16_PROOF_ELEMENTS];
        for (i, element) in proof.iter_mut().enumerate() {
            *element = read_chunk(proof_bytes, i, 0);
        }

        let commitments_base = GROTH16_PROOF_SIZE + COMMITMENT_COUNT_SIZE;
        let commitments = [
            read_chunk(proof_bytes, 0, commitments_base),
            read_chunk(proof_bytes, 1, commitments_base),
        ];

        let pok_base = commitments_base + 2 * FP_SIZE * NB_COMMITMENTS as usize;
        let commitment_pok = [
            read_chunk(proof_bytes, 0, pok_base),
            read_chunk(proof_bytes, 1, pok_base),
        ];

        Ok(Self {
            proof,
            commitments,
            commitment_pok,
        })
    }

    pub fn encode_abi(&self) -> Vec<u8> {
        Groth16CommitmentProofAbi::abi_encode(&(self.proof, self.commitments, self.commitment_pok))
    }

    pub fn decode_abi(data: &[u8]) -> Result<Self> {
        ensure_len(data, GROTH16_COMMITMENT_ABI_SIZE)?;
        let (proof, commitments, commitment_pok) = Groth16CommitmentProofAbi::abi_decode(data, true)
            .map_err(|e| DecodeError::Abi(e.to_string()))?;
        Ok(Self {
            proof,
            commitments,
            commitment_pok,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn raw_proof(count: u32) -> Vec<u8> {
        let mut raw = Vec::new();
        for i in 0..8u8 {
            let mut chunk = [0u8; 32];
            chunk[31] = i + 1;
            raw.extend_from_slice(&chunk);
        }
        raw.extend_from_slice(&count.to_be_bytes());
        for i in 0..(2 * count.max(1) as u8 + 2) {
            let mut chunk = [0u8; 32];
            chunk[0] = 0x10 + i;
            raw.extend_from_slice(&chunk);
        }
        raw
    }

    #[test]
    fn test_parse_single_commitment() {
        let raw = raw_proof(1);
        assert_eq!(raw.len(), GROTH16_COMMITMENT_PROOF_SIZE);

        let proof = Groth16CommitmentProof::parse(&raw).unwrap();
        assert_eq!(proof.proof[0], U256::from(1u64));
        assert_eq!(proof.proof[7], U256::from(8u64));

        let mut expected = [0u8; 32];
        expected[0] = 0x10;
        assert_eq!(proof.commitments[0], U256::from_be_bytes(expected));
        expected[0] = 0x13;
        assert_eq!(proof.commitment_pok[1], U256::from_be_bytes(expected));
    }

    #[test]
    fn test_commitment_count_two_rejected() {
        let err = Groth16CommitmentProof::parse(&raw_proof(2)).unwrap_err();
        assert_eq!(
            err,
            DecodeError::CommitmentCount {
                expected: 1,
                actual: 2
            }
        );
    }

    #[test]
    fn test_commitment_count_zero_rejected() {
        let err = Groth16CommitmentProof::parse(&raw_proof(0)).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::CommitmentCount {
                expected: 1,
                actual: 0
            }
        ));
    }

    #[test]
    fn test_parse_truncated_after_count() {
        let raw = raw_proof(1);
        let err = Groth16CommitmentProof::parse(&raw[..raw.len() - 1]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                expected: GROTH16_COMMITMENT_PROOF_SIZE,
                actual: GROTH16_COMMITMENT_PROOF_SIZE - 1
            }
        );
    }

    #[test]
    fn test_parse_truncated_before_count() {
        assert!(matches!(
            Groth16CommitmentProof::parse(&[0u8; 100]),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_abi_size() {
        let encoded = Groth16CommitmentProof::default().encode_abi();
        assert_eq!(encoded.len(), GROTH16_COMMITMENT_ABI_SIZE);
    }

    proptest! {
        #[test]
        fn prop_encode_decode_identity(limbs in any::<[[u8; 32]; 12]>()) {
            let mut proof = Groth16CommitmentProof::default();
            for i in 0..8 {
                proof.proof[i] = U256::from_be_bytes(limbs[i]);
            }
            for i in 0..2 {
                proof.commitments[i] = U256::from_be_bytes(limbs[8 + i]);
                proof.commitment_pok[i] = U256::from_be_bytes(limbs[10 + i]);
            }
            let decoded = Groth16CommitmentProof::decode_abi(&proof.encode_abi()).unwrap();
            prop_assert_eq!(decoded, proof);
        }
    }
}

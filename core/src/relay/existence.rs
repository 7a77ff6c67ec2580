//! Existence Proof Codec
//!
//! Turns the two-layer ICS-23 membership proof returned by an ABCI query into
//! the flat form read by the on-chain verifier:
//!
//! ```text
//!   MerkleProof[0]  IAVL existence proof      (key = path,  root = store hash)
//!   MerkleProof[1]  simple tree existence proof (key = "ibc", root = app hash)
//!
//!   tuple(uint8 spec, bytes prefix, bytes key, bytes value,
//!         tuple(bytes prefix, bytes suffix)[] path)[2]
//! ```
//!
//! A proof is only encoded after it verified against the expected root.

use std::sync::Arc;

use alloy_primitives::Bytes;
use alloy_sol_types::{SolType, sol_data};
use ics23::HostFunctionsManager;
use ics23::commitment_proof::Proof;
use prost::Message;
use tmzk_zkp::DecodeError;
use tracing::debug;

use crate::error::{RelayError, Result};

pub const SIMPLE_TREE_SPEC: u8 = 0;
pub const IAVL_SPEC: u8 = 1;

/// Store holding the IBC state in the application multistore
pub const IBC_STORE_KEY: &str = "ibc";

/// App-state layer followed by the multistore layer
pub const PROOF_LAYERS: usize = 2;

// ============================================================================
// Types
// ============================================================================

/// One inner node on the path from leaf to root
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathStep {
    pub prefix: Vec<u8>,
    pub suffix: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExistenceProof {
    pub spec: u8,
    /// Leaf prefix
    pub prefix: Vec<u8>,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub path: Vec<PathStep>,
}

impl ExistenceProof {
    fn from_ics23(spec: u8, proof: &ics23::ExistenceProof) -> Self {
        Self {
            spec,
            prefix: proof
                .leaf
                .as_ref()
                .map(|leaf| leaf.prefix.clone())
                .unwrap_or_default(),
            key: proof.key.clone(),
            value: proof.value.clone(),
            path: proof
                .path
                .iter()
                .map(|op| PathStep {
                    prefix: op.prefix.clone(),
                    suffix: op.suffix.clone(),
                })
                .collect(),
        }
    }
}

/// `ibc.core.commitment.v1.MerkleProof`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MerkleProof {
    #[prost(message, repeated, tag = "1")]
    pub proofs: Vec<ics23::CommitmentProof>,
}

impl MerkleProof {
    pub fn decode_bytes(bytes: &[u8]) -> Result<Self> {
        Self::decode(bytes)
            .map_err(|e| RelayError::Decode(DecodeError::Protobuf(e.to_string())))
    }

    /// Existence proofs of both layers, or the index of the first layer that is not one
    fn existence_layers(&self) -> std::result::Result<[&ics23::ExistenceProof; 2], DecodeError> {
        if self.proofs.len() != PROOF_LAYERS {
            return Err(DecodeError::LayerCount {
                expected: PROOF_LAYERS,
                actual: self.proofs.len(),
            });
        }
        let layer = |i: usize| match &self.proofs[i].proof {
            Some(Proof::Exist(exist)) => Ok(exist),
            _ => Err(DecodeError::NotExistence(i)),
        };
        Ok([layer(0)?, layer(1)?])
    }
}

// ============================================================================
// ABI layout
// ============================================================================

type PathStepAbi = (sol_data::Bytes, sol_data::Bytes);

type ExistenceProofAbi = (
    sol_data::Uint<8>,
    sol_data::Bytes,
    sol_data::Bytes,
    sol_data::Bytes,
    sol_data::Array<PathStepAbi>,
);

pub type ExistenceProofsAbi = sol_data::FixedArray<ExistenceProofAbi, PROOF_LAYERS>;

type ExistenceProofTuple = (u8, Bytes, Bytes, Bytes, Vec<(Bytes, Bytes)>);

fn to_abi(proof: &ExistenceProof) -> ExistenceProofTuple {
    (
        proof.spec,
        Bytes::copy_from_slice(&proof.prefix),
        Bytes::copy_from_slice(&proof.key),
        Bytes::copy_from_slice(&proof.value),
        proof
            .path
            .iter()
            .map(|step| {
                (
                    Bytes::copy_from_slice(&step.prefix),
                    Bytes::copy_from_slice(&step.suffix),
                )
            })
            .collect(),
    )
}

fn from_abi((spec, prefix, key, value, path): ExistenceProofTuple) -> ExistenceProof {
    ExistenceProof {
        spec,
        prefix: prefix.to_vec(),
        key: key.to_vec(),
        value: value.to_vec(),
        path: path
            .into_iter()
            .map(|(prefix, suffix)| PathStep {
                prefix: prefix.to_vec(),
                suffix: suffix.to_vec(),
            })
            .collect(),
    }
}

pub fn encode_existence_proofs(proofs: &[ExistenceProof; PROOF_LAYERS]) -> Vec<u8> {
    let tuples = [to_abi(&proofs[0]), to_abi(&proofs[1])];
    ExistenceProofsAbi::abi_encode(&tuples)
}

pub fn decode_existence_proofs(
    data: &[u8],
) -> std::result::Result<[ExistenceProof; PROOF_LAYERS], DecodeError> {
    let tuples = ExistenceProofsAbi::abi_decode(data, true)
        .map_err(|e| DecodeError::Abi(e.to_string()))?;
    Ok(tuples.map(from_abi))
}

// ============================================================================
// Membership verification
// ============================================================================

/// Checks that `value` is stored at `path` in the ibc store committed by `root`
pub trait MembershipVerifier: Send + Sync {
    fn verify_membership(
        &self,
        root: &[u8],
        path: &str,
        value: &[u8],
        proof: &MerkleProof,
    ) -> anyhow::Result<()>;
}

/// ICS-23 verification with the cosmos-sdk proof specs
#[derive(Debug, Clone, Copy, Default)]
pub struct Ics23Verifier;

impl MembershipVerifier for Ics23Verifier {
    fn verify_membership(
        &self,
        root: &[u8],
        path: &str,
        value: &[u8],
        proof: &MerkleProof,
    ) -> anyhow::Result<()> {
        let specs = [ics23::iavl_spec(), ics23::tendermint_spec()];
        let keys = [path.as_bytes(), IBC_STORE_KEY.as_bytes()];
        let layers = proof.existence_layers()?;

        let mut value = value.to_vec();
        for (i, exist) in layers.iter().enumerate() {
            let subroot = ics23::calculate_existence_root::<HostFunctionsManager>(exist)
                .map_err(|e| anyhow::anyhow!("failed to compute root of layer {}: {}", i, e))?;
            if !ics23::verify_membership::<HostFunctionsManager>(
                &proof.proofs[i],
                &specs[i],
                &subroot,
                keys[i],
                &value,
            ) {
                anyhow::bail!(
                    "membership of layer {} does not verify (key {:?})",
                    i,
                    String::from_utf8_lossy(keys[i])
                );
            }
            value = subroot;
        }

        if value != root {
            anyhow::bail!(
                "root mismatch: expected 0x{} got 0x{}",
                hex::encode(root),
                hex::encode(&value)
            );
        }
        Ok(())
    }
}

// ============================================================================
// Codec
// ============================================================================

#[derive(Clone)]
pub struct ExistenceProofCodec {
    verifier: Arc<dyn MembershipVerifier>,
}

impl Default for ExistenceProofCodec {
    fn default() -> Self {
        Self::new(Arc::new(Ics23Verifier))
    }
}

impl ExistenceProofCodec {
    pub fn new(verifier: Arc<dyn MembershipVerifier>) -> Self {
        Self { verifier }
    }

    /// Verify `value` at `path` under `root`, then re-encode the proof for the verifier contract
    pub fn convert(
        &self,
        root: &[u8],
        path: &str,
        value: &[u8],
        proof: &MerkleProof,
    ) -> Result<Vec<u8>> {
        let [iavl, simple] = proof.existence_layers()?;

        self.verifier
            .verify_membership(root, path, value, proof)
            .map_err(|e| RelayError::Verification(e.to_string()))?;

        let proofs = [
            ExistenceProof::from_ics23(IAVL_SPEC, iavl),
            ExistenceProof::from_ics23(SIMPLE_TREE_SPEC, simple),
        ];
        debug!(
            path,
            iavl_path_len = proofs[0].path.len(),
            simple_path_len = proofs[1].path.len(),
            "converted existence proof"
        );
        Ok(encode_existence_proofs(&proofs))
    }
}

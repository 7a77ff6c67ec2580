//! Tendermint block header and its simple Merkle commitment.
//!
//! The block hash is the RFC-6962 style Merkle root over the protobuf
//! encodings of the 14 header fields, in declaration order:
//!
//! ```text
//!  0 version            5 last_commit_hash       10 app_hash
//!  1 chain_id           6 data_hash              11 last_results_hash
//!  2 height             7 validators_hash        12 evidence_hash
//!  3 time               8 next_validators_hash   13 proposer_address
//!  4 last_block_id      9 consensus_hash
//! ```
//!
//! Leaves are `sha256(0x00 || bytes)`, inner nodes `sha256(0x01 || left || right)`.

use chrono::{DateTime, Utc};
use prost::Message;
use sha2::{Digest, Sha256};

use crate::error::{RelayError, Result};

pub const HEADER_FIELDS: usize = 14;

pub const LEAF_PREFIX: u8 = 0x00;
pub const INNER_PREFIX: u8 = 0x01;

/// Leaf indexes referenced by the header commitment circuit
pub const TIME_LEAF: usize = 3;
pub const APP_HASH_LEAF: usize = 10;

pub type Hash = [u8; 32];

// ============================================================================
// Header
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Version {
    pub block: u64,
    pub app: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartSetHeaderId {
    pub total: u32,
    pub hash: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockId {
    pub hash: Vec<u8>,
    pub part_set_header: PartSetHeaderId,
}

/// Raw block metadata as fetched from the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: Version,
    pub chain_id: String,
    pub height: u64,
    pub time: DateTime<Utc>,
    pub last_block_id: BlockId,
    pub last_commit_hash: Vec<u8>,
    pub data_hash: Vec<u8>,
    pub validators_hash: Vec<u8>,
    pub next_validators_hash: Vec<u8>,
    pub consensus_hash: Vec<u8>,
    pub app_hash: Vec<u8>,
    pub last_results_hash: Vec<u8>,
    pub evidence_hash: Vec<u8>,
    pub proposer_address: Vec<u8>,
}

impl Header {
    /// Canonical protobuf encoding of every field, one entry per leaf.
    ///
    /// Zero values encode to the empty byte string; no position is skipped.
    pub fn encoded_fields(&self) -> Result<[Vec<u8>; HEADER_FIELDS]> {
        if self.validators_hash.is_empty() {
            return Err(RelayError::MalformedHeader(format!(
                "validators hash is empty at height {}",
                self.height
            )));
        }
        let height = i64::try_from(self.height).map_err(|_| {
            RelayError::MalformedHeader(format!("height {} overflows int64", self.height))
        })?;

        Ok([
            pb::Consensus {
                block: self.version.block,
                app: self.version.app,
            }
            .encode_to_vec(),
            pb::StringValue {
                value: self.chain_id.clone(),
            }
            .encode_to_vec(),
            pb::Int64Value { value: height }.encode_to_vec(),
            pb::Timestamp {
                seconds: self.time.timestamp(),
                nanos: self.time.timestamp_subsec_nanos() as i32,
            }
            .encode_to_vec(),
            pb::BlockId {
                hash: self.last_block_id.hash.clone(),
                part_set_header: Some(pb::PartSetHeader {
                    total: self.last_block_id.part_set_header.total,
                    hash: self.last_block_id.part_set_header.hash.clone(),
                }),
            }
            .encode_to_vec(),
            bytes_value(&self.last_commit_hash),
            bytes_value(&self.data_hash),
            bytes_value(&self.validators_hash),
            bytes_value(&self.next_validators_hash),
            bytes_value(&self.consensus_hash),
            bytes_value(&self.app_hash),
            bytes_value(&self.last_results_hash),
            bytes_value(&self.evidence_hash),
            bytes_value(&self.proposer_address),
        ])
    }

    /// The 14 leaf hashes of the header commitment
    pub fn leaves(&self) -> Result<[Hash; HEADER_FIELDS]> {
        let fields = self.encoded_fields()?;
        Ok(fields.map(|field| leaf_hash(&field)))
    }

    /// Block hash committed by the next block's `last_block_id`
    pub fn hash(&self) -> Result<Hash> {
        Ok(merkle_root(&self.leaves()?))
    }

    /// Header time as Unix nanoseconds, zero before the epoch or past 2262
    pub fn timestamp_nanos(&self) -> u64 {
        self.time
            .timestamp_nanos_opt()
            .map(|n| n.max(0) as u64)
            .unwrap_or(0)
    }
}

fn bytes_value(value: &[u8]) -> Vec<u8> {
    pb::BytesValue {
        value: value.to_vec(),
    }
    .encode_to_vec()
}

// ============================================================================
// Hashing
// ============================================================================

pub fn leaf_hash(leaf: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(leaf);
    hasher.finalize().into()
}

pub fn inner_hash(left: &[u8], right: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([INNER_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Merkle root over already leaf-hashed items
pub fn merkle_root(leaves: &[Hash]) -> Hash {
    match leaves.len() {
        0 => Sha256::digest(b"").into(),
        1 => leaves[0],
        n => {
            let k = split_point(n);
            inner_hash(&merkle_root(&leaves[..k]), &merkle_root(&leaves[k..]))
        }
    }
}

/// Largest power of two strictly less than `n` (n >= 2)
fn split_point(n: usize) -> usize {
    n.next_power_of_two() / 2
}

// ============================================================================
// Protobuf wire types
// ============================================================================

pub(crate) mod pb {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Consensus {
        #[prost(uint64, tag = "1")]
        pub block: u64,
        #[prost(uint64, tag = "2")]
        pub app: u64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Timestamp {
        #[prost(int64, tag = "1")]
        pub seconds: i64,
        #[prost(int32, tag = "2")]
        pub nanos: i32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct PartSetHeader {
        #[prost(uint32, tag = "1")]
        pub total: u32,
        #[prost(bytes = "vec", tag = "2")]
        pub hash: Vec<u8>,
    }

    /// `part_set_header` is non-nullable upstream and always emitted
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BlockId {
        #[prost(bytes = "vec", tag = "1")]
        pub hash: Vec<u8>,
        #[prost(message, optional, tag = "2")]
        pub part_set_header: Option<PartSetHeader>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct StringValue {
        #[prost(string, tag = "1")]
        pub value: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Int64Value {
        #[prost(int64, tag = "1")]
        pub value: i64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BytesValue {
        #[prost(bytes = "vec", tag = "1")]
        pub value: Vec<u8>,
    }
}

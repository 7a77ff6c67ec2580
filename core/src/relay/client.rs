//! Light client objects submitted to the counterparty chain.
//!
//! The counterparty's client module only ever sees three kinds of object, so
//! they are a closed enum rather than an open registry.

use std::fmt;

use prost::Message;
use serde::Serialize;
use tmzk_zkp::{DecodeError, NB_PUBLIC_INPUTS};

use crate::error::{RelayError, Result};
use crate::relay::tree::SIMPLE_TREE_PROOF_LEN;

pub const CLIENT_TYPE: &str = "tendermint-zk";

/// Tendermint chains relayed by this client never upgrade their revision
pub const REVISION_NUMBER: u64 = 0;

// ============================================================================
// Messages
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Message)]
pub struct Height {
    #[prost(uint64, tag = "1")]
    pub revision_number: u64,
    #[prost(uint64, tag = "2")]
    pub revision_height: u64,
}

impl Height {
    pub fn new(revision_height: u64) -> Self {
        Self {
            revision_number: REVISION_NUMBER,
            revision_height,
        }
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.revision_number, self.revision_height)
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClientState {
    #[prost(bytes = "vec", tag = "1")]
    pub step_verifier_digest: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub skip_verifier_digest: Vec<u8>,
    /// Nanoseconds
    #[prost(uint64, tag = "3")]
    pub trusting_period: u64,
    #[prost(bool, tag = "4")]
    pub frozen: bool,
    #[prost(message, optional, tag = "5")]
    pub latest_height: Option<Height>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConsensusState {
    #[prost(bytes = "vec", tag = "1")]
    pub block_hash: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub app_hash: Vec<u8>,
    /// Unix nanoseconds
    #[prost(uint64, tag = "3")]
    pub timestamp: u64,
}

/// Header update proven by a zk proof instead of a commit signature set
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateStateMessage {
    #[prost(uint64, tag = "1")]
    pub trusted_height: u64,
    #[prost(uint64, tag = "2")]
    pub untrusted_height: u64,
    #[prost(bytes = "vec", tag = "3")]
    pub untrusted_block_hash: Vec<u8>,
    /// Unix nanoseconds
    #[prost(uint64, tag = "4")]
    pub timestamp: u64,
    #[prost(bytes = "vec", tag = "5")]
    pub app_hash: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "6")]
    pub simple_tree_proof: Vec<Vec<u8>>,
    /// Minimal big-endian public inputs
    #[prost(bytes = "vec", repeated, tag = "7")]
    pub input: Vec<Vec<u8>>,
    /// ABI encoded proof
    #[prost(bytes = "vec", tag = "8")]
    pub zk_proof: Vec<u8>,
}

/// Logging view with 0x-prefixed hex fields
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct UpdateStateJson {
    trusted_height: u64,
    untrusted_height: u64,
    untrusted_block_hash: String,
    timestamp: u64,
    app_hash: String,
    simple_tree_proof: Vec<String>,
    input: Vec<String>,
    zk_proof: String,
}

fn hex_string(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

impl UpdateStateMessage {
    pub fn to_json(&self) -> String {
        let view = UpdateStateJson {
            trusted_height: self.trusted_height,
            untrusted_height: self.untrusted_height,
            untrusted_block_hash: hex_string(&self.untrusted_block_hash),
            timestamp: self.timestamp,
            app_hash: hex_string(&self.app_hash),
            simple_tree_proof: self.simple_tree_proof.iter().map(|b| hex_string(b)).collect(),
            input: self.input.iter().map(|b| hex_string(b)).collect(),
            zk_proof: hex_string(&self.zk_proof),
        };
        serde_json::to_string(&view).unwrap_or_default()
    }
}

// ============================================================================
// Client objects
// ============================================================================

fn invalid(msg: impl Into<String>) -> RelayError {
    RelayError::Validation(msg.into())
}

fn ensure_len(name: &str, bytes: &[u8], len: usize) -> Result<()> {
    if bytes.len() != len {
        return Err(invalid(format!(
            "{} must be {} bytes, got {}",
            name,
            len,
            bytes.len()
        )));
    }
    Ok(())
}

pub trait ClientObject {
    fn client_type(&self) -> &'static str {
        CLIENT_TYPE
    }

    /// Height the object refers to, if it carries one
    fn height(&self) -> Option<Height>;

    fn validate_basic(&self) -> Result<()>;

    fn serialize(&self) -> Vec<u8>;
}

impl ClientObject for ClientState {
    fn height(&self) -> Option<Height> {
        self.latest_height
    }

    fn validate_basic(&self) -> Result<()> {
        ensure_len("step verifier digest", &self.step_verifier_digest, 32)?;
        ensure_len("skip verifier digest", &self.skip_verifier_digest, 32)?;
        if self.trusting_period == 0 {
            return Err(invalid("trusting period cannot be zero"));
        }
        match self.latest_height {
            Some(h) if h.revision_number == REVISION_NUMBER && h.revision_height > 0 => Ok(()),
            Some(h) => Err(invalid(format!("invalid latest height {}", h))),
            None => Err(invalid("latest height is missing")),
        }
    }

    fn serialize(&self) -> Vec<u8> {
        self.encode_to_vec()
    }
}

impl ClientObject for ConsensusState {
    fn height(&self) -> Option<Height> {
        None
    }

    fn validate_basic(&self) -> Result<()> {
        ensure_len("block hash", &self.block_hash, 32)?;
        if self.app_hash.is_empty() {
            return Err(invalid("app hash cannot be empty"));
        }
        if self.timestamp == 0 {
            return Err(invalid("timestamp cannot be zero"));
        }
        Ok(())
    }

    fn serialize(&self) -> Vec<u8> {
        self.encode_to_vec()
    }
}

impl ClientObject for UpdateStateMessage {
    fn height(&self) -> Option<Height> {
        Some(Height::new(self.untrusted_height))
    }

    fn validate_basic(&self) -> Result<()> {
        if self.trusted_height >= self.untrusted_height {
            return Err(invalid(format!(
                "trusted height {} must be below untrusted height {}",
                self.trusted_height, self.untrusted_height
            )));
        }
        ensure_len("untrusted block hash", &self.untrusted_block_hash, 32)?;
        if self.simple_tree_proof.len() != SIMPLE_TREE_PROOF_LEN {
            return Err(invalid(format!(
                "simple tree proof must have {} nodes, got {}",
                SIMPLE_TREE_PROOF_LEN,
                self.simple_tree_proof.len()
            )));
        }
        for node in &self.simple_tree_proof {
            ensure_len("simple tree proof node", node, 32)?;
        }
        if self.input.len() != NB_PUBLIC_INPUTS {
            return Err(invalid(format!(
                "expected {} public inputs, got {}",
                NB_PUBLIC_INPUTS,
                self.input.len()
            )));
        }
        if self.input.iter().any(|i| i.len() > 32) {
            return Err(invalid("public input wider than 32 bytes"));
        }
        if self.zk_proof.is_empty() {
            return Err(invalid("zk proof cannot be empty"));
        }
        Ok(())
    }

    fn serialize(&self) -> Vec<u8> {
        self.encode_to_vec()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientObjectKind {
    ClientState,
    ConsensusState,
    UpdateState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnyClientObject {
    ClientState(ClientState),
    ConsensusState(ConsensusState),
    UpdateState(UpdateStateMessage),
}

impl AnyClientObject {
    pub fn decode(kind: ClientObjectKind, bytes: &[u8]) -> Result<Self> {
        let protobuf = |e: prost::DecodeError| RelayError::Decode(DecodeError::Protobuf(e.to_string()));
        Ok(match kind {
            ClientObjectKind::ClientState => {
                AnyClientObject::ClientState(ClientState::decode(bytes).map_err(protobuf)?)
            }
            ClientObjectKind::ConsensusState => {
                AnyClientObject::ConsensusState(ConsensusState::decode(bytes).map_err(protobuf)?)
            }
            ClientObjectKind::UpdateState => {
                AnyClientObject::UpdateState(UpdateStateMessage::decode(bytes).map_err(protobuf)?)
            }
        })
    }

    pub fn kind(&self) -> ClientObjectKind {
        match self {
            AnyClientObject::ClientState(_) => ClientObjectKind::ClientState,
            AnyClientObject::ConsensusState(_) => ClientObjectKind::ConsensusState,
            AnyClientObject::UpdateState(_) => ClientObjectKind::UpdateState,
        }
    }

    fn inner(&self) -> &dyn ClientObject {
        match self {
            AnyClientObject::ClientState(cs) => cs,
            AnyClientObject::ConsensusState(cs) => cs,
            AnyClientObject::UpdateState(msg) => msg,
        }
    }
}

impl ClientObject for AnyClientObject {
    fn height(&self) -> Option<Height> {
        self.inner().height()
    }

    fn validate_basic(&self) -> Result<()> {
        self.inner().validate_basic()
    }

    fn serialize(&self) -> Vec<u8> {
        self.inner().serialize()
    }
}

impl From<ClientState> for AnyClientObject {
    fn from(cs: ClientState) -> Self {
        AnyClientObject::ClientState(cs)
    }
}

impl From<ConsensusState> for AnyClientObject {
    fn from(cs: ConsensusState) -> Self {
        AnyClientObject::ConsensusState(cs)
    }
}

impl From<UpdateStateMessage> for AnyClientObject {
    fn from(msg: UpdateStateMessage) -> Self {
        AnyClientObject::UpdateState(msg)
    }
}

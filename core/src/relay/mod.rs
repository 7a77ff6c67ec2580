pub mod chain;
pub mod client;
pub mod existence;
pub mod pipeline;
pub mod prover;
pub mod tree;

pub use chain::{ChainClient, InMemoryTrustedStore, StateQueryResponse, TrustedHeaderStore};
pub use client::{
    AnyClientObject, CLIENT_TYPE, ClientObject, ClientObjectKind, ClientState, ConsensusState,
    Height, UpdateStateMessage,
};
pub use existence::{
    ExistenceProof, ExistenceProofCodec, Ics23Verifier, MembershipVerifier, MerkleProof,
};
pub use pipeline::{LightClientUpdatePipeline, PipelineConfig, RelayStage};
pub use prover::{ProofTicket, ProverClient, ProverClientConfig, ZkProofAndInput, reference_input};
pub use tree::SimpleTreeProof;

#[cfg(test)]
mod tests;

//! Light Client Update Pipeline
//!
//! Turns a `(trusted, target)` height pair into the message the counterparty
//! light client consumes.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                     LightClientUpdatePipeline::update                    │
//! │                                                                          │
//! │  ┌───────────────┐   ┌──────────────┐   ┌────────────┐   ┌────────────┐  │
//! │  │ FetchTarget   │──▶│ RequestProof │──▶│ AwaitProof │──▶│ BuildSimple│  │
//! │  │ Header        │   │  (spawned)   │   │ (bounded)  │   │ TreeProof  │  │
//! │  └───────────────┘   └──────────────┘   └────────────┘   └────────────┘  │
//! │                                                                 │        │
//! │                                                                 ▼        │
//! │                            ┌────────┐      ┌──────────────────────────┐  │
//! │                            │  Done  │◀─────│      AssembleMessage     │  │
//! │                            └────────┘      └──────────────────────────┘  │
//! │                                                                          │
//! │  any stage ──error──▶ Failed (attempt aborted, caller decides on retry)  │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, Span, debug, error, info, info_span};

use super::chain::{ChainClient, TrustedHeaderStore};
use super::client::{ClientObject, ClientState, ConsensusState, Height, UpdateStateMessage};
use super::existence::{ExistenceProofCodec, MerkleProof};
use super::prover::{ProverClient, ProverClientConfig};
use super::tree::SimpleTreeProof;
use crate::error::{RelayError, Result};

// Configuration

/// Trusting period used when none is configured (two weeks)
pub const DEFAULT_TRUSTING_PERIOD: Duration = Duration::from_secs(336 * 60 * 60);

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub prover: ProverClientConfig,
    /// Written into the initial client state
    pub trusting_period: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            prover: ProverClientConfig::default(),
            trusting_period: DEFAULT_TRUSTING_PERIOD,
        }
    }
}

// Stages

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStage {
    FetchTargetHeader,
    RequestProof,
    AwaitProof,
    BuildSimpleTreeProof,
    AssembleMessage,
    Done,
    Failed,
}

impl RelayStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayStage::FetchTargetHeader => "fetch_target_header",
            RelayStage::RequestProof => "request_proof",
            RelayStage::AwaitProof => "await_proof",
            RelayStage::BuildSimpleTreeProof => "build_simple_tree_proof",
            RelayStage::AssembleMessage => "assemble_message",
            RelayStage::Done => "done",
            RelayStage::Failed => "failed",
        }
    }
}

impl fmt::Display for RelayStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Pipeline

pub struct LightClientUpdatePipeline {
    config: PipelineConfig,
    chain: Arc<dyn ChainClient>,
    store: Option<Arc<dyn TrustedHeaderStore>>,
    prover: ProverClient,
    codec: ExistenceProofCodec,
    span: Span,
}

impl LightClientUpdatePipeline {
    pub fn new(config: PipelineConfig, chain: Arc<dyn ChainClient>) -> Result<Self> {
        let span = info_span!("tendermintzk.prover");
        let prover = ProverClient::new(config.prover.clone(), chain.clone())?.with_span(span.clone());
        Ok(Self {
            config,
            chain,
            store: None,
            prover,
            codec: ExistenceProofCodec::default(),
            span,
        })
    }

    pub fn with_store(mut self, store: Arc<dyn TrustedHeaderStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_codec(mut self, codec: ExistenceProofCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Record every log event of the pipeline and its prover under `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.prover = self.prover.with_span(span.clone());
        self.span = span;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn prover(&self) -> &ProverClient {
        &self.prover
    }

    /// Build the update message proving `target_height` from `trusted_height`
    pub async fn update(
        &self,
        trusted_height: u64,
        target_height: u64,
    ) -> Result<UpdateStateMessage> {
        if trusted_height >= target_height {
            return Err(RelayError::Validation(format!(
                "trusted height is greater than target height: trusted_height: {}, target_height: {}",
                trusted_height, target_height
            )));
        }

        let mut stage = RelayStage::FetchTargetHeader;
        let result = self
            .run_update(trusted_height, target_height, &mut stage)
            .instrument(self.span.clone())
            .await;

        let _enter = self.span.enter();
        match result {
            Ok(msg) => {
                debug!(trusted_height, target_height, stage = %RelayStage::Done, "relay attempt finished");
                Ok(msg)
            }
            Err(e) => {
                error!(
                    trusted_height,
                    target_height,
                    stage = %RelayStage::Failed,
                    failed_at = %stage,
                    error = %e,
                    "relay attempt failed"
                );
                Err(e)
            }
        }
    }

    async fn run_update(
        &self,
        trusted_height: u64,
        target_height: u64,
        stage: &mut RelayStage,
    ) -> Result<UpdateStateMessage> {
        let header = self.chain.header(target_height).await?;
        let block_hash = header.hash()?;

        *stage = RelayStage::RequestProof;
        let ticket = self.prover.request_proof(trusted_height, target_height);

        *stage = RelayStage::AwaitProof;
        let prover_config = self.prover.config();
        let proof = ticket
            .wait(prover_config.poll_interval, prover_config.proof_timeout)
            .await?;
        info!(trusted_height, target_height, "got proof");

        *stage = RelayStage::BuildSimpleTreeProof;
        let simple_tree_proof = SimpleTreeProof::build(&header)?;

        *stage = RelayStage::AssembleMessage;
        let msg = UpdateStateMessage {
            trusted_height,
            untrusted_height: target_height,
            untrusted_block_hash: block_hash.to_vec(),
            timestamp: header.timestamp_nanos(),
            app_hash: header.app_hash.clone(),
            simple_tree_proof: simple_tree_proof.to_vec(),
            input: proof.input_bytes(),
            zk_proof: proof.proof.encode_abi(),
        };
        info!(msg = %msg.to_json(), "created update state message");
        Ok(msg)
    }

    /// Update from the height the light client currently trusts
    pub async fn update_from_store(&self, target_height: u64) -> Result<UpdateStateMessage> {
        let store = self.store.as_ref().ok_or_else(|| {
            RelayError::Validation("no trusted header store configured".to_string())
        })?;
        let chain_id = self.chain.chain_id();
        let trusted_height = store.trusted_height(chain_id).await?.ok_or_else(|| {
            RelayError::Validation(format!("no trusted height for chain {}", chain_id))
        })?;
        self.update(trusted_height, target_height).await
    }

    /// Client and consensus state to create the counterparty light client at `height`
    pub async fn create_initial_state(&self, height: u64) -> Result<(ClientState, ConsensusState)> {
        let header = self.chain.header(height).await?;
        let prover = self.prover.config();

        let client_state = ClientState {
            step_verifier_digest: prover.step_verifier_digest.to_vec(),
            skip_verifier_digest: prover.skip_verifier_digest.to_vec(),
            trusting_period: u64::try_from(self.config.trusting_period.as_nanos()).map_err(|_| {
                RelayError::Validation("trusting period overflows u64 nanoseconds".to_string())
            })?,
            frozen: false,
            latest_height: Some(Height::new(header.height)),
        };
        let consensus_state = ConsensusState {
            block_hash: header.hash()?.to_vec(),
            app_hash: header.app_hash.clone(),
            timestamp: header.timestamp_nanos(),
        };
        client_state.validate_basic()?;
        consensus_state.validate_basic()?;

        let _enter = self.span.enter();
        info!(
            height = %Height::new(header.height),
            block_hash = %format!("0x{}", hex::encode(&consensus_state.block_hash)),
            app_hash = %format!("0x{}", hex::encode(&consensus_state.app_hash)),
            timestamp = consensus_state.timestamp,
            "created initial state"
        );
        Ok((client_state, consensus_state))
    }

    /// Existence proof of `value` at `path`, encoded for the verifier contract
    pub async fn prove_state(&self, height: u64, path: &str, value: &[u8]) -> Result<(Vec<u8>, Height)> {
        let header = self.chain.header(height).await?;
        let res = self.chain.query_with_proof(path, height).await?;
        if res.value != value {
            return Err(RelayError::Validation(format!(
                "value unmatch: {} != {}",
                hex::encode(&res.value),
                hex::encode(value)
            )));
        }

        let proof = MerkleProof::decode_bytes(&res.proof)?;
        let encoded = self.codec.convert(&header.app_hash, path, value, &proof)?;
        Ok((encoded, res.proof_height))
    }
}

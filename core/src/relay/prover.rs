//! ZK Prover Client
//!
//! Requests a proof that the chain moved from a trusted height to a target
//! height, either from the local reference derivation ("mock") or from a
//! remote gnark proving service.
//!
//! ## Flow
//!
//! ```text
//!   Pipeline ──request_proof──▶ spawned task ──GET /prove?trusted_height&target_height──▶ prover
//!      │                             │                                                     │
//!      │  ProofTicket (oneshot)      │◀──────────── {"input": [..3], "proof": b64} ───────┘
//!      │◀────────────────────────────┤  recompute reference inputs, reject any mismatch
//!      │
//!      └─ wait(interval, bound): value | closed ⇒ ProofUnavailable | bound ⇒ cancel + Timeout
//! ```
//!
//! ## Public inputs
//!
//! ```text
//!   input[0] = step digest                                  (target == trusted + 1)
//!            | skip digest                                  (otherwise)
//!   input[1] = sha256(be64(trusted) || trustedHash [|| be64(target)])  & 0x1f..
//!   input[2] = sha256(targetHash)                                      & 0x1f..
//! ```

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::U256;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tmzk_zkp::{
    DecodeError, NB_PUBLIC_INPUTS, ProverType, ZkProof, check_field_element, masked_field_element,
};
use tokio::sync::{Mutex, oneshot};
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

use super::chain::ChainClient;
use crate::error::{RelayError, Result};
use crate::header::Hash;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_PROOF_TIMEOUT: Duration = Duration::from_secs(600);

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct ProverClientConfig {
    pub prover_type: ProverType,
    /// Base URL of the proving service (unused by the mock prover)
    pub prover_addr: String,
    pub step_verifier_digest: Hash,
    pub skip_verifier_digest: Hash,
    /// How often a waiting caller logs progress
    pub poll_interval: Duration,
    /// Upper bound on one proof, also applied to the HTTP request
    pub proof_timeout: Duration,
}

impl ProverClientConfig {
    /// Digests become public input 0 and must be field elements; durations must be non-zero
    pub fn validate(&self) -> Result<()> {
        for (name, digest) in [
            ("step_verifier_digest", &self.step_verifier_digest),
            ("skip_verifier_digest", &self.skip_verifier_digest),
        ] {
            check_field_element(0, &U256::from_be_bytes(*digest)).map_err(|_| {
                RelayError::Validation(format!(
                    "{} 0x{} exceeds the scalar field",
                    name,
                    hex::encode(digest)
                ))
            })?;
        }
        if self.poll_interval.is_zero() {
            return Err(RelayError::Validation("poll_interval must be positive".into()));
        }
        if self.proof_timeout.is_zero() {
            return Err(RelayError::Validation("proof_timeout must be positive".into()));
        }
        Ok(())
    }
}

impl Default for ProverClientConfig {
    fn default() -> Self {
        Self {
            prover_type: ProverType::Mock,
            prover_addr: "http://127.0.0.1:3000".to_string(),
            step_verifier_digest: [0u8; 32],
            skip_verifier_digest: [0u8; 32],
            poll_interval: DEFAULT_POLL_INTERVAL,
            proof_timeout: DEFAULT_PROOF_TIMEOUT,
        }
    }
}

// ============================================================================
// Proof and inputs
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZkProofAndInput {
    pub input: [U256; NB_PUBLIC_INPUTS],
    pub proof: ZkProof,
}

impl ZkProofAndInput {
    /// Inputs as minimal big-endian bytes (zero is the empty string)
    pub fn input_bytes(&self) -> Vec<Vec<u8>> {
        self.input.iter().map(minimal_be_bytes).collect()
    }
}

fn minimal_be_bytes(value: &U256) -> Vec<u8> {
    let bytes = value.to_be_bytes::<32>();
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}

/// Public inputs a correct proof of `trusted_height -> target_height` must carry
pub fn reference_input(
    trusted_height: u64,
    trusted_block_hash: &Hash,
    target_height: u64,
    target_block_hash: &Hash,
    step_verifier_digest: &Hash,
    skip_verifier_digest: &Hash,
) -> [U256; NB_PUBLIC_INPUTS] {
    let input2 = masked_field_element(Sha256::digest(target_block_hash).into());

    let mut hasher = Sha256::new();
    hasher.update(trusted_height.to_be_bytes());
    hasher.update(trusted_block_hash);
    let (digest, input1) = if trusted_height.checked_add(1) == Some(target_height) {
        (step_verifier_digest, hasher.finalize())
    } else {
        hasher.update(target_height.to_be_bytes());
        (skip_verifier_digest, hasher.finalize())
    };

    [
        U256::from_be_bytes(*digest),
        masked_field_element(input1.into()),
        input2,
    ]
}

/// Body of a successful `/prove` response
#[derive(Debug, Deserialize)]
struct ProveResponse {
    /// 0x-prefixed big-endian hex
    input: [String; NB_PUBLIC_INPUTS],
    /// Base64 raw proof bytes
    proof: String,
}

fn parse_hex_input(index: usize, value: &str) -> std::result::Result<U256, DecodeError> {
    let raw = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(raw)
        .map_err(|e| DecodeError::Encoding(format!("input {}: {}", index, e)))?;
    let value = U256::try_from_be_slice(&bytes).ok_or(DecodeError::FieldOverflow { index })?;
    check_field_element(index, &value)?;
    Ok(value)
}

// ============================================================================
// Prover Client
// ============================================================================

#[derive(Clone)]
pub struct ProverClient {
    config: Arc<ProverClientConfig>,
    chain: Arc<dyn ChainClient>,
    http: reqwest::Client,
    /// The proving service runs one job at a time
    submit_lock: Arc<Mutex<()>>,
    span: Span,
}

impl ProverClient {
    pub fn new(config: ProverClientConfig, chain: Arc<dyn ChainClient>) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.proof_timeout)
            .build()?;
        Ok(Self {
            config: Arc::new(config),
            chain,
            http,
            submit_lock: Arc::new(Mutex::new(())),
            span: info_span!("tendermintzk.prover"),
        })
    }

    /// Replace the span all log events of this client are recorded under
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &ProverClientConfig {
        &self.config
    }

    /// Start proving in the background
    pub fn request_proof(&self, trusted_height: u64, target_height: u64) -> ProofTicket {
        let (tx, rx) = oneshot::channel();
        let cancel = CancellationToken::new();

        let client = self.clone();
        let token = cancel.clone();
        tokio::spawn(
            async move {
                tokio::select! {
                    _ = token.cancelled() => {
                        warn!(trusted_height, target_height, "proof request cancelled");
                    }
                    result = client.prove(trusted_height, target_height) => {
                        if let Err(e) = &result {
                            error!(trusted_height, target_height, error = %e, "failed to get proof");
                        }
                        // receiver may already be gone after a timeout
                        let _ = tx.send(result);
                    }
                }
            }
            .instrument(self.span.clone()),
        );

        ProofTicket {
            rx,
            cancel,
            trusted_height,
            target_height,
            span: self.span.clone(),
        }
    }

    /// Prove synchronously with the configured backend
    pub async fn prove(&self, trusted_height: u64, target_height: u64) -> Result<ZkProofAndInput> {
        if trusted_height >= target_height {
            return Err(RelayError::Validation(format!(
                "trustedHeight({}) should be less than targetHeight({})",
                trusted_height, target_height
            )));
        }

        match self.config.prover_type {
            ProverType::Mock => Ok(ZkProofAndInput {
                input: self.reference(trusted_height, target_height).await?,
                proof: ZkProof::Mock,
            }),
            ProverType::Groth16 | ProverType::Groth16Commitment => {
                self.prove_remote(trusted_height, target_height).await
            }
        }
    }

    async fn reference(
        &self,
        trusted_height: u64,
        target_height: u64,
    ) -> Result<[U256; NB_PUBLIC_INPUTS]> {
        let target_hash = self.chain.header(target_height).await?.hash()?;
        let trusted_hash = self.chain.header(trusted_height).await?.hash()?;
        Ok(reference_input(
            trusted_height,
            &trusted_hash,
            target_height,
            &target_hash,
            &self.config.step_verifier_digest,
            &self.config.skip_verifier_digest,
        ))
    }

    async fn prove_remote(&self, trusted_height: u64, target_height: u64) -> Result<ZkProofAndInput> {
        let (input, raw_proof) = {
            let _guard = self.submit_lock.lock().await;
            self.fetch_remote(trusted_height, target_height).await?
        };

        let expected = self.reference(trusted_height, target_height).await?;
        for (index, (expected, actual)) in expected.iter().zip(input.iter()).enumerate() {
            if expected != actual {
                return Err(RelayError::InputMismatch {
                    index,
                    expected: *expected,
                    actual: *actual,
                });
            }
        }
        let proof = ZkProof::parse(self.config.prover_type, &raw_proof)?;

        info!(trusted_height, target_height, prover_type = %self.config.prover_type, "got proof");
        Ok(ZkProofAndInput { input, proof })
    }

    async fn fetch_remote(
        &self,
        trusted_height: u64,
        target_height: u64,
    ) -> Result<([U256; NB_PUBLIC_INPUTS], Vec<u8>)> {
        let url = format!("{}/prove", self.config.prover_addr.trim_end_matches('/'));
        debug!(%url, trusted_height, target_height, "requesting proof");

        let response = self
            .http
            .get(&url)
            .query(&[("trusted_height", trusted_height), ("target_height", target_height)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Network(format!(
                "prover returned {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        let res: ProveResponse =
            serde_json::from_str(&body).map_err(|e| DecodeError::Json(e.to_string()))?;

        let mut input = [U256::ZERO; NB_PUBLIC_INPUTS];
        for (index, value) in res.input.iter().enumerate() {
            input[index] = parse_hex_input(index, value)?;
        }
        let proof = STANDARD
            .decode(res.proof.as_bytes())
            .map_err(|e| DecodeError::Encoding(format!("proof: {}", e)))?;

        Ok((input, proof))
    }
}

// ============================================================================
// Proof Ticket
// ============================================================================

/// Single-use handle on an in-flight proof request.
///
/// Dropping the ticket cancels the producing task.
pub struct ProofTicket {
    rx: oneshot::Receiver<Result<ZkProofAndInput>>,
    cancel: CancellationToken,
    trusted_height: u64,
    target_height: u64,
    span: Span,
}

impl ProofTicket {
    /// Wait for the proof, logging progress every `interval` and giving up after `bound`
    pub async fn wait(mut self, interval: Duration, bound: Duration) -> Result<ZkProofAndInput> {
        let span = self.span.clone();
        self.wait_inner(interval, bound).instrument(span).await
    }

    async fn wait_inner(&mut self, interval: Duration, bound: Duration) -> Result<ZkProofAndInput> {
        let (trusted_height, target_height) = (self.trusted_height, self.target_height);
        let deadline = Instant::now() + bound;
        // zero interval: wait out the bound silently
        let interval = if interval.is_zero() { bound } else { interval };

        loop {
            let next = (Instant::now() + interval).min(deadline);
            match timeout_at(next, &mut self.rx).await {
                Ok(Ok(result)) => return result,
                Ok(Err(_)) => {
                    return Err(RelayError::ProofUnavailable {
                        trusted_height,
                        target_height,
                    });
                }
                Err(_) if Instant::now() >= deadline => {
                    self.cancel.cancel();
                    return Err(RelayError::Timeout {
                        trusted_height,
                        target_height,
                    });
                }
                Err(_) => info!(trusted_height, target_height, "waiting for proving"),
            }
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        rx: oneshot::Receiver<Result<ZkProofAndInput>>,
        trusted_height: u64,
        target_height: u64,
    ) -> Self {
        Self {
            rx,
            cancel: CancellationToken::new(),
            trusted_height,
            target_height,
            span: Span::none(),
        }
    }
}

impl Drop for ProofTicket {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

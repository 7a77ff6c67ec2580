//! Relay scenarios against an in-process chain and prover.

mod remote_prover;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use dashmap::DashMap;

use super::chain::{ChainClient, StateQueryResponse};
use super::pipeline::{LightClientUpdatePipeline, PipelineConfig};
use super::prover::ProverClientConfig;
use crate::header::Header;
use crate::header::tests::sample_header;

// ============================================================================
// Test Helpers
// ============================================================================

pub(super) const STEP_DIGEST: [u8; 32] = [0x0a; 32];
pub(super) const SKIP_DIGEST: [u8; 32] = [0x0b; 32];

/// Chain serving `sample_header` up to `latest_height`
pub(super) struct MockChain {
    latest_height: u64,
    header_calls: AtomicUsize,
    queries: DashMap<String, StateQueryResponse>,
}

impl MockChain {
    pub(super) fn new(latest_height: u64) -> Arc<Self> {
        Arc::new(Self {
            latest_height,
            header_calls: AtomicUsize::new(0),
            queries: DashMap::new(),
        })
    }

    pub(super) fn header_calls(&self) -> usize {
        self.header_calls.load(Ordering::SeqCst)
    }

    pub(super) fn set_query(&self, path: &str, response: StateQueryResponse) {
        self.queries.insert(path.to_string(), response);
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn chain_id(&self) -> &str {
        "ibc0"
    }

    async fn header(&self, height: u64) -> Result<Header> {
        self.header_calls.fetch_add(1, Ordering::SeqCst);
        if height == 0 || height > self.latest_height {
            bail!("header at height {} not available", height);
        }
        Ok(sample_header(height))
    }

    async fn query_with_proof(&self, path: &str, _height: u64) -> Result<StateQueryResponse> {
        match self.queries.get(path) {
            Some(res) => Ok(res.clone()),
            None => bail!("no value at {}", path),
        }
    }
}

pub(super) fn prover_config() -> ProverClientConfig {
    ProverClientConfig {
        step_verifier_digest: STEP_DIGEST,
        skip_verifier_digest: SKIP_DIGEST,
        ..Default::default()
    }
}

pub(super) fn mock_pipeline(chain: &Arc<MockChain>) -> LightClientUpdatePipeline {
    let config = PipelineConfig {
        prover: prover_config(),
        ..Default::default()
    };
    LightClientUpdatePipeline::new(config, chain.clone()).unwrap()
}

//! Collaborators owned outside the relay core: the counterparty chain's RPC
//! and the store holding the latest trusted light-client height.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

use super::client::Height;
use crate::header::Header;

/// Result of an ABCI store query with proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateQueryResponse {
    pub value: Vec<u8>,
    /// Protobuf-encoded `MerkleProof` (app-state layer, then store layer)
    pub proof: Vec<u8>,
    pub proof_height: Height,
}

/// Read access to the chain whose headers are being proven
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> &str;

    async fn header(&self, height: u64) -> Result<Header>;

    /// Query `path` in the ibc store at `height`, returning the value and its membership proof
    async fn query_with_proof(&self, path: &str, height: u64) -> Result<StateQueryResponse>;
}

/// Trusted heights of light clients, keyed by chain id
#[async_trait]
pub trait TrustedHeaderStore: Send + Sync {
    async fn trusted_height(&self, chain_id: &str) -> Result<Option<u64>>;
}

/// Process-local store, useful for tests and embedding
#[derive(Debug, Default)]
pub struct InMemoryTrustedStore {
    heights: DashMap<String, u64>,
}

impl InMemoryTrustedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a height; lower heights than the current one are ignored
    pub fn set_trusted_height(&self, chain_id: &str, height: u64) {
        self.heights
            .entry(chain_id.to_string())
            .and_modify(|h| *h = (*h).max(height))
            .or_insert(height);
    }
}

#[async_trait]
impl TrustedHeaderStore for InMemoryTrustedStore {
    async fn trusted_height(&self, chain_id: &str) -> Result<Option<u64>> {
        Ok(self.heights.get(chain_id).map(|h| *h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store_keeps_highest() {
        let store = InMemoryTrustedStore::new();
        assert_eq!(store.trusted_height("ibc0").await.unwrap(), None);

        store.set_trusted_height("ibc0", 100);
        store.set_trusted_height("ibc0", 90);
        store.set_trusted_height("ibc1", 5);

        assert_eq!(store.trusted_height("ibc0").await.unwrap(), Some(100));
        assert_eq!(store.trusted_height("ibc1").await.unwrap(), Some(5));
    }
}

//! Tendermint ZK relay prover core
//!
//! Builds the light-client update payloads for a counterparty chain that
//! verifies Tendermint state transitions with a succinct proof instead of
//! validator signatures.
//!
//! ```text
//!   ChainClient ──header──▶ LightClientUpdatePipeline ──▶ UpdateStateMessage
//!                                 │          ▲
//!                      request_proof        ProofTicket
//!                                 ▼          │
//!                            ProverClient (mock | remote prover)
//! ```

pub mod config;
pub mod error;
pub mod header;
pub mod relay;

pub use error::{RelayError, Result};
pub use header::Header;

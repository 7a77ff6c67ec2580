//! Remote prover path against an in-process `/prove` endpoint.

use std::net::SocketAddr;
use std::time::Duration;

use alloy_primitives::U256;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::json;
use tmzk_zkp::{DecodeError, ProverType, ZkProof};
use tokio::net::TcpListener;

use super::{MockChain, SKIP_DIGEST, STEP_DIGEST, prover_config};
use crate::error::RelayError;
use crate::header::tests::sample_header;
use crate::relay::pipeline::{LightClientUpdatePipeline, PipelineConfig};
use crate::relay::prover::{ProverClient, ProverClientConfig, reference_input};

#[derive(Clone, Copy)]
enum Behavior {
    Honest,
    /// Flip the low bit of one input
    WrongInput(usize),
    OutOfField,
    Unavailable,
    /// Wrong input 1 alongside a proof too short to parse
    WrongInputShortProof,
    /// Commitment proof declaring this many commitments
    Commitment(u32),
}

#[derive(Deserialize)]
struct ProveQuery {
    trusted_height: u64,
    target_height: u64,
}

fn raw_groth16_proof() -> Vec<u8> {
    (0..256u32).map(|i| (i % 251) as u8).collect()
}

fn raw_commitment_proof(count: u32) -> Vec<u8> {
    let mut proof = raw_groth16_proof();
    proof.extend_from_slice(&count.to_be_bytes());
    proof.extend((0..64 * count + 64).map(|i| (i % 241) as u8));
    proof
}

fn hex_input(value: &U256) -> String {
    format!("0x{}", hex::encode(value.to_be_bytes::<32>()))
}

async fn prove(State(behavior): State<Behavior>, Query(q): Query<ProveQuery>) -> Response {
    let mut input = reference_input(
        q.trusted_height,
        &sample_header(q.trusted_height).hash().unwrap(),
        q.target_height,
        &sample_header(q.target_height).hash().unwrap(),
        &STEP_DIGEST,
        &SKIP_DIGEST,
    )
    .map(|v| hex_input(&v));

    let mut proof = raw_groth16_proof();
    match behavior {
        Behavior::Honest => {}
        Behavior::WrongInput(index) => {
            let mut value = U256::from_str_radix(&input[index][2..], 16).unwrap();
            value ^= U256::from(1u64);
            input[index] = hex_input(&value);
        }
        Behavior::OutOfField => input[1] = format!("0x{}", "ff".repeat(32)),
        Behavior::Unavailable => {
            return (StatusCode::SERVICE_UNAVAILABLE, "prover busy").into_response();
        }
        Behavior::WrongInputShortProof => {
            input[1] = hex_input(&U256::from(1u64));
            proof.truncate(100);
        }
        Behavior::Commitment(count) => proof = raw_commitment_proof(count),
    }

    Json(json!({
        "input": input,
        "proof": STANDARD.encode(proof),
    }))
    .into_response()
}

async fn spawn_prover(behavior: Behavior) -> String {
    let router = Router::new()
        .route("/prove", get(prove))
        .with_state(behavior);
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn remote_config(addr: String) -> ProverClientConfig {
    ProverClientConfig {
        prover_type: ProverType::Groth16,
        prover_addr: addr,
        ..prover_config()
    }
}

fn commitment_config(addr: String) -> ProverClientConfig {
    ProverClientConfig {
        prover_type: ProverType::Groth16Commitment,
        ..remote_config(addr)
    }
}

#[tokio::test]
async fn test_remote_proof_with_matching_inputs() {
    let addr = spawn_prover(Behavior::Honest).await;
    let chain = MockChain::new(200);
    let client = ProverClient::new(remote_config(addr), chain).unwrap();

    let proof = client.prove(100, 101).await.unwrap();
    assert_eq!(proof.input[0], U256::from_be_bytes(STEP_DIGEST));
    assert_eq!(
        proof.proof,
        ZkProof::parse(ProverType::Groth16, &raw_groth16_proof()).unwrap()
    );
    assert_eq!(proof.proof.encode_abi().len(), 256);
}

#[tokio::test]
async fn test_remote_input_mismatch() {
    for index in 0..3 {
        let addr = spawn_prover(Behavior::WrongInput(index)).await;
        let chain = MockChain::new(200);
        let client = ProverClient::new(remote_config(addr), chain).unwrap();

        let err = client.prove(100, 150).await.unwrap_err();
        match err {
            RelayError::InputMismatch {
                index: got,
                expected,
                actual,
            } => {
                assert_eq!(got, index);
                assert_eq!(expected ^ actual, U256::from(1u64));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[tokio::test]
async fn test_input_mismatch_reported_before_proof_decoding() {
    let addr = spawn_prover(Behavior::WrongInputShortProof).await;
    let client = ProverClient::new(remote_config(addr), MockChain::new(200)).unwrap();

    let err = client.prove(100, 101).await.unwrap_err();
    assert!(matches!(err, RelayError::InputMismatch { index: 1, .. }));
}

#[tokio::test]
async fn test_remote_commitment_proof() {
    let addr = spawn_prover(Behavior::Commitment(1)).await;
    let client = ProverClient::new(commitment_config(addr), MockChain::new(200)).unwrap();

    let proof = client.prove(100, 150).await.unwrap();
    assert_eq!(raw_commitment_proof(1).len(), 388);
    assert_eq!(
        proof.proof,
        ZkProof::parse(ProverType::Groth16Commitment, &raw_commitment_proof(1)).unwrap()
    );
    assert_eq!(proof.proof.encode_abi().len(), 384);
}

#[tokio::test]
async fn test_pipeline_with_remote_commitment_prover() {
    let addr = spawn_prover(Behavior::Commitment(1)).await;
    let config = PipelineConfig {
        prover: commitment_config(addr),
        ..Default::default()
    };
    let pipeline = LightClientUpdatePipeline::new(config, MockChain::new(200)).unwrap();

    let msg = pipeline.update(100, 101).await.unwrap();
    assert_eq!(msg.input[0], STEP_DIGEST.to_vec());
    assert_eq!(msg.zk_proof.len(), 384);
}

#[tokio::test]
async fn test_pipeline_rejects_extra_commitments() {
    let addr = spawn_prover(Behavior::Commitment(2)).await;
    let config = PipelineConfig {
        prover: commitment_config(addr),
        ..Default::default()
    };
    let pipeline = LightClientUpdatePipeline::new(config, MockChain::new(200)).unwrap();

    let err = pipeline.update(100, 101).await.unwrap_err();
    assert!(matches!(
        err,
        RelayError::Decode(DecodeError::CommitmentCount {
            expected: 1,
            actual: 2
        })
    ));
}

#[tokio::test]
async fn test_remote_input_outside_field() {
    let addr = spawn_prover(Behavior::OutOfField).await;
    let client = ProverClient::new(remote_config(addr), MockChain::new(200)).unwrap();

    let err = client.prove(100, 101).await.unwrap_err();
    assert!(matches!(
        err,
        RelayError::Decode(DecodeError::FieldOverflow { index: 1 })
    ));
}

#[tokio::test]
async fn test_remote_error_status() {
    let addr = spawn_prover(Behavior::Unavailable).await;
    let client = ProverClient::new(remote_config(addr), MockChain::new(200)).unwrap();

    let err = client.prove(100, 101).await.unwrap_err();
    match err {
        RelayError::Network(msg) => assert!(msg.contains("503")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_remote_unreachable() {
    // bind then drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = ProverClient::new(remote_config(addr), MockChain::new(200)).unwrap();
    assert!(matches!(
        client.prove(100, 101).await,
        Err(RelayError::Network(_))
    ));
}

#[tokio::test]
async fn test_pipeline_surfaces_remote_mismatch() {
    let addr = spawn_prover(Behavior::WrongInput(2)).await;
    let chain = MockChain::new(200);
    let config = PipelineConfig {
        prover: remote_config(addr),
        ..Default::default()
    };
    let pipeline = LightClientUpdatePipeline::new(config, chain).unwrap();

    let err = pipeline.update(100, 101).await.unwrap_err();
    assert!(matches!(err, RelayError::InputMismatch { index: 2, .. }));
}

#[tokio::test]
async fn test_pipeline_with_remote_prover() {
    let addr = spawn_prover(Behavior::Honest).await;
    let chain = MockChain::new(200);
    let config = PipelineConfig {
        prover: remote_config(addr),
        ..Default::default()
    };
    let pipeline = LightClientUpdatePipeline::new(config, chain).unwrap();

    let msg = pipeline.update(100, 150).await.unwrap();
    assert_eq!(msg.input[0], SKIP_DIGEST.to_vec());
    assert_eq!(msg.zk_proof.len(), 256);
}

#[tokio::test]
async fn test_concurrent_requests() {
    let addr = spawn_prover(Behavior::Honest).await;
    let client = ProverClient::new(remote_config(addr), MockChain::new(200)).unwrap();

    let tickets: Vec<_> = (0..4u64)
        .map(|i| client.request_proof(100 + i, 110 + i))
        .collect();
    for ticket in tickets {
        let proof = ticket
            .wait(Duration::from_secs(1), Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(proof.input[0], U256::from_be_bytes(SKIP_DIGEST));
    }
}

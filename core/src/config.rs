//! Bridges the TOML relayer configuration to the pipeline's runtime config.
//!
//! Loading, env overrides and the sample file live in `tmzk-config`; this
//! module only validates and converts.

use tmzk_config::{ProverTypeToml, RelayerConfig};
use tmzk_zkp::ProverType;

use crate::error::RelayError;
use crate::relay::pipeline::PipelineConfig;
use crate::relay::prover::ProverClientConfig;

pub fn prover_type(toml: ProverTypeToml) -> ProverType {
    match toml {
        ProverTypeToml::Mock => ProverType::Mock,
        ProverTypeToml::Groth16 => ProverType::Groth16,
        ProverTypeToml::Groth16Commitment => ProverType::Groth16Commitment,
    }
}

impl TryFrom<&RelayerConfig> for PipelineConfig {
    type Error = RelayError;

    fn try_from(config: &RelayerConfig) -> Result<Self, Self::Error> {
        config.validate()?;
        Ok(PipelineConfig {
            prover: ProverClientConfig {
                prover_type: prover_type(config.prover.prover_type),
                prover_addr: config.prover.zk_prover_addr.clone(),
                step_verifier_digest: config.step_verifier_digest()?,
                skip_verifier_digest: config.skip_verifier_digest()?,
                poll_interval: config.poll_interval(),
                proof_timeout: config.proof_timeout(),
            },
            trusting_period: config.trusting_period()?,
        })
    }
}

//! # faultline-types::config
//!
//! Declarative run configuration, loadable from a TOML file. CLI flags
//! override individual fields after loading.

use crate::fault::FaultType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Granularity at which the test generator batches CNF construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DtpgMode {
    /// One CNF per fan-out-free region.
    Ffr,
    /// One CNF per maximal fan-out-free cone, shared across its FFRs
    /// through activation variables.
    Mffc,
}

/// How sufficient assignments are extracted from a SAT model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractMode {
    /// Follow one sensitized path, recording side-input values.
    Simple,
    /// Build a disjunction over all sensitized paths and pick the
    /// cheapest cube.
    Multi,
}

/// Full run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AtpgConfig {
    /// Fault model to target.
    pub fault_type: FaultType,
    /// CNF batching granularity.
    pub dtpg_mode: DtpgMode,
    /// Sufficient-assignment extraction strategy.
    pub extract_mode: ExtractMode,
    /// Worker threads for parallel fault simulation. 0 = hardware
    /// concurrency.
    pub threads: usize,
    /// Seed for the random-pattern phase.
    pub seed: u64,
    /// Number of 64-pattern random rounds allowed to detect nothing
    /// before the random phase gives up. 0 disables the phase.
    pub rtpg_max_idle_rounds: usize,
    /// Run the SAT-based FFR-local fault dominance reduction before DTPG.
    pub ffr_reduction: bool,
    /// Drop newly detected faults by fault simulation after each
    /// generated pattern.
    pub drop_by_fsim: bool,
}

impl Default for AtpgConfig {
    fn default() -> Self {
        AtpgConfig {
            fault_type: FaultType::StuckAt,
            dtpg_mode: DtpgMode::Ffr,
            extract_mode: ExtractMode::Simple,
            threads: 0,
            seed: 1,
            rtpg_max_idle_rounds: 4,
            ffr_reduction: false,
            drop_by_fsim: true,
        }
    }
}

impl AtpgConfig {
    /// Parses a TOML configuration string.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

/// An error loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_partial_toml() {
        let cfg = AtpgConfig::from_toml(
            r#"
            fault_type = "transition_delay"
            dtpg_mode = "mffc"
            threads = 4
            "#,
        )
        .unwrap();
        assert_eq!(cfg.fault_type, FaultType::TransitionDelay);
        assert_eq!(cfg.dtpg_mode, DtpgMode::Mffc);
        assert_eq!(cfg.threads, 4);
        // defaults survive
        assert!(cfg.drop_by_fsim);
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(AtpgConfig::from_toml("no_such_field = 1").is_err());
    }
}

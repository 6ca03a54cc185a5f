//! # faultline-dtpg::errors
//!
//! Test-generation errors. Solver-level failures are surfaced per fault
//! as `Aborted` results, not through this type; what remains here is
//! infrastructure failure and programmer error.

use faultline_types::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DtpgError {
    #[error("SAT solver failure: {0}")]
    Solver(#[from] anyhow::Error),
    #[error("fault references node {0} outside the engine's cone")]
    FaultOutOfCone(NodeId),
}

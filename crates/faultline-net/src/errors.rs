//! # faultline-net::errors
//!
//! Structural netlist errors. All of these are fatal: an invalid netlist
//! aborts the run before any ATPG work starts.

use faultline_types::NodeId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetlistError {
    #[error("gate '{name}' of type {gate} has {found} fanins")]
    ArityMismatch {
        name: String,
        gate: &'static str,
        found: usize,
    },
    #[error("node id {0} referenced before definition")]
    UnknownNode(NodeId),
    #[error("DFF '{0}' has no input connection")]
    UnconnectedDff(String),
    #[error("node '{0}' drives nothing and is not an output")]
    DanglingNode(String),
    #[error("netlist has no primary or pseudo-primary output")]
    NoOutputs,
}

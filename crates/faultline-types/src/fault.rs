//! # faultline-types::fault
//!
//! The fault-model and fault-lifecycle enums shared by every crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which fault model a run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultType {
    /// A line permanently stuck at 0 or 1. Single time frame.
    StuckAt,
    /// A line that fails to transition between two consecutive clocks.
    /// Needs a two-vector pattern (launch + capture).
    TransitionDelay,
}

impl FaultType {
    /// True when patterns carry a previous-time-frame component.
    pub fn has_previous_state(self) -> bool {
        matches!(self, FaultType::TransitionDelay)
    }
}

/// Lifecycle state of one fault. Transitions out of `Undetected` are
/// terminal except that `Detected` may be reset explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultStatus {
    #[default]
    Undetected,
    Detected,
    Untestable,
    Aborted,
}

impl fmt::Display for FaultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FaultStatus::Undetected => "undetected",
            FaultStatus::Detected => "detected",
            FaultStatus::Untestable => "untestable",
            FaultStatus::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

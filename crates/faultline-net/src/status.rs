//! # faultline-net::status
//!
//! The fault status registry: a dense array of `FaultStatus` keyed by
//! fault id. Transitions out of `Undetected` are one-way; `Detected` can
//! only be undone through the explicit `reset_detected` entry point.

use faultline_types::{FaultId, FaultStatus};
use tracing::warn;

/// Status registry for every fault of a `FaultModel`.
#[derive(Debug, Clone)]
pub struct FaultStatusMgr {
    status: Vec<FaultStatus>,
}

impl FaultStatusMgr {
    pub fn new(fault_num: usize) -> Self {
        FaultStatusMgr {
            status: vec![FaultStatus::Undetected; fault_num],
        }
    }

    pub fn fault_num(&self) -> usize {
        self.status.len()
    }

    pub fn get(&self, fault: FaultId) -> FaultStatus {
        self.status[fault as usize]
    }

    /// Applies a transition. Moves from a terminal state are ignored with
    /// a warning; setting the current state again is a no-op.
    pub fn set(&mut self, fault: FaultId, status: FaultStatus) {
        let cur = &mut self.status[fault as usize];
        if *cur == status {
            return;
        }
        if *cur != FaultStatus::Undetected {
            warn!(fault, from = %*cur, to = %status, "ignoring status transition out of a terminal state");
            return;
        }
        *cur = status;
    }

    /// Explicitly reverts a detected fault to undetected.
    pub fn reset_detected(&mut self, fault: FaultId) {
        let cur = &mut self.status[fault as usize];
        if *cur == FaultStatus::Detected {
            *cur = FaultStatus::Undetected;
        }
    }

    /// Number of faults currently in `status`.
    pub fn count(&self, status: FaultStatus) -> usize {
        self.status.iter().filter(|&&s| s == status).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FaultId, FaultStatus)> + '_ {
        self.status
            .iter()
            .enumerate()
            .map(|(i, &s)| (i as FaultId, s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_monotonic() {
        let mut mgr = FaultStatusMgr::new(2);
        mgr.set(0, FaultStatus::Untestable);
        // a later attempt to mark it detected is ignored
        mgr.set(0, FaultStatus::Detected);
        assert_eq!(mgr.get(0), FaultStatus::Untestable);
    }

    #[test]
    fn detected_is_reversible_only_via_reset() {
        let mut mgr = FaultStatusMgr::new(1);
        mgr.set(0, FaultStatus::Detected);
        mgr.set(0, FaultStatus::Undetected);
        assert_eq!(mgr.get(0), FaultStatus::Detected);
        mgr.reset_detected(0);
        assert_eq!(mgr.get(0), FaultStatus::Undetected);
    }

    #[test]
    fn counts() {
        let mut mgr = FaultStatusMgr::new(3);
        mgr.set(1, FaultStatus::Detected);
        assert_eq!(mgr.count(FaultStatus::Undetected), 2);
        assert_eq!(mgr.count(FaultStatus::Detected), 1);
    }
}

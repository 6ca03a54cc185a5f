//! # faultline-fsim::fault
//!
//! Simulation-side fault objects. The excitation and previous-time
//! conditions come precomputed from the fault model; here they are only
//! evaluated against the packed value planes. The per-fault skip flag and
//! observability mask live with the engines, not here, so the fault table
//! itself can be shared read-only across worker threads.

use faultline_net::FaultModel;
use faultline_types::{PackedVal, PackedVal3, FaultId, PV_ALL1};

/// One fault as seen by the simulator.
#[derive(Debug, Clone)]
pub struct SimFault {
    pub id: FaultId,
    /// Node at which the fault effect starts propagating.
    pub origin: u32,
    /// Current-time (node, value) conditions that excite the fault.
    ex_cond: Vec<(u32, bool)>,
    /// Previous-time conditions (transition-delay mode only).
    prev_cond: Vec<(u32, bool)>,
}

impl SimFault {
    /// Builds the simulation fault table from a fault model.
    pub fn build_table(fm: &FaultModel) -> Vec<SimFault> {
        fm.fault_list()
            .iter()
            .map(|f| SimFault {
                id: f.id,
                origin: f.origin,
                ex_cond: f
                    .excitation_condition()
                    .iter()
                    .map(|a| (a.node, a.val))
                    .collect(),
                prev_cond: f
                    .previous_condition()
                    .iter()
                    .map(|a| (a.node, a.val))
                    .collect(),
            })
            .collect()
    }

    /// Pattern slots in which the current values activate the fault.
    pub fn excitation(&self, vals: &[PackedVal3]) -> PackedVal {
        let mut cond = PV_ALL1;
        for &(node, val) in &self.ex_cond {
            let v = vals[node as usize];
            cond &= if val { v.val1() } else { v.val0() };
        }
        cond
    }

    /// Pattern slots in which the previous-time values satisfy the launch
    /// condition. All ones when there is none (stuck-at mode).
    pub fn previous(&self, prevs: &[PackedVal3]) -> PackedVal {
        let mut cond = PV_ALL1;
        for &(node, val) in &self.prev_cond {
            let v = prevs[node as usize];
            cond &= if val { v.val1() } else { v.val0() };
        }
        cond
    }
}

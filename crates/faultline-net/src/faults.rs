//! # faultline-net::faults
//!
//! Representative fault enumeration and per-fault condition caches.
//!
//! One fault is created per line and stuck value: a stem fault on the
//! output of every PPI and logic node, and a branch fault on a gate input
//! whenever the driving node branches (fanout > 1). A branch on a
//! fanout-free line is equivalent to the driver's stem fault and is not
//! enumerated separately.
//!
//! Each fault precomputes its excitation condition (the assignments that
//! make the faulty line differ inside its gate), the previous-time-frame
//! condition for transition-delay faults, and the cached FFR propagation
//! condition: the non-controlling side-input assignments of every gate on
//! the single-fanout chain from the origin to the FFR root.

use crate::netlist::{FfrId, MffcId, Netlist};
use faultline_types::{AssignList, FaultId, FaultType, NodeId};

/// One representative stuck-at or transition-delay fault.
#[derive(Debug, Clone)]
pub struct Fault {
    pub id: FaultId,
    /// The node at which the fault effect starts propagating: the faulty
    /// node itself for stem faults, the gate whose input is faulty for
    /// branch faults.
    pub origin: NodeId,
    /// `Some(ipos)` when the fault sits on input `ipos` of `origin`.
    pub branch: Option<u32>,
    /// The stuck value (for transition-delay: the value the line fails to
    /// leave).
    pub val: bool,
    excitation: AssignList,
    prev_cond: AssignList,
    ffr_cond: AssignList,
}

impl Fault {
    pub fn is_branch(&self) -> bool {
        self.branch.is_some()
    }

    /// Current-time assignments that activate the fault.
    pub fn excitation_condition(&self) -> &AssignList {
        &self.excitation
    }

    /// Previous-time assignments (transition-delay only; empty otherwise).
    pub fn previous_condition(&self) -> &AssignList {
        &self.prev_cond
    }

    /// Excitation plus the side-input assignments that carry the effect
    /// from the origin to the FFR root.
    pub fn ffr_propagate_condition(&self) -> &AssignList {
        &self.ffr_cond
    }

    /// The node driving the faulty line.
    pub fn driver(&self, net: &Netlist) -> NodeId {
        match self.branch {
            Some(ipos) => net.node(self.origin).fanins[ipos as usize],
            None => self.origin,
        }
    }
}

/// All representative faults of one netlist, grouped by FFR and MFFC.
#[derive(Debug)]
pub struct FaultModel {
    fault_type: FaultType,
    faults: Vec<Fault>,
    ffr_faults: Vec<Vec<FaultId>>,
    mffc_faults: Vec<Vec<FaultId>>,
}

impl FaultModel {
    pub fn new(net: &Netlist, fault_type: FaultType) -> Self {
        let mut faults: Vec<Fault> = Vec::new();
        let mut ffr_faults = vec![Vec::new(); net.ffr_list().len()];

        let mut add = |origin: NodeId, branch: Option<u32>, val: bool, net: &Netlist| {
            let id = faults.len() as FaultId;
            let driver = match branch {
                Some(ipos) => net.node(origin).fanins[ipos as usize],
                None => origin,
            };

            let mut excitation = AssignList::new();
            excitation.add(driver, 1, !val);
            if branch.is_some() {
                // the gate output must differ, so the other inputs hold
                // their non-controlling value
                let gate = net.node(origin).gate_type().expect("branch on a gate");
                if let Some(sv) = gate.side_val() {
                    for &inode in &net.node(origin).fanins {
                        if inode != driver {
                            excitation.add(inode, 1, sv);
                        }
                    }
                }
            }

            let mut prev_cond = AssignList::new();
            if fault_type.has_previous_state() {
                prev_cond.add(driver, 0, val);
            }

            let mut ffr_cond = excitation.clone();
            ffr_cond.merge(&prev_cond);
            let mut node = origin;
            while !net.node(node).is_ffr_root() {
                let onode = net.node(node).fanouts[0];
                let gate = net.node(onode).gate_type().expect("fanout is not a gate");
                if let Some(sv) = gate.side_val() {
                    for &inode in &net.node(onode).fanins {
                        if inode != node {
                            ffr_cond.add(inode, 1, sv);
                        }
                    }
                }
                node = onode;
            }

            let fault = Fault {
                id,
                origin,
                branch,
                val,
                excitation,
                prev_cond,
                ffr_cond,
            };
            ffr_faults[net.ffr_of(origin) as usize].push(id);
            faults.push(fault);
        };

        for node in net.nodes() {
            // stem faults on every line that drives something
            if node.is_ppi() || node.is_logic() {
                for val in [false, true] {
                    add(node.id, None, val, net);
                }
            }
            // branch faults where the driver forks
            for (ipos, &f) in node.fanins.iter().enumerate() {
                if net.node(f).fanout_num() > 1 {
                    for val in [false, true] {
                        add(node.id, Some(ipos as u32), val, net);
                    }
                }
            }
        }

        let mffc_faults = net
            .mffc_list()
            .iter()
            .map(|mffc| {
                mffc.ffrs
                    .iter()
                    .flat_map(|&fid| ffr_faults[fid as usize].iter().copied())
                    .collect()
            })
            .collect();

        FaultModel {
            fault_type,
            faults,
            ffr_faults,
            mffc_faults,
        }
    }

    pub fn fault_type(&self) -> FaultType {
        self.fault_type
    }

    pub fn fault_num(&self) -> usize {
        self.faults.len()
    }

    pub fn fault(&self, id: FaultId) -> &Fault {
        &self.faults[id as usize]
    }

    pub fn fault_list(&self) -> &[Fault] {
        &self.faults
    }

    pub fn faults_in_ffr(&self, ffr: FfrId) -> &[FaultId] {
        &self.ffr_faults[ffr as usize]
    }

    pub fn faults_in_mffc(&self, mffc: MffcId) -> &[FaultId] {
        &self.mffc_faults[mffc as usize]
    }

    /// Human-readable fault name, e.g. `a0/1:sa0` or `q:str`.
    pub fn fault_name(&self, net: &Netlist, id: FaultId) -> String {
        let f = self.fault(id);
        let node = net.node(f.origin);
        let line = match f.branch {
            Some(ipos) => format!("{}/{}", node.name, ipos),
            None => node.name.clone(),
        };
        let kind = match (self.fault_type, f.val) {
            (FaultType::StuckAt, false) => "sa0",
            (FaultType::StuckAt, true) => "sa1",
            (FaultType::TransitionDelay, false) => "str",
            (FaultType::TransitionDelay, true) => "stf",
        };
        format!("{}:{}", line, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::NetlistBuilder;
    use crate::gate::GateType;
    use faultline_types::Assign;

    /// y = a NAND b, with a also feeding an inverter output.
    fn branchy() -> Netlist {
        let mut b = NetlistBuilder::new();
        let a = b.add_input("a");
        let bb = b.add_input("b");
        let g = b.add_gate("g", GateType::Nand, &[a, bb]).unwrap();
        let inv = b.add_gate("inv", GateType::Not, &[a]).unwrap();
        b.add_output("y", g).unwrap();
        b.add_output("z", inv).unwrap();
        b.finish().unwrap()
    }

    #[test]
    fn stem_and_branch_enumeration() {
        let net = branchy();
        let fm = FaultModel::new(&net, FaultType::StuckAt);
        // stems: a, b, g, inv (2 each) = 8
        // branches: a->g and a->inv (a has fanout 2), 2 each = 4;
        // b->g is fanout-free, collapsed into b's stem
        assert_eq!(fm.fault_num(), 12);
    }

    #[test]
    fn branch_excitation_includes_side_inputs() {
        let net = branchy();
        let fm = FaultModel::new(&net, FaultType::StuckAt);
        // find the sa0 branch fault on g input 0 (driver a)
        let f = fm
            .fault_list()
            .iter()
            .find(|f| f.branch == Some(0) && !f.val && net.node(f.origin).name == "g")
            .unwrap();
        let cond: Vec<Assign> = f.excitation_condition().iter().collect();
        // driver a = 1 (complement of stuck 0), side input b at
        // non-controlling 1
        assert!(cond.contains(&Assign::new(0, 1, true)));
        assert!(cond.contains(&Assign::new(1, 1, true)));
    }

    #[test]
    fn transition_delay_adds_previous_condition() {
        let net = branchy();
        let fm = FaultModel::new(&net, FaultType::TransitionDelay);
        let f = fm
            .fault_list()
            .iter()
            .find(|f| f.branch.is_none() && f.val && net.node(f.origin).name == "a")
            .unwrap();
        let prev: Vec<Assign> = f.previous_condition().iter().collect();
        assert_eq!(prev, vec![Assign::new(0, 0, true)]);
        let exc: Vec<Assign> = f.excitation_condition().iter().collect();
        assert_eq!(exc, vec![Assign::new(0, 1, false)]);
    }

    #[test]
    fn ffr_condition_collects_chain_side_inputs() {
        // a chain: w = (a & b) | c, fault on a's stem
        let mut b = NetlistBuilder::new();
        let a = b.add_input("a");
        let bb = b.add_input("b");
        let c = b.add_input("c");
        let g1 = b.add_gate("g1", GateType::And, &[a, bb]).unwrap();
        let g2 = b.add_gate("g2", GateType::Or, &[g1, c]).unwrap();
        b.add_output("w", g2).unwrap();
        let net = b.finish().unwrap();
        let fm = FaultModel::new(&net, FaultType::StuckAt);

        let f = fm
            .fault_list()
            .iter()
            .find(|f| f.origin == a && !f.val)
            .unwrap();
        let cond: Vec<Assign> = f.ffr_propagate_condition().iter().collect();
        // a=1 to excite, b=1 through the AND, c=0 through the OR
        assert!(cond.contains(&Assign::new(a, 1, true)));
        assert!(cond.contains(&Assign::new(bb, 1, true)));
        assert!(cond.contains(&Assign::new(c, 1, false)));
    }
}

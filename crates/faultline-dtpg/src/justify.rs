//! # faultline-dtpg::justify
//!
//! Back-tracing from a sufficient assignment to primary inputs. Guided
//! by the SAT model, the justifier walks each required line toward the
//! inputs: when a gate's output is at its controlled value one
//! controlling fanin suffices, otherwise every fanin is required. PPIs
//! reached on the way are recorded into the test vector; everything
//! else stays X.

use crate::sat::SatModel;
use crate::varmap::VarMap;
use faultline_net::{GateType, Netlist, NodeKind};
use faultline_types::{AssignList, FaultType, NodeId, TestVector, Val3};
use fxhash::FxHashSet;

pub struct Justifier<'a> {
    net: &'a Netlist,
    fault_type: FaultType,
    hvar: &'a VarMap,
    gvar: &'a VarMap,
    model: &'a SatModel,
}

impl<'a> Justifier<'a> {
    pub fn new(
        net: &'a Netlist,
        fault_type: FaultType,
        hvar: &'a VarMap,
        gvar: &'a VarMap,
        model: &'a SatModel,
    ) -> Self {
        Justifier {
            net,
            fault_type,
            hvar,
            gvar,
            model,
        }
    }

    /// Derives a test vector whose care bits imply the given assignment.
    pub fn justify(&self, assigns: &AssignList) -> TestVector {
        let mut tv = TestVector::new(
            self.net.input_num(),
            self.net.dff_num(),
            self.fault_type,
        );
        let mut visited: FxHashSet<(NodeId, u8)> = FxHashSet::default();
        for a in assigns.iter() {
            self.justify_node(a.node, a.time, &mut tv, &mut visited);
        }
        tv
    }

    fn justify_node(
        &self,
        node: NodeId,
        time: u8,
        tv: &mut TestVector,
        visited: &mut FxHashSet<(NodeId, u8)>,
    ) {
        if !visited.insert((node, time)) {
            return;
        }
        let n = self.net.node(node);

        match n.kind {
            NodeKind::PrimaryInput { input_id } => {
                let Some(val) = self.val(node, time) else {
                    return;
                };
                match (self.fault_type, time) {
                    (FaultType::StuckAt, _) => tv.set_ppi_val(input_id as usize, val),
                    (FaultType::TransitionDelay, 0) => {
                        tv.set_ppi_val(input_id as usize, val)
                    }
                    (FaultType::TransitionDelay, _) => {
                        tv.set_aux_val(input_id as usize, val)
                    }
                }
                return;
            }
            NodeKind::DffOutput { dff_id } => {
                match (self.fault_type, time) {
                    // combinational time frame: the state is a free PPI
                    (FaultType::StuckAt, _) | (FaultType::TransitionDelay, 0) => {
                        if let Some(val) = self.val(node, time) {
                            tv.set_ppi_val(self.net.input_num() + dff_id as usize, val);
                        }
                    }
                    // current-time state comes from the previous frame
                    (FaultType::TransitionDelay, _) => {
                        let inode = self.net.dff_input(dff_id);
                        self.justify_node(inode, 0, tv, visited);
                    }
                }
                return;
            }
            _ => {}
        }

        let Some(oval) = self.val(node, time) else {
            return;
        };
        let gate = n.gate_type().expect("logic or output node");
        match gate {
            GateType::Buf | GateType::Not => {
                self.justify_node(n.fanins[0], time, tv, visited);
            }
            GateType::And | GateType::Nand | GateType::Or | GateType::Nor => {
                let cval = gate.cval().unwrap();
                // output at the controlled value: one controlling fanin
                // suffices, which keeps the specified-PPI count low
                let controlled_output = Val3::from(cval ^ gate.inverted());
                if oval == controlled_output {
                    if let Some(&pick) = n
                        .fanins
                        .iter()
                        .find(|&&i| self.val(i, time) == Some(Val3::from(cval)))
                    {
                        self.justify_node(pick, time, tv, visited);
                        return;
                    }
                }
                for &inode in &n.fanins {
                    self.justify_node(inode, time, tv, visited);
                }
            }
            GateType::Xor | GateType::Xnor => {
                for &inode in &n.fanins {
                    self.justify_node(inode, time, tv, visited);
                }
            }
        }
    }

    /// Model value of a node at a time frame, as a definite `Val3`.
    fn val(&self, node: NodeId, time: u8) -> Option<Val3> {
        let map = if time == 0 { self.hvar } else { self.gvar };
        let lit = map.try_get(node)?;
        self.model.value(lit).map(Val3::from)
    }
}

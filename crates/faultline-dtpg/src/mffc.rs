//! # faultline-dtpg::mffc
//!
//! CNF sharing across all faults of one MFFC. On top of the base miter
//! rooted at the MFFC root, every constituent FFR root gets an
//! activation variable and an injection XOR between its faulty-circuit
//! gate output and its faulty variable. Selecting exactly one activation
//! literal at solve time picks which FFR's fault is live, so one CNF
//! serves the whole cone.

use crate::enc::GateEnc;
use crate::engine::{DtpgEngine, DtpgResult};
use crate::errors::DtpgError;
use crate::sat::SatStats;
use faultline_net::{Fault, FaultModel, Mffc, Netlist};
use faultline_types::config::ExtractMode;
use faultline_types::NodeId;
use fxhash::FxHashMap;
use rustsat::types::Lit;
use tracing::debug;

/// Test generator covering every FFR of one MFFC with a shared CNF.
pub struct MffcEngine<'a> {
    base: DtpgEngine<'a>,
    /// FFR root nodes of the MFFC.
    root_array: Vec<NodeId>,
    /// Activation literal per FFR.
    evar_array: Vec<Lit>,
    /// FFR root node -> position in `root_array`.
    ffr_pos: FxHashMap<NodeId, usize>,
}

impl<'a> MffcEngine<'a> {
    pub fn new(net: &'a Netlist, fm: &FaultModel, mffc: &Mffc, extract_mode: ExtractMode) -> Self {
        let base = DtpgEngine::new(net, fm.fault_type(), mffc.root, extract_mode);
        let root_array: Vec<NodeId> = mffc
            .ffrs
            .iter()
            .map(|&fid| net.ffr(fid).root)
            .collect();
        let ffr_pos = root_array
            .iter()
            .enumerate()
            .map(|(i, &r)| (r, i))
            .collect();
        MffcEngine {
            base,
            root_array,
            evar_array: Vec::new(),
            ffr_pos,
        }
    }

    pub fn solver_stats(&self) -> SatStats {
        self.base.solver_stats()
    }

    /// Builds the shared miter plus the activation circuitry.
    pub fn make_cnf(&mut self) {
        self.base.make_cnf();
        self.inject_activation();
    }

    /// Solves one fault of the MFFC: its FFR's activation literal is
    /// assumed true, every other one false.
    pub fn solve_fault(&mut self, fault: &Fault) -> Result<DtpgResult, DtpgError> {
        let ffr_root = self.base.net.node(fault.origin).ffr_root;
        let pos = *self
            .ffr_pos
            .get(&ffr_root)
            .ok_or(DtpgError::FaultOutOfCone(fault.origin))?;
        let assumptions: Vec<Lit> = self
            .evar_array
            .iter()
            .enumerate()
            .map(|(i, &e)| if i == pos { e } else { !e })
            .collect();
        self.base.solve_fault(fault, &assumptions)
    }

    /// Ports the faulty circuit between the inner FFR roots and the MFFC
    /// root into dedicated faulty variables, with an XOR injection point
    /// at each FFR root.
    fn inject_activation(&mut self) {
        for _ in 0..self.root_array.len() {
            let evar = self.base.solver.new_variable();
            self.evar_array.push(evar);
        }

        // nodes strictly between an inner FFR root and the MFFC root get
        // their own faulty variable
        let mut node_list: Vec<NodeId> = Vec::new();
        let mut seed = self.root_array.clone();
        let mut rpos = 0;
        while rpos < seed.len() {
            let node = seed[rpos];
            rpos += 1;
            if node == self.base.root {
                continue;
            }
            for &onode in &self.base.net.node(node).fanouts {
                if self.base.fvar.get(onode) == self.base.gvar.get(onode) {
                    let var = self.base.solver.new_variable();
                    self.base.fvar.set(onode, var);
                    node_list.push(onode);
                    seed.push(onode);
                }
            }
        }
        node_list.push(self.base.root);

        // the most input-side FFR roots take the XOR of the good value
        // and their activation variable as faulty value
        for i in 0..self.root_array.len() {
            let node = self.root_array[i];
            if self.base.fvar.get(node) != self.base.gvar.get(node) {
                continue;
            }
            let fvar = self.base.solver.new_variable();
            self.base.fvar.set(node, fvar);
            let glit = self.base.gvar.get(node);
            self.inject_fault(i, glit);
        }

        // re-encode the faulty gates; FFR roots go through an injection
        // XOR between their gate output and their faulty variable
        for &node in &node_list {
            let n = self.base.net.node(node);
            if let Some(&pos) = self.ffr_pos.get(&node) {
                let ovar = self.base.solver.new_variable();
                self.inject_fault(pos, ovar);
                GateEnc::new(&mut self.base.solver, &self.base.fvar)
                    .make_cnf_with_output(n, ovar);
            } else {
                GateEnc::new(&mut self.base.solver, &self.base.fvar).make_cnf(n);
            }
        }

        debug!(
            ffrs = self.root_array.len(),
            shared_nodes = node_list.len(),
            "activation CNF injected"
        );
    }

    /// `fvar(root_array[pos]) ⇔ olit XOR evar(pos)`
    fn inject_fault(&mut self, pos: usize, olit: Lit) {
        let elit = self.evar_array[pos];
        let flit = self.base.fvar.get(self.root_array[pos]);
        self.base.solver.add_xor_gate(olit, elit, flit);
    }
}

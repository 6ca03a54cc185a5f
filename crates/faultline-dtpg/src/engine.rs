//! # faultline-dtpg::engine
//!
//! The per-cone test generation engine. One engine is built per FFR (or
//! per MFFC through `MffcEngine`), its CNF is constructed once, and each
//! fault of the region is then solved under its own assumption set.
//!
//! Variable families: `gvar` for the good circuit at the current time,
//! `fvar` for the faulty circuit over the fault root's fanout cone,
//! `dvar` for their per-node difference, and `hvar` for the previous
//! time frame in transition-delay mode. The D-chain clauses force any
//! difference to propagate forward to some PPO, with a dominator
//! shortcut clause pruning the search.

use crate::enc::GateEnc;
use crate::errors::DtpgError;
use crate::extract::{pick_cube, Extractor};
use crate::justify::Justifier;
use crate::sat::{SatEngine, SatModel, SatResult};
use crate::varmap::VarMap;
use faultline_net::{Fault, Netlist};
use faultline_types::config::ExtractMode;
use faultline_types::{Assign, FaultType, NodeId, TestVector};
use rustsat::types::Lit;
use tracing::debug;

const TFO: u8 = 1;
const TFI: u8 = 2;
const TFI2: u8 = 4;

/// Outcome of one DTPG invocation for one fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DtpgResult {
    Detected(TestVector),
    Untestable,
    Aborted,
}

/// CNF-based test generator rooted at one node.
pub struct DtpgEngine<'a> {
    pub(crate) net: &'a Netlist,
    pub(crate) fault_type: FaultType,
    pub(crate) root: NodeId,
    extract_mode: ExtractMode,
    pub(crate) solver: SatEngine,
    mark: Vec<u8>,
    pub(crate) tfo_list: Vec<NodeId>,
    tfi_list: Vec<NodeId>,
    tfi2_list: Vec<NodeId>,
    /// DFFs whose output lies inside the cone (transition-delay only).
    dff_list: Vec<u32>,
    output_list: Vec<NodeId>,
    pub(crate) hvar: VarMap,
    pub(crate) gvar: VarMap,
    pub(crate) fvar: VarMap,
    pub(crate) dvar: VarMap,
}

impl<'a> DtpgEngine<'a> {
    pub fn new(
        net: &'a Netlist,
        fault_type: FaultType,
        root: NodeId,
        extract_mode: ExtractMode,
    ) -> Self {
        let n = net.node_num();
        DtpgEngine {
            net,
            fault_type,
            root,
            extract_mode,
            solver: SatEngine::new(),
            mark: vec![0; n],
            tfo_list: Vec::new(),
            tfi_list: Vec::new(),
            tfi2_list: Vec::new(),
            dff_list: Vec::new(),
            output_list: Vec::new(),
            hvar: VarMap::new(n),
            gvar: VarMap::new(n),
            fvar: VarMap::new(n),
            dvar: VarMap::new(n),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn solver_stats(&self) -> crate::sat::SatStats {
        self.solver.stats()
    }

    /// Builds the miter CNF: variable assignment, good circuit, faulty
    /// circuit with D-chains, and the detection requirement.
    pub fn make_cnf(&mut self) {
        self.prepare_vars();
        self.gen_good_cnf();
        self.gen_faulty_cnf();

        // the fault effect must reach some PPO of the cone
        let odiff: Vec<Lit> = self
            .output_list
            .iter()
            .map(|&o| self.dvar.get(o))
            .collect();
        self.solver.add_clause(&odiff);

        if !self.net.node(self.root).is_ppo() {
            // and must be visible at the root itself
            let dlit = self.dvar.get(self.root);
            self.solver.add_clause(&[dlit]);
        }

        debug!(
            root = self.root,
            tfo = self.tfo_list.len(),
            tfi = self.tfi_list.len(),
            tfi2 = self.tfi2_list.len(),
            "miter CNF built"
        );
    }

    /// Solves one fault of this cone. `extra_assumptions` carries the
    /// activation literals of the MFFC variant.
    pub fn solve_fault(
        &mut self,
        fault: &Fault,
        extra_assumptions: &[Lit],
    ) -> Result<DtpgResult, DtpgError> {
        let mut assumptions = extra_assumptions.to_vec();
        for a in fault.ffr_propagate_condition().iter() {
            assumptions.push(self.conv_to_literal(a)?);
        }

        match self.solver.solve(&assumptions)? {
            SatResult::Sat(model) => Ok(DtpgResult::Detected(self.backtrace(fault, &model))),
            SatResult::Unsat => Ok(DtpgResult::Untestable),
            SatResult::Unknown => Ok(DtpgResult::Aborted),
        }
    }

    /// Extracts a sufficient assignment from the model and justifies it
    /// back to a primary-input test vector.
    fn backtrace(&self, fault: &Fault, model: &SatModel) -> TestVector {
        let start = self.net.node(fault.origin).ffr_root;
        let extractor = Extractor::new(self.net, &self.gvar, &self.fvar, model);
        let mut suf_cond = match self.extract_mode {
            ExtractMode::Simple => extractor.sufficient_condition(start),
            ExtractMode::Multi => pick_cube(&extractor.sufficient_conditions(start)),
        };
        suf_cond.merge(fault.ffr_propagate_condition());

        Justifier::new(self.net, self.fault_type, &self.hvar, &self.gvar, model)
            .justify(&suf_cond)
    }

    /// Maps a (node, time, value) assignment to its literal.
    pub(crate) fn conv_to_literal(&self, a: Assign) -> Result<Lit, DtpgError> {
        let map = if a.time == 0 { &self.hvar } else { &self.gvar };
        let lit = map
            .try_get(a.node)
            .ok_or(DtpgError::FaultOutOfCone(a.node))?;
        Ok(if a.val { lit } else { !lit })
    }

    // ---- cone marking and variable allocation ------------------------

    fn prepare_vars(&mut self) {
        // TFO of the root, collecting cone PPOs on the way
        self.mark_tfo(self.root);
        let mut rpos = 0;
        while rpos < self.tfo_list.len() {
            let node = self.tfo_list[rpos];
            rpos += 1;
            for &onode in &self.net.node(node).fanouts {
                self.mark_tfo(onode);
            }
        }

        // TFI of the TFO
        for i in 0..self.tfo_list.len() {
            let node = self.tfo_list[i];
            for &inode in &self.net.node(node).fanins {
                self.mark_tfi(inode);
            }
        }
        let mut rpos = 0;
        while rpos < self.tfi_list.len() {
            let node = self.tfi_list[rpos];
            rpos += 1;
            for &inode in &self.net.node(node).fanins {
                self.mark_tfi(inode);
            }
        }

        // previous-time cone: the root's own TFI plus the TFI of every
        // DFF input whose output lies in the cone
        if self.fault_type.has_previous_state() {
            for i in 0..self.dff_list.len() {
                let inode = self.net.dff_input(self.dff_list[i]);
                self.mark_tfi2(inode);
            }
            self.mark_tfi2(self.root);
            let mut rpos = 0;
            while rpos < self.tfi2_list.len() {
                let node = self.tfi2_list[rpos];
                rpos += 1;
                for &inode in &self.net.node(node).fanins {
                    self.mark_tfi2(inode);
                }
            }
        }

        for i in 0..self.tfo_list.len() {
            let node = self.tfo_list[i];
            let g = self.solver.new_variable();
            let f = self.solver.new_variable();
            let d = self.solver.new_variable();
            self.gvar.set(node, g);
            self.fvar.set(node, f);
            self.dvar.set(node, d);
        }
        for i in 0..self.tfi_list.len() {
            let node = self.tfi_list[i];
            let g = self.solver.new_variable();
            self.gvar.set(node, g);
            // outside the fanout cone the faulty circuit equals the good
            self.fvar.set(node, g);
        }
        for i in 0..self.tfi2_list.len() {
            let node = self.tfi2_list[i];
            let h = self.solver.new_variable();
            self.hvar.set(node, h);
        }
    }

    fn mark_tfo(&mut self, node: NodeId) {
        if self.mark[node as usize] & TFO == 0 {
            self.mark[node as usize] |= TFO;
            self.tfo_list.push(node);
            let n = self.net.node(node);
            if n.is_ppo() {
                self.output_list.push(node);
            }
            self.note_dff_output(node);
        }
    }

    fn mark_tfi(&mut self, node: NodeId) {
        if self.mark[node as usize] & (TFO | TFI) == 0 {
            self.mark[node as usize] |= TFI;
            self.tfi_list.push(node);
            self.note_dff_output(node);
        }
    }

    fn mark_tfi2(&mut self, node: NodeId) {
        if self.mark[node as usize] & TFI2 == 0 {
            self.mark[node as usize] |= TFI2;
            self.tfi2_list.push(node);
        }
    }

    fn note_dff_output(&mut self, node: NodeId) {
        if !self.fault_type.has_previous_state() {
            return;
        }
        if let faultline_net::NodeKind::DffOutput { dff_id } = self.net.node(node).kind {
            if !self.dff_list.contains(&dff_id) {
                self.dff_list.push(dff_id);
            }
        }
    }

    // ---- CNF generation ---------------------------------------------

    fn gen_good_cnf(&mut self) {
        for list in [&self.tfo_list, &self.tfi_list] {
            for &node in list {
                let n = self.net.node(node);
                if n.is_ppi() {
                    continue;
                }
                GateEnc::new(&mut self.solver, &self.gvar).make_cnf(n);
            }
        }

        // tie each cone DFF's current output to its input one clock ago
        for i in 0..self.dff_list.len() {
            let dff_id = self.dff_list[i];
            let onode = self.net.dff_output(dff_id);
            let inode = self.net.dff_input(dff_id);
            let olit = self.gvar.get(onode);
            let ilit = self.hvar.get(inode);
            self.solver.add_buff_gate(olit, ilit);
        }

        for i in 0..self.tfi2_list.len() {
            let node = self.tfi2_list[i];
            let n = self.net.node(node);
            if n.is_ppi() {
                continue;
            }
            GateEnc::new(&mut self.solver, &self.hvar).make_cnf(n);
        }
    }

    fn gen_faulty_cnf(&mut self) {
        for i in 0..self.tfo_list.len() {
            let node = self.tfo_list[i];
            if node != self.root {
                let n = self.net.node(node);
                if !n.is_ppi() {
                    GateEnc::new(&mut self.solver, &self.fvar).make_cnf(n);
                }
            }
            self.make_dchain_cnf(node);
        }
    }

    fn make_dchain_cnf(&mut self, node: NodeId) {
        let glit = self.gvar.get(node);
        let flit = self.fvar.get(node);
        let dlit = self.dvar.get(node);

        // dlit -> glit XOR flit
        self.solver.add_clause(&[!glit, !flit, !dlit]);
        self.solver.add_clause(&[glit, flit, !dlit]);

        let n = self.net.node(node);
        if n.is_ppo() {
            // at an observation point the difference variable is exact
            self.solver.add_clause(&[!glit, flit, dlit]);
            self.solver.add_clause(&[glit, !flit, dlit]);
        } else {
            // dlit -> some fanout difference
            if n.fanout_num() == 1 {
                let odlit = self.dvar.get(n.fanouts[0]);
                self.solver.add_clause(&[!dlit, odlit]);
            } else {
                let mut clause: Vec<Lit> =
                    n.fanouts.iter().map(|&o| self.dvar.get(o)).collect();
                clause.push(!dlit);
                self.solver.add_clause(&clause);

                // a difference must also pass through the dominator
                if let Some(dom) = n.imm_dom {
                    let odlit = self.dvar.get(dom);
                    self.solver.add_clause(&[!dlit, odlit]);
                }
            }
        }
    }
}

//! # faultline-dtpg::enc
//!
//! Tseitin translation of gate primitives. AND/OR families use the
//! (n+1)-clause form; the parity gates enumerate their truth table up to
//! three inputs and decompose into a fresh-variable XOR chain above
//! that.

use crate::sat::SatEngine;
use crate::varmap::VarMap;
use faultline_net::{CircuitNode, GateType};
use rustsat::types::Lit;

/// Encodes `output ⇔ gate(fanins)` over one variable family.
pub struct GateEnc<'a> {
    solver: &'a mut SatEngine,
    varmap: &'a VarMap,
}

impl<'a> GateEnc<'a> {
    pub fn new(solver: &'a mut SatEngine, varmap: &'a VarMap) -> Self {
        GateEnc { solver, varmap }
    }

    /// Emits the clauses of `node` with its mapped output literal.
    pub fn make_cnf(&mut self, node: &CircuitNode) {
        self.make_cnf_with_output(node, self.varmap.get(node.id));
    }

    /// Emits the clauses of `node` with an explicit output literal
    /// (used when a fault-injection XOR sits between gate and node).
    pub fn make_cnf_with_output(&mut self, node: &CircuitNode, olit: Lit) {
        let gate = node
            .gate_type()
            .expect("only gate-bearing nodes are encoded");
        let ilits: Vec<Lit> = node.fanins.iter().map(|&f| self.varmap.get(f)).collect();
        self.encode(gate, &ilits, olit);
    }

    fn encode(&mut self, gate: GateType, ilits: &[Lit], olit: Lit) {
        match gate {
            GateType::Buf => self.solver.add_buff_gate(olit, ilits[0]),
            GateType::Not => self.solver.add_buff_gate(olit, !ilits[0]),
            GateType::And => self.encode_and(ilits, olit),
            GateType::Nand => self.encode_and(ilits, !olit),
            GateType::Or => self.encode_or(ilits, olit),
            GateType::Nor => self.encode_or(ilits, !olit),
            GateType::Xor => self.encode_xor(ilits, olit),
            GateType::Xnor => self.encode_xor(ilits, !olit),
        }
    }

    fn encode_and(&mut self, ilits: &[Lit], olit: Lit) {
        let mut last = Vec::with_capacity(ilits.len() + 1);
        for &i in ilits {
            self.solver.add_clause(&[!olit, i]);
            last.push(!i);
        }
        last.push(olit);
        self.solver.add_clause(&last);
    }

    fn encode_or(&mut self, ilits: &[Lit], olit: Lit) {
        let mut last = Vec::with_capacity(ilits.len() + 1);
        for &i in ilits {
            self.solver.add_clause(&[olit, !i]);
            last.push(i);
        }
        last.push(!olit);
        self.solver.add_clause(&last);
    }

    fn encode_xor(&mut self, ilits: &[Lit], olit: Lit) {
        if ilits.len() <= 3 {
            self.encode_xor_table(ilits, olit);
        } else {
            // fold into binary stages with fresh intermediates
            let mut acc = ilits[0];
            for &i in &ilits[1..ilits.len() - 1] {
                let t = self.solver.new_variable();
                self.solver.add_xor_gate(acc, i, t);
                acc = t;
            }
            self.solver.add_xor_gate(acc, ilits[ilits.len() - 1], olit);
        }
    }

    /// Enumerates all 2^n input assignments, forbidding the wrong output.
    fn encode_xor_table(&mut self, ilits: &[Lit], olit: Lit) {
        let n = ilits.len();
        for mask in 0u32..(1 << n) {
            let parity = mask.count_ones() % 2 == 1;
            let mut clause = Vec::with_capacity(n + 1);
            for (k, &i) in ilits.iter().enumerate() {
                clause.push(if mask & (1 << k) != 0 { !i } else { i });
            }
            clause.push(if parity { olit } else { !olit });
            self.solver.add_clause(&clause);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::SatResult;
    use rustsat::types::Lit;

    /// Exhaustively checks an encoded gate against its truth function.
    fn check_gate(gate: GateType, arity: usize, f: fn(&[bool]) -> bool) {
        let mut solver = SatEngine::new();
        let ilits: Vec<Lit> = (0..arity).map(|_| solver.new_variable()).collect();
        let olit = solver.new_variable();

        // build a one-gate netlist to run the encoder
        let mut varmap = VarMap::new(arity + 1);
        for (i, &l) in ilits.iter().enumerate() {
            varmap.set(i as u32, l);
        }
        varmap.set(arity as u32, olit);
        let node = CircuitNode {
            id: arity as u32,
            name: "g".into(),
            kind: faultline_net::NodeKind::Logic { gate },
            fanins: (0..arity as u32).collect(),
            fanouts: vec![],
            level: 1,
            imm_dom: None,
            ffr_root: arity as u32,
            mffc_root: arity as u32,
        };
        GateEnc::new(&mut solver, &varmap).make_cnf(&node);

        for mask in 0u32..(1 << arity) {
            let inputs: Vec<bool> = (0..arity).map(|k| mask & (1 << k) != 0).collect();
            let expect = f(&inputs);
            let mut assumptions: Vec<Lit> = ilits
                .iter()
                .zip(&inputs)
                .map(|(&l, &b)| if b { l } else { !l })
                .collect();
            // consistent output must be SAT
            assumptions.push(if expect { olit } else { !olit });
            assert!(
                matches!(solver.solve(&assumptions).unwrap(), SatResult::Sat(_)),
                "{gate:?} accepts {inputs:?} -> {expect}"
            );
            // inconsistent output must be UNSAT
            let n = assumptions.len();
            assumptions[n - 1] = !assumptions[n - 1];
            assert!(
                matches!(solver.solve(&assumptions).unwrap(), SatResult::Unsat),
                "{gate:?} rejects {inputs:?} -> {}",
                !expect
            );
        }
    }

    #[test]
    fn and_or_families() {
        check_gate(GateType::And, 3, |i| i.iter().all(|&b| b));
        check_gate(GateType::Nand, 3, |i| !i.iter().all(|&b| b));
        check_gate(GateType::Or, 3, |i| i.iter().any(|&b| b));
        check_gate(GateType::Nor, 3, |i| !i.iter().any(|&b| b));
    }

    #[test]
    fn buffers() {
        check_gate(GateType::Buf, 1, |i| i[0]);
        check_gate(GateType::Not, 1, |i| !i[0]);
    }

    #[test]
    fn parity_small_and_decomposed() {
        check_gate(GateType::Xor, 2, |i| i.iter().filter(|&&b| b).count() % 2 == 1);
        check_gate(GateType::Xor, 3, |i| i.iter().filter(|&&b| b).count() % 2 == 1);
        check_gate(GateType::Xnor, 3, |i| i.iter().filter(|&&b| b).count() % 2 == 0);
        // arity 5 exercises the fresh-variable decomposition
        check_gate(GateType::Xor, 5, |i| i.iter().filter(|&&b| b).count() % 2 == 1);
        check_gate(GateType::Xnor, 5, |i| i.iter().filter(|&&b| b).count() % 2 == 0);
    }
}

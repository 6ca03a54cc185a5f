//! # faultline-dtpg::reduce
//!
//! SAT-based fault dominance inside one FFR. Two faults of the same
//! region share their observation point (the root), so if every
//! assignment satisfying f1's propagate condition also satisfies f2's,
//! any test detecting f1 detects f2. The check is a pairwise UNSAT
//! sweep over a CNF of just the FFR cone, built once per region.

use crate::enc::GateEnc;
use crate::errors::DtpgError;
use crate::sat::{SatEngine, SatResult};
use crate::varmap::VarMap;
use faultline_net::{FaultModel, Netlist};
use faultline_types::{FaultId, FaultType};
use rustsat::types::Lit;
use tracing::{debug, warn};

/// Computes, per fault, the faults whose detection it implies.
/// Stuck-at only; transition-delay conditions span two time frames and
/// are not reduced here.
pub fn ffr_reduction(
    net: &Netlist,
    fm: &FaultModel,
) -> Result<Vec<Vec<FaultId>>, DtpgError> {
    let mut dominates: Vec<Vec<FaultId>> = vec![Vec::new(); fm.fault_num()];
    if fm.fault_type() != FaultType::StuckAt {
        warn!("FFR dominance reduction skipped for transition-delay faults");
        return Ok(dominates);
    }

    for ffr in net.ffr_list() {
        let faults = fm.faults_in_ffr(ffr.id);
        if faults.len() < 2 {
            continue;
        }

        // CNF of the region alone: free inputs, encoded members
        let mut solver = SatEngine::new();
        let mut varmap = VarMap::new(net.node_num());
        for &n in ffr.inputs.iter().chain(ffr.nodes.iter()) {
            let lit = solver.new_variable();
            varmap.set(n, lit);
        }
        for &n in &ffr.nodes {
            let node = net.node(n);
            if !node.is_ppi() {
                GateEnc::new(&mut solver, &varmap).make_cnf(node);
            }
        }

        let conds: Vec<Vec<Lit>> = faults
            .iter()
            .map(|&fid| {
                fm.fault(fid)
                    .ffr_propagate_condition()
                    .iter()
                    .map(|a| {
                        let lit = varmap.get(a.node);
                        if a.val {
                            lit
                        } else {
                            !lit
                        }
                    })
                    .collect()
            })
            .collect();

        let mut dominated = vec![false; faults.len()];
        for i1 in 0..faults.len() {
            if dominated[i1] {
                continue;
            }
            'candidates: for i2 in 0..faults.len() {
                if i1 == i2 || dominated[i2] {
                    continue;
                }
                // f1_cond AND NOT(lit of f2_cond) unsatisfiable for every
                // literal means f1_cond implies f2_cond
                for &lit in &conds[i2] {
                    let mut assumptions = conds[i1].clone();
                    assumptions.push(!lit);
                    match solver.solve(&assumptions)? {
                        SatResult::Unsat => {}
                        _ => continue 'candidates,
                    }
                }
                dominates[faults[i1] as usize].push(faults[i2]);
                dominated[i2] = true;
            }
        }
    }

    let n: usize = dominates.iter().map(|d| d.len()).sum();
    debug!(dominated = n, "FFR dominance reduction done");
    Ok(dominates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_net::{GateType, NetlistBuilder};

    #[test]
    fn and_input_fault_dominates_output_fault() {
        // y = a & b: a sa0 forces y to 0, so a test for a sa0
        // (a=1, b=1, observing y) also detects y sa0
        let mut b = NetlistBuilder::new();
        let a = b.add_input("a");
        let bb = b.add_input("b");
        let g = b.add_gate("g", GateType::And, &[a, bb]).unwrap();
        b.add_output("y", g).unwrap();
        let net = b.finish().unwrap();
        let fm = FaultModel::new(&net, FaultType::StuckAt);

        let dominates = ffr_reduction(&net, &fm).unwrap();
        let find = |name: &str, val: bool| {
            fm.fault_list()
                .iter()
                .find(|f| f.branch.is_none() && f.val == val && net.node(f.origin).name == name)
                .unwrap()
                .id
        };
        let a0 = find("a", false);
        let g0 = find("g", false);
        // a sa0's condition (a=1, b=1) implies g sa0's (g=1)
        assert!(dominates[a0 as usize].contains(&g0));
    }
}

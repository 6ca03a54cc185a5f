//! # faultline-dtpg::sat
//!
//! The black-box SAT interface. `SatEngine` accumulates the CNF and
//! hands it to a fresh kissat instance per `solve` call, with the
//! assumptions added as unit clauses of that instance. Keeping the
//! clause store on our side lets one CNF serve many solves over the
//! faults of an FFR or MFFC. The core makes no assumption about the
//! solver beyond this interface.

use crate::errors::DtpgError;
use rustsat::instances::Cnf;
use rustsat::solvers::{Solve, SolverResult};
use rustsat::types::{Clause, Lit, TernaryVal, Var};
use tracing::{debug, trace};

/// Outcome of one solver call.
pub enum SatResult {
    Sat(SatModel),
    Unsat,
    /// The solver gave up; the caller marks the fault `Aborted`.
    Unknown,
}

/// A complete variable assignment extracted after a satisfiable call.
pub struct SatModel {
    vals: Vec<TernaryVal>,
}

impl SatModel {
    /// Value of a literal under the model; `None` when unassigned.
    pub fn value(&self, lit: Lit) -> Option<bool> {
        let v = self.vals.get(lit.var().idx())?;
        match v {
            TernaryVal::True => Some(!lit.is_neg()),
            TernaryVal::False => Some(lit.is_neg()),
            TernaryVal::DontCare => None,
        }
    }

    /// Value of a literal, reading unassigned as false.
    pub fn value_or_false(&self, lit: Lit) -> bool {
        self.value(lit).unwrap_or(false)
    }
}

/// Counters over the lifetime of one engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct SatStats {
    pub solve_count: usize,
    pub sat_count: usize,
    pub unsat_count: usize,
    pub unknown_count: usize,
    pub clause_count: usize,
    pub var_count: usize,
}

/// CNF store plus solver frontend.
#[derive(Default)]
pub struct SatEngine {
    cnf: Cnf,
    next_var: u32,
    stats: SatStats,
}

impl SatEngine {
    pub fn new() -> Self {
        SatEngine::default()
    }

    /// Allocates a fresh variable, returned as its positive literal.
    pub fn new_variable(&mut self) -> Lit {
        let var = Var::new(self.next_var);
        self.next_var += 1;
        self.stats.var_count += 1;
        var.pos_lit()
    }

    /// Adds one clause.
    pub fn add_clause(&mut self, lits: &[Lit]) {
        trace!(?lits, "clause");
        self.cnf.add_clause(lits.iter().copied().collect::<Clause>());
        self.stats.clause_count += 1;
    }

    /// Encodes `a ⇔ b`.
    pub fn add_buff_gate(&mut self, a: Lit, b: Lit) {
        self.add_clause(&[!a, b]);
        self.add_clause(&[a, !b]);
    }

    /// Encodes `o ⇔ a XOR b`.
    pub fn add_xor_gate(&mut self, a: Lit, b: Lit, o: Lit) {
        self.add_clause(&[!a, !b, !o]);
        self.add_clause(&[a, b, !o]);
        self.add_clause(&[a, !b, o]);
        self.add_clause(&[!a, b, o]);
    }

    pub fn stats(&self) -> SatStats {
        self.stats
    }

    /// Solves the stored CNF under the given assumptions.
    pub fn solve(&mut self, assumptions: &[Lit]) -> Result<SatResult, DtpgError> {
        self.stats.solve_count += 1;
        debug!(
            clauses = self.stats.clause_count,
            vars = self.next_var,
            assumptions = assumptions.len(),
            "solving"
        );

        let mut solver = rustsat_kissat::Kissat::default();
        solver.add_cnf(self.cnf.clone())?;
        for &a in assumptions {
            solver.add_clause([a].into_iter().collect::<Clause>())?;
        }

        match solver.solve()? {
            SolverResult::Sat => {
                self.stats.sat_count += 1;
                let mut vals = Vec::with_capacity(self.next_var as usize);
                for idx in 0..self.next_var {
                    let lit = Var::new(idx).pos_lit();
                    vals.push(solver.lit_val(lit)?);
                }
                Ok(SatResult::Sat(SatModel { vals }))
            }
            SolverResult::Unsat => {
                self.stats.unsat_count += 1;
                Ok(SatResult::Unsat)
            }
            SolverResult::Interrupted => {
                self.stats.unknown_count += 1;
                Ok(SatResult::Unknown)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sat_and_unsat_under_assumptions() {
        let mut engine = SatEngine::new();
        let a = engine.new_variable();
        let b = engine.new_variable();
        engine.add_clause(&[a, b]);
        engine.add_clause(&[!a, b]);

        // b must be true whenever a is decided
        match engine.solve(&[a]).unwrap() {
            SatResult::Sat(model) => {
                assert_eq!(model.value(b), Some(true));
            }
            _ => panic!("expected SAT"),
        }

        // the same CNF under b=false is unsatisfiable
        assert!(matches!(engine.solve(&[!b]).unwrap(), SatResult::Unsat));

        // assumptions do not stick between calls
        assert!(matches!(engine.solve(&[]).unwrap(), SatResult::Sat(_)));
    }

    #[test]
    fn xor_gate_semantics() {
        let mut engine = SatEngine::new();
        let a = engine.new_variable();
        let b = engine.new_variable();
        let o = engine.new_variable();
        engine.add_xor_gate(a, b, o);

        match engine.solve(&[a, !b]).unwrap() {
            SatResult::Sat(model) => assert_eq!(model.value(o), Some(true)),
            _ => panic!("expected SAT"),
        }
        assert!(matches!(engine.solve(&[a, b, o]).unwrap(), SatResult::Unsat));
    }
}

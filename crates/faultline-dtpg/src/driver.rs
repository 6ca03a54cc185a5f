//! # faultline-dtpg::driver
//!
//! The top-level ATPG loop. An optional random-pattern phase knocks out
//! the easy faults first; the deterministic phase then walks the FFRs
//! (or MFFCs) and runs the SAT engine for every fault still undetected,
//! feeding each generated vector back to the fault simulator to drop
//! collaterally detected faults. All bookkeeping ends up in the status
//! registry and the pattern list.

use crate::engine::{DtpgEngine, DtpgResult};
use crate::errors::DtpgError;
use crate::mffc::MffcEngine;
use crate::reduce::ffr_reduction;
use crate::sat::SatStats;
use faultline_fsim::ParallelFsim;
use faultline_net::{FaultModel, FaultStatusMgr, Netlist};
use faultline_types::config::{AtpgConfig, DtpgMode};
use faultline_types::{FaultId, FaultStatus, TestVector, PV_BITLEN};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{debug, info};

/// Aggregate counters of one ATPG run.
#[derive(Debug, Default, Clone, Copy)]
pub struct DtpgStats {
    pub detected: usize,
    pub untestable: usize,
    pub aborted: usize,
    /// Faults removed by the random-pattern phase.
    pub rtpg_detected: usize,
    /// Faults dropped by simulating generated vectors.
    pub drop_detected: usize,
    /// Region CNFs built.
    pub cnf_count: usize,
    pub sat: SatStats,
}

/// Drives test generation over a whole fault model.
pub struct DtpgDriver<'a> {
    net: &'a Netlist,
    fm: &'a FaultModel,
    config: AtpgConfig,
    status: FaultStatusMgr,
    patterns: Vec<TestVector>,
    /// Detection implications from the FFR dominance pass.
    dominates: Vec<Vec<FaultId>>,
    stats: DtpgStats,
}

impl<'a> DtpgDriver<'a> {
    pub fn new(net: &'a Netlist, fm: &'a FaultModel, config: AtpgConfig) -> Self {
        DtpgDriver {
            net,
            fm,
            config,
            status: FaultStatusMgr::new(fm.fault_num()),
            patterns: Vec::new(),
            dominates: Vec::new(),
            stats: DtpgStats::default(),
        }
    }

    /// Runs the full flow: random phase, optional dominance reduction,
    /// deterministic DTPG with fault dropping.
    pub fn run(&mut self) -> Result<(), DtpgError> {
        let mut fsim = ParallelFsim::new(self.net, self.fm, self.config.threads);

        if self.config.ffr_reduction {
            self.dominates = ffr_reduction(self.net, self.fm)?;
        }

        if self.config.rtpg_max_idle_rounds > 0 {
            self.rtpg_phase(&mut fsim);
        }

        match self.config.dtpg_mode {
            DtpgMode::Ffr => {
                for ffr in self.net.ffr_list() {
                    let targets = self.fm.faults_in_ffr(ffr.id).to_vec();
                    if !self.any_undetected(&targets) {
                        continue;
                    }
                    let mut engine = DtpgEngine::new(
                        self.net,
                        self.fm.fault_type(),
                        ffr.root,
                        self.config.extract_mode,
                    );
                    engine.make_cnf();
                    self.stats.cnf_count += 1;
                    for fid in targets {
                        if self.status.get(fid) == FaultStatus::Undetected {
                            let result = engine.solve_fault(self.fm.fault(fid), &[])?;
                            self.handle_result(&mut fsim, fid, result);
                        }
                    }
                    self.stats.sat = merge_stats(self.stats.sat, engine.solver_stats());
                }
            }
            DtpgMode::Mffc => {
                for mffc in self.net.mffc_list() {
                    let targets = self.fm.faults_in_mffc(mffc.id).to_vec();
                    if !self.any_undetected(&targets) {
                        continue;
                    }
                    if mffc.ffr_num() == 1 {
                        // a one-FFR cone gains nothing from activation
                        // variables
                        let mut engine = DtpgEngine::new(
                            self.net,
                            self.fm.fault_type(),
                            mffc.root,
                            self.config.extract_mode,
                        );
                        engine.make_cnf();
                        self.stats.cnf_count += 1;
                        for fid in targets {
                            if self.status.get(fid) == FaultStatus::Undetected {
                                let result = engine.solve_fault(self.fm.fault(fid), &[])?;
                                self.handle_result(&mut fsim, fid, result);
                            }
                        }
                        self.stats.sat = merge_stats(self.stats.sat, engine.solver_stats());
                    } else {
                        let mut engine = MffcEngine::new(
                            self.net,
                            self.fm,
                            mffc,
                            self.config.extract_mode,
                        );
                        engine.make_cnf();
                        self.stats.cnf_count += 1;
                        for fid in targets {
                            if self.status.get(fid) == FaultStatus::Undetected {
                                let result = engine.solve_fault(self.fm.fault(fid))?;
                                self.handle_result(&mut fsim, fid, result);
                            }
                        }
                        self.stats.sat = merge_stats(self.stats.sat, engine.solver_stats());
                    }
                }
            }
        }

        info!(
            detected = self.stats.detected + self.stats.rtpg_detected + self.stats.drop_detected,
            untestable = self.stats.untestable,
            aborted = self.stats.aborted,
            patterns = self.patterns.len(),
            "ATPG finished"
        );
        Ok(())
    }

    pub fn status(&self) -> &FaultStatusMgr {
        &self.status
    }

    pub fn patterns(&self) -> &[TestVector] {
        &self.patterns
    }

    pub fn stats(&self) -> DtpgStats {
        self.stats
    }

    // ---- phases -----------------------------------------------------

    /// Fills 64-slot buffers with seeded random vectors and simulates
    /// them until several consecutive rounds stop finding new faults.
    fn rtpg_phase(&mut self, fsim: &mut ParallelFsim) {
        let mut rng = ChaCha20Rng::seed_from_u64(self.config.seed);
        let mut idle_rounds = 0;
        let mut round = 0usize;
        while idle_rounds < self.config.rtpg_max_idle_rounds {
            round += 1;
            let mut pats = Vec::with_capacity(PV_BITLEN);
            for _ in 0..PV_BITLEN {
                let mut tv = TestVector::new(
                    self.net.input_num(),
                    self.net.dff_num(),
                    self.fm.fault_type(),
                );
                tv.set_from_random(&mut rng);
                pats.push(tv);
            }

            let mut new_faults: Vec<FaultId> = Vec::new();
            let mut used_slots = 0u64;
            let status = &self.status;
            fsim.ppsfp(&pats, |fid, dba| {
                if status.get(fid) == FaultStatus::Undetected
                    && !new_faults.contains(&fid)
                {
                    new_faults.push(fid);
                    used_slots |= 1 << dba.dbits_union().trailing_zeros();
                }
            });

            if new_faults.is_empty() {
                idle_rounds += 1;
                continue;
            }
            idle_rounds = 0;
            self.stats.rtpg_detected += new_faults.len();
            for fid in new_faults {
                self.mark_detected(fsim, fid);
            }
            for slot in 0..PV_BITLEN {
                if used_slots & (1 << slot) != 0 {
                    self.patterns.push(pats[slot].clone());
                }
            }
            debug!(round, patterns = self.patterns.len(), "random phase round");
        }
        info!(
            rounds = round,
            detected = self.stats.rtpg_detected,
            "random phase done"
        );
    }

    // ---- bookkeeping ------------------------------------------------

    fn handle_result(&mut self, fsim: &mut ParallelFsim, fid: FaultId, result: DtpgResult) {
        match result {
            DtpgResult::Detected(tv) => {
                self.stats.detected += 1;
                self.mark_detected(fsim, fid);
                if self.config.drop_by_fsim {
                    let status = &self.status;
                    let mut dropped: Vec<FaultId> = Vec::new();
                    fsim.sppfp(&tv, |ofid, _| {
                        if ofid != fid
                            && status.get(ofid) == FaultStatus::Undetected
                            && !dropped.contains(&ofid)
                        {
                            dropped.push(ofid);
                        }
                    });
                    self.stats.drop_detected += dropped.len();
                    for ofid in dropped {
                        self.mark_detected(fsim, ofid);
                    }
                }
                self.patterns.push(tv);
            }
            DtpgResult::Untestable => {
                self.stats.untestable += 1;
                self.status.set(fid, FaultStatus::Untestable);
                fsim.set_skip(fid);
            }
            DtpgResult::Aborted => {
                self.stats.aborted += 1;
                self.status.set(fid, FaultStatus::Aborted);
            }
        }
    }

    /// Marks one fault detected, plus everything its detection implies.
    fn mark_detected(&mut self, fsim: &ParallelFsim, fid: FaultId) {
        let mut work = vec![fid];
        while let Some(f) = work.pop() {
            if self.status.get(f) != FaultStatus::Undetected {
                continue;
            }
            self.status.set(f, FaultStatus::Detected);
            fsim.set_skip(f);
            if let Some(dom) = self.dominates.get(f as usize) {
                work.extend_from_slice(dom);
            }
        }
    }

    fn any_undetected(&self, targets: &[FaultId]) -> bool {
        targets
            .iter()
            .any(|&f| self.status.get(f) == FaultStatus::Undetected)
    }
}

fn merge_stats(a: SatStats, b: SatStats) -> SatStats {
    SatStats {
        solve_count: a.solve_count + b.solve_count,
        sat_count: a.sat_count + b.sat_count,
        unsat_count: a.unsat_count + b.unsat_count,
        unknown_count: a.unknown_count + b.unknown_count,
        clause_count: a.clause_count + b.clause_count,
        var_count: a.var_count + b.var_count,
    }
}

/// Convenience wrapper: run the whole flow with the given configuration.
pub fn run_atpg(
    net: &Netlist,
    fm: &FaultModel,
    config: AtpgConfig,
) -> Result<(FaultStatusMgr, Vec<TestVector>, DtpgStats), DtpgError> {
    debug_assert!(
        config.fault_type == fm.fault_type(),
        "config and fault model disagree on the fault type"
    );
    let mut driver = DtpgDriver::new(net, fm, config);
    driver.run()?;
    Ok((
        driver.status.clone(),
        driver.patterns.clone(),
        driver.stats,
    ))
}

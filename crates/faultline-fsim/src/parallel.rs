//! # faultline-fsim::parallel
//!
//! Multi-threaded fault simulation. A fixed pool of workers each owns a
//! private `SimEngine` (value planes, event queue, observability masks)
//! and a disjoint round-robin slice of the FFRs. The main thread issues
//! one command at a time over per-worker channels and blocks until every
//! worker has answered, then replays the concatenated result lists
//! through the caller's callback.
//!
//! Ordering: results of one call arrive in no guaranteed fault order;
//! within one result the `DiffBits` outputs are sorted ascending. Skip
//! flags changed between commands are visible to the next command.

use crate::core::{build_sim_ffrs, SimEngine};
use crate::fault::SimFault;
use crate::input::{AssignInput, PatBufInput, TvInput};
use crate::network::{SimFfr, SimNetwork};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use faultline_net::{FaultModel, Netlist};
use faultline_types::{
    AssignList, DiffBits, DiffBitsArray, FaultId, FaultType, TestVector, PV_ALL1, PV_BITLEN,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::debug;

#[derive(Clone)]
enum Command {
    Ppsfp(Arc<Vec<TestVector>>),
    SppfpTv(Arc<TestVector>),
    SppfpAssign(Arc<AssignList>),
    End,
}

enum WorkerResult {
    Sppfp(Vec<(FaultId, DiffBits)>),
    Ppsfp(Vec<(FaultId, DiffBitsArray)>),
}

/// Thread-pooled fault simulator with the same modes as `Fsim`.
pub struct ParallelFsim {
    fault_num: usize,
    skip: Arc<Vec<AtomicBool>>,
    cmd_txs: Vec<Sender<Command>>,
    res_rx: Receiver<WorkerResult>,
    workers: Vec<JoinHandle<()>>,
}

impl ParallelFsim {
    /// Spawns `threads` workers (0 = hardware concurrency) over the
    /// given netlist and fault model.
    pub fn new(netlist: &Netlist, fm: &FaultModel, threads: usize) -> Self {
        let threads = if threads == 0 {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            threads
        };

        let net = Arc::new(SimNetwork::new(netlist));
        let faults = Arc::new(SimFault::build_table(fm));
        let fault_type = fm.fault_type();
        let skip: Arc<Vec<AtomicBool>> = Arc::new(
            (0..fm.fault_num()).map(|_| AtomicBool::new(false)).collect(),
        );
        let all_ffrs = build_sim_ffrs(netlist, fm);

        let (res_tx, res_rx) = unbounded();
        let mut cmd_txs = Vec::with_capacity(threads);
        let mut workers = Vec::with_capacity(threads);
        for wid in 0..threads {
            let (cmd_tx, cmd_rx) = bounded::<Command>(1);
            cmd_txs.push(cmd_tx);
            // round-robin FFR ownership
            let my_ffrs: Vec<SimFfr> = all_ffrs
                .iter()
                .enumerate()
                .filter(|(i, _)| i % threads == wid)
                .map(|(_, ffr)| ffr.clone())
                .collect();
            let net = Arc::clone(&net);
            let faults = Arc::clone(&faults);
            let skip = Arc::clone(&skip);
            let res_tx = res_tx.clone();
            workers.push(std::thread::spawn(move || {
                worker_main(wid, net, fault_type, faults, skip, my_ffrs, cmd_rx, res_tx);
            }));
        }

        debug!(threads, ffrs = all_ffrs.len(), "parallel fault simulator ready");
        ParallelFsim {
            fault_num: fm.fault_num(),
            skip,
            cmd_txs,
            res_rx,
            workers,
        }
    }

    pub fn thread_num(&self) -> usize {
        self.workers.len()
    }

    // ---- skip marks (visible to the next command) --------------------

    pub fn set_skip(&self, fault: FaultId) {
        self.skip[fault as usize].store(true, Ordering::Relaxed);
    }

    pub fn clear_skip(&self, fault: FaultId) {
        self.skip[fault as usize].store(false, Ordering::Relaxed);
    }

    pub fn set_skip_all(&self) {
        for s in self.skip.iter() {
            s.store(true, Ordering::Relaxed);
        }
    }

    pub fn clear_skip_all(&self) {
        for s in self.skip.iter() {
            s.store(false, Ordering::Relaxed);
        }
    }

    /// Simulates up to 64 patterns against all live faults. The callback
    /// may observe faults in any order.
    pub fn ppsfp(
        &mut self,
        pats: &[TestVector],
        mut cb: impl FnMut(FaultId, &DiffBitsArray),
    ) -> usize {
        assert!(pats.len() <= PV_BITLEN, "at most 64 patterns per round");
        if pats.is_empty() {
            return 0;
        }
        let payload = Arc::new(pats.to_vec());
        self.broadcast(Command::Ppsfp(payload));

        let mut count = 0;
        for _ in 0..self.workers.len() {
            match self.res_rx.recv().expect("worker died") {
                WorkerResult::Ppsfp(list) => {
                    count += list.len();
                    for (fid, dbits) in &list {
                        cb(*fid, dbits);
                    }
                }
                WorkerResult::Sppfp(_) => unreachable!("mismatched worker result"),
            }
        }
        count
    }

    /// Simulates one vector against all live faults.
    pub fn sppfp(
        &mut self,
        tv: &TestVector,
        mut cb: impl FnMut(FaultId, &DiffBits),
    ) -> usize {
        self.broadcast(Command::SppfpTv(Arc::new(tv.clone())));
        self.collect_sppfp(&mut cb)
    }

    /// SPPFP over a bare assignment list.
    pub fn sppfp_assign(
        &mut self,
        assigns: &AssignList,
        mut cb: impl FnMut(FaultId, &DiffBits),
    ) -> usize {
        self.broadcast(Command::SppfpAssign(Arc::new(assigns.clone())));
        self.collect_sppfp(&mut cb)
    }

    pub fn fault_num(&self) -> usize {
        self.fault_num
    }

    fn broadcast(&self, cmd: Command) {
        for tx in &self.cmd_txs {
            tx.send(cmd.clone()).expect("worker died");
        }
    }

    fn collect_sppfp(&mut self, cb: &mut dyn FnMut(FaultId, &DiffBits)) -> usize {
        let mut count = 0;
        for _ in 0..self.workers.len() {
            match self.res_rx.recv().expect("worker died") {
                WorkerResult::Sppfp(list) => {
                    count += list.len();
                    for (fid, dbits) in &list {
                        cb(*fid, dbits);
                    }
                }
                WorkerResult::Ppsfp(_) => unreachable!("mismatched worker result"),
            }
        }
        count
    }
}

impl Drop for ParallelFsim {
    fn drop(&mut self) {
        for tx in &self.cmd_txs {
            let _ = tx.send(Command::End);
        }
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn worker_main(
    wid: usize,
    net: Arc<SimNetwork>,
    fault_type: FaultType,
    faults: Arc<Vec<SimFault>>,
    skip: Arc<Vec<AtomicBool>>,
    ffrs: Vec<SimFfr>,
    cmd_rx: Receiver<Command>,
    res_tx: Sender<WorkerResult>,
) {
    let mut engine = SimEngine::new(&net, faults.len());
    let ffr_refs: Vec<&SimFfr> = ffrs.iter().collect();
    let is_skipped = |fid: FaultId| skip[fid as usize].load(Ordering::Relaxed);
    debug!(worker = wid, ffrs = ffrs.len(), "worker up");

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            Command::Ppsfp(pats) => {
                let mut buff: Vec<Option<TestVector>> = vec![None; PV_BITLEN];
                for (i, tv) in pats.iter().enumerate() {
                    buff[i] = Some(tv.clone());
                }
                let pat_map = if pats.len() == PV_BITLEN {
                    PV_ALL1
                } else {
                    (1u64 << pats.len()) - 1
                };
                let input = PatBufInput::new(&buff, pat_map, 0);
                let mut out = Vec::new();
                engine.ppsfp(
                    &net,
                    fault_type,
                    &faults,
                    &ffr_refs,
                    &is_skipped,
                    &input,
                    &mut out,
                );
                let _ = res_tx.send(WorkerResult::Ppsfp(out));
            }
            Command::SppfpTv(tv) => {
                let input = TvInput(&tv);
                let mut out = Vec::new();
                engine.sppfp(
                    &net,
                    fault_type,
                    &faults,
                    &ffr_refs,
                    &is_skipped,
                    &input,
                    &mut out,
                );
                let _ = res_tx.send(WorkerResult::Sppfp(out));
            }
            Command::SppfpAssign(assigns) => {
                let input = AssignInput(&assigns);
                let mut out = Vec::new();
                engine.sppfp(
                    &net,
                    fault_type,
                    &faults,
                    &ffr_refs,
                    &is_skipped,
                    &input,
                    &mut out,
                );
                let _ = res_tx.send(WorkerResult::Sppfp(out));
            }
            Command::End => break,
        }
    }
    debug!(worker = wid, "worker down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Fsim;
    use faultline_net::{GateType, NetlistBuilder};
    use std::collections::BTreeMap;

    /// A circuit with several FFRs so the round-robin split matters.
    fn sample() -> (Netlist, FaultModel) {
        let mut b = NetlistBuilder::new();
        let a = b.add_input("a");
        let c = b.add_input("c");
        let d = b.add_input("d");
        let na = b.add_gate("na", GateType::Not, &[a]).unwrap();
        let g1 = b.add_gate("g1", GateType::And, &[na, c]).unwrap();
        let g2 = b.add_gate("g2", GateType::Or, &[na, d]).unwrap();
        let g3 = b.add_gate("g3", GateType::Xor, &[g1, g2]).unwrap();
        b.add_output("y", g3).unwrap();
        b.add_output("z", g2).unwrap();
        let net = b.finish().unwrap();
        let fm = FaultModel::new(&net, FaultType::StuckAt);
        (net, fm)
    }

    fn tv(net: &Netlist, bits: &str) -> TestVector {
        TestVector::from_bin_str(net.input_num(), net.dff_num(), FaultType::StuckAt, bits).unwrap()
    }

    #[test]
    fn parallel_matches_serial_sppfp() {
        let (net, fm) = sample();
        let pattern = tv(&net, "101");

        let mut serial = Fsim::new(&net, &fm);
        let mut expect = BTreeMap::new();
        serial.sppfp(&pattern, |fid, dbits| {
            expect.insert(fid, dbits.clone());
        });

        let mut par = ParallelFsim::new(&net, &fm, 3);
        let mut got = BTreeMap::new();
        let n = par.sppfp(&pattern, |fid, dbits| {
            got.insert(fid, dbits.clone());
        });
        assert_eq!(n, got.len());
        assert_eq!(expect, got);
    }

    #[test]
    fn parallel_matches_serial_ppsfp() {
        let (net, fm) = sample();
        let pats: Vec<TestVector> = ["000", "011", "101", "110", "111"]
            .iter()
            .map(|s| tv(&net, s))
            .collect();

        let mut serial = Fsim::new(&net, &fm);
        serial.clear_patterns();
        for (i, p) in pats.iter().enumerate() {
            serial.set_pattern(i, p.clone());
        }
        let mut expect = BTreeMap::new();
        serial.ppsfp(|fid, dba| {
            expect.insert(fid, dba.clone());
        });

        let mut par = ParallelFsim::new(&net, &fm, 2);
        let mut got = BTreeMap::new();
        par.ppsfp(&pats, |fid, dba| {
            got.insert(fid, dba.clone());
        });
        assert_eq!(expect, got);
    }

    #[test]
    fn skip_is_visible_to_next_command(){
        let (net, fm) = sample();
        let pattern = tv(&net, "101");
        let mut par = ParallelFsim::new(&net, &fm, 2);

        let mut first = Vec::new();
        par.sppfp(&pattern, |fid, _| first.push(fid));
        assert!(!first.is_empty());

        for &fid in &first {
            par.set_skip(fid);
        }
        let mut second = Vec::new();
        par.sppfp(&pattern, |fid, _| second.push(fid));
        assert!(second.is_empty());
    }
}

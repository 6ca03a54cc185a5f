//! # faultline-fsim::node
//!
//! Simulation nodes. Unlike the circuit graph, node values live in flat
//! per-engine arrays indexed by node id, so the same immutable network can
//! be simulated by many threads at once. Output computation and gate
//! observability are specialized for the common small arities.

use faultline_net::GateType;
use faultline_types::{PackedVal, PackedVal3, PV_ALL0, PV_ALL1};

/// What a simulation node computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimFunc {
    /// PPI; its value is set from outside, never computed.
    Input,
    /// A logic primitive over the fanins. PPO nodes are `Gate(Buf)`.
    Gate(GateType),
}

/// One node of the simulation network.
#[derive(Debug, Clone)]
pub struct SimNode {
    pub id: u32,
    pub func: SimFunc,
    pub fanins: Vec<u32>,
    pub level: u32,
    /// Fanout ids, ascending.
    pub fanouts: Vec<u32>,
    /// Input position of this node within its sole fanout; only
    /// meaningful when `fanouts.len() == 1`.
    pub fanout_ipos: u32,
    /// True when this node roots a fan-out-free region.
    pub ffr_root: bool,
    /// PPO position when this node is an output.
    pub output_id: Option<u32>,
}

impl SimNode {
    pub fn is_output(&self) -> bool {
        self.output_id.is_some()
    }

    /// Recomputes the packed output value from the fanin values.
    pub fn calc_val(&self, vals: &[PackedVal3]) -> PackedVal3 {
        let f = &self.fanins;
        let gate = match self.func {
            SimFunc::Input => return vals[self.id as usize],
            SimFunc::Gate(g) => g,
        };
        match gate {
            GateType::Buf => vals[f[0] as usize],
            GateType::Not => !vals[f[0] as usize],
            GateType::And => self.fold_and(vals),
            GateType::Nand => !self.fold_and(vals),
            GateType::Or => self.fold_or(vals),
            GateType::Nor => !self.fold_or(vals),
            GateType::Xor => self.fold_xor(vals),
            GateType::Xnor => !self.fold_xor(vals),
        }
    }

    /// Observability of fanin `ipos` through this gate: the pattern slots
    /// in which a change on that input changes the output.
    pub fn calc_gobs(&self, vals: &[PackedVal3], ipos: usize) -> PackedVal {
        let gate = match self.func {
            SimFunc::Input => return PV_ALL0,
            SimFunc::Gate(g) => g,
        };
        match gate {
            GateType::Buf | GateType::Not => PV_ALL1,
            // side inputs must hold their non-controlling value
            GateType::And | GateType::Nand => self.side_fold(vals, ipos, |v| v.val1()),
            GateType::Or | GateType::Nor => self.side_fold(vals, ipos, |v| v.val0()),
            // parity gates pass a change whenever the side inputs are
            // definite
            GateType::Xor | GateType::Xnor => self.side_fold(vals, ipos, |v| v.val01()),
        }
    }

    fn fold_and(&self, vals: &[PackedVal3]) -> PackedVal3 {
        let f = &self.fanins;
        match f.len() {
            2 => vals[f[0] as usize] & vals[f[1] as usize],
            3 => vals[f[0] as usize] & vals[f[1] as usize] & vals[f[2] as usize],
            4 => {
                (vals[f[0] as usize] & vals[f[1] as usize])
                    & (vals[f[2] as usize] & vals[f[3] as usize])
            }
            _ => f
                .iter()
                .skip(1)
                .fold(vals[f[0] as usize], |acc, &i| acc & vals[i as usize]),
        }
    }

    fn fold_or(&self, vals: &[PackedVal3]) -> PackedVal3 {
        let f = &self.fanins;
        match f.len() {
            2 => vals[f[0] as usize] | vals[f[1] as usize],
            3 => vals[f[0] as usize] | vals[f[1] as usize] | vals[f[2] as usize],
            4 => {
                (vals[f[0] as usize] | vals[f[1] as usize])
                    | (vals[f[2] as usize] | vals[f[3] as usize])
            }
            _ => f
                .iter()
                .skip(1)
                .fold(vals[f[0] as usize], |acc, &i| acc | vals[i as usize]),
        }
    }

    fn fold_xor(&self, vals: &[PackedVal3]) -> PackedVal3 {
        let f = &self.fanins;
        match f.len() {
            2 => vals[f[0] as usize] ^ vals[f[1] as usize],
            _ => f
                .iter()
                .skip(1)
                .fold(vals[f[0] as usize], |acc, &i| acc ^ vals[i as usize]),
        }
    }

    /// AND-fold of one value plane over the side inputs of the gate.
    fn side_fold(
        &self,
        vals: &[PackedVal3],
        ipos: usize,
        plane: fn(PackedVal3) -> PackedVal,
    ) -> PackedVal {
        let mut obs = PV_ALL1;
        for (j, &f) in self.fanins.iter().enumerate() {
            if j != ipos {
                obs &= plane(vals[f as usize]);
            }
        }
        obs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_types::Val3;

    fn node(gate: GateType, fanins: Vec<u32>) -> SimNode {
        SimNode {
            id: fanins.len() as u32,
            func: SimFunc::Gate(gate),
            fanins,
            level: 1,
            fanouts: vec![],
            fanout_ipos: 0,
            ffr_root: true,
            output_id: None,
        }
    }

    #[test]
    fn and_gobs_needs_side_ones() {
        let n = node(GateType::And, vec![0, 1]);
        let vals = vec![
            PackedVal3::splat(Val3::_1),
            PackedVal3::new(0b01, 0b10), // slot0 = 0, slot1 = 1
            PackedVal3::ALL_X,
        ];
        // observability of input 0 is gated by input 1's ones
        assert_eq!(n.calc_gobs(&vals, 0), 0b10);
        // observability of input 1 is unblocked (input 0 all ones)
        assert_eq!(n.calc_gobs(&vals, 1), PV_ALL1);
    }

    #[test]
    fn xor_gobs_needs_definite_sides() {
        let n = node(GateType::Xor, vec![0, 1]);
        let vals = vec![
            PackedVal3::splat(Val3::_0),
            PackedVal3::new(0b01, 0b00), // slot0 = 0, slot1 = X
            PackedVal3::ALL_X,
        ];
        assert_eq!(n.calc_gobs(&vals, 0), 0b01);
    }

    #[test]
    fn nand_inverts_and() {
        let n = node(GateType::Nand, vec![0, 1]);
        let vals = vec![
            PackedVal3::splat(Val3::_1),
            PackedVal3::splat(Val3::_1),
            PackedVal3::ALL_X,
        ];
        assert_eq!(n.calc_val(&vals), PackedVal3::splat(Val3::_0));
    }
}

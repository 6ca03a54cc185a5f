//! # faultline-types::diffbits
//!
//! Output-side fault-propagation results. `DiffBits` lists the primary
//! outputs at which one pattern observed a fault; `DiffBitsArray` maps
//! each affected output to the 64-bit pattern word that reached it.
//! Both are sparse because almost all outputs see nothing.

use crate::id::OutputId;
use crate::packed::{PackedVal, PV_ALL0};

/// Sparse set of output positions that observed a fault effect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DiffBits {
    pos_list: Vec<OutputId>,
}

impl DiffBits {
    pub fn new() -> Self {
        DiffBits::default()
    }

    pub fn elem_num(&self) -> usize {
        self.pos_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pos_list.is_empty()
    }

    pub fn output(&self, pos: usize) -> OutputId {
        self.pos_list[pos]
    }

    pub fn add_output(&mut self, output: OutputId) {
        self.pos_list.push(output);
    }

    pub fn clear(&mut self) {
        self.pos_list.clear();
    }

    /// Sorts ascending by output index.
    pub fn sort(&mut self) {
        self.pos_list.sort_unstable();
    }

    pub fn iter(&self) -> impl Iterator<Item = OutputId> + '_ {
        self.pos_list.iter().copied()
    }
}

/// Per-output pattern words of a packed-parallel simulation round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffBitsArray {
    body: Vec<(OutputId, PackedVal)>,
    /// OR of all per-output words, cached for the "any detected?" test.
    union: PackedVal,
}

impl DiffBitsArray {
    pub fn new() -> Self {
        DiffBitsArray::default()
    }

    pub fn elem_num(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn output(&self, index: usize) -> OutputId {
        self.body[index].0
    }

    pub fn dbits(&self, index: usize) -> PackedVal {
        self.body[index].1
    }

    /// OR of every per-output bit pattern.
    pub fn dbits_union(&self) -> PackedVal {
        self.union
    }

    pub fn add_output(&mut self, output: OutputId, dbits: PackedVal) {
        debug_assert_ne!(dbits, PV_ALL0);
        self.body.push((output, dbits));
        self.union |= dbits;
    }

    pub fn clear(&mut self) {
        self.body.clear();
        self.union = PV_ALL0;
    }

    /// The outputs reached by pattern slot `pos`, sorted ascending.
    pub fn get_slice(&self, pos: usize) -> DiffBits {
        let mask = 1u64 << pos;
        let mut dbits = DiffBits::new();
        for &(output, bits) in &self.body {
            if bits & mask != PV_ALL0 {
                dbits.add_output(output);
            }
        }
        dbits.sort();
        dbits
    }

    /// Restriction to the pattern slots in `mask`.
    pub fn masking(&self, mask: PackedVal) -> DiffBitsArray {
        let mut ans = DiffBitsArray::new();
        for &(output, bits) in &self.body {
            let bits = bits & mask;
            if bits != PV_ALL0 {
                ans.body.push((output, bits));
            }
        }
        ans.union = self.union & mask;
        ans
    }

    /// Sorts ascending by output index.
    pub fn sort(&mut self) {
        self.body.sort_unstable_by_key(|&(output, _)| output);
    }

    pub fn iter(&self) -> impl Iterator<Item = (OutputId, PackedVal)> + '_ {
        self.body.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_is_or_of_all_patterns() {
        let mut dba = DiffBitsArray::new();
        dba.add_output(2, 0b0101);
        dba.add_output(7, 0b1000);
        assert_eq!(dba.dbits_union(), 0b1101);
        let or: PackedVal = dba.iter().fold(0, |acc, (_, bits)| acc | bits);
        assert_eq!(dba.dbits_union(), or);
    }

    #[test]
    fn slice_extracts_one_pattern() {
        let mut dba = DiffBitsArray::new();
        dba.add_output(7, 0b1000);
        dba.add_output(2, 0b1101);
        let s = dba.get_slice(3);
        assert_eq!(s.elem_num(), 2);
        // sorted ascending by output index
        assert_eq!(s.output(0), 2);
        assert_eq!(s.output(1), 7);
        let s0 = dba.get_slice(1);
        assert!(s0.is_empty());
    }

    #[test]
    fn masking_restricts_union_too() {
        let mut dba = DiffBitsArray::new();
        dba.add_output(0, 0b01);
        dba.add_output(1, 0b10);
        let m = dba.masking(0b01);
        assert_eq!(m.elem_num(), 1);
        assert_eq!(m.dbits_union(), 0b01);
    }
}

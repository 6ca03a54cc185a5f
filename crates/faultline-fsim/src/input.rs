//! # faultline-fsim::input
//!
//! Sources of input values for a simulation round: a single test vector,
//! the 64-slot pattern buffer of PPSFP, or a bare assignment list that
//! pins a few PPIs and leaves the rest X.

use crate::network::SimNetwork;
use faultline_types::{
    AssignList, PackedVal, PackedVal3, TestVector, Val3, PV_ALL1, PV_BITLEN,
};

/// Provides PPI values for the good-value calculation.
pub trait InputSource {
    /// Mask of pattern slots that carry real input data.
    fn bitmask(&self) -> PackedVal {
        PV_ALL1
    }

    /// Sets every PPI for single-time-frame (stuck-at) simulation.
    fn set_current(&self, net: &SimNetwork, vals: &mut [PackedVal3]);

    /// Sets every PPI for the launch (previous) time frame.
    fn set_first(&self, net: &SimNetwork, vals: &mut [PackedVal3]) {
        self.set_current(net, vals);
    }

    /// Sets the true primary inputs for the capture frame; DFF outputs
    /// keep the state shifted in from the launch frame.
    fn set_second(&self, net: &SimNetwork, vals: &mut [PackedVal3]);
}

/// One test vector, broadcast to all 64 slots.
pub struct TvInput<'a>(pub &'a TestVector);

impl InputSource for TvInput<'_> {
    fn set_current(&self, net: &SimNetwork, vals: &mut [PackedVal3]) {
        for (pos, &node) in net.ppi_nodes().iter().enumerate() {
            vals[node as usize] = PackedVal3::splat(self.0.ppi_val(pos));
        }
    }

    fn set_second(&self, net: &SimNetwork, vals: &mut [PackedVal3]) {
        for (pos, &node) in net.ppi_nodes().iter().enumerate().take(net.input_num()) {
            vals[node as usize] = PackedVal3::splat(self.0.aux_val(pos));
        }
    }
}

/// The PPSFP pattern buffer: up to 64 vectors, one per slot. Unused slots
/// repeat the first set pattern so they cannot inject X noise; `bitmask`
/// keeps them out of the results.
pub struct PatBufInput<'a> {
    pats: &'a [Option<TestVector>],
    pat_map: PackedVal,
    first: usize,
}

impl<'a> PatBufInput<'a> {
    pub fn new(pats: &'a [Option<TestVector>], pat_map: PackedVal, first: usize) -> Self {
        debug_assert!(pats.len() <= PV_BITLEN);
        debug_assert!(pat_map != 0);
        PatBufInput { pats, pat_map, first }
    }

    fn pack(&self, read: impl Fn(&TestVector) -> Val3) -> PackedVal3 {
        let mut v0 = 0u64;
        let mut v1 = 0u64;
        let fallback = self.pats[self.first].as_ref().unwrap();
        for slot in 0..PV_BITLEN {
            let tv = match self.pats.get(slot) {
                Some(Some(tv)) if self.pat_map & (1 << slot) != 0 => tv,
                _ => fallback,
            };
            match read(tv) {
                Val3::_0 => v0 |= 1 << slot,
                Val3::_1 => v1 |= 1 << slot,
                Val3::_X => {}
            }
        }
        PackedVal3::new(v0, v1)
    }
}

impl InputSource for PatBufInput<'_> {
    fn bitmask(&self) -> PackedVal {
        self.pat_map
    }

    fn set_current(&self, net: &SimNetwork, vals: &mut [PackedVal3]) {
        for (pos, &node) in net.ppi_nodes().iter().enumerate() {
            vals[node as usize] = self.pack(|tv| tv.ppi_val(pos));
        }
    }

    fn set_second(&self, net: &SimNetwork, vals: &mut [PackedVal3]) {
        for (pos, &node) in net.ppi_nodes().iter().enumerate().take(net.input_num()) {
            vals[node as usize] = self.pack(|tv| tv.aux_val(pos));
        }
    }
}

/// A sufficient assignment: listed PPIs get their value, all others X.
/// Only current-time assignments drive the capture frame; time-0 entries
/// drive the launch frame.
pub struct AssignInput<'a>(pub &'a AssignList);

impl AssignInput<'_> {
    fn set_frame(&self, net: &SimNetwork, vals: &mut [PackedVal3], time: u8) {
        for &node in net.ppi_nodes() {
            vals[node as usize] = PackedVal3::ALL_X;
        }
        for a in self.0.iter() {
            if a.time == time {
                vals[a.node as usize] = PackedVal3::splat(Val3::from(a.val));
            }
        }
    }
}

impl InputSource for AssignInput<'_> {
    fn set_current(&self, net: &SimNetwork, vals: &mut [PackedVal3]) {
        self.set_frame(net, vals, 1);
    }

    fn set_first(&self, net: &SimNetwork, vals: &mut [PackedVal3]) {
        self.set_frame(net, vals, 0);
    }

    fn set_second(&self, net: &SimNetwork, vals: &mut [PackedVal3]) {
        // only true primary inputs; DFF outputs keep the shifted state
        let pis = &net.ppi_nodes()[..net.input_num()];
        for &node in pis {
            vals[node as usize] = PackedVal3::ALL_X;
        }
        for a in self.0.iter() {
            if a.time == 1 && pis.contains(&a.node) {
                vals[a.node as usize] = PackedVal3::splat(Val3::from(a.val));
            }
        }
    }
}

//! # faultline-types::testvector
//!
//! A test pattern for one DTPG target. Three 3-valued sub-vectors: the
//! primary-input vector, the DFF-state vector (empty for combinational
//! circuits) and, in transition-delay mode only, the second-time-frame
//! input vector. X entries are don't-cares.

use crate::bitvec::BitVector;
use crate::errors::VectorError;
use crate::fault::FaultType;
use crate::value::Val3;
use std::fmt;

/// A 3-valued test pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestVector {
    input: BitVector,
    dff: BitVector,
    aux_input: Option<BitVector>,
}

impl TestVector {
    /// Creates an all-X vector shaped for the given circuit and fault type.
    pub fn new(input_num: usize, dff_num: usize, fault_type: FaultType) -> Self {
        TestVector {
            input: BitVector::new(input_num),
            dff: BitVector::new(dff_num),
            aux_input: fault_type
                .has_previous_state()
                .then(|| BitVector::new(input_num)),
        }
    }

    pub fn input_num(&self) -> usize {
        self.input.len()
    }

    pub fn dff_num(&self) -> usize {
        self.dff.len()
    }

    /// Number of pseudo-primary inputs (PIs then DFF outputs).
    pub fn ppi_num(&self) -> usize {
        self.input.len() + self.dff.len()
    }

    pub fn has_aux_input(&self) -> bool {
        self.aux_input.is_some()
    }

    pub fn input_vector(&self) -> &BitVector {
        &self.input
    }

    pub fn dff_vector(&self) -> &BitVector {
        &self.dff
    }

    pub fn aux_input_vector(&self) -> Option<&BitVector> {
        self.aux_input.as_ref()
    }

    /// Value of PPI `pos` (time 0 in transition-delay mode).
    pub fn ppi_val(&self, pos: usize) -> Val3 {
        if pos < self.input.len() {
            self.input.val(pos)
        } else {
            self.dff.val(pos - self.input.len())
        }
    }

    pub fn set_ppi_val(&mut self, pos: usize, val: Val3) {
        if pos < self.input.len() {
            self.input.set_val(pos, val);
        } else {
            self.dff.set_val(pos - self.input.len(), val);
        }
    }

    /// Second-time-frame value of primary input `pos`.
    /// Panics when the vector has no aux sub-vector.
    pub fn aux_val(&self, pos: usize) -> Val3 {
        self.aux_input
            .as_ref()
            .expect("stuck-at vector has no second time frame")
            .val(pos)
    }

    pub fn set_aux_val(&mut self, pos: usize, val: Val3) {
        self.aux_input
            .as_mut()
            .expect("stuck-at vector has no second time frame")
            .set_val(pos, val);
    }

    /// Number of X bits across all sub-vectors.
    pub fn x_count(&self) -> usize {
        self.input.x_count()
            + self.dff.x_count()
            + self.aux_input.as_ref().map_or(0, |v| v.x_count())
    }

    /// Same (input_num, dff_num, aux) shape.
    pub fn same_shape(&self, other: &TestVector) -> bool {
        self.input.len() == other.input.len()
            && self.dff.len() == other.dff.len()
            && self.has_aux_input() == other.has_aux_input()
    }

    /// True when no bit position holds 0 in one vector and 1 in the other.
    pub fn is_compat(&self, other: &TestVector) -> Result<bool, VectorError> {
        self.check_shape(other)?;
        Ok(self.input.is_compat(&other.input)
            && self.dff.is_compat(&other.dff)
            && match (&self.aux_input, &other.aux_input) {
                (Some(a), Some(b)) => a.is_compat(b),
                _ => true,
            })
    }

    /// True when every care bit of `self` agrees with `other`.
    pub fn is_subset_of(&self, other: &TestVector) -> Result<bool, VectorError> {
        self.check_shape(other)?;
        Ok(self.input.is_subset_of(&other.input)
            && self.dff.is_subset_of(&other.dff)
            && match (&self.aux_input, &other.aux_input) {
                (Some(a), Some(b)) => a.is_subset_of(b),
                _ => true,
            })
    }

    /// Intersects the care sets of both vectors. On conflict the vector is
    /// left unchanged and an error is returned.
    pub fn merge(&mut self, other: &TestVector) -> Result<(), VectorError> {
        self.check_shape(other)?;
        if !self.is_compat(other)? {
            return Err(VectorError::Conflict);
        }
        self.input.merge(&other.input)?;
        self.dff.merge(&other.dff)?;
        if let (Some(a), Some(b)) = (&mut self.aux_input, &other.aux_input) {
            a.merge(b)?;
        }
        Ok(())
    }

    /// Fills every bit with a random definite value.
    pub fn set_from_random<R: rand::Rng>(&mut self, rng: &mut R) {
        self.input.set_from_random(rng);
        self.dff.set_from_random(rng);
        if let Some(aux) = &mut self.aux_input {
            aux.set_from_random(rng);
        }
    }

    /// Textual form: bin sub-vectors separated by ':'. The DFF segment is
    /// present only for sequential circuits, the aux segment only in
    /// transition-delay mode.
    pub fn bin_str(&self) -> String {
        let mut s = self.input.bin_str();
        if !self.dff.is_empty() {
            s.push(':');
            s.push_str(&self.dff.bin_str());
        }
        if let Some(aux) = &self.aux_input {
            s.push(':');
            s.push_str(&aux.bin_str());
        }
        s
    }

    /// Hex form of the sub-vectors, ':'-separated; X bits coerce to 0.
    pub fn hex_str(&self) -> String {
        let mut s = self.input.hex_str();
        if !self.dff.is_empty() {
            s.push(':');
            s.push_str(&self.dff.hex_str());
        }
        if let Some(aux) = &self.aux_input {
            s.push(':');
            s.push_str(&aux.hex_str());
        }
        s
    }

    /// Parses a ':'-separated bin form against a known shape.
    pub fn from_bin_str(
        input_num: usize,
        dff_num: usize,
        fault_type: FaultType,
        s: &str,
    ) -> Result<Self, VectorError> {
        let mut tv = TestVector::new(input_num, dff_num, fault_type);
        let mut parts = s.split(':');
        let input_part = parts.next().unwrap_or("");
        tv.input = BitVector::from_bin(input_num, input_part)?;
        if dff_num > 0 {
            let dff_part = parts.next().unwrap_or("");
            tv.dff = BitVector::from_bin(dff_num, dff_part)?;
        }
        if tv.aux_input.is_some() {
            let aux_part = parts.next().unwrap_or("");
            tv.aux_input = Some(BitVector::from_bin(input_num, aux_part)?);
        }
        Ok(tv)
    }

    fn check_shape(&self, other: &TestVector) -> Result<(), VectorError> {
        if !self.same_shape(other) {
            return Err(VectorError::LengthMismatch {
                left: self.ppi_num(),
                right: other.ppi_num(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for TestVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.bin_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinational_stuck_at_has_no_extra_segments() {
        let tv = TestVector::new(3, 0, FaultType::StuckAt);
        assert_eq!(tv.bin_str(), "XXX");
        assert!(!tv.has_aux_input());
    }

    #[test]
    fn transition_delay_carries_two_frames() {
        let mut tv = TestVector::new(2, 1, FaultType::TransitionDelay);
        tv.set_ppi_val(0, Val3::_1);
        tv.set_ppi_val(2, Val3::_0);
        tv.set_aux_val(1, Val3::_1);
        assert_eq!(tv.bin_str(), "X1:0:1X");
        let rt = TestVector::from_bin_str(2, 1, FaultType::TransitionDelay, &tv.bin_str()).unwrap();
        assert_eq!(rt, tv);
    }

    #[test]
    fn merge_is_commutative_and_fails_on_conflict() {
        let mut a = TestVector::new(4, 0, FaultType::StuckAt);
        a.set_ppi_val(0, Val3::_1);
        let mut b = TestVector::new(4, 0, FaultType::StuckAt);
        b.set_ppi_val(3, Val3::_0);

        let mut ab = a.clone();
        ab.merge(&b).unwrap();
        let mut ba = b.clone();
        ba.merge(&a).unwrap();
        assert_eq!(ab, ba);

        let mut c = TestVector::new(4, 0, FaultType::StuckAt);
        c.set_ppi_val(0, Val3::_0);
        assert_eq!(ab.merge(&c), Err(VectorError::Conflict));
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let mut a = TestVector::new(4, 0, FaultType::StuckAt);
        let b = TestVector::new(5, 0, FaultType::StuckAt);
        assert!(matches!(
            a.merge(&b),
            Err(VectorError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn subset_relation() {
        let mut big = TestVector::new(3, 0, FaultType::StuckAt);
        big.set_ppi_val(0, Val3::_1);
        big.set_ppi_val(1, Val3::_0);
        let mut small = TestVector::new(3, 0, FaultType::StuckAt);
        small.set_ppi_val(0, Val3::_1);
        assert!(small.is_subset_of(&big).unwrap());
        assert!(!big.is_subset_of(&small).unwrap());
    }
}

//! # faultline-types
//!
//! This crate provides the foundational, shared data types used across the
//! entire faultline workspace: 3-valued logic, packed 64-bit value planes,
//! 3-valued bit vectors and test vectors, assignment lists, fault-detection
//! result containers, and the fault/status enums that the netlist, fault
//! simulation and test generation crates all need to agree upon.

#![forbid(unsafe_code)]

pub mod assign;
pub mod bitvec;
pub mod config;
pub mod diffbits;
pub mod errors;
pub mod fault;
pub mod id;
pub mod packed;
pub mod testvector;
pub mod value;

pub use assign::{Assign, AssignList};
pub use bitvec::BitVector;
pub use diffbits::{DiffBits, DiffBitsArray};
pub use errors::VectorError;
pub use fault::{FaultStatus, FaultType};
pub use id::{FaultId, NodeId, OutputId};
pub use packed::{diff, PackedVal, PackedVal3, PV_ALL0, PV_ALL1, PV_BITLEN};
pub use testvector::TestVector;
pub use value::Val3;

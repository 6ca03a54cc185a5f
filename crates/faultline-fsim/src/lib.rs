//! # faultline-fsim
//!
//! Packed-parallel fault simulation. A `SimNetwork` mirrors the circuit
//! graph in a simulation-oriented form; `Fsim` drives 64 patterns at a
//! time through it with event-driven propagation at FFR granularity
//! (SPSFP / SPPFP / PPSFP modes); `ParallelFsim` fans the FFR work out
//! over a fixed pool of worker threads.

#![forbid(unsafe_code)]

pub mod core;
pub mod eventq;
pub mod fault;
pub mod input;
pub mod network;
pub mod node;
pub mod parallel;

pub use crate::core::Fsim;
pub use eventq::EventQueue;
pub use fault::SimFault;
pub use input::{AssignInput, InputSource, PatBufInput, TvInput};
pub use network::{SimFfr, SimNetwork};
pub use node::{SimFunc, SimNode};
pub use parallel::ParallelFsim;

//! # faultline-dtpg
//!
//! SAT-based deterministic test pattern generation. For each target
//! fault the engine encodes the miter of the good and faulty circuits
//! over the fault's fanout cone into CNF, asks the solver for a model
//! under the fault's FFR propagation condition, extracts a sufficient
//! assignment from the model and justifies it back to a primary-input
//! test vector. The driver iterates FFRs or MFFCs, feeds generated
//! vectors to the fault simulator to drop collaterally detected faults,
//! and keeps the status registry current.

#![forbid(unsafe_code)]

pub mod driver;
pub mod enc;
pub mod engine;
pub mod errors;
pub mod extract;
pub mod justify;
pub mod mffc;
pub mod reduce;
pub mod sat;
pub mod varmap;

pub use driver::{run_atpg, DtpgDriver, DtpgStats};
pub use engine::{DtpgEngine, DtpgResult};
pub use errors::DtpgError;
pub use mffc::MffcEngine;
pub use sat::{SatEngine, SatModel, SatResult};
pub use varmap::VarMap;

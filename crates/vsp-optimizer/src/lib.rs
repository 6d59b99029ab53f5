//! Optimization driver for the vortex-lattice solver.
//!
//! `VspOptimizer` reads a case file, solves every run case forward, and
//! computes discrete-adjoint gradients of the configured optimization
//! functions with respect to mesh node coordinates and free-stream inputs.

pub mod adjoint;
pub mod case_file;
pub mod error;
pub mod optimizer;
pub mod quiet;

pub use adjoint::Sensitivities;
pub use case_file::{CaseConfig, MAX_OPTIMIZATION_FUNCTIONS, MAX_RUN_CASES, ObjectiveDef};
pub use error::{OptimizerError, OptimizerResult};
pub use optimizer::{FunctionSlot, VspOptimizer};
pub use quiet::{QuietGuard, quietly};

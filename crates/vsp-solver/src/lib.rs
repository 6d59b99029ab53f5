//! Vortex-lattice aerodynamic solver.
//!
//! The model places one horseshoe vortex on every mesh loop, solves the flow
//! tangency system with dense LU and integrates Kutta-Joukowski loads. It is
//! generic over [`vsp_core::Scalar`], so the same code evaluates with `f64`
//! and with dual numbers for derivative propagation. [`VspSolver`] marches a
//! run case in time and keeps the component groups' force records current.

pub mod biot_savart;
pub mod error;
pub mod flow;
pub mod mesh;
pub mod model;
pub mod objective;
pub mod solver;

pub use error::{SolverError, SolverResult};
pub use flow::{FlowConditions, FlowParams, InputVariable, ReferenceGeometry};
pub use mesh::{Mesh, MeshLoop, MeshNode, WingBuilder};
pub use model::{AeroModel, Coefficients, ForceMoment, GroupFrame, Loads, Panel, StripLoad};
pub use objective::{Objective, OptimizationFunction, weighted};
pub use solver::{CaseHistory, SolverSettings, StepState, VehicleCoefficients, VspSolver};

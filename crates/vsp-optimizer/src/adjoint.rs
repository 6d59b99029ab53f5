//! Discrete adjoint of the vortex-lattice system.
//!
//! For a functional `F(Γ, X)` subject to `R(Γ, X) = A(X) Γ - b(X) = 0`, the
//! adjoint `λ` solves `Aᵀ λ = ∂F/∂Γ` and the total derivative is
//! `dF/dX = ∂F/∂X - λᵀ ∂R/∂X`. Partial derivatives come from forward-mode
//! dual numbers: one model evaluation per seeded input, run in parallel.

use nalgebra::DVector;
use num_dual::Dual64;
use rayon::prelude::*;
use vsp_solver::{AeroModel, FlowConditions, InputVariable, SolverError, StepState, VspSolver};

use crate::error::OptimizerResult;

/// Derivatives of one functional at one solved step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sensitivities {
    /// `dF/dX` for every node coordinate, `[x0, y0, z0, x1, ...]`
    pub mesh: Vec<f64>,
    /// `dF/dv` for every [`InputVariable`], in `InputVariable::ALL` order
    pub inputs: Vec<f64>,
    pub lambda: Vec<f64>,
}

fn lift(v: &[f64]) -> Vec<Dual64> {
    v.iter().map(|&x| Dual64::from(x)).collect()
}

/// Build the dual-valued model of a solved step without any seed.
pub fn dual_model(
    solver: &VspSolver,
    flow: &FlowConditions,
    step: &StepState,
) -> OptimizerResult<AeroModel<Dual64>> {
    let xyz = lift(&solver.mesh().coordinates());
    Ok(solver.model_for(&xyz, &step.frames, flow.params())?)
}

/// `∂F/∂Γ` at the solved circulation.
pub fn gamma_gradient<F>(model: &AeroModel<Dual64>, gamma: &[f64], functional: &F) -> Vec<f64>
where
    F: Fn(&AeroModel<Dual64>, &[Dual64]) -> Dual64 + Sync,
{
    (0..gamma.len())
        .into_par_iter()
        .map(|j| {
            let mut g = lift(gamma);
            g[j] = Dual64::new(gamma[j], 1.0);
            functional(model, &g).eps
        })
        .collect()
}

/// Solve `Aᵀ λ = rhs` at a solved step.
pub fn solve_adjoint_system(model: &AeroModel<f64>, rhs: &[f64]) -> OptimizerResult<Vec<f64>> {
    let at = model.influence_matrix().transpose();
    let lambda = at
        .lu()
        .solve(&DVector::from_column_slice(rhs))
        .ok_or(SolverError::Singular {
            what: "transposed influence matrix".to_string(),
        })?;
    Ok(lambda.iter().copied().collect())
}

/// Adjoint sensitivities of `functional` with respect to node coordinates
/// and free-stream inputs. Seeds run on the current rayon pool.
pub fn sensitivities<F>(
    solver: &VspSolver,
    flow: &FlowConditions,
    step: &StepState,
    functional: &F,
) -> OptimizerResult<Sensitivities>
where
    F: Fn(&AeroModel<Dual64>, &[Dual64]) -> Dual64 + Sync,
{
    let plain = solver.model_at(flow, step)?;
    let base = dual_model(solver, flow, step)?;
    let df_dgamma = gamma_gradient(&base, &step.gamma, functional);
    let lambda = solve_adjoint_system(&plain, &df_dgamma)?;

    let gamma = lift(&step.gamma);
    let coords = solver.mesh().coordinates();
    let lagrangian = |model: &AeroModel<Dual64>| {
        (functional(model, &gamma) - model.weighted_residual(&gamma, &lambda)).eps
    };

    let mesh = (0..coords.len())
        .into_par_iter()
        .map(|k| -> OptimizerResult<f64> {
            let mut xyz = lift(&coords);
            xyz[k] = Dual64::new(coords[k], 1.0);
            let model = solver.model_for(&xyz, &step.frames, flow.params())?;
            Ok(lagrangian(&model))
        })
        .collect::<OptimizerResult<Vec<f64>>>()?;

    let xyz = lift(&coords);
    let inputs = InputVariable::ALL
        .par_iter()
        .map(|&var| -> OptimizerResult<f64> {
            let model = solver.model_for(&xyz, &step.frames, flow.seeded(var))?;
            Ok(lagrangian(&model))
        })
        .collect::<OptimizerResult<Vec<f64>>>()?;

    Ok(Sensitivities {
        mesh,
        inputs,
        lambda,
    })
}

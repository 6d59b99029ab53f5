//! Forward/adjoint optimization driver.
//!
//! Holds the case setup, runs the forward solver over every run case, and
//! evaluates adjoint gradients of every optimization function. Public
//! indices (functions, time samples, nodes) follow one [`ArrayOffset`].

use num_dual::Dual64;
use std::path::Path;
use tracing::{info, warn};
use vsp_core::ArrayOffset;
use vsp_groups::{ComponentGroup, read_groups};
use vsp_solver::{
    AeroModel, CaseHistory, FlowConditions, InputVariable, Mesh, Objective, OptimizationFunction,
    StepState, VspSolver, weighted,
};

use crate::adjoint::{self, Sensitivities};
use crate::case_file::CaseConfig;
use crate::error::{OptimizerError, OptimizerResult};
use crate::quiet::QuietGuard;

/// One optimization function and the run case it is evaluated on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FunctionSlot {
    pub objective: Objective,
    pub case: usize,
}

#[derive(Clone, Debug)]
struct ForwardState {
    generation: u64,
    histories: Vec<CaseHistory>,
    /// `[function][sampled step][component]`
    values: Vec<Vec<Vec<f64>>>,
}

#[derive(Clone, Debug)]
struct AdjointState {
    generation: u64,
    /// `[function][sampled step]`
    steps: Vec<Vec<Sensitivities>>,
}

#[derive(Debug)]
pub struct VspOptimizer {
    config: CaseConfig,
    solver: VspSolver,
    run_cases: Vec<FlowConditions>,
    functions: Vec<FunctionSlot>,
    gradient_vectors: Vec<Option<Vec<f64>>>,
    offset: ArrayOffset,
    generation: u64,
    forward: Option<ForwardState>,
    adjoint: Option<AdjointState>,
}

impl VspOptimizer {
    /// Read a case file and build the solver from the mesh and group files it
    /// names. Nothing is retained on failure.
    pub fn setup(path: &Path) -> OptimizerResult<Self> {
        let config = CaseConfig::read(path)?;
        let Some(mesh_path) = config.mesh.clone() else {
            return Err(OptimizerError::Config(format!(
                "{} does not name a Mesh",
                path.display()
            )));
        };
        let mesh = Mesh::read(&mesh_path)?;
        let groups = match &config.group_file {
            Some(p) => {
                let file = std::fs::File::open(p).map_err(|source| OptimizerError::FileRead {
                    path: p.clone(),
                    source,
                })?;
                read_groups(&mut std::io::BufReader::new(file))?
            }
            None => Vec::new(),
        };
        info!(case_file = %path.display(), mesh = %mesh_path.display(), "optimizer setup");
        Self::from_parts(config, mesh, groups)
    }

    pub fn from_parts(
        config: CaseConfig,
        mesh: Mesh,
        groups: Vec<ComponentGroup>,
    ) -> OptimizerResult<Self> {
        config.validate()?;
        let solver = VspSolver::new(mesh, groups, config.settings())?;
        let functions: Vec<FunctionSlot> = config
            .objectives()?
            .into_iter()
            .map(|(objective, case)| FunctionSlot { objective, case })
            .collect();
        Ok(Self {
            run_cases: config.run_cases(),
            gradient_vectors: vec![None; functions.len()],
            functions,
            offset: config.array_offset,
            solver,
            config,
            generation: 0,
            forward: None,
            adjoint: None,
        })
    }

    pub fn config(&self) -> &CaseConfig {
        &self.config
    }

    pub fn solver(&self) -> &VspSolver {
        &self.solver
    }

    pub fn array_offset(&self) -> ArrayOffset {
        self.offset
    }

    /// Switch the public index convention. Cached results stay valid.
    pub fn set_array_offset_type(&mut self, offset: ArrayOffset) {
        self.offset = offset;
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.forward = None;
        self.adjoint = None;
    }

    // ---- free-stream and reference setters ----

    fn set_flow(&mut self, var: InputVariable, value: f64) {
        for case in &mut self.run_cases {
            case.set(var, value);
        }
        self.invalidate();
    }

    /// Applied to every run case.
    pub fn set_mach_number(&mut self, mach: f64) {
        self.set_flow(InputVariable::Mach, mach);
    }

    pub fn set_aoa_degrees(&mut self, alpha: f64) {
        self.set_flow(InputVariable::Alpha, alpha);
    }

    pub fn set_beta_degrees(&mut self, beta: f64) {
        self.set_flow(InputVariable::Beta, beta);
    }

    pub fn set_vinf(&mut self, vinf: f64) {
        self.set_flow(InputVariable::Vinf, vinf);
    }

    pub fn set_density(&mut self, density: f64) {
        self.set_flow(InputVariable::Density, density);
    }

    pub fn set_re_cref(&mut self, re: f64) {
        self.set_flow(InputVariable::ReCref, re);
    }

    pub fn set_rotational_rate_p(&mut self, p: f64) {
        self.set_flow(InputVariable::RollRate, p);
    }

    pub fn set_rotational_rate_q(&mut self, q: f64) {
        self.set_flow(InputVariable::PitchRate, q);
    }

    pub fn set_rotational_rate_r(&mut self, r: f64) {
        self.set_flow(InputVariable::YawRate, r);
    }

    pub fn set_sref(&mut self, sref: f64) {
        self.solver.settings_mut().reference.sref = sref;
        self.invalidate();
    }

    pub fn set_cref(&mut self, cref: f64) {
        self.solver.settings_mut().reference.cref = cref;
        self.invalidate();
    }

    pub fn set_bref(&mut self, bref: f64) {
        self.solver.settings_mut().reference.bref = bref;
        self.invalidate();
    }

    pub fn set_xcg(&mut self, x: f64) {
        self.solver.settings_mut().reference.cg[0] = x;
        self.invalidate();
    }

    pub fn set_ycg(&mut self, y: f64) {
        self.solver.settings_mut().reference.cg[1] = y;
        self.invalidate();
    }

    pub fn set_zcg(&mut self, z: f64) {
        self.solver.settings_mut().reference.cg[2] = z;
        self.invalidate();
    }

    /// Trailing-wake length; zero makes the wake semi-infinite.
    pub fn set_far_dist(&mut self, far_dist: f64) {
        self.solver.settings_mut().far_dist = far_dist;
        self.invalidate();
    }

    pub fn set_number_of_threads(&mut self, n: usize) {
        self.solver.settings_mut().number_of_threads = n;
        self.invalidate();
    }

    pub fn number_of_threads(&self) -> usize {
        self.solver.settings().number_of_threads
    }

    pub fn set_unsteady_analysis(&mut self, unsteady: bool) {
        self.solver.settings_mut().unsteady = unsteady;
        self.invalidate();
    }

    pub fn unsteady_analysis(&self) -> bool {
        self.solver.settings().unsteady
    }

    pub fn set_time_step(&mut self, dt: f64) {
        self.solver.settings_mut().time_step = dt;
        self.invalidate();
    }

    pub fn set_number_of_time_steps(&mut self, n: usize) {
        self.solver.settings_mut().number_of_time_steps = n;
        self.invalidate();
    }

    pub fn set_start_averaging_time(&mut self, t: f64) {
        self.solver.settings_mut().start_averaging_time = t;
        self.invalidate();
    }

    pub fn set_cl_target(&mut self, cl: f64) {
        self.config.cl_target = cl;
        for slot in &mut self.functions {
            slot.objective.cl_target = cl;
        }
        self.invalidate();
    }

    /// Push new node coordinates (flat, 3 per node) into the mesh.
    pub fn update_geometry(&mut self, xyz: &[f64]) -> OptimizerResult<()> {
        self.solver.update_geometry(xyz)?;
        self.invalidate();
        Ok(())
    }

    // ---- function table ----

    pub fn number_of_run_cases(&self) -> usize {
        self.run_cases.len()
    }

    pub fn run_case(&self, case: usize) -> OptimizerResult<&FlowConditions> {
        let i = self.offset.to_internal(case, self.run_cases.len(), "run case")?;
        Ok(&self.run_cases[i])
    }

    pub fn number_of_optimization_functions(&self) -> usize {
        self.functions.len()
    }

    fn function_index(&self, case: usize) -> OptimizerResult<usize> {
        Ok(self
            .offset
            .to_internal(case, self.functions.len(), "optimization function")?)
    }

    pub fn optimization_function(&self, case: usize) -> OptimizerResult<OptimizationFunction> {
        Ok(self.functions[self.function_index(case)?].objective.function)
    }

    /// Function and its run case (internal, 0-based).
    pub fn function_slot(&self, case: usize) -> OptimizerResult<&FunctionSlot> {
        Ok(&self.functions[self.function_index(case)?])
    }

    pub fn optimization_set(&self, case: usize) -> OptimizerResult<usize> {
        Ok(self.functions[self.function_index(case)?].objective.set)
    }

    pub fn set_optimization_function(
        &mut self,
        case: usize,
        function: OptimizationFunction,
        set: usize,
    ) -> OptimizerResult<()> {
        let i = self.function_index(case)?;
        self.functions[i].objective.function = function;
        self.functions[i].objective.set = set;
        self.gradient_vectors[i] = None;
        self.invalidate();
        Ok(())
    }

    /// Append a function evaluated on run case `run_case`; returns its public index.
    pub fn add_optimization_function(
        &mut self,
        function: OptimizationFunction,
        set: usize,
        run_case: usize,
    ) -> OptimizerResult<usize> {
        if self.functions.len() == crate::case_file::MAX_OPTIMIZATION_FUNCTIONS {
            return Err(OptimizerError::Capacity {
                what: "optimization functions",
                count: self.functions.len() + 1,
                limit: crate::case_file::MAX_OPTIMIZATION_FUNCTIONS,
            });
        }
        let case = self.offset.to_internal(run_case, self.run_cases.len(), "run case")?;
        let mut objective = Objective::new(function, set);
        objective.cl_target = self.config.cl_target;
        self.functions.push(FunctionSlot { objective, case });
        self.gradient_vectors.push(None);
        self.invalidate();
        Ok(self.offset.to_external(self.functions.len() - 1))
    }

    // ---- solves ----

    /// Run every run case and evaluate every optimization function.
    pub fn solve_forward(&mut self) -> OptimizerResult<()> {
        self.forward = None;
        self.adjoint = None;
        let mut histories = Vec::with_capacity(self.run_cases.len());
        for (i, flow) in self.run_cases.iter().enumerate() {
            info!(case = i, mach = flow.mach, alpha = flow.alpha_deg, "forward solve");
            histories.push(self.solver.solve(flow)?);
        }

        let mut values = Vec::with_capacity(self.functions.len());
        for slot in &self.functions {
            let history = &histories[slot.case];
            let mut per_step = Vec::new();
            for step in history.sampled() {
                let model = self.solver.model_at(&history.flow, step)?;
                slot.objective.validate(&model)?;
                per_step.push(slot.objective.evaluate(&model, &step.gamma));
            }
            values.push(per_step);
        }

        self.forward = Some(ForwardState {
            generation: self.generation,
            histories,
            values,
        });
        Ok(())
    }

    /// Adjoint gradients of every function at every sampled step. Requires a
    /// current forward solve.
    pub fn solve_adjoint(&mut self) -> OptimizerResult<()> {
        self.adjoint = None;
        let forward = self.forward()?;
        let pool = self.solver.thread_pool()?;

        let mut steps = Vec::with_capacity(self.functions.len());
        for (k, slot) in self.functions.iter().enumerate() {
            let history = &forward.histories[slot.case];
            let length = forward.values[k].first().map_or(0, |v| v.len());
            let n_steps = history.number_of_sampled_steps();
            let weights = self.gradient_vectors[k].as_deref();
            info!(function = %slot.objective.function, steps = n_steps, "adjoint solve");

            let mut per_step = Vec::with_capacity(n_steps);
            for (s, step) in history.sampled().enumerate() {
                let w = step_weights(weights, length, n_steps, s);
                let objective = slot.objective;
                let functional =
                    move |m: &AeroModel<Dual64>, g: &[Dual64]| weighted(&objective.evaluate(m, g), &w);
                per_step.push(pool.install(|| {
                    adjoint::sensitivities(&self.solver, &history.flow, step, &functional)
                })?);
            }
            steps.push(per_step);
        }

        self.adjoint = Some(AdjointState {
            generation: self.generation,
            steps,
        });
        Ok(())
    }

    /// Forward then adjoint.
    pub fn solve(&mut self) -> OptimizerResult<()> {
        self.solve_forward()?;
        self.solve_adjoint()
    }

    fn forward(&self) -> OptimizerResult<&ForwardState> {
        match &self.forward {
            Some(f) if f.generation == self.generation => Ok(f),
            _ => Err(OptimizerError::Sequence {
                what: "no forward solve for the current inputs",
            }),
        }
    }

    fn adjoint(&self) -> OptimizerResult<&AdjointState> {
        self.forward()?;
        match &self.adjoint {
            Some(a) if a.generation == self.generation => Ok(a),
            _ => Err(OptimizerError::Sequence {
                what: "no adjoint solve for the current inputs",
            }),
        }
    }

    /// Case histories of the last forward solve.
    pub fn histories(&self) -> OptimizerResult<&[CaseHistory]> {
        Ok(&self.forward()?.histories)
    }

    /// Groups as left by the last forward solve.
    pub fn groups(&self) -> &[ComponentGroup] {
        self.solver.groups()
    }

    // ---- gradient seed ----

    /// Weights contracting a vector-valued function into a scalar for the
    /// adjoint. Length is either the function length (same weights every
    /// step) or function length × number of time samples. Must follow the
    /// forward solve; a later adjoint solve picks it up.
    pub fn set_gradient_vector(&mut self, case: usize, weights: &[f64]) -> OptimizerResult<()> {
        let k = self.function_index(case)?;
        let forward = self.forward()?;
        let length = forward.values[k].first().map_or(0, |v| v.len());
        let steps = forward.values[k].len();
        if weights.len() != length && weights.len() != length * steps {
            return Err(OptimizerError::InvalidArg(format!(
                "gradient vector has length {}, expected {length} or {}",
                weights.len(),
                length * steps
            )));
        }
        self.gradient_vectors[k] = Some(weights.to_vec());
        self.adjoint = None;
        Ok(())
    }

    // ---- values ----

    /// Values per step of one function.
    pub fn optimization_function_length(&self, case: usize) -> OptimizerResult<usize> {
        let k = self.function_index(case)?;
        Ok(self.forward()?.values[k].first().map_or(0, |v| v.len()))
    }

    /// Number of sampled time steps of one function's run case.
    pub fn optimization_number_of_time_steps(&self, case: usize) -> OptimizerResult<usize> {
        let k = self.function_index(case)?;
        Ok(self.forward()?.values[k].len())
    }

    fn time_index(&self, k: usize, time: usize) -> OptimizerResult<usize> {
        let n = self.forward()?.values[k].len();
        Ok(self.offset.to_internal(time, n, "time sample")?)
    }

    /// Scalar value of the first function.
    pub fn function_value(&self) -> OptimizerResult<f64> {
        self.case_function_value(self.offset.to_external(0))
    }

    /// Scalar value of one function, averaged over the sampled steps.
    pub fn case_function_value(&self, case: usize) -> OptimizerResult<f64> {
        let k = self.function_index(case)?;
        if !self.functions[k].objective.function.is_scalar() {
            return Err(OptimizerError::InvalidArg(format!(
                "{} is vector valued",
                self.functions[k].objective.function
            )));
        }
        let values = &self.forward()?.values[k];
        let n = values.len().max(1) as f64;
        Ok(values.iter().map(|v| v[0]).sum::<f64>() / n)
    }

    /// All values of the first function.
    pub fn function_values(&self) -> OptimizerResult<Vec<f64>> {
        self.case_function_values(self.offset.to_external(0))
    }

    /// All values of one function, concatenated over the sampled steps.
    pub fn case_function_values(&self, case: usize) -> OptimizerResult<Vec<f64>> {
        let k = self.function_index(case)?;
        Ok(self.forward()?.values[k].concat())
    }

    /// Values of one function at one sampled step.
    pub fn step_function_values(&self, case: usize, time: usize) -> OptimizerResult<Vec<f64>> {
        let k = self.function_index(case)?;
        let s = self.time_index(k, time)?;
        Ok(self.forward()?.values[k][s].clone())
    }

    // ---- gradients ----

    fn combine<F>(&self, k: usize, pick: F) -> OptimizerResult<Vec<f64>>
    where
        F: Fn(&Sensitivities) -> &[f64],
    {
        let steps = &self.adjoint()?.steps[k];
        let Some(first) = steps.first() else {
            return Ok(Vec::new());
        };
        let mut out = vec![0.0; pick(first).len()];
        for s in steps {
            for (o, d) in out.iter_mut().zip(pick(s)) {
                *o += d;
            }
        }
        if self.functions[k].objective.function.is_scalar() {
            let n = steps.len() as f64;
            out.iter_mut().for_each(|o| *o /= n);
        }
        Ok(out)
    }

    /// Mesh gradient of the first function, `3 × NumberOfNodes` long.
    pub fn function_gradients(&self) -> OptimizerResult<Vec<f64>> {
        self.case_function_gradients(self.offset.to_external(0))
    }

    /// Mesh gradient of one function. Scalar functions are differentiated
    /// through their time average, vector functions through the weighted
    /// sum over all sampled steps.
    pub fn case_function_gradients(&self, case: usize) -> OptimizerResult<Vec<f64>> {
        let k = self.function_index(case)?;
        self.combine(k, |s| &s.mesh)
    }

    /// Mesh gradient of one function at one sampled step.
    pub fn step_function_gradients(&self, case: usize, time: usize) -> OptimizerResult<Vec<f64>> {
        let k = self.function_index(case)?;
        let s = self.time_index(k, time)?;
        Ok(self.adjoint()?.steps[k][s].mesh.clone())
    }

    fn node_index(&self, node: usize) -> OptimizerResult<usize> {
        Ok(self
            .offset
            .to_internal(node, self.solver.mesh().number_of_nodes(), "node")?)
    }

    /// `[dF/dx, dF/dy, dF/dz]` of one node; `time` selects a sampled step.
    pub fn node_gradient(&self, case: usize, time: Option<usize>, node: usize) -> OptimizerResult<[f64; 3]> {
        let i = self.node_index(node)?;
        let g = match time {
            Some(t) => self.step_function_gradients(case, t)?,
            None => self.case_function_gradients(case)?,
        };
        Ok([g[3 * i], g[3 * i + 1], g[3 * i + 2]])
    }

    pub fn gradient_x(&self, node: usize) -> OptimizerResult<f64> {
        Ok(self.node_gradient(self.offset.to_external(0), None, node)?[0])
    }

    pub fn gradient_y(&self, node: usize) -> OptimizerResult<f64> {
        Ok(self.node_gradient(self.offset.to_external(0), None, node)?[1])
    }

    pub fn gradient_z(&self, node: usize) -> OptimizerResult<f64> {
        Ok(self.node_gradient(self.offset.to_external(0), None, node)?[2])
    }

    /// Derivative of one function with respect to a free-stream input.
    pub fn df_d_input_variable(
        &self,
        case: usize,
        time: Option<usize>,
        var: InputVariable,
    ) -> OptimizerResult<f64> {
        let k = self.function_index(case)?;
        match time {
            Some(t) => {
                let s = self.time_index(k, t)?;
                Ok(self.adjoint()?.steps[k][s].inputs[var.index()])
            }
            None => Ok(self.combine(k, |s| &s.inputs)?[var.index()]),
        }
    }

    // ---- linear operator ----

    fn last_sampled(&self, run_case: usize) -> OptimizerResult<(&CaseHistory, &StepState)> {
        let forward = self.forward()?;
        let i = self
            .offset
            .to_internal(run_case, forward.histories.len(), "run case")?;
        let history = &forward.histories[i];
        let step = history.sampled().last().ok_or(OptimizerError::Sequence {
            what: "run case has no sampled step",
        })?;
        Ok((history, step))
    }

    /// `A x` and `b` of the flow-tangency system at the last sampled step.
    pub fn matrix_vector_product_and_rhs(
        &self,
        run_case: usize,
        x: &[f64],
    ) -> OptimizerResult<(Vec<f64>, Vec<f64>)> {
        let (history, step) = self.last_sampled(run_case)?;
        let model = self.solver.model_at(&history.flow, step)?;
        check_len(x.len(), model.size())?;
        let a = model.influence_matrix();
        let product = &a * nalgebra::DVector::from_column_slice(x);
        Ok((product.iter().copied().collect(), model.rhs()))
    }

    /// `Aᵀ x` and `∂F/∂Γ` of one function at the last sampled step.
    pub fn adjoint_matrix_vector_product_and_rhs(
        &self,
        case: usize,
        x: &[f64],
    ) -> OptimizerResult<(Vec<f64>, Vec<f64>)> {
        let k = self.function_index(case)?;
        let forward = self.forward()?;
        let slot = self.functions[k];
        let history = &forward.histories[slot.case];
        let n_steps = history.number_of_sampled_steps();
        let step = history.sampled().last().ok_or(OptimizerError::Sequence {
            what: "run case has no sampled step",
        })?;
        let model = self.solver.model_at(&history.flow, step)?;
        check_len(x.len(), model.size())?;

        let length = forward.values[k].first().map_or(0, |v| v.len());
        let w = step_weights(
            self.gradient_vectors[k].as_deref(),
            length,
            n_steps,
            n_steps.saturating_sub(1),
        );
        let dual = adjoint::dual_model(&self.solver, &history.flow, step)?;
        let objective = slot.objective;
        let functional =
            move |m: &AeroModel<Dual64>, g: &[Dual64]| weighted(&objective.evaluate(m, g), &w);
        let rhs = adjoint::gamma_gradient(&dual, &step.gamma, &functional);

        let at = model.influence_matrix().transpose();
        let product = &at * nalgebra::DVector::from_column_slice(x);
        Ok((product.iter().copied().collect(), rhs))
    }

    // ---- pressures ----

    /// Nodal ΔCp of the first run case at its last sampled step.
    pub fn nodal_pressures(&self) -> OptimizerResult<Vec<f64>> {
        let (history, step) = self.last_sampled(self.offset.to_external(0))?;
        let model = self.solver.model_at(&history.flow, step)?;
        let loads = model.loads(&step.gamma);
        Ok(model.nodal_pressures(&self.solver.mesh().node_loops(), &loads))
    }

    /// Mesh gradient of `Σ wᵢ Pᵢ` over nodal pressures, for callers that
    /// hold `∂F/∂P` of an outer functional.
    pub fn pressure_mesh_gradient(&self, df_dp: &[f64]) -> OptimizerResult<Vec<f64>> {
        let (history, step) = self.last_sampled(self.offset.to_external(0))?;
        let mesh = self.solver.mesh();
        check_len(df_dp.len(), mesh.number_of_nodes())?;
        let node_loops = mesh.node_loops();
        let w = df_dp.to_vec();
        let functional = move |m: &AeroModel<Dual64>, g: &[Dual64]| {
            let loads = m.loads(g);
            weighted(&m.nodal_pressures(&node_loops, &loads), &w)
        };
        let pool = self.solver.thread_pool()?;
        let s = pool.install(|| adjoint::sensitivities(&self.solver, &history.flow, step, &functional))?;
        Ok(s.mesh)
    }

    // ---- mesh queries ----

    pub fn number_of_nodes(&self) -> usize {
        self.solver.mesh().number_of_nodes()
    }

    pub fn number_of_loops(&self) -> usize {
        self.solver.mesh().number_of_loops()
    }

    fn node(&self, node: usize) -> OptimizerResult<&vsp_solver::MeshNode> {
        let i = self.node_index(node)?;
        Ok(&self.solver.mesh().nodes[i])
    }

    pub fn node_x(&self, node: usize) -> OptimizerResult<f64> {
        Ok(self.node(node)?.xyz[0])
    }

    pub fn node_y(&self, node: usize) -> OptimizerResult<f64> {
        Ok(self.node(node)?.xyz[1])
    }

    pub fn node_z(&self, node: usize) -> OptimizerResult<f64> {
        Ok(self.node(node)?.xyz[2])
    }

    pub fn node_component_id(&self, node: usize) -> OptimizerResult<usize> {
        Ok(self.node(node)?.component)
    }

    pub fn node_surface_id(&self, node: usize) -> OptimizerResult<usize> {
        Ok(self.node(node)?.surface)
    }

    // ---- output ----

    /// Silence solver logging until the guard is resumed or dropped.
    pub fn suppress_stdout(&self) -> QuietGuard {
        QuietGuard::new()
    }

    pub fn resume_stdout(&self, guard: QuietGuard) {
        guard.resume();
    }
}

fn check_len(got: usize, expected: usize) -> OptimizerResult<()> {
    if got != expected {
        return Err(OptimizerError::InvalidArg(format!(
            "vector has length {got}, expected {expected}"
        )));
    }
    Ok(())
}

/// Weights applied to step `s`: ones by default, the same slice every step,
/// or the step's block of a per-step vector.
fn step_weights(weights: Option<&[f64]>, length: usize, steps: usize, s: usize) -> Vec<f64> {
    match weights {
        Some(w) if w.len() == length => w.to_vec(),
        Some(w) if w.len() == length * steps => w[s * length..(s + 1) * length].to_vec(),
        Some(w) => {
            warn!(len = w.len(), length, "gradient vector length mismatch, using ones");
            vec![1.0; length]
        }
        None => vec![1.0; length],
    }
}

//! Time-marching driver: group kinematics, linear solve, force integration.

use rayon::prelude::*;
use tracing::{debug, info};
use vsp_core::{Scalar, Vec3};
use vsp_groups::{ComponentGroup, ForceKind, GroupReference};

use crate::error::{SolverError, SolverResult};
use crate::flow::{FlowConditions, FlowParams, ReferenceGeometry};
use crate::mesh::Mesh;
use crate::model::{AeroModel, Coefficients, GroupFrame, Loads};

/// Analysis options shared by every run case.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverSettings {
    pub reference: ReferenceGeometry,
    /// Trailing-wake length; zero means semi-infinite
    pub far_dist: f64,
    pub unsteady: bool,
    pub time_step: f64,
    pub number_of_time_steps: usize,
    /// Steps at or after this time are sampled into averages and objectives
    pub start_averaging_time: f64,
    pub number_of_threads: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            reference: ReferenceGeometry::default(),
            far_dist: 0.0,
            unsteady: false,
            time_step: 0.01,
            number_of_time_steps: 0,
            start_averaging_time: 0.0,
            number_of_threads: 1,
        }
    }
}

impl SolverSettings {
    pub fn validate(&self) -> SolverResult<()> {
        self.reference.validate()?;
        if self.number_of_threads == 0 {
            return Err(SolverError::InvalidArg {
                what: "NumberOfThreads must be at least 1".to_string(),
            });
        }
        if self.far_dist < 0.0 || !self.far_dist.is_finite() {
            return Err(SolverError::InvalidArg {
                what: format!("FarDist must be finite and non-negative, got {}", self.far_dist),
            });
        }
        if self.unsteady {
            if !(self.time_step > 0.0) {
                return Err(SolverError::InvalidArg {
                    what: format!("TimeStep must be positive, got {}", self.time_step),
                });
            }
            if self.number_of_time_steps == 0 {
                return Err(SolverError::InvalidArg {
                    what: "NumberOfTimeSteps must be at least 1".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Integrated vehicle coefficients of one step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VehicleCoefficients {
    pub cl: f64,
    pub cd: f64,
    pub cs: f64,
    /// Viscous part of CD
    pub cdo: f64,
    pub force: [f64; 3],
    pub moment: [f64; 3],
}

impl VehicleCoefficients {
    fn from_model(model: &AeroModel<f64>, c: &Coefficients<f64>) -> Self {
        let (cl, cd, cs) = model.wind_components(c.total_force());
        let (_, cdo, _) = model.wind_components(c.viscous.force);
        Self {
            cl,
            cd,
            cs,
            cdo,
            force: c.total_force().value(),
            moment: c.total_moment().value(),
        }
    }
}

/// Everything needed to rebuild the model of one solved step.
#[derive(Clone, Debug)]
pub struct StepState {
    pub index: usize,
    pub time: f64,
    pub sampled: bool,
    pub frames: Vec<GroupFrame>,
    pub gamma: Vec<f64>,
    pub vehicle: VehicleCoefficients,
}

/// Solved time history of one run case.
#[derive(Clone, Debug)]
pub struct CaseHistory {
    pub flow: FlowConditions,
    pub steps: Vec<StepState>,
    /// Group state after the last step
    pub groups: Vec<ComponentGroup>,
}

impl CaseHistory {
    pub fn sampled(&self) -> impl Iterator<Item = &StepState> {
        self.steps.iter().filter(|s| s.sampled)
    }

    pub fn number_of_sampled_steps(&self) -> usize {
        self.sampled().count()
    }

    /// `i`-th sampled step.
    pub fn sampled_step(&self, i: usize) -> Option<&StepState> {
        self.sampled().nth(i)
    }

    pub fn last(&self) -> Option<&StepState> {
        self.steps.last()
    }
}

/// Owns the mesh and the component groups and marches a run case.
#[derive(Clone, Debug)]
pub struct VspSolver {
    mesh: Mesh,
    initial_groups: Vec<ComponentGroup>,
    groups: Vec<ComponentGroup>,
    settings: SolverSettings,
}

impl VspSolver {
    pub fn new(mesh: Mesh, groups: Vec<ComponentGroup>, settings: SolverSettings) -> SolverResult<Self> {
        mesh.validate()?;
        settings.validate()?;
        Ok(Self {
            mesh,
            groups: groups.clone(),
            initial_groups: groups,
            settings,
        })
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SolverSettings {
        &mut self.settings
    }

    /// Groups as left by the last solve.
    pub fn groups(&self) -> &[ComponentGroup] {
        &self.groups
    }

    pub fn set_groups(&mut self, groups: Vec<ComponentGroup>) {
        self.groups = groups.clone();
        self.initial_groups = groups;
    }

    /// Replace node coordinates (flat, 3 per node).
    pub fn update_geometry(&mut self, xyz: &[f64]) -> SolverResult<()> {
        self.mesh.set_coordinates(xyz)
    }

    /// Build the model over any scalar from explicit coordinates and flow.
    pub fn model_for<T: Scalar>(
        &self,
        xyz: &[T],
        frames: &[GroupFrame],
        flow: FlowParams<T>,
    ) -> SolverResult<AeroModel<T>> {
        AeroModel::new(
            &self.mesh,
            xyz,
            frames,
            flow,
            &self.settings.reference,
            self.settings.far_dist,
        )
    }

    /// Rebuild the plain model of a solved step.
    pub fn model_at(&self, flow: &FlowConditions, step: &StepState) -> SolverResult<AeroModel<f64>> {
        self.model_for(&self.mesh.coordinates(), &step.frames, flow.params())
    }

    pub fn thread_pool(&self) -> SolverResult<rayon::ThreadPool> {
        Ok(rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.number_of_threads)
            .build()?)
    }

    /// Solve one run case inside a pool of `number_of_threads` workers.
    pub fn solve(&mut self, flow: &FlowConditions) -> SolverResult<CaseHistory> {
        flow.validate()?;
        self.settings.validate()?;
        let pool = self.thread_pool()?;
        // workers log through this thread's subscriber
        let dispatch = tracing::dispatcher::get_default(|d| d.clone());
        pool.install(|| tracing::dispatcher::with_default(&dispatch, || self.march(flow)))
    }

    fn march(&mut self, flow: &FlowConditions) -> SolverResult<CaseHistory> {
        info!(
            mach = flow.mach,
            alpha = flow.alpha_deg,
            beta = flow.beta_deg,
            unsteady = self.settings.unsteady,
            loops = self.mesh.number_of_loops(),
            "solving case"
        );

        self.groups = self.initial_groups.clone();
        for group in &mut self.groups {
            group.reference = GroupReference {
                density: flow.density,
                vref: flow.vinf,
                sref: self.settings.reference.sref,
                bref: self.settings.reference.bref,
                cref: self.settings.reference.cref,
                alpha_deg: flow.alpha_deg,
                beta_deg: flow.beta_deg,
            };
            group.start_averaging_time = self.settings.start_averaging_time;
            let n = self.mesh.surfaces_of_components(group.components()).len();
            group.size_span_loading_list(n);
            group.zero_average_forces_and_moments();
        }

        let mut steps = Vec::new();
        if self.settings.unsteady {
            let dt = self.settings.time_step;
            for k in 1..=self.settings.number_of_time_steps {
                let t = k as f64 * dt;
                for group in &mut self.groups {
                    group.update(dt, t)?;
                }
                let sampled = t >= self.settings.start_averaging_time - 0.5 * dt;
                steps.push(self.step(flow, k, t, sampled)?);
            }
            if !steps.iter().any(|s| s.sampled) {
                if let Some(last) = steps.last_mut() {
                    last.sampled = true;
                }
            }
        } else {
            for group in &mut self.groups {
                group.update_steady();
            }
            steps.push(self.step(flow, 0, 0.0, true)?);
        }

        if let Some(last) = steps.last() {
            info!(
                cl = last.vehicle.cl,
                cd = last.vehicle.cd,
                cmy = last.vehicle.moment[1],
                steps = steps.len(),
                "case solved"
            );
        }

        Ok(CaseHistory {
            flow: flow.clone(),
            steps,
            groups: self.groups.clone(),
        })
    }

    fn step(&mut self, flow: &FlowConditions, index: usize, t: f64, sampled: bool) -> SolverResult<StepState> {
        let frames: Vec<GroupFrame> = self.groups.iter().map(GroupFrame::from_group).collect();
        let model = self.model_for(&self.mesh.coordinates(), &frames, flow.params())?;
        let gamma = model.solve()?;
        let loads = model.loads(&gamma);
        let vehicle = VehicleCoefficients::from_model(&model, &model.vehicle_coefficients(&loads));

        let per_group: Vec<Coefficients<f64>> = (0..self.groups.len())
            .into_par_iter()
            .map(|g| model.group_coefficients(&loads, g))
            .collect();

        for (group, c) in self.groups.iter_mut().zip(per_group) {
            group.set_instant_forces(
                ForceKind::Inviscid,
                c.inviscid.force.value(),
                c.inviscid.moment.value(),
            );
            group.set_instant_forces(
                ForceKind::Viscous,
                c.viscous.force.value(),
                c.viscous.moment.value(),
            );
            group.calculate_forces_and_moments();
            fill_span_loads(group, &self.mesh, &model, &loads)?;

            if t >= group.start_averaging_time - 0.5 * self.settings.time_step || !self.settings.unsteady {
                group.update_average_forces_and_moments();
                group.calculate_average_forces_and_moments();
            }
        }

        debug!(step = index, t, cl = vehicle.cl, cd = vehicle.cd, "step solved");

        Ok(StepState {
            index,
            time: t,
            sampled,
            frames,
            gamma,
            vehicle,
        })
    }
}

fn fill_span_loads(
    group: &mut ComponentGroup,
    mesh: &Mesh,
    model: &AeroModel<f64>,
    loads: &Loads<f64>,
) -> SolverResult<()> {
    let surfaces = mesh.surfaces_of_components(group.components());
    for (i, surface) in surfaces.into_iter().enumerate() {
        let strips = model.strip_loads(loads, surface);
        let data = group.span_load_mut(i)?;
        data.size(strips.len());
        for (k, s) in strips.iter().enumerate() {
            let (cl, cd, cs, c): (f64, f64, f64, Vec3<f64>) = model.strip_coefficients(s);
            data.station[k] = s.station;
            data.chord[k] = s.chord;
            data.area[k] = s.area;
            data.cl[k] = cl;
            data.cd[k] = cd;
            data.cs[k] = cs;
            data.cx[k] = c.x;
            data.cy[k] = c.y;
            data.cz[k] = c.z;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::WingBuilder;

    fn wing() -> Mesh {
        WingBuilder {
            n_span: 6,
            n_chord: 2,
            ..WingBuilder::default()
        }
        .build()
        .unwrap()
    }

    #[test]
    fn steady_case_records_one_sampled_step() {
        let mut g = ComponentGroup::new("wing");
        g.set_components(vec![0]);
        let mut solver = VspSolver::new(wing(), vec![g], SolverSettings::default()).unwrap();
        let flow = FlowConditions {
            alpha_deg: 2.0,
            ..FlowConditions::default()
        };
        let history = solver.solve(&flow).unwrap();
        assert_eq!(history.steps.len(), 1);
        assert_eq!(history.number_of_sampled_steps(), 1);
        assert!(history.steps[0].vehicle.cl > 0.0);

        let group = &solver.groups()[0];
        assert_eq!(group.number_of_lifting_surfaces(), 1);
        assert_eq!(group.span_load(0).unwrap().number_of_stations(), 6);
        // the only group carries the whole vehicle load
        let cz = group.coefficients(ForceKind::Inviscid).cz.instant;
        assert!((cz - history.steps[0].vehicle.force[2]).abs() < 1e-12);
    }

    #[test]
    fn unsteady_case_samples_after_averaging_time() {
        let settings = SolverSettings {
            unsteady: true,
            time_step: 0.1,
            number_of_time_steps: 5,
            start_averaging_time: 0.3,
            ..SolverSettings::default()
        };
        let mut solver = VspSolver::new(wing(), Vec::new(), settings).unwrap();
        let history = solver.solve(&FlowConditions::default()).unwrap();
        assert_eq!(history.steps.len(), 5);
        let times: Vec<f64> = history.sampled().map(|s| s.time).collect();
        assert_eq!(times.len(), 3);
        assert!((times[0] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn supersonic_case_is_rejected() {
        let mut solver = VspSolver::new(wing(), Vec::new(), SolverSettings::default()).unwrap();
        let flow = FlowConditions {
            mach: 1.5,
            ..FlowConditions::default()
        };
        assert!(matches!(solver.solve(&flow), Err(SolverError::Supersonic { .. })));
    }

    #[test]
    fn zero_threads_is_rejected() {
        let settings = SolverSettings {
            number_of_threads: 0,
            ..SolverSettings::default()
        };
        assert!(VspSolver::new(wing(), Vec::new(), settings).is_err());
    }
}

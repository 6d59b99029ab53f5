//! Result data types.

use serde::{Deserialize, Serialize};
use vsp_groups::{ComponentGroup, ForceKind, Slot};
use vsp_solver::{CaseHistory, StepState};

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub case_name: String,
    pub timestamp: String,
    pub run_type: RunType,
    pub solver_version: String,
    pub run_cases: Vec<RunCaseSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum RunType {
    Steady,
    Unsteady {
        time_step: f64,
        steps: usize,
        start_averaging_time: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunCaseSummary {
    pub mach: f64,
    pub alpha_deg: f64,
    pub beta_deg: f64,
    pub re_cref: f64,
    /// Mean vehicle coefficients over the sampled steps
    pub cl: f64,
    pub cd: f64,
    pub cs: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupSummary>,
}

/// Time-averaged group coefficients, inviscid plus viscous.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupSummary {
    pub name: String,
    pub cl: f64,
    pub cd: f64,
    pub cs: f64,
    pub thrust: f64,
    pub power: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fom: Option<f64>,
}

/// One solved time step of one run case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepRecord {
    pub run_case: usize,
    pub step: usize,
    pub time: f64,
    pub sampled: bool,
    pub cl: f64,
    pub cd: f64,
    pub cs: f64,
    pub cdo: f64,
    pub force: [f64; 3],
    pub moment: [f64; 3],
}

impl StepRecord {
    pub fn from_step(run_case: usize, step: &StepState) -> Self {
        let v = &step.vehicle;
        Self {
            run_case,
            step: step.index,
            time: step.time,
            sampled: step.sampled,
            cl: v.cl,
            cd: v.cd,
            cs: v.cs,
            cdo: v.cdo,
            force: v.force,
            moment: v.moment,
        }
    }
}

impl GroupSummary {
    pub fn from_group(group: &ComponentGroup) -> Self {
        let both = |f: fn(&vsp_groups::CoefficientSet) -> f64| {
            f(group.coefficients(ForceKind::Inviscid)) + f(group.coefficients(ForceKind::Viscous))
        };
        let rotor = group.is_rotor;
        Self {
            name: group.name.clone(),
            cl: both(|c| c.cl.average),
            cd: both(|c| c.cd.average),
            cs: both(|c| c.cs.average),
            thrust: group.thrust(Slot::Average),
            power: group.power(Slot::Average),
            ct: rotor.then(|| both(|c| c.ct.average)),
            cp: rotor.then(|| both(|c| c.cp.average)),
            fom: rotor.then_some(group.fom.average),
        }
    }
}

impl RunCaseSummary {
    pub fn from_history(history: &CaseHistory) -> Self {
        let n = history.number_of_sampled_steps().max(1) as f64;
        let mean = |f: fn(&StepState) -> f64| history.sampled().map(f).sum::<f64>() / n;
        Self {
            mach: history.flow.mach,
            alpha_deg: history.flow.alpha_deg,
            beta_deg: history.flow.beta_deg,
            re_cref: history.flow.re_cref,
            cl: mean(|s| s.vehicle.cl),
            cd: mean(|s| s.vehicle.cd),
            cs: mean(|s| s.vehicle.cs),
            groups: history.groups.iter().map(GroupSummary::from_group).collect(),
        }
    }
}

/// Every step of every run case, run case major.
pub fn records_from_histories(histories: &[CaseHistory]) -> Vec<StepRecord> {
    histories
        .iter()
        .enumerate()
        .flat_map(|(c, h)| h.steps.iter().map(move |s| StepRecord::from_step(c, s)))
        .collect()
}

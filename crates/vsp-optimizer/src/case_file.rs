//! Case-definition file: free-stream sweep, reference geometry and
//! optimization functions.
//!
//! The file is line oriented, one `Key = value` per line, `#` starts a
//! comment. Sweep keys (`Mach`, `AoA`, `Beta`, `ReCref`) take comma-separated
//! lists; a single value is broadcast over the longest list. Every
//! `Objective = KIND[, set[, case]]` line appends one optimization function.
//!
//! ```text
//! Sref = 6
//! Cref = 1
//! Bref = 6
//! Mach = 0.2, 0.4
//! AoA = 2
//! Mesh = wing.vspmesh
//! Objective = CL
//! Objective = WING_LOAD, 0, 1
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vsp_core::ArrayOffset;
use vsp_solver::{FlowConditions, Objective, OptimizationFunction, ReferenceGeometry, SolverSettings};

use crate::error::{OptimizerError, OptimizerResult};

pub const MAX_RUN_CASES: usize = 10;
pub const MAX_OPTIMIZATION_FUNCTIONS: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectiveDef {
    /// Function label, e.g. `CL` or `ROTOR_CT`
    pub function: String,
    /// Group index for rotor functions, surface id for spanwise functions
    #[serde(default)]
    pub set: usize,
    /// Run case the function is evaluated on
    #[serde(default)]
    pub case: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaseConfig {
    pub sref: f64,
    pub cref: f64,
    pub bref: f64,
    pub cg: [f64; 3],

    pub mach: Vec<f64>,
    pub alpha_deg: Vec<f64>,
    pub beta_deg: Vec<f64>,
    pub re_cref: Vec<f64>,

    pub vinf: f64,
    pub density: f64,
    pub rates: [f64; 3],

    pub far_dist: f64,
    pub number_of_threads: usize,
    pub unsteady: bool,
    pub time_step: f64,
    pub number_of_time_steps: usize,
    pub start_averaging_time: f64,

    pub cl_target: f64,
    pub array_offset: ArrayOffset,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_file: Option<PathBuf>,

    pub objectives: Vec<ObjectiveDef>,
}

impl Default for CaseConfig {
    fn default() -> Self {
        let flow = FlowConditions::default();
        let settings = SolverSettings::default();
        Self {
            sref: 1.0,
            cref: 1.0,
            bref: 1.0,
            cg: [0.0; 3],
            mach: vec![flow.mach],
            alpha_deg: vec![flow.alpha_deg],
            beta_deg: vec![flow.beta_deg],
            re_cref: vec![flow.re_cref],
            vinf: flow.vinf,
            density: flow.density,
            rates: flow.rates,
            far_dist: settings.far_dist,
            number_of_threads: settings.number_of_threads,
            unsteady: settings.unsteady,
            time_step: settings.time_step,
            number_of_time_steps: settings.number_of_time_steps,
            start_averaging_time: settings.start_averaging_time,
            cl_target: 0.0,
            array_offset: ArrayOffset::ZeroBased,
            mesh: None,
            group_file: None,
            objectives: Vec::new(),
        }
    }
}

fn parse_f64(line: usize, key: &str, s: &str) -> OptimizerResult<f64> {
    s.trim().parse::<f64>().map_err(|_| OptimizerError::CaseFile {
        line,
        what: format!("{key}: '{}' is not a number", s.trim()),
    })
}

fn parse_usize(line: usize, key: &str, s: &str) -> OptimizerResult<usize> {
    s.trim().parse::<usize>().map_err(|_| OptimizerError::CaseFile {
        line,
        what: format!("{key}: '{}' is not a non-negative integer", s.trim()),
    })
}

fn parse_list(line: usize, key: &str, s: &str) -> OptimizerResult<Vec<f64>> {
    let values = s
        .split(',')
        .map(|v| parse_f64(line, key, v))
        .collect::<OptimizerResult<Vec<_>>>()?;
    if values.len() > MAX_RUN_CASES {
        return Err(OptimizerError::Capacity {
            what: "run cases",
            count: values.len(),
            limit: MAX_RUN_CASES,
        });
    }
    Ok(values)
}

fn parse_flag(line: usize, key: &str, s: &str) -> OptimizerResult<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(OptimizerError::CaseFile {
            line,
            what: format!("{key}: '{other}' is not a flag"),
        }),
    }
}

impl CaseConfig {
    /// Parse the line format. Relative paths are kept as written.
    pub fn parse(text: &str) -> OptimizerResult<Self> {
        let mut cfg = Self::default();
        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let content = raw.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }
            let Some((key, value)) = content.split_once('=') else {
                return Err(OptimizerError::CaseFile {
                    line,
                    what: format!("expected 'Key = value', got '{content}'"),
                });
            };
            let (key, value) = (key.trim(), value.trim());
            match key.to_ascii_lowercase().as_str() {
                "sref" => cfg.sref = parse_f64(line, key, value)?,
                "cref" => cfg.cref = parse_f64(line, key, value)?,
                "bref" => cfg.bref = parse_f64(line, key, value)?,
                "x_cg" | "xcg" => cfg.cg[0] = parse_f64(line, key, value)?,
                "y_cg" | "ycg" => cfg.cg[1] = parse_f64(line, key, value)?,
                "z_cg" | "zcg" => cfg.cg[2] = parse_f64(line, key, value)?,
                "mach" => cfg.mach = parse_list(line, key, value)?,
                "aoa" | "alpha" => cfg.alpha_deg = parse_list(line, key, value)?,
                "beta" => cfg.beta_deg = parse_list(line, key, value)?,
                "recref" => cfg.re_cref = parse_list(line, key, value)?,
                "vinf" => cfg.vinf = parse_f64(line, key, value)?,
                "rho" | "density" => cfg.density = parse_f64(line, key, value)?,
                "rollrate" => cfg.rates[0] = parse_f64(line, key, value)?,
                "pitchrate" => cfg.rates[1] = parse_f64(line, key, value)?,
                "yawrate" => cfg.rates[2] = parse_f64(line, key, value)?,
                "fardist" => cfg.far_dist = parse_f64(line, key, value)?,
                "numberofthreads" => cfg.number_of_threads = parse_usize(line, key, value)?,
                "unsteady" => cfg.unsteady = parse_flag(line, key, value)?,
                "timestep" => cfg.time_step = parse_f64(line, key, value)?,
                "numberoftimesteps" => cfg.number_of_time_steps = parse_usize(line, key, value)?,
                "startaveragingtime" => cfg.start_averaging_time = parse_f64(line, key, value)?,
                "cltarget" => cfg.cl_target = parse_f64(line, key, value)?,
                "arrayoffset" => {
                    cfg.array_offset = match parse_usize(line, key, value)? {
                        0 => ArrayOffset::ZeroBased,
                        1 => ArrayOffset::OneBased,
                        n => {
                            return Err(OptimizerError::CaseFile {
                                line,
                                what: format!("ArrayOffset must be 0 or 1, got {n}"),
                            });
                        }
                    }
                }
                "mesh" => cfg.mesh = Some(PathBuf::from(value)),
                "groupfile" => cfg.group_file = Some(PathBuf::from(value)),
                "objective" => {
                    if cfg.objectives.len() == MAX_OPTIMIZATION_FUNCTIONS {
                        return Err(OptimizerError::Capacity {
                            what: "optimization functions",
                            count: MAX_OPTIMIZATION_FUNCTIONS + 1,
                            limit: MAX_OPTIMIZATION_FUNCTIONS,
                        });
                    }
                    let mut parts = value.split(',');
                    let function = parts.next().unwrap_or("").trim();
                    OptimizationFunction::parse(function).map_err(|e| OptimizerError::CaseFile {
                        line,
                        what: e.to_string(),
                    })?;
                    let set = parts.next().map(|s| parse_usize(line, key, s)).transpose()?;
                    let case = parts.next().map(|s| parse_usize(line, key, s)).transpose()?;
                    cfg.objectives.push(ObjectiveDef {
                        function: function.to_ascii_uppercase(),
                        set: set.unwrap_or(0),
                        case: case.unwrap_or(0),
                    });
                }
                _ => {
                    return Err(OptimizerError::CaseFile {
                        line,
                        what: format!("unknown key '{key}'"),
                    });
                }
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read a case file; `Mesh` and `GroupFile` are resolved against the
    /// file's directory.
    pub fn read(path: &Path) -> OptimizerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| OptimizerError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cfg = Self::parse(&text)?;
        let base = path.parent().unwrap_or(Path::new(""));
        for p in [&mut cfg.mesh, &mut cfg.group_file].into_iter().flatten() {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        }
        Ok(cfg)
    }

    pub fn to_yaml(&self) -> OptimizerResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(text: &str) -> OptimizerResult<Self> {
        let cfg: Self = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn number_of_run_cases(&self) -> usize {
        [&self.mach, &self.alpha_deg, &self.beta_deg, &self.re_cref]
            .iter()
            .map(|v| v.len())
            .max()
            .unwrap_or(0)
    }

    pub fn validate(&self) -> OptimizerResult<()> {
        let n = self.number_of_run_cases();
        if n == 0 {
            return Err(OptimizerError::Config("no run cases defined".to_string()));
        }
        if n > MAX_RUN_CASES {
            return Err(OptimizerError::Capacity {
                what: "run cases",
                count: n,
                limit: MAX_RUN_CASES,
            });
        }
        for (name, list) in [
            ("Mach", &self.mach),
            ("AoA", &self.alpha_deg),
            ("Beta", &self.beta_deg),
            ("ReCref", &self.re_cref),
        ] {
            if list.len() != 1 && list.len() != n {
                return Err(OptimizerError::Config(format!(
                    "{name} has {} values, expected 1 or {n}",
                    list.len()
                )));
            }
        }
        if self.objectives.len() > MAX_OPTIMIZATION_FUNCTIONS {
            return Err(OptimizerError::Capacity {
                what: "optimization functions",
                count: self.objectives.len(),
                limit: MAX_OPTIMIZATION_FUNCTIONS,
            });
        }
        for def in &self.objectives {
            if def.case >= n {
                return Err(OptimizerError::Config(format!(
                    "objective {} refers to run case {}, only {n} defined",
                    def.function, def.case
                )));
            }
        }
        self.reference()
            .validate()
            .map_err(|e| OptimizerError::Config(e.to_string()))?;
        for flow in self.run_cases() {
            flow.validate()
                .map_err(|e| OptimizerError::Config(e.to_string()))?;
        }
        self.settings()
            .validate()
            .map_err(|e| OptimizerError::Config(e.to_string()))?;
        Ok(())
    }

    pub fn reference(&self) -> ReferenceGeometry {
        ReferenceGeometry {
            sref: self.sref,
            cref: self.cref,
            bref: self.bref,
            cg: self.cg,
        }
    }

    pub fn settings(&self) -> SolverSettings {
        SolverSettings {
            reference: self.reference(),
            far_dist: self.far_dist,
            unsteady: self.unsteady,
            time_step: self.time_step,
            number_of_time_steps: self.number_of_time_steps,
            start_averaging_time: self.start_averaging_time,
            number_of_threads: self.number_of_threads,
        }
    }

    /// Free-stream state of every run case, broadcasting single values.
    pub fn run_cases(&self) -> Vec<FlowConditions> {
        let pick = |v: &[f64], i: usize| v.get(i).or(v.first()).copied().unwrap_or(0.0);
        (0..self.number_of_run_cases())
            .map(|i| FlowConditions {
                mach: pick(&self.mach, i),
                alpha_deg: pick(&self.alpha_deg, i),
                beta_deg: pick(&self.beta_deg, i),
                vinf: self.vinf,
                density: self.density,
                re_cref: pick(&self.re_cref, i),
                rates: self.rates,
            })
            .collect()
    }

    /// Resolved optimization functions with their run case.
    pub fn objectives(&self) -> OptimizerResult<Vec<(Objective, usize)>> {
        self.objectives
            .iter()
            .map(|def| {
                let function = OptimizationFunction::parse(&def.function)?;
                let mut objective = Objective::new(function, def.set);
                objective.cl_target = self.cl_target;
                Ok((objective, def.case))
            })
            .collect()
    }
}

//! Objective functions evaluated on a solved model.

use std::f64::consts::PI;
use std::fmt;
use vsp_core::Scalar;

use crate::error::{SolverError, SolverResult};
use crate::model::{AeroModel, Loads};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OptimizationFunction {
    Cl,
    Cd,
    Cs,
    Cmx,
    Cmy,
    Cmz,
    /// Trim: `[CD, CL - CLTarget, CMy]`
    CdClCm,
    RotorCt,
    RotorCp,
    /// Sectional lift coefficient along the span of one surface
    WingLoad,
    /// Linear-system residual, one entry per loop
    Residual,
    WingCx,
    WingCy,
    WingCz,
}

impl OptimizationFunction {
    pub const ALL: [OptimizationFunction; 14] = [
        OptimizationFunction::Cl,
        OptimizationFunction::Cd,
        OptimizationFunction::Cs,
        OptimizationFunction::Cmx,
        OptimizationFunction::Cmy,
        OptimizationFunction::Cmz,
        OptimizationFunction::CdClCm,
        OptimizationFunction::RotorCt,
        OptimizationFunction::RotorCp,
        OptimizationFunction::WingLoad,
        OptimizationFunction::Residual,
        OptimizationFunction::WingCx,
        OptimizationFunction::WingCy,
        OptimizationFunction::WingCz,
    ];

    pub fn label(self) -> &'static str {
        match self {
            OptimizationFunction::Cl => "CL",
            OptimizationFunction::Cd => "CD",
            OptimizationFunction::Cs => "CS",
            OptimizationFunction::Cmx => "CMx",
            OptimizationFunction::Cmy => "CMy",
            OptimizationFunction::Cmz => "CMz",
            OptimizationFunction::CdClCm => "CD_CL_CM",
            OptimizationFunction::RotorCt => "ROTOR_CT",
            OptimizationFunction::RotorCp => "ROTOR_CP",
            OptimizationFunction::WingLoad => "WING_LOAD",
            OptimizationFunction::Residual => "RESIDUAL",
            OptimizationFunction::WingCx => "WING_CX",
            OptimizationFunction::WingCy => "WING_CY",
            OptimizationFunction::WingCz => "WING_CZ",
        }
    }

    /// Parse a label, with or without an `OPT_` prefix, ignoring case.
    pub fn parse(s: &str) -> SolverResult<Self> {
        let s = s.trim();
        let bare = s
            .get(..4)
            .filter(|p| p.eq_ignore_ascii_case("OPT_"))
            .map_or(s, |_| &s[4..]);
        Self::ALL
            .into_iter()
            .find(|f| f.label().eq_ignore_ascii_case(bare))
            .ok_or_else(|| SolverError::InvalidArg {
                what: format!("unknown optimization function '{s}'"),
            })
    }

    /// True for functions whose value is a single number per time step.
    pub fn is_scalar(self) -> bool {
        !matches!(
            self,
            OptimizationFunction::CdClCm
                | OptimizationFunction::WingLoad
                | OptimizationFunction::Residual
                | OptimizationFunction::WingCx
                | OptimizationFunction::WingCy
                | OptimizationFunction::WingCz
        )
    }

    fn uses_surface(self) -> bool {
        matches!(
            self,
            OptimizationFunction::WingLoad
                | OptimizationFunction::WingCx
                | OptimizationFunction::WingCy
                | OptimizationFunction::WingCz
        )
    }
}

impl fmt::Display for OptimizationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One optimization function bound to its analysis set.
///
/// `set` is the group index for rotor functions and the surface id for
/// spanwise functions; other functions ignore it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Objective {
    pub function: OptimizationFunction,
    pub set: usize,
    pub cl_target: f64,
}

impl Objective {
    pub fn new(function: OptimizationFunction, set: usize) -> Self {
        Self {
            function,
            set,
            cl_target: 0.0,
        }
    }

    /// Number of values per time step on `model`.
    pub fn length<T: Scalar>(&self, model: &AeroModel<T>) -> usize {
        match self.function {
            OptimizationFunction::CdClCm => 3,
            OptimizationFunction::Residual => model.size(),
            f if f.uses_surface() => model
                .panels
                .iter()
                .filter(|p| p.surface == self.set)
                .map(|p| p.strip + 1)
                .max()
                .unwrap_or(0),
            _ => 1,
        }
    }

    /// Check that the analysis set exists on `model`.
    pub fn validate<T: Scalar>(&self, model: &AeroModel<T>) -> SolverResult<()> {
        match self.function {
            OptimizationFunction::RotorCt | OptimizationFunction::RotorCp => {
                match model.frames.get(self.set) {
                    Some(f) if f.is_rotor => Ok(()),
                    Some(_) => Err(SolverError::InvalidArg {
                        what: format!("group {} is not a rotor", self.set),
                    }),
                    None => Err(SolverError::InvalidArg {
                        what: format!("no group {} for {}", self.set, self.function),
                    }),
                }
            }
            f if f.uses_surface() && self.length(model) == 0 => Err(SolverError::InvalidArg {
                what: format!("no surface {} for {}", self.set, self.function),
            }),
            _ => Ok(()),
        }
    }

    /// Evaluate the function for circulation `gamma`.
    pub fn evaluate<T: Scalar>(&self, model: &AeroModel<T>, gamma: &[T]) -> Vec<T> {
        if self.function == OptimizationFunction::Residual {
            return model.residual(gamma);
        }
        let loads = model.loads(gamma);
        self.evaluate_loads(model, gamma, &loads)
    }

    fn evaluate_loads<T: Scalar>(&self, model: &AeroModel<T>, gamma: &[T], loads: &Loads<T>) -> Vec<T> {
        let vehicle = || model.vehicle_coefficients(loads);
        match self.function {
            OptimizationFunction::Cl => vec![model.wind_components(vehicle().total_force()).0],
            OptimizationFunction::Cd => vec![model.wind_components(vehicle().total_force()).1],
            OptimizationFunction::Cs => vec![model.wind_components(vehicle().total_force()).2],
            OptimizationFunction::Cmx => vec![vehicle().total_moment().x],
            OptimizationFunction::Cmy => vec![vehicle().total_moment().y],
            OptimizationFunction::Cmz => vec![vehicle().total_moment().z],
            OptimizationFunction::CdClCm => {
                let c = vehicle();
                let (cl, cd, _) = model.wind_components(c.total_force());
                vec![cd, cl - self.cl_target, c.total_moment().y]
            }
            OptimizationFunction::RotorCt => vec![self.rotor(model, loads).0],
            OptimizationFunction::RotorCp => vec![self.rotor(model, loads).1],
            OptimizationFunction::Residual => model.residual(gamma),
            f => model
                .strip_loads(loads, self.set)
                .iter()
                .map(|s| {
                    let (cl, _, _, c) = model.strip_coefficients(s);
                    match f {
                        OptimizationFunction::WingCx => c.x,
                        OptimizationFunction::WingCy => c.y,
                        OptimizationFunction::WingCz => c.z,
                        _ => cl,
                    }
                })
                .collect(),
        }
    }

    /// Propeller-convention thrust and power coefficients of the rotor group.
    fn rotor<T: Scalar>(&self, model: &AeroModel<T>, loads: &Loads<T>) -> (T, T) {
        let zero = T::lit(0.0);
        let Some(frame) = model.frames.get(self.set) else {
            return (zero, zero);
        };
        let n = frame.omega.abs() / (2.0 * PI);
        let d = frame.rotor_diameter.abs();
        if n == 0.0 || d == 0.0 {
            return (zero, zero);
        }
        let c = model.group_coefficients(loads, self.set);
        let axis = frame.unit_axis();
        let qs = model.flow.dynamic_pressure() * model.reference.sref;
        let thrust = c.total_force().dot_f64(axis) * qs;
        let moment = c.total_moment().dot_f64(axis) * qs * model.reference.cref;
        let power = -moment * frame.omega;
        let rho = model.flow.density;
        let ct = thrust / (rho * (n * n * d.powi(4)));
        let cp = power / (rho * (n.powi(3) * d.powi(5)));
        (ct, cp)
    }
}

/// Contract an objective value with a weight vector.
pub fn weighted<T: Scalar>(values: &[T], weights: &[f64]) -> T {
    values
        .iter()
        .zip(weights)
        .fold(T::lit(0.0), |acc, (v, w)| acc + *v * *w)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_prefix_and_case() {
        assert_eq!(
            OptimizationFunction::parse("OPT_CD_CL_CM").unwrap(),
            OptimizationFunction::CdClCm
        );
        assert_eq!(OptimizationFunction::parse("cmy").unwrap(), OptimizationFunction::Cmy);
        assert!(OptimizationFunction::parse("CQ").is_err());
    }

    #[test]
    fn labels_roundtrip() {
        for f in OptimizationFunction::ALL {
            assert_eq!(OptimizationFunction::parse(f.label()).unwrap(), f);
        }
    }

    #[test]
    fn scalar_classification() {
        assert!(OptimizationFunction::Cl.is_scalar());
        assert!(OptimizationFunction::RotorCp.is_scalar());
        assert!(!OptimizationFunction::WingLoad.is_scalar());
        assert!(!OptimizationFunction::CdClCm.is_scalar());
    }

    #[test]
    fn weights_contract_values() {
        assert_eq!(weighted(&[1.0, 2.0, 3.0], &[1.0, 0.5, 0.0]), 2.0);
    }
}

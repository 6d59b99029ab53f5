//! Free-stream conditions, reference geometry and differentiable inputs.

use num_dual::Dual64;
use std::f64::consts::PI;
use vsp_core::{Scalar, Vec3};

use crate::error::{SolverError, SolverResult};

/// Reference quantities used to non-dimensionalise loads.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceGeometry {
    pub sref: f64,
    pub cref: f64,
    pub bref: f64,
    /// Moment reference point
    pub cg: [f64; 3],
}

impl Default for ReferenceGeometry {
    fn default() -> Self {
        Self {
            sref: 1.0,
            cref: 1.0,
            bref: 1.0,
            cg: [0.0; 3],
        }
    }
}

impl ReferenceGeometry {
    pub fn validate(&self) -> SolverResult<()> {
        if !(self.sref > 0.0) || !(self.cref > 0.0) || !(self.bref > 0.0) {
            return Err(SolverError::InvalidArg {
                what: "Sref, Cref and Bref must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Free-stream state of one run case.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowConditions {
    pub mach: f64,
    pub alpha_deg: f64,
    pub beta_deg: f64,
    pub vinf: f64,
    pub density: f64,
    /// Reynolds number on Cref; zero disables the skin-friction estimate
    pub re_cref: f64,
    /// Body rates p, q, r (rad/s)
    pub rates: [f64; 3],
}

impl Default for FlowConditions {
    fn default() -> Self {
        Self {
            mach: 0.0,
            alpha_deg: 0.0,
            beta_deg: 0.0,
            vinf: 100.0,
            density: 1.225,
            re_cref: 0.0,
            rates: [0.0; 3],
        }
    }
}

/// Scalar inputs the objectives can be differentiated against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputVariable {
    Alpha,
    Beta,
    Mach,
    Vinf,
    Density,
    ReCref,
    RollRate,
    PitchRate,
    YawRate,
}

impl InputVariable {
    pub const ALL: [InputVariable; 9] = [
        InputVariable::Alpha,
        InputVariable::Beta,
        InputVariable::Mach,
        InputVariable::Vinf,
        InputVariable::Density,
        InputVariable::ReCref,
        InputVariable::RollRate,
        InputVariable::PitchRate,
        InputVariable::YawRate,
    ];

    pub fn label(self) -> &'static str {
        match self {
            InputVariable::Alpha => "AoA",
            InputVariable::Beta => "Beta",
            InputVariable::Mach => "Mach",
            InputVariable::Vinf => "Vinf",
            InputVariable::Density => "Rho",
            InputVariable::ReCref => "ReCref",
            InputVariable::RollRate => "RollRate",
            InputVariable::PitchRate => "PitchRate",
            InputVariable::YawRate => "YawRate",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.label().eq_ignore_ascii_case(s))
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|v| *v == self).unwrap_or(0)
    }
}

impl FlowConditions {
    pub fn validate(&self) -> SolverResult<()> {
        if !(self.mach >= 0.0) || self.mach >= 1.0 {
            return Err(SolverError::Supersonic { mach: self.mach });
        }
        if !(self.vinf > 0.0) {
            return Err(SolverError::InvalidArg {
                what: format!("Vinf must be positive, got {}", self.vinf),
            });
        }
        if !(self.density > 0.0) {
            return Err(SolverError::InvalidArg {
                what: format!("density must be positive, got {}", self.density),
            });
        }
        if self.re_cref < 0.0 {
            return Err(SolverError::InvalidArg {
                what: "ReCref must not be negative".to_string(),
            });
        }
        Ok(())
    }

    pub fn get(&self, var: InputVariable) -> f64 {
        match var {
            InputVariable::Alpha => self.alpha_deg,
            InputVariable::Beta => self.beta_deg,
            InputVariable::Mach => self.mach,
            InputVariable::Vinf => self.vinf,
            InputVariable::Density => self.density,
            InputVariable::ReCref => self.re_cref,
            InputVariable::RollRate => self.rates[0],
            InputVariable::PitchRate => self.rates[1],
            InputVariable::YawRate => self.rates[2],
        }
    }

    pub fn set(&mut self, var: InputVariable, value: f64) {
        match var {
            InputVariable::Alpha => self.alpha_deg = value,
            InputVariable::Beta => self.beta_deg = value,
            InputVariable::Mach => self.mach = value,
            InputVariable::Vinf => self.vinf = value,
            InputVariable::Density => self.density = value,
            InputVariable::ReCref => self.re_cref = value,
            InputVariable::RollRate => self.rates[0] = value,
            InputVariable::PitchRate => self.rates[1] = value,
            InputVariable::YawRate => self.rates[2] = value,
        }
    }

    pub fn params<T: Scalar>(&self) -> FlowParams<T> {
        FlowParams {
            mach: T::lit(self.mach),
            alpha_deg: T::lit(self.alpha_deg),
            beta_deg: T::lit(self.beta_deg),
            vinf: T::lit(self.vinf),
            density: T::lit(self.density),
            re_cref: T::lit(self.re_cref),
            rates: Vec3::from_f64(self.rates),
            viscous: self.re_cref > 0.0,
        }
    }

    /// Parameters with a unit derivative seed on `var`.
    pub fn seeded(&self, var: InputVariable) -> FlowParams<Dual64> {
        let mut p = self.params::<Dual64>();
        let seed = Dual64::new(self.get(var), 1.0);
        match var {
            InputVariable::Alpha => p.alpha_deg = seed,
            InputVariable::Beta => p.beta_deg = seed,
            InputVariable::Mach => p.mach = seed,
            InputVariable::Vinf => p.vinf = seed,
            InputVariable::Density => p.density = seed,
            InputVariable::ReCref => p.re_cref = seed,
            InputVariable::RollRate => p.rates.x = seed,
            InputVariable::PitchRate => p.rates.y = seed,
            InputVariable::YawRate => p.rates.z = seed,
        }
        p
    }
}

/// Free-stream state over a generic scalar.
#[derive(Clone, Copy, Debug)]
pub struct FlowParams<T> {
    pub mach: T,
    pub alpha_deg: T,
    pub beta_deg: T,
    pub vinf: T,
    pub density: T,
    pub re_cref: T,
    pub rates: Vec3<T>,
    pub viscous: bool,
}

impl<T: Scalar> FlowParams<T> {
    fn angles(&self) -> (T, T, T, T) {
        let a = self.alpha_deg * (PI / 180.0);
        let b = self.beta_deg * (PI / 180.0);
        (a.sin(), a.cos(), b.sin(), b.cos())
    }

    /// Free-stream velocity vector in body axes.
    pub fn freestream(&self) -> Vec3<T> {
        let (sa, ca, sb, cb) = self.angles();
        Vec3::new(ca * cb, -sb, sa * cb).scale(self.vinf)
    }

    /// Drag, side and lift unit directions in body axes.
    pub fn wind_axes(&self) -> (Vec3<T>, Vec3<T>, Vec3<T>) {
        let (sa, ca, sb, cb) = self.angles();
        let zero = T::lit(0.0);
        (
            Vec3::new(ca * cb, -sb, sa * cb),
            Vec3::new(-(ca * sb), -cb, -(sa * sb)),
            Vec3::new(-sa, zero, ca),
        )
    }

    pub fn dynamic_pressure(&self) -> T {
        self.density * self.vinf * self.vinf * 0.5
    }

    /// Prandtl-Glauert factor `1/sqrt(1 - M²)`.
    pub fn compressibility(&self) -> T {
        (-(self.mach * self.mach) + 1.0).sqrt().recip()
    }

    /// Flat-plate turbulent skin friction `0.074 Re^-0.2`, if enabled.
    pub fn skin_friction(&self) -> Option<T> {
        if self.viscous {
            Some(self.re_cref.powf(-0.2) * 0.074)
        } else {
            None
        }
    }
}

//! Force, moment and rotor coefficient accumulators.
//!
//! Every quantity is a [`TimePair`]: the instantaneous value of the current
//! time step and the running time average since the last reset.

use std::f64::consts::PI;
use vsp_core::{guarded_ratio, incremental_mean};

/// Which member of a [`TimePair`] to read or write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Instant,
    Average,
}

/// Inviscid (vortex lattice) or viscous (skin friction) contribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForceKind {
    Inviscid,
    Viscous,
}

/// Instantaneous value plus running time average.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TimePair {
    pub instant: f64,
    pub average: f64,
}

impl TimePair {
    pub fn get(&self, slot: Slot) -> f64 {
        match slot {
            Slot::Instant => self.instant,
            Slot::Average => self.average,
        }
    }

    pub fn set(&mut self, slot: Slot, value: f64) {
        match slot {
            Slot::Instant => self.instant = value,
            Slot::Average => self.average = value,
        }
    }

    /// Fold the instantaneous value into the average as sample `n`.
    pub fn fold(&mut self, n: usize) {
        self.average = incremental_mean(self.average, self.instant, n);
    }
}

/// Integrated coefficients for one force contribution.
///
/// `cx..cmz` are the raw integrated components; everything else is derived
/// from them by the owning group.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoefficientSet {
    pub cx: TimePair,
    pub cy: TimePair,
    pub cz: TimePair,
    pub cmx: TimePair,
    pub cmy: TimePair,
    pub cmz: TimePair,

    pub cl: TimePair,
    pub cd: TimePair,
    pub cs: TimePair,

    /// Propeller convention
    pub ct: TimePair,
    pub cq: TimePair,
    pub cp: TimePair,

    /// Helicopter rotor convention
    pub ct_h: TimePair,
    pub cq_h: TimePair,
    pub cp_h: TimePair,
}

impl CoefficientSet {
    pub fn set_instant(&mut self, force: [f64; 3], moment: [f64; 3]) {
        self.cx.instant = force[0];
        self.cy.instant = force[1];
        self.cz.instant = force[2];
        self.cmx.instant = moment[0];
        self.cmy.instant = moment[1];
        self.cmz.instant = moment[2];
    }

    pub fn force(&self, slot: Slot) -> [f64; 3] {
        [self.cx.get(slot), self.cy.get(slot), self.cz.get(slot)]
    }

    pub fn moment(&self, slot: Slot) -> [f64; 3] {
        [self.cmx.get(slot), self.cmy.get(slot), self.cmz.get(slot)]
    }

    fn raw_mut(&mut self) -> [&mut TimePair; 6] {
        [
            &mut self.cx,
            &mut self.cy,
            &mut self.cz,
            &mut self.cmx,
            &mut self.cmy,
            &mut self.cmz,
        ]
    }

    /// All fifteen pairs in a fixed order (used by the group data file).
    pub fn pairs(&self) -> [&TimePair; 15] {
        [
            &self.cx, &self.cy, &self.cz, &self.cmx, &self.cmy, &self.cmz, &self.cl, &self.cd,
            &self.cs, &self.ct, &self.cq, &self.cp, &self.ct_h, &self.cq_h, &self.cp_h,
        ]
    }

    pub fn pairs_mut(&mut self) -> [&mut TimePair; 15] {
        [
            &mut self.cx,
            &mut self.cy,
            &mut self.cz,
            &mut self.cmx,
            &mut self.cmy,
            &mut self.cmz,
            &mut self.cl,
            &mut self.cd,
            &mut self.cs,
            &mut self.ct,
            &mut self.cq,
            &mut self.cp,
            &mut self.ct_h,
            &mut self.cq_h,
            &mut self.cp_h,
        ]
    }

    pub fn zero_averages(&mut self) {
        for pair in self.pairs_mut() {
            pair.average = 0.0;
        }
    }

    /// Fold the raw components into their running averages.
    pub fn fold_raw(&mut self, n: usize) {
        for pair in self.raw_mut() {
            pair.fold(n);
        }
    }

    pub fn set_wind_axes(&mut self, slot: Slot, cl: f64, cd: f64, cs: f64) {
        self.cl.set(slot, cl);
        self.cd.set(slot, cd);
        self.cs.set(slot, cs);
    }

    pub fn set_rotor(&mut self, slot: Slot, rotor: &RotorCoefficients) {
        self.ct.set(slot, rotor.ct);
        self.cq.set(slot, rotor.cq);
        self.cp.set(slot, rotor.cp);
        self.ct_h.set(slot, rotor.ct_h);
        self.cq_h.set(slot, rotor.cq_h);
        self.cp_h.set(slot, rotor.cp_h);
    }
}

/// Free-stream and reference geometry used to dimensionalise group forces.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupReference {
    pub density: f64,
    pub vref: f64,
    pub sref: f64,
    pub bref: f64,
    pub cref: f64,
    pub alpha_deg: f64,
    pub beta_deg: f64,
}

impl Default for GroupReference {
    fn default() -> Self {
        Self {
            density: 1.0,
            vref: 1.0,
            sref: 1.0,
            bref: 1.0,
            cref: 1.0,
            alpha_deg: 0.0,
            beta_deg: 0.0,
        }
    }
}

impl GroupReference {
    pub fn dynamic_pressure(&self) -> f64 {
        0.5 * self.density * self.vref * self.vref
    }

    /// Drag, side and lift unit directions in body axes.
    pub fn wind_axes(&self) -> ([f64; 3], [f64; 3], [f64; 3]) {
        let (sa, ca) = self.alpha_deg.to_radians().sin_cos();
        let (sb, cb) = self.beta_deg.to_radians().sin_cos();
        let drag = [ca * cb, -sb, sa * cb];
        let side = [-ca * sb, -cb, -sa * sb];
        let lift = [-sa, 0.0, ca];
        (drag, side, lift)
    }
}

/// Rotor coefficients in propeller and helicopter conventions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RotorCoefficients {
    pub ct: f64,
    pub cq: f64,
    pub cp: f64,
    pub ct_h: f64,
    pub cq_h: f64,
    pub cp_h: f64,
}

impl RotorCoefficients {
    /// Non-dimensionalise thrust (N), torque (N·m) and power (W).
    ///
    /// With `n = |Ω|/2π` and `R = D/2`:
    /// ```text
    /// CT = T/(ρ n² D⁴)   CQ = Q/(ρ n² D⁵)   CP = P/(ρ n³ D⁵)
    /// CT_h = T/(ρ A Vtip²)   CQ_h = Q/(ρ A Vtip² R)   CP_h = P/(ρ A Vtip³)
    /// ```
    /// A stationary rotor, a zero diameter or a zero density yields all zeros.
    pub fn from_dimensional(
        thrust: f64,
        torque: f64,
        power: f64,
        density: f64,
        omega: f64,
        diameter: f64,
    ) -> Self {
        let n = omega.abs() / (2.0 * PI);
        if n == 0.0 || diameter == 0.0 || density == 0.0 {
            return Self::default();
        }
        let d = diameter.abs();
        let radius = 0.5 * d;
        let area = PI * radius * radius;
        let vtip = omega.abs() * radius;

        Self {
            ct: thrust / (density * n * n * d.powi(4)),
            cq: torque / (density * n * n * d.powi(5)),
            cp: power / (density * n.powi(3) * d.powi(5)),
            ct_h: thrust / (density * area * vtip * vtip),
            cq_h: torque / (density * area * vtip * vtip * radius),
            cp_h: power / (density * area * vtip.powi(3)),
        }
    }
}

/// Advance ratio `J = V/(n D)`; zero for a stationary rotor.
pub fn advance_ratio(vref: f64, omega: f64, diameter: f64) -> f64 {
    let n = omega.abs() / (2.0 * PI);
    guarded_ratio(vref, n * diameter.abs())
}

/// Propeller efficiency `η = J CT / CP`, zero when `CP == 0`.
pub fn propeller_efficiency(j: f64, ct: f64, cp: f64) -> f64 {
    guarded_ratio(j * ct, cp)
}

/// Hover figure of merit `CT^1.5 / (√2 CP)`, zero when not defined.
pub fn figure_of_merit(ct_h: f64, cp_h: f64) -> f64 {
    if ct_h <= 0.0 || cp_h <= 0.0 {
        return 0.0;
    }
    guarded_ratio(ct_h.powf(1.5), 2.0_f64.sqrt() * cp_h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wind_axes_zero_angles() {
        let r = GroupReference::default();
        let (d, s, l) = r.wind_axes();
        assert_eq!(d, [1.0, 0.0, 0.0]);
        assert_eq!(s, [0.0, -1.0, 0.0]);
        assert_eq!(l, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn wind_axes_are_orthonormal() {
        let r = GroupReference {
            alpha_deg: 7.0,
            beta_deg: -3.0,
            ..GroupReference::default()
        };
        let (d, s, l) = r.wind_axes();
        let dot = |a: [f64; 3], b: [f64; 3]| a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
        assert!(dot(d, s).abs() < 1e-14);
        assert!(dot(d, l).abs() < 1e-14);
        assert!(dot(s, l).abs() < 1e-14);
        assert!((dot(d, d) - 1.0).abs() < 1e-14);
    }

    #[test]
    fn rotor_coefficients_power_is_two_pi_torque() {
        let omega = 100.0;
        let torque = 12.0;
        let rc = RotorCoefficients::from_dimensional(50.0, torque, torque * omega, 1.2, omega, 1.5);
        assert!((rc.cp - 2.0 * PI * rc.cq).abs() < 1e-12);
        assert!(rc.ct > 0.0);
    }

    #[test]
    fn stationary_rotor_has_zero_coefficients() {
        let rc = RotorCoefficients::from_dimensional(50.0, 1.0, 1.0, 1.2, 0.0, 1.5);
        assert_eq!(rc, RotorCoefficients::default());
    }

    #[test]
    fn ratios_use_zero_sentinel() {
        assert_eq!(propeller_efficiency(0.5, 0.1, 0.0), 0.0);
        assert_eq!(figure_of_merit(0.01, 0.0), 0.0);
        assert_eq!(figure_of_merit(-0.01, 0.001), 0.0);
        assert_eq!(advance_ratio(10.0, 0.0, 1.0), 0.0);
    }

    #[test]
    fn fold_tracks_mean() {
        let mut p = TimePair::default();
        for (k, v) in [1.0, 2.0, 6.0].iter().enumerate() {
            p.instant = *v;
            p.fold(k + 1);
        }
        assert!((p.average - 3.0).abs() < 1e-14);
    }
}

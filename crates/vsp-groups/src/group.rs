//! Component group: kinematics state machine and force accumulators.

use nalgebra::{Quaternion, Vector3};
use std::f64::consts::PI;
use tracing::debug;

use crate::coefficients::{
    advance_ratio, figure_of_merit, propeller_efficiency, CoefficientSet, ForceKind,
    GroupReference, RotorCoefficients, Slot, TimePair,
};
use crate::dynamics::RigidBody;
use crate::motion::{axis_angle_quaternion, rotation_matrix, to_rows, GroupPose, MotionKind};
use crate::span_load::SpanLoadData;
use crate::{GroupError, GroupResult};

/// A named set of geometry components sharing one rigid motion.
///
/// Cloning deep-copies the component list and every span-load record.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentGroup {
    pub name: String,

    pub is_fixed: bool,
    pub is_dynamic: bool,
    pub is_rotor: bool,
    pub has_wings: bool,
    pub has_bodies: bool,

    /// Centre of rotation in body axes
    pub origin: [f64; 3],
    /// Rotation axis; need not be normalised
    pub axis: [f64; 3],
    /// Prescribed translation for non-dynamic groups
    pub user_input_velocity: [f64; 3],
    pub user_input_acceleration: [f64; 3],

    /// Rotation rate (rad/s)
    pub omega: f64,
    /// Oscillation amplitude for periodic groups (rad)
    pub angle_max: f64,
    pub rotor_diameter: f64,
    pub start_dynamic_analysis_time: f64,
    pub start_averaging_time: f64,

    pub reference: GroupReference,
    pub inviscid: CoefficientSet,
    pub viscous: CoefficientSet,
    pub eta_p: TimePair,
    pub fom: TimePair,

    pub(crate) components: Vec<usize>,
    pub(crate) span_loads: Vec<SpanLoadData>,
    pub(crate) body: RigidBody,

    pub(crate) translation: [f64; 3],
    pub(crate) velocity: [f64; 3],
    pub(crate) angular_velocity: [f64; 3],
    pub(crate) angle: f64,
    pub(crate) total_rotation_angle: f64,
    pub(crate) time_step: f64,
    pub(crate) current_time: f64,
    pub(crate) number_of_time_samples: usize,

    pub(crate) quat: Quaternion<f64>,
    pub(crate) inv_quat: Quaternion<f64>,
    pub(crate) w_quat: Quaternion<f64>,
    pub(crate) total_quat: Quaternion<f64>,
}

impl Default for ComponentGroup {
    fn default() -> Self {
        Self::new("")
    }
}

impl ComponentGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_fixed: true,
            is_dynamic: false,
            is_rotor: false,
            has_wings: false,
            has_bodies: false,
            origin: [0.0; 3],
            axis: [0.0; 3],
            user_input_velocity: [0.0; 3],
            user_input_acceleration: [0.0; 3],
            omega: 0.0,
            angle_max: 0.0,
            rotor_diameter: 0.0,
            start_dynamic_analysis_time: 0.0,
            start_averaging_time: 0.0,
            reference: GroupReference::default(),
            inviscid: CoefficientSet::default(),
            viscous: CoefficientSet::default(),
            eta_p: TimePair::default(),
            fom: TimePair::default(),
            components: Vec::new(),
            span_loads: Vec::new(),
            body: RigidBody::default(),
            translation: [0.0; 3],
            velocity: [0.0; 3],
            angular_velocity: [0.0; 3],
            angle: 0.0,
            total_rotation_angle: 0.0,
            time_step: 0.0,
            current_time: 0.0,
            number_of_time_samples: 0,
            quat: Quaternion::identity(),
            inv_quat: Quaternion::identity(),
            w_quat: Quaternion::new(0.0, 0.0, 0.0, 0.0),
            total_quat: Quaternion::identity(),
        }
    }

    // ---- membership ----

    /// Resize the component list; new entries are zero.
    pub fn size_list(&mut self, n: usize) {
        self.components.resize(n, 0);
    }

    pub fn components(&self) -> &[usize] {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut [usize] {
        &mut self.components
    }

    pub fn set_components(&mut self, components: Vec<usize>) {
        self.components = components;
    }

    pub fn contains_component(&self, component: usize) -> bool {
        self.components.contains(&component)
    }

    /// Allocate one empty span-load record per lifting surface.
    pub fn size_span_loading_list(&mut self, n: usize) {
        self.span_loads = vec![SpanLoadData::default(); n];
    }

    pub fn number_of_lifting_surfaces(&self) -> usize {
        self.span_loads.len()
    }

    pub fn span_load(&self, i: usize) -> GroupResult<&SpanLoadData> {
        self.span_loads.get(i).ok_or(GroupError::InvalidArg {
            what: "span load index out of range",
        })
    }

    pub fn span_load_mut(&mut self, i: usize) -> GroupResult<&mut SpanLoadData> {
        self.span_loads.get_mut(i).ok_or(GroupError::InvalidArg {
            what: "span load index out of range",
        })
    }

    pub fn span_loads(&self) -> &[SpanLoadData] {
        &self.span_loads
    }

    // ---- state accessors ----

    pub fn motion_kind(&self) -> MotionKind {
        MotionKind::classify(self.is_fixed, self.is_dynamic, self.is_rotor, self.angle_max)
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn total_rotation_angle(&self) -> f64 {
        self.total_rotation_angle
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn number_of_time_samples(&self) -> usize {
        self.number_of_time_samples
    }

    pub fn translation(&self) -> [f64; 3] {
        self.translation
    }

    pub fn velocity(&self) -> [f64; 3] {
        self.velocity
    }

    pub fn angular_velocity(&self) -> [f64; 3] {
        self.angular_velocity
    }

    pub fn quat(&self) -> &Quaternion<f64> {
        &self.quat
    }

    pub fn inv_quat(&self) -> &Quaternion<f64> {
        &self.inv_quat
    }

    pub fn w_quat(&self) -> &Quaternion<f64> {
        &self.w_quat
    }

    pub fn total_quat(&self) -> &Quaternion<f64> {
        &self.total_quat
    }

    pub fn rigid_body(&self) -> &RigidBody {
        &self.body
    }

    pub fn set_mass_properties(&mut self, mass: f64, inertia: [f64; 6]) -> GroupResult<()> {
        self.body = RigidBody::new(mass, inertia)?;
        Ok(())
    }

    /// One revolution of the user-supplied rate. Infinite when not rotating.
    pub fn period(&self) -> f64 {
        (2.0 * PI / self.omega).abs()
    }

    fn axis_unit(&self) -> Vector3<f64> {
        let a = Vector3::from(self.axis);
        let n = a.norm();
        if n > 0.0 { a / n } else { Vector3::zeros() }
    }

    /// Current rigid placement of the group.
    pub fn pose(&self) -> GroupPose {
        GroupPose {
            origin: self.origin,
            rotation: to_rows(&rotation_matrix(&self.total_quat)),
            translation: self.translation,
            angular_velocity: self.angular_velocity,
            velocity: self.velocity,
        }
    }

    // ---- kinematics ----

    /// Steady-rate update: rotation over one stored time step at constant
    /// `omega`. The cumulative rotation is left untouched.
    pub fn update_steady(&mut self) {
        if self.is_fixed {
            self.hold();
            return;
        }
        let w = self.axis_unit() * self.omega;
        self.angle = self.omega * self.time_step;
        self.angular_velocity = [w.x, w.y, w.z];
        self.quat = axis_angle_quaternion(self.axis, self.angle);
        self.inv_quat = self.quat.conjugate();
        self.w_quat = Quaternion::from_imag(w);
    }

    /// Advance one unsteady step ending at `current_time`.
    pub fn update(&mut self, time_step: f64, current_time: f64) -> GroupResult<()> {
        self.time_step = time_step;
        self.current_time = current_time;

        let kind = self.motion_kind();
        match kind {
            MotionKind::Fixed => {
                self.hold();
                return Ok(());
            }
            MotionKind::SteadyRate => {
                let target = self.omega * current_time;
                self.set_rotation_target(target, self.omega);
                self.prescribed_translation(current_time);
            }
            MotionKind::Periodic => {
                let phase = self.omega * current_time;
                let target = self.angle_max * phase.sin();
                let rate = self.angle_max * self.omega * phase.cos();
                self.set_rotation_target(target, rate);
                self.prescribed_translation(current_time);
            }
            MotionKind::Dynamic => {
                if current_time < self.start_dynamic_analysis_time {
                    self.hold();
                    return Ok(());
                }
                self.update_dynamic_system(time_step)?;
            }
        }

        self.update_quaternions(time_step);

        debug!(
            group = %self.name,
            kind = kind.label(),
            t = current_time,
            angle = self.angle,
            total = self.total_rotation_angle,
            "group updated"
        );
        Ok(())
    }

    fn hold(&mut self) {
        self.angle = 0.0;
        self.angular_velocity = [0.0; 3];
        self.velocity = [0.0; 3];
        self.quat = Quaternion::identity();
        self.inv_quat = Quaternion::identity();
        self.w_quat = Quaternion::new(0.0, 0.0, 0.0, 0.0);
    }

    fn set_rotation_target(&mut self, target: f64, rate: f64) {
        self.angle = target - self.total_rotation_angle;
        self.total_rotation_angle = target;
        let w = self.axis_unit() * rate;
        self.angular_velocity = [w.x, w.y, w.z];
    }

    fn prescribed_translation(&mut self, t: f64) {
        for i in 0..3 {
            let v0 = self.user_input_velocity[i];
            let a = self.user_input_acceleration[i];
            self.velocity[i] = v0 + a * t;
            self.translation[i] = v0 * t + 0.5 * a * t * t;
        }
    }

    fn update_dynamic_system(&mut self, dt: f64) -> GroupResult<()> {
        let q = self.reference.dynamic_pressure() * self.reference.sref;
        let cf = Vector3::from(self.inviscid.force(Slot::Instant))
            + Vector3::from(self.viscous.force(Slot::Instant));
        let cm = Vector3::from(self.inviscid.moment(Slot::Instant))
            + Vector3::from(self.viscous.moment(Slot::Instant));
        let rotation = rotation_matrix(&self.total_quat);

        self.body
            .step(cf * q, cm * (q * self.reference.cref), &rotation, dt)?;

        let v = self.body.velocity;
        let w = self.body.angular_velocity;
        self.velocity = [v.x, v.y, v.z];
        self.angular_velocity = [w.x, w.y, w.z];
        for i in 0..3 {
            self.translation[i] += self.velocity[i] * dt;
        }
        self.angle = w.norm() * dt;
        self.total_rotation_angle += self.angle;
        Ok(())
    }

    /// Rebuild `quat`, `inv_quat` and `w_quat` for the step and compose the
    /// step rotation into `total_quat`. Every quaternion is renormalised.
    pub fn update_quaternions(&mut self, time_step: f64) {
        let w = Vector3::from(self.angular_velocity);
        self.w_quat = Quaternion::from_imag(w);

        if self.motion_kind() == MotionKind::Dynamic {
            // dq/dt = 0.5 W q
            let previous = self.total_quat;
            let rate = self.w_quat * previous * 0.5;
            let next = (previous + rate * time_step).normalize();
            self.quat = (next * previous.conjugate()).normalize();
            self.total_quat = next;
        } else {
            self.quat = axis_angle_quaternion(self.axis, self.angle).normalize();
            self.total_quat = (self.quat * self.total_quat).normalize();
        }
        self.inv_quat = self.quat.conjugate();
    }

    /// Reset the cumulative rotation.
    pub fn zero_out_totals(&mut self) {
        self.total_rotation_angle = 0.0;
        self.total_quat = Quaternion::identity();
        self.translation = [0.0; 3];
    }

    // ---- forces ----

    /// Store integrated body-axis force and moment coefficients for the step.
    pub fn set_instant_forces(&mut self, kind: ForceKind, force: [f64; 3], moment: [f64; 3]) {
        self.coefficients_mut(kind).set_instant(force, moment);
    }

    pub fn coefficients(&self, kind: ForceKind) -> &CoefficientSet {
        match kind {
            ForceKind::Inviscid => &self.inviscid,
            ForceKind::Viscous => &self.viscous,
        }
    }

    fn coefficients_mut(&mut self, kind: ForceKind) -> &mut CoefficientSet {
        match kind {
            ForceKind::Inviscid => &mut self.inviscid,
            ForceKind::Viscous => &mut self.viscous,
        }
    }

    /// Derive instantaneous wind-axis and rotor coefficients.
    pub fn calculate_forces_and_moments(&mut self) {
        self.derive(Slot::Instant);
    }

    /// Start a new averaging window.
    pub fn zero_average_forces_and_moments(&mut self) {
        self.number_of_time_samples = 0;
        self.inviscid.zero_averages();
        self.viscous.zero_averages();
        self.eta_p.average = 0.0;
        self.fom.average = 0.0;
    }

    /// Fold the current raw components into the running averages.
    pub fn update_average_forces_and_moments(&mut self) {
        self.number_of_time_samples += 1;
        let n = self.number_of_time_samples;
        self.inviscid.fold_raw(n);
        self.viscous.fold_raw(n);
    }

    /// Derive averaged wind-axis and rotor coefficients from the averaged
    /// raw components.
    pub fn calculate_average_forces_and_moments(&mut self) {
        self.derive(Slot::Average);
    }

    fn derive(&mut self, slot: Slot) {
        let (drag, side, lift) = self.reference.wind_axes();
        let dot = |a: [f64; 3], b: [f64; 3]| a[0] * b[0] + a[1] * b[1] + a[2] * b[2];

        for kind in [ForceKind::Inviscid, ForceKind::Viscous] {
            let f = self.coefficients(kind).force(slot);
            let (cl, cd, cs) = (dot(f, lift), dot(f, drag), dot(f, side));
            self.coefficients_mut(kind).set_wind_axes(slot, cl, cd, cs);

            let rotor = if self.is_rotor {
                RotorCoefficients::from_dimensional(
                    self.thrust_of(kind, slot),
                    self.torque_of(kind, slot),
                    self.power_of(kind, slot),
                    self.reference.density,
                    self.omega,
                    self.rotor_diameter,
                )
            } else {
                RotorCoefficients::default()
            };
            self.coefficients_mut(kind).set_rotor(slot, &rotor);
        }

        let (inv, visc) = (&self.inviscid, &self.viscous);
        let ct = inv.ct.get(slot) + visc.ct.get(slot);
        let cp = inv.cp.get(slot) + visc.cp.get(slot);
        let ct_h = inv.ct_h.get(slot) + visc.ct_h.get(slot);
        let cp_h = inv.cp_h.get(slot) + visc.cp_h.get(slot);

        let j = advance_ratio(self.reference.vref, self.omega, self.rotor_diameter);
        self.eta_p.set(slot, propeller_efficiency(j, ct, cp));
        self.fom.set(slot, figure_of_merit(ct_h, cp_h));
    }

    /// Dimensional force along the rotation axis (N).
    pub fn thrust_of(&self, kind: ForceKind, slot: Slot) -> f64 {
        let f = Vector3::from(self.coefficients(kind).force(slot));
        f.dot(&self.axis_unit()) * self.reference.dynamic_pressure() * self.reference.sref
    }

    /// Dimensional moment about the rotation axis (N·m).
    pub fn moment_of(&self, kind: ForceKind, slot: Slot) -> f64 {
        let m = Vector3::from(self.coefficients(kind).moment(slot));
        m.dot(&self.axis_unit())
            * self.reference.dynamic_pressure()
            * self.reference.sref
            * self.reference.cref
    }

    /// Shaft torque needed to hold the rate against the aerodynamic moment.
    pub fn torque_of(&self, kind: ForceKind, slot: Slot) -> f64 {
        -self.moment_of(kind, slot) * self.omega.signum()
    }

    /// Shaft power (W).
    pub fn power_of(&self, kind: ForceKind, slot: Slot) -> f64 {
        -self.moment_of(kind, slot) * self.omega
    }

    pub fn thrust(&self, slot: Slot) -> f64 {
        self.thrust_of(ForceKind::Inviscid, slot) + self.thrust_of(ForceKind::Viscous, slot)
    }

    pub fn moment(&self, slot: Slot) -> f64 {
        self.moment_of(ForceKind::Inviscid, slot) + self.moment_of(ForceKind::Viscous, slot)
    }

    pub fn power(&self, slot: Slot) -> f64 {
        self.power_of(ForceKind::Inviscid, slot) + self.power_of(ForceKind::Viscous, slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    fn rotor() -> ComponentGroup {
        let mut g = ComponentGroup::new("rotor");
        g.is_fixed = false;
        g.is_rotor = true;
        g.axis = [1.0, 0.0, 0.0];
        g.omega = TAU;
        g.rotor_diameter = 2.0;
        g
    }

    #[test]
    fn fixed_group_never_rotates() {
        let mut g = ComponentGroup::new("wing");
        g.omega = 10.0;
        g.axis = [0.0, 1.0, 0.0];
        for k in 1..=20 {
            g.update(0.1, 0.1 * k as f64).unwrap();
        }
        assert_eq!(*g.quat(), Quaternion::identity());
        assert_eq!(g.angle(), 0.0);
        assert_eq!(g.total_rotation_angle(), 0.0);
        assert!(g.pose().is_identity());
    }

    #[test]
    fn rotor_completes_one_revolution() {
        let mut g = rotor();
        for k in 1..=4 {
            g.update(0.25, 0.25 * k as f64).unwrap();
        }
        assert!((g.total_rotation_angle() - TAU).abs() < 1e-12);
        assert!((g.angle() - TAU / 4.0).abs() < 1e-12);
        // a full turn brings every point back
        let p = g.pose().transform_point([0.0, 1.0, 0.0]);
        assert!((p[1] - 1.0).abs() < 1e-12);
        assert!(p[2].abs() < 1e-12);
    }

    #[test]
    fn periodic_group_stays_within_amplitude() {
        let mut g = ComponentGroup::new("flap");
        g.is_fixed = false;
        g.axis = [0.0, 1.0, 0.0];
        g.omega = 3.0;
        g.angle_max = 0.2;
        for k in 1..=50 {
            g.update(0.05, 0.05 * k as f64).unwrap();
            assert!(g.total_rotation_angle().abs() <= 0.2 + 1e-15);
        }
        assert_eq!(g.motion_kind(), MotionKind::Periodic);
    }

    #[test]
    fn quaternions_stay_unit_length() {
        let mut g = rotor();
        g.omega = 37.3;
        g.axis = [0.3, -1.0, 0.7];
        for k in 1..=500 {
            g.update(0.013, 0.013 * k as f64).unwrap();
            assert!((g.quat().norm() - 1.0).abs() < 1e-12);
            assert!((g.total_quat().norm() - 1.0).abs() < 1e-12);
            let product = g.quat() * g.inv_quat();
            assert!((product.w - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn dynamic_group_waits_for_start_time() {
        let mut g = ComponentGroup::new("store");
        g.is_fixed = false;
        g.is_dynamic = true;
        g.start_dynamic_analysis_time = 1.0;
        g.set_mass_properties(1.0, [1.0, 1.0, 1.0, 0.0, 0.0, 0.0])
            .unwrap();
        g.set_instant_forces(ForceKind::Inviscid, [0.0, 0.0, 1.0], [0.0; 3]);
        g.update(0.5, 0.5).unwrap();
        assert_eq!(g.translation(), [0.0; 3]);
        g.update(0.5, 1.0).unwrap();
        assert!(g.velocity()[2] > 0.0);
        assert!(g.translation()[2] > 0.0);
    }

    #[test]
    fn dynamic_spin_keeps_unit_quaternion() {
        let mut g = ComponentGroup::new("spinner");
        g.is_fixed = false;
        g.is_dynamic = true;
        g.set_mass_properties(2.0, [1.0, 2.0, 3.0, 0.0, 0.0, 0.0])
            .unwrap();
        g.set_instant_forces(ForceKind::Inviscid, [0.0; 3], [0.1, 0.2, 0.0]);
        for k in 1..=100 {
            g.update(0.01, 0.01 * k as f64).unwrap();
            assert!((g.total_quat().norm() - 1.0).abs() < 1e-12);
        }
        assert!(g.total_rotation_angle() > 0.0);
    }

    #[test]
    fn translation_follows_user_input() {
        let mut g = ComponentGroup::new("sled");
        g.is_fixed = false;
        g.user_input_velocity = [1.0, 0.0, 0.0];
        g.user_input_acceleration = [0.0, 0.0, 2.0];
        g.update(0.5, 2.0).unwrap();
        assert_eq!(g.translation(), [2.0, 0.0, 4.0]);
        assert_eq!(g.velocity(), [1.0, 0.0, 4.0]);
    }

    #[test]
    fn averages_use_raw_components() {
        let mut g = rotor();
        g.zero_average_forces_and_moments();
        for (fx, mx) in [(1.0, -0.1), (3.0, -0.3)] {
            g.set_instant_forces(ForceKind::Inviscid, [fx, 0.0, 0.0], [mx, 0.0, 0.0]);
            g.update_average_forces_and_moments();
        }
        g.calculate_average_forces_and_moments();
        assert_eq!(g.number_of_time_samples(), 2);
        assert!((g.inviscid.cx.average - 2.0).abs() < 1e-14);
        // q = 0.5, Sref = 1
        assert!((g.thrust_of(ForceKind::Inviscid, Slot::Average) - 1.0).abs() < 1e-14);
        assert!(g.inviscid.ct.average > 0.0);
        assert!(g.inviscid.cp.average > 0.0);
        assert!(g.fom.average > 0.0);
    }

    #[test]
    fn derived_ratios_are_zero_without_power() {
        let mut g = rotor();
        g.set_instant_forces(ForceKind::Inviscid, [1.0, 0.0, 0.0], [0.0; 3]);
        g.calculate_forces_and_moments();
        assert_eq!(g.eta_p.instant, 0.0);
        assert_eq!(g.fom.instant, 0.0);
        assert!(g.eta_p.instant.is_finite());
    }

    #[test]
    fn period_of_rotor() {
        let g = rotor();
        assert!((g.period() - 1.0).abs() < 1e-15);
    }

    #[test]
    fn clone_is_deep() {
        let mut g = rotor();
        g.size_list(3);
        g.size_span_loading_list(2);
        g.span_load_mut(1).unwrap().size(4);
        let mut copy = g.clone();
        copy.components_mut()[0] = 9;
        copy.span_load_mut(1).unwrap().cl[0] = 1.0;
        assert_eq!(g.components()[0], 0);
        assert_eq!(g.span_load(1).unwrap().cl[0], 0.0);
    }
}

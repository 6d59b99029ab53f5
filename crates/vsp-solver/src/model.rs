//! Vortex-lattice model generic over the scalar type.
//!
//! One horseshoe vortex per mesh loop: bound segment on the quarter-chord
//! line, collocation point at three-quarter chord, trailing legs along +x.
//! The same code runs with `f64` for the forward solve and with `Dual64` to
//! propagate derivatives through geometry, free-stream and circulation.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use vsp_core::{Scalar, Vec3, ensure_all_finite};
use vsp_groups::{ComponentGroup, GroupPose};

use crate::biot_savart::{horseshoe, trailing_legs};
use crate::error::{SolverError, SolverResult};
use crate::flow::{FlowParams, ReferenceGeometry};
use crate::mesh::Mesh;

/// Trailing-wake direction in body axes.
pub const WAKE_DIRECTION: [f64; 3] = [1.0, 0.0, 0.0];

/// Frozen placement and rotor data of one group for a single solve.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupFrame {
    pub components: Vec<usize>,
    pub pose: GroupPose,
    pub axis: [f64; 3],
    pub omega: f64,
    pub rotor_diameter: f64,
    pub is_rotor: bool,
}

impl GroupFrame {
    pub fn from_group(group: &ComponentGroup) -> Self {
        Self {
            components: group.components().to_vec(),
            pose: group.pose(),
            axis: group.axis,
            omega: group.omega,
            rotor_diameter: group.rotor_diameter,
            is_rotor: group.is_rotor,
        }
    }

    pub fn unit_axis(&self) -> [f64; 3] {
        let n = (self.axis[0].powi(2) + self.axis[1].powi(2) + self.axis[2].powi(2)).sqrt();
        if n > 0.0 {
            [self.axis[0] / n, self.axis[1] / n, self.axis[2] / n]
        } else {
            [0.0; 3]
        }
    }
}

/// One loop placed in space.
#[derive(Clone, Debug)]
pub struct Panel<T> {
    pub a: Vec3<T>,
    pub b: Vec3<T>,
    /// Bound-vortex midpoint
    pub mid: Vec3<T>,
    pub colloc: Vec3<T>,
    pub normal: Vec3<T>,
    pub area: T,
    pub chord: T,
    /// Spanwise coordinate of the unplaced bound midpoint
    pub station: T,
    /// Onset velocity at the collocation point and at the bound midpoint
    pub onset: Vec3<T>,
    pub onset_mid: Vec3<T>,
    pub component: usize,
    pub surface: usize,
    pub strip: usize,
    pub group: Option<usize>,
}

/// Dimensional per-loop forces (N).
#[derive(Clone, Debug)]
pub struct Loads<T> {
    pub inviscid: Vec<Vec3<T>>,
    pub viscous: Vec<Vec3<T>>,
}

/// Force and moment coefficients of a set of loops.
#[derive(Clone, Copy, Debug)]
pub struct ForceMoment<T> {
    pub force: Vec3<T>,
    pub moment: Vec3<T>,
}

/// Vehicle coefficients split into inviscid and viscous parts.
#[derive(Clone, Copy, Debug)]
pub struct Coefficients<T> {
    pub inviscid: ForceMoment<T>,
    pub viscous: ForceMoment<T>,
}

impl<T: Scalar> Coefficients<T> {
    pub fn total_force(&self) -> Vec3<T> {
        self.inviscid.force + self.viscous.force
    }

    pub fn total_moment(&self) -> Vec3<T> {
        self.inviscid.moment + self.viscous.moment
    }
}

/// Sectional load of one spanwise strip.
#[derive(Clone, Copy, Debug)]
pub struct StripLoad<T> {
    pub station: T,
    pub chord: T,
    pub area: T,
    pub force: Vec3<T>,
}

#[derive(Clone, Debug)]
pub struct AeroModel<T> {
    pub panels: Vec<Panel<T>>,
    pub flow: FlowParams<T>,
    pub reference: ReferenceGeometry,
    pub frames: Vec<GroupFrame>,
    pub far_dist: f64,
}

fn place<T: Scalar>(x: Vec3<T>, pose: &GroupPose) -> Vec3<T> {
    let rel = x - Vec3::from_f64(pose.origin);
    rel.transform(&pose.rotation) + Vec3::from_f64(pose.center())
}

impl<T: Scalar> AeroModel<T> {
    /// Place every loop of `mesh` using node coordinates `xyz` (flat, 3 per
    /// node) and the group poses in `frames`.
    pub fn new(
        mesh: &Mesh,
        xyz: &[T],
        frames: &[GroupFrame],
        flow: FlowParams<T>,
        reference: &ReferenceGeometry,
        far_dist: f64,
    ) -> SolverResult<Self> {
        if xyz.len() != 3 * mesh.number_of_nodes() {
            return Err(SolverError::InvalidArg {
                what: format!(
                    "coordinate vector has length {}, expected {}",
                    xyz.len(),
                    3 * mesh.number_of_nodes()
                ),
            });
        }
        let node = |i: usize| Vec3::new(xyz[3 * i], xyz[3 * i + 1], xyz[3 * i + 2]);
        let cg = Vec3::<T>::from_f64(reference.cg);
        let free = flow.freestream();

        let panels = mesh
            .loops
            .iter()
            .map(|l| {
                let group = frames
                    .iter()
                    .position(|f| f.components.contains(&l.component));
                let base = l.nodes.map(node);
                let bound_mid = (base[0].lerp(base[3], 0.25) + base[1].lerp(base[2], 0.25))
                    .scale_f64(0.5);
                let p = match group {
                    Some(g) => base.map(|x| place(x, &frames[g].pose)),
                    None => base,
                };

                let a = p[0].lerp(p[3], 0.25);
                let b = p[1].lerp(p[2], 0.25);
                let colloc = (p[0].lerp(p[3], 0.75) + p[1].lerp(p[2], 0.75)).scale_f64(0.5);
                let mid = (a + b).scale_f64(0.5);
                let n = (p[2] - p[0]).cross(&(p[1] - p[3]));
                let area = n.norm() * 0.5;
                let chord = ((p[3] - p[0]).norm() + (p[2] - p[1]).norm()) * 0.5;

                let onset_at = |x: Vec3<T>| {
                    let body = flow.rates.cross(&(x - cg));
                    let moving = match group {
                        Some(g) => {
                            let pose = &frames[g].pose;
                            let w = Vec3::<T>::from_f64(pose.angular_velocity);
                            let c = Vec3::<T>::from_f64(pose.center());
                            w.cross(&(x - c)) + Vec3::from_f64(pose.velocity)
                        }
                        None => Vec3::zero(),
                    };
                    free - body - moving
                };

                Panel {
                    a,
                    b,
                    mid,
                    colloc,
                    normal: n.normalized(),
                    area,
                    chord,
                    station: bound_mid.y,
                    onset: onset_at(colloc),
                    onset_mid: onset_at(mid),
                    component: l.component,
                    surface: l.surface,
                    strip: l.strip,
                    group,
                }
            })
            .collect();

        Ok(Self {
            panels,
            flow,
            reference: reference.clone(),
            frames: frames.to_vec(),
            far_dist,
        })
    }

    pub fn size(&self) -> usize {
        self.panels.len()
    }

    /// Normal velocity at collocation point `i` induced by unit circulation on loop `j`.
    pub fn influence(&self, i: usize, j: usize) -> T {
        let (pi, pj) = (&self.panels[i], &self.panels[j]);
        horseshoe(pi.colloc, pj.a, pj.b, WAKE_DIRECTION, self.far_dist).dot(&pi.normal)
    }

    pub fn influence_row(&self, i: usize) -> Vec<T> {
        (0..self.size()).map(|j| self.influence(i, j)).collect()
    }

    /// Dense influence coefficients, rows assembled in parallel.
    pub fn influence_rows(&self) -> Vec<Vec<T>> {
        (0..self.size())
            .into_par_iter()
            .map(|i| self.influence_row(i))
            .collect()
    }

    /// Flow tangency right-hand side `-U·n`.
    pub fn rhs(&self) -> Vec<T> {
        self.panels
            .iter()
            .map(|p| -p.onset.dot(&p.normal))
            .collect()
    }

    /// `A Γ - b`.
    pub fn residual(&self, gamma: &[T]) -> Vec<T> {
        let rhs = self.rhs();
        (0..self.size())
            .into_par_iter()
            .map(|i| {
                let mut r = -rhs[i];
                for (j, g) in gamma.iter().enumerate() {
                    r += self.influence(i, j) * *g;
                }
                r
            })
            .collect()
    }

    /// `λᵀ (A Γ - b)`.
    pub fn weighted_residual(&self, gamma: &[T], lambda: &[f64]) -> T {
        self.residual(gamma)
            .into_iter()
            .zip(lambda)
            .fold(T::lit(0.0), |acc, (r, l)| acc + r * *l)
    }

    /// Kutta-Joukowski loads at the bound midpoints plus the skin-friction
    /// estimate along the local onset flow.
    pub fn loads(&self, gamma: &[T]) -> Loads<T> {
        let pg = self.flow.compressibility();
        let rho = self.flow.density;
        let cf = self.flow.skin_friction();

        let inviscid = (0..self.size())
            .into_par_iter()
            .map(|i| {
                let p = &self.panels[i];
                let mut w = p.onset_mid;
                for (j, q) in self.panels.iter().enumerate() {
                    w += trailing_legs(p.mid, q.a, q.b, WAKE_DIRECTION, self.far_dist)
                        .scale(gamma[j]);
                }
                w.cross(&(p.b - p.a)).scale(rho * gamma[i] * pg)
            })
            .collect();

        let viscous = self
            .panels
            .iter()
            .map(|p| match cf {
                Some(cf) => {
                    let speed = p.onset.norm();
                    p.onset.scale(rho * cf * p.area * speed)
                }
                None => Vec3::zero(),
            })
            .collect();

        Loads { inviscid, viscous }
    }

    fn normalise(&self, fm: ForceMoment<T>) -> ForceMoment<T> {
        let qs = self.flow.dynamic_pressure() * self.reference.sref;
        let qsc = qs * self.reference.cref;
        ForceMoment {
            force: fm.force.scale(qs.recip()),
            moment: fm.moment.scale(qsc.recip()),
        }
    }

    /// Coefficients of the loops selected by `keep`, moments about `about`.
    pub fn integrate<F>(&self, loads: &Loads<T>, about: Vec3<T>, keep: F) -> Coefficients<T>
    where
        F: Fn(&Panel<T>) -> bool,
    {
        let zero = ForceMoment {
            force: Vec3::zero(),
            moment: Vec3::zero(),
        };
        let (mut inv, mut visc) = (zero, zero);
        for (k, p) in self.panels.iter().enumerate() {
            if !keep(p) {
                continue;
            }
            let arm = p.mid - about;
            inv.force += loads.inviscid[k];
            inv.moment += arm.cross(&loads.inviscid[k]);
            let arm = p.colloc - about;
            visc.force += loads.viscous[k];
            visc.moment += arm.cross(&loads.viscous[k]);
        }
        Coefficients {
            inviscid: self.normalise(inv),
            viscous: self.normalise(visc),
        }
    }

    /// Whole-vehicle coefficients about the reference point.
    pub fn vehicle_coefficients(&self, loads: &Loads<T>) -> Coefficients<T> {
        self.integrate(loads, Vec3::from_f64(self.reference.cg), |_| true)
    }

    /// Coefficients of group `g` about its current centre of rotation.
    pub fn group_coefficients(&self, loads: &Loads<T>, g: usize) -> Coefficients<T> {
        let about = self
            .frames
            .get(g)
            .map(|f| f.pose.center())
            .unwrap_or(self.reference.cg);
        self.integrate(loads, Vec3::from_f64(about), |p| p.group == Some(g))
    }

    /// Lift, drag and side-force coefficients of a total force coefficient.
    pub fn wind_components(&self, force: Vec3<T>) -> (T, T, T) {
        let (drag, side, lift) = self.flow.wind_axes();
        (force.dot(&lift), force.dot(&drag), force.dot(&side))
    }

    /// Strip loads of one surface, ordered by strip index.
    pub fn strip_loads(&self, loads: &Loads<T>, surface: usize) -> Vec<StripLoad<T>> {
        let n = self
            .panels
            .iter()
            .filter(|p| p.surface == surface)
            .map(|p| p.strip + 1)
            .max()
            .unwrap_or(0);
        let mut strips = vec![
            StripLoad {
                station: T::lit(0.0),
                chord: T::lit(0.0),
                area: T::lit(0.0),
                force: Vec3::zero(),
            };
            n
        ];
        let mut count = vec![0usize; n];
        for (k, p) in self.panels.iter().enumerate() {
            if p.surface != surface {
                continue;
            }
            let s = &mut strips[p.strip];
            s.station += p.station;
            s.chord += p.chord;
            s.area += p.area;
            s.force += loads.inviscid[k] + loads.viscous[k];
            count[p.strip] += 1;
        }
        for (s, c) in strips.iter_mut().zip(count) {
            if c > 0 {
                s.station = s.station * (1.0 / c as f64);
            }
        }
        strips
    }

    /// Sectional coefficients `(cl, cd, cs, [cx, cy, cz])` of one strip.
    pub fn strip_coefficients(&self, strip: &StripLoad<T>) -> (T, T, T, Vec3<T>) {
        let q = self.flow.dynamic_pressure() * strip.area;
        if q.value() == 0.0 {
            let z = T::lit(0.0);
            return (z, z, z, Vec3::zero());
        }
        let c = strip.force.scale(q.recip());
        let (cl, cd, cs) = self.wind_components(c);
        (cl, cd, cs, c)
    }

    /// Pressure jump coefficient of every loop.
    pub fn loop_delta_cp(&self, loads: &Loads<T>) -> Vec<T> {
        let q = self.flow.dynamic_pressure();
        self.panels
            .iter()
            .zip(&loads.inviscid)
            .map(|(p, f)| {
                if p.area.value() == 0.0 {
                    T::lit(0.0)
                } else {
                    f.dot(&p.normal) / (q * p.area)
                }
            })
            .collect()
    }

    /// Area-weighted average of the adjacent loop pressure jumps at each node.
    pub fn nodal_pressures(&self, node_loops: &[Vec<usize>], loads: &Loads<T>) -> Vec<T> {
        let cp = self.loop_delta_cp(loads);
        node_loops
            .iter()
            .map(|adj| {
                let mut num = T::lit(0.0);
                let mut den = T::lit(0.0);
                for &k in adj {
                    num += cp[k] * self.panels[k].area;
                    den += self.panels[k].area;
                }
                if den.value() == 0.0 { T::lit(0.0) } else { num / den }
            })
            .collect()
    }
}

impl AeroModel<f64> {
    pub fn influence_matrix(&self) -> DMatrix<f64> {
        let rows = self.influence_rows();
        let n = self.size();
        DMatrix::from_fn(n, n, |i, j| rows[i][j])
    }

    /// Solve `A Γ = b` by dense LU.
    pub fn solve(&self) -> SolverResult<Vec<f64>> {
        let a = self.influence_matrix();
        let b = DVector::from_vec(self.rhs());
        let gamma = a.lu().solve(&b).ok_or(SolverError::Singular {
            what: "influence matrix".to_string(),
        })?;
        let gamma: Vec<f64> = gamma.iter().copied().collect();
        ensure_all_finite(&gamma, "circulation")?;
        Ok(gamma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::FlowConditions;
    use crate::mesh::WingBuilder;

    fn wing_model(alpha: f64) -> AeroModel<f64> {
        let mesh = WingBuilder {
            span: 8.0,
            root_chord: 1.0,
            tip_chord: 1.0,
            n_span: 8,
            n_chord: 2,
            ..WingBuilder::default()
        }
        .build()
        .unwrap();
        let flow = FlowConditions {
            alpha_deg: alpha,
            vinf: 50.0,
            ..FlowConditions::default()
        };
        let reference = ReferenceGeometry {
            sref: 8.0,
            cref: 1.0,
            bref: 8.0,
            cg: [0.25, 0.0, 0.0],
        };
        AeroModel::new(&mesh, &mesh.coordinates(), &[], flow.params(), &reference, 0.0).unwrap()
    }

    #[test]
    fn flat_plate_lift_slope_is_plausible() {
        let model = wing_model(4.0);
        let gamma = model.solve().unwrap();
        let loads = model.loads(&gamma);
        let c = model.vehicle_coefficients(&loads);
        let (cl, cd, _) = model.wind_components(c.total_force());
        // AR 8: Helmbold estimate CLa ≈ 4.9 /rad
        let cla = cl / 4.0_f64.to_radians();
        assert!(cla > 4.0 && cla < 5.8, "CLa = {cla}");
        assert!(cd > 0.0);
    }

    #[test]
    fn zero_alpha_gives_no_lift() {
        let model = wing_model(0.0);
        let gamma = model.solve().unwrap();
        assert!(gamma.iter().all(|g| g.abs() < 1e-10));
    }

    #[test]
    fn solved_circulation_has_small_residual() {
        let model = wing_model(3.0);
        let gamma = model.solve().unwrap();
        let r = model.residual(&gamma);
        assert!(r.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn lift_is_symmetric_across_span() {
        let model = wing_model(5.0);
        let gamma = model.solve().unwrap();
        let loads = model.loads(&gamma);
        let strips = model.strip_loads(&loads, 0);
        let n = strips.len();
        for k in 0..n / 2 {
            let (l, r) = (strips[k].force.z, strips[n - 1 - k].force.z);
            assert!((l - r).abs() < 1e-9 * l.abs().max(1.0));
        }
    }
}

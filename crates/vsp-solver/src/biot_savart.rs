//! Induced velocity kernels for straight vortex filaments of unit strength.

use std::f64::consts::PI;
use vsp_core::{Scalar, Vec3};

/// Squared distance below which a point is treated as lying on a filament.
pub const CORE_CUTOFF: f64 = 1.0e-12;

/// Velocity at `p` induced by the segment `a -> b`.
pub fn segment<T: Scalar>(p: Vec3<T>, a: Vec3<T>, b: Vec3<T>) -> Vec3<T> {
    let r0 = b - a;
    let r1 = p - a;
    let r2 = p - b;
    let c = r1.cross(&r2);
    let c2 = c.norm_squared();
    let len2 = r0.norm_squared().value();
    if c2.value() <= CORE_CUTOFF * len2 {
        return Vec3::zero();
    }
    let n1 = r1.norm();
    let n2 = r2.norm();
    if n1.value() == 0.0 || n2.value() == 0.0 {
        return Vec3::zero();
    }
    let dir = r1.scale(n1.recip()) - r2.scale(n2.recip());
    let k = r0.dot(&dir) / (c2 * (4.0 * PI));
    c.scale(k)
}

/// Velocity at `p` induced by the semi-infinite filament starting at `a`
/// and running to infinity along the unit direction `u`.
pub fn semi_infinite<T: Scalar>(p: Vec3<T>, a: Vec3<T>, u: [f64; 3]) -> Vec3<T> {
    let r = p - a;
    let u_t = Vec3::<T>::from_f64(u);
    let c = u_t.cross(&r);
    let d2 = c.norm_squared();
    let rn = r.norm();
    if d2.value() <= CORE_CUTOFF || rn.value() == 0.0 {
        return Vec3::zero();
    }
    let k = (r.dot_f64(u) / rn + 1.0) / (d2 * (4.0 * PI));
    c.scale(k)
}

/// Velocity induced by the two trailing legs of a unit horseshoe only.
pub fn trailing_legs<T: Scalar>(p: Vec3<T>, a: Vec3<T>, b: Vec3<T>, u: [f64; 3], far: f64) -> Vec3<T> {
    if far > 0.0 {
        let leg = Vec3::<T>::from_f64([u[0] * far, u[1] * far, u[2] * far]);
        segment(p, a + leg, a) + segment(p, b, b + leg)
    } else {
        semi_infinite(p, b, u) - semi_infinite(p, a, u)
    }
}

/// Velocity induced by a unit horseshoe vortex bound from `a` to `b` whose
/// legs trail along `u`. `far` is the leg length; zero or negative makes
/// the legs semi-infinite.
pub fn horseshoe<T: Scalar>(p: Vec3<T>, a: Vec3<T>, b: Vec3<T>, u: [f64; 3], far: f64) -> Vec3<T> {
    segment(p, a, b) + trailing_legs(p, a, b, u, far)
}

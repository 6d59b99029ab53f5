//! Scalar abstraction shared by the forward and the differentiating solver.
//!
//! The aerodynamic model is written once, generic over [`Scalar`], and
//! instantiated with `f64` for the forward solve and with
//! [`num_dual::Dual64`] for derivative propagation.

use core::ops::{Add, AddAssign, Neg, Sub};
use num_dual::DualNum;

/// Arithmetic type the aerodynamic model can be evaluated with.
///
/// Implemented for `f64` and `Dual64`.
pub trait Scalar: DualNum<f64> + Copy + Send + Sync + 'static {
    /// Lift a plain constant into the scalar type.
    fn lit(v: f64) -> Self {
        <Self as From<f64>>::from(v)
    }

    /// Real part, used for branching and pivoting decisions.
    fn value(&self) -> f64 {
        self.re()
    }
}

impl<T: DualNum<f64> + Copy + Send + Sync + 'static> Scalar for T {}

/// Cartesian 3-vector over a [`Scalar`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec3<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}

impl<T: Scalar> Vec3<T> {
    pub fn new(x: T, y: T, z: T) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::from_f64([0.0; 3])
    }

    pub fn from_f64(v: [f64; 3]) -> Self {
        Self {
            x: T::lit(v[0]),
            y: T::lit(v[1]),
            z: T::lit(v[2]),
        }
    }

    pub fn value(&self) -> [f64; 3] {
        [self.x.value(), self.y.value(), self.z.value()]
    }

    pub fn component(&self, axis: usize) -> T {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    pub fn scale(self, s: T) -> Self {
        Self {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }

    pub fn scale_f64(self, s: f64) -> Self {
        Self {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }

    pub fn dot(&self, o: &Self) -> T {
        self.x * o.x + self.y * o.y + self.z * o.z
    }

    pub fn dot_f64(&self, o: [f64; 3]) -> T {
        self.x * o[0] + self.y * o[1] + self.z * o[2]
    }

    pub fn cross(&self, o: &Self) -> Self {
        Self {
            x: self.y * o.z - self.z * o.y,
            y: self.z * o.x - self.x * o.z,
            z: self.x * o.y - self.y * o.x,
        }
    }

    pub fn norm_squared(&self) -> T {
        self.dot(self)
    }

    pub fn norm(&self) -> T {
        self.norm_squared().sqrt()
    }

    /// Unit vector; a zero vector stays zero.
    pub fn normalized(self) -> Self {
        let n = self.norm();
        if n.value() == 0.0 {
            return self;
        }
        self.scale(n.recip())
    }

    /// Apply a plain 3×3 matrix (row-major).
    pub fn transform(&self, m: &[[f64; 3]; 3]) -> Self {
        Self {
            x: self.x * m[0][0] + self.y * m[0][1] + self.z * m[0][2],
            y: self.x * m[1][0] + self.y * m[1][1] + self.z * m[1][2],
            z: self.x * m[2][0] + self.y * m[2][1] + self.z * m[2][2],
        }
    }

    pub fn lerp(self, other: Self, t: f64) -> Self {
        self + (other - self).scale_f64(t)
    }
}

impl<T: Scalar> Add for Vec3<T> {
    type Output = Self;
    fn add(self, o: Self) -> Self {
        Self {
            x: self.x + o.x,
            y: self.y + o.y,
            z: self.z + o.z,
        }
    }
}

impl<T: Scalar> Sub for Vec3<T> {
    type Output = Self;
    fn sub(self, o: Self) -> Self {
        Self {
            x: self.x - o.x,
            y: self.y - o.y,
            z: self.z - o.z,
        }
    }
}

impl<T: Scalar> Neg for Vec3<T> {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

impl<T: Scalar> AddAssign for Vec3<T> {
    fn add_assign(&mut self, o: Self) {
        self.x += o.x;
        self.y += o.y;
        self.z += o.z;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_dual::Dual64;

    #[test]
    fn cross_follows_right_hand_rule() {
        let x = Vec3::<f64>::from_f64([1.0, 0.0, 0.0]);
        let y = Vec3::<f64>::from_f64([0.0, 1.0, 0.0]);
        assert_eq!(x.cross(&y).value(), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn dual_norm_carries_derivative() {
        // |(t, 0, 0)| = t, d/dt = 1
        let v = Vec3::new(Dual64::new(3.0, 1.0), Dual64::from(0.0), Dual64::from(0.0));
        let n = v.norm();
        assert!((n.re - 3.0).abs() < 1e-14);
        assert!((n.eps - 1.0).abs() < 1e-14);
    }

    #[test]
    fn transform_identity() {
        let id = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let v = Vec3::<f64>::from_f64([1.0, -2.0, 3.5]);
        assert_eq!(v.transform(&id).value(), v.value());
    }
}

//! Six degree of freedom rigid-body state for dynamic groups.

use nalgebra::{Matrix3, Vector3};

use crate::{GroupError, GroupResult};

/// Mass properties and momentum state of a freely moving group.
///
/// Inertia is stored as the six independent body-axis components
/// `[Ixx, Iyy, Izz, Ixy, Ixz, Iyz]`.
#[derive(Clone, Debug, PartialEq)]
pub struct RigidBody {
    pub mass: f64,
    pub inertia: [f64; 6],
    pub linear_momentum: Vector3<f64>,
    pub angular_momentum: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub angular_velocity: Vector3<f64>,
    pub acceleration: Vector3<f64>,
    pub angular_acceleration: Vector3<f64>,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self::from_raw(0.0, [0.0; 6])
    }
}

impl RigidBody {
    /// Unchecked construction, used when loading saved state.
    pub fn from_raw(mass: f64, inertia: [f64; 6]) -> Self {
        Self {
            mass,
            inertia,
            linear_momentum: Vector3::zeros(),
            angular_momentum: Vector3::zeros(),
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            acceleration: Vector3::zeros(),
            angular_acceleration: Vector3::zeros(),
        }
    }

    pub fn new(mass: f64, inertia: [f64; 6]) -> GroupResult<Self> {
        let body = Self::from_raw(mass, inertia);
        body.validate()?;
        Ok(body)
    }

    pub fn validate(&self) -> GroupResult<()> {
        if !(self.mass > 0.0) || !self.mass.is_finite() {
            return Err(GroupError::InvalidArg {
                what: "mass must be positive and finite",
            });
        }
        if self.inertia.iter().any(|v| !v.is_finite()) {
            return Err(GroupError::InvalidArg {
                what: "inertia components must be finite",
            });
        }
        Ok(())
    }

    /// Body-axis inertia tensor.
    pub fn inertia_matrix(&self) -> Matrix3<f64> {
        let [ixx, iyy, izz, ixy, ixz, iyz] = self.inertia;
        Matrix3::new(ixx, -ixy, -ixz, -ixy, iyy, -iyz, -ixz, -iyz, izz)
    }

    /// Seed momenta from a known initial motion.
    pub fn set_initial_motion(
        &mut self,
        velocity: Vector3<f64>,
        angular_velocity: Vector3<f64>,
        rotation: &Matrix3<f64>,
    ) {
        self.velocity = velocity;
        self.angular_velocity = angular_velocity;
        self.linear_momentum = velocity * self.mass;
        self.angular_momentum = rotation * self.inertia_matrix() * rotation.transpose() * angular_velocity;
    }

    /// Advance momenta by one explicit step under world-frame `force` and
    /// `moment`; `rotation` is the current body-to-world rotation.
    pub fn step(
        &mut self,
        force: Vector3<f64>,
        moment: Vector3<f64>,
        rotation: &Matrix3<f64>,
        dt: f64,
    ) -> GroupResult<()> {
        self.validate()?;
        if !(dt > 0.0) {
            return Err(GroupError::InvalidArg {
                what: "time step must be positive",
            });
        }

        self.linear_momentum += force * dt;
        let velocity = self.linear_momentum / self.mass;
        self.acceleration = (velocity - self.velocity) / dt;
        self.velocity = velocity;

        self.angular_momentum += moment * dt;
        let world_inertia = rotation * self.inertia_matrix() * rotation.transpose();
        let inverse = world_inertia.try_inverse().ok_or(GroupError::Singular {
            what: "world-frame inertia tensor",
        })?;
        let angular_velocity = inverse * self.angular_momentum;
        self.angular_acceleration = (angular_velocity - self.angular_velocity) / dt;
        self.angular_velocity = angular_velocity;
        Ok(())
    }
}

//! Motion classification and rigid pose of a component group.

use nalgebra::{Matrix3, Quaternion, Unit, UnitQuaternion, Vector3};

/// Kinematics update path taken by a group each time step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionKind {
    /// Geometry never moves
    Fixed,
    /// Constant angular rate about the rotation axis
    SteadyRate,
    /// Bounded sinusoidal oscillation about the rotation axis
    Periodic,
    /// Six degree of freedom integration driven by aerodynamic loads
    Dynamic,
}

impl MotionKind {
    /// Classify from group flags. Fixed wins over dynamic, dynamic over
    /// periodic, periodic over steady.
    pub fn classify(is_fixed: bool, is_dynamic: bool, is_rotor: bool, angle_max: f64) -> Self {
        if is_fixed {
            MotionKind::Fixed
        } else if is_dynamic {
            MotionKind::Dynamic
        } else if !is_rotor && angle_max > 0.0 {
            MotionKind::Periodic
        } else {
            MotionKind::SteadyRate
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MotionKind::Fixed => "fixed",
            MotionKind::SteadyRate => "steady-rate",
            MotionKind::Periodic => "periodic",
            MotionKind::Dynamic => "dynamic",
        }
    }
}

/// Rigid placement of a group at the current time.
///
/// A body point `x` moves to `rotation * (x - origin) + origin + translation`.
/// Velocities are world-frame.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupPose {
    pub origin: [f64; 3],
    /// Row-major rotation matrix of the total rotation since the last reset
    pub rotation: [[f64; 3]; 3],
    pub translation: [f64; 3],
    pub angular_velocity: [f64; 3],
    pub velocity: [f64; 3],
}

impl Default for GroupPose {
    fn default() -> Self {
        Self {
            origin: [0.0; 3],
            rotation: IDENTITY,
            translation: [0.0; 3],
            angular_velocity: [0.0; 3],
            velocity: [0.0; 3],
        }
    }
}

const IDENTITY: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

impl GroupPose {
    pub fn is_identity(&self) -> bool {
        self.rotation == IDENTITY && self.translation == [0.0; 3]
    }

    /// Place a body point.
    pub fn transform_point(&self, x: [f64; 3]) -> [f64; 3] {
        let r = [
            x[0] - self.origin[0],
            x[1] - self.origin[1],
            x[2] - self.origin[2],
        ];
        let mut out = [0.0; 3];
        for (i, row) in self.rotation.iter().enumerate() {
            out[i] = row[0] * r[0] + row[1] * r[1] + row[2] * r[2]
                + self.origin[i]
                + self.translation[i];
        }
        out
    }

    /// Current centre of rotation.
    pub fn center(&self) -> [f64; 3] {
        [
            self.origin[0] + self.translation[0],
            self.origin[1] + self.translation[1],
            self.origin[2] + self.translation[2],
        ]
    }

    /// Velocity of the material point currently at `x`.
    pub fn point_velocity(&self, x: [f64; 3]) -> [f64; 3] {
        let c = self.center();
        let r = Vector3::new(x[0] - c[0], x[1] - c[1], x[2] - c[2]);
        let w = Vector3::from(self.angular_velocity);
        let v = w.cross(&r) + Vector3::from(self.velocity);
        [v.x, v.y, v.z]
    }
}

/// Rotation of `angle` radians about `axis`. A zero axis gives identity.
pub fn axis_angle_quaternion(axis: [f64; 3], angle: f64) -> Quaternion<f64> {
    let a = Vector3::from(axis);
    if a.norm() == 0.0 || angle == 0.0 {
        return Quaternion::identity();
    }
    UnitQuaternion::from_axis_angle(&Unit::new_normalize(a), angle).into_inner()
}

pub(crate) fn rotation_matrix(q: &Quaternion<f64>) -> Matrix3<f64> {
    UnitQuaternion::from_quaternion(*q)
        .to_rotation_matrix()
        .into_inner()
}

pub(crate) fn to_rows(m: &Matrix3<f64>) -> [[f64; 3]; 3] {
    let mut rows = [[0.0; 3]; 3];
    for (i, row) in rows.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v = m[(i, j)];
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn classification_priority() {
        assert_eq!(MotionKind::classify(true, true, true, 1.0), MotionKind::Fixed);
        assert_eq!(MotionKind::classify(false, true, false, 1.0), MotionKind::Dynamic);
        assert_eq!(MotionKind::classify(false, false, false, 0.3), MotionKind::Periodic);
        assert_eq!(MotionKind::classify(false, false, true, 0.3), MotionKind::SteadyRate);
        assert_eq!(MotionKind::classify(false, false, false, 0.0), MotionKind::SteadyRate);
    }

    #[test]
    fn quarter_turn_about_z() {
        let q = axis_angle_quaternion([0.0, 0.0, 2.0], FRAC_PI_2);
        let pose = GroupPose {
            rotation: to_rows(&rotation_matrix(&q)),
            ..GroupPose::default()
        };
        let p = pose.transform_point([1.0, 0.0, 0.0]);
        assert!((p[0]).abs() < 1e-14);
        assert!((p[1] - 1.0).abs() < 1e-14);
    }

    #[test]
    fn spinning_point_velocity() {
        let pose = GroupPose {
            angular_velocity: [0.0, 0.0, 3.0],
            ..GroupPose::default()
        };
        let v = pose.point_velocity([2.0, 0.0, 0.0]);
        assert_eq!(v, [0.0, 6.0, 0.0]);
    }
}

//! Component groups: rigid-motion kinematics and force bookkeeping.
//!
//! Provides:
//! - `ComponentGroup`: per-group motion state machine (fixed, steady rate,
//!   periodic, full 6-DOF dynamic) with quaternion orientation tracking
//! - instantaneous and time-averaged force/moment/power coefficients
//! - span loading records per lifting surface
//! - line-oriented group data file read/write

pub mod coefficients;
pub mod dynamics;
pub mod error;
pub mod group;
pub mod io;
pub mod motion;
pub mod span_load;

pub use coefficients::{
    CoefficientSet, ForceKind, GroupReference, RotorCoefficients, Slot, TimePair,
};
pub use dynamics::RigidBody;
pub use error::{GroupError, GroupResult};
pub use group::ComponentGroup;
pub use io::{read_groups, write_groups};
pub use motion::{GroupPose, MotionKind};
pub use span_load::SpanLoadData;

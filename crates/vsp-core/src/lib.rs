//! vsp-core: shared foundation for the vortex-lattice workspace.
//!
//! Contains:
//! - numeric (finite checks, guarded ratios, running means)
//! - scalar (generic differentiable scalar + 3-vectors over it)
//! - offset (public array-index convention)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod offset;
pub mod scalar;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use offset::ArrayOffset;
pub use scalar::{Scalar, Vec3};

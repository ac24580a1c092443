// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Linear algebra helpers used while accumulating transforms down a path.
//!
//! Everything is `f64`.

mod mat4;
mod vec3;

pub use mat4::Mat4;
pub use vec3::Vec3;

/// Tolerance used by [`Mat4::axis_dots`] callers when checking that a
/// transform keeps the basis axes perpendicular.
pub const ORTHO_TOLERANCE: f64 = 1.0e-4;

/// Degeneracy threshold for inversion and direction reciprocals.
pub const EPSILON: f64 = 1.0e-12;

/// Returns `true` when `value` lies within `tol` of zero (inclusive).
pub fn near_zero(value: f64, tol: f64) -> bool {
    value.abs() <= tol
}

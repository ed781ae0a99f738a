//! `egopose-geometry` – rigid-body math for pose trajectories.
//!
//! # Modules
//!
//! - [`transform`] – [`Vec3`][transform::Vec3], unit
//!   [`Quaternion`][transform::Quaternion] (w, x, y, z) and the SE3
//!   [`Transform3D`][transform::Transform3D] with composition and inversion.
//! - [`rotation`] – [`Mat3`][rotation::Mat3] plus the two conversions every
//!   frame goes through: Gram-Schmidt
//!   [`orthonormalize`][rotation::orthonormalize] of a raw 6D rotation, and
//!   the Shepperd [`matrix_to_quaternion`][rotation::matrix_to_quaternion] /
//!   closed-form [`quaternion_to_matrix`][rotation::quaternion_to_matrix]
//!   codec.
//!
//! All functions are pure and operate on `Copy` values, so callers are free
//! to map them over frames in any order or in parallel.

pub mod rotation;
pub mod transform;

pub use rotation::{
    DEFAULT_DEGENERACY_EPSILON, DegenerateInput, Mat3, ShepperdBranch, matrix_to_quaternion,
    matrix_to_rotation6, orthonormalize, orthonormalize_with_epsilon, quaternion_to_matrix,
    shepperd_branch,
};
pub use transform::{Quaternion, Transform3D, Vec3};

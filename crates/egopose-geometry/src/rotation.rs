//! Rotation matrices, Gram-Schmidt orthonormalization and the
//! matrix ↔ quaternion codec.
//!
//! The raw 6D encoding stores the first two columns of a rotation matrix
//! without any constraint.  [`orthonormalize`] turns them into a proper
//! rotation:
//!
//! ```text
//! c1 = v1 / |v1|
//! c2 = (v2 − (c1·v2)·c1) / |…|
//! c3 = c1 × c2
//! R  = [c1 | c2 | c3]
//! ```
//!
//! [`matrix_to_quaternion`] uses Shepperd's method: the pivot is chosen from
//! the trace and the diagonal so the square root never operates on a value
//! close to zero, which keeps rotations near π well conditioned.
//!
//! # Example
//!
//! ```rust
//! use egopose_geometry::rotation::{matrix_to_quaternion, orthonormalize, quaternion_to_matrix};
//! use egopose_geometry::transform::Vec3;
//!
//! let m = orthonormalize(Vec3::new(2.0, 0.0, 0.0), Vec3::new(1.0, 3.0, 0.0)).unwrap();
//! let q = matrix_to_quaternion(m);
//! assert!((q.w - 1.0).abs() < 1e-12);
//! assert!(quaternion_to_matrix(q).max_abs_diff(&m) < 1e-12);
//! ```

use egopose_types::BasisVector;
use thiserror::Error;

use crate::transform::{Quaternion, Vec3};

/// Norms at or below this value are treated as degenerate.
pub const DEFAULT_DEGENERACY_EPSILON: f64 = 1e-8;

// ────────────────────────────────────────────────────────────────────────────
// Mat3
// ────────────────────────────────────────────────────────────────────────────

/// A 3×3 matrix stored row-major: `m[row][col]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3 {
    pub m: [[f64; 3]; 3],
}

impl Mat3 {
    pub fn from_rows(m: [[f64; 3]; 3]) -> Self {
        Self { m }
    }

    pub fn from_columns(c1: Vec3, c2: Vec3, c3: Vec3) -> Self {
        Self::from_rows([[c1.x, c2.x, c3.x], [c1.y, c2.y, c3.y], [c1.z, c2.z, c3.z]])
    }

    pub fn identity() -> Self {
        Self::from_rows([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
    }

    /// Column `i` (0-based).
    pub fn column(&self, i: usize) -> Vec3 {
        Vec3::new(self.m[0][i], self.m[1][i], self.m[2][i])
    }

    pub fn trace(&self) -> f64 {
        self.m[0][0] + self.m[1][1] + self.m[2][2]
    }

    pub fn determinant(&self) -> f64 {
        // Scalar triple product of the columns.
        self.column(0).dot(self.column(1).cross(self.column(2)))
    }

    pub fn transpose(&self) -> Self {
        let m = &self.m;
        Self::from_rows([
            [m[0][0], m[1][0], m[2][0]],
            [m[0][1], m[1][1], m[2][1]],
            [m[0][2], m[1][2], m[2][2]],
        ])
    }

    pub fn mul(&self, rhs: &Self) -> Self {
        let mut out = [[0.0; 3]; 3];
        for (r, row) in out.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.m[r][k] * rhs.m[k][c]).sum();
            }
        }
        Self::from_rows(out)
    }

    /// Largest absolute elementwise difference.
    pub fn max_abs_diff(&self, other: &Self) -> f64 {
        self.m
            .iter()
            .flatten()
            .zip(other.m.iter().flatten())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Orthonormalizer
// ────────────────────────────────────────────────────────────────────────────

/// Gram-Schmidt could not build a basis: one of the input columns has no
/// usable direction.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("{basis} basis vector has norm {norm:e} (threshold {epsilon:e})")]
pub struct DegenerateInput {
    pub basis: BasisVector,
    pub norm: f64,
    pub epsilon: f64,
}

/// Orthonormalize `(v1, v2)` into a right-handed rotation matrix using
/// [`DEFAULT_DEGENERACY_EPSILON`].
pub fn orthonormalize(v1: Vec3, v2: Vec3) -> Result<Mat3, DegenerateInput> {
    orthonormalize_with_epsilon(v1, v2, DEFAULT_DEGENERACY_EPSILON)
}

/// Orthonormalize `(v1, v2)` into `[c1 | c2 | c1 × c2]`.
///
/// Fails when `|v1|` or the component of `v2` orthogonal to `v1` is at or
/// below `epsilon`.  Nothing is padded: a zero encoding is an upstream bug
/// and is reported as such.
pub fn orthonormalize_with_epsilon(
    v1: Vec3,
    v2: Vec3,
    epsilon: f64,
) -> Result<Mat3, DegenerateInput> {
    let c1 = normalize(v1, BasisVector::First, epsilon)?;
    let c2 = normalize(v2.sub(c1.scale(c1.dot(v2))), BasisVector::Second, epsilon)?;
    let c3 = c1.cross(c2);
    Ok(Mat3::from_columns(c1, c2, c3))
}

fn normalize(v: Vec3, basis: BasisVector, epsilon: f64) -> Result<Vec3, DegenerateInput> {
    let norm = v.norm();
    // `!(norm > epsilon)` also catches NaN.
    if !(norm > epsilon) {
        return Err(DegenerateInput {
            basis,
            norm,
            epsilon,
        });
    }
    Ok(v.scale(1.0 / norm))
}

/// Pack columns 1 and 2 of `m` back into the raw 6D encoding.
pub fn matrix_to_rotation6(m: &Mat3) -> [f64; 6] {
    let c1 = m.column(0);
    let c2 = m.column(1);
    [c1.x, c1.y, c1.z, c2.x, c2.y, c2.z]
}

// ────────────────────────────────────────────────────────────────────────────
// Rotation codec
// ────────────────────────────────────────────────────────────────────────────

/// Which Shepperd pivot a matrix selects, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShepperdBranch {
    /// `trace > 0`: pivot on w.
    Trace,
    /// `m00` is the largest diagonal entry.
    PivotX,
    /// `m11` is the largest of the remaining entries.
    PivotY,
    /// Otherwise.
    PivotZ,
}

/// Select the Shepperd branch for `m`.
pub fn shepperd_branch(m: &Mat3) -> ShepperdBranch {
    let [[m00, _, _], [_, m11, _], [_, _, m22]] = m.m;
    if m.trace() > 0.0 {
        ShepperdBranch::Trace
    } else if m00 > m11 && m00 > m22 {
        ShepperdBranch::PivotX
    } else if m11 > m22 {
        ShepperdBranch::PivotY
    } else {
        ShepperdBranch::PivotZ
    }
}

/// Convert a rotation matrix into a unit quaternion (w, x, y, z).
///
/// The pivot component is `s / 4` with `s = 2·sqrt(1 + pivot terms)`; the
/// other three come from off-diagonal sums and differences divided by `s`.
/// The result is renormalized.  No sign convention is imposed: `q` and `−q`
/// are equally valid outputs.
pub fn matrix_to_quaternion(m: Mat3) -> Quaternion {
    let [[m00, m01, m02], [m10, m11, m12], [m20, m21, m22]] = m.m;

    let q = match shepperd_branch(&m) {
        ShepperdBranch::Trace => {
            let s = (m.trace() + 1.0).sqrt() * 2.0; // 4w
            Quaternion::new(0.25 * s, (m21 - m12) / s, (m02 - m20) / s, (m10 - m01) / s)
        }
        ShepperdBranch::PivotX => {
            let s = (1.0 + m00 - m11 - m22).sqrt() * 2.0; // 4x
            Quaternion::new((m21 - m12) / s, 0.25 * s, (m01 + m10) / s, (m02 + m20) / s)
        }
        ShepperdBranch::PivotY => {
            let s = (1.0 + m11 - m00 - m22).sqrt() * 2.0; // 4y
            Quaternion::new((m02 - m20) / s, (m01 + m10) / s, 0.25 * s, (m12 + m21) / s)
        }
        ShepperdBranch::PivotZ => {
            let s = (1.0 + m22 - m00 - m11).sqrt() * 2.0; // 4z
            Quaternion::new((m10 - m01) / s, (m02 + m20) / s, (m12 + m21) / s, 0.25 * s)
        }
    };

    q.normalized()
}

/// Convert a unit quaternion (w, x, y, z) into a rotation matrix.
pub fn quaternion_to_matrix(q: Quaternion) -> Mat3 {
    let Quaternion { w, x, y, z } = q;
    Mat3::from_rows([
        [
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y - w * z),
            2.0 * (x * z + w * y),
        ],
        [
            2.0 * (x * y + w * z),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z - w * x),
        ],
        [
            2.0 * (x * z - w * y),
            2.0 * (y * z + w * x),
            1.0 - 2.0 * (x * x + y * y),
        ],
    ])
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal, Uniform};
    use std::f64::consts::PI;

    fn gaussian_vec3(rng: &mut StdRng, normal: &Normal<f64>) -> Vec3 {
        Vec3::new(normal.sample(rng), normal.sample(rng), normal.sample(rng))
    }

    fn random_unit_quaternion(rng: &mut StdRng) -> Quaternion {
        let normal = Normal::new(0.0, 1.0).unwrap();
        Quaternion::new(
            normal.sample(rng),
            normal.sample(rng),
            normal.sample(rng),
            normal.sample(rng),
        )
        .normalized()
    }

    /// A rotation of angle in `[2.3, π]` about an axis dominated by `pivot`,
    /// which forces trace ≤ 0 and makes `m[pivot][pivot]` the largest
    /// diagonal entry.
    fn rotation_near_pi(rng: &mut StdRng, pivot: usize) -> Mat3 {
        let noise = Uniform::new(-0.3, 0.3);
        let mut axis = [noise.sample(rng), noise.sample(rng), noise.sample(rng)];
        axis[pivot] = 1.0;
        let angle = Uniform::new(2.3, PI).sample(rng);
        quaternion_to_matrix(Quaternion::from_axis_angle(Vec3::from_array(axis), angle))
    }

    fn assert_same_rotation(a: Quaternion, b: Quaternion, eps: f64) {
        let b = if a.dot(b) < 0.0 { b.neg() } else { b };
        assert_relative_eq!(a.w, b.w, epsilon = eps);
        assert_relative_eq!(a.x, b.x, epsilon = eps);
        assert_relative_eq!(a.y, b.y, epsilon = eps);
        assert_relative_eq!(a.z, b.z, epsilon = eps);
    }

    // ── Mat3 ────────────────────────────────────────────────────────────────

    #[test]
    fn from_columns_places_vectors_in_columns() {
        let m = Mat3::from_columns(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(4.0, 5.0, 6.0),
            Vec3::new(7.0, 8.0, 9.0),
        );
        assert_eq!(m.m[0], [1.0, 4.0, 7.0]);
        assert_eq!(m.column(2), Vec3::new(7.0, 8.0, 9.0));
        assert_eq!(m.transpose().m[0], [1.0, 2.0, 3.0]);
    }

    #[test]
    fn rotation_times_transpose_is_identity() {
        let mut rng = StdRng::seed_from_u64(3);
        let r = quaternion_to_matrix(random_unit_quaternion(&mut rng));
        assert!(r.mul(&r.transpose()).max_abs_diff(&Mat3::identity()) < 1e-12);
    }

    // ── Orthonormalizer ─────────────────────────────────────────────────────

    #[test]
    fn orthonormalize_produces_proper_rotation() {
        let mut rng = StdRng::seed_from_u64(42);
        let normal = Normal::new(0.0, 1.0).unwrap();
        for _ in 0..500 {
            let v1 = gaussian_vec3(&mut rng, &normal);
            let v2 = gaussian_vec3(&mut rng, &normal);
            let m = orthonormalize(v1, v2).unwrap();
            let (c1, c2, c3) = (m.column(0), m.column(1), m.column(2));
            assert!(c1.dot(c2).abs() < 1e-6);
            assert!(c1.dot(c3).abs() < 1e-6);
            assert!(c2.dot(c3).abs() < 1e-6);
            assert_relative_eq!(m.determinant(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn orthonormalize_keeps_first_direction() {
        let m = orthonormalize(Vec3::new(0.0, 0.0, 5.0), Vec3::new(1.0, 0.0, 1.0)).unwrap();
        assert_eq!(m.column(0), Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(m.column(1), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(m.column(2), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn orthonormalize_rejects_zero_first_column() {
        let err = orthonormalize(Vec3::zero(), Vec3::new(0.0, 1.0, 0.0)).unwrap_err();
        assert_eq!(err.basis, BasisVector::First);
        assert_eq!(err.norm, 0.0);
    }

    #[test]
    fn orthonormalize_rejects_collinear_columns() {
        let err =
            orthonormalize(Vec3::new(1.0, 1.0, 0.0), Vec3::new(-2.0, -2.0, 0.0)).unwrap_err();
        assert_eq!(err.basis, BasisVector::Second);
    }

    #[test]
    fn orthonormalize_rejects_nan() {
        let err = orthonormalize(Vec3::new(f64::NAN, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0))
            .unwrap_err();
        assert_eq!(err.basis, BasisVector::First);
    }

    #[test]
    fn custom_epsilon_is_honoured() {
        let v1 = Vec3::new(1e-4, 0.0, 0.0);
        let v2 = Vec3::new(0.0, 1.0, 0.0);
        assert!(orthonormalize(v1, v2).is_ok());
        assert!(orthonormalize_with_epsilon(v1, v2, 1e-3).is_err());
    }

    #[test]
    fn rotation6_packs_first_two_columns() {
        let m = Mat3::from_columns(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(4.0, 5.0, 6.0),
            Vec3::new(7.0, 8.0, 9.0),
        );
        assert_eq!(matrix_to_rotation6(&m), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    // ── Shepperd branches ───────────────────────────────────────────────────

    #[test]
    fn branch_selection_follows_priority() {
        assert_eq!(shepperd_branch(&Mat3::identity()), ShepperdBranch::Trace);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(shepperd_branch(&rotation_near_pi(&mut rng, 0)), ShepperdBranch::PivotX);
        assert_eq!(shepperd_branch(&rotation_near_pi(&mut rng, 1)), ShepperdBranch::PivotY);
        assert_eq!(shepperd_branch(&rotation_near_pi(&mut rng, 2)), ShepperdBranch::PivotZ);
    }

    #[test]
    fn half_turns_hit_each_pivot_exactly() {
        let cases = [
            ([1.0, -1.0, -1.0], [0.0, 1.0, 0.0, 0.0]),
            ([-1.0, 1.0, -1.0], [0.0, 0.0, 1.0, 0.0]),
            ([-1.0, -1.0, 1.0], [0.0, 0.0, 0.0, 1.0]),
        ];
        for ([d0, d1, d2], expected) in cases {
            let m = Mat3::from_rows([[d0, 0.0, 0.0], [0.0, d1, 0.0], [0.0, 0.0, d2]]);
            assert_eq!(matrix_to_quaternion(m).to_wxyz(), expected);
        }
    }

    #[test]
    fn each_pivot_branch_matches_the_generating_quaternion() {
        let mut rng = StdRng::seed_from_u64(7);
        let normal = Normal::new(0.0, 0.1).unwrap();
        for pivot in 0..3 {
            for _ in 0..50 {
                let mut c = gaussian_vec3(&mut rng, &normal).to_array();
                c[pivot] = 1.0;
                let q = Quaternion::new(normal.sample(&mut rng), c[0], c[1], c[2]).normalized();
                let m = quaternion_to_matrix(q);
                assert_eq!(shepperd_branch(&m) as usize, pivot + 1);
                assert_same_rotation(q, matrix_to_quaternion(m), 1e-10);
            }
        }
    }

    // ── Codec properties ────────────────────────────────────────────────────

    #[test]
    fn quaternion_roundtrip_up_to_sign() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1000 {
            let q = random_unit_quaternion(&mut rng);
            assert_same_rotation(q, matrix_to_quaternion(quaternion_to_matrix(q)), 1e-9);
        }
    }

    #[test]
    fn matrix_roundtrip_within_tolerance() {
        let mut rng = StdRng::seed_from_u64(12);
        for _ in 0..1000 {
            let m = quaternion_to_matrix(random_unit_quaternion(&mut rng));
            let back = quaternion_to_matrix(matrix_to_quaternion(m));
            assert!(back.max_abs_diff(&m) < 1e-5);
        }
    }

    #[test]
    fn quaternion_norms_are_unit_across_all_branches() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut seen = [0usize; 4];
        for i in 0..1000 {
            let m = match i % 4 {
                0 => quaternion_to_matrix(Quaternion::from_axis_angle(
                    Vec3::new(0.3, -0.2, 0.9),
                    Uniform::new(0.0, 2.0).sample(&mut rng),
                )),
                pivot => rotation_near_pi(&mut rng, pivot - 1),
            };
            let branch = shepperd_branch(&m);
            seen[branch as usize] += 1;
            assert_relative_eq!(matrix_to_quaternion(m).norm(), 1.0, epsilon = 1e-6);
        }
        assert!(seen.iter().all(|&n| n == 250), "branch coverage {seen:?}");
    }

    #[test]
    fn orthonormalized_matrix_survives_codec() {
        let m = orthonormalize(Vec3::new(0.2, 0.9, -0.1), Vec3::new(-1.0, 0.1, 0.4)).unwrap();
        let back = quaternion_to_matrix(matrix_to_quaternion(m));
        assert!(back.max_abs_diff(&m) < 1e-12);
    }
}

//! SE3 primitives.
//!
//! A [`Transform3D`] is a unit [`Quaternion`] rotation plus a [`Vec3`]
//! translation.  It maps points expressed in a child frame (e.g. the
//! head-mounted camera) into the parent frame (the world): rotate, then
//! translate.
//!
//! # Example
//!
//! ```rust
//! use egopose_geometry::transform::{Quaternion, Transform3D, Vec3};
//!
//! let t = Transform3D::new(Vec3::new(1.0, 2.0, 3.0), Quaternion::identity());
//! let back = t.compose(t.inverse());
//! assert!(back.translation.norm() < 1e-12);
//! ```

use egopose_types::Pose;

// ────────────────────────────────────────────────────────────────────────────
// Primitive types
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Create a new vector.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn from_array(a: [f64; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    pub fn scale(self, k: f64) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }

    pub fn neg(self) -> Self {
        self.scale(-1.0)
    }

    pub fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Right-handed cross product.
    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }
}

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    /// Create a quaternion.  The caller is responsible for providing a unit
    /// quaternion (|q| = 1); see [`Quaternion::normalized`].
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation (no rotation).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    pub fn from_wxyz(q: [f64; 4]) -> Self {
        Self::new(q[0], q[1], q[2], q[3])
    }

    pub fn to_wxyz(self) -> [f64; 4] {
        [self.w, self.x, self.y, self.z]
    }

    /// Rotation of `angle` radians about `axis` (need not be unit length).
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Self {
        let n = axis.norm();
        if n <= f64::EPSILON {
            return Self::identity();
        }
        let (s, c) = (angle * 0.5).sin_cos();
        let a = axis.scale(s / n);
        Self::new(c, a.x, a.y, a.z)
    }

    /// Hamilton product: compose two rotations.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// The other representative of the same rotation.
    pub fn neg(self) -> Self {
        Self::new(-self.w, -self.x, -self.y, -self.z)
    }

    pub fn dot(self, rhs: Self) -> f64 {
        self.w * rhs.w + self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Rescale to unit length.  A zero quaternion carries no rotation and
    /// maps to the identity.
    pub fn normalized(self) -> Self {
        let n = self.norm();
        if n <= f64::EPSILON {
            return Self::identity();
        }
        Self::new(self.w / n, self.x / n, self.y / n, self.z / n)
    }

    /// Rotate a vector by this quaternion: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        // Express v as a pure quaternion.
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Transform3D
// ────────────────────────────────────────────────────────────────────────────

/// A rigid-body 3-D transform: rotation followed by translation.
///
/// Represents the pose of frame B relative to frame A: to convert a point
/// expressed in frame B into frame A, rotate it by `rotation` then add
/// `translation`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform3D {
    pub translation: Vec3,
    pub rotation: Quaternion,
}

impl Transform3D {
    /// Create a transform from a translation and rotation.
    pub fn new(translation: Vec3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// The identity transform (no translation, no rotation).
    pub fn identity() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    /// Compose two transforms: `self` applied first, then `other`.
    ///
    /// If `self` = T_A_B and `other` = T_B_C, the result is T_A_C.  The
    /// rotation is renormalized so long chains do not drift off the unit
    /// sphere.
    pub fn compose(self, other: Self) -> Self {
        let translated = self.translation.add(self.rotation.rotate(other.translation));
        let rotated = self.rotation.mul(other.rotation).normalized();
        Self::new(translated, rotated)
    }

    /// The inverse transform: T_A_B → T_B_A.
    pub fn inverse(self) -> Self {
        let inv_rot = self.rotation.conjugate();
        Self::new(inv_rot.rotate(self.translation).neg(), inv_rot)
    }

    /// Map a point from the child frame into the parent frame.
    pub fn apply(self, p: Vec3) -> Vec3 {
        self.rotation.rotate(p).add(self.translation)
    }

    pub fn from_pose(pose: &Pose) -> Self {
        Self::new(
            Vec3::from_array(pose.xyz),
            Quaternion::from_wxyz(pose.wxyz),
        )
    }

    pub fn to_pose(self) -> Pose {
        Pose::new(self.rotation.to_wxyz(), self.translation.to_array())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

//! `egopose-types` – exchange records shared by every egopose crate.
//!
//! The upstream motion encoder hands us [`RawPose6D`] rows (`[T, 9]`); the
//! downstream body-pose model consumes a [`PoseTrajectory`] of wxyz+xyz
//! [`Pose`] rows (`[T + 1, 7]`).  Everything that can go wrong on the way is a
//! [`PoseError`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Width of a flat [`RawPose6D`] row.
pub const RAW_POSE_WIDTH: usize = 9;

/// Width of a flat [`Pose`] row.
pub const POSE_WIDTH: usize = 7;

/// Largest `| |q| − 1 |` accepted for a pose handed to us from outside.
pub const QUATERNION_NORM_TOLERANCE: f64 = 1e-3;

/// One frame of the upstream encoding: the first two columns of a rotation
/// matrix (unconstrained) followed by a translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawPose6D {
    /// Column 1 (`[0..3]`) and column 2 (`[3..6]`) of the rotation.
    pub rotation6: [f64; 6],
    /// World-frame translation, z is vertical (metres).
    pub translation: [f64; 3],
}

impl RawPose6D {
    pub fn new(rotation6: [f64; 6], translation: [f64; 3]) -> Self {
        Self {
            rotation6,
            translation,
        }
    }

    /// Build from a flat `[r0..r5, x, y, z]` row.
    pub fn from_row(row: [f64; RAW_POSE_WIDTH]) -> Self {
        let mut rotation6 = [0.0; 6];
        rotation6.copy_from_slice(&row[..6]);
        Self::new(rotation6, [row[6], row[7], row[8]])
    }

    /// Flatten back into a `[r0..r5, x, y, z]` row.
    pub fn to_row(&self) -> [f64; RAW_POSE_WIDTH] {
        let mut row = [0.0; RAW_POSE_WIDTH];
        row[..6].copy_from_slice(&self.rotation6);
        row[6..].copy_from_slice(&self.translation);
        row
    }

    /// Parse a `[T, 9]` buffer, rejecting rows of the wrong width.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Vec<Self>, PoseError> {
        rows.iter()
            .enumerate()
            .map(|(frame, row)| {
                let row = row.as_ref();
                let fixed: [f64; RAW_POSE_WIDTH] =
                    row.try_into().map_err(|_| PoseError::InvalidShape {
                        frame,
                        expected: RAW_POSE_WIDTH,
                        actual: row.len(),
                    })?;
                Ok(Self::from_row(fixed))
            })
            .collect()
    }

    pub fn first_column(&self) -> [f64; 3] {
        [self.rotation6[0], self.rotation6[1], self.rotation6[2]]
    }

    pub fn second_column(&self) -> [f64; 3] {
        [self.rotation6[3], self.rotation6[4], self.rotation6[5]]
    }

    /// `true` when none of the nine components is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.rotation6
            .iter()
            .chain(self.translation.iter())
            .all(|v| v.is_finite())
    }
}

/// One SE3 pose: unit quaternion (w, x, y, z) then translation (x, y, z).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Pose {
    pub wxyz: [f64; 4],
    pub xyz: [f64; 3],
}

impl Pose {
    pub fn new(wxyz: [f64; 4], xyz: [f64; 3]) -> Self {
        Self { wxyz, xyz }
    }

    /// The identity pose: no rotation, origin translation.
    pub fn identity() -> Self {
        Self::new([1.0, 0.0, 0.0, 0.0], [0.0; 3])
    }

    pub fn from_row(row: [f64; POSE_WIDTH]) -> Self {
        Self::new([row[0], row[1], row[2], row[3]], [row[4], row[5], row[6]])
    }

    pub fn to_row(&self) -> [f64; POSE_WIDTH] {
        let mut row = [0.0; POSE_WIDTH];
        row[..4].copy_from_slice(&self.wxyz);
        row[4..].copy_from_slice(&self.xyz);
        row
    }

    /// Euclidean norm of the quaternion part.
    pub fn quaternion_norm(&self) -> f64 {
        self.wxyz.iter().map(|c| c * c).sum::<f64>().sqrt()
    }

    /// `true` when none of the seven components is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.wxyz.iter().chain(self.xyz.iter()).all(|v| v.is_finite())
    }
}

/// How the synthetic frame 0 of a [`PoseTrajectory`] is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InitialFramePolicy {
    /// Assume the 0→1 step equals the 1→2 rigid-motion step.
    #[default]
    Extrapolate,
    /// Copy frame 1.
    RepeatFirst,
    /// Identity rotation at the origin.
    Identity,
}

impl std::fmt::Display for InitialFramePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitialFramePolicy::Extrapolate => write!(f, "extrapolate"),
            InitialFramePolicy::RepeatFirst => write!(f, "repeat_first"),
            InitialFramePolicy::Identity => write!(f, "identity"),
        }
    }
}

impl std::str::FromStr for InitialFramePolicy {
    type Err = PoseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "extrapolate" => Ok(InitialFramePolicy::Extrapolate),
            "repeat_first" | "repeat-first" | "first" => Ok(InitialFramePolicy::RepeatFirst),
            "identity" => Ok(InitialFramePolicy::Identity),
            other => Err(PoseError::InvalidConfig(format!(
                "unknown initial frame policy '{other}'"
            ))),
        }
    }
}

/// Non-fatal annotations attached to a converted trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrajectoryWarning {
    /// Fewer than two input frames: frame 0 is a nudged copy of frame 1
    /// rather than a true extrapolation.
    InsufficientFrames { frames: usize },
}

impl std::fmt::Display for TrajectoryWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrajectoryWarning::InsufficientFrames { frames } => write!(
                f,
                "only {frames} input frame(s); initial frame is a low-confidence fallback"
            ),
        }
    }
}

/// `T + 1` poses: index 0 is synthetic, indices `1..=T` map to the inputs.
///
/// Built once by the trajectory assembler and never mutated afterwards.
/// Deserialization goes through [`PoseTrajectory::from_parts`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "PoseTrajectoryParts")]
pub struct PoseTrajectory {
    poses: Vec<Pose>,
    /// Timestamps of the real frames `1..=T`; empty when none were requested.
    timestamps_ns: Vec<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<TrajectoryWarning>,
}

/// Unchecked wire form of a [`PoseTrajectory`].
#[derive(Deserialize, JsonSchema)]
struct PoseTrajectoryParts {
    poses: Vec<Pose>,
    #[serde(default)]
    timestamps_ns: Vec<u64>,
    #[serde(default)]
    warnings: Vec<TrajectoryWarning>,
}

impl TryFrom<PoseTrajectoryParts> for PoseTrajectory {
    type Error = PoseError;

    fn try_from(parts: PoseTrajectoryParts) -> Result<Self, Self::Error> {
        Self::from_parts(parts.poses, parts.timestamps_ns, parts.warnings)
    }
}

impl PoseTrajectory {
    /// Assemble a trajectory from its parts.
    ///
    /// Every pose must be finite with a quaternion norm within
    /// [`QUATERNION_NORM_TOLERANCE`] of 1.  `timestamps_ns` must be empty or
    /// hold one entry per real frame.
    pub fn from_parts(
        poses: Vec<Pose>,
        timestamps_ns: Vec<u64>,
        warnings: Vec<TrajectoryWarning>,
    ) -> Result<Self, PoseError> {
        if poses.is_empty() {
            return Err(PoseError::EmptyInput);
        }
        for (frame, pose) in poses.iter().enumerate() {
            if !pose.is_finite() {
                return Err(PoseError::NonFiniteInput { frame });
            }
            let norm = pose.quaternion_norm();
            if (norm - 1.0).abs() > QUATERNION_NORM_TOLERANCE {
                return Err(PoseError::NonUnitQuaternion { frame, norm });
            }
        }
        if !timestamps_ns.is_empty() && timestamps_ns.len() != poses.len() - 1 {
            return Err(PoseError::InvalidShape {
                frame: 0,
                expected: poses.len() - 1,
                actual: timestamps_ns.len(),
            });
        }
        Ok(Self {
            poses,
            timestamps_ns,
            warnings,
        })
    }

    /// Wrap a bare `[T + 1, 7]` buffer (no timestamps, no warnings).
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, PoseError> {
        let poses = rows
            .iter()
            .enumerate()
            .map(|(frame, row)| {
                let row = row.as_ref();
                let fixed: [f64; POSE_WIDTH] =
                    row.try_into().map_err(|_| PoseError::InvalidShape {
                        frame,
                        expected: POSE_WIDTH,
                        actual: row.len(),
                    })?;
                Ok(Pose::from_row(fixed))
            })
            .collect::<Result<Vec<_>, PoseError>>()?;
        Self::from_parts(poses, Vec::new(), Vec::new())
    }

    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }

    /// The synthetic frame preceding the first observation.
    pub fn initial(&self) -> &Pose {
        &self.poses[0]
    }

    /// The poses that correspond 1:1 to the input frames.
    pub fn observed(&self) -> &[Pose] {
        &self.poses[1..]
    }

    pub fn timestamps_ns(&self) -> &[u64] {
        &self.timestamps_ns
    }

    pub fn warnings(&self) -> &[TrajectoryWarning] {
        &self.warnings
    }

    /// Number of poses, synthetic frame included.
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Flatten into the `[T + 1, 7]` array the body-pose model expects.
    pub fn to_rows(&self) -> Vec<[f64; POSE_WIDTH]> {
        self.poses.iter().map(Pose::to_row).collect()
    }
}

/// Which Gram-Schmidt input vector collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BasisVector {
    /// The first column itself is (near) zero.
    First,
    /// The second column is (near) zero or collinear with the first.
    Second,
}

impl std::fmt::Display for BasisVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BasisVector::First => write!(f, "first"),
            BasisVector::Second => write!(f, "second"),
        }
    }
}

/// Error type for every conversion, inversion and validation entry point.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PoseError {
    #[error("Degenerate rotation at frame {frame}: {basis} basis vector has norm {norm:e}")]
    DegenerateInput {
        frame: usize,
        basis: BasisVector,
        norm: f64,
    },

    #[error("Empty input: at least one frame is required")]
    EmptyInput,

    #[error("Non-finite value in frame {frame}")]
    NonFiniteInput { frame: usize },

    #[error("Quaternion at frame {frame} has norm {norm}, expected 1")]
    NonUnitQuaternion { frame: usize, norm: f64 },

    #[error("Invalid shape at frame {frame}: expected {expected} values, got {actual}")]
    InvalidShape {
        frame: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

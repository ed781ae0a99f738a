//! Trajectory Assembler.
//!
//! Turns `T` [`RawPose6D`] frames into a [`PoseTrajectory`] of `T + 1`
//! poses:
//!
//! 1. reject non-finite frames, subtract the floor offset from z;
//! 2. Gram-Schmidt + Shepperd per frame → frames `1..=T`;
//! 3. synthesize frame 0 according to [`InitialFramePolicy`];
//! 4. optionally make quaternion signs continuous;
//! 5. attach timestamps for the real frames.
//!
//! Steps 1–2 are independent per frame (and run on rayon with the
//! `parallel` feature).  Step 3 reads frames 1 and 2, so it runs after all
//! of them are done.
//!
//! [`TrajectoryAssembler::invert`] goes the other way and drops frame 0.

use egopose_geometry::{
    Quaternion, Transform3D, Vec3, matrix_to_quaternion, matrix_to_rotation6,
    orthonormalize_with_epsilon, quaternion_to_matrix,
};
use egopose_types::{
    InitialFramePolicy, Pose, PoseError, PoseTrajectory, RawPose6D, TrajectoryWarning,
};
use tracing::{debug, instrument, warn};

use crate::config::ConversionConfig;

// ────────────────────────────────────────────────────────────────────────────
// Free-function entry points
// ────────────────────────────────────────────────────────────────────────────

/// Convert with the default policy ([`InitialFramePolicy::Extrapolate`]).
///
/// Fails with [`PoseError::EmptyInput`] when `raw` is empty.
pub fn convert_trajectory(
    raw: &[RawPose6D],
    floor_offset: f64,
    frame_interval_ns: u64,
) -> Result<PoseTrajectory, PoseError> {
    let config = ConversionConfig::default()
        .with_floor_offset(floor_offset)
        .with_frame_interval_ns(frame_interval_ns);
    TrajectoryAssembler::new(config)?.assemble(raw)
}

/// Recover the raw frames from a trajectory, dropping the synthetic frame 0.
pub fn invert_trajectory(traj: &PoseTrajectory, floor_offset: f64) -> Vec<RawPose6D> {
    traj.observed()
        .iter()
        .map(|pose| invert_frame(pose, floor_offset))
        .collect()
}

/// Encode one pose back into the 6D rotation + floor-relative translation
/// form: columns 1 and 2 of its rotation matrix, z raised by `floor_offset`.
pub fn invert_frame(pose: &Pose, floor_offset: f64) -> RawPose6D {
    let m = quaternion_to_matrix(Quaternion::from_wxyz(pose.wxyz).normalized());
    let mut translation = pose.xyz;
    translation[2] += floor_offset;
    RawPose6D::new(matrix_to_rotation6(&m), translation)
}

/// Flip every quaternion whose dot product with its predecessor is negative.
///
/// Returns the number of flipped poses.  The rotations themselves are
/// unchanged (q and −q are the same rotation).
pub fn enforce_sign_continuity(poses: &mut [Pose]) -> usize {
    let mut flips = 0;
    for i in 1..poses.len() {
        let prev = Quaternion::from_wxyz(poses[i - 1].wxyz);
        let cur = Quaternion::from_wxyz(poses[i].wxyz);
        if prev.dot(cur) < 0.0 {
            poses[i].wxyz = cur.neg().to_wxyz();
            flips += 1;
        }
    }
    flips
}

/// `0, Δ, 2Δ, …` for `frames` real frames; empty when `Δ == 0`.
pub fn synthetic_timestamps(frames: usize, frame_interval_ns: u64) -> Vec<u64> {
    if frame_interval_ns == 0 {
        return Vec::new();
    }
    (0..frames as u64)
        .map(|i| i.saturating_mul(frame_interval_ns))
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// TrajectoryAssembler
// ────────────────────────────────────────────────────────────────────────────

/// Stateless converter bound to one [`ConversionConfig`].
///
/// # Example
///
/// ```
/// use egopose_trajectory::{ConversionConfig, TrajectoryAssembler};
/// use egopose_types::{InitialFramePolicy, RawPose6D};
///
/// let frame = |x: f64| RawPose6D::new([1.0, 0.0, 0.0, 0.0, 1.0, 0.0], [x, 0.0, 1.5]);
/// let assembler = TrajectoryAssembler::new(
///     ConversionConfig::default()
///         .with_floor_offset(1.5)
///         .with_initial_frame(InitialFramePolicy::Extrapolate),
/// )
/// .unwrap();
///
/// let traj = assembler.assemble(&[frame(1.0), frame(2.0)]).unwrap();
/// assert_eq!(traj.len(), 3);
/// assert!((traj.initial().xyz[0] - 0.0).abs() < 1e-12);
/// assert!(traj.initial().xyz[2].abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct TrajectoryAssembler {
    config: ConversionConfig,
}

impl TrajectoryAssembler {
    /// Validate `config` and bind it.
    pub fn new(config: ConversionConfig) -> Result<Self, PoseError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert `raw` into a `raw.len() + 1` pose trajectory.
    ///
    /// Fails on the first frame that is non-finite or degenerate; no partial
    /// trajectory is returned.
    #[instrument(skip(self, raw), fields(frames = raw.len(), policy = %self.config.initial_frame))]
    pub fn assemble(&self, raw: &[RawPose6D]) -> Result<PoseTrajectory, PoseError> {
        if raw.is_empty() {
            return Err(PoseError::EmptyInput);
        }

        let observed = self.convert_frames(raw)?;
        let (initial, warnings) = self.initial_frame(&observed);

        let mut poses = Vec::with_capacity(observed.len() + 1);
        poses.push(initial);
        poses.extend(observed);

        if self.config.enforce_sign_continuity {
            let flips = enforce_sign_continuity(&mut poses);
            debug!(flips, "quaternion sign continuity applied");
        }

        let timestamps = synthetic_timestamps(raw.len(), self.config.frame_interval_ns);
        debug!(
            poses = poses.len(),
            timestamps = timestamps.len(),
            "trajectory assembled"
        );
        PoseTrajectory::from_parts(poses, timestamps, warnings)
    }

    /// Inverse of [`assemble`][Self::assemble] under this config's floor
    /// offset.
    pub fn invert(&self, traj: &PoseTrajectory) -> Vec<RawPose6D> {
        invert_trajectory(traj, self.config.floor_offset)
    }

    /// Convert a single frame.  `frame` is only used for error reporting.
    pub fn convert_frame(&self, frame: usize, raw: &RawPose6D) -> Result<Pose, PoseError> {
        if !raw.is_finite() {
            return Err(PoseError::NonFiniteInput { frame });
        }
        let m = orthonormalize_with_epsilon(
            Vec3::from_array(raw.first_column()),
            Vec3::from_array(raw.second_column()),
            self.config.degeneracy_epsilon,
        )
        .map_err(|e| PoseError::DegenerateInput {
            frame,
            basis: e.basis,
            norm: e.norm,
        })?;

        let mut xyz = raw.translation;
        xyz[2] -= self.config.floor_offset;
        Ok(Pose::new(matrix_to_quaternion(m).to_wxyz(), xyz))
    }

    #[cfg(feature = "parallel")]
    fn convert_frames(&self, raw: &[RawPose6D]) -> Result<Vec<Pose>, PoseError> {
        use rayon::prelude::*;
        raw.par_iter()
            .enumerate()
            .map(|(frame, r)| self.convert_frame(frame, r))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn convert_frames(&self, raw: &[RawPose6D]) -> Result<Vec<Pose>, PoseError> {
        raw.iter()
            .enumerate()
            .map(|(frame, r)| self.convert_frame(frame, r))
            .collect()
    }

    /// Frame 0 for the given observed frames (never empty).
    fn initial_frame(&self, observed: &[Pose]) -> (Pose, Vec<TrajectoryWarning>) {
        let first = observed[0];
        match self.config.initial_frame {
            InitialFramePolicy::Identity => (Pose::identity(), Vec::new()),
            InitialFramePolicy::RepeatFirst => (first, Vec::new()),
            InitialFramePolicy::Extrapolate => match observed.get(1) {
                Some(second) => (extrapolate_backwards(&first, second), Vec::new()),
                None => {
                    warn!(
                        frames = observed.len(),
                        nudge = self.config.fallback_nudge,
                        "fewer than 2 frames; initial frame is a nudged copy of frame 1"
                    );
                    let mut fallback = first;
                    fallback.xyz[2] -= self.config.fallback_nudge;
                    (
                        fallback,
                        vec![TrajectoryWarning::InsufficientFrames {
                            frames: observed.len(),
                        }],
                    )
                }
            },
        }
    }
}

/// Constant-velocity estimate of the pose preceding `first`:
/// `T0 = T1 ∘ (T1⁻¹ ∘ T2)⁻¹`.
fn extrapolate_backwards(first: &Pose, second: &Pose) -> Pose {
    let t1 = Transform3D::from_pose(first);
    let t2 = Transform3D::from_pose(second);
    let delta = t1.inverse().compose(t2);
    t1.compose(delta.inverse()).to_pose()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

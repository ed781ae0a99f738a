//! Round-Trip Validator.
//!
//! Runs `assemble` then `invert` and measures how far the recovered raw
//! frames are from the originals.  Only meaningful for inputs whose 6D
//! columns are already orthonormal: anything else is legitimately changed by
//! Gram-Schmidt and will not come back unchanged.

use egopose_types::{PoseError, RawPose6D};
use serde::Serialize;
use tracing::{debug, warn};

use crate::assembler::TrajectoryAssembler;
use crate::config::ConversionConfig;

/// Reconstruction error that still counts as a faithful round trip.
pub const DEFAULT_TOLERANCE: f64 = 1e-5;

/// Error statistics of one convert → invert round trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoundTripReport {
    /// Number of input frames.
    pub frames: usize,
    /// Largest absolute elementwise difference over all `frames × 9` values.
    pub max_abs_error: f64,
    /// Mean absolute elementwise difference.
    pub mean_abs_error: f64,
    /// Largest `| |q| − 1 |` over every pose, synthetic frame included.
    pub max_quaternion_norm_error: f64,
}

impl RoundTripReport {
    /// `true` when both the reconstruction and the quaternion norms are
    /// within `tolerance`.
    pub fn passes(&self, tolerance: f64) -> bool {
        self.max_abs_error < tolerance && self.max_quaternion_norm_error < tolerance
    }
}

impl std::fmt::Display for RoundTripReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} frames: max error {:.2e}, mean error {:.2e}, quaternion norm deviation {:.2e}",
            self.frames, self.max_abs_error, self.mean_abs_error, self.max_quaternion_norm_error
        )
    }
}

/// Convert `raw` with `config`, invert it, and compare against `raw`.
pub fn validate_round_trip(
    raw: &[RawPose6D],
    config: &ConversionConfig,
) -> Result<RoundTripReport, PoseError> {
    let assembler = TrajectoryAssembler::new(config.clone())?;
    let traj = assembler.assemble(raw)?;
    let recovered = assembler.invert(&traj);

    let (max_abs_error, mean_abs_error) = reconstruction_error(raw, &recovered)?;
    let max_quaternion_norm_error = traj
        .poses()
        .iter()
        .map(|p| (p.quaternion_norm() - 1.0).abs())
        .fold(0.0, f64::max);

    let report = RoundTripReport {
        frames: raw.len(),
        max_abs_error,
        mean_abs_error,
        max_quaternion_norm_error,
    };
    if report.passes(DEFAULT_TOLERANCE) {
        debug!(%report, "round trip ok");
    } else {
        warn!(%report, "round trip exceeds tolerance {DEFAULT_TOLERANCE:e}");
    }
    Ok(report)
}

/// Max and mean absolute elementwise difference between two raw buffers of
/// the same length.
pub fn reconstruction_error(
    original: &[RawPose6D],
    recovered: &[RawPose6D],
) -> Result<(f64, f64), PoseError> {
    if original.is_empty() {
        return Err(PoseError::EmptyInput);
    }
    if original.len() != recovered.len() {
        return Err(PoseError::InvalidShape {
            frame: original.len().min(recovered.len()),
            expected: original.len(),
            actual: recovered.len(),
        });
    }

    let mut max = 0.0_f64;
    let mut sum = 0.0;
    for (a, b) in original.iter().zip(recovered) {
        for (x, y) in a.to_row().iter().zip(b.to_row().iter()) {
            let d = (x - y).abs();
            max = max.max(d);
            sum += d;
        }
    }
    let count = (original.len() * egopose_types::RAW_POSE_WIDTH) as f64;
    Ok((max, sum / count))
}

//! Conversion settings.
//!
//! Every knob the assembler reads lives in [`ConversionConfig`]; nothing is
//! hard-coded at call sites.  The struct is serde-friendly so front ends can
//! persist it (the CLI keeps it in `~/.egopose/config.toml`).

use egopose_geometry::DEFAULT_DEGENERACY_EPSILON;
use egopose_types::{InitialFramePolicy, PoseError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Frame rate of the upstream motion encoder.
pub const DEFAULT_FPS: f64 = 10.0;

/// Downward z nudge applied to frame 1 when frame 0 cannot be extrapolated.
pub const DEFAULT_FALLBACK_NUDGE: f64 = 0.05;

/// Nanoseconds between frames at `fps`, truncated: 10 fps → 100 000 000 ns.
///
/// Rates above 1 GHz would truncate to an interval of 0, which means "no
/// timestamps", so they are rejected.
pub fn frame_interval_ns_from_fps(fps: f64) -> Result<u64, PoseError> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(PoseError::InvalidConfig(format!(
            "frame rate must be positive and finite, got {fps}"
        )));
    }
    let interval = (1e9 / fps) as u64;
    if interval == 0 {
        return Err(PoseError::InvalidConfig(format!(
            "frame rate {fps} is above 1e9 fps; frame interval would be 0 ns"
        )));
    }
    Ok(interval)
}

/// Settings for [`TrajectoryAssembler`][crate::TrajectoryAssembler].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConversionConfig {
    /// Height of the floor in the raw world frame (metres).  Subtracted from
    /// every z on conversion and added back on inversion, so the converted
    /// trajectory has its floor at z = 0.
    #[serde(default)]
    pub floor_offset: f64,

    /// Spacing of the synthetic timestamps.  `0` disables timestamps.
    #[serde(default = "default_frame_interval_ns")]
    pub frame_interval_ns: u64,

    /// How frame 0 is synthesized.
    #[serde(default)]
    pub initial_frame: InitialFramePolicy,

    /// Basis vectors with a norm at or below this are rejected.
    #[serde(default = "default_degeneracy_epsilon")]
    pub degeneracy_epsilon: f64,

    /// z nudge (metres, downward) for the single-frame fallback.
    #[serde(default = "default_fallback_nudge")]
    pub fallback_nudge: f64,

    /// Flip quaternions whose dot product with the previous frame's is
    /// negative, so the sequence has no q → −q jumps.
    #[serde(default)]
    pub enforce_sign_continuity: bool,
}

fn default_frame_interval_ns() -> u64 {
    100_000_000
}
fn default_degeneracy_epsilon() -> f64 {
    DEFAULT_DEGENERACY_EPSILON
}
fn default_fallback_nudge() -> f64 {
    DEFAULT_FALLBACK_NUDGE
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            floor_offset: 0.0,
            frame_interval_ns: default_frame_interval_ns(),
            initial_frame: InitialFramePolicy::default(),
            degeneracy_epsilon: default_degeneracy_epsilon(),
            fallback_nudge: default_fallback_nudge(),
            enforce_sign_continuity: false,
        }
    }
}

impl ConversionConfig {
    pub fn with_floor_offset(mut self, floor_offset: f64) -> Self {
        self.floor_offset = floor_offset;
        self
    }

    pub fn with_frame_interval_ns(mut self, frame_interval_ns: u64) -> Self {
        self.frame_interval_ns = frame_interval_ns;
        self
    }

    pub fn with_initial_frame(mut self, policy: InitialFramePolicy) -> Self {
        self.initial_frame = policy;
        self
    }

    pub fn with_sign_continuity(mut self, enabled: bool) -> Self {
        self.enforce_sign_continuity = enabled;
        self
    }

    /// Reject values that would make the conversion meaningless.
    pub fn validate(&self) -> Result<(), PoseError> {
        if !self.floor_offset.is_finite() {
            return Err(PoseError::InvalidConfig(format!(
                "floor_offset must be finite, got {}",
                self.floor_offset
            )));
        }
        if !self.degeneracy_epsilon.is_finite() || self.degeneracy_epsilon < 0.0 {
            return Err(PoseError::InvalidConfig(format!(
                "degeneracy_epsilon must be finite and non-negative, got {}",
                self.degeneracy_epsilon
            )));
        }
        if !self.fallback_nudge.is_finite() {
            return Err(PoseError::InvalidConfig(format!(
                "fallback_nudge must be finite, got {}",
                self.fallback_nudge
            )));
        }
        Ok(())
    }
}

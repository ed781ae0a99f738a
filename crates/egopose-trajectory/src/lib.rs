//! `egopose-trajectory` – 6D-rotation trajectories to SE3 pose buffers.
//!
//! # Modules
//!
//! - [`config`] – [`ConversionConfig`][config::ConversionConfig]: floor
//!   offset, frame interval, initial-frame policy, degeneracy threshold,
//!   fallback nudge and the optional quaternion sign-continuity pass.
//! - [`assembler`] – [`TrajectoryAssembler`][assembler::TrajectoryAssembler]:
//!   converts `T` raw frames into `T + 1` wxyz+xyz poses (frame 0 is
//!   synthesized) and inverts them again.  [`convert_trajectory`] and
//!   [`invert_trajectory`] are the one-call entry points.
//! - [`validator`] – [`validate_round_trip`][validator::validate_round_trip]:
//!   diagnostic convert → invert harness reporting reconstruction error.
//! - [`synthetic`] – [`random_trajectory`][synthetic::random_trajectory]:
//!   seeded random inputs for the validator and tests.
//!
//! # Example
//!
//! ```
//! use egopose_trajectory::{convert_trajectory, invert_trajectory, synthetic::random_trajectory};
//!
//! let raw = random_trajectory(10, 7);
//! let traj = convert_trajectory(&raw, 1.3, 100_000_000).unwrap();
//! assert_eq!(traj.len(), 11);
//!
//! let back = invert_trajectory(&traj, 1.3);
//! assert_eq!(back.len(), raw.len());
//! ```

pub mod assembler;
pub mod config;
pub mod synthetic;
pub mod validator;

pub use assembler::{
    TrajectoryAssembler, convert_trajectory, enforce_sign_continuity, invert_frame,
    invert_trajectory, synthetic_timestamps,
};
pub use config::{ConversionConfig, DEFAULT_FPS, frame_interval_ns_from_fps};
pub use validator::{DEFAULT_TOLERANCE, RoundTripReport, validate_round_trip};

//! Seeded test trajectories.
//!
//! Frames carry uniformly random proper rotations (Gram-Schmidt on Gaussian
//! columns) and translations drawn from N(0, 0.2²) per axis with z lifted by
//! 1.5 m, roughly a head-mounted camera above the floor.

use egopose_geometry::{Vec3, matrix_to_rotation6, orthonormalize};
use egopose_types::RawPose6D;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};

pub const TRANSLATION_STD: f64 = 0.2;
pub const HEAD_HEIGHT: f64 = 1.5;

/// `frames` random frames whose 6D columns are already orthonormal, so
/// they survive a convert → invert round trip exactly (up to rounding).
pub fn random_trajectory(frames: usize, seed: u64) -> Vec<RawPose6D> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut gauss = move || -> f64 { StandardNormal.sample(&mut rng) };

    (0..frames)
        .map(|_| {
            let rotation6 = loop {
                let v1 = Vec3::new(gauss(), gauss(), gauss());
                let v2 = Vec3::new(gauss(), gauss(), gauss());
                // Gaussian draws are degenerate with probability zero; redraw
                // rather than fail if it ever happens.
                if let Ok(m) = orthonormalize(v1, v2) {
                    break matrix_to_rotation6(&m);
                }
            };
            let translation = [
                gauss() * TRANSLATION_STD,
                gauss() * TRANSLATION_STD,
                gauss() * TRANSLATION_STD + HEAD_HEIGHT,
            ];
            RawPose6D::new(rotation6, translation)
        })
        .collect()
}

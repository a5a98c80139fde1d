//! Visual tilt sources.
//!
//! Tilt is cosmetic: it never feeds slot assignment, so layouts stay
//! comparable across runs whatever source is plugged in.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Largest tilt magnitude, in radians.
pub const MAX_TILT_RADIANS: f64 = 0.1;

/// Supplies one tilt angle per placed note.
pub trait TiltSource {
    /// Returns a tilt in `[-MAX_TILT_RADIANS, MAX_TILT_RADIANS)`.
    fn next_tilt(&mut self) -> f64;
}

/// Flat notes; used where layouts are compared or snapshotted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTilt;

impl TiltSource for NoTilt {
    fn next_tilt(&mut self) -> f64 {
        0.0
    }
}

/// Uniform random tilt backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RandomTilt<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomTilt<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomTilt<StdRng> {
    /// Reproducible tilt sequence.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Tilt sequence seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> TiltSource for RandomTilt<R> {
    fn next_tilt(&mut self) -> f64 {
        self.rng.gen_range(-MAX_TILT_RADIANS..MAX_TILT_RADIANS)
    }
}

//! Random number streams for the integrator.
//!
//! Each pixel sample gets its own small generator seeded from the frame and
//! pixel index, so rendering is race-free under rayon and produces the same
//! image for the same seed regardless of thread scheduling.

use flyby_math::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};

/// Generator for one pixel sample of one frame.
pub fn pixel_rng(seed: u64, frame: u64, pixel_index: usize) -> SmallRng {
    let stream = (frame << 32) ^ pixel_index as u64;
    SmallRng::seed_from_u64(seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Uniform f32 in [0, 1).
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen::<f32>()
}

/// Vector with each component uniform in [min, max).
pub fn random_vec3(rng: &mut dyn RngCore, min: f32, max: f32) -> Vec3 {
    let span = max - min;
    Vec3::new(
        min + span * gen_f32(rng),
        min + span * gen_f32(rng),
        min + span * gen_f32(rng),
    )
}

//! Stateless per-pixel random numbers shared with the shaders.
//!
//! The WGSL emitted by the GPU crate contains the same arithmetic, so a CPU
//! reference run with the same seed draws the same numbers per pixel.

/// PCG output permutation of a single 32-bit word.
pub fn pcg_hash(v: u32) -> u32 {
    let state = v.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

/// Uniform number in [0, 1) for pixel (x, y), per-call `seed` and `salt`.
pub fn pixel_random(x: u32, y: u32, seed: u32, salt: u32) -> f32 {
    let h = pcg_hash(x ^ pcg_hash(y ^ pcg_hash(seed ^ pcg_hash(salt))));
    (h >> 8) as f32 / 16_777_216.0
}

/// WGSL source of [`pcg_hash`] and [`pixel_random`].
pub const WGSL_RANDOM: &str = r#"
fn pcg_hash(v: u32) -> u32 {
    let state = v * 747796405u + 2891336453u;
    let word = ((state >> ((state >> 28u) + 4u)) ^ state) * 277803737u;
    return (word >> 22u) ^ word;
}

fn pixel_random(x: u32, y: u32, seed: u32, salt: u32) -> f32 {
    let h = pcg_hash(x ^ pcg_hash(y ^ pcg_hash(seed ^ pcg_hash(salt))));
    return f32(h >> 8u) / 16777216.0;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_stay_in_unit_interval() {
        for i in 0..10_000u32 {
            let r = pixel_random(i % 97, i / 97, 0xDEAD_BEEF, i % 3);
            assert!((0.0..1.0).contains(&r));
        }
    }

    #[test]
    fn salt_and_seed_change_the_draw() {
        let base = pixel_random(10, 20, 1, 0);
        assert_ne!(base, pixel_random(10, 20, 1, 1));
        assert_ne!(base, pixel_random(10, 20, 2, 0));
        assert_eq!(base, pixel_random(10, 20, 1, 0));
    }

    #[test]
    fn mean_is_near_one_half() {
        let n = 20_000u32;
        let sum: f64 = (0..n).map(|i| pixel_random(i, 7, 42, 0) as f64).sum();
        assert!((sum / n as f64 - 0.5).abs() < 0.02);
    }
}

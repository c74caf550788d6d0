//! Bit-exact transport of f64 values through 32-bit channels.
//!
//! A double travels as `[low_word, high_word]` of its IEEE-754 bit pattern.
//! The shaders reconstruct the same value from those words, so nothing here
//! may round: packing is a reinterpretation, never a conversion.

/// Quiet NaN written into an escaped pixel's z value.
pub const ESCAPED_SENTINEL: [u32; 2] = [0, 0x7FF8_0000];

const EXPONENT_MASK_HIGH: u32 = 0x7FF0_0000;

pub fn pack_f64(value: f64) -> [u32; 2] {
    let bits = value.to_bits();
    [bits as u32, (bits >> 32) as u32]
}

pub fn unpack_f64(words: [u32; 2]) -> f64 {
    f64::from_bits(((words[1] as u64) << 32) | words[0] as u64)
}

/// Complex value as four channels: `[re_lo, re_hi, im_lo, im_hi]`.
pub fn pack_complex(re: f64, im: f64) -> [u32; 4] {
    let [re_lo, re_hi] = pack_f64(re);
    let [im_lo, im_hi] = pack_f64(im);
    [re_lo, re_hi, im_lo, im_hi]
}

pub fn unpack_complex(channels: [u32; 4]) -> (f64, f64) {
    (
        unpack_f64([channels[0], channels[1]]),
        unpack_f64([channels[2], channels[3]]),
    )
}

/// Packed escape marker for a whole complex value.
pub fn escaped_complex() -> [u32; 4] {
    [
        ESCAPED_SENTINEL[0],
        ESCAPED_SENTINEL[1],
        ESCAPED_SENTINEL[0],
        ESCAPED_SENTINEL[1],
    ]
}

/// True when the real part is non-finite, which only the escape marker produces.
pub fn is_escaped(channels: [u32; 4]) -> bool {
    channels[1] & EXPONENT_MASK_HIGH == EXPONENT_MASK_HIGH
}

/// Viewport bounds packed for a uniform block, one `[lo, hi]` pair per bound.
pub fn pack_bounds(bounds: [f64; 4]) -> [[u32; 2]; 4] {
    bounds.map(pack_f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_low_then_high() {
        assert_eq!(pack_f64(1.0), [0, 0x3FF0_0000]);
        assert_eq!(pack_f64(-2.0), [0, 0xC000_0000]);
    }

    #[test]
    fn escaped_marker_is_detected() {
        assert!(is_escaped(escaped_complex()));
        assert!(unpack_complex(escaped_complex()).0.is_nan());
        assert!(!is_escaped(pack_complex(0.0, 0.0)));
        assert!(!is_escaped(pack_complex(-1.5, 1e308)));
        assert!(is_escaped(pack_complex(f64::INFINITY, 0.0)));
    }
}

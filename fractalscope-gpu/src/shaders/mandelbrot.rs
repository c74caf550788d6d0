//! Programs for the escape-time state: iterate, colorize and reproject.
//!
//! z is stored as four u32 words and rebuilt into `f64` on load. The WGSL
//! here never bitcasts to `f64`; unpacking assembles the value from its
//! mantissa and exponent fields with `ldexp`, and packing finds the
//! exponent by bisection, so both directions are exact.

use super::WORKGROUP_SIZE;
use fractalscope_core::packed::ESCAPED_SENTINEL;
use fractalscope_core::ESCAPE_RADIUS_SQ;

/// Packed-double helpers shared by every escape-time program.
pub fn packed_f64_helpers() -> String {
    format!(
        r#"const ESCAPED_LOW: u32 = {low}u;
const ESCAPED_HIGH: u32 = {high}u;
const EXPONENT_MASK: u32 = 0x7ff00000u;
const SIGN_MASK: u32 = 0x80000000u;
const TWO_POW_32: f64 = 4294967296.0lf;
const TWO_POW_52: f64 = 4503599627370496.0lf;

fn is_escaped(z: vec4<u32>) -> bool {{
    return (z.y & EXPONENT_MASK) == EXPONENT_MASK;
}}

fn escaped_z() -> vec4<u32> {{
    return vec4<u32>(ESCAPED_LOW, ESCAPED_HIGH, ESCAPED_LOW, ESCAPED_HIGH);
}}

fn unpack_f64(words: vec2<u32>) -> f64 {{
    let biased = i32((words.y >> 20u) & 0x7ffu);
    let mantissa = f64(words.y & 0xfffffu) * TWO_POW_32 + f64(words.x);
    var magnitude: f64;
    if biased == 0 {{
        magnitude = ldexp(mantissa, -1074);
    }} else {{
        magnitude = ldexp(mantissa + TWO_POW_52, biased - 1075);
    }}
    if (words.y & SIGN_MASK) != 0u {{
        return -magnitude;
    }}
    return magnitude;
}}

fn pack_f64(value: f64) -> vec2<u32> {{
    if value == 0.0lf {{
        return vec2<u32>(0u, 0u);
    }}
    var sign = 0u;
    var magnitude = value;
    if value < 0.0lf {{
        sign = SIGN_MASK;
        magnitude = -value;
    }}
    var biased = 0;
    var mantissa: f64;
    if magnitude < ldexp(1.0lf, -1022) {{
        mantissa = ldexp(magnitude, 1074);
    }} else {{
        // Largest e with 2^e <= magnitude.
        var low = -1022;
        var high = 1023;
        loop {{
            if low >= high {{
                break;
            }}
            let middle = (low + high + 1) / 2;
            if magnitude >= ldexp(1.0lf, middle) {{
                low = middle;
            }} else {{
                high = middle - 1;
            }}
        }}
        biased = low + 1023;
        mantissa = ldexp(magnitude, 52 - low) - TWO_POW_52;
    }}
    let upper = floor(ldexp(mantissa, -32));
    let lower = mantissa - upper * TWO_POW_32;
    return vec2<u32>(u32(lower), sign | (u32(biased) << 20u) | u32(upper));
}}

fn pixel_center(pixel: vec2<u32>, size: vec2<u32>, x_bounds: vec4<u32>, y_bounds: vec4<u32>) -> vec2<f64> {{
    let left = unpack_f64(x_bounds.xy);
    let right = unpack_f64(x_bounds.zw);
    let bottom = unpack_f64(y_bounds.xy);
    let top = unpack_f64(y_bounds.zw);
    let sx = (f64(pixel.x) + 0.5lf) / f64(size.x);
    let sy = (f64(pixel.y) + 0.5lf) / f64(size.y);
    return vec2<f64>(left + sx * (right - left), bottom + sy * (top - bottom));
}}
"#,
        low = ESCAPED_SENTINEL[0],
        high = ESCAPED_SENTINEL[1],
    )
}

const STATE_BINDINGS: &str = r#"struct Params {
    size: vec2<u32>,
    steps: u32,
    counter: u32,
    bounds: array<vec4<u32>, 2>,
    phase: vec4<f32>,
    interior: vec4<f32>,
    frequency: f32,
}

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var<storage, read_write> z_state: array<vec4<u32>>;
@group(0) @binding(2) var<storage, read_write> iterations: array<vec2<u32>>;
@group(0) @binding(3) var display: texture_storage_2d<rgba8unorm, write>;
"#;

fn entry_point(size: &str) -> String {
    format!(
        "@compute @workgroup_size({WORKGROUP_SIZE}, {WORKGROUP_SIZE})\n\
         fn main(@builtin(global_invocation_id) id: vec3<u32>) {{\n    \
         if id.x >= {size}.x || id.y >= {size}.y {{\n        return;\n    }}\n    \
         let index = id.y * {size}.x + id.x;\n"
    )
}

/// Advance every unescaped pixel by up to `params.steps` iterations.
pub fn iterate_source() -> String {
    let mut src = String::from(STATE_BINDINGS);
    src.push('\n');
    src.push_str(&packed_f64_helpers());
    src.push_str(&format!(
        "\nconst ESCAPE_RADIUS_SQ: f64 = {ESCAPE_RADIUS_SQ:?}lf;\n\n"
    ));
    src.push_str(&entry_point("params.size"));
    src.push_str(
        r#"    let packed = z_state[index];
    if is_escaped(packed) {
        return;
    }
    let c = pixel_center(id.xy, params.size, params.bounds[0], params.bounds[1]);
    var zr = unpack_f64(packed.xy);
    var zi = unpack_f64(packed.zw);
    var counts = iterations[index];
    for (var i = 0u; i < params.steps; i++) {
        let next_r = zr * zr - zi * zi + c.x;
        let next_i = 2.0lf * zr * zi + c.y;
        zr = next_r;
        zi = next_i;
        counts.x += 1u;
        if zr * zr + zi * zi > ESCAPE_RADIUS_SQ {
            z_state[index] = escaped_z();
            iterations[index] = vec2<u32>(counts.x, counts.x);
            return;
        }
    }
    z_state[index] = vec4<u32>(pack_f64(zr), pack_f64(zi));
    iterations[index] = counts;
}
"#,
    );
    src
}

/// Write the display image from the state and the global counter.
pub fn colorize_source() -> String {
    let mut src = String::from(STATE_BINDINGS);
    src.push('\n');
    src.push_str(&packed_f64_helpers());
    src.push_str(
        r#"
fn escape_color(k: u32) -> vec4<f32> {
    let s = sin(vec3<f32>(params.frequency * f32(k)) + params.phase.xyz);
    return vec4<f32>(s * s, 1.0);
}

"#,
    );
    src.push_str(&entry_point("params.size"));
    src.push_str(
        r#"    let counts = iterations[index];
    var color = params.interior;
    if is_escaped(z_state[index]) {
        color = escape_color(counts.x);
    } else if counts.y > params.counter {
        color = escape_color(counts.y);
    }
    textureStore(display, vec2<u32>(id.x, params.size.y - 1u - id.y), color);
}
"#,
    );
    src
}

/// Seed a fresh state from the nearest pixel of a previous one.
pub fn reproject_source() -> String {
    let mut src = String::from(
        r#"struct Params {
    size: vec2<u32>,
    old_size: vec2<u32>,
    bounds: array<vec4<u32>, 2>,
    old_bounds: array<vec4<u32>, 2>,
}

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var<storage, read_write> z_state: array<vec4<u32>>;
@group(0) @binding(2) var<storage, read_write> iterations: array<vec2<u32>>;
@group(0) @binding(3) var<storage, read> old_iterations: array<vec2<u32>>;

"#,
    );
    src.push_str(&packed_f64_helpers());
    src.push('\n');
    src.push_str(&entry_point("params.size"));
    src.push_str(
        r#"    let c = pixel_center(id.xy, params.size, params.bounds[0], params.bounds[1]);
    let old_left = unpack_f64(params.old_bounds[0].xy);
    let old_right = unpack_f64(params.old_bounds[0].zw);
    let old_bottom = unpack_f64(params.old_bounds[1].xy);
    let old_top = unpack_f64(params.old_bounds[1].zw);
    let ox = floor((c.x - old_left) / (old_right - old_left) * f64(params.old_size.x));
    let oy = floor((c.y - old_bottom) / (old_top - old_bottom) * f64(params.old_size.y));
    var estimate = 0u;
    if ox >= 0.0lf && oy >= 0.0lf && ox < f64(params.old_size.x) && oy < f64(params.old_size.y) {
        estimate = old_iterations[u32(oy) * params.old_size.x + u32(ox)].y;
    }
    z_state[index] = vec4<u32>(0u, 0u, 0u, 0u);
    iterations[index] = vec2<u32>(0u, estimate);
}
"#,
    );
    src
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_words_are_baked() {
        let helpers = packed_f64_helpers();
        assert!(helpers.contains("const ESCAPED_LOW: u32 = 0u;"));
        assert!(helpers.contains(&format!("const ESCAPED_HIGH: u32 = {}u;", 0x7FF8_0000u32)));
    }

    #[test]
    fn escape_bound_is_radius_two() {
        assert!(iterate_source().contains("const ESCAPE_RADIUS_SQ: f64 = 4.0lf;"));
    }

    #[test]
    fn escaped_pixels_are_skipped_before_unpacking() {
        let src = iterate_source();
        let skip = src.find("if is_escaped(packed)").unwrap();
        let unpack = src.find("var zr = unpack_f64").unwrap();
        assert!(skip < unpack);
    }

    #[test]
    fn no_f64_bitcasts() {
        for src in [iterate_source(), colorize_source(), reproject_source()] {
            assert!(!src.contains("bitcast<f64>"));
            assert!(!src.contains("frexp"));
        }
    }

    #[test]
    fn reprojection_resets_z_and_running_count() {
        let src = reproject_source();
        assert!(src.contains("z_state[index] = vec4<u32>(0u, 0u, 0u, 0u);"));
        assert!(src.contains("iterations[index] = vec2<u32>(0u, estimate);"));
        assert!(src.contains("var<storage, read> old_iterations"));
    }
}

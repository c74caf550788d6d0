//! Programs for the point-count grid: seed, iterate and colorize.
//!
//! Transform coefficients, the grid frame, seed pixels and the density
//! expression are baked in as constants, so a new configuration means new
//! source text.

use super::{wgsl_f32, WORKGROUP_SIZE};
use fractalscope_core::ifs::{FIRST_STEP, SEED_SALT, UNVISITED};
use fractalscope_core::random::WGSL_RANDOM;
use fractalscope_core::{
    cumulative_weights, find_best_pixel, AffineConfig, AffineTransform, GridFrame, SelectionMode,
};

/// Generated sources for one affine configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct AffineSources {
    pub seed: String,
    pub iterate: String,
    pub colorize: String,
}

/// Sources for `config`. The initial set is expected to be normalized.
pub fn generate(config: &AffineConfig) -> AffineSources {
    AffineSources {
        seed: seed_source(config),
        iterate: iterate_source(config),
        colorize: colorize_source(),
    }
}

fn header() -> String {
    format!(
        r#"struct Params {{
    size: vec2<u32>,
    counter: u32,
    seed: u32,
    primary: vec4<f32>,
    secondary: vec4<f32>,
    background: vec4<f32>,
    falloff_rate: f32,
}}

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var<storage, read_write> counts: array<atomic<u32>>;
@group(0) @binding(2) var color_out: texture_storage_2d<rgba8unorm, write>;

const UNVISITED: u32 = {UNVISITED}u;
const FIRST_STEP: u32 = {FIRST_STEP}u;
const SEED_SALT: u32 = {SEED_SALT}u;
"#
    )
}

fn entry_point() -> String {
    format!(
        "@compute @workgroup_size({WORKGROUP_SIZE}, {WORKGROUP_SIZE})\n\
         fn main(@builtin(global_invocation_id) id: vec3<u32>) {{\n    \
         if id.x >= params.size.x || id.y >= params.size.y {{\n        return;\n    }}\n    \
         let index = id.y * params.size.x + id.x;\n"
    )
}

pub fn seed_source(config: &AffineConfig) -> String {
    let mut src = header();
    src.push_str(WGSL_RANDOM);

    let pixels: Vec<(u32, u32)> = config
        .initial_set
        .points
        .iter()
        .map(|&p| find_best_pixel(config.size, &config.viewport, p))
        .collect();

    if !pixels.is_empty() {
        let list = pixels
            .iter()
            .map(|(x, y)| format!("vec2<u32>({x}u, {y}u)"))
            .collect::<Vec<_>>()
            .join(", ");
        let n = pixels.len();
        src.push_str(&format!(
            "\nconst SEED_PIXEL_COUNT: u32 = {n}u;\n\
             var<private> seed_pixels: array<vec2<u32>, {n}> = array<vec2<u32>, {n}>({list});\n"
        ));
    }

    let expression = config.initial_set.expression();
    if let Some(expression) = expression {
        src.push_str(&format!(
            "\nfn density(x: f32, y: f32) -> f32 {{\n    return f32({expression});\n}}\n"
        ));
    }

    src.push('\n');
    src.push_str(&entry_point());
    src.push_str("    var value = UNVISITED;\n");

    if expression.is_some() {
        src.push_str(
            "    let x = (f32(id.x) + 0.5) / f32(params.size.x);\n    \
             let y = (f32(id.y) + 0.5) / f32(params.size.y);\n    \
             if density(x, y) > pixel_random(id.x, id.y, params.seed, SEED_SALT) {\n        \
             value = FIRST_STEP;\n    }\n",
        );
    }

    if !pixels.is_empty() {
        src.push_str(
            "    for (var i = 0u; i < SEED_PIXEL_COUNT; i++) {\n        \
             if all(seed_pixels[i] == id.xy) {\n            value = FIRST_STEP;\n        }\n    }\n",
        );
    }

    src.push_str("    atomicStore(&counts[index], value);\n}\n");
    src
}

fn transform_function(index: usize, t: &AffineTransform) -> String {
    let m = &t.matrix;
    format!(
        "fn transform_{index}(p: vec2<f32>) -> vec2<f32> {{\n    \
         return vec2<f32>({} * p.x + {} * p.y + {}, {} * p.x + {} * p.y + {});\n}}\n",
        wgsl_f32(m[0][0]),
        wgsl_f32(m[0][1]),
        wgsl_f32(t.offset[0]),
        wgsl_f32(m[1][0]),
        wgsl_f32(m[1][1]),
        wgsl_f32(t.offset[1]),
    )
}

pub fn iterate_source(config: &AffineConfig) -> String {
    let frame = GridFrame::new(&config.viewport);
    let mut src = header();
    src.push_str(WGSL_RANDOM);

    src.push_str(&format!(
        r#"
const FRAME_ORIGIN = vec2<f32>({}, {});
const FRAME_EXTENT = vec2<f32>({}, {});
const SAMPLES_PER_POINT: u32 = {}u;

fn pixel_position(pixel: vec2<u32>) -> vec2<f32> {{
    let s = (vec2<f32>(pixel) + 0.5) / vec2<f32>(params.size);
    return FRAME_ORIGIN + s * FRAME_EXTENT;
}}

// Smallest step wins. Visited cells already hold a smaller value than any
// claim, and UNVISITED is larger than every step.
fn claim(p: vec2<f32>, value: u32) {{
    let s = (p - FRAME_ORIGIN) / FRAME_EXTENT * vec2<f32>(params.size);
    if !(s.x >= 0.0 && s.y >= 0.0 && s.x < f32(params.size.x) && s.y < f32(params.size.y)) {{
        return;
    }}
    let cell = vec2<u32>(s);
    let index = cell.y * params.size.x + cell.x;
    atomicMin(&counts[index], value);
}}

"#,
        wgsl_f32(frame.origin.0),
        wgsl_f32(frame.origin.1),
        wgsl_f32(frame.extent.0),
        wgsl_f32(frame.extent.1),
        config.samples_per_point.max(1),
    ));

    for (i, t) in config.transforms.iter().enumerate() {
        src.push_str(&transform_function(i, t));
    }

    src.push('\n');
    src.push_str(&entry_point());
    src.push_str(
        "    if atomicLoad(&counts[index]) != params.counter {\n        return;\n    }\n    \
         let p = pixel_position(id.xy);\n    \
         let next_step = params.counter + 1u;\n",
    );

    match config.mode() {
        SelectionMode::FanOut => {
            for i in 0..config.transforms.len() {
                src.push_str(&format!("    claim(transform_{i}(p), next_step);\n"));
            }
        }
        SelectionMode::Probabilistic => {
            src.push_str(&probabilistic_selection(&config.transforms));
        }
    }

    src.push_str("}\n");
    src
}

/// Inverse-CDF chain: one transform per sample, salted by sample index.
fn probabilistic_selection(transforms: &[AffineTransform]) -> String {
    let cdf = cumulative_weights(transforms);
    let last = transforms.len() - 1;
    let mut body = String::from(
        "    for (var draw = 0u; draw < SAMPLES_PER_POINT; draw++) {\n        \
         let r = pixel_random(id.x, id.y, params.seed, draw);\n",
    );

    if last == 0 {
        body.push_str("        claim(transform_0(p), next_step);\n");
    } else {
        for (i, c) in cdf.iter().enumerate().take(last) {
            let keyword = if i == 0 { "if" } else { "} else if" };
            body.push_str(&format!(
                "        {keyword} r < {} {{\n            claim(transform_{i}(p), next_step);\n",
                wgsl_f32(*c)
            ));
        }
        body.push_str(&format!(
            "        }} else {{\n            claim(transform_{last}(p), next_step);\n        }}\n"
        ));
    }

    body.push_str("    }\n");
    body
}

pub fn colorize_source() -> String {
    let mut src = header();
    src.push('\n');
    src.push_str(&entry_point());
    src.push_str(
        r#"    let value = atomicLoad(&counts[index]);
    var color = params.background;
    if value != UNVISITED && value <= params.counter {
        if value == params.counter {
            color = params.primary;
        } else if params.falloff_rate <= 0.0 {
            color = params.secondary;
        } else {
            let age = f32(params.counter - value);
            color = mix(params.background, params.secondary, exp(-age / params.falloff_rate));
        }
    }
    // Grid rows grow upward, image rows downward.
    textureStore(color_out, vec2<u32>(id.x, params.size.y - 1u - id.y), color);
}
"#,
    );
    src
}

//! Full-screen resampling of a color image into a caller's target.

pub const PRESENT_SOURCE: &str = r#"struct Present {
    scale: vec2<f32>,
    offset: vec2<f32>,
    background: vec4<f32>,
}

@group(0) @binding(0) var<uniform> present: Present;
@group(0) @binding(1) var image: texture_2d<f32>;
@group(0) @binding(2) var image_sampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, 0.0, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    // uv runs top-down; screen coordinates run bottom-up.
    let screen = vec2<f32>(in.uv.x, 1.0 - in.uv.y);
    let image_uv = screen * present.scale + present.offset;
    if any(image_uv < vec2<f32>(0.0)) || any(image_uv > vec2<f32>(1.0)) {
        return present.background;
    }
    return textureSampleLevel(image, image_sampler, vec2<f32>(image_uv.x, 1.0 - image_uv.y), 0.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_points_match_builder() {
        assert!(PRESENT_SOURCE.contains("fn vs_main("));
        assert!(PRESENT_SOURCE.contains("fn fs_main("));
    }

    #[test]
    fn outside_source_uses_background() {
        assert!(PRESENT_SOURCE.contains("return present.background;"));
    }
}

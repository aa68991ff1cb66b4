/// Uniform block shared by every pipeline. Mirrors `FrameUniforms`.
const FRAME_UNIFORMS: &str = r#"
struct Frame {
    view_proj: mat4x4<f32>,
    light_view_proj: mat4x4<f32>,
    eye: vec4<f32>,
    light_dir: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> frame: Frame;

struct InstanceInput {
    @location(3) model_0: vec4<f32>,
    @location(4) model_1: vec4<f32>,
    @location(5) model_2: vec4<f32>,
    @location(6) model_3: vec4<f32>,
};

fn instance_model(instance: InstanceInput) -> mat4x4<f32> {
    return mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
}
"#;

/// Light-space pass: stores clip depth and its square.
const SHADOW_BODY: &str = r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
};

struct ShadowOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) depth: f32,
};

@vertex
fn vs_shadow(vertex: VertexInput, instance: InstanceInput) -> ShadowOutput {
    let world_pos = instance_model(instance) * vec4<f32>(vertex.position, 1.0);
    let clip = frame.view_proj * world_pos;

    var out: ShadowOutput;
    out.clip_position = clip;
    out.depth = clip.z / clip.w;
    return out;
}

@fragment
fn fs_shadow(in: ShadowOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(in.depth, in.depth * in.depth, 0.0, 1.0);
}
"#;

/// Camera pass: textured, diffuse lit, shadow tested.
const MAIN_BODY: &str = r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_normal: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) light_clip: vec4<f32>,
};

@group(1) @binding(0)
var material_texture: texture_2d<f32>;
@group(1) @binding(1)
var material_sampler: sampler;

@group(2) @binding(0)
var shadow_map: texture_2d<f32>;

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = instance_model(instance);
    let world_pos = model * vec4<f32>(vertex.position, 1.0);

    var out: VertexOutput;
    out.clip_position = frame.view_proj * world_pos;
    out.world_normal = normalize((model * vec4<f32>(vertex.normal, 0.0)).xyz);
    out.uv = vertex.uv;
    out.light_clip = frame.light_view_proj * world_pos;
    return out;
}

fn shadow_factor(light_clip: vec4<f32>, n_dot_l: f32) -> f32 {
    let ndc = light_clip.xyz / light_clip.w;
    let uv = vec2<f32>(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5);
    if (uv.x < 0.0 || uv.x > 1.0 || uv.y < 0.0 || uv.y > 1.0 || ndc.z > 1.0) {
        return 1.0;
    }

    let dims = vec2<i32>(textureDimensions(shadow_map));
    let texel = vec2<i32>(uv * vec2<f32>(dims));
    let bias = max(0.005 * (1.0 - n_dot_l), 0.0015);

    var lit = 0.0;
    for (var dy = -1; dy <= 1; dy = dy + 1) {
        for (var dx = -1; dx <= 1; dx = dx + 1) {
            let p = clamp(texel + vec2<i32>(dx, dy), vec2<i32>(0), dims - vec2<i32>(1));
            let stored = textureLoad(shadow_map, p, 0).r;
            lit = lit + select(0.0, 1.0, ndc.z - bias <= stored);
        }
    }
    return lit / 9.0;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let base = textureSample(material_texture, material_sampler, in.uv);
    let n = normalize(in.world_normal);
    let l = normalize(-frame.light_dir.xyz);
    let n_dot_l = max(dot(n, l), 0.0);
    let shadow = shadow_factor(in.light_clip, n_dot_l);
    let ambient = 0.35;
    let lighting = ambient + (1.0 - ambient) * n_dot_l * shadow;
    return vec4<f32>(base.rgb * lighting, base.a);
}
"#;

/// Sky box: vertical gradient by view direction.
const SKY_BODY: &str = r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
};

struct SkyOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) direction: vec3<f32>,
};

@vertex
fn vs_sky(vertex: VertexInput, instance: InstanceInput) -> SkyOutput {
    let world_pos = instance_model(instance) * vec4<f32>(vertex.position, 1.0);

    var out: SkyOutput;
    out.clip_position = frame.view_proj * world_pos;
    out.direction = vertex.position;
    return out;
}

@fragment
fn fs_sky(in: SkyOutput) -> @location(0) vec4<f32> {
    let h = normalize(in.direction).y;
    let horizon = vec3<f32>(0.78, 0.84, 0.95);
    let zenith = vec3<f32>(0.25, 0.45, 0.85);
    let below = vec3<f32>(0.40, 0.38, 0.36);
    let color = select(mix(horizon, below, -h), mix(horizon, zenith, h), h >= 0.0);
    return vec4<f32>(color, 1.0);
}
"#;

pub fn shadow_shader() -> String {
    format!("{FRAME_UNIFORMS}{SHADOW_BODY}")
}

pub fn main_shader() -> String {
    format!("{FRAME_UNIFORMS}{MAIN_BODY}")
}

pub fn sky_shader() -> String {
    format!("{FRAME_UNIFORMS}{SKY_BODY}")
}

use crate::resources::{DEPTH_FORMAT, SHADOW_FORMAT, instance_layout, vertex_layout};
use crate::shaders;

/// Bind group layouts: 0 = frame uniforms, 1 = material, 2 = shadow map.
pub struct Layouts {
    pub uniforms: wgpu::BindGroupLayout,
    pub material: wgpu::BindGroupLayout,
    pub shadow_map: wgpu::BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniforms = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        // RGBA32F is not filterable; the shader reads it with textureLoad.
        let shadow_map = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shadow_map_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }],
        });
        Self {
            uniforms,
            material,
            shadow_map,
        }
    }
}

pub struct Pipelines {
    pub shadow: wgpu::RenderPipeline,
    pub main: wgpu::RenderPipeline,
    pub sky: wgpu::RenderPipeline,
}

struct PipelineSpec<'a> {
    label: &'a str,
    source: String,
    vs: &'a str,
    fs: &'a str,
    bind_groups: &'a [&'a wgpu::BindGroupLayout],
    format: wgpu::TextureFormat,
    depth_write: bool,
    depth_compare: wgpu::CompareFunction,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        layouts: &Layouts,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let shadow = build(
            device,
            PipelineSpec {
                label: "shadow",
                source: shaders::shadow_shader(),
                vs: "vs_shadow",
                fs: "fs_shadow",
                bind_groups: &[&layouts.uniforms],
                format: SHADOW_FORMAT,
                depth_write: true,
                depth_compare: wgpu::CompareFunction::Less,
            },
        );
        let main = build(
            device,
            PipelineSpec {
                label: "main",
                source: shaders::main_shader(),
                vs: "vs_main",
                fs: "fs_main",
                bind_groups: &[&layouts.uniforms, &layouts.material, &layouts.shadow_map],
                format: surface_format,
                depth_write: true,
                depth_compare: wgpu::CompareFunction::Less,
            },
        );
        // Drawn last behind everything: depth tested, never written.
        let sky = build(
            device,
            PipelineSpec {
                label: "sky",
                source: shaders::sky_shader(),
                vs: "vs_sky",
                fs: "fs_sky",
                bind_groups: &[&layouts.uniforms],
                format: surface_format,
                depth_write: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
            },
        );
        Self { shadow, main, sky }
    }
}

fn build(device: &wgpu::Device, spec: PipelineSpec<'_>) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(spec.label),
        source: wgpu::ShaderSource::Wgsl(spec.source.into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(spec.label),
        bind_group_layouts: spec.bind_groups,
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(spec.label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some(spec.vs),
            buffers: &[vertex_layout(), instance_layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some(spec.fs),
            targets: &[Some(wgpu::ColorTargetState {
                format: spec.format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            // Imported meshes do not guarantee consistent winding.
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: spec.depth_write,
            depth_compare: spec.depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

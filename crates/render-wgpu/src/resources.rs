use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use physview_common::{TextureImage, Viewport};
use physview_render::{DrawBatch, ModelLayout};
use wgpu::util::DeviceExt;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
pub const MATERIAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Per-draw model matrix, fed through vertex buffer slot 1.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct InstanceRaw {
    model_0: [f32; 4],
    model_1: [f32; 4],
    model_2: [f32; 4],
    model_3: [f32; 4],
}

impl InstanceRaw {
    pub fn new(world: Mat4) -> Self {
        let cols = world.to_cols_array_2d();
        Self {
            model_0: cols[0],
            model_1: cols[1],
            model_2: cols[2],
            model_3: cols[3],
        }
    }
}

/// Growable instance buffer shared by every pass.
pub struct InstanceBuffer {
    buffer: wgpu::Buffer,
    capacity: u64,
}

impl InstanceBuffer {
    const MIN_CAPACITY: u64 = 1024;

    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            buffer: Self::allocate(device, Self::MIN_CAPACITY),
            capacity: Self::MIN_CAPACITY,
        }
    }

    fn allocate(device: &wgpu::Device, capacity: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("instance_buffer"),
            size: capacity * std::mem::size_of::<InstanceRaw>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Upload `instances`, reallocating when they no longer fit.
    pub fn write(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        instances: &[InstanceRaw],
    ) {
        let needed = instances.len() as u64;
        if needed > self.capacity {
            self.capacity = needed.next_power_of_two().max(Self::MIN_CAPACITY);
            self.buffer = Self::allocate(device, self.capacity);
            tracing::debug!(capacity = self.capacity, "instance buffer grown");
        }
        if !instances.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(instances));
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

pub fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<physview_common::Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRS,
    }
}

pub fn instance_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        3 => Float32x4, 4 => Float32x4, 5 => Float32x4, 6 => Float32x4
    ];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<InstanceRaw>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &ATTRS,
    }
}

/// An uploaded material texture with its bind group.
pub struct GpuTexture {
    pub bind_group: wgpu::BindGroup,
    _texture: wgpu::Texture,
}

impl GpuTexture {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        image: &TextureImage,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("material_texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: MATERIAL_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material_bind_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        Self {
            bind_group,
            _texture: texture,
        }
    }
}

/// Vertex and index buffers of one uploaded model.
pub struct GpuModel {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub batches: Vec<DrawBatch>,
}

impl GpuModel {
    pub fn upload(device: &wgpu::Device, layout: &ModelLayout) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("model_vertex_buffer"),
            contents: bytemuck::cast_slice(&layout.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("model_index_buffer"),
            contents: bytemuck::cast_slice(&layout.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            batches: layout.batches.clone(),
        }
    }
}

/// Square colour+depth target rendered from the light.
pub struct ShadowTarget {
    pub color_view: wgpu::TextureView,
    pub depth_view: wgpu::TextureView,
    pub bind_group: wgpu::BindGroup,
    pub size: u32,
}

impl ShadowTarget {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, size: u32) -> Self {
        let size = size.clamp(1, device.limits().max_texture_dimension_2d);
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow_color"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SHADOW_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = create_depth_texture(device, Viewport::square(size));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow_map_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&color_view),
            }],
        });
        Self {
            color_view,
            depth_view,
            bind_group,
            size,
        }
    }
}

pub fn create_depth_texture(device: &wgpu::Device, viewport: Viewport) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width: viewport.width().max(1),
            height: viewport.height().max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Inward-facing unit cube (±1) for the sky; only positions are read.
pub fn sky_cube(device: &wgpu::Device) -> (wgpu::Buffer, wgpu::Buffer, u32) {
    let corners: [[f32; 3]; 8] = [
        [-1.0, -1.0, -1.0],
        [1.0, -1.0, -1.0],
        [1.0, 1.0, -1.0],
        [-1.0, 1.0, -1.0],
        [-1.0, -1.0, 1.0],
        [1.0, -1.0, 1.0],
        [1.0, 1.0, 1.0],
        [-1.0, 1.0, 1.0],
    ];
    let vertices: Vec<physview_common::Vertex> = corners
        .iter()
        .map(|&p| {
            let p = glam::Vec3::from_array(p);
            physview_common::Vertex::new(p, -p.normalize(), glam::Vec2::ZERO)
        })
        .collect();
    #[rustfmt::skip]
    let indices: [u16; 36] = [
        0,1,2, 2,3,0,       // -Z
        5,4,7, 7,6,5,       // +Z
        4,0,3, 3,7,4,       // -X
        1,5,6, 6,2,1,       // +X
        3,2,6, 6,7,3,       // +Y
        4,5,1, 1,0,4,       // -Y
    ];
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("sky_vertex_buffer"),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("sky_index_buffer"),
        contents: bytemuck::cast_slice(&indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    (vertex_buffer, index_buffer, indices.len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_matches_vertex_layout() {
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 64);
        assert_eq!(std::mem::size_of::<physview_common::Vertex>(), 32);
        assert_eq!(instance_layout().attributes.len(), 4);
        assert_eq!(vertex_layout().attributes[2].shader_location, 2);
    }

    #[test]
    fn instance_stores_columns() {
        let world = Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0));
        let raw = InstanceRaw::new(world);
        assert_eq!(raw.model_3, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(raw.model_0, [1.0, 0.0, 0.0, 0.0]);
    }
}

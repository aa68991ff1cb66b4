use glam::{Mat4, Vec3};
use physview_common::{ModelId, TextureId, TextureImage, Viewport};
use physview_render::{
    DrawCommand, MeshData, PassRecording, PassTarget, RenderBackend, RenderError, StaticModel,
    validate_texture,
};
use wgpu::util::DeviceExt;

use crate::pipelines::{Layouts, Pipelines};
use crate::resources::{
    GpuModel, GpuTexture, InstanceBuffer, InstanceRaw, ShadowTarget, create_depth_texture,
    sky_cube,
};

struct SkyMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

/// wgpu renderer owning the surface, device, and every uploaded resource.
pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    adapter_name: String,
    layouts: Layouts,
    pipelines: Pipelines,
    sampler: wgpu::Sampler,
    shadow: ShadowTarget,
    screen_depth: wgpu::TextureView,
    shadow_uniforms: wgpu::Buffer,
    shadow_uniform_group: wgpu::BindGroup,
    main_uniforms: wgpu::Buffer,
    main_uniform_group: wgpu::BindGroup,
    white: GpuTexture,
    textures: Vec<GpuTexture>,
    models: Vec<GpuModel>,
    instances: InstanceBuffer,
    sky: SkyMesh,
    frame: Option<wgpu::SurfaceTexture>,
}

impl WgpuBackend {
    /// Create the device for `target` and build every pipeline.
    ///
    /// `shadow_resolution` is clamped to the device's texture limit. Without
    /// `vsync` frames are presented as soon as they are ready.
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        viewport: Viewport,
        shadow_resolution: u32,
        vsync: bool,
    ) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(target)
            .map_err(|e| RenderError::Init(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| RenderError::Init("no suitable GPU adapter".to_string()))?;
        let adapter_name = adapter.get_info().name;
        tracing::info!(adapter = %adapter_name, "GPU adapter selected");

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("physview_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| RenderError::Init(e.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| RenderError::Init("surface reports no formats".to_string()))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: viewport.width(),
            height: viewport.height(),
            present_mode: present_mode(vsync),
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let layouts = Layouts::new(&device);
        let pipelines = Pipelines::new(&device, &layouts, format);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let (shadow_uniforms, shadow_uniform_group) = uniform_buffer(&device, &layouts, "shadow");
        let (main_uniforms, main_uniform_group) = uniform_buffer(&device, &layouts, "main");
        let shadow = ShadowTarget::new(&device, &layouts.shadow_map, shadow_resolution);
        if shadow.size != shadow_resolution {
            tracing::warn!(
                requested = shadow_resolution,
                used = shadow.size,
                "shadow resolution clamped to device limit"
            );
        }
        let screen_depth = create_depth_texture(&device, viewport);
        let white = GpuTexture::upload(
            &device,
            &queue,
            &layouts.material,
            &sampler,
            &TextureImage::solid(1, 1, [255; 4]),
        );
        let instances = InstanceBuffer::new(&device);
        let (vertex_buffer, index_buffer, index_count) = sky_cube(&device);

        tracing::info!(
            format = ?format,
            present_mode = ?config.present_mode,
            width = config.width,
            height = config.height,
            shadow = shadow.size,
            "wgpu backend initialized"
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            adapter_name,
            layouts,
            pipelines,
            sampler,
            shadow,
            screen_depth,
            shadow_uniforms,
            shadow_uniform_group,
            main_uniforms,
            main_uniform_group,
            white,
            textures: Vec::new(),
            models: Vec::new(),
            instances,
            sky: SkyMesh {
                vertex_buffer,
                index_buffer,
                index_count,
            },
            frame: None,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    fn texture(&self, id: Option<TextureId>) -> Result<&GpuTexture, RenderError> {
        match id {
            None => Ok(&self.white),
            Some(id) => self
                .textures
                .get(id.0 as usize)
                .ok_or(RenderError::UnknownTexture(id)),
        }
    }

    fn model(&self, id: ModelId) -> Result<&GpuModel, RenderError> {
        self.models
            .get(id.0 as usize)
            .ok_or(RenderError::UnknownModel(id))
    }

    /// Check every handle and gather one model matrix per draw, in order.
    fn prepare(&self, pass: &PassRecording) -> Result<Vec<InstanceRaw>, RenderError> {
        let mut worlds = Vec::with_capacity(pass.commands.len());
        for cmd in &pass.commands {
            match cmd {
                DrawCommand::BindShadowMap => {}
                DrawCommand::BindTexture(id) => {
                    self.texture(*id)?;
                }
                DrawCommand::DrawBatch {
                    model,
                    batch,
                    world,
                } => {
                    if *batch >= self.model(*model)?.batches.len() {
                        return Err(RenderError::UnknownModel(*model));
                    }
                    worlds.push(InstanceRaw::new(*world));
                }
                DrawCommand::DrawInstance { model, world, .. } => {
                    self.model(*model)?;
                    worlds.push(InstanceRaw::new(*world));
                }
                DrawCommand::DrawSky { center, size } => {
                    let half = Vec3::splat(size * 0.5);
                    worlds.push(InstanceRaw::new(Mat4::from_scale_rotation_translation(
                        half,
                        glam::Quat::IDENTITY,
                        *center,
                    )));
                }
            }
        }
        Ok(worlds)
    }

    fn acquire(&mut self) -> Result<wgpu::SurfaceTexture, RenderError> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(frame),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                self.surface.get_current_texture().map_err(surface_error)
            }
            Err(e) => Err(surface_error(e)),
        }
    }

    fn record_draws(
        &self,
        rpass: &mut wgpu::RenderPass<'_>,
        pass: &PassRecording,
        pipeline: &wgpu::RenderPipeline,
    ) -> Result<(), RenderError> {
        let shadow = pass.target == PassTarget::Shadow;
        let mut slot = 0u32;
        let mut bound_model: Option<ModelId> = None;
        for cmd in &pass.commands {
            match cmd {
                DrawCommand::BindShadowMap => {
                    if !shadow {
                        rpass.set_bind_group(2, &self.shadow.bind_group, &[]);
                    }
                }
                DrawCommand::BindTexture(id) => {
                    if !shadow {
                        rpass.set_bind_group(1, &self.texture(*id)?.bind_group, &[]);
                    }
                }
                DrawCommand::DrawBatch { model, batch, .. } => {
                    let gpu = self.model(*model)?;
                    self.bind_model(rpass, &mut bound_model, *model, gpu);
                    let indices = gpu.batches[*batch].indices.clone();
                    rpass.draw_indexed(indices, 0, slot..slot + 1);
                    slot += 1;
                }
                DrawCommand::DrawInstance { model, .. } => {
                    let gpu = self.model(*model)?;
                    self.bind_model(rpass, &mut bound_model, *model, gpu);
                    for batch in &gpu.batches {
                        rpass.draw_indexed(batch.indices.clone(), 0, slot..slot + 1);
                    }
                    slot += 1;
                }
                DrawCommand::DrawSky { .. } => {
                    if !shadow {
                        rpass.set_pipeline(&self.pipelines.sky);
                        rpass.set_bind_group(0, &self.main_uniform_group, &[]);
                        rpass.set_vertex_buffer(0, self.sky.vertex_buffer.slice(..));
                        rpass.set_index_buffer(
                            self.sky.index_buffer.slice(..),
                            wgpu::IndexFormat::Uint16,
                        );
                        rpass.draw_indexed(0..self.sky.index_count, 0, slot..slot + 1);
                        rpass.set_pipeline(pipeline);
                        bound_model = None;
                    }
                    slot += 1;
                }
            }
        }
        Ok(())
    }

    fn bind_model(
        &self,
        rpass: &mut wgpu::RenderPass<'_>,
        bound: &mut Option<ModelId>,
        id: ModelId,
        gpu: &GpuModel,
    ) {
        if *bound != Some(id) {
            rpass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
            rpass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            *bound = Some(id);
        }
    }
}

fn uniform_buffer(
    device: &wgpu::Device,
    layouts: &Layouts,
    label: &str,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(&physview_render::FrameUniforms::new(
            Mat4::IDENTITY,
            Mat4::IDENTITY,
            Vec3::ZERO,
            Vec3::NEG_Y,
        )),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout: &layouts.uniforms,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    });
    (buffer, group)
}

fn surface_error(err: wgpu::SurfaceError) -> RenderError {
    match err {
        wgpu::SurfaceError::OutOfMemory => RenderError::DeviceLost,
        other => RenderError::Surface(other.to_string()),
    }
}

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::AutoVsync
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

fn clear_color(c: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: c[0] as f64,
        g: c[1] as f64,
        b: c[2] as f64,
        a: c[3] as f64,
    }
}

impl RenderBackend for WgpuBackend {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn upload_texture(&mut self, image: &TextureImage) -> Result<TextureId, RenderError> {
        validate_texture(image)?;
        let limit = self.device.limits().max_texture_dimension_2d;
        if image.width > limit || image.height > limit {
            return Err(RenderError::InvalidTexture {
                width: image.width,
                height: image.height,
                len: image.rgba.len(),
            });
        }
        let texture = GpuTexture::upload(
            &self.device,
            &self.queue,
            &self.layouts.material,
            &self.sampler,
            image,
        );
        let id = TextureId(self.textures.len() as u32);
        self.textures.push(texture);
        tracing::debug!(?id, width = image.width, height = image.height, "texture uploaded");
        Ok(id)
    }

    fn upload_model(&mut self, mesh: &MeshData) -> Result<StaticModel, RenderError> {
        if mesh.is_empty() {
            return Err(RenderError::EmptyModel);
        }
        let layout = mesh.layout();
        let id = ModelId(self.models.len() as u32);
        self.models.push(GpuModel::upload(&self.device, &layout));
        tracing::debug!(
            ?id,
            vertices = layout.vertices.len(),
            batches = layout.batches.len(),
            "model uploaded"
        );
        Ok(StaticModel::new(id, &layout))
    }

    fn resize(&mut self, viewport: Viewport) {
        if viewport.width() == self.config.width && viewport.height() == self.config.height {
            return;
        }
        self.config.width = viewport.width();
        self.config.height = viewport.height();
        self.surface.configure(&self.device, &self.config);
        self.screen_depth = create_depth_texture(&self.device, viewport);
        tracing::debug!(width = self.config.width, height = self.config.height, "surface resized");
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(self.config.width, self.config.height)
    }

    fn execute(&mut self, pass: &PassRecording) -> Result<(), RenderError> {
        let worlds = self.prepare(pass)?;
        if pass.target == PassTarget::Screen {
            self.resize(pass.viewport);
        }
        self.instances.write(&self.device, &self.queue, &worlds);

        let frame = match pass.target {
            PassTarget::Shadow => {
                self.queue.write_buffer(
                    &self.shadow_uniforms,
                    0,
                    bytemuck::bytes_of(&pass.uniforms),
                );
                None
            }
            PassTarget::Screen => {
                self.queue
                    .write_buffer(&self.main_uniforms, 0, bytemuck::bytes_of(&pass.uniforms));
                Some(self.acquire()?)
            }
        };
        let frame_view = frame
            .as_ref()
            .map(|f| f.texture.create_view(&wgpu::TextureViewDescriptor::default()));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("physview_encoder"),
            });
        {
            let (color_view, depth_view, pipeline, uniforms) = match &frame_view {
                None => (
                    &self.shadow.color_view,
                    &self.shadow.depth_view,
                    &self.pipelines.shadow,
                    &self.shadow_uniform_group,
                ),
                Some(view) => (
                    view,
                    &self.screen_depth,
                    &self.pipelines.main,
                    &self.main_uniform_group,
                ),
            };
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(match pass.target {
                    PassTarget::Shadow => "shadow_pass",
                    PassTarget::Screen => "main_pass",
                }),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color(pass.clear)),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, uniforms, &[]);
            if frame_view.is_some() {
                rpass.set_bind_group(1, &self.white.bind_group, &[]);
                rpass.set_bind_group(2, &self.shadow.bind_group, &[]);
            }
            rpass.set_vertex_buffer(1, self.instances.buffer().slice(..));
            self.record_draws(&mut rpass, pass, pipeline)?;
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        if let Some(frame) = frame {
            self.frame = Some(frame);
        }
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        let frame = self
            .frame
            .take()
            .ok_or_else(|| RenderError::Surface("present without a screen pass".to_string()))?;
        frame.present();
        Ok(())
    }

    fn shutdown(&mut self) {
        self.frame = None;
        self.textures.clear();
        self.models.clear();
        tracing::info!(adapter = %self.adapter_name, "wgpu backend released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsynced_presentation_by_default() {
        assert_eq!(present_mode(false), wgpu::PresentMode::AutoNoVsync);
        assert_eq!(present_mode(true), wgpu::PresentMode::AutoVsync);
    }

    #[test]
    fn out_of_memory_is_device_loss() {
        assert!(matches!(
            surface_error(wgpu::SurfaceError::OutOfMemory),
            RenderError::DeviceLost
        ));
    }
}

//! The wgpu render context.
//!
//! [`Context`] owns the device, queue, depth target, layouts, sampler and the
//! two pipelines. It is created once and passed down explicitly. It also
//! implements [`GpuDevice`], so the scene factory uploads straight through
//! it, and [`WgpuCommandStream`] turns scene traversal calls into render
//! pass commands.

use std::iter;

use cgmath::Matrix4;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::frame::{DrawTransformRaw, FrameSlot},
    gpu::{
        BufferKind, ColorSpace, CommandStream, GpuDevice, GpuError, ImageData, PipelineKind,
        TEXTURE_SLOT_COUNT,
    },
    pipelines::{
        DEPTH_FORMAT, bounds::mk_bounds_pipeline, frame_layout, material_layout,
        mesh::mk_mesh_pipeline,
    },
};

/// A sampled texture and its default view.
#[derive(Clone, Debug)]
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl GpuTexture {
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size[0].max(1),
                height: size[1].max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[DEPTH_FORMAT],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

#[derive(Debug)]
pub struct Context {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub color_format: wgpu::TextureFormat,
    pub(crate) depth_texture: GpuTexture,
    pub(crate) sampler: wgpu::Sampler,
    pub(crate) frame_layout: wgpu::BindGroupLayout,
    pub(crate) material_layout: wgpu::BindGroupLayout,
    pub(crate) mesh_pipeline: wgpu::RenderPipeline,
    pub(crate) bounds_pipeline: wgpu::RenderPipeline,
}

impl Context {
    /// Builds the context on an existing device, e.g. one a windowing host
    /// created together with its surface.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        color_format: wgpu::TextureFormat,
        size: [u32; 2],
    ) -> Self {
        let frame_layout = frame_layout(&device);
        let material_layout = material_layout(&device);
        let mesh_pipeline = mk_mesh_pipeline(&device, color_format, &frame_layout, &material_layout);
        let bounds_pipeline = mk_bounds_pipeline(&device, color_format, &frame_layout);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let depth_texture = GpuTexture::create_depth_texture(&device, size, "depth_texture");

        Self {
            device,
            queue,
            color_format,
            depth_texture,
            sampler,
            frame_layout,
            material_layout,
            mesh_pipeline,
            bounds_pipeline,
        }
    }

    /// Requests an adapter without a surface, for offscreen rendering.
    pub async fn headless(color_format: wgpu::TextureFormat, size: [u32; 2]) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| GpuError::Adapter(e.to_string()))?;
        log::info!("using adapter {:?}", adapter.get_info().name);
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("scene-ngin device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
                ..Default::default()
            })
            .await?;
        Ok(Self::new(device, queue, color_format, size))
    }

    pub fn resize(&mut self, size: [u32; 2]) {
        self.depth_texture = GpuTexture::create_depth_texture(&self.device, size, "depth_texture");
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_texture.view
    }

    pub fn pipeline(&self, kind: PipelineKind) -> &wgpu::RenderPipeline {
        match kind {
            PipelineKind::Mesh => &self.mesh_pipeline,
            PipelineKind::Bounds => &self.bounds_pipeline,
        }
    }
}

impl GpuDevice for Context {
    type Buffer = wgpu::Buffer;
    type Texture = GpuTexture;
    type MaterialBinding = wgpu::BindGroup;
    type FrameBinding = wgpu::BindGroup;

    fn create_buffer(
        &self,
        label: &str,
        contents: &[u8],
        kind: BufferKind,
    ) -> Result<wgpu::Buffer, GpuError> {
        let limit = self.device.limits().max_buffer_size;
        if contents.len() as u64 > limit {
            return Err(GpuError::Allocation {
                label: label.to_string(),
                reason: format!("{} bytes exceed the {limit} byte buffer limit", contents.len()),
            });
        }
        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
            BufferKind::Uniform => wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            BufferKind::DrawTransforms => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        };
        Ok(self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage,
        }))
    }

    fn create_texture(
        &self,
        label: &str,
        image: &ImageData,
        color_space: ColorSpace,
    ) -> Result<GpuTexture, GpuError> {
        let limit = self.device.limits().max_texture_dimension_2d;
        if image.width > limit || image.height > limit {
            return Err(GpuError::Allocation {
                label: label.to_string(),
                reason: format!(
                    "{}x{} exceeds the {limit} texel texture limit",
                    image.width, image.height
                ),
            });
        }
        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let format = match color_space {
            ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        // Queued; lands on the GPU with the next submission.
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &image.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(GpuTexture { texture, view })
    }

    fn create_material_binding(
        &self,
        label: &str,
        constants: &wgpu::Buffer,
        textures: [&GpuTexture; TEXTURE_SLOT_COUNT],
    ) -> Result<wgpu::BindGroup, GpuError> {
        let [ambient, diffuse, specular, emissive, normal] = textures;
        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: constants.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&ambient.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&diffuse.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&specular.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&emissive.view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(&normal.view),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
            label: Some(label),
        }))
    }

    fn create_frame_binding(
        &self,
        label: &str,
        constants: &wgpu::Buffer,
    ) -> Result<wgpu::BindGroup, GpuError> {
        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: constants.as_entire_binding(),
            }],
            label: Some(label),
        }))
    }

    fn write_buffer(&self, buffer: &wgpu::Buffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer, offset, data);
    }

    fn finish_uploads(&self) -> Result<(), GpuError> {
        let index = self.queue.submit(iter::empty());
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        self.queue.on_submitted_work_done(move || {
            let _ = tx.send(());
        });
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: Some(index),
                timeout: None,
            })
            .map_err(|e| GpuError::Fence(e.to_string()))?;
        futures::executor::block_on(rx.receive())
            .ok_or_else(|| GpuError::Fence("upload completion was never signalled".to_string()))
    }
}

/// Records scene commands into a wgpu render pass.
///
/// Per-draw transforms are staged on the CPU and each draw selects its
/// transform through the instance index. [`WgpuCommandStream::finish`]
/// writes the staged transforms into the bound frame slot; it has to run
/// before the command buffer is submitted.
pub struct WgpuCommandStream<'a, 'p> {
    ctx: &'a Context,
    pass: &'a mut wgpu::RenderPass<'p>,
    transforms: Vec<DrawTransformRaw>,
    target: Option<(wgpu::Buffer, u32)>,
    current: Option<u32>,
    dropped: u32,
}

impl<'a, 'p> WgpuCommandStream<'a, 'p> {
    pub fn new(ctx: &'a Context, pass: &'a mut wgpu::RenderPass<'p>) -> Self {
        Self {
            ctx,
            pass,
            transforms: Vec::new(),
            target: None,
            current: None,
            dropped: 0,
        }
    }

    /// Uploads the staged transforms. Returns the number of draws recorded.
    pub fn finish(self) -> u32 {
        if self.dropped > 0 {
            log::warn!(
                "{} draws exceeded the frame's transform capacity and were dropped",
                self.dropped
            );
        }
        if let Some((buffer, _)) = &self.target
            && !self.transforms.is_empty()
        {
            self.ctx
                .queue
                .write_buffer(buffer, 0, bytemuck::cast_slice(&self.transforms));
        }
        self.transforms.len() as u32
    }
}

impl CommandStream<Context> for WgpuCommandStream<'_, '_> {
    fn set_pipeline(&mut self, pipeline: PipelineKind) {
        self.pass.set_pipeline(self.ctx.pipeline(pipeline));
    }

    fn bind_frame(&mut self, frame: &FrameSlot<Context>) {
        self.pass.set_bind_group(0, frame.binding(), &[]);
        self.pass.set_vertex_buffer(1, frame.transforms().slice(..));
        self.target = Some((frame.transforms().clone(), frame.draw_capacity()));
    }

    fn set_model_transform(&mut self, transform: &Matrix4<f32>) {
        let capacity = self.target.as_ref().map_or(0, |(_, capacity)| *capacity);
        if (self.transforms.len() as u32) < capacity {
            self.current = Some(self.transforms.len() as u32);
            self.transforms.push(DrawTransformRaw::new(transform));
        } else {
            self.current = None;
        }
    }

    fn bind_material(&mut self, material: &wgpu::BindGroup) {
        self.pass.set_bind_group(1, material, &[]);
    }

    fn bind_mesh_buffers(&mut self, vertex: &wgpu::Buffer, index: &wgpu::Buffer) {
        self.pass.set_vertex_buffer(0, vertex.slice(..));
        self.pass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32);
    }

    fn draw_indexed(&mut self, index_count: u32) {
        match self.current.take() {
            Some(instance) => self.pass.draw_indexed(0..index_count, 0, instance..instance + 1),
            None => self.dropped += 1,
        }
    }
}

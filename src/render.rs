//! Per-frame driver.
//!
//! A [`Viewer`] composes the scene, camera, projection, lights and the
//! N-buffered frame resources. Each frame goes through three steps:
//! [`Viewer::prepare_frame`] writes the constants into slot `frame mod N`,
//! [`Viewer::record`] emits the commands in their fixed order and
//! [`Viewer::end_frame`] advances the frame counter. [`Viewer::render`]
//! runs all three against a wgpu render target.

use std::iter;

use cgmath::Matrix4;
use log::debug;

use crate::{
    camera::{Camera, Projection},
    config::ViewerConfig,
    context::{Context, WgpuCommandStream},
    data_structures::{
        bounds::BoundsOverlay,
        frame::{FrameResources, Light, PerFrameConstants},
        scene_graph::{Scene, SceneStats},
    },
    error::SceneResult,
    gpu::{CommandStream, GpuDevice, PipelineKind},
};

pub struct Viewer<D: GpuDevice> {
    scene: Scene<D>,
    camera: Camera,
    projection: Projection,
    lights: Vec<Light>,
    config: ViewerConfig,
    frames: FrameResources<D>,
    bounds: BoundsOverlay<D>,
    normalization: Matrix4<f32>,
    frame_index: u64,
}

impl<D: GpuDevice> Viewer<D> {
    pub fn new(
        device: &D,
        scene: Scene<D>,
        config: ViewerConfig,
        width: u32,
        height: u32,
    ) -> SceneResult<Self> {
        let config = config.validated();
        let frames = FrameResources::new(device, config.frames_in_flight, draw_capacity(&scene, &config))?;
        let bounds = BoundsOverlay::new(device)?;
        let normalization = scene.aabb().normalization_transform();
        let mut lights = vec![Light::default()];
        lights.resize(config.light_count, Light::new([-2.0, 4.0, 1.0], [1.0, 1.0, 1.0], 0.5));

        Ok(Self {
            camera: Camera::new(config.camera_translation),
            projection: Projection::from_degrees(width, height, config.fovy_degrees, config.znear, config.zfar),
            scene,
            lights,
            frames,
            bounds,
            normalization,
            config,
            frame_index: 0,
        })
    }

    pub fn scene(&self) -> &Scene<D> {
        &self.scene
    }

    pub fn stats(&self) -> SceneStats {
        self.scene.stats()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// At most [`crate::data_structures::frame::MAX_LIGHTS`] lights reach the GPU.
    pub fn lights_mut(&mut self) -> &mut Vec<Light> {
        &mut self.lights
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn set_display_bounding_boxes(&mut self, display: bool) {
        self.config.display_bounding_boxes = display;
    }

    pub fn set_background_color(&mut self, color: [f32; 3]) {
        self.config.background_color = color;
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn frames(&self) -> &FrameResources<D> {
        &self.frames
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.projection.resize(width, height);
    }

    /// Camera matrix times the normalization matrix, if enabled.
    pub fn scene_transform(&self) -> Matrix4<f32> {
        if self.config.normalize_scene {
            self.camera.view_matrix() * self.normalization
        } else {
            self.camera.view_matrix()
        }
    }

    /// Writes this frame's constants into its slot and returns the slot index.
    pub fn prepare_frame(&mut self, device: &D) -> SceneResult<usize> {
        self.frames
            .ensure_draw_capacity(device, draw_capacity(&self.scene, &self.config))?;
        let constants = PerFrameConstants::new(
            self.projection.calc_matrix(),
            self.camera.position().into(),
            &self.lights,
        );
        Ok(self.frames.write(device, self.frame_index, &constants).index())
    }

    /// Emits the frame: mesh pipeline, frame binding, every node draw, then
    /// the bounding boxes when enabled.
    pub fn record<S: CommandStream<D>>(&self, stream: &mut S) {
        let slot = self.frames.slot(self.frame_index);
        let root = self.scene_transform();

        stream.set_pipeline(PipelineKind::Mesh);
        stream.bind_frame(slot);
        self.scene.add_to_command_stream(stream, root);

        if self.config.display_bounding_boxes {
            stream.set_pipeline(PipelineKind::Bounds);
            stream.bind_frame(slot);
            self.scene.add_bounds_to_command_stream(stream, &self.bounds, root);
        }
    }

    pub fn end_frame(&mut self) {
        self.frame_index += 1;
    }
}

fn draw_capacity<D: GpuDevice>(scene: &Scene<D>, config: &ViewerConfig) -> u32 {
    if config.display_bounding_boxes {
        scene.draw_count() * 2
    } else {
        scene.draw_count()
    }
}

impl Viewer<Context> {
    /// Renders one frame into `target`, which must match the context's
    /// colour format and depth target size.
    pub fn render(&mut self, ctx: &Context, target: &wgpu::TextureView) -> SceneResult<()> {
        let slot = self.prepare_frame(ctx)?;
        let [r, g, b] = self.config.background_color;
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        let draws = {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: ctx.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            let mut stream = WgpuCommandStream::new(ctx, &mut render_pass);
            self.record(&mut stream);
            stream.finish()
        };
        ctx.queue.submit(iter::once(encoder.finish()));
        debug!("frame {} used slot {slot} for {draws} draws", self.frame_index);
        self.end_frame();
        Ok(())
    }
}

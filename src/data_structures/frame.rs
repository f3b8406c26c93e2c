//! N-buffered per-frame GPU data.
//!
//! The CPU writes frame `f` into slot `f mod N` while the GPU may still read
//! the slots of the previous `N - 1` frames. Each slot holds the per-frame
//! constants (projection, camera position, lights) and the per-draw transform
//! storage that the traversal fills.

use cgmath::{Matrix, Matrix3, Matrix4, SquareMatrix};
use log::debug;

use crate::{
    error::{SceneError, SceneResult},
    gpu::{BufferKind, GpuDevice},
};

pub const MAX_LIGHTS: usize = 8;
pub const MAX_FRAMES_IN_FLIGHT: usize = 3;

/// A point light as laid out in the per-frame constant buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Light {
    pub position: [f32; 3],
    pub intensity: f32,
    pub color: [f32; 3],
    // Uniforms require 16 byte spacing
    _padding: u32,
}

impl Light {
    pub fn new(position: [f32; 3], color: [f32; 3], intensity: f32) -> Self {
        Self {
            position,
            intensity,
            color,
            _padding: 0,
        }
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::new([2.0, 4.0, 1.0], [1.0, 1.0, 1.0], 1.0)
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PerFrameConstants {
    pub projection: [[f32; 4]; 4],
    /// World-space eye position. The built-in shaders light in view space
    /// and do not read it; it is uploaded for host-supplied shaders.
    pub camera_position: [f32; 3],
    pub light_count: u32,
    pub lights: [Light; MAX_LIGHTS],
}

impl PerFrameConstants {
    /// Packs `lights` into the fixed-size array. Lights beyond [`MAX_LIGHTS`]
    /// are ignored.
    pub fn new(projection: Matrix4<f32>, camera_position: [f32; 3], lights: &[Light]) -> Self {
        let count = lights.len().min(MAX_LIGHTS);
        let mut packed = [Light::new([0.0; 3], [0.0; 3], 0.0); MAX_LIGHTS];
        packed[..count].copy_from_slice(&lights[..count]);
        Self {
            projection: projection.into(),
            camera_position,
            light_count: count as u32,
            lights: packed,
        }
    }
}

/// The per-draw data stored on the GPU, read as instance-rate vertex data.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawTransformRaw {
    pub model_view: [[f32; 4]; 4],
    pub normal: [[f32; 3]; 3],
}

impl DrawTransformRaw {
    pub fn new(model_view: &Matrix4<f32>) -> Self {
        let upper = Matrix3::from_cols(
            model_view.x.truncate(),
            model_view.y.truncate(),
            model_view.z.truncate(),
        );
        // Non-uniform scale needs the inverse transpose; singular matrices
        // keep an identity normal matrix.
        let normal = upper
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or_else(Matrix3::identity);
        Self {
            model_view: (*model_view).into(),
            normal: normal.into(),
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<DrawTransformRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                // A mat4 takes up 4 vertex slots
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

pub struct FrameSlot<D: GpuDevice> {
    index: usize,
    constants: D::Buffer,
    binding: D::FrameBinding,
    transforms: D::Buffer,
    draw_capacity: u32,
}

impl<D: GpuDevice> FrameSlot<D> {
    fn new(device: &D, index: usize, draw_capacity: u32) -> SceneResult<Self> {
        let constants = device.create_buffer(
            &format!("Frame {index} Constants"),
            bytemuck::bytes_of(&PerFrameConstants::new(Matrix4::identity(), [0.0; 3], &[])),
            BufferKind::Uniform,
        )?;
        let binding = device.create_frame_binding(&format!("Frame {index} Bind Group"), &constants)?;
        let transforms = Self::create_transforms(device, index, draw_capacity)?;
        Ok(Self {
            index,
            constants,
            binding,
            transforms,
            draw_capacity,
        })
    }

    fn create_transforms(device: &D, index: usize, draw_capacity: u32) -> SceneResult<D::Buffer> {
        let zeroed = vec![DrawTransformRaw::new(&Matrix4::identity()); draw_capacity.max(1) as usize];
        Ok(device.create_buffer(
            &format!("Frame {index} Draw Transforms"),
            bytemuck::cast_slice(&zeroed),
            BufferKind::DrawTransforms,
        )?)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn constants(&self) -> &D::Buffer {
        &self.constants
    }

    pub fn binding(&self) -> &D::FrameBinding {
        &self.binding
    }

    pub fn transforms(&self) -> &D::Buffer {
        &self.transforms
    }

    /// Number of draws the transform storage can hold.
    pub fn draw_capacity(&self) -> u32 {
        self.draw_capacity.max(1)
    }
}

pub struct FrameResources<D: GpuDevice> {
    slots: Vec<FrameSlot<D>>,
}

impl<D: GpuDevice> FrameResources<D> {
    pub fn new(device: &D, frames_in_flight: usize, draw_capacity: u32) -> SceneResult<Self> {
        if !(1..=MAX_FRAMES_IN_FLIGHT).contains(&frames_in_flight) {
            return Err(SceneError::InvalidScene(format!(
                "{frames_in_flight} frames in flight, expected 1..={MAX_FRAMES_IN_FLIGHT}"
            )));
        }
        let slots = (0..frames_in_flight)
            .map(|index| FrameSlot::new(device, index, draw_capacity))
            .collect::<SceneResult<Vec<_>>>()?;
        debug!("created {frames_in_flight} frame slots for {draw_capacity} draws");
        Ok(Self { slots })
    }

    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    pub fn slot_index(&self, frame_index: u64) -> usize {
        (frame_index % self.slots.len() as u64) as usize
    }

    pub fn slot(&self, frame_index: u64) -> &FrameSlot<D> {
        &self.slots[self.slot_index(frame_index)]
    }

    /// Writes the constants of `frame_index` into its slot and returns the slot.
    pub fn write(
        &self,
        device: &D,
        frame_index: u64,
        constants: &PerFrameConstants,
    ) -> &FrameSlot<D> {
        let slot = self.slot(frame_index);
        device.write_buffer(&slot.constants, 0, bytemuck::bytes_of(constants));
        slot
    }

    /// Grows every slot's transform storage to hold at least `draws` draws.
    pub fn ensure_draw_capacity(&mut self, device: &D, draws: u32) -> SceneResult<()> {
        for slot in &mut self.slots {
            if slot.draw_capacity < draws {
                slot.transforms = FrameSlot::create_transforms(device, slot.index, draws)?;
                slot.draw_capacity = draws;
                debug!("frame slot {} now holds {draws} draws", slot.index);
            }
        }
        Ok(())
    }
}

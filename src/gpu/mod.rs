//! The seam between the scene core and the graphics substrate.
//!
//! [`GpuDevice`] allocates immutable resources, descriptor tables and fences
//! queued uploads. [`CommandStream`] receives the bind and draw calls that a
//! scene traversal emits. The wgpu render context implements both in
//! [`crate::context`]; [`recording`] provides a headless implementation that
//! records every call, which the tests and the `scene-info` tool rely on.

use cgmath::Matrix4;

use crate::data_structures::frame::FrameSlot;

pub mod recording;

/// Number of texture slots in every material descriptor table.
pub const TEXTURE_SLOT_COUNT: usize = 5;

/// What a buffer is used for once it lives on the GPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
    /// Constant buffer, written once or per frame.
    Uniform,
    /// Per-draw transforms, consumed as instance-rate vertex data.
    DrawTransforms,
}

/// Colour space the texel data is stored in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    Srgb,
    /// Used for data textures such as normal maps.
    Linear,
}

/// Pipelines the render context creates once at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    /// Lit, textured triangle meshes.
    Mesh,
    /// Wireframe bounding boxes.
    Bounds,
}

/// A decoded image: tightly packed RGBA8 rows, 4 bytes per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// A 1×1 image with a single colour.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: rgba.to_vec(),
        }
    }

    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("failed to allocate {label}: {reason}")]
    Allocation { label: String, reason: String },

    #[error("waiting for queued uploads failed: {0}")]
    Fence(String),

    #[error("no usable graphics adapter: {0}")]
    Adapter(String),
}

/// Resource allocation and upload side of the graphics substrate.
///
/// Resources created through a device are immutable after creation, except
/// for buffers explicitly rewritten with [`GpuDevice::write_buffer`]. Uploads
/// may be queued; [`GpuDevice::finish_uploads`] blocks until every queued
/// upload has completed on the GPU.
pub trait GpuDevice {
    type Buffer;
    type Texture;
    /// Descriptor table of a material: constants plus [`TEXTURE_SLOT_COUNT`] textures.
    type MaterialBinding;
    /// Descriptor table holding the per-frame constants.
    type FrameBinding;

    fn create_buffer(
        &self,
        label: &str,
        contents: &[u8],
        kind: BufferKind,
    ) -> Result<Self::Buffer, GpuError>;

    fn create_texture(
        &self,
        label: &str,
        image: &ImageData,
        color_space: ColorSpace,
    ) -> Result<Self::Texture, GpuError>;

    fn create_material_binding(
        &self,
        label: &str,
        constants: &Self::Buffer,
        textures: [&Self::Texture; TEXTURE_SLOT_COUNT],
    ) -> Result<Self::MaterialBinding, GpuError>;

    fn create_frame_binding(
        &self,
        label: &str,
        constants: &Self::Buffer,
    ) -> Result<Self::FrameBinding, GpuError>;

    fn write_buffer(&self, buffer: &Self::Buffer, offset: u64, data: &[u8]);

    /// Submits every queued upload and waits for the GPU to complete it.
    fn finish_uploads(&self) -> Result<(), GpuError>;
}

/// Command side of the graphics substrate.
///
/// Calls arrive in the order the GPU has to observe them: all binds for a
/// draw precede [`CommandStream::draw_indexed`].
pub trait CommandStream<D: GpuDevice> {
    fn set_pipeline(&mut self, pipeline: PipelineKind);

    /// Binds the per-frame constants and the slot's per-draw transform storage.
    fn bind_frame(&mut self, frame: &FrameSlot<D>);

    /// Sets the model-view transform used by the following draw.
    fn set_model_transform(&mut self, transform: &Matrix4<f32>);

    fn bind_material(&mut self, material: &D::MaterialBinding);

    fn bind_mesh_buffers(&mut self, vertex: &D::Buffer, index: &D::Buffer);

    fn draw_indexed(&mut self, index_count: u32);
}

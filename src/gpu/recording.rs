//! Headless [`GpuDevice`] and [`CommandStream`] that record every call.
//!
//! Resources are plain handles with sequential ids; buffer contents are kept
//! in memory so that per-frame writes can be inspected. The recorded command
//! list can be replayed into [`RecordedDraw`]s, one per draw call, carrying
//! the state bound at the time of the draw.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use cgmath::Matrix4;

use crate::{
    data_structures::frame::FrameSlot,
    gpu::{
        BufferKind, ColorSpace, CommandStream, GpuDevice, GpuError, ImageData, PipelineKind,
        TEXTURE_SLOT_COUNT,
    },
};

#[derive(Clone, Debug)]
pub struct RecordedBuffer {
    id: u32,
    label: String,
    kind: BufferKind,
    contents: Rc<RefCell<Vec<u8>>>,
}

impl RecordedBuffer {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.contents.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.contents.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedTexture {
    pub id: u32,
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedMaterialBinding {
    pub id: u32,
    pub label: String,
    pub constants: u32,
    pub textures: [u32; TEXTURE_SLOT_COUNT],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedFrameBinding {
    pub id: u32,
    pub label: String,
    pub constants: u32,
}

#[derive(Debug, Default)]
pub struct RecordingDevice {
    next_id: Cell<u32>,
    max_buffer_size: Option<usize>,
    buffers_created: Cell<usize>,
    textures_created: Cell<usize>,
    queued_uploads: Cell<usize>,
    fences_waited: Cell<usize>,
    buffer_writes: Cell<usize>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers larger than `bytes` fail to allocate.
    pub fn with_max_buffer_size(mut self, bytes: usize) -> Self {
        self.max_buffer_size = Some(bytes);
        self
    }

    fn next_id(&self) -> u32 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    pub fn buffers_created(&self) -> usize {
        self.buffers_created.get()
    }

    pub fn textures_created(&self) -> usize {
        self.textures_created.get()
    }

    /// Uploads queued since the last [`GpuDevice::finish_uploads`].
    pub fn queued_uploads(&self) -> usize {
        self.queued_uploads.get()
    }

    pub fn fences_waited(&self) -> usize {
        self.fences_waited.get()
    }

    pub fn buffer_writes(&self) -> usize {
        self.buffer_writes.get()
    }
}

impl GpuDevice for RecordingDevice {
    type Buffer = RecordedBuffer;
    type Texture = RecordedTexture;
    type MaterialBinding = RecordedMaterialBinding;
    type FrameBinding = RecordedFrameBinding;

    fn create_buffer(
        &self,
        label: &str,
        contents: &[u8],
        kind: BufferKind,
    ) -> Result<RecordedBuffer, GpuError> {
        if let Some(max) = self.max_buffer_size
            && contents.len() > max
        {
            return Err(GpuError::Allocation {
                label: label.to_string(),
                reason: format!("{} bytes exceed the {max} byte limit", contents.len()),
            });
        }
        self.buffers_created.set(self.buffers_created.get() + 1);
        Ok(RecordedBuffer {
            id: self.next_id(),
            label: label.to_string(),
            kind,
            contents: Rc::new(RefCell::new(contents.to_vec())),
        })
    }

    fn create_texture(
        &self,
        label: &str,
        image: &ImageData,
        color_space: ColorSpace,
    ) -> Result<RecordedTexture, GpuError> {
        self.textures_created.set(self.textures_created.get() + 1);
        self.queued_uploads.set(self.queued_uploads.get() + 1);
        Ok(RecordedTexture {
            id: self.next_id(),
            label: label.to_string(),
            width: image.width,
            height: image.height,
            color_space,
        })
    }

    fn create_material_binding(
        &self,
        label: &str,
        constants: &RecordedBuffer,
        textures: [&RecordedTexture; TEXTURE_SLOT_COUNT],
    ) -> Result<RecordedMaterialBinding, GpuError> {
        Ok(RecordedMaterialBinding {
            id: self.next_id(),
            label: label.to_string(),
            constants: constants.id,
            textures: textures.map(|t| t.id),
        })
    }

    fn create_frame_binding(
        &self,
        label: &str,
        constants: &RecordedBuffer,
    ) -> Result<RecordedFrameBinding, GpuError> {
        Ok(RecordedFrameBinding {
            id: self.next_id(),
            label: label.to_string(),
            constants: constants.id,
        })
    }

    fn write_buffer(&self, buffer: &RecordedBuffer, offset: u64, data: &[u8]) {
        let mut contents = buffer.contents.borrow_mut();
        let start = offset as usize;
        let end = (start + data.len()).min(contents.len());
        if start < end {
            contents[start..end].copy_from_slice(&data[..end - start]);
        }
        self.buffer_writes.set(self.buffer_writes.get() + 1);
    }

    fn finish_uploads(&self) -> Result<(), GpuError> {
        self.queued_uploads.set(0);
        self.fences_waited.set(self.fences_waited.get() + 1);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    SetPipeline(PipelineKind),
    BindFrame { slot: usize, binding: u32 },
    SetModelTransform(Matrix4<f32>),
    BindMaterial(u32),
    BindMeshBuffers { vertex: u32, index: u32 },
    DrawIndexed { index_count: u32 },
}

/// The state a draw call observed.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedDraw {
    pub pipeline: Option<PipelineKind>,
    pub frame_slot: Option<usize>,
    pub transform: Option<Matrix4<f32>>,
    pub material: Option<u32>,
    pub vertex_buffer: Option<u32>,
    pub index_buffer: Option<u32>,
    pub index_count: u32,
}

#[derive(Debug, Default)]
pub struct RecordingStream {
    commands: Vec<Command>,
}

impl RecordingStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    /// Replays the command list, resolving the bound state of each draw.
    ///
    /// The transform is consumed by the draw that follows it, matching the
    /// one-transform-per-draw storage of the GPU backend.
    pub fn draws(&self) -> Vec<RecordedDraw> {
        let mut draws = Vec::new();
        let mut pipeline = None;
        let mut frame_slot = None;
        let mut transform = None;
        let mut material = None;
        let mut buffers = None;
        for command in &self.commands {
            match command {
                Command::SetPipeline(kind) => pipeline = Some(*kind),
                Command::BindFrame { slot, .. } => frame_slot = Some(*slot),
                Command::SetModelTransform(m) => transform = Some(*m),
                Command::BindMaterial(id) => material = Some(*id),
                Command::BindMeshBuffers { vertex, index } => buffers = Some((*vertex, *index)),
                Command::DrawIndexed { index_count } => draws.push(RecordedDraw {
                    pipeline,
                    frame_slot,
                    transform: transform.take(),
                    material,
                    vertex_buffer: buffers.map(|(v, _)| v),
                    index_buffer: buffers.map(|(_, i)| i),
                    index_count: *index_count,
                }),
            }
        }
        draws
    }
}

impl CommandStream<RecordingDevice> for RecordingStream {
    fn set_pipeline(&mut self, pipeline: PipelineKind) {
        self.commands.push(Command::SetPipeline(pipeline));
    }

    fn bind_frame(&mut self, frame: &FrameSlot<RecordingDevice>) {
        self.commands.push(Command::BindFrame {
            slot: frame.index(),
            binding: frame.binding().id,
        });
    }

    fn set_model_transform(&mut self, transform: &Matrix4<f32>) {
        self.commands.push(Command::SetModelTransform(*transform));
    }

    fn bind_material(&mut self, material: &RecordedMaterialBinding) {
        self.commands.push(Command::BindMaterial(material.id));
    }

    fn bind_mesh_buffers(&mut self, vertex: &RecordedBuffer, index: &RecordedBuffer) {
        self.commands.push(Command::BindMeshBuffers {
            vertex: vertex.id,
            index: index.id,
        });
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.commands.push(Command::DrawIndexed { index_count });
    }
}

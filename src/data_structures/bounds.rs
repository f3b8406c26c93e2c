use cgmath::{Matrix4, Vector3};

use crate::{
    data_structures::aabb::Aabb,
    error::SceneResult,
    gpu::{BufferKind, CommandStream, GpuDevice},
};

/// Corners of the unit cube, in [`Aabb::corners`] order.
pub const UNIT_CUBE_CORNERS: [[f32; 3]; 8] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 1.0],
    [0.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
];

/// The 12 cube edges as a line list.
pub const UNIT_CUBE_EDGES: [u32; 24] = [
    0, 1, 1, 3, 3, 2, 2, 0, // bottom
    4, 5, 5, 7, 7, 6, 6, 4, // top
    0, 4, 1, 5, 2, 6, 3, 7, // sides
];

pub fn bounds_vertex_desc() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        }],
    }
}

/// Wireframe unit cube that is stretched over a bounding box per draw.
pub struct BoundsOverlay<D: GpuDevice> {
    vertex_buffer: D::Buffer,
    index_buffer: D::Buffer,
}

impl<D: GpuDevice> BoundsOverlay<D> {
    pub fn new(device: &D) -> SceneResult<Self> {
        Ok(Self {
            vertex_buffer: device.create_buffer(
                "Bounds Vertex Buffer",
                bytemuck::cast_slice(&UNIT_CUBE_CORNERS),
                BufferKind::Vertex,
            )?,
            index_buffer: device.create_buffer(
                "Bounds Index Buffer",
                bytemuck::cast_slice(&UNIT_CUBE_EDGES),
                BufferKind::Index,
            )?,
        })
    }

    /// Maps the unit cube onto `aabb`. Returns `None` for the empty box.
    pub fn box_transform(aabb: &Aabb) -> Option<Matrix4<f32>> {
        if aabb.is_empty() {
            return None;
        }
        let lower = aabb.lower_left_bottom();
        let extent = aabb.extent();
        Some(
            Matrix4::from_translation(Vector3::new(lower.x, lower.y, lower.z))
                * Matrix4::from_nonuniform_scale(extent.x, extent.y, extent.z),
        )
    }

    pub fn add_to_command_stream<S: CommandStream<D>>(&self, stream: &mut S) {
        stream.bind_mesh_buffers(&self.vertex_buffer, &self.index_buffer);
        stream.draw_indexed(UNIT_CUBE_EDGES.len() as u32);
    }
}

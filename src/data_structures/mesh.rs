use log::debug;

use crate::{
    data_structures::aabb::Aabb,
    error::{SceneError, SceneResult},
    gpu::{BufferKind, CommandStream, GpuDevice},
};

/// Vertex layout shared by every triangle mesh.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// An indexed triangle list living in immutable GPU buffers.
///
/// The local bounding box is computed from the vertex positions at
/// construction and never changes afterwards.
pub struct Mesh<D: GpuDevice> {
    name: String,
    vertex_buffer: D::Buffer,
    index_buffer: D::Buffer,
    vertex_count: u32,
    index_count: u32,
    aabb: Aabb,
    material_index: u32,
}

impl<D: GpuDevice> Mesh<D> {
    pub fn new(
        device: &D,
        name: &str,
        vertices: &[Vertex],
        indices: &[u32],
        material_index: u32,
    ) -> SceneResult<Self> {
        if vertices.is_empty() {
            return Err(SceneError::EmptyBuffer(format!("vertex buffer of mesh {name}")));
        }
        if indices.is_empty() {
            return Err(SceneError::EmptyBuffer(format!("index buffer of mesh {name}")));
        }
        if indices.len() % 3 != 0 {
            return Err(SceneError::InvalidScene(format!(
                "mesh {name} has {} indices, which is not a triangle list",
                indices.len()
            )));
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(SceneError::InvalidScene(format!(
                "mesh {name} references vertex {bad} but has only {} vertices",
                vertices.len()
            )));
        }

        let vertex_buffer = device.create_buffer(
            &format!("{name} Vertex Buffer"),
            bytemuck::cast_slice(vertices),
            BufferKind::Vertex,
        )?;
        let index_buffer = device.create_buffer(
            &format!("{name} Index Buffer"),
            bytemuck::cast_slice(indices),
            BufferKind::Index,
        )?;
        let aabb = Aabb::from_points(vertices.iter().map(|v| v.position));
        debug!(
            "uploaded mesh {name}: {} vertices, {} triangles, material {material_index}",
            vertices.len(),
            indices.len() / 3
        );

        Ok(Self {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            vertex_count: vertices.len() as u32,
            index_count: indices.len() as u32,
            aabb,
            material_index,
        })
    }

    /// Binds the vertex and index buffers and draws the whole mesh.
    pub fn add_to_command_stream<S: CommandStream<D>>(&self, stream: &mut S) {
        stream.bind_mesh_buffers(&self.vertex_buffer, &self.index_buffer);
        stream.draw_indexed(self.index_count);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    pub fn material_index(&self) -> u32 {
        self.material_index
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn vertex_buffer(&self) -> &D::Buffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &D::Buffer {
        &self.index_buffer
    }
}

use crate::{
    data_structures::{frame::DrawTransformRaw, mesh::Vertex},
    pipelines::mk_render_pipeline,
};

/// Lit, textured triangles.
pub fn mk_mesh_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    frame_layout: &wgpu::BindGroupLayout,
    material_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Mesh Pipeline Layout"),
        bind_group_layouts: &[Some(frame_layout), Some(material_layout)],
        immediate_size: 0,
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Mesh Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("mesh.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        "Mesh Pipeline",
        &layout,
        color_format,
        wgpu::PrimitiveTopology::TriangleList,
        &[Vertex::desc(), DrawTransformRaw::desc()],
        shader,
    )
}

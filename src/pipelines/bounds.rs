use crate::{
    data_structures::{bounds::bounds_vertex_desc, frame::DrawTransformRaw},
    pipelines::mk_render_pipeline,
};

/// Unlit line list for the bounding-box overlay.
pub fn mk_bounds_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    frame_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Bounds Pipeline Layout"),
        bind_group_layouts: &[Some(frame_layout)],
        immediate_size: 0,
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Bounds Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("bounds.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        "Bounds Pipeline",
        &layout,
        color_format,
        wgpu::PrimitiveTopology::LineList,
        &[bounds_vertex_desc(), DrawTransformRaw::desc()],
        shader,
    )
}

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use cgmath::{Matrix4, SquareMatrix, Vector3};
use scene_ngin::{
    config::LoadOptions,
    data_structures::{
        material::{Material, MaterialConstants, TextureSlot},
        mesh::{Mesh, Vertex},
        scene_graph::{Node, Scene},
        texture::Texture,
    },
    gpu::recording::RecordingDevice,
    resources::{
        factory::SceneFactory,
        import::{ImportedMesh, ImportedScene},
    },
};

/// A fresh, empty directory below the system temp dir.
pub fn fixture_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("scene_ngin_{}_{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write_png(path: &Path, width: u32, height: u32, rgba: [u8; 4]) {
    image::RgbaImage::from_pixel(width, height, image::Rgba(rgba))
        .save(path)
        .unwrap();
}

/// Unit right triangle in the xy plane.
pub fn triangle_vertices() -> Vec<Vertex> {
    [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
        .into_iter()
        .map(|position| Vertex {
            position,
            normal: [0.0, 0.0, 1.0],
            tex_coords: [0.0, 0.0],
        })
        .collect()
}

pub fn imported_triangle(name: &str) -> ImportedMesh {
    ImportedMesh::triangles(
        name,
        vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        vec![0, 1, 2],
    )
}

pub fn default_material(device: &RecordingDevice, textures: &[Texture<RecordingDevice>]) -> Material<RecordingDevice> {
    Material::new(
        device,
        "plain",
        MaterialConstants::default(),
        TextureSlot::ALL.map(TextureSlot::default_texture),
        textures,
    )
    .unwrap()
}

/// Root with one triangle and a child translated by (1, 0, 0) that draws the
/// same triangle, all with one untextured material.
pub fn two_node_scene(device: &RecordingDevice) -> Scene<RecordingDevice> {
    let textures = Texture::defaults(device).unwrap();
    let material = default_material(device, &textures);
    let mesh = Mesh::new(device, "triangle", &triangle_vertices(), &[0, 1, 2], 0).unwrap();
    let nodes = vec![
        Node::default().with_meshes([0]).with_children([1]),
        Node::new(Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0))).with_meshes([0]),
    ];
    Scene::new(nodes, vec![mesh], vec![material], textures).unwrap()
}

pub fn build(device: &RecordingDevice, imported: ImportedScene) -> Scene<RecordingDevice> {
    SceneFactory::new(device, LoadOptions::default())
        .build(imported)
        .unwrap()
}

pub fn identity() -> Matrix4<f32> {
    Matrix4::identity()
}

pub fn assert_matrix_near(actual: &Matrix4<f32>, expected: &Matrix4<f32>) {
    let a: &[f32; 16] = actual.as_ref();
    let e: &[f32; 16] = expected.as_ref();
    for (x, y) in a.iter().zip(e.iter()) {
        assert!((x - y).abs() < 1e-5, "{actual:?} != {expected:?}");
    }
}

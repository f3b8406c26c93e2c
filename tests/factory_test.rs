use std::path::PathBuf;

use cgmath::Vector4;
use scene_ngin::{
    SceneError,
    config::LoadOptions,
    data_structures::{material::TextureSlot, mesh::Vertex, texture::DEFAULT_WHITE},
    gpu::{GpuError, recording::RecordingDevice},
    resources::{
        factory::{SceneFactory, TextureTable, flatten_nodes, smooth_normals},
        import::{ImportedMaterial, ImportedNode, ImportedScene, MatrixLayout, TextureSource, Topology},
    },
};

use crate::common::test_utils::{build, fixture_dir, imported_triangle, write_png};
mod common;

fn single_node(mesh_indices: Vec<u32>) -> ImportedNode {
    ImportedNode {
        mesh_indices,
        ..ImportedNode::new("root")
    }
}

#[test]
fn unusable_meshes_are_skipped_and_references_remapped() {
    let mut lines = imported_triangle("lines");
    lines.topology = Topology::Lines;
    let mut ragged = imported_triangle("ragged");
    ragged.indices.push(0);
    let mut out_of_range = imported_triangle("out of range");
    out_of_range.indices[2] = 9;

    let mut imported = ImportedScene::new(".");
    imported.meshes = vec![
        lines,
        imported_triangle("a"),
        ragged,
        out_of_range,
        imported_triangle("b"),
    ];
    imported.root = single_node(vec![0, 1, 2, 3, 4]);

    let device = RecordingDevice::new();
    let scene = build(&device, imported);
    let names: Vec<&str> = scene.meshes().iter().map(|m| m.name()).collect();
    assert_eq!(names, ["a", "b"]);
    assert_eq!(scene.nodes()[0].mesh_indices, vec![0, 1]);
    assert_eq!(scene.draw_count(), 2);
}

#[test]
fn flattening_is_pre_order_with_parent_links() {
    let mut root = ImportedNode::new("root");
    let mut left = ImportedNode::new("left");
    left.children.push(single_node(vec![1]));
    root.children = vec![left, single_node(vec![0])];

    let nodes = flatten_nodes(&root, MatrixLayout::ColumnMajor, &[Some(0), None]);
    assert_eq!(nodes.len(), 4);
    assert_eq!(nodes[0].child_indices, vec![1, 3]);
    assert_eq!(nodes[1].child_indices, vec![2]);
    assert!(nodes[2].mesh_indices.is_empty());
    assert_eq!(nodes[3].mesh_indices, vec![0]);
}

#[test]
fn row_major_transforms_are_transposed() {
    let mut root = ImportedNode::new("root");
    root.transform[0][3] = 2.0;
    root.transform[1][3] = 3.0;

    let mut imported = ImportedScene::new(".");
    imported.meshes = vec![imported_triangle("a")];
    imported.root = ImportedNode {
        mesh_indices: vec![0],
        ..root.clone()
    };
    imported.matrix_layout = MatrixLayout::RowMajor;

    let device = RecordingDevice::new();
    let scene = build(&device, imported);
    let transform = scene.nodes()[0].local_transform;
    assert_eq!(transform.w, Vector4::new(2.0, 3.0, 0.0, 1.0));
    assert_eq!(scene.aabb().upper_right_top().x, 3.0);

    let column_major = flatten_nodes(&root, MatrixLayout::ColumnMajor, &[]);
    assert_eq!(column_major[0].local_transform.w, Vector4::new(0.0, 0.0, 0.0, 1.0));
}

#[test]
fn uploads_are_fenced_before_the_scene_is_returned() {
    let device = RecordingDevice::new();
    let mut imported = ImportedScene::new(".");
    imported.meshes = vec![imported_triangle("a")];
    imported.root = single_node(vec![0]);
    build(&device, imported);

    assert_eq!(device.fences_waited(), 1);
    assert_eq!(device.queued_uploads(), 0);
    assert_eq!(device.textures_created(), 3);
}

#[test]
fn meshes_without_valid_material_get_the_default_material() {
    let mut with_material = imported_triangle("with material");
    with_material.material_index = Some(0);
    let mut dangling = imported_triangle("dangling");
    dangling.material_index = Some(5);
    let without = imported_triangle("without");

    let mut imported = ImportedScene::new(".");
    imported.materials = vec![ImportedMaterial {
        name: "red".to_string(),
        diffuse: [1.0, 0.0, 0.0],
        shininess: Some(32.0),
        ..Default::default()
    }];
    imported.meshes = vec![with_material, dangling, without];
    imported.root = single_node(vec![0, 1, 2]);

    let device = RecordingDevice::new();
    let scene = build(&device, imported);
    assert_eq!(scene.materials().len(), 2);
    assert_eq!(scene.materials()[1].name(), "default");
    let material_indices: Vec<u32> = scene.meshes().iter().map(|m| m.material_index()).collect();
    assert_eq!(material_indices, vec![0, 1, 1]);
    assert_eq!(scene.materials()[0].constants().specular_and_exponent[3], 32.0);
}

#[test]
fn no_default_material_when_all_meshes_have_one() {
    let mut mesh = imported_triangle("a");
    mesh.material_index = Some(0);
    let mut imported = ImportedScene::new(".");
    imported.materials = vec![ImportedMaterial::default()];
    imported.meshes = vec![mesh];
    imported.root = single_node(vec![0]);

    let device = RecordingDevice::new();
    assert_eq!(build(&device, imported).materials().len(), 1);
}

#[test]
fn allocation_failure_is_reported() {
    let device = RecordingDevice::new().with_max_buffer_size(16);
    let mut imported = ImportedScene::new(".");
    imported.meshes = vec![imported_triangle("a")];
    imported.root = single_node(vec![0]);

    let result = SceneFactory::new(&device, LoadOptions::default()).build(imported);
    assert!(matches!(
        result,
        Err(SceneError::Gpu(GpuError::Allocation { .. }))
    ));
}

fn textured_scene(dir: PathBuf, file: &str) -> ImportedScene {
    let mut mesh = imported_triangle("a");
    mesh.material_index = Some(0);
    let mut material = ImportedMaterial::default();
    material.textures[TextureSlot::Diffuse.index()] = Some(TextureSource::File(file.into()));
    let mut imported = ImportedScene::new(dir);
    imported.materials = vec![material];
    imported.meshes = vec![mesh];
    imported.root = single_node(vec![0]);
    imported
}

#[test]
fn missing_texture_fails_strict_loads() {
    let dir = fixture_dir("strict_missing");
    let device = RecordingDevice::new();
    let result = SceneFactory::new(&device, LoadOptions::default())
        .build(textured_scene(dir, "missing.png"));
    assert!(matches!(result, Err(SceneError::NotFound(_))));
}

#[test]
fn missing_texture_falls_back_in_lenient_loads() {
    let dir = fixture_dir("lenient_missing");
    let device = RecordingDevice::new();
    let options = LoadOptions {
        strict_textures: false,
        ..Default::default()
    };
    let scene = SceneFactory::new(&device, options)
        .build(textured_scene(dir, "missing.png"))
        .unwrap();
    assert_eq!(scene.materials()[0].texture_index(TextureSlot::Diffuse), DEFAULT_WHITE);
    assert_eq!(scene.stats().textures, 0);
}

#[test]
fn texture_files_are_decoded_to_rgba() {
    let dir = fixture_dir("decode");
    write_png(&dir.join("wood.png"), 4, 2, [200, 100, 50, 255]);
    let device = RecordingDevice::new();
    let scene = build(&device, textured_scene(dir, "wood.png"));

    let index = scene.materials()[0].texture_index(TextureSlot::Diffuse);
    let texture = scene.texture(index).unwrap();
    assert_eq!((texture.width(), texture.height()), (4, 2));
    assert_eq!(texture.label(), "wood.png");
    assert_eq!(scene.stats().textures, 1);
}

#[test]
fn texture_table_dedups_in_first_reference_order() {
    let file = |name: &str| Some(TextureSource::File(name.into()));
    let mut first = ImportedMaterial::default();
    first.textures[TextureSlot::Diffuse.index()] = file("b.png");
    first.textures[TextureSlot::Normal.index()] = file("a.png");
    let mut second = ImportedMaterial::default();
    second.textures[TextureSlot::Ambient.index()] = file("a.png");
    second.textures[TextureSlot::Specular.index()] = file("c.png");

    let table = TextureTable::collect(&[first, second]);
    assert_eq!(table.len(), 3);
}

#[test]
fn missing_and_unsupported_files_are_rejected() {
    let device = RecordingDevice::new();
    let factory = SceneFactory::new(&device, LoadOptions::default());
    let dir = fixture_dir("unsupported");

    let missing = factory.load(dir.join("nothing.gltf"));
    assert!(matches!(missing, Err(SceneError::NotFound(_))));

    let fbx = dir.join("scene.fbx");
    std::fs::write(&fbx, b"binary").unwrap();
    assert!(matches!(factory.load(&fbx), Err(SceneError::UnsupportedFormat(_))));
}

fn uploaded_vertices(scene: &scene_ngin::data_structures::scene_graph::Scene<RecordingDevice>) -> Vec<Vertex> {
    bytemuck::pod_collect_to_vec(&scene.meshes()[0].vertex_buffer().bytes())
}

#[test]
fn missing_normals_are_generated_from_faces() {
    let mut imported = ImportedScene::new(".");
    imported.meshes = vec![scene_ngin::resources::import::ImportedMesh::triangles(
        "floor",
        vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
        vec![0, 1, 2],
    )];
    imported.root = single_node(vec![0]);

    let device = RecordingDevice::new();
    let vertices = uploaded_vertices(&build(&device, imported));
    assert_eq!(vertices.len(), 3);
    for vertex in vertices {
        assert_eq!(vertex.normal, [0.0, -1.0, 0.0]);
    }
}

#[test]
fn imported_normals_are_kept() {
    let mut mesh = imported_triangle("a");
    mesh.normals = vec![[1.0, 0.0, 0.0]; 3];
    let mut imported = ImportedScene::new(".");
    imported.meshes = vec![mesh];
    imported.root = single_node(vec![0]);

    let device = RecordingDevice::new();
    let vertices = uploaded_vertices(&build(&device, imported));
    assert!(vertices.iter().all(|v| v.normal == [1.0, 0.0, 0.0]));
}

#[test]
fn shared_vertices_average_adjacent_faces() {
    // Two faces folded along the x axis: one facing +Y, one facing +Z.
    let positions = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 0.0, -1.0],
        [0.0, 1.0, 0.0],
        [5.0, 5.0, 5.0],
    ];
    let normals = smooth_normals(&positions, &[0, 1, 2, 0, 1, 3]);
    let half = std::f32::consts::FRAC_1_SQRT_2;
    for shared in &normals[..2] {
        assert!((shared[0]).abs() < 1e-6);
        assert!((shared[1] - half).abs() < 1e-6 && (shared[2] - half).abs() < 1e-6);
    }
    assert_eq!(normals[2], [0.0, 1.0, 0.0]);
    assert_eq!(normals[3], [0.0, 0.0, 1.0]);
    assert_eq!(normals[4], [0.0, 0.0, 1.0], "unreferenced vertex");
}

//! Wavefront OBJ/MTL importer.
//!
//! OBJ has no hierarchy: every object becomes a mesh hanging off a single
//! identity root.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::{
    config::LoadOptions,
    data_structures::material::TextureSlot,
    error::{SceneError, SceneResult},
    resources::import::{
        ImportedMaterial, ImportedMesh, ImportedNode, ImportedScene, MatrixLayout, TextureSource,
        Topology,
    },
};

pub fn import_obj(path: &Path, options: &LoadOptions) -> SceneResult<ImportedScene> {
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|e| SceneError::import(path, e))?;
    let materials = materials.unwrap_or_else(|e| {
        warn!("material library of {} failed to load: {e}", path.display());
        Vec::new()
    });

    let meshes: Vec<ImportedMesh> = models
        .iter()
        .map(|model| read_model(model, options.flip_obj_v))
        .collect();
    let mut root = ImportedNode::new("root");
    root.mesh_indices = (0..meshes.len() as u32).collect();
    debug!(
        "imported {}: {} objects, {} materials",
        path.display(),
        meshes.len(),
        materials.len()
    );

    Ok(ImportedScene {
        meshes,
        root,
        materials: materials.iter().map(read_material).collect(),
        matrix_layout: MatrixLayout::ColumnMajor,
        base_dir: path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf(),
    })
}

fn read_model(model: &tobj::Model, flip_v: bool) -> ImportedMesh {
    let mesh = &model.mesh;
    let vertex_count = mesh.positions.len() / 3;
    let positions = mesh
        .positions
        .chunks_exact(3)
        .map(|p| [p[0], p[1], p[2]])
        .collect();
    let normals = if mesh.normals.len() == vertex_count * 3 {
        mesh.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect()
    } else {
        Vec::new()
    };
    let tex_coords = if mesh.texcoords.len() == vertex_count * 2 {
        mesh.texcoords
            .chunks_exact(2)
            .map(|t| [t[0], if flip_v { 1.0 - t[1] } else { t[1] }])
            .collect()
    } else {
        Vec::new()
    };

    ImportedMesh {
        name: model.name.clone(),
        positions,
        normals,
        tex_coords,
        indices: mesh.indices.clone(),
        topology: Topology::Triangles,
        material_index: mesh.material_id.map(|id| id as u32),
    }
}

fn read_material(material: &tobj::Material) -> ImportedMaterial {
    let param = |key: &str| material.unknown_param.get(key).map(String::as_str);
    let emissive = param("Ke").and_then(parse_rgb).unwrap_or([0.0; 3]);
    let normal_map = material
        .normal_texture
        .as_deref()
        .or_else(|| param("map_Bump"))
        .or_else(|| param("map_bump"))
        .or_else(|| param("bump"));

    let mut textures: [Option<TextureSource>; 5] = Default::default();
    textures[TextureSlot::Ambient.index()] = texture_file(material.ambient_texture.as_deref());
    textures[TextureSlot::Diffuse.index()] = texture_file(material.diffuse_texture.as_deref());
    textures[TextureSlot::Specular.index()] = texture_file(material.specular_texture.as_deref());
    textures[TextureSlot::Emissive.index()] = texture_file(param("map_Ke"));
    textures[TextureSlot::Normal.index()] = texture_file(normal_map);

    let defaults = ImportedMaterial::default();
    ImportedMaterial {
        name: material.name.clone(),
        ambient: material.ambient.unwrap_or(defaults.ambient),
        diffuse: material.diffuse.unwrap_or(defaults.diffuse),
        specular: material.specular.unwrap_or(defaults.specular),
        emissive,
        shininess: material.shininess,
        textures,
    }
}

/// Texture statements may carry options (`-bm 0.5 normal.png`); the file
/// name is the last token.
fn texture_file(statement: Option<&str>) -> Option<TextureSource> {
    statement
        .and_then(|s| s.split_whitespace().last())
        .map(|file| TextureSource::File(PathBuf::from(file.replace('\\', "/"))))
}

fn parse_rgb(value: &str) -> Option<[f32; 3]> {
    let mut channels = value.split_whitespace().map(str::parse::<f32>);
    match (channels.next(), channels.next(), channels.next()) {
        (Some(Ok(r)), Some(Ok(g)), Some(Ok(b))) => Some([r, g, b]),
        (Some(Ok(grey)), None, None) => Some([grey; 3]),
        _ => None,
    }
}

//! glTF 2.0 importer (`.gltf` and `.glb`).
//!
//! Every primitive becomes its own mesh. The default scene's root nodes hang
//! below a synthetic identity root. glTF has no ambient colour or specular
//! exponent; ambient is a tenth of the base colour and the exponent is
//! derived from roughness. Only base colour, emissive and normal maps are
//! bound.

use std::{collections::HashSet, path::Path, sync::Arc};

use gltf::mesh::Mode;
use log::{debug, warn};

use crate::{
    data_structures::material::TextureSlot,
    error::{SceneError, SceneResult},
    resources::{
        import::{
            ImportedMaterial, ImportedMesh, ImportedNode, ImportedScene, MatrixLayout,
            TextureSource, Topology,
        },
        load_binary,
    },
};

pub fn import_gltf(path: &Path) -> SceneResult<ImportedScene> {
    let bytes = load_binary(path)?;
    let gltf::Gltf { document, blob } =
        gltf::Gltf::from_slice(&bytes).map_err(|e| SceneError::import(path, e))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let buffers = gltf::import_buffers(&document, Some(base_dir), blob)
        .map_err(|e| SceneError::import(path, e))?;

    let mut meshes = Vec::new();
    let mut primitives_of_mesh = Vec::new();
    for mesh in document.meshes() {
        let mut ids = Vec::new();
        for primitive in mesh.primitives() {
            ids.push(meshes.len() as u32);
            meshes.push(read_primitive(&mesh, &primitive, &buffers));
        }
        primitives_of_mesh.push(ids);
    }

    let materials: Vec<ImportedMaterial> = document
        .materials()
        .map(|material| read_material(path, &material, &buffers))
        .collect();

    let mut root = ImportedNode::new("root");
    match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => {
            let mut visited = HashSet::new();
            root.children = scene
                .nodes()
                .filter_map(|node| read_node(&node, &primitives_of_mesh, &mut visited))
                .collect();
        }
        None => warn!("{} contains no scene", path.display()),
    }
    debug!(
        "imported {}: {} primitives, {} materials",
        path.display(),
        meshes.len(),
        materials.len()
    );

    Ok(ImportedScene {
        meshes,
        root,
        materials,
        matrix_layout: MatrixLayout::ColumnMajor,
        base_dir: base_dir.to_path_buf(),
    })
}

fn read_node(
    node: &gltf::Node,
    primitives_of_mesh: &[Vec<u32>],
    visited: &mut HashSet<usize>,
) -> Option<ImportedNode> {
    if !visited.insert(node.index()) {
        warn!("node {} is referenced twice, skipping the second reference", node.index());
        return None;
    }
    let mesh_indices = node
        .mesh()
        .map(|mesh| primitives_of_mesh[mesh.index()].clone())
        .unwrap_or_default();
    let children = node
        .children()
        .filter_map(|child| read_node(&child, primitives_of_mesh, visited))
        .collect();
    Some(ImportedNode {
        name: node.name().unwrap_or("node").to_string(),
        transform: node.transform().matrix(),
        mesh_indices,
        children,
    })
}

fn read_primitive(
    mesh: &gltf::Mesh,
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
) -> ImportedMesh {
    let reader = primitive.reader(|buffer| Some(&*buffers[buffer.index()]));
    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .map(|iter| iter.collect())
        .unwrap_or_default();
    let normals = reader
        .read_normals()
        .map(|iter| iter.collect())
        .unwrap_or_default();
    let set = tex_coord_set(&primitive.material());
    let tex_coords = reader
        .read_tex_coords(set)
        .or_else(|| {
            if set != 0 {
                warn!("{} has no TEXCOORD_{set}, using TEXCOORD_0", mesh.name().unwrap_or("mesh"));
            }
            reader.read_tex_coords(0)
        })
        .map(|tc| tc.into_f32().collect())
        .unwrap_or_default();
    let indices: Vec<u32> = reader
        .read_indices()
        .map(|indices| indices.into_u32().collect())
        .unwrap_or_else(|| (0..positions.len() as u32).collect());

    let (topology, indices) = match primitive.mode() {
        Mode::Triangles => (Topology::Triangles, indices),
        Mode::TriangleStrip => (Topology::Triangles, strip_to_list(&indices)),
        Mode::TriangleFan => (Topology::Triangles, fan_to_list(&indices)),
        Mode::Lines | Mode::LineLoop | Mode::LineStrip => (Topology::Lines, indices),
        Mode::Points => (Topology::Points, indices),
    };

    ImportedMesh {
        name: format!(
            "{}[{}]",
            mesh.name().unwrap_or("mesh"),
            primitive.index()
        ),
        positions,
        normals,
        tex_coords,
        indices,
        topology,
        material_index: primitive.material().index().map(|i| i as u32),
    }
}

/// Meshes carry one UV set: the one the base colour texture samples, else
/// the normal map's, else set 0.
fn tex_coord_set(material: &gltf::Material) -> u32 {
    material
        .pbr_metallic_roughness()
        .base_color_texture()
        .map(|info| info.tex_coord())
        .or_else(|| material.normal_texture().map(|normal| normal.tex_coord()))
        .or_else(|| material.emissive_texture().map(|info| info.tex_coord()))
        .unwrap_or(0)
}

/// Converts a triangle strip into a list, keeping the winding of every triangle.
pub fn strip_to_list(strip: &[u32]) -> Vec<u32> {
    strip
        .windows(3)
        .enumerate()
        .flat_map(|(i, w)| {
            if i % 2 == 0 {
                [w[0], w[1], w[2]]
            } else {
                [w[1], w[0], w[2]]
            }
        })
        .collect()
}

pub fn fan_to_list(fan: &[u32]) -> Vec<u32> {
    match fan.split_first() {
        Some((&center, rest)) => rest
            .windows(2)
            .flat_map(|w| [center, w[0], w[1]])
            .collect(),
        None => Vec::new(),
    }
}

fn read_material(
    path: &Path,
    material: &gltf::Material,
    buffers: &[gltf::buffer::Data],
) -> ImportedMaterial {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, _] = pbr.base_color_factor();
    let diffuse = [r, g, b];
    let metallic = pbr.metallic_factor();
    let roughness = pbr.roughness_factor().max(0.05);
    // Dielectrics reflect ~4%, metals tint the reflection with the base colour
    let specular = diffuse.map(|c| 0.04 + (c - 0.04) * metallic);
    let shininess = (2.0 / roughness.powi(4) - 2.0).clamp(1.0, 1024.0);

    let name = material
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("material {}", material.index().unwrap_or_default()));
    let source = |texture: gltf::Texture| texture_source(path, &texture, buffers);

    // Occlusion and metallic-roughness maps hold factors, not colours; the
    // ambient and specular slots keep their defaults.
    if material.occlusion_texture().is_some() || pbr.metallic_roughness_texture().is_some() {
        debug!("{name}: occlusion and metallic-roughness maps are not bound");
    }
    let mut textures: [Option<TextureSource>; 5] = Default::default();
    textures[TextureSlot::Diffuse.index()] =
        pbr.base_color_texture().and_then(|t| source(t.texture()));
    textures[TextureSlot::Emissive.index()] =
        material.emissive_texture().and_then(|t| source(t.texture()));
    textures[TextureSlot::Normal.index()] =
        material.normal_texture().and_then(|t| source(t.texture()));

    ImportedMaterial {
        name,
        ambient: diffuse.map(|c| c * 0.1),
        diffuse,
        specular,
        emissive: material.emissive_factor(),
        shininess: Some(shininess),
        textures,
    }
}

fn texture_source(
    path: &Path,
    texture: &gltf::Texture,
    buffers: &[gltf::buffer::Data],
) -> Option<TextureSource> {
    let image = texture.source();
    match image.source() {
        gltf::image::Source::Uri { uri, .. } => {
            if uri.starts_with("data:") {
                warn!("image {} uses a data URI, which is not supported", image.index());
                return None;
            }
            match urlencoding::decode(uri) {
                Ok(path) => Some(TextureSource::File(path.into_owned().into())),
                Err(e) => {
                    warn!("image {} has a malformed URI {uri}: {e}", image.index());
                    None
                }
            }
        }
        gltf::image::Source::View { view, mime_type } => {
            let data = &buffers[view.buffer().index()];
            let Some(bytes) = data.get(view.offset()..view.offset() + view.length()) else {
                warn!("image {} lies outside its buffer", image.index());
                return None;
            };
            Some(TextureSource::Embedded {
                key: format!("{}#image{}", path.display(), image.index()),
                bytes: Arc::from(bytes),
                mime_type: Some(mime_type.to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_alternate_winding() {
        assert_eq!(strip_to_list(&[0, 1, 2, 3]), vec![0, 1, 2, 2, 1, 3]);
        assert!(strip_to_list(&[0, 1]).is_empty());
    }

    #[test]
    fn fans_share_the_first_vertex() {
        assert_eq!(fan_to_list(&[0, 1, 2, 3]), vec![0, 1, 2, 0, 2, 3]);
        assert!(fan_to_list(&[]).is_empty());
    }
}

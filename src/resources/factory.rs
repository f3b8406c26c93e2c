//! Builds a [`Scene`] from an [`ImportedScene`].
//!
//! The build runs in passes: meshes, nodes, scene bounds, then textures and
//! materials. All uploads are fenced before the scene is handed out.

use std::{collections::HashMap, path::Path};

use cgmath::{InnerSpace, Matrix, Matrix4, Vector3, Zero};
use instant::Instant;
use log::{debug, info, warn};

use crate::{
    config::LoadOptions,
    data_structures::{
        material::{Material, MaterialConstants, TextureSlot, resolve_texture_slots},
        mesh::{Mesh, Vertex},
        scene_graph::{Node, Scene, scene_aabb},
        texture::Texture,
    },
    error::SceneResult,
    gpu::{ColorSpace, GpuDevice},
    resources::{
        import::{ImportedMaterial, ImportedMesh, ImportedNode, ImportedScene, MatrixLayout, TextureSource, Topology},
        import_scene, load_image,
    },
};

/// Converts an imported matrix into the engine's column-major convention.
pub fn convert_transform(m: [[f32; 4]; 4], layout: MatrixLayout) -> Matrix4<f32> {
    let m = Matrix4::from(m);
    match layout {
        MatrixLayout::ColumnMajor => m,
        MatrixLayout::RowMajor => m.transpose(),
    }
}

/// Unique textures in first-reference order.
#[derive(Debug, Default)]
pub struct TextureTable {
    entries: Vec<(String, TextureSource, ColorSpace)>,
    lookup: HashMap<String, usize>,
}

impl TextureTable {
    pub fn collect(materials: &[ImportedMaterial]) -> Self {
        let mut table = Self::default();
        for material in materials {
            for slot in TextureSlot::ALL {
                if let Some(source) = &material.textures[slot.index()] {
                    let key = source.key();
                    if !table.lookup.contains_key(&key) {
                        table.lookup.insert(key.clone(), table.entries.len());
                        table.entries.push((key, source.clone(), slot.color_space()));
                    }
                }
            }
        }
        table
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct SceneFactory<'d, D: GpuDevice> {
    device: &'d D,
    options: LoadOptions,
}

impl<'d, D: GpuDevice> SceneFactory<'d, D> {
    pub fn new(device: &'d D, options: LoadOptions) -> Self {
        Self { device, options }
    }

    pub fn load(&self, path: impl AsRef<Path>) -> SceneResult<Scene<D>> {
        let path = path.as_ref();
        let start = Instant::now();
        let imported = import_scene(path, &self.options)?;
        debug!("parsed {} in {:?}", path.display(), start.elapsed());
        self.build(imported)
    }

    pub fn build(&self, imported: ImportedScene) -> SceneResult<Scene<D>> {
        let start = Instant::now();
        let ImportedScene {
            meshes: imported_meshes,
            root,
            mut materials,
            matrix_layout,
            base_dir,
        } = imported;

        // Meshes without a usable material share one default material.
        let default_material = materials.len() as u32;
        let needs_default = materials.is_empty()
            || imported_meshes.iter().any(|m| {
                m.material_index
                    .is_none_or(|index| index as usize >= materials.len())
            });
        if needs_default {
            materials.push(ImportedMaterial::default());
        }

        let (meshes, remap) = self.create_meshes(&imported_meshes, default_material)?;
        let nodes = flatten_nodes(&root, matrix_layout, &remap);
        let aabb = scene_aabb(&nodes, &meshes);
        debug!(
            "scene bounds {:?} .. {:?}",
            aabb.lower_left_bottom(),
            aabb.upper_right_top()
        );

        let table = TextureTable::collect(&materials);
        let (textures, texture_indices) = self.create_textures(&table, &base_dir)?;
        let materials = materials
            .iter()
            .map(|material| {
                let keys = material
                    .textures
                    .each_ref()
                    .map(|source| source.as_ref().map(TextureSource::key));
                let indices = resolve_texture_slots(&keys, |key| texture_indices.get(key).copied());
                let constants = MaterialConstants::new(
                    material.ambient,
                    material.diffuse,
                    material.specular,
                    material.emissive,
                    material.shininess.unwrap_or(1.0),
                );
                Material::new(self.device, &material.name, constants, indices, &textures)
            })
            .collect::<SceneResult<Vec<_>>>()?;

        self.device.finish_uploads()?;
        let scene = Scene::with_aabb(nodes, meshes, materials, textures, aabb)?;
        let stats = scene.stats();
        info!(
            "built scene with {} nodes, {} meshes, {} materials, {} textures in {:?}",
            stats.nodes,
            stats.meshes,
            stats.materials,
            stats.textures,
            start.elapsed()
        );
        Ok(scene)
    }

    /// Uploads every triangle mesh. Returns the meshes and the old → new
    /// index map; skipped meshes map to `None`.
    fn create_meshes(
        &self,
        imported: &[ImportedMesh],
        default_material: u32,
    ) -> SceneResult<(Vec<Mesh<D>>, Vec<Option<u32>>)> {
        let mut meshes = Vec::with_capacity(imported.len());
        let mut remap = Vec::with_capacity(imported.len());
        for (index, mesh) in imported.iter().enumerate() {
            if let Some(reason) = skip_reason(mesh) {
                warn!("skipping mesh {index} ({}): {reason}", mesh.name);
                remap.push(None);
                continue;
            }
            let material_index = match mesh.material_index {
                Some(m) if m < default_material => m,
                _ => default_material,
            };
            let vertices = build_vertices(mesh);
            remap.push(Some(meshes.len() as u32));
            meshes.push(Mesh::new(
                self.device,
                &mesh.name,
                &vertices,
                &mesh.indices,
                material_index,
            )?);
        }
        Ok((meshes, remap))
    }

    fn create_textures(
        &self,
        table: &TextureTable,
        base_dir: &Path,
    ) -> SceneResult<(Vec<Texture<D>>, HashMap<String, u32>)> {
        let mut textures = Texture::defaults(self.device)?;
        let mut indices = HashMap::with_capacity(table.len());
        for (key, source, color_space) in &table.entries {
            let image = match load_image(source, base_dir) {
                Ok(image) => image,
                Err(e) if !self.options.strict_textures => {
                    warn!("texture {key} unavailable, slot falls back to its default: {e}");
                    continue;
                }
                Err(e) => return Err(e),
            };
            indices.insert(key.clone(), textures.len() as u32);
            textures.push(Texture::new(self.device, key, &image, *color_space)?);
        }
        Ok((textures, indices))
    }
}

fn skip_reason(mesh: &ImportedMesh) -> Option<String> {
    if mesh.topology != Topology::Triangles {
        return Some(format!("{:?} primitives are not supported", mesh.topology));
    }
    if mesh.positions.is_empty() {
        return Some("no positions".to_string());
    }
    if mesh.indices.is_empty() {
        return Some("no indices".to_string());
    }
    if mesh.indices.len() % 3 != 0 {
        return Some(format!("{} indices do not form triangles", mesh.indices.len()));
    }
    if let Some(bad) = mesh.indices.iter().find(|&&i| i as usize >= mesh.positions.len()) {
        return Some(format!("index {bad} exceeds {} positions", mesh.positions.len()));
    }
    None
}

fn build_vertices(mesh: &ImportedMesh) -> Vec<Vertex> {
    let generated;
    let normals = if mesh.normals.len() == mesh.positions.len() {
        &mesh.normals
    } else {
        debug!("generating smooth normals for mesh {}", mesh.name);
        generated = smooth_normals(&mesh.positions, &mesh.indices);
        &generated
    };
    let has_tex_coords = mesh.tex_coords.len() == mesh.positions.len();
    mesh.positions
        .iter()
        .zip(normals)
        .enumerate()
        .map(|(i, (&position, &normal))| Vertex {
            position,
            normal,
            tex_coords: if has_tex_coords { mesh.tex_coords[i] } else { [0.0, 0.0] },
        })
        .collect()
}

/// Per-vertex normals as the normalized sum of the adjacent face normals.
///
/// Face normals are unnormalized cross products, so larger triangles weigh
/// more. Vertices without a non-degenerate face get `+Z`.
pub fn smooth_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut sums = vec![Vector3::<f32>::zero(); positions.len()];
    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
        let (Some(&pa), Some(&pb), Some(&pc)) = (positions.get(a), positions.get(b), positions.get(c))
        else {
            continue;
        };
        let [pa, pb, pc] = [pa, pb, pc].map(Vector3::from);
        let face = (pb - pa).cross(pc - pa);
        for i in [a, b, c] {
            sums[i] += face;
        }
    }
    sums.into_iter()
        .map(|sum| {
            if sum.magnitude2() > f32::EPSILON * f32::EPSILON {
                sum.normalize().into()
            } else {
                [0.0, 0.0, 1.0]
            }
        })
        .collect()
}

/// Flattens the import hierarchy in pre-order; the root lands at index 0.
/// Mesh references go through `remap`, dropping skipped meshes.
pub fn flatten_nodes(root: &ImportedNode, layout: MatrixLayout, remap: &[Option<u32>]) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut stack: Vec<(&ImportedNode, Option<usize>)> = vec![(root, None)];
    while let Some((imported, parent)) = stack.pop() {
        let index = nodes.len();
        let mesh_indices = imported
            .mesh_indices
            .iter()
            .filter_map(|&old| remap.get(old as usize).copied().flatten());
        nodes.push(Node::new(convert_transform(imported.transform, layout)).with_meshes(mesh_indices));
        if let Some(parent) = parent {
            nodes[parent].child_indices.push(index as u32);
        }
        stack.extend(imported.children.iter().rev().map(|child| (child, Some(index))));
    }
    nodes
}

//! Format-neutral description of an imported scene.
//!
//! The glTF and OBJ importers both produce an [`ImportedScene`]; the scene
//! factory turns it into GPU resources. Nothing in here touches the GPU.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::gpu::TEXTURE_SLOT_COUNT;

/// How the rows of [`ImportedNode::transform`] are to be read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatrixLayout {
    /// `transform[c]` is column `c`, the engine convention.
    ColumnMajor,
    /// `transform[r]` is row `r`.
    RowMajor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    Lines,
    Points,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportedMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    /// Empty or one per position.
    pub normals: Vec<[f32; 3]>,
    /// Empty or one per position.
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub topology: Topology,
    pub material_index: Option<u32>,
}

impl ImportedMesh {
    pub fn triangles(name: impl Into<String>, positions: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            positions,
            normals: Vec::new(),
            tex_coords: Vec::new(),
            indices,
            topology: Topology::Triangles,
            material_index: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportedNode {
    pub name: String,
    pub transform: [[f32; 4]; 4],
    pub mesh_indices: Vec<u32>,
    pub children: Vec<ImportedNode>,
}

pub const IDENTITY: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

impl ImportedNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: IDENTITY,
            mesh_indices: Vec::new(),
            children: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextureSource {
    /// Path relative to the scene's base directory, or absolute.
    File(PathBuf),
    /// Image bytes stored inside the scene file.
    Embedded {
        key: String,
        bytes: Arc<[u8]>,
        mime_type: Option<String>,
    },
}

impl TextureSource {
    /// Identity used to share one upload between materials.
    pub fn key(&self) -> String {
        match self {
            TextureSource::File(path) => path.to_string_lossy().into_owned(),
            TextureSource::Embedded { key, .. } => key.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportedMaterial {
    pub name: String,
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub emissive: [f32; 3],
    pub shininess: Option<f32>,
    /// Indexed by [`crate::data_structures::material::TextureSlot`].
    pub textures: [Option<TextureSource>; TEXTURE_SLOT_COUNT],
}

impl Default for ImportedMaterial {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            ambient: [0.1, 0.1, 0.1],
            diffuse: [1.0, 1.0, 1.0],
            specular: [0.0, 0.0, 0.0],
            emissive: [0.0, 0.0, 0.0],
            shininess: None,
            textures: Default::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportedScene {
    pub meshes: Vec<ImportedMesh>,
    pub root: ImportedNode,
    pub materials: Vec<ImportedMaterial>,
    pub matrix_layout: MatrixLayout,
    /// Directory that relative texture paths are resolved against.
    pub base_dir: PathBuf,
}

impl ImportedScene {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            meshes: Vec::new(),
            root: ImportedNode::new("root"),
            materials: Vec::new(),
            matrix_layout: MatrixLayout::ColumnMajor,
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }
}

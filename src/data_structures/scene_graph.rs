//! Scene graph and hierarchical transform propagation.
//!
//! The node tree is stored as a flat array in which nodes refer to their
//! children by index; node 0 is the root. A [`Scene`] owns that array together
//! with the meshes, materials and textures it references, and checks every
//! index relationship once at construction. Traversal is a depth-first
//! pre-order walk that accumulates `parent * local` transforms.

use cgmath::{Matrix4, Point3, SquareMatrix};
use log::warn;

use crate::{
    data_structures::{
        aabb::Aabb,
        bounds::BoundsOverlay,
        material::Material,
        mesh::Mesh,
        texture::{DEFAULT_TEXTURE_COUNT, Texture},
    },
    error::{SceneError, SceneResult},
    gpu::{CommandStream, GpuDevice},
};

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub local_transform: Matrix4<f32>,
    pub mesh_indices: Vec<u32>,
    pub child_indices: Vec<u32>,
}

impl Default for Node {
    fn default() -> Self {
        Self::new(Matrix4::identity())
    }
}

impl Node {
    pub fn new(local_transform: Matrix4<f32>) -> Self {
        Self {
            local_transform,
            mesh_indices: Vec::new(),
            child_indices: Vec::new(),
        }
    }

    pub fn with_meshes(mut self, mesh_indices: impl IntoIterator<Item = u32>) -> Self {
        self.mesh_indices.extend(mesh_indices);
        self
    }

    pub fn with_children(mut self, child_indices: impl IntoIterator<Item = u32>) -> Self {
        self.child_indices.extend(child_indices);
        self
    }
}

/// Walks `nodes` from the root in depth-first pre-order.
///
/// `visitor` receives the node index, the node and its accumulated transform
/// `root_transform * ... * parent.local * node.local`. Children are visited
/// in `child_indices` order. Out-of-range indices are skipped with a warning.
pub fn visit_nodes<F>(nodes: &[Node], root_transform: Matrix4<f32>, mut visitor: F)
where
    F: FnMut(u32, &Node, &Matrix4<f32>),
{
    let mut stack = vec![(0u32, root_transform)];
    while let Some((index, parent)) = stack.pop() {
        let Some(node) = nodes.get(index as usize) else {
            warn!("node index {index} out of bounds ({} nodes), skipping", nodes.len());
            continue;
        };
        let accumulated = parent * node.local_transform;
        visitor(index, node, &accumulated);
        stack.extend(node.child_indices.iter().rev().map(|&child| (child, accumulated)));
    }
}

/// Union of every mesh AABB transformed by its accumulated node transform.
pub fn scene_aabb<D: GpuDevice>(nodes: &[Node], meshes: &[Mesh<D>]) -> Aabb {
    let mut aabb = Aabb::empty();
    visit_nodes(nodes, Matrix4::identity(), |_, node, transform| {
        for &mesh_index in &node.mesh_indices {
            match meshes.get(mesh_index as usize) {
                Some(mesh) => aabb = aabb.union(&mesh.aabb().transformed(transform)),
                None => warn!("mesh index {mesh_index} out of bounds, skipping"),
            }
        }
    });
    aabb
}

/// Summary of a loaded scene for the host UI.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneStats {
    pub nodes: usize,
    pub meshes: usize,
    pub materials: usize,
    /// Textures loaded from the scene, without the built-in defaults.
    pub textures: usize,
    pub draws: u32,
    pub lower_left_bottom: Point3<f32>,
    pub upper_right_top: Point3<f32>,
}

pub struct Scene<D: GpuDevice> {
    nodes: Vec<Node>,
    meshes: Vec<Mesh<D>>,
    materials: Vec<Material<D>>,
    textures: Vec<Texture<D>>,
    aabb: Aabb,
    draw_count: u32,
}

impl<D: GpuDevice> Scene<D> {
    /// Validates the index graph and computes the scene AABB.
    pub fn new(
        nodes: Vec<Node>,
        meshes: Vec<Mesh<D>>,
        materials: Vec<Material<D>>,
        textures: Vec<Texture<D>>,
    ) -> SceneResult<Self> {
        validate(&nodes, &meshes, &materials, &textures)?;
        let aabb = scene_aabb(&nodes, &meshes);
        Ok(Self::from_validated(nodes, meshes, materials, textures, aabb))
    }

    /// Like [`Scene::new`] for callers that already computed the AABB.
    pub(crate) fn with_aabb(
        nodes: Vec<Node>,
        meshes: Vec<Mesh<D>>,
        materials: Vec<Material<D>>,
        textures: Vec<Texture<D>>,
        aabb: Aabb,
    ) -> SceneResult<Self> {
        validate(&nodes, &meshes, &materials, &textures)?;
        Ok(Self::from_validated(nodes, meshes, materials, textures, aabb))
    }

    fn from_validated(
        nodes: Vec<Node>,
        meshes: Vec<Mesh<D>>,
        materials: Vec<Material<D>>,
        textures: Vec<Texture<D>>,
        aabb: Aabb,
    ) -> Self {
        let draw_count = nodes.iter().map(|n| n.mesh_indices.len() as u32).sum();
        Self {
            nodes,
            meshes,
            materials,
            textures,
            aabb,
            draw_count,
        }
    }

    pub fn visit<F>(&self, root_transform: Matrix4<f32>, visitor: F)
    where
        F: FnMut(u32, &Node, &Matrix4<f32>),
    {
        visit_nodes(&self.nodes, root_transform, visitor);
    }

    /// Emits one transform + material + mesh draw per mesh reference, in
    /// traversal order.
    pub fn add_to_command_stream<S: CommandStream<D>>(
        &self,
        stream: &mut S,
        root_transform: Matrix4<f32>,
    ) {
        self.visit(root_transform, |_, node, transform| {
            for &mesh_index in &node.mesh_indices {
                let mesh = &self.meshes[mesh_index as usize];
                stream.set_model_transform(transform);
                self.materials[mesh.material_index() as usize].add_to_command_stream(stream);
                mesh.add_to_command_stream(stream);
            }
        });
    }

    /// Emits one wireframe box per mesh reference, fitted to the mesh AABB.
    pub fn add_bounds_to_command_stream<S: CommandStream<D>>(
        &self,
        stream: &mut S,
        overlay: &BoundsOverlay<D>,
        root_transform: Matrix4<f32>,
    ) {
        self.visit(root_transform, |_, node, transform| {
            for &mesh_index in &node.mesh_indices {
                let mesh = &self.meshes[mesh_index as usize];
                if let Some(box_transform) = BoundsOverlay::<D>::box_transform(mesh.aabb()) {
                    stream.set_model_transform(&(transform * box_transform));
                    overlay.add_to_command_stream(stream);
                }
            }
        });
    }

    /// Draws one traversal emits; also the number of bounding boxes.
    pub fn draw_count(&self) -> u32 {
        self.draw_count
    }

    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    pub fn node(&self, index: u32) -> Option<&Node> {
        self.nodes.get(index as usize)
    }

    pub fn mesh(&self, index: u32) -> Option<&Mesh<D>> {
        self.meshes.get(index as usize)
    }

    pub fn material(&self, index: u32) -> Option<&Material<D>> {
        self.materials.get(index as usize)
    }

    pub fn texture(&self, index: u32) -> Option<&Texture<D>> {
        self.textures.get(index as usize)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn meshes(&self) -> &[Mesh<D>] {
        &self.meshes
    }

    pub fn materials(&self) -> &[Material<D>] {
        &self.materials
    }

    pub fn textures(&self) -> &[Texture<D>] {
        &self.textures
    }

    pub fn stats(&self) -> SceneStats {
        SceneStats {
            nodes: self.nodes.len(),
            meshes: self.meshes.len(),
            materials: self.materials.len(),
            textures: self.textures.len().saturating_sub(DEFAULT_TEXTURE_COUNT),
            draws: self.draw_count,
            lower_left_bottom: self.aabb.lower_left_bottom(),
            upper_right_top: self.aabb.upper_right_top(),
        }
    }
}

fn validate<D: GpuDevice>(
    nodes: &[Node],
    meshes: &[Mesh<D>],
    materials: &[Material<D>],
    textures: &[Texture<D>],
) -> SceneResult<()> {
    let invalid = |message: String| Err(SceneError::InvalidScene(message));

    if nodes.is_empty() {
        return invalid("scene has no root node".to_string());
    }
    if textures.len() < DEFAULT_TEXTURE_COUNT {
        return invalid(format!(
            "scene has {} textures, the {DEFAULT_TEXTURE_COUNT} defaults are missing",
            textures.len()
        ));
    }

    let mut parents = vec![0u32; nodes.len()];
    for (index, node) in nodes.iter().enumerate() {
        if let Some(&bad) = node.mesh_indices.iter().find(|&&m| m as usize >= meshes.len()) {
            return invalid(format!("node {index} references mesh {bad} of {}", meshes.len()));
        }
        for &child in &node.child_indices {
            let Some(count) = parents.get_mut(child as usize) else {
                return invalid(format!("node {index} references child {child} of {}", nodes.len()));
            };
            *count += 1;
        }
    }
    if parents[0] != 0 {
        return invalid("the root node has a parent".to_string());
    }
    if let Some(orphan) = parents.iter().skip(1).position(|&count| count != 1) {
        let index = orphan + 1;
        return invalid(format!("node {index} has {} parents, expected 1", parents[index]));
    }
    // Exactly one parent each still allows cycles detached from the root.
    let mut reached = 0usize;
    visit_nodes(nodes, Matrix4::identity(), |_, _, _| reached += 1);
    if reached != nodes.len() {
        return invalid(format!(
            "only {reached} of {} nodes are reachable from the root",
            nodes.len()
        ));
    }

    for (index, mesh) in meshes.iter().enumerate() {
        if mesh.material_index() as usize >= materials.len() {
            return invalid(format!(
                "mesh {index} uses material {} of {}",
                mesh.material_index(),
                materials.len()
            ));
        }
    }
    for material in materials {
        if let Some(&bad) = material
            .texture_indices()
            .iter()
            .find(|&&t| t as usize >= textures.len())
        {
            return invalid(format!(
                "material {} binds texture {bad} of {}",
                material.name(),
                textures.len()
            ));
        }
    }
    Ok(())
}

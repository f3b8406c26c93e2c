//! Engine data structures: bounding boxes, GPU resources and the scene graph.
//!
//! - `aabb` is the axis-aligned bounding box algebra used for normalization
//! - `texture`, `mesh` and `material` wrap immutable GPU resources
//! - `frame` holds the N-buffered per-frame constants and per-draw transforms
//! - `bounds` is the wireframe overlay that draws mesh bounding boxes
//! - `scene_graph` stores the flat node tree and emits draw commands

pub mod aabb;
pub mod bounds;
pub mod frame;
pub mod material;
pub mod mesh;
pub mod scene_graph;
pub mod texture;

//! scene-ngin
//!
//! A scene-graph viewer core on wgpu. Scenes are imported from glTF or OBJ,
//! uploaded once into immutable GPU resources and drawn every frame by a
//! depth-first walk that accumulates node transforms, binds each mesh's
//! material and issues its draw against N-buffered per-frame resources.
//!
//! High-level modules
//! - `camera`: examiner camera and perspective projection
//! - `config`: viewer and loader settings
//! - `context`: the wgpu device, queue, layouts and pipelines
//! - `data_structures`: AABBs, meshes, textures, materials, frame slots and the scene graph
//! - `error`: load and upload errors
//! - `gpu`: the device/command-stream seam and its headless recording backend
//! - `pipelines`: the mesh and bounding-box pipelines
//! - `resources`: importers and the scene factory
//! - `render`: the per-frame viewer driver

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod gpu;
pub mod pipelines;
pub mod render;
pub mod resources;

pub use cgmath;
pub use error::{SceneError, SceneResult};
pub use wgpu;

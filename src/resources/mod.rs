//! Loading scenes, meshes and textures from external files.
//!
//! Importers parse a file into an [`import::ImportedScene`]; the
//! [`factory::SceneFactory`] uploads it and assembles the [`Scene`].

use std::path::Path;

use log::debug;

use crate::{
    config::LoadOptions,
    data_structures::scene_graph::Scene,
    error::{SceneError, SceneResult},
    gpu::{GpuDevice, ImageData},
    resources::import::{ImportedScene, TextureSource},
};

pub mod factory;
pub mod gltf;
pub mod import;
pub mod obj;

pub fn load_binary(path: &Path) -> SceneResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| SceneError::io(path, e))
}

/// Parses `path` with the importer matching its extension.
pub fn import_scene(path: &Path, options: &LoadOptions) -> SceneResult<ImportedScene> {
    if !path.exists() {
        return Err(SceneError::NotFound(path.to_path_buf()));
    }
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("gltf" | "glb") => gltf::import_gltf(path),
        Some("obj") => obj::import_obj(path, options),
        _ => Err(SceneError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Decodes a texture into tightly packed RGBA8.
pub fn load_image(source: &TextureSource, base_dir: &Path) -> SceneResult<ImageData> {
    let key = source.key();
    let decoded = match source {
        TextureSource::File(file) => {
            let path = base_dir.join(file);
            if !path.exists() {
                return Err(SceneError::NotFound(path));
            }
            let bytes = load_binary(&path)?;
            image::load_from_memory(&bytes)
        }
        TextureSource::Embedded {
            bytes, mime_type, ..
        } => match mime_type
            .as_deref()
            .and_then(|mime| image::ImageFormat::from_mime_type(mime))
        {
            Some(format) => image::load_from_memory_with_format(bytes, format),
            None => image::load_from_memory(bytes),
        },
    }
    .map_err(|source| SceneError::Image {
        key: key.clone(),
        source,
    })?;

    let rgba = decoded.to_rgba8();
    debug!("decoded {key}: {}x{}", rgba.width(), rgba.height());
    Ok(ImageData {
        width: rgba.width(),
        height: rgba.height(),
        pixels: rgba.into_raw(),
    })
}

/// Imports `path` and builds a scene on `device` with default options.
pub fn load_scene<D: GpuDevice>(device: &D, path: impl AsRef<Path>) -> SceneResult<Scene<D>> {
    factory::SceneFactory::new(device, LoadOptions::default()).load(path)
}

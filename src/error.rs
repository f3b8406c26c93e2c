//! Error types for scene loading and GPU resource construction.
//!
//! Load-time failures abort the scene build and surface as [`SceneError`].
//! Per-mesh anomalies (non-triangle primitives, empty index data) are not
//! errors: the factory skips those meshes and logs them.

use std::path::PathBuf;

use crate::gpu::GpuError;

pub type SceneResult<T> = Result<T, SceneError>;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported scene format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("failed to import {}: {message}", path.display())]
    Import { path: PathBuf, message: String },

    #[error("failed to decode texture {key}: {source}")]
    Image {
        key: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} has no data to upload")]
    EmptyBuffer(String),

    #[error("invalid image {label}: {reason}")]
    InvalidImage { label: String, reason: String },

    #[error("scene violates its index invariants: {0}")]
    InvalidScene(String),

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

impl SceneError {
    pub(crate) fn import(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Import {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

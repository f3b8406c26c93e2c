//! Immutable GPU textures.
//!
//! A [`Texture`] is uploaded once and never changes. Materials refer to
//! textures by their index in the scene's texture array; the first three
//! entries of that array are always the 1×1 fallbacks created by
//! [`Texture::defaults`].

use log::debug;

use crate::{
    error::{SceneError, SceneResult},
    gpu::{ColorSpace, GpuDevice, ImageData},
};

/// Index of the opaque white fallback texture.
pub const DEFAULT_WHITE: u32 = 0;
/// Index of the opaque black fallback texture.
pub const DEFAULT_BLACK: u32 = 1;
/// Index of the flat normal map fallback (tangent-space +Z).
pub const DEFAULT_NORMAL: u32 = 2;
/// Number of reserved fallback textures at the start of every texture array.
pub const DEFAULT_TEXTURE_COUNT: usize = 3;

pub const WHITE_TEXEL: [u8; 4] = [255, 255, 255, 255];
pub const BLACK_TEXEL: [u8; 4] = [0, 0, 0, 255];
// The blue/purple-ish colour that represents an undisturbed normal
pub const FLAT_NORMAL_TEXEL: [u8; 4] = [128, 128, 255, 255];

pub struct Texture<D: GpuDevice> {
    label: String,
    width: u32,
    height: u32,
    color_space: ColorSpace,
    texture: D::Texture,
}

impl<D: GpuDevice> Texture<D> {
    /// Uploads `image` to the GPU.
    ///
    /// Fails if the image has no pixels or the pixel buffer is not exactly
    /// `width * height * 4` bytes.
    pub fn new(
        device: &D,
        label: &str,
        image: &ImageData,
        color_space: ColorSpace,
    ) -> SceneResult<Self> {
        if image.width == 0 || image.height == 0 {
            return Err(SceneError::EmptyBuffer(format!("texture {label}")));
        }
        if image.pixels.len() != image.expected_len() {
            return Err(SceneError::InvalidImage {
                label: label.to_string(),
                reason: format!(
                    "{}x{} RGBA8 needs {} bytes, got {}",
                    image.width,
                    image.height,
                    image.expected_len(),
                    image.pixels.len()
                ),
            });
        }
        let texture = device.create_texture(label, image, color_space)?;
        debug!(
            "uploaded texture {label} ({}x{}, {:?})",
            image.width, image.height, color_space
        );
        Ok(Self {
            label: label.to_string(),
            width: image.width,
            height: image.height,
            color_space,
            texture,
        })
    }

    /// Creates the three fallback textures in their reserved order:
    /// white, black and flat normal.
    pub fn defaults(device: &D) -> SceneResult<Vec<Self>> {
        Ok(vec![
            Self::new(
                device,
                "default white",
                &ImageData::solid(WHITE_TEXEL),
                ColorSpace::Srgb,
            )?,
            Self::new(
                device,
                "default black",
                &ImageData::solid(BLACK_TEXEL),
                ColorSpace::Srgb,
            )?,
            Self::new(
                device,
                "default normal map",
                &ImageData::solid(FLAT_NORMAL_TEXEL),
                ColorSpace::Linear,
            )?,
        ])
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn gpu(&self) -> &D::Texture {
        &self.texture
    }
}

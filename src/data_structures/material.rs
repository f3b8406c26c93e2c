use log::{debug, warn};

use crate::{
    data_structures::texture::{DEFAULT_BLACK, DEFAULT_NORMAL, DEFAULT_WHITE, Texture},
    error::{SceneError, SceneResult},
    gpu::{BufferKind, ColorSpace, CommandStream, GpuDevice, TEXTURE_SLOT_COUNT},
};

/// The five texture slots of every material, in descriptor-table order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Ambient,
    Diffuse,
    Specular,
    Emissive,
    Normal,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; TEXTURE_SLOT_COUNT] = [
        TextureSlot::Ambient,
        TextureSlot::Diffuse,
        TextureSlot::Specular,
        TextureSlot::Emissive,
        TextureSlot::Normal,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Fallback texture bound when the source material has nothing for this slot.
    pub fn default_texture(self) -> u32 {
        match self {
            TextureSlot::Ambient => DEFAULT_BLACK,
            TextureSlot::Diffuse => DEFAULT_WHITE,
            TextureSlot::Specular => DEFAULT_BLACK,
            TextureSlot::Emissive => DEFAULT_BLACK,
            TextureSlot::Normal => DEFAULT_NORMAL,
        }
    }

    pub fn color_space(self) -> ColorSpace {
        match self {
            TextureSlot::Normal => ColorSpace::Linear,
            _ => ColorSpace::Srgb,
        }
    }
}

/// Resolves the texture index of every slot.
///
/// `lookup` maps a source key to its index in the scene texture array.
/// Slots without a source, or whose source did not resolve, get the slot
/// default.
pub fn resolve_texture_slots<K, F>(
    sources: &[Option<K>; TEXTURE_SLOT_COUNT],
    mut lookup: F,
) -> [u32; TEXTURE_SLOT_COUNT]
where
    K: std::fmt::Debug,
    F: FnMut(&K) -> Option<u32>,
{
    TextureSlot::ALL.map(|slot| match &sources[slot.index()] {
        Some(key) => lookup(key).unwrap_or_else(|| {
            warn!("texture {key:?} for {slot:?} slot is unavailable, using default");
            slot.default_texture()
        }),
        None => slot.default_texture(),
    })
}

/// Shading coefficients as laid out in the material constant buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialConstants {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub emission: [f32; 4],
    /// rgb specular colour, w is the specular exponent.
    pub specular_and_exponent: [f32; 4],
}

impl Default for MaterialConstants {
    fn default() -> Self {
        Self {
            ambient: [0.1, 0.1, 0.1, 1.0],
            diffuse: [1.0, 1.0, 1.0, 1.0],
            emission: [0.0, 0.0, 0.0, 1.0],
            specular_and_exponent: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl MaterialConstants {
    pub fn new(
        ambient: [f32; 3],
        diffuse: [f32; 3],
        specular: [f32; 3],
        emission: [f32; 3],
        exponent: f32,
    ) -> Self {
        let [ar, ag, ab] = ambient;
        let [dr, dg, db] = diffuse;
        let [sr, sg, sb] = specular;
        let [er, eg, eb] = emission;
        Self {
            ambient: [ar, ag, ab, 1.0],
            diffuse: [dr, dg, db, 1.0],
            emission: [er, eg, eb, 1.0],
            specular_and_exponent: [sr, sg, sb, exponent.max(1.0)],
        }
    }
}

/// Constant buffer plus a fully populated descriptor table of five textures.
pub struct Material<D: GpuDevice> {
    name: String,
    constants: MaterialConstants,
    texture_indices: [u32; TEXTURE_SLOT_COUNT],
    // Keeps the constant buffer alive alongside the binding that reads it.
    _constant_buffer: D::Buffer,
    binding: D::MaterialBinding,
}

impl<D: GpuDevice> Material<D> {
    pub fn new(
        device: &D,
        name: &str,
        constants: MaterialConstants,
        texture_indices: [u32; TEXTURE_SLOT_COUNT],
        textures: &[Texture<D>],
    ) -> SceneResult<Self> {
        let mut views = Vec::with_capacity(TEXTURE_SLOT_COUNT);
        for (slot, &index) in TextureSlot::ALL.iter().zip(texture_indices.iter()) {
            let texture = textures.get(index as usize).ok_or_else(|| {
                SceneError::InvalidScene(format!(
                    "material {name} binds texture {index} to {slot:?}, but only {} textures exist",
                    textures.len()
                ))
            })?;
            views.push(texture.gpu());
        }
        let views: [&D::Texture; TEXTURE_SLOT_COUNT] = [views[0], views[1], views[2], views[3], views[4]];

        let constant_buffer = device.create_buffer(
            &format!("{name} Material Constants"),
            bytemuck::bytes_of(&constants),
            BufferKind::Uniform,
        )?;
        let binding = device.create_material_binding(
            &format!("{name} Material Bind Group"),
            &constant_buffer,
            views,
        )?;
        debug!("created material {name} with textures {texture_indices:?}");

        Ok(Self {
            name: name.to_string(),
            constants,
            texture_indices,
            _constant_buffer: constant_buffer,
            binding,
        })
    }

    pub fn add_to_command_stream<S: CommandStream<D>>(&self, stream: &mut S) {
        stream.bind_material(&self.binding);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constants(&self) -> &MaterialConstants {
        &self.constants
    }

    pub fn texture_indices(&self) -> [u32; TEXTURE_SLOT_COUNT] {
        self.texture_indices
    }

    pub fn texture_index(&self, slot: TextureSlot) -> u32 {
        self.texture_indices[slot.index()]
    }
}

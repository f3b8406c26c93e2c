use scene_ngin::{
    SceneError,
    data_structures::{
        material::{Material, MaterialConstants, TextureSlot, resolve_texture_slots},
        texture::{DEFAULT_BLACK, DEFAULT_NORMAL, DEFAULT_TEXTURE_COUNT, DEFAULT_WHITE, Texture},
    },
    gpu::{ColorSpace, ImageData, recording::RecordingDevice},
    resources::import::{ImportedMaterial, ImportedScene, TextureSource},
};

use crate::common::test_utils::{build, fixture_dir, imported_triangle, write_png};
mod common;

#[test]
fn empty_slots_resolve_to_their_defaults() {
    let sources: [Option<String>; 5] = Default::default();
    let indices = resolve_texture_slots(&sources, |_| None);
    assert_eq!(
        indices,
        [DEFAULT_BLACK, DEFAULT_WHITE, DEFAULT_BLACK, DEFAULT_BLACK, DEFAULT_NORMAL]
    );
    assert_eq!(indices, [1, 0, 1, 1, 2]);
}

#[test]
fn unresolved_sources_fall_back_per_slot() {
    let sources = [
        None,
        Some("albedo"),
        None,
        Some("glow"),
        Some("bumps"),
    ];
    let indices = resolve_texture_slots(&sources, |key| (*key == "albedo").then_some(7));
    assert_eq!(indices, [DEFAULT_BLACK, 7, DEFAULT_BLACK, DEFAULT_BLACK, DEFAULT_NORMAL]);
}

#[test]
fn only_normal_maps_are_linear() {
    for slot in TextureSlot::ALL {
        let expected = if slot == TextureSlot::Normal {
            ColorSpace::Linear
        } else {
            ColorSpace::Srgb
        };
        assert_eq!(slot.color_space(), expected, "{slot:?}");
    }
}

#[test]
fn specular_exponent_is_at_least_one() {
    let constants = MaterialConstants::new([0.0; 3], [1.0; 3], [0.5; 3], [0.0; 3], 0.0);
    assert_eq!(constants.specular_and_exponent, [0.5, 0.5, 0.5, 1.0]);
    assert_eq!(std::mem::size_of::<MaterialConstants>(), 64);
}

#[test]
fn material_rejects_unknown_texture_indices() {
    let device = RecordingDevice::new();
    let textures = Texture::defaults(&device).unwrap();
    let result = Material::new(
        &device,
        "broken",
        MaterialConstants::default(),
        [0, 0, 0, 0, DEFAULT_TEXTURE_COUNT as u32],
        &textures,
    );
    assert!(matches!(result, Err(SceneError::InvalidScene(_))));
}

#[test]
fn textures_validate_their_pixel_data() {
    let device = RecordingDevice::new();
    let empty = ImageData {
        width: 0,
        height: 0,
        pixels: Vec::new(),
    };
    assert!(matches!(
        Texture::new(&device, "empty", &empty, ColorSpace::Srgb),
        Err(SceneError::EmptyBuffer(_))
    ));
    let short = ImageData {
        width: 2,
        height: 2,
        pixels: vec![0; 15],
    };
    assert!(matches!(
        Texture::new(&device, "short", &short, ColorSpace::Srgb),
        Err(SceneError::InvalidImage { .. })
    ));
    assert_eq!(device.textures_created(), 0);
}

#[test]
fn shared_texture_is_uploaded_once_in_the_first_slots_color_space() {
    let dir = fixture_dir("shared_texture");
    write_png(&dir.join("shared.png"), 2, 2, [10, 20, 30, 255]);
    let shared = || Some(TextureSource::File("shared.png".into()));

    let mut bumpy = ImportedMaterial {
        name: "bumpy".to_string(),
        ..Default::default()
    };
    bumpy.textures[TextureSlot::Normal.index()] = shared();
    let mut painted = ImportedMaterial {
        name: "painted".to_string(),
        ..Default::default()
    };
    painted.textures[TextureSlot::Diffuse.index()] = shared();

    let mut a = imported_triangle("a");
    a.material_index = Some(0);
    let mut b = imported_triangle("b");
    b.material_index = Some(1);
    let mut imported = ImportedScene::new(&dir);
    imported.materials = vec![bumpy, painted];
    imported.meshes = vec![a, b];
    imported.root.mesh_indices = vec![0, 1];

    let device = RecordingDevice::new();
    let scene = build(&device, imported);

    assert_eq!(device.textures_created(), DEFAULT_TEXTURE_COUNT + 1);
    let shared_index = DEFAULT_TEXTURE_COUNT as u32;
    assert_eq!(
        scene.materials()[0].texture_indices(),
        [DEFAULT_BLACK, DEFAULT_WHITE, DEFAULT_BLACK, DEFAULT_BLACK, shared_index]
    );
    assert_eq!(
        scene.materials()[1].texture_indices(),
        [DEFAULT_BLACK, shared_index, DEFAULT_BLACK, DEFAULT_BLACK, DEFAULT_NORMAL]
    );
    assert_eq!(
        scene.texture(shared_index).unwrap().color_space(),
        ColorSpace::Linear
    );
}

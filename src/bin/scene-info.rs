//! Scene file inspector.
//!
//! Loads a glTF or OBJ scene through the scene factory on the headless
//! recording backend and prints its statistics and, with `--draws`, the
//! command list one frame would record.
//!
//! Usage: cargo run --bin scene-info -- <scene.gltf|scene.obj> [--draws] [--bounds]

use std::path::PathBuf;

use clap::Parser;
use scene_ngin::{
    config::{LoadOptions, ViewerConfig},
    gpu::recording::{RecordingDevice, RecordingStream},
    render::Viewer,
    resources::factory::SceneFactory,
};

#[derive(Parser)]
#[command(name = "scene-info", about = "Print statistics of a glTF or OBJ scene")]
struct Cli {
    /// Scene file (.gltf, .glb or .obj)
    scene: PathBuf,
    /// Print every draw of one recorded frame
    #[arg(long, short)]
    draws: bool,
    /// Include the bounding-box overlay in the recorded frame
    #[arg(long)]
    bounds: bool,
    /// Keep loading when a texture file is missing
    #[arg(long)]
    lenient_textures: bool,
    /// Keep OBJ texture coordinates as stored
    #[arg(long)]
    no_flip_v: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let device = RecordingDevice::new();
    let options = LoadOptions {
        flip_obj_v: !cli.no_flip_v,
        strict_textures: !cli.lenient_textures,
    };
    let scene = SceneFactory::new(&device, options).load(&cli.scene)?;
    let stats = scene.stats();

    let file_name = cli.scene.file_name().unwrap_or_default().to_string_lossy();
    println!("Scene File: {file_name}");
    println!("  Nodes:     {}", stats.nodes);
    println!("  Meshes:    {}", stats.meshes);
    println!("  Materials: {}", stats.materials);
    println!("  Textures:  {}", stats.textures);
    println!("  Draws:     {}", stats.draws);
    let (l, u) = (stats.lower_left_bottom, stats.upper_right_top);
    println!("  Bounds:    ({}, {}, {}) .. ({}, {}, {})", l.x, l.y, l.z, u.x, u.y, u.z);
    println!();

    println!("Meshes:");
    println!("  {:<32} {:>10} {:>10} {:>9}", "Name", "Vertices", "Triangles", "Material");
    for mesh in scene.meshes() {
        println!(
            "  {:<32} {:>10} {:>10} {:>9}",
            mesh.name(),
            mesh.vertex_count(),
            mesh.index_count() / 3,
            mesh.material_index()
        );
    }
    println!();

    println!("Materials:");
    for (index, material) in scene.materials().iter().enumerate() {
        println!("  {index:>3} {:<32} textures {:?}", material.name(), material.texture_indices());
    }

    if cli.draws {
        let config = ViewerConfig {
            display_bounding_boxes: cli.bounds,
            ..Default::default()
        };
        let mut viewer = Viewer::new(&device, scene, config, 1280, 720)?;
        viewer.prepare_frame(&device)?;
        let mut stream = RecordingStream::new();
        viewer.record(&mut stream);

        println!();
        println!("Draws of frame 0:");
        for (index, draw) in stream.draws().iter().enumerate() {
            let translation = draw.transform.map(|m| m.w.truncate());
            println!(
                "  {index:>4} {:?} material {:?} indices {:>8} translation {:?}",
                draw.pipeline,
                draw.material,
                draw.index_count,
                translation.map(|t| [t.x, t.y, t.z])
            );
        }
    }

    Ok(())
}
